//! The fixed pipeline of steps shown to the user.

use std::fmt;
use std::str::FromStr;

use opinio_api::StepStatus;
use serde::{Deserialize, Serialize};

/// Identifier of one stage in the pipeline.
///
/// The declaration order is the display order and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
  Waiting,
  Blockchain,
  AiFetching,
  AiAnalyzing,
  AiSummarizing,
  AiRecommendation,
  Complete,
}

impl StepId {
  /// Every step, in pipeline order.
  pub const ALL: [StepId; 7] = [
    StepId::Waiting,
    StepId::Blockchain,
    StepId::AiFetching,
    StepId::AiAnalyzing,
    StepId::AiSummarizing,
    StepId::AiRecommendation,
    StepId::Complete,
  ];

  /// Position in the pipeline.
  pub fn index(&self) -> usize {
    *self as usize
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      StepId::Waiting => "waiting",
      StepId::Blockchain => "blockchain",
      StepId::AiFetching => "ai_fetching",
      StepId::AiAnalyzing => "ai_analyzing",
      StepId::AiSummarizing => "ai_summarizing",
      StepId::AiRecommendation => "ai_recommendation",
      StepId::Complete => "complete",
    }
  }
}

impl fmt::Display for StepId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Returned when the backend names a step outside the fixed pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown step '{0}'")]
pub struct UnknownStep(pub String);

impl FromStr for StepId {
  type Err = UnknownStep;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    StepId::ALL
      .into_iter()
      .find(|id| id.as_str() == s)
      .ok_or_else(|| UnknownStep(s.to_string()))
  }
}

/// Icon hint for rendering a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepIcon {
  Clock,
  Arrow,
  Brain,
  Chart,
  File,
  Message,
  Check,
}

/// One stage of the pipeline as the user sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
  pub id: StepId,
  pub title: &'static str,
  pub description: &'static str,
  pub icon: StepIcon,
  pub status: StepStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl Step {
  /// The step as it looks before any run has touched it.
  pub fn initial(id: StepId) -> Self {
    let (title, description, icon, details) = match id {
      StepId::Waiting => ("等待发送", "您的观点正在准备上链", StepIcon::Clock, None),
      StepId::Blockchain => (
        "区块链处理",
        "将您的观点安全记录到区块链",
        StepIcon::Arrow,
        None,
      ),
      StepId::AiFetching => (
        "AI数据收集",
        "人工智能正在收集相关观点数据",
        StepIcon::Brain,
        None,
      ),
      StepId::AiAnalyzing => (
        "AI分析中",
        "分析观点数据中的模式和关联",
        StepIcon::Chart,
        Some("正在进行观点聚类分析..."),
      ),
      StepId::AiSummarizing => (
        "生成摘要",
        "根据分析结果生成综合摘要",
        StepIcon::File,
        None,
      ),
      StepId::AiRecommendation => ("提出建议", "基于分析提出行动建议", StepIcon::Message, None),
      StepId::Complete => ("处理完成", "您的观点已被记录并分析", StepIcon::Check, None),
    };

    Self {
      id,
      title,
      description,
      icon,
      status: StepStatus::Pending,
      details: details.map(str::to_string),
    }
  }
}

/// Shorten a transaction hash to `first6...last4`. Hashes of ten characters
/// or fewer are returned unchanged.
pub fn truncate_hash(hash: &str) -> String {
  const START: usize = 6;
  const END: usize = 4;

  let chars: Vec<char> = hash.chars().collect();
  if chars.len() <= START + END {
    return hash.to_string();
  }

  let head: String = chars[..START].iter().collect();
  let tail: String = chars[chars.len() - END..].iter().collect();
  format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_order_matches_index() {
    for (i, id) in StepId::ALL.iter().enumerate() {
      assert_eq!(id.index(), i);
    }
  }

  #[test]
  fn test_parse_wire_ids() {
    assert_eq!("ai_analyzing".parse::<StepId>(), Ok(StepId::AiAnalyzing));
    assert_eq!("complete".parse::<StepId>(), Ok(StepId::Complete));
    assert_eq!(
      "ai_translating".parse::<StepId>(),
      Err(UnknownStep("ai_translating".to_string()))
    );
  }

  #[test]
  fn test_serde_name_matches_display() {
    let json = serde_json::to_string(&StepId::AiRecommendation).unwrap();
    assert_eq!(json, "\"ai_recommendation\"");
  }

  #[test]
  fn test_truncate_hash() {
    assert_eq!(truncate_hash("0x1234567890abcdef"), "0x1234...cdef");
    assert_eq!(truncate_hash("0x12345678"), "0x12345678");
    assert_eq!(truncate_hash("处理中"), "处理中");
    assert_eq!(truncate_hash(""), "");
  }
}
