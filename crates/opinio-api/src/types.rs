use std::fmt;

use opinio_config::WorkflowAction;
use serde::{Deserialize, Serialize};

/// Status of a single step, as reported by the backend and tracked locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  #[default]
  Pending,
  Processing,
  Complete,
  Error,
}

impl StepStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      StepStatus::Pending => "pending",
      StepStatus::Processing => "processing",
      StepStatus::Complete => "complete",
      StepStatus::Error => "error",
    }
  }
}

impl fmt::Display for StepStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// On-chain receipt for a recorded opinion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionDetails {
  pub transaction_hash: String,
  pub block_number: u64,
  pub status: bool,
  pub gas_used: u64,
}

/// Response to recording an opinion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
  pub content: String,
  #[serde(default)]
  pub transaction_details: Option<TransactionDetails>,
  pub topic_id: u64,
}

impl Submission {
  /// The transaction hash, if the backend reported a non-empty one.
  pub fn transaction_hash(&self) -> Option<&str> {
    self
      .transaction_details
      .as_ref()
      .map(|tx| tx.transaction_hash.as_str())
      .filter(|hash| !hash.is_empty())
  }
}

/// Body sent to start an analysis workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
  pub topic_id: u64,
  pub content: String,
  pub action: WorkflowAction,
}

/// Response to starting an analysis workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStarted {
  pub task_id: String,
}

/// One poll of a running workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStatus {
  /// Step the backend is reporting on. Not validated against the local step
  /// list here; the flow decides what to do with unknown ids.
  pub step_id: String,
  pub status: StepStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub progress: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_step: Option<String>,
  /// Only present once the whole workflow has completed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<AnalysisResult>,
}

/// Percentages of positive, neutral and negative opinions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
  pub positive: f64,
  pub neutral: f64,
  pub negative: f64,
}

/// Final output of the analysis workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub summary: String,
  pub recommendations: String,
  pub sentiment_analysis: SentimentBreakdown,
  #[serde(default)]
  pub key_topics: Vec<String>,
  pub total_opinions: u64,
}

/// An opinion recorded under a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
  pub id: u64,
  pub content: String,
  pub topic_id: u64,
  pub timestamp: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user: Option<String>,
}

/// Connection state of the recording contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractStatus {
  pub contract_address: String,
  pub connected: bool,
  pub network: String,
  pub latest_block: u64,
}
