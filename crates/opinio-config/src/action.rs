use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the backend analysis workflow should do with the submitted opinion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
  Analyze,
  Summarize,
  #[default]
  Full,
}

impl WorkflowAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      WorkflowAction::Analyze => "analyze",
      WorkflowAction::Summarize => "summarize",
      WorkflowAction::Full => "full",
    }
  }
}

impl fmt::Display for WorkflowAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for WorkflowAction {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "analyze" => Ok(WorkflowAction::Analyze),
      "summarize" => Ok(WorkflowAction::Summarize),
      "full" => Ok(WorkflowAction::Full),
      other => Err(format!("unknown workflow action: {}", other)),
    }
  }
}
