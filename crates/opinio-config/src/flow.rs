use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::WorkflowAction;

/// Backend used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Settings for one process flow client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
  /// Base URL of the opinion backend.
  pub api_url: String,
  /// Topic the opinion is recorded under.
  pub topic_id: u64,
  /// Analysis requested when the workflow starts.
  pub action: WorkflowAction,
  /// Delay between status polls.
  pub poll_interval_ms: u64,
  /// How long the recording step stays in `processing` before it is marked
  /// complete. There is no real confirmation behind this.
  pub confirmation_delay_ms: u64,
}

impl Default for FlowConfig {
  fn default() -> Self {
    Self {
      api_url: DEFAULT_API_URL.to_string(),
      topic_id: 1,
      action: WorkflowAction::Full,
      poll_interval_ms: 2000,
      confirmation_delay_ms: 4000,
    }
  }
}

impl FlowConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  pub fn confirmation_delay(&self) -> Duration {
    Duration::from_millis(self.confirmation_delay_ms)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_object_uses_defaults() {
    let config: FlowConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, FlowConfig::default());
    assert_eq!(config.poll_interval(), Duration::from_millis(2000));
    assert_eq!(config.confirmation_delay(), Duration::from_millis(4000));
  }

  #[test]
  fn test_partial_override() {
    let config: FlowConfig = serde_json::from_str(
      r#"{"api_url": "http://backend:9000", "action": "summarize", "poll_interval_ms": 500}"#,
    )
    .unwrap();

    assert_eq!(config.api_url, "http://backend:9000");
    assert_eq!(config.action, WorkflowAction::Summarize);
    assert_eq!(config.poll_interval_ms, 500);
    assert_eq!(config.topic_id, 1);
  }

  #[test]
  fn test_unknown_action_rejected() {
    let result: Result<FlowConfig, _> = serde_json::from_str(r#"{"action": "translate"}"#);
    assert!(result.is_err());
  }

  #[test]
  fn test_action_parse_matches_wire_name() {
    for action in [
      WorkflowAction::Analyze,
      WorkflowAction::Summarize,
      WorkflowAction::Full,
    ] {
      assert_eq!(action.as_str().parse::<WorkflowAction>(), Ok(action));
    }
  }
}
