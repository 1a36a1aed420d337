use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
  ContractStatus, Opinion, ProcessStatus, Submission, WorkflowRequest, WorkflowStarted,
};

/// Remote operations offered by the opinion backend.
#[async_trait]
pub trait OpinionApi: Send + Sync {
  /// Record an opinion under a topic.
  async fn submit_opinion(&self, topic_id: u64, content: &str) -> Result<Submission, ApiError>;

  /// Start an analysis workflow. The returned task id is what
  /// [`process_status`](Self::process_status) is polled with.
  async fn start_workflow(&self, request: &WorkflowRequest) -> Result<WorkflowStarted, ApiError>;

  /// Fetch the current status of a running workflow.
  async fn process_status(&self, task_id: &str) -> Result<ProcessStatus, ApiError>;

  /// List the opinions recorded under a topic.
  async fn opinions_by_topic(&self, topic_id: u64) -> Result<Vec<Opinion>, ApiError>;

  /// Report the state of the recording contract.
  async fn contract_status(&self) -> Result<ContractStatus, ApiError>;
}
