//! Step list state and the transitions the poller applies to it.

use opinio_api::{AnalysisResult, ProcessStatus, StepStatus};
use serde::Serialize;
use tracing::warn;

use crate::step::{Step, StepId};

/// Details shown on the failed step when a poll reports `error` without any.
pub(crate) const WORKFLOW_ERROR: &str = "工作流处理出错";

/// The step list of a process flow plus its progress pointer.
///
/// Step order is fixed at construction. Only `status` and `details` of
/// individual steps change, and only through the transitions below.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessFlow {
  steps: Vec<Step>,
  active_step_id: StepId,
  processing: bool,
}

/// What a poll response means for the loop.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PollOutcome {
  Continue,
  Completed,
  Failed(String),
}

impl Default for ProcessFlow {
  fn default() -> Self {
    Self::new()
  }
}

impl ProcessFlow {
  /// An idle flow with every step pending.
  pub fn new() -> Self {
    Self {
      steps: StepId::ALL.into_iter().map(Step::initial).collect(),
      active_step_id: StepId::Waiting,
      processing: false,
    }
  }

  /// All steps in pipeline order.
  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn step(&self, id: StepId) -> &Step {
    &self.steps[id.index()]
  }

  pub fn active_step_id(&self) -> StepId {
    self.active_step_id
  }

  pub fn active_step(&self) -> &Step {
    self.step(self.active_step_id)
  }

  /// Whether a run is in progress.
  pub fn is_processing(&self) -> bool {
    self.processing
  }

  /// Overall progress in percent. Zero while idle.
  pub fn progress(&self) -> u8 {
    if !self.processing {
      return 0;
    }

    let position = self.active_step_id.index() + 1;
    ((position * 100) as f64 / self.steps.len() as f64).round() as u8
  }

  /// Start a run. Returns `false`, leaving the flow untouched, if one is
  /// already in progress.
  ///
  /// Leftovers from a previous run are cleared before the first step is
  /// marked `processing`.
  pub(crate) fn begin(&mut self) -> bool {
    if self.processing {
      return false;
    }

    *self = Self::new();
    self.processing = true;
    self.start_step(StepId::Waiting);
    true
  }

  pub(crate) fn set_status(&mut self, id: StepId, status: StepStatus) {
    self.steps[id.index()].status = status;
  }

  pub(crate) fn set_details(&mut self, id: StepId, details: impl Into<String>) {
    self.steps[id.index()].details = Some(details.into());
  }

  /// Make `id` the active step and mark it `processing`.
  pub(crate) fn start_step(&mut self, id: StepId) {
    self.active_step_id = id;
    self.set_status(id, StepStatus::Processing);
  }

  /// Mark the active step as failed and end the run.
  pub(crate) fn fail_active(&mut self, message: &str) {
    let id = self.active_step_id;
    self.set_status(id, StepStatus::Error);
    self.set_details(id, message);
    self.processing = false;
  }

  /// Mark every step complete, spread the analysis result over the steps it
  /// belongs to, and end the run.
  pub(crate) fn complete_all(&mut self, result: Option<&AnalysisResult>) {
    for step in &mut self.steps {
      step.status = StepStatus::Complete;
    }

    if let Some(result) = result {
      self.set_details(StepId::AiSummarizing, result.summary.clone());
      self.set_details(StepId::AiRecommendation, result.recommendations.clone());
      self.set_details(StepId::AiAnalyzing, analysis_details(result));
    }

    self.processing = false;
  }

  /// Apply one poll response.
  ///
  /// A step id outside the pipeline is ignored for the step list so that the
  /// active id always names a real step, but an `error` status still ends
  /// the run.
  pub(crate) fn apply_status(&mut self, status: &ProcessStatus) -> PollOutcome {
    let step_id = match status.step_id.parse::<StepId>() {
      Ok(id) => {
        self.set_status(id, status.status);
        if let Some(details) = &status.details {
          self.set_details(id, details.clone());
        }
        self.active_step_id = id;
        Some(id)
      }
      Err(e) => {
        warn!(error = %e, status = %status.status, "ignoring status for unknown step");
        None
      }
    };

    match status.status {
      StepStatus::Complete if step_id == Some(StepId::Complete) => {
        self.complete_all(status.result.as_ref());
        PollOutcome::Completed
      }
      StepStatus::Error => PollOutcome::Failed(
        status
          .details
          .clone()
          .unwrap_or_else(|| WORKFLOW_ERROR.to_string()),
      ),
      _ => PollOutcome::Continue,
    }
  }
}

/// Details text for the analyzing step once the result is in.
pub(crate) fn analysis_details(result: &AnalysisResult) -> String {
  let sentiment = &result.sentiment_analysis;
  let mut details = format!(
    "分析了 {} 条观点\n情感分布: 正面 {}% / 中性 {}% / 负面 {}%",
    result.total_opinions, sentiment.positive, sentiment.neutral, sentiment.negative
  );

  if !result.key_topics.is_empty() {
    details.push_str("\n关键话题: ");
    details.push_str(&result.key_topics.join(", "));
  }

  details
}
