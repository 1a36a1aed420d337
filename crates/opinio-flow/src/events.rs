//! Flow events and notifiers for observability.
//!
//! Events are emitted while a run progresses so that hosts can log them,
//! forward them to a UI, or ignore them. The full step list is also
//! published through [`FlowController::subscribe`](crate::FlowController::subscribe);
//! events describe what changed, the snapshot describes where things stand.

use opinio_api::{AnalysisResult, StepStatus};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::step::StepId;

/// Events emitted during a process flow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FlowEvent {
  /// A submission passed the guard and the run has started.
  RunStarted { run_id: String },

  /// A step's status or details changed.
  StepChanged {
    run_id: String,
    step_id: StepId,
    status: StepStatus,
    details: Option<String>,
  },

  /// The backend reported the final step complete.
  RunCompleted {
    run_id: String,
    result: Option<AnalysisResult>,
  },

  /// The run stopped with the given step in `error`.
  RunFailed {
    run_id: String,
    step_id: StepId,
    message: String,
  },

  /// The host tore the flow down before the run reached a terminal state.
  RunAbandoned { run_id: String },
}

/// Trait for receiving flow events.
///
/// The controller calls `notify` for each event; implementations decide
/// what to do with them.
pub trait FlowNotifier: Send + Sync {
  fn notify(&self, event: FlowEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl FlowNotifier for NoopNotifier {
  fn notify(&self, _event: FlowEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls the poller. Volume is a
  // handful of events per poll.
  sender: mpsc::UnboundedSender<FlowEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<FlowEvent>) -> Self {
    Self { sender }
  }
}

impl FlowNotifier for ChannelNotifier {
  fn notify(&self, event: FlowEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
