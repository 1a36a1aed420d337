//! The process flow controller: submission, simulated recording, and the
//! status polling loop.

use std::sync::Arc;
use std::time::Duration;

use opinio_api::{AnalysisResult, OpinionApi, StepStatus, WorkflowRequest};
use opinio_config::FlowConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::FlowError;
use crate::events::{FlowEvent, FlowNotifier, NoopNotifier};
use crate::state::{PollOutcome, ProcessFlow};
use crate::step::{StepId, truncate_hash};

/// Shown in place of a transaction hash the backend did not report.
const PENDING_HASH: &str = "处理中";
const RECORDED: &str = "您的观点已被记录到区块链";

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
  /// Every step is complete. Carries the analysis result if the backend
  /// sent one.
  Completed(Option<AnalysisResult>),
  /// The run stopped with `step_id` in `error`.
  Failed { step_id: StepId, message: String },
  /// The submission was refused: empty content or a run already in progress.
  Rejected,
  /// The host shut the controller down mid-run. The step list was left as it
  /// was at that moment.
  Abandoned,
}

/// Drives one process flow at a time against an [`OpinionApi`].
///
/// The step list lives in a watch channel owned by the controller; hosts
/// read it with [`snapshot`](Self::snapshot) or follow it with
/// [`subscribe`](Self::subscribe). Only the controller writes to it.
///
/// # Usage
///
/// ```ignore
/// let controller = Arc::new(FlowController::new(api, FlowConfig::default()));
/// let mut steps = controller.subscribe();
///
/// if let Some(run) = controller.submit("我的观点") {
///   // redraw on `steps.changed()` ...
///   let outcome = run.await?;
/// }
///
/// // On teardown
/// controller.shutdown();
/// ```
pub struct FlowController<N: FlowNotifier = NoopNotifier> {
  api: Arc<dyn OpinionApi>,
  config: FlowConfig,
  state: watch::Sender<ProcessFlow>,
  notifier: N,
  shutdown: CancellationToken,
}

impl FlowController<NoopNotifier> {
  /// Create a controller whose events are discarded.
  pub fn new(api: Arc<dyn OpinionApi>, config: FlowConfig) -> Self {
    Self::with_notifier(api, config, NoopNotifier)
  }
}

impl<N: FlowNotifier> FlowController<N> {
  /// Create a controller with a custom notifier.
  pub fn with_notifier(api: Arc<dyn OpinionApi>, config: FlowConfig, notifier: N) -> Self {
    let (state, _) = watch::channel(ProcessFlow::new());
    Self {
      api,
      config,
      state,
      notifier,
      shutdown: CancellationToken::new(),
    }
  }

  pub fn config(&self) -> &FlowConfig {
    &self.config
  }

  /// A copy of the current step list.
  pub fn snapshot(&self) -> ProcessFlow {
    self.state.borrow().clone()
  }

  /// Follow the step list as it changes.
  pub fn subscribe(&self) -> watch::Receiver<ProcessFlow> {
    self.state.subscribe()
  }

  /// Tear the controller down.
  ///
  /// Pending delays end immediately. A backend call already in flight is
  /// left to finish, but its result is dropped and the step list is not
  /// touched again.
  pub fn shutdown(&self) {
    self.shutdown.cancel();
  }

  pub fn is_shut_down(&self) -> bool {
    self.shutdown.is_cancelled()
  }

  /// Run a submission to completion on the current task.
  ///
  /// Returns [`RunOutcome::Rejected`] without touching the step list if the
  /// content is blank or a run is already in progress.
  pub async fn run(&self, content: &str) -> RunOutcome {
    match self.try_begin(content) {
      Some(run_id) => self.drive(run_id, content.to_string()).await,
      None => RunOutcome::Rejected,
    }
  }

  /// Check the guard and start the run in the background.
  ///
  /// The guard is evaluated before this returns, so a second call made
  /// while the first run is in progress returns `None`.
  pub fn submit(self: &Arc<Self>, content: &str) -> Option<JoinHandle<RunOutcome>>
  where
    N: 'static,
  {
    let run_id = self.try_begin(content)?;
    let controller = Arc::clone(self);
    let content = content.to_string();

    Some(tokio::spawn(async move {
      controller.drive(run_id, content).await
    }))
  }

  /// Guard check and the first transition, done in one step.
  fn try_begin(&self, content: &str) -> Option<String> {
    if content.trim().is_empty() {
      debug!("ignoring blank submission");
      return None;
    }

    if self.is_shut_down() {
      debug!("ignoring submission after shutdown");
      return None;
    }

    let before = self.snapshot();
    if !self.state.send_if_modified(|flow| flow.begin()) {
      debug!("ignoring submission while a run is in progress");
      return None;
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    self.notifier.notify(FlowEvent::RunStarted {
      run_id: run_id.clone(),
    });
    self.notify_changes(&run_id, &before);

    Some(run_id)
  }

  /// Run the flow and turn its result into an outcome.
  #[instrument(name = "process_flow", skip(self, run_id, content), fields(run_id = %run_id))]
  async fn drive(&self, run_id: String, content: String) -> RunOutcome {
    info!("process_flow_started");

    match self.execute(&run_id, &content).await {
      Ok(result) => {
        info!(
          total_opinions = result.as_ref().map(|r| r.total_opinions),
          "process_flow_completed"
        );
        self.notifier.notify(FlowEvent::RunCompleted {
          run_id: run_id.clone(),
          result: result.clone(),
        });
        RunOutcome::Completed(result)
      }
      Err(FlowError::Abandoned) => {
        warn!("process_flow_abandoned");
        self.notifier.notify(FlowEvent::RunAbandoned {
          run_id: run_id.clone(),
        });
        RunOutcome::Abandoned
      }
      Err(e) => {
        let message = e.to_string();
        match self.update(&run_id, |flow| flow.fail_active(&message)) {
          Ok(()) => {
            let step_id = self.state.borrow().active_step_id();
            error!(step_id = %step_id, error = %message, "process_flow_failed");
            self.notifier.notify(FlowEvent::RunFailed {
              run_id: run_id.clone(),
              step_id,
              message: message.clone(),
            });
            RunOutcome::Failed { step_id, message }
          }
          // Torn down between the failure and reporting it.
          Err(_) => {
            self.notifier.notify(FlowEvent::RunAbandoned {
              run_id: run_id.clone(),
            });
            RunOutcome::Abandoned
          }
        }
      }
    }
  }

  /// Record, wait out the confirmation delay, start the workflow and poll it.
  async fn execute(
    &self,
    run_id: &str,
    content: &str,
  ) -> Result<Option<AnalysisResult>, FlowError> {
    let submission = self
      .api
      .submit_opinion(self.config.topic_id, content)
      .await;
    self.ensure_live()?;
    let submission = submission?;

    let hash = submission
      .transaction_hash()
      .unwrap_or(PENDING_HASH)
      .to_string();
    info!(
      topic_id = submission.topic_id,
      transaction_hash = %hash,
      "opinion_recorded"
    );

    self.update(run_id, |flow| {
      flow.set_status(StepId::Waiting, StepStatus::Complete);
      flow.start_step(StepId::Blockchain);
      flow.set_details(
        StepId::Blockchain,
        format!("正在将您的观点记录到区块链: {}", truncate_hash(&hash)),
      );
    })?;

    // Nothing confirms the recording; the step completes after a fixed delay.
    self.delay(self.config.confirmation_delay()).await?;

    self.update(run_id, |flow| {
      flow.set_status(StepId::Blockchain, StepStatus::Complete);
      flow.set_details(StepId::Blockchain, RECORDED);
      flow.start_step(StepId::AiFetching);
    })?;

    let request = WorkflowRequest {
      topic_id: submission.topic_id,
      content: content.to_string(),
      action: self.config.action,
    };
    let started = self.api.start_workflow(&request).await;
    self.ensure_live()?;
    let task_id = started?.task_id;
    info!(task_id = %task_id, action = %request.action, "workflow_started");

    self.poll(run_id, &task_id).await
  }

  /// Poll until the backend reports a terminal status.
  ///
  /// There is no ceiling on the number of polls; only a terminal status, a
  /// failed call, or shutdown ends the loop.
  async fn poll(&self, run_id: &str, task_id: &str) -> Result<Option<AnalysisResult>, FlowError> {
    let mut polls: u64 = 0;

    loop {
      polls += 1;
      let status = self.api.process_status(task_id).await;
      self.ensure_live()?;
      let status = status?;

      debug!(
        poll = polls,
        step_id = %status.step_id,
        status = %status.status,
        "workflow_status"
      );

      let mut outcome = PollOutcome::Continue;
      self.update(run_id, |flow| outcome = flow.apply_status(&status))?;

      match outcome {
        PollOutcome::Completed => return Ok(status.result),
        PollOutcome::Failed(message) => return Err(FlowError::Workflow { message }),
        PollOutcome::Continue => self.delay(self.config.poll_interval()).await?,
      }
    }
  }

  /// Apply a transition unless the controller has been shut down, and report
  /// the steps it changed.
  fn update(
    &self,
    run_id: &str,
    transition: impl FnOnce(&mut ProcessFlow),
  ) -> Result<(), FlowError> {
    self.ensure_live()?;

    let before = self.snapshot();
    self.state.send_modify(transition);
    self.notify_changes(run_id, &before);

    Ok(())
  }

  fn notify_changes(&self, run_id: &str, before: &ProcessFlow) {
    let changed: Vec<FlowEvent> = {
      let current = self.state.borrow();
      current
        .steps()
        .iter()
        .zip(before.steps())
        .filter(|(now, then)| now.status != then.status || now.details != then.details)
        .map(|(now, _)| FlowEvent::StepChanged {
          run_id: run_id.to_string(),
          step_id: now.id,
          status: now.status,
          details: now.details.clone(),
        })
        .collect()
    };

    for event in changed {
      self.notifier.notify(event);
    }
  }

  fn ensure_live(&self) -> Result<(), FlowError> {
    if self.is_shut_down() {
      return Err(FlowError::Abandoned);
    }
    Ok(())
  }

  /// Sleep for `duration`, ending early on shutdown.
  async fn delay(&self, duration: Duration) -> Result<(), FlowError> {
    tokio::select! {
      _ = tokio::time::sleep(duration) => Ok(()),
      _ = self.shutdown.cancelled() => Err(FlowError::Abandoned),
    }
  }
}

impl<N: FlowNotifier> Drop for FlowController<N> {
  fn drop(&mut self) {
    self.shutdown.cancel();
  }
}
