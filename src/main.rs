use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use opinio_api::{HttpOpinionApi, OpinionApi};
use opinio_config::{FlowConfig, WorkflowAction};
use opinio_flow::{FlowController, FlowNotifier, ProcessFlow, RunOutcome, StepStatus};
use tokio::task::JoinHandle;

/// Opinio - submit opinions and follow them through recording and AI analysis
#[derive(Parser)]
#[command(name = "opinio")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a JSON config file (default: ~/.opinio/config.json, if present)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Base URL of the opinion backend
  #[arg(long, global = true, env = "OPINIO_API_URL")]
  api_url: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Submit an opinion and follow the process flow until it finishes
  Submit {
    /// The opinion text. Read from stdin when omitted.
    content: Option<String>,

    /// Topic to record the opinion under
    #[arg(long)]
    topic: Option<u64>,

    /// Analysis to request once the opinion is recorded
    #[arg(long)]
    action: Option<WorkflowAction>,
  },

  /// List the opinions recorded under a topic
  Opinions {
    #[arg(long, default_value_t = 1)]
    topic: u64,
  },

  /// Show the status of the recording contract
  Contract,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let mut config = load_config(cli.config)?;
  if let Some(api_url) = cli.api_url {
    config.api_url = api_url;
  }

  match cli.command {
    Some(Commands::Submit {
      content,
      topic,
      action,
    }) => {
      if let Some(topic) = topic {
        config.topic_id = topic;
      }
      if let Some(action) = action {
        config.action = action;
      }
      let content = match content {
        Some(content) => content,
        None => read_content_from_stdin()?,
      };
      block_on(submit(config, content))
    }
    Some(Commands::Opinions { topic }) => block_on(list_opinions(config, topic)),
    Some(Commands::Contract) => block_on(contract_status(config)),
    None => {
      println!("opinio - use --help to see available commands");
      Ok(())
    }
  }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(future)
}

/// Load the config file, falling back to defaults when none is given and the
/// default location does not exist.
fn load_config(path: Option<PathBuf>) -> Result<FlowConfig> {
  let path = path.or_else(|| {
    dirs::home_dir()
      .map(|home| home.join(".opinio").join("config.json"))
      .filter(|default| default.exists())
  });

  let Some(path) = path else {
    debug!("no config file, using defaults");
    return Ok(FlowConfig::default());
  };

  let content = std::fs::read_to_string(&path)
    .with_context(|| format!("failed to read config file: {}", path.display()))?;

  let config = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))?;

  info!(path = %path.display(), "loaded config");
  Ok(config)
}

fn backend(config: &FlowConfig) -> Result<HttpOpinionApi> {
  HttpOpinionApi::new(&config.api_url)
    .with_context(|| format!("failed to create backend client for {}", config.api_url))
}

async fn submit(config: FlowConfig, content: String) -> Result<()> {
  let api = Arc::new(backend(&config)?);
  eprintln!("Backend: {}", api.base_url());

  let controller = Arc::new(FlowController::new(api, config));

  let run = controller
    .submit(&content)
    .context("nothing to submit: opinion is empty")?;

  let outcome = follow(&controller, run, async {
    // No signal handler: follow the run to its end.
    if tokio::signal::ctrl_c().await.is_err() {
      std::future::pending::<()>().await;
    }
  })
  .await?;

  let flow = controller.snapshot();
  render(&flow);

  match outcome {
    RunOutcome::Completed(_) => {
      println!("{}", serde_json::to_string_pretty(&flow)?);
      Ok(())
    }
    RunOutcome::Failed { step_id, message } => {
      bail!("process flow failed at step '{}': {}", step_id, message)
    }
    RunOutcome::Abandoned | RunOutcome::Rejected => bail!("process flow interrupted"),
  }
}

/// Redraw the step list until the run ends or `interrupt` fires.
///
/// An interrupt shuts the controller down and stops waiting at once. The
/// run task is aborted, so a backend call that never answers cannot keep
/// the process alive.
async fn follow<N>(
  controller: &FlowController<N>,
  mut run: JoinHandle<RunOutcome>,
  interrupt: impl Future<Output = ()>,
) -> Result<RunOutcome>
where
  N: FlowNotifier,
{
  let mut steps = controller.subscribe();
  render(&steps.borrow_and_update());
  tokio::pin!(interrupt);

  loop {
    tokio::select! {
      outcome = &mut run => return outcome.context("process flow task failed"),
      changed = steps.changed() => {
        if changed.is_ok() {
          render(&steps.borrow_and_update());
        }
      }
      _ = &mut interrupt => {
        eprintln!("Interrupted, shutting down");
        controller.shutdown();
        run.abort();
        return Ok(RunOutcome::Abandoned);
      }
    }
  }
}

async fn list_opinions(config: FlowConfig, topic: u64) -> Result<()> {
  let api = backend(&config)?;
  let opinions = api
    .opinions_by_topic(topic)
    .await
    .with_context(|| format!("failed to list opinions for topic {}", topic))?;

  eprintln!("Topic {}: {} opinions", topic, opinions.len());
  println!("{}", serde_json::to_string_pretty(&opinions)?);
  Ok(())
}

async fn contract_status(config: FlowConfig) -> Result<()> {
  let api = backend(&config)?;
  let status = api
    .contract_status()
    .await
    .context("failed to fetch contract status")?;

  println!("{}", serde_json::to_string_pretty(&status)?);
  Ok(())
}

/// Draw the step list to stderr.
fn render(flow: &ProcessFlow) {
  eprintln!();
  if flow.is_processing() {
    eprintln!("处理流程 ({}%)", flow.progress());
  } else {
    eprintln!("处理流程");
  }

  for step in flow.steps() {
    let marker = match step.status {
      StepStatus::Pending => "○",
      StepStatus::Processing => "◐",
      StepStatus::Complete => "●",
      StepStatus::Error => "✕",
    };
    let pointer = if step.id == flow.active_step_id() {
      ">"
    } else {
      " "
    };

    eprintln!("{} {} {} [{}]", pointer, marker, step.title, step.status);
    if let Some(details) = &step.details {
      for line in details.lines() {
        eprintln!("      {}", line);
      }
    }
  }
}

fn read_content_from_stdin() -> Result<String> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    bail!("no opinion given: pass it as an argument or pipe it on stdin");
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read opinion from stdin")?;

  Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use async_trait::async_trait;
  use opinio_api::{
    ApiError, ContractStatus, Opinion, ProcessStatus, Submission, WorkflowRequest,
    WorkflowStarted,
  };
  use opinio_flow::StepId;

  use super::*;

  /// Records the opinion and starts the workflow, then never answers a poll.
  struct StalledBackend;

  #[async_trait]
  impl OpinionApi for StalledBackend {
    async fn submit_opinion(&self, topic_id: u64, content: &str) -> Result<Submission, ApiError> {
      Ok(Submission {
        content: content.to_string(),
        transaction_details: None,
        topic_id,
      })
    }

    async fn start_workflow(&self, _request: &WorkflowRequest) -> Result<WorkflowStarted, ApiError> {
      Ok(WorkflowStarted {
        task_id: "stalled".to_string(),
      })
    }

    async fn process_status(&self, _task_id: &str) -> Result<ProcessStatus, ApiError> {
      std::future::pending().await
    }

    async fn opinions_by_topic(&self, _topic_id: u64) -> Result<Vec<Opinion>, ApiError> {
      Err(ApiError::Rejected {
        status: 404,
        message: "not found".to_string(),
      })
    }

    async fn contract_status(&self) -> Result<ContractStatus, ApiError> {
      Err(ApiError::Rejected {
        status: 404,
        message: "not found".to_string(),
      })
    }
  }

  fn stalled_controller() -> Arc<FlowController> {
    let config = FlowConfig {
      confirmation_delay_ms: 0,
      ..FlowConfig::default()
    };
    Arc::new(FlowController::new(Arc::new(StalledBackend), config))
  }

  #[tokio::test(start_paused = true)]
  async fn test_interrupt_returns_while_poll_is_pending() {
    let controller = stalled_controller();
    let run = controller.submit("我的观点").unwrap();

    let interrupt = tokio::time::sleep(Duration::from_secs(10));
    let outcome = tokio::time::timeout(
      Duration::from_secs(3600),
      follow(&controller, run, interrupt),
    )
    .await
    .expect("follow should return once interrupted")
    .unwrap();

    assert_eq!(outcome, RunOutcome::Abandoned);
    assert!(controller.is_shut_down());

    let flow = controller.snapshot();
    assert_eq!(flow.active_step_id(), StepId::AiFetching);
    assert_eq!(flow.step(StepId::AiFetching).status, StepStatus::Processing);
  }

  #[tokio::test(start_paused = true)]
  async fn test_without_interrupt_follow_keeps_waiting() {
    let controller = stalled_controller();
    let run = controller.submit("我的观点").unwrap();

    let waited = tokio::time::timeout(
      Duration::from_secs(3600),
      follow(&controller, run, std::future::pending::<()>()),
    )
    .await;

    assert!(waited.is_err());
    assert!(!controller.is_shut_down());
  }
}
