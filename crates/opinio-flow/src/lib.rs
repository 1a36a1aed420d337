//! Opinio Process Flow
//!
//! This crate drives the client-visible submission and analysis pipeline:
//! record an opinion, wait out the recording step, start the backend
//! analysis workflow, then poll its status until it completes or fails.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FlowController                         │
//! │  - submit(content) / run(content) → RunOutcome              │
//! │  - guard: blank content or run in progress is a no-op       │
//! │  - shutdown() cancels delays, silences in-flight results    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ transitions
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ProcessFlow                           │
//! │  - fixed, ordered step list + active step + processing flag │
//! │  - published through a watch channel                        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ events
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FlowNotifier                           │
//! │  - NoopNotifier, ChannelNotifier                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure during a run, whether a transport error, a rejected
//! request, or a poll reporting `error`, ends the same way: the active step
//! is marked `error` with the message as its details, and the run stops.
//! Nothing is retried.

mod controller;
mod error;
mod events;
mod state;
mod step;

pub use controller::{FlowController, RunOutcome};
pub use events::{ChannelNotifier, FlowEvent, FlowNotifier, NoopNotifier};
pub use opinio_api::StepStatus;
pub use state::ProcessFlow;
pub use step::{Step, StepIcon, StepId, UnknownStep, truncate_hash};
