//! Opinio Config
//!
//! This crate contains the serializable configuration types for the Opinio
//! process flow client. These describe where the backend lives and how the
//! submission/analysis flow is paced.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=opinio.json`)
//! - Command line flags and environment variables layered on top
//!
//! Every field has a default, so an empty JSON object is a valid config.

mod action;
mod flow;

pub use action::WorkflowAction;
pub use flow::{DEFAULT_API_URL, FlowConfig};
