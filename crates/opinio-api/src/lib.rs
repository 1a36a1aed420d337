//! Opinio API
//!
//! Typed client for the opinion backend. The process flow only talks to the
//! backend through the [`OpinionApi`] trait, so tests and alternative
//! transports can stand in for [`HttpOpinionApi`].
//!
//! Every failure, whether the request never reached the backend or the
//! backend answered with a non-2xx status, comes back as an [`ApiError`]
//! whose `Display` is a message fit to show a user.

mod api;
mod error;
mod http;
mod types;

pub use api::OpinionApi;
pub use error::ApiError;
pub use http::HttpOpinionApi;
pub use opinio_config::WorkflowAction;
pub use types::{
  AnalysisResult, ContractStatus, Opinion, ProcessStatus, SentimentBreakdown, StepStatus,
  Submission, TransactionDetails, WorkflowRequest, WorkflowStarted,
};
