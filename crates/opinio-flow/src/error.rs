//! Run errors.
//!
//! None of these escape a run: they are turned into an `error` status on the
//! active step, with the `Display` output as its details.

use opinio_api::ApiError;

/// Reasons a run stops before completing.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FlowError {
  /// A backend call failed or was rejected.
  #[error(transparent)]
  Api(#[from] ApiError),

  /// A poll reported the workflow in `error`.
  #[error("{message}")]
  Workflow { message: String },

  /// The host tore the flow down.
  #[error("process flow shut down")]
  Abandoned,
}
