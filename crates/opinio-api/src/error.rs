//! Backend client errors.

/// Errors returned by backend operations.
///
/// The `Display` output is meant to be shown as-is next to the failed step.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// The configured base URL could not be used.
  #[error("invalid backend url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  /// The request did not complete (connection refused, reset, timeout).
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// The backend answered with a non-2xx status.
  #[error("{message}")]
  Rejected { status: u16, message: String },

  /// The backend answered 2xx but the body was not the expected shape.
  #[error("invalid response body: {message}")]
  Decode { message: String },
}
