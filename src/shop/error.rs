//! Catalog fetch errors.

use thiserror::Error;

/// Errors that can occur when fetching from the catalog API.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The API answered with a non-success status.
  #[error("HTTP error! status: {status}")]
  Status { status: u16 },

  /// The request could not be sent or the body could not be read.
  #[error("Catalog request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// The body was not the JSON we expected.
  #[error("Failed to parse catalog response: {0}")]
  Parse(#[from] serde_json::Error),

  /// The configured base URL cannot carry path segments.
  #[error("Invalid catalog URL: {0}")]
  InvalidUrl(String),
}
