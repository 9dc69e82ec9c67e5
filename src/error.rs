//! Error types shared by the catalog core, its data sources and the export path.

use thiserror::Error;

use crate::export::ExportError;

/// Failure reported by a product data source (HTTP API or local store).
///
/// The core never inspects these beyond propagating them to the caller.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// Transport-level failure: connection refused, timeout, TLS, body read.
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// The API answered with a non-success status.
  #[error("server returned {status}: {message}")]
  Status { status: u16, message: String },

  /// The backing store failed to execute the query.
  #[error("store error: {source}")]
  Store {
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The response could not be interpreted.
  #[error("malformed response: {0}")]
  Decode(String),
}

impl RemoteError {
  pub fn store(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self::Store {
      source: source.into(),
    }
  }

  /// HTTP status code when the failure came from an API response.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

/// Errors surfaced by the catalog core to UI and CLI callers.
#[derive(Debug, Error)]
pub enum CatalogError {
  /// Malformed filter, sort, limit or page values. Raised before any I/O.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The data source failed. The result cache keeps its last valid state.
  #[error(transparent)]
  Remote(#[from] RemoteError),

  /// A bulk export matched no products. A notice, not a failure.
  #[error("no products match the current filter")]
  EmptyResult,

  /// Encoding or writing an export artifact failed.
  #[error(transparent)]
  Export(#[from] ExportError),
}

impl CatalogError {
  pub fn invalid(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }

  pub fn is_empty_result(&self) -> bool {
    matches!(self, Self::EmptyResult)
  }

  pub fn is_invalid_input(&self) -> bool {
    matches!(self, Self::InvalidInput(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_remote_status_code() {
    let err = RemoteError::Status {
      status: 404,
      message: "product not found".to_string(),
    };
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "server returned 404: product not found");
    assert_eq!(RemoteError::Decode("x".to_string()).status(), None);
  }

  #[test]
  fn test_remote_error_passes_through_transparently() {
    let err: CatalogError = RemoteError::Decode("bad json".to_string()).into();
    assert_eq!(err.to_string(), "malformed response: bad json");
    assert!(!err.is_empty_result());
  }

  #[test]
  fn test_classification_helpers() {
    assert!(CatalogError::EmptyResult.is_empty_result());
    assert!(CatalogError::invalid("limit must be positive").is_invalid_input());
  }
}
