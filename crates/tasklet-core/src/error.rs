use std::io;

use thiserror::Error;

/// Failures surfaced by the task store and
/// the key-value backends under it.
#[derive(Debug, Error)]
pub enum TaskError {
  #[error("Task name cannot be empty!")]
  EmptyName,

  #[error(
    "storage quota exceeded writing \
     {key}: {size} bytes, limit {quota}"
  )]
  QuotaExceeded {
    key:   String,
    size:  usize,
    quota: usize
  },

  #[error("invalid storage key: {0:?}")]
  InvalidKey(String),

  #[error("storage I/O failed for {key}")]
  Io {
    key:    String,
    #[source]
    source: io::Error
  },

  #[error("failed to serialize tasks")]
  Serialize(#[from] serde_json::Error)
}

impl TaskError {
  /// Validation failures are reported to
  /// the user and never abort a command.
  pub fn is_rejection(&self) -> bool {
    matches!(self, Self::EmptyName)
  }
}
