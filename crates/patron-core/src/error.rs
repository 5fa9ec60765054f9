//! Error types for `patron-core`.

use thiserror::Error;
use uuid::Uuid;

/// Rejection of malformed input, before any store is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("identity number must be exactly 13 digits")]
  Format,

  #[error("identity number failed its checksum")]
  Checksum,

  #[error("{0}")]
  Invalid(&'static str),
}

/// A business rule blocked the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyError {
  #[error("cannot restore a record with an unknown deleter")]
  UnknownDeleter,

  #[error("cannot verify the deleter of this record")]
  UnverifiableDeleter,

  #[error("cannot anonymize a customer with an active portfolio")]
  ActivePortfolio,

  #[error("identity number is already registered to a customer")]
  DuplicateIdentity,
}

#[derive(Debug, Error)]
pub enum Error {
  /// No active record exists for the given id.
  #[error("record not found: {0}")]
  NotFound(Uuid),

  #[error("policy violation: {0}")]
  Policy(#[from] PolicyError),

  /// The caller lacks the relational authorization for this operation.
  #[error("forbidden: {0}")]
  Forbidden(&'static str),

  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  /// An underlying store failed; the cause is preserved for logging.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a collaborator error into [`Error::Store`].
  pub fn store<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(error))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
