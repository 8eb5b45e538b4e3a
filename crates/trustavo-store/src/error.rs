use thiserror::Error;
use trustavo_shared::ValidationError;

/// Errors produced by the lifecycle stores.
///
/// Every operation is all-or-nothing: when one of these is returned, no
/// store has been mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Nickname outside the allowed length.
    #[error("Invalid nickname: {0}")]
    InvalidNickname(ValidationError),

    /// Signal or comment body outside the allowed length.
    #[error("Invalid content: {0}")]
    InvalidContent(ValidationError),

    /// Unknown (or terminated) identity, or unknown signal.
    #[error("Record not found")]
    NotFound,

    /// The acting identity's 24 hours are over.
    #[error("Identity has expired")]
    Expired,

    /// The identity a signal would be posted under has expired.
    #[error("Author identity has expired")]
    AuthorExpired,

    /// Only the author may delete a signal.
    #[error("Requester does not own this signal")]
    NotOwner,

    /// The target signal was deleted, or its author has vanished.
    #[error("Signal is gone")]
    SignalGone,
}

/// Coarse classification used by the presentation layer to pick wording and
/// status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Expired,
    NotOwner,
    SignalGone,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidNickname(_) | StoreError::InvalidContent(_) => {
                ErrorKind::InvalidInput
            }
            StoreError::NotFound => ErrorKind::NotFound,
            StoreError::Expired | StoreError::AuthorExpired => ErrorKind::Expired,
            StoreError::NotOwner => ErrorKind::NotOwner,
            StoreError::SignalGone => ErrorKind::SignalGone,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
