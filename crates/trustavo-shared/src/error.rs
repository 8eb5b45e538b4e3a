use thiserror::Error;

/// User-correctable input errors. Messages are surfaced verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Nickname must be between {min} and {max} characters (got {len})")]
    NicknameLength { len: usize, min: usize, max: usize },

    #[error("Content must be between {min} and {max} characters (got {len})")]
    ContentLength { len: usize, min: usize, max: usize },

    #[error("Content cannot be blank")]
    ContentBlank,
}
