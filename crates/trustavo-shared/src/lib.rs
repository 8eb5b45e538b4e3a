//! # trustavo-shared
//!
//! Types shared by every Trustavo crate: identifiers, lifecycle constants,
//! input validation, hashtag extraction and the clock abstraction that all
//! expiration math runs against.

pub mod clock;
pub mod constants;
pub mod error;
pub mod tags;
pub mod types;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ValidationError;
pub use types::{CommentId, IdentityId, SignalId};
