//! # trustavo-store
//!
//! In-memory state for a Trustavo node: ephemeral identities that vanish 24
//! hours after creation, the signals they post, likes and comments on those
//! signals, and the feeds assembled from all three.
//!
//! Expiration is lazy. Nothing sweeps expired identities; every read checks
//! `expires_at` against the injected [`Clock`](trustavo_shared::Clock) and
//! treats expired identities, and whatever they wrote, as absent.
//!
//! Each entity lives behind its own lock. When an operation needs several,
//! it takes them in the order ledger entry, identity, signal.

pub mod engagement;
pub mod feed;
pub mod identities;
pub mod models;
pub mod signals;
pub mod trustavo;

mod error;

pub use engagement::{EngagementLedger, Revocation};
pub use error::{ErrorKind, Result, StoreError};
pub use feed::Feed;
pub use identities::IdentityStore;
pub use models::*;
pub use signals::SignalStore;
pub use trustavo::Trustavo;
