//! Value objects handed to the presentation layer.
//!
//! Every struct derives `Serialize` and `Deserialize` and uses camelCase
//! field names on the wire.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use trustavo_shared::{CommentId, IdentityId, SignalId};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Activity counters. They only ever go up.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityStats {
    pub posts_count: u64,
    pub views_count: u64,
    pub messages_sent: u64,
}

/// Which counter of [`IdentityStats`] to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatField {
    Posts,
    Views,
    Messages,
}

impl IdentityStats {
    pub fn increment(&mut self, field: StatField) {
        let counter = match field {
            StatField::Posts => &mut self.posts_count,
            StatField::Views => &mut self.views_count,
            StatField::Messages => &mut self.messages_sent,
        };
        *counter = counter.saturating_add(1);
    }
}

/// An ephemeral anonymous persona.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: IdentityId,
    /// Trimmed, 2-20 characters. Never changes.
    pub nickname: String,
    pub languages: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// `created_at` + 24h.
    pub expires_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub stats: IdentityStats,
}

impl Identity {
    /// Derived, never stored.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before the identity vanishes; zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Render a remaining lifetime as `"23h 45m"`.
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// `Publishing -> Published -> Gone`. `Gone` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalStatus {
    Publishing,
    Published,
    Gone,
}

/// A short post. The author is referenced by id only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: SignalId,
    pub author_id: IdentityId,
    pub content: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
    /// Stored count of comment records. Views replace it with the number of
    /// comments whose author is still live.
    pub comment_count: u64,
    pub status: SignalStatus,
    /// Insertion order, breaks `created_at` ties.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Signal {
    /// `Publishing -> Published`. Returns `false` from any other state.
    pub(crate) fn publish(&mut self) -> bool {
        if self.status == SignalStatus::Publishing {
            self.status = SignalStatus::Published;
            true
        } else {
            false
        }
    }

    /// Move to `Gone`. Returns `false` if it already was.
    pub(crate) fn retract(&mut self) -> bool {
        if self.status == SignalStatus::Gone {
            return false;
        }
        self.status = SignalStatus::Gone;
        true
    }

    pub fn is_gone(&self) -> bool {
        self.status == SignalStatus::Gone
    }

    /// Newest first, insertion order breaking ties.
    pub(crate) fn recency_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.seq)
    }
}

/// A signal as seen by a particular viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignalView {
    #[serde(flatten)]
    pub signal: Signal,
    pub author_name: String,
    pub is_own: bool,
    pub is_liked: bool,
}

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

/// Append-only remark on a signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub signal_id: SignalId,
    pub author_id: IdentityId,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// State of a (identity, signal) like after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LikeState {
    Liked,
    Unliked,
}

/// Result of `toggle_like`: the new state and the count it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub state: LikeState,
    pub like_count: u64,
}

// ---------------------------------------------------------------------------
// Feed queries
// ---------------------------------------------------------------------------

/// Author filter for search, relative to the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchScope {
    #[default]
    All,
    My,
    Others,
}

/// How many visible signals carry a tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// What a `terminate` cascade touched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TerminationReport {
    pub signals_retracted: usize,
    pub likes_revoked: usize,
    pub comments_removed: usize,
}
