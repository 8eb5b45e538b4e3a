//! Engagement ledger.
//!
//! The only writer of `like_count` and `comment_count`. Likes are a set of
//! identities per signal, so a like is a toggle rather than a counter a
//! client could drive out of sync; comments are append-only.
//!
//! Lock order: ledger entry, then acting identity, then signal record.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use trustavo_shared::{validate, CommentId, IdentityId, SignalId};

use crate::error::{Result, StoreError};
use crate::identities::IdentityStore;
use crate::models::{Comment, LikeOutcome, LikeState, SignalStatus};
use crate::signals::SignalStore;

#[derive(Default)]
struct SignalEngagement {
    likers: HashSet<IdentityId>,
    /// Append order, which is also `created_at` order.
    comments: Vec<Comment>,
}

/// What [`EngagementLedger::revoke_all_by`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revocation {
    pub likes: usize,
    pub comments: usize,
}

pub struct EngagementLedger {
    identities: Arc<IdentityStore>,
    signals: Arc<SignalStore>,
    entries: RwLock<HashMap<SignalId, Arc<Mutex<SignalEngagement>>>>,
}

impl EngagementLedger {
    pub fn new(identities: Arc<IdentityStore>, signals: Arc<SignalStore>) -> Self {
        Self {
            identities,
            signals,
            entries: RwLock::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Likes
    // ------------------------------------------------------------------

    /// Like `signal_id` if `identity_id` has not, unlike it otherwise.
    ///
    /// Toggles from the same identity on the same signal serialize on the
    /// signal's ledger entry, so the count always matches the set of likers.
    pub fn toggle_like(&self, identity_id: &IdentityId, signal_id: &SignalId) -> Result<LikeOutcome> {
        self.ensure_engageable(signal_id)?;

        let entry = self.entry(signal_id);
        let mut engagement = entry.lock();

        let outcome = self.identities.act(identity_id, |_, _| {
            self.signals.with_signal(signal_id, |signal| {
                if signal.status != SignalStatus::Published {
                    return Err(StoreError::SignalGone);
                }

                let state = if engagement.likers.remove(identity_id) {
                    signal.like_count = signal.like_count.saturating_sub(1);
                    LikeState::Unliked
                } else {
                    engagement.likers.insert(*identity_id);
                    signal.like_count += 1;
                    LikeState::Liked
                };

                Ok(LikeOutcome {
                    state,
                    like_count: signal.like_count,
                })
            })
        })?;

        debug!(
            signal = %signal_id,
            identity = %identity_id,
            state = ?outcome.state,
            like_count = outcome.like_count,
            "Like toggled"
        );
        Ok(outcome)
    }

    pub fn has_liked(&self, identity_id: &IdentityId, signal_id: &SignalId) -> bool {
        self.existing_entry(signal_id)
            .map(|entry| entry.lock().likers.contains(identity_id))
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Append a comment by `identity_id` and count it on both sides.
    pub fn add_comment(
        &self,
        identity_id: &IdentityId,
        signal_id: &SignalId,
        content: &str,
    ) -> Result<Comment> {
        validate::content(content).map_err(|e| {
            warn!(signal = %signal_id, error = %e, "Rejected comment");
            StoreError::InvalidContent(e)
        })?;
        self.ensure_engageable(signal_id)?;

        let entry = self.entry(signal_id);
        let mut engagement = entry.lock();

        let comment = self.identities.act(identity_id, |commenter, now| {
            self.signals.with_signal(signal_id, |signal| {
                if signal.status != SignalStatus::Published {
                    return Err(StoreError::SignalGone);
                }

                let comment = Comment {
                    id: CommentId::new(),
                    signal_id: *signal_id,
                    author_id: *identity_id,
                    author_name: commenter.nickname.clone(),
                    content: content.to_string(),
                    created_at: now,
                };

                signal.comment_count += 1;
                commenter.stats.messages_sent += 1;
                engagement.comments.push(comment.clone());
                Ok(comment)
            })
        })?;

        info!(signal = %signal_id, comment = %comment.id, "Comment added");
        Ok(comment)
    }

    /// Comments on a signal, oldest first. Comments whose author has since
    /// vanished are left out.
    pub fn comments_for(&self, signal_id: &SignalId) -> Result<Vec<Comment>> {
        let signal = self.signals.get(signal_id)?;
        if signal.is_gone() {
            return Err(StoreError::SignalGone);
        }

        let mut comments = match self.existing_entry(signal_id) {
            Some(entry) => entry.lock().comments.clone(),
            None => Vec::new(),
        };
        comments.retain(|comment| self.identities.is_live(&comment.author_id));
        comments.sort_by_key(|comment| comment.created_at);
        Ok(comments)
    }

    /// Comments on a signal whose author is still live. This is the count
    /// feeds report, so it always matches [`Self::comments_for`].
    pub fn live_comment_count(&self, signal_id: &SignalId) -> u64 {
        let authors: Vec<IdentityId> = match self.existing_entry(signal_id) {
            Some(entry) => entry.lock().comments.iter().map(|c| c.author_id).collect(),
            None => return 0,
        };
        authors
            .iter()
            .filter(|author| self.identities.is_live(author))
            .count() as u64
    }

    // ------------------------------------------------------------------
    // Termination cascade
    // ------------------------------------------------------------------

    /// Remove every like and comment by `identity_id`, decrementing the
    /// counts on the signals they were attached to.
    pub(crate) fn revoke_all_by(&self, identity_id: &IdentityId) -> Revocation {
        let entries: Vec<(SignalId, Arc<Mutex<SignalEngagement>>)> = self
            .entries
            .read()
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();

        let mut revoked = Revocation::default();
        for (signal_id, entry) in entries {
            let mut engagement = entry.lock();

            let unliked = engagement.likers.remove(identity_id);
            let before = engagement.comments.len();
            engagement
                .comments
                .retain(|comment| comment.author_id != *identity_id);
            let removed = before - engagement.comments.len();

            if !unliked && removed == 0 {
                continue;
            }

            let adjusted = self.signals.with_signal(&signal_id, |signal| {
                if unliked {
                    signal.like_count = signal.like_count.saturating_sub(1);
                }
                signal.comment_count = signal.comment_count.saturating_sub(removed as u64);
                Ok(())
            });
            if let Err(e) = adjusted {
                warn!(signal = %signal_id, error = %e, "Counts not adjusted on revoke");
            }

            revoked.likes += usize::from(unliked);
            revoked.comments += removed;
        }

        debug!(
            identity = %identity_id,
            likes = revoked.likes,
            comments = revoked.comments,
            "Revoked engagement"
        );
        revoked
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Unknown signals are `NotFound`; deleted ones, and ones whose author
    /// has vanished, are `SignalGone`.
    fn ensure_engageable(&self, signal_id: &SignalId) -> Result<()> {
        let signal = self.signals.get(signal_id)?;
        match signal.status {
            SignalStatus::Gone => Err(StoreError::SignalGone),
            SignalStatus::Publishing => Err(StoreError::NotFound),
            SignalStatus::Published if !self.identities.is_live(&signal.author_id) => {
                Err(StoreError::SignalGone)
            }
            SignalStatus::Published => Ok(()),
        }
    }

    fn entry(&self, signal_id: &SignalId) -> Arc<Mutex<SignalEngagement>> {
        if let Some(entry) = self.existing_entry(signal_id) {
            return entry;
        }
        self.entries.write().entry(*signal_id).or_default().clone()
    }

    fn existing_entry(&self, signal_id: &SignalId) -> Option<Arc<Mutex<SignalEngagement>>> {
        self.entries.read().get(signal_id).cloned()
    }
}
