//! Signal store.
//!
//! Signals reference their author by id only. Visibility is recomputed on
//! every read: a signal shows up iff it is `Published` and its author is
//! still live, so content vanishes at the exact instant its author's 24
//! hours run out without anything being deleted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use trustavo_shared::tags::extract_tags;
use trustavo_shared::{validate, IdentityId, SignalId};

use crate::error::{Result, StoreError};
use crate::identities::IdentityStore;
use crate::models::{Signal, SignalStatus, SignalView};

pub struct SignalStore {
    identities: Arc<IdentityStore>,
    signals: RwLock<HashMap<SignalId, Arc<Mutex<Signal>>>>,
    next_seq: AtomicU64,
}

impl SignalStore {
    pub fn new(identities: Arc<IdentityStore>) -> Self {
        Self {
            identities,
            signals: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Post a signal as `author_id`.
    ///
    /// Attachments are processed by an external collaborator before this
    /// call, so the signal passes through `Publishing` and is published
    /// immediately.
    pub fn post(
        &self,
        author_id: &IdentityId,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<Signal> {
        validate::content(content).map_err(|e| {
            warn!(author = %author_id, error = %e, "Rejected signal");
            StoreError::InvalidContent(e)
        })?;

        let tags = extract_tags(content);
        let image_url = image_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        let signal = self
            .identities
            .act(author_id, |author, now| {
                let mut signal = Signal {
                    id: SignalId::new(),
                    author_id: *author_id,
                    content: content.to_string(),
                    tags,
                    image_url,
                    created_at: now,
                    like_count: 0,
                    comment_count: 0,
                    status: SignalStatus::Publishing,
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                };
                signal.publish();

                author.stats.posts_count += 1;
                self.signals
                    .write()
                    .insert(signal.id, Arc::new(Mutex::new(signal.clone())));
                Ok(signal)
            })
            .map_err(|e| match e {
                StoreError::Expired => StoreError::AuthorExpired,
                other => other,
            })?;

        info!(
            id = %signal.id,
            author = %author_id,
            tags = ?signal.tags,
            "Signal published"
        );
        Ok(signal)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Raw record, whatever its status or its author's.
    pub fn get(&self, id: &SignalId) -> Result<Signal> {
        let record = self.lookup(id).ok_or(StoreError::NotFound)?;
        let signal = record.lock().clone();
        Ok(signal)
    }

    /// One signal as `viewer` sees it.
    ///
    /// `Gone` signals and signals whose author has vanished are
    /// [`StoreError::SignalGone`]; `Publishing` ones are not yet there.
    pub fn view(&self, id: &SignalId, viewer: Option<&IdentityId>) -> Result<SignalView> {
        let signal = self.get(id)?;
        match signal.status {
            SignalStatus::Gone => return Err(StoreError::SignalGone),
            SignalStatus::Publishing => return Err(StoreError::NotFound),
            SignalStatus::Published => {}
        }
        let author_name = self
            .identities
            .live_nickname(&signal.author_id)
            .ok_or(StoreError::SignalGone)?;

        let viewer = self.live_viewer(viewer);
        Ok(SignalView {
            is_own: viewer == Some(signal.author_id),
            signal,
            author_name,
            is_liked: false,
        })
    }

    /// Every visible signal, newest first, projected for `viewer`.
    ///
    /// An unknown or expired viewer sees the same feed as an anonymous one.
    pub fn visible_to(&self, viewer: Option<&IdentityId>) -> Vec<SignalView> {
        let viewer = self.live_viewer(viewer);
        let mut authors: HashMap<IdentityId, Option<String>> = HashMap::new();

        let mut views: Vec<SignalView> = self
            .snapshot()
            .into_iter()
            .filter(|signal| signal.status == SignalStatus::Published)
            .filter_map(|signal| {
                let author_name = authors
                    .entry(signal.author_id)
                    .or_insert_with(|| self.identities.live_nickname(&signal.author_id))
                    .clone()?;
                Some(SignalView {
                    is_own: viewer == Some(signal.author_id),
                    signal,
                    author_name,
                    is_liked: false,
                })
            })
            .collect();

        views.sort_by(|a, b| b.signal.recency_key().cmp(&a.signal.recency_key()));
        views
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Soft-delete a signal. Only its author may do this.
    pub fn delete(&self, id: &SignalId, requester_id: &IdentityId) -> Result<()> {
        self.identities.act(requester_id, |_, _| {
            let record = self.lookup(id).ok_or(StoreError::NotFound)?;
            let mut signal = record.lock();
            if signal.is_gone() {
                return Err(StoreError::NotFound);
            }
            if signal.author_id != *requester_id {
                warn!(id = %id, requester = %requester_id, "Delete refused");
                return Err(StoreError::NotOwner);
            }
            signal.retract();
            Ok(())
        })?;

        info!(id = %id, "Signal deleted");
        Ok(())
    }

    /// Move every signal by `author_id` to `Gone`. Returns how many moved.
    pub(crate) fn retract_all_by(&self, author_id: &IdentityId) -> usize {
        let records: Vec<Arc<Mutex<Signal>>> = self.signals.read().values().cloned().collect();

        let retracted = records
            .iter()
            .filter(|record| {
                let mut signal = record.lock();
                signal.author_id == *author_id && signal.retract()
            })
            .count();

        debug!(author = %author_id, retracted, "Retracted signals");
        retracted
    }

    // ------------------------------------------------------------------
    // Engagement counters
    // ------------------------------------------------------------------

    /// Run `f` on one signal record with its lock held. Reserved for the
    /// engagement ledger, which owns `like_count` and `comment_count`.
    pub(crate) fn with_signal<T>(
        &self,
        id: &SignalId,
        f: impl FnOnce(&mut Signal) -> Result<T>,
    ) -> Result<T> {
        let record = self.lookup(id).ok_or(StoreError::NotFound)?;
        let mut signal = record.lock();
        f(&mut signal)
    }

    fn lookup(&self, id: &SignalId) -> Option<Arc<Mutex<Signal>>> {
        self.signals.read().get(id).cloned()
    }

    /// Clone every record, taking each record lock on its own.
    fn snapshot(&self) -> Vec<Signal> {
        let records: Vec<Arc<Mutex<Signal>>> = self.signals.read().values().cloned().collect();
        records.iter().map(|record| record.lock().clone()).collect()
    }

    fn live_viewer(&self, viewer: Option<&IdentityId>) -> Option<IdentityId> {
        viewer.filter(|id| self.identities.is_live(id)).copied()
    }
}
