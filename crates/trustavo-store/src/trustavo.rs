//! The `Trustavo` handle: one clock, the three stores wired together, and
//! the operations that span more than one of them.

use std::sync::Arc;

use tracing::{debug, info};
use trustavo_shared::{Clock, IdentityId, SignalId, SystemClock};

use crate::engagement::EngagementLedger;
use crate::error::{Result, StoreError};
use crate::feed::Feed;
use crate::identities::IdentityStore;
use crate::models::{SignalView, StatField, TerminationReport};
use crate::signals::SignalStore;

pub struct Trustavo {
    identities: Arc<IdentityStore>,
    signals: Arc<SignalStore>,
    ledger: Arc<EngagementLedger>,
    feed: Feed,
}

impl Trustavo {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let identities = Arc::new(IdentityStore::new(clock));
        let signals = Arc::new(SignalStore::new(identities.clone()));
        let ledger = Arc::new(EngagementLedger::new(identities.clone(), signals.clone()));
        let feed = Feed::new(signals.clone(), ledger.clone());
        Self {
            identities,
            signals,
            ledger,
            feed,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }

    pub fn identities(&self) -> &IdentityStore {
        &self.identities
    }

    pub fn signals(&self) -> &SignalStore {
        &self.signals
    }

    pub fn ledger(&self) -> &EngagementLedger {
        &self.ledger
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    /// Remove an identity and everything it left behind.
    ///
    /// Its signals go `Gone`, its likes and comments are withdrawn with the
    /// counts they contributed, and the identity leaves the store. Expired
    /// identities can be terminated too.
    pub fn terminate(&self, id: &IdentityId) -> Result<TerminationReport> {
        let identity = self.identities.remove(id)?;

        let signals_retracted = self.signals.retract_all_by(id);
        let revoked = self.ledger.revoke_all_by(id);

        let report = TerminationReport {
            signals_retracted,
            likes_revoked: revoked.likes,
            comments_removed: revoked.comments,
        };
        info!(
            id = %id,
            nickname = %identity.nickname,
            signals = report.signals_retracted,
            likes = report.likes_revoked,
            comments = report.comments_removed,
            "Identity terminated"
        );
        Ok(report)
    }

    /// Open one signal. A live viewer has the view counted on their stats;
    /// an unknown or expired viewer reads anonymously.
    pub fn view_signal(
        &self,
        viewer: Option<&IdentityId>,
        signal_id: &SignalId,
    ) -> Result<SignalView> {
        // Resolve before acting: the viewer may be the author.
        let mut view = self.signals.view(signal_id, viewer)?;
        view.signal.comment_count = self.ledger.live_comment_count(signal_id);

        if let Some(viewer) = viewer {
            let counted = self.identities.act(viewer, |identity, _| {
                identity.stats.increment(StatField::Views);
                Ok(())
            });
            match counted {
                Ok(()) => view.is_liked = self.ledger.has_liked(viewer, signal_id),
                Err(StoreError::NotFound | StoreError::Expired) => {
                    debug!(viewer = %viewer, "Anonymous view");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(view)
    }

    /// Public link for a visible signal.
    pub fn share_url(&self, base_url: &str, signal_id: &SignalId) -> Result<String> {
        self.signals.view(signal_id, None)?;
        Ok(format!(
            "{}/signal/{}",
            base_url.trim_end_matches('/'),
            signal_id
        ))
    }
}
