//! Feed assembler.
//!
//! Read-only views over the three stores, recomputed on every call. Nothing
//! here is cached, so a signal drops out of every feed on the first read
//! after its author expires.

use std::collections::HashMap;
use std::sync::Arc;

use trustavo_shared::IdentityId;

use crate::engagement::EngagementLedger;
use crate::models::{SearchScope, SignalView, TagCount};
use crate::signals::SignalStore;

pub struct Feed {
    signals: Arc<SignalStore>,
    ledger: Arc<EngagementLedger>,
}

impl Feed {
    pub fn new(signals: Arc<SignalStore>, ledger: Arc<EngagementLedger>) -> Self {
        Self { signals, ledger }
    }

    /// Every visible signal, newest first.
    pub fn global_timeline(&self, viewer: Option<&IdentityId>) -> Vec<SignalView> {
        self.assemble(viewer)
    }

    /// Visible signals written by `identity_id`, newest first.
    pub fn own_timeline(&self, identity_id: &IdentityId) -> Vec<SignalView> {
        self.assemble(Some(identity_id))
            .into_iter()
            .filter(|view| view.signal.author_id == *identity_id)
            .collect()
    }

    /// Most-liked visible signals; newer first among equals.
    pub fn trending(&self, limit: usize, viewer: Option<&IdentityId>) -> Vec<SignalView> {
        let mut views = self.assemble(viewer);
        // assemble() is already newest first and the sort is stable
        views.sort_by(|a, b| b.signal.like_count.cmp(&a.signal.like_count));
        views.truncate(limit);
        views
    }

    /// Case-insensitive match on content, author name or tags, newest first.
    ///
    /// A blank query returns every visible signal in trending order. Any
    /// other query is matched as given, surrounding whitespace included.
    /// `scope` narrows results to the viewer's own signals or everyone
    /// else's.
    pub fn search(
        &self,
        query: &str,
        scope: SearchScope,
        viewer: Option<&IdentityId>,
    ) -> Vec<SignalView> {
        let blank = query.trim().is_empty();
        let query = query.to_lowercase();
        let views = if blank {
            self.trending(usize::MAX, viewer)
        } else {
            self.assemble(viewer)
                .into_iter()
                .filter(|view| matches_query(view, &query))
                .collect()
        };

        views
            .into_iter()
            .filter(|view| match scope {
                SearchScope::All => true,
                SearchScope::My => view.is_own,
                SearchScope::Others => !view.is_own,
            })
            .collect()
    }

    /// Tags ranked by how many visible signals carry them.
    pub fn trending_tags(&self, limit: usize) -> Vec<TagCount> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for view in self.signals.visible_to(None) {
            for tag in view.signal.tags {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        tags.truncate(limit);
        tags
    }

    fn assemble(&self, viewer: Option<&IdentityId>) -> Vec<SignalView> {
        let mut views = self.signals.visible_to(viewer);
        for view in &mut views {
            view.signal.comment_count = self.ledger.live_comment_count(&view.signal.id);
            if let Some(viewer) = viewer {
                view.is_liked = self.ledger.has_liked(viewer, &view.signal.id);
            }
        }
        views
    }
}

/// `query` must already be lower-cased.
fn matches_query(view: &SignalView, query: &str) -> bool {
    view.signal.content.to_lowercase().contains(query)
        || view.author_name.to_lowercase().contains(query)
        || view.signal.tags.iter().any(|tag| tag.contains(query))
}
