//! Identity store.
//!
//! Holds every persona created on this node, keyed by id. Expiration is
//! never swept: it is evaluated against the clock each time a record is
//! read or acted upon, so an identity becomes inert the instant its 24
//! hours are up.
//!
//! Each record sits behind its own mutex; the id map's lock is only held to
//! look a record up or to insert/remove one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use trustavo_shared::constants::{DEFAULT_LANGUAGE, IDENTITY_TTL_HOURS};
use trustavo_shared::{validate, Clock, IdentityId};

use crate::error::{Result, StoreError};
use crate::models::{Identity, StatField};

struct IdentityRecord {
    identity: Identity,
    /// Set by `terminate` under the record lock, before the record leaves
    /// the map, so actions already waiting on the lock see it.
    terminated: bool,
}

pub struct IdentityStore {
    clock: Arc<dyn Clock>,
    identities: RwLock<HashMap<IdentityId, Arc<Mutex<IdentityRecord>>>>,
}

impl IdentityStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            identities: RwLock::new(HashMap::new()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Initialize a new identity. Its clock starts now.
    pub fn create(&self, nickname: &str, languages: &[String]) -> Result<Identity> {
        let nickname = validate::nickname(nickname).map_err(|e| {
            warn!(error = %e, "Rejected identity");
            StoreError::InvalidNickname(e)
        })?;

        let now = self.clock.now();
        let identity = Identity {
            id: IdentityId::new(),
            nickname,
            languages: normalize_languages(languages),
            created_at: now,
            expires_at: now + Duration::hours(IDENTITY_TTL_HOURS),
            last_active_at: now,
            stats: Default::default(),
        };

        self.identities.write().insert(
            identity.id,
            Arc::new(Mutex::new(IdentityRecord {
                identity: identity.clone(),
                terminated: false,
            })),
        );

        info!(
            id = %identity.id,
            nickname = %identity.nickname,
            expires_at = %identity.expires_at,
            "Identity initialized"
        );
        Ok(identity)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a live identity. Expired identities are reported as
    /// [`StoreError::Expired`] and must be treated as absent by callers.
    pub fn get(&self, id: &IdentityId) -> Result<Identity> {
        let record = self.lookup(id).ok_or(StoreError::NotFound)?;
        let record = record.lock();
        if record.terminated {
            return Err(StoreError::NotFound);
        }
        if record.identity.is_expired(self.clock.now()) {
            return Err(StoreError::Expired);
        }
        Ok(record.identity.clone())
    }

    /// Fetch an identity whether or not it has expired.
    ///
    /// Only for showing an owner the "identity has vanished" notice; every
    /// other path goes through [`IdentityStore::get`].
    pub fn inspect(&self, id: &IdentityId) -> Result<Identity> {
        let record = self.lookup(id).ok_or(StoreError::NotFound)?;
        let record = record.lock();
        if record.terminated {
            return Err(StoreError::NotFound);
        }
        Ok(record.identity.clone())
    }

    /// Time left before `id` vanishes. Zero once expired.
    pub fn remaining(&self, id: &IdentityId) -> Result<Duration> {
        let identity = self.inspect(id)?;
        Ok(identity.remaining(self.clock.now()))
    }

    /// Nickname of a live identity, `None` if it is unknown or expired.
    pub fn live_nickname(&self, id: &IdentityId) -> Option<String> {
        self.get(id).ok().map(|identity| identity.nickname)
    }

    pub fn is_live(&self, id: &IdentityId) -> bool {
        self.get(id).is_ok()
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Mark `id` as active now. Does nothing for expired or unknown
    /// identities.
    pub fn touch(&self, id: &IdentityId) {
        let _ = self.act(id, |_, _| Ok(()));
    }

    /// Bump one of the activity counters.
    pub fn increment_stat(&self, id: &IdentityId, field: StatField) -> Result<()> {
        self.act(id, |identity, _| {
            identity.stats.increment(field);
            Ok(())
        })
    }

    /// Run one action on behalf of `id`.
    ///
    /// The identity's record stays locked for the whole of `action`, so all
    /// actions of one identity (and its termination) are serialized. The
    /// identity must be live; on success `last_active_at` is set to the
    /// instant passed to `action`. `action` must not mutate anything before
    /// its last fallible step.
    pub fn act<T>(
        &self,
        id: &IdentityId,
        action: impl FnOnce(&mut Identity, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let record = self.lookup(id).ok_or(StoreError::NotFound)?;
        let mut record = record.lock();
        if record.terminated {
            return Err(StoreError::NotFound);
        }

        let now = self.clock.now();
        if record.identity.is_expired(now) {
            debug!(id = %id, "Action refused, identity expired");
            return Err(StoreError::Expired);
        }

        let out = action(&mut record.identity, now)?;
        record.identity.last_active_at = now;
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Remove `id` from the store and return its final state.
    ///
    /// Waits for the identity's in-flight action, if any. Expired identities
    /// may still be removed. Cascading to content is the caller's job, see
    /// [`crate::Trustavo::terminate`].
    pub(crate) fn remove(&self, id: &IdentityId) -> Result<Identity> {
        let record = self.lookup(id).ok_or(StoreError::NotFound)?;
        let identity = {
            let mut record = record.lock();
            if record.terminated {
                return Err(StoreError::NotFound);
            }
            record.terminated = true;
            record.identity.clone()
        };

        self.identities.write().remove(id);
        Ok(identity)
    }

    fn lookup(&self, id: &IdentityId) -> Option<Arc<Mutex<IdentityRecord>>> {
        self.identities.read().get(id).cloned()
    }
}

/// Trim, drop blanks and duplicates; fall back to the default language.
fn normalize_languages(languages: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for language in languages {
        let language = language.trim();
        if !language.is_empty() && !out.iter().any(|l| l == language) {
            out.push(language.to_string());
        }
    }
    if out.is_empty() {
        out.push(DEFAULT_LANGUAGE.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustavo_shared::ManualClock;

    fn store() -> (IdentityStore, ManualClock) {
        let clock = ManualClock::default();
        (IdentityStore::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_create_sets_lifetime() {
        let (store, clock) = store();
        let nova = store.create("  Nova ", &[]).unwrap();

        assert_eq!(nova.nickname, "Nova");
        assert_eq!(nova.languages, vec!["English"]);
        assert_eq!(nova.created_at, clock.now());
        assert_eq!(nova.expires_at, nova.created_at + Duration::hours(24));
        assert_eq!(nova.stats, Default::default());
    }

    #[test]
    fn test_create_rejects_short_nickname() {
        let (store, _) = store();
        let err = store.create("N", &[]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidNickname(_)));
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_languages_normalized() {
        let (store, _) = store();
        let langs = vec![
            " Spanish ".to_string(),
            "".to_string(),
            "Spanish".to_string(),
            "Chinese".to_string(),
        ];
        let identity = store.create("Alice Chen", &langs).unwrap();
        assert_eq!(identity.languages, vec!["Spanish", "Chinese"]);
    }

    #[test]
    fn test_get_after_expiry() {
        let (store, clock) = store();
        let id = store.create("Nova", &[]).unwrap().id;

        clock.advance(Duration::hours(24) - Duration::milliseconds(1));
        assert!(store.get(&id).is_ok());

        clock.advance(Duration::milliseconds(1));
        assert_eq!(store.get(&id), Err(StoreError::Expired));
        assert!(store.inspect(&id).is_ok());
        assert_eq!(store.remaining(&id).unwrap(), Duration::zero());
    }

    #[test]
    fn test_get_unknown() {
        let (store, _) = store();
        assert_eq!(store.get(&IdentityId::new()), Err(StoreError::NotFound));
    }

    #[test]
    fn test_touch_updates_last_active() {
        let (store, clock) = store();
        let id = store.create("Nova", &[]).unwrap().id;

        clock.advance(Duration::minutes(5));
        store.touch(&id);
        assert_eq!(store.get(&id).unwrap().last_active_at, clock.now());
    }

    #[test]
    fn test_touch_is_silent_after_expiry() {
        let (store, clock) = store();
        let created = store.create("Nova", &[]).unwrap();

        clock.advance(Duration::hours(25));
        store.touch(&created.id);
        assert_eq!(
            store.inspect(&created.id).unwrap().last_active_at,
            created.last_active_at
        );
    }

    #[test]
    fn test_increment_stat() {
        let (store, clock) = store();
        let id = store.create("Nova", &[]).unwrap().id;

        store.increment_stat(&id, StatField::Views).unwrap();
        store.increment_stat(&id, StatField::Views).unwrap();
        assert_eq!(store.get(&id).unwrap().stats.views_count, 2);

        clock.advance(Duration::hours(24));
        assert_eq!(
            store.increment_stat(&id, StatField::Views),
            Err(StoreError::Expired)
        );
        assert_eq!(store.inspect(&id).unwrap().stats.views_count, 2);
    }

    #[test]
    fn test_failed_action_leaves_record_untouched() {
        let (store, clock) = store();
        let created = store.create("Nova", &[]).unwrap();

        clock.advance(Duration::minutes(1));
        let res: Result<()> = store.act(&created.id, |_, _| Err(StoreError::NotOwner));
        assert_eq!(res, Err(StoreError::NotOwner));
        assert_eq!(store.get(&created.id).unwrap(), created);
    }

    #[test]
    fn test_remove() {
        let (store, clock) = store();
        let id = store.create("Nova", &[]).unwrap().id;
        clock.advance(Duration::hours(30));

        assert!(store.remove(&id).is_ok());
        assert_eq!(store.inspect(&id), Err(StoreError::NotFound));
        assert_eq!(store.remove(&id), Err(StoreError::NotFound));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn expiry_is_monotone(steps in proptest::collection::vec(0i64..7_200, 1..48)) {
                let (store, clock) = store();
                let id = store.create("Nova", &[]).unwrap().id;
                let mut seen_expired = false;
                for secs in steps {
                    clock.advance(Duration::seconds(secs));
                    let expired = store.get(&id) == Err(StoreError::Expired);
                    prop_assert!(!(seen_expired && !expired));
                    seen_expired |= expired;
                }
            }
        }
    }
}
