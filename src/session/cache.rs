use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use mockable::{Clock, DefaultClock};

use super::{RoleFactBundle, RoleFactSource};
use crate::{AccessError, PrincipalId};

#[derive(Debug, Clone)]
struct CachedFacts {
    bundle: RoleFactBundle,
    expires_at: DateTime<Utc>,
}

/// Per-process cache of role-fact bundles with a fixed TTL.
///
/// Construct one per process and share it through `Arc`. Every membership
/// or role mutation must call [`invalidate`](Self::invalidate) for each
/// affected principal before reporting success.
///
/// # Example
///
/// ```rust,ignore
/// let cache = Arc::new(RoleFactCache::new(Arc::new(resolver), config.role_cache_ttl));
/// let facts = cache.get(principal).await?;
/// ```
pub struct RoleFactCache {
    source: Arc<dyn RoleFactSource>,
    entries: RwLock<HashMap<PrincipalId, CachedFacts>>,
    /// Bumped on every invalidation; a refill started before a bump is not stored.
    epoch: AtomicU64,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RoleFactCache {
    pub fn new(source: Arc<dyn RoleFactSource>, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(DefaultClock))
    }

    pub fn with_clock(source: Arc<dyn RoleFactSource>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            ttl,
            clock,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<PrincipalId, CachedFacts>>, AccessError> {
        self.entries
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<PrincipalId, CachedFacts>>, AccessError> {
        self.entries
            .write()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))
    }

    /// Returns the cached bundle, or resolves and stores a fresh one.
    ///
    /// Resolver errors propagate and nothing is stored.
    pub async fn get(&self, principal: PrincipalId) -> Result<RoleFactBundle, AccessError> {
        let now = self.clock.utc();

        if let Some(entry) = self.read()?.get(&principal) {
            if now < entry.expires_at {
                return Ok(entry.bundle.clone());
            }
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        let bundle = self.source.resolve_role_facts(principal).await?;

        let mut entries = self.write()?;
        if self.epoch.load(Ordering::Acquire) == epoch {
            entries.insert(
                principal,
                CachedFacts {
                    bundle: bundle.clone(),
                    expires_at: now + self.ttl,
                },
            );
        }
        drop(entries);

        log::debug!(target: "tenantry", "msg=\"role facts resolved\", user_id={principal}");
        Ok(bundle)
    }

    /// Drops the principal's entry so the next `get` re-resolves.
    pub fn invalidate(&self, principal: PrincipalId) -> Result<(), AccessError> {
        let mut entries = self.write()?;
        entries.remove(&principal);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        drop(entries);

        log::debug!(target: "tenantry", "msg=\"role facts invalidated\", user_id={principal}");
        Ok(())
    }

    pub fn invalidate_many(&self, principals: &[PrincipalId]) -> Result<(), AccessError> {
        let mut entries = self.write()?;
        for principal in principals {
            entries.remove(principal);
        }
        self.epoch.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Removes entries past their TTL. Returns how many were removed.
    ///
    /// Expired entries are never served, so this only reclaims memory.
    pub fn purge_expired(&self) -> Result<usize, AccessError> {
        let now = self.clock.utc();
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        Ok(before - entries.len())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::repository::AccountType;
    use crate::test_support::MutableClock;

    /// Counts resolutions; alternates the account type so refills are observable.
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RoleFactSource for CountingSource {
        async fn resolve_role_facts(&self, principal: PrincipalId) -> Result<RoleFactBundle, AccessError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AccessError::DatabaseError("connection refused".into()));
            }
            Ok(RoleFactBundle {
                team_ids: vec![principal],
                account_type: if call % 2 == 0 {
                    AccountType::Individual
                } else {
                    AccountType::Business
                },
                ..RoleFactBundle::default()
            })
        }
    }

    fn cache_with(source: Arc<CountingSource>, clock: Arc<MutableClock>) -> RoleFactCache {
        RoleFactCache::with_clock(source, Duration::minutes(5), clock)
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let source = Arc::new(CountingSource::new());
        let clock = Arc::new(MutableClock::starting_now());
        let cache = cache_with(source.clone(), clock.clone());

        cache.get(1).await.unwrap();
        clock.advance(Duration::minutes(4));
        cache.get(1).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_refill_after_ttl() {
        let source = Arc::new(CountingSource::new());
        let clock = Arc::new(MutableClock::starting_now());
        let cache = cache_with(source.clone(), clock.clone());

        let first = cache.get(1).await.unwrap();
        clock.advance(Duration::minutes(5));
        let second = cache.get(1).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_ne!(first.account_type, second.account_type);
    }

    #[tokio::test]
    async fn test_invalidate_forces_resolution() {
        let source = Arc::new(CountingSource::new());
        let clock = Arc::new(MutableClock::starting_now());
        let cache = cache_with(source.clone(), clock);

        cache.get(1).await.unwrap();
        cache.get(2).await.unwrap();
        cache.invalidate(1).unwrap();
        cache.get(1).await.unwrap();
        cache.get(2).await.unwrap();

        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalidate_many_and_absent_keys() {
        let source = Arc::new(CountingSource::new());
        let clock = Arc::new(MutableClock::starting_now());
        let cache = cache_with(source, clock);

        cache.get(1).await.unwrap();
        cache.get(2).await.unwrap();
        cache.invalidate_many(&[1, 2, 3]).unwrap();
        cache.invalidate(77).unwrap();

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_resolver_error_propagates_without_entry() {
        let source = Arc::new(CountingSource::failing());
        let clock = Arc::new(MutableClock::starting_now());
        let cache = cache_with(source.clone(), clock);

        let result = cache.get(1).await;
        assert!(matches!(result, Err(AccessError::DatabaseError(_))));
        assert!(cache.is_empty());

        let _ = cache.get(1).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let source = Arc::new(CountingSource::new());
        let clock = Arc::new(MutableClock::starting_now());
        let cache = cache_with(source, clock.clone());

        cache.get(1).await.unwrap();
        clock.advance(Duration::minutes(3));
        cache.get(2).await.unwrap();
        clock.advance(Duration::minutes(3));

        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }
}
