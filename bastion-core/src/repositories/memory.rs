//! In-process storage backend.
//!
//! Nothing here survives a restart, so lockout statistics reset with the
//! process. Suitable for single-instance deployments and tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    Error,
    clock::{Clock, SystemClock},
    repositories::{
        AttemptStore, AttemptStoreProvider, CounterRepository, CounterRepositoryProvider,
        NoticeRepository, NoticeRepositoryProvider, RepositoryProvider,
    },
    storage::{AttemptKey, AttemptRecord, GlobalCounters, OperatorNotice},
};

/// Attempt counters in a sharded concurrent map.
///
/// Increments go through the map's entry API, which holds the shard lock for
/// the whole read-modify-write.
pub struct MemoryAttemptStore {
    records: DashMap<AttemptKey, AttemptRecord>,
    clock: Arc<dyn Clock>,
}

impl MemoryAttemptStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            clock,
        }
    }

    /// Number of physically stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryAttemptStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn get_record(&self, key: &AttemptKey) -> Result<Option<AttemptRecord>, Error> {
        let now = self.clock.now();
        let found = self.records.get(key).map(|r| r.value().clone());

        match found {
            Some(record) if record.is_expired(now) => {
                self.records.remove_if(key, |_, r| r.is_expired(now));
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn increment_with_ttl(&self, key: &AttemptKey, ttl: Duration) -> Result<u32, Error> {
        let now = self.clock.now();
        let mut record = self.records.entry(key.clone()).or_insert(AttemptRecord {
            failure_count: 0,
            expires_at: now,
        });

        if record.is_expired(now) {
            record.failure_count = 0;
        }
        record.failure_count = record.failure_count.saturating_add(1);
        record.expires_at = now + ttl;

        Ok(record.failure_count)
    }

    async fn clear(&self, key: &AttemptKey) -> Result<(), Error> {
        self.records.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let now = self.clock.now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        Ok(before.saturating_sub(self.records.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryCounterRepository {
    counters: Mutex<GlobalCounters>,
}

#[async_trait]
impl CounterRepository for MemoryCounterRepository {
    async fn counters(&self) -> Result<GlobalCounters, Error> {
        Ok(self.counters.lock().await.clone())
    }

    async fn record_blocked(&self, at: DateTime<Utc>) -> Result<GlobalCounters, Error> {
        let mut counters = self.counters.lock().await;
        counters.blocked_attempts_total += 1;
        counters.last_blocked_at = Some(at);
        Ok(counters.clone())
    }
}

#[derive(Default)]
pub struct MemoryNoticeRepository {
    notice: Mutex<Option<OperatorNotice>>,
}

#[async_trait]
impl NoticeRepository for MemoryNoticeRepository {
    async fn set_notice(&self, notice: OperatorNotice) -> Result<(), Error> {
        *self.notice.lock().await = Some(notice);
        Ok(())
    }

    async fn take_notice(&self) -> Result<Option<OperatorNotice>, Error> {
        Ok(self.notice.lock().await.take())
    }
}

pub struct MemoryRepositoryProvider {
    attempts: MemoryAttemptStore,
    counters: MemoryCounterRepository,
    notices: MemoryNoticeRepository,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: MemoryAttemptStore::new(clock),
            counters: MemoryCounterRepository::default(),
            notices: MemoryNoticeRepository::default(),
        }
    }
}

impl Default for MemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptStoreProvider for MemoryRepositoryProvider {
    type AttemptRepo = MemoryAttemptStore;

    fn attempts(&self) -> &Self::AttemptRepo {
        &self.attempts
    }
}

impl CounterRepositoryProvider for MemoryRepositoryProvider {
    type CounterRepo = MemoryCounterRepository;

    fn counters(&self) -> &Self::CounterRepo {
        &self.counters
    }
}

impl NoticeRepositoryProvider for MemoryRepositoryProvider {
    type NoticeRepo = MemoryNoticeRepository;

    fn notices(&self) -> &Self::NoticeRepo {
        &self.notices
    }
}

#[async_trait]
impl RepositoryProvider for MemoryRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (MemoryAttemptStore, ManualClock) {
        let clock = ManualClock::starting_now();
        (MemoryAttemptStore::new(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_increment_creates_then_counts() {
        let (store, _clock) = store();
        let key = AttemptKey::new("admin", "10.0.0.5");

        assert_eq!(store.get(&key).await.unwrap(), None);
        assert_eq!(
            store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap(),
            1
        );
        assert_eq!(
            store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap(),
            2
        );
        assert_eq!(store.get(&key).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_increment_slides_expiry() {
        let (store, clock) = store();
        let key = AttemptKey::new("admin", "10.0.0.5");

        store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap();
        clock.advance(Duration::minutes(10));
        store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap();

        let record = store.get_record(&key).await.unwrap().unwrap();
        assert_eq!(record.expires_at, clock.now() + Duration::minutes(15));

        clock.advance(Duration::minutes(10));
        assert_eq!(store.get(&key).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_expired_record_is_absent_and_restarts() {
        let (store, clock) = store();
        let key = AttemptKey::new("admin", "10.0.0.5");

        for _ in 0..3 {
            store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap();
        }
        clock.advance(Duration::minutes(15));

        assert_eq!(store.get(&key).await.unwrap(), None);
        assert_eq!(
            store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_expired_record_restarts_without_read() {
        let (store, clock) = store();
        let key = AttemptKey::new("admin", "10.0.0.5");

        store.increment_with_ttl(&key, Duration::minutes(1)).await.unwrap();
        store.increment_with_ttl(&key, Duration::minutes(1)).await.unwrap();
        clock.advance(Duration::minutes(2));

        assert_eq!(
            store.increment_with_ttl(&key, Duration::minutes(1)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (store, _clock) = store();
        let key = AttemptKey::new("admin", "10.0.0.5");

        store.clear(&key).await.unwrap();
        store.increment_with_ttl(&key, Duration::minutes(15)).await.unwrap();
        store.clear(&key).await.unwrap();
        store.clear(&key).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_expired_only_removes_expired() {
        let (store, clock) = store();
        let old = AttemptKey::new("old", "10.0.0.1");
        let fresh = AttemptKey::new("fresh", "10.0.0.2");

        store.increment_with_ttl(&old, Duration::minutes(5)).await.unwrap();
        clock.advance(Duration::minutes(10));
        store.increment_with_ttl(&fresh, Duration::minutes(5)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&fresh).await.unwrap(), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryAttemptStore::default());
        let key = AttemptKey::new("admin", "10.0.0.5");

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move {
                    store
                        .increment_with_ttl(&key, Duration::minutes(15))
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get(&key).await.unwrap(), Some(100));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_blocked_records_are_not_lost() {
        let repo = Arc::new(MemoryCounterRepository::default());

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.record_blocked(Utc::now()).await.unwrap() })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.counters().await.unwrap().blocked_attempts_total, 100);
    }

    #[tokio::test]
    async fn test_counters_and_notices() {
        let provider = MemoryRepositoryProvider::new();
        assert_eq!(
            provider.counters().counters().await.unwrap(),
            GlobalCounters::default()
        );

        let at = Utc::now();
        provider.counters().record_blocked(at).await.unwrap();
        let counters = provider.counters().record_blocked(at).await.unwrap();
        assert_eq!(counters.blocked_attempts_total, 2);
        assert_eq!(counters.last_blocked_at, Some(at));

        assert!(provider.notices().take_notice().await.unwrap().is_none());
        provider
            .notices()
            .set_notice(OperatorNotice {
                message: "smtp down".to_string(),
                recorded_at: at,
            })
            .await
            .unwrap();
        let notice = provider.notices().take_notice().await.unwrap().unwrap();
        assert_eq!(notice.message, "smtp down");
        assert!(provider.notices().take_notice().await.unwrap().is_none());
    }
}
