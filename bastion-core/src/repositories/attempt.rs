//! Repository trait for per-key failure counters.

use async_trait::async_trait;
use chrono::Duration;

use crate::{
    Error,
    storage::{AttemptKey, AttemptRecord},
};

/// Key/counter store with expiry.
///
/// A record whose `expires_at` has passed is treated as absent by every read,
/// whether or not it has been physically removed yet. A backend that cannot
/// answer must return `Error::Store`; it must never report a failure as an
/// absent record.
#[async_trait]
pub trait AttemptStore: Send + Sync + 'static {
    /// Failure count of an unexpired record.
    async fn get(&self, key: &AttemptKey) -> Result<Option<u32>, Error> {
        Ok(self.get_record(key).await?.map(|r| r.failure_count))
    }

    /// The unexpired record for `key`, if any.
    async fn get_record(&self, key: &AttemptKey) -> Result<Option<AttemptRecord>, Error>;

    /// Atomically increment the counter for `key` and move its expiry to
    /// `now + ttl`.
    ///
    /// An absent or expired record starts over at 1. Concurrent calls for the
    /// same key must all be counted.
    ///
    /// # Returns
    ///
    /// The count after the increment.
    async fn increment_with_ttl(&self, key: &AttemptKey, ttl: Duration) -> Result<u32, Error>;

    /// Remove the record for `key`. Removing an absent key is not an error.
    async fn clear(&self, key: &AttemptKey) -> Result<(), Error>;

    /// Physically delete expired records.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn purge_expired(&self) -> Result<u64, Error>;
}
