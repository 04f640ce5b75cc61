//! Repository traits for site-wide state: lockout statistics and the
//! operator notice slot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    storage::{GlobalCounters, OperatorNotice},
};

#[async_trait]
pub trait CounterRepository: Send + Sync + 'static {
    /// Current statistics. A fresh store reports zero and no timestamp.
    async fn counters(&self) -> Result<GlobalCounters, Error>;

    /// Atomically add one blocked attempt and set `last_blocked_at`.
    async fn record_blocked(&self, at: DateTime<Utc>) -> Result<GlobalCounters, Error>;
}

/// Single slot holding the latest notification delivery failure.
#[async_trait]
pub trait NoticeRepository: Send + Sync + 'static {
    /// Replace whatever notice is stored.
    async fn set_notice(&self, notice: OperatorNotice) -> Result<(), Error>;

    /// Read and remove the stored notice.
    async fn take_notice(&self) -> Result<Option<OperatorNotice>, Error>;
}
