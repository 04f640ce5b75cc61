//! Repository traits for the guard's storage.
//!
//! Each `*Repository` trait covers one kind of state. A backend exposes its
//! implementations through the `*Provider` traits, and [`RepositoryProvider`]
//! combines them with lifecycle methods so the guard and the facade can be
//! generic over a single type parameter.

pub mod attempt;
pub mod counters;
pub mod memory;

pub use attempt::AttemptStore;
pub use counters::{CounterRepository, NoticeRepository};
pub use memory::{
    MemoryAttemptStore, MemoryCounterRepository, MemoryNoticeRepository,
    MemoryRepositoryProvider,
};

use async_trait::async_trait;

use crate::Error;

pub trait AttemptStoreProvider: Send + Sync + 'static {
    type AttemptRepo: AttemptStore;

    fn attempts(&self) -> &Self::AttemptRepo;
}

pub trait CounterRepositoryProvider: Send + Sync + 'static {
    type CounterRepo: CounterRepository;

    fn counters(&self) -> &Self::CounterRepo;
}

pub trait NoticeRepositoryProvider: Send + Sync + 'static {
    type NoticeRepo: NoticeRepository;

    fn notices(&self) -> &Self::NoticeRepo;
}

/// Everything the guard needs from a storage backend.
///
/// # Example
///
/// ```rust,ignore
/// struct MyStorage { attempts: MyAttempts, counters: MyCounters, notices: MyNotices }
///
/// impl AttemptStoreProvider for MyStorage {
///     type AttemptRepo = MyAttempts;
///     fn attempts(&self) -> &Self::AttemptRepo { &self.attempts }
/// }
///
/// // ... CounterRepositoryProvider, NoticeRepositoryProvider ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { Ok(()) }
///     async fn health_check(&self) -> Result<(), Error> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    AttemptStoreProvider + CounterRepositoryProvider + NoticeRepositoryProvider
{
    /// Create or upgrade whatever schema the backend needs.
    async fn migrate(&self) -> Result<(), Error>;

    async fn health_check(&self) -> Result<(), Error>;
}
