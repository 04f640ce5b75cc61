//! Background delivery of [`NotificationEvent`]s.
//!
//! The guard publishes into a bounded queue through a [`DispatcherHandle`];
//! a single worker task drains it and hands every event to each registered
//! [`Notifier`]. A failed delivery is retried once. If the retry fails too the
//! event is dropped for that notifier and an [`OperatorNotice`] is stored so
//! the failure is visible to whoever administers the site.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    config::DEFAULT_QUEUE_CAPACITY,
    error::DispatchError,
    events::{EventSink, NotificationEvent, Notifier},
    repositories::{NoticeRepository, RepositoryProvider},
    storage::OperatorNotice,
};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Producer side of the dispatcher queue.
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<NotificationEvent>,
}

impl DispatcherHandle {
    /// Queue an event without waiting, reporting why it was dropped.
    pub fn try_publish(&self, event: NotificationEvent) -> Result<(), DispatchError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::QueueClosed,
        })
    }
}

impl EventSink for DispatcherHandle {
    fn publish(&self, event: NotificationEvent) {
        let kind = event.kind();
        if let Err(error) = self.try_publish(event) {
            tracing::warn!(kind = kind, error = %error, "Dropping notification event");
        }
    }
}

pub struct NotificationDispatcher<R: RepositoryProvider> {
    repositories: Arc<R>,
    notifiers: Vec<Arc<dyn Notifier>>,
    capacity: usize,
    retry_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl<R: RepositoryProvider> NotificationDispatcher<R> {
    pub fn new(repositories: Arc<R>) -> Self {
        Self {
            repositories,
            notifiers: Vec::new(),
            capacity: DEFAULT_QUEUE_CAPACITY,
            retry_delay: DEFAULT_RETRY_DELAY,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Pause between a failed delivery and its retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn the worker.
    ///
    /// The worker stops when `shutdown` changes, after delivering whatever is
    /// already queued, or when every handle has been dropped.
    pub fn spawn(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> (DispatcherHandle, tokio::task::JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel(self.capacity);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = receiver.recv() => {
                        match event {
                            Some(event) => self.dispatch(event).await,
                            None => break,
                        }
                    }
                    _ = shutdown.changed() => {
                        receiver.close();
                        while let Some(event) = receiver.recv().await {
                            self.dispatch(event).await;
                        }
                        tracing::info!("Shutting down notification dispatcher");
                        break;
                    }
                }
            }
        });

        (DispatcherHandle { sender }, task)
    }

    async fn dispatch(&self, event: NotificationEvent) {
        let event_id = Uuid::new_v4();

        for notifier in &self.notifiers {
            let first = match notifier.notify(&event).await {
                Ok(()) => continue,
                Err(e) => e,
            };

            tracing::warn!(
                event_id = %event_id,
                notifier = notifier.name(),
                kind = event.kind(),
                error = %first,
                "Notification delivery failed, retrying"
            );
            tokio::time::sleep(self.retry_delay).await;

            if let Err(e) = notifier.notify(&event).await {
                tracing::error!(
                    event_id = %event_id,
                    notifier = notifier.name(),
                    kind = event.kind(),
                    occurred_at = %event.occurred_at(),
                    error = %e,
                    "Notification dropped after retry"
                );

                let notice = OperatorNotice {
                    message: format!(
                        "Failed to deliver {} notification via {}: {e}",
                        event.kind().replace('_', " "),
                        notifier.name()
                    ),
                    recorded_at: self.clock.now(),
                };
                if let Err(e) = self.repositories.notices().set_notice(notice).await {
                    tracing::error!(error = %e, "Failed to store operator notice");
                }
            }
        }
    }
}
