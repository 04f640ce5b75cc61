//! End-to-end behavior of the guard with in-memory storage

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bastion::{
    AuthOutcome, Bastion, BastionBuilder, Decision, DenialReason, GuardConfig, ManualClock,
    MemoryRepositoryProvider, NotificationEvent, Notifier, OutcomeStatus, SuccessContext,
};
use bastion_core::DispatchError;

#[derive(Default)]
struct CollectingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

#[async_trait]
impl Notifier for CollectingNotifier {
    fn name(&self) -> &str {
        "collector"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    fn name(&self) -> &str {
        "pager"
    }

    async fn notify(&self, _event: &NotificationEvent) -> Result<(), DispatchError> {
        Err(DispatchError::DeliveryFailed("gateway unreachable".to_string()))
    }
}

async fn memory_bastion(
    clock: Arc<ManualClock>,
    notifier: Arc<dyn Notifier>,
) -> Bastion<MemoryRepositoryProvider> {
    BastionBuilder::new()
        .with_clock(clock)
        .with_memory()
        .with_notifier(notifier)
        .with_cleanup(false)
        .build()
        .await
        .expect("Failed to build Bastion")
}

#[tokio::test]
async fn test_lockout_after_five_failures_and_expiry() {
    let clock = Arc::new(ManualClock::starting_now());
    let collector = Arc::new(CollectingNotifier::default());
    let bastion = memory_bastion(clock.clone(), collector.clone()).await;

    for expected in 1..=5 {
        assert!(bastion.evaluate_attempt("admin", "10.0.0.5").await.is_allowed());
        let status = bastion
            .record_outcome("admin", "10.0.0.5", AuthOutcome::Failure)
            .await;
        assert_eq!(
            status,
            OutcomeStatus::FailureRecorded {
                failed_attempts: expected
            }
        );
    }

    let Decision::Deny(denial) = bastion.evaluate_attempt("admin", "10.0.0.5").await else {
        panic!("sixth attempt should be denied");
    };
    assert_eq!(
        denial.message,
        "Too many failed login attempts. Please try again in 15 minutes."
    );
    assert!(matches!(
        denial.reason,
        DenialReason::Locked {
            failed_attempts: 5,
            ..
        }
    ));

    // Other pairs are unaffected
    assert!(bastion.evaluate_attempt("admin", "10.0.0.6").await.is_allowed());
    assert!(bastion.evaluate_attempt("editor", "10.0.0.5").await.is_allowed());

    let stats = bastion.stats().await.unwrap();
    assert_eq!(stats.blocked_attempts_total, 1);
    assert_eq!(stats.last_blocked_at, Some(clock_now(&clock)));

    let status = bastion.lockout_status("admin", "10.0.0.5").await.unwrap();
    assert!(status.is_locked);
    assert_eq!(status.failed_attempts, 5);

    clock.advance(chrono::Duration::minutes(15));

    assert!(bastion.evaluate_attempt("admin", "10.0.0.5").await.is_allowed());
    let status = bastion.lockout_status("admin", "10.0.0.5").await.unwrap();
    assert!(!status.is_locked);
    assert_eq!(status.failed_attempts, 0);

    bastion.shutdown().await;

    let events = collector.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        NotificationEvent::Blocked {
            identity,
            origin,
            failed_attempts,
            window,
            ..
        } => {
            assert_eq!(identity, "admin");
            assert_eq!(origin, "10.0.0.5");
            assert_eq!(*failed_attempts, 5);
            assert_eq!(window, "15 minutes");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

fn clock_now(clock: &ManualClock) -> chrono::DateTime<chrono::Utc> {
    use bastion::Clock;
    clock.now()
}

#[tokio::test]
async fn test_success_clears_failures_and_notifies() {
    let clock = Arc::new(ManualClock::starting_now());
    let collector = Arc::new(CollectingNotifier::default());
    let bastion = memory_bastion(clock, collector.clone()).await;

    for _ in 0..4 {
        bastion
            .record_outcome("admin", "10.0.0.5", AuthOutcome::Failure)
            .await;
    }

    let context = SuccessContext {
        roles: vec!["administrator".to_string()],
        user_agent: Some("Mozilla/5.0".to_string()),
    };
    let status = bastion
        .record_outcome("admin", "10.0.0.5", AuthOutcome::Success(context))
        .await;
    assert_eq!(status, OutcomeStatus::Cleared);

    let status = bastion.lockout_status("admin", "10.0.0.5").await.unwrap();
    assert_eq!(status.failed_attempts, 0);

    // The counter starts over after a success
    let status = bastion
        .record_outcome("admin", "10.0.0.5", AuthOutcome::Failure)
        .await;
    assert_eq!(status, OutcomeStatus::FailureRecorded { failed_attempts: 1 });

    bastion.shutdown().await;

    let events = collector.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        NotificationEvent::SuccessfulLogin {
            identity,
            roles,
            user_agent,
            ..
        } => {
            assert_eq!(identity, "admin");
            assert_eq!(roles, &vec!["administrator".to_string()]);
            assert_eq!(user_agent.as_deref(), Some("Mozilla/5.0"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_delivery_leaves_operator_notice() {
    let clock = Arc::new(ManualClock::starting_now());
    let bastion = memory_bastion(clock, Arc::new(FailingNotifier)).await;

    bastion
        .record_outcome(
            "admin",
            "10.0.0.5",
            AuthOutcome::Success(SuccessContext::default()),
        )
        .await;
    bastion.shutdown().await;

    let notice = bastion.take_notice().await.unwrap().expect("notice stored");
    assert!(notice.message.contains("successful login notification"));
    assert!(notice.message.contains("pager"));
    assert!(notice.message.contains("gateway unreachable"));

    assert!(bastion.take_notice().await.unwrap().is_none());
}

#[tokio::test]
async fn test_unlock_clears_lockout() {
    let clock = Arc::new(ManualClock::starting_now());
    let bastion = memory_bastion(clock, Arc::new(CollectingNotifier::default())).await;

    for _ in 0..5 {
        bastion
            .record_outcome("admin", "10.0.0.5", AuthOutcome::Failure)
            .await;
    }
    assert!(bastion.evaluate_attempt("admin", "10.0.0.5").await.is_denied());

    assert!(bastion.unlock("admin", "10.0.0.5").await.unwrap());
    assert!(bastion.evaluate_attempt("admin", "10.0.0.5").await.is_allowed());
    assert!(!bastion.unlock("admin", "10.0.0.5").await.unwrap());

    bastion.shutdown().await;
}

#[tokio::test]
async fn test_disabled_guard_allows_everything() {
    let bastion = BastionBuilder::new()
        .with_memory()
        .with_guard_config(GuardConfig::disabled())
        .build()
        .await
        .unwrap();

    for _ in 0..10 {
        let status = bastion
            .record_outcome("admin", "10.0.0.5", AuthOutcome::Failure)
            .await;
        assert_eq!(status, OutcomeStatus::Skipped);
    }
    assert!(bastion.evaluate_attempt("admin", "10.0.0.5").await.is_allowed());
    assert_eq!(bastion.stats().await.unwrap().blocked_attempts_total, 0);

    bastion.shutdown().await;
}

#[tokio::test]
async fn test_custom_threshold_and_window() {
    let config = GuardConfig {
        max_failed_attempts: 3,
        lockout_window: chrono::Duration::hours(1),
        ..GuardConfig::default()
    };
    let bastion = BastionBuilder::new()
        .with_memory()
        .with_guard_config(config)
        .build()
        .await
        .unwrap();

    for _ in 0..3 {
        bastion
            .record_outcome("admin", "10.0.0.5", AuthOutcome::Failure)
            .await;
    }

    let Decision::Deny(denial) = bastion.evaluate_attempt("admin", "10.0.0.5").await else {
        panic!("attempt after three failures should be denied");
    };
    assert_eq!(
        denial.message,
        "Too many failed login attempts. Please try again in 1 hour."
    );

    bastion.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_denials_are_all_counted() {
    let bastion = Arc::new(
        BastionBuilder::new()
            .with_memory()
            .with_cleanup(false)
            .build()
            .await
            .unwrap(),
    );

    let origins: Vec<String> = (0..20).map(|i| format!("10.0.1.{i}")).collect();
    for origin in &origins {
        for _ in 0..5 {
            bastion
                .record_outcome("admin", origin, AuthOutcome::Failure)
                .await;
        }
    }

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let bastion = Arc::clone(&bastion);
            let origin = origins[i % origins.len()].clone();
            tokio::spawn(async move { bastion.evaluate_attempt("admin", &origin).await })
        })
        .collect();

    let mut denied = 0;
    for handle in handles {
        if handle.await.unwrap().is_denied() {
            denied += 1;
        }
    }

    assert_eq!(denied, 100);
    assert_eq!(bastion.stats().await.unwrap().blocked_attempts_total, 100);

    bastion.shutdown().await;
}
