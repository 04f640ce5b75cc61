//! Records held by the attempt and counter stores.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::fingerprint;

/// Fingerprint of an `(identity, origin)` pair.
///
/// Only the digest is kept; neither `Debug` nor `Display` can leak the inputs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptKey(String);

impl AttemptKey {
    pub fn new(identity: &str, origin: &str) -> Self {
        Self(fingerprint(identity, origin))
    }

    /// Wrap an already computed fingerprint, e.g. one read back from storage.
    pub fn from_fingerprint(fingerprint: impl Into<String>) -> Self {
        Self(fingerprint.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttemptKey").field(&self.0).finish()
    }
}

/// Failure counter for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub failure_count: u32,
    pub expires_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Site-wide lockout statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCounters {
    /// One per denial caused by the lockout threshold.
    pub blocked_attempts_total: u64,
    pub last_blocked_at: Option<DateTime<Utc>>,
}

/// The most recent notification delivery failure, kept for an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorNotice {
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// Lockout state of an `(identity, origin)` pair at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutStatus {
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    pub fn unlocked() -> Self {
        Self {
            failed_attempts: 0,
            is_locked: false,
            locked_until: None,
        }
    }

    /// Seconds until the lock lifts, rounded up, or `None` when not locked.
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        if !self.is_locked {
            return None;
        }
        let until = self.locked_until?;
        let millis = (until - now).num_milliseconds();
        if millis <= 0 {
            return Some(0);
        }
        Some((millis as u64).div_ceil(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_key_formatting_hides_inputs() {
        let key = AttemptKey::new("admin", "10.0.0.5");
        let shown = format!("{key} {key:?}");
        assert!(!shown.contains("admin"));
        assert!(!shown.contains("10.0.0.5"));
        assert_eq!(key.to_string(), fingerprint("admin", "10.0.0.5"));
    }

    #[test]
    fn test_key_equality() {
        assert_eq!(
            AttemptKey::new("admin", "10.0.0.5"),
            AttemptKey::from_fingerprint(fingerprint("admin", "10.0.0.5"))
        );
        assert_ne!(
            AttemptKey::new("admin", "10.0.0.5"),
            AttemptKey::new("admin", "10.0.0.6")
        );
    }

    #[test]
    fn test_record_expiry_is_inclusive() {
        let now = Utc::now();
        let record = AttemptRecord {
            failure_count: 1,
            expires_at: now,
        };
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn test_retry_after_seconds() {
        let now = Utc::now();
        let status = LockoutStatus {
            failed_attempts: 5,
            is_locked: true,
            locked_until: Some(now + Duration::milliseconds(1500)),
        };
        assert_eq!(status.retry_after_seconds(now), Some(2));
        assert_eq!(
            status.retry_after_seconds(now + Duration::seconds(5)),
            Some(0)
        );
        assert_eq!(LockoutStatus::unlocked().retry_after_seconds(now), None);
    }
}
