//! Guard and notification settings.
//!
//! Both structs can be built in code, from their `Default`, or from
//! `BASTION_*` environment variables via `from_env`.

use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT_MINUTES: i64 = 15;
pub const DEFAULT_STORE_TIMEOUT: StdDuration = StdDuration::from_secs(2);
pub const DEFAULT_CLEANUP_INTERVAL: StdDuration = StdDuration::from_secs(3600);
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// What the guard does when the attempt store cannot answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Reject the attempt.
    #[default]
    FailClosed,
    /// Let the attempt through to the authenticator.
    FailOpen,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-closed" | "closed" => Ok(FailurePolicy::FailClosed),
            "fail-open" | "open" => Ok(FailurePolicy::FailOpen),
            _ => Err(ConfigError::InvalidValue {
                key: "failure_policy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Lockout behaviour of the [`LoginGuard`](crate::services::LoginGuard).
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// When false every attempt is allowed and nothing is recorded.
    pub enabled: bool,
    /// Failures within the window after which attempts are denied.
    pub max_failed_attempts: u32,
    /// Sliding window; refreshed by every recorded failure.
    pub lockout_window: Duration,
    /// Upper bound for a single store call.
    pub store_timeout: StdDuration,
    pub failure_policy: FailurePolicy,
    /// How often the background task purges expired records.
    pub cleanup_interval: StdDuration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_window: Duration::minutes(DEFAULT_LOCKOUT_MINUTES),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            failure_policy: FailurePolicy::FailClosed,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl GuardConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Read overrides from the process environment.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `BASTION_RATE_LIMIT` | `false`/`0` disables the guard |
    /// | `BASTION_MAX_FAILED_ATTEMPTS` | threshold |
    /// | `BASTION_LOCKOUT_MINUTES` | window length |
    /// | `BASTION_STORE_TIMEOUT_MS` | store call timeout |
    /// | `BASTION_FAILURE_POLICY` | `fail-closed` or `fail-open` |
    /// | `BASTION_CLEANUP_INTERVAL_SECS` | purge interval |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("BASTION_RATE_LIMIT") {
            config.enabled = parse_flag("BASTION_RATE_LIMIT", &value)?;
        }
        if let Some(value) = lookup("BASTION_MAX_FAILED_ATTEMPTS") {
            config.max_failed_attempts = parse_positive("BASTION_MAX_FAILED_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("BASTION_LOCKOUT_MINUTES") {
            let minutes: u32 = parse_positive("BASTION_LOCKOUT_MINUTES", &value)?;
            config.lockout_window = Duration::minutes(i64::from(minutes));
        }
        if let Some(value) = lookup("BASTION_STORE_TIMEOUT_MS") {
            let millis: u64 = parse_positive("BASTION_STORE_TIMEOUT_MS", &value)?;
            config.store_timeout = StdDuration::from_millis(millis);
        }
        if let Some(value) = lookup("BASTION_FAILURE_POLICY") {
            config.failure_policy =
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "BASTION_FAILURE_POLICY".to_string(),
                        value: value.clone(),
                    })?;
        }
        if let Some(value) = lookup("BASTION_CLEANUP_INTERVAL_SECS") {
            let secs: u64 = parse_positive("BASTION_CLEANUP_INTERVAL_SECS", &value)?;
            config.cleanup_interval = StdDuration::from_secs(secs);
        }

        Ok(config)
    }

    /// The lockout window in words, e.g. "15 minutes".
    pub fn window_description(&self) -> String {
        describe_duration(self.lockout_window)
    }

    /// Message returned to the end user on a lockout denial.
    pub fn lockout_message(&self) -> String {
        format!(
            "Too many failed login attempts. Please try again in {}.",
            self.window_description()
        )
    }
}

/// Who gets told about blocked and successful logins, and how they are
/// addressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Mail recipient; mail delivery is skipped when unset.
    pub recipient: Option<String>,
    pub site_name: String,
    pub site_url: String,
    /// Events buffered between the guard and the delivery worker.
    pub queue_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recipient: None,
            site_name: "Bastion".to_string(),
            site_url: "http://localhost".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl NotificationConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Reads `BASTION_NOTIFICATIONS`, `BASTION_NOTIFY_EMAIL`,
    /// `BASTION_SITE_NAME`, `BASTION_SITE_URL` and `BASTION_NOTIFY_QUEUE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("BASTION_NOTIFICATIONS") {
            config.enabled = parse_flag("BASTION_NOTIFICATIONS", &value)?;
        }
        config.recipient = lookup("BASTION_NOTIFY_EMAIL").filter(|r| !r.trim().is_empty());
        if let Some(value) = lookup("BASTION_SITE_NAME") {
            config.site_name = value;
        }
        if let Some(value) = lookup("BASTION_SITE_URL") {
            config.site_url = value;
        }
        if let Some(value) = lookup("BASTION_NOTIFY_QUEUE") {
            config.queue_capacity = parse_positive("BASTION_NOTIFY_QUEUE", &value)?;
        }

        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn describe_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds();
    let (amount, unit) = if seconds > 0 && seconds % 3600 == 0 {
        (seconds / 3600, "hour")
    } else if seconds > 0 && seconds % 60 == 0 {
        (seconds / 60, "minute")
    } else {
        (seconds, "second")
    };

    if amount == 1 {
        format!("1 {unit}")
    } else {
        format!("{amount} {unit}s")
    }
}
