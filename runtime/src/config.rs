//! Configuration for the admission coordinator.
//!
//! Loads from environment variables with sensible defaults; every field can
//! also be set directly when embedding the engine.

use std::env;
use std::time::Duration;

/// Runtime knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long a caller may wait for a party's exclusive section before the
    /// operation fails transiently with zero side effects.
    pub lock_timeout: Duration,
    /// Retry attempts for optimistic-concurrency conflicts (initial attempt
    /// included).
    pub max_attempts: usize,
    /// Delay before the first conflict retry.
    pub retry_initial_delay: Duration,
    /// Cap on the exponential conflict-retry backoff.
    pub retry_max_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            max_attempts: 4,
            retry_initial_delay: Duration::from_millis(10),
            retry_max_delay: Duration::from_millis(250),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `PARTY_LOCK_TIMEOUT_MS` | 5000 |
    /// | `PARTY_MAX_ATTEMPTS` | 4 |
    /// | `PARTY_RETRY_INITIAL_DELAY_MS` | 10 |
    /// | `PARTY_RETRY_MAX_DELAY_MS` | 250 |
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lock_timeout: env_duration_ms("PARTY_LOCK_TIMEOUT_MS", defaults.lock_timeout),
            max_attempts: env_parse("PARTY_MAX_ATTEMPTS", defaults.max_attempts),
            retry_initial_delay: env_duration_ms(
                "PARTY_RETRY_INITIAL_DELAY_MS",
                defaults.retry_initial_delay,
            ),
            retry_max_delay: env_duration_ms("PARTY_RETRY_MAX_DELAY_MS", defaults.retry_max_delay),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .map_or(default, Duration::from_millis)
}
