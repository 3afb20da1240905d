//! Configuration types for cryptal-tasker

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for transient request failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts per request, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 2 seconds)
    #[serde(default = "default_initial_backoff", with = "duration_millis_serde")]
    pub initial_backoff: Duration,

    /// Cap on the delay between retries (default: 60 seconds)
    #[serde(default = "default_max_backoff", with = "duration_millis_serde")]
    pub max_backoff: Duration,

    /// Multiplier applied to the backoff after each failed attempt (default: 1.5)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to each backoff delay (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Fixed pacing delays bounding the outbound request rate
///
/// There is no adaptive throttling; these sleeps are the only backpressure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Delay after every task, regardless of outcome (default: 2 seconds)
    #[serde(default = "default_task_delay", with = "duration_secs_serde")]
    pub task_delay: Duration,

    /// Delay between accounts (default: 5 seconds)
    #[serde(default = "default_account_delay", with = "duration_secs_serde")]
    pub account_delay: Duration,

    /// Sleep between full cycles (default: 24 hours)
    #[serde(default = "default_cycle_interval", with = "duration_secs_serde")]
    pub cycle_interval: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            task_delay: default_task_delay(),
            account_delay: default_account_delay(),
            cycle_interval: default_cycle_interval(),
        }
    }
}

/// Run configuration owned by the orchestrator
///
/// Immutable for the duration of a run; there is no process-wide mutable
/// state. Proxy assignment is derived from the account index, see
/// [`RunConfig::proxy_for_account`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Base URL of the reward API (default: the production host)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// External IP-lookup endpoint, called without auth headers
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,

    /// Whether to route account traffic through proxies
    #[serde(default)]
    pub use_proxy: bool,

    /// Proxy URIs assigned to accounts by round robin
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Retry policy for every request
    #[serde(default)]
    pub retry: RetryConfig,

    /// Fixed pacing delays
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ip_lookup_url: default_ip_lookup_url(),
            use_proxy: false,
            proxies: Vec::new(),
            retry: RetryConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

impl RunConfig {
    /// Proxy for the account at `index`, assigned round robin
    ///
    /// Returns `None` when proxy usage is disabled or no proxies are loaded.
    pub fn proxy_for_account(&self, index: usize) -> Option<&str> {
        if !self.use_proxy || self.proxies.is_empty() {
            return None;
        }
        Some(self.proxies[index % self.proxies.len()].as_str())
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(2000)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_task_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_account_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_cycle_interval() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_base_url() -> String {
    "https://api.cryptal.ai".to_string()
}

fn default_ip_lookup_url() -> String {
    "https://api.ipify.org?format=json".to_string()
}

// Duration serialization helper (whole seconds)
mod duration_secs_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second backoffs)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
