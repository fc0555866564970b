use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

/// Grant lifetime and blob fetch bounds.
#[derive(Debug, Deserialize)]
pub struct GrantsConfig {
    /// How long a share link stays valid, in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
    /// Upper bound on fetching an image for one view, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
}

impl GrantsConfig {
    pub fn ttl(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.ttl_hours))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

impl Default for GrantsConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            fetch_timeout_seconds: default_fetch_timeout(),
        }
    }
}

fn default_ttl_hours() -> u32 {
    24
}

fn default_fetch_timeout() -> u64 {
    10
}

/// Background sweep of expired grants.
#[derive(Debug, Deserialize)]
pub struct JanitorConfig {
    /// Whether to run the periodic sweep. `POST /api/cleanup` works either way.
    #[serde(default = "default_janitor_enabled")]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_janitor_interval")]
    pub interval_seconds: u64,
}

impl JanitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_janitor_enabled(),
            interval_seconds: default_janitor_interval(),
        }
    }
}

fn default_janitor_enabled() -> bool {
    true
}

fn default_janitor_interval() -> u64 {
    300
}
