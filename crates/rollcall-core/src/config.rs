//! rollcall.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// On-disk configuration. Every field is optional; CLI flags override it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollcallConfig {
    pub restart: Option<RestartSection>,
    pub aws: Option<AwsConfig>,
}

/// `[restart]` table. Durations are strings like `"5s"` or `"2m"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestartSection {
    pub per_unit_timeout: Option<String>,
    pub poll_interval: Option<String>,
    pub stop_on_first_failure: Option<bool>,
    pub probe_error_budget: Option<u32>,
    pub max_backoff: Option<String>,
    pub settle_time: Option<String>,
}

/// `[aws]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    pub profile: Option<String>,
    pub region: Option<String>,
}

/// Resolved execution settings for a restart plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartConfig {
    /// Maximum time from restart issuance to a healthy status.
    pub per_unit_timeout: Duration,
    /// Delay between status probes.
    pub poll_interval: Duration,
    /// Abort remaining units after the first non-successful outcome.
    pub stop_on_first_failure: bool,
    /// Consecutive probe errors tolerated before the unit is failed.
    pub probe_error_budget: u32,
    /// Upper bound for the probe interval while backing off on errors.
    pub max_backoff: Duration,
    /// Extra wait after a unit turns healthy, followed by a re-check.
    /// Zero disables the re-check.
    pub settle_time: Duration,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            per_unit_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
            stop_on_first_failure: true,
            probe_error_budget: 3,
            max_backoff: Duration::from_secs(60),
            settle_time: Duration::ZERO,
        }
    }
}

impl RollcallConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the `[restart]` table on top of the defaults.
    pub fn restart_config(&self) -> Result<RestartConfig, ConfigError> {
        let mut cfg = RestartConfig::default();
        let Some(section) = &self.restart else {
            return Ok(cfg);
        };

        if let Some(v) = &section.per_unit_timeout {
            cfg.per_unit_timeout = duration_field("per_unit_timeout", v)?;
        }
        if let Some(v) = &section.poll_interval {
            cfg.poll_interval = duration_field("poll_interval", v)?;
        }
        if let Some(v) = &section.max_backoff {
            cfg.max_backoff = duration_field("max_backoff", v)?;
        }
        if let Some(v) = &section.settle_time {
            cfg.settle_time = duration_field("settle_time", v)?;
        }
        if let Some(stop) = section.stop_on_first_failure {
            cfg.stop_on_first_failure = stop;
        }
        if let Some(budget) = section.probe_error_budget {
            cfg.probe_error_budget = budget;
        }
        Ok(cfg)
    }
}

fn duration_field(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}

/// Parse a duration string like "5s", "500ms", "2m", or bare seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
