//! Error taxonomy for rolling restarts.
//!
//! Each collaborator has its own error type so the controller can treat
//! them differently: discovery errors abort before anything is touched,
//! restart errors fail a single unit, probe errors are transient.

use thiserror::Error;

/// Resource discovery failed. Fatal: no restart is attempted.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cluster not found: {0}")]
    NotFound(String),

    #[error("no restartable units in cluster: {0}")]
    Empty(String),

    #[error("discovery failed: {0}")]
    Provider(String),
}

/// The restart request itself failed. Fatal for that unit, never retried.
#[derive(Debug, Error)]
pub enum RestartActionError {
    #[error("restart rejected: {0}")]
    Rejected(String),

    #[error("restart request failed: {0}")]
    Provider(String),
}

/// A status read failed. Transient: retried up to the probe error budget.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("status unavailable: {0}")]
    Unavailable(String),

    #[error("probe failed: {0}")]
    Provider(String),
}

/// Building a restart plan failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("plan has no units")]
    Empty,

    #[error("unit not found in cluster: {0}")]
    UnknownUnit(String),

    #[error("unit listed twice: {0}")]
    DuplicateUnit(String),
}

/// Loading `rollcall.toml` failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },
}
