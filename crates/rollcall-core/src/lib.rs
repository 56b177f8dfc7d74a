//! rollcall-core: shared types for rolling restarts.
//!
//! Defines the unit/status data model, the outcome and result types
//! reported by the restart controller, the error taxonomy, and the
//! collaborator traits that provider adapters implement.

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::{parse_duration, AwsConfig, RestartConfig, RollcallConfig};
pub use error::{ConfigError, DiscoveryError, PlanError, ProbeError, RestartActionError};
pub use provider::{Discovery, HealthProbe, RestartAction};
pub use types::*;
