//! Collaborator traits implemented by provider adapters.
//!
//! The controller only ever talks to these three seams, which keeps the
//! restart logic independent of any SDK and lets tests script providers.

use async_trait::async_trait;

use crate::error::{DiscoveryError, ProbeError, RestartActionError};
use crate::types::{Unit, UnitStatus};

/// Lists the restartable units of a cluster, in restart order.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Fails with `DiscoveryError::NotFound` for an unknown cluster and
    /// `DiscoveryError::Empty` when the cluster has no units.
    async fn discover(&self, cluster_ref: &str) -> Result<Vec<Unit>, DiscoveryError>;
}

/// Triggers a provider-side restart of one unit. Fire-and-forget.
#[async_trait]
pub trait RestartAction: Send + Sync {
    async fn restart(&self, unit: &Unit) -> Result<(), RestartActionError>;
}

/// Reads the current status of one unit.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, unit: &Unit) -> Result<UnitStatus, ProbeError>;
}
