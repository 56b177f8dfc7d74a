//! Domain types shared by the restart controller and provider adapters.
//!
//! A `Unit` is one restartable thing (an ECS service, an MSK broker).
//! Providers report its condition as a `UnitStatus`; the controller turns
//! a sequence of statuses into exactly one `RestartOutcome` per unit.

use serde::{Deserialize, Serialize};

/// Opaque identifier for a restartable unit (service ARN, broker id).
pub type UnitId = String;

/// Identifier of the cluster a unit belongs to.
pub type ClusterRef = String;

// ── Unit ───────────────────────────────────────────────────────────

/// One restartable entity as returned by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    /// Human-friendly name for reports (falls back to `id`).
    pub name: Option<String>,
    pub cluster_ref: ClusterRef,
    /// Status observed at discovery time. Serves as the pre-restart baseline.
    pub current_state: UnitStatus,
    /// Unix timestamp (seconds) of the last provider-reported transition.
    pub last_transition_at: Option<u64>,
}

impl Unit {
    pub fn new(id: impl Into<String>, cluster_ref: impl Into<String>, current_state: UnitStatus) -> Self {
        Self {
            id: id.into(),
            name: None,
            cluster_ref: cluster_ref.into(),
            current_state,
            last_transition_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_last_transition(mut self, epoch_secs: u64) -> Self {
        self.last_transition_at = Some(epoch_secs);
        self
    }

    /// Name used in logs and reports.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// ── Status ─────────────────────────────────────────────────────────

/// Coarse classification of a provider status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPhase {
    /// Up and serving.
    Running,
    /// Starting, draining, provisioning, or otherwise in between.
    Transitioning,
    /// Terminal failure or stopped.
    Stopped,
}

/// A point-in-time status read for one unit.
///
/// Two reads are "the same" only when every field matches, so a new
/// task/operation revision counts as a change even if `state` does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    /// What is currently backing the unit (task ARN, operation ARN).
    pub revision: Option<String>,
    /// Raw provider status string, e.g. `RUNNING` or `UPDATE_IN_PROGRESS`.
    pub state: String,
    pub phase: StatusPhase,
    /// Failure reason reported by the provider, if any.
    pub reason: Option<String>,
}

impl UnitStatus {
    pub fn new(state: impl Into<String>, phase: StatusPhase) -> Self {
        Self {
            revision: None,
            state: state.into(),
            phase,
            reason: None,
        }
    }

    pub fn running(state: impl Into<String>) -> Self {
        Self::new(state, StatusPhase::Running)
    }

    pub fn transitioning(state: impl Into<String>) -> Self {
        Self::new(state, StatusPhase::Transitioning)
    }

    pub fn stopped(state: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            reason,
            ..Self::new(state, StatusPhase::Stopped)
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.phase == StatusPhase::Running
    }

    /// Reason to report when this status ends a restart as failed.
    pub fn failure_reason(&self) -> String {
        self.reason.clone().unwrap_or_else(|| self.state.clone())
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.state)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

// ── Outcomes ───────────────────────────────────────────────────────

/// Result of restarting a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestartOutcome {
    /// The unit came back healthy.
    Succeeded,
    /// The provider rejected the restart or the unit stopped with an error.
    Failed { reason: String },
    /// The unit never confirmed health within the per-unit timeout.
    TimedOut,
    /// The operator interrupted the plan while this unit was in flight.
    /// The provider-side restart may or may not complete.
    Cancelled,
}

impl RestartOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RestartOutcome::Succeeded)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RestartOutcome::Succeeded => "SUCCEEDED",
            RestartOutcome::Failed { .. } => "FAILED",
            RestartOutcome::TimedOut => "TIMED OUT",
            RestartOutcome::Cancelled => "CANCELLED",
        }
    }
}

/// Per-unit entry in a `PlanResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit_id: UnitId,
    pub name: Option<String>,
    pub outcome: RestartOutcome,
    /// Wall-clock time from restart issuance to the recorded outcome.
    pub elapsed_ms: u64,
    /// Successful probe reads.
    pub probes: u32,
    /// Probe calls that returned an error.
    pub probe_errors: u32,
}

impl UnitReport {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.unit_id)
    }
}

/// Aggregate result of executing a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOverall {
    /// Every unit succeeded.
    Completed,
    /// All units were attempted but at least one did not succeed.
    PartiallyCompleted,
    /// The plan stopped early (first failure or operator interrupt).
    Aborted,
}

impl PlanOverall {
    pub fn label(&self) -> &'static str {
        match self {
            PlanOverall::Completed => "COMPLETED",
            PlanOverall::PartiallyCompleted => "PARTIALLY COMPLETED",
            PlanOverall::Aborted => "ABORTED",
        }
    }
}

/// The authoritative report of a plan execution.
///
/// Every unit of the plan appears exactly once: in `reports` if it was
/// attempted, in `not_attempted` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub cluster_ref: ClusterRef,
    pub reports: Vec<UnitReport>,
    pub not_attempted: Vec<UnitId>,
    pub overall: PlanOverall,
}

impl PlanResult {
    pub fn outcomes(&self) -> Vec<&RestartOutcome> {
        self.reports.iter().map(|r| &r.outcome).collect()
    }

    pub fn attempted(&self) -> usize {
        self.reports.len()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn outcome_of(&self, unit_id: &str) -> Option<&RestartOutcome> {
        self.reports
            .iter()
            .find(|r| r.unit_id == unit_id)
            .map(|r| &r.outcome)
    }
}
