//! Per-unit polling state machine.
//!
//! The tracker never reads a clock. The controller hands it elapsed time
//! since the restart was issued, which keeps every transition testable
//! with plain values.

use std::time::Duration;

use tracing::{debug, warn};

use rollcall_core::{ProbeError, RestartConfig, RestartOutcome, StatusPhase, UnitStatus};

/// Polling state of the in-flight unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// No status change seen since the restart was issued.
    Pending,
    /// A status different from the baseline was read; the restart took effect.
    Observed,
    /// Terminal: running again after the transition.
    Healthy,
    /// Terminal: the unit reported a stopped/failed status.
    Stopped { reason: String },
    /// Terminal: no terminal status before the per-unit timeout.
    TimedOut,
    /// Terminal: the probe error budget was exhausted.
    ProbeFailed { reason: String },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Pending | PollState::Observed)
    }
}

/// Tracks probe results for one unit after its restart.
#[derive(Debug)]
pub struct PollTracker {
    state: PollState,
    /// Last successfully read status; starts as the pre-restart baseline.
    last_seen: UnitStatus,
    timeout: Duration,
    /// Consecutive probe errors.
    consecutive_errors: u32,
    error_budget: u32,
    base_interval: Duration,
    current_backoff: Duration,
    max_backoff: Duration,
    probes: u32,
    probe_errors: u32,
}

impl PollTracker {
    /// Create a tracker for a unit whose pre-restart status was `baseline`.
    pub fn new(baseline: UnitStatus, config: &RestartConfig) -> Self {
        Self {
            state: PollState::Pending,
            last_seen: baseline,
            timeout: config.per_unit_timeout,
            consecutive_errors: 0,
            error_budget: config.probe_error_budget.max(1),
            base_interval: config.poll_interval,
            current_backoff: config.poll_interval,
            max_backoff: config.max_backoff.max(config.poll_interval),
            probes: 0,
            probe_errors: 0,
        }
    }

    /// Record a successful status read.
    pub fn record_status(&mut self, status: UnitStatus, elapsed: Duration) -> &PollState {
        if self.state.is_terminal() {
            return &self.state;
        }

        self.probes += 1;
        self.consecutive_errors = 0;
        self.current_backoff = self.base_interval;

        if status != self.last_seen {
            if self.state == PollState::Pending {
                debug!(state = %status, "restart observed");
                self.state = PollState::Observed;
            }
            self.last_seen = status;
        }

        if self.state == PollState::Observed {
            match self.last_seen.phase {
                StatusPhase::Running => {
                    debug!(state = %self.last_seen, "unit healthy");
                    self.state = PollState::Healthy;
                }
                StatusPhase::Stopped => {
                    let reason = self.last_seen.failure_reason();
                    debug!(%reason, "unit stopped");
                    self.state = PollState::Stopped { reason };
                }
                StatusPhase::Transitioning => {}
            }
        }

        self.check_deadline(elapsed)
    }

    /// Record a failed status read. Does not change state unless the
    /// error budget is exhausted or time is up.
    pub fn record_error(&mut self, error: &ProbeError, elapsed: Duration) -> &PollState {
        if self.state.is_terminal() {
            return &self.state;
        }

        self.probe_errors += 1;
        self.consecutive_errors += 1;
        self.current_backoff = (self.current_backoff * 2).min(self.max_backoff);

        if self.consecutive_errors >= self.error_budget {
            warn!(
                errors = self.consecutive_errors,
                budget = self.error_budget,
                "probe error budget exhausted"
            );
            self.state = PollState::ProbeFailed {
                reason: format!(
                    "health probe failed {} consecutive times: {error}",
                    self.consecutive_errors
                ),
            };
            return &self.state;
        }

        self.check_deadline(elapsed)
    }

    /// Move to `TimedOut` if the unit is still unresolved at `elapsed`.
    pub fn check_deadline(&mut self, elapsed: Duration) -> &PollState {
        if !self.state.is_terminal() && elapsed >= self.timeout {
            self.state = PollState::TimedOut;
        }
        &self.state
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// The last status read (or the baseline if nothing changed).
    pub fn last_seen(&self) -> &UnitStatus {
        &self.last_seen
    }

    /// Delay before the next probe. Doubles on consecutive errors.
    pub fn next_interval(&self) -> Duration {
        self.current_backoff
    }

    pub fn probes(&self) -> u32 {
        self.probes
    }

    pub fn probe_errors(&self) -> u32 {
        self.probe_errors
    }

    /// Outcome for the unit, once the state is terminal.
    pub fn outcome(&self) -> Option<RestartOutcome> {
        match &self.state {
            PollState::Pending | PollState::Observed => None,
            PollState::Healthy => Some(RestartOutcome::Succeeded),
            PollState::Stopped { reason } | PollState::ProbeFailed { reason } => {
                Some(RestartOutcome::failed(reason.clone()))
            }
            PollState::TimedOut => Some(RestartOutcome::TimedOut),
        }
    }
}
