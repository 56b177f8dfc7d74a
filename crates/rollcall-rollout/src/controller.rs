//! Rolling restart controller: drives a plan one unit at a time.
//!
//! For each unit the controller issues the restart, then polls the probe
//! until the `PollTracker` reaches a terminal state. The next unit is only
//! touched after the current one has an outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use rollcall_core::{
    HealthProbe, PlanOverall, PlanResult, RestartAction, RestartConfig, RestartOutcome, Unit,
    UnitReport,
};

use crate::plan::RestartPlan;
use crate::tracker::PollTracker;

/// Executes restart plans against injected collaborators.
pub struct RollingRestartController {
    restarter: Arc<dyn RestartAction>,
    prober: Arc<dyn HealthProbe>,
    /// Operator interrupt. `true` means stop at the next poll boundary.
    shutdown: Option<watch::Receiver<bool>>,
}

impl RollingRestartController {
    pub fn new(restarter: Arc<dyn RestartAction>, prober: Arc<dyn HealthProbe>) -> Self {
        Self {
            restarter,
            prober,
            shutdown: None,
        }
    }

    /// Attach a shutdown signal for cooperative cancellation.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Execute a plan to completion (or abort) and report every unit.
    pub async fn execute(&self, plan: RestartPlan) -> PlanResult {
        let mut interrupt = Interrupt::new(self.shutdown.clone());
        let config = plan.config().clone();
        let units = plan.units();

        info!(
            cluster = %plan.cluster_ref(),
            units = units.len(),
            timeout_secs = config.per_unit_timeout.as_secs(),
            stop_on_first_failure = config.stop_on_first_failure,
            "starting rolling restart"
        );

        let mut reports: Vec<UnitReport> = Vec::with_capacity(units.len());
        let mut aborted = false;

        for (index, unit) in units.iter().enumerate() {
            if interrupt.is_set() {
                warn!(unit = %unit.display_name(), "interrupted before restart");
                aborted = true;
                break;
            }

            debug!(
                unit = %unit.display_name(),
                position = index + 1,
                total = units.len(),
                "next unit"
            );

            let report = self.restart_unit(unit, &config, &mut interrupt).await;
            let outcome = report.outcome.clone();
            reports.push(report);

            if outcome == RestartOutcome::Cancelled {
                aborted = true;
                break;
            }
            if !outcome.is_success() && config.stop_on_first_failure {
                warn!(
                    unit = %unit.display_name(),
                    remaining = units.len() - index - 1,
                    "aborting plan after failed unit"
                );
                aborted = true;
                break;
            }
        }

        let not_attempted: Vec<String> = units[reports.len()..]
            .iter()
            .map(|u| u.id.clone())
            .collect();

        let overall = if aborted {
            PlanOverall::Aborted
        } else if reports.iter().all(|r| r.outcome.is_success()) {
            PlanOverall::Completed
        } else {
            PlanOverall::PartiallyCompleted
        };

        info!(
            cluster = %plan.cluster_ref(),
            attempted = reports.len(),
            not_attempted = not_attempted.len(),
            overall = overall.label(),
            "rolling restart finished"
        );

        PlanResult {
            cluster_ref: plan.cluster_ref().to_string(),
            reports,
            not_attempted,
            overall,
        }
    }

    /// Restart one unit and wait for its outcome.
    async fn restart_unit(
        &self,
        unit: &Unit,
        config: &RestartConfig,
        interrupt: &mut Interrupt,
    ) -> UnitReport {
        let started = Instant::now();
        // `None` when the timeout is too large to represent: no deadline.
        let deadline = started.checked_add(config.per_unit_timeout);
        info!(unit = %unit.display_name(), baseline = %unit.current_state, "restarting unit");

        if let Err(e) = self.restarter.restart(unit).await {
            warn!(unit = %unit.display_name(), error = %e, "restart action failed");
            return unit_report(unit, RestartOutcome::failed(e.to_string()), started, 0, 0);
        }

        let mut tracker = PollTracker::new(unit.current_state.clone(), config);

        let mut outcome = loop {
            let remaining = config.per_unit_timeout.saturating_sub(started.elapsed());
            if interrupt.sleep(tracker.next_interval().min(remaining)).await {
                warn!(unit = %unit.display_name(), "interrupted while polling");
                break RestartOutcome::Cancelled;
            }

            let probe = self.prober.probe(unit);
            let probed = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, probe).await,
                None => Ok(probe.await),
            };

            match probed {
                Ok(Ok(status)) => {
                    debug!(unit = %unit.display_name(), state = %status, "probe");
                    tracker.record_status(status, started.elapsed());
                }
                Ok(Err(e)) => {
                    tracker.record_error(&e, started.elapsed());
                    warn!(
                        unit = %unit.display_name(),
                        error = %e,
                        retry_in_ms = tracker.next_interval().as_millis() as u64,
                        "probe failed"
                    );
                }
                Err(_) => {
                    debug!(unit = %unit.display_name(), "probe still pending at deadline");
                    tracker.check_deadline(started.elapsed());
                }
            }

            if let Some(outcome) = tracker.outcome() {
                break outcome;
            }
        };

        let mut probes = tracker.probes();
        let mut probe_errors = tracker.probe_errors();

        if outcome.is_success() && !config.settle_time.is_zero() {
            let (settled, ok, err) = self.settle(unit, config.settle_time, interrupt).await;
            outcome = settled;
            probes += ok;
            probe_errors += err;
        }

        match &outcome {
            RestartOutcome::Succeeded => {
                info!(
                    unit = %unit.display_name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "unit healthy"
                );
            }
            other => {
                warn!(
                    unit = %unit.display_name(),
                    outcome = other.label(),
                    last_state = %tracker.last_seen(),
                    "unit did not come back healthy"
                );
            }
        }

        unit_report(unit, outcome, started, probes, probe_errors)
    }

    /// Wait `settle_time`, then confirm the unit is still running.
    ///
    /// Returns the outcome plus the successful and failed probe counts.
    async fn settle(
        &self,
        unit: &Unit,
        settle_time: Duration,
        interrupt: &mut Interrupt,
    ) -> (RestartOutcome, u32, u32) {
        debug!(unit = %unit.display_name(), settle_ms = settle_time.as_millis() as u64, "settling");
        if interrupt.sleep(settle_time).await {
            return (RestartOutcome::Cancelled, 0, 0);
        }

        match self.prober.probe(unit).await {
            Ok(status) if status.is_running() => (RestartOutcome::Succeeded, 1, 0),
            Ok(status) => (
                RestartOutcome::failed(format!("unit left running state during settle: {status}")),
                1,
                0,
            ),
            Err(e) => (
                RestartOutcome::failed(format!("settle probe failed: {e}")),
                0,
                1,
            ),
        }
    }
}

fn unit_report(
    unit: &Unit,
    outcome: RestartOutcome,
    started: Instant,
    probes: u32,
    probe_errors: u32,
) -> UnitReport {
    UnitReport {
        unit_id: unit.id.clone(),
        name: unit.name.clone(),
        outcome,
        elapsed_ms: started.elapsed().as_millis() as u64,
        probes,
        probe_errors,
    }
}

/// Cooperative cancellation over a watch channel.
struct Interrupt {
    rx: Option<watch::Receiver<bool>>,
}

impl Interrupt {
    fn new(rx: Option<watch::Receiver<bool>>) -> Self {
        Self { rx }
    }

    fn is_set(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Sleep for `duration`. Returns `true` if interrupted first.
    async fn sleep(&mut self, duration: Duration) -> bool {
        let until = Instant::now().checked_add(duration);
        loop {
            if self.is_set() {
                return true;
            }

            let Some(rx) = self.rx.as_mut() else {
                sleep_until(until).await;
                return false;
            };

            let mut sender_gone = false;
            tokio::select! {
                _ = sleep_until(until) => return false,
                changed = rx.changed() => {
                    sender_gone = changed.is_err();
                }
            }

            // A dropped sender can never interrupt; stop watching it.
            if sender_gone {
                self.rx = None;
            }
        }
    }
}

/// Sleep until `until`, or forever when there is no representable instant.
async fn sleep_until(until: Option<Instant>) {
    match until {
        Some(until) => tokio::time::sleep_until(until).await,
        None => std::future::pending().await,
    }
}
