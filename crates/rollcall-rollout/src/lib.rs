//! rollcall rolling restarts: one unit at a time, health-verified.
//!
//! This crate drives a `RestartPlan` through the injected restart and
//! probe collaborators. Each unit is restarted and then polled until it
//! reports a healthy status, fails, or runs out of time. Only after that
//! does the next unit start, so at most one unit is down at once.
//!
//! # Components
//!
//! - **`plan`**: Ordered, immutable list of units plus execution settings
//! - **`tracker`**: Per-unit polling state machine (pure, clock-free)
//! - **`controller`**: Async driver: restart, poll, record, continue/abort
//! - **`report`**: Human-readable `PlanResult` formatting
//!
//! # Polling
//!
//! ```text
//! Pending ──(status differs from baseline)──▶ Observed
//! Observed ──(phase Running)──▶ Healthy      → Succeeded
//! Observed ──(phase Stopped)──▶ Stopped      → Failed(reason)
//! any non-terminal ──(elapsed ≥ timeout)──▶ TimedOut
//! N consecutive probe errors ──▶ Failed("health probe failed ...")
//! ```

pub mod controller;
pub mod plan;
pub mod report;
pub mod tracker;

pub use controller::RollingRestartController;
pub use plan::RestartPlan;
pub use report::format_report;
pub use tracker::{PollState, PollTracker};
