//! Shared rolling-restart flow for every provider.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use tokio::sync::watch;
use tracing::{info, warn};

use rollcall_core::{
    parse_duration, Discovery, HealthProbe, PlanOverall, PlanResult, RestartAction, RestartConfig,
    RollcallConfig,
};
use rollcall_rollout::{format_report, RestartPlan, RollingRestartController};

/// Flags shared by every `restart` subcommand. Unset flags fall back to
/// `[restart]` in the config file, then to built-in defaults.
#[derive(Args, Debug, Default)]
pub struct RestartArgs {
    /// Per-unit timeout, e.g. "300s" or "5m"
    #[arg(long)]
    pub timeout: Option<String>,
    /// Delay between status probes, e.g. "5s"
    #[arg(long)]
    pub poll_interval: Option<String>,
    /// Wait this long after a unit is healthy, then re-check it
    #[arg(long)]
    pub settle: Option<String>,
    /// Consecutive probe errors tolerated before a unit is failed
    #[arg(long)]
    pub probe_error_budget: Option<u32>,
    /// Abort the remaining units after the first failure
    #[arg(long, conflicts_with = "continue_on_failure")]
    pub stop_on_first_failure: bool,
    /// Keep going after a failed unit
    #[arg(long)]
    pub continue_on_failure: bool,
    /// Print the plan and exit without restarting anything
    #[arg(long)]
    pub dry_run: bool,
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

impl RestartArgs {
    /// Merge flags over the config file.
    pub fn resolve(&self, file: &RollcallConfig) -> anyhow::Result<RestartConfig> {
        let mut cfg = file.restart_config()?;
        if let Some(v) = &self.timeout {
            cfg.per_unit_timeout = flag_duration("--timeout", v)?;
        }
        if let Some(v) = &self.poll_interval {
            cfg.poll_interval = flag_duration("--poll-interval", v)?;
        }
        if let Some(v) = &self.settle {
            cfg.settle_time = flag_duration("--settle", v)?;
        }
        if let Some(budget) = self.probe_error_budget {
            cfg.probe_error_budget = budget;
        }
        if self.stop_on_first_failure {
            cfg.stop_on_first_failure = true;
        }
        if self.continue_on_failure {
            cfg.stop_on_first_failure = false;
        }
        if cfg.poll_interval.is_zero() {
            anyhow::bail!("poll interval must be greater than zero");
        }
        Ok(cfg)
    }
}

fn flag_duration(flag: &str, value: &str) -> anyhow::Result<std::time::Duration> {
    parse_duration(value).ok_or_else(|| anyhow::anyhow!("invalid duration for {flag}: {value:?}"))
}

/// Discover, plan, execute, report. Returns the process exit code.
pub async fn run<P>(
    provider: Arc<P>,
    cluster: &str,
    selected: &[String],
    args: &RestartArgs,
    file: &RollcallConfig,
) -> anyhow::Result<ExitCode>
where
    P: Discovery + RestartAction + HealthProbe + 'static,
{
    let config = args.resolve(file)?;
    let units = provider.discover(cluster).await?;
    let plan = RestartPlan::from_discovery(cluster, units, selected, config)?;

    if args.dry_run {
        println!("Plan for {cluster} ({} units):", plan.len());
        for (i, unit) in plan.units().iter().enumerate() {
            println!("  {}. {} [{}]", i + 1, unit.display_name(), unit.current_state);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping at the next poll boundary");
            let _ = shutdown_tx.send(true);
        }
    });

    let controller =
        RollingRestartController::new(provider.clone(), provider.clone()).with_shutdown(shutdown_rx);
    let result = controller.execute(plan).await;
    interrupt.abort();

    print_result(&result, &args.format)?;
    info!(overall = result.overall.label(), "done");
    Ok(exit_code(result.overall))
}

fn print_result(result: &PlanResult, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(result)?),
        _ => println!("{}", format_report(result)),
    }
    Ok(())
}

/// Process exit code for a finished plan.
pub fn exit_code(overall: PlanOverall) -> ExitCode {
    ExitCode::from(exit_status(overall))
}

fn exit_status(overall: PlanOverall) -> u8 {
    match overall {
        PlanOverall::Completed => 0,
        PlanOverall::PartiallyCompleted => 2,
        PlanOverall::Aborted => 3,
    }
}
