//! Human-readable plan report formatting.

use rollcall_core::{PlanOverall, PlanResult, RestartOutcome};

pub fn format_report(result: &PlanResult) -> String {
    let mut out = String::new();

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  Rolling Restart Report                  ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Cluster:  {:<29}║\n", truncate(&result.cluster_ref, 29)));
    out.push_str(&format!("║  Result:   {:<29}║\n", result.overall.label()));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    let total = result.reports.len() + result.not_attempted.len();
    out.push_str(&format!("Units ({total} total):\n"));
    out.push_str(&format!("  ✅ {} restarted\n", result.succeeded()));
    out.push_str(&format!(
        "  ❌ {} did not come back\n",
        result.attempted() - result.succeeded()
    ));
    out.push_str(&format!("  ⏭  {} not attempted\n\n", result.not_attempted.len()));

    for (i, report) in result.reports.iter().enumerate() {
        let symbol = match report.outcome {
            RestartOutcome::Succeeded => "✅",
            RestartOutcome::Failed { .. } => "❌",
            RestartOutcome::TimedOut => "⏱",
            RestartOutcome::Cancelled => "🛑",
        };
        out.push_str(&format!(
            "  {}. {symbol} {} → {} ({:.1}s, {} probes",
            i + 1,
            report.display_name(),
            report.outcome.label(),
            report.elapsed_ms as f64 / 1000.0,
            report.probes,
        ));
        if report.probe_errors > 0 {
            out.push_str(&format!(", {} probe errors", report.probe_errors));
        }
        out.push_str(")\n");
        if let RestartOutcome::Failed { reason } = &report.outcome {
            out.push_str(&format!("     Reason: {reason}\n"));
        }
    }

    if !result.not_attempted.is_empty() {
        out.push_str("\nNOT ATTEMPTED:\n");
        for id in &result.not_attempted {
            out.push_str(&format!("  • {id}\n"));
        }
    }

    if result.overall == PlanOverall::Aborted {
        out.push_str("\nPlan aborted. Re-run to restart the remaining units.\n");
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let tail: String = s.chars().rev().take(max.saturating_sub(1)).collect::<Vec<_>>().into_iter().rev().collect();
        format!("…{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::UnitReport;

    fn report(id: &str, outcome: RestartOutcome) -> UnitReport {
        UnitReport {
            unit_id: id.to_string(),
            name: Some(id.to_string()),
            outcome,
            elapsed_ms: 1500,
            probes: 3,
            probe_errors: 0,
        }
    }

    #[test]
    fn lists_each_unit_and_reason() {
        let result = PlanResult {
            cluster_ref: "prod".to_string(),
            reports: vec![
                report("api", RestartOutcome::Succeeded),
                report("worker", RestartOutcome::failed("OutOfMemory")),
            ],
            not_attempted: vec!["cron".to_string()],
            overall: PlanOverall::Aborted,
        };

        let text = format_report(&result);
        assert!(text.contains("ABORTED"));
        assert!(text.contains("1. ✅ api → SUCCEEDED"));
        assert!(text.contains("2. ❌ worker → FAILED"));
        assert!(text.contains("Reason: OutOfMemory"));
        assert!(text.contains("• cron"));
    }

    #[test]
    fn long_cluster_refs_keep_the_tail() {
        let arn = "arn:aws:kafka:us-west-2:123456789012:cluster/my-cluster/abcd";
        let short = truncate(arn, 29);
        assert_eq!(short.chars().count(), 29);
        assert!(short.ends_with("my-cluster/abcd"));
    }

    #[test]
    fn truncate_to_zero_width_does_not_panic() {
        assert_eq!(truncate("prod", 0), "…");
        assert_eq!(truncate("prod", 4), "prod");
    }
}
