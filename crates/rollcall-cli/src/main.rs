use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::restart::RestartArgs;

#[derive(Parser)]
#[command(
    name = "rollcall",
    about = "Rolling restarts for ECS services and MSK brokers",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to rollcall.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// AWS profile (overrides [aws].profile)
    #[arg(long, global = true)]
    profile: Option<String>,
    /// AWS region (overrides [aws].region)
    #[arg(long, global = true)]
    region: Option<String>,
    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ECS (Fargate) services
    Ecs {
        #[command(subcommand)]
        action: EcsAction,
    },
    /// MSK (managed Kafka) brokers
    Msk {
        #[command(subcommand)]
        action: MskAction,
    },
}

#[derive(Subcommand)]
enum EcsAction {
    /// List ECS clusters
    Clusters,
    /// List the services of a cluster with their current status
    Services {
        /// Cluster name or ARN
        #[arg(short, long)]
        cluster: String,
    },
    /// Restart services one at a time, waiting for each to become healthy.
    ///
    /// Restarts every service in the cluster unless --service is given.
    Restart {
        /// Cluster name or ARN
        #[arg(short, long)]
        cluster: String,
        /// Service name or ARN to restart (repeatable)
        #[arg(short, long = "service")]
        services: Vec<String>,
        #[command(flatten)]
        opts: RestartArgs,
    },
}

#[derive(Subcommand)]
enum MskAction {
    /// List the brokers of a cluster
    Brokers {
        /// MSK cluster ARN
        #[arg(short, long)]
        cluster_arn: String,
    },
    /// Reboot brokers one at a time, waiting for each to rejoin.
    ///
    /// Reboots every broker in the cluster unless --broker is given.
    Restart {
        /// MSK cluster ARN
        #[arg(short, long)]
        cluster_arn: String,
        /// Broker id to reboot (repeatable)
        #[arg(short, long = "broker")]
        brokers: Vec<String>,
        #[command(flatten)]
        opts: RestartArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let file_config = commands::load_config(cli.config.as_deref())?;
    let sdk = commands::sdk_config(&file_config, cli.profile.as_deref(), cli.region.as_deref()).await;

    match cli.command {
        Commands::Ecs { action } => match action {
            EcsAction::Clusters => commands::ecs::clusters(&sdk).await,
            EcsAction::Services { cluster } => commands::ecs::services(&sdk, &cluster).await,
            EcsAction::Restart {
                cluster,
                services,
                opts,
            } => commands::ecs::restart(&sdk, &file_config, &cluster, &services, &opts).await,
        },
        Commands::Msk { action } => match action {
            MskAction::Brokers { cluster_arn } => commands::msk::brokers(&sdk, &cluster_arn).await,
            MskAction::Restart {
                cluster_arn,
                brokers,
                opts,
            } => commands::msk::restart(&sdk, &file_config, &cluster_arn, &brokers, &opts).await,
        },
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,rollcall=debug"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ecs_restart_with_selection() {
        let cli = Cli::try_parse_from([
            "rollcall",
            "--region",
            "us-west-2",
            "ecs",
            "restart",
            "--cluster",
            "prod",
            "--service",
            "api",
            "--service",
            "worker",
            "--timeout",
            "10m",
            "--continue-on-failure",
        ])
        .unwrap();

        assert_eq!(cli.region.as_deref(), Some("us-west-2"));
        match cli.command {
            Commands::Ecs {
                action:
                    EcsAction::Restart {
                        cluster,
                        services,
                        opts,
                    },
            } => {
                assert_eq!(cluster, "prod");
                assert_eq!(services, ["api", "worker"]);
                assert_eq!(opts.timeout.as_deref(), Some("10m"));
                assert!(opts.continue_on_failure);
            }
            _ => panic!("expected ecs restart"),
        }
    }

    #[test]
    fn parses_msk_restart_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rollcall",
            "msk",
            "restart",
            "--cluster-arn",
            "arn:aws:kafka:us-west-2:123456789012:cluster/c/uuid",
            "--broker",
            "2",
            "--profile",
            "ops",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.profile.as_deref(), Some("ops"));
        match cli.command {
            Commands::Msk {
                action: MskAction::Restart { brokers, opts, .. },
            } => {
                assert_eq!(brokers, ["2"]);
                assert_eq!(opts.format, "json");
            }
            _ => panic!("expected msk restart"),
        }
    }

    #[test]
    fn stop_and_continue_flags_conflict() {
        let res = Cli::try_parse_from([
            "rollcall",
            "ecs",
            "restart",
            "--cluster",
            "prod",
            "--stop-on-first-failure",
            "--continue-on-failure",
        ]);
        assert!(res.is_err());
    }
}
