use std::process::ExitCode;
use std::sync::Arc;

use rollcall_aws::{ecs::short_name, EcsServices, SdkConfig};
use rollcall_core::{Discovery, RollcallConfig};

use super::restart::{self, RestartArgs};

pub async fn clusters(sdk: &SdkConfig) -> anyhow::Result<ExitCode> {
    let arns = EcsServices::new(sdk).list_clusters().await?;
    if arns.is_empty() {
        anyhow::bail!("no ECS clusters found");
    }
    println!("Available ECS clusters:");
    for (i, arn) in arns.iter().enumerate() {
        println!("  {}. {}  ({arn})", i + 1, short_name(arn));
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn services(sdk: &SdkConfig, cluster: &str) -> anyhow::Result<ExitCode> {
    let units = EcsServices::new(sdk).discover(cluster).await?;
    println!("Services in {cluster}:");
    for (i, unit) in units.iter().enumerate() {
        println!("  {}. {}  [{}]", i + 1, unit.display_name(), unit.current_state);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn restart(
    sdk: &SdkConfig,
    file: &RollcallConfig,
    cluster: &str,
    services: &[String],
    args: &RestartArgs,
) -> anyhow::Result<ExitCode> {
    let provider = Arc::new(EcsServices::new(sdk));
    restart::run(provider, cluster, services, args, file).await
}
