use std::process::ExitCode;
use std::sync::Arc;

use rollcall_aws::{MskBrokers, SdkConfig};
use rollcall_core::{Discovery, RollcallConfig};

use super::restart::{self, RestartArgs};

pub async fn brokers(sdk: &SdkConfig, cluster_arn: &str) -> anyhow::Result<ExitCode> {
    let units = MskBrokers::new(sdk).discover(cluster_arn).await?;
    println!("Brokers in {cluster_arn}:");
    for unit in &units {
        println!("  {}  [{}]", unit.display_name(), unit.current_state);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn restart(
    sdk: &SdkConfig,
    file: &RollcallConfig,
    cluster_arn: &str,
    brokers: &[String],
    args: &RestartArgs,
) -> anyhow::Result<ExitCode> {
    let provider = Arc::new(MskBrokers::new(sdk));
    restart::run(provider, cluster_arn, brokers, args, file).await
}
