pub mod ecs;
pub mod msk;
pub mod restart;

use std::path::Path;

use rollcall_aws::SdkConfig;
use rollcall_core::RollcallConfig;

/// Read `--config` if given; otherwise run on defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RollcallConfig> {
    match path {
        Some(path) => Ok(RollcallConfig::from_file(path)?),
        None => Ok(RollcallConfig::default()),
    }
}

/// Build the SDK config. CLI flags win over `[aws]` in the config file.
pub async fn sdk_config(
    file: &RollcallConfig,
    profile: Option<&str>,
    region: Option<&str>,
) -> SdkConfig {
    let aws = file.aws.clone().unwrap_or_default();
    let profile = profile.or(aws.profile.as_deref());
    let region = region.or(aws.region.as_deref());
    rollcall_aws::session::load(profile, region).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[restart]\nper_unit_timeout = \"2m\"\n\n[aws]\nregion = \"eu-west-1\""
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(
            config.restart_config().unwrap().per_unit_timeout,
            Duration::from_secs(120)
        );
        assert_eq!(
            config.aws.and_then(|aws| aws.region).as_deref(),
            Some("eu-west-1")
        );
    }

    #[test]
    fn load_config_without_path_uses_defaults() {
        let config = load_config(None).unwrap();
        assert!(config.restart.is_none());
        assert!(config.aws.is_none());
    }

    #[test]
    fn load_config_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("rollcall.toml").as_path())).is_err());
    }
}
