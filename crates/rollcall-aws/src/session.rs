//! SDK configuration loading.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

/// Load SDK config from the default provider chain, with optional
/// profile and region overrides.
pub async fn load(profile: Option<&str>, region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    let config = loader.load().await;
    debug!(
        profile = profile.unwrap_or("default"),
        region = config.region().map(|r| r.as_ref()).unwrap_or("unset"),
        "loaded aws config"
    );
    config
}
