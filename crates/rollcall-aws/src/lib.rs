//! rollcall-aws: AWS-backed restart collaborators.
//!
//! Implements `Discovery`, `RestartAction` and `HealthProbe` for:
//!
//! - **`ecs`**: ECS services, restarted by forcing a new deployment and
//!   probed through their newest task.
//! - **`msk`**: MSK broker nodes, restarted with `RebootBroker` and probed
//!   through the resulting cluster operation plus bootstrap broker listing.
//!
//! Status interpretation lives in small pure functions so it can be tested
//! without talking to AWS.

pub mod ecs;
pub mod msk;
pub mod session;

pub use aws_config::SdkConfig;
pub use ecs::EcsServices;
pub use msk::MskBrokers;

/// Flatten an SDK error and its sources into one line.
pub(crate) fn describe_error<E: std::error::Error>(err: E) -> String {
    aws_sdk_ecs::error::DisplayErrorContext(err).to_string()
}
