//! MSK broker nodes as restartable units.
//!
//! `RebootBroker` returns a cluster operation; the broker is probed through
//! that operation's state. A completed operation only counts as running
//! once the broker shows up again in the cluster's bootstrap broker list.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_kafka::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use rollcall_core::{
    Discovery, DiscoveryError, HealthProbe, ProbeError, RestartAction, RestartActionError, Unit,
    UnitStatus,
};

use crate::describe_error;

/// Restarts the brokers of an MSK cluster.
#[derive(Debug)]
pub struct MskBrokers {
    client: Client,
    /// broker id → cluster operation ARN of its reboot.
    operations: Mutex<HashMap<String, String>>,
    /// broker id → broker endpoints, recorded at discovery.
    endpoints: Mutex<HashMap<String, Vec<String>>>,
}

impl MskBrokers {
    pub fn new(config: &SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            operations: Mutex::new(HashMap::new()),
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    async fn cluster_status(&self, cluster_arn: &str) -> Result<UnitStatus, String> {
        let out = self
            .client
            .describe_cluster()
            .cluster_arn(cluster_arn)
            .send()
            .await
            .map_err(|e| describe_error(&e))?;
        let state = out
            .cluster_info()
            .and_then(|info| info.state())
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        Ok(classify_cluster_state(&state))
    }

    async fn bootstrap_brokers(&self, cluster_arn: &str) -> Result<Vec<String>, String> {
        let out = self
            .client
            .get_bootstrap_brokers()
            .cluster_arn(cluster_arn)
            .send()
            .await
            .map_err(|e| describe_error(&e))?;
        Ok([
            out.bootstrap_broker_string(),
            out.bootstrap_broker_string_tls(),
            out.bootstrap_broker_string_sasl_iam(),
            out.bootstrap_broker_string_sasl_scram(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
    }
}

#[async_trait]
impl Discovery for MskBrokers {
    async fn discover(&self, cluster_ref: &str) -> Result<Vec<Unit>, DiscoveryError> {
        let baseline = match self
            .client
            .describe_cluster()
            .cluster_arn(cluster_ref)
            .send()
            .await
        {
            Ok(out) => classify_cluster_state(
                out.cluster_info()
                    .and_then(|info| info.state())
                    .map(|s| s.as_str())
                    .unwrap_or("UNKNOWN"),
            ),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .is_some_and(|se| se.is_not_found_exception());
                return Err(if not_found {
                    DiscoveryError::NotFound(cluster_ref.to_string())
                } else {
                    DiscoveryError::Provider(describe_error(&e))
                });
            }
        };

        let mut units = Vec::new();
        let mut endpoints = HashMap::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_nodes()
                .cluster_arn(cluster_ref)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| DiscoveryError::Provider(describe_error(&e)))?;

            for node in out.node_info_list() {
                let Some(broker) = node.broker_node_info() else {
                    continue;
                };
                let Some(id) = broker.broker_id() else {
                    continue;
                };
                let id = broker_id_string(id);
                endpoints.insert(id.clone(), broker.endpoints().to_vec());
                units.push(
                    Unit::new(id.clone(), cluster_ref, baseline.clone())
                        .with_name(format!("broker-{id}")),
                );
            }

            match out.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        if units.is_empty() {
            return Err(DiscoveryError::Empty(cluster_ref.to_string()));
        }

        units.sort_by_key(|u| u.id.parse::<u64>().unwrap_or(u64::MAX));
        self.endpoints.lock().await.extend(endpoints);
        info!(cluster = %cluster_ref, brokers = units.len(), "msk discovery complete");
        Ok(units)
    }
}

#[async_trait]
impl RestartAction for MskBrokers {
    async fn restart(&self, unit: &Unit) -> Result<(), RestartActionError> {
        let out = self
            .client
            .reboot_broker()
            .cluster_arn(&unit.cluster_ref)
            .broker_ids(&unit.id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some() {
                    RestartActionError::Rejected(describe_error(&e))
                } else {
                    RestartActionError::Provider(describe_error(&e))
                }
            })?;

        let operation = out.cluster_operation_arn().ok_or_else(|| {
            RestartActionError::Provider("reboot returned no cluster operation".to_string())
        })?;
        debug!(broker = %unit.id, %operation, "reboot issued");
        self.operations
            .lock()
            .await
            .insert(unit.id.clone(), operation.to_string());
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for MskBrokers {
    async fn probe(&self, unit: &Unit) -> Result<UnitStatus, ProbeError> {
        let operation = self.operations.lock().await.get(&unit.id).cloned();
        let Some(operation) = operation else {
            return self
                .cluster_status(&unit.cluster_ref)
                .await
                .map_err(ProbeError::Provider);
        };

        let out = self
            .client
            .describe_cluster_operation()
            .cluster_operation_arn(&operation)
            .send()
            .await
            .map_err(|e| ProbeError::Provider(describe_error(&e)))?;

        let info = out
            .cluster_operation_info()
            .ok_or_else(|| ProbeError::Unavailable(format!("operation {operation} not described")))?;
        let state = info.operation_state().unwrap_or("UNKNOWN");
        let error = info
            .error_info()
            .and_then(|e| e.error_string().or(e.error_code()));

        let listed = if state == "UPDATE_COMPLETE" {
            let endpoints = self
                .endpoints
                .lock()
                .await
                .get(&unit.id)
                .cloned()
                .unwrap_or_default();
            let bootstrap = self
                .bootstrap_brokers(&unit.cluster_ref)
                .await
                .map_err(ProbeError::Provider)?;
            let listed = endpoint_listed(&bootstrap, &endpoints);
            if !listed {
                warn!(broker = %unit.id, "reboot complete but broker not in bootstrap list yet");
            }
            listed
        } else {
            false
        };

        Ok(classify_operation(&operation, state, error, listed))
    }
}

/// MSK broker ids come back as floats (`1.0`); render them as integers.
fn broker_id_string(id: f64) -> String {
    format!("{}", id as i64)
}

/// Pre-restart status of every broker: the cluster's own state.
pub fn classify_cluster_state(state: &str) -> UnitStatus {
    match state {
        "ACTIVE" => UnitStatus::running(state),
        "FAILED" => UnitStatus::stopped(state, None),
        other => UnitStatus::transitioning(other),
    }
}

/// Map a reboot operation's state onto a `UnitStatus`.
///
/// `listed` says whether the broker's endpoint is back in the bootstrap
/// broker list; a complete operation is only `Running` when it is.
pub fn classify_operation(
    operation_arn: &str,
    state: &str,
    error: Option<&str>,
    listed: bool,
) -> UnitStatus {
    let status = match state {
        "UPDATE_COMPLETE" if listed => UnitStatus::running(state),
        "UPDATE_FAILED" | "ROLLBACK_COMPLETE" | "ROLLBACK_FAILED" => {
            UnitStatus::stopped(state, error.map(str::to_string))
        }
        other => UnitStatus::transitioning(other),
    };
    status.with_revision(operation_arn)
}

/// Whether any broker endpoint host appears in the bootstrap broker strings.
///
/// Bootstrap strings are comma-separated `host:port` lists. A broker with
/// no recorded endpoints is treated as listed.
pub fn endpoint_listed(bootstrap: &[String], endpoints: &[String]) -> bool {
    if endpoints.is_empty() {
        return true;
    }
    bootstrap
        .iter()
        .flat_map(|s| s.split(','))
        .map(|entry| entry.trim().rsplit_once(':').map_or(entry.trim(), |(host, _)| host))
        .any(|host| endpoints.iter().any(|ep| ep == host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::StatusPhase;

    const OP: &str = "arn:aws:kafka:us-west-2:123456789012:cluster-operation/c/uuid/op";

    #[test]
    fn active_cluster_is_running_baseline() {
        let status = classify_cluster_state("ACTIVE");
        assert_eq!(status.phase, StatusPhase::Running);
        assert_eq!(status.revision, None);
        assert_eq!(
            classify_cluster_state("REBOOTING_BROKER").phase,
            StatusPhase::Transitioning
        );
    }

    #[test]
    fn pending_operation_differs_from_baseline() {
        let baseline = classify_cluster_state("ACTIVE");
        let pending = classify_operation(OP, "PENDING", None, false);
        assert_eq!(pending.phase, StatusPhase::Transitioning);
        assert_ne!(pending, baseline);
    }

    #[test]
    fn complete_and_listed_is_running() {
        let status = classify_operation(OP, "UPDATE_COMPLETE", None, true);
        assert_eq!(status.phase, StatusPhase::Running);
        assert_eq!(status.revision.as_deref(), Some(OP));
    }

    #[test]
    fn complete_but_unlisted_is_still_transitioning() {
        let status = classify_operation(OP, "UPDATE_COMPLETE", None, false);
        assert_eq!(status.phase, StatusPhase::Transitioning);
    }

    #[test]
    fn failed_operation_carries_error() {
        let status = classify_operation(OP, "UPDATE_FAILED", Some("Broker did not come back"), false);
        assert_eq!(status.phase, StatusPhase::Stopped);
        assert_eq!(status.failure_reason(), "Broker did not come back");
    }

    #[test]
    fn endpoint_matching_ignores_port() {
        let bootstrap = vec![
            "b-1.c.kafka.us-west-2.amazonaws.com:9092,b-2.c.kafka.us-west-2.amazonaws.com:9092"
                .to_string(),
        ];
        let b2 = vec!["b-2.c.kafka.us-west-2.amazonaws.com".to_string()];
        let b3 = vec!["b-3.c.kafka.us-west-2.amazonaws.com".to_string()];
        assert!(endpoint_listed(&bootstrap, &b2));
        assert!(!endpoint_listed(&bootstrap, &b3));
        assert!(endpoint_listed(&bootstrap, &[]));
        assert!(!endpoint_listed(&[], &b2));
    }

    #[test]
    fn broker_ids_render_as_integers() {
        assert_eq!(broker_id_string(1.0), "1");
        assert_eq!(broker_id_string(12.0), "12");
    }
}
