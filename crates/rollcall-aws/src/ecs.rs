//! ECS services as restartable units.
//!
//! A service is restarted with `UpdateService(forceNewDeployment)`. Its
//! status is the newest task (running or stopped) backing the service, so
//! a fresh task ARN marks the restart as observed. Tasks that already
//! existed when the restart was issued are ignored afterwards: draining
//! them is part of a normal deployment.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecs::types::{DesiredStatus, Task};
use aws_sdk_ecs::Client;
use tokio::sync::Mutex;
use tracing::{debug, info};

use rollcall_core::{
    Discovery, DiscoveryError, HealthProbe, ProbeError, RestartAction, RestartActionError, Unit,
    UnitStatus,
};

use crate::describe_error;

/// ECS `describe_tasks` accepts at most this many ARNs per call.
const DESCRIBE_TASKS_LIMIT: usize = 100;

/// Restarts the services of an ECS cluster.
#[derive(Debug)]
pub struct EcsServices {
    client: Client,
    /// Task ARNs that existed when each service was restarted, by service ARN.
    pre_restart: Mutex<HashMap<String, HashSet<String>>>,
}

impl EcsServices {
    pub fn new(config: &SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            pre_restart: Mutex::new(HashMap::new()),
        }
    }

    /// List cluster ARNs in the configured account and region.
    pub async fn list_clusters(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut arns = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_clusters()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| DiscoveryError::Provider(describe_error(&e)))?;
            arns.extend(out.cluster_arns().iter().cloned());
            match out.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(arns)
    }

    async fn list_service_arns(&self, cluster: &str) -> Result<Vec<String>, DiscoveryError> {
        let mut arns = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_services()
                .cluster(cluster)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| DiscoveryError::Provider(describe_error(&e)))?;
            arns.extend(out.service_arns().iter().cloned());
            match out.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(arns)
    }

    async fn task_arns(
        &self,
        cluster: &str,
        service: &str,
        desired: DesiredStatus,
    ) -> Result<Vec<String>, String> {
        let mut arns = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_tasks()
                .cluster(cluster)
                .service_name(service)
                .desired_status(desired.clone())
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| describe_error(&e))?;
            arns.extend(out.task_arns().iter().cloned());
            match out.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(arns)
    }

    /// Running and stopped task ARNs behind a service.
    async fn all_task_arns(&self, cluster: &str, service: &str) -> Result<Vec<String>, String> {
        let mut arns = self.task_arns(cluster, service, DesiredStatus::Running).await?;
        arns.extend(self.task_arns(cluster, service, DesiredStatus::Stopped).await?);
        Ok(arns)
    }

    async fn describe_tasks(&self, cluster: &str, arns: &[String]) -> Result<Vec<Task>, String> {
        let mut tasks = Vec::with_capacity(arns.len());
        for chunk in arns.chunks(DESCRIBE_TASKS_LIMIT) {
            let out = self
                .client
                .describe_tasks()
                .cluster(cluster)
                .set_tasks(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| describe_error(&e))?;
            tasks.extend(out.tasks().iter().cloned());
        }
        Ok(tasks)
    }

    /// Status of the newest task behind a service, skipping `ignored` ARNs.
    async fn service_status(
        &self,
        cluster: &str,
        service: &str,
        ignored: &HashSet<String>,
    ) -> Result<UnitStatus, String> {
        let arns = unseen_task_arns(self.all_task_arns(cluster, service).await?, ignored);
        if arns.is_empty() {
            return Ok(task_status(None));
        }
        let tasks = self.describe_tasks(cluster, &arns).await?;
        Ok(task_status(newest_task(&tasks)))
    }
}

#[async_trait]
impl Discovery for EcsServices {
    async fn discover(&self, cluster_ref: &str) -> Result<Vec<Unit>, DiscoveryError> {
        let out = self
            .client
            .describe_clusters()
            .clusters(cluster_ref)
            .send()
            .await
            .map_err(|e| DiscoveryError::Provider(describe_error(&e)))?;

        let active = out
            .clusters()
            .iter()
            .any(|c| c.status() == Some("ACTIVE"));
        if !active {
            return Err(DiscoveryError::NotFound(cluster_ref.to_string()));
        }

        let service_arns = self.list_service_arns(cluster_ref).await?;
        if service_arns.is_empty() {
            return Err(DiscoveryError::Empty(cluster_ref.to_string()));
        }

        let mut units = Vec::with_capacity(service_arns.len());
        for arn in service_arns {
            let name = short_name(&arn).to_string();
            let status = self
                .service_status(cluster_ref, &name, &HashSet::new())
                .await
                .map_err(DiscoveryError::Provider)?;
            debug!(service = %name, state = %status, "discovered service");
            units.push(Unit::new(arn, cluster_ref, status).with_name(name));
        }

        info!(cluster = %cluster_ref, services = units.len(), "ecs discovery complete");
        Ok(units)
    }
}

#[async_trait]
impl RestartAction for EcsServices {
    async fn restart(&self, unit: &Unit) -> Result<(), RestartActionError> {
        let existing = self
            .all_task_arns(&unit.cluster_ref, unit.display_name())
            .await
            .map_err(RestartActionError::Provider)?;

        self.client
            .update_service()
            .cluster(&unit.cluster_ref)
            .service(&unit.id)
            .force_new_deployment(true)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some() {
                    RestartActionError::Rejected(describe_error(&e))
                } else {
                    RestartActionError::Provider(describe_error(&e))
                }
            })?;
        debug!(
            service = %unit.display_name(),
            previous_tasks = existing.len(),
            "forced new deployment"
        );
        self.pre_restart
            .lock()
            .await
            .insert(unit.id.clone(), existing.into_iter().collect());
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for EcsServices {
    async fn probe(&self, unit: &Unit) -> Result<UnitStatus, ProbeError> {
        let ignored = self
            .pre_restart
            .lock()
            .await
            .get(&unit.id)
            .cloned()
            .unwrap_or_default();
        self.service_status(&unit.cluster_ref, unit.display_name(), &ignored)
            .await
            .map_err(ProbeError::Provider)
    }
}

/// Last path segment of an ARN (`arn:...:service/cluster/name` → `name`).
pub fn short_name(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

/// Task ARNs not in `ignored`, in listing order.
fn unseen_task_arns(arns: Vec<String>, ignored: &HashSet<String>) -> Vec<String> {
    arns.into_iter().filter(|arn| !ignored.contains(arn)).collect()
}

/// Newest task by creation time.
fn newest_task(tasks: &[Task]) -> Option<&Task> {
    tasks
        .iter()
        .max_by_key(|t| t.created_at().map(|d| (d.secs(), d.subsec_nanos())))
}

fn task_status(task: Option<&Task>) -> UnitStatus {
    match task {
        Some(task) => classify_task(task.task_arn(), task.last_status(), task.stopped_reason()),
        None => classify_task(None, None, None),
    }
}

/// Map an ECS task's `lastStatus` onto a `UnitStatus`.
pub fn classify_task(
    task_arn: Option<&str>,
    last_status: Option<&str>,
    stopped_reason: Option<&str>,
) -> UnitStatus {
    let status = match last_status {
        None => UnitStatus::transitioning("NO_TASKS"),
        Some("RUNNING") => UnitStatus::running("RUNNING"),
        Some("STOPPED") => UnitStatus::stopped("STOPPED", stopped_reason.map(str::to_string)),
        Some(other) => UnitStatus::transitioning(other),
    };
    match task_arn {
        Some(arn) => status.with_revision(arn),
        None => status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::StatusPhase;

    #[test]
    fn running_task_is_running() {
        let status = classify_task(Some("arn:task/1"), Some("RUNNING"), None);
        assert_eq!(status.phase, StatusPhase::Running);
        assert_eq!(status.revision.as_deref(), Some("arn:task/1"));
    }

    #[test]
    fn stopped_task_keeps_reason() {
        let status = classify_task(
            Some("arn:task/2"),
            Some("STOPPED"),
            Some("OutOfMemoryError: Container killed due to memory usage"),
        );
        assert_eq!(status.phase, StatusPhase::Stopped);
        assert!(status.failure_reason().starts_with("OutOfMemoryError"));
    }

    #[test]
    fn intermediate_states_are_transitioning() {
        for state in ["PROVISIONING", "PENDING", "ACTIVATING", "DEPROVISIONING"] {
            let status = classify_task(Some("arn:task/3"), Some(state), None);
            assert_eq!(status.phase, StatusPhase::Transitioning, "{state}");
            assert_eq!(status.state, state);
        }
    }

    #[test]
    fn no_task_is_transitioning() {
        let status = classify_task(None, None, None);
        assert_eq!(status.phase, StatusPhase::Transitioning);
        assert_eq!(status.revision, None);
    }

    #[test]
    fn new_task_differs_from_old() {
        let old = classify_task(Some("arn:task/old"), Some("RUNNING"), None);
        let new = classify_task(Some("arn:task/new"), Some("RUNNING"), None);
        assert_ne!(old, new);
    }

    #[test]
    fn short_name_takes_last_segment() {
        assert_eq!(
            short_name("arn:aws:ecs:us-east-1:123456789012:service/prod/api"),
            "api"
        );
        assert_eq!(short_name("api"), "api");
    }

    #[test]
    fn draining_old_task_is_not_judged() {
        let ignored: HashSet<String> = ["arn:task/old".to_string()].into_iter().collect();
        let listed = vec!["arn:task/old".to_string(), "arn:task/new".to_string()];
        assert_eq!(unseen_task_arns(listed, &ignored), ["arn:task/new"]);

        // Old task stopped, replacement not yet placed: still transitioning.
        let arns = unseen_task_arns(vec!["arn:task/old".to_string()], &ignored);
        assert!(arns.is_empty());
        assert_eq!(task_status(None).phase, StatusPhase::Transitioning);
    }

    #[test]
    fn newest_task_by_created_at() {
        use aws_sdk_ecs::primitives::DateTime;

        let tasks = vec![
            Task::builder()
                .task_arn("arn:task/old")
                .created_at(DateTime::from_secs(100))
                .build(),
            Task::builder()
                .task_arn("arn:task/new")
                .created_at(DateTime::from_secs(200))
                .build(),
        ];
        let newest = newest_task(&tasks).unwrap();
        assert_eq!(newest.task_arn(), Some("arn:task/new"));
    }
}
