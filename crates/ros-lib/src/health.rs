//! Health tracking for the dashboard's upstream dependencies
//!
//! Each upstream (the ROS API and the inventory service) is a component.
//! Fetch outcomes are reported here and surface through the liveness and
//! readiness endpoints.

use crate::error::RosError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Upstream answered with errors; views still render
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status wins
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .fold(ComponentStatus::Healthy, |worst, status| match (worst, status) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ROS_API: &str = "ros_api";
    pub const INVENTORY: &str = "inventory";
}

#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Record the outcome of a call to `name`.
    ///
    /// Upstream failures (network errors and 5xx answers) degrade the
    /// component. Client-side errors say nothing about the upstream and
    /// leave it as it was.
    pub async fn report(&self, name: &str, outcome: Option<&RosError>) {
        match outcome {
            None => self.set_healthy(name).await,
            Some(err) if is_upstream_failure(err) => {
                self.set_degraded(name, err.to_string()).await
            }
            Some(_) => {}
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        let reason = if !ready {
            Some("Dashboard not yet initialized")
        } else if health.status == ComponentStatus::Unhealthy {
            Some("Upstream component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

fn is_upstream_failure(err: &RosError) -> bool {
    match err {
        RosError::Network(_) => true,
        RosError::Http { status, .. } => *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error() -> RosError {
        RosError::Http {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_healthy_and_not_ready() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Dashboard not yet initialized"));
    }

    #[tokio::test]
    async fn test_server_error_degrades_component() {
        let registry = HealthRegistry::new();
        registry.register(components::ROS_API).await;
        registry.register(components::INVENTORY).await;

        registry.report(components::ROS_API, Some(&server_error())).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        let api = &health.components[components::ROS_API];
        assert_eq!(api.message.as_deref(), Some("Internal Server Error"));
        assert!(api.status.is_operational());
    }

    #[tokio::test]
    async fn test_success_restores_component() {
        let registry = HealthRegistry::new();
        registry.report(components::ROS_API, Some(&server_error())).await;
        registry.report(components::ROS_API, None).await;

        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_client_errors_leave_component_alone() {
        let registry = HealthRegistry::new();
        registry.register(components::ROS_API).await;

        let not_found = RosError::Http {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        registry.report(components::ROS_API, Some(&not_found)).await;
        registry
            .report(
                components::ROS_API,
                Some(&RosError::InvalidQuery("per_page must be at least 1".into())),
            )
            .await;

        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_readiness_follows_unhealthy_components() {
        let registry = HealthRegistry::new();
        registry.register(components::INVENTORY).await;
        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry
            .set_unhealthy(components::INVENTORY, "connection refused")
            .await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Upstream component unhealthy"));
    }
}
