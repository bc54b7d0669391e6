//! Dashboard configuration

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::time::Duration;

const ENV_PREFIX: &str = "ROS_DASHBOARD";

/// Dashboard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Port of the dashboard HTTP server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the ROS API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the inventory service; rows are not merged when unset
    #[serde(default)]
    pub inventory_url: Option<String>,

    /// Bearer token sent upstream
    #[serde(default)]
    pub token: Option<String>,

    /// User the views are loaded for
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Page size used when a request does not give one
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,
}

fn default_port() -> u16 {
    8080
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_username() -> String {
    "dashboard".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_per_page() -> u32 {
    ros_lib::query::DEFAULT_PER_PAGE
}

impl DashboardConfig {
    /// Load configuration from `ROS_DASHBOARD_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: config::Environment) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to read dashboard configuration")?
            .try_deserialize()
            .context("Invalid dashboard configuration")?;

        ensure!(config.default_per_page >= 1, "default_per_page must be at least 1");
        ensure!(config.request_timeout_secs >= 1, "request_timeout_secs must be at least 1");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_env(env(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.inventory_url, None);
        assert_eq!(config.token, None);
        assert_eq!(config.default_per_page, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_environment_overrides() {
        let config = DashboardConfig::from_env(env(&[
            ("ROS_DASHBOARD_PORT", "9000"),
            ("ROS_DASHBOARD_API_URL", "http://ros-api:8000"),
            ("ROS_DASHBOARD_INVENTORY_URL", "http://inventory:8081"),
            ("ROS_DASHBOARD_USERNAME", "ops"),
            ("ROS_DASHBOARD_DEFAULT_PER_PAGE", "25"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.api_url, "http://ros-api:8000");
        assert_eq!(config.inventory_url.as_deref(), Some("http://inventory:8081"));
        assert_eq!(config.username, "ops");
        assert_eq!(config.default_per_page, 25);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = DashboardConfig::from_env(env(&[("ROS_DASHBOARD_DEFAULT_PER_PAGE", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("default_per_page"));
    }
}
