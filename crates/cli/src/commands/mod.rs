//! CLI commands

pub mod recommendations;
pub mod systems;

use crate::config::Config;
use crate::Cli;
use anyhow::{Context, Result};
use ros_lib::{
    client::{ApiClient, ClientConfig, RosApi},
    inventory::{HttpInventoryProvider, InventoryProvider},
    query::DEFAULT_PER_PAGE,
    StaticUserResolver, UserResolver,
};
use std::sync::Arc;

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Upstream handles shared by all commands
pub struct Session {
    pub api: Arc<dyn RosApi>,
    pub inventory: Option<Arc<dyn InventoryProvider>>,
    pub users: Arc<dyn UserResolver>,
    pub default_per_page: u32,
}

impl Session {
    /// Flags win over the config file
    pub fn new(cli: &Cli, file: &Config) -> Result<Self> {
        let api_url = cli
            .api_url
            .as_deref()
            .or(file.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL);
        let inventory_url = cli.inventory_url.as_deref().or(file.inventory_url.as_deref());

        Self::connect(
            api_url,
            inventory_url,
            cli.token.clone(),
            &cli.user,
            file.default_per_page.unwrap_or(DEFAULT_PER_PAGE),
        )
    }

    pub fn connect(
        api_url: &str,
        inventory_url: Option<&str>,
        token: Option<String>,
        user: &str,
        default_per_page: u32,
    ) -> Result<Self> {
        let api = ApiClient::with_config(ClientConfig::new(api_url).with_token(token.clone()))
            .with_context(|| format!("Invalid API URL: {}", api_url))?;

        let inventory = match inventory_url {
            Some(url) => {
                let client = ApiClient::with_config(ClientConfig::new(url).with_token(token))
                    .with_context(|| format!("Invalid inventory URL: {}", url))?;
                let provider: Arc<dyn InventoryProvider> =
                    Arc::new(HttpInventoryProvider::new(client));
                Some(provider)
            }
            None => None,
        };

        Ok(Self {
            api: Arc::new(api),
            inventory,
            users: Arc::new(StaticUserResolver::from_username(user)),
            default_per_page,
        })
    }
}
