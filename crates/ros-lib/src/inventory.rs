//! Inventory-data provider and the merge of host metadata into system rows

use crate::client::ApiClient;
use crate::error::{Result, RosError};
use crate::models::{EntitiesResponse, InventoryEntity, SystemRecord};
use crate::query::SortDirection;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const INVENTORY_API_ROOT: &str = "/api/inventory/v1";

/// Metric label of the inventory hosts endpoint
pub const INVENTORY_ENDPOINT: &str = "inventory_hosts";

/// Table configuration passed to the provider alongside the ids
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitiesConfig {
    pub page: u32,
    pub per_page: u32,
    /// The caller already holds the items; the provider must not paginate
    pub has_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    pub order_direction: SortDirection,
    pub filters: BTreeMap<String, String>,
}

impl EntitiesConfig {
    /// Config that makes the provider return every one of `count` ids on one page
    pub fn for_items(count: usize) -> Self {
        Self {
            page: 1,
            per_page: count.max(1) as u32,
            has_items: true,
            order_by: None,
            order_direction: SortDirection::Asc,
            filters: BTreeMap::new(),
        }
    }
}

/// Source of canonical host metadata keyed by inventory id
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn get_entities(
        &self,
        ids: &[String],
        config: &EntitiesConfig,
        force_refresh: bool,
    ) -> Result<EntitiesResponse>;
}

#[derive(Serialize)]
struct HostsQuery {
    page: u32,
    per_page: u32,
}

/// Provider backed by the inventory hosts endpoint
pub struct HttpInventoryProvider {
    client: ApiClient,
}

impl HttpInventoryProvider {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InventoryProvider for HttpInventoryProvider {
    async fn get_entities(
        &self,
        ids: &[String],
        config: &EntitiesConfig,
        force_refresh: bool,
    ) -> Result<EntitiesResponse> {
        if ids.is_empty() {
            return Ok(EntitiesResponse::default());
        }

        let mut url = self
            .client
            .endpoint(&format!("{}/hosts", INVENTORY_API_ROOT))?;
        url.path_segments_mut()
            .map_err(|_| RosError::InvalidUrl(self.client.base_url().to_string()))?
            .push(&ids.join(","));

        let per_page = if config.has_items {
            ids.len() as u32
        } else {
            config.per_page
        };
        let query = HostsQuery {
            page: if config.has_items { 1 } else { config.page },
            per_page,
        };

        let mut request = self.client.request(url).query(&query);
        if force_refresh {
            request = request.header(reqwest::header::CACHE_CONTROL, "no-cache");
        }

        debug!(ids = ids.len(), force_refresh, "Resolving inventory entities");
        self.client.execute(request, INVENTORY_ENDPOINT).await
    }
}

/// Outcome of merging provider entities into a page of systems
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub systems: Vec<SystemRecord>,
    /// Ids that had no provider entity
    pub misses: Vec<String>,
}

/// Merge provider entities into `systems`.
///
/// Each system is shallow-merged over the entity with the same id, so any
/// key present on the system wins, even when its value is `null`. The
/// entity's own `id` key is not copied.
/// Output keeps the order of `systems`; systems without an entity are
/// returned untouched.
pub fn merge_with_entities(
    systems: Vec<SystemRecord>,
    entities: Vec<InventoryEntity>,
) -> MergeOutcome {
    let mut by_id: HashMap<String, Map<String, Value>> = HashMap::with_capacity(entities.len());
    for entity in entities {
        // First entity with a given id wins, like a front-to-back search
        by_id.entry(entity.id).or_insert(entity.fields);
    }

    let mut misses = Vec::new();
    let systems = systems
        .into_iter()
        .map(|system| match by_id.get(&system.inventory_id) {
            Some(fields) => merge_one(system, fields),
            None => {
                misses.push(system.inventory_id.clone());
                system
            }
        })
        .collect();

    MergeOutcome { systems, misses }
}

fn merge_one(system: SystemRecord, entity_fields: &Map<String, Value>) -> SystemRecord {
    let mut fields = entity_fields.clone();
    fields.remove("id");
    fields.remove("inventory_id");
    fields.extend(system.fields);

    SystemRecord {
        inventory_id: system.inventory_id,
        fields,
    }
}
