//! Core data models for resource optimization data

use crate::error::{Result, RosError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the nested score object on a system
const PERFORMANCE_SCORE: &str = "display_performance_score";

/// A monitored host as returned by the systems collection endpoint.
///
/// Only `inventory_id` is required. Every other key is kept in `fields`
/// exactly as received, explicit `null`s included, so a record serializes
/// back to its own keys and nothing else. Merged inventory fields land in
/// `fields` too. The typed accessors read the well-known keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRecord {
    pub inventory_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SystemRecord {
    /// Record holding nothing but its id
    pub fn new(inventory_id: impl Into<String>) -> Self {
        Self {
            inventory_id: inventory_id.into(),
            fields: Map::new(),
        }
    }

    /// Set `key`, replacing any previous value
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn display_name(&self) -> Option<&str> {
        self.fields.get("display_name").and_then(Value::as_str)
    }

    pub fn state(&self) -> Option<&str> {
        self.fields.get("state").and_then(Value::as_str)
    }

    pub fn recommendation_count(&self) -> Option<u32> {
        self.fields
            .get("recommendation_count")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    pub fn cpu_score(&self) -> Option<f64> {
        self.score("cpu_score")
    }

    pub fn memory_score(&self) -> Option<f64> {
        self.score("memory_score")
    }

    pub fn io_score(&self) -> Option<f64> {
        self.score("io_score")
    }

    fn score(&self, key: &str) -> Option<f64> {
        self.fields.get(PERFORMANCE_SCORE)?.get(key)?.as_f64()
    }
}

/// A recommendation attached to one system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_on: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pagination metadata of ROS list responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

/// `{ data, meta: { count } }` envelope used by every ROS list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: ListMeta,
}

pub type SystemsResponse = ListResponse<SystemRecord>;
pub type RecommendationsResponse = ListResponse<RecommendationRecord>;

/// Host metadata owned by the inventory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntity {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Response of an inventory provider lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitiesResponse {
    #[serde(default)]
    pub results: Vec<InventoryEntity>,
}

/// One page of items together with the collection total.
///
/// Invariants: `page >= 1`, `per_page >= 1` and `items.len() <= per_page`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    #[serde(rename = "results")]
    items: Vec<T>,
    #[serde(rename = "total")]
    total_count: u64,
    page: u32,
    per_page: u32,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: u32, per_page: u32) -> Result<Self> {
        if page == 0 {
            return Err(RosError::InvalidPage("page must be at least 1".to_string()));
        }
        if per_page == 0 {
            return Err(RosError::InvalidPage(
                "per_page must be at least 1".to_string(),
            ));
        }
        if items.len() > per_page as usize {
            return Err(RosError::InvalidPage(format!(
                "{} items exceed per_page {}",
                items.len(),
                per_page
            )));
        }

        Ok(Self {
            items,
            total_count,
            page,
            per_page,
        })
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of pages needed for `total_count` items
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.per_page as u64)
    }
}

/// The authenticated user the views are loaded for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}
