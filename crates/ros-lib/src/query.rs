//! Query parameter building for the ROS list endpoints

use crate::columns::Column;
use crate::error::{Result, RosError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Filter name that maps onto the `display_name` query parameter
pub const HOSTNAME_OR_ID: &str = "hostnameOrId";

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Sort direction, serialized the way the API expects it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = RosError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(RosError::InvalidQuery(format!(
                "unknown sort direction '{}'",
                other
            ))),
        }
    }
}

/// Page position requested by a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// `(limit, offset)` for this page; rejects zero page or per_page
    pub fn limit_offset(&self) -> Result<(u32, u64)> {
        if self.page == 0 {
            return Err(RosError::InvalidQuery("page must be at least 1".to_string()));
        }
        if self.per_page == 0 {
            return Err(RosError::InvalidQuery(
                "per_page must be at least 1".to_string(),
            ));
        }
        let offset = (self.page as u64 - 1) * self.per_page as u64;
        Ok((self.per_page, offset))
    }
}

/// Full parameter set of a systems table fetch
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub pagination: Pagination,
    pub order_by: Column,
    pub order_direction: SortDirection,
    pub filters: BTreeMap<String, String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            pagination: Pagination::default(),
            order_by: Column::DisplayName,
            order_direction: SortDirection::Asc,
            filters: BTreeMap::new(),
        }
    }
}

impl QueryParams {
    /// Set the hostname-or-id filter
    pub fn with_name_filter(mut self, value: impl Into<String>) -> Self {
        self.filters.insert(HOSTNAME_OR_ID.to_string(), value.into());
        self
    }
}

/// Query string of `GET /api/ros/v1/systems`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemsQuery {
    pub limit: u32,
    pub offset: u64,
    pub order_by: &'static str,
    pub order_how: SortDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SystemsQuery {
    pub fn from_params(params: &QueryParams) -> Result<Self> {
        let (limit, offset) = params.pagination.limit_offset()?;
        let display_name = params
            .filters
            .get(HOSTNAME_OR_ID)
            .filter(|value| !value.is_empty())
            .cloned();

        Ok(Self {
            limit,
            offset,
            order_by: params.order_by.sort_key(),
            order_how: params.order_direction,
            display_name,
        })
    }
}

/// Query string of `GET /api/ros/v1/systems/{id}/recommendations`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecommendationsQuery {
    pub limit: u32,
    pub offset: u64,
}

impl RecommendationsQuery {
    pub fn from_pagination(pagination: Pagination) -> Result<Self> {
        let (limit, offset) = pagination.limit_offset()?;
        Ok(Self { limit, offset })
    }
}
