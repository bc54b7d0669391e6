//! Client library for the Resource Optimization dashboard
//!
//! This crate provides the core functionality for:
//! - Typed access to the ROS systems and recommendations API
//! - Inventory lookups and the merge of host data into system rows
//! - The systems table and recommendations panel controllers
//! - A reducer store that discards superseded responses
//! - Health checks and observability

pub mod auth;
pub mod client;
pub mod columns;
pub mod error;
pub mod health;
pub mod inventory;
pub mod models;
pub mod observability;
pub mod query;
pub mod store;
pub mod views;

pub use auth::{StaticUserResolver, UserResolver};
pub use client::{ApiClient, ClientConfig, RosApi};
pub use columns::{Cell, Column, Tone};
pub use error::{Result, RosError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use inventory::{EntitiesConfig, HttpInventoryProvider, InventoryProvider};
pub use models::*;
pub use observability::{RosMetrics, StructuredLogger};
pub use query::{Pagination, QueryParams, SortDirection};
pub use store::{Action, Reduction, Store};
pub use views::{
    PaginationUpdate, PaginationView, PanelView, RecommendationsPanel, SystemListPage,
    SystemsView, TableConfig,
};
