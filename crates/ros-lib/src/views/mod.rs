//! Controllers behind the two dashboard views
//!
//! This module provides:
//! - The systems table with inventory merge, sort and row expansion
//! - The per-system recommendations panel with pagination
//!
//! Both commit their results to the shared [`Store`](crate::store::Store)
//! and render view models from it.

mod recommendations;
mod systems;


pub use recommendations::{PaginationUpdate, PanelView, RecommendationsPanel};
pub use systems::{SystemListPage, SystemRow, SystemsView, TableConfig};

use crate::query::Pagination;
use serde::Serialize;

/// State of a pagination control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationView {
    /// Current page, or 0 when there is nothing to page through
    pub page: u32,
    pub per_page: u32,
    pub item_count: u64,
}

impl PaginationView {
    pub fn new(requested: Pagination, item_count: u64) -> Self {
        Self {
            page: if item_count == 0 { 0 } else { requested.page },
            per_page: requested.per_page,
            item_count,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.item_count.div_ceil(self.per_page as u64)
    }
}
