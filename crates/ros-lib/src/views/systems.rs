//! Systems table: fetch, inventory merge, sort and row expansion

use super::PaginationView;
use crate::client::RosApi;
use crate::columns::{Cell, Column};
use crate::error::Result;
use crate::inventory::{merge_with_entities, EntitiesConfig, InventoryProvider};
use crate::models::{PageResult, SystemRecord, SystemsResponse};
use crate::observability::{RosMetrics, StructuredLogger};
use crate::query::{Pagination, QueryParams, SortDirection, SystemsQuery};
use crate::store::{entity_detail_reducer, Action, Reduction, SortBy, Store};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// What the table asks for when it needs rows
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub page: u32,
    pub per_page: u32,
    /// Column key (table key or sort key); `None` keeps the current sort
    pub order_by: Option<String>,
    pub order_direction: Option<SortDirection>,
    pub filters: BTreeMap<String, String>,
}

impl TableConfig {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            order_by: None,
            order_direction: None,
            filters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SortState {
    column: Column,
    direction: SortDirection,
}

/// A rendered table row
#[derive(Debug, Clone, Serialize)]
pub struct SystemRow {
    pub system: SystemRecord,
    /// One cell per column, in column order
    pub cells: Vec<Cell>,
    pub is_open: bool,
}

/// Render model of the systems table
#[derive(Debug, Clone, Serialize)]
pub struct SystemsView {
    pub loading: bool,
    pub columns: Vec<Column>,
    pub rows: Vec<SystemRow>,
    pub pagination: PaginationView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SystemListPage {
    api: Arc<dyn RosApi>,
    inventory: RwLock<Option<Arc<dyn InventoryProvider>>>,
    store: Store,
    sort: RwLock<SortState>,
    columns: Vec<Column>,
    logger: StructuredLogger,
    metrics: RosMetrics,
}

impl SystemListPage {
    pub fn new(api: Arc<dyn RosApi>, store: Store) -> Self {
        Self {
            api,
            inventory: RwLock::new(None),
            store,
            sort: RwLock::new(SortState {
                column: Column::DisplayName,
                direction: SortDirection::Asc,
            }),
            columns: Column::ALL.to_vec(),
            logger: StructuredLogger::new("systems"),
            metrics: RosMetrics::new(),
        }
    }

    /// Current sort column and direction
    pub async fn sort(&self) -> (Column, SortDirection) {
        let sort = self.sort.read().await;
        (sort.column, sort.direction)
    }

    /// Table finished loading: attach the provider, register the table
    /// reducer and publish the initial sort
    pub async fn on_load(&self, inventory: Option<Arc<dyn InventoryProvider>>) {
        *self.inventory.write().await = inventory;

        let added = self
            .store
            .register(entity_detail_reducer(self.columns.clone()))
            .await;
        debug!(added, "Registered systems table reducer");

        let sort = *self.sort.read().await;
        self.store
            .dispatch(Action::ChangeSort {
                key: sort.column.key().to_string(),
                direction: sort.direction,
            })
            .await;
    }

    /// GET one page of systems for `params`
    pub async fn fetch_systems(&self, params: &QueryParams) -> Result<SystemsResponse> {
        let query = SystemsQuery::from_params(params)?;
        self.api.systems(&query).await
    }

    /// Rows for the table: fetch, merge with inventory data and commit
    pub async fn get_entities(&self, config: &TableConfig) -> Result<PageResult<SystemRecord>> {
        // A rejected config must not touch the sort
        let pagination = Pagination::new(config.page, config.per_page);
        pagination.limit_offset()?;

        let sort = self.apply_sort(config).await;
        let params = QueryParams {
            pagination,
            order_by: sort.column,
            order_direction: sort.direction,
            filters: config.filters.clone(),
        };

        let generation = self.store.next_generation();
        self.store
            .dispatch(Action::SystemsPending { generation })
            .await;

        match self.fetch_and_merge(&params).await {
            Ok((page, misses)) => {
                let reduction = self
                    .store
                    .dispatch(Action::SystemsFulfilled {
                        generation,
                        page: page.clone(),
                    })
                    .await;
                match reduction {
                    Reduction::Stale { latest } => {
                        self.metrics.inc_stale_responses();
                        self.logger.log_stale_response("systems", generation, latest);
                    }
                    _ => {
                        self.metrics
                            .set_systems_total(page.total_count().min(i64::MAX as u64) as i64);
                        self.logger.log_systems_fetched(
                            generation,
                            page.page(),
                            page.per_page(),
                            page.items().len(),
                            page.total_count(),
                            misses,
                        );
                    }
                }
                Ok(page)
            }
            Err(e) => {
                self.store
                    .dispatch(Action::SystemsRejected {
                        generation,
                        error: e.to_string(),
                    })
                    .await;
                self.logger
                    .log_fetch_failed("systems", generation, &e.to_string());
                Err(e)
            }
        }
    }

    /// Open or close the detail row of a system
    pub async fn expand_row(&self, id: &str, is_open: bool) -> Reduction {
        self.store
            .dispatch(Action::ExpandRow {
                id: id.to_string(),
                is_open,
            })
            .await
    }

    /// Render whatever page is committed to the store
    pub async fn view(&self) -> SystemsView {
        self.store
            .read(|state| {
                let (rows, pagination) = match &state.systems.page {
                    Some(page) => self.rows_and_pagination(page, &state.entities.expanded),
                    None => (Vec::new(), PaginationView::new(Pagination::default(), 0)),
                };

                SystemsView {
                    loading: state.systems.request.loading,
                    columns: self.columns.clone(),
                    rows,
                    pagination,
                    sort_by: state.entities.sort_by.clone(),
                    error: state.systems.request.error.clone(),
                }
            })
            .await
    }

    /// Render `page` as returned to one caller of [`get_entities`], sorted
    /// by `sort_by`.
    ///
    /// Unlike [`view`], the rows do not depend on which request committed
    /// last; only the expanded ids are read from the store.
    ///
    /// [`get_entities`]: SystemListPage::get_entities
    /// [`view`]: SystemListPage::view
    pub async fn render(&self, page: &PageResult<SystemRecord>, sort_by: SortBy) -> SystemsView {
        self.store
            .read(|state| {
                let (rows, pagination) = self.rows_and_pagination(page, &state.entities.expanded);
                SystemsView {
                    loading: false,
                    columns: self.columns.clone(),
                    rows,
                    pagination,
                    sort_by: Some(sort_by),
                    error: None,
                }
            })
            .await
    }

    fn rows_and_pagination(
        &self,
        page: &PageResult<SystemRecord>,
        expanded: &BTreeSet<String>,
    ) -> (Vec<SystemRow>, PaginationView) {
        let rows = page
            .items()
            .iter()
            .map(|system| SystemRow {
                cells: self.columns.iter().map(|c| c.format(system)).collect(),
                is_open: expanded.contains(&system.inventory_id),
                system: system.clone(),
            })
            .collect();
        let committed = Pagination::new(page.page(), page.per_page());
        (rows, PaginationView::new(committed, page.total_count()))
    }

    /// Resolve the requested sort against the column table and publish changes
    async fn apply_sort(&self, config: &TableConfig) -> SortState {
        let mut sort = self.sort.write().await;
        let previous = *sort;

        if let Some(key) = config.order_by.as_deref() {
            match Column::from_key(key) {
                Some(column) => sort.column = column,
                None => warn!(
                    key = %key,
                    current = sort.column.key(),
                    "Unknown sort column, keeping current sort"
                ),
            }
        }
        if let Some(direction) = config.order_direction {
            sort.direction = direction;
        }

        let current = *sort;
        drop(sort);

        if current != previous {
            self.store
                .dispatch(Action::ChangeSort {
                    key: current.column.key().to_string(),
                    direction: current.direction,
                })
                .await;
        }
        current
    }

    async fn fetch_and_merge(
        &self,
        params: &QueryParams,
    ) -> Result<(PageResult<SystemRecord>, usize)> {
        let response = self.fetch_systems(params).await?;
        let ids: Vec<String> = response
            .data
            .iter()
            .map(|system| system.inventory_id.clone())
            .collect();

        let provider = self.inventory.read().await.clone();
        let (systems, misses) = match provider {
            Some(provider) if !ids.is_empty() => {
                let config = EntitiesConfig {
                    order_by: Some(params.order_by.key().to_string()),
                    order_direction: params.order_direction,
                    filters: params.filters.clone(),
                    ..EntitiesConfig::for_items(ids.len())
                };
                let entities = provider.get_entities(&ids, &config, false).await?;
                let outcome = merge_with_entities(response.data, entities.results);
                if !outcome.misses.is_empty() {
                    self.metrics.add_merge_misses(outcome.misses.len() as u64);
                    debug!(misses = ?outcome.misses, "Systems without inventory data");
                }
                (outcome.systems, outcome.misses.len())
            }
            _ => (response.data, 0),
        };

        let page = PageResult::new(
            systems,
            response.meta.count,
            params.pagination.page,
            params.pagination.per_page,
        )?;
        Ok((page, misses))
    }
}
