//! Recommendations panel of a single system

use super::PaginationView;
use crate::auth::UserResolver;
use crate::client::RosApi;
use crate::error::Result;
use crate::models::{PageResult, RecommendationRecord};
use crate::observability::{RosMetrics, StructuredLogger};
use crate::query::{Pagination, RecommendationsQuery};
use crate::store::{Action, Reduction, Store};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Change requested from a pagination control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationUpdate {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PaginationUpdate {
    /// Jump to `page`, keeping the page size
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: None,
        }
    }

    /// New page size; restarts from the first page
    pub fn per_page(per_page: u32) -> Self {
        Self {
            page: Some(1),
            per_page: Some(per_page),
        }
    }

    fn apply(&self, current: Pagination) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(current.page),
            per_page: self.per_page.unwrap_or(current.per_page),
        }
    }
}

/// Render model of the panel
#[derive(Debug, Clone, Serialize)]
pub struct PanelView {
    pub inventory_id: String,
    pub loading: bool,
    /// `None` while a fetch is outstanding
    pub recommendations: Option<Vec<RecommendationRecord>>,
    /// Shared by the top and bottom pagination controls
    pub pagination: PaginationView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct RecommendationsPanel {
    inventory_id: String,
    api: Arc<dyn RosApi>,
    users: Arc<dyn UserResolver>,
    store: Store,
    pagination: RwLock<Pagination>,
    logger: StructuredLogger,
    metrics: RosMetrics,
}

impl RecommendationsPanel {
    pub fn new(
        inventory_id: impl Into<String>,
        api: Arc<dyn RosApi>,
        users: Arc<dyn UserResolver>,
        store: Store,
    ) -> Self {
        Self {
            inventory_id: inventory_id.into(),
            api,
            users,
            store,
            pagination: RwLock::new(Pagination::default()),
            logger: StructuredLogger::new("recommendations"),
            metrics: RosMetrics::new(),
        }
    }

    /// Start from `pagination` instead of the first page of ten
    pub fn with_pagination(self, pagination: Pagination) -> Self {
        Self {
            pagination: RwLock::new(pagination),
            ..self
        }
    }

    pub async fn pagination(&self) -> Pagination {
        *self.pagination.read().await
    }

    /// Resolve the current user, then load the initial page
    pub async fn mount(&self) -> Result<PageResult<RecommendationRecord>> {
        let user = self.users.get_user().await?;
        debug!(user = %user.username, inventory_id = %self.inventory_id, "Mounting recommendations panel");

        let pagination = self.pagination().await;
        self.load(pagination).await
    }

    /// Fetch one page and commit it, replacing the previous result
    pub async fn load(&self, pagination: Pagination) -> Result<PageResult<RecommendationRecord>> {
        let query = RecommendationsQuery::from_pagination(pagination)?;

        let generation = self.store.next_generation();
        self.store
            .dispatch(Action::RecommendationsPending {
                generation,
                inventory_id: self.inventory_id.clone(),
            })
            .await;

        let result = self
            .api
            .system_recommendations(&self.inventory_id, &query)
            .await
            .and_then(|response| {
                PageResult::new(
                    response.data,
                    response.meta.count,
                    pagination.page,
                    pagination.per_page,
                )
            });

        match result {
            Ok(page) => {
                let reduction = self
                    .store
                    .dispatch(Action::RecommendationsFulfilled {
                        generation,
                        page: page.clone(),
                    })
                    .await;
                match reduction {
                    Reduction::Stale { latest } => {
                        self.metrics.inc_stale_responses();
                        self.logger
                            .log_stale_response("recommendations", generation, latest);
                    }
                    _ => self.logger.log_recommendations_fetched(
                        generation,
                        &self.inventory_id,
                        page.page(),
                        page.items().len(),
                        page.total_count(),
                    ),
                }
                Ok(page)
            }
            Err(e) => {
                self.store
                    .dispatch(Action::RecommendationsRejected {
                        generation,
                        error: e.to_string(),
                    })
                    .await;
                self.logger
                    .log_fetch_failed("recommendations", generation, &e.to_string());
                Err(e)
            }
        }
    }

    /// Merge `update` into the current pagination and load the result
    pub async fn update_pagination(
        &self,
        update: PaginationUpdate,
    ) -> Result<PageResult<RecommendationRecord>> {
        let next = {
            let mut pagination = self.pagination.write().await;
            let next = update.apply(*pagination);
            next.limit_offset()?;
            *pagination = next;
            next
        };
        self.load(next).await
    }

    /// Render the committed page of this system. Falls back to the control
    /// state when nothing is committed for it yet.
    pub async fn view(&self) -> PanelView {
        let requested = self.pagination().await;
        self.store
            .read(|state| {
                let recs = &state.recommendations;
                let ours = recs.inventory_id.as_deref() == Some(self.inventory_id.as_str());
                let loading = ours && recs.request.loading;
                let item_count = if ours { recs.total() } else { 0 };
                let pagination = match recs.page.as_ref().filter(|_| ours) {
                    Some(page) => Pagination::new(page.page(), page.per_page()),
                    None => requested,
                };

                let recommendations = if loading {
                    None
                } else {
                    Some(
                        recs.page
                            .as_ref()
                            .filter(|_| ours)
                            .map(|page| page.items().to_vec())
                            .unwrap_or_default(),
                    )
                };

                PanelView {
                    inventory_id: self.inventory_id.clone(),
                    loading,
                    recommendations,
                    pagination: PaginationView::new(pagination, item_count),
                    error: if ours { recs.request.error.clone() } else { None },
                }
            })
            .await
    }
}
