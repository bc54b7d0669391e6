//! HTTP API of the dashboard: table and panel views, health checks and
//! Prometheus metrics

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use ros_lib::{
    client::RosApi,
    columns::Column,
    health::{ComponentStatus, HealthRegistry},
    inventory::{EntitiesConfig, InventoryProvider},
    models::{EntitiesResponse, RecommendationsResponse, SystemsResponse},
    query::{Pagination, RecommendationsQuery, SortDirection, SystemsQuery, HOSTNAME_OR_ID},
    store::{Reduction, SortBy},
    RecommendationsPanel, RosError, Store, SystemListPage, TableConfig, UserResolver,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    /// Systems table; its store holds the last committed page and the
    /// expanded rows
    pub systems: Arc<SystemListPage>,
    pub api: Arc<dyn RosApi>,
    pub users: Arc<dyn UserResolver>,
    pub default_per_page: u32,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        api: Arc<dyn RosApi>,
        users: Arc<dyn UserResolver>,
        default_per_page: u32,
    ) -> Self {
        Self {
            health_registry,
            systems: Arc::new(SystemListPage::new(api.clone(), Store::new())),
            api,
            users,
            default_per_page,
        }
    }
}

/// Upstream wrapper reporting every call outcome to the health registry
pub struct Tracked<T> {
    inner: T,
    health: HealthRegistry,
    component: &'static str,
}

impl<T> Tracked<T> {
    pub fn new(inner: T, health: HealthRegistry, component: &'static str) -> Self {
        Self {
            inner,
            health,
            component,
        }
    }

    async fn observe<R>(&self, result: ros_lib::Result<R>) -> ros_lib::Result<R> {
        self.health
            .report(self.component, result.as_ref().err())
            .await;
        result
    }
}

#[async_trait]
impl<T: RosApi> RosApi for Tracked<T> {
    async fn systems(&self, query: &SystemsQuery) -> ros_lib::Result<SystemsResponse> {
        let result = self.inner.systems(query).await;
        self.observe(result).await
    }

    async fn system_recommendations(
        &self,
        inventory_id: &str,
        query: &RecommendationsQuery,
    ) -> ros_lib::Result<RecommendationsResponse> {
        let result = self.inner.system_recommendations(inventory_id, query).await;
        self.observe(result).await
    }
}

#[async_trait]
impl<T: InventoryProvider> InventoryProvider for Tracked<T> {
    async fn get_entities(
        &self,
        ids: &[String],
        config: &EntitiesConfig,
        force_refresh: bool,
    ) -> ros_lib::Result<EntitiesResponse> {
        let result = self.inner.get_entities(ids, config, force_refresh).await;
        self.observe(result).await
    }
}

/// Library error rendered as `{error, code}`
pub struct ApiError(RosError);

impl From<RosError> for ApiError {
    fn from(err: RosError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            // Requests are validated up front, so a page that breaks its
            // invariants came from the backend
            RosError::Http { .. }
            | RosError::Network(_)
            | RosError::Decode(_)
            | RosError::InvalidPage(_) => StatusCode::BAD_GATEWAY,
            RosError::InvalidQuery(_) | RosError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            RosError::Auth(_) => StatusCode::UNAUTHORIZED,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "Upstream request failed");
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SystemsParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub order_by: Option<String>,
    pub order_how: Option<SortDirection>,
    pub hostname_or_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExpandBody {
    pub is_open: bool,
}

/// One page of the systems table.
///
/// The response is rendered from this request's own result. The sort is
/// always sent explicitly since the table's current sort is shared by all
/// clients.
async fn list_systems(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SystemsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let column = match params.order_by.as_deref() {
        Some(key) => Column::from_key(key)
            .ok_or_else(|| RosError::InvalidQuery(format!("unknown sort column: {}", key)))?,
        None => Column::DisplayName,
    };
    let direction = params.order_how.unwrap_or_default();

    let mut config = TableConfig::new(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(state.default_per_page),
    );
    config.order_by = Some(column.key().to_string());
    config.order_direction = Some(direction);
    if let Some(filter) = params.hostname_or_id {
        config.filters.insert(HOSTNAME_OR_ID.to_string(), filter);
    }

    let page = state.systems.get_entities(&config).await?;
    let sort_by = SortBy {
        key: column.key().to_string(),
        direction,
    };
    Ok(Json(state.systems.render(&page, sort_by).await))
}

/// Open or close the detail row of a system on the current page
async fn expand_system(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ExpandBody>,
) -> Response {
    match state.systems.expand_row(&id, body.is_open).await {
        Reduction::Applied => Json(state.systems.view().await).into_response(),
        _ => {
            let body = json!({
                "error": format!("system {} is not on the current page", id),
                "code": StatusCode::NOT_FOUND.as_u16(),
            });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

/// Recommendations panel of one system
async fn system_recommendations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = Pagination::new(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(state.default_per_page),
    );
    // Each request gets its own store so concurrent panels never see each
    // other's page
    let panel = RecommendationsPanel::new(id, state.api.clone(), state.users.clone(), Store::new())
        .with_pagination(pagination);

    panel.mount().await?;
    Ok(Json(panel.view().await))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/systems", get(list_systems))
        .route("/api/systems/:id/expand", post(expand_system))
        .route("/api/systems/:id/recommendations", get(system_recommendations))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting dashboard server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
