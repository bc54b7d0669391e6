//! HTTP client for the Resource Optimization API

use crate::error::{Result, RosError};
use crate::models::{RecommendationsResponse, SystemsResponse};
use crate::observability::RosMetrics;
use crate::query::{RecommendationsQuery, SystemsQuery};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

pub const ROS_API_ROOT: &str = "/api/ros/v1";
pub const SYSTEMS_API_ROOT: &str = "/systems";

/// Metric label of the systems collection endpoint
pub const SYSTEMS_ENDPOINT: &str = "systems";
/// Metric label of the per-system recommendations endpoint
pub const RECOMMENDATIONS_ENDPOINT: &str = "recommendations";

/// Read access to the ROS list endpoints
#[async_trait]
pub trait RosApi: Send + Sync {
    /// One page of systems
    async fn systems(&self, query: &SystemsQuery) -> Result<SystemsResponse>;

    /// One page of recommendations for a single system
    async fn system_recommendations(
        &self,
        inventory_id: &str,
        query: &RecommendationsQuery,
    ) -> Result<RecommendationsResponse>;
}

/// Settings for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Console origin, e.g. `https://console.example.com`
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// JSON-over-HTTP client rooted at a console origin
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    metrics: RosMetrics,
}

impl ApiClient {
    /// Create a client with default settings
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RosError::Network)?;

        // Paths are joined relative to the base, which needs a trailing slash
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        Ok(Self {
            client,
            base_url,
            token: config.token,
            metrics: RosMetrics::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// GET request builder for `url` with authentication applied
    pub(crate) fn request(&self, url: Url) -> RequestBuilder {
        let builder = self.client.get(url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Make a GET request with query parameters
    pub async fn get<T, Q>(&self, path: &str, query: &Q, label: &'static str) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        self.execute(self.request(url).query(query), label).await
    }

    /// Send a prepared request, timing it and decoding the JSON body
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        label: &'static str,
    ) -> Result<T> {
        let start = Instant::now();
        let result = self.send(builder, label).await;
        self.metrics
            .observe_request_latency(label, start.elapsed().as_secs_f64());
        if result.is_err() {
            self.metrics.inc_request_errors(label);
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        label: &'static str,
    ) -> Result<T> {
        let response = builder.send().await.map_err(|e| {
            warn!(endpoint = label, error = %e, "Request failed before a response");
            RosError::Network(e)
        })?;

        let status = response.status();
        debug!(endpoint = label, url = %response.url(), status = status.as_u16(), "Received response");

        if !status.is_success() {
            return Err(RosError::Http {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("Unknown Status")
                    .to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| RosError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RosApi for ApiClient {
    async fn systems(&self, query: &SystemsQuery) -> Result<SystemsResponse> {
        let path = format!("{}{}", ROS_API_ROOT, SYSTEMS_API_ROOT);
        self.get(&path, query, SYSTEMS_ENDPOINT).await
    }

    async fn system_recommendations(
        &self,
        inventory_id: &str,
        query: &RecommendationsQuery,
    ) -> Result<RecommendationsResponse> {
        let mut url = self.endpoint(&format!("{}{}", ROS_API_ROOT, SYSTEMS_API_ROOT))?;
        url.path_segments_mut()
            .map_err(|_| RosError::InvalidUrl(self.base_url.to_string()))?
            .push(inventory_id)
            .push("recommendations");

        self.execute(self.request(url).query(query), RECOMMENDATIONS_ENDPOINT)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::Column;
    use crate::query::{Pagination, QueryParams, SortDirection};
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::new("https://console.example.com/gateway").unwrap();
        let url = client.endpoint("/api/ros/v1/systems").unwrap();
        assert_eq!(
            url.as_str(),
            "https://console.example.com/gateway/api/ros/v1/systems"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(RosError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_systems_sends_query_and_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/ros/v1/systems")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "10".into()),
                Matcher::UrlEncoded("offset".into(), "10".into()),
                Matcher::UrlEncoded("order_by".into(), "io_score".into()),
                Matcher::UrlEncoded("order_how".into(), "desc".into()),
                Matcher::UrlEncoded("display_name".into(), "web".into()),
            ]))
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": [{"inventory_id": "a", "display_name": "web-a"}],
                    "meta": {"count": 25}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client =
            ApiClient::with_config(ClientConfig::new(server.url()).with_token(Some("secret".into())))
                .unwrap();
        let params = QueryParams {
            pagination: Pagination::new(2, 10),
            order_by: Column::IoScore,
            order_direction: SortDirection::Desc,
            ..QueryParams::default()
        }
        .with_name_filter("web");
        let query = SystemsQuery::from_params(&params).unwrap();

        let response = client.systems(&query).await.unwrap();
        assert_eq!(response.meta.count, 25);
        assert_eq!(response.data[0].inventory_id, "a");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_carries_status_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/ros/v1/systems")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let query = SystemsQuery::from_params(&QueryParams::default()).unwrap();

        let err = client.systems(&query).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[tokio::test]
    async fn test_recommendations_path_and_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/ros/v1/systems/abc-123/recommendations")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "5".into()),
                Matcher::UrlEncoded("offset".into(), "0".into()),
            ]))
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let query = RecommendationsQuery::from_pagination(Pagination::new(1, 5)).unwrap();

        let err = client
            .system_recommendations("abc-123", &query)
            .await
            .unwrap_err();
        assert!(matches!(err, RosError::Decode(_)));
        mock.assert_async().await;
    }
}
