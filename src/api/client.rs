//! HTTP implementation of [`ActivityApi`].

use super::wire::{
    error_message, merge_histories, EventEnvelope, MetricsSearchResponse, ProjectAnalysesResponse,
    SearchHistoryResponse,
};
use super::{ActivityApi, ActivityPage, ApiError, EventResponse};
use crate::models::{
    AnalysisStatus, BranchLike, Component, EventCategory, MeasureHistory, Metric, RawQuery,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const METRICS_PAGE_SIZE: u32 = 500;
const HISTORY_PAGE_SIZE: u32 = 1000;
/// Upper bound on pages requested by the catalog and history loops.
const MAX_PAGED_REQUESTS: u32 = 100;

/// Connection settings for the server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
    /// Added to every component-scoped request.
    pub branch: Option<BranchLike>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            token: None,
            timeout_seconds: 60,
            branch: None,
        }
    }
}

type Params = Vec<(String, String)>;

/// Whether a paged loop stops after `page`. Warns when the cap cuts it short.
fn paging_done(what: &str, page: u32, last_page: bool, total: u32) -> bool {
    if last_page {
        return true;
    }
    if page >= MAX_PAGED_REQUESTS {
        warn!(
            "Stopping {} after {} pages; server reports {} entries",
            what, page, total
        );
        return true;
    }
    false
}

/// Server web API client.
pub struct SonarClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl SonarClient {
    /// Create a client for the configured server.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        info!("Using server {}", config.base_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("project-activity/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn branch_params(&self, params: &mut Params) {
        if let Some(ref branch) = self.config.branch {
            let (key, value) = branch.query_param();
            params.push((key.to_string(), value.to_string()));
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let request = match self.config.token {
            Some(ref token) => request.basic_auth(token, None::<&str>),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.timeout_seconds)
            } else if e.is_connect() {
                ApiError::Connect(self.config.base_url.clone())
            } else {
                ApiError::Transport(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status,
                body: error_message(&body),
            });
        }

        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &Params) -> Result<T, ApiError> {
        debug!("GET {} {:?}", path, params);
        let response = self
            .send(self.http_client.get(self.url(path)).query(params))
            .await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
    }

    async fn post(&self, path: &str, params: &Params) -> Result<reqwest::Response, ApiError> {
        debug!("POST {} {:?}", path, params);
        self.send(self.http_client.post(self.url(path)).form(params))
            .await
    }
}

#[async_trait]
impl ActivityApi for SonarClient {
    async fn fetch_component(&self, key: &str) -> Result<Component, ApiError> {
        let mut params = vec![("component".to_string(), key.to_string())];
        self.branch_params(&mut params);
        self.get("api/navigation/component", &params).await
    }

    async fn fetch_activity(
        &self,
        project: &str,
        statuses: &[AnalysisStatus],
        page: u32,
        page_size: u32,
        filters: &RawQuery,
    ) -> Result<ActivityPage, ApiError> {
        // Explicit parameters win over free-form filters with the same key.
        let mut merged = filters.clone();
        merged.insert("project".to_string(), project.to_string());
        merged.insert(
            "statuses".to_string(),
            statuses
                .iter()
                .map(|s| s.code())
                .collect::<Vec<_>>()
                .join(","),
        );
        merged.insert("p".to_string(), page.to_string());
        merged.insert("ps".to_string(), page_size.to_string());

        let mut params: Params = merged.into_iter().collect();
        self.branch_params(&mut params);

        let response: ProjectAnalysesResponse =
            self.get("api/project_analyses/search", &params).await?;
        Ok(ActivityPage {
            analyses: response.analyses,
            paging: response.paging,
        })
    }

    async fn fetch_all_metrics(&self) -> Result<Vec<Metric>, ApiError> {
        let mut metrics = Vec::new();
        let mut page = 1;

        loop {
            let params = vec![
                ("p".to_string(), page.to_string()),
                ("ps".to_string(), METRICS_PAGE_SIZE.to_string()),
            ];
            let response: MetricsSearchResponse = self.get("api/metrics/search", &params).await?;
            let done = paging_done(
                "metric catalog",
                page,
                response.is_last_page(),
                response.total,
            );
            metrics.extend(response.metrics);

            if done {
                break;
            }
            page += 1;
        }

        debug!("Loaded {} metric definitions", metrics.len());
        Ok(metrics)
    }

    async fn fetch_measures_history(
        &self,
        component: &str,
        metrics: &[String],
    ) -> Result<Vec<MeasureHistory>, ApiError> {
        let mut histories = Vec::new();
        let mut page = 1;

        loop {
            let mut params = vec![
                ("component".to_string(), component.to_string()),
                ("metrics".to_string(), metrics.join(",")),
                ("p".to_string(), page.to_string()),
                ("ps".to_string(), HISTORY_PAGE_SIZE.to_string()),
            ];
            self.branch_params(&mut params);

            let response: SearchHistoryResponse =
                self.get("api/measures/search_history", &params).await?;
            let done = paging_done(
                "measure history",
                page,
                response.paging.is_last_page(),
                response.paging.total,
            );
            merge_histories(&mut histories, response.measures);

            if done {
                break;
            }
            page += 1;
        }

        Ok(histories)
    }

    async fn create_event(
        &self,
        analysis: &str,
        name: &str,
        category: Option<EventCategory>,
    ) -> Result<EventResponse, ApiError> {
        let mut params = vec![
            ("analysis".to_string(), analysis.to_string()),
            ("name".to_string(), name.to_string()),
        ];
        if let Some(category) = category {
            params.push(("category".to_string(), category.code().to_string()));
        }

        let envelope: EventEnvelope = self
            .post("api/project_analyses/create_event", &params)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("create_event: {}", e)))?;
        Ok(envelope.into())
    }

    async fn change_event(&self, event: &str, name: &str) -> Result<EventResponse, ApiError> {
        let params = vec![
            ("event".to_string(), event.to_string()),
            ("name".to_string(), name.to_string()),
        ];

        let envelope: EventEnvelope = self
            .post("api/project_analyses/update_event", &params)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("update_event: {}", e)))?;
        Ok(envelope.into())
    }

    async fn delete_analysis(&self, analysis: &str) -> Result<(), ApiError> {
        let params = vec![("analysis".to_string(), analysis.to_string())];
        self.post("api/project_analyses/delete", &params).await?;
        Ok(())
    }

    async fn delete_event(&self, event: &str) -> Result<(), ApiError> {
        let params = vec![("event".to_string(), event.to_string())];
        self.post("api/project_analyses/delete_event", &params)
            .await?;
        Ok(())
    }
}
