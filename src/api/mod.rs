//! Server API boundary.
//!
//! [`ActivityApi`] is the contract the activity loader consumes;
//! [`SonarClient`] implements it over HTTP.

pub mod client;
#[cfg(test)]
pub mod mock;
pub mod wire;

pub use client::SonarClient;

use crate::models::{
    Analysis, AnalysisStatus, Component, Event, EventCategory, MeasureHistory, Metric, Paging,
    RawQuery,
};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a server call.
///
/// Callers of the loader only distinguish success from failure; the variants
/// exist for log and error messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// One page of a project's analyses.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPage {
    pub analyses: Vec<Analysis>,
    pub paging: Paging,
}

/// An event as returned by create/update calls, with its owning analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct EventResponse {
    pub analysis: String,
    pub event: Event,
}

/// Calls the activity loader makes against the server.
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// Resolve a component and its breadcrumbs.
    async fn fetch_component(&self, key: &str) -> Result<Component, ApiError>;

    /// Fetch one page of analyses for a top-level component.
    async fn fetch_activity(
        &self,
        project: &str,
        statuses: &[AnalysisStatus],
        page: u32,
        page_size: u32,
        filters: &RawQuery,
    ) -> Result<ActivityPage, ApiError>;

    /// Fetch the whole metric catalog.
    async fn fetch_all_metrics(&self) -> Result<Vec<Metric>, ApiError>;

    /// Fetch the full history of the given metrics.
    async fn fetch_measures_history(
        &self,
        component: &str,
        metrics: &[String],
    ) -> Result<Vec<MeasureHistory>, ApiError>;

    async fn create_event(
        &self,
        analysis: &str,
        name: &str,
        category: Option<EventCategory>,
    ) -> Result<EventResponse, ApiError>;

    async fn change_event(&self, event: &str, name: &str) -> Result<EventResponse, ApiError>;

    async fn delete_analysis(&self, analysis: &str) -> Result<(), ApiError>;

    async fn delete_event(&self, event: &str) -> Result<(), ApiError>;
}
