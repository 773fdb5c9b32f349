//! Recording in-memory [`ActivityApi`] for tests.

use super::{ActivityApi, ActivityPage, ApiError, EventResponse};
use crate::models::{
    Analysis, AnalysisStatus, Breadcrumb, Component, Event, EventCategory, HistoryItem,
    MeasureHistory, Metric, Paging, Qualifier, RawQuery,
};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// One recorded `fetch_activity` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityCall {
    pub project: String,
    pub statuses: Vec<AnalysisStatus>,
    pub page: u32,
    pub page_size: u32,
    pub filters: RawQuery,
}

/// One recorded `fetch_measures_history` call.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryCall {
    pub component: String,
    pub metrics: Vec<String>,
}

pub struct MockApi {
    pub component: Component,
    pub analyses: Vec<Analysis>,
    /// Reported total, when it should disagree with `analyses.len()`.
    pub total_override: Option<u32>,
    pub metrics: Vec<Metric>,
    pub histories: Vec<MeasureHistory>,
    pub fail_first_batch: AtomicBool,
    /// Backfill pages at or after this index fail.
    pub fail_backfill_from: Option<u32>,
    pub fail_mutations: AtomicBool,
    pub fail_history: AtomicBool,
    /// Page size of the first batch, used to tell backfill requests apart.
    pub first_batch_size: u32,
    /// When set, backfill requests wait for a notification before answering.
    pub backfill_gate: Option<Arc<Notify>>,
    /// While set, history requests wait on `history_gate` before answering.
    pub hold_history: AtomicBool,
    pub history_gate: Notify,
    pub activity_calls: Mutex<Vec<ActivityCall>>,
    pub history_calls: Mutex<Vec<HistoryCall>>,
    pub metrics_calls: AtomicUsize,
    pub mutation_calls: Mutex<Vec<String>>,
}

pub fn analysis(index: usize) -> Analysis {
    Analysis {
        key: format!("A{}", index),
        date: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() - Duration::days(index as i64),
        events: vec![],
        project_version: None,
        build_string: None,
        manual_new_code_period_baseline: false,
    }
}

pub fn event(key: &str, name: &str, category: Option<EventCategory>) -> Event {
    Event {
        key: key.to_string(),
        name: name.to_string(),
        category,
        description: None,
    }
}

pub fn metric(key: &str) -> Metric {
    Metric {
        key: key.to_string(),
        name: key.replace('_', " "),
        metric_type: "INT".to_string(),
        domain: None,
        description: None,
        hidden: false,
    }
}

pub fn history(metric: &str, values: &[&str]) -> MeasureHistory {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    MeasureHistory {
        metric: metric.to_string(),
        history: values
            .iter()
            .enumerate()
            .map(|(i, v)| HistoryItem {
                date: start + Duration::days(i as i64),
                value: Some(v.to_string()),
            })
            .collect(),
    }
}

pub fn project_component(key: &str) -> Component {
    Component {
        key: key.to_string(),
        name: key.to_uppercase(),
        qualifier: Qualifier::Project,
        breadcrumbs: vec![Breadcrumb {
            key: key.to_string(),
            name: key.to_uppercase(),
            qualifier: Qualifier::Project,
        }],
    }
}

impl MockApi {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            analyses: Vec::new(),
            total_override: None,
            metrics: vec![
                metric("bugs"),
                metric("code_smells"),
                metric("security_hotspots_reviewed"),
                metric("security_review_rating"),
            ],
            histories: vec![
                history("bugs", &["3", "2"]),
                history("code_smells", &["10", "8"]),
                history("coverage", &["71.0", "72.5"]),
            ],
            fail_first_batch: AtomicBool::new(false),
            fail_backfill_from: None,
            fail_mutations: AtomicBool::new(false),
            fail_history: AtomicBool::new(false),
            first_batch_size: 100,
            backfill_gate: None,
            hold_history: AtomicBool::new(false),
            history_gate: Notify::new(),
            activity_calls: Mutex::new(Vec::new()),
            history_calls: Mutex::new(Vec::new()),
            metrics_calls: AtomicUsize::new(0),
            mutation_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_analyses(mut self, count: usize) -> Self {
        self.analyses = (0..count).map(analysis).collect();
        self
    }

    pub fn backfill_calls(&self) -> Vec<ActivityCall> {
        self.activity_calls
            .lock()
            .iter()
            .filter(|c| c.page_size != self.first_batch_size)
            .cloned()
            .collect()
    }

    pub fn first_batch_calls(&self) -> usize {
        let backfill = self.backfill_calls().len();
        let all = self.activity_calls.lock().len();
        all - backfill
    }

    pub fn history_call_count(&self) -> usize {
        self.history_calls.lock().len()
    }

    fn check_mutation(&self, call: String) -> Result<(), ApiError> {
        self.mutation_calls.lock().push(call);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 400,
                body: "rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ActivityApi for MockApi {
    async fn fetch_component(&self, _key: &str) -> Result<Component, ApiError> {
        Ok(self.component.clone())
    }

    async fn fetch_activity(
        &self,
        project: &str,
        statuses: &[AnalysisStatus],
        page: u32,
        page_size: u32,
        filters: &RawQuery,
    ) -> Result<ActivityPage, ApiError> {
        self.activity_calls.lock().push(ActivityCall {
            project: project.to_string(),
            statuses: statuses.to_vec(),
            page,
            page_size,
            filters: filters.clone(),
        });

        let backfill = page_size != self.first_batch_size;
        if backfill {
            if let Some(ref gate) = self.backfill_gate {
                gate.notified().await;
            }
            if matches!(self.fail_backfill_from, Some(from) if page >= from) {
                return Err(ApiError::Connect("mock".to_string()));
            }
        } else if self.fail_first_batch.load(Ordering::SeqCst) {
            return Err(ApiError::Connect("mock".to_string()));
        }

        let start = ((page - 1) * page_size) as usize;
        let end = (start + page_size as usize).min(self.analyses.len());
        let analyses = if start < end {
            self.analyses[start..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(ActivityPage {
            analyses,
            paging: Paging {
                page_index: page,
                page_size,
                total: self
                    .total_override
                    .unwrap_or(self.analyses.len() as u32),
            },
        })
    }

    async fn fetch_all_metrics(&self) -> Result<Vec<Metric>, ApiError> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metrics.clone())
    }

    async fn fetch_measures_history(
        &self,
        component: &str,
        metrics: &[String],
    ) -> Result<Vec<MeasureHistory>, ApiError> {
        self.history_calls.lock().push(HistoryCall {
            component: component.to_string(),
            metrics: metrics.to_vec(),
        });
        if self.hold_history.load(Ordering::SeqCst) {
            self.history_gate.notified().await;
        }
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(ApiError::Timeout(1));
        }
        Ok(self
            .histories
            .iter()
            .filter(|h| metrics.contains(&h.metric))
            .cloned()
            .collect())
    }

    async fn create_event(
        &self,
        analysis: &str,
        name: &str,
        category: Option<EventCategory>,
    ) -> Result<EventResponse, ApiError> {
        self.check_mutation(format!("create_event {} {}", analysis, name))?;
        Ok(EventResponse {
            analysis: analysis.to_string(),
            event: event(&format!("E-{}", name), name, category),
        })
    }

    async fn change_event(&self, event_key: &str, name: &str) -> Result<EventResponse, ApiError> {
        self.check_mutation(format!("change_event {} {}", event_key, name))?;
        let owner = self
            .analyses
            .iter()
            .find(|a| a.events.iter().any(|e| e.key == event_key))
            .map(|a| a.key.clone())
            .unwrap_or_default();
        Ok(EventResponse {
            analysis: owner,
            event: event(event_key, name, Some(EventCategory::Other)),
        })
    }

    async fn delete_analysis(&self, analysis: &str) -> Result<(), ApiError> {
        self.check_mutation(format!("delete_analysis {}", analysis))
    }

    async fn delete_event(&self, event_key: &str) -> Result<(), ApiError> {
        self.check_mutation(format!("delete_event {}", event_key))
    }
}
