//! Response envelopes of the server web API.

use super::EventResponse;
use crate::models::{Analysis, Event, EventCategory, MeasureHistory, Metric, Paging};
use serde::Deserialize;

/// `api/project_analyses/search`
#[derive(Debug, Deserialize)]
pub struct ProjectAnalysesResponse {
    #[serde(default)]
    pub analyses: Vec<Analysis>,
    pub paging: Paging,
}

/// `api/metrics/search`
#[derive(Debug, Deserialize)]
pub struct MetricsSearchResponse {
    #[serde(default)]
    pub metrics: Vec<Metric>,
    pub total: u32,
    pub p: u32,
    pub ps: u32,
}

impl MetricsSearchResponse {
    pub fn is_last_page(&self) -> bool {
        Paging {
            page_index: self.p,
            page_size: self.ps,
            total: self.total,
        }
        .is_last_page()
    }
}

/// `api/measures/search_history`
#[derive(Debug, Deserialize)]
pub struct SearchHistoryResponse {
    #[serde(default)]
    pub measures: Vec<MeasureHistory>,
    pub paging: Paging,
}

/// `api/project_analyses/create_event` and `update_event`
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub event: WireEvent,
}

#[derive(Debug, Deserialize)]
pub struct WireEvent {
    pub analysis: String,
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<EventCategory>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<EventEnvelope> for EventResponse {
    fn from(envelope: EventEnvelope) -> Self {
        let WireEvent {
            analysis,
            key,
            name,
            category,
            description,
        } = envelope.event;
        EventResponse {
            analysis,
            event: Event {
                key,
                name,
                category,
                description,
            },
        }
    }
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorsResponse {
    #[serde(default)]
    pub errors: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorMessage {
    pub msg: String,
}

/// Extract readable messages from an error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorsResponse>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| e.msg)
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

/// Append one page of histories to the accumulated ones, metric by metric.
pub fn merge_histories(accumulated: &mut Vec<MeasureHistory>, page: Vec<MeasureHistory>) {
    for measure in page {
        match accumulated.iter_mut().find(|m| m.metric == measure.metric) {
            Some(existing) => existing.history.extend(measure.history),
            None => accumulated.push(measure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_analyses() {
        let json = r#"{
            "paging": {"pageIndex": 1, "pageSize": 100, "total": 2},
            "analyses": [
                {"key": "A1", "date": "2021-05-01T10:00:00+0200", "events": []},
                {"key": "A2", "date": "2021-04-01T10:00:00+0200",
                 "events": [{"key": "E1", "category": "VERSION", "name": "2.0"}]}
            ]
        }"#;
        let response: ProjectAnalysesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.analyses.len(), 2);
        assert_eq!(response.paging.total, 2);
        assert_eq!(response.analyses[1].events[0].name, "2.0");
    }

    #[test]
    fn test_event_envelope_conversion() {
        let json = r#"{"event": {"analysis": "A1", "key": "E9", "category": "OTHER", "name": "Release candidate"}}"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        let response = EventResponse::from(envelope);
        assert_eq!(response.analysis, "A1");
        assert_eq!(response.event.key, "E9");
        assert_eq!(response.event.category, Some(EventCategory::Other));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"errors": [{"msg": "Analysis 'X' not found"}, {"msg": "second"}]}"#;
        assert_eq!(error_message(body), "Analysis 'X' not found; second");
        assert_eq!(error_message("  plain text \n"), "plain text");
    }

    #[test]
    fn test_merge_histories() {
        let json_a = r#"[{"metric": "bugs", "history": [{"date": "2020-01-01", "value": "1"}]}]"#;
        let json_b = r#"[
            {"metric": "bugs", "history": [{"date": "2020-02-01", "value": "2"}]},
            {"metric": "coverage", "history": [{"date": "2020-02-01", "value": "80.0"}]}
        ]"#;
        let mut accumulated: Vec<MeasureHistory> = serde_json::from_str(json_a).unwrap();
        merge_histories(&mut accumulated, serde_json::from_str(json_b).unwrap());

        assert_eq!(accumulated.len(), 2);
        assert_eq!(accumulated[0].history.len(), 2);
        assert_eq!(accumulated[0].latest_value(), Some("2"));
        assert_eq!(accumulated[1].metric, "coverage");
    }
}
