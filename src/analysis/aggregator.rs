//! Activity aggregation and statistics.
//!
//! This module provides utilities for summarizing a loaded analysis history
//! and its metric series.

use crate::models::{Analysis, Event, EventCategory, MeasureHistory, Metric};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Summary of a loaded activity history.
#[derive(Debug, Clone, Default)]
pub struct ActivitySummary {
    /// Total number of analyses.
    pub total_analyses: usize,
    /// Analyses carrying at least one event.
    pub analyses_with_events: usize,
    /// Event counts per category.
    pub events_by_category: HashMap<String, usize>,
    /// Oldest analysis date.
    pub first_date: Option<DateTime<Utc>>,
    /// Most recent analysis date.
    pub last_date: Option<DateTime<Utc>>,
}

impl ActivitySummary {
    /// Creates a summary from a list of analyses.
    pub fn from_analyses(analyses: &[Analysis]) -> Self {
        Self {
            total_analyses: analyses.len(),
            analyses_with_events: analyses.iter().filter(|a| !a.events.is_empty()).count(),
            events_by_category: group_events_by_category(analyses),
            first_date: analyses.iter().map(|a| a.date).min(),
            last_date: analyses.iter().map(|a| a.date).max(),
        }
    }
}

fn category_label(event: &Event) -> String {
    event
        .category
        .map(|c| c.to_string())
        .unwrap_or_else(|| "Uncategorized".to_string())
}

/// Count events by category.
pub fn group_events_by_category(analyses: &[Analysis]) -> HashMap<String, usize> {
    let mut grouped: HashMap<String, usize> = HashMap::new();

    for event in analyses.iter().flat_map(|a| &a.events) {
        *grouped.entry(category_label(event)).or_default() += 1;
    }

    grouped
}

/// Version events with the analysis they mark, in list order.
pub fn versions(analyses: &[Analysis]) -> Vec<(&Analysis, &Event)> {
    analyses
        .iter()
        .flat_map(|a| a.events.iter().map(move |e| (a, e)))
        .filter(|(_, e)| e.category == Some(EventCategory::Version))
        .collect()
}

/// Number of analyses per month (`YYYY-MM`), oldest first.
pub fn analyses_per_month(analyses: &[Analysis]) -> BTreeMap<String, usize> {
    let mut months: BTreeMap<String, usize> = BTreeMap::new();

    for analysis in analyses {
        *months
            .entry(analysis.date.format("%Y-%m").to_string())
            .or_default() += 1;
    }

    months
}

/// Numeric change between the first and the latest value of a series.
pub fn metric_delta(history: &MeasureHistory) -> Option<f64> {
    let first: f64 = history.first_value()?.parse().ok()?;
    let latest: f64 = history.latest_value()?.parse().ok()?;
    Some(latest - first)
}

/// Display name of a metric, falling back to its key.
pub fn metric_name<'a>(metrics: &'a [Metric], key: &'a str) -> &'a str {
    metrics
        .iter()
        .find(|m| m.key == key)
        .map(|m| m.name.as_str())
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{analysis, event, history, metric};

    fn sample() -> Vec<Analysis> {
        let mut a = analysis(0);
        a.events = vec![
            event("E1", "2.0", Some(EventCategory::Version)),
            event("E2", "Green", Some(EventCategory::QualityGate)),
        ];
        let mut b = analysis(40);
        b.events = vec![event("E3", "1.0", Some(EventCategory::Version))];
        let mut c = analysis(41);
        c.events = vec![event("E4", "note", None)];
        vec![a, b, c, analysis(42)]
    }

    #[test]
    fn test_summary() {
        let analyses = sample();
        let summary = ActivitySummary::from_analyses(&analyses);

        assert_eq!(summary.total_analyses, 4);
        assert_eq!(summary.analyses_with_events, 3);
        assert_eq!(summary.events_by_category.get("Version"), Some(&2));
        assert_eq!(summary.events_by_category.get("Quality Gate"), Some(&1));
        assert_eq!(summary.events_by_category.get("Uncategorized"), Some(&1));
        assert_eq!(summary.first_date, Some(analyses[3].date));
        assert_eq!(summary.last_date, Some(analyses[0].date));
    }

    #[test]
    fn test_empty_summary() {
        let summary = ActivitySummary::from_analyses(&[]);
        assert_eq!(summary.total_analyses, 0);
        assert!(summary.first_date.is_none());
    }

    #[test]
    fn test_versions() {
        let analyses = sample();
        let names: Vec<&str> = versions(&analyses)
            .into_iter()
            .map(|(_, e)| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["2.0", "1.0"]);
    }

    #[test]
    fn test_analyses_per_month() {
        let months = analyses_per_month(&sample());
        assert_eq!(months.get("2024-01"), Some(&1));
        assert_eq!(months.values().sum::<usize>(), 4);
    }

    #[test]
    fn test_metric_delta() {
        assert_eq!(metric_delta(&history("bugs", &["10", "4"])), Some(-6.0));
        assert_eq!(metric_delta(&history("rating", &["A", "B"])), None);
    }

    #[test]
    fn test_metric_name() {
        let metrics = vec![metric("code_smells")];
        assert_eq!(metric_name(&metrics, "code_smells"), "code smells");
        assert_eq!(metric_name(&metrics, "ncloc"), "ncloc");
    }
}
