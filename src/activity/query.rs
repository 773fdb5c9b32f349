//! View query state and its URL representation.

use super::graph::{split_metrics, GraphType, DEFAULT_GRAPH};
use crate::models::{server_date, RawQuery};
use chrono::{DateTime, Utc};
use serde::Serialize;

const CATEGORY: &str = "category";
const CUSTOM_METRICS: &str = "custom_metrics";
const FROM: &str = "from";
const GRAPH: &str = "graph";
const ID: &str = "id";
const SELECTED_DATE: &str = "selected_date";
const TO: &str = "to";

const KNOWN_KEYS: [&str; 7] = [CATEGORY, CUSTOM_METRICS, FROM, GRAPH, ID, SELECTED_DATE, TO];

/// User-selected view state.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Query {
    /// Event category filter, empty for all.
    pub category: String,
    pub custom_metrics: Vec<String>,
    pub from: Option<DateTime<Utc>>,
    pub graph: GraphType,
    /// Component key, carried as `id` in URLs.
    pub project: String,
    pub selected_date: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Unrecognized keys, passed through unchanged.
    pub extra: RawQuery,
}

/// Partial update of a [`Query`]; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct QueryUpdate {
    pub category: Option<String>,
    pub custom_metrics: Option<Vec<String>>,
    pub from: Option<Option<DateTime<Utc>>>,
    pub graph: Option<GraphType>,
    pub selected_date: Option<Option<DateTime<Utc>>>,
    pub to: Option<Option<DateTime<Utc>>>,
}

impl Query {
    /// Copy of this query with the update applied.
    pub fn merged(&self, update: &QueryUpdate) -> Query {
        let mut query = self.clone();
        if let Some(ref category) = update.category {
            query.category = category.clone();
        }
        if let Some(ref metrics) = update.custom_metrics {
            query.custom_metrics = metrics.clone();
        }
        if let Some(from) = update.from {
            query.from = from;
        }
        if let Some(graph) = update.graph {
            query.graph = graph;
        }
        if let Some(selected_date) = update.selected_date {
            query.selected_date = selected_date;
        }
        if let Some(to) = update.to {
            query.to = to;
        }
        query
    }
}

fn parse_date(raw: &RawQuery, key: &str) -> Option<DateTime<Utc>> {
    raw.get(key).and_then(|value| server_date::parse(value))
}

/// Parse a URL query into view state. Unknown graphs fall back to the default.
pub fn parse_query(raw: &RawQuery) -> Query {
    let extra = raw
        .iter()
        .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Query {
        category: raw.get(CATEGORY).cloned().unwrap_or_default(),
        custom_metrics: raw
            .get(CUSTOM_METRICS)
            .map(|value| split_metrics(value))
            .unwrap_or_default(),
        from: parse_date(raw, FROM),
        graph: raw
            .get(GRAPH)
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_GRAPH),
        project: raw.get(ID).cloned().unwrap_or_default(),
        selected_date: parse_date(raw, SELECTED_DATE),
        to: parse_date(raw, TO),
        extra,
    }
}

fn insert_non_empty(raw: &mut RawQuery, key: &str, value: String) {
    if !value.is_empty() {
        raw.insert(key.to_string(), value);
    }
}

fn insert_date(raw: &mut RawQuery, key: &str, date: Option<DateTime<Utc>>) {
    if let Some(date) = date {
        raw.insert(key.to_string(), server_date::format(&date));
    }
}

/// Serialize view state for a navigable URL, dropping empty values.
pub fn serialize_url_query(query: &Query) -> RawQuery {
    let mut raw = query.extra.clone();
    insert_non_empty(&mut raw, CATEGORY, query.category.clone());
    insert_non_empty(&mut raw, CUSTOM_METRICS, query.custom_metrics.join(","));
    insert_date(&mut raw, FROM, query.from);
    if query.graph != DEFAULT_GRAPH {
        raw.insert(GRAPH.to_string(), query.graph.as_str().to_string());
    }
    insert_non_empty(&mut raw, ID, query.project.clone());
    insert_date(&mut raw, SELECTED_DATE, query.selected_date);
    insert_date(&mut raw, TO, query.to);
    raw
}

/// Filters forwarded to the activity search.
pub fn serialize_api_query(query: &Query) -> RawQuery {
    let mut raw = RawQuery::new();
    insert_non_empty(&mut raw, CATEGORY, query.category.clone());
    insert_date(&mut raw, FROM, query.from);
    insert_date(&mut raw, TO, query.to);
    raw
}

/// True when both queries show the custom graph with different metrics.
pub fn custom_metrics_changed(previous: &Query, next: &Query) -> bool {
    previous.graph.is_custom()
        && next.graph.is_custom()
        && previous.custom_metrics != next.custom_metrics
}

/// True when the URL carries anything besides the component id.
pub fn has_filters(raw: &RawQuery) -> bool {
    raw.iter()
        .any(|(key, value)| key != ID && !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(pairs: &[(&str, &str)]) -> RawQuery {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_query() {
        let query = parse_query(&raw(&[
            ("id", "proj"),
            ("graph", "custom"),
            ("custom_metrics", "bugs,ncloc"),
            ("category", "VERSION"),
            ("from", "2020-01-15"),
            ("unknown", "kept"),
        ]));

        assert_eq!(query.project, "proj");
        assert_eq!(query.graph, GraphType::Custom);
        assert_eq!(query.custom_metrics, vec!["bugs", "ncloc"]);
        assert_eq!(query.category, "VERSION");
        assert_eq!(
            query.from,
            Some(Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap())
        );
        assert!(query.to.is_none());
        assert_eq!(query.extra.get("unknown").map(String::as_str), Some("kept"));
    }

    #[test]
    fn test_parse_query_defaults() {
        let query = parse_query(&raw(&[("graph", "nonsense"), ("to", "not a date")]));
        assert_eq!(query.graph, DEFAULT_GRAPH);
        assert!(query.to.is_none());
        assert!(query.custom_metrics.is_empty());
        assert_eq!(query, Query::default());
    }

    #[test]
    fn test_url_round_trip() {
        let query = Query {
            category: "OTHER".to_string(),
            custom_metrics: vec!["coverage".to_string(), "ncloc".to_string()],
            from: Some(Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()),
            graph: GraphType::Custom,
            project: "my:project".to_string(),
            selected_date: None,
            to: Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()),
            extra: raw(&[("foo", "bar")]),
        };

        let serialized = serialize_url_query(&query);
        assert_eq!(
            serialized.get("custom_metrics").map(String::as_str),
            Some("coverage,ncloc")
        );
        assert_eq!(parse_query(&serialized), query);
    }

    #[test]
    fn test_serialize_url_query_drops_defaults() {
        let serialized = serialize_url_query(&Query {
            project: "proj".to_string(),
            ..Query::default()
        });
        assert_eq!(serialized, raw(&[("id", "proj")]));
    }

    #[test]
    fn test_serialize_api_query() {
        let query = Query {
            category: "VERSION".to_string(),
            project: "proj".to_string(),
            graph: GraphType::Coverage,
            ..Query::default()
        };
        assert_eq!(serialize_api_query(&query), raw(&[("category", "VERSION")]));
    }

    #[test]
    fn test_custom_metrics_changed() {
        let a = Query {
            graph: GraphType::Custom,
            custom_metrics: vec!["bugs".to_string()],
            ..Query::default()
        };
        let b = Query {
            custom_metrics: vec!["ncloc".to_string()],
            ..a.clone()
        };
        assert!(custom_metrics_changed(&a, &b));
        assert!(!custom_metrics_changed(&a, &a));

        let not_custom = Query {
            graph: GraphType::Issues,
            ..b
        };
        assert!(!custom_metrics_changed(&a, &not_custom));
    }

    #[test]
    fn test_has_filters() {
        assert!(!has_filters(&raw(&[("id", "proj")])));
        assert!(!has_filters(&raw(&[("id", "proj"), ("graph", "")])));
        assert!(has_filters(&raw(&[("id", "proj"), ("category", "VERSION")])));
    }

    #[test]
    fn test_merged() {
        let query = Query {
            project: "proj".to_string(),
            category: "VERSION".to_string(),
            ..Query::default()
        };
        let merged = query.merged(&QueryUpdate {
            graph: Some(GraphType::Duplications),
            category: Some(String::new()),
            ..QueryUpdate::default()
        });
        assert_eq!(merged.graph, GraphType::Duplications);
        assert!(merged.category.is_empty());
        assert_eq!(merged.project, "proj");
    }
}
