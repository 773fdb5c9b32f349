//! Graph types, their metric sets and the saved graph preference.

use crate::preferences::PreferenceStore;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Preference namespace of the activity graph.
pub const PROJECT_ACTIVITY_GRAPH: &str = "sonar_project_activity.graph";

/// Chart shown above the activity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    #[default]
    Issues,
    Coverage,
    Duplications,
    Custom,
}

pub const DEFAULT_GRAPH: GraphType = GraphType::Issues;

impl GraphType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphType::Issues => "issues",
            GraphType::Coverage => "coverage",
            GraphType::Duplications => "duplications",
            GraphType::Custom => "custom",
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, GraphType::Custom)
    }

    /// Metrics whose history the graph needs. Empty for the custom graph.
    pub fn metrics(&self) -> &'static [&'static str] {
        match self {
            GraphType::Issues => &[
                "bugs",
                "code_smells",
                "vulnerabilities",
                "reliability_rating",
                "security_rating",
                "sqale_rating",
            ],
            GraphType::Coverage => &["lines_to_cover", "uncovered_lines", "coverage"],
            GraphType::Duplications => &["ncloc", "duplicated_lines", "duplicated_lines_density"],
            GraphType::Custom => &[],
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GraphType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "issues" => Ok(GraphType::Issues),
            "coverage" => Ok(GraphType::Coverage),
            "duplications" => Ok(GraphType::Duplications),
            "custom" => Ok(GraphType::Custom),
            other => Err(format!("unknown graph: {}", other)),
        }
    }
}

/// Metrics to load history for, given a graph and the custom selection.
pub fn history_metrics(graph: GraphType, custom_metrics: &[String]) -> Vec<String> {
    if graph.is_custom() {
        custom_metrics.to_vec()
    } else {
        graph.metrics().iter().map(|m| m.to_string()).collect()
    }
}

/// Graph selection remembered for a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedGraph {
    pub graph: GraphType,
    pub custom_metrics: Vec<String>,
}

impl SavedGraph {
    /// A custom graph without any metric selected.
    pub fn is_empty_custom(&self) -> bool {
        self.graph.is_custom() && self.custom_metrics.is_empty()
    }
}

fn graph_key(namespace: &str, component: &str) -> String {
    format!("{}.{}", namespace, component)
}

fn custom_key(namespace: &str, component: &str) -> String {
    format!("{}.custom.{}", namespace, component)
}

/// Read the saved graph for a component. `None` when nothing valid was saved.
pub fn saved_graph<P>(store: &P, namespace: &str, component: &str) -> Option<SavedGraph>
where
    P: PreferenceStore + ?Sized,
{
    let graph = store
        .get(&graph_key(namespace, component))
        .and_then(|raw| raw.parse::<GraphType>().ok())?;
    let custom_metrics = store
        .get(&custom_key(namespace, component))
        .map(|raw| split_metrics(&raw))
        .unwrap_or_default();

    Some(SavedGraph {
        graph,
        custom_metrics,
    })
}

/// Remember a graph selection. Custom metrics are only written when given.
pub fn save_graph<P>(
    store: &mut P,
    namespace: &str,
    component: &str,
    graph: GraphType,
    custom_metrics: Option<&[String]>,
) -> Result<()>
where
    P: PreferenceStore + ?Sized,
{
    store.set(&graph_key(namespace, component), graph.as_str())?;
    if let Some(metrics) = custom_metrics {
        store.set(&custom_key(namespace, component), &metrics.join(","))?;
    }
    Ok(())
}

/// Split a comma-separated metric list, dropping empty items.
pub fn split_metrics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::MemoryPreferenceStore;

    #[test]
    fn test_history_metrics() {
        let custom = vec!["ncloc".to_string(), "complexity".to_string()];
        assert_eq!(history_metrics(GraphType::Custom, &custom), custom);
        assert_eq!(
            history_metrics(GraphType::Coverage, &custom),
            vec!["lines_to_cover", "uncovered_lines", "coverage"]
        );
        assert!(history_metrics(GraphType::Custom, &[]).is_empty());
    }

    #[test]
    fn test_graph_from_str() {
        assert_eq!("Coverage".parse::<GraphType>(), Ok(GraphType::Coverage));
        assert!("leak".parse::<GraphType>().is_err());
        assert_eq!(GraphType::default(), DEFAULT_GRAPH);
    }

    #[test]
    fn test_saved_graph_round_trip() {
        let mut store = MemoryPreferenceStore::default();
        assert!(saved_graph(&store, PROJECT_ACTIVITY_GRAPH, "proj").is_none());

        let metrics = vec!["bugs".to_string(), "ncloc".to_string()];
        save_graph(
            &mut store,
            PROJECT_ACTIVITY_GRAPH,
            "proj",
            GraphType::Custom,
            Some(&metrics),
        )
        .unwrap();

        let saved = saved_graph(&store, PROJECT_ACTIVITY_GRAPH, "proj").unwrap();
        assert_eq!(saved.graph, GraphType::Custom);
        assert_eq!(saved.custom_metrics, metrics);
        assert!(!saved.is_empty_custom());

        // Other components are unaffected.
        assert!(saved_graph(&store, PROJECT_ACTIVITY_GRAPH, "other").is_none());
    }

    #[test]
    fn test_saved_graph_ignores_garbage() {
        let mut store = MemoryPreferenceStore::default();
        store
            .set("sonar_project_activity.graph.proj", "pie-chart")
            .unwrap();
        assert!(saved_graph(&store, PROJECT_ACTIVITY_GRAPH, "proj").is_none());
    }

    #[test]
    fn test_split_metrics() {
        assert_eq!(split_metrics("a,,b, c"), vec!["a", "b", "c"]);
        assert!(split_metrics("").is_empty());
    }
}
