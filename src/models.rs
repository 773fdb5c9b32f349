//! Data models for the project activity client.
//!
//! This module contains the core data structures shared by the API client,
//! the activity loader and the report generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Flat, string-keyed query as it appears in a navigable URL.
pub type RawQuery = BTreeMap<String, String>;

/// Date format used by the server (`2017-03-01T09:36:01+0100`).
pub const SERVER_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Serde adapter for server dates.
pub mod server_date {
    use super::SERVER_DATE_FORMAT;
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parse a server date. Plain `YYYY-MM-DD` dates resolve to midnight UTC.
    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(date) = DateTime::parse_from_str(value, SERVER_DATE_FORMAT) {
            return Some(date.with_timezone(&Utc));
        }
        if let Ok(date) = DateTime::parse_from_rfc3339(value) {
            return Some(date.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// Format a date the way the server expects it.
    pub fn format(date: &DateTime<Utc>) -> String {
        date.format(SERVER_DATE_FORMAT).to_string()
    }

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
    }
}

/// Kind of a node in the project hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Qualifier {
    #[serde(rename = "TRK")]
    Project,
    #[serde(rename = "VW")]
    Portfolio,
    #[serde(rename = "SVW")]
    SubPortfolio,
    #[serde(rename = "APP")]
    Application,
    #[serde(rename = "BRC")]
    Module,
    #[serde(rename = "DIR")]
    Directory,
    #[serde(rename = "FIL")]
    File,
    #[serde(rename = "UTS")]
    TestFile,
    #[serde(other)]
    Unknown,
}

impl Qualifier {
    /// Short code used by the server API.
    pub fn code(&self) -> &'static str {
        match self {
            Qualifier::Project => "TRK",
            Qualifier::Portfolio => "VW",
            Qualifier::SubPortfolio => "SVW",
            Qualifier::Application => "APP",
            Qualifier::Module => "BRC",
            Qualifier::Directory => "DIR",
            Qualifier::File => "FIL",
            Qualifier::TestFile => "UTS",
            Qualifier::Unknown => "UNKNOWN",
        }
    }

    /// Whether history is recorded against this kind of node.
    pub fn is_top_level(&self) -> bool {
        match self {
            Qualifier::Project | Qualifier::Portfolio | Qualifier::Application => true,
            Qualifier::SubPortfolio
            | Qualifier::Module
            | Qualifier::Directory
            | Qualifier::File
            | Qualifier::TestFile
            | Qualifier::Unknown => false,
        }
    }

    /// Portfolios and sub-portfolios.
    pub fn is_portfolio_like(&self) -> bool {
        match self {
            Qualifier::Portfolio | Qualifier::SubPortfolio => true,
            Qualifier::Project
            | Qualifier::Application
            | Qualifier::Module
            | Qualifier::Directory
            | Qualifier::File
            | Qualifier::TestFile
            | Qualifier::Unknown => false,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One step of a component's ancestry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub key: String,
    pub name: String,
    pub qualifier: Qualifier,
}

/// A component of the project hierarchy, with its breadcrumbs ordered root to leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub key: String,
    pub name: String,
    pub qualifier: Qualifier,
    #[serde(default)]
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl Component {
    /// Key of the topmost project, portfolio or application above this component.
    ///
    /// Walks the breadcrumbs from the leaf towards the root and stops at the first
    /// top-level qualifier, or at the root.
    pub fn top_level_key(&self) -> &str {
        let Some(mut current) = self.breadcrumbs.len().checked_sub(1) else {
            return &self.key;
        };
        while current > 0 && !self.breadcrumbs[current].qualifier.is_top_level() {
            current -= 1;
        }
        &self.breadcrumbs[current].key
    }
}

/// Branch or pull request a view is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchLike {
    Branch(String),
    PullRequest(String),
}

impl BranchLike {
    /// Query parameter identifying this branch on requests and URLs.
    pub fn query_param(&self) -> (&'static str, &str) {
        match self {
            BranchLike::Branch(name) => ("branch", name),
            BranchLike::PullRequest(id) => ("pullRequest", id),
        }
    }
}

impl fmt::Display for BranchLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchLike::Branch(name) => write!(f, "branch {}", name),
            BranchLike::PullRequest(id) => write!(f, "pull request {}", id),
        }
    }
}

/// Branch parameters to merge into a navigation query.
pub fn branch_query(branch: Option<&BranchLike>) -> RawQuery {
    let mut query = RawQuery::new();
    if let Some(branch) = branch {
        let (key, value) = branch.query_param();
        query.insert(key.to_string(), value.to_string());
    }
    query
}

/// Processing status of an analysis, used as a request filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStatus {
    Processed,
    LiveMeasureCompute,
}

impl AnalysisStatus {
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisStatus::Processed => "P",
            AnalysisStatus::LiveMeasureCompute => "L",
        }
    }
}

/// Statuses shown in the activity history.
pub const ACTIVITY_STATUSES: [AnalysisStatus; 2] = [
    AnalysisStatus::Processed,
    AnalysisStatus::LiveMeasureCompute,
];

/// Category of an analysis event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    Version,
    QualityGate,
    QualityProfile,
    DefinitionChange,
    Other,
    #[serde(other)]
    Unknown,
}

impl EventCategory {
    pub fn code(&self) -> &'static str {
        match self {
            EventCategory::Version => "VERSION",
            EventCategory::QualityGate => "QUALITY_GATE",
            EventCategory::QualityProfile => "QUALITY_PROFILE",
            EventCategory::DefinitionChange => "DEFINITION_CHANGE",
            EventCategory::Other => "OTHER",
            EventCategory::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCategory::Version => write!(f, "Version"),
            EventCategory::QualityGate => write!(f, "Quality Gate"),
            EventCategory::QualityProfile => write!(f, "Quality Profile"),
            EventCategory::DefinitionChange => write!(f, "Definition Change"),
            EventCategory::Other => write!(f, "Other"),
            EventCategory::Unknown => write!(f, "Unknown"),
        }
    }
}

/// An annotation attached to an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<EventCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One analysis recorded in a project's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub key: String,
    #[serde(with = "server_date")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_string: Option<String>,
    #[serde(default)]
    pub manual_new_code_period_baseline: bool,
}

/// A metric definition from the server catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

/// One sample of a metric's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(with = "server_date")]
    pub date: DateTime<Utc>,
    /// Absent when the metric was not computed for that analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Time series of one metric, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureHistory {
    pub metric: String,
    pub history: Vec<HistoryItem>,
}

impl MeasureHistory {
    /// Most recent sample carrying a value.
    pub fn latest_value(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find_map(|item| item.value.as_deref())
    }

    /// Oldest sample carrying a value.
    pub fn first_value(&self) -> Option<&str> {
        self.history.iter().find_map(|item| item.value.as_deref())
    }
}

/// Pagination cursor returned with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub page_index: u32,
    pub page_size: u32,
    pub total: u32,
}

impl Paging {
    /// True once the page covering the last item has been retrieved.
    pub fn is_last_page(&self) -> bool {
        u64::from(self.page_index) * u64::from(self.page_size) >= u64::from(self.total)
    }
}

/// Metadata about a generated activity report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Server the history was loaded from.
    pub server_url: String,
    /// Key of the component the view was opened on.
    pub component_key: String,
    /// Display name of the component.
    pub component_name: String,
    /// Kind of the component.
    pub qualifier: Qualifier,
    /// Branch or pull request, when not the main branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Graph the measure histories belong to.
    pub graph: String,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Whether every page of the history was loaded.
    pub complete: bool,
    /// Time spent loading, in seconds.
    pub duration_seconds: f64,
}

/// A fully loaded activity history, ready to be rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReport {
    pub metadata: ReportMetadata,
    pub analyses: Vec<Analysis>,
    pub measures_history: Vec<MeasureHistory>,
    /// Catalog entries for the metrics in `measures_history`.
    pub metrics: Vec<Metric>,
}
