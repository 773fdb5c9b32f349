//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::activity::GraphType;
use crate::models::{branch_query, server_date, BranchLike, EventCategory, RawQuery};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// project-activity - activity history of a project on a code-quality server
///
/// Loads every analysis of a project, portfolio or application together with
/// the metric history of the selected graph, and writes a Markdown or JSON
/// report. Events can be added, renamed and deleted along the way.
///
/// Examples:
///   project-activity --component my-project
///   project-activity --component my-project --graph coverage --format json
///   project-activity --component my-project add-version AXyz123 2.1.0
///   project-activity --component my-project set-graph custom --metrics ncloc,bugs
///   project-activity --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Key of the project, portfolio or application
    #[arg(
        short = 'k',
        long,
        value_name = "KEY",
        required_unless_present = "init_config"
    )]
    pub component: Option<String>,

    /// Server base URL
    ///
    /// Can also be set in .project-activity.toml.
    #[arg(long, value_name = "URL", env = "SONAR_HOST_URL")]
    pub url: Option<String>,

    /// Authentication token
    #[arg(
        long,
        value_name = "TOKEN",
        env = "SONAR_TOKEN",
        hide_env_values = true
    )]
    pub token: Option<String>,

    /// Branch to load the activity of
    #[arg(short, long, value_name = "BRANCH", conflicts_with = "pull_request")]
    pub branch: Option<String>,

    /// Pull request to load the activity of
    #[arg(long, value_name = "ID")]
    pub pull_request: Option<String>,

    /// Graph to load the measure history of (issues, coverage, duplications, custom)
    ///
    /// When omitted, the graph saved for the component is restored.
    #[arg(short, long, value_name = "GRAPH")]
    pub graph: Option<GraphType>,

    /// Metrics of the custom graph (comma-separated)
    #[arg(long, value_name = "METRICS", value_delimiter = ',')]
    pub custom_metrics: Option<Vec<String>>,

    /// Only list analyses with events of this category (e.g. VERSION, QUALITY_GATE)
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Only list analyses from this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Only list analyses up to this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .project-activity.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the preferences file holding saved graphs
    #[arg(long, value_name = "FILE")]
    pub preferences: Option<PathBuf>,

    /// Page size of the background backfill
    #[arg(long, value_name = "SIZE")]
    pub page_size: Option<u32>,

    /// Maximum analyses listed in the report
    #[arg(long, value_name = "COUNT")]
    pub max_analyses: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .project-activity.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Change to apply once the history is loaded
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Changes applied to the loaded history.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a custom event to an analysis
    AddEvent {
        /// Analysis key
        analysis: String,
        /// Event name
        name: String,
        /// Event category
        #[arg(long, value_enum)]
        category: Option<EventCategoryArg>,
    },
    /// Mark an analysis with a version
    AddVersion {
        /// Analysis key
        analysis: String,
        /// Version name
        version: String,
    },
    /// Rename an event
    RenameEvent {
        /// Event key
        event: String,
        /// New name
        name: String,
    },
    /// Delete an analysis and its events
    DeleteAnalysis {
        /// Analysis key
        analysis: String,
    },
    /// Delete one event of an analysis
    DeleteEvent {
        /// Analysis key
        analysis: String,
        /// Event key
        event: String,
    },
    /// Save the graph restored for this component on later runs
    SetGraph {
        /// Graph to save
        graph: GraphType,
        /// Metrics of the custom graph (comma-separated)
        #[arg(long, value_delimiter = ',')]
        metrics: Option<Vec<String>>,
    },
}

/// Event categories that can be created by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventCategoryArg {
    Version,
    Other,
}

impl From<EventCategoryArg> for EventCategory {
    fn from(arg: EventCategoryArg) -> Self {
        match arg {
            EventCategoryArg::Version => EventCategory::Version,
            EventCategoryArg::Other => EventCategory::Other,
        }
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the component key (validated to be present unless --init-config).
    pub fn component_key(&self) -> &str {
        self.component.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.component_key().trim().is_empty() {
            return Err("Component key must not be empty".to_string());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Server URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(page_size) = self.page_size {
            if page_size == 0 {
                return Err("Page size must be at least 1".to_string());
            }
        }

        for (flag, value) in [("--from", &self.from), ("--to", &self.to)] {
            if let Some(date) = value {
                if server_date::parse(date).is_none() {
                    return Err(format!("{} expects a date like 2024-01-31, got '{}'", flag, date));
                }
            }
        }

        if self.custom_metrics.is_some() && self.graph != Some(GraphType::Custom) {
            return Err("--custom-metrics requires --graph custom".to_string());
        }

        if let Some(Command::SetGraph {
            graph: GraphType::Custom,
            metrics,
        }) = &self.command
        {
            if metrics.as_ref().map_or(true, |m| m.is_empty()) {
                return Err("set-graph custom requires --metrics".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Branch or pull request selected on the command line.
    pub fn branch_like(&self) -> Option<BranchLike> {
        match (&self.branch, &self.pull_request) {
            (Some(branch), _) => Some(BranchLike::Branch(branch.clone())),
            (None, Some(pr)) => Some(BranchLike::PullRequest(pr.clone())),
            (None, None) => None,
        }
    }

    /// The URL query the view is opened with.
    pub fn location_query(&self) -> RawQuery {
        let mut query = RawQuery::new();
        query.insert("id".to_string(), self.component_key().to_string());

        if let Some(graph) = self.graph {
            query.insert("graph".to_string(), graph.as_str().to_string());
        }
        if let Some(ref metrics) = self.custom_metrics {
            query.insert("custom_metrics".to_string(), metrics.join(","));
        }
        if let Some(ref category) = self.category {
            query.insert("category".to_string(), category.clone());
        }
        if let Some(ref from) = self.from {
            query.insert("from".to_string(), from.clone());
        }
        if let Some(ref to) = self.to {
            query.insert("to".to_string(), to.clone());
        }
        query.extend(branch_query(self.branch_like().as_ref()));

        query
    }
}
