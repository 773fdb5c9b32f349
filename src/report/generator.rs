//! Markdown and JSON report generation.
//!
//! This module renders a loaded activity history as a Markdown document or
//! as pretty-printed JSON.

use crate::analysis::{analyses_per_month, metric_delta, metric_name, versions, ActivitySummary};
use crate::models::{
    ActivityReport, Analysis, Event, EventCategory, MeasureHistory, Metric, ReportMetadata,
};
use anyhow::Result;

/// Rendering options for the Markdown report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Render at most this many analyses in the history section.
    pub max_analyses: Option<usize>,
    /// Include the measure history table.
    pub include_measures: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_analyses: None,
            include_measures: true,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ActivityReport, options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Project Activity: {}\n\n",
        report.metadata.component_name
    ));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report, options));

    let summary = ActivitySummary::from_analyses(&report.analyses);
    output.push_str(&generate_summary_section(&summary, &report.analyses));

    if options.include_measures {
        output.push_str(&generate_measures_section(
            &report.metadata.graph,
            &report.measures_history,
            &report.metrics,
        ));
    }

    output.push_str(&generate_versions_section(&report.analyses));
    output.push_str(&generate_history_section(
        &report.analyses,
        options.max_analyses,
    ));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Server:** {}\n", metadata.server_url));
    section.push_str(&format!(
        "- **Component:** `{}` ({})\n",
        metadata.component_key, metadata.qualifier
    ));
    if let Some(ref branch) = metadata.branch {
        section.push_str(&format!("- **Branch:** {}\n", branch));
    }
    section.push_str(&format!("- **Graph:** {}\n", metadata.graph));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !metadata.complete {
        section.push_str("- **History:** partial (not every page could be loaded)\n");
    }
    section.push_str(&format!(
        "- **Load Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &ActivityReport, options: &ReportOptions) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    if options.include_measures {
        toc.push_str("- [Measures](#measures)\n");
    }
    if !versions(&report.analyses).is_empty() {
        toc.push_str("- [Versions](#versions)\n");
    }
    toc.push_str("- [History](#history)\n\n");

    toc
}

/// Generate the summary section.
fn generate_summary_section(summary: &ActivitySummary, analyses: &[Analysis]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!("- **Analyses:** {}\n", summary.total_analyses));
    section.push_str(&format!(
        "- **Analyses with events:** {}\n",
        summary.analyses_with_events
    ));
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        section.push_str(&format!(
            "- **Period:** {} to {}\n",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ));
    }
    section.push('\n');

    if !summary.events_by_category.is_empty() {
        section.push_str("### Events by Category\n\n");
        section.push_str("| Category | Count |\n");
        section.push_str("|:---|:---:|\n");

        let mut categories: Vec<_> = summary.events_by_category.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (category, count) in categories {
            section.push_str(&format!("| {} | {} |\n", category, count));
        }
        section.push('\n');
    }

    let months = analyses_per_month(analyses);
    if months.len() > 1 {
        section.push_str("### Analyses per Month\n\n");
        section.push_str("| Month | Analyses |\n");
        section.push_str("|:---|:---:|\n");
        for (month, count) in months.iter().rev() {
            section.push_str(&format!("| {} | {} |\n", month, count));
        }
        section.push('\n');
    }

    section
}

/// Generate the measure history table for the selected graph.
fn generate_measures_section(
    graph: &str,
    histories: &[MeasureHistory],
    metrics: &[Metric],
) -> String {
    let mut section = String::new();

    section.push_str("## Measures\n\n");
    section.push_str(&format!("*Graph: {}*\n\n", graph));

    if histories.is_empty() {
        section.push_str("No measure history for this graph.\n\n");
        return section;
    }

    section.push_str("| Metric | First | Latest | Change | Samples |\n");
    section.push_str("|:---|---:|---:|---:|:---:|\n");

    for history in histories {
        let delta = metric_delta(history)
            .map(|d| format!("{:+}", d))
            .unwrap_or_else(|| "-".to_string());
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            metric_name(metrics, &history.metric),
            history.first_value().unwrap_or("-"),
            history.latest_value().unwrap_or("-"),
            delta,
            history.history.len()
        ));
    }
    section.push('\n');

    section
}

fn generate_versions_section(analyses: &[Analysis]) -> String {
    let versions = versions(analyses);
    if versions.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Versions\n\n");
    for (analysis, event) in versions {
        section.push_str(&format!(
            "- **{}** on {}\n",
            event.name,
            analysis.date.format("%Y-%m-%d")
        ));
    }
    section.push('\n');

    section
}

/// Generate the analysis history, newest first as returned by the server.
fn generate_history_section(analyses: &[Analysis], max_analyses: Option<usize>) -> String {
    let mut section = String::new();

    section.push_str("## History\n\n");

    if analyses.is_empty() {
        section.push_str("No analyses were found for this component.\n\n");
        return section;
    }

    let shown = max_analyses.unwrap_or(analyses.len()).min(analyses.len());
    for analysis in &analyses[..shown] {
        section.push_str(&generate_analysis_block(analysis));
    }

    if shown < analyses.len() {
        section.push_str(&format!(
            "*{} older analyses not shown.*\n\n",
            analyses.len() - shown
        ));
    }

    section
}

/// Generate a single analysis block.
fn generate_analysis_block(analysis: &Analysis) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "### {}",
        analysis.date.format("%Y-%m-%d %H:%M")
    ));
    if let Some(ref version) = analysis.project_version {
        block.push_str(&format!(" ({})", version));
    }
    block.push_str("\n\n");

    block.push_str(&format!("*Key: `{}`*\n\n", analysis.key));

    for event in &analysis.events {
        block.push_str(&generate_event_line(event));
    }
    if !analysis.events.is_empty() {
        block.push('\n');
    }

    block
}

fn generate_event_line(event: &Event) -> String {
    let label = match event.category {
        Some(EventCategory::Version) => "🏷️ **Version**".to_string(),
        Some(EventCategory::QualityGate) => "🚦 **Quality Gate**".to_string(),
        Some(other) => format!("**{}**", other),
        None => "**Event**".to_string(),
    };

    let mut line = format!("- {}: {}", label, event.name);
    if let Some(ref description) = event.description {
        line.push_str(&format!(" ({})", description));
    }
    line.push('\n');
    line
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by project-activity*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ActivityReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
