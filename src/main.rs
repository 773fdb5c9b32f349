//! project-activity - activity history of a project on a code-quality server
//!
//! A CLI tool that loads every analysis of a project, portfolio or
//! application along with the measure history of the selected graph, applies
//! event changes, and writes a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, rejected change, etc.)

mod activity;
mod analysis;
mod api;
mod cli;
mod config;
mod models;
mod preferences;
mod report;

use activity::{ActivityState, ActivityView, MountOutcome, QueryUpdate};
use anyhow::{Context, Result};
use api::client::ClientConfig;
use api::{ActivityApi, SonarClient};
use chrono::Utc;
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ActivityReport, Component, Metric, RawQuery, ReportMetadata};
use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
use report::ReportOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("project-activity v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default configuration file.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the server URL, page sizes and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Resolve the server, component and preference store, then run the view.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let client = SonarClient::new(ClientConfig {
        base_url: config.server.url.clone(),
        token: config.server.token.clone(),
        timeout_seconds: config.server.timeout_seconds,
        branch: args.branch_like(),
    })?;

    let component = client
        .fetch_component(args.component_key())
        .await
        .with_context(|| format!("Failed to load component '{}'", args.component_key()))?;
    info!(
        "Component {} ({}, {})",
        component.name, component.key, component.qualifier
    );

    match open_preferences(&config) {
        Some(store) => run_view(args, config, client, component, store).await,
        None => {
            run_view(
                args,
                config,
                client,
                component,
                MemoryPreferenceStore::default(),
            )
            .await
        }
    }
}

/// Open the preferences file, or `None` when it cannot be used.
fn open_preferences(config: &Config) -> Option<FilePreferenceStore> {
    let path = match config.preferences.path {
        Some(ref path) => PathBuf::from(path),
        None => FilePreferenceStore::default_path()?,
    };

    match FilePreferenceStore::open(&path) {
        Ok(store) => {
            debug!("Preferences at {}", store.path().display());
            Some(store)
        }
        Err(e) => {
            warn!("Ignoring preferences: {:#}", e);
            None
        }
    }
}

/// Load the history, apply the requested change and write the report.
async fn run_view<P: PreferenceStore>(
    args: Args,
    config: Config,
    client: SonarClient,
    component: Component,
    preferences: P,
) -> Result<i32> {
    let start_time = Instant::now();

    let mut view = ActivityView::new(
        Arc::new(client),
        preferences,
        component,
        args.branch_like(),
        args.location_query(),
        (&config.activity).into(),
    );

    println!("📥 Loading activity of {}", view.component().name);
    if let MountOutcome::Redirect(target) = view.mount().await {
        let graph = target.get("graph").cloned().unwrap_or_default();
        println!("   Restoring saved graph: {}", graph);
        view.update_location(target).await;
    }

    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Loading remaining analyses...");
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    };

    view.wait_for_backfill().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let update = match args.command {
        Some(ref command) => apply_command(&mut view, command).await?,
        None => QueryUpdate::default(),
    };
    let target = view.update_query(&update);
    view.unmount();

    let state = view.state();
    let duration = start_time.elapsed().as_secs_f64();
    let report = build_report(&config, &args, view.component(), state, duration);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(
            &report,
            &ReportOptions {
                max_analyses: config.report.max_analyses,
                include_measures: config.report.include_measures,
            },
        ),
    };

    let output_path = PathBuf::from(&config.report.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📊 Activity Summary:");
    println!("   Analyses: {}", report.analyses.len());
    println!(
        "   Events: {}",
        report
            .analyses
            .iter()
            .map(|a| a.events.len())
            .sum::<usize>()
    );
    println!(
        "   Graph: {} ({} metrics)",
        report.metadata.graph,
        report.measures_history.len()
    );
    if !report.metadata.complete {
        println!("   ⚠️  History is partial: not every page could be loaded");
    }
    println!("   Duration: {:.1}s", duration);
    if let Some(url) = activity_url(&config.server.url, &target) {
        println!("   View: {}", url);
    }
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(0)
}

/// Apply a subcommand to the loaded view.
///
/// Returns the query change the subcommand implies for the activity page.
async fn apply_command<A, P>(
    view: &mut ActivityView<A, P>,
    command: &Command,
) -> Result<QueryUpdate>
where
    A: ActivityApi + 'static,
    P: PreferenceStore,
{
    match command {
        Command::AddEvent {
            analysis,
            name,
            category,
        } => {
            view.add_custom_event(analysis, name, category.map(Into::into))
                .await
                .with_context(|| format!("Failed to add event to {}", analysis))?;
            println!("✅ Added event '{}' to {}", name, analysis);
        }
        Command::AddVersion { analysis, version } => {
            view.add_version(analysis, version)
                .await
                .with_context(|| format!("Failed to add version to {}", analysis))?;
            println!("✅ Added version '{}' to {}", version, analysis);
        }
        Command::RenameEvent { event, name } => {
            view.change_event(event, name)
                .await
                .with_context(|| format!("Failed to rename event {}", event))?;
            println!("✅ Renamed event {} to '{}'", event, name);
        }
        Command::DeleteAnalysis { analysis } => {
            view.delete_analysis(analysis)
                .await
                .with_context(|| format!("Failed to delete analysis {}", analysis))?;
            println!("✅ Deleted analysis {}", analysis);
        }
        Command::DeleteEvent { analysis, event } => {
            view.delete_event(analysis, event)
                .await
                .with_context(|| format!("Failed to delete event {}", event))?;
            println!("✅ Deleted event {} of {}", event, analysis);
        }
        Command::SetGraph { graph, metrics } => {
            view.save_graph_preference(*graph, metrics.as_deref())?;
            println!("✅ Saved graph '{}' for {}", graph, view.component().key);
            return Ok(QueryUpdate {
                graph: Some(*graph),
                custom_metrics: metrics.clone(),
                ..QueryUpdate::default()
            });
        }
    }
    Ok(QueryUpdate::default())
}

/// Activity page URL for a navigation query.
fn activity_url(server_url: &str, target: &RawQuery) -> Option<String> {
    let base = format!("{}/project/activity", server_url.trim_end_matches('/'));
    match reqwest::Url::parse_with_params(&base, target.iter()) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            warn!("Cannot build activity URL from {}: {}", server_url, e);
            None
        }
    }
}

/// Assemble the report from the final view state.
fn build_report(
    config: &Config,
    args: &Args,
    component: &Component,
    state: ActivityState,
    duration_seconds: f64,
) -> ActivityReport {
    let metrics: Vec<Metric> = state
        .metrics
        .into_iter()
        .filter(|m| state.measures_history.iter().any(|h| h.metric == m.key))
        .collect();

    ActivityReport {
        metadata: ReportMetadata {
            server_url: config.server.url.clone(),
            component_key: component.key.clone(),
            component_name: component.name.clone(),
            qualifier: component.qualifier,
            branch: args.branch_like().map(|b| b.to_string()),
            graph: state.query.graph.to_string(),
            generated_at: Utc::now(),
            complete: state.history_complete,
            duration_seconds,
        },
        analyses: state.analyses,
        measures_history: state.measures_history,
        metrics,
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
