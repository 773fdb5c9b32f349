//! Activity history loader.
//!
//! An [`ActivityView`] owns the state of one opened activity page: it loads the
//! first batch of analyses together with the metric catalog and the histories
//! of the selected graph, backfills the remaining analyses in the background,
//! and applies mutations once the server accepted them.

use super::actions;
use super::graph::{
    history_metrics, save_graph, saved_graph, GraphType, DEFAULT_GRAPH, PROJECT_ACTIVITY_GRAPH,
};
use super::lifetime::ViewLifetime;
use super::query::{
    custom_metrics_changed, has_filters, parse_query, serialize_api_query, serialize_url_query,
    Query, QueryUpdate,
};
use crate::api::{ActivityApi, ApiError};
use crate::models::{
    branch_query, Analysis, BranchLike, Component, EventCategory, MeasureHistory, Metric,
    Qualifier, RawQuery, ACTIVITY_STATUSES,
};
use crate::preferences::PreferenceStore;
use anyhow::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const ACTIVITY_PAGE_SIZE_FIRST_BATCH: u32 = 100;
pub const ACTIVITY_PAGE_SIZE: u32 = 500;
pub const MAX_BACKFILL_PAGES: u32 = 1000;

const SECURITY_HOTSPOTS_REVIEWED: &str = "security_hotspots_reviewed";
const SECURITY_REVIEW_RATING: &str = "security_review_rating";

/// Paging settings of the loader.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    /// Page size of the first request, shown before the backfill completes.
    pub first_batch_size: u32,
    /// Page size of backfill requests.
    pub page_size: u32,
    /// Backfill stops after this many pages even if the server reports more.
    pub max_backfill_pages: u32,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            first_batch_size: ACTIVITY_PAGE_SIZE_FIRST_BATCH,
            page_size: ACTIVITY_PAGE_SIZE,
            max_backfill_pages: MAX_BACKFILL_PAGES,
        }
    }
}

/// Everything the view displays.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityState {
    pub analyses: Vec<Analysis>,
    /// A backfill is in flight.
    pub analyses_loading: bool,
    pub graph_loading: bool,
    pub initialized: bool,
    /// Every page of the history was loaded.
    pub history_complete: bool,
    pub measures_history: Vec<MeasureHistory>,
    pub metrics: Vec<Metric>,
    pub query: Query,
}

impl ActivityState {
    fn new(query: Query) -> Self {
        Self {
            analyses: Vec::new(),
            analyses_loading: false,
            graph_loading: true,
            initialized: false,
            history_complete: false,
            measures_history: Vec::new(),
            metrics: Vec::new(),
            query,
        }
    }

    /// The graph shows a loading state until the first load finished.
    #[allow(dead_code)] // Only the report consumes state, after loading ends
    pub fn is_graph_loading(&self) -> bool {
        !self.initialized || self.graph_loading
    }
}

/// Result of mounting a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// Nothing was loaded; navigate to this query instead.
    Redirect(RawQuery),
    /// The first batch was loaded (or failed) and the backfill started.
    Loaded,
}

/// Drop the security metric that does not apply to this kind of component.
pub fn filter_metrics(qualifier: Qualifier, metrics: Vec<Metric>) -> Vec<Metric> {
    let excluded = if qualifier.is_portfolio_like() {
        SECURITY_HOTSPOTS_REVIEWED
    } else {
        SECURITY_REVIEW_RATING
    };
    metrics.into_iter().filter(|m| m.key != excluded).collect()
}

/// Measure histories for a metric set; an empty set makes no request.
pub async fn fetch_measures_history<A>(
    api: &A,
    component: &str,
    metrics: &[String],
) -> Result<Vec<MeasureHistory>, ApiError>
where
    A: ActivityApi + ?Sized,
{
    if metrics.is_empty() {
        return Ok(Vec::new());
    }
    api.fetch_measures_history(component, metrics).await
}

/// Analyses accumulated by a backfill.
#[derive(Debug, Clone)]
pub struct Backfill {
    pub analyses: Vec<Analysis>,
    /// False when the page cap stopped the loop early.
    pub complete: bool,
}

/// Load every analysis of a project, one page after the other.
///
/// Stops once `page_index * page_size >= total`, or after
/// `max_backfill_pages` pages, keeping what was accumulated.
pub async fn load_all_activities<A>(
    api: &A,
    project: &str,
    settings: &LoaderSettings,
) -> Result<Backfill, ApiError>
where
    A: ActivityApi + ?Sized,
{
    let mut analyses = Vec::new();
    let mut page = 1;
    let no_filters = RawQuery::new();

    loop {
        let result = api
            .fetch_activity(
                project,
                &ACTIVITY_STATUSES,
                page,
                settings.page_size,
                &no_filters,
            )
            .await?;
        debug!(
            "Backfill page {}: {} analyses (total {})",
            page,
            result.analyses.len(),
            result.paging.total
        );
        analyses.extend(result.analyses);

        if result.paging.is_last_page() {
            return Ok(Backfill {
                analyses,
                complete: true,
            });
        }
        if page >= settings.max_backfill_pages {
            warn!(
                "Stopping backfill after {} pages; server reports {} analyses",
                page, result.paging.total
            );
            return Ok(Backfill {
                analyses,
                complete: false,
            });
        }
        page += 1;
    }
}

/// State and operations of one opened activity page.
pub struct ActivityView<A: ActivityApi + 'static, P: PreferenceStore> {
    api: Arc<A>,
    preferences: P,
    component: Component,
    branch: Option<BranchLike>,
    location: RawQuery,
    settings: LoaderSettings,
    state: Arc<Mutex<ActivityState>>,
    lifetime: ViewLifetime,
    backfill: Option<JoinHandle<()>>,
}

impl<A: ActivityApi + 'static, P: PreferenceStore> ActivityView<A, P> {
    /// Create a view for a component opened at the given URL query.
    pub fn new(
        api: Arc<A>,
        preferences: P,
        component: Component,
        branch: Option<BranchLike>,
        location: RawQuery,
        settings: LoaderSettings,
    ) -> Self {
        let query = parse_query(&location);
        Self {
            api,
            preferences,
            component,
            branch,
            location,
            settings,
            state: Arc::new(Mutex::new(ActivityState::new(query))),
            lifetime: ViewLifetime::new(),
            backfill: None,
        }
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ActivityState {
        self.state.lock().clone()
    }

    /// Handle that can close the view from elsewhere.
    #[allow(dead_code)] // The CLI closes its view with unmount
    pub fn lifetime(&self) -> ViewLifetime {
        self.lifetime.clone()
    }

    /// Redirect to the saved graph, or load the view.
    pub async fn mount(&mut self) -> MountOutcome {
        if let Some(target) = self.redirect_target() {
            info!("Restoring saved graph for {}", self.component.key);
            return MountOutcome::Redirect(target);
        }

        let query = self.state.lock().query.clone();
        self.first_load(&query).await;
        MountOutcome::Loaded
    }

    /// Close the view. Pending completions are discarded from now on.
    pub fn unmount(&mut self) {
        if self.lifetime.invalidate() {
            debug!("Activity view for {} closed", self.component.key);
        }
    }

    /// Query to navigate to instead of loading, when the URL has no filter but
    /// a non-default graph was saved for this component.
    pub fn redirect_target(&self) -> Option<RawQuery> {
        if has_filters(&self.location) {
            return None;
        }

        let saved = saved_graph(
            &self.preferences,
            PROJECT_ACTIVITY_GRAPH,
            &self.component.key,
        )?;
        if saved.graph == DEFAULT_GRAPH || saved.is_empty_custom() {
            return None;
        }

        let mut query = self.state.lock().query.clone();
        query.graph = saved.graph;
        if saved.graph.is_custom() {
            query.custom_metrics = saved.custom_metrics;
        }

        let mut target = serialize_url_query(&query);
        target.extend(branch_query(self.branch.as_ref()));
        Some(target)
    }

    async fn first_load(&mut self, query: &Query) {
        let graph_metrics = history_metrics(query.graph, &query.custom_metrics);
        let top_level = self.component.top_level_key().to_string();
        let filters = serialize_api_query(query);
        debug!(
            "First load of {} (graph {}, {} metrics)",
            top_level,
            query.graph,
            graph_metrics.len()
        );

        let api = self.api.as_ref();
        let result = futures::try_join!(
            api.fetch_activity(
                &top_level,
                &ACTIVITY_STATUSES,
                1,
                self.settings.first_batch_size,
                &filters,
            ),
            api.fetch_all_metrics(),
            fetch_measures_history(api, &top_level, &graph_metrics),
        );

        if !self.lifetime.is_active() {
            debug!("View closed, discarding first load");
            return;
        }

        match result {
            Ok((page, metrics, measures_history)) => {
                info!(
                    "Loaded {} of {} analyses",
                    page.analyses.len(),
                    page.paging.total
                );
                {
                    let mut state = self.state.lock();
                    state.analyses = page.analyses;
                    state.graph_loading = false;
                    state.initialized = true;
                    state.measures_history = measures_history;
                    state.metrics = filter_metrics(self.component.qualifier, metrics);
                }
                self.fetch_all_activities(top_level);
            }
            Err(e) => {
                warn!("Failed to load activity of {}: {}", top_level, e);
                let mut state = self.state.lock();
                state.initialized = true;
                state.graph_loading = false;
            }
        }
    }

    /// Start the background backfill of every page.
    fn fetch_all_activities(&mut self, project: String) {
        self.state.lock().analyses_loading = true;

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let lifetime = self.lifetime.clone();
        let settings = self.settings.clone();

        self.backfill = Some(tokio::spawn(async move {
            let result = load_all_activities(api.as_ref(), &project, &settings).await;

            if !lifetime.is_active() {
                debug!("View closed, discarding backfill of {}", project);
                return;
            }

            let mut state = state.lock();
            match result {
                Ok(backfill) => {
                    info!(
                        "Backfill of {} finished: {} analyses",
                        project,
                        backfill.analyses.len()
                    );
                    state.analyses = backfill.analyses;
                    state.history_complete = backfill.complete;
                }
                Err(e) => warn!("Backfill of {} abandoned: {}", project, e),
            }
            state.analyses_loading = false;
        }));
    }

    /// Wait for a running backfill to finish.
    pub async fn wait_for_backfill(&mut self) {
        if let Some(handle) = self.backfill.take() {
            if let Err(e) = handle.await {
                warn!("Backfill task failed: {}", e);
            }
        }
    }

    /// Replace the measure histories with those of another graph.
    pub async fn update_graph_data(&self, graph: GraphType, custom_metrics: &[String]) {
        let graph_metrics = history_metrics(graph, custom_metrics);
        self.state.lock().graph_loading = true;

        let result = fetch_measures_history(
            self.api.as_ref(),
            self.component.top_level_key(),
            &graph_metrics,
        )
        .await;

        if !self.lifetime.is_active() {
            return;
        }

        let mut state = self.state.lock();
        state.graph_loading = false;
        match result {
            Ok(measures_history) => state.measures_history = measures_history,
            Err(e) => {
                warn!("Failed to load {} graph: {}", graph, e);
                state.measures_history = Vec::new();
            }
        }
    }

    /// React to a navigation to a new URL query.
    ///
    /// A graph change only reloads histories once the view is initialized;
    /// before that it runs a complete first load.
    pub async fn update_location(&mut self, location: RawQuery) {
        if location == self.location {
            return;
        }

        let query = parse_query(&location);
        self.location = location;
        let previous = std::mem::replace(&mut self.state.lock().query, query.clone());

        if query.graph != previous.graph || custom_metrics_changed(&previous, &query) {
            let initialized = self.state.lock().initialized;
            if initialized {
                self.update_graph_data(query.graph, &query.custom_metrics)
                    .await;
            } else {
                self.first_load(&query).await;
            }
        }
    }

    /// Query to navigate to after changing the view state.
    pub fn update_query(&self, update: &QueryUpdate) -> RawQuery {
        let query = self.state.lock().query.merged(update);
        let mut target = serialize_url_query(&query);
        target.extend(branch_query(self.branch.as_ref()));
        target.insert("id".to_string(), self.component.key.clone());
        target
    }

    /// Remember a graph selection for this component.
    pub fn save_graph_preference(
        &mut self,
        graph: GraphType,
        custom_metrics: Option<&[String]>,
    ) -> Result<()> {
        save_graph(
            &mut self.preferences,
            PROJECT_ACTIVITY_GRAPH,
            &self.component.key,
            graph,
            custom_metrics,
        )
    }

    pub async fn add_custom_event(
        &self,
        analysis: &str,
        name: &str,
        category: Option<EventCategory>,
    ) -> Result<(), ApiError> {
        let response = self.api.create_event(analysis, name, category).await?;
        if self.lifetime.is_active() {
            let mut state = self.state.lock();
            state.analyses = actions::add_custom_event(
                std::mem::take(&mut state.analyses),
                &response.analysis,
                response.event,
            );
        }
        Ok(())
    }

    pub async fn add_version(&self, analysis: &str, version: &str) -> Result<(), ApiError> {
        self.add_custom_event(analysis, version, Some(EventCategory::Version))
            .await
    }

    pub async fn change_event(&self, event: &str, name: &str) -> Result<(), ApiError> {
        let response = self.api.change_event(event, name).await?;
        if self.lifetime.is_active() {
            let mut state = self.state.lock();
            state.analyses =
                actions::change_event(std::mem::take(&mut state.analyses), &response.event);
        }
        Ok(())
    }

    /// Delete an analysis and reload the histories it contributed to.
    pub async fn delete_analysis(&self, analysis: &str) -> Result<(), ApiError> {
        self.api.delete_analysis(analysis).await?;
        if !self.lifetime.is_active() {
            return Ok(());
        }

        let query = {
            let mut state = self.state.lock();
            state.analyses =
                actions::delete_analysis(std::mem::take(&mut state.analyses), analysis);
            state.query.clone()
        };
        self.update_graph_data(query.graph, &query.custom_metrics)
            .await;
        Ok(())
    }

    pub async fn delete_event(&self, analysis: &str, event: &str) -> Result<(), ApiError> {
        self.api.delete_event(event).await?;
        if self.lifetime.is_active() {
            let mut state = self.state.lock();
            state.analyses =
                actions::delete_event(std::mem::take(&mut state.analyses), analysis, event);
        }
        Ok(())
    }
}

impl<A: ActivityApi + 'static, P: PreferenceStore> Drop for ActivityView<A, P> {
    fn drop(&mut self) {
        self.lifetime.invalidate();
    }
}
