//! Project activity view.
//!
//! This module provides the activity history loader and the view state it
//! works on: URL queries, graph selection and list transformations.

pub mod actions;
pub mod graph;
pub mod lifetime;
pub mod loader;
pub mod query;

pub use graph::GraphType;
pub use loader::{ActivityState, ActivityView, LoaderSettings, MountOutcome};
pub use query::QueryUpdate;
