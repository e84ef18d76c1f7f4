//! # pubdash
//!
//! Research Publication Dashboard - data pipeline for a CSV of publications
//! referencing a health-systems database.
//!
//! ## Modules
//!
//! - [`loader`] - CSV ingest from a path or URL, with [`fallback`] sample data
//! - [`enhance`] - Derived fields (geographic reach, policy category, DOI)
//! - [`authors`] - Author string normalization
//! - [`stats`] - Distributions, insights and data-quality report
//! - [`network`] - Co-authorship network and centrality
//! - [`flow`] - Weighted Sankey flow across classification stages
//! - [`filter`] - Filtering, ordering and pagination
//! - [`pipeline`] - Pure recomputation of every derived view
//! - [`session`] - Reload/filter handle publishing snapshots on a watch channel
//! - [`chat`] - Chat collaborator boundary types
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pubdash::filter::FilterChange;
//! use pubdash::pipeline::PipelineConfig;
//! use pubdash::session::DashboardSession;
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = DashboardSession::open("publications.csv", PipelineConfig::default()).await;
//!     let snapshot = session.apply_filter(FilterChange::Year(Some(2024)));
//!     println!("{} publications in 2024", snapshot.views.view.total);
//! }
//! ```

pub mod authors;
pub mod chat;
pub mod enhance;
pub mod error;
pub mod fallback;
pub mod filter;
pub mod flow;
pub mod loader;
pub mod model;
pub mod network;
pub mod pipeline;
pub mod session;
pub mod stats;

#[cfg(test)]
mod testutil;

pub use error::{DashboardError, Result};
pub use model::{DataSource, Publication, UsageType};
