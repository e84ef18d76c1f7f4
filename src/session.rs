//! Dashboard session: the host-facing handle over one CSV source.
//!
//! A session owns the loaded dataset, the active filters and the derived views,
//! published together as one immutable [`Snapshot`] on a `watch` channel.
//! Subscribers only ever observe whole snapshots.
//!
//! Reloads are serialized by an async mutex. Each call to [`DashboardSession::reload`]
//! takes a generation ticket first; a load whose ticket is no longer the newest
//! when it finishes (or before it starts) is discarded and reported as
//! [`ReloadOutcome::Superseded`].

use crate::filter::{FilterChange, FilterState};
use crate::loader::{load_or_fallback, LoadedDataset};
use crate::model::DataSource;
use crate::pipeline::{recompute, DerivedViews, PipelineConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

/// Dataset, filters and derived views published together
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Ticket of the reload that produced the dataset; 0 before the first load
    pub generation: u64,
    pub dataset: LoadedDataset,
    pub views: DerivedViews,
}

impl Snapshot {
    pub fn filters(&self) -> &FilterState {
        &self.views.filters
    }

    pub fn is_fallback(&self) -> bool {
        self.dataset.source.is_fallback()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The load finished and its snapshot is now current
    Published { generation: u64 },
    /// A newer reload was requested; this one was discarded
    Superseded { ticket: u64 },
}

pub struct DashboardSession {
    source: String,
    config: PipelineConfig,
    load_lock: Mutex<()>,
    generation: AtomicU64,
    tx: watch::Sender<Arc<Snapshot>>,
}

impl DashboardSession {
    /// Create a session with an empty snapshot. Nothing is loaded until [`reload`](Self::reload).
    pub fn new(source: impl Into<String>, config: PipelineConfig) -> Self {
        let source = source.into();
        let dataset = LoadedDataset::empty(DataSource::Live {
            location: source.clone(),
        });
        let views = recompute(&dataset.publications, &FilterState::default(), &config);
        let (tx, _) = watch::channel(Arc::new(Snapshot {
            generation: 0,
            dataset,
            views,
        }));

        Self {
            source,
            config,
            load_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            tx,
        }
    }

    /// Create a session and run the first load.
    pub async fn open(source: impl Into<String>, config: PipelineConfig) -> Self {
        let session = Self::new(source, config);
        session.reload().await;
        session
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Reload the source and publish the result unless a newer reload was requested.
    ///
    /// Never fails: an unusable source publishes the fallback dataset.
    pub async fn reload(&self) -> ReloadOutcome {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.load_lock.lock().await;

        if self.is_stale(ticket) {
            debug!(ticket, "Skipping superseded reload");
            return ReloadOutcome::Superseded { ticket };
        }

        let dataset = load_or_fallback(&self.source).await;

        let published = self.tx.send_if_modified(|current| {
            if self.is_stale(ticket) {
                return false;
            }
            let views = recompute(&dataset.publications, current.filters(), &self.config);
            *current = Arc::new(Snapshot {
                generation: ticket,
                dataset: dataset.clone(),
                views,
            });
            true
        });

        if !published {
            debug!(ticket, "Discarding superseded load");
            return ReloadOutcome::Superseded { ticket };
        }

        info!(
            generation = ticket,
            source = dataset.source.label(),
            publications = dataset.publications.len(),
            "Published dataset snapshot"
        );
        ReloadOutcome::Published { generation: ticket }
    }

    /// Apply one filter change to the current snapshot and publish the result.
    pub fn apply_filter(&self, change: FilterChange) -> Arc<Snapshot> {
        self.tx.send_modify(|current| {
            let filters = current.filters().clone().with(change);
            let views = recompute(&current.dataset.publications, &filters, &self.config);
            *current = Arc::new(Snapshot {
                generation: current.generation,
                dataset: current.dataset.clone(),
                views,
            });
        });
        let snapshot = self.snapshot();
        debug!(
            matched = snapshot.views.view.total,
            page = snapshot.views.view.page,
            "Applied filter change"
        );
        snapshot
    }

    fn is_stale(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FALLBACK_CSV;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_reference_year(2025)
    }

    #[tokio::test]
    async fn test_new_session_is_empty() {
        let session = DashboardSession::new("missing.csv", config());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.generation, 0);
        assert_eq!(snapshot.views.view.total, 0);
        assert_eq!(snapshot.views.view.total_pages, 1);
    }

    #[tokio::test]
    async fn test_reload_publishes_snapshot() {
        let file = csv_file(FALLBACK_CSV);
        let path = file.path().to_string_lossy().to_string();
        let session = DashboardSession::new(path.clone(), config());
        let mut rx = session.subscribe();

        let outcome = session.reload().await;
        assert_eq!(outcome, ReloadOutcome::Published { generation: 1 });
        assert!(rx.has_changed().unwrap());

        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.dataset.publications.len(), 5);
        assert_eq!(snapshot.dataset.source, DataSource::Live { location: path });
        assert_eq!(snapshot.views.stats.total, 5);
    }

    #[tokio::test]
    async fn test_missing_source_falls_back() {
        let session = DashboardSession::open("/nonexistent/pubs.csv", config()).await;
        let snapshot = session.snapshot();
        assert!(snapshot.is_fallback());
        assert_eq!(snapshot.views.view.total, 5);
    }

    #[tokio::test]
    async fn test_queued_reload_is_superseded() {
        let file = csv_file(FALLBACK_CSV);
        let session = DashboardSession::new(file.path().to_string_lossy(), config());

        let guard = session.load_lock.lock().await;
        let release = async {
            tokio::task::yield_now().await;
            drop(guard);
        };
        let (first, second, ()) = futures::join!(session.reload(), session.reload(), release);

        assert_eq!(first, ReloadOutcome::Superseded { ticket: 1 });
        assert_eq!(second, ReloadOutcome::Published { generation: 2 });
        assert_eq!(session.snapshot().generation, 2);
    }

    #[tokio::test]
    async fn test_concurrent_reloads_end_on_newest() {
        let file = csv_file(FALLBACK_CSV);
        let session = DashboardSession::new(file.path().to_string_lossy(), config());

        let outcomes = futures::future::join_all((0..4).map(|_| session.reload())).await;
        assert_eq!(outcomes.last(), Some(&ReloadOutcome::Published { generation: 4 }));
        assert_eq!(session.snapshot().generation, 4);
    }

    #[tokio::test]
    async fn test_filter_change_keeps_dataset_and_resets_page() {
        let session = DashboardSession::open("/nonexistent/pubs.csv", config()).await;
        session.apply_filter(FilterChange::PageSize(2));
        let paged = session.apply_filter(FilterChange::Page(3));
        assert_eq!(paged.views.view.page, 3);

        let mut rx = session.subscribe();
        let snapshot = session.apply_filter(FilterChange::Year(Some(2024)));
        assert!(rx.has_changed().unwrap());
        assert_eq!(snapshot.filters().page, 1);
        assert_eq!(snapshot.views.view.total, 1);
        assert_eq!(snapshot.dataset.publications.len(), 5);
        assert_eq!(snapshot.generation, 1);
    }

    #[tokio::test]
    async fn test_reload_keeps_filters() {
        let file = csv_file(FALLBACK_CSV);
        let session = DashboardSession::new(file.path().to_string_lossy(), config());
        session.apply_filter(FilterChange::Year(Some(2025)));
        session.reload().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.filters().year, Some(2025));
        assert_eq!(snapshot.views.view.total, 1);
    }
}
