//! Recomputation of every derived dashboard view.
//!
//! [`recompute`] is a pure function of the base publications, the filter state
//! and the builder options. Statistics, the collaboration network and the flow
//! are computed over the filtered subset so every view describes the same
//! publications.

use crate::filter::{apply_filter, FilterState, FilteredView};
use crate::flow::{build_flow, FlowConfig, FlowGraph};
use crate::model::Publication;
use crate::network::{build_network, CollaborationNetwork, NetworkConfig};
use crate::stats::{compute_stats, DashboardStats};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Options for the derived-view builders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub network: NetworkConfig,
    pub flow: FlowConfig,
}

impl PipelineConfig {
    /// Measure recency in both builders against `year`.
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.network.reference_year = year;
        self.flow.reference_year = year;
        self
    }

    pub fn reference_year(&self) -> i32 {
        self.network.reference_year
    }
}

/// Everything the dashboard renders for one filter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedViews {
    pub filters: FilterState,
    pub view: FilteredView,
    pub stats: DashboardStats,
    pub network: CollaborationNetwork,
    pub flow: FlowGraph,
}

pub fn recompute(publications: &[Publication], filters: &FilterState, config: &PipelineConfig) -> DerivedViews {
    let view = apply_filter(publications, filters);
    let stats = compute_stats(&view.items);
    let network = build_network(&view.items, &config.network);
    let flow = build_flow(&view.items, &config.flow);

    debug!(
        base = publications.len(),
        filtered = view.total,
        page = view.page,
        "Recomputed derived views"
    );

    DerivedViews {
        filters: filters.clone(),
        view,
        stats,
        network,
        flow,
    }
}

/// Flat publication record written by CSV export
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub id: String,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub publication_type: String,
    pub usage_type: String,
    pub research_domain: String,
    pub geographic_focus: String,
    pub geographic_reach: String,
    pub policy_category: String,
    pub quality_score: String,
    pub policy_impact_score: String,
    pub journal: String,
    pub doi: String,
    pub key_findings: String,
    pub policy_implications: String,
}

/// CSV column order for export
pub const EXPORT_COLUMNS: &[&str] = &[
    "id", "title", "authors", "year", "publication_type", "usage_type", "research_domain",
    "geographic_focus", "geographic_reach", "policy_category", "quality_score",
    "policy_impact_score", "journal", "doi", "key_findings", "policy_implications",
];

impl From<&Publication> for ExportRow {
    fn from(p: &Publication) -> Self {
        let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            authors: p.authors.clone(),
            year: p.year.map(|y| y.to_string()).unwrap_or_default(),
            publication_type: p.publication_type.clone(),
            usage_type: p.usage_type.to_string(),
            research_domain: p.research_domain.clone(),
            geographic_focus: p.geographic_focus.clone(),
            geographic_reach: p.geographic_reach.to_string(),
            policy_category: p.policy_category.to_string(),
            quality_score: number(p.quality_score),
            policy_impact_score: number(p.policy_impact_score),
            journal: p.journal.clone(),
            // bare DOI when one was found, the raw link otherwise
            doi: p.doi.clone().unwrap_or_else(|| p.doi_url.clone()),
            key_findings: p.key_findings.clone(),
            policy_implications: p.policy_implications.clone(),
        }
    }
}

/// Current calendar year, the default recency reference.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FALLBACK_CSV;
    use crate::filter::FilterChange;
    use crate::loader::parse_csv_str;

    fn fallback_publications() -> Vec<Publication> {
        parse_csv_str(FALLBACK_CSV).unwrap().publications
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_reference_year(2025)
    }

    #[test]
    fn test_unfiltered_views_cover_everything() {
        let pubs = fallback_publications();
        let views = recompute(&pubs, &FilterState::default(), &config());

        assert_eq!(views.view.total, 5);
        assert_eq!(views.stats.total, 5);
        let pair = views.network.edge("zachary levinson", "jamie godwin");
        assert_eq!(pair.map(|e| e.collaboration_count), Some(2));
        assert!(views.flow.total_weight > 0.0);
    }

    #[test]
    fn test_views_follow_filter() {
        let pubs = fallback_publications();
        let filters = FilterState::default().with(FilterChange::Year(Some(2024)));
        let views = recompute(&pubs, &filters, &config());

        assert_eq!(views.view.total, 1);
        assert_eq!(views.stats.total, 1);
        assert_eq!(views.stats.by_year.len(), 1);
        assert_eq!(views.network.metrics.node_count, 3);
        assert_eq!(views.filters, filters);
    }

    #[test]
    fn test_empty_input_gives_empty_views() {
        let views = recompute(&[], &FilterState::default(), &config());
        assert_eq!(views.view.total, 0);
        assert_eq!(views.view.total_pages, 1);
        assert_eq!(views.stats.total, 0);
        assert!(views.network.nodes.is_empty());
        assert!(views.flow.links.is_empty());
    }

    #[test]
    fn test_reference_year_applies_to_both_builders() {
        let config = PipelineConfig::default().with_reference_year(2030);
        assert_eq!(config.network.reference_year, 2030);
        assert_eq!(config.flow.reference_year, 2030);
        assert_eq!(config.reference_year(), 2030);
    }

    #[test]
    fn test_export_header_matches_columns() {
        let pubs = fallback_publications();
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.serialize(ExportRow::from(&pubs[0])).unwrap();
        wtr.flush().unwrap();
        let data = String::from_utf8(wtr.get_ref().clone()).unwrap();
        let header = data.lines().next().unwrap_or_default();
        assert_eq!(header, EXPORT_COLUMNS.join(","));
    }

    #[test]
    fn test_export_row_prefers_bare_doi() {
        let pubs = fallback_publications();
        let row = ExportRow::from(&pubs[0]);
        assert_eq!(row.doi, "10.1377/hlthaff.2023.01234");
        assert_eq!(row.usage_type, "PRIMARY_ANALYSIS");
        assert_eq!(row.quality_score, "82");

        let report = pubs.iter().find(|p| p.doi.is_none()).map(ExportRow::from);
        assert_eq!(
            report.map(|r| r.doi),
            Some("https://www.ahrq.gov/chsp/data-resources".to_string())
        );
    }
}
