//! Publication filtering, ordering and pagination.

use crate::model::{GeographicReach, Publication, UsageType, NEUTRAL_SCORE};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Active dashboard filters. Every set field must match (conjunction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    /// Case-insensitive substring over the main text fields
    pub search: Option<String>,
    pub domain: Option<String>,
    pub year: Option<i32>,
    /// Inclusive range
    pub year_range: Option<(i32, i32)>,
    pub usage_type: Option<UsageType>,
    pub publication_type: Option<String>,
    pub geographic_reach: Option<GeographicReach>,
    /// Minimum quality score; a missing score counts as neutral
    pub min_quality: Option<f64>,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: None,
            domain: None,
            year: None,
            year_range: None,
            usage_type: None,
            publication_type: None,
            geographic_reach: None,
            min_quality: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A single edit to the filter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FilterChange {
    Search(Option<String>),
    Domain(Option<String>),
    Year(Option<i32>),
    YearRange(Option<(i32, i32)>),
    UsageType(Option<UsageType>),
    PublicationType(Option<String>),
    GeographicReach(Option<GeographicReach>),
    MinQuality(Option<f64>),
    PageSize(usize),
    Page(usize),
    /// Clear every filter
    Reset,
}

impl FilterState {
    /// Apply one change. Anything but a page change returns to page 1.
    pub fn apply(&mut self, change: FilterChange) {
        match change {
            FilterChange::Page(page) => {
                self.page = page.max(1);
                return;
            }
            FilterChange::Search(search) => {
                self.search = search.filter(|s| !s.trim().is_empty());
            }
            FilterChange::Domain(domain) => self.domain = domain,
            FilterChange::Year(year) => self.year = year,
            FilterChange::YearRange(range) => self.year_range = range,
            FilterChange::UsageType(usage) => self.usage_type = usage,
            FilterChange::PublicationType(kind) => self.publication_type = kind,
            FilterChange::GeographicReach(reach) => self.geographic_reach = reach,
            FilterChange::MinQuality(min) => self.min_quality = min,
            FilterChange::PageSize(size) => self.page_size = size.max(1),
            FilterChange::Reset => {
                *self = Self {
                    page_size: self.page_size,
                    ..Self::default()
                };
            }
        }
        self.page = 1;
    }

    /// `apply` by value.
    pub fn with(mut self, change: FilterChange) -> Self {
        self.apply(change);
        self
    }

    /// True when no predicate is set.
    pub fn is_unfiltered(&self) -> bool {
        self.search.is_none()
            && self.domain.is_none()
            && self.year.is_none()
            && self.year_range.is_none()
            && self.usage_type.is_none()
            && self.publication_type.is_none()
            && self.geographic_reach.is_none()
            && self.min_quality.is_none()
    }

    pub fn matches(&self, publication: &Publication) -> bool {
        if let Some(search) = self.search.as_deref() {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !searchable_text(publication).contains(&needle) {
                return false;
            }
        }
        if let Some(domain) = self.domain.as_deref() {
            if !same_category(&publication.research_domain, domain) {
                return false;
            }
        }
        if let Some(year) = self.year {
            if publication.year != Some(year) {
                return false;
            }
        }
        if let Some((a, b)) = self.year_range {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            if !publication.year.is_some_and(|y| (lo..=hi).contains(&y)) {
                return false;
            }
        }
        if let Some(usage) = self.usage_type {
            if publication.usage_type != usage {
                return false;
            }
        }
        if let Some(kind) = self.publication_type.as_deref() {
            if !same_category(&publication.publication_type, kind) {
                return false;
            }
        }
        if let Some(reach) = self.geographic_reach {
            if publication.geographic_reach != reach {
                return false;
            }
        }
        if let Some(min) = self.min_quality {
            if publication.quality_score.unwrap_or(NEUTRAL_SCORE) < min {
                return false;
            }
        }
        true
    }
}

/// Filtered and sorted publications with the current page cut out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredView {
    pub items: Vec<Publication>,
    pub page_items: Vec<Publication>,
    pub total: usize,
    /// Clamped to `1..=total_pages`
    pub page: usize,
    pub page_size: usize,
    /// Never less than 1
    pub total_pages: usize,
}

/// Filter, sort and paginate a publication set.
pub fn apply_filter(publications: &[Publication], state: &FilterState) -> FilteredView {
    let mut items: Vec<Publication> = publications
        .iter()
        .filter(|p| state.matches(p))
        .cloned()
        .collect();
    items.sort_by(compare_publications);

    let total = items.len();
    let page_size = state.page_size.max(1);
    let total_pages = total.div_ceil(page_size).max(1);
    let page = state.page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let page_items = items.iter().skip(start).take(page_size).cloned().collect();

    FilteredView {
        items,
        page_items,
        total,
        page,
        page_size,
        total_pages,
    }
}

/// Newest first, then highest quality, then id. Unknown years and scores sort last.
pub fn compare_publications(a: &Publication, b: &Publication) -> Ordering {
    descending_known(a.year, b.year)
        .then_with(|| match (a.quality_score, b.quality_score) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn descending_known<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn same_category(value: &str, wanted: &str) -> bool {
    value.trim().eq_ignore_ascii_case(wanted.trim())
}

fn searchable_text(publication: &Publication) -> String {
    [
        publication.title.as_str(),
        publication.authors.as_str(),
        publication.research_domain.as_str(),
        publication.key_findings.as_str(),
        publication.policy_implications.as_str(),
        publication.usage_description.as_str(),
    ]
    .join("\n")
    .to_lowercase()
}
