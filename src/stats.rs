//! Descriptive statistics over a publication set.
//!
//! Every aggregate here is total: empty input gives zero counts and empty
//! distributions, and zero denominators give a neutral `0.0` instead of NaN.

use crate::authors::{classify_author_list, parse_authors, AuthorListFormat};
use crate::model::{Publication, UsageType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Policy-implication phrases marking a publication as having had policy impact
const POLICY_IMPACT_PHRASES: &[&str] = &["informed", "supports", "led to", "resulted in", "influenced"];

/// Publication type counted as high impact on its own
const GOVERNMENT_TYPE: &str = "GOVERNMENT";

/// Years spanned by the compound growth rate
const CAGR_YEARS: i32 = 3;

/// Publications per year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
    /// Change against the previous calendar year; 0.0 when that year is empty
    pub growth_percent: f64,
}

/// Count and share of one categorical value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

/// Which formula produced the headline growth rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMethod {
    ThreeYearCagr,
    YearOverYear,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRate {
    pub percent: f64,
    pub method: GrowthMethod,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
}

impl GrowthRate {
    fn stable() -> Self {
        Self {
            percent: 0.0,
            method: GrowthMethod::Stable,
            from_year: None,
            to_year: None,
        }
    }
}

/// Headline metrics shown alongside the distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub growth: GrowthRate,
    pub primary_analysis_share: f64,
    pub domain_diversity: usize,
    /// Share of publications with two or more parsed authors
    pub collaborative_share: f64,
    pub leading_domain: Option<String>,
    /// Most frequent domain in the two most recent data years
    pub emerging_domain: Option<String>,
    pub high_impact_count: usize,
    /// Publications in the three most recent data years
    pub recent_count: usize,
    pub average_quality: Option<f64>,
}

/// Completeness of the loaded records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub missing_year: usize,
    pub missing_domain: usize,
    pub missing_usage_description: usize,
    pub missing_policy_implications: usize,
    pub author_formats: BTreeMap<AuthorListFormat, usize>,
    pub dropped_author_fragments: usize,
    pub publications_without_authors: usize,
}

/// All aggregates for one publication set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: usize,
    pub by_year: Vec<YearCount>,
    pub by_domain: Vec<CategoryCount>,
    pub by_usage_type: Vec<CategoryCount>,
    pub by_publication_type: Vec<CategoryCount>,
    pub by_geographic_reach: Vec<CategoryCount>,
    pub insights: Insights,
    pub quality: DataQuality,
}

/// Compute every aggregate for a publication set.
pub fn compute_stats(publications: &[Publication]) -> DashboardStats {
    let total = publications.len();
    let year_counts = count_years(publications);

    let by_year = year_distribution(&year_counts);
    let by_domain = category_counts(
        publications
            .iter()
            .map(|p| Publication::category(&p.research_domain)),
        total,
    );
    let by_usage_type = usage_distribution(publications);
    let by_publication_type = category_counts(
        publications
            .iter()
            .map(|p| Publication::category(&p.publication_type)),
        total,
    );
    let by_geographic_reach = category_counts(
        publications.iter().map(|p| Some(p.geographic_reach.as_str())),
        total,
    );

    let (collaborative, quality) = author_metrics(publications);

    let insights = Insights {
        growth: growth_rate(&year_counts),
        primary_analysis_share: percentage(
            publications
                .iter()
                .filter(|p| p.usage_type == UsageType::PrimaryAnalysis)
                .count(),
            total,
        ),
        domain_diversity: by_domain.len(),
        collaborative_share: percentage(collaborative, total),
        leading_domain: by_domain.first().map(|c| c.label.clone()),
        emerging_domain: emerging_domain(publications, &year_counts),
        high_impact_count: publications.iter().filter(|p| is_high_impact(p)).count(),
        recent_count: recent_count(publications, &year_counts),
        average_quality: average_quality(publications),
    };

    DashboardStats {
        total,
        by_year,
        by_domain,
        by_usage_type,
        by_publication_type,
        by_geographic_reach,
        insights,
        quality,
    }
}

/// `part / whole` as a percentage rounded to one decimal; 0.0 for an empty whole.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 * 100.0 / whole as f64)
}

pub fn round1(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 10.0).round() / 10.0
}

/// Government publication, primary analysis, or policy text showing impact.
pub fn is_high_impact(publication: &Publication) -> bool {
    if publication.publication_type.trim().eq_ignore_ascii_case(GOVERNMENT_TYPE)
        || publication.usage_type == UsageType::PrimaryAnalysis
    {
        return true;
    }
    let policy = publication.policy_implications.to_lowercase();
    POLICY_IMPACT_PHRASES.iter().any(|k| policy.contains(k))
}

fn count_years(publications: &[Publication]) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for year in publications.iter().filter_map(|p| p.year) {
        *counts.entry(year).or_insert(0) += 1;
    }
    counts
}

fn year_distribution(counts: &BTreeMap<i32, usize>) -> Vec<YearCount> {
    counts
        .iter()
        .map(|(&year, &count)| {
            let previous = year
                .checked_sub(1)
                .and_then(|y| counts.get(&y))
                .copied()
                .unwrap_or(0);
            let growth_percent = if previous == 0 {
                0.0
            } else {
                round1((count as f64 - previous as f64) * 100.0 / previous as f64)
            };
            YearCount {
                year,
                count,
                growth_percent,
            }
        })
        .collect()
}

/// Sorted by count descending, then label; blank values are skipped.
fn category_counts<'a>(values: impl Iterator<Item = Option<&'a str>>, total: usize) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut result: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    result
}

/// Lists all three usage types, including empty ones.
fn usage_distribution(publications: &[Publication]) -> Vec<CategoryCount> {
    let total = publications.len();
    let mut result: Vec<CategoryCount> = UsageType::ALL
        .iter()
        .map(|usage| {
            let count = publications.iter().filter(|p| p.usage_type == *usage).count();
            CategoryCount {
                label: usage.as_str().to_string(),
                count,
                percentage: percentage(count, total),
            }
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    result
}

/// 3-year CAGR, else 1-year change, else stable.
fn growth_rate(counts: &BTreeMap<i32, usize>) -> GrowthRate {
    let Some((&latest, &latest_count)) = counts.iter().next_back() else {
        return GrowthRate::stable();
    };
    let count_in = |year: Option<i32>| year.and_then(|y| counts.get(&y)).copied().unwrap_or(0);

    let base_year = latest.checked_sub(CAGR_YEARS);
    let base = count_in(base_year);
    if base > 0 && latest_count > 0 {
        let ratio = latest_count as f64 / base as f64;
        return GrowthRate {
            percent: round1((ratio.powf(1.0 / CAGR_YEARS as f64) - 1.0) * 100.0),
            method: GrowthMethod::ThreeYearCagr,
            from_year: base_year,
            to_year: Some(latest),
        };
    }

    let previous_year = latest.checked_sub(1);
    let previous = count_in(previous_year);
    if previous > 0 {
        return GrowthRate {
            percent: round1((latest_count as f64 - previous as f64) * 100.0 / previous as f64),
            method: GrowthMethod::YearOverYear,
            from_year: previous_year,
            to_year: Some(latest),
        };
    }

    GrowthRate::stable()
}

fn emerging_domain(publications: &[Publication], counts: &BTreeMap<i32, usize>) -> Option<String> {
    let latest = *counts.keys().next_back()?;
    let recent = category_counts(
        publications
            .iter()
            .filter(|p| p.year.is_some_and(|y| y >= latest.saturating_sub(1)))
            .map(|p| Publication::category(&p.research_domain)),
        0,
    );
    recent.into_iter().next().map(|c| c.label)
}

fn recent_count(publications: &[Publication], counts: &BTreeMap<i32, usize>) -> usize {
    match counts.keys().next_back() {
        Some(&latest) => publications
            .iter()
            .filter(|p| p.year.is_some_and(|y| y >= latest.saturating_sub(2)))
            .count(),
        None => 0,
    }
}

fn average_quality(publications: &[Publication]) -> Option<f64> {
    let scores: Vec<f64> = publications.iter().filter_map(|p| p.quality_score).collect();
    if scores.is_empty() {
        return None;
    }
    Some(round1(scores.iter().sum::<f64>() / scores.len() as f64))
}

/// Collaborative publication count plus the data-quality report.
fn author_metrics(publications: &[Publication]) -> (usize, DataQuality) {
    let mut quality = DataQuality::default();
    let mut collaborative = 0;

    for publication in publications {
        let parsed = parse_authors(&publication.authors);
        if parsed.authors.len() >= 2 {
            collaborative += 1;
        }
        if parsed.authors.is_empty() {
            quality.publications_without_authors += 1;
        }
        quality.dropped_author_fragments += parsed.dropped;
        *quality
            .author_formats
            .entry(classify_author_list(&publication.authors))
            .or_insert(0) += 1;

        if publication.year.is_none() {
            quality.missing_year += 1;
        }
        if Publication::category(&publication.research_domain).is_none() {
            quality.missing_domain += 1;
        }
        if Publication::category(&publication.usage_description).is_none() {
            quality.missing_usage_description += 1;
        }
        if Publication::category(&publication.policy_implications).is_none() {
            quality.missing_policy_implications += 1;
        }
    }

    (collaborative, quality)
}
