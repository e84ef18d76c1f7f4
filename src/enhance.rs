//! Derived fields attached to each publication at load time.
//!
//! Every function here is a pure function of text fields, so identical text
//! always classifies identically.

use crate::model::{GeographicReach, PolicyCategory, Publication};
use regex::Regex;
use std::sync::LazyLock;

static DOI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"10\.\d{4,}(?:\.\d+)*/[-._;()/:a-zA-Z0-9]+").expect("DOI pattern is valid")
});

const US_STATES: &[&str] = &[
    "alabama", "alaska", "arizona", "arkansas", "california", "colorado", "connecticut",
    "delaware", "florida", "georgia", "hawaii", "idaho", "illinois", "indiana", "iowa",
    "kansas", "kentucky", "louisiana", "maine", "maryland", "massachusetts", "michigan",
    "minnesota", "mississippi", "missouri", "montana", "nebraska", "nevada", "new hampshire",
    "new jersey", "new mexico", "new york", "north carolina", "north dakota", "ohio",
    "oklahoma", "oregon", "pennsylvania", "rhode island", "south carolina", "south dakota",
    "tennessee", "texas", "utah", "vermont", "virginia", "washington", "west virginia",
    "wisconsin", "wyoming",
];

/// Policy keyword groups in priority order; the first group with a hit wins.
const POLICY_KEYWORDS: &[(PolicyCategory, &[&str])] = &[
    (
        PolicyCategory::Competition,
        &["competition", "antitrust", "merger", "consolidation", "market power", "ftc"],
    ),
    (
        PolicyCategory::Affordability,
        &["afford", "cost", "price", "pricing", "spending", "payment"],
    ),
    (
        PolicyCategory::DataStandards,
        &["data standard", "interoperab", "transparency", "reporting", "data collection"],
    ),
    (
        PolicyCategory::Quality,
        &["quality", "outcome", "safety", "performance"],
    ),
];

/// Attach derived fields to a freshly parsed publication.
pub fn enhance(mut publication: Publication) -> Publication {
    publication.geographic_reach = classify_reach(&publication.geographic_focus);
    publication.policy_category = categorize_policy(&publication.policy_implications);
    publication.doi = extract_doi(&publication.doi_url);
    publication
}

/// Classify the geographic focus text into a reach bucket.
pub fn classify_reach(focus: &str) -> GeographicReach {
    let text = focus.trim().to_lowercase();
    if text.is_empty() {
        return GeographicReach::Unspecified;
    }

    if ["international", "global", "countries", "oecd", "cross-national", "worldwide"]
        .iter()
        .any(|k| text.contains(k))
    {
        return GeographicReach::International;
    }

    if ["national", "united states", "u.s.", "usa", "nationwide", "us "]
        .iter()
        .any(|k| text.contains(k))
        || text == "us"
    {
        return GeographicReach::National;
    }

    if ["region", "multi-state", "multistate", "states"]
        .iter()
        .any(|k| text.contains(k))
    {
        return GeographicReach::Regional;
    }

    if text.contains("state") || US_STATES.iter().any(|s| text.contains(s)) {
        return GeographicReach::State;
    }

    if ["county", "city", "local", "metropolitan", "community", "municipal"]
        .iter()
        .any(|k| text.contains(k))
    {
        return GeographicReach::Local;
    }

    GeographicReach::Unspecified
}

/// Keyword-match the policy implications into a category.
///
/// Priority: competition, affordability, data-standards, quality, and
/// strategic-planning as the default bucket.
pub fn categorize_policy(policy_text: &str) -> PolicyCategory {
    let text = policy_text.to_lowercase();
    POLICY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(PolicyCategory::StrategicPlanning)
}

/// Pull a bare DOI out of a URL or DOI string.
pub fn extract_doi(doi_url: &str) -> Option<String> {
    DOI_REGEX
        .find(doi_url)
        .map(|m| m.as_str().trim_end_matches(['.', ';', ')']).to_string())
}
