//! Core publication data model.
//!
//! A [`Publication`] is built once per CSV row, enhanced once with derived
//! fields, and never mutated afterwards. Collections of publications are shared
//! as `Arc<[Publication]>` snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score treated as neutral for quality and policy-impact weighting
pub const NEUTRAL_SCORE: f64 = 50.0;

/// How a publication relies on the reference database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageType {
    PrimaryAnalysis,
    ResearchEnabler,
    ContextualReference,
}

impl UsageType {
    pub const ALL: [UsageType; 3] = [
        UsageType::PrimaryAnalysis,
        UsageType::ResearchEnabler,
        UsageType::ContextualReference,
    ];

    /// Parse the CSV representation (`PRIMARY_ANALYSIS`, ...).
    ///
    /// Matching ignores surrounding whitespace and letter case; anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PRIMARY_ANALYSIS" => Some(Self::PrimaryAnalysis),
            "RESEARCH_ENABLER" => Some(Self::ResearchEnabler),
            "CONTEXTUAL_REFERENCE" => Some(Self::ContextualReference),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryAnalysis => "PRIMARY_ANALYSIS",
            Self::ResearchEnabler => "RESEARCH_ENABLER",
            Self::ContextualReference => "CONTEXTUAL_REFERENCE",
        }
    }
}

impl fmt::Display for UsageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breadth of a publication's geographic focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeographicReach {
    Local,
    State,
    Regional,
    National,
    International,
    Unspecified,
}

impl GeographicReach {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::State => "state",
            Self::Regional => "regional",
            Self::National => "national",
            Self::International => "international",
            Self::Unspecified => "unspecified",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "state" => Some(Self::State),
            "regional" => Some(Self::Regional),
            "national" => Some(Self::National),
            "international" => Some(Self::International),
            "unspecified" => Some(Self::Unspecified),
            _ => None,
        }
    }
}

impl fmt::Display for GeographicReach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy-impact bucket derived from the policy-implications text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyCategory {
    Competition,
    Affordability,
    DataStandards,
    Quality,
    StrategicPlanning,
}

impl PolicyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Competition => "competition",
            Self::Affordability => "affordability",
            Self::DataStandards => "data-standards",
            Self::Quality => "quality",
            Self::StrategicPlanning => "strategic-planning",
        }
    }
}

impl fmt::Display for PolicyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One research item loaded from the publication CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: String,
    pub publication_type: String,
    pub title: String,
    pub authors: String,
    pub year: Option<i32>,
    pub journal: String,
    pub publisher: String,
    pub usage_type: UsageType,
    pub usage_justification: String,
    pub usage_description: String,
    pub research_domain: String,
    pub geographic_focus: String,
    pub data_years_used: String,
    pub key_findings: String,
    pub policy_implications: String,
    pub doi_url: String,
    pub notes: String,
    /// 0-100, supplied by the source
    pub quality_score: Option<f64>,
    /// 0-100, supplied by the source
    pub policy_impact_score: Option<f64>,

    // Attached once by `enhance`
    pub geographic_reach: GeographicReach,
    pub policy_category: PolicyCategory,
    pub doi: Option<String>,
}

impl Publication {
    /// Quality score with a missing value read as neutral.
    pub fn effective_quality(&self) -> f64 {
        self.quality_score.unwrap_or(NEUTRAL_SCORE)
    }

    /// Trimmed categorical value, `None` when blank.
    pub fn category(value: &str) -> Option<&str> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Where the active dataset came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// Loaded from the configured CSV
    Live { location: String },
    /// Embedded sample dataset, substituted after a load failure
    Fallback { reason: String },
}

impl DataSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Live { .. } => "live",
            Self::Fallback { .. } => "fallback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_type_parse() {
        assert_eq!(UsageType::parse("PRIMARY_ANALYSIS"), Some(UsageType::PrimaryAnalysis));
        assert_eq!(UsageType::parse(" research_enabler "), Some(UsageType::ResearchEnabler));
        assert_eq!(
            UsageType::parse("CONTEXTUAL_REFERENCE"),
            Some(UsageType::ContextualReference)
        );
        assert_eq!(UsageType::parse("INCIDENTAL"), None);
        assert_eq!(UsageType::parse(""), None);
    }

    #[test]
    fn test_usage_type_serde_names() {
        let json = serde_json::to_string(&UsageType::ResearchEnabler).unwrap();
        assert_eq!(json, "\"RESEARCH_ENABLER\"");
    }

    #[test]
    fn test_category_blank() {
        assert_eq!(Publication::category("  "), None);
        assert_eq!(Publication::category(" Cost "), Some("Cost"));
    }

    #[test]
    fn test_data_source_label() {
        let live = DataSource::Live { location: "a.csv".to_string() };
        let fallback = DataSource::Fallback { reason: "missing".to_string() };
        assert_eq!(live.label(), "live");
        assert!(fallback.is_fallback());
        assert!(!live.is_fallback());
    }
}
