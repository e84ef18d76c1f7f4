//! Builders shared by unit tests.

use crate::model::{GeographicReach, PolicyCategory, Publication, UsageType};

/// Minimal research-enabler journal article with blank text fields.
pub fn publication(id: &str, year: Option<i32>) -> Publication {
    Publication {
        id: id.to_string(),
        publication_type: "JOURNAL_ARTICLE".to_string(),
        title: format!("Publication {}", id),
        authors: String::new(),
        year,
        journal: String::new(),
        publisher: String::new(),
        usage_type: UsageType::ResearchEnabler,
        usage_justification: String::new(),
        usage_description: String::new(),
        research_domain: String::new(),
        geographic_focus: String::new(),
        data_years_used: String::new(),
        key_findings: String::new(),
        policy_implications: String::new(),
        doi_url: String::new(),
        notes: String::new(),
        quality_score: None,
        policy_impact_score: None,
        geographic_reach: GeographicReach::Unspecified,
        policy_category: PolicyCategory::StrategicPlanning,
        doi: None,
    }
}

pub fn authored(id: &str, year: Option<i32>, authors: &str) -> Publication {
    Publication {
        authors: authors.to_string(),
        ..publication(id, year)
    }
}
