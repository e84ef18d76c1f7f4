//! Weighted Sankey flow across publication classification stages.
//!
//! Each publication contributes its weight once to every stage where it has a
//! value. Links only join adjacent stages where both values are present; the
//! weight that cannot be routed is recorded on the node beside the gap so that
//! every node balances.

use crate::model::{Publication, NEUTRAL_SCORE};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    PublicationType,
    UsageType,
    ResearchDomain,
    GeographicFocus,
    PolicyImpact,
}

impl FlowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicationType => "publication_type",
            Self::UsageType => "usage_type",
            Self::ResearchDomain => "research_domain",
            Self::GeographicFocus => "geographic_focus",
            Self::PolicyImpact => "policy_impact",
        }
    }

    /// Stage value for a publication, `None` when the field is blank.
    fn value_of<'a>(&self, publication: &'a Publication) -> Option<&'a str> {
        match self {
            Self::PublicationType => Publication::category(&publication.publication_type),
            Self::UsageType => Some(publication.usage_type.as_str()),
            Self::ResearchDomain => Publication::category(&publication.research_domain),
            Self::GeographicFocus => Publication::category(&publication.geographic_focus),
            Self::PolicyImpact => Some(publication.policy_category.as_str()),
        }
    }
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Append the keyword-derived policy category as a final stage
    pub include_policy_stage: bool,
    /// Year recency is measured against
    pub reference_year: i32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            include_policy_stage: false,
            reference_year: chrono::Local::now().year(),
        }
    }
}

impl FlowConfig {
    pub fn stages(&self) -> Vec<FlowStage> {
        let mut stages = vec![
            FlowStage::PublicationType,
            FlowStage::UsageType,
            FlowStage::ResearchDomain,
            FlowStage::GeographicFocus,
        ];
        if self.include_policy_stage {
            stages.push(FlowStage::PolicyImpact);
        }
        stages
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    /// `stage:value`
    pub id: String,
    pub stage: FlowStage,
    pub label: String,
    /// Total weight of publications classified under this node
    pub value: f64,
    /// Weight arriving from publications with no value at the previous stage
    pub unrouted_in: f64,
    /// Weight leaving to publications with no value at the next stage
    pub unrouted_out: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub count: usize,
}

/// Publications with no value at a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGaps {
    pub stage: FlowStage,
    pub missing_count: usize,
    pub missing_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub stages: Vec<FlowStage>,
    /// Ordered by stage, then label
    pub nodes: Vec<FlowNode>,
    /// Ordered by source, then target
    pub links: Vec<FlowLink>,
    /// One entry per stage
    pub gaps: Vec<FlowGaps>,
    pub total_weight: f64,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, source: &str, target: &str) -> Option<&FlowLink> {
        self.links
            .iter()
            .find(|l| l.source == source && l.target == target)
    }

    pub fn inflow(&self, id: &str) -> f64 {
        self.links.iter().filter(|l| l.target == id).map(|l| l.value).sum()
    }

    pub fn outflow(&self, id: &str) -> f64 {
        self.links.iter().filter(|l| l.source == id).map(|l| l.value).sum()
    }
}

pub fn node_id(stage: FlowStage, value: &str) -> String {
    format!("{}:{}", stage, value)
}

/// Recency boost for recent work: 1.5 within a year, 1.2 within three.
pub fn recency_multiplier(year: Option<i32>, reference_year: i32) -> f64 {
    match year.map(|y| reference_year.saturating_sub(y)) {
        Some(age) if age <= 1 => 1.5,
        Some(age) if age <= 3 => 1.2,
        _ => 1.0,
    }
}

/// Flow weight of one publication; absent scores leave the weight unscaled.
pub fn publication_weight(publication: &Publication, reference_year: i32) -> f64 {
    let mut weight = 1.0;
    if let Some(quality) = publication.quality_score {
        weight *= quality / NEUTRAL_SCORE;
    }
    if let Some(impact) = publication.policy_impact_score {
        weight *= impact / NEUTRAL_SCORE;
    }
    weight * recency_multiplier(publication.year, reference_year)
}

#[derive(Default)]
struct NodeAccumulator {
    value: f64,
    unrouted_in: f64,
    unrouted_out: f64,
}

/// Build the stage-to-stage flow for a publication set.
pub fn build_flow(publications: &[Publication], config: &FlowConfig) -> FlowGraph {
    let stages = config.stages();
    let mut nodes: BTreeMap<(FlowStage, String), NodeAccumulator> = BTreeMap::new();
    let mut links: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
    let mut gaps: Vec<FlowGaps> = stages
        .iter()
        .map(|&stage| FlowGaps {
            stage,
            missing_count: 0,
            missing_weight: 0.0,
        })
        .collect();
    let mut total_weight = 0.0;

    for publication in publications {
        let weight = publication_weight(publication, config.reference_year);
        total_weight += weight;

        let values: Vec<Option<&str>> = stages.iter().map(|s| s.value_of(publication)).collect();

        for (i, (&stage, value)) in stages.iter().zip(&values).enumerate() {
            let Some(value) = value else {
                gaps[i].missing_count += 1;
                gaps[i].missing_weight += weight;
                continue;
            };

            let node = nodes.entry((stage, value.to_string())).or_default();
            node.value += weight;
            if i > 0 && values[i - 1].is_none() {
                node.unrouted_in += weight;
            }
            match values.get(i + 1) {
                Some(Some(next)) => {
                    let link = links
                        .entry((node_id(stage, value), node_id(stages[i + 1], next)))
                        .or_insert((0.0, 0));
                    link.0 += weight;
                    link.1 += 1;
                }
                Some(None) => node.unrouted_out += weight,
                None => {}
            }
        }
    }

    let nodes: Vec<FlowNode> = nodes
        .into_iter()
        .map(|((stage, label), acc)| FlowNode {
            id: node_id(stage, &label),
            stage,
            label,
            value: acc.value,
            unrouted_in: acc.unrouted_in,
            unrouted_out: acc.unrouted_out,
        })
        .collect();
    let links: Vec<FlowLink> = links
        .into_iter()
        .map(|((source, target), (value, count))| FlowLink {
            source,
            target,
            value,
            count,
        })
        .collect();

    debug!(
        nodes = nodes.len(),
        links = links.len(),
        total_weight,
        "Built publication flow"
    );

    FlowGraph {
        stages,
        nodes,
        links,
        gaps,
        total_weight,
    }
}
