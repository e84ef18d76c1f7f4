//! Co-authorship network built from normalized author lists.
//!
//! Nodes are authors (people or institutions) keyed by their lowercased full
//! name; an undirected edge joins every pair of authors that share at least
//! `min_collaborations` publications. All maps are ordered so identical input
//! produces identical output.

use crate::authors::parse_authors;
use crate::error::{DashboardError, Result};
use crate::model::Publication;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Weight of the normalized collaboration count in edge strength
const COUNT_WEIGHT: f64 = 0.7;
/// Weight of shared-publication recency in edge strength
const RECENCY_WEIGHT: f64 = 0.3;
/// Age in years at which recency reaches zero
const RECENCY_HORIZON: i32 = 10;

const EIGENVECTOR_MAX_ITERATIONS: usize = 100;
const EIGENVECTOR_EPSILON: f64 = 1e-6;

/// Centrality reported on each node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityMeasure {
    #[default]
    Degree,
    Betweenness,
    Eigenvector,
}

impl CentralityMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Degree => "degree",
            Self::Betweenness => "betweenness",
            Self::Eigenvector => "eigenvector",
        }
    }
}

impl fmt::Display for CentralityMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CentralityMeasure {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degree" => Ok(Self::Degree),
            "betweenness" => Ok(Self::Betweenness),
            "eigenvector" => Ok(Self::Eigenvector),
            other => Err(DashboardError::Config(format!(
                "unknown centrality measure '{}' (expected degree, betweenness or eigenvector)",
                other
            ))),
        }
    }
}

/// Network builder options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Minimum shared publications for an edge to be kept
    pub min_collaborations: usize,
    pub centrality: CentralityMeasure,
    /// Year recency is measured against
    pub reference_year: i32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            min_collaborations: 1,
            centrality: CentralityMeasure::Degree,
            reference_year: chrono::Local::now().year(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorNode {
    /// Lowercased full name
    pub id: String,
    /// Spelling from the first publication the author appeared in
    pub name: String,
    pub is_institution: bool,
    pub publication_count: usize,
    /// Distinct collaborators over kept edges
    pub degree: usize,
    pub centrality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationEdge {
    /// Node id, ordered so that `source < target`
    pub source: String,
    pub target: String,
    pub collaboration_count: usize,
    pub strength: f64,
    pub latest_year: Option<i32>,
    pub publication_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub node_count: usize,
    pub individual_count: usize,
    pub institution_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub average_degree: f64,
    pub max_degree: usize,
    pub connected_components: usize,
    pub isolated_nodes: usize,
    /// Author fragments discarded while parsing
    pub dropped_fragments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationNetwork {
    /// Sorted by id
    pub nodes: Vec<AuthorNode>,
    /// Sorted by (source, target)
    pub edges: Vec<CollaborationEdge>,
    pub metrics: NetworkMetrics,
    pub centrality: CentralityMeasure,
}

impl CollaborationNetwork {
    /// Nodes ranked by centrality, highest first; ties broken by id.
    pub fn top_nodes(&self, limit: usize) -> Vec<&AuthorNode> {
        let mut ranked: Vec<&AuthorNode> = self.nodes.iter().collect();
        ranked.sort_by(|a, b| {
            b.centrality
                .total_cmp(&a.centrality)
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked.truncate(limit);
        ranked
    }

    pub fn node(&self, id: &str) -> Option<&AuthorNode> {
        self.nodes
            .binary_search_by(|n| n.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.nodes[i])
    }

    /// Edge between two node ids, in either order.
    pub fn edge(&self, a: &str, b: &str) -> Option<&CollaborationEdge> {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }
}

struct NodeAccumulator {
    name: String,
    is_institution: bool,
    publication_count: usize,
}

#[derive(Default)]
struct EdgeAccumulator {
    count: usize,
    latest_year: Option<i32>,
    publication_ids: Vec<String>,
}

/// Build the co-authorship network for a publication set.
pub fn build_network(publications: &[Publication], config: &NetworkConfig) -> CollaborationNetwork {
    let mut nodes: BTreeMap<String, NodeAccumulator> = BTreeMap::new();
    let mut pairs: BTreeMap<(String, String), EdgeAccumulator> = BTreeMap::new();
    let mut dropped_fragments = 0;

    for publication in publications {
        let parsed = parse_authors(&publication.authors);
        dropped_fragments += parsed.dropped;

        let mut ids: Vec<String> = Vec::with_capacity(parsed.authors.len());
        for author in &parsed.authors {
            let id = author.full_name.to_lowercase();
            let node = nodes.entry(id.clone()).or_insert_with(|| NodeAccumulator {
                name: author.full_name.clone(),
                is_institution: author.is_institution,
                publication_count: 0,
            });
            // smallest spelling wins so input order does not matter
            if author.full_name < node.name {
                node.name = author.full_name.clone();
            }
            node.is_institution |= author.is_institution;
            node.publication_count += 1;
            ids.push(id);
        }

        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                let key = if a < b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
                let edge = pairs.entry(key).or_default();
                edge.count += 1;
                edge.latest_year = edge.latest_year.max(publication.year);
                edge.publication_ids.push(publication.id.clone());
            }
        }
    }

    let min = config.min_collaborations.max(1);
    let max_count = pairs
        .values()
        .filter(|e| e.count >= min)
        .map(|e| e.count)
        .max()
        .unwrap_or(0);

    let edges: Vec<CollaborationEdge> = pairs
        .into_iter()
        .filter(|(_, e)| e.count >= min)
        .map(|((source, target), mut e)| {
            e.publication_ids.sort();
            e.publication_ids.dedup();
            CollaborationEdge {
                strength: edge_strength(e.count, max_count, e.latest_year, config.reference_year),
                source,
                target,
                collaboration_count: e.count,
                latest_year: e.latest_year,
                publication_ids: e.publication_ids,
            }
        })
        .collect();

    let graph = Adjacency::new(&nodes, &edges);
    let scores = match config.centrality {
        CentralityMeasure::Degree => graph.degree_centrality(),
        CentralityMeasure::Betweenness => graph.betweenness_centrality(),
        CentralityMeasure::Eigenvector => graph.eigenvector_centrality(),
    };

    let nodes: Vec<AuthorNode> = nodes
        .into_iter()
        .enumerate()
        .map(|(i, (id, acc))| AuthorNode {
            id,
            name: acc.name,
            is_institution: acc.is_institution,
            publication_count: acc.publication_count,
            degree: graph.neighbors[i].len(),
            centrality: scores[i],
        })
        .collect();

    let metrics = network_metrics(&nodes, &edges, &graph, dropped_fragments);
    debug!(
        nodes = metrics.node_count,
        edges = metrics.edge_count,
        components = metrics.connected_components,
        centrality = %config.centrality,
        "Built collaboration network"
    );

    CollaborationNetwork {
        nodes,
        edges,
        metrics,
        centrality: config.centrality,
    }
}

/// `0.7 * count / max + 0.3 * recency`, recency falling linearly to 0 over ten years.
pub fn edge_strength(count: usize, max_count: usize, latest_year: Option<i32>, reference_year: i32) -> f64 {
    let normalized = if max_count == 0 {
        0.0
    } else {
        count as f64 / max_count as f64
    };
    let recency = match latest_year {
        Some(year) => {
            let age = reference_year.saturating_sub(year).clamp(0, RECENCY_HORIZON);
            1.0 - age as f64 / RECENCY_HORIZON as f64
        }
        None => 0.0,
    };
    COUNT_WEIGHT * normalized + RECENCY_WEIGHT * recency
}

fn network_metrics(
    nodes: &[AuthorNode],
    edges: &[CollaborationEdge],
    graph: &Adjacency,
    dropped_fragments: usize,
) -> NetworkMetrics {
    let n = nodes.len();
    let e = edges.len();
    let institution_count = nodes.iter().filter(|n| n.is_institution).count();

    let density = if n > 1 {
        2.0 * e as f64 / (n as f64 * (n as f64 - 1.0))
    } else {
        0.0
    };
    let average_degree = if n > 0 { 2.0 * e as f64 / n as f64 } else { 0.0 };

    NetworkMetrics {
        node_count: n,
        individual_count: n - institution_count,
        institution_count,
        edge_count: e,
        density,
        average_degree,
        max_degree: nodes.iter().map(|n| n.degree).max().unwrap_or(0),
        connected_components: graph.connected_components(),
        isolated_nodes: nodes.iter().filter(|n| n.degree == 0).count(),
        dropped_fragments,
    }
}

/// Index-based adjacency lists over the kept edges.
struct Adjacency {
    neighbors: Vec<Vec<usize>>,
}

impl Adjacency {
    fn new(nodes: &BTreeMap<String, NodeAccumulator>, edges: &[CollaborationEdge]) -> Self {
        let index: BTreeMap<&str, usize> = nodes
            .keys()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
        for edge in edges {
            if let (Some(&s), Some(&t)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
                sets[s].insert(t);
                sets[t].insert(s);
            }
        }

        Self {
            neighbors: sets.into_iter().map(|s| s.into_iter().collect()).collect(),
        }
    }

    fn len(&self) -> usize {
        self.neighbors.len()
    }

    fn degree_centrality(&self) -> Vec<f64> {
        let n = self.len();
        if n <= 1 {
            return vec![0.0; n];
        }
        self.neighbors
            .iter()
            .map(|adj| adj.len() as f64 / (n - 1) as f64)
            .collect()
    }

    /// Brandes' algorithm, normalized by `(n-1)(n-2)/2`.
    fn betweenness_centrality(&self) -> Vec<f64> {
        let n = self.len();
        let mut centrality = vec![0.0; n];

        for source in 0..n {
            let mut stack = Vec::with_capacity(n);
            let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            let mut distance: Vec<Option<usize>> = vec![None; n];
            sigma[source] = 1.0;
            distance[source] = Some(0);

            let mut queue = VecDeque::from([source]);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                let dv = distance[v].unwrap_or(0);
                for &w in &self.neighbors[v] {
                    if distance[w].is_none() {
                        distance[w] = Some(dv + 1);
                        queue.push_back(w);
                    }
                    if distance[w] == Some(dv + 1) {
                        sigma[w] += sigma[v];
                        predecessors[w].push(v);
                    }
                }
            }

            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &predecessors[w] {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
                if w != source {
                    centrality[w] += delta[w];
                }
            }
        }

        // every undirected path was counted from both ends
        let scale = if n > 2 {
            1.0 / ((n - 1) as f64 * (n - 2) as f64)
        } else {
            0.0
        };
        centrality.iter().map(|c| c * scale).collect()
    }

    /// Power iteration on `A + I`, normalized so the top node scores 1.
    ///
    /// The identity shift keeps bipartite components from oscillating without
    /// changing the eigenvectors. Isolated nodes score 0.
    fn eigenvector_centrality(&self) -> Vec<f64> {
        let n = self.len();
        let mut scores: Vec<f64> = self
            .neighbors
            .iter()
            .map(|adj| if adj.is_empty() { 0.0 } else { 1.0 })
            .collect();
        if scores.iter().all(|&s| s == 0.0) {
            return scores;
        }

        for _ in 0..EIGENVECTOR_MAX_ITERATIONS {
            let mut next: Vec<f64> = (0..n)
                .map(|i| {
                    if self.neighbors[i].is_empty() {
                        0.0
                    } else {
                        scores[i] + self.neighbors[i].iter().map(|&j| scores[j]).sum::<f64>()
                    }
                })
                .collect();

            let max = next.iter().copied().fold(0.0f64, f64::max);
            if max > 0.0 {
                for score in next.iter_mut() {
                    *score /= max;
                }
            }

            let diff = next
                .iter()
                .zip(&scores)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0f64, f64::max);
            scores = next;
            if diff < EIGENVECTOR_EPSILON {
                break;
            }
        }

        scores
    }

    /// Union-find over the adjacency lists; isolated nodes count as components.
    fn connected_components(&self) -> usize {
        let n = self.len();
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut [usize], i: usize) -> usize {
            let mut root = i;
            while parent[root] != root {
                root = parent[root];
            }
            let mut node = i;
            while parent[node] != root {
                let next = parent[node];
                parent[node] = root;
                node = next;
            }
            root
        }

        for (u, adj) in self.neighbors.iter().enumerate() {
            for &v in adj {
                let (ru, rv) = (find(&mut parent, u), find(&mut parent, v));
                if ru != rv {
                    parent[ru] = rv;
                }
            }
        }

        (0..n).filter(|&i| find(&mut parent, i) == i).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::authored;

    fn config() -> NetworkConfig {
        NetworkConfig {
            reference_year: 2025,
            ..Default::default()
        }
    }

    #[test]
    fn test_repeated_pair_counts_once_per_publication() {
        let pubs = vec![
            authored("a", Some(2023), "Zachary Levinson; Jamie Godwin"),
            authored("b", Some(2024), "Zachary Levinson; Jamie Godwin"),
        ];
        let network = build_network(&pubs, &config());

        assert_eq!(network.nodes.len(), 2);
        assert_eq!(network.edges.len(), 1);
        let edge = &network.edges[0];
        assert_eq!(edge.collaboration_count, 2);
        assert_eq!(edge.source, "jamie godwin");
        assert_eq!(edge.target, "zachary levinson");
        assert_eq!(edge.latest_year, Some(2024));
        assert_eq!(edge.publication_ids, vec!["a", "b"]);
        // count term 0.7 + recency 0.3 * 0.9
        assert!((edge.strength - 0.97).abs() < 1e-9);
    }

    #[test]
    fn test_edge_count_bounded_by_complete_graph() {
        let pubs = vec![
            authored("a", Some(2024), "Ann Lee; Bob Stone; Cara Diaz; Dan Moss"),
            authored("b", Some(2024), "Ann Lee; Cara Diaz"),
            authored("c", Some(2020), "Eve Park"),
        ];
        let network = build_network(&pubs, &config());
        let n = network.nodes.len();
        assert_eq!(n, 5);
        assert!(network.edges.len() <= n * (n - 1) / 2);
        assert_eq!(network.edges.len(), 6);
        assert_eq!(network.metrics.isolated_nodes, 1);
        assert_eq!(network.metrics.connected_components, 2);
        assert_eq!(network.metrics.max_degree, 3);
    }

    #[test]
    fn test_collaboration_total_bounded_by_author_pairs() {
        let pubs = vec![
            authored("a", Some(2022), "Ann Lee; Bob Stone; Cara Diaz"),
            authored("b", Some(2023), "Ann Lee; Bob Stone; Cara Diaz"),
            authored("c", Some(2024), "Bob Stone; Ann Lee"),
            authored("d", Some(2024), "Ann Lee; Ann Lee; Dan Moss"),
            authored("e", Some(2024), "Eve Park"),
        ];
        let network = build_network(&pubs, &config());

        let total: usize = network.edges.iter().map(|e| e.collaboration_count).sum();
        let bound: usize = pubs
            .iter()
            .map(|p| {
                let k = parse_authors(&p.authors).authors.len();
                k * k.saturating_sub(1) / 2
            })
            .sum();
        assert!(total <= bound);
        assert_eq!(total, 8);
        assert_eq!(network.edge("ann lee", "bob stone").map(|e| e.collaboration_count), Some(3));
    }

    #[test]
    fn test_network_independent_of_input_order() {
        let pubs = vec![
            authored("b", Some(2024), "ZACHARY LEVINSON; Jamie Godwin"),
            authored("a", Some(2023), "Zachary Levinson; Jamie Godwin; Ann Lee"),
            authored("c", Some(2021), "Ann Lee; Bob Stone"),
        ];
        let mut reversed = pubs.clone();
        reversed.reverse();

        for centrality in [
            CentralityMeasure::Degree,
            CentralityMeasure::Betweenness,
            CentralityMeasure::Eigenvector,
        ] {
            let config = NetworkConfig {
                centrality,
                ..config()
            };
            assert_eq!(build_network(&pubs, &config), build_network(&reversed, &config));
        }

        let network = build_network(&pubs, &config());
        let edge = network.edge("zachary levinson", "jamie godwin");
        assert_eq!(edge.map(|e| e.publication_ids.clone()), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(network.node("zachary levinson").map(|n| n.name.as_str()), Some("ZACHARY LEVINSON"));
    }

    #[test]
    fn test_min_collaborations_threshold() {
        let pubs = vec![
            authored("a", Some(2024), "Ann Lee; Bob Stone"),
            authored("b", Some(2024), "Ann Lee; Bob Stone; Cara Diaz"),
        ];
        let network = build_network(
            &pubs,
            &NetworkConfig {
                min_collaborations: 2,
                ..config()
            },
        );
        assert_eq!(network.edges.len(), 1);
        assert_eq!(network.edge("bob stone", "ann lee").map(|e| e.collaboration_count), Some(2));
        assert_eq!(network.node("cara diaz").map(|n| n.degree), Some(0));
    }

    #[test]
    fn test_empty_input() {
        let network = build_network(&[], &config());
        assert!(network.nodes.is_empty());
        assert!(network.edges.is_empty());
        assert_eq!(network.metrics, NetworkMetrics::default());
    }

    #[test]
    fn test_institutions_counted() {
        let pubs = vec![authored("a", Some(2024), "Maria Lopez, PhD; Harvard University")];
        let network = build_network(&pubs, &config());
        assert_eq!(network.metrics.institution_count, 1);
        assert_eq!(network.metrics.individual_count, 1);
        assert_eq!(network.metrics.density, 1.0);
    }

    #[test]
    fn test_betweenness_on_path() {
        // Ann - Bob - Cara: Bob lies on the only Ann/Cara path
        let pubs = vec![
            authored("a", Some(2024), "Ann Lee; Bob Stone"),
            authored("b", Some(2024), "Bob Stone; Cara Diaz"),
        ];
        let network = build_network(
            &pubs,
            &NetworkConfig {
                centrality: CentralityMeasure::Betweenness,
                ..config()
            },
        );
        assert_eq!(network.node("bob stone").map(|n| n.centrality), Some(1.0));
        assert_eq!(network.node("ann lee").map(|n| n.centrality), Some(0.0));
        assert_eq!(network.top_nodes(1)[0].id, "bob stone");
    }

    #[test]
    fn test_eigenvector_star_center_is_max() {
        let pubs = vec![
            authored("a", Some(2024), "Hub Person; Ann Lee"),
            authored("b", Some(2024), "Hub Person; Bob Stone"),
            authored("c", Some(2024), "Hub Person; Cara Diaz"),
        ];
        let network = build_network(
            &pubs,
            &NetworkConfig {
                centrality: CentralityMeasure::Eigenvector,
                ..config()
            },
        );
        let hub = network.node("hub person").map(|n| n.centrality).unwrap_or_default();
        let leaf = network.node("ann lee").map(|n| n.centrality).unwrap_or_default();
        assert!((hub - 1.0).abs() < 1e-9);
        assert!(leaf > 0.0 && leaf < hub);
    }

    #[test]
    fn test_edge_strength_recency() {
        assert!((edge_strength(1, 2, Some(2015), 2025) - 0.35).abs() < 1e-9);
        assert!((edge_strength(2, 2, None, 2025) - 0.7).abs() < 1e-9);
        assert!((edge_strength(2, 2, Some(2025), 2025) - 1.0).abs() < 1e-9);
        assert!((edge_strength(1, 1, Some(i32::MIN), 2025) - 0.7).abs() < 1e-9);
        assert!((edge_strength(1, 1, Some(i32::MAX), i32::MIN) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_centrality_from_str() {
        assert_eq!("Eigenvector".parse::<CentralityMeasure>().ok(), Some(CentralityMeasure::Eigenvector));
        assert!("pagerank".parse::<CentralityMeasure>().is_err());
    }
}
