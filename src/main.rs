//! pubdash - Research Publication Dashboard
//!
//! Loads a publication CSV and prints the derived dashboard views.
//!
//! ## Usage
//!
//! ```bash
//! pubdash --source data/publications.csv stats
//! pubdash network --centrality betweenness --top 15
//! pubdash search "merger" --year 2024
//! pubdash export --usage-type PRIMARY_ANALYSIS -o primary.csv
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pubdash::chat::{ActiveView, DashboardContext};
use pubdash::filter::FilterChange;
use pubdash::model::{DataSource, GeographicReach, UsageType};
use pubdash::network::CentralityMeasure;
use pubdash::pipeline::{current_year, ExportRow, PipelineConfig};
use pubdash::session::{DashboardSession, Snapshot};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Research Publication Dashboard - statistics, collaboration network and flows
#[derive(Parser)]
#[command(name = "pubdash")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Publication CSV (file path or http(s) URL)
    #[arg(long, env = "PUBDASH_SOURCE", default_value = "data/publications.csv", global = true)]
    source: String,

    /// Year recency is measured against (default: current year)
    #[arg(long, global = true)]
    reference_year: Option<i32>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distributions, insights and data quality
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Co-authorship network
    Network {
        #[command(flatten)]
        filters: FilterArgs,

        /// Minimum shared publications per edge
        #[arg(long, default_value = "1")]
        min_collaborations: usize,

        /// Centrality measure: degree, betweenness or eigenvector
        #[arg(long, default_value = "degree")]
        centrality: CentralityMeasure,

        /// Number of top authors to print
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Publication type -> usage -> domain -> geography flow
    Flow {
        #[command(flatten)]
        filters: FilterArgs,

        /// Add the policy-impact category as a final stage
        #[arg(long)]
        policy_stage: bool,
    },

    /// Search and list publications
    Search {
        /// Free-text query over title, authors, domain, findings and policy text
        query: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: usize,

        /// Publications per page
        #[arg(long, default_value = "20")]
        page_size: usize,
    },

    /// Write the filtered publications to CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output file
        #[arg(short, long, default_value = "./publications_export.csv")]
        output: PathBuf,
    },

    /// Print the context object sent to the chat service
    Context {
        #[command(flatten)]
        filters: FilterArgs,

        /// Active dashboard view
        #[arg(long, default_value = "overview", ignore_case = true)]
        view: ActiveView,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Research domain (case-insensitive)
    #[arg(long)]
    domain: Option<String>,

    /// Exact publication year
    #[arg(long)]
    year: Option<i32>,

    /// First year of an inclusive range
    #[arg(long)]
    from_year: Option<i32>,

    /// Last year of an inclusive range
    #[arg(long)]
    to_year: Option<i32>,

    /// PRIMARY_ANALYSIS, RESEARCH_ENABLER or CONTEXTUAL_REFERENCE
    #[arg(long, value_parser = parse_usage_type)]
    usage_type: Option<UsageType>,

    /// Publication type (e.g. JOURNAL_ARTICLE)
    #[arg(long)]
    publication_type: Option<String>,

    /// local, state, regional, national, international or unspecified
    #[arg(long, value_parser = parse_reach)]
    reach: Option<GeographicReach>,

    /// Minimum quality score (missing scores count as 50)
    #[arg(long)]
    min_quality: Option<f64>,
}

impl FilterArgs {
    fn changes(&self) -> Vec<FilterChange> {
        let mut changes = Vec::new();
        if let Some(domain) = &self.domain {
            changes.push(FilterChange::Domain(Some(domain.clone())));
        }
        if let Some(year) = self.year {
            changes.push(FilterChange::Year(Some(year)));
        }
        if self.from_year.is_some() || self.to_year.is_some() {
            changes.push(FilterChange::YearRange(Some((
                self.from_year.unwrap_or(i32::MIN),
                self.to_year.unwrap_or(i32::MAX),
            ))));
        }
        if let Some(usage) = self.usage_type {
            changes.push(FilterChange::UsageType(Some(usage)));
        }
        if let Some(kind) = &self.publication_type {
            changes.push(FilterChange::PublicationType(Some(kind.clone())));
        }
        if let Some(reach) = self.reach {
            changes.push(FilterChange::GeographicReach(Some(reach)));
        }
        if let Some(min) = self.min_quality {
            changes.push(FilterChange::MinQuality(Some(min)));
        }
        changes
    }
}

fn parse_usage_type(s: &str) -> std::result::Result<UsageType, String> {
    UsageType::parse(s).ok_or_else(|| format!("unknown usage type '{}'", s))
}

fn parse_reach(s: &str) -> std::result::Result<GeographicReach, String> {
    GeographicReach::parse(s).ok_or_else(|| format!("unknown geographic reach '{}'", s))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    let reference_year = cli.reference_year.unwrap_or_else(current_year);
    let mut config = PipelineConfig::default().with_reference_year(reference_year);

    match &cli.command {
        Commands::Network {
            min_collaborations,
            centrality,
            ..
        } => {
            config.network.min_collaborations = *min_collaborations;
            config.network.centrality = *centrality;
        }
        Commands::Flow { policy_stage, .. } => config.flow.include_policy_stage = *policy_stage,
        _ => {}
    }

    let session = DashboardSession::open(cli.source.clone(), config).await;
    report_source(&session.snapshot());

    match &cli.command {
        Commands::Stats { filters } => {
            let snapshot = apply_filters(&session, filters.changes());
            run_stats(&snapshot, cli.json)
        }
        Commands::Network { filters, top, .. } => {
            let snapshot = apply_filters(&session, filters.changes());
            run_network(&snapshot, *top, cli.json)
        }
        Commands::Flow { filters, .. } => {
            let snapshot = apply_filters(&session, filters.changes());
            run_flow(&snapshot, cli.json)
        }
        Commands::Search {
            query,
            filters,
            page,
            page_size,
        } => {
            let mut changes = filters.changes();
            changes.push(FilterChange::Search(query.clone()));
            changes.push(FilterChange::PageSize(*page_size));
            // page last: every other change resets it
            changes.push(FilterChange::Page(*page));
            let snapshot = apply_filters(&session, changes);
            run_search(&snapshot, cli.json)
        }
        Commands::Export { filters, output } => {
            let snapshot = apply_filters(&session, filters.changes());
            let rows: Vec<ExportRow> = snapshot.views.view.items.iter().map(ExportRow::from).collect();
            save_csv(output, &rows)
        }
        Commands::Context { filters, view } => {
            let snapshot = apply_filters(&session, filters.changes());
            let context = DashboardContext::from_snapshot(&snapshot, *view);
            print_json(&context)
        }
    }
}

fn apply_filters(session: &DashboardSession, changes: Vec<FilterChange>) -> Arc<Snapshot> {
    let mut snapshot = session.snapshot();
    for change in changes {
        snapshot = session.apply_filter(change);
    }
    snapshot
}

fn report_source(snapshot: &Snapshot) {
    let report = &snapshot.dataset.report;
    match &snapshot.dataset.source {
        DataSource::Live { location } => info!(
            location = %location,
            valid = report.valid_rows,
            rejected = report.rejected.len(),
            "Using live data"
        ),
        DataSource::Fallback { reason } => {
            warn!(reason = %reason, "Using embedded sample data")
        }
    }
    for rejected in &report.rejected {
        warn!(row = rejected.row, title = %rejected.title, reason = %rejected.reason, "Excluded row");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn run_stats(snapshot: &Snapshot, json: bool) -> Result<()> {
    let stats = &snapshot.views.stats;
    if json {
        return print_json(stats);
    }

    let insights = &stats.insights;
    println!("Publications: {} ({} data)", stats.total, snapshot.dataset.source.label());

    println!("\n--- By Year ---");
    for year in &stats.by_year {
        println!("{:>6}  {:>4}  {:+.1}%", year.year, year.count, year.growth_percent);
    }

    for (title, counts) in [
        ("By Domain", &stats.by_domain),
        ("By Usage Type", &stats.by_usage_type),
        ("By Publication Type", &stats.by_publication_type),
        ("By Geographic Reach", &stats.by_geographic_reach),
    ] {
        println!("\n--- {} ---", title);
        for c in counts {
            println!("{:<40} {:>4}  {:>5.1}%", c.label, c.count, c.percentage);
        }
    }

    println!("\n--- Insights ---");
    println!("Growth: {:.1}% ({:?})", insights.growth.percent, insights.growth.method);
    println!("Primary analysis share: {:.1}%", insights.primary_analysis_share);
    println!("Domain diversity: {}", insights.domain_diversity);
    println!("Collaborative share: {:.1}%", insights.collaborative_share);
    println!("Leading domain: {}", insights.leading_domain.as_deref().unwrap_or("-"));
    println!("Emerging domain: {}", insights.emerging_domain.as_deref().unwrap_or("-"));
    println!("High-impact studies: {}", insights.high_impact_count);
    println!("Recent publications: {}", insights.recent_count);
    match insights.average_quality {
        Some(q) => println!("Average quality: {:.1}", q),
        None => println!("Average quality: -"),
    }

    let quality = &stats.quality;
    println!("\n--- Data Quality ---");
    println!("Missing year: {}", quality.missing_year);
    println!("Missing domain: {}", quality.missing_domain);
    println!("Missing usage description: {}", quality.missing_usage_description);
    println!("Missing policy implications: {}", quality.missing_policy_implications);
    println!("Dropped author fragments: {}", quality.dropped_author_fragments);
    for (format, count) in &quality.author_formats {
        println!("Author list {:?}: {}", format, count);
    }
    Ok(())
}

fn run_network(snapshot: &Snapshot, top: usize, json: bool) -> Result<()> {
    let network = &snapshot.views.network;
    if json {
        return print_json(network);
    }

    let m = &network.metrics;
    println!(
        "Nodes: {} ({} individuals, {} institutions)",
        m.node_count, m.individual_count, m.institution_count
    );
    println!("Edges: {}  Density: {:.3}  Avg degree: {:.2}", m.edge_count, m.density, m.average_degree);
    println!(
        "Components: {}  Isolated: {}  Max degree: {}",
        m.connected_components, m.isolated_nodes, m.max_degree
    );

    println!("\n--- Top {} by {} centrality ---", top, network.centrality);
    for node in network.top_nodes(top) {
        println!(
            "{:<40} {:.3}  degree {}  pubs {}",
            node.name, node.centrality, node.degree, node.publication_count
        );
    }

    let mut strongest: Vec<_> = network.edges.iter().collect();
    strongest.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    println!("\n--- Strongest collaborations ---");
    for edge in strongest.into_iter().take(top) {
        println!(
            "{} <-> {}  x{}  strength {:.2}",
            edge.source, edge.target, edge.collaboration_count, edge.strength
        );
    }
    Ok(())
}

fn run_flow(snapshot: &Snapshot, json: bool) -> Result<()> {
    let flow = &snapshot.views.flow;
    if json {
        return print_json(flow);
    }

    println!("Total weight: {:.2}", flow.total_weight);
    for link in &flow.links {
        println!("{} -> {}  {:.2} ({})", link.source, link.target, link.value, link.count);
    }
    for gap in flow.gaps.iter().filter(|g| g.missing_count > 0) {
        println!(
            "Missing {}: {} publications ({:.2} weight)",
            gap.stage, gap.missing_count, gap.missing_weight
        );
    }
    Ok(())
}

fn run_search(snapshot: &Snapshot, json: bool) -> Result<()> {
    let view = &snapshot.views.view;
    if json {
        return print_json(view);
    }

    println!("Found {} publications (page {}/{})", view.total, view.page, view.total_pages);
    for p in &view.page_items {
        let year = p.year.map(|y| y.to_string()).unwrap_or_else(|| "n.d.".to_string());
        println!("\n[{}] {}", year, p.title);
        if !p.authors.trim().is_empty() {
            println!("    {}", p.authors.trim());
        }
        println!(
            "    {} | {} | {}",
            p.usage_type,
            p.research_domain.trim(),
            p.doi.as_deref().unwrap_or(p.doi_url.trim())
        );
    }
    Ok(())
}

fn save_csv<T: Serialize>(path: &std::path::Path, data: &[T]) -> Result<()> {
    if data.is_empty() {
        println!("No data to save to {:?}", path);
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to create CSV writer")?;

    for item in data {
        wtr.serialize(item).context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    println!("Saved: {:?}", path);
    Ok(())
}
