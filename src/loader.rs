//! Publication CSV loader.
//!
//! Reads the publication CSV from a local path or an http(s) URL, validates
//! every row into a [`Publication`], and attaches the derived fields. Rows that
//! fail validation are kept in the [`LoadReport`] for diagnostics instead of
//! being silently dropped.
//!
//! [`load_or_fallback`] is the entry point hosts should use: it never fails and
//! substitutes the embedded sample dataset when the source is unusable.

use crate::enhance::enhance;
use crate::error::{DashboardError, OptionExt, Result};
use crate::fallback;
use crate::model::{DataSource, GeographicReach, PolicyCategory, Publication, UsageType};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for remote CSV fetches
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Known columns and the header spellings accepted for each
const HEADER_ALIASES: &[(Column, &[&str])] = &[
    (Column::Id, &["id", "publication_id", "record_id"]),
    (Column::PublicationType, &["publication_type", "pub_type", "type"]),
    (Column::Title, &["title", "publication_title"]),
    (
        Column::Authors,
        &["authors", "authors_standardized", "author", "author_list"],
    ),
    (Column::Year, &["year", "publication_year", "pub_year"]),
    (Column::Journal, &["journal", "journal_name", "source_title"]),
    (Column::Publisher, &["publisher"]),
    (Column::UsageType, &["usage_type"]),
    (Column::UsageJustification, &["usage_justification"]),
    (Column::UsageDescription, &["usage_description"]),
    (Column::ResearchDomain, &["research_domain", "domain"]),
    (Column::GeographicFocus, &["geographic_focus", "geography"]),
    (Column::DataYearsUsed, &["data_years_used", "data_years"]),
    (Column::KeyFindings, &["key_findings", "findings"]),
    (Column::PolicyImplications, &["policy_implications"]),
    (Column::DoiUrl, &["doi_url", "doi", "url", "link"]),
    (Column::Notes, &["notes"]),
    (Column::QualityScore, &["quality_score"]),
    (
        Column::PolicyImpactScore,
        &["policy_impact_score", "impact_score"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Id,
    PublicationType,
    Title,
    Authors,
    Year,
    Journal,
    Publisher,
    UsageType,
    UsageJustification,
    UsageDescription,
    ResearchDomain,
    GeographicFocus,
    DataYearsUsed,
    KeyFindings,
    PolicyImplications,
    DoiUrl,
    Notes,
    QualityScore,
    PolicyImpactScore,
}

/// A CSV row excluded from the valid publication set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub title: String,
    pub reason: String,
}

/// Diagnostics collected while parsing a CSV
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Data rows read, valid or not
    pub total_rows: usize,
    pub valid_rows: usize,
    pub rejected: Vec<RejectedRow>,
    /// Year/score cells that were present but not numeric
    pub malformed_numbers: usize,
    /// Header columns the loader does not know about
    pub ignored_columns: Vec<String>,
}

/// Output of [`parse_csv`]
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub publications: Vec<Publication>,
    pub report: LoadReport,
}

/// Publications plus where they came from
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub publications: Arc<[Publication]>,
    pub report: LoadReport,
    pub source: DataSource,
}

impl LoadedDataset {
    pub fn new(parsed: ParsedCsv, source: DataSource) -> Self {
        Self {
            publications: parsed.publications.into(),
            report: parsed.report,
            source,
        }
    }

    /// An empty dataset for the state before any load completes
    pub fn empty(source: DataSource) -> Self {
        Self::new(ParsedCsv::default(), source)
    }
}

/// Load a CSV, substituting the embedded sample dataset on any failure.
///
/// The returned dataset's `source` reports `fallback` whenever the substitute
/// was used, including when the CSV parsed but held no valid rows.
pub async fn load_or_fallback(location: &str) -> LoadedDataset {
    match load(location).await {
        Ok(dataset) => dataset,
        Err(e) => {
            warn!(location = location, error = %e, "Using fallback dataset");
            fallback::fallback_dataset(e.to_string())
        }
    }
}

/// Load and validate a CSV from a path or URL.
///
/// Fails with [`DashboardError::Load`] when the source parses but yields no valid rows.
pub async fn load(location: &str) -> Result<LoadedDataset> {
    let content = fetch_source(location).await?;
    let parsed = parse_csv(content.as_bytes())?;

    if parsed.publications.is_empty() {
        return Err(DashboardError::Load(format!(
            "{} contained no valid publications ({} rows read)",
            location, parsed.report.total_rows
        )));
    }

    info!(
        location = location,
        valid = parsed.report.valid_rows,
        rejected = parsed.report.rejected.len(),
        "Loaded publication CSV"
    );

    Ok(LoadedDataset::new(
        parsed,
        DataSource::Live {
            location: location.to_string(),
        },
    ))
}

/// Read the raw CSV text from a local file or an http(s) URL.
pub async fn fetch_source(location: &str) -> Result<String> {
    let location = location.trim();
    if location.is_empty() {
        return Err(DashboardError::Config("no CSV source configured".to_string()));
    }

    if location.starts_with("http://") || location.starts_with("https://") {
        debug!(url = location, "Fetching remote CSV");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        let response = client.get(location).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Http {
                code: status.as_u16(),
                location: location.to_string(),
            });
        }
        Ok(response.text().await?)
    } else {
        debug!(path = location, "Reading local CSV");
        Ok(tokio::fs::read_to_string(location).await?)
    }
}

/// Parse CSV text into validated, enhanced publications.
///
/// A header-only input yields an empty, error-free result. Missing optional
/// columns default to empty strings or `None`; the `title` and `usage_type`
/// columns are required.
pub fn parse_csv<R: Read>(reader: R) -> Result<ParsedCsv> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let (columns, ignored_columns) = map_headers(&headers);

    for required in [Column::Title, Column::UsageType] {
        if !columns.contains_key(&required) {
            return Err(DashboardError::Load(format!(
                "CSV header is missing the {:?} column",
                required
            )));
        }
    }

    let mut parsed = ParsedCsv::default();
    parsed.report.ignored_columns = ignored_columns;
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (idx, record) in rdr.records().enumerate() {
        let row = idx + 1;
        parsed.report.total_rows += 1;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                debug!(row = row, error = %e, "Unreadable CSV row");
                parsed.report.rejected.push(RejectedRow {
                    row,
                    title: String::new(),
                    reason: format!("unreadable row: {}", e),
                });
                continue;
            }
        };

        let fields = RowFields {
            record: &record,
            columns: &columns,
        };

        match parse_row(&fields, row, &mut parsed.report.malformed_numbers) {
            Ok(mut publication) => {
                if !seen_ids.insert(publication.id.clone()) {
                    publication.id = format!("pub-{}", row);
                    seen_ids.insert(publication.id.clone());
                }
                parsed.publications.push(enhance(publication));
            }
            Err(e) => {
                parsed.report.rejected.push(RejectedRow {
                    row,
                    title: fields.get(Column::Title).to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    parsed.report.valid_rows = parsed.publications.len();

    info!(
        rows = parsed.report.total_rows,
        valid = parsed.report.valid_rows,
        rejected = parsed.report.rejected.len(),
        malformed_numbers = parsed.report.malformed_numbers,
        "Parsed publication CSV"
    );

    Ok(parsed)
}

/// Parse CSV held in memory
pub fn parse_csv_str(input: &str) -> Result<ParsedCsv> {
    parse_csv(input.as_bytes())
}

struct RowFields<'a> {
    record: &'a StringRecord,
    columns: &'a HashMap<Column, usize>,
}

impl RowFields<'_> {
    fn get(&self, column: Column) -> &str {
        self.columns
            .get(&column)
            .and_then(|idx| self.record.get(*idx))
            .unwrap_or("")
    }
}

fn parse_row(fields: &RowFields<'_>, row: usize, malformed: &mut usize) -> Result<Publication> {
    let raw_usage = fields.get(Column::UsageType);
    let usage_type = UsageType::parse(raw_usage)
        .ok_or_invalid(&format!("row {}: invalid usage_type {:?}", row, raw_usage))?;

    let id = match fields.get(Column::Id).trim() {
        "" => format!("pub-{}", row),
        id => id.to_string(),
    };

    let year = parse_numeric(fields.get(Column::Year), parse_year, malformed);
    let quality_score = parse_numeric(fields.get(Column::QualityScore), parse_score, malformed);
    let policy_impact_score =
        parse_numeric(fields.get(Column::PolicyImpactScore), parse_score, malformed);

    Ok(Publication {
        id,
        publication_type: fields.get(Column::PublicationType).to_string(),
        title: fields.get(Column::Title).to_string(),
        authors: fields.get(Column::Authors).to_string(),
        year,
        journal: fields.get(Column::Journal).to_string(),
        publisher: fields.get(Column::Publisher).to_string(),
        usage_type,
        usage_justification: fields.get(Column::UsageJustification).to_string(),
        usage_description: fields.get(Column::UsageDescription).to_string(),
        research_domain: fields.get(Column::ResearchDomain).to_string(),
        geographic_focus: fields.get(Column::GeographicFocus).to_string(),
        data_years_used: fields.get(Column::DataYearsUsed).to_string(),
        key_findings: fields.get(Column::KeyFindings).to_string(),
        policy_implications: fields.get(Column::PolicyImplications).to_string(),
        doi_url: fields.get(Column::DoiUrl).to_string(),
        notes: fields.get(Column::Notes).to_string(),
        quality_score,
        policy_impact_score,
        geographic_reach: GeographicReach::Unspecified,
        policy_category: PolicyCategory::StrategicPlanning,
        doi: None,
    })
}

/// Blank cells are `None`; non-blank cells that fail to parse are counted.
fn parse_numeric<T>(raw: &str, parse: fn(&str) -> Option<T>, malformed: &mut usize) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = parse(trimmed);
    if value.is_none() {
        *malformed += 1;
    }
    value
}

/// Years outside this range are treated as malformed
const MAX_ABS_YEAR: i32 = 9_999;

/// Accepts "2024" and spreadsheet-style "2024.0"
fn parse_year(raw: &str) -> Option<i32> {
    let year = match raw.parse::<i32>() {
        Ok(year) => Some(year),
        Err(_) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() <= f64::from(MAX_ABS_YEAR))
            .map(|v| v as i32),
    };
    year.filter(|y| (-MAX_ABS_YEAR..=MAX_ABS_YEAR).contains(y))
}

/// Scores live on a 0-100 scale
fn parse_score(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 100.0))
}

fn map_headers(headers: &StringRecord) -> (HashMap<Column, usize>, Vec<String>) {
    let mut columns = HashMap::new();
    let mut ignored = Vec::new();

    for (idx, header) in headers.iter().enumerate() {
        let normalized = normalize_header(header);
        let column = HEADER_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
            .map(|(column, _)| *column);

        match column {
            // first occurrence wins when two headers alias the same column
            Some(column) => {
                columns.entry(column).or_insert(idx);
            }
            None => ignored.push(header.to_string()),
        }
    }

    (columns, ignored)
}

/// "Publication_Year", "publication year" and "\u{feff}Publication-Year" all map to "publication_year"
fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "publication_type,title,authors,year,journal,publisher,usage_type,usage_justification,usage_description,research_domain,geographic_focus,data_years_used,key_findings,policy_implications,doi_url,notes";

    fn sample_csv() -> String {
        format!(
            "{}\n{}\n{}\n{}\n",
            HEADER,
            r#"JOURNAL_ARTICLE,Hospital Mergers and Prices,"Zachary Levinson; Jamie Godwin",2024,Health Affairs,Project HOPE,PRIMARY_ANALYSIS,Uses system linkages,Linked hospitals to systems,Market Consolidation,United States,2016-2020,Prices rose after mergers,Supports merger review,https://doi.org/10.1377/hlthaff.2023.00001,"#,
            r#"REPORT,Vertical Integration Trends,Becker C.; [+ others],2023,,RAND,RESEARCH_ENABLER,Context,Descriptive counts,Vertical Integration,California,2018,Integration grew,Informed state reporting,,draft"#,
            r#"GOVERNMENT,Compendium Overview,AHRQ,2022.0,,AHRQ,contextual_reference,,,Data Infrastructure,National,2016-2022,,, ,"#,
        )
    }

    #[test]
    fn test_parse_rows_verbatim() {
        let parsed = parse_csv_str(&sample_csv()).unwrap();
        assert_eq!(parsed.publications.len(), 3);
        assert_eq!(parsed.report.total_rows, 3);
        assert!(parsed.report.rejected.is_empty());

        let first = &parsed.publications[0];
        assert_eq!(first.id, "pub-1");
        assert_eq!(first.publication_type, "JOURNAL_ARTICLE");
        assert_eq!(first.title, "Hospital Mergers and Prices");
        assert_eq!(first.authors, "Zachary Levinson; Jamie Godwin");
        assert_eq!(first.year, Some(2024));
        assert_eq!(first.journal, "Health Affairs");
        assert_eq!(first.publisher, "Project HOPE");
        assert_eq!(first.usage_type, UsageType::PrimaryAnalysis);
        assert_eq!(first.research_domain, "Market Consolidation");
        assert_eq!(first.doi_url, "https://doi.org/10.1377/hlthaff.2023.00001");
        assert_eq!(first.doi.as_deref(), Some("10.1377/hlthaff.2023.00001"));
        assert_eq!(first.quality_score, None);

        let third = &parsed.publications[2];
        assert_eq!(third.year, Some(2022));
        assert_eq!(third.usage_type, UsageType::ContextualReference);
        assert_eq!(third.policy_implications, "");
        assert_eq!(third.doi_url, " ");
    }

    #[test]
    fn test_header_only_is_empty() {
        let parsed = parse_csv_str(&format!("{}\n", HEADER)).unwrap();
        assert!(parsed.publications.is_empty());
        assert_eq!(parsed.report.total_rows, 0);
    }

    #[test]
    fn test_invalid_usage_type_rejected() {
        let csv = format!(
            "{}\n{}\n{}\n",
            HEADER,
            "REPORT,Good Row,A. Author,2021,,,PRIMARY_ANALYSIS,,,Cost,National,,,,,",
            "REPORT,Bad Row,A. Author,2021,,,INCIDENTAL_MENTION,,,Cost,National,,,,,",
        );
        let parsed = parse_csv_str(&csv).unwrap();
        assert_eq!(parsed.publications.len(), 1);
        assert_eq!(parsed.report.total_rows, 2);
        assert_eq!(parsed.report.rejected.len(), 1);
        assert_eq!(parsed.report.rejected[0].row, 2);
        assert_eq!(parsed.report.rejected[0].title, "Bad Row");
        assert!(parsed.report.rejected[0].reason.contains("usage_type"));
    }

    #[test]
    fn test_header_aliases_and_extra_columns() {
        let csv = "Publication_Type,Title,Authors_Standardized,Publication_Year,Usage_Type,Research_Domain,DOI_URL,Quality_Score,Extra_Column\n\
                   JOURNAL_ARTICLE,Alias Row,Jane Doe,2025,RESEARCH_ENABLER,Cost,10.1000/xyz123,87.5,ignored\n";
        let parsed = parse_csv_str(csv).unwrap();
        assert_eq!(parsed.publications.len(), 1);
        let p = &parsed.publications[0];
        assert_eq!(p.authors, "Jane Doe");
        assert_eq!(p.year, Some(2025));
        assert_eq!(p.quality_score, Some(87.5));
        assert_eq!(p.geographic_focus, "");
        assert_eq!(parsed.report.ignored_columns, vec!["Extra_Column".to_string()]);
    }

    #[test]
    fn test_malformed_numbers_counted() {
        let csv = "title,usage_type,year,quality_score,policy_impact_score\n\
                   A,PRIMARY_ANALYSIS,n/a,high,\n\
                   B,PRIMARY_ANALYSIS,2020,150,40\n";
        let parsed = parse_csv_str(csv).unwrap();
        assert_eq!(parsed.report.malformed_numbers, 2);
        assert_eq!(parsed.publications[0].year, None);
        assert_eq!(parsed.publications[1].quality_score, Some(100.0));
        assert_eq!(parsed.publications[1].policy_impact_score, Some(40.0));
    }

    #[test]
    fn test_out_of_range_years_rejected() {
        let csv = "title,usage_type,year\n\
                   A,PRIMARY_ANALYSIS,-2147483648\n\
                   B,PRIMARY_ANALYSIS,99999999\n\
                   C,PRIMARY_ANALYSIS,1e9\n\
                   D,PRIMARY_ANALYSIS,2023.0\n";
        let parsed = parse_csv_str(csv).unwrap();
        let years: Vec<_> = parsed.publications.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![None, None, None, Some(2023)]);
        assert_eq!(parsed.report.malformed_numbers, 3);

        let stats = crate::stats::compute_stats(&parsed.publications);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_year.len(), 1);
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse_csv_str("title,year\nA,2020\n").unwrap_err();
        assert!(matches!(err, DashboardError::Load(_)));
    }

    #[test]
    fn test_duplicate_ids_made_unique() {
        let csv = "id,title,usage_type\nX1,A,PRIMARY_ANALYSIS\nX1,B,PRIMARY_ANALYSIS\n";
        let parsed = parse_csv_str(csv).unwrap();
        assert_eq!(parsed.publications[0].id, "X1");
        assert_eq!(parsed.publications[1].id, "pub-2");
    }

    #[tokio::test]
    async fn test_load_from_file() -> Result<()> {
        let mut temp = NamedTempFile::new()?;
        temp.write_all(sample_csv().as_bytes())?;

        let dataset = load(&temp.path().to_string_lossy()).await?;
        assert_eq!(dataset.publications.len(), 3);
        assert!(!dataset.source.is_fallback());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let dataset = load_or_fallback("/nonexistent/publications.csv").await;
        assert!(dataset.source.is_fallback());
        assert!(!dataset.publications.is_empty());
    }

    #[tokio::test]
    async fn test_header_only_file_falls_back() -> Result<()> {
        let mut temp = NamedTempFile::new()?;
        writeln!(temp, "{}", HEADER)?;

        let dataset = load_or_fallback(&temp.path().to_string_lossy()).await;
        assert!(dataset.source.is_fallback());
        Ok(())
    }
}
