//! Loading cases, schemas and reference data from files.

use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DashError, Result};
use crate::schema::{Case, CompleteCaseType, ReferenceData};
use super::source::{InputFormat, RawInput, SourceMetadata};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Header of the case id column in delimited case files.
pub const ID_HEADER: &str = "id";

/// Header of the optional aggregated-count column in delimited case files.
pub const COUNT_HEADER: &str = "count";

/// Parser configuration for delimited case files.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Delimiter to use (None = from the extension, else auto-detect).
    pub delimiter: Option<u8>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: b'"',
        }
    }
}

/// Loads case files.
#[derive(Debug, Clone, Default)]
pub struct CaseLoader {
    config: ParserConfig,
}

impl CaseLoader {
    /// Create a loader with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Load cases from a JSON array or a delimited text file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(Vec<Case>, SourceMetadata)> {
        let raw = RawInput::read(path)?;

        if self.config.delimiter.is_none() && raw.looks_like_json() {
            let cases: Vec<Case> = serde_json::from_slice(&raw.contents)?;
            warn_duplicates(&cases);
            let metadata = SourceMetadata::new(&raw, InputFormat::Json, cases.len());
            tracing::debug!(path = %raw.path.display(), cases = cases.len(), "loaded JSON cases");
            return Ok((cases, metadata));
        }

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => match raw.extension().as_deref() {
                Some("tsv") | Some("tab") => b'\t',
                Some("csv") => b',',
                _ => detect_delimiter(&raw.contents)?,
            },
        };
        let cases = self.parse_bytes(&raw.contents, delimiter)?;
        let metadata = SourceMetadata::new(&raw, InputFormat::from_delimiter(delimiter), cases.len());
        tracing::debug!(
            path = %raw.path.display(),
            delimiter = %(delimiter as char).escape_default(),
            cases = cases.len(),
            "loaded delimited cases"
        );
        Ok((cases, metadata))
    }

    /// Parse delimited bytes; the header holds case type column ids.
    fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<Vec<Case>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.trim().to_string()).collect();
        let id_index = headers
            .iter()
            .position(|h| h == ID_HEADER)
            .ok_or_else(|| DashError::Parse {
                row: 0,
                column: 0,
                message: format!("missing '{ID_HEADER}' column"),
            })?;
        let count_index = headers.iter().position(|h| h == COUNT_HEADER);

        let mut cases = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            // Header is row 1.
            let row = row_idx + 2;

            let id = record.get(id_index).map(str::trim).unwrap_or_default();
            if id.is_empty() {
                return Err(DashError::Parse {
                    row,
                    column: id_index + 1,
                    message: "empty case id".to_string(),
                });
            }
            let mut case = Case::new(id);

            for (index, value) in record.iter().enumerate() {
                if index == id_index || value.trim().is_empty() {
                    continue;
                }
                if Some(index) == count_index {
                    let count = value.trim().parse::<u64>().map_err(|e| DashError::Parse {
                        row,
                        column: index + 1,
                        message: format!("invalid count '{value}': {e}"),
                    })?;
                    case.count = Some(count);
                    continue;
                }
                if let Some(header) = headers.get(index) {
                    case.content.insert(header.clone(), value.to_string());
                }
            }
            cases.push(case);
        }

        if cases.is_empty() {
            return Err(DashError::EmptyData("No case rows found".to_string()));
        }
        warn_duplicates(&cases);
        Ok(cases)
    }
}

/// Load a case type schema from JSON.
pub fn load_case_type(path: impl AsRef<Path>) -> Result<(CompleteCaseType, SourceMetadata)> {
    let raw = RawInput::read(path)?;
    let case_type: CompleteCaseType = serde_json::from_slice(&raw.contents)?;
    if case_type.case_type_dims.is_empty() {
        return Err(DashError::Schema(format!(
            "case type '{}' has no dimensions",
            case_type.id
        )));
    }
    let metadata = SourceMetadata::new(&raw, InputFormat::Json, case_type.case_type_cols.len());
    tracing::debug!(
        case_type = %case_type.id,
        dims = case_type.case_type_dims.len(),
        cols = case_type.case_type_cols.len(),
        "loaded case type"
    );
    Ok((case_type, metadata))
}

/// Load reference data (concept sets, region sets, organizations) from JSON.
pub fn load_reference_data(path: impl AsRef<Path>) -> Result<(ReferenceData, SourceMetadata)> {
    let raw = RawInput::read(path)?;
    let parsed: ReferenceData = serde_json::from_slice(&raw.contents)?;
    let mut reference = ReferenceData::new();
    reference.merge(parsed);
    let metadata = SourceMetadata::new(&raw, InputFormat::Json, reference.entry_count());
    Ok((reference, metadata))
}

fn warn_duplicates(cases: &[Case]) {
    let mut seen = HashSet::new();
    for case in cases {
        if !seen.insert(case.id.as_str()) {
            tracing::warn!(case_id = %case.id, "duplicate case id");
        }
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(DashError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        // Consistent counts across lines win; tab breaks ties.
        let consistent = counts.iter().all(|&c| c == first_count);
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
