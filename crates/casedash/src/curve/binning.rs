//! Bucketing cases into calendar intervals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CurveUnavailable;
use crate::schema::{parse_date, Case, CaseTypeCol, CaseTypeDim, CompleteCaseType, TimeResolution};
use crate::stratify::Stratification;

use super::resolution::pick_resolution;

/// Cases falling in one interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Sum of the cases' counts.
    pub count: u64,
    pub case_ids: Vec<String>,
}

/// One bar series of an epi curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Legend colour when stratified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Legend label when stratified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// One bucket per interval.
    pub buckets: Vec<Bucket>,
}

impl Series {
    /// Total count over all buckets.
    pub fn total(&self) -> u64 {
        self.buckets.iter().fold(0, |sum, b| sum.saturating_add(b.count))
    }
}

/// Binned case counts ready for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpiCurve {
    pub case_type_col_id: String,
    pub resolution: TimeResolution,
    /// Interval start boundaries, ascending.
    pub intervals: Vec<NaiveDate>,
    pub series: Vec<Series>,
    /// Cases left out because they had no valid date.
    pub undated_cases: usize,
}

impl EpiCurve {
    /// Total count across all series.
    pub fn total(&self) -> u64 {
        self.series
            .iter()
            .fold(0, |sum, series| sum.saturating_add(series.total()))
    }

    /// Per-interval totals across all series.
    pub fn interval_totals(&self) -> Vec<u64> {
        (0..self.intervals.len())
            .map(|i| {
                self.series
                    .iter()
                    .filter_map(|s| s.buckets.get(i))
                    .fold(0, |sum: u64, b| sum.saturating_add(b.count))
            })
            .collect()
    }

    /// Canonical labels of the intervals.
    pub fn labels(&self) -> Vec<String> {
        self.intervals
            .iter()
            .map(|&start| self.resolution.label(start))
            .collect()
    }
}

/// Calendar interval starts covering `first..=last`.
pub fn interval_starts(resolution: TimeResolution, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut intervals = Vec::new();
    let mut start = resolution.start_of(first);
    while start <= last {
        intervals.push(start);
        match resolution.next(start) {
            Some(next) => start = next,
            None => break,
        }
    }
    intervals
}

/// Bin cases at a time column.
///
/// A case contributes its `count` (default 1) to the interval whose start is
/// the last one at or before its date. With a stratification, one series is
/// produced per legend item; cases outside the stratification are left out of
/// the stratified series.
pub fn bin<'c>(
    case_type: &CompleteCaseType,
    cases: impl IntoIterator<Item = &'c Case>,
    column: &CaseTypeCol,
    stratification: Option<&Stratification>,
) -> Result<EpiCurve, CurveUnavailable> {
    let col = case_type
        .col_of(column)
        .ok_or_else(|| CurveUnavailable::NotATimeColumn(column.id.clone()))?;
    let resolution = col
        .col_type
        .time_resolution()
        .ok_or_else(|| CurveUnavailable::NotATimeColumn(column.id.clone()))?;

    let mut undated_cases = 0;
    let mut dated: Vec<(NaiveDate, &Case)> = Vec::new();
    for case in cases {
        match case.raw(&column.id).and_then(|raw| parse_date(col.col_type, raw)) {
            Some(date) => dated.push((date, case)),
            None => undated_cases += 1,
        }
    }
    dated.sort_by_key(|(date, _)| *date);

    let intervals = match (dated.first(), dated.last()) {
        (Some((first, _)), Some((last, _))) => interval_starts(resolution, *first, *last),
        _ => Vec::new(),
    };

    let mut series: Vec<Series> = match stratification {
        Some(strat) => strat
            .legend_items
            .iter()
            .map(|item| Series {
                color: Some(item.color.clone()),
                label: Some(item.row_value.long.clone()),
                buckets: vec![Bucket::default(); intervals.len()],
            })
            .collect(),
        None => vec![Series {
            color: None,
            label: None,
            buckets: vec![Bucket::default(); intervals.len()],
        }],
    };

    for (date, case) in &dated {
        let Some(index) = intervals.partition_point(|start| start <= date).checked_sub(1) else {
            continue;
        };
        let series_index = match stratification {
            Some(strat) => match strat.position_of(&case.id) {
                Some(position) => position,
                None => continue,
            },
            None => 0,
        };
        let bucket = &mut series[series_index].buckets[index];
        bucket.count = bucket.count.saturating_add(case.weight());
        bucket.case_ids.push(case.id.clone());
    }

    tracing::debug!(
        case_type_col = %column.id,
        ?resolution,
        intervals = intervals.len(),
        series = series.len(),
        undated_cases,
        "binned epi curve"
    );

    Ok(EpiCurve {
        case_type_col_id: column.id.clone(),
        resolution,
        intervals,
        series,
        undated_cases,
    })
}

/// Pick the resolution among a time dimension's columns and bin in one call.
pub fn curve_for_dimension(
    case_type: &CompleteCaseType,
    case_type_dim: &CaseTypeDim,
    cases: &[&Case],
    stratification: Option<&Stratification>,
) -> Result<EpiCurve, CurveUnavailable> {
    let candidates: Vec<&CaseTypeCol> = case_type
        .columns_of(case_type_dim)
        .map(|(case_type_col, _)| case_type_col)
        .collect();
    let column = pick_resolution(case_type, cases.iter().copied(), &candidates)
        .ok_or(CurveUnavailable::NoTimeColumn)?;
    bin(case_type, cases.iter().copied(), column, stratification)
}
