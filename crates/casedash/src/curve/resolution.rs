//! Choosing the time resolution of an epi curve.

use chrono::NaiveDate;

use crate::schema::{
    parse_date, whole_months_between, Case, CaseTypeCol, ColType, CompleteCaseType, TimeResolution,
};

/// Largest span, in whole months, for which a resolution is still chosen.
fn max_span_months(resolution: TimeResolution) -> Option<u32> {
    match resolution {
        TimeResolution::Day => Some(3),
        TimeResolution::Week => Some(12 + 11),
        TimeResolution::Month => Some(2 * 12 + 11),
        TimeResolution::Quarter => Some(5 * 12 + 11),
        TimeResolution::Year => None,
    }
}

/// Candidate time columns with their column types, in the given order.
pub(crate) fn time_candidates<'a>(
    case_type: &CompleteCaseType,
    candidates: &[&'a CaseTypeCol],
) -> Vec<(&'a CaseTypeCol, ColType, TimeResolution)> {
    candidates
        .iter()
        .filter_map(|&case_type_col| {
            let col = case_type.col_of(case_type_col)?;
            let resolution = col.col_type.time_resolution()?;
            Some((case_type_col, col.col_type, resolution))
        })
        .collect()
}

/// First date of a case that parses at any of the candidates.
pub(crate) fn first_valid_date(
    case: &Case,
    candidates: &[(&CaseTypeCol, ColType, TimeResolution)],
) -> Option<NaiveDate> {
    candidates.iter().find_map(|(case_type_col, col_type, _)| {
        case.raw(&case_type_col.id)
            .and_then(|raw| parse_date(*col_type, raw))
    })
}

/// Pick the finest resolution whose span ceiling fits the dated cases.
///
/// Returns `None` when no candidate is a time column, meaning no curve can be
/// rendered. When nothing fits, or no case has a date, the preferred candidate
/// (rank 1, else the first) is returned.
pub fn pick_resolution<'a, 'c>(
    case_type: &CompleteCaseType,
    cases: impl IntoIterator<Item = &'c Case>,
    candidates: &[&'a CaseTypeCol],
) -> Option<&'a CaseTypeCol> {
    let time_cols = time_candidates(case_type, candidates);
    if time_cols.is_empty() {
        tracing::debug!(case_type = %case_type.id, "no time column among candidates");
        return None;
    }

    let preferred = time_cols
        .iter()
        .find(|(case_type_col, _, _)| {
            case_type
                .col_of(case_type_col)
                .is_some_and(|col| col.rank_in_dim == 1)
        })
        .unwrap_or(&time_cols[0])
        .0;

    let mut dates: Vec<NaiveDate> = cases
        .into_iter()
        .filter_map(|case| first_valid_date(case, &time_cols))
        .collect();
    if dates.is_empty() {
        return Some(preferred);
    }
    dates.sort_unstable();
    let span_months = whole_months_between(dates[0], dates[dates.len() - 1]);

    let chosen = TimeResolution::ALL.iter().find_map(|&resolution| {
        let fits = max_span_months(resolution).is_none_or(|max| span_months <= max);
        if !fits {
            return None;
        }
        time_cols
            .iter()
            .find(|(_, _, r)| *r == resolution)
            .map(|(case_type_col, _, _)| *case_type_col)
    });

    tracing::debug!(
        span_months,
        chosen = chosen.map(|c| c.id.as_str()).unwrap_or(preferred.id.as_str()),
        "picked epi curve resolution"
    );
    Some(chosen.unwrap_or(preferred))
}
