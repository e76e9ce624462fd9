//! Which columns may be offered in the stratification menu.

use std::collections::HashSet;

use crate::schema::{Case, CaseTypeCol, Col, CompleteCaseType, RowValueResolver};

/// Estimated number of distinct values of a column.
///
/// Concept and region sets give their size; otherwise distinct raw values are
/// counted, stopping once `limit` is exceeded. Missing values are not counted.
pub fn estimated_cardinality<'c>(
    case_type_col: &CaseTypeCol,
    col: &Col,
    cases: impl IntoIterator<Item = &'c Case>,
    resolver: &RowValueResolver<'_>,
    limit: usize,
) -> usize {
    let reference = resolver.reference();
    if let Some(concept_set) = col
        .concept_set_id
        .as_ref()
        .and_then(|id| reference.concept_set(id))
    {
        return concept_set.concepts.len();
    }
    if let Some(region_set) = col
        .region_set_id
        .as_ref()
        .and_then(|id| reference.region_set(id))
    {
        return region_set.regions.len();
    }

    let mut seen = HashSet::new();
    for case in cases {
        if let Some(raw) = case.raw(&case_type_col.id) {
            seen.insert(raw);
            if seen.len() > limit {
                break;
            }
        }
    }
    seen.len()
}

/// Columns eligible for stratification, in dimension order.
///
/// Identifier, genetic and coordinate columns never qualify; other columns
/// qualify when their cardinality is within `max_stratification_values`.
pub fn stratifiable_columns<'a>(
    case_type: &'a CompleteCaseType,
    cases: &[&Case],
    resolver: &RowValueResolver<'_>,
) -> Vec<&'a CaseTypeCol> {
    let limit = resolver.config().max_stratification_values;
    case_type
        .case_type_dims
        .iter()
        .flat_map(|case_type_dim| case_type.columns_of(case_type_dim))
        .filter(|(_, col)| col.col_type.is_stratifiable())
        .filter(|(case_type_col, col)| {
            let cardinality =
                estimated_cardinality(case_type_col, col, cases.iter().copied(), resolver, limit);
            if cardinality > limit {
                tracing::debug!(
                    case_type_col = %case_type_col.id,
                    cardinality,
                    limit,
                    "column exceeds stratification cap"
                );
                false
            } else {
                true
            }
        })
        .map(|(case_type_col, _)| case_type_col)
        .collect()
}
