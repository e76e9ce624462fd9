//! Property-based tests for the casedash engines.
//!
//! # Testing Philosophy
//!
//! Property-based tests verify:
//! 1. **Determinism**: same schema and cases always produce the same output
//! 2. **Completeness**: stratification partitions every case exactly once
//! 3. **Conservation**: binning never gains or loses case counts
//! 4. **Monotonicity**: a wider date span never picks a finer resolution
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p casedash --test property_tests
//!
//! # Run with more cases (slower but more thorough)
//! PROPTEST_CASES=10000 cargo test -p casedash --test property_tests
//! ```

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use casedash::curve::{bin, pick_resolution};
use casedash::filter::{create_filter_dimensions, create_filters};
use casedash::schema::{
    Case, CaseTypeCol, CaseTypeDim, Col, ColType, CompleteCaseType, Dim, DimType, ReferenceData,
    RowValueResolver, TimeResolution,
};
use casedash::stratify::{stratify, StratificationMode};
use casedash::DashboardConfig;

// =============================================================================
// Test Strategies
// =============================================================================

const TIME_TYPES: [(ColType, &str); 5] = [
    (ColType::TimeDay, "ctc_day"),
    (ColType::TimeWeek, "ctc_week"),
    (ColType::TimeMonth, "ctc_month"),
    (ColType::TimeQuarter, "ctc_quarter"),
    (ColType::TimeYear, "ctc_year"),
];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

/// A schema with every time resolution in one dimension plus a text column.
fn schema() -> CompleteCaseType {
    let mut case_type = CompleteCaseType::new("ct", "Property")
        .with_dim(Dim::new("onset", DimType::Time))
        .with_dim(Dim::new("variant", DimType::Text))
        .with_col(Col::new("variant", ColType::Text, "variant", 1))
        .with_case_type_col(CaseTypeCol::new("ctc_variant", "variant", "Variant"))
        .with_case_type_dim(CaseTypeDim::new("ctd_variant", "variant", vec!["ctc_variant".into()]));
    for (rank, (col_type, id)) in TIME_TYPES.iter().enumerate() {
        case_type = case_type
            .with_col(Col::new(*id, *col_type, "onset", rank as u32 + 1))
            .with_case_type_col(CaseTypeCol::new(*id, *id, *id));
    }
    case_type.with_case_type_dim(CaseTypeDim::new(
        "ctd_onset",
        "onset",
        TIME_TYPES.iter().map(|(_, id)| id.to_string()).collect(),
    ))
}

/// (day offset or undated, variant index or missing, count)
fn case_inputs() -> impl Strategy<Value = (Option<u64>, Option<u8>, Option<u64>)> {
    (
        prop::option::weighted(0.9, 0u64..2500),
        prop::option::weighted(0.8, 0u8..6),
        prop::option::weighted(0.2, 1u64..10),
    )
}

fn build_cases(inputs: &[(Option<u64>, Option<u8>, Option<u64>)]) -> Vec<Case> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, (offset, variant, count))| {
            let mut case = Case::new(format!("c{i}"));
            if let Some(offset) = offset {
                case = case.with_value("ctc_day", (start() + Days::new(*offset)).to_string());
            }
            if let Some(variant) = variant {
                case = case.with_value("ctc_variant", format!("V{variant}"));
            }
            case.count = *count;
            case
        })
        .collect()
}

fn resolution_of(case_type: &CompleteCaseType, chosen: &CaseTypeCol) -> TimeResolution {
    case_type
        .col_of(chosen)
        .and_then(|col| col.col_type.time_resolution())
        .unwrap()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn stratification_partitions_every_case(inputs in prop::collection::vec(case_inputs(), 0..200)) {
        let case_type = schema();
        let reference = ReferenceData::new();
        let config = DashboardConfig::default();
        let resolver = RowValueResolver::new(&case_type, &reference, &config);
        let cases = build_cases(&inputs);

        let strat = stratify(
            Some(StratificationMode::Field),
            case_type.case_type_col("ctc_variant"),
            &cases,
            &[],
            &resolver,
        ).unwrap();

        prop_assert_eq!(strat.case_count(), cases.len());
        for case in &cases {
            let containing = strat
                .legend_items
                .iter()
                .filter(|item| item.case_ids.contains(&case.id))
                .count();
            prop_assert_eq!(containing, 1);
        }
        // Only the last legend item may be the missing-value group.
        for item in strat.legend_items.iter().rev().skip(1) {
            prop_assert!(!item.row_value.is_missing);
        }
    }

    #[test]
    fn engines_are_deterministic(inputs in prop::collection::vec(case_inputs(), 0..120)) {
        let case_type = schema();
        let reference = ReferenceData::new();
        let config = DashboardConfig::default();
        let resolver = RowValueResolver::new(&case_type, &reference, &config);
        let cases = build_cases(&inputs);
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        prop_assert_eq!(
            create_filters(&case_type, &reference, &config, today),
            create_filters(&case_type, &reference, &config, today)
        );

        let first = stratify(Some(StratificationMode::Field), case_type.case_type_col("ctc_variant"), &cases, &[], &resolver);
        let second = stratify(Some(StratificationMode::Field), case_type.case_type_col("ctc_variant"), &cases, &[], &resolver);
        prop_assert_eq!(&first, &second);

        let day = case_type.case_type_col("ctc_day").unwrap();
        prop_assert_eq!(
            bin(&case_type, &cases, day, first.as_ref()),
            bin(&case_type, &cases, day, second.as_ref())
        );
    }

    #[test]
    fn binning_conserves_counts(inputs in prop::collection::vec(case_inputs(), 0..200)) {
        let case_type = schema();
        let reference = ReferenceData::new();
        let config = DashboardConfig::default();
        let resolver = RowValueResolver::new(&case_type, &reference, &config);
        let cases = build_cases(&inputs);
        let day = case_type.case_type_col("ctc_day").unwrap();

        let dated_weight: u64 = cases
            .iter()
            .filter(|c| c.raw("ctc_day").is_some())
            .map(Case::weight)
            .sum();
        let undated = cases.iter().filter(|c| c.raw("ctc_day").is_none()).count();

        let curve = bin(&case_type, &cases, day, None).unwrap();
        prop_assert_eq!(curve.total(), dated_weight);
        prop_assert_eq!(curve.undated_cases, undated);

        let strat = stratify(Some(StratificationMode::Field), case_type.case_type_col("ctc_variant"), &cases, &[], &resolver);
        let stratified = bin(&case_type, &cases, day, strat.as_ref()).unwrap();
        prop_assert_eq!(stratified.interval_totals(), curve.interval_totals());
    }

    #[test]
    fn wider_span_never_picks_finer_resolution(narrow in 0u64..3000, extra in 0u64..3000) {
        let case_type = schema();
        let candidates: Vec<&CaseTypeCol> = TIME_TYPES
            .iter()
            .map(|(_, id)| case_type.case_type_col(id).unwrap())
            .collect();
        let span_cases = |span: u64| build_cases(&[(Some(0), None, None), (Some(span), None, None)]);

        let narrow_cases = span_cases(narrow);
        let wide_cases = span_cases(narrow + extra);
        let narrow_pick = pick_resolution(&case_type, &narrow_cases, &candidates).unwrap();
        let wide_pick = pick_resolution(&case_type, &wide_cases, &candidates).unwrap();

        prop_assert!(resolution_of(&case_type, narrow_pick) <= resolution_of(&case_type, wide_pick));
    }

    #[test]
    fn time_dimensions_expose_one_filter(time_cols in 1usize..=5) {
        let mut case_type = CompleteCaseType::new("ct", "Time only")
            .with_dim(Dim::new("onset", DimType::Time));
        let mut order = Vec::new();
        for (rank, (col_type, id)) in TIME_TYPES.iter().take(time_cols).enumerate().rev() {
            case_type = case_type
                .with_col(Col::new(*id, *col_type, "onset", rank as u32 + 1))
                .with_case_type_col(CaseTypeCol::new(*id, *id, *id));
            order.push(id.to_string());
        }
        let case_type = case_type.with_case_type_dim(CaseTypeDim::new("ctd_onset", "onset", order));

        let dimensions = create_filter_dimensions(&case_type);
        prop_assert_eq!(dimensions.len(), 1);
        prop_assert_eq!(dimensions[0].filter_ids.len(), 1);
        prop_assert_eq!(dimensions[0].preferred_filter_id.as_str(), "ctc_day");
        prop_assert!(dimensions[0].allow_only_preferred_filter);
        prop_assert!(!dimensions[0].allow_multiple_visible_filters);
    }
}
