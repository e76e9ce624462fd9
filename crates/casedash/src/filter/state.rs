//! Current filter values and their application to a case collection.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::config::DashboardConfig;
use crate::error::{DashError, Result};
use crate::schema::{Case, CompleteCaseType, ReferenceData, RowValueResolver};

use super::derive::{create_filter_dimensions, create_filters};
use super::model::{
    Filter, FilterDimension, FilterMode, FilterValue, RemoteFilter, SELECTION_FILTER_ID,
    TREE_FILTER_ID,
};

/// The filter panel: derived filters plus the values the user set.
#[derive(Debug, Clone)]
pub struct FilterState {
    dimensions: Vec<FilterDimension>,
    filters: Vec<Filter>,
    /// Columns of dimensions that only allow their preferred filter.
    ignored_ids: HashSet<String>,
}

impl FilterState {
    /// Derive the filter panel for a case type.
    pub fn new(
        case_type: &CompleteCaseType,
        reference: &ReferenceData,
        config: &DashboardConfig,
        today: NaiveDate,
    ) -> Self {
        let dimensions = create_filter_dimensions(case_type);
        let ignored_ids = case_type
            .case_type_cols
            .keys()
            .filter(|id| {
                case_type.case_type_dim_of(id).is_some_and(|case_type_dim| {
                    dimensions.iter().any(|dim| {
                        dim.id == case_type_dim.id
                            && dim.allow_only_preferred_filter
                            && dim.preferred_filter_id != **id
                    })
                })
            })
            .cloned()
            .collect();
        Self {
            dimensions,
            filters: create_filters(case_type, reference, config, today),
            ignored_ids,
        }
    }

    pub fn dimensions(&self) -> &[FilterDimension] {
        &self.dimensions
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn filter(&self, id: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.id == id)
    }

    /// Filters that currently restrict something.
    pub fn active_filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| f.is_active())
    }

    /// Set or clear the value of a filter.
    ///
    /// Returns `Ok(false)` when the value was ignored because the filter is not
    /// the preferred one of a dimension that only allows its preferred filter.
    pub fn set_value(&mut self, id: &str, value: Option<FilterValue>) -> Result<bool> {
        if self.ignored_ids.contains(id) {
            tracing::debug!(filter = %id, "ignoring value for non-preferred filter");
            return Ok(false);
        }

        let index = self
            .filters
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| DashError::Config(format!("unknown filter '{id}'")))?;

        if let Some(value) = &value {
            if !self.filters[index].kind.accepts(value) {
                return Err(DashError::Config(format!(
                    "value {value:?} does not fit filter '{id}'"
                )));
            }
        }

        self.filters[index].value = value;
        Ok(true)
    }

    /// Replace the selection filter's case ids; an empty list clears it.
    pub fn set_selection(&mut self, case_ids: Vec<String>) -> Result<bool> {
        self.set_value(SELECTION_FILTER_ID, Some(FilterValue::Values(case_ids)))
    }

    /// Replace the tree filter's case ids; an empty list clears it.
    pub fn set_tree(&mut self, case_ids: Vec<String>) -> Result<bool> {
        self.set_value(TREE_FILTER_ID, Some(FilterValue::Values(case_ids)))
    }

    /// Clear every filter value.
    pub fn clear(&mut self) {
        for filter in &mut self.filters {
            filter.value = None;
        }
    }

    /// Encodings of the active remote filters, for the data source query.
    pub fn remote_filters(&self) -> Vec<RemoteFilter> {
        self.filters.iter().filter_map(Filter::encode).collect()
    }

    /// Apply only the local filters to already fetched cases.
    pub fn apply_local<'c>(&self, cases: &'c [Case]) -> Vec<&'c Case> {
        let id_sets: Vec<_> = self
            .filters
            .iter()
            .filter(|f| f.mode == FilterMode::Local)
            .filter_map(Filter::case_ids)
            .collect();
        cases
            .iter()
            .filter(|case| id_sets.iter().all(|ids| ids.contains(case.id.as_str())))
            .collect()
    }

    /// Apply every active filter locally, remote ones included.
    pub fn apply_all<'c>(&self, cases: &'c [Case], resolver: &RowValueResolver<'_>) -> Vec<&'c Case> {
        let remote = self.remote_filters();
        self.apply_local(cases)
            .into_iter()
            .filter(|case| remote.iter().all(|f| f.matches(case, resolver)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;
    use crate::schema::{CaseTypeCol, CaseTypeDim, Col, ColType, Concept, ConceptSet, Dim, DimType};

    fn schema() -> CompleteCaseType {
        CompleteCaseType::new("ct", "Test")
            .with_dim(Dim::new("onset", DimType::Time))
            .with_dim(Dim::new("sex", DimType::Text))
            .with_dim(Dim::new("age", DimType::Number))
            .with_dim(Dim::new("name", DimType::Text))
            .with_col(Col::new("onset_day", ColType::TimeDay, "onset", 1))
            .with_col(Col::new("onset_month", ColType::TimeMonth, "onset", 2))
            .with_col(Col::new("sex", ColType::Nominal, "sex", 1).with_concept_set("cs_sex"))
            .with_col(Col::new("age", ColType::Decimal0, "age", 1))
            .with_col(Col::new("name", ColType::Text, "name", 1))
            .with_case_type_col(CaseTypeCol::new("ctc_day", "onset_day", "Onset"))
            .with_case_type_col(CaseTypeCol::new("ctc_month", "onset_month", "Onset month"))
            .with_case_type_col(CaseTypeCol::new("ctc_sex", "sex", "Sex"))
            .with_case_type_col(CaseTypeCol::new("ctc_age", "age", "Age"))
            .with_case_type_col(CaseTypeCol::new("ctc_name", "name", "Name"))
            .with_case_type_dim(CaseTypeDim::new("d_onset", "onset", vec!["ctc_day".into(), "ctc_month".into()]))
            .with_case_type_dim(CaseTypeDim::new("d_sex", "sex", vec!["ctc_sex".into()]))
            .with_case_type_dim(CaseTypeDim::new("d_age", "age", vec!["ctc_age".into()]))
            .with_case_type_dim(CaseTypeDim::new("d_name", "name", vec!["ctc_name".into()]))
    }

    fn reference() -> ReferenceData {
        let mut refs = ReferenceData::new();
        refs.insert_concept_set(ConceptSet::new(
            "cs_sex",
            vec![Concept::new("f", "F", "Female"), Concept::new("m", "M", "Male")],
        ));
        refs
    }

    fn cases() -> Vec<Case> {
        vec![
            Case::new("c1")
                .with_value("ctc_day", "2024-01-05")
                .with_value("ctc_sex", "f")
                .with_value("ctc_age", "34")
                .with_value("ctc_name", "Harbour outbreak"),
            Case::new("c2")
                .with_value("ctc_day", "2024-02-11")
                .with_value("ctc_sex", "m")
                .with_value("ctc_age", "71"),
            Case::new("c3").with_value("ctc_sex", "f").with_value("ctc_age", "8"),
        ]
    }

    fn state() -> FilterState {
        FilterState::new(
            &schema(),
            &reference(),
            &DashboardConfig::default(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_remote_filters_only_active() {
        let mut state = state();
        assert!(state.remote_filters().is_empty());

        state
            .set_value("ctc_sex", Some(FilterValue::Values(vec!["f".into()])))
            .unwrap();
        state.set_selection(vec!["c1".into()]).unwrap();

        let remote = state.remote_filters();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].case_type_col_id(), "ctc_sex");
        assert_eq!(state.active_filters().count(), 2);
    }

    #[test]
    fn test_non_preferred_time_filter_is_ignored() {
        let mut state = state();
        let window = FilterValue::DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: None,
        };

        assert!(state.filter("ctc_month").is_none());
        assert!(!state.set_value("ctc_month", Some(window.clone())).unwrap());
        assert_eq!(state.active_filters().count(), 0);
        assert!(state.set_value("ctc_day", Some(window)).unwrap());
        assert_eq!(state.active_filters().count(), 1);
    }

    #[test]
    fn test_wrong_value_kind_is_rejected() {
        let mut state = state();
        let err = state
            .set_value("ctc_age", Some(FilterValue::Text("old".into())))
            .unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
        assert!(state.set_value("nope", None).is_err());
        assert!(matches!(
            state.filter("ctc_age").unwrap().kind,
            FilterKind::NumberRange { .. }
        ));
    }

    #[test]
    fn test_apply_all() {
        let schema = schema();
        let refs = reference();
        let config = DashboardConfig::default();
        let resolver = RowValueResolver::new(&schema, &refs, &config);
        let cases = cases();
        let mut state = state();

        state
            .set_value(
                "ctc_day",
                Some(FilterValue::DateRange {
                    from: NaiveDate::from_ymd_opt(2024, 1, 1),
                    to: NaiveDate::from_ymd_opt(2024, 1, 31),
                }),
            )
            .unwrap();
        let ids: Vec<_> = state.apply_all(&cases, &resolver).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);

        state.clear();
        state
            .set_value("ctc_age", Some(FilterValue::NumberRange { min: Some(18.0), max: None }))
            .unwrap();
        let ids: Vec<_> = state.apply_all(&cases, &resolver).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);

        state.clear();
        state
            .set_value("ctc_name", Some(FilterValue::Text("HARBOUR".into())))
            .unwrap();
        let ids: Vec<_> = state.apply_all(&cases, &resolver).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);
    }

    #[test]
    fn test_apply_local_ignores_remote_filters() {
        let cases = cases();
        let mut state = state();
        state
            .set_value("ctc_sex", Some(FilterValue::Values(vec!["m".into()])))
            .unwrap();
        assert_eq!(state.apply_local(&cases).len(), 3);

        state.set_tree(vec!["c2".into(), "c3".into()]).unwrap();
        state.set_selection(vec!["c3".into()]).unwrap();
        let ids: Vec<_> = state.apply_local(&cases).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3"]);

        state.set_selection(vec![]).unwrap();
        assert_eq!(state.apply_local(&cases).len(), 2);
    }
}
