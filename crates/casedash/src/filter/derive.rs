//! Derivation of the filter panel from a case type schema.

use chrono::{Months, NaiveDate};

use crate::config::DashboardConfig;
use crate::schema::{
    CaseTypeCol, CaseTypeDim, Col, ColType, CompleteCaseType, Dim, DimType, ReferenceData,
};

use super::model::{Filter, FilterDimension, FilterKind, FilterMode, SelectOption};

/// Filter layout of one dimension binding.
struct DimensionPlan<'a> {
    case_type_dim: &'a CaseTypeDim,
    dim: &'a Dim,
    /// Columns that become filters.
    columns: Vec<(&'a CaseTypeCol, &'a Col)>,
    preferred: &'a CaseTypeCol,
    allow_multiple_visible_filters: bool,
    allow_only_preferred_filter: bool,
}

fn plan_dimensions(case_type: &CompleteCaseType) -> Vec<DimensionPlan<'_>> {
    case_type
        .case_type_dims
        .iter()
        .filter_map(|case_type_dim| plan_dimension(case_type, case_type_dim))
        .collect()
}

fn plan_dimension<'a>(
    case_type: &'a CompleteCaseType,
    case_type_dim: &'a CaseTypeDim,
) -> Option<DimensionPlan<'a>> {
    let Some(dim) = case_type.dim_of(case_type_dim) else {
        tracing::warn!(
            case_type_dim = %case_type_dim.id,
            dim = %case_type_dim.dim_id,
            "skipping filters for unknown dimension"
        );
        return None;
    };

    let columns: Vec<_> = case_type
        .columns_of(case_type_dim)
        .filter(|(_, col)| col.col_type.is_filterable())
        .collect();
    if columns.is_empty() {
        tracing::debug!(case_type_dim = %case_type_dim.id, "dimension has no filterable columns");
        return None;
    }

    let rank_preferred = columns
        .iter()
        .find(|(_, col)| col.rank_in_dim == 1)
        .unwrap_or(&columns[0])
        .0;

    let plan = match dim.dim_type {
        DimType::Time => DimensionPlan {
            case_type_dim,
            dim,
            columns: columns
                .iter()
                .copied()
                .filter(|(ctc, _)| ctc.id == rank_preferred.id)
                .collect(),
            preferred: rank_preferred,
            allow_multiple_visible_filters: false,
            allow_only_preferred_filter: true,
        },
        DimType::Geo => {
            let middle = (columns.len().saturating_sub(1) / 2).min(columns.len() - 1);
            DimensionPlan {
                case_type_dim,
                dim,
                preferred: columns[middle].0,
                columns,
                allow_multiple_visible_filters: false,
                allow_only_preferred_filter: false,
            }
        }
        DimType::Text | DimType::Number | DimType::Organization | DimType::Other => DimensionPlan {
            case_type_dim,
            dim,
            columns,
            preferred: rank_preferred,
            allow_multiple_visible_filters: true,
            allow_only_preferred_filter: false,
        },
    };
    Some(plan)
}

/// Filter panel metadata for every dimension with at least one filter.
pub fn create_filter_dimensions(case_type: &CompleteCaseType) -> Vec<FilterDimension> {
    plan_dimensions(case_type)
        .into_iter()
        .map(|plan| FilterDimension {
            id: plan.case_type_dim.id.clone(),
            dim_id: plan.dim.id.clone(),
            dim_type: plan.dim.dim_type,
            label: plan.dim.display_label().to_string(),
            filter_ids: plan.columns.iter().map(|(ctc, _)| ctc.id.clone()).collect(),
            preferred_filter_id: plan.preferred.id.clone(),
            allow_multiple_visible_filters: plan.allow_multiple_visible_filters,
            allow_only_preferred_filter: plan.allow_only_preferred_filter,
        })
        .collect()
}

/// All filters of a case type, followed by the selection and tree filters.
///
/// `today` anchors the default date window.
pub fn create_filters(
    case_type: &CompleteCaseType,
    reference: &ReferenceData,
    config: &DashboardConfig,
    today: NaiveDate,
) -> Vec<Filter> {
    let factory = FilterFactory {
        reference,
        config,
        today,
    };

    let mut filters: Vec<Filter> = plan_dimensions(case_type)
        .iter()
        .flat_map(|plan| {
            plan.columns.iter().filter_map(|(case_type_col, col)| {
                let kind = factory.kind_for(plan.dim.dim_type, case_type_col, col)?;
                Some(Filter {
                    id: case_type_col.id.clone(),
                    label: case_type_col.label.clone(),
                    case_type_col_id: Some(case_type_col.id.clone()),
                    case_type_dim_id: Some(plan.case_type_dim.id.clone()),
                    kind,
                    mode: FilterMode::Remote,
                    value: None,
                })
            })
        })
        .collect();

    filters.push(Filter::selection());
    filters.push(Filter::tree());
    tracing::debug!(case_type = %case_type.id, filters = filters.len(), "derived filters");
    filters
}

struct FilterFactory<'a> {
    reference: &'a ReferenceData,
    config: &'a DashboardConfig,
    today: NaiveDate,
}

impl FilterFactory<'_> {
    fn kind_for(&self, dim_type: DimType, case_type_col: &CaseTypeCol, col: &Col) -> Option<FilterKind> {
        if !col.col_type.is_filterable() {
            return None;
        }
        match dim_type {
            DimType::Time => Some(self.date_range(case_type_col, col)),
            DimType::Geo => Some(self.region_select(col).unwrap_or(FilterKind::TextContains)),
            DimType::Organization => Some(self.organization_select()),
            DimType::Number | DimType::Text | DimType::Other => self.kind_for_col(case_type_col, col),
        }
    }

    fn kind_for_col(&self, case_type_col: &CaseTypeCol, col: &Col) -> Option<FilterKind> {
        match col.col_type {
            ColType::Decimal0
            | ColType::Decimal1
            | ColType::Decimal2
            | ColType::Decimal3
            | ColType::Decimal4
            | ColType::Decimal5
            | ColType::Decimal6 => Some(FilterKind::NumberRange {
                min: case_type_col.min_value.filter(|v| v.is_finite()),
                max: case_type_col.max_value.filter(|v| v.is_finite()),
            }),
            ColType::TimeDay
            | ColType::TimeWeek
            | ColType::TimeMonth
            | ColType::TimeQuarter
            | ColType::TimeYear => Some(self.date_range(case_type_col, col)),
            ColType::Organization => Some(self.organization_select()),
            ColType::GeoRegion => Some(
                self.region_select(col)
                    .unwrap_or_else(|| self.categorical(col)),
            ),
            ColType::Text
            | ColType::IdDirect
            | ColType::IdPseudonymised
            | ColType::IdAnonymised
            | ColType::Regex
            | ColType::Nominal
            | ColType::Ordinal
            | ColType::Interval
            | ColType::GeoLatlon
            | ColType::GeneticSequence => Some(self.categorical(col)),
            ColType::GeneticDistance => None,
        }
    }

    fn date_range(&self, case_type_col: &CaseTypeCol, col: &Col) -> FilterKind {
        let years_back = u32::try_from(self.config.date_filter_years_back.max(0)).unwrap_or(0);
        let default_min = self
            .today
            .checked_sub_months(Months::new(years_back * 12))
            .unwrap_or(NaiveDate::MIN);
        FilterKind::DateRange {
            col_type: col.col_type,
            min: case_type_col
                .min_datetime
                .map(|dt| dt.date())
                .unwrap_or(default_min),
            max: case_type_col
                .max_datetime
                .map(|dt| dt.date())
                .unwrap_or(self.today),
        }
    }

    fn region_select(&self, col: &Col) -> Option<FilterKind> {
        let region_set_id = col.region_set_id.as_ref()?;
        let Some(region_set) = self.reference.region_set(region_set_id) else {
            tracing::warn!(
                col = %col.id,
                region_set = %region_set_id,
                "region set not loaded, falling back to a text filter"
            );
            return None;
        };
        Some(FilterKind::MultiSelect {
            options: region_set
                .regions
                .values()
                .map(|region| SelectOption::new(&region.id, region_set.label_of(region)))
                .collect(),
        })
    }

    fn organization_select(&self) -> FilterKind {
        let mut options: Vec<_> = self
            .reference
            .organizations()
            .map(|org| SelectOption::new(&org.id, &org.name))
            .collect();
        options.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.value.cmp(&b.value)));
        FilterKind::MultiSelect { options }
    }

    fn categorical(&self, col: &Col) -> FilterKind {
        let concept_set = col
            .concept_set_id
            .as_ref()
            .and_then(|id| self.reference.concept_set(id));
        match concept_set {
            Some(concept_set) => FilterKind::MultiSelect {
                options: concept_set
                    .concepts
                    .values()
                    .map(|concept| SelectOption::new(&concept.id, concept.option_label()))
                    .collect(),
            },
            None => FilterKind::TextContains,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Concept, ConceptSet, Organization, Region, RegionSet};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn schema() -> CompleteCaseType {
        CompleteCaseType::new("ct", "Test")
            .with_dim(Dim::new("onset", DimType::Time))
            .with_dim(Dim::new("geo", DimType::Geo))
            .with_dim(Dim::new("age", DimType::Number))
            .with_dim(Dim::new("sex", DimType::Text))
            .with_dim(Dim::new("lab", DimType::Organization))
            .with_dim(Dim::new("dist", DimType::Other))
            .with_col(Col::new("onset_day", ColType::TimeDay, "onset", 1))
            .with_col(Col::new("onset_quarter", ColType::TimeQuarter, "onset", 3))
            .with_col(Col::new("country", ColType::GeoRegion, "geo", 1).with_region_set("rs_country"))
            .with_col(Col::new("province", ColType::GeoRegion, "geo", 2).with_region_set("rs_prov"))
            .with_col(Col::new("city", ColType::GeoRegion, "geo", 3).with_region_set("rs_city"))
            .with_col(Col::new("age", ColType::Decimal0, "age", 1))
            .with_col(Col::new("age_group", ColType::Ordinal, "age", 2).with_concept_set("cs_age"))
            .with_col(Col::new("sex", ColType::Nominal, "sex", 1).with_concept_set("cs_sex"))
            .with_col(Col::new("lab", ColType::Organization, "lab", 1))
            .with_col(Col::new("distance", ColType::GeneticDistance, "dist", 1))
            .with_case_type_col(CaseTypeCol::new("ctc_quarter", "onset_quarter", "Onset quarter"))
            .with_case_type_col(CaseTypeCol::new("ctc_day", "onset_day", "Onset date"))
            .with_case_type_col(CaseTypeCol::new("ctc_country", "country", "Country"))
            .with_case_type_col(CaseTypeCol::new("ctc_prov", "province", "Province"))
            .with_case_type_col(CaseTypeCol::new("ctc_city", "city", "City"))
            .with_case_type_col({
                let mut ctc = CaseTypeCol::new("ctc_age", "age", "Age");
                ctc.min_value = Some(0.0);
                ctc
            })
            .with_case_type_col(CaseTypeCol::new("ctc_age_group", "age_group", "Age group"))
            .with_case_type_col(CaseTypeCol::new("ctc_sex", "sex", "Sex"))
            .with_case_type_col(CaseTypeCol::new("ctc_lab", "lab", "Lab"))
            .with_case_type_col(CaseTypeCol::new("ctc_dist", "distance", "Distance"))
            .with_case_type_dim(CaseTypeDim::new(
                "ctd_onset",
                "onset",
                vec!["ctc_quarter".into(), "ctc_day".into()],
            ))
            .with_case_type_dim(CaseTypeDim::new(
                "ctd_geo",
                "geo",
                vec!["ctc_country".into(), "ctc_prov".into(), "ctc_city".into()],
            ))
            .with_case_type_dim(CaseTypeDim::new(
                "ctd_age",
                "age",
                vec!["ctc_age".into(), "ctc_age_group".into()],
            ))
            .with_case_type_dim(CaseTypeDim::new("ctd_sex", "sex", vec!["ctc_sex".into()]))
            .with_case_type_dim(CaseTypeDim::new("ctd_lab", "lab", vec!["ctc_lab".into()]))
            .with_case_type_dim(CaseTypeDim::new("ctd_dist", "dist", vec!["ctc_dist".into()]))
    }

    fn reference() -> ReferenceData {
        let mut refs = ReferenceData::new();
        refs.insert_concept_set(ConceptSet::new(
            "cs_sex",
            vec![Concept::new("f", "F", "Female"), Concept::new("m", "M", "Male")],
        ));
        refs.insert_region_set(RegionSet::new(
            "rs_prov",
            true,
            vec![
                Region::new("r_nh", "NH", "Noord-Holland"),
                Region::new("r_ut", "UT", "Utrecht"),
            ],
        ));
        refs.set_organizations(vec![
            Organization::new("o2", "Umcg"),
            Organization::new("o1", "Amc"),
        ]);
        refs
    }

    fn find<'a>(filters: &'a [Filter], id: &str) -> &'a Filter {
        filters.iter().find(|f| f.id == id).unwrap()
    }

    #[test]
    fn test_time_dimension_only_preferred() {
        let dims = create_filter_dimensions(&schema());
        let onset = dims.iter().find(|d| d.id == "ctd_onset").unwrap();
        assert_eq!(onset.filter_ids, vec!["ctc_day"]);
        assert_eq!(onset.preferred_filter_id, "ctc_day");
        assert!(onset.allow_only_preferred_filter);
        assert!(!onset.allow_multiple_visible_filters);

        let filters = create_filters(&schema(), &reference(), &DashboardConfig::default(), today());
        assert!(filters.iter().all(|f| f.id != "ctc_quarter"));
        match &find(&filters, "ctc_day").kind {
            FilterKind::DateRange { col_type, min, max } => {
                assert_eq!(*col_type, ColType::TimeDay);
                assert_eq!(*min, NaiveDate::from_ymd_opt(2006, 10, 17).unwrap());
                assert_eq!(*max, today());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    fn geo_only(levels: usize) -> CompleteCaseType {
        let ids: Vec<String> = (0..levels).map(|i| format!("ctc_geo{i}")).collect();
        let mut case_type = CompleteCaseType::new("ct", "Geo").with_dim(Dim::new("geo", DimType::Geo));
        for (i, id) in ids.iter().enumerate() {
            let col_id = format!("geo{i}");
            case_type = case_type
                .with_col(Col::new(col_id.as_str(), ColType::GeoRegion, "geo", i as u32 + 1))
                .with_case_type_col(CaseTypeCol::new(id.as_str(), col_id, id.as_str()));
        }
        case_type.with_case_type_dim(CaseTypeDim::new("ctd_geo", "geo", ids))
    }

    #[test]
    fn test_geo_middle_index_for_even_counts() {
        for (levels, expected) in [(1, "ctc_geo0"), (2, "ctc_geo0"), (4, "ctc_geo1")] {
            let dims = create_filter_dimensions(&geo_only(levels));
            assert_eq!(dims[0].filter_ids.len(), levels);
            assert_eq!(dims[0].preferred_filter_id, expected, "{levels} geo columns");
        }
    }

    #[test]
    fn test_geo_dimension_prefers_middle_column() {
        let dims = create_filter_dimensions(&schema());
        let geo = dims.iter().find(|d| d.id == "ctd_geo").unwrap();
        assert_eq!(geo.preferred_filter_id, "ctc_prov");
        assert_eq!(geo.filter_ids.len(), 3);
        assert!(!geo.allow_multiple_visible_filters);

        let filters = create_filters(&schema(), &reference(), &DashboardConfig::default(), today());
        match &find(&filters, "ctc_prov").kind {
            FilterKind::MultiSelect { options } => {
                assert_eq!(options[0], SelectOption::new("r_nh", "NH"));
            }
            other => panic!("unexpected kind {other:?}"),
        }
        // Region set not loaded.
        assert_eq!(find(&filters, "ctc_city").kind, FilterKind::TextContains);
    }

    #[test]
    fn test_number_and_categorical_kinds() {
        let filters = create_filters(&schema(), &reference(), &DashboardConfig::default(), today());
        assert_eq!(
            find(&filters, "ctc_age").kind,
            FilterKind::NumberRange { min: Some(0.0), max: None }
        );
        // Concept set not loaded: free text.
        assert_eq!(find(&filters, "ctc_age_group").kind, FilterKind::TextContains);
        match &find(&filters, "ctc_sex").kind {
            FilterKind::MultiSelect { options } => {
                assert_eq!(options[0].label, "F (Female)");
                assert_eq!(options.len(), 2);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_organizations_sorted_by_name() {
        let filters = create_filters(&schema(), &reference(), &DashboardConfig::default(), today());
        match &find(&filters, "ctc_lab").kind {
            FilterKind::MultiSelect { options } => {
                let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
                assert_eq!(labels, vec!["Amc", "Umcg"]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_genetic_distance_and_synthetic_filters() {
        let schema = schema();
        let dims = create_filter_dimensions(&schema);
        assert!(dims.iter().all(|d| d.id != "ctd_dist"));

        let filters = create_filters(&schema, &reference(), &DashboardConfig::default(), today());
        assert!(filters.iter().all(|f| f.id != "ctc_dist"));
        let selection = find(&filters, super::super::SELECTION_FILTER_ID);
        let tree = find(&filters, super::super::TREE_FILTER_ID);
        assert_eq!(selection.mode, FilterMode::Local);
        assert_eq!(tree.mode, FilterMode::Local);
        assert!(filters
            .iter()
            .filter(|f| f.case_type_col_id.is_some())
            .all(|f| f.mode == FilterMode::Remote));
    }

    #[test]
    fn test_missing_dimension_is_skipped() {
        let schema = schema().with_case_type_dim(CaseTypeDim::new(
            "ctd_ghost",
            "ghost",
            vec!["ctc_sex".into()],
        ));
        let dims = create_filter_dimensions(&schema);
        assert!(dims.iter().all(|d| d.id != "ctd_ghost"));
    }

    #[test]
    fn test_datetime_bounds_override_window() {
        let mut schema = schema();
        schema.case_type_cols.get_mut("ctc_day").unwrap().min_datetime =
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0);
        let filters = create_filters(&schema, &reference(), &DashboardConfig::default(), today());
        match &find(&filters, "ctc_day").kind {
            FilterKind::DateRange { min, .. } => {
                assert_eq!(*min, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
