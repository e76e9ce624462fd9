//! Resolution of raw case values into display values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::DashboardConfig;

use super::case::Case;
use super::case_type::CompleteCaseType;
use super::column::{CaseTypeCol, Col};
use super::reference::ReferenceData;
use super::time::parse_date;
use super::types::ColType;

/// Display resolution of one stored value at three levels of verbosity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowValue {
    /// The stored value, kept even when it could not be resolved.
    pub raw: Option<String>,
    pub short: String,
    pub long: String,
    pub full: String,
    pub is_missing: bool,
}

impl RowValue {
    fn text(raw: &str, short: String, long: String, full: String) -> Self {
        Self {
            raw: Some(raw.to_string()),
            short,
            long,
            full,
            is_missing: false,
        }
    }

    fn plain(raw: &str) -> Self {
        Self::text(raw, raw.to_string(), raw.to_string(), raw.to_string())
    }

    /// The missing sentinel, optionally keeping an unresolvable raw value.
    pub fn missing(raw: Option<&str>, config: &DashboardConfig) -> Self {
        let symbol = config.missing_value_symbol.clone();
        let full = if config.annotate_missing_full {
            format!("{symbol} (missing)")
        } else {
            symbol.clone()
        };
        Self {
            raw: raw.map(str::to_string),
            short: symbol.clone(),
            long: symbol,
            full,
            is_missing: true,
        }
    }
}

/// Resolves raw values against a schema and the loaded reference data.
#[derive(Debug, Clone, Copy)]
pub struct RowValueResolver<'a> {
    case_type: &'a CompleteCaseType,
    reference: &'a ReferenceData,
    config: &'a DashboardConfig,
}

impl<'a> RowValueResolver<'a> {
    pub fn new(
        case_type: &'a CompleteCaseType,
        reference: &'a ReferenceData,
        config: &'a DashboardConfig,
    ) -> Self {
        Self {
            case_type,
            reference,
            config,
        }
    }

    pub fn case_type(&self) -> &'a CompleteCaseType {
        self.case_type
    }

    pub fn reference(&self) -> &'a ReferenceData {
        self.reference
    }

    pub fn config(&self) -> &'a DashboardConfig {
        self.config
    }

    /// Resolve the value of `case` at `case_type_col`. Never fails.
    pub fn resolve(&self, case: &Case, case_type_col: &CaseTypeCol) -> RowValue {
        self.resolve_raw(case_type_col, case.raw(&case_type_col.id))
    }

    /// Resolve a raw value directly.
    pub fn resolve_raw(&self, case_type_col: &CaseTypeCol, raw: Option<&str>) -> RowValue {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return RowValue::missing(None, self.config);
        };
        let Some(col) = self.case_type.col_of(case_type_col) else {
            return RowValue::plain(raw);
        };
        self.resolve_col(col, raw)
            .unwrap_or_else(|| RowValue::missing(Some(raw), self.config))
    }

    fn resolve_col(&self, col: &Col, raw: &str) -> Option<RowValue> {
        if let Some(concept_set_id) = &col.concept_set_id {
            let concept = self.reference.concept_set(concept_set_id)?.concepts.get(raw)?;
            return Some(RowValue::text(
                raw,
                concept.abbreviation.clone(),
                concept.name.clone(),
                concept.option_label(),
            ));
        }
        if let Some(region_set_id) = &col.region_set_id {
            let region_set = self.reference.region_set(region_set_id)?;
            let region = region_set.regions.get(raw)?;
            let label = region_set.label_of(region).to_string();
            return Some(RowValue::text(
                raw,
                label.clone(),
                label,
                format!("{} ({})", region.name, region.code),
            ));
        }

        match col.col_type {
            ColType::Organization => {
                let organization = self.reference.organization(raw)?;
                Some(RowValue::text(
                    raw,
                    organization.name.clone(),
                    organization.name.clone(),
                    organization.name.clone(),
                ))
            }
            ColType::Decimal0
            | ColType::Decimal1
            | ColType::Decimal2
            | ColType::Decimal3
            | ColType::Decimal4
            | ColType::Decimal5
            | ColType::Decimal6 => {
                let places = col.col_type.decimal_places().unwrap_or(0);
                match raw.parse::<f64>() {
                    Ok(value) if value.is_finite() => {
                        let text = format!("{value:.places$}");
                        Some(RowValue::text(raw, text.clone(), text.clone(), text))
                    }
                    _ => Some(RowValue::plain(raw)),
                }
            }
            ColType::TimeDay
            | ColType::TimeWeek
            | ColType::TimeMonth
            | ColType::TimeQuarter
            | ColType::TimeYear => {
                let label = col
                    .col_type
                    .time_resolution()
                    .zip(parse_date(col.col_type, raw))
                    .map(|(resolution, date)| resolution.label(date))
                    .unwrap_or_else(|| raw.to_string());
                Some(RowValue::text(raw, raw.to_string(), label.clone(), label))
            }
            ColType::Text
            | ColType::IdDirect
            | ColType::IdPseudonymised
            | ColType::IdAnonymised
            | ColType::Regex
            | ColType::Nominal
            | ColType::Ordinal
            | ColType::Interval
            | ColType::GeoRegion
            | ColType::GeoLatlon
            | ColType::GeneticSequence
            | ColType::GeneticDistance => Some(RowValue::plain(raw)),
        }
    }
}

/// Resolve one value; see [`RowValueResolver::resolve`].
pub fn resolve(
    case: &Case,
    case_type_col: &CaseTypeCol,
    case_type: &CompleteCaseType,
    reference: &ReferenceData,
    config: &DashboardConfig,
) -> RowValue {
    RowValueResolver::new(case_type, reference, config).resolve(case, case_type_col)
}

/// Memo of resolved values keyed on the reference-data generation.
///
/// Entries are dropped as soon as a resolver with a different generation is
/// used. Call [`RowValueCache::clear`] after changing the configuration.
#[derive(Debug, Default)]
pub struct RowValueCache {
    generation: Option<u64>,
    entries: HashMap<(String, String), RowValue>,
}

impl RowValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the cache.
    pub fn resolve(
        &mut self,
        resolver: &RowValueResolver<'_>,
        case: &Case,
        case_type_col: &CaseTypeCol,
    ) -> RowValue {
        let generation = resolver.reference().generation();
        if self.generation != Some(generation) {
            self.entries.clear();
            self.generation = Some(generation);
        }

        let Some(raw) = case.raw(&case_type_col.id) else {
            return RowValue::missing(None, resolver.config());
        };
        self.entries
            .entry((case_type_col.id.clone(), raw.to_string()))
            .or_insert_with(|| resolver.resolve_raw(case_type_col, Some(raw)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        CaseTypeDim, Concept, ConceptSet, Dim, DimType, Organization, Region, RegionSet,
    };

    fn schema() -> CompleteCaseType {
        CompleteCaseType::new("ct", "Test")
            .with_dim(Dim::new("sex", DimType::Text))
            .with_dim(Dim::new("geo", DimType::Geo))
            .with_dim(Dim::new("lab", DimType::Organization))
            .with_dim(Dim::new("age", DimType::Number))
            .with_dim(Dim::new("onset", DimType::Time))
            .with_col(Col::new("sex", ColType::Nominal, "sex", 1).with_concept_set("cs_sex"))
            .with_col(Col::new("province", ColType::GeoRegion, "geo", 1).with_region_set("rs_prov"))
            .with_col(Col::new("lab", ColType::Organization, "lab", 1))
            .with_col(Col::new("age", ColType::Decimal1, "age", 1))
            .with_col(Col::new("onset_week", ColType::TimeWeek, "onset", 1))
            .with_case_type_col(CaseTypeCol::new("ctc_sex", "sex", "Sex"))
            .with_case_type_col(CaseTypeCol::new("ctc_province", "province", "Province"))
            .with_case_type_col(CaseTypeCol::new("ctc_lab", "lab", "Lab"))
            .with_case_type_col(CaseTypeCol::new("ctc_age", "age", "Age"))
            .with_case_type_col(CaseTypeCol::new("ctc_week", "onset_week", "Onset week"))
            .with_case_type_dim(CaseTypeDim::new("d1", "sex", vec!["ctc_sex".into()]))
    }

    fn reference() -> ReferenceData {
        let mut refs = ReferenceData::new();
        refs.insert_concept_set(ConceptSet::new(
            "cs_sex",
            vec![Concept::new("f", "F", "Female"), Concept::new("m", "M", "Male")],
        ));
        refs.insert_region_set(RegionSet::new(
            "rs_prov",
            false,
            vec![Region::new("r_nh", "NH", "Noord-Holland")],
        ));
        refs.set_organizations(vec![Organization::new("o1", "RIVM")]);
        refs
    }

    #[test]
    fn test_resolve_concept() {
        let schema = schema();
        let refs = reference();
        let config = DashboardConfig::default();
        let resolver = RowValueResolver::new(&schema, &refs, &config);
        let case = Case::new("c1").with_value("ctc_sex", "f");

        let value = resolver.resolve(&case, schema.case_type_col("ctc_sex").unwrap());
        assert_eq!(value.short, "F");
        assert_eq!(value.long, "Female");
        assert_eq!(value.full, "F (Female)");
        assert!(!value.is_missing);
    }

    #[test]
    fn test_resolve_region_by_name_or_code() {
        let schema = schema();
        let mut refs = reference();
        let config = DashboardConfig::default();
        let case = Case::new("c1").with_value("ctc_province", "r_nh");
        let ctc = schema.case_type_col("ctc_province").unwrap();

        let value = resolve(&case, ctc, &schema, &refs, &config);
        assert_eq!(value.short, "Noord-Holland");
        assert_eq!(value.full, "Noord-Holland (NH)");

        let mut region_set = refs.region_set("rs_prov").unwrap().clone();
        region_set.region_code_as_label = true;
        refs.insert_region_set(region_set);
        let value = resolve(&case, ctc, &schema, &refs, &config);
        assert_eq!(value.short, "NH");
    }

    #[test]
    fn test_unresolvable_reference_is_missing() {
        let schema = schema();
        let refs = reference();
        let config = DashboardConfig::default();
        let case = Case::new("c1")
            .with_value("ctc_sex", "x")
            .with_value("ctc_lab", "o404");

        let sex = resolve(&case, schema.case_type_col("ctc_sex").unwrap(), &schema, &refs, &config);
        assert!(sex.is_missing);
        assert_eq!(sex.raw.as_deref(), Some("x"));
        assert_eq!(sex.short, "-");
        assert_eq!(sex.full, "- (missing)");

        let lab = resolve(&case, schema.case_type_col("ctc_lab").unwrap(), &schema, &refs, &config);
        assert!(lab.is_missing);
    }

    #[test]
    fn test_absent_value_uses_sentinel() {
        let schema = schema();
        let refs = reference();
        let mut config = DashboardConfig::default().with_missing_value_symbol("∅");
        config.annotate_missing_full = false;
        let case = Case::new("c1");

        let value = resolve(&case, schema.case_type_col("ctc_age").unwrap(), &schema, &refs, &config);
        assert!(value.is_missing);
        assert_eq!(value.raw, None);
        assert_eq!((value.short.as_str(), value.long.as_str(), value.full.as_str()), ("∅", "∅", "∅"));
    }

    #[test]
    fn test_decimal_and_time_formatting() {
        let schema = schema();
        let refs = reference();
        let config = DashboardConfig::default();
        let case = Case::new("c1")
            .with_value("ctc_age", "41.26")
            .with_value("ctc_week", "2024-03-13");

        let age = resolve(&case, schema.case_type_col("ctc_age").unwrap(), &schema, &refs, &config);
        assert_eq!(age.short, "41.3");

        let week = resolve(&case, schema.case_type_col("ctc_week").unwrap(), &schema, &refs, &config);
        assert_eq!(week.short, "2024-03-13");
        assert_eq!(week.long, "2024-W11");
    }

    #[test]
    fn test_cache_tracks_generation() {
        let schema = schema();
        let mut refs = reference();
        let config = DashboardConfig::default();
        let ctc = schema.case_type_col("ctc_sex").unwrap().clone();
        let case = Case::new("c1").with_value("ctc_sex", "f");
        let mut cache = RowValueCache::new();

        {
            let resolver = RowValueResolver::new(&schema, &refs, &config);
            assert_eq!(cache.resolve(&resolver, &case, &ctc).long, "Female");
            assert_eq!(cache.len(), 1);
        }

        refs.insert_concept_set(ConceptSet::new("cs_sex", vec![Concept::new("f", "F", "Vrouw")]));
        let resolver = RowValueResolver::new(&schema, &refs, &config);
        assert_eq!(cache.resolve(&resolver, &case, &ctc).long, "Vrouw");
        assert_eq!(cache.len(), 1);
    }
}
