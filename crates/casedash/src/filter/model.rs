//! Filter definitions, values and their evaluation.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};
use crate::schema::{parse_date, Case, ColType, DimType, RowValueResolver};

/// Id of the synthetic filter matching the current selection.
pub const SELECTION_FILTER_ID: &str = "selection";

/// Id of the synthetic filter matching cases picked in the phylogenetic tree.
pub const TREE_FILTER_ID: &str = "tree";

/// Where a filter is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterMode {
    /// Against data that is already loaded.
    Local,
    /// Encoded into the query sent to the data source.
    Remote,
}

/// One option of a multi-select filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Stored value (concept, region or organization id).
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// What kind of input a filter takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    /// Inclusive date range; `col_type` picks the date parser.
    DateRange {
        col_type: ColType,
        min: NaiveDate,
        max: NaiveDate,
    },
    /// Any of a fixed set of options.
    MultiSelect { options: Vec<SelectOption> },
    /// Inclusive numeric range; `None` bounds are unbounded.
    NumberRange { min: Option<f64>, max: Option<f64> },
    /// Case-insensitive substring match on the resolved value.
    TextContains,
    /// Case ids currently selected.
    Selection,
    /// Case ids picked in the tree.
    Tree,
}

impl FilterKind {
    /// Whether a value has the shape this kind expects.
    pub fn accepts(&self, value: &FilterValue) -> bool {
        matches!(
            (self, value),
            (FilterKind::DateRange { .. }, FilterValue::DateRange { .. })
                | (FilterKind::MultiSelect { .. }, FilterValue::Values(_))
                | (FilterKind::NumberRange { .. }, FilterValue::NumberRange { .. })
                | (FilterKind::TextContains, FilterValue::Text(_))
                | (FilterKind::Selection, FilterValue::Values(_))
                | (FilterKind::Tree, FilterValue::Values(_))
        )
    }

    /// Parse a textual value for this kind.
    ///
    /// Ranges are written `FROM..TO` with either side optional; lists are
    /// comma separated.
    pub fn parse_value(&self, text: &str) -> Result<FilterValue> {
        let text = text.trim();
        match self {
            FilterKind::DateRange { .. } => {
                let (from, to) = split_range(text)?;
                Ok(FilterValue::DateRange {
                    from: from.map(parse_day).transpose()?,
                    to: to.map(parse_day).transpose()?,
                })
            }
            FilterKind::NumberRange { .. } => {
                let (min, max) = split_range(text)?;
                Ok(FilterValue::NumberRange {
                    min: min.map(parse_number).transpose()?,
                    max: max.map(parse_number).transpose()?,
                })
            }
            FilterKind::MultiSelect { .. } | FilterKind::Selection | FilterKind::Tree => {
                Ok(FilterValue::Values(
                    text.split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect(),
                ))
            }
            FilterKind::TextContains => Ok(FilterValue::Text(text.to_string())),
        }
    }
}

fn split_range(text: &str) -> Result<(Option<&str>, Option<&str>)> {
    let (from, to) = text
        .split_once("..")
        .ok_or_else(|| DashError::Config(format!("expected a FROM..TO range, got '{text}'")))?;
    Ok((range_bound(from), range_bound(to)))
}

fn range_bound(text: &str) -> Option<&str> {
    Some(text.trim()).filter(|s| !s.is_empty())
}

fn parse_day(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| DashError::Config(format!("invalid date '{text}': {e}")))
}

fn parse_number(text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|e| DashError::Config(format!("invalid number '{text}': {e}")))
}

/// A user-set filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    DateRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    /// Selected option values, or case ids for the synthetic filters.
    Values(Vec<String>),
    NumberRange { min: Option<f64>, max: Option<f64> },
    Text(String),
}

impl FilterValue {
    /// A value that restricts nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::DateRange { from, to } => from.is_none() && to.is_none(),
            FilterValue::Values(values) => values.is_empty(),
            FilterValue::NumberRange { min, max } => min.is_none() && max.is_none(),
            FilterValue::Text(text) => text.trim().is_empty(),
        }
    }
}

/// One evaluable filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: String,
    pub label: String,
    /// Column filtered on; `None` for the synthetic filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_type_col_id: Option<String>,
    /// Dimension binding this filter belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_type_dim_id: Option<String>,
    pub kind: FilterKind,
    pub mode: FilterMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl Filter {
    /// The filter matching selected case ids.
    pub fn selection() -> Self {
        Self {
            id: SELECTION_FILTER_ID.to_string(),
            label: "Selected rows".to_string(),
            case_type_col_id: None,
            case_type_dim_id: None,
            kind: FilterKind::Selection,
            mode: FilterMode::Local,
            value: None,
        }
    }

    /// The filter matching case ids picked in the tree.
    pub fn tree() -> Self {
        Self {
            id: TREE_FILTER_ID.to_string(),
            label: "Tree".to_string(),
            case_type_col_id: None,
            case_type_dim_id: None,
            kind: FilterKind::Tree,
            mode: FilterMode::Local,
            value: None,
        }
    }

    /// Whether the filter currently restricts anything.
    pub fn is_active(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_empty())
    }

    /// Encode an active remote filter for the data source.
    pub fn encode(&self) -> Option<RemoteFilter> {
        if self.mode != FilterMode::Remote || !self.is_active() {
            return None;
        }
        let case_type_col_id = self.case_type_col_id.clone()?;
        match (&self.kind, self.value.as_ref()?) {
            (FilterKind::DateRange { col_type, .. }, FilterValue::DateRange { from, to }) => {
                Some(RemoteFilter::DateRange {
                    case_type_col_id,
                    col_type: *col_type,
                    lower_bound: *from,
                    upper_bound: *to,
                })
            }
            (FilterKind::MultiSelect { .. }, FilterValue::Values(values)) => {
                Some(RemoteFilter::StringSet {
                    case_type_col_id,
                    members: values.clone(),
                })
            }
            (FilterKind::NumberRange { .. }, FilterValue::NumberRange { min, max }) => {
                Some(RemoteFilter::NumberRange {
                    case_type_col_id,
                    lower_bound: *min,
                    upper_bound: *max,
                })
            }
            (FilterKind::TextContains, FilterValue::Text(text)) => Some(RemoteFilter::Contains {
                case_type_col_id,
                value: text.trim().to_string(),
            }),
            _ => None,
        }
    }

    /// Case ids held by an active selection or tree filter.
    pub fn case_ids(&self) -> Option<HashSet<&str>> {
        if !matches!(self.kind, FilterKind::Selection | FilterKind::Tree) || !self.is_active() {
            return None;
        }
        match self.value.as_ref()? {
            FilterValue::Values(ids) => Some(ids.iter().map(String::as_str).collect()),
            _ => None,
        }
    }

    /// Evaluate this filter against one case. Inactive filters match everything.
    pub fn matches(&self, case: &Case, resolver: &RowValueResolver<'_>) -> bool {
        if !self.is_active() {
            return true;
        }
        if let Some(ids) = self.case_ids() {
            return ids.contains(case.id.as_str());
        }
        self.encode()
            .is_none_or(|remote| remote.matches(case, resolver))
    }
}

/// A remote filter as sent to the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteFilter {
    DateRange {
        case_type_col_id: String,
        col_type: ColType,
        lower_bound: Option<NaiveDate>,
        upper_bound: Option<NaiveDate>,
    },
    StringSet {
        case_type_col_id: String,
        members: Vec<String>,
    },
    NumberRange {
        case_type_col_id: String,
        lower_bound: Option<f64>,
        upper_bound: Option<f64>,
    },
    Contains {
        case_type_col_id: String,
        value: String,
    },
}

impl RemoteFilter {
    pub fn case_type_col_id(&self) -> &str {
        match self {
            RemoteFilter::DateRange { case_type_col_id, .. }
            | RemoteFilter::StringSet { case_type_col_id, .. }
            | RemoteFilter::NumberRange { case_type_col_id, .. }
            | RemoteFilter::Contains { case_type_col_id, .. } => case_type_col_id,
        }
    }

    /// Evaluate against a loaded case. Missing values never match.
    pub fn matches(&self, case: &Case, resolver: &RowValueResolver<'_>) -> bool {
        let Some(raw) = case.raw(self.case_type_col_id()) else {
            return false;
        };
        match self {
            RemoteFilter::DateRange {
                col_type,
                lower_bound,
                upper_bound,
                ..
            } => {
                let Some(date) = parse_date(*col_type, raw) else {
                    return false;
                };
                lower_bound.is_none_or(|lower| date >= lower)
                    && upper_bound.is_none_or(|upper| date <= upper)
            }
            RemoteFilter::StringSet { members, .. } => members.iter().any(|m| m == raw.trim()),
            RemoteFilter::NumberRange {
                lower_bound,
                upper_bound,
                ..
            } => {
                let Ok(value) = raw.trim().parse::<f64>() else {
                    return false;
                };
                lower_bound.is_none_or(|lower| value >= lower)
                    && upper_bound.is_none_or(|upper| value <= upper)
            }
            RemoteFilter::Contains {
                case_type_col_id,
                value,
            } => {
                let needle = value.to_lowercase();
                let Some(case_type_col) = resolver.case_type().case_type_col(case_type_col_id)
                else {
                    return raw.to_lowercase().contains(&needle);
                };
                let resolved = resolver.resolve(case, case_type_col);
                resolved.long.to_lowercase().contains(&needle)
                    || raw.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Filter panel metadata for one dimension binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDimension {
    /// Dimension binding id.
    pub id: String,
    pub dim_id: String,
    pub dim_type: DimType,
    pub label: String,
    /// Filters belonging to this dimension, in column order.
    pub filter_ids: Vec<String>,
    /// Filter shown initially.
    pub preferred_filter_id: String,
    /// More than one of `filter_ids` may be visible at once.
    pub allow_multiple_visible_filters: bool,
    /// Only the preferred filter may ever be used.
    pub allow_only_preferred_filter: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_shapes() {
        let kind = FilterKind::NumberRange { min: None, max: None };
        assert!(kind.accepts(&FilterValue::NumberRange { min: Some(1.0), max: None }));
        assert!(!kind.accepts(&FilterValue::Text("x".into())));
        assert!(FilterKind::Selection.accepts(&FilterValue::Values(vec![])));
    }

    #[test]
    fn test_parse_value() {
        let dates = FilterKind::DateRange {
            col_type: ColType::TimeDay,
            min: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            max: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(
            dates.parse_value("2023-01-01..").unwrap(),
            FilterValue::DateRange {
                from: NaiveDate::from_ymd_opt(2023, 1, 1),
                to: None
            }
        );
        assert!(dates.parse_value("2023-01-01").is_err());
        assert_eq!(
            dates.parse_value(" 2023-01-01 .. 2023-06-30 ").unwrap(),
            FilterValue::DateRange {
                from: NaiveDate::from_ymd_opt(2023, 1, 1),
                to: NaiveDate::from_ymd_opt(2023, 6, 30)
            }
        );

        let numbers = FilterKind::NumberRange { min: None, max: None };
        assert_eq!(
            numbers.parse_value("..4.5").unwrap(),
            FilterValue::NumberRange { min: None, max: Some(4.5) }
        );
        assert!(matches!(numbers.parse_value("a..b"), Err(DashError::Config(_))));

        let select = FilterKind::MultiSelect { options: vec![] };
        assert_eq!(
            select.parse_value("f, m,").unwrap(),
            FilterValue::Values(vec!["f".into(), "m".into()])
        );
    }

    #[test]
    fn test_inactive_filters_do_not_encode() {
        let mut filter = Filter {
            id: "ctc_age".into(),
            label: "Age".into(),
            case_type_col_id: Some("ctc_age".into()),
            case_type_dim_id: None,
            kind: FilterKind::NumberRange { min: None, max: None },
            mode: FilterMode::Remote,
            value: Some(FilterValue::NumberRange { min: None, max: None }),
        };
        assert!(!filter.is_active());
        assert_eq!(filter.encode(), None);

        filter.value = Some(FilterValue::NumberRange { min: Some(18.0), max: None });
        assert_eq!(
            filter.encode(),
            Some(RemoteFilter::NumberRange {
                case_type_col_id: "ctc_age".into(),
                lower_bound: Some(18.0),
                upper_bound: None,
            })
        );
    }

    #[test]
    fn test_selection_filter_is_local() {
        let mut filter = Filter::selection();
        filter.value = Some(FilterValue::Values(vec!["c1".into()]));
        assert_eq!(filter.mode, FilterMode::Local);
        assert_eq!(filter.encode(), None);
        assert!(filter.case_ids().unwrap().contains("c1"));
    }

    #[test]
    fn test_remote_filter_json_shape() {
        let filter = RemoteFilter::StringSet {
            case_type_col_id: "ctc_sex".into(),
            members: vec!["f".into()],
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["type"], "STRING_SET");
        assert_eq!(json["members"][0], "f");
    }
}
