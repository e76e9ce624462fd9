//! Grouping of a case collection by column value or by selection.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::{Case, CaseTypeCol, RowValue, RowValueResolver};

/// Raw value of the selected group in selection mode.
pub const SELECTED_VALUE: &str = "selected";

/// Raw value of the unselected group in selection mode.
pub const UNSELECTED_VALUE: &str = "unselected";

/// How cases are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StratificationMode {
    /// By the resolved value of one column.
    Field,
    /// Selected versus unselected cases.
    Selection,
}

/// One coloured group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendItem {
    pub color: String,
    pub case_ids: Vec<String>,
    pub row_value: RowValue,
}

/// A partition of a case collection into legend items.
///
/// Every input case is in exactly one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stratification {
    pub mode: StratificationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_type_col_id: Option<String>,
    pub legend_items: Vec<LegendItem>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl Stratification {
    fn new(
        mode: StratificationMode,
        case_type_col_id: Option<String>,
        legend_items: Vec<LegendItem>,
    ) -> Self {
        let positions = legend_items
            .iter()
            .enumerate()
            .flat_map(|(index, item)| item.case_ids.iter().map(move |id| (id.clone(), index)))
            .collect();
        Self {
            mode,
            case_type_col_id,
            legend_items,
            positions,
        }
    }

    /// Index of the legend item containing a case.
    pub fn position_of(&self, case_id: &str) -> Option<usize> {
        self.positions.get(case_id).copied()
    }

    /// Legend item containing a case.
    pub fn legend_item_of(&self, case_id: &str) -> Option<&LegendItem> {
        self.position_of(case_id)
            .and_then(|index| self.legend_items.get(index))
    }

    /// Colour of a case.
    pub fn color_of(&self, case_id: &str) -> Option<&str> {
        self.legend_item_of(case_id).map(|item| item.color.as_str())
    }

    /// Number of cases across all legend items.
    pub fn case_count(&self) -> usize {
        self.legend_items.iter().map(|item| item.case_ids.len()).sum()
    }
}

/// Stratify a case collection.
///
/// `None` mode disables stratification. Field mode without a column cannot be
/// computed and also yields `None`. Legend items in field mode follow the
/// first-seen order of values, with the missing-value group last.
pub fn stratify<'c>(
    mode: Option<StratificationMode>,
    case_type_col: Option<&CaseTypeCol>,
    cases: impl IntoIterator<Item = &'c Case>,
    selected_ids: &[String],
    resolver: &RowValueResolver<'_>,
) -> Option<Stratification> {
    match mode? {
        StratificationMode::Field => {
            let Some(case_type_col) = case_type_col else {
                tracing::debug!("field stratification requested without a column");
                return None;
            };
            Some(stratify_by_field(case_type_col, cases, resolver))
        }
        StratificationMode::Selection => Some(stratify_by_selection(cases, selected_ids, resolver)),
    }
}

fn stratify_by_field<'c>(
    case_type_col: &CaseTypeCol,
    cases: impl IntoIterator<Item = &'c Case>,
    resolver: &RowValueResolver<'_>,
) -> Stratification {
    let mut groups: IndexMap<String, (RowValue, Vec<String>)> = IndexMap::new();
    let mut missing: Option<(RowValue, Vec<String>)> = None;

    for case in cases {
        let row_value = resolver.resolve(case, case_type_col);
        if row_value.is_missing {
            missing
                .get_or_insert_with(|| (RowValue::missing(None, resolver.config()), Vec::new()))
                .1
                .push(case.id.clone());
        } else {
            groups
                .entry(row_value.long.clone())
                .or_insert_with(|| (row_value, Vec::new()))
                .1
                .push(case.id.clone());
        }
    }

    let config = resolver.config();
    let legend_items: Vec<_> = groups
        .into_values()
        .chain(missing)
        .enumerate()
        .map(|(index, (row_value, case_ids))| LegendItem {
            color: config.color_at(index).to_string(),
            case_ids,
            row_value,
        })
        .collect();

    tracing::debug!(
        case_type_col = %case_type_col.id,
        legend_items = legend_items.len(),
        "stratified by field"
    );
    Stratification::new(
        StratificationMode::Field,
        Some(case_type_col.id.clone()),
        legend_items,
    )
}

fn stratify_by_selection<'c>(
    cases: impl IntoIterator<Item = &'c Case>,
    selected_ids: &[String],
    resolver: &RowValueResolver<'_>,
) -> Stratification {
    let selected_set: HashSet<&str> = selected_ids.iter().map(String::as_str).collect();
    let (selected, unselected): (Vec<&Case>, Vec<&Case>) = cases
        .into_iter()
        .partition(|case| selected_set.contains(case.id.as_str()));

    let config = resolver.config();
    let group = |index: usize, raw: &str, label: &str, members: Vec<&Case>| LegendItem {
        color: config.color_at(index).to_string(),
        case_ids: members.into_iter().map(|c| c.id.clone()).collect(),
        row_value: RowValue {
            raw: Some(raw.to_string()),
            short: label.to_string(),
            long: label.to_string(),
            full: label.to_string(),
            is_missing: false,
        },
    };

    Stratification::new(
        StratificationMode::Selection,
        None,
        vec![
            group(0, SELECTED_VALUE, "Selected", selected),
            group(1, UNSELECTED_VALUE, "Unselected", unselected),
        ],
    )
}
