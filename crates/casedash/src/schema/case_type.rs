//! The complete schema of one case type.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::column::{CaseTypeCol, CaseTypeDim, Col, Dim};
use super::types::DimType;

/// Protocol used to compute a genetic distance column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticDistanceProtocol {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seqdb_seq_distance_protocol_id: Option<String>,
}

/// A structural problem in an externally authored schema.
///
/// Issues are reported, never raised: the engines skip the affected entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaIssue {
    /// A case type column references a column that is not in the schema.
    MissingCol { case_type_col_id: String, col_id: String },
    /// A dimension binding references an unknown case type column.
    MissingCaseTypeCol { case_type_dim_id: String, case_type_col_id: String },
    /// A dimension binding references an unknown dimension.
    MissingDim { case_type_dim_id: String, dim_id: String },
    /// A dimension binding lists no columns.
    EmptyDim { case_type_dim_id: String },
    /// A case type column belongs to no dimension.
    OrphanCaseTypeCol { case_type_col_id: String },
    /// A case type column belongs to more than one dimension.
    DuplicateCaseTypeCol { case_type_col_id: String },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::MissingCol { case_type_col_id, col_id } => {
                write!(f, "case type column '{case_type_col_id}' references unknown column '{col_id}'")
            }
            SchemaIssue::MissingCaseTypeCol { case_type_dim_id, case_type_col_id } => write!(
                f,
                "dimension '{case_type_dim_id}' lists unknown case type column '{case_type_col_id}'"
            ),
            SchemaIssue::MissingDim { case_type_dim_id, dim_id } => {
                write!(f, "dimension binding '{case_type_dim_id}' references unknown dimension '{dim_id}'")
            }
            SchemaIssue::EmptyDim { case_type_dim_id } => {
                write!(f, "dimension '{case_type_dim_id}' has no columns")
            }
            SchemaIssue::OrphanCaseTypeCol { case_type_col_id } => {
                write!(f, "case type column '{case_type_col_id}' belongs to no dimension")
            }
            SchemaIssue::DuplicateCaseTypeCol { case_type_col_id } => {
                write!(f, "case type column '{case_type_col_id}' belongs to several dimensions")
            }
        }
    }
}

/// Full schema of a case type: dimensions, columns and their bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteCaseType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dims: IndexMap<String, Dim>,
    #[serde(default)]
    pub cols: IndexMap<String, Col>,
    #[serde(default)]
    pub case_type_cols: IndexMap<String, CaseTypeCol>,
    /// Dimension bindings in display order.
    #[serde(default)]
    pub case_type_dims: Vec<CaseTypeDim>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub genetic_distance_protocols: IndexMap<String, GeneticDistanceProtocol>,
}

impl CompleteCaseType {
    /// Create an empty case type.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a dimension.
    pub fn with_dim(mut self, dim: Dim) -> Self {
        self.dims.insert(dim.id.clone(), dim);
        self
    }

    /// Add a column.
    pub fn with_col(mut self, col: Col) -> Self {
        self.cols.insert(col.id.clone(), col);
        self
    }

    /// Add a case type column.
    pub fn with_case_type_col(mut self, case_type_col: CaseTypeCol) -> Self {
        self.case_type_cols
            .insert(case_type_col.id.clone(), case_type_col);
        self
    }

    /// Append a dimension binding.
    pub fn with_case_type_dim(mut self, case_type_dim: CaseTypeDim) -> Self {
        self.case_type_dims.push(case_type_dim);
        self
    }

    /// Get a case type column by id.
    pub fn case_type_col(&self, id: &str) -> Option<&CaseTypeCol> {
        self.case_type_cols.get(id)
    }

    /// Get the column a case type column is bound to.
    pub fn col_of(&self, case_type_col: &CaseTypeCol) -> Option<&Col> {
        self.cols.get(&case_type_col.col_id)
    }

    /// Get the dimension of a dimension binding.
    pub fn dim_of(&self, case_type_dim: &CaseTypeDim) -> Option<&Dim> {
        self.dims.get(&case_type_dim.dim_id)
    }

    /// Get the dimension binding by id.
    pub fn case_type_dim(&self, id: &str) -> Option<&CaseTypeDim> {
        self.case_type_dims.iter().find(|d| d.id == id)
    }

    /// Find the dimension binding a case type column belongs to.
    pub fn case_type_dim_of(&self, case_type_col_id: &str) -> Option<&CaseTypeDim> {
        self.case_type_dims
            .iter()
            .find(|d| d.case_type_col_order.iter().any(|id| id == case_type_col_id))
    }

    /// Resolvable columns of a dimension binding, in order.
    ///
    /// Entries whose case type column or column is missing are skipped.
    pub fn columns_of<'a>(
        &'a self,
        case_type_dim: &'a CaseTypeDim,
    ) -> impl Iterator<Item = (&'a CaseTypeCol, &'a Col)> + 'a {
        case_type_dim.case_type_col_order.iter().filter_map(move |id| {
            let Some(case_type_col) = self.case_type_cols.get(id) else {
                tracing::warn!(
                    case_type_dim = %case_type_dim.id,
                    case_type_col = %id,
                    "skipping unknown case type column"
                );
                return None;
            };
            let Some(col) = self.col_of(case_type_col) else {
                tracing::warn!(
                    case_type_col = %id,
                    col = %case_type_col.col_id,
                    "skipping case type column with unknown column"
                );
                return None;
            };
            Some((case_type_col, col))
        })
    }

    /// The preferred column of a dimension binding.
    ///
    /// This is the first column whose `rank_in_dim` is 1, or the first
    /// resolvable column when none has that rank.
    pub fn preferred_column<'a>(&'a self, case_type_dim: &'a CaseTypeDim) -> Option<&'a CaseTypeCol> {
        let mut first = None;
        for (case_type_col, col) in self.columns_of(case_type_dim) {
            if col.rank_in_dim == 1 {
                return Some(case_type_col);
            }
            first.get_or_insert(case_type_col);
        }
        first
    }

    /// Dimension bindings whose dimension has the given type.
    pub fn case_type_dims_of_type(&self, dim_type: DimType) -> impl Iterator<Item = &CaseTypeDim> {
        self.case_type_dims.iter().filter(move |d| {
            self.dim_of(d)
                .is_some_and(|dim| dim.dim_type == dim_type)
        })
    }

    /// Report structural issues without failing.
    pub fn validate(&self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();

        for case_type_col in self.case_type_cols.values() {
            if self.col_of(case_type_col).is_none() {
                issues.push(SchemaIssue::MissingCol {
                    case_type_col_id: case_type_col.id.clone(),
                    col_id: case_type_col.col_id.clone(),
                });
            }
        }

        let mut memberships: HashMap<&str, usize> = HashMap::new();
        for case_type_dim in &self.case_type_dims {
            if self.dim_of(case_type_dim).is_none() {
                issues.push(SchemaIssue::MissingDim {
                    case_type_dim_id: case_type_dim.id.clone(),
                    dim_id: case_type_dim.dim_id.clone(),
                });
            }
            if case_type_dim.case_type_col_order.is_empty() {
                issues.push(SchemaIssue::EmptyDim {
                    case_type_dim_id: case_type_dim.id.clone(),
                });
            }
            for id in &case_type_dim.case_type_col_order {
                if !self.case_type_cols.contains_key(id) {
                    issues.push(SchemaIssue::MissingCaseTypeCol {
                        case_type_dim_id: case_type_dim.id.clone(),
                        case_type_col_id: id.clone(),
                    });
                }
                *memberships.entry(id.as_str()).or_default() += 1;
            }
        }

        for id in self.case_type_cols.keys() {
            match memberships.get(id.as_str()).copied().unwrap_or(0) {
                0 => issues.push(SchemaIssue::OrphanCaseTypeCol {
                    case_type_col_id: id.clone(),
                }),
                1 => {}
                _ => issues.push(SchemaIssue::DuplicateCaseTypeCol {
                    case_type_col_id: id.clone(),
                }),
            }
        }

        issues
    }
}
