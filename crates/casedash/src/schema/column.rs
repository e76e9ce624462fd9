//! Column, dimension and their case-type bindings.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::types::{ColType, DimType};

/// A reusable typed field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Col {
    /// Column id.
    pub id: String,
    /// Short code, used as a fallback label.
    #[serde(default)]
    pub code: String,
    /// Storage and semantic type.
    pub col_type: ColType,
    /// Dimension this column measures.
    pub dim_id: String,
    /// Concept set backing categorical values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_set_id: Option<String>,
    /// Region set backing geographic values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_set_id: Option<String>,
    /// Protocol used to compute genetic distances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genetic_distance_protocol_id: Option<String>,
    /// Rank within the dimension; rank 1 is the preferred resolution.
    pub rank_in_dim: u32,
}

impl Col {
    /// Create a column with no reference sets.
    pub fn new(
        id: impl Into<String>,
        col_type: ColType,
        dim_id: impl Into<String>,
        rank_in_dim: u32,
    ) -> Self {
        let id = id.into();
        Self {
            code: id.clone(),
            id,
            col_type,
            dim_id: dim_id.into(),
            concept_set_id: None,
            region_set_id: None,
            genetic_distance_protocol_id: None,
            rank_in_dim,
        }
    }

    /// Back this column with a concept set.
    pub fn with_concept_set(mut self, concept_set_id: impl Into<String>) -> Self {
        self.concept_set_id = Some(concept_set_id.into());
        self
    }

    /// Back this column with a region set.
    pub fn with_region_set(mut self, region_set_id: impl Into<String>) -> Self {
        self.region_set_id = Some(region_set_id.into());
        self
    }
}

/// A semantic axis grouping columns that describe the same concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dim {
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub dim_type: DimType,
}

impl Dim {
    /// Create a dimension.
    pub fn new(id: impl Into<String>, dim_type: DimType) -> Self {
        let id = id.into();
        Self {
            code: id.clone(),
            id,
            label: None,
            dim_type,
        }
    }

    /// Label shown to users, falling back to the code.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.code)
    }
}

/// A column bound into a case type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseTypeCol {
    pub id: String,
    pub col_id: String,
    /// Occurrence number for repeated columns (e.g. second vaccination).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<u32>,
    /// User-facing label.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_datetime: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_datetime: Option<NaiveDateTime>,
    /// Column holding the genetic sequence this column relates to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genetic_sequence_case_type_col_id: Option<String>,
}

impl CaseTypeCol {
    /// Create a binding with no bounds.
    pub fn new(id: impl Into<String>, col_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            col_id: col_id.into(),
            occurrence: None,
            label: label.into(),
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            min_datetime: None,
            max_datetime: None,
            genetic_sequence_case_type_col_id: None,
        }
    }
}

/// The ordered columns of one dimension within a case type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseTypeDim {
    pub id: String,
    pub dim_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<u32>,
    pub case_type_col_order: Vec<String>,
}

impl CaseTypeDim {
    /// Create a dimension binding.
    pub fn new(id: impl Into<String>, dim_id: impl Into<String>, order: Vec<String>) -> Self {
        Self {
            id: id.into(),
            dim_id: dim_id.into(),
            occurrence: None,
            case_type_col_order: order,
        }
    }
}
