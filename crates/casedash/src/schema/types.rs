//! Core type definitions for case type schemas.

use serde::{Deserialize, Serialize};

use super::time::TimeResolution;

/// Storage and semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColType {
    /// Free text.
    Text,
    /// Direct identifier (e.g. a lab sample number).
    IdDirect,
    /// Pseudonymised identifier.
    IdPseudonymised,
    /// Anonymised identifier.
    IdAnonymised,
    /// Text constrained by a regular expression.
    Regex,
    /// Unordered categories from a concept set.
    Nominal,
    /// Ordered categories from a concept set.
    Ordinal,
    /// Numeric intervals expressed as concepts.
    Interval,
    /// Region id from a region set.
    GeoRegion,
    /// Latitude/longitude pair.
    GeoLatlon,
    /// Organization id.
    Organization,
    TimeDay,
    TimeWeek,
    TimeMonth,
    TimeQuarter,
    TimeYear,
    #[serde(rename = "DECIMAL_0")]
    Decimal0,
    #[serde(rename = "DECIMAL_1")]
    Decimal1,
    #[serde(rename = "DECIMAL_2")]
    Decimal2,
    #[serde(rename = "DECIMAL_3")]
    Decimal3,
    #[serde(rename = "DECIMAL_4")]
    Decimal4,
    #[serde(rename = "DECIMAL_5")]
    Decimal5,
    #[serde(rename = "DECIMAL_6")]
    Decimal6,
    /// Genetic sequence id, resolved by the tree widget.
    GeneticSequence,
    /// Genetic distance to a reference, never filtered or stratified.
    GeneticDistance,
}

impl ColType {
    /// Number of fraction digits for decimal types.
    pub fn decimal_places(&self) -> Option<usize> {
        match self {
            ColType::Decimal0 => Some(0),
            ColType::Decimal1 => Some(1),
            ColType::Decimal2 => Some(2),
            ColType::Decimal3 => Some(3),
            ColType::Decimal4 => Some(4),
            ColType::Decimal5 => Some(5),
            ColType::Decimal6 => Some(6),
            _ => None,
        }
    }

    /// Calendar resolution of a time column.
    pub fn time_resolution(&self) -> Option<TimeResolution> {
        match self {
            ColType::TimeDay => Some(TimeResolution::Day),
            ColType::TimeWeek => Some(TimeResolution::Week),
            ColType::TimeMonth => Some(TimeResolution::Month),
            ColType::TimeQuarter => Some(TimeResolution::Quarter),
            ColType::TimeYear => Some(TimeResolution::Year),
            _ => None,
        }
    }

    /// Whether a column of this type may appear in the filter panel.
    pub fn is_filterable(&self) -> bool {
        !matches!(self, ColType::GeneticDistance)
    }

    /// Whether a column of this type may be offered for stratification.
    pub fn is_stratifiable(&self) -> bool {
        match self {
            ColType::IdDirect
            | ColType::IdPseudonymised
            | ColType::IdAnonymised
            | ColType::GeoLatlon
            | ColType::GeneticSequence
            | ColType::GeneticDistance => false,
            ColType::Text
            | ColType::Regex
            | ColType::Nominal
            | ColType::Ordinal
            | ColType::Interval
            | ColType::GeoRegion
            | ColType::Organization
            | ColType::TimeDay
            | ColType::TimeWeek
            | ColType::TimeMonth
            | ColType::TimeQuarter
            | ColType::TimeYear
            | ColType::Decimal0
            | ColType::Decimal1
            | ColType::Decimal2
            | ColType::Decimal3
            | ColType::Decimal4
            | ColType::Decimal5
            | ColType::Decimal6 => true,
        }
    }
}

/// Semantic axis of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimType {
    Time,
    Geo,
    Text,
    Number,
    Organization,
    Other,
}

impl DimType {
    /// Get a human-readable label for the dimension type.
    pub fn label(&self) -> &'static str {
        match self {
            DimType::Time => "Time",
            DimType::Geo => "Geography",
            DimType::Text => "Text",
            DimType::Number => "Number",
            DimType::Organization => "Organization",
            DimType::Other => "Other",
        }
    }
}
