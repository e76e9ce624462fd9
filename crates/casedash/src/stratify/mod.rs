//! Stratification: partitioning cases into coloured legend groups.

mod eligibility;
mod stratification;

pub use eligibility::{estimated_cardinality, stratifiable_columns};
pub use stratification::{
    stratify, LegendItem, Stratification, StratificationMode, SELECTED_VALUE, UNSELECTED_VALUE,
};
