//! Filter derivation, values and evaluation.

mod derive;
mod model;
mod state;

pub use derive::{create_filter_dimensions, create_filters};
pub use model::{
    Filter, FilterDimension, FilterKind, FilterMode, FilterValue, RemoteFilter, SelectOption,
    SELECTION_FILTER_ID, TREE_FILTER_ID,
};
pub use state::FilterState;
