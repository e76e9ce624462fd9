//! Epi curves: resolution selection and calendar binning.

mod binning;
mod resolution;

pub use binning::{bin, curve_for_dimension, interval_starts, Bucket, EpiCurve, Series};
pub use resolution::pick_resolution;
