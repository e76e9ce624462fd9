//! casedash: schema-driven analytics engine for epidemiological case dashboards.
//!
//! A case type schema, defined at runtime, is turned into a filter panel, a
//! colour-stable stratification of cases, epidemic curves binned at a time
//! resolution that fits the data, and a highlight channel that keeps
//! independent widgets in sync.
//!
//! # Core Principles
//!
//! - **Schema as data**: dimensions and columns are values, and every column
//!   type is handled by an exhaustive match
//! - **Pure engines**: filters, stratification and binning are recomputed from
//!   their inputs on every change
//! - **Local recovery**: inconsistent schema data is skipped and logged, never
//!   fatal
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use casedash::{Dashboard, DashboardContext, DashboardFiles, StratificationMode};
//!
//! let files = DashboardFiles {
//!     case_type: Path::new("case_type.json"),
//!     cases: Some(Path::new("cases.csv")),
//!     reference: Some(Path::new("reference.json")),
//! };
//! let today = chrono::Local::now().date_naive();
//! let (dashboard, _sources) = Dashboard::open(files, DashboardContext::default(), today).unwrap();
//!
//! let strat = dashboard.stratify(Some(StratificationMode::Field), Some("ctc_sex"));
//! let curve = dashboard.epi_curve(None, strat.as_ref()).unwrap();
//! println!("{} cases over {} intervals", curve.total(), curve.intervals.len());
//! ```

pub mod abort;
pub mod config;
pub mod context;
pub mod curve;
pub mod error;
pub mod filter;
pub mod highlight;
pub mod input;
pub mod reference;
pub mod schema;
pub mod source;
pub mod stratify;

mod dashboard;

pub use crate::dashboard::{Dashboard, DashboardFiles, DashboardSources};
pub use abort::{AbortController, AbortSignal};
pub use config::DashboardConfig;
pub use context::DashboardContext;
pub use curve::{EpiCurve, Series};
pub use error::{CurveUnavailable, DashError, Result};
pub use filter::{Filter, FilterDimension, FilterKind, FilterMode, FilterState, FilterValue, RemoteFilter};
pub use highlight::{HighlightBus, HighlightEvent, Subscription, Zone, ZoneHighlighter};
pub use input::SourceMetadata;
pub use reference::{LoadOutcome, ReferenceDataCache, ReferenceLoader, ReferenceRequest};
pub use schema::{Case, CompleteCaseType, ReferenceData, RowValue, RowValueResolver};
pub use source::{CaseSource, Completion, Invalidate, LatestRequest, QueryKey};
pub use stratify::{LegendItem, Stratification, StratificationMode};
