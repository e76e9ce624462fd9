//! Case type schemas, case records and display value resolution.

mod case;
mod case_type;
mod column;
mod reference;
mod row_value;
mod time;
mod types;

pub use case::Case;
pub use case_type::{CompleteCaseType, GeneticDistanceProtocol, SchemaIssue};
pub use column::{CaseTypeCol, CaseTypeDim, Col, Dim};
pub use reference::{Concept, ConceptSet, Organization, ReferenceData, Region, RegionSet};
pub use row_value::{resolve, RowValue, RowValueCache, RowValueResolver};
pub use time::{parse_date, parse_iso, parse_quarter, whole_months_between, TimeResolution};
pub use types::{ColType, DimType};
