//! Loading cases, case type schemas and reference data from files.

mod parser;
mod source;

pub use parser::{
    load_case_type, load_reference_data, CaseLoader, ParserConfig, COUNT_HEADER, ID_HEADER,
};
pub use source::{InputFormat, RawInput, SourceMetadata};
