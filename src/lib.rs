//! ukaccounts - UK company accounts to CSV
//!
//! Pulls a fixed set of UK GAAP figures out of inline XBRL (XHTML) and
//! legacy XBRL (XML) filings and emits one row per filing.
//!
//! Licensed under AGPL-3.0

pub mod context;
pub mod driver;
pub mod facts;
pub mod filing;
pub mod model;
pub mod namespace;
pub mod output;
pub mod parser;
pub mod period;

pub use driver::{Extractor, ExtractorConfig, RunSummary};
pub use filing::{extract_document, extract_file, FilingName};
pub use model::{AccountsRow, ConceptValue, Document, FilingFormat, Period, GAAP_CONCEPTS};
pub use output::{OutputFormat, RowWriter};
pub use parser::Parser;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Unrecognised filing name: {0}")]
    FilenameFormat(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
