//! Per-filing extraction
//!
//! Filings are named `<RunCode>_<CompanyNumber>_<YYYYMMDD>.<html|xml>`,
//! e.g. `Prod224_0012_01234567_20120331.html` or
//! `Prod224_1234567_20120331.xml`. The extension selects the format.

use crate::context::ContextMap;
use crate::facts::{concept_facts, element_text, inline_text_fact};
use crate::model::{ns, AccountsRow, ConceptFigure, Document, FilingFormat, GAAP_CONCEPTS};
use crate::period::select_latest;
use crate::{Error, Parser, Result};
use regex::Regex;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

const INLINE_NAME_CONCEPT: &str = "EntityCurrentLegalOrRegisteredName";
const LEGACY_NAME_ELEMENT: &str = "EntityCurrentLegalName";

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(Prod\d+(?:_\d+)?)_([^_]+)_(\d{8})\.(html|xml)$").expect("valid filename regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingName {
    pub run_code: String,
    pub company_number: String,
    /// Eight-digit `YYYYMMDD` date as it appears in the filename
    pub balance_sheet_date: String,
    pub format: FilingFormat,
}

impl FilingName {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::FilenameFormat(path.display().to_string()))?;
        file_name.parse()
    }
}

impl FromStr for FilingName {
    type Err = Error;

    fn from_str(file_name: &str) -> Result<Self> {
        let caps = filename_pattern()
            .captures(file_name)
            .ok_or_else(|| Error::FilenameFormat(file_name.to_string()))?;
        let format = FilingFormat::from_extension(&caps[4])
            .ok_or_else(|| Error::FilenameFormat(file_name.to_string()))?;

        Ok(Self {
            run_code: caps[1].to_string(),
            company_number: caps[2].to_string(),
            balance_sheet_date: caps[3].to_string(),
            format,
        })
    }
}

/// Loads and extracts one filing. The filename is checked before the file
/// is read.
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<AccountsRow> {
    let path = path.as_ref();
    let name = FilingName::from_path(path)?;
    debug!(path = %path.display(), format = %name.format, "loading filing");

    let doc = Parser::new().parse_file(path)?;
    extract_document(&name, &doc)
}

pub fn extract_document(name: &FilingName, doc: &Document) -> Result<AccountsRow> {
    let contexts = ContextMap::from_document(doc);
    let registered_name = registered_name(doc, name.format)?;

    let figures = GAAP_CONCEPTS
        .iter()
        .map(|&concept| {
            let facts = concept_facts(doc, &contexts, name.format, concept)?;
            Ok(ConceptFigure {
                concept,
                selected: select_latest(facts),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AccountsRow {
        company_number: name.company_number.clone(),
        balance_sheet_date: name.balance_sheet_date.clone(),
        registered_name,
        figures,
    })
}

/// Inline filings may omit the name; legacy filings must carry it.
fn registered_name(doc: &Document, format: FilingFormat) -> Result<Option<String>> {
    match format {
        FilingFormat::InlineHtml => Ok(inline_text_fact(doc, ns::UK_BUSINESS, INLINE_NAME_CONCEPT)),
        FilingFormat::LegacyXml => doc
            .find_all(ns::UK_GCD, LEGACY_NAME_ELEMENT)
            .next()
            .map(|id| Some(element_text(doc, id)))
            .ok_or_else(|| Error::Parse(format!("No {} element", LEGACY_NAME_ELEMENT))),
    }
}
