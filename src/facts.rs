//! Fact extraction and numeric normalization
//!
//! Inline filings tag figures with `ix:nonFraction name="prefix:Concept"`,
//! where the prefix must resolve to the UK GAAP core taxonomy at that
//! element. Legacy filings use the concept element itself in the UK GAAP
//! taxonomy namespace.

use crate::context::ContextMap;
use crate::model::{ns, Document, FilingFormat, NodeId, Period};
use crate::{Error, Result};

/// Every usable `(period, value)` for `concept`, in document order.
///
/// Facts whose context is unknown or excluded are skipped, as are nil facts.
/// Malformed numbers and missing `contextRef` attributes are errors.
pub fn concept_facts(
    doc: &Document,
    contexts: &ContextMap,
    format: FilingFormat,
    concept: &str,
) -> Result<Vec<(Period, f64)>> {
    let mut found = Vec::new();

    for id in matching_facts(doc, format, concept) {
        if is_nil(doc, id) {
            continue;
        }
        let context_ref = doc.element(id).attribute("contextRef").ok_or_else(|| {
            Error::Extraction(format!("{} fact without contextRef", concept))
        })?;
        let Some(period) = contexts.period(context_ref) else {
            continue;
        };
        found.push((period, numeric_value(doc, id)?));
    }

    Ok(found)
}

fn matching_facts<'a>(
    doc: &'a Document,
    format: FilingFormat,
    concept: &'a str,
) -> Box<dyn Iterator<Item = NodeId> + 'a> {
    match format {
        FilingFormat::InlineHtml => Box::new(
            doc.find_all(ns::INLINE_XBRL, "nonFraction")
                .filter(move |&id| names_concept(doc, id, ns::UK_GAAP_CORE, concept)),
        ),
        FilingFormat::LegacyXml => Box::new(doc.find_all(ns::UK_GAAP_PT, concept)),
    }
}

/// True when the inline fact's `name` is `<prefix>:<concept>` and `<prefix>`
/// is bound to `namespace` at that element.
pub fn names_concept(doc: &Document, id: NodeId, namespace: &str, concept: &str) -> bool {
    doc.element(id)
        .attribute("name")
        .and_then(|name| name.split_once(':'))
        .is_some_and(|(prefix, local)| {
            local == concept && doc.scope(id).uri_for(prefix) == Some(namespace)
        })
}

fn is_nil(doc: &Document, id: NodeId) -> bool {
    matches!(
        doc.attribute_ns(id, ns::XSI, "nil").map(str::trim),
        Some("true") | Some("1")
    )
}

/// Reads a fact's text, `sign` and `scale` and normalizes it.
pub fn numeric_value(doc: &Document, id: NodeId) -> Result<f64> {
    let element = doc.element(id);
    let negative = element.attribute("sign").map(str::trim) == Some("-");
    let scale = match element.attribute("scale") {
        Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
            Error::Extraction(format!("Invalid scale '{}' on {}", raw, element.local_name))
        })?,
        None => 0,
    };

    normalize(&subtree_text(doc, id, ""), negative, scale)
}

/// `sign × number(text without whitespace and commas) × 10^scale`.
/// A bare `-` is zero whatever the sign.
pub fn normalize(text: &str, negative: bool, scale: i32) -> Result<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned == "-" {
        return Ok(0.0);
    }

    let magnitude = cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Extraction(format!("Malformed numeric value '{}'", text.trim())))?;

    let signed = if negative { -magnitude } else { magnitude };
    // Dividing keeps negative scales exact for values like 1234 × 10^-2
    let value = if scale >= 0 {
        signed * 10f64.powi(scale)
    } else {
        signed / 10f64.powi(-scale)
    };
    if !value.is_finite() {
        return Err(Error::Extraction(format!(
            "Value '{}' out of range at scale {}",
            text.trim(),
            scale
        )));
    }
    Ok(value)
}

/// Text and tails below `id` in document order, excluding `id`'s own tail.
/// `separator` follows each descendant's tail.
fn subtree_text(doc: &Document, id: NodeId, separator: &str) -> String {
    let mut out = String::new();
    let mut open: Vec<NodeId> = Vec::new();

    for node in std::iter::once(id).chain(doc.descendants(id)) {
        while let Some(&top) = open.last() {
            if doc.element(top).subtree_end > node.0 {
                break;
            }
            open.pop();
            out.push_str(&doc.element(top).tail);
            out.push_str(separator);
        }
        out.push_str(&doc.element(node).text);
        open.push(node);
    }
    while open.len() > 1 {
        if let Some(top) = open.pop() {
            out.push_str(&doc.element(top).tail);
            out.push_str(separator);
        }
    }
    out
}

/// Text of an element, its descendants and its own tail, whitespace
/// collapsed. A space follows each child element and its tail.
pub fn element_text(doc: &Document, id: NodeId) -> String {
    let mut raw = subtree_text(doc, id, " ");
    raw.push_str(&doc.element(id).tail);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Last inline `ix:nonNumeric` tagged as `<prefix>:<concept>` in `namespace`.
pub fn inline_text_fact(doc: &Document, namespace: &str, concept: &str) -> Option<String> {
    doc.find_all(ns::INLINE_XBRL, "nonNumeric")
        .filter(|&id| names_concept(doc, id, namespace, concept))
        .last()
        .map(|id| element_text(doc, id))
}
