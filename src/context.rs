//! XBRL context resolution
//!
//! Maps every `xbrli:context` id to the period it reports on. Contexts that
//! carry an entity segment, or whose period cannot be read, map to `None`.

use crate::model::{ns, Document, NodeId, Period};
use ahash::AHashMap;
use chrono::NaiveDate;
use compact_str::CompactString;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct ContextMap {
    periods: AHashMap<CompactString, Option<Period>>,
}

impl ContextMap {
    pub fn from_document(doc: &Document) -> Self {
        let mut periods = AHashMap::new();

        for ctx in doc.find_all(ns::XBRLI, "context") {
            let Some(id) = doc.element(ctx).attribute("id") else {
                warn!("context element without an id, ignoring");
                continue;
            };
            let period = if has_segment(doc, ctx) {
                None
            } else {
                context_period(doc, ctx)
            };
            if period.is_none() {
                debug!(context = id, "context excluded");
            }
            periods.insert(CompactString::from(id), period);
        }

        Self { periods }
    }

    /// Usable period for a context reference. `None` covers both unknown
    /// ids and excluded contexts.
    pub fn period(&self, id: &str) -> Option<Period> {
        self.periods.get(id).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

fn has_segment(doc: &Document, ctx: NodeId) -> bool {
    doc.child(ctx, ns::XBRLI, "entity")
        .and_then(|entity| doc.child(entity, ns::XBRLI, "segment"))
        .is_some()
}

fn context_period(doc: &Document, ctx: NodeId) -> Option<Period> {
    let period = doc.child(ctx, ns::XBRLI, "period")?;
    let date_of = |local: &str| {
        doc.child(period, ns::XBRLI, local)
            .and_then(|id| parse_date(&doc.element(id).text))
    };

    if doc.child(period, ns::XBRLI, "instant").is_some() {
        return date_of("instant").map(Period::instant);
    }
    Some(Period::range(date_of("startDate")?, date_of("endDate")?))
}

/// Parses an XBRL date. A trailing time part (`2012-03-31T00:00:00`) is
/// ignored.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date = text.split_once('T').map_or(text, |(date, _)| date);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
