use chrono::NaiveDate;
use compact_str::CompactString;
use serde::Serialize;
use std::fmt;

use crate::namespace::{Scope, ScopeId, ScopeTable};

// ============================================================================
// Accounting concepts and namespaces
// ============================================================================

/// Concepts extracted from every filing, in output column order.
pub const GAAP_CONCEPTS: [&str; 12] = [
    "ProfitLossAccountReserve",
    "TangibleFixedAssetsCostOrValuation",
    "IntangibleFixedAssetsCostOrValuation",
    "TurnoverGrossOperatingRevenue",
    "CostSales",
    "GrossProfitLoss",
    "OperatingProfitLoss",
    "ProfitLossForPeriod",
    "InterestPayableSimilarCharges",
    "ProfitLossOnOrdinaryActivitiesBeforeTax",
    "TotalRecognisedGainLossForPeriod",
    "StaffCosts",
];

pub mod ns {
    pub const XBRLI: &str = "http://www.xbrl.org/2003/instance";
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    pub const INLINE_XBRL: &str = "http://www.xbrl.org/2008/inlineXBRL";
    pub const UK_GAAP_CORE: &str = "http://www.xbrl.org/uk/gaap/core/2009-09-01";
    pub const UK_BUSINESS: &str = "http://www.xbrl.org/uk/cd/business/2009-09-01";
    pub const UK_GAAP_PT: &str = "http://www.xbrl.org/uk/fr/gaap/pt/2004-12-01";
    pub const UK_GCD: &str = "http://www.xbrl.org/uk/fr/gcd/2004-12-01";
}

// ============================================================================
// XML element tree
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline(always)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    /// Qualified name as written, e.g. `contextRef` or `xsi:nil`
    pub name: CompactString,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub prefix: CompactString,
    pub local_name: CompactString,
    /// Resolved namespace URI, `None` when unqualified with no default namespace
    pub namespace: Option<CompactString>,
    pub attributes: Vec<Attribute>,
    pub scope: ScopeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Character data before the first child element
    pub text: String,
    /// Character data after this element's end tag, before the next sibling
    pub tail: String,
    /// Exclusive end of this element's subtree in document order
    pub(crate) subtree_end: u32,
}

impl Element {
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// A parsed document. Elements are stored in document order, so every
/// subtree occupies a contiguous index range.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) elements: Vec<Element>,
    pub(crate) scopes: ScopeTable,
}

impl Document {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.elements[id.index()]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Namespace bindings in effect at `id`.
    pub fn scope(&self, id: NodeId) -> &Scope {
        self.scopes.get(self.element(id).scope)
    }

    /// Attribute whose prefix resolves to `namespace` at this element.
    pub fn attribute_ns(&self, id: NodeId, namespace: &str, local_name: &str) -> Option<&str> {
        let element = self.element(id);
        let scope = self.scope(id);
        element.attributes.iter().find_map(|attr| {
            let (prefix, local) = attr.name.split_once(':')?;
            (local == local_name && scope.uri_for(prefix) == Some(namespace))
                .then_some(attr.value.as_str())
        })
    }

    /// All elements strictly below `id`, in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        ((id.0 + 1)..self.element(id).subtree_end).map(NodeId)
    }

    pub fn find_all<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        std::iter::once(self.root())
            .chain(self.descendants(self.root()))
            .filter(move |&id| self.element(id).is(namespace, local_name))
    }

    pub fn children<'a>(&'a self, id: NodeId) -> impl Iterator<Item = NodeId> + 'a {
        self.element(id).children.iter().copied()
    }

    pub fn child(&self, id: NodeId, namespace: &str, local_name: &str) -> Option<NodeId> {
        self.children(id)
            .find(|&c| self.element(c).is(namespace, local_name))
    }
}

// ============================================================================
// Filing data
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingFormat {
    /// Inline XBRL embedded in XHTML
    InlineHtml,
    /// Stand-alone XBRL instance document
    LegacyXml,
}

impl FilingFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "html" => Some(Self::InlineHtml),
            "xml" => Some(Self::LegacyXml),
            _ => None,
        }
    }
}

impl fmt::Display for FilingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InlineHtml => f.write_str("inline XBRL"),
            Self::LegacyXml => f.write_str("legacy XBRL"),
        }
    }
}

/// Reporting period. Instants are stored as `start == end`.
///
/// Ordering compares start date first and end date second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Period {
    #[serde(rename = "start_date")]
    pub start: NaiveDate,
    #[serde(rename = "end_date")]
    pub end: NaiveDate,
}

impl Period {
    pub fn instant(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConceptValue {
    #[serde(flatten)]
    pub period: Period,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptFigure {
    pub concept: &'static str,
    #[serde(flatten)]
    pub selected: Option<ConceptValue>,
}

/// One output row per successfully processed filing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountsRow {
    pub company_number: String,
    pub balance_sheet_date: String,
    pub registered_name: Option<String>,
    /// One entry per [`GAAP_CONCEPTS`] item, same order
    pub figures: Vec<ConceptFigure>,
}

impl AccountsRow {
    pub fn figure(&self, concept: &str) -> Option<&ConceptValue> {
        self.figures
            .iter()
            .find(|f| f.concept == concept)
            .and_then(|f| f.selected.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_period_orders_by_start_then_end() {
        let a = Period::range(date("2011-01-01"), date("2011-12-31"));
        let b = Period::range(date("2012-01-01"), date("2012-06-30"));
        let c = Period::range(date("2012-01-01"), date("2012-12-31"));
        assert!(a < b);
        assert!(b < c);
        assert_eq!(Period::instant(date("2012-03-31")), Period::range(date("2012-03-31"), date("2012-03-31")));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FilingFormat::from_extension("html"), Some(FilingFormat::InlineHtml));
        assert_eq!(FilingFormat::from_extension("xml"), Some(FilingFormat::LegacyXml));
        assert_eq!(FilingFormat::from_extension("xhtml"), None);
    }
}
