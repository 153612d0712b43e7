//! Per-element namespace scopes
//!
//! Every element in a loaded document points at a [`ScopeId`]. A scope holds
//! the complete, ordered list of `(uri, prefix)` bindings visible at that
//! element. Elements that declare nothing new share their parent's scope, so
//! the table only grows where a document actually redeclares something.

use compact_str::CompactString;

/// The `xml` prefix is bound implicitly in every document.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub uri: CompactString,
    /// Empty for the default namespace
    pub prefix: CompactString,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: Vec<Binding>,
}

impl Scope {
    /// URI bound to `prefix` (empty string for the default namespace). Later
    /// declarations shadow earlier ones.
    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}

/// Append-only table of scopes for one document.
#[derive(Debug, Clone)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// The empty scope in effect outside the root element.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Derives a child scope from `parent`. With no declarations the parent
    /// itself is returned.
    pub fn enter(&mut self, parent: ScopeId, declared: Vec<Binding>) -> ScopeId {
        if declared.is_empty() {
            return parent;
        }
        let mut bindings = self.get(parent).bindings.clone();
        bindings.extend(declared);
        self.scopes.push(Scope { bindings });
        ScopeId((self.scopes.len() - 1) as u32)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(uri: &str, prefix: &str) -> Binding {
        Binding {
            uri: uri.into(),
            prefix: prefix.into(),
        }
    }

    #[test]
    fn test_child_without_declarations_shares_parent_scope() {
        let mut table = ScopeTable::new();
        let outer = table.enter(table.root(), vec![binding("urn:a", "a")]);
        let inner = table.enter(outer, Vec::new());
        assert_eq!(outer, inner);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_redeclared_prefix_shadows_outer_binding() {
        let mut table = ScopeTable::new();
        let outer = table.enter(table.root(), vec![binding("urn:a", "p")]);
        let inner = table.enter(outer, vec![binding("urn:b", "p")]);

        assert_eq!(table.get(outer).uri_for("p"), Some("urn:a"));
        assert_eq!(table.get(inner).uri_for("p"), Some("urn:b"));
    }

    #[test]
    fn test_sibling_scopes_are_independent() {
        let mut table = ScopeTable::new();
        let root = table.enter(table.root(), vec![binding("urn:root", "r")]);
        let left = table.enter(root, vec![binding("urn:gaap", "g1")]);
        let right = table.enter(root, vec![binding("urn:gaap", "g2")]);

        assert_eq!(table.get(left).uri_for("g1"), Some("urn:gaap"));
        assert_eq!(table.get(left).uri_for("g2"), None);
        assert_eq!(table.get(right).uri_for("g2"), Some("urn:gaap"));
        assert_eq!(table.get(root).uri_for("g1"), None);
    }

    #[test]
    fn test_two_prefixes_may_alias_one_uri() {
        let mut table = ScopeTable::new();
        let scope = table.enter(
            table.root(),
            vec![binding("urn:gaap", "a"), binding("urn:gaap", "b")],
        );
        assert_eq!(table.get(scope).uri_for("a"), Some("urn:gaap"));
        assert_eq!(table.get(scope).uri_for("b"), Some("urn:gaap"));
    }

    #[test]
    fn test_default_namespace_can_be_undeclared() {
        let mut table = ScopeTable::new();
        let outer = table.enter(table.root(), vec![binding("urn:html", "")]);
        let inner = table.enter(outer, vec![binding("", "")]);
        assert_eq!(table.get(outer).uri_for(""), Some("urn:html"));
        assert_eq!(table.get(inner).uri_for(""), None);
        assert_eq!(table.get(inner).uri_for("xml"), Some(XML_NAMESPACE));
    }
}
