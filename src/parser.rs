//! Namespace-aware document loader
//!
//! Builds an element arena in a single pass over quick-xml events while
//! tracking namespace declarations as a stack of scopes. Inline XBRL filings
//! are XHTML, so common HTML named entities are accepted as well.

use crate::model::{Attribute, Document, Element, NodeId};
use crate::namespace::{Binding, ScopeId, ScopeTable};
use crate::{Error, Result};
use compact_str::CompactString;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::path::Path;

pub struct Parser {
    html_entities: bool,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            html_entities: true,
        }
    }

    /// Accept HTML named entities such as `&nbsp;` (enabled by default).
    pub fn with_html_entities(mut self, enabled: bool) -> Self {
        self.html_entities = enabled;
        self
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let content = std::fs::read(path)?;
        self.parse_bytes(&content)
    }

    pub fn parse_str(&self, content: &str) -> Result<Document> {
        self.parse_bytes(content.as_bytes())
    }

    pub fn parse_bytes(&self, data: &[u8]) -> Result<Document> {
        // Skip BOM if present
        let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
            &data[3..]
        } else {
            data
        };

        TreeBuilder::new(self.html_entities).build(data)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

struct TreeBuilder {
    elements: Vec<Element>,
    scopes: ScopeTable,
    open: Vec<NodeId>,
    html_entities: bool,
}

impl TreeBuilder {
    fn new(html_entities: bool) -> Self {
        Self {
            elements: Vec::with_capacity(1024),
            scopes: ScopeTable::new(),
            open: Vec::with_capacity(32),
            html_entities,
        }
    }

    fn build(mut self, data: &[u8]) -> Result<Document> {
        let mut reader = Reader::from_reader(data);

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let id = self.open_element(&e)?;
                    self.open.push(id);
                }
                Event::Empty(e) => {
                    let id = self.open_element(&e)?;
                    self.close_element(id);
                }
                Event::End(_) => {
                    let id = self
                        .open
                        .pop()
                        .ok_or_else(|| Error::Parse("Unexpected closing tag".to_string()))?;
                    self.close_element(id);
                }
                Event::Text(e) => {
                    let raw = std::str::from_utf8(&e)
                        .map_err(|_| Error::Parse("Invalid UTF-8 in text content".to_string()))?;
                    let text = self.unescape(raw)?;
                    self.append_text(&text);
                }
                Event::CData(e) => {
                    let text = std::str::from_utf8(&e)
                        .map_err(|_| Error::Parse("Invalid UTF-8 in CDATA".to_string()))?;
                    self.append_text(text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(&unclosed) = self.open.last() {
            let element = &self.elements[unclosed.0 as usize];
            return Err(Error::Parse(format!(
                "Unclosed element <{}> at end of document",
                qualified(&element.prefix, &element.local_name)
            )));
        }
        if self.elements.is_empty() {
            return Err(Error::Parse("Document has no root element".to_string()));
        }

        Ok(Document {
            elements: self.elements,
            scopes: self.scopes,
        })
    }

    fn open_element(&mut self, start: &BytesStart<'_>) -> Result<NodeId> {
        let parent = self.open.last().copied();
        if parent.is_none() && !self.elements.is_empty() {
            return Err(Error::Parse("Multiple root elements".to_string()));
        }

        let mut declared = Vec::new();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = utf8(attr.key.as_ref(), "attribute name")?;
            let raw = utf8(&attr.value, "attribute value")?;
            let value = self.unescape(raw)?.into_owned();

            if key == "xmlns" {
                declared.push(Binding {
                    uri: value.into(),
                    prefix: CompactString::default(),
                });
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declared.push(Binding {
                    uri: value.into(),
                    prefix: prefix.into(),
                });
            } else {
                attributes.push(Attribute {
                    name: key.into(),
                    value,
                });
            }
        }

        let parent_scope = parent
            .map(|p| self.elements[p.0 as usize].scope)
            .unwrap_or_else(|| self.scopes.root());
        let scope: ScopeId = self.scopes.enter(parent_scope, declared);

        let name = start.name();
        let prefix = match name.prefix() {
            Some(p) => utf8(p.into_inner(), "element prefix")?,
            None => "",
        };
        let local_name = utf8(name.local_name().into_inner(), "element name")?;

        let namespace = match self.scopes.get(scope).uri_for(prefix) {
            Some(uri) => Some(CompactString::from(uri)),
            None if prefix.is_empty() => None,
            None => {
                return Err(Error::Parse(format!(
                    "Unbound namespace prefix '{}' on <{}:{}>",
                    prefix, prefix, local_name
                )))
            }
        };

        let id = NodeId(self.elements.len() as u32);
        self.elements.push(Element {
            prefix: prefix.into(),
            local_name: local_name.into(),
            namespace,
            attributes,
            scope,
            parent,
            children: Vec::new(),
            text: String::new(),
            tail: String::new(),
            subtree_end: id.0 + 1,
        });
        if let Some(parent) = parent {
            self.elements[parent.0 as usize].children.push(id);
        }

        Ok(id)
    }

    fn close_element(&mut self, id: NodeId) {
        let end = self.elements.len() as u32;
        self.elements[id.0 as usize].subtree_end = end;
    }

    /// Text lands in the open element's `text` until it has a child, then in
    /// the last child's `tail`. Text outside the root is dropped.
    fn append_text(&mut self, text: &str) {
        let Some(&current) = self.open.last() else {
            return;
        };
        let last_child = self.elements[current.0 as usize].children.last().copied();
        match last_child {
            Some(child) => self.elements[child.0 as usize].tail.push_str(text),
            None => self.elements[current.0 as usize].text.push_str(text),
        }
    }

    fn unescape<'s>(&self, raw: &'s str) -> Result<Cow<'s, str>> {
        let html = self.html_entities;
        unescape_with(raw, |entity| {
            xml_entity(entity).or_else(|| if html { html_entity(entity) } else { None })
        })
        .map_err(|e| Error::Parse(format!("Bad character reference: {}", e)))
    }
}

fn utf8<'b>(bytes: &'b [u8], what: &str) -> Result<&'b str> {
    std::str::from_utf8(bytes).map_err(|_| Error::Parse(format!("Invalid UTF-8 in {}", what)))
}

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

fn xml_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => None,
    }
}

fn html_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some("\u{a0}"),
        "pound" => Some("£"),
        "euro" => Some("€"),
        "copy" => Some("©"),
        "reg" => Some("®"),
        "ndash" => Some("–"),
        "mdash" => Some("—"),
        "lsquo" => Some("‘"),
        "rsquo" => Some("’"),
        "ldquo" => Some("“"),
        "rdquo" => Some("”"),
        "hellip" => Some("…"),
        "bull" => Some("•"),
        "middot" => Some("·"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root xmlns="urn:default" xmlns:a="urn:a">
  <a:left xmlns:g="urn:gaap-one">
    <g:item>1</g:item>
  </a:left>
  <a:right xmlns:g="urn:gaap-two" xmlns:h="urn:gaap-one">
    <h:item>2</h:item>
    <empty/>
  </a:right>
</root>"#;

    fn first(doc: &Document, local: &str) -> NodeId {
        doc.descendants(doc.root())
            .find(|&id| doc.element(id).local_name == local)
            .unwrap()
    }

    #[test]
    fn test_resolves_element_namespaces_per_subtree() {
        let doc = Parser::new().parse_str(NESTED).unwrap();

        assert!(doc.element(doc.root()).is("urn:default", "root"));
        let items: Vec<_> = doc.find_all("urn:gaap-one", "item").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(doc.element(items[0]).prefix, "g");
        assert_eq!(doc.element(items[1]).prefix, "h");
        assert_eq!(doc.find_all("urn:gaap-two", "item").count(), 0);

        let empty = first(&doc, "empty");
        assert!(doc.element(empty).is("urn:default", "empty"));
    }

    #[test]
    fn test_scope_lookup_per_element() {
        let doc = Parser::new().parse_str(NESTED).unwrap();
        let left = first(&doc, "left");
        let right = first(&doc, "right");

        assert_eq!(doc.scope(left).uri_for("g"), Some("urn:gaap-one"));
        assert_eq!(doc.scope(right).uri_for("h"), Some("urn:gaap-one"));
        assert_eq!(doc.scope(right).uri_for("g"), Some("urn:gaap-two"));
        assert_eq!(doc.scope(doc.root()).uri_for("g"), None);
        assert_eq!(doc.scope(doc.root()).uri_for(""), Some("urn:default"));
    }

    #[test]
    fn test_text_and_tail() {
        let doc = Parser::new()
            .parse_str("<p>Acme <b>Widgets</b> Limited<i/>!</p>")
            .unwrap();
        let root = doc.element(doc.root());
        assert_eq!(root.text, "Acme ");
        let bold = doc.element(root.children[0]);
        assert_eq!(bold.text, "Widgets");
        assert_eq!(bold.tail, " Limited");
        assert_eq!(doc.element(root.children[1]).tail, "!");
    }

    #[test]
    fn test_descendants_cover_subtree_only() {
        let doc = Parser::new()
            .parse_str("<r><a><b/><c><d/></c></a><e/></r>")
            .unwrap();
        let a = first(&doc, "a");
        let names: Vec<_> = doc
            .descendants(a)
            .map(|id| doc.element(id).local_name.to_string())
            .collect();
        assert_eq!(names, ["b", "c", "d"]);
        assert_eq!(doc.descendants(doc.root()).count(), 5);
    }

    #[test]
    fn test_html_entities() {
        let doc = Parser::new()
            .parse_str("<p>&pound;1&nbsp;000 &amp; more</p>")
            .unwrap();
        assert_eq!(doc.element(doc.root()).text, "£1\u{a0}000 & more");

        let strict = Parser::new().with_html_entities(false);
        assert!(strict.parse_str("<p>&nbsp;</p>").is_err());
    }

    #[test]
    fn test_namespaced_attribute_lookup() {
        let doc = Parser::new()
            .parse_str(r#"<f xmlns:x="http://www.w3.org/2001/XMLSchema-instance" x:nil="true"/>"#)
            .unwrap();
        assert_eq!(
            doc.attribute_ns(doc.root(), crate::model::ns::XSI, "nil"),
            Some("true")
        );
        assert_eq!(doc.element(doc.root()).attribute("x:nil"), Some("true"));
    }

    #[test]
    fn test_rejects_malformed_documents() {
        let parser = Parser::new();
        assert!(parser.parse_str("<a><b></a>").is_err());
        assert!(parser.parse_str("<a><b/>").is_err());
        assert!(matches!(parser.parse_str("<a/><b/>"), Err(Error::Parse(_))));
        assert!(matches!(parser.parse_str("<x:a/>"), Err(Error::Parse(_))));
        assert!(matches!(parser.parse_str("   "), Err(Error::Parse(_))));
    }

    #[test]
    fn test_skips_byte_order_mark() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(b"<a>x</a>");
        let doc = Parser::new().parse_bytes(&data).unwrap();
        assert_eq!(doc.element(doc.root()).text, "x");
    }
}
