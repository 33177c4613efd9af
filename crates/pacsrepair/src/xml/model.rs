//! Payment document tree

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;

/// A parsed payment message
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document {
    pub root: Element,
}

/// A labeled node: tag, ordered attributes, ordered content
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Content>,
}

/// Element content node
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Content {
    Element(Element),
    Text(String),
}

impl Document {
    pub const fn new(root: Element) -> Self {
        Self { root }
    }

    /// Strip namespace prefixes from every tag in the tree
    pub fn normalize_namespaces(&mut self) {
        self.root.normalize_namespaces();
    }
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Create an element holding a single text run
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.set_text(text);
        element
    }

    /// Concatenation of the direct text runs
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Content::Text(text) => Some(text.as_str()),
                Content::Element(_) => None,
            })
            .collect()
    }

    /// Replace the direct text with `text`, keeping child elements.
    ///
    /// The new text is placed before the first child element. Setting an
    /// empty string removes the text entirely.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children
            .retain(|child| matches!(child, Content::Element(_)));
        if !text.is_empty() {
            self.children.insert(0, Content::Text(text));
        }
    }

    /// Drop all content and attributes
    pub fn clear(&mut self) {
        self.attributes.clear();
        self.children.clear();
    }

    /// Append a child element
    pub fn push_child(&mut self, child: Self) {
        self.children.push(Content::Element(child));
    }

    /// Builder form of [`push_child`](Self::push_child)
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.push_child(child);
        self
    }

    /// Direct child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|child| match child {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        })
    }

    /// Direct child elements, mutably
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Self> {
        self.children.iter_mut().filter_map(|child| match child {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set `name` as the first attribute, replacing any previous value
    pub fn set_leading_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.shift_remove(name);
        self.attributes.shift_insert(0, name.to_string(), value.into());
    }

    /// Strip namespace prefixes from this element and all descendants.
    ///
    /// `{uri}local` and `prefix:local` both become `local`. Namespace
    /// declarations are dropped unless their prefix is still used by a
    /// qualified attribute somewhere in the subtree (`xsi:schemaLocation`
    /// keeps `xmlns:xsi`). Running it twice is a no-op.
    pub fn normalize_namespaces(&mut self) {
        let mut used = BTreeSet::new();
        self.collect_attribute_prefixes(&mut used);
        self.strip_namespaces(&used);
    }

    fn collect_attribute_prefixes(&self, used: &mut BTreeSet<String>) {
        used.extend(
            self.attributes
                .keys()
                .filter_map(|name| name.split_once(':'))
                .filter(|(prefix, _)| *prefix != "xmlns")
                .map(|(prefix, _)| prefix.to_string()),
        );
        for child in self.elements() {
            child.collect_attribute_prefixes(used);
        }
    }

    fn strip_namespaces(&mut self, used: &BTreeSet<String>) {
        let local = local_name(&self.name);
        if local.len() != self.name.len() {
            self.name = local.to_string();
        }
        self.attributes.retain(|name, _| match name.strip_prefix("xmlns") {
            Some("") => false,
            Some(rest) => rest
                .strip_prefix(':')
                .is_some_and(|prefix| used.contains(prefix)),
            None => true,
        });
        for child in self.elements_mut() {
            child.strip_namespaces(used);
        }
    }
}

/// Local part of a possibly qualified tag name
pub fn local_name(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('{') {
        return rest.split_once('}').map_or(name, |(_, local)| local);
    }
    name.split_once(':').map_or(name, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("Dbtr"), "Dbtr");
        assert_eq!(local_name("doc:Dbtr"), "Dbtr");
        assert_eq!(
            local_name("{urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08}Dbtr"),
            "Dbtr"
        );
    }

    #[test]
    fn test_set_text_keeps_elements() {
        let mut element = Element::new("Purp");
        element.push_child(Element::with_text("Cd", "GDDS"));
        element.set_text("old");
        element.set_text("new");
        assert_eq!(element.text(), "new");
        assert_eq!(element.elements().count(), 1);
        assert!(matches!(element.children.first(), Some(Content::Text(_))));

        element.set_text("");
        assert_eq!(element.text(), "");
        assert_eq!(element.children.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut element = Element::with_text("PstlAdr", "x");
        element.attributes.insert("id".to_string(), "1".to_string());
        element.push_child(Element::new("AdrLine"));
        element.clear();
        assert!(element.children.is_empty());
        assert!(element.attributes.is_empty());
        assert_eq!(element.name, "PstlAdr");
    }

    #[test]
    fn test_leading_attribute() {
        let mut element = Element::new("AppHdr");
        element.attributes.insert("a".to_string(), "1".to_string());
        element.attributes.insert("xmlns".to_string(), "old".to_string());
        element.set_leading_attribute("xmlns", "new");
        let attrs: Vec<_> = element.attributes.iter().collect();
        assert_eq!(
            attrs,
            vec![
                (&"xmlns".to_string(), &"new".to_string()),
                (&"a".to_string(), &"1".to_string())
            ]
        );
    }

    #[test]
    fn test_normalize_namespaces() {
        let mut root = Element::new("{urn:x}Document");
        root.attributes.insert("xmlns".to_string(), "urn:x".to_string());
        root.attributes.insert("xmlns:h".to_string(), "urn:h".to_string());
        root.attributes.insert("Ccy".to_string(), "USD".to_string());
        root.push_child(Element::new("h:AppHdr"));
        root.normalize_namespaces();

        assert_eq!(root.name, "Document");
        assert_eq!(root.attribute("Ccy"), Some("USD"));
        assert_eq!(root.attributes.len(), 1);
        assert_eq!(root.elements().next().map(|e| e.name.as_str()), Some("AppHdr"));
    }

    #[test]
    fn test_normalize_keeps_used_declarations() {
        let mut root = Element::new("Document").with_child(Element::new("CdtTrfTxInf"));
        root.attributes
            .insert("xmlns:xsi".to_string(), "urn:xsi".to_string());
        root.attributes
            .insert("xmlns:doc".to_string(), "urn:doc".to_string());
        root.attributes
            .insert("xsi:schemaLocation".to_string(), "urn:x a.xsd".to_string());
        root.normalize_namespaces();
        let once = root.clone();
        root.normalize_namespaces();

        assert_eq!(root, once);
        let names: Vec<&str> = root.attributes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["xmlns:xsi", "xsi:schemaLocation"]);
    }

    #[test]
    fn test_with_child() {
        let element = Element::new("Dbtr")
            .with_child(Element::with_text("Nm", "ABC"))
            .with_child(Element::new("PstlAdr"));
        let tags: Vec<&str> = element.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(tags, vec!["Nm", "PstlAdr"]);
    }
}
