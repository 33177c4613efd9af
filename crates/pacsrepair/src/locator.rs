//! Tag and path lookup over the document tree
//!
//! Paths are `/`-separated tag names such as `Dbtr/PstlAdr/AdrLine`. The first
//! segment is searched anywhere in the tree (document order, the starting
//! element included); every following segment must be a direct child of the
//! previous match.

use crate::xml::Element;

impl Element {
    /// First element with `tag` in document order, `self` included
    pub fn find_first(&self, tag: &str) -> Option<&Self> {
        if self.name == tag {
            return Some(self);
        }
        self.elements().find_map(|child| child.find_first(tag))
    }

    pub fn find_first_mut(&mut self, tag: &str) -> Option<&mut Self> {
        if self.name == tag {
            return Some(self);
        }
        self.elements_mut().find_map(|child| child.find_first_mut(tag))
    }

    /// First direct child with `tag`
    pub fn child(&self, tag: &str) -> Option<&Self> {
        self.elements().find(|child| child.name == tag)
    }

    pub fn child_mut(&mut self, tag: &str) -> Option<&mut Self> {
        self.elements_mut().find(|child| child.name == tag)
    }

    /// All direct children with `tag`
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.elements().filter(move |child| child.name == tag)
    }

    /// Existing first child with `tag`, or a new empty one appended last.
    ///
    /// Repeated calls return the same node; the child is never duplicated.
    /// `None` only for an empty tag, which can't name an element.
    pub fn find_or_create_child(&mut self, tag: &str) -> Option<&mut Self> {
        if tag.is_empty() {
            return None;
        }
        if self.child(tag).is_none() {
            self.push_child(Self::new(tag));
        }
        self.child_mut(tag)
    }

    /// Walk `segments` from `self`, creating whatever is missing
    pub fn find_or_create_path(&mut self, segments: &[&str]) -> Option<&mut Self> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.find_or_create_child(segment))
    }

    /// Walk a `/`-separated path through direct children of `self`
    pub fn child_path(&self, path: &str) -> Option<&Self> {
        split_path(path).try_fold(self, |node, segment| node.child(segment))
    }

    /// Resolve a `/`-separated path
    pub fn find_path(&self, path: &str) -> Option<&Self> {
        let mut segments = split_path(path);
        let anchor = self.find_first(segments.next()?)?;
        segments.try_fold(anchor, |node, segment| node.child(segment))
    }

    pub fn find_path_mut(&mut self, path: &str) -> Option<&mut Self> {
        let mut segments = split_path(path);
        let anchor = self.find_first_mut(segments.next()?)?;
        segments.try_fold(anchor, |node, segment| node.child_mut(segment))
    }

    /// Every element matching the last segment under the resolved parent path.
    ///
    /// A single-segment path matches every element with that tag, in
    /// document order.
    pub fn find_all_path(&self, path: &str) -> Vec<&Self> {
        let segments: Vec<&str> = split_path(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Vec::new();
        };
        if parents.is_empty() {
            let mut found = Vec::new();
            self.collect_named(last, &mut found);
            return found;
        }
        self.find_path(&parents.join("/"))
            .map(|parent| {
                parent
                    .elements()
                    .filter(|element| element.name == *last)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Trimmed text at `path`, empty when the path doesn't resolve
    pub fn text_at(&self, path: &str) -> String {
        self.find_path(path)
            .map(|element| element.text().trim().to_string())
            .unwrap_or_default()
    }

    fn collect_named<'a>(&'a self, tag: &str, found: &mut Vec<&'a Self>) {
        if self.name == tag {
            found.push(self);
        }
        for child in self.elements() {
            child.collect_named(tag, found);
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').map(str::trim).filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use crate::xml::{Document, Element, Parser};

    fn sample() -> Document {
        let input = "<Document><FIToFICstmrCdtTrf><CdtTrfTxInf>\
            <Dbtr><Nm>ABC</Nm><PstlAdr><AdrLine>2 Leicester Road</AdrLine><AdrLine>Singapore</AdrLine></PstlAdr></Dbtr>\
            <Cdtr><Nm>VW</Nm></Cdtr>\
            </CdtTrfTxInf></FIToFICstmrCdtTrf></Document>";
        match Parser::new(input.as_bytes()).parse() {
            Ok(doc) => doc,
            Err(err) => panic!("fixture must parse: {err}"),
        }
    }

    #[test]
    fn test_find_first_document_order() {
        let doc = sample();
        assert_eq!(
            doc.root.find_first("Nm").map(Element::text),
            Some("ABC".to_string())
        );
        assert_eq!(
            doc.root.find_first("Document").map(|e| e.name.as_str()),
            Some("Document")
        );
        assert!(doc.root.find_first("Purp").is_none());
    }

    #[test]
    fn test_find_path() {
        let doc = sample();
        assert_eq!(doc.root.text_at("Cdtr/Nm"), "VW");
        assert_eq!(doc.root.text_at("Cdtr/PstlAdr/AdrLine"), "");
        assert!(doc.root.find_path("Dbtr/Missing").is_none());
        assert!(doc.root.find_path("").is_none());
    }

    #[test]
    fn test_find_all_path() {
        let doc = sample();
        let lines: Vec<String> = doc
            .root
            .find_all_path("Dbtr/PstlAdr/AdrLine")
            .into_iter()
            .map(Element::text)
            .collect();
        assert_eq!(lines, vec!["2 Leicester Road", "Singapore"]);
        assert!(doc.root.find_all_path("Cdtr/PstlAdr/AdrLine").is_empty());

        let names: Vec<String> = doc
            .root
            .find_all_path("Nm")
            .into_iter()
            .map(Element::text)
            .collect();
        assert_eq!(names, vec!["ABC", "VW"]);
    }

    #[test]
    fn test_child_path() {
        let doc = sample();
        let tx = doc.root.find_first("CdtTrfTxInf");
        assert_eq!(
            tx.and_then(|tx| tx.child_path("Cdtr/Nm")).map(Element::text),
            Some("VW".to_string())
        );
        assert!(tx.and_then(|tx| tx.child_path("Nm")).is_none());
    }

    #[test]
    fn test_find_or_create_child_never_duplicates() {
        let mut parent = Element::new("PmtTpInf");
        if let Some(purp) = parent.find_or_create_child("Purp") {
            purp.set_text("first");
        }
        if let Some(purp) = parent.find_or_create_child("Purp") {
            purp.set_text("second");
        }
        assert_eq!(parent.children_named("Purp").count(), 1);
        assert_eq!(parent.text_at("Purp"), "second");
        assert!(parent.find_or_create_child("").is_none());
    }

    #[test]
    fn test_find_or_create_path() {
        let mut doc = sample();
        for code in ["GDDS", "SALA"] {
            if let Some(cd) = doc
                .root
                .find_first_mut("CdtTrfTxInf")
                .and_then(|tx| tx.find_or_create_path(&["PmtTpInf", "Purp", "Cd"]))
            {
                cd.set_text(code);
            }
        }
        assert_eq!(doc.root.text_at("CdtTrfTxInf/PmtTpInf/Purp/Cd"), "SALA");
        assert_eq!(doc.root.find_all_path("PmtTpInf/Purp").len(), 1);
    }
}
