//! Markup serialization

use crate::xml::model::{Content, Document, Element};

/// Output layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Spaces per nesting level (0 writes everything on one line)
    pub indent: usize,
    /// Emit an `<?xml ...?>` declaration first
    pub declaration: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            declaration: false,
        }
    }
}

impl WriterConfig {
    /// Single-line output without declaration
    pub const fn compact() -> Self {
        Self {
            indent: 0,
            declaration: false,
        }
    }
}

/// Serializes documents and subtrees
#[derive(Clone, Copy, Debug, Default)]
pub struct Writer {
    config: WriterConfig,
}

impl Writer {
    pub const fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    pub fn write_document(&self, doc: &Document) -> String {
        self.write_element(&doc.root)
    }

    /// Serialize one subtree as a standalone fragment
    pub fn write_element(&self, element: &Element) -> String {
        let mut output = String::new();
        if self.config.declaration {
            output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
            output.push('\n');
        }
        self.element(element, 0, &mut output);
        if self.config.indent > 0 {
            output.push('\n');
        }
        output
    }

    fn element(&self, element: &Element, depth: usize, output: &mut String) {
        output.push('<');
        output.push_str(&element.name);

        for (key, value) in &element.attributes {
            output.push(' ');
            output.push_str(key);
            output.push_str("=\"");
            output.push_str(&escape_xml(value));
            output.push('"');
        }

        if element.children.is_empty() {
            output.push_str("/>");
            return;
        }
        output.push('>');

        let nested = self.config.indent > 0
            && element
                .children
                .iter()
                .any(|child| matches!(child, Content::Element(_)));

        for child in &element.children {
            if nested {
                self.newline(depth + 1, output);
            }
            match child {
                Content::Element(child) => self.element(child, depth + 1, output),
                Content::Text(text) if nested => output.push_str(&escape_xml(text.trim())),
                Content::Text(text) => output.push_str(&escape_xml(text)),
            }
        }

        if nested {
            self.newline(depth, output);
        }
        output.push_str("</");
        output.push_str(&element.name);
        output.push('>');
    }

    fn newline(&self, depth: usize, output: &mut String) {
        output.push('\n');
        output.push_str(&" ".repeat(depth * self.config.indent));
    }
}

/// Serialize a document on a single line
pub fn to_string(doc: &Document) -> String {
    Writer::new(WriterConfig::compact()).write_document(doc)
}

/// Serialize a document with two-space indentation
pub fn to_pretty_string(doc: &Document) -> String {
    Writer::default().write_document(doc)
}

fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
