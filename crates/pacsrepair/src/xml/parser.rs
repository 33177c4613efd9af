//! XML parser for payment messages

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Result};
use crate::xml::cursor::Cursor;
use crate::xml::model::{Content, Document, Element};

/// Limits applied while parsing
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

impl Config {
    /// Config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// Recursive-descent XML parser
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
    depth: u16,
}

impl<'a> Parser<'a> {
    /// Create a parser with default limits
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        Self {
            cursor: Cursor::new(input),
            config,
            depth: 0,
        }
    }

    /// Parse a complete document: prolog, one root element, trailing misc
    pub fn parse(&mut self) -> Result<Document> {
        let size = self.cursor.remaining_len();
        if self.config.max_size > 0 && size > self.config.max_size {
            return Err(Error::at(
                ErrorKind::MaxSizeExceeded {
                    max: self.config.max_size,
                },
                self.cursor.position(),
            ));
        }

        // byte order mark
        if self.cursor.starts_with(&[0xEF, 0xBB, 0xBF]) {
            self.cursor.advance_by(3);
        }

        self.skip_misc()?;
        if self.cursor.is_eof() {
            return Err(Error::at(ErrorKind::EmptyDocument, self.cursor.position()));
        }

        let root = self.parse_element()?;
        self.skip_misc()?;

        if !self.cursor.is_eof() {
            return Err(Error::at(ErrorKind::TrailingContent, self.cursor.position()));
        }

        Ok(Document { root })
    }

    /// Skip whitespace, comments, processing instructions and DOCTYPE
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(b"?>")?;
            } else if self.cursor.starts_with(b"<!--") {
                self.cursor.advance_by(4);
                self.skip_until(b"-->")?;
            } else if self.cursor.starts_with(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_doctype(&mut self) -> Result<()> {
        // internal subsets nest one level of brackets
        let mut in_subset = false;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match b {
                b'[' => in_subset = true,
                b']' => in_subset = false,
                b'>' if !in_subset => return Ok(()),
                _ => {}
            }
        }
        Err(Error::at(ErrorKind::UnterminatedMarkup, self.cursor.position()))
    }

    fn parse_element(&mut self) -> Result<Element> {
        if self.config.max_depth > 0 && self.depth >= self.config.max_depth {
            return Err(Error::at(
                ErrorKind::MaxDepthExceeded {
                    max: self.config.max_depth,
                },
                self.cursor.position(),
            ));
        }

        self.expect_byte(b'<', "'<'")?;
        if self.cursor.current() == Some(b'/') {
            self.cursor.advance();
            let name = self.parse_name()?;
            return Err(Error::at(
                ErrorKind::UnexpectedClosingTag { name },
                self.cursor.position(),
            ));
        }

        let name = self.parse_name()?;
        let attributes = self.parse_attributes()?;

        if self.cursor.current() == Some(b'/') {
            self.cursor.advance();
            self.expect_byte(b'>', "'>'")?;
            return Ok(Element {
                name,
                attributes,
                children: Vec::new(),
            });
        }
        self.expect_byte(b'>', "'>'")?;

        self.depth += 1;
        let children = self.parse_content(&name)?;
        self.depth -= 1;

        Ok(Element {
            name,
            attributes,
            children,
        })
    }

    fn parse_content(&mut self, name: &str) -> Result<Vec<Content>> {
        let mut children = Vec::new();
        loop {
            if self.cursor.is_eof() {
                return Err(Error::at(
                    ErrorKind::UnterminatedElement {
                        name: name.to_string(),
                    },
                    self.cursor.position(),
                ));
            }

            if self.cursor.starts_with(b"</") {
                let pos = self.cursor.position();
                self.cursor.advance_by(2);
                let close_name = self.parse_name()?;
                if close_name != name {
                    return Err(Error::at(
                        ErrorKind::MismatchedTag {
                            expected: name.to_string(),
                            found: close_name,
                        },
                        pos,
                    ));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>', "'>'")?;
                return Ok(children);
            }

            if self.cursor.starts_with(b"<!--") {
                self.cursor.advance_by(4);
                self.skip_until(b"-->")?;
                continue;
            }

            if self.cursor.starts_with(b"<![CDATA[") {
                self.cursor.advance_by(9);
                let text = self.take_until(b"]]>")?;
                push_text(&mut children, text);
                continue;
            }

            if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(b"?>")?;
                continue;
            }

            if self.cursor.current() == Some(b'<') {
                let child = self.parse_element()?;
                children.push(Content::Element(child));
                continue;
            }

            let text = self.parse_text()?;
            if !text.trim().is_empty() {
                push_text(&mut children, text);
            }
        }
    }

    fn parse_attributes(&mut self) -> Result<IndexMap<String, String>> {
        let mut attrs = IndexMap::new();

        loop {
            let had_space = matches!(
                self.cursor.current(),
                Some(b' ' | b'\t' | b'\r' | b'\n')
            );
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/' | b'>') => break,
                Some(_) if !had_space => {
                    return Err(self.unexpected("whitespace before attribute"));
                }
                Some(_) => {}
                None => return Err(Error::at(ErrorKind::UnexpectedEof, self.cursor.position())),
            }

            let pos = self.cursor.position();
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=', "'='")?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(Error::at(ErrorKind::DuplicateAttribute { name }, pos));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.unexpected("quoted attribute value")),
        };
        self.cursor.advance();

        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                let text = self.checked_str(raw)?;
                return self.decode_entities(text);
            }
            if b == b'<' {
                return Err(self.unexpected("attribute value without '<'"));
            }
            self.cursor.advance();
        }

        Err(Error::at(ErrorKind::UnexpectedEof, self.cursor.position()))
    }

    fn parse_text(&mut self) -> Result<String> {
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = self.cursor.slice_from(start);
        let text = self.checked_str(raw)?;
        self.decode_entities(text)
    }

    fn parse_name(&mut self) -> Result<String> {
        let start_pos = self.cursor.position();
        let start = self.cursor.pos();

        match self.cursor.current() {
            Some(b) if is_name_start(b) => self.cursor.advance(),
            Some(_) => return Err(Error::at(ErrorKind::InvalidName, start_pos)),
            None => return Err(Error::at(ErrorKind::UnexpectedEof, start_pos)),
        }
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        let raw = self.cursor.slice_from(start);
        self.checked_str(raw).map(str::to_string)
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        self.take_until(pattern).map(|_| ())
    }

    /// Consume up to and including `pattern`, returning what came before it
    fn take_until(&mut self, pattern: &[u8]) -> Result<String> {
        let start = self.cursor.pos();
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(pattern) {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance_by(pattern.len());
                return self.checked_str(raw).map(str::to_string);
            }
            self.cursor.advance();
        }
        Err(Error::at(ErrorKind::UnterminatedMarkup, self.cursor.position()))
    }

    fn expect_byte(&mut self, expected: u8, label: &str) -> Result<()> {
        if self.cursor.current() == Some(expected) {
            self.cursor.advance();
            Ok(())
        } else {
            Err(self.unexpected(label))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        let found = match self.cursor.current() {
            Some(b) => format!("'{}'", char::from(b)),
            None => "end of input".to_string(),
        };
        Error::at(
            ErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found,
            },
            self.cursor.position(),
        )
    }

    /// UTF-8 check plus the XML character range
    fn checked_str<'b>(&self, bytes: &'b [u8]) -> Result<&'b str> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::at(ErrorKind::InvalidUtf8, self.cursor.position()))?;
        if let Some(ch) = text.chars().find(|ch| !is_xml_char(*ch)) {
            return Err(Error::at(
                ErrorKind::InvalidCharacter { ch },
                self.cursor.position(),
            ));
        }
        Ok(text)
    }

    fn decode_entities(&self, input: &str) -> Result<String> {
        if !input.contains('&') {
            return Ok(input.to_string());
        }

        let mut result = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(amp) = rest.find('&') {
            let (before, after) = rest.split_at(amp);
            result.push_str(before);
            let after = after.get(1..).unwrap_or_default();
            let Some(end) = after.find(';') else {
                return Err(self.invalid_entity(after));
            };
            let (entity, tail) = after.split_at(end);
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => decode_numeric_entity(entity),
            };
            match decoded {
                Some(ch) => result.push(ch),
                None => return Err(self.invalid_entity(entity)),
            }
            rest = tail.get(1..).unwrap_or_default();
        }
        result.push_str(rest);
        Ok(result)
    }

    fn invalid_entity(&self, entity: &str) -> Error {
        Error::at(
            ErrorKind::InvalidEntity {
                entity: entity.chars().take(16).collect(),
            },
            self.cursor.position(),
        )
    }
}

fn push_text(children: &mut Vec<Content>, text: String) {
    // adjacent runs (text, CDATA, text around a comment) merge into one
    if let Some(Content::Text(previous)) = children.last_mut() {
        previous.push_str(&text);
    } else {
        children.push(Content::Text(text));
    }
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

fn is_xml_char(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}')
        || ch >= '\u{10000}'
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };
    char::from_u32(code).filter(|ch| is_xml_char(*ch))
}
