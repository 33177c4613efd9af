//! Parse error types for payment documents

use std::fmt;
use thiserror::Error;

/// Position in source markup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source markup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn at(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }
}

/// What went wrong while reading markup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyDocument,
    UnexpectedToken { expected: String, found: String },
    UnexpectedEof,
    InvalidName,
    MismatchedTag { expected: String, found: String },
    UnexpectedClosingTag { name: String },
    UnterminatedElement { name: String },
    UnterminatedMarkup,
    DuplicateAttribute { name: String },
    InvalidEntity { entity: String },
    InvalidCharacter { ch: char },
    InvalidUtf8,
    TrailingContent,
    MaxDepthExceeded { max: u16 },
    MaxSizeExceeded { max: usize },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDocument => write!(f, "document has no root element"),
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::InvalidName => write!(f, "invalid tag or attribute name"),
            Self::MismatchedTag { expected, found } => {
                write!(f, "mismatched closing tag: expected </{expected}>, found </{found}>")
            }
            Self::UnexpectedClosingTag { name } => write!(f, "unexpected closing tag </{name}>"),
            Self::UnterminatedElement { name } => write!(f, "element <{name}> is never closed"),
            Self::UnterminatedMarkup => write!(f, "unterminated comment or declaration"),
            Self::DuplicateAttribute { name } => write!(f, "duplicate attribute: {name}"),
            Self::InvalidEntity { entity } => write!(f, "invalid entity: &{entity};"),
            Self::InvalidCharacter { ch } => {
                write!(f, "character U+{:04X} is not allowed", u32::from(*ch))
            }
            Self::InvalidUtf8 => write!(f, "invalid utf-8"),
            Self::TrailingContent => write!(f, "content after the root element"),
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
        }
    }
}

/// Malformed markup. No partial document is ever produced alongside it.
#[derive(Error, Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span,
            message,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create error at specific position
    pub fn at(kind: ErrorKind, pos: Pos) -> Self {
        Self::new(kind, Span::at(pos))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid XML at {}: {}", self.span.start, self.message)
    }
}

/// Result type alias for parsing
pub type Result<T> = std::result::Result<T, Error>;
