//! Business envelope assembly.
//!
//! A CBPR+ transmission wraps the business application header (`AppHdr`) and
//! the message body (`Document`) in a single `Envelope` root. Each part gets
//! its own default namespace, always written as the first attribute.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::xml::{Document, Element, Writer, WriterConfig};

/// File name offered for a repaired message download
pub const REPAIRED_FILE_NAME: &str = "repaired_payment.xml";

/// Content type of every XML payload
pub const XML_CONTENT_TYPE: &str = "application/xml";

const HEADER_ROOT: &str = "AppHdr";
const BODY_ROOT: &str = "Document";

/// Namespaces and layout of the assembled envelope
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub envelope_namespace: String,
    pub xsi_namespace: String,
    pub header_namespace: String,
    pub body_namespace: String,
    pub writer: WriterConfig,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            envelope_namespace: "urn:swift:xsd:envelope".to_string(),
            xsi_namespace: "http://www.w3.org/2001/XMLSchema-instance".to_string(),
            header_namespace: "urn:iso:std:iso:20022:tech:xsd:head.001.001.02".to_string(),
            body_namespace: "urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08".to_string(),
            writer: WriterConfig::default(),
        }
    }
}

/// Which half of the envelope an error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopePart {
    Header,
    Body,
}

impl EnvelopePart {
    /// Tag the part's root must carry
    pub const fn root_tag(self) -> &'static str {
        match self {
            Self::Header => HEADER_ROOT,
            Self::Body => BODY_ROOT,
        }
    }
}

impl fmt::Display for EnvelopePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Body => f.write_str("body"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("malformed {part} fragment")]
    Parse {
        part: EnvelopePart,
        #[source]
        source: crate::Error,
    },

    #[error("{part} root must be <{}>, found <{found}>", .part.root_tag())]
    UnexpectedRoot { part: EnvelopePart, found: String },

    #[error("no <{}> element in the message", .0.root_tag())]
    MissingPart(EnvelopePart),
}

/// An assembled envelope
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    header: Element,
    body: Element,
    config: EnvelopeConfig,
}

impl Envelope {
    /// Wrap a header and body, stamping each with its namespace.
    ///
    /// Any `xmlns` already present on either root is replaced.
    pub fn assemble(
        mut header: Element,
        mut body: Element,
        config: &EnvelopeConfig,
    ) -> Result<Self, EnvelopeError> {
        check_root(&header, EnvelopePart::Header)?;
        check_root(&body, EnvelopePart::Body)?;

        header.set_leading_attribute("xmlns", config.header_namespace.as_str());
        body.set_leading_attribute("xmlns", config.body_namespace.as_str());

        Ok(Self {
            header,
            body,
            config: config.clone(),
        })
    }

    /// Locate `AppHdr` and `Document` anywhere in `doc` and wrap copies of them
    #[instrument(skip_all, fields(root = %doc.root.name))]
    pub fn from_document(doc: &Document, config: &EnvelopeConfig) -> Result<Self, EnvelopeError> {
        let header = doc
            .root
            .find_first(HEADER_ROOT)
            .ok_or(EnvelopeError::MissingPart(EnvelopePart::Header))?;
        let body = doc
            .root
            .find_first(BODY_ROOT)
            .ok_or(EnvelopeError::MissingPart(EnvelopePart::Body))?;
        debug!("located envelope parts");
        Self::assemble(header.clone(), body.clone(), config)
    }

    pub fn header(&self) -> &Element {
        &self.header
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    /// The `Envelope` element with both parts as children
    pub fn to_element(&self) -> Element {
        let mut root = Element::new("Envelope");
        root.attributes
            .insert("xmlns".to_string(), self.config.envelope_namespace.clone());
        root.attributes
            .insert("xmlns:xsi".to_string(), self.config.xsi_namespace.clone());
        root.push_child(self.header.clone());
        root.push_child(self.body.clone());
        root
    }

    pub fn to_xml(&self) -> String {
        Writer::new(self.config.writer).write_element(&self.to_element())
    }
}

/// Parse two fragments and serialize them as one envelope
#[instrument(skip_all)]
pub fn build_envelope(
    header: &str,
    body: &str,
    config: &EnvelopeConfig,
) -> Result<String, EnvelopeError> {
    let header = parse_part(header, EnvelopePart::Header)?;
    let body = parse_part(body, EnvelopePart::Body)?;
    Ok(Envelope::assemble(header, body, config)?.to_xml())
}

fn parse_part(input: &str, part: EnvelopePart) -> Result<Element, EnvelopeError> {
    crate::parse(input)
        .map(|doc| doc.root)
        .map_err(|source| EnvelopeError::Parse { part, source })
}

fn check_root(element: &Element, part: EnvelopePart) -> Result<(), EnvelopeError> {
    if element.name == part.root_tag() {
        Ok(())
    } else {
        Err(EnvelopeError::UnexpectedRoot {
            part,
            found: element.name.clone(),
        })
    }
}
