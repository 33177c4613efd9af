//! # pacsrepair
//!
//! Repair and consistency checks for ISO 20022 payment messages.
//!
//! The crate parses a pacs.008 message into an ordered element tree, detects
//! missing regulatory blocks, proposes placeholder or reconstructed values and
//! writes them back in place. Around that core sit the envelope assembler,
//! the MT103 / pacs.008 consistency checker, edit sessions with an audit log
//! and a client for the external address-structuring service.
//!
//! ```
//! use pacsrepair::{repair, RepairConfig, RepairOptions};
//!
//! let xml = "<Document><CdtTrfTxInf><Dbtr><Nm>ABC</Nm></Dbtr></CdtTrfTxInf></Document>";
//! let mut doc = pacsrepair::parse(xml)?;
//! let outcome = repair(&mut doc, &RepairOptions::default(), &RepairConfig::default());
//! assert_eq!(outcome.issues.len(), 2);
//! assert_eq!(doc.root.text_at("Dbtr/PstlAdr/Ctry"), "SG");
//! # Ok::<(), pacsrepair::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod address_service;
pub mod consistency;
pub mod envelope;
pub mod error;
mod locator;
pub mod repair;
pub mod session;
pub mod xml;

pub use address_service::{parse_service_response, AddressServiceClient, ServiceError};
pub use consistency::{
    ConsistencyChecker, ConsistencyConfig, ConsistencyReport, CorrelationError, FieldComparison,
};
pub use envelope::{build_envelope, Envelope, EnvelopeConfig, EnvelopeError};
pub use error::{Error, ErrorKind, Pos, Result, Span};
pub use repair::{
    repair, AddressMode, AddressSuggestion, MissingField, Party, RepairConfig, RepairOptions,
    RepairOutcome, RepairReport, RepairSuggestion, SuggestionKey,
};
pub use session::{AuditEntry, AuditLog, EditError, EditableField, Session};
pub use xml::{Config as ParserConfig, Document, Element, WriterConfig};

/// Parse a message and strip namespace qualification from every tag
pub fn parse(input: &str) -> Result<Document> {
    parse_with_config(input, ParserConfig::default())
}

/// Parse with custom limits
pub fn parse_with_config(input: &str, config: ParserConfig) -> Result<Document> {
    let mut doc = xml::Parser::with_config(input.as_bytes(), config).parse()?;
    doc.normalize_namespaces();
    tracing::debug!(root = %doc.root.name, "parsed document");
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_prefixes() -> Result<()> {
        let doc = parse(
            r#"<doc:Document xmlns:doc="urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08"><doc:Dbtr><doc:Nm>ABC</doc:Nm></doc:Dbtr></doc:Document>"#,
        )?;
        assert_eq!(doc.root.name, "Document");
        assert!(doc.root.attributes.is_empty());
        assert_eq!(doc.root.text_at("Dbtr/Nm"), "ABC");
        Ok(())
    }

    #[test]
    fn test_parse_with_limits() {
        let config = ParserConfig::new(2, 0);
        let result = parse_with_config("<a><b><c/></b></a>", config);
        assert!(matches!(
            result.map_err(|e| e.kind().clone()),
            Err(ErrorKind::MaxDepthExceeded { max: 2 })
        ));
    }
}
