//! MT103 / pacs.008 consistency checks.
//!
//! A legacy MT103 and its structured translation are first correlated by
//! UETR. Only a correlated pair is compared field by field for presence and
//! truncation. The truncation flag is a heuristic: it reports a likely loss
//! of information, not a proven one.

pub mod mt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::xml::Document;
use mt::TextBlock;

const STRUCTURED_UETR: &str = "CdtTrfTxInf/PmtId/UETR";

/// Identifier patterns, marker and length limit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Tried in order against the legacy text; capture group 1 is the UETR
    pub uetr_patterns: Vec<String>,
    /// Character a legacy system appends to a value it had to cut
    pub truncation_marker: char,
    /// Longer legacy values are assumed not to have fit the target
    pub max_field_length: usize,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            uetr_patterns: vec![
                r"\{3:\{121:([A-Za-z0-9\-]+)\}\}".to_string(),
                r"\{121:([A-Za-z0-9\-]+)\}".to_string(),
                r":121:([A-Za-z0-9\-]+)".to_string(),
            ],
            truncation_marker: '+',
            max_field_length: 140,
        }
    }
}

/// The pair could not be compared. No partial report accompanies it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    #[error("no UETR found in the legacy message")]
    MissingLegacyIdentifier,

    #[error("no UETR at CdtTrfTxInf/PmtId/UETR in the structured message")]
    MissingStructuredIdentifier,

    #[error("UETR mismatch: legacy {legacy}, structured {structured}")]
    Mismatch { legacy: String, structured: String },

    #[error("structured message is not well-formed")]
    Parse(#[from] crate::Error),

    #[error("invalid identifier pattern")]
    Pattern(#[from] regex::Error),
}

/// One row of the travel-rule checklist
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldComparison {
    pub field: String,
    /// Legacy value, if the legacy message carries the field
    pub source: Option<String>,
    pub target: String,
    pub present: bool,
    pub truncated: bool,
}

/// One block-4 field with its marker flag
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LegacyField {
    pub tag: String,
    pub value: String,
    pub truncated: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub uetr: String,
    pub comparisons: Vec<FieldComparison>,
    pub legacy_fields: Vec<LegacyField>,
}

impl ConsistencyReport {
    /// Every checklist field carries a value in the structured message
    pub fn travel_rule_compliant(&self) -> bool {
        self.comparisons.iter().all(|row| row.present)
    }

    pub fn truncated_fields(&self) -> impl Iterator<Item = &FieldComparison> {
        self.comparisons.iter().filter(|row| row.truncated)
    }
}

/// Compares legacy and structured renditions of one payment
#[derive(Clone, Debug)]
pub struct ConsistencyChecker {
    config: ConsistencyConfig,
    uetr_patterns: Vec<Regex>,
    block4: Regex,
    field_tag: Regex,
}

impl ConsistencyChecker {
    pub fn new(config: ConsistencyConfig) -> Result<Self, regex::Error> {
        let uetr_patterns = config
            .uetr_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            config,
            uetr_patterns,
            block4: Regex::new(r"(?s)\{4:(.*?)-\}")?,
            field_tag: Regex::new(r"^:(\d{2}[A-Z]?):")?,
        })
    }

    pub fn config(&self) -> &ConsistencyConfig {
        &self.config
    }

    /// UETR from the first pattern that matches
    pub fn legacy_uetr(&self, legacy: &str) -> Option<String> {
        self.uetr_patterns.iter().find_map(|pattern| {
            pattern
                .captures(legacy)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
    }

    /// Fields of the `{4: ... -}` block, empty when there is none
    pub fn text_block(&self, legacy: &str) -> TextBlock {
        self.block4
            .captures(legacy)
            .and_then(|caps| caps.get(1))
            .map(|block| TextBlock::parse(block.as_str(), &self.field_tag))
            .unwrap_or_default()
    }

    /// Correlate the pair, then compare the checklist fields
    #[instrument(skip_all)]
    pub fn check(&self, legacy: &str, structured: &str) -> Result<ConsistencyReport, CorrelationError> {
        let doc = crate::parse(structured)?;
        self.check_document(legacy, &doc)
    }

    /// Same as [`check`](Self::check) with the structured side already parsed
    pub fn check_document(
        &self,
        legacy: &str,
        doc: &Document,
    ) -> Result<ConsistencyReport, CorrelationError> {
        let legacy_uetr = self
            .legacy_uetr(legacy)
            .ok_or(CorrelationError::MissingLegacyIdentifier)?;
        let structured_uetr = doc.root.text_at(STRUCTURED_UETR);
        if structured_uetr.is_empty() {
            return Err(CorrelationError::MissingStructuredIdentifier);
        }
        if legacy_uetr != structured_uetr {
            warn!(%legacy_uetr, %structured_uetr, "UETR mismatch");
            return Err(CorrelationError::Mismatch {
                legacy: legacy_uetr,
                structured: structured_uetr,
            });
        }
        debug!(uetr = %legacy_uetr, "messages correlated");

        let block = self.text_block(legacy);
        let debtor = block.ordering_party();
        let creditor = block.beneficiary();

        let checklist = [
            ("Debtor Name", debtor.as_ref().map(|p| &p.name), "Dbtr/Nm"),
            ("Debtor Address", debtor.as_ref().map(|p| &p.address), "Dbtr/PstlAdr/AdrLine"),
            ("Creditor Name", creditor.as_ref().map(|p| &p.name), "Cdtr/Nm"),
            ("Creditor Address", creditor.as_ref().map(|p| &p.address), "Cdtr/PstlAdr/AdrLine"),
        ];
        let comparisons = checklist
            .into_iter()
            .map(|(field, source, path)| self.compare(field, source, structured_value(doc, path)))
            .collect();

        let legacy_fields = block
            .fields
            .iter()
            .map(|field| {
                let value = field.value();
                LegacyField {
                    tag: field.tag.clone(),
                    truncated: value.ends_with(self.config.truncation_marker),
                    value,
                }
            })
            .collect();

        Ok(ConsistencyReport {
            uetr: legacy_uetr,
            comparisons,
            legacy_fields,
        })
    }

    fn compare(&self, field: &str, source: Option<&String>, target: String) -> FieldComparison {
        let truncated = source.is_some_and(|source| {
            is_truncated(
                source,
                &target,
                self.config.truncation_marker,
                self.config.max_field_length,
            )
        });
        FieldComparison {
            field: field.to_string(),
            source: source.cloned(),
            present: !target.trim().is_empty(),
            target,
            truncated,
        }
    }
}

/// Target is shorter than source, and the source either carries the
/// truncation marker or could not have fit in `max_len` characters
pub fn is_truncated(source: &str, target: &str, marker: char, max_len: usize) -> bool {
    let source_len = source.chars().count();
    target.chars().count() < source_len && (source.ends_with(marker) || source_len > max_len)
}

/// Text of every match of `path`, joined with single spaces
fn structured_value(doc: &Document, path: &str) -> String {
    doc.root
        .find_all_path(path)
        .into_iter()
        .map(|element| element.text().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const UETR: &str = "eb6305c9-1f7f-49de-aed0-16487c27b42d";

    fn pacs(uetr: &str) -> String {
        format!(
            "<Document><FIToFICstmrCdtTrf><CdtTrfTxInf><PmtId><UETR>{uetr}</UETR></PmtId>\
             <Dbtr><Nm>JOHN</Nm><PstlAdr><AdrLine>1 MAIN</AdrLine><AdrLine>NEW YORK</AdrLine></PstlAdr></Dbtr>\
             <Cdtr><Nm>ACME GMBH</Nm></Cdtr></CdtTrfTxInf></FIToFICstmrCdtTrf></Document>"
        )
    }

    fn mt103(uetr: &str) -> String {
        format!(
            "{{1:F01BANKUS33AXXX0000000000}}{{3:{{121:{uetr}}}}}{{4:\n:20:REF1\n:50K:/123\nJOHN DOE+\n1 MAIN NEW YORK\n:59:ACME GMBH\n-}}"
        )
    }

    #[test]
    fn test_truncation_heuristic() {
        let long = "A".repeat(200);
        let short = "A".repeat(50);
        assert!(is_truncated(&long, &short, '+', 140));
        assert!(!is_truncated("Short", "Short", '+', 140));
        assert!(is_truncated("JOHN DOE+", "JOHN", '+', 140));
        assert!(!is_truncated("JOHN DOE", "JOHN", '+', 140));
    }

    #[test]
    fn test_uetr_pattern_order() -> Result<(), regex::Error> {
        let checker = ConsistencyChecker::new(ConsistencyConfig::default())?;
        assert_eq!(checker.legacy_uetr("{3:{121:abc-1}}:121:zzz"), Some("abc-1".to_string()));
        assert_eq!(checker.legacy_uetr("{108:X}{121:def-2}"), Some("def-2".to_string()));
        assert_eq!(checker.legacy_uetr(":121:ghi-3"), Some("ghi-3".to_string()));
        assert_eq!(checker.legacy_uetr(":20:REF"), None);
        Ok(())
    }

    #[test]
    fn test_mismatch_halts() -> Result<(), regex::Error> {
        let checker = ConsistencyChecker::new(ConsistencyConfig::default())?;
        let result = checker.check(&mt103(UETR), &pacs("other-uetr"));
        assert_eq!(
            result,
            Err(CorrelationError::Mismatch {
                legacy: UETR.to_string(),
                structured: "other-uetr".to_string(),
            })
        );
        assert_eq!(
            checker.check(":20:REF", &pacs(UETR)),
            Err(CorrelationError::MissingLegacyIdentifier)
        );
        assert!(matches!(
            checker.check(&mt103(UETR), "<Document>"),
            Err(CorrelationError::Parse(_))
        ));
        Ok(())
    }

    #[test]
    fn test_field_report() -> Result<(), CorrelationError> {
        let checker = ConsistencyChecker::new(ConsistencyConfig::default())?;
        let report = checker.check(&mt103(UETR), &pacs(UETR))?;
        assert_eq!(report.uetr, UETR);

        let rows: Vec<(&str, &str, bool, bool)> = report
            .comparisons
            .iter()
            .map(|r| (r.field.as_str(), r.target.as_str(), r.present, r.truncated))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Debtor Name", "JOHN", true, true),
                ("Debtor Address", "1 MAIN NEW YORK", true, false),
                ("Creditor Name", "ACME GMBH", true, false),
                ("Creditor Address", "", false, false),
            ]
        );
        assert!(!report.travel_rule_compliant());

        let flagged: Vec<&str> = report
            .legacy_fields
            .iter()
            .filter(|f| f.truncated)
            .map(|f| f.tag.as_str())
            .collect();
        assert!(flagged.is_empty());
        assert_eq!(report.legacy_fields.len(), 3);
        Ok(())
    }
}
