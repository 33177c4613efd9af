//! In-place application of suggestions

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::repair::config::RepairOptions;
use crate::repair::suggest::{AddressSuggestion, RepairSuggestion, SuggestionKey};
use crate::xml::{Document, Element};

const TRANSACTION: &str = "CdtTrfTxInf";
const LEI_PATH: &[&str] = &["Id", "OrgId", "LEI"];
const PURPOSE_PATH: &[&str] = &["PmtTpInf", "Purp", "Cd"];
const REFERENCE_PATH: &[&str] = &["RmtInf", "Strd", "CdtrRefInf", "Ref"];

/// A requested repair whose container is absent. Soft: the other repairs
/// still run.
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize)]
#[error("{repair} skipped: no <{ancestor}> element in the message")]
pub struct MissingAncestor {
    pub repair: SuggestionKey,
    pub ancestor: String,
}

/// One repair that was written into the document
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppliedChange {
    pub repair: SuggestionKey,
    /// Path of the written block, rooted at its anchor
    pub path: String,
    pub description: String,
}

/// What a repair pass did
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub applied: Vec<AppliedChange>,
    pub skipped: Vec<MissingAncestor>,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.skipped.is_empty()
    }

    fn applied(&mut self, repair: SuggestionKey, path: String, description: String) {
        info!(%repair, %path, "repair applied");
        self.applied.push(AppliedChange {
            repair,
            path,
            description,
        });
    }

    fn skipped(&mut self, repair: SuggestionKey, ancestor: &str) {
        warn!(%repair, ancestor, "repair skipped, container missing");
        self.skipped.push(MissingAncestor {
            repair,
            ancestor: ancestor.to_string(),
        });
    }
}

/// Write every suggestion into `doc`.
///
/// Missing intermediate containers are created below their anchor (the
/// party element or `CdtTrfTxInf`); a missing anchor skips that repair.
/// Single values overwrite whatever is already there. The address block is
/// cleared before the suggested fields are written, so any field outside the
/// suggestion is dropped.
pub fn apply_suggestions(
    doc: &mut Document,
    suggestions: &RepairSuggestion,
    options: &RepairOptions,
) -> RepairReport {
    let mut report = RepairReport::default();
    let party = options.party;

    let addresses: Vec<(SuggestionKey, &AddressSuggestion)> = suggestions
        .keys()
        .filter(|key| key.is_address())
        .filter_map(|key| suggestions.address(key).map(|address| (key, address)))
        .collect();
    if let Some((first_key, _)) = addresses.first() {
        let target = doc
            .root
            .find_first_mut(party.tag())
            .and_then(|party_element| party_element.find_or_create_child("PstlAdr"));
        match target {
            Some(target) => {
                target.clear();
                for (key, address) in &addresses {
                    write_address(target, address);
                    let mode = match key {
                        SuggestionKey::HybridAddress => "Hybrid",
                        _ => "Structured",
                    };
                    report.applied(
                        *key,
                        format!("{}/PstlAdr", party.tag()),
                        format!("Address structured as {mode} Address"),
                    );
                }
            }
            None => report.skipped(*first_key, party.tag()),
        }
    }

    if let Some(lei) = suggestions.value(SuggestionKey::Lei) {
        let target = doc
            .root
            .find_first_mut(party.tag())
            .and_then(|party_element| party_element.find_or_create_path(LEI_PATH));
        match target {
            Some(target) => {
                target.set_text(lei);
                report.applied(
                    SuggestionKey::Lei,
                    format!("{}/Id/OrgId/LEI", party.tag()),
                    format!("{} LEI added or updated", party.label()),
                );
            }
            None => report.skipped(SuggestionKey::Lei, party.tag()),
        }
    }

    if let Some(code) = suggestions.value(SuggestionKey::PurposeCode) {
        let target = doc
            .root
            .find_first_mut(TRANSACTION)
            .and_then(|transaction| transaction.find_or_create_path(PURPOSE_PATH));
        match target {
            Some(target) => {
                target.set_text(code);
                report.applied(
                    SuggestionKey::PurposeCode,
                    format!("{TRANSACTION}/PmtTpInf/Purp/Cd"),
                    "Purpose Code (Purp) added or updated".to_string(),
                );
            }
            None => report.skipped(SuggestionKey::PurposeCode, TRANSACTION),
        }
    }

    if let Some(reference) = suggestions.value(SuggestionKey::RemittanceReference) {
        let target = doc
            .root
            .find_first_mut(TRANSACTION)
            .and_then(|transaction| transaction.find_or_create_path(REFERENCE_PATH));
        match target {
            Some(target) => {
                target.set_text(reference);
                report.applied(
                    SuggestionKey::RemittanceReference,
                    format!("{TRANSACTION}/RmtInf/Strd/CdtrRefInf/Ref"),
                    "Remittance Information (RmtInf) added or updated".to_string(),
                );
            }
            None => report.skipped(SuggestionKey::RemittanceReference, TRANSACTION),
        }
    }

    report
}

/// Append the suggestion's fields to `target` in order.
///
/// `AdrLine1`, `AdrLine2`, ... become repeated `AdrLine` elements.
pub fn write_address(target: &mut Element, address: &AddressSuggestion) {
    for (field, value) in &address.fields {
        let tag = if field.starts_with("AdrLine") {
            "AdrLine"
        } else {
            field.as_str()
        };
        target.push_child(Element::with_text(tag, value.as_str()));
    }
}
