//! Detection and repair of missing payment blocks

pub mod apply;
pub mod config;
pub mod detect;
pub mod suggest;

pub use apply::{apply_suggestions, write_address, AppliedChange, MissingAncestor, RepairReport};
pub use config::{AddressMode, Party, RepairConfig, RepairOptions};
pub use detect::{find_missing_fields, MissingField};
pub use suggest::{
    hybrid_address, structured_address, suggest_fixes, AddressSuggestion, RepairSuggestion,
    SingleValueSuggestion, SuggestionKey, SuggestionValue,
};

use serde::Serialize;
use tracing::instrument;

use crate::xml::Document;

/// Everything one repair pass produced
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    /// Issues found before any change was made
    pub issues: Vec<MissingField>,
    pub suggestions: RepairSuggestion,
    pub report: RepairReport,
}

/// Detect, suggest and apply in one pass, mutating `doc` in place
#[instrument(skip_all, fields(root = %doc.root.name))]
pub fn repair(doc: &mut Document, options: &RepairOptions, config: &RepairConfig) -> RepairOutcome {
    let issues = find_missing_fields(doc);
    let suggestions = suggest_fixes(doc, options, config);
    let report = apply_suggestions(doc, &suggestions, options);
    RepairOutcome {
        issues,
        suggestions,
        report,
    }
}
