//! Detection of absent required blocks

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::xml::Document;

/// A required block that appears nowhere in the document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    PostalAddress,
    PurposeCode,
}

impl MissingField {
    pub const ALL: [Self; 2] = [Self::PostalAddress, Self::PurposeCode];

    /// Tag whose absence defines the issue
    pub const fn tag(self) -> &'static str {
        match self {
            Self::PostalAddress => "PstlAdr",
            Self::PurposeCode => "Purp",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::PostalAddress => "Missing Debtor Postal Address (PstlAdr)",
            Self::PurposeCode => "Missing Payment Purpose Code (Purp)",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Flags each required block with no occurrence anywhere in the tree.
///
/// Presence is all that counts: an empty `PstlAdr` is not reported.
pub fn find_missing_fields(doc: &Document) -> Vec<MissingField> {
    let missing: Vec<MissingField> = MissingField::ALL
        .into_iter()
        .filter(|field| doc.root.find_first(field.tag()).is_none())
        .collect();
    debug!(count = missing.len(), "detected missing fields");
    missing
}
