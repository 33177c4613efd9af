//! Synthesis of replacement content

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::repair::config::{AddressMode, RepairConfig, RepairOptions};
use crate::xml::{Document, Element};

/// Which repair a suggestion feeds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionKey {
    StructuredAddress,
    HybridAddress,
    #[serde(rename = "LEI")]
    Lei,
    PurposeCode,
    RemittanceReference,
}

impl SuggestionKey {
    pub const fn is_address(self) -> bool {
        matches!(self, Self::StructuredAddress | Self::HybridAddress)
    }
}

impl fmt::Display for SuggestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StructuredAddress => "structured address",
            Self::HybridAddress => "hybrid address",
            Self::Lei => "LEI",
            Self::PurposeCode => "purpose code",
            Self::RemittanceReference => "remittance reference",
        };
        f.write_str(name)
    }
}

/// Ordered sub-field values for a postal address block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSuggestion {
    pub fields: IndexMap<String, String>,
}

impl AddressSuggestion {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleValueSuggestion {
    pub value: String,
}

/// Shape of a suggestion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum SuggestionValue {
    Address(AddressSuggestion),
    Single(SingleValueSuggestion),
}

/// Suggestions for one repair pass, in insertion order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepairSuggestion {
    entries: IndexMap<SuggestionKey, SuggestionValue>,
}

impl RepairSuggestion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_address(&mut self, key: SuggestionKey, address: AddressSuggestion) {
        self.entries.insert(key, SuggestionValue::Address(address));
    }

    pub fn insert_value(&mut self, key: SuggestionKey, value: impl Into<String>) {
        self.entries.insert(
            key,
            SuggestionValue::Single(SingleValueSuggestion {
                value: value.into(),
            }),
        );
    }

    pub fn get(&self, key: SuggestionKey) -> Option<&SuggestionValue> {
        self.entries.get(&key)
    }

    pub fn address(&self, key: SuggestionKey) -> Option<&AddressSuggestion> {
        match self.entries.get(&key)? {
            SuggestionValue::Address(address) => Some(address),
            SuggestionValue::Single(_) => None,
        }
    }

    pub fn value(&self, key: SuggestionKey) -> Option<&str> {
        match self.entries.get(&key)? {
            SuggestionValue::Single(single) => Some(&single.value),
            SuggestionValue::Address(_) => None,
        }
    }

    pub fn contains(&self, key: SuggestionKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = SuggestionKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SuggestionKey, &SuggestionValue)> {
        self.entries.iter().map(|(key, value)| (*key, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the suggestions requested by `options`.
///
/// The address block examined is the `PstlAdr` child of the first party
/// element. A party without `PstlAdr` is treated as an empty address; no
/// party element at all yields no address suggestion. LEI, purpose code and
/// remittance reference always use the configured placeholders.
pub fn suggest_fixes(
    doc: &Document,
    options: &RepairOptions,
    config: &RepairConfig,
) -> RepairSuggestion {
    let mut suggestions = RepairSuggestion::new();

    if let Some(mode) = options.address {
        match doc.root.find_first(options.party.tag()) {
            Some(party) => {
                let address = party.child("PstlAdr");
                match mode {
                    AddressMode::Structured => suggestions.insert_address(
                        SuggestionKey::StructuredAddress,
                        structured_address(address, config),
                    ),
                    AddressMode::Hybrid => suggestions.insert_address(
                        SuggestionKey::HybridAddress,
                        hybrid_address(address, config),
                    ),
                }
            }
            None => debug!(party = options.party.tag(), "no party element, address left alone"),
        }
    }

    if options.fix_lei {
        suggestions.insert_value(SuggestionKey::Lei, config.lei.clone());
    }
    if options.fix_purpose {
        suggestions.insert_value(SuggestionKey::PurposeCode, config.purpose_code.clone());
    }
    if options.fix_remittance {
        suggestions.insert_value(
            SuggestionKey::RemittanceReference,
            config.remittance_reference.clone(),
        );
    }

    debug!(count = suggestions.len(), "suggestions built");
    suggestions
}

/// Derive named sub-fields from an address block.
///
/// Free-text lines win when present: line 1 splits on its first space into
/// building number and street, line 2 into postcode and town. Otherwise the
/// existing named fields pass through unchanged.
pub fn structured_address(address: Option<&Element>, config: &RepairConfig) -> AddressSuggestion {
    let lines = address_lines(address);
    let country = existing(address, "Ctry").unwrap_or_else(|| config.fallback_country.clone());

    if lines.is_empty() {
        return AddressSuggestion::default()
            .with("StrtNm", existing(address, "StrtNm").unwrap_or_default())
            .with("BldgNb", existing(address, "BldgNb").unwrap_or_default())
            .with("PstCd", existing(address, "PstCd").unwrap_or_default())
            .with("TwnNm", existing(address, "TwnNm").unwrap_or_default())
            .with("Ctry", country);
    }

    let line1 = lines.first().map(String::as_str).unwrap_or_default();
    let line2 = lines.get(1).map(String::as_str).unwrap_or_default();
    let (building, street) = split_first_space(line1);
    let (postcode, town) = split_first_space(line2);

    AddressSuggestion::default()
        .with("StrtNm", street)
        .with("BldgNb", building)
        .with("PstCd", postcode)
        .with("TwnNm", town)
        .with("Ctry", country)
}

/// Derive two free-text lines from an address block.
///
/// Existing lines pass through (first two kept); otherwise they are composed
/// from `BldgNb StrtNm` and `PstCd TwnNm`.
pub fn hybrid_address(address: Option<&Element>, config: &RepairConfig) -> AddressSuggestion {
    let mut lines = address_lines(address);
    if lines.is_empty() {
        let field = |tag: &str| existing(address, tag).unwrap_or_default();
        lines = vec![
            format!("{} {}", field("BldgNb"), field("StrtNm")).trim().to_string(),
            format!("{} {}", field("PstCd"), field("TwnNm")).trim().to_string(),
        ];
    }
    let mut lines = lines.into_iter();

    AddressSuggestion::default()
        .with("AdrLine1", lines.next().unwrap_or_default())
        .with("AdrLine2", lines.next().unwrap_or_default())
        .with(
            "TwnNm",
            existing(address, "TwnNm").unwrap_or_else(|| config.fallback_town.clone()),
        )
        .with(
            "Ctry",
            existing(address, "Ctry").unwrap_or_else(|| config.fallback_country.clone()),
        )
}

fn address_lines(address: Option<&Element>) -> Vec<String> {
    address
        .map(|address| address.children_named("AdrLine").map(Element::text).collect())
        .unwrap_or_default()
}

/// Text of a named sub-field, `None` when absent or blank
fn existing(address: Option<&Element>, tag: &str) -> Option<String> {
    address?
        .child(tag)
        .map(|field| field.text().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// `"16 Leicester Road"` -> `("16", "Leicester Road")`; no space -> `("", line)`
fn split_first_space(line: &str) -> (&str, &str) {
    match line.split_once(' ') {
        Some((head, tail)) => (head.trim(), tail.trim()),
        None => ("", line.trim()),
    }
}
