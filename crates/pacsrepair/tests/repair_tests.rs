use std::fs;

use pacsrepair::repair::find_missing_fields;
use pacsrepair::xml::to_pretty_string;
use pacsrepair::{
    parse, repair, AddressMode, Envelope, EnvelopeConfig, MissingField, Party, RepairConfig,
    RepairOptions, SuggestionKey,
};

fn fixture(name: &str) -> Result<String, std::io::Error> {
    fs::read_to_string(format!(
        "{}/tests/fixtures/valid/{name}",
        env!("CARGO_MANIFEST_DIR")
    ))
}

#[test]
fn test_missing_address_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = parse(&fixture("missing_address.xml")?)?;
    let options = RepairOptions {
        fix_purpose: true,
        ..RepairOptions::default()
    };
    let outcome = repair(&mut doc, &options, &RepairConfig::default());

    assert_eq!(
        outcome.issues,
        vec![MissingField::PostalAddress, MissingField::PurposeCode]
    );
    assert_eq!(outcome.report.applied.len(), 2);
    assert!(outcome.report.skipped.is_empty());

    for field in ["StrtNm", "BldgNb", "PstCd", "TwnNm"] {
        assert_eq!(doc.root.text_at(&format!("Dbtr/PstlAdr/{field}")), "");
        assert!(doc.root.find_path(&format!("Dbtr/PstlAdr/{field}")).is_some());
    }
    assert_eq!(doc.root.text_at("Dbtr/PstlAdr/Ctry"), "SG");
    assert_eq!(doc.root.text_at("CdtTrfTxInf/PmtTpInf/Purp/Cd"), "GDDS");
    assert!(find_missing_fields(&doc).is_empty());
    Ok(())
}

#[test]
fn test_repair_is_stable() -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = parse(&fixture("business_message.xml")?)?;
    let options = RepairOptions::all(AddressMode::Structured);
    repair(&mut doc, &options, &RepairConfig::default());
    let first = to_pretty_string(&doc);

    let mut reparsed = parse(&first)?;
    repair(&mut reparsed, &options, &RepairConfig::default());
    assert_eq!(to_pretty_string(&reparsed), first);
    assert_eq!(reparsed.root.find_all_path("PmtTpInf/Purp").len(), 1);
    Ok(())
}

#[test]
fn test_structured_from_free_text() -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = parse(&fixture("business_message.xml")?)?;
    let outcome = repair(&mut doc, &RepairOptions::default(), &RepairConfig::default());

    assert_eq!(outcome.issues, vec![MissingField::PurposeCode]);
    assert!(outcome.suggestions.contains(SuggestionKey::StructuredAddress));
    assert_eq!(doc.root.text_at("Dbtr/PstlAdr/StrtNm"), "Leicester Road");
    assert_eq!(doc.root.text_at("Dbtr/PstlAdr/BldgNb"), "16");
    assert_eq!(doc.root.text_at("Dbtr/PstlAdr/PstCd"), "358828");
    assert_eq!(doc.root.text_at("Dbtr/PstlAdr/TwnNm"), "Singapore");
    assert!(doc.root.find_path("Dbtr/PstlAdr/AdrLine").is_none());
    assert_eq!(doc.root.find_all_path("Cdtr/PstlAdr/AdrLine").len(), 2);
    Ok(())
}

#[test]
fn test_hybrid_creditor() -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = parse(&fixture("business_message.xml")?)?;
    let options = RepairOptions {
        address: Some(AddressMode::Hybrid),
        party: Party::Creditor,
        fix_lei: true,
        ..RepairOptions::default()
    };
    let outcome = repair(&mut doc, &options, &RepairConfig::default());

    let descriptions: Vec<&str> = outcome
        .report
        .applied
        .iter()
        .map(|change| change.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec![
            "Address structured as Hybrid Address",
            "Creditor LEI added or updated"
        ]
    );
    let lines: Vec<String> = doc
        .root
        .find_all_path("Cdtr/PstlAdr/AdrLine")
        .into_iter()
        .map(|line| line.text())
        .collect();
    assert_eq!(lines, vec!["2 Pine Grove", "597594 Singapore"]);
    assert_eq!(doc.root.text_at("Cdtr/PstlAdr/TwnNm"), "Singapore");
    assert_eq!(doc.root.text_at("Cdtr/Id/OrgId/LEI"), "5493001KJTIIGC8Y1R12");
    assert!(doc.root.find_path("Dbtr/Id").is_none());
    Ok(())
}

#[test]
fn test_repaired_message_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = parse(&fixture("business_message.xml")?)?;
    repair(
        &mut doc,
        &RepairOptions::all(AddressMode::Structured),
        &RepairConfig::default(),
    );
    let config = EnvelopeConfig::default();
    let envelope = Envelope::from_document(&doc, &config)?;
    assert_eq!(envelope.header().text_at("BizMsgIdr"), "wS4");
    assert_eq!(envelope.body().text_at("Purp/Cd"), "GDDS");

    let xml = envelope.to_xml();
    assert!(xml.starts_with("<Envelope xmlns=\"urn:swift:xsd:envelope\""));
    assert!(xml.contains("<AppHdr xmlns=\"urn:iso:std:iso:20022:tech:xsd:head.001.001.02\">"));
    assert!(xml.contains("<Document xmlns=\"urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08\">"));
    Ok(())
}

#[test]
fn test_custom_placeholders() -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = parse(&fixture("missing_address.xml")?)?;
    let config: RepairConfig = serde_json::from_str(
        r#"{"fallback_country": "DE", "purpose_code": "SUPP"}"#,
    )?;
    repair(&mut doc, &RepairOptions::all(AddressMode::Structured), &config);
    assert_eq!(doc.root.text_at("Dbtr/PstlAdr/Ctry"), "DE");
    assert_eq!(doc.root.text_at("PmtTpInf/Purp/Cd"), "SUPP");
    assert_eq!(
        doc.root.text_at("RmtInf/Strd/CdtrRefInf/Ref"),
        "RF712345678901234567"
    );
    Ok(())
}
