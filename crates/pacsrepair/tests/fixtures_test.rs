use std::fs;

use pacsrepair::parse;

#[test]
fn test_valid_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let valid_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/valid");
    for entry in fs::read_dir(valid_dir)? {
        let path = entry?.path();
        let content = fs::read_to_string(&path)?;
        if let Err(err) = parse(&content) {
            return Err(
                std::io::Error::other(format!("Failed to parse valid file {path:?}: {err}")).into(),
            );
        }
    }
    Ok(())
}

#[test]
fn test_invalid_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let invalid_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/invalid");
    for entry in fs::read_dir(invalid_dir)? {
        let path = entry?.path();
        let content = fs::read_to_string(&path)?;
        if parse(&content).is_ok() {
            return Err(std::io::Error::other(format!(
                "Should fail to parse invalid file: {path:?}"
            ))
            .into());
        }
    }
    Ok(())
}

#[test]
fn test_error_position() {
    let err = parse("<Document>\n  <Dbtr></Cdtr>\n</Document>").err();
    let line = err.map(|err| err.span().start.line);
    assert_eq!(line, Some(2));
}
