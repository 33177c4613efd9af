//! MT103 text block parsing

use regex::Regex;
use serde::Serialize;

/// Ordering customer options
pub const ORDERING_PARTY_TAGS: [&str; 3] = ["50A", "50F", "50K"];
/// Beneficiary customer options
pub const BENEFICIARY_TAGS: [&str; 3] = ["59", "59A", "59F"];

/// One `:TAG:` field of block 4, continuation lines included
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MtField {
    pub tag: String,
    pub lines: Vec<String>,
}

impl MtField {
    /// All lines joined with single spaces
    pub fn value(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Option letter, empty for the bare tag
    pub fn option(&self) -> &str {
        self.tag.get(2..).unwrap_or_default()
    }
}

/// Name and address of an MT customer field
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MtParty {
    pub name: String,
    pub address: String,
}

impl MtParty {
    /// Read a 50a or 59a field.
    ///
    /// Option F carries numbered lines: `1/` name, `2/` address, `3/`
    /// country and town. Other options put the name on the first line after
    /// an optional `/account` line.
    pub fn from_field(field: &MtField) -> Self {
        let lines: Vec<&str> = field
            .lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();

        if field.option() == "F" {
            let numbered = |prefixes: &[&str]| {
                lines
                    .iter()
                    .filter_map(|line| prefixes.iter().find_map(|p| line.strip_prefix(p)))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            return Self {
                name: numbered(&["1/"]),
                address: numbered(&["2/", "3/"]),
            };
        }

        let mut rest = lines.into_iter().skip_while(|line| line.starts_with('/'));
        Self {
            name: rest.next().unwrap_or_default().to_string(),
            address: rest.collect::<Vec<_>>().join(" "),
        }
    }
}

/// Block 4 split into fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub fields: Vec<MtField>,
}

impl TextBlock {
    /// Split block text on lines opening with `:NN[A-Z]:`.
    ///
    /// Text before the first tag is ignored.
    pub fn parse(block: &str, tag_pattern: &Regex) -> Self {
        let mut fields: Vec<MtField> = Vec::new();
        for line in block.lines() {
            let line = line.trim_end_matches('\r');
            match tag_pattern.captures(line) {
                Some(caps) => {
                    let (tag, end) = match caps.get(1).zip(caps.get(0)) {
                        Some((tag, whole)) => (tag.as_str().to_string(), whole.end()),
                        None => continue,
                    };
                    let value = line.get(end..).unwrap_or_default().trim().to_string();
                    fields.push(MtField {
                        tag,
                        lines: vec![value],
                    });
                }
                None => {
                    if let Some(field) = fields.last_mut() {
                        field.lines.push(line.trim().to_string());
                    }
                }
            }
        }
        Self { fields }
    }

    /// First field whose tag is in `tags`
    pub fn field(&self, tags: &[&str]) -> Option<&MtField> {
        self.fields
            .iter()
            .find(|field| tags.contains(&field.tag.as_str()))
    }

    pub fn ordering_party(&self) -> Option<MtParty> {
        self.field(&ORDERING_PARTY_TAGS).map(MtParty::from_field)
    }

    pub fn beneficiary(&self) -> Option<MtParty> {
        self.field(&BENEFICIARY_TAGS).map(MtParty::from_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_pattern() -> Result<Regex, regex::Error> {
        Regex::new(r"^:(\d{2}[A-Z]?):")
    }

    const BLOCK: &str = "\n:20:REF123\n:50K:/12345678\nJOHN DOE\n1 MAIN STREET\nNEW YORK+\n:59F:/DE89370400440532013000\n1/ACME GMBH\n2/HAUPTSTRASSE 1\n3/DE/BERLIN\n:71A:SHA\n";

    #[test]
    fn test_split_fields() -> Result<(), regex::Error> {
        let block = TextBlock::parse(BLOCK, &tag_pattern()?);
        let tags: Vec<&str> = block.fields.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(tags, vec!["20", "50K", "59F", "71A"]);
        assert_eq!(
            block.field(&["50K"]).map(MtField::value),
            Some("/12345678 JOHN DOE 1 MAIN STREET NEW YORK+".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_party_option_k() -> Result<(), regex::Error> {
        let block = TextBlock::parse(BLOCK, &tag_pattern()?);
        let party = block.ordering_party().unwrap_or_default();
        assert_eq!(party.name, "JOHN DOE");
        assert_eq!(party.address, "1 MAIN STREET NEW YORK+");
        Ok(())
    }

    #[test]
    fn test_party_option_f() -> Result<(), regex::Error> {
        let block = TextBlock::parse(BLOCK, &tag_pattern()?);
        let party = block.beneficiary().unwrap_or_default();
        assert_eq!(party.name, "ACME GMBH");
        assert_eq!(party.address, "HAUPTSTRASSE 1 DE/BERLIN");
        Ok(())
    }

    #[test]
    fn test_bare_tag_option() {
        let field = MtField {
            tag: "59".to_string(),
            lines: vec!["JANE ROE".to_string()],
        };
        assert_eq!(field.option(), "");
        assert_eq!(MtParty::from_field(&field).name, "JANE ROE");
        assert_eq!(MtParty::from_field(&field).address, "");
    }
}
