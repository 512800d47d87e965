use gridline_model::SharedStrings;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ReadError;
use crate::rich_text::{attr_string, parse_rich_text};

/// Parse `xl/sharedStrings.xml`.
///
/// The declared `uniqueCount` must equal the number of parsed `<si>` entries;
/// a mismatch is a structural-corruption signal and fails the load.
pub(crate) fn parse_shared_strings(xml: &[u8]) -> Result<SharedStrings, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut table = SharedStrings::new();
    let mut declared_unique: Option<usize> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"sst" => {
                declared_unique = attr_string(&e, b"uniqueCount")?
                    .and_then(|v| v.trim().parse::<usize>().ok());
            }
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                let entry = parse_rich_text(&mut reader, b"si")?;
                table.push_raw(entry);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                table.push_raw(Default::default());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(declared) = declared_unique {
        if declared != table.len() {
            return Err(ReadError::UniqueCountMismatch {
                declared,
                actual: table.len(),
            });
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_rich_entries() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="2">
  <si><t>plain</t></si>
  <si><r><rPr><b/></rPr><t>bold</t></r><r><t> tail</t></r></si>
</sst>"#;
        let table = parse_shared_strings(xml).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().text, "plain");
        assert_eq!(table.get(1).unwrap().text, "bold tail");
        assert_eq!(table.get(1).unwrap().runs.len(), 2);
    }

    #[test]
    fn unique_count_mismatch_is_rejected() {
        let xml = br#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="2" uniqueCount="3">
  <si><t>a</t></si>
  <si><t>b</t></si>
</sst>"#;
        let err = parse_shared_strings(xml).unwrap_err();
        assert!(matches!(
            err,
            ReadError::UniqueCountMismatch {
                declared: 3,
                actual: 2
            }
        ));
    }
}
