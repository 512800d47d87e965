use chrono::NaiveDateTime;
use gridline_model::{CoreProperties, CustomProperty, CustomValue, ExtendedProperties};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ReadError;
use crate::rich_text::{attr_string, read_text};

/// Parse a W3CDTF timestamp (`2024-01-31T12:30:05Z`).
pub(crate) fn parse_w3cdtf(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").ok()
}

pub(crate) fn format_w3cdtf(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse `docProps/core.xml`.
pub(crate) fn parse_core_properties(xml: &[u8]) -> Result<CoreProperties, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut props = CoreProperties::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"coreProperties" => continue,
                    b"title" | b"subject" | b"creator" | b"keywords" | b"description"
                    | b"lastModifiedBy" | b"created" | b"modified" | b"category" => {
                        let text = read_text(&mut reader, &local)?;
                        match local.as_slice() {
                            b"title" => props.title = Some(text),
                            b"subject" => props.subject = Some(text),
                            b"creator" => props.creator = Some(text),
                            b"keywords" => props.keywords = Some(text),
                            b"description" => props.description = Some(text),
                            b"lastModifiedBy" => props.last_modified_by = Some(text),
                            b"created" => props.created = parse_w3cdtf(&text),
                            b"modified" => props.modified = parse_w3cdtf(&text),
                            b"category" => props.category = Some(text),
                            _ => {}
                        }
                    }
                    _ => {
                        reader.read_to_end_into(e.name(), &mut Vec::new())?;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(props)
}

/// Parse `docProps/app.xml`.
pub(crate) fn parse_extended_properties(xml: &[u8]) -> Result<ExtendedProperties, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut props = ExtendedProperties::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                match local.as_slice() {
                    b"Properties" => continue,
                    b"Application" => props.application = Some(read_text(&mut reader, &local)?),
                    b"AppVersion" => props.app_version = Some(read_text(&mut reader, &local)?),
                    b"Company" => props.company = Some(read_text(&mut reader, &local)?),
                    _ => {
                        reader.read_to_end_into(e.name(), &mut Vec::new())?;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(props)
}

/// Parse `docProps/custom.xml`.
pub(crate) fn parse_custom_properties(xml: &[u8]) -> Result<Vec<CustomProperty>, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut properties = Vec::new();
    let mut current_name: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"property" => {
                current_name = attr_string(&e, b"name")?;
            }
            Event::Start(e) if current_name.is_some() => {
                let local = e.local_name().as_ref().to_vec();
                let text = read_text(&mut reader, &local)?;
                let value = match local.as_slice() {
                    b"lpwstr" | b"lpstr" | b"bstr" => Some(CustomValue::Text(text)),
                    b"i4" | b"int" | b"r8" | b"ui4" => {
                        text.trim().parse::<f64>().ok().map(CustomValue::Number)
                    }
                    b"bool" => Some(CustomValue::Bool(crate::openxml::parse_xml_bool(
                        text.trim(),
                    ))),
                    b"filetime" | b"date" => parse_w3cdtf(&text).map(CustomValue::DateTime),
                    _ => None,
                };
                if let (Some(name), Some(value)) = (current_name.take(), value) {
                    properties.push(CustomProperty { name, value });
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"property" => {
                current_name = None;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_properties_parse() {
        let xml = br#"<?xml version="1.0"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Quarterly report</dc:title>
  <dc:creator>jane</dc:creator>
  <dcterms:created>2024-01-31T12:30:05Z</dcterms:created>
</cp:coreProperties>"#;
        let props = parse_core_properties(xml).unwrap();
        assert_eq!(props.title.as_deref(), Some("Quarterly report"));
        assert_eq!(props.creator.as_deref(), Some("jane"));
        let created = props.created.unwrap();
        assert_eq!(format_w3cdtf(&created), "2024-01-31T12:30:05Z");
    }

    #[test]
    fn custom_properties_parse() {
        let xml = br#"<?xml version="1.0"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/custom-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
  <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="2" name="Reviewed"><vt:bool>true</vt:bool></property>
  <property fmtid="{D5CDD505-2E9C-101B-9397-08002B2CF9AE}" pid="3" name="Build"><vt:i4>1234</vt:i4></property>
</Properties>"#;
        let properties = parse_custom_properties(xml).unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].name, "Reviewed");
        assert_eq!(properties[0].value, CustomValue::Bool(true));
        assert_eq!(properties[1].value, CustomValue::Number(1234.0));
    }
}
