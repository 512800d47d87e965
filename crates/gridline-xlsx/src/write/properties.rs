use gridline_model::{CoreProperties, CustomProperty, CustomValue, ExtendedProperties};

use crate::openxml;
use crate::read::format_w3cdtf;
use crate::xml::{escape_attr, escape_text};

pub(crate) fn write_core_properties_xml(props: &CoreProperties) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<cp:coreProperties xmlns:cp="{}" xmlns:dc="{}" xmlns:dcterms="{}" xmlns:xsi="{}">"#,
        openxml::NS_CORE_PROPERTIES,
        openxml::NS_DC,
        openxml::NS_DCTERMS,
        openxml::NS_XSI,
    ));

    if let Some(title) = &props.title {
        xml.push_str(&format!("<dc:title>{}</dc:title>", escape_text(title)));
    }
    if let Some(subject) = &props.subject {
        xml.push_str(&format!("<dc:subject>{}</dc:subject>", escape_text(subject)));
    }
    if let Some(creator) = &props.creator {
        xml.push_str(&format!("<dc:creator>{}</dc:creator>", escape_text(creator)));
    }
    if let Some(keywords) = &props.keywords {
        xml.push_str(&format!(
            "<cp:keywords>{}</cp:keywords>",
            escape_text(keywords)
        ));
    }
    if let Some(description) = &props.description {
        xml.push_str(&format!(
            "<dc:description>{}</dc:description>",
            escape_text(description)
        ));
    }
    if let Some(last_modified_by) = &props.last_modified_by {
        xml.push_str(&format!(
            "<cp:lastModifiedBy>{}</cp:lastModifiedBy>",
            escape_text(last_modified_by)
        ));
    }
    if let Some(created) = &props.created {
        xml.push_str(&format!(
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>"#,
            format_w3cdtf(created)
        ));
    }
    if let Some(modified) = &props.modified {
        xml.push_str(&format!(
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{}</dcterms:modified>"#,
            format_w3cdtf(modified)
        ));
    }
    if let Some(category) = &props.category {
        xml.push_str(&format!(
            "<cp:category>{}</cp:category>",
            escape_text(category)
        ));
    }

    xml.push_str("</cp:coreProperties>");
    xml.into_bytes()
}

pub(crate) fn write_extended_properties_xml(props: &ExtendedProperties) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<Properties xmlns="{}" xmlns:vt="{}">"#,
        openxml::NS_EXTENDED_PROPERTIES,
        openxml::NS_VT,
    ));

    let application = props.application.as_deref().unwrap_or("Gridline");
    xml.push_str(&format!(
        "<Application>{}</Application>",
        escape_text(application)
    ));
    if let Some(app_version) = &props.app_version {
        xml.push_str(&format!(
            "<AppVersion>{}</AppVersion>",
            escape_text(app_version)
        ));
    }
    if let Some(company) = &props.company {
        xml.push_str(&format!("<Company>{}</Company>", escape_text(company)));
    }

    xml.push_str("</Properties>");
    xml.into_bytes()
}

pub(crate) fn write_custom_properties_xml(properties: &[CustomProperty]) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<Properties xmlns="{}" xmlns:vt="{}">"#,
        openxml::NS_CUSTOM_PROPERTIES,
        openxml::NS_VT,
    ));

    // pids start at 2; the fmtid is the fixed user-defined property GUID.
    for (index, property) in properties.iter().enumerate() {
        xml.push_str(&format!(
            r#"<property fmtid="{{D5CDD505-2E9C-101B-9397-08002B2CF9AE}}" pid="{}" name="{}">"#,
            index + 2,
            escape_attr(&property.name)
        ));
        match &property.value {
            CustomValue::Text(text) => {
                xml.push_str(&format!("<vt:lpwstr>{}</vt:lpwstr>", escape_text(text)));
            }
            CustomValue::Number(number) => {
                xml.push_str(&format!(
                    "<vt:r8>{}</vt:r8>",
                    crate::xml::format_f64(*number)
                ));
            }
            CustomValue::Bool(flag) => {
                xml.push_str(&format!(
                    "<vt:bool>{}</vt:bool>",
                    if *flag { "true" } else { "false" }
                ));
            }
            CustomValue::DateTime(datetime) => {
                xml.push_str(&format!(
                    "<vt:filetime>{}</vt:filetime>",
                    format_w3cdtf(datetime)
                ));
            }
        }
        xml.push_str("</property>");
    }

    xml.push_str("</Properties>");
    xml.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::{parse_core_properties, parse_w3cdtf};

    #[test]
    fn core_properties_roundtrip() {
        let mut props = CoreProperties::default();
        props.title = Some("Budget".to_string());
        props.creator = Some("jane".to_string());
        props.created = parse_w3cdtf("2024-06-01T08:00:00Z");

        let xml = write_core_properties_xml(&props);
        let reparsed = parse_core_properties(&xml).unwrap();
        assert_eq!(reparsed, props);
    }
}
