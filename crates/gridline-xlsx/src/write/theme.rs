use gridline_model::ThemePalette;

use crate::xml::escape_attr;

/// Serialize `xl/theme/theme1.xml` from the palette.
///
/// Only the color scheme is modeled; the font and format schemes are written
/// as a fixed minimal block consuming applications accept.
pub(crate) fn write_theme_xml(palette: &ThemePalette) -> Vec<u8> {
    let ns = "http://schemas.openxmlformats.org/drawingml/2006/main";
    let slots = [
        "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5",
        "accent6", "hlink", "folHlink",
    ];

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<a:theme xmlns:a="{ns}" name="{}">"#,
        escape_attr(&palette.name)
    ));
    xml.push_str("<a:themeElements>");

    xml.push_str(&format!(
        r#"<a:clrScheme name="{}">"#,
        escape_attr(&palette.name)
    ));
    for (slot, color) in slots.iter().zip(palette.colors.iter()) {
        xml.push_str(&format!("<a:{slot}>"));
        match *slot {
            // The two window colors keep their system-color form.
            "dk1" => xml.push_str(&format!(
                r#"<a:sysClr val="windowText" lastClr="{}"/>"#,
                escape_attr(color)
            )),
            "lt1" => xml.push_str(&format!(
                r#"<a:sysClr val="window" lastClr="{}"/>"#,
                escape_attr(color)
            )),
            _ => xml.push_str(&format!(r#"<a:srgbClr val="{}"/>"#, escape_attr(color))),
        }
        xml.push_str(&format!("</a:{slot}>"));
    }
    xml.push_str("</a:clrScheme>");

    xml.push_str(concat!(
        r#"<a:fontScheme name="Office">"#,
        r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
        r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
        r#"</a:fontScheme>"#,
        r#"<a:fmtScheme name="Office">"#,
        r#"<a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst>"#,
        r#"<a:lnStyleLst>"#,
        r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
        r#"<a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
        r#"<a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
        r#"</a:lnStyleLst>"#,
        r#"<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>"#,
        r#"<a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst>"#,
        r#"</a:fmtScheme>"#,
    ));

    xml.push_str("</a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>");
    xml.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::parse_theme;

    #[test]
    fn theme_palette_roundtrips() {
        let mut palette = ThemePalette::office();
        palette.colors[4] = "123456".to_string();
        let xml = write_theme_xml(&palette);
        let reparsed = parse_theme(&xml).unwrap();
        assert_eq!(reparsed.colors, palette.colors);
    }
}
