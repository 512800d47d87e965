use gridline_model::style::{
    Border, BorderSide, Fill, Font, Format, FormatDiff, Stylesheet,
};

use crate::rich_text::write_color;
use crate::xml::{escape_attr, format_f64};

/// Serialize `xl/styles.xml`.
///
/// Every vector is written in positional order: a record's position is the
/// index that format records (and cells) reference, so re-sorting here would
/// silently corrupt every stored index.
pub(crate) fn write_styles_xml(stylesheet: &Stylesheet) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<styleSheet xmlns="{}">"#,
        crate::openxml::NS_SPREADSHEETML
    ));

    if !stylesheet.number_formats.is_empty() {
        xml.push_str(&format!(
            r#"<numFmts count="{}">"#,
            stylesheet.number_formats.len()
        ));
        for nf in &stylesheet.number_formats {
            xml.push_str(&format!(
                r#"<numFmt numFmtId="{}" formatCode="{}"/>"#,
                nf.id,
                escape_attr(&nf.format_code)
            ));
        }
        xml.push_str("</numFmts>");
    }

    xml.push_str(&format!(r#"<fonts count="{}">"#, stylesheet.fonts.len()));
    for font in &stylesheet.fonts {
        write_font(&mut xml, "font", font);
    }
    xml.push_str("</fonts>");

    xml.push_str(&format!(r#"<fills count="{}">"#, stylesheet.fills.len()));
    for fill in &stylesheet.fills {
        write_fill(&mut xml, fill);
    }
    xml.push_str("</fills>");

    xml.push_str(&format!(r#"<borders count="{}">"#, stylesheet.borders.len()));
    for border in &stylesheet.borders {
        write_border(&mut xml, border);
    }
    xml.push_str("</borders>");

    xml.push_str(&format!(
        r#"<cellStyleXfs count="{}">"#,
        stylesheet.styles.len()
    ));
    for style in &stylesheet.styles {
        write_xf(&mut xml, &style.format, false);
    }
    xml.push_str("</cellStyleXfs>");

    xml.push_str(&format!(r#"<cellXfs count="{}">"#, stylesheet.formats.len()));
    for format in &stylesheet.formats {
        write_xf(&mut xml, format, true);
    }
    xml.push_str("</cellXfs>");

    let named: Vec<(usize, &gridline_model::NamedStyle)> = stylesheet
        .styles
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.name.is_empty())
        .collect();
    xml.push_str(&format!(r#"<cellStyles count="{}">"#, named.len()));
    for (xf_id, style) in named {
        xml.push_str(&format!(
            r#"<cellStyle name="{}" xfId="{xf_id}""#,
            escape_attr(&style.name)
        ));
        if let Some(builtin_id) = style.builtin_id {
            xml.push_str(&format!(r#" builtinId="{builtin_id}""#));
        }
        if style.hidden {
            xml.push_str(r#" hidden="1""#);
        }
        xml.push_str("/>");
    }
    xml.push_str("</cellStyles>");

    xml.push_str(&format!(r#"<dxfs count="{}">"#, stylesheet.format_diffs.len()));
    for diff in &stylesheet.format_diffs {
        write_dxf(&mut xml, diff);
    }
    xml.push_str("</dxfs>");

    xml.push_str(
        r#"<tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>"#,
    );
    xml.push_str("</styleSheet>");
    xml.into_bytes()
}

fn write_font(xml: &mut String, element: &str, font: &Font) {
    xml.push_str(&format!("<{element}>"));
    if font.bold {
        xml.push_str("<b/>");
    }
    if font.italic {
        xml.push_str("<i/>");
    }
    if font.strikethrough {
        xml.push_str("<strike/>");
    }
    if let Some(underline) = font.underline {
        match underline.to_ooxml() {
            Some(val) => xml.push_str(&format!(r#"<u val="{val}"/>"#)),
            None => xml.push_str("<u/>"),
        }
    }
    xml.push_str(&format!(r#"<sz val="{}"/>"#, format_f64(font.size)));
    if let Some(color) = &font.color {
        write_color(xml, "color", color);
    }
    xml.push_str(&format!(r#"<name val="{}"/>"#, escape_attr(&font.name)));
    if let Some(family) = font.family {
        xml.push_str(&format!(r#"<family val="{family}"/>"#));
    }
    if let Some(charset) = font.charset {
        xml.push_str(&format!(r#"<charset val="{charset}"/>"#));
    }
    if let Some(scheme) = &font.scheme {
        xml.push_str(&format!(r#"<scheme val="{}"/>"#, escape_attr(scheme)));
    }
    xml.push_str(&format!("</{element}>"));
}

fn write_fill(xml: &mut String, fill: &Fill) {
    xml.push_str("<fill>");
    match fill {
        Fill::Pattern(pattern) => {
            if pattern.foreground.is_none() && pattern.background.is_none() {
                xml.push_str(&format!(
                    r#"<patternFill patternType="{}"/>"#,
                    pattern.pattern.to_ooxml()
                ));
            } else {
                xml.push_str(&format!(
                    r#"<patternFill patternType="{}">"#,
                    pattern.pattern.to_ooxml()
                ));
                if let Some(foreground) = &pattern.foreground {
                    write_color(xml, "fgColor", foreground);
                }
                if let Some(background) = &pattern.background {
                    write_color(xml, "bgColor", background);
                }
                xml.push_str("</patternFill>");
            }
        }
        Fill::Gradient(gradient) => {
            xml.push_str("<gradientFill");
            if let Some(degree) = gradient.degree {
                xml.push_str(&format!(r#" degree="{}""#, format_f64(degree)));
            }
            xml.push('>');
            for (position, color) in &gradient.stops {
                xml.push_str(&format!(r#"<stop position="{}">"#, format_f64(*position)));
                write_color(xml, "color", color);
                xml.push_str("</stop>");
            }
            xml.push_str("</gradientFill>");
        }
    }
    xml.push_str("</fill>");
}

fn write_border(xml: &mut String, border: &Border) {
    xml.push_str("<border");
    if border.diagonal_up {
        xml.push_str(r#" diagonalUp="1""#);
    }
    if border.diagonal_down {
        xml.push_str(r#" diagonalDown="1""#);
    }
    xml.push('>');
    write_border_side(xml, "left", &border.left);
    write_border_side(xml, "right", &border.right);
    write_border_side(xml, "top", &border.top);
    write_border_side(xml, "bottom", &border.bottom);
    write_border_side(xml, "diagonal", &border.diagonal);
    xml.push_str("</border>");
}

fn write_border_side(xml: &mut String, element: &str, side: &BorderSide) {
    if side.is_empty() {
        xml.push_str(&format!("<{element}/>"));
        return;
    }
    xml.push_str(&format!("<{element}"));
    if let Some(style) = side.style {
        xml.push_str(&format!(r#" style="{}""#, style.to_ooxml()));
    }
    match &side.color {
        Some(color) => {
            xml.push('>');
            write_color(xml, "color", color);
            xml.push_str(&format!("</{element}>"));
        }
        None => xml.push_str("/>"),
    }
}

fn write_xf(xml: &mut String, format: &Format, with_xf_id: bool) {
    xml.push_str("<xf");
    xml.push_str(&format!(
        r#" numFmtId="{}""#,
        format.number_format_id.unwrap_or(0)
    ));
    xml.push_str(&format!(r#" fontId="{}""#, format.font_id.unwrap_or(0)));
    xml.push_str(&format!(r#" fillId="{}""#, format.fill_id.unwrap_or(0)));
    xml.push_str(&format!(r#" borderId="{}""#, format.border_id.unwrap_or(0)));
    if with_xf_id {
        xml.push_str(&format!(r#" xfId="{}""#, format.style_id.unwrap_or(0)));
    }
    if format.apply_number_format {
        xml.push_str(r#" applyNumberFormat="1""#);
    }
    if format.apply_font {
        xml.push_str(r#" applyFont="1""#);
    }
    if format.apply_fill {
        xml.push_str(r#" applyFill="1""#);
    }
    if format.apply_border {
        xml.push_str(r#" applyBorder="1""#);
    }
    if format.apply_alignment {
        xml.push_str(r#" applyAlignment="1""#);
    }
    if format.apply_protection {
        xml.push_str(r#" applyProtection="1""#);
    }

    let has_children = format.alignment.is_some() || format.protection.is_some();
    if !has_children {
        xml.push_str("/>");
        return;
    }
    xml.push('>');

    if let Some(alignment) = &format.alignment {
        xml.push_str("<alignment");
        if let Some(horizontal) = alignment.horizontal {
            xml.push_str(&format!(r#" horizontal="{}""#, horizontal.to_ooxml()));
        }
        if let Some(vertical) = alignment.vertical {
            xml.push_str(&format!(r#" vertical="{}""#, vertical.to_ooxml()));
        }
        if alignment.wrap_text {
            xml.push_str(r#" wrapText="1""#);
        }
        if alignment.shrink_to_fit {
            xml.push_str(r#" shrinkToFit="1""#);
        }
        if alignment.indent != 0 {
            xml.push_str(&format!(r#" indent="{}""#, alignment.indent));
        }
        if alignment.rotation != 0 {
            xml.push_str(&format!(r#" textRotation="{}""#, alignment.rotation));
        }
        xml.push_str("/>");
    }
    if let Some(protection) = &format.protection {
        xml.push_str("<protection");
        if !protection.locked {
            xml.push_str(r#" locked="0""#);
        }
        if protection.hidden {
            xml.push_str(r#" hidden="1""#);
        }
        xml.push_str("/>");
    }

    xml.push_str("</xf>");
}

fn write_dxf(xml: &mut String, diff: &FormatDiff) {
    xml.push_str("<dxf>");
    if let Some(font) = &diff.font {
        write_font(xml, "font", font);
    }
    if let Some(fill) = &diff.fill {
        write_fill(xml, fill);
    }
    if let Some(border) = &diff.border {
        write_border(xml, border);
    }
    xml.push_str("</dxf>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::parse_stylesheet;
    use crate::ReadOptions;
    use gridline_model::style::{Color, PatternFill};

    #[test]
    fn styles_roundtrip_positionally() {
        let mut sheet = Stylesheet::new();
        let bold = sheet.intern_font(Font {
            bold: true,
            ..Font::default()
        });
        let red = sheet.intern_fill(Fill::Pattern(PatternFill::solid(Color::rgb(0xFFFF0000))));
        let nf = sheet.intern_number_format("0.000");
        sheet.intern_format(Format {
            font_id: Some(bold),
            fill_id: Some(red),
            number_format_id: Some(nf),
            apply_font: true,
            apply_fill: true,
            apply_number_format: true,
            style_id: Some(0),
            ..Format::default()
        });

        let xml = write_styles_xml(&sheet);
        let reparsed = parse_stylesheet(&xml, &ReadOptions::default()).unwrap();

        assert_eq!(reparsed.fonts.len(), sheet.fonts.len());
        assert_eq!(reparsed.fills.len(), sheet.fills.len());
        assert_eq!(reparsed.formats.len(), sheet.formats.len());
        assert_eq!(reparsed.number_formats, sheet.number_formats);
        assert!(reparsed.fonts[bold as usize].bold);
        let format = &reparsed.formats[1];
        assert_eq!(format.font_id, Some(bold));
        assert_eq!(format.fill_id, Some(red));
        assert_eq!(format.number_format_id, Some(nf));
    }
}
