//! The CT_Rst rich-text grammar shared by shared-string entries (`<si>`),
//! inline cell strings (`<is>`) and comment bodies (`<text>`).

use gridline_model::rich_text::{PhoneticProperties, PhoneticRun, RichText, RunFont};
use gridline_model::style::{Argb, Color, UnderlineStyle};
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ReadError;
use crate::xml::{escape_attr, escape_text, needs_space_preserve};

/// Parse the children of an already-consumed rich text container start tag
/// (`<si>`, `<is>`, `<text>`) up to and including its end tag.
pub(crate) fn parse_rich_text<R: BufRead>(
    reader: &mut Reader<R>,
    container: &[u8],
) -> Result<RichText, ReadError> {
    let mut buf = Vec::new();
    let mut segments: Vec<(String, Option<RunFont>)> = Vec::new();
    let mut phonetic_runs: Vec<PhoneticRun> = Vec::new();
    let mut phonetic_properties: Option<PhoneticProperties> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                segments.push((read_text(reader, b"t")?, None));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"t" => {
                segments.push((String::new(), None));
            }
            Event::Start(e) if e.local_name().as_ref() == b"r" => {
                segments.push(parse_run(reader)?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => {
                let start = attr_u32(&e, b"sb")?.unwrap_or(0);
                let end = attr_u32(&e, b"eb")?.unwrap_or(start);
                let text = parse_rph(reader)?;
                phonetic_runs.push(PhoneticRun { start, end, text });
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"phoneticPr" => {
                phonetic_properties = Some(PhoneticProperties {
                    font_id: attr_u32(&e, b"fontId")?,
                    alignment: attr_string(&e, b"alignment")?,
                    conversion_type: attr_string(&e, b"type")?,
                });
            }
            Event::Start(e) => {
                // Extension subtrees may contain their own `<t>` elements that
                // are not part of the visible string.
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == container => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: String::new(),
                    element: "unexpected EOF in rich text".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    let mut rich = if segments.iter().all(|(_, font)| font.is_none()) {
        RichText::new(
            segments
                .into_iter()
                .map(|(text, _)| text)
                .collect::<String>(),
        )
    } else {
        RichText::from_segments(segments)
    };
    rich.phonetic_runs = phonetic_runs;
    rich.phonetic_properties = phonetic_properties;
    Ok(rich)
}

fn parse_run<R: BufRead>(reader: &mut Reader<R>) -> Result<(String, Option<RunFont>), ReadError> {
    let mut buf = Vec::new();
    let mut font: Option<RunFont> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"rPr" => {
                font = Some(parse_run_font(reader)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"rPr" => {
                font = Some(RunFont::default());
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text(reader, b"t")?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"t" => {}
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: String::new(),
                    element: "unexpected EOF in <r>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    let font = font.filter(|f| !f.is_empty());
    Ok((text, font))
}

fn parse_rph<R: BufRead>(reader: &mut Reader<R>) -> Result<String, ReadError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text(reader, b"t")?);
            }
            Event::End(e) if e.local_name().as_ref() == b"rPh" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: String::new(),
                    element: "unexpected EOF in <rPh>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn parse_run_font<R: BufRead>(reader: &mut Reader<R>) -> Result<RunFont, ReadError> {
    let mut buf = Vec::new();
    let mut font = RunFont::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) => apply_run_font_tag(&e, &mut font)?,
            Event::Start(e) => {
                apply_run_font_tag(&e, &mut font)?;
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"rPr" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: String::new(),
                    element: "unexpected EOF in <rPr>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(font)
}

fn apply_run_font_tag(e: &BytesStart<'_>, font: &mut RunFont) -> Result<(), ReadError> {
    match e.local_name().as_ref() {
        b"b" => font.bold = Some(bool_val(e)?),
        b"i" => font.italic = Some(bool_val(e)?),
        b"strike" => font.strikethrough = Some(bool_val(e)?),
        b"u" => {
            let val = attr_string(e, b"val")?;
            if let Some(ul) = UnderlineStyle::from_ooxml(val.as_deref()) {
                font.underline = Some(ul);
            }
        }
        b"color" => {
            if let Some(rgb) = attr_string(e, b"rgb")? {
                if rgb.len() == 8 {
                    if let Ok(argb) = u32::from_str_radix(&rgb, 16) {
                        font.color = Some(Color::Rgb(Argb(argb)));
                    }
                }
            } else if let Some(theme) = attr_u32(e, b"theme")? {
                font.color = Some(Color::Theme {
                    index: theme,
                    tint_1000: None,
                });
            } else if let Some(indexed) = attr_u32(e, b"indexed")? {
                font.color = Some(Color::Indexed(indexed));
            }
        }
        b"rFont" | b"name" => {
            if let Some(val) = attr_string(e, b"val")? {
                font.name = Some(val);
            }
        }
        b"sz" => {
            if let Some(val) = attr_string(e, b"val")? {
                if let Ok(size) = val.trim().parse::<f64>() {
                    font.size = Some(size);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Serialize rich text as the body of an `<si>`/`<is>`/`<text>` container.
///
/// A single run with no font override collapses to a plain `<t>`; multiple
/// runs or any override expand to `<r>` elements.
pub(crate) fn write_rich_text(out: &mut String, rich: &RichText) {
    if rich.runs.iter().all(|r| r.font.is_none()) {
        out.push_str("<t");
        if needs_space_preserve(&rich.text) {
            out.push_str(r#" xml:space="preserve""#);
        }
        out.push('>');
        out.push_str(&escape_text(&rich.text));
        out.push_str("</t>");
    } else {
        for (text, font) in rich.segments() {
            out.push_str("<r>");
            if let Some(font) = font {
                write_run_font(out, &font);
            }
            out.push_str("<t");
            if needs_space_preserve(&text) {
                out.push_str(r#" xml:space="preserve""#);
            }
            out.push('>');
            out.push_str(&escape_text(&text));
            out.push_str("</t></r>");
        }
    }

    for run in &rich.phonetic_runs {
        out.push_str(&format!(r#"<rPh sb="{}" eb="{}"><t>"#, run.start, run.end));
        out.push_str(&escape_text(&run.text));
        out.push_str("</t></rPh>");
    }
    if let Some(props) = &rich.phonetic_properties {
        out.push_str("<phoneticPr");
        if let Some(font_id) = props.font_id {
            out.push_str(&format!(r#" fontId="{font_id}""#));
        }
        if let Some(alignment) = &props.alignment {
            out.push_str(&format!(r#" alignment="{}""#, escape_attr(alignment)));
        }
        if let Some(conversion_type) = &props.conversion_type {
            out.push_str(&format!(r#" type="{}""#, escape_attr(conversion_type)));
        }
        out.push_str("/>");
    }
}

fn write_run_font(out: &mut String, font: &RunFont) {
    out.push_str("<rPr>");
    if font.bold == Some(true) {
        out.push_str("<b/>");
    }
    if font.italic == Some(true) {
        out.push_str("<i/>");
    }
    if font.strikethrough == Some(true) {
        out.push_str("<strike/>");
    }
    if let Some(underline) = font.underline {
        match underline.to_ooxml() {
            Some(val) => out.push_str(&format!(r#"<u val="{val}"/>"#)),
            None => out.push_str("<u/>"),
        }
    }
    if let Some(size) = font.size {
        out.push_str(&format!(r#"<sz val="{}"/>"#, crate::xml::format_f64(size)));
    }
    if let Some(color) = &font.color {
        write_color(out, "color", color);
    }
    if let Some(name) = &font.name {
        out.push_str(&format!(r#"<rFont val="{}"/>"#, escape_attr(name)));
    }
    out.push_str("</rPr>");
}

/// Serialize a color element the way styles and run properties share.
pub(crate) fn write_color(out: &mut String, element: &str, color: &Color) {
    match color {
        Color::Rgb(argb) => out.push_str(&format!(r#"<{element} rgb="{argb}"/>"#)),
        Color::Theme { index, tint_1000 } => {
            out.push_str(&format!(r#"<{element} theme="{index}""#));
            if let Some(tint) = tint_1000 {
                out.push_str(&format!(r#" tint="{}""#, *tint as f64 / 1000.0));
            }
            out.push_str("/>");
        }
        Color::Indexed(indexed) => out.push_str(&format!(r#"<{element} indexed="{indexed}"/>"#)),
        Color::Auto => out.push_str(&format!(r#"<{element} auto="1"/>"#)),
    }
}

pub(crate) fn read_text<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<String, ReadError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(std::str::from_utf8(e.as_ref())?),
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: String::new(),
                    element: "unexpected EOF in text element".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

pub(crate) fn attr_string(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ReadError> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if crate::openxml::local_name(attr.key.as_ref()) == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

pub(crate) fn attr_u32(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<u32>, ReadError> {
    Ok(attr_string(e, key)?.and_then(|v| v.trim().parse::<u32>().ok()))
}

fn bool_val(e: &BytesStart<'_>) -> Result<bool, ReadError> {
    let Some(val) = attr_string(e, b"val")? else {
        return Ok(true);
    };
    Ok(!(val == "0" || val.eq_ignore_ascii_case("false")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str, container: &[u8]) -> RichText {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) if e.local_name().as_ref() == container => {
                    return parse_rich_text(&mut reader, container).unwrap();
                }
                Event::Eof => panic!("container not found"),
                _ => {}
            }
            buf.clear();
        }
    }

    #[test]
    fn plain_text_parses() {
        let rich = parse("<si><t>hello</t></si>", b"si");
        assert_eq!(rich.text, "hello");
        assert!(rich.is_plain());
    }

    #[test]
    fn styled_runs_parse() {
        let rich = parse(
            r#"<si><r><rPr><b/><sz val="14"/></rPr><t>big</t></r><r><t> plain</t></r></si>"#,
            b"si",
        );
        assert_eq!(rich.text, "big plain");
        assert_eq!(rich.runs.len(), 2);
        let font = rich.runs[0].font.as_ref().unwrap();
        assert_eq!(font.bold, Some(true));
        assert_eq!(font.size, Some(14.0));
        assert!(rich.runs[1].font.is_none());
    }

    #[test]
    fn phonetic_runs_do_not_pollute_text() {
        let rich = parse(
            r#"<si><t>Base</t><rPh sb="0" eb="4"><t>PHO</t></rPh><phoneticPr fontId="0" type="noConversion"/></si>"#,
            b"si",
        );
        assert_eq!(rich.text, "Base");
        assert_eq!(rich.phonetic_runs.len(), 1);
        assert_eq!(rich.phonetic_runs[0].text, "PHO");
        let props = rich.phonetic_properties.as_ref().unwrap();
        assert_eq!(props.font_id, Some(0));
        assert_eq!(props.conversion_type.as_deref(), Some("noConversion"));
    }

    #[test]
    fn single_plain_run_collapses_to_t() {
        let mut out = String::new();
        write_rich_text(&mut out, &RichText::new("hi"));
        assert_eq!(out, "<t>hi</t>");
    }

    #[test]
    fn styled_write_expands_runs() {
        let rich = RichText::from_segments(vec![
            ("a".to_string(), None),
            (
                "b".to_string(),
                Some(RunFont {
                    bold: Some(true),
                    ..Default::default()
                }),
            ),
        ]);
        let mut out = String::new();
        write_rich_text(&mut out, &rich);
        assert_eq!(out, "<r><t>a</t></r><r><rPr><b/></rPr><t>b</t></r>");
    }

    #[test]
    fn whitespace_gets_space_preserve() {
        let mut out = String::new();
        write_rich_text(&mut out, &RichText::new(" padded "));
        assert_eq!(out, r#"<t xml:space="preserve"> padded </t>"#);
    }
}
