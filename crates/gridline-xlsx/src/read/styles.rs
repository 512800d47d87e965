use gridline_model::style::{
    Alignment, Argb, Border, BorderSide, BorderStyle, Color, Fill, Font, Format, FormatDiff,
    GradientFill, HorizontalAlignment, NamedStyle, NumberFormat, PatternFill, PatternFillType,
    Protection, Stylesheet, UnderlineStyle, VerticalAlignment,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ReadError;
use crate::openxml::parse_xml_bool;
use crate::read::{ReadOptions, UnknownElementPolicy};
use crate::rich_text::{attr_string, attr_u32};

const PART: &str = "xl/styles.xml";

/// Tracks a counted container's declared `count` against the children the
/// parser actually saw. OOXML has no checksum; these declarations are the
/// format's only structural self-consistency signal.
struct CountedContainer {
    container: &'static str,
    declared: Option<usize>,
    actual: usize,
}

impl CountedContainer {
    fn new(container: &'static str, e: &BytesStart<'_>) -> Result<Self, ReadError> {
        let declared = attr_string(e, b"count")?.and_then(|v| v.trim().parse::<usize>().ok());
        Ok(Self {
            container,
            declared,
            actual: 0,
        })
    }

    fn bump(&mut self) {
        self.actual += 1;
    }

    fn finish(self) -> Result<(), ReadError> {
        if let Some(declared) = self.declared {
            if declared != self.actual {
                return Err(ReadError::CountMismatch {
                    part: PART.to_string(),
                    container: self.container,
                    declared,
                    actual: self.actual,
                });
            }
        }
        Ok(())
    }
}

/// Parse `xl/styles.xml` into a [`Stylesheet`].
///
/// Vector order is preserved exactly: every record's position is the index
/// cell formats reference.
pub(crate) fn parse_stylesheet(
    xml: &[u8],
    options: &ReadOptions,
) -> Result<Stylesheet, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();

    let mut number_formats: Vec<NumberFormat> = Vec::new();
    let mut fonts: Vec<Font> = Vec::new();
    let mut fills: Vec<Fill> = Vec::new();
    let mut borders: Vec<Border> = Vec::new();
    let mut style_formats: Vec<Format> = Vec::new();
    let mut formats: Vec<Format> = Vec::new();
    let mut cell_styles: Vec<(String, u32, Option<u32>, bool)> = Vec::new();
    let mut format_diffs: Vec<FormatDiff> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"styleSheet" => {}
                b"numFmts" => {
                    let mut counted = CountedContainer::new("numFmts", &e)?;
                    parse_children(&mut reader, b"numFmts", |reader, child, empty| {
                        if child.local_name().as_ref() == b"numFmt" {
                            counted.bump();
                            let id = attr_u32(child, b"numFmtId")?.unwrap_or(0);
                            let mut code =
                                attr_string(child, b"formatCode")?.unwrap_or_default();
                            if code == "GENERAL" {
                                code = "General".to_string();
                            }
                            number_formats.push(NumberFormat::new(id, code));
                            if !empty {
                                reader.read_to_end_into(child.name(), &mut Vec::new())?;
                            }
                        } else {
                            unknown_child(options, reader, child, empty)?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                b"fonts" => {
                    let mut counted = CountedContainer::new("fonts", &e)?;
                    parse_children(&mut reader, b"fonts", |reader, child, empty| {
                        if child.local_name().as_ref() == b"font" {
                            counted.bump();
                            if empty {
                                fonts.push(Font::default());
                            } else {
                                fonts.push(parse_font(reader, b"font")?);
                            }
                        } else {
                            unknown_child(options, reader, child, empty)?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                b"fills" => {
                    let mut counted = CountedContainer::new("fills", &e)?;
                    parse_children(&mut reader, b"fills", |reader, child, empty| {
                        if child.local_name().as_ref() == b"fill" {
                            counted.bump();
                            if empty {
                                fills.push(Fill::default());
                            } else {
                                fills.push(parse_fill(reader)?);
                            }
                        } else {
                            unknown_child(options, reader, child, empty)?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                b"borders" => {
                    let mut counted = CountedContainer::new("borders", &e)?;
                    parse_children(&mut reader, b"borders", |reader, child, empty| {
                        if child.local_name().as_ref() == b"border" {
                            counted.bump();
                            if empty {
                                borders.push(Border::default());
                            } else {
                                borders.push(parse_border(reader, child)?);
                            }
                        } else {
                            unknown_child(options, reader, child, empty)?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                b"cellStyleXfs" => {
                    let mut counted = CountedContainer::new("cellStyleXfs", &e)?;
                    parse_children(&mut reader, b"cellStyleXfs", |reader, child, empty| {
                        if child.local_name().as_ref() == b"xf" {
                            counted.bump();
                            style_formats.push(parse_xf(reader, child, empty)?);
                        } else {
                            unknown_child(options, reader, child, empty)?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                b"cellXfs" => {
                    let mut counted = CountedContainer::new("cellXfs", &e)?;
                    parse_children(&mut reader, b"cellXfs", |reader, child, empty| {
                        if child.local_name().as_ref() == b"xf" {
                            counted.bump();
                            formats.push(parse_xf(reader, child, empty)?);
                        } else {
                            unknown_child(options, reader, child, empty)?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                b"cellStyles" => {
                    let mut counted = CountedContainer::new("cellStyles", &e)?;
                    parse_children(&mut reader, b"cellStyles", |reader, child, empty| {
                        if child.local_name().as_ref() == b"cellStyle" {
                            counted.bump();
                            let name = attr_string(child, b"name")?.unwrap_or_default();
                            let xf_id = attr_u32(child, b"xfId")?.unwrap_or(0);
                            let builtin_id = attr_u32(child, b"builtinId")?;
                            let hidden = attr_string(child, b"hidden")?
                                .map(|v| parse_xml_bool(&v))
                                .unwrap_or(false);
                            cell_styles.push((name, xf_id, builtin_id, hidden));
                            if !empty {
                                reader.read_to_end_into(child.name(), &mut Vec::new())?;
                            }
                        } else {
                            unknown_child(options, reader, child, empty)?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                b"dxfs" => {
                    let mut counted = CountedContainer::new("dxfs", &e)?;
                    parse_children(&mut reader, b"dxfs", |reader, child, empty| {
                        if child.local_name().as_ref() == b"dxf" {
                            counted.bump();
                            if empty {
                                format_diffs.push(FormatDiff::default());
                            } else {
                                format_diffs.push(parse_dxf(reader)?);
                            }
                        } else {
                            unknown_child(options, reader, child, empty)?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                b"tableStyles" => {
                    let mut counted = CountedContainer::new("tableStyles", &e)?;
                    parse_children(&mut reader, b"tableStyles", |reader, child, empty| {
                        if child.local_name().as_ref() == b"tableStyle" {
                            counted.bump();
                        }
                        if !empty {
                            reader.read_to_end_into(child.name(), &mut Vec::new())?;
                        }
                        Ok(())
                    })?;
                    counted.finish()?;
                }
                _ => {
                    if options.unknown_elements == UnknownElementPolicy::Fail {
                        return Err(unexpected(&e));
                    }
                    log::warn!(
                        "{PART}: skipping unknown element <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    );
                    reader.read_to_end_into(e.name(), &mut Vec::new())?;
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                // Counted containers may legitimately be empty; an empty
                // element with a non-zero count is still a mismatch.
                b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellStyleXfs" | b"cellXfs"
                | b"cellStyles" | b"dxfs" => {
                    let name = container_name(e.local_name().as_ref());
                    CountedContainer::new(name, &e)?.finish()?;
                }
                b"tableStyles" => {
                    CountedContainer::new("tableStyles", &e)?.finish()?;
                }
                b"styleSheet" => {}
                _ => {
                    if options.unknown_elements == UnknownElementPolicy::Fail {
                        return Err(unexpected(&e));
                    }
                    log::warn!(
                        "{PART}: skipping unknown element <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    );
                }
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // Every format's named-style back-reference must land on an existing
    // cellStyleXfs record.
    for format in &formats {
        if let Some(style_id) = format.style_id {
            if style_id as usize >= style_formats.len() {
                return Err(ReadError::InvalidValue {
                    part: PART.to_string(),
                    what: "xf xfId",
                    value: style_id.to_string(),
                });
            }
        }
    }

    let mut styles: Vec<NamedStyle> = style_formats
        .into_iter()
        .map(|format| NamedStyle {
            name: String::new(),
            format,
            builtin_id: None,
            hidden: false,
        })
        .collect();
    for (name, xf_id, builtin_id, hidden) in cell_styles {
        let Some(style) = styles.get_mut(xf_id as usize) else {
            return Err(ReadError::InvalidValue {
                part: PART.to_string(),
                what: "cellStyle xfId",
                value: xf_id.to_string(),
            });
        };
        style.name = name;
        style.builtin_id = builtin_id;
        style.hidden = hidden;
    }

    Ok(Stylesheet {
        number_formats,
        fonts,
        fills,
        borders,
        formats,
        styles,
        format_diffs,
    })
}

fn container_name(local: &[u8]) -> &'static str {
    match local {
        b"numFmts" => "numFmts",
        b"fonts" => "fonts",
        b"fills" => "fills",
        b"borders" => "borders",
        b"cellStyleXfs" => "cellStyleXfs",
        b"cellXfs" => "cellXfs",
        b"cellStyles" => "cellStyles",
        b"dxfs" => "dxfs",
        _ => "container",
    }
}

fn unexpected(e: &BytesStart<'_>) -> ReadError {
    ReadError::UnexpectedElement {
        part: PART.to_string(),
        element: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
    }
}

fn unknown_child(
    options: &ReadOptions,
    reader: &mut Reader<&[u8]>,
    child: &BytesStart<'_>,
    empty: bool,
) -> Result<(), ReadError> {
    if options.unknown_elements == UnknownElementPolicy::Fail {
        return Err(unexpected(child));
    }
    log::warn!(
        "{PART}: skipping unknown element <{}>",
        String::from_utf8_lossy(child.name().as_ref())
    );
    if !empty {
        reader.read_to_end_into(child.name(), &mut Vec::new())?;
    }
    Ok(())
}

/// Drive a closure over the direct children of `container`, reporting each
/// start/empty child element along with whether it is self-closing.
fn parse_children<F>(
    reader: &mut Reader<&[u8]>,
    container: &[u8],
    mut each: F,
) -> Result<(), ReadError>
where
    F: FnMut(&mut Reader<&[u8]>, &BytesStart<'_>, bool) -> Result<(), ReadError>,
{
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => each(reader, &e, false)?,
            Event::Empty(e) => each(reader, &e, true)?,
            Event::End(e) if e.local_name().as_ref() == container => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: PART.to_string(),
                    element: format!(
                        "unexpected EOF in <{}>",
                        String::from_utf8_lossy(container)
                    ),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

pub(crate) fn parse_color_attrs(e: &BytesStart<'_>) -> Result<Option<Color>, ReadError> {
    if attr_string(e, b"auto")?.map(|v| parse_xml_bool(&v)) == Some(true) {
        return Ok(Some(Color::Auto));
    }
    if let Some(rgb) = attr_string(e, b"rgb")? {
        if let Ok(argb) = u32::from_str_radix(rgb.trim(), 16) {
            return Ok(Some(Color::Rgb(Argb(argb))));
        }
    }
    if let Some(theme) = attr_u32(e, b"theme")? {
        let tint_1000 = attr_string(e, b"tint")?
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|t| (t * 1000.0).round() as i32);
        return Ok(Some(Color::Theme {
            index: theme,
            tint_1000,
        }));
    }
    if let Some(indexed) = attr_u32(e, b"indexed")? {
        return Ok(Some(Color::Indexed(indexed)));
    }
    Ok(None)
}

pub(crate) fn parse_font(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<Font, ReadError> {
    let mut buf = Vec::new();
    let mut font = Font {
        color: None,
        family: None,
        scheme: None,
        ..Font::default()
    };

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) | Event::Start(e) => {
                match e.local_name().as_ref() {
                    b"sz" => {
                        if let Some(val) = attr_string(&e, b"val")? {
                            if let Ok(size) = val.trim().parse::<f64>() {
                                font.size = size;
                            }
                        }
                    }
                    b"name" | b"rFont" => {
                        if let Some(val) = attr_string(&e, b"val")? {
                            font.name = val;
                        }
                    }
                    b"color" => font.color = parse_color_attrs(&e)?,
                    b"family" => font.family = attr_u32(&e, b"val")?,
                    b"charset" => font.charset = attr_u32(&e, b"val")?,
                    b"scheme" => font.scheme = attr_string(&e, b"val")?,
                    b"b" => font.bold = tag_flag(&e)?,
                    b"i" => font.italic = tag_flag(&e)?,
                    b"strike" => font.strikethrough = tag_flag(&e)?,
                    b"u" => {
                        font.underline =
                            UnderlineStyle::from_ooxml(attr_string(&e, b"val")?.as_deref());
                    }
                    _ => {}
                }
            }
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: PART.to_string(),
                    element: "unexpected EOF in <font>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(font)
}

fn tag_flag(e: &BytesStart<'_>) -> Result<bool, ReadError> {
    Ok(match attr_string(e, b"val")? {
        Some(val) => parse_xml_bool(&val),
        None => true,
    })
}

fn parse_fill(reader: &mut Reader<&[u8]>) -> Result<Fill, ReadError> {
    let mut buf = Vec::new();
    let mut fill = Fill::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"patternFill" => {
                let pattern = attr_string(&e, b"patternType")?
                    .and_then(|v| PatternFillType::from_ooxml(&v))
                    .unwrap_or(PatternFillType::None);
                let mut pattern_fill = PatternFill {
                    pattern,
                    foreground: None,
                    background: None,
                };
                let mut inner = Vec::new();
                loop {
                    match reader.read_event_into(&mut inner)? {
                        Event::Start(c) | Event::Empty(c) => match c.local_name().as_ref() {
                            b"fgColor" => pattern_fill.foreground = parse_color_attrs(&c)?,
                            b"bgColor" => pattern_fill.background = parse_color_attrs(&c)?,
                            _ => {}
                        },
                        Event::End(c) if c.local_name().as_ref() == b"patternFill" => break,
                        Event::Eof => {
                            return Err(ReadError::UnexpectedElement {
                                part: PART.to_string(),
                                element: "unexpected EOF in <patternFill>".to_string(),
                            })
                        }
                        _ => {}
                    }
                    inner.clear();
                }
                fill = Fill::Pattern(pattern_fill);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"patternFill" => {
                let pattern = attr_string(&e, b"patternType")?
                    .and_then(|v| PatternFillType::from_ooxml(&v))
                    .unwrap_or(PatternFillType::None);
                fill = Fill::Pattern(PatternFill {
                    pattern,
                    foreground: None,
                    background: None,
                });
            }
            Event::Start(e) if e.local_name().as_ref() == b"gradientFill" => {
                let degree = attr_string(&e, b"degree")?.and_then(|v| v.trim().parse().ok());
                let mut gradient = GradientFill {
                    degree,
                    stops: Vec::new(),
                };
                let mut inner = Vec::new();
                let mut stop_position: Option<f64> = None;
                loop {
                    match reader.read_event_into(&mut inner)? {
                        Event::Start(c) if c.local_name().as_ref() == b"stop" => {
                            stop_position = attr_string(&c, b"position")?
                                .and_then(|v| v.trim().parse().ok());
                        }
                        Event::Start(c) | Event::Empty(c)
                            if c.local_name().as_ref() == b"color" =>
                        {
                            if let (Some(position), Some(color)) =
                                (stop_position, parse_color_attrs(&c)?)
                            {
                                gradient.stops.push((position, color));
                            }
                        }
                        Event::End(c) if c.local_name().as_ref() == b"gradientFill" => break,
                        Event::Eof => {
                            return Err(ReadError::UnexpectedElement {
                                part: PART.to_string(),
                                element: "unexpected EOF in <gradientFill>".to_string(),
                            })
                        }
                        _ => {}
                    }
                    inner.clear();
                }
                fill = Fill::Gradient(gradient);
            }
            Event::End(e) if e.local_name().as_ref() == b"fill" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: PART.to_string(),
                    element: "unexpected EOF in <fill>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(fill)
}

fn parse_border(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Border, ReadError> {
    let mut border = Border::default();
    border.diagonal_up = attr_string(start, b"diagonalUp")?
        .map(|v| parse_xml_bool(&v))
        .unwrap_or(false);
    border.diagonal_down = attr_string(start, b"diagonalDown")?
        .map(|v| parse_xml_bool(&v))
        .unwrap_or(false);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let side = parse_border_side_start(reader, &e)?;
                assign_border_side(&mut border, e.local_name().as_ref(), side);
            }
            Event::Empty(e) => {
                let side = BorderSide {
                    style: attr_string(&e, b"style")?.and_then(|v| BorderStyle::from_ooxml(&v)),
                    color: None,
                };
                assign_border_side(&mut border, e.local_name().as_ref(), side);
            }
            Event::End(e) if e.local_name().as_ref() == b"border" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: PART.to_string(),
                    element: "unexpected EOF in <border>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(border)
}

fn parse_border_side_start(
    reader: &mut Reader<&[u8]>,
    e: &BytesStart<'_>,
) -> Result<BorderSide, ReadError> {
    let mut side = BorderSide {
        style: attr_string(e, b"style")?.and_then(|v| BorderStyle::from_ooxml(&v)),
        color: None,
    };
    let end_name = e.name().as_ref().to_vec();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(c) | Event::Empty(c) if c.local_name().as_ref() == b"color" => {
                side.color = parse_color_attrs(&c)?;
            }
            Event::End(c) if c.name().as_ref() == end_name.as_slice() => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: PART.to_string(),
                    element: "unexpected EOF in border side".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(side)
}

fn assign_border_side(border: &mut Border, local: &[u8], side: BorderSide) {
    match local {
        b"left" | b"start" => border.left = side,
        b"right" | b"end" => border.right = side,
        b"top" => border.top = side,
        b"bottom" => border.bottom = side,
        b"diagonal" => border.diagonal = side,
        _ => {}
    }
}

fn parse_xf(
    reader: &mut Reader<&[u8]>,
    e: &BytesStart<'_>,
    empty: bool,
) -> Result<Format, ReadError> {
    let mut format = Format {
        number_format_id: attr_u32(e, b"numFmtId")?,
        font_id: attr_u32(e, b"fontId")?,
        fill_id: attr_u32(e, b"fillId")?,
        border_id: attr_u32(e, b"borderId")?,
        style_id: attr_u32(e, b"xfId")?,
        ..Format::default()
    };
    for (key, target) in [
        (&b"applyNumberFormat"[..], &mut format.apply_number_format),
        (&b"applyFont"[..], &mut format.apply_font),
        (&b"applyFill"[..], &mut format.apply_fill),
        (&b"applyBorder"[..], &mut format.apply_border),
        (&b"applyAlignment"[..], &mut format.apply_alignment),
        (&b"applyProtection"[..], &mut format.apply_protection),
    ] {
        if let Some(val) = attr_string(e, key)? {
            *target = parse_xml_bool(&val);
        }
    }

    if empty {
        return Ok(format);
    }

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(c) | Event::Empty(c) => match c.local_name().as_ref() {
                b"alignment" => {
                    let mut alignment = Alignment::default();
                    if let Some(val) = attr_string(&c, b"horizontal")? {
                        alignment.horizontal = HorizontalAlignment::from_ooxml(&val);
                    }
                    if let Some(val) = attr_string(&c, b"vertical")? {
                        alignment.vertical = VerticalAlignment::from_ooxml(&val);
                    }
                    if let Some(val) = attr_string(&c, b"wrapText")? {
                        alignment.wrap_text = parse_xml_bool(&val);
                    }
                    if let Some(val) = attr_string(&c, b"shrinkToFit")? {
                        alignment.shrink_to_fit = parse_xml_bool(&val);
                    }
                    if let Some(val) = attr_u32(&c, b"indent")? {
                        alignment.indent = val;
                    }
                    if let Some(val) = attr_string(&c, b"textRotation")? {
                        alignment.rotation = val.trim().parse().unwrap_or(0);
                    }
                    format.alignment = Some(alignment);
                }
                b"protection" => {
                    let mut protection = Protection::default();
                    if let Some(val) = attr_string(&c, b"locked")? {
                        protection.locked = parse_xml_bool(&val);
                    }
                    if let Some(val) = attr_string(&c, b"hidden")? {
                        protection.hidden = parse_xml_bool(&val);
                    }
                    format.protection = Some(protection);
                }
                _ => {}
            },
            Event::End(c) if c.local_name().as_ref() == b"xf" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: PART.to_string(),
                    element: "unexpected EOF in <xf>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(format)
}

fn parse_dxf(reader: &mut Reader<&[u8]>) -> Result<FormatDiff, ReadError> {
    let mut diff = FormatDiff::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"font" => diff.font = Some(parse_font(reader, b"font")?),
                b"fill" => diff.fill = Some(parse_fill(reader)?),
                b"border" => diff.border = Some(parse_border(reader, &e)?),
                _ => {
                    reader.read_to_end_into(e.name(), &mut Vec::new())?;
                }
            },
            Event::End(e) if e.local_name().as_ref() == b"dxf" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: PART.to_string(),
                    element: "unexpected EOF in <dxf>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_options() -> ReadOptions {
        ReadOptions::default()
    }

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="0.000"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font>
    <font><b/><sz val="11"/><color rgb="FFFF0000"/><name val="Calibri"/></font>
  </fonts>
  <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
  <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="164" fontId="1" fillId="0" borderId="0" xfId="0" applyNumberFormat="1" applyFont="1">
      <alignment horizontal="center" wrapText="1"/>
    </xf>
  </cellXfs>
  <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"#;

    #[test]
    fn parses_minimal_stylesheet() {
        let sheet = parse_stylesheet(MINIMAL.as_bytes(), &default_options()).unwrap();
        assert_eq!(sheet.number_formats.len(), 1);
        assert_eq!(sheet.fonts.len(), 2);
        assert!(sheet.fonts[1].bold);
        assert_eq!(sheet.fills.len(), 2);
        assert_eq!(sheet.formats.len(), 2);
        assert_eq!(sheet.styles.len(), 1);
        assert_eq!(sheet.styles[0].name, "Normal");

        let styled = &sheet.formats[1];
        assert_eq!(styled.number_format_id, Some(164));
        assert!(styled.apply_number_format);
        let alignment = styled.alignment.as_ref().unwrap();
        assert_eq!(alignment.horizontal, Some(HorizontalAlignment::Center));
        assert!(alignment.wrap_text);
    }

    #[test]
    fn font_count_mismatch_is_rejected() {
        let xml = MINIMAL.replace(r#"<fonts count="2">"#, r#"<fonts count="3">"#);
        let err = parse_stylesheet(xml.as_bytes(), &default_options()).unwrap_err();
        assert!(matches!(
            err,
            ReadError::CountMismatch {
                container: "fonts",
                declared: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn xf_id_out_of_range_is_rejected() {
        let xml = MINIMAL.replace(r#"xfId="0" applyNumberFormat"#, r#"xfId="9" applyNumberFormat"#);
        let err = parse_stylesheet(xml.as_bytes(), &default_options()).unwrap_err();
        assert!(matches!(err, ReadError::InvalidValue { what: "xf xfId", .. }));
    }

    #[test]
    fn unknown_element_policy_is_honored() {
        let xml = MINIMAL.replace(
            "<numFmts count=\"1\">",
            "<mystery/><numFmts count=\"1\">",
        );
        let strict = ReadOptions {
            unknown_elements: UnknownElementPolicy::Fail,
        };
        assert!(matches!(
            parse_stylesheet(xml.as_bytes(), &strict),
            Err(ReadError::UnexpectedElement { .. })
        ));
        assert!(parse_stylesheet(xml.as_bytes(), &default_options()).is_ok());
    }
}
