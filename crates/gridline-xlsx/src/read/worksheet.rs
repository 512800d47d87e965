use std::collections::HashMap;

use gridline_model::rich_text::RichText;
use gridline_model::worksheet::{ColumnProperties, Pane, PaneState, RowProperties, Selection};
use gridline_model::{
    Cell, CellRef, CellValue, ErrorValue, Range, SharedStrings, Stylesheet, Worksheet,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ReadError;
use crate::header_footer::split_sections;
use crate::read::{ReadOptions, UnknownElementPolicy};
use crate::rich_text::{attr_string, attr_u32, parse_rich_text, read_text};

/// Raw formula attributes captured during the parse phase.
#[derive(Clone, Debug, Default)]
pub(crate) struct RawFormula {
    pub t: Option<String>,
    pub reference: Option<String>,
    pub shared_index: Option<u32>,
    pub text: String,
}

/// One `<c>` element as read off the wire, before type coercion.
#[derive(Clone, Debug, Default)]
pub(crate) struct RawCell {
    pub reference: Option<CellRef>,
    pub type_code: Option<String>,
    pub format_index: Option<u32>,
    pub formula: Option<RawFormula>,
    pub value_text: Option<String>,
    pub inline_string: Option<RichText>,
    pub show_phonetics: bool,
}

impl RawCell {
    pub(crate) fn clear(&mut self) {
        *self = RawCell::default();
    }
}

/// A hyperlink reference awaiting relationship resolution.
#[derive(Clone, Debug)]
pub(crate) struct PendingHyperlink {
    pub cell: CellRef,
    pub rel_id: Option<String>,
    pub location: Option<String>,
    pub tooltip: Option<String>,
    pub display: Option<String>,
}

/// The separable parse-phase output for `<sheetData>`: row properties and
/// raw cell records, not yet converted to typed cells.
#[derive(Debug, Default)]
pub(crate) struct ParsedSheetData {
    pub rows: Vec<(u32, RowProperties)>,
    pub cells: Vec<RawCell>,
}

/// Per-worksheet shared formula state: the master text cached by `si` index.
/// Valid only within one worksheet; followers resolve by lookup and receive
/// the master's literal text unchanged.
#[derive(Debug, Default)]
pub(crate) struct SharedFormulas {
    masters: HashMap<u32, String>,
}

impl SharedFormulas {
    pub(crate) fn resolve(&mut self, formula: &RawFormula) -> Option<String> {
        if formula.t.as_deref() == Some("shared") {
            if let Some(index) = formula.shared_index {
                if formula.text.is_empty() {
                    return self.masters.get(&index).cloned();
                }
                self.masters.insert(index, formula.text.clone());
            }
        }
        if formula.text.is_empty() {
            None
        } else {
            Some(formula.text.clone())
        }
    }
}

/// Parse one worksheet part into the model.
///
/// Bulk mode runs in two separable phases: the parse phase walks the XML once
/// collecting raw row/cell records (and applies non-cell state directly); the
/// construct phase then converts each raw cell into a typed cell. Array
/// formula ranges are filled in after the whole sheet is parsed because a
/// range may extend past its defining cell.
pub(crate) fn parse_worksheet(
    worksheet: &mut Worksheet,
    part: &str,
    xml: &[u8],
    shared_strings: &SharedStrings,
    stylesheet: &Stylesheet,
    options: &ReadOptions,
) -> Result<Vec<PendingHyperlink>, ReadError> {
    let (sheet_data, hyperlinks) = parse_phase(worksheet, part, xml, options)?;
    construct_phase(
        worksheet,
        part,
        sheet_data,
        shared_strings,
        stylesheet,
        options,
    )?;
    Ok(hyperlinks)
}

/// Phase 1: walk the part's XML, applying non-cell state to the worksheet and
/// collecting `<sheetData>` into raw records.
fn parse_phase(
    worksheet: &mut Worksheet,
    part: &str,
    xml: &[u8],
    options: &ReadOptions,
) -> Result<(ParsedSheetData, Vec<PendingHyperlink>), ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheet_data = ParsedSheetData::default();
    let mut hyperlinks: Vec<PendingHyperlink> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"worksheet" => {}
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                parse_sheet_data(&mut reader, part, &mut sheet_data, options)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {}
            Event::Start(e) if e.local_name().as_ref() == b"cols" => {
                parse_cols(&mut reader, worksheet)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"mergeCells" => {
                parse_merge_cells(&mut reader, worksheet)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"sheetViews" => {
                parse_sheet_views(&mut reader, worksheet)?;
            }
            // Attribute-bearing elements that may still carry children
            // (filter columns, extension lists): read the attributes, then
            // drain whatever subtree remains.
            Event::Start(e) if e.local_name().as_ref() == b"autoFilter" => {
                if let Some(reference) = attr_string(&e, b"ref")? {
                    let range = Range::from_a1(&reference)
                        .map_err(|_| ReadError::InvalidRangeRef(reference))?;
                    worksheet.auto_filter = Some(range);
                }
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"autoFilter" => {
                if let Some(reference) = attr_string(&e, b"ref")? {
                    let range = Range::from_a1(&reference)
                        .map_err(|_| ReadError::InvalidRangeRef(reference))?;
                    worksheet.auto_filter = Some(range);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"hyperlinks" => {
                parse_hyperlinks(&mut reader, &mut hyperlinks)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"pageMargins" => {
                worksheet.page_margins = Some(parse_page_margins(&e)?);
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"pageMargins" => {
                worksheet.page_margins = Some(parse_page_margins(&e)?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"pageSetup" => {
                parse_page_setup(&e, worksheet)?;
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"pageSetup" => {
                parse_page_setup(&e, worksheet)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"printOptions" => {
                parse_print_options(&e, worksheet)?;
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"printOptions" => {
                parse_print_options(&e, worksheet)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"headerFooter" => {
                parse_header_footer(&mut reader, &e, worksheet)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"rowBreaks" => {
                let breaks = parse_breaks(&mut reader, part, b"rowBreaks", &e)?;
                worksheet.page_breaks.rows = breaks;
            }
            Event::Start(e) if e.local_name().as_ref() == b"colBreaks" => {
                let breaks = parse_breaks(&mut reader, part, b"colBreaks", &e)?;
                worksheet.page_breaks.cols = breaks;
            }
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                if is_known_ignored(&local) {
                    reader.read_to_end_into(e.name(), &mut Vec::new())?;
                } else if options.unknown_elements == UnknownElementPolicy::Fail {
                    return Err(ReadError::UnexpectedElement {
                        part: part.to_string(),
                        element: String::from_utf8_lossy(&local).into_owned(),
                    });
                } else {
                    log::warn!(
                        "{part}: skipping unknown element <{}>",
                        String::from_utf8_lossy(&local)
                    );
                    reader.read_to_end_into(e.name(), &mut Vec::new())?;
                }
            }
            Event::Empty(e) => {
                let local = e.local_name().as_ref();
                // Containers handled above may legitimately be self-closing.
                let handled_empty = matches!(
                    local,
                    b"cols" | b"mergeCells" | b"sheetViews" | b"hyperlinks" | b"headerFooter"
                        | b"rowBreaks" | b"colBreaks"
                );
                if !handled_empty && !is_known_ignored(local) {
                    if options.unknown_elements == UnknownElementPolicy::Fail {
                        return Err(ReadError::UnexpectedElement {
                            part: part.to_string(),
                            element: String::from_utf8_lossy(local).into_owned(),
                        });
                    }
                    log::warn!(
                        "{part}: skipping unknown element <{}>",
                        String::from_utf8_lossy(local)
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((sheet_data, hyperlinks))
}

/// CT_Worksheet members this codec reads elsewhere or deliberately ignores.
/// The unknown-element policy applies only to elements outside the grammar.
fn is_known_ignored(local: &[u8]) -> bool {
    matches!(
        local,
        b"sheetPr"
            | b"dimension"
            | b"sheetFormatPr"
            | b"sheetProtection"
            | b"protectedRanges"
            | b"scenarios"
            | b"sortState"
            | b"dataConsolidate"
            | b"customSheetViews"
            | b"phoneticPr"
            | b"conditionalFormatting"
            | b"dataValidations"
            | b"customProperties"
            | b"cellWatches"
            | b"ignoredErrors"
            | b"smartTags"
            | b"drawing"
            | b"drawingHF"
            | b"legacyDrawing"
            | b"legacyDrawingHF"
            | b"picture"
            | b"oleObjects"
            | b"controls"
            | b"webPublishItems"
            | b"tableParts"
            | b"extLst"
    )
}

fn parse_sheet_data(
    reader: &mut Reader<&[u8]>,
    part: &str,
    out: &mut ParsedSheetData,
    options: &ReadOptions,
) -> Result<(), ReadError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                if let Some((index, props)) = parse_row_attrs(&e)? {
                    out.rows.push((index, props));
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let mut cell = RawCell::default();
                parse_cell(reader, part, &e, false, &mut cell, options)?;
                out.cells.push(cell);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let mut cell = RawCell::default();
                parse_cell(reader, part, &e, true, &mut cell, options)?;
                out.cells.push(cell);
            }
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: part.to_string(),
                    element: "unexpected EOF in <sheetData>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Row attributes. Returns `None` when the element carries no index (the
/// schema requires one; tolerate its absence by dropping the row props).
pub(crate) fn parse_row_attrs(
    e: &BytesStart<'_>,
) -> Result<Option<(u32, RowProperties)>, ReadError> {
    let Some(index) = attr_u32(e, b"r")? else {
        return Ok(None);
    };
    if index == 0 {
        return Ok(None);
    }

    let mut props = RowProperties::default();
    if let Some(height) = attr_string(e, b"ht")? {
        props.height = height.trim().parse::<f64>().ok();
    }
    if let Some(val) = attr_string(e, b"customHeight")? {
        props.custom_height = crate::openxml::parse_xml_bool(&val);
    }
    if let Some(val) = attr_string(e, b"hidden")? {
        props.hidden = crate::openxml::parse_xml_bool(&val);
    }
    if attr_string(e, b"customFormat")?.is_some_and(|v| crate::openxml::parse_xml_bool(&v)) {
        props.format = attr_u32(e, b"s")?;
    }
    Ok(Some((index, props)))
}

/// Parse one `<c>` element into a raw record. The streaming reader shares
/// this with the bulk parser, handing in its single reusable buffer cell.
pub(crate) fn parse_cell<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    part: &str,
    e: &BytesStart<'_>,
    empty: bool,
    out: &mut RawCell,
    options: &ReadOptions,
) -> Result<(), ReadError> {
    out.clear();

    if let Some(a1) = attr_string(e, b"r")? {
        out.reference = Some(CellRef::from_a1(&a1).map_err(|_| ReadError::InvalidCellRef(a1))?);
    }
    out.type_code = attr_string(e, b"t")?;
    out.format_index = attr_u32(e, b"s")?;
    if let Some(val) = attr_string(e, b"ph")? {
        out.show_phonetics = crate::openxml::parse_xml_bool(&val);
    }

    if empty {
        return Ok(());
    }

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(c) if c.local_name().as_ref() == b"v" => {
                out.value_text = Some(read_text(reader, b"v")?);
            }
            Event::Empty(c) if c.local_name().as_ref() == b"v" => {
                out.value_text = Some(String::new());
            }
            Event::Start(c) if c.local_name().as_ref() == b"f" => {
                let mut formula = parse_formula_attrs(&c)?;
                formula.text = read_text(reader, b"f")?;
                out.formula = Some(formula);
            }
            Event::Empty(c) if c.local_name().as_ref() == b"f" => {
                out.formula = Some(parse_formula_attrs(&c)?);
            }
            Event::Start(c) if c.local_name().as_ref() == b"is" => {
                out.inline_string = Some(parse_rich_text(reader, b"is")?);
            }
            Event::Empty(c) if c.local_name().as_ref() == b"is" => {
                out.inline_string = Some(RichText::default());
            }
            Event::Start(c) if c.local_name().as_ref() == b"extLst" => {
                reader.read_to_end_into(c.name(), &mut Vec::new())?;
            }
            Event::Start(c) => {
                if options.unknown_elements == UnknownElementPolicy::Fail {
                    return Err(ReadError::UnexpectedElement {
                        part: part.to_string(),
                        element: String::from_utf8_lossy(c.name().as_ref()).into_owned(),
                    });
                }
                log::warn!(
                    "{part}: skipping unknown element <{}> in cell",
                    String::from_utf8_lossy(c.name().as_ref())
                );
                reader.read_to_end_into(c.name(), &mut Vec::new())?;
            }
            Event::End(c) if c.local_name().as_ref() == b"c" => break,
            Event::Eof => {
                return Err(ReadError::UnexpectedElement {
                    part: part.to_string(),
                    element: "unexpected EOF in <c>".to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_formula_attrs(e: &BytesStart<'_>) -> Result<RawFormula, ReadError> {
    Ok(RawFormula {
        t: attr_string(e, b"t")?,
        reference: attr_string(e, b"ref")?,
        shared_index: attr_u32(e, b"si")?,
        text: String::new(),
    })
}

/// Phase 2: convert raw records into typed cells and insert them.
fn construct_phase(
    worksheet: &mut Worksheet,
    part: &str,
    sheet_data: ParsedSheetData,
    shared_strings: &SharedStrings,
    stylesheet: &Stylesheet,
    options: &ReadOptions,
) -> Result<(), ReadError> {
    for (index, props) in sheet_data.rows {
        if !props.is_default() {
            worksheet.row_properties.insert(index - 1, props);
        }
    }

    let mut shared_formulas = SharedFormulas::default();
    let mut array_formulas: Vec<(Range, String)> = Vec::new();

    for raw in sheet_data.cells {
        let Some(reference) = raw.reference else {
            continue;
        };

        if let Some(formula) = &raw.formula {
            if formula.t.as_deref() == Some("array") && !formula.text.is_empty() {
                if let Some(range_text) = formula.reference.as_deref() {
                    let range = Range::from_a1(range_text)
                        .map_err(|_| ReadError::InvalidRangeRef(range_text.to_string()))?;
                    array_formulas.push((range, formula.text.clone()));
                }
            }
        }

        let cell = construct_cell(&raw, part, shared_strings, stylesheet, &mut shared_formulas, options)?;
        if !cell.is_truly_empty() {
            worksheet.set_cell(reference, cell);
        }
    }

    // Array formula ranges may extend into cells parsed after the defining
    // cell, so this fill-in runs only once the whole sheet has been read.
    for (range, text) in array_formulas {
        for cell_ref in range.iter() {
            if worksheet.formula(cell_ref).is_none() {
                worksheet.set_formula(cell_ref, Some(text.clone()));
            }
        }
    }

    Ok(())
}

/// Convert one raw cell record into a typed cell (the construct half of the
/// parse→construct split).
pub(crate) fn construct_cell(
    raw: &RawCell,
    part: &str,
    shared_strings: &SharedStrings,
    stylesheet: &Stylesheet,
    shared_formulas: &mut SharedFormulas,
    options: &ReadOptions,
) -> Result<Cell, ReadError> {
    let mut cell = Cell::default();
    cell.show_phonetics = raw.show_phonetics;

    if let Some(index) = raw.format_index {
        if index as usize >= stylesheet.formats.len() {
            return Err(ReadError::InvalidValue {
                part: part.to_string(),
                what: "cell style index",
                value: index.to_string(),
            });
        }
        cell.format = Some(index);
    }

    if let Some(formula) = &raw.formula {
        cell.formula = shared_formulas.resolve(formula);
    }

    cell.value = coerce_value(raw, part, shared_strings, stylesheet, options)?;
    Ok(cell)
}

fn coerce_value(
    raw: &RawCell,
    part: &str,
    shared_strings: &SharedStrings,
    stylesheet: &Stylesheet,
    options: &ReadOptions,
) -> Result<CellValue, ReadError> {
    let type_code = raw.type_code.as_deref();

    if type_code == Some("inlineStr") {
        return Ok(match &raw.inline_string {
            Some(rich) => CellValue::InlineString(rich.clone()),
            None => CellValue::Empty,
        });
    }

    let Some(value_text) = raw.value_text.as_deref() else {
        return Ok(CellValue::Empty);
    };

    // A value beginning with `#` is an error literal regardless of the
    // declared type.
    if value_text.starts_with('#') {
        if let Some(err) = ErrorValue::from_str_lossy(value_text) {
            return Ok(CellValue::Error(err));
        }
    }

    match type_code {
        Some("s") => {
            let index: u32 = value_text.trim().parse().map_err(|_| ReadError::InvalidValue {
                part: part.to_string(),
                what: "shared string index",
                value: value_text.to_string(),
            })?;
            if shared_strings.get(index).is_none() {
                return Err(ReadError::SharedStringIndexOutOfRange {
                    index,
                    count: shared_strings.len(),
                });
            }
            Ok(CellValue::SharedString(index))
        }
        Some("b") => match value_text.trim() {
            "1" | "true" => Ok(CellValue::Bool(true)),
            "0" | "false" => Ok(CellValue::Bool(false)),
            other => {
                if options.unknown_elements == UnknownElementPolicy::Fail {
                    Err(ReadError::InvalidValue {
                        part: part.to_string(),
                        what: "boolean cell value",
                        value: other.to_string(),
                    })
                } else {
                    log::warn!("{part}: treating malformed boolean {other:?} as false");
                    Ok(CellValue::Bool(false))
                }
            }
        },
        Some("str") => Ok(CellValue::FormulaString(value_text.to_string())),
        Some("e") => Ok(CellValue::Error(
            ErrorValue::from_str_lossy(value_text).unwrap_or(ErrorValue::NA),
        )),
        Some("n") | None => {
            let number: f64 = value_text.trim().parse().map_err(|_| ReadError::InvalidValue {
                part: part.to_string(),
                what: "numeric cell value",
                value: value_text.to_string(),
            })?;
            // OOXML has no date type: date-ness is inferred from the cell's
            // number format once the number is in hand.
            let is_date = raw
                .format_index
                .map(|index| stylesheet.format_is_date(index))
                .unwrap_or(false);
            if is_date {
                Ok(CellValue::Date(number))
            } else {
                Ok(CellValue::Number(number))
            }
        }
        Some(other) => {
            if options.unknown_elements == UnknownElementPolicy::Fail {
                return Err(ReadError::InvalidValue {
                    part: part.to_string(),
                    what: "cell type",
                    value: other.to_string(),
                });
            }
            log::warn!("{part}: unrecognized cell type {other:?}, keeping raw text");
            Ok(CellValue::FormulaString(value_text.to_string()))
        }
    }
}

fn parse_cols(reader: &mut Reader<&[u8]>, worksheet: &mut Worksheet) -> Result<(), ReadError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"col" => {
                let Some(min) = attr_u32(&e, b"min")? else {
                    continue;
                };
                let max = attr_u32(&e, b"max")?.unwrap_or(min);
                if min == 0 || max < min || min > gridline_model::MAX_COLS {
                    continue;
                }
                let max = max.min(gridline_model::MAX_COLS);

                let mut props = ColumnProperties::default();
                if let Some(width) = attr_string(&e, b"width")? {
                    props.width = width.trim().parse::<f64>().ok();
                }
                if let Some(val) = attr_string(&e, b"customWidth")? {
                    props.custom_width = crate::openxml::parse_xml_bool(&val);
                }
                if let Some(val) = attr_string(&e, b"hidden")? {
                    props.hidden = crate::openxml::parse_xml_bool(&val);
                }
                if let Some(val) = attr_string(&e, b"bestFit")? {
                    props.best_fit = crate::openxml::parse_xml_bool(&val);
                }
                props.format = attr_u32(&e, b"style")?;

                if !props.is_default() {
                    for col_1_based in min..=max {
                        worksheet
                            .column_properties
                            .insert(col_1_based - 1, props.clone());
                    }
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"cols" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_merge_cells(
    reader: &mut Reader<&[u8]>,
    worksheet: &mut Worksheet,
) -> Result<(), ReadError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"mergeCell" => {
                if let Some(reference) = attr_string(&e, b"ref")? {
                    let range = Range::from_a1(&reference)
                        .map_err(|_| ReadError::InvalidRangeRef(reference))?;
                    worksheet.merge_cells(range)?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"mergeCells" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_sheet_views(
    reader: &mut Reader<&[u8]>,
    worksheet: &mut Worksheet,
) -> Result<(), ReadError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheetView" => {
                if let Some(val) = attr_string(&e, b"showGridLines")? {
                    worksheet.view.show_grid_lines = crate::openxml::parse_xml_bool(&val);
                }
                if let Some(val) = attr_string(&e, b"tabSelected")? {
                    worksheet.view.tab_selected = crate::openxml::parse_xml_bool(&val);
                }
                if let Some(val) = attr_u32(&e, b"zoomScale")? {
                    worksheet.view.zoom_scale = Some(val);
                }
                if let Some(val) = attr_string(&e, b"topLeftCell")? {
                    worksheet.view.top_left_cell = CellRef::from_a1(&val).ok();
                }
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"pane" => {
                let x_split = attr_string(&e, b"xSplit")?
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .unwrap_or(0.0);
                let y_split = attr_string(&e, b"ySplit")?
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .unwrap_or(0.0);
                let top_left_cell = attr_string(&e, b"topLeftCell")?
                    .and_then(|v| CellRef::from_a1(&v).ok());
                let state = attr_string(&e, b"state")?
                    .map(|v| PaneState::from_ooxml(&v))
                    .unwrap_or_default();
                let active_pane = attr_string(&e, b"activePane")?;
                worksheet.view.pane = Some(Pane {
                    x_split,
                    y_split,
                    top_left_cell,
                    state,
                    active_pane,
                });
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"selection" => {
                let active_cell = attr_string(&e, b"activeCell")?
                    .and_then(|v| CellRef::from_a1(&v).ok());
                let sqref = attr_string(&e, b"sqref")?
                    .and_then(|v| Range::from_a1(v.split(' ').next().unwrap_or(&v)).ok());
                let pane = attr_string(&e, b"pane")?;
                worksheet.view.selections.push(Selection {
                    active_cell,
                    sqref,
                    pane,
                });
            }
            Event::End(e) if e.local_name().as_ref() == b"sheetViews" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_hyperlinks(
    reader: &mut Reader<&[u8]>,
    out: &mut Vec<PendingHyperlink>,
) -> Result<(), ReadError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"hyperlink" => {
                let Some(reference) = attr_string(&e, b"ref")? else {
                    continue;
                };
                let cell = CellRef::from_a1(&reference)
                    .map_err(|_| ReadError::InvalidCellRef(reference))?;
                out.push(PendingHyperlink {
                    cell,
                    rel_id: attr_string(&e, b"id")?,
                    location: attr_string(&e, b"location")?,
                    tooltip: attr_string(&e, b"tooltip")?,
                    display: attr_string(&e, b"display")?,
                });
            }
            Event::End(e) if e.local_name().as_ref() == b"hyperlinks" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_page_margins(
    e: &BytesStart<'_>,
) -> Result<gridline_model::PageMargins, ReadError> {
    let mut margins = gridline_model::PageMargins::default();
    for (key, target) in [
        (&b"left"[..], &mut margins.left),
        (&b"right"[..], &mut margins.right),
        (&b"top"[..], &mut margins.top),
        (&b"bottom"[..], &mut margins.bottom),
        (&b"header"[..], &mut margins.header),
        (&b"footer"[..], &mut margins.footer),
    ] {
        if let Some(val) = attr_string(e, key)? {
            if let Ok(parsed) = val.trim().parse::<f64>() {
                *target = parsed;
            }
        }
    }
    Ok(margins)
}

fn parse_print_options(e: &BytesStart<'_>, worksheet: &mut Worksheet) -> Result<(), ReadError> {
    if let Some(val) = attr_string(e, b"horizontalCentered")? {
        worksheet.page_setup.horizontal_centered = crate::openxml::parse_xml_bool(&val);
    }
    if let Some(val) = attr_string(e, b"verticalCentered")? {
        worksheet.page_setup.vertical_centered = crate::openxml::parse_xml_bool(&val);
    }
    Ok(())
}

fn parse_page_setup(e: &BytesStart<'_>, worksheet: &mut Worksheet) -> Result<(), ReadError> {
    use gridline_model::{PageOrientation, PaperSize};

    if let Some(val) = attr_string(e, b"orientation")? {
        worksheet.page_setup.orientation = match val.as_str() {
            "landscape" => PageOrientation::Landscape,
            _ => PageOrientation::Portrait,
        };
    }
    if let Some(val) = attr_u32(e, b"paperSize")? {
        worksheet.page_setup.paper_size = PaperSize(val);
    }
    worksheet.page_setup.scale = attr_u32(e, b"scale")?;
    worksheet.page_setup.fit_to_width = attr_u32(e, b"fitToWidth")?;
    worksheet.page_setup.fit_to_height = attr_u32(e, b"fitToHeight")?;
    Ok(())
}

fn parse_header_footer(
    reader: &mut Reader<&[u8]>,
    e: &BytesStart<'_>,
    worksheet: &mut Worksheet,
) -> Result<(), ReadError> {
    if let Some(val) = attr_string(e, b"differentOddEven")? {
        worksheet.header_footer.different_odd_even = crate::openxml::parse_xml_bool(&val);
    }
    if let Some(val) = attr_string(e, b"differentFirst")? {
        worksheet.header_footer.different_first = crate::openxml::parse_xml_bool(&val);
    }

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(c) => {
                let local = c.local_name().as_ref().to_vec();
                let text = read_text(reader, &local)?;
                let section = split_sections(&text);
                match local.as_slice() {
                    b"oddHeader" => worksheet.header_footer.odd_header = section,
                    b"oddFooter" => worksheet.header_footer.odd_footer = section,
                    b"evenHeader" => worksheet.header_footer.even_header = section,
                    b"evenFooter" => worksheet.header_footer.even_footer = section,
                    b"firstHeader" => worksheet.header_footer.first_header = section,
                    b"firstFooter" => worksheet.header_footer.first_footer = section,
                    _ => {}
                }
            }
            Event::End(c) if c.local_name().as_ref() == b"headerFooter" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Manual page breaks. Both `count` and `manualBreakCount` are validated
/// against the parsed children, matching every other counted container.
fn parse_breaks(
    reader: &mut Reader<&[u8]>,
    part: &str,
    container: &[u8],
    e: &BytesStart<'_>,
) -> Result<Vec<u32>, ReadError> {
    let declared_count =
        attr_string(e, b"count")?.and_then(|v| v.trim().parse::<usize>().ok());
    let declared_manual =
        attr_string(e, b"manualBreakCount")?.and_then(|v| v.trim().parse::<usize>().ok());

    let mut breaks = Vec::new();
    let mut manual = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(c) | Event::Empty(c) if c.local_name().as_ref() == b"brk" => {
                if let Some(id) = attr_u32(&c, b"id")? {
                    breaks.push(id);
                }
                if attr_string(&c, b"man")?.is_some_and(|v| crate::openxml::parse_xml_bool(&v)) {
                    manual += 1;
                }
            }
            Event::End(c) if c.local_name().as_ref() == container => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let container_name: &'static str = if container == b"rowBreaks" {
        "rowBreaks"
    } else {
        "colBreaks"
    };
    if let Some(declared) = declared_count {
        if declared != breaks.len() {
            return Err(ReadError::CountMismatch {
                part: part.to_string(),
                container: container_name,
                declared,
                actual: breaks.len(),
            });
        }
    }
    if let Some(declared) = declared_manual {
        if declared != manual {
            return Err(ReadError::CountMismatch {
                part: part.to_string(),
                container: container_name,
                declared,
                actual: manual,
            });
        }
    }

    Ok(breaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> (Worksheet, Vec<PendingHyperlink>) {
        let mut worksheet = Worksheet::new(1, "Sheet1");
        let shared = SharedStrings::new();
        let styles = Stylesheet::new();
        let options = ReadOptions::default();
        let links = parse_worksheet(
            &mut worksheet,
            "xl/worksheets/sheet1.xml",
            xml.as_bytes(),
            &shared,
            &styles,
            &options,
        )
        .unwrap();
        (worksheet, links)
    }

    #[test]
    fn values_and_formulas_parse() {
        let (ws, _) = parse(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1"><v>42</v></c><c r="B1" t="b"><v>1</v></c><c r="C1"><f>A1*2</f></c></row>
</sheetData>
</worksheet>"#,
        );
        assert_eq!(
            ws.cell(CellRef::new(0, 0)).unwrap().value,
            CellValue::Number(42.0)
        );
        assert_eq!(
            ws.cell(CellRef::new(0, 1)).unwrap().value,
            CellValue::Bool(true)
        );
        assert_eq!(ws.formula(CellRef::new(0, 2)), Some("A1*2"));
    }

    #[test]
    fn shared_formula_followers_resolve_to_master_text() {
        let (ws, _) = parse(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="2"><c r="B2"><f t="shared" ref="B2:B3" si="0">A1+1</f><v>2</v></c></row>
<row r="3"><c r="B3"><f t="shared" si="0"/><v>3</v></c></row>
</sheetData>
</worksheet>"#,
        );
        assert_eq!(ws.formula(CellRef::new(1, 1)), Some("A1+1"));
        assert_eq!(ws.formula(CellRef::new(2, 1)), Some("A1+1"));
    }

    #[test]
    fn array_formula_fills_range_after_parse() {
        let (ws, _) = parse(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1"><f t="array" ref="A1:A3">ROW()</f><v>1</v></c></row>
<row r="2"><c r="A2"><v>2</v></c></row>
<row r="3"><c r="A3"><v>3</v></c></row>
</sheetData>
</worksheet>"#,
        );
        assert_eq!(ws.formula(CellRef::new(0, 0)), Some("ROW()"));
        assert_eq!(ws.formula(CellRef::new(1, 0)), Some("ROW()"));
        assert_eq!(ws.formula(CellRef::new(2, 0)), Some("ROW()"));
    }

    #[test]
    fn error_literal_wins_over_declared_type() {
        let (ws, _) = parse(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1"><v>#DIV/0!</v></c></row>
</sheetData>
</worksheet>"#,
        );
        assert_eq!(
            ws.cell(CellRef::new(0, 0)).unwrap().value,
            CellValue::Error(ErrorValue::Div0)
        );
    }

    #[test]
    fn merges_and_row_props_parse() {
        let (ws, _) = parse(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="2" ht="30" customHeight="1" hidden="1"><c r="A2"><v>1</v></c></row>
</sheetData>
<mergeCells count="1"><mergeCell ref="A5:B6"/></mergeCells>
</worksheet>"#,
        );
        let props = ws.row_properties.get(&1).unwrap();
        assert_eq!(props.height, Some(30.0));
        assert!(props.custom_height);
        assert!(props.hidden);
        assert_eq!(ws.merged_ranges(), &[Range::from_a1("A5:B6").unwrap()]);
    }

    #[test]
    fn page_break_counts_are_validated() {
        let mut worksheet = Worksheet::new(1, "Sheet1");
        let shared = SharedStrings::new();
        let styles = Stylesheet::new();
        let options = ReadOptions::default();
        let err = parse_worksheet(
            &mut worksheet,
            "xl/worksheets/sheet1.xml",
            br#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData/>
<rowBreaks count="2" manualBreakCount="2"><brk id="5" man="1"/></rowBreaks>
</worksheet>"#,
            &shared,
            &styles,
            &options,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReadError::CountMismatch {
                container: "rowBreaks",
                ..
            }
        ));
    }

    #[test]
    fn unknown_elements_fail_in_strict_mode() {
        let mut worksheet = Worksheet::new(1, "Sheet1");
        let shared = SharedStrings::new();
        let styles = Stylesheet::new();
        let strict = ReadOptions {
            unknown_elements: UnknownElementPolicy::Fail,
        };
        let err = parse_worksheet(
            &mut worksheet,
            "xl/worksheets/sheet1.xml",
            br#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<bogusElement><child/></bogusElement>
<sheetData/>
</worksheet>"#,
            &shared,
            &styles,
            &strict,
        )
        .unwrap_err();
        assert!(matches!(err, ReadError::UnexpectedElement { .. }));
    }
}
