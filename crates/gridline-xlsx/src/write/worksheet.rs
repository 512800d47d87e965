use std::collections::BTreeMap;

use gridline_model::{Cell, CellRef, CellValue, Range, Worksheet};

use crate::header_footer::join_sections;
use crate::rich_text::write_rich_text;
use crate::xml::{escape_attr, escape_text, format_f64};

/// Rows are grouped into 16-row-aligned blocks for the `spans` attribute:
/// every row in a block advertises the union of occupied columns across the
/// block, so readers can pre-size buffers once per block.
const SPANS_BLOCK_ROWS: u32 = 16;

/// Relationship ids a worksheet's XML must reference.
#[derive(Debug, Default)]
pub(crate) struct SheetRelIds {
    /// cell → relationship id for external hyperlinks.
    pub hyperlinks: BTreeMap<(u32, u32), String>,
    pub drawing: Option<String>,
    pub legacy_drawing: Option<String>,
    pub printer_settings: Option<String>,
}

pub(crate) fn write_worksheet_xml(worksheet: &Worksheet, rel_ids: &SheetRelIds) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<worksheet xmlns="{}" xmlns:r="{}">"#,
        crate::openxml::NS_SPREADSHEETML,
        crate::openxml::NS_RELATIONSHIPS_DOC,
    ));

    let dimension = worksheet
        .used_range()
        .unwrap_or(Range::single(CellRef::new(0, 0)));
    xml.push_str(&format!(r#"<dimension ref="{dimension}"/>"#));

    write_sheet_views(&mut xml, worksheet);
    write_cols(&mut xml, worksheet);
    write_sheet_data(&mut xml, worksheet);

    if let Some(filter) = &worksheet.auto_filter {
        xml.push_str(&format!(r#"<autoFilter ref="{filter}"/>"#));
    }

    let merges = worksheet.merged_ranges();
    if !merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, merges.len()));
        for range in merges {
            xml.push_str(&format!(r#"<mergeCell ref="{range}"/>"#));
        }
        xml.push_str("</mergeCells>");
    }

    write_hyperlinks(&mut xml, worksheet, rel_ids);

    if worksheet.page_setup.horizontal_centered || worksheet.page_setup.vertical_centered {
        xml.push_str("<printOptions");
        if worksheet.page_setup.horizontal_centered {
            xml.push_str(r#" horizontalCentered="1""#);
        }
        if worksheet.page_setup.vertical_centered {
            xml.push_str(r#" verticalCentered="1""#);
        }
        xml.push_str("/>");
    }

    let margins = worksheet.page_margins.clone().unwrap_or_default();
    xml.push_str(&format!(
        r#"<pageMargins left="{}" right="{}" top="{}" bottom="{}" header="{}" footer="{}"/>"#,
        format_f64(margins.left),
        format_f64(margins.right),
        format_f64(margins.top),
        format_f64(margins.bottom),
        format_f64(margins.header),
        format_f64(margins.footer),
    ));

    write_page_setup(&mut xml, worksheet, rel_ids);
    write_header_footer(&mut xml, worksheet);
    write_breaks(&mut xml, "rowBreaks", &worksheet.page_breaks.rows, true);
    write_breaks(&mut xml, "colBreaks", &worksheet.page_breaks.cols, false);

    if let Some(rel_id) = &rel_ids.drawing {
        xml.push_str(&format!(r#"<drawing r:id="{}"/>"#, escape_attr(rel_id)));
    }
    if let Some(rel_id) = &rel_ids.legacy_drawing {
        xml.push_str(&format!(r#"<legacyDrawing r:id="{}"/>"#, escape_attr(rel_id)));
    }

    xml.push_str("</worksheet>");
    xml
}

fn write_sheet_views(xml: &mut String, worksheet: &Worksheet) {
    let view = &worksheet.view;
    xml.push_str("<sheetViews><sheetView");
    if !view.show_grid_lines {
        xml.push_str(r#" showGridLines="0""#);
    }
    if view.tab_selected {
        xml.push_str(r#" tabSelected="1""#);
    }
    if let Some(zoom) = view.zoom_scale {
        xml.push_str(&format!(r#" zoomScale="{zoom}""#));
    }
    if let Some(top_left) = view.top_left_cell {
        xml.push_str(&format!(r#" topLeftCell="{}""#, top_left.to_a1()));
    }
    xml.push_str(r#" workbookViewId="0""#);

    let has_children = view.pane.is_some() || !view.selections.is_empty();
    if !has_children {
        xml.push_str("/></sheetViews>");
        return;
    }
    xml.push('>');

    if let Some(pane) = &view.pane {
        xml.push_str("<pane");
        if pane.x_split != 0.0 {
            xml.push_str(&format!(r#" xSplit="{}""#, format_f64(pane.x_split)));
        }
        if pane.y_split != 0.0 {
            xml.push_str(&format!(r#" ySplit="{}""#, format_f64(pane.y_split)));
        }
        if let Some(top_left) = pane.top_left_cell {
            xml.push_str(&format!(r#" topLeftCell="{}""#, top_left.to_a1()));
        }
        if let Some(active) = &pane.active_pane {
            xml.push_str(&format!(r#" activePane="{}""#, escape_attr(active)));
        }
        xml.push_str(&format!(r#" state="{}""#, pane.state.to_ooxml()));
        xml.push_str("/>");
    }
    for selection in &view.selections {
        xml.push_str("<selection");
        if let Some(pane) = &selection.pane {
            xml.push_str(&format!(r#" pane="{}""#, escape_attr(pane)));
        }
        if let Some(active) = selection.active_cell {
            xml.push_str(&format!(r#" activeCell="{}""#, active.to_a1()));
        }
        if let Some(sqref) = selection.sqref {
            xml.push_str(&format!(r#" sqref="{sqref}""#));
        }
        xml.push_str("/>");
    }

    xml.push_str("</sheetView></sheetViews>");
}

fn write_cols(xml: &mut String, worksheet: &Worksheet) {
    if worksheet.column_properties.is_empty() {
        return;
    }

    xml.push_str("<cols>");
    // Adjacent columns with identical properties collapse into one element.
    let mut iter = worksheet.column_properties.iter().peekable();
    while let Some((&start_col, props)) = iter.next() {
        let mut end_col = start_col;
        while let Some(&(&next_col, next_props)) = iter.peek() {
            if next_col == end_col + 1 && next_props == props {
                end_col = next_col;
                iter.next();
            } else {
                break;
            }
        }

        xml.push_str(&format!(r#"<col min="{}" max="{}""#, start_col + 1, end_col + 1));
        if let Some(width) = props.width {
            xml.push_str(&format!(r#" width="{}""#, format_f64(width)));
        }
        if props.custom_width {
            xml.push_str(r#" customWidth="1""#);
        }
        if props.hidden {
            xml.push_str(r#" hidden="1""#);
        }
        if props.best_fit {
            xml.push_str(r#" bestFit="1""#);
        }
        if let Some(format) = props.format {
            xml.push_str(&format!(r#" style="{format}""#));
        }
        xml.push_str("/>");
    }
    xml.push_str("</cols>");
}

fn write_sheet_data(xml: &mut String, worksheet: &Worksheet) {
    // Group stored cells by row; iteration is already row-major.
    let mut rows: BTreeMap<u32, Vec<(CellRef, &Cell)>> = BTreeMap::new();
    for (cell_ref, cell) in worksheet.iter_cells() {
        rows.entry(cell_ref.row).or_default().push((cell_ref, cell));
    }

    // Rows worth emitting: occupied rows plus rows with explicit properties.
    let mut row_indices: Vec<u32> = rows.keys().copied().collect();
    for (&row, props) in &worksheet.row_properties {
        if !props.is_default() && !rows.contains_key(&row) {
            row_indices.push(row);
        }
    }
    row_indices.sort_unstable();

    if row_indices.is_empty() {
        xml.push_str("<sheetData/>");
        return;
    }

    xml.push_str("<sheetData>");

    let mut current_block: Option<u32> = None;
    let mut block_span: Option<(u32, u32)> = None;

    for row in row_indices {
        let block = row / SPANS_BLOCK_ROWS;
        if current_block != Some(block) {
            current_block = Some(block);
            // Union of occupied columns across the whole block, computed once
            // on block entry and reused for every row in it.
            block_span = None;
            let block_start = block * SPANS_BLOCK_ROWS;
            for block_row in block_start..block_start + SPANS_BLOCK_ROWS {
                if let Some(cells) = rows.get(&block_row) {
                    for (cell_ref, _) in cells {
                        block_span = Some(match block_span {
                            None => (cell_ref.col, cell_ref.col),
                            Some((min, max)) => (min.min(cell_ref.col), max.max(cell_ref.col)),
                        });
                    }
                }
            }
        }

        xml.push_str(&format!(r#"<row r="{}""#, row + 1));
        if rows.contains_key(&row) {
            if let Some((min, max)) = block_span {
                xml.push_str(&format!(r#" spans="{}:{}""#, min + 1, max + 1));
            }
        }
        if let Some(props) = worksheet.row_properties.get(&row) {
            if let Some(format) = props.format {
                xml.push_str(&format!(r#" s="{format}" customFormat="1""#));
            }
            if let Some(height) = props.height {
                xml.push_str(&format!(r#" ht="{}""#, format_f64(height)));
            }
            if props.custom_height {
                xml.push_str(r#" customHeight="1""#);
            }
            if props.hidden {
                xml.push_str(r#" hidden="1""#);
            }
        }

        let Some(cells) = rows.get(&row) else {
            xml.push_str("/>");
            continue;
        };
        xml.push('>');

        for (cell_ref, cell) in cells {
            write_cell(xml, *cell_ref, cell);
        }

        xml.push_str("</row>");
    }

    xml.push_str("</sheetData>");
}

fn write_cell(xml: &mut String, cell_ref: CellRef, cell: &Cell) {
    xml.push_str(&format!(r#"<c r="{}""#, cell_ref.to_a1()));
    if let Some(format) = cell.format {
        xml.push_str(&format!(r#" s="{format}""#));
    }

    let type_attr = match &cell.value {
        CellValue::Bool(_) => Some("b"),
        CellValue::Error(_) => Some("e"),
        CellValue::SharedString(_) => Some("s"),
        CellValue::InlineString(_) => Some("inlineStr"),
        CellValue::FormulaString(_) => Some("str"),
        CellValue::Empty | CellValue::Number(_) | CellValue::Date(_) => None,
    };
    if let Some(t) = type_attr {
        xml.push_str(&format!(r#" t="{t}""#));
    }
    if cell.show_phonetics {
        xml.push_str(r#" ph="1""#);
    }

    if cell.value.is_empty() && cell.formula.is_none() {
        xml.push_str("/>");
        return;
    }
    xml.push('>');

    if let Some(formula) = &cell.formula {
        xml.push_str("<f>");
        xml.push_str(&escape_text(formula));
        xml.push_str("</f>");
    }

    match &cell.value {
        CellValue::Empty => {}
        CellValue::Number(n) | CellValue::Date(n) => {
            xml.push_str("<v>");
            xml.push_str(&format_f64(*n));
            xml.push_str("</v>");
        }
        CellValue::Bool(b) => {
            xml.push_str(if *b { "<v>1</v>" } else { "<v>0</v>" });
        }
        CellValue::Error(err) => {
            xml.push_str("<v>");
            xml.push_str(&escape_text(err.as_str()));
            xml.push_str("</v>");
        }
        CellValue::SharedString(index) => {
            xml.push_str(&format!("<v>{index}</v>"));
        }
        CellValue::FormulaString(s) => {
            xml.push_str("<v>");
            xml.push_str(&escape_text(s));
            xml.push_str("</v>");
        }
        CellValue::InlineString(rich) => {
            xml.push_str("<is>");
            write_rich_text(xml, rich);
            xml.push_str("</is>");
        }
    }

    xml.push_str("</c>");
}

fn write_hyperlinks(xml: &mut String, worksheet: &Worksheet, rel_ids: &SheetRelIds) {
    let mut entries = String::new();
    for (cell_ref, cell) in worksheet.iter_cells() {
        let Some(hyperlink) = &cell.hyperlink else {
            continue;
        };
        entries.push_str(&format!(r#"<hyperlink ref="{}""#, cell_ref.to_a1()));
        match &hyperlink.target {
            gridline_model::HyperlinkTarget::External(_) => {
                if let Some(rel_id) = rel_ids.hyperlinks.get(&(cell_ref.row, cell_ref.col)) {
                    entries.push_str(&format!(r#" r:id="{}""#, escape_attr(rel_id)));
                }
            }
            gridline_model::HyperlinkTarget::Internal(location) => {
                entries.push_str(&format!(r#" location="{}""#, escape_attr(location)));
            }
        }
        if let Some(display) = &hyperlink.display {
            entries.push_str(&format!(r#" display="{}""#, escape_attr(display)));
        }
        if let Some(tooltip) = &hyperlink.tooltip {
            entries.push_str(&format!(r#" tooltip="{}""#, escape_attr(tooltip)));
        }
        entries.push_str("/>");
    }

    if !entries.is_empty() {
        xml.push_str("<hyperlinks>");
        xml.push_str(&entries);
        xml.push_str("</hyperlinks>");
    }
}

fn write_page_setup(xml: &mut String, worksheet: &Worksheet, rel_ids: &SheetRelIds) {
    use gridline_model::PageOrientation;

    let setup = &worksheet.page_setup;
    let needs_element = !setup.is_default() || rel_ids.printer_settings.is_some();
    // Centering flags live on printOptions, not here.
    let only_centering = setup.scale.is_none()
        && setup.fit_to_width.is_none()
        && setup.fit_to_height.is_none()
        && setup.orientation == PageOrientation::Portrait
        && setup.paper_size == Default::default()
        && rel_ids.printer_settings.is_none();
    if !needs_element || only_centering {
        return;
    }

    xml.push_str("<pageSetup");
    if setup.paper_size != Default::default() {
        xml.push_str(&format!(r#" paperSize="{}""#, setup.paper_size.0));
    }
    if let Some(scale) = setup.scale {
        xml.push_str(&format!(r#" scale="{scale}""#));
    }
    if let Some(fit) = setup.fit_to_width {
        xml.push_str(&format!(r#" fitToWidth="{fit}""#));
    }
    if let Some(fit) = setup.fit_to_height {
        xml.push_str(&format!(r#" fitToHeight="{fit}""#));
    }
    if setup.orientation == PageOrientation::Landscape {
        xml.push_str(r#" orientation="landscape""#);
    }
    if let Some(rel_id) = &rel_ids.printer_settings {
        xml.push_str(&format!(r#" r:id="{}""#, escape_attr(rel_id)));
    }
    xml.push_str("/>");
}

fn write_header_footer(xml: &mut String, worksheet: &Worksheet) {
    let hf = &worksheet.header_footer;
    if hf.is_empty() {
        return;
    }

    xml.push_str("<headerFooter");
    if hf.different_odd_even {
        xml.push_str(r#" differentOddEven="1""#);
    }
    if hf.different_first {
        xml.push_str(r#" differentFirst="1""#);
    }
    xml.push('>');

    for (element, section) in [
        ("oddHeader", &hf.odd_header),
        ("oddFooter", &hf.odd_footer),
        ("evenHeader", &hf.even_header),
        ("evenFooter", &hf.even_footer),
        ("firstHeader", &hf.first_header),
        ("firstFooter", &hf.first_footer),
    ] {
        if section.is_empty() {
            continue;
        }
        xml.push_str(&format!("<{element}>"));
        xml.push_str(&escape_text(&join_sections(section)));
        xml.push_str(&format!("</{element}>"));
    }

    xml.push_str("</headerFooter>");
}

fn write_breaks(xml: &mut String, element: &str, breaks: &[u32], row_axis: bool) {
    if breaks.is_empty() {
        return;
    }
    xml.push_str(&format!(
        r#"<{element} count="{0}" manualBreakCount="{0}">"#,
        breaks.len()
    ));
    let max = if row_axis { 16383 } else { 1048575 };
    for id in breaks {
        xml.push_str(&format!(r#"<brk id="{id}" max="{max}" man="1"/>"#));
    }
    xml.push_str(&format!("</{element}>"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridline_model::Worksheet;

    #[test]
    fn spans_cover_the_16_row_block() {
        let mut ws = Worksheet::new(1, "Sheet1");
        // Rows 1 and 3 in the first block with different column extents.
        ws.set_value(CellRef::new(0, 0), CellValue::Number(1.0)); // A1
        ws.set_value(CellRef::new(2, 4), CellValue::Number(2.0)); // E3
        let xml = write_worksheet_xml(&ws, &SheetRelIds::default());
        // Both rows advertise the block union A..E.
        assert!(xml.contains(r#"<row r="1" spans="1:5">"#), "{xml}");
        assert!(xml.contains(r#"<row r="3" spans="1:5">"#), "{xml}");
    }

    #[test]
    fn rows_in_distinct_blocks_get_distinct_spans() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.set_value(CellRef::new(0, 0), CellValue::Number(1.0)); // A1, block 0
        ws.set_value(CellRef::new(20, 2), CellValue::Number(2.0)); // C21, block 1
        let xml = write_worksheet_xml(&ws, &SheetRelIds::default());
        assert!(xml.contains(r#"<row r="1" spans="1:1">"#), "{xml}");
        assert!(xml.contains(r#"<row r="21" spans="3:3">"#), "{xml}");
    }

    #[test]
    fn empty_rows_are_omitted() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.set_value(CellRef::new(4, 0), CellValue::Number(1.0)); // A5
        let xml = write_worksheet_xml(&ws, &SheetRelIds::default());
        assert!(!xml.contains(r#"<row r="1""#));
        assert!(xml.contains(r#"<row r="5""#));
    }

    #[test]
    fn property_only_rows_are_kept() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.set_row_height(1, Some(30.0));
        let xml = write_worksheet_xml(&ws, &SheetRelIds::default());
        assert!(xml.contains(r#"<row r="2" ht="30" customHeight="1"/>"#), "{xml}");
    }

    #[test]
    fn cell_types_serialize() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.set_value(CellRef::new(0, 0), CellValue::Number(42.0));
        ws.set_value(CellRef::new(0, 1), CellValue::SharedString(0));
        ws.set_value(CellRef::new(0, 2), CellValue::Bool(true));
        ws.set_formula(CellRef::new(0, 3), Some("A1*2".to_string()));
        let xml = write_worksheet_xml(&ws, &SheetRelIds::default());
        assert!(xml.contains(r#"<c r="A1"><v>42</v></c>"#), "{xml}");
        assert!(xml.contains(r#"<c r="B1" t="s"><v>0</v></c>"#), "{xml}");
        assert!(xml.contains(r#"<c r="C1" t="b"><v>1</v></c>"#), "{xml}");
        assert!(xml.contains(r#"<c r="D1"><f>A1*2</f></c>"#), "{xml}");
    }
}
