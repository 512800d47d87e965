use gridline_model::rich_text::RichText;
use gridline_model::style::{Color, Font, Format, PatternFill};
use gridline_model::{
    Cell, CellRef, CellValue, Comment, Fill, Hyperlink, Range, SheetState, Workbook,
};
use pretty_assertions::assert_eq;

use crate::package::Package;
use crate::{load_from_bytes, write_workbook, WriteError};

fn cell_ref(a1: &str) -> CellRef {
    CellRef::from_a1(a1).expect("valid test reference")
}

fn single_sheet_workbook() -> (Workbook, u32) {
    let mut workbook = Workbook::new();
    let sheet_id = workbook.add_sheet("Sheet1").expect("fresh name");
    (workbook, sheet_id)
}

#[test]
fn sample_scenario_roundtrip() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    let hello = workbook.shared_strings.intern(RichText::new("hello"));
    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();
        sheet.set_value(cell_ref("A1"), CellValue::Number(42.0));
        sheet.set_value(cell_ref("B1"), CellValue::SharedString(hello));
        sheet.set_value(cell_ref("C1"), CellValue::Bool(true));
        sheet.set_formula(cell_ref("D1"), Some("A1*2".to_string()));
    }

    let bytes = write_workbook(&workbook).unwrap();
    let reloaded = load_from_bytes(&bytes).unwrap();
    let sheet = &reloaded.workbook.sheets[0];

    assert_eq!(sheet.name, "Sheet1");
    assert_eq!(sheet.cell(cell_ref("A1")).unwrap().value, CellValue::Number(42.0));
    let b1 = sheet.cell(cell_ref("B1")).unwrap();
    let CellValue::SharedString(index) = b1.value else {
        panic!("B1 should be a shared string, got {:?}", b1.value);
    };
    assert_eq!(
        reloaded.workbook.shared_strings.get(index).unwrap().text,
        "hello"
    );
    assert_eq!(sheet.cell(cell_ref("C1")).unwrap().value, CellValue::Bool(true));
    let d1 = sheet.cell(cell_ref("D1")).unwrap();
    assert_eq!(d1.formula.as_deref(), Some("A1*2"));
    assert_eq!(d1.value, CellValue::Empty);
}

#[test]
fn shared_string_dedup_counts() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    let index = workbook.shared_strings.intern(RichText::new("repeated"));
    let again = workbook.shared_strings.intern(RichText::new("repeated"));
    assert_eq!(index, again);
    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();
        for row in 0..3 {
            sheet.set_value(CellRef::new(row, 0), CellValue::SharedString(index));
        }
    }

    let bytes = write_workbook(&workbook).unwrap();
    let package = Package::from_bytes(&bytes).unwrap();
    let sst = std::str::from_utf8(package.part("xl/sharedStrings.xml").unwrap()).unwrap();

    // Three references, one unique entry.
    assert!(sst.contains(r#"count="3""#), "{sst}");
    assert!(sst.contains(r#"uniqueCount="1""#), "{sst}");
    assert_eq!(sst.matches("<si>").count(), 1);

    let reloaded = load_from_bytes(&bytes).unwrap();
    assert_eq!(reloaded.workbook.shared_strings.len(), 1);
}

#[test]
fn style_roundtrip_preserves_indices() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    let bold = workbook.stylesheet.intern_font(Font {
        bold: true,
        ..Font::default()
    });
    let fill = workbook
        .stylesheet
        .intern_fill(Fill::Pattern(PatternFill::solid(Color::rgb(0xFF00FF00))));
    let date_format = workbook.stylesheet.intern_format(Format {
        number_format_id: Some(14),
        apply_number_format: true,
        ..Format::default()
    });
    let styled = workbook.stylesheet.intern_format(Format {
        font_id: Some(bold),
        fill_id: Some(fill),
        apply_font: true,
        apply_fill: true,
        ..Format::default()
    });
    assert_ne!(date_format, styled);

    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();
        let mut cell = Cell::new(CellValue::Number(1.5));
        cell.format = Some(styled);
        sheet.set_cell(cell_ref("A1"), cell);

        let mut date_cell = Cell::new(CellValue::Date(43831.0));
        date_cell.format = Some(date_format);
        sheet.set_cell(cell_ref("B1"), date_cell);
    }

    let bytes = write_workbook(&workbook).unwrap();
    let reloaded = load_from_bytes(&bytes).unwrap();
    let sheet = &reloaded.workbook.sheets[0];

    let a1 = sheet.cell(cell_ref("A1")).unwrap();
    assert_eq!(a1.format, Some(styled));
    let format = reloaded.workbook.stylesheet.format(styled).unwrap();
    assert!(reloaded.workbook.stylesheet.fonts[format.font_id.unwrap() as usize].bold);

    // Date-ness is re-inferred from the number format on load.
    let b1 = sheet.cell(cell_ref("B1")).unwrap();
    assert_eq!(b1.value, CellValue::Date(43831.0));
}

#[test]
fn identical_formats_are_not_duplicated_in_output() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    let first = workbook.stylesheet.intern_format(Format {
        number_format_id: Some(2),
        apply_number_format: true,
        ..Format::default()
    });
    let second = workbook.stylesheet.intern_format(Format {
        number_format_id: Some(2),
        apply_number_format: true,
        ..Format::default()
    });
    assert_eq!(first, second);
    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();
        for col in 0..2 {
            let mut cell = Cell::new(CellValue::Number(col as f64));
            cell.format = Some(first);
            sheet.set_cell(CellRef::new(0, col), cell);
        }
    }

    let bytes = write_workbook(&workbook).unwrap();
    let package = Package::from_bytes(&bytes).unwrap();
    let styles = std::str::from_utf8(package.part("xl/styles.xml").unwrap()).unwrap();
    // Baseline record plus exactly one interned record.
    assert!(styles.contains(r#"<cellXfs count="2">"#), "{styles}");
}

#[test]
fn reserved_names_roundtrip_without_leaking() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();
        sheet.auto_filter = Some(Range::from_a1("A1:C10").unwrap());
        sheet.print_area = Some(Range::from_a1("A1:D20").unwrap());
        sheet.print_title_rows = Some((0, 3));
        sheet.print_title_cols = Some((0, 2));
        sheet.set_value(cell_ref("A1"), CellValue::Number(1.0));
    }

    let bytes = write_workbook(&workbook).unwrap();

    let package = Package::from_bytes(&bytes).unwrap();
    let workbook_xml = std::str::from_utf8(package.part("xl/workbook.xml").unwrap()).unwrap();
    assert!(
        workbook_xml.contains("'Sheet1'!$A:$C,'Sheet1'!$1:$4"),
        "{workbook_xml}"
    );

    let reloaded = load_from_bytes(&bytes).unwrap();
    let sheet = &reloaded.workbook.sheets[0];
    assert_eq!(sheet.auto_filter, Some(Range::from_a1("A1:C10").unwrap()));
    assert_eq!(sheet.print_area, Some(Range::from_a1("A1:D20").unwrap()));
    assert_eq!(sheet.print_title_rows, Some((0, 3)));
    assert_eq!(sheet.print_title_cols, Some((0, 2)));

    // Reserved names never surface through the generic defined-names API.
    assert!(reloaded.workbook.defined_name("_xlnm._FilterDatabase").is_none());
    assert!(reloaded.workbook.defined_name("_xlnm.Print_Area").is_none());
    assert!(reloaded.workbook.defined_name("_xlnm.Print_Titles").is_none());
    assert!(reloaded.workbook.defined_names.is_empty());
}

#[test]
fn generic_defined_names_survive() {
    let (mut workbook, _) = single_sheet_workbook();
    workbook.add_defined_name(gridline_model::DefinedName {
        name: "Inputs".to_string(),
        value: "'Sheet1'!$A$1:$B$2".to_string(),
        sheet_index: None,
        hidden: false,
    });

    let bytes = write_workbook(&workbook).unwrap();
    let reloaded = load_from_bytes(&bytes).unwrap();
    let name = reloaded.workbook.defined_name("Inputs").unwrap();
    assert_eq!(name.value, "'Sheet1'!$A$1:$B$2");
}

#[test]
fn merged_ranges_and_row_col_properties_roundtrip() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();
        sheet.merge_cells(Range::from_a1("A1:B2").unwrap()).unwrap();
        sheet.set_value(cell_ref("A1"), CellValue::from("merged"));
        sheet.set_row_height(4, Some(30.0));
        sheet.set_row_hidden(5, true);
        sheet.set_col_width(2, Some(18.5));
        sheet.set_col_hidden(3, true);
    }

    let bytes = write_workbook(&workbook).unwrap();
    let reloaded = load_from_bytes(&bytes).unwrap();
    let sheet = &reloaded.workbook.sheets[0];

    assert_eq!(sheet.merged_ranges(), &[Range::from_a1("A1:B2").unwrap()]);
    assert_eq!(sheet.row_properties.get(&4).unwrap().height, Some(30.0));
    assert!(sheet.row_properties.get(&5).unwrap().hidden);
    assert_eq!(sheet.column_properties.get(&2).unwrap().width, Some(18.5));
    assert!(sheet.column_properties.get(&3).unwrap().hidden);
}

#[test]
fn hyperlinks_and_comments_roundtrip() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();

        let mut linked = Cell::new(CellValue::from("docs"));
        let mut hyperlink = Hyperlink::external("https://example.com/docs");
        hyperlink.tooltip = Some("open the docs".to_string());
        linked.hyperlink = Some(hyperlink);
        sheet.set_cell(cell_ref("A1"), linked);

        let mut internal = Cell::new(CellValue::from("see B5"));
        internal.hyperlink = Some(Hyperlink::internal("Sheet1!B5"));
        sheet.set_cell(cell_ref("A2"), internal);

        let mut noted = Cell::new(CellValue::Number(7.0));
        noted.comment = Some(Comment::new("alice", "double-check"));
        sheet.set_cell(cell_ref("B2"), noted);
    }

    let bytes = write_workbook(&workbook).unwrap();
    let package = Package::from_bytes(&bytes).unwrap();
    // Excel needs the companion VML part to display legacy notes.
    assert!(package.has_part("xl/comments1.xml"));
    assert!(package.has_part("xl/drawings/vmlDrawing1.vml"));

    let reloaded = load_from_bytes(&bytes).unwrap();
    let sheet = &reloaded.workbook.sheets[0];

    let a1 = sheet.cell(cell_ref("A1")).unwrap();
    let link = a1.hyperlink.as_ref().unwrap();
    assert_eq!(link.url(), Some("https://example.com/docs"));
    assert_eq!(link.tooltip.as_deref(), Some("open the docs"));

    let a2 = sheet.cell(cell_ref("A2")).unwrap();
    assert_eq!(
        a2.hyperlink.as_ref().unwrap().target,
        gridline_model::HyperlinkTarget::Internal("Sheet1!B5".to_string())
    );

    let b2 = sheet.cell(cell_ref("B2")).unwrap();
    let comment = b2.comment.as_ref().unwrap();
    assert_eq!(comment.author, "alice");
    assert_eq!(comment.text.text, "double-check");
}

#[test]
fn sheet_order_and_state_roundtrip() {
    let mut workbook = Workbook::new();
    let first = workbook.add_sheet("Summary").unwrap();
    let second = workbook.add_sheet("Data").unwrap();
    workbook.sheet_mut(second).unwrap().state = SheetState::Hidden;
    workbook
        .sheet_mut(first)
        .unwrap()
        .set_value(cell_ref("A1"), CellValue::Number(1.0));

    let bytes = write_workbook(&workbook).unwrap();
    let reloaded = load_from_bytes(&bytes).unwrap();
    let names: Vec<&str> = reloaded
        .workbook
        .sheets
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, vec!["Summary", "Data"]);
    assert_eq!(reloaded.workbook.sheets[1].state, SheetState::Hidden);
}

#[test]
fn no_visible_sheet_fails_to_write() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    workbook.sheet_mut(sheet_id).unwrap().state = SheetState::VeryHidden;
    let err = write_workbook(&workbook).unwrap_err();
    assert!(matches!(err, WriteError::NoVisibleSheet));
}

#[test]
fn calc_chain_is_suppressed_on_resave() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    workbook
        .sheet_mut(sheet_id)
        .unwrap()
        .set_formula(cell_ref("A1"), Some("1+1".to_string()));
    let bytes = write_workbook(&workbook).unwrap();

    // Graft a calcChain part plus its workbook relationship onto the package,
    // as a calculating producer would have left behind.
    let package = Package::from_bytes(&bytes).unwrap();
    let mut zipped = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut zipped);
        let options = zip::write::FileOptions::<()>::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for name in package.part_names() {
            use std::io::Write;
            let mut bytes = package.part(name).unwrap().to_vec();
            if name == "xl/_rels/workbook.xml.rels" {
                let xml = String::from_utf8(bytes).unwrap();
                bytes = xml
                    .replace(
                        "</Relationships>",
                        r#"<Relationship Id="rId99" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/></Relationships>"#,
                    )
                    .into_bytes();
            }
            zip.start_file(name, options).unwrap();
            zip.write_all(&bytes).unwrap();
        }
        {
            use std::io::Write;
            zip.start_file("xl/calcChain.xml", options).unwrap();
            zip.write_all(
                br#"<?xml version="1.0"?><calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><c r="A1" i="1"/></calcChain>"#,
            )
            .unwrap();
        }
        zip.finish().unwrap();
    }

    let modified = zipped.into_inner();
    let doc = load_from_bytes(&modified).unwrap();
    let resaved = doc.save_to_vec().unwrap();
    let resaved_package = Package::from_bytes(&resaved).unwrap();

    assert!(!resaved_package.has_part("xl/calcChain.xml"));
    let rels =
        std::str::from_utf8(resaved_package.part("xl/_rels/workbook.xml.rels").unwrap()).unwrap();
    assert!(!rels.contains("calcChain"), "{rels}");
}

#[test]
fn resave_reuses_loaded_sheet_assignments() {
    let mut workbook = Workbook::new();
    let a = workbook.add_sheet("Alpha").unwrap();
    workbook.add_sheet("Beta").unwrap();
    workbook
        .sheet_mut(a)
        .unwrap()
        .set_value(cell_ref("A1"), CellValue::Number(1.0));

    let bytes = write_workbook(&workbook).unwrap();
    let mut doc = load_from_bytes(&bytes).unwrap();
    let original_meta: Vec<(String, String)> = doc
        .sheet_meta()
        .iter()
        .map(|m| (m.relationship_id.clone(), m.path.clone()))
        .collect();

    // Add a third sheet and re-save; the loaded assignments must survive.
    doc.workbook.add_sheet("Gamma").unwrap();
    let resaved = doc.save_to_vec().unwrap();

    let reloaded = load_from_bytes(&resaved).unwrap();
    let new_meta: Vec<(String, String)> = reloaded
        .sheet_meta()
        .iter()
        .map(|m| (m.relationship_id.clone(), m.path.clone()))
        .collect();
    assert_eq!(&new_meta[..2], &original_meta[..]);
    assert_eq!(reloaded.workbook.sheets[2].name, "Gamma");
}

#[test]
fn header_footer_and_page_state_roundtrip() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();
        sheet.header_footer.odd_header.center = Some("Page &P of &N".to_string());
        sheet.header_footer.odd_footer.left = Some("&BConfidential".to_string());
        sheet.page_setup.orientation = gridline_model::PageOrientation::Landscape;
        sheet.page_setup.fit_to_width = Some(1);
        sheet.page_breaks.rows = vec![10];
        sheet.set_value(cell_ref("A1"), CellValue::Number(1.0));
    }

    let bytes = write_workbook(&workbook).unwrap();
    let reloaded = load_from_bytes(&bytes).unwrap();
    let sheet = &reloaded.workbook.sheets[0];

    assert_eq!(
        sheet.header_footer.odd_header.center.as_deref(),
        Some("Page &P of &N")
    );
    assert_eq!(
        sheet.header_footer.odd_footer.left.as_deref(),
        Some("&BConfidential")
    );
    assert_eq!(
        sheet.page_setup.orientation,
        gridline_model::PageOrientation::Landscape
    );
    assert_eq!(sheet.page_setup.fit_to_width, Some(1));
    assert_eq!(sheet.page_breaks.rows, vec![10]);
}

#[test]
fn core_properties_roundtrip() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    workbook
        .sheet_mut(sheet_id)
        .unwrap()
        .set_value(cell_ref("A1"), CellValue::Number(1.0));
    workbook.core_properties.title = Some("Budget".to_string());
    workbook.core_properties.creator = Some("jane".to_string());
    workbook.custom_properties.push(gridline_model::CustomProperty {
        name: "Reviewed".to_string(),
        value: gridline_model::CustomValue::Bool(true),
    });

    let bytes = write_workbook(&workbook).unwrap();
    let reloaded = load_from_bytes(&bytes).unwrap();
    assert_eq!(reloaded.workbook.core_properties.title.as_deref(), Some("Budget"));
    assert_eq!(reloaded.workbook.core_properties.creator.as_deref(), Some("jane"));
    assert_eq!(reloaded.workbook.custom_properties.len(), 1);
}

#[test]
fn streaming_matches_bulk() {
    let (mut workbook, sheet_id) = single_sheet_workbook();
    let hello = workbook.shared_strings.intern(RichText::new("hello"));
    {
        let sheet = workbook.sheet_mut(sheet_id).unwrap();
        sheet.set_value(cell_ref("A1"), CellValue::Number(42.0));
        sheet.set_value(cell_ref("B1"), CellValue::SharedString(hello));
        sheet.set_value(cell_ref("C2"), CellValue::Bool(false));
        sheet.set_formula(cell_ref("D3"), Some("A1+C2".to_string()));
        sheet.set_value(cell_ref("E20"), CellValue::from("inline"));
    }

    let bytes = write_workbook(&workbook).unwrap();

    let bulk = load_from_bytes(&bytes).unwrap();
    let bulk_cells: Vec<(CellRef, CellValue, Option<String>)> = bulk.workbook.sheets[0]
        .iter_cells()
        .map(|(reference, cell)| (reference, cell.value.clone(), cell.formula.clone()))
        .collect();

    let mut stream = crate::streaming::SheetStream::from_bytes(bytes).unwrap();
    assert_eq!(stream.next_sheet().unwrap(), Some("Sheet1"));
    let mut streamed: Vec<(CellRef, CellValue, Option<String>)> = Vec::new();
    while stream.has_cell().unwrap() {
        let cell = stream.read_cell().unwrap().expect("has_cell was true");
        streamed.push((
            cell.reference,
            cell.cell.value.clone(),
            cell.cell.formula.clone(),
        ));
    }
    assert_eq!(stream.next_sheet().unwrap(), None);

    assert_eq!(streamed, bulk_cells);
}
