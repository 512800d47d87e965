use gridline_model::{CellRef, CellValue, Workbook};
use gridline_xlsx::{load_from_path, openxml, XlsxDocument};

#[test]
fn save_and_reload_through_the_filesystem() {
    let mut workbook = Workbook::new();
    let sheet_id = workbook.add_sheet("Sheet1").unwrap();
    workbook
        .sheet_mut(sheet_id)
        .unwrap()
        .set_value(CellRef::new(0, 0), CellValue::Number(3.5));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");

    XlsxDocument::new(workbook).save_to_path(&path).unwrap();
    let reloaded = load_from_path(&path).unwrap();

    assert_eq!(
        reloaded.workbook.sheets[0]
            .cell(CellRef::new(0, 0))
            .unwrap()
            .value,
        CellValue::Number(3.5)
    );
}

#[test]
fn loaded_manifest_exposes_the_relationship_graph() {
    let mut workbook = Workbook::new();
    let sheet_id = workbook.add_sheet("Sheet1").unwrap();
    workbook
        .sheet_mut(sheet_id)
        .unwrap()
        .set_value(CellRef::new(0, 0), CellValue::Number(1.0));

    let bytes = gridline_xlsx::write_workbook(&workbook).unwrap();
    let doc = gridline_xlsx::load_from_bytes(&bytes).unwrap();

    let manifest = doc.manifest();
    let office = manifest
        .relationship_by_type("", openxml::REL_TYPE_OFFICE_DOCUMENT)
        .unwrap();
    assert_eq!(manifest.target_part("", office), "xl/workbook.xml");

    let worksheets: Vec<_> = manifest
        .relationships("xl/workbook.xml", Some(openxml::REL_TYPE_WORKSHEET))
        .collect();
    assert_eq!(worksheets.len(), 1);
    assert_eq!(
        manifest.content_type("xl/workbook.xml"),
        Some(openxml::CONTENT_TYPE_WORKBOOK)
    );
}
