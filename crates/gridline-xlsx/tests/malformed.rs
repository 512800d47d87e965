//! Structural-corruption detection: OOXML has no checksum, so declared
//! `count` attributes are the format's self-consistency signal and every
//! counted container must be validated.

use std::io::{Cursor, Write};

use gridline_xlsx::{
    load_from_bytes, load_from_bytes_with, ReadError, ReadOptions, UnknownElementPolicy,
};
use zip::write::FileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<workbookPr/>
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData>
</worksheet>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="0.0"/></numFmts>
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
<dxfs count="0"/>
<tableStyles count="0"/>
</styleSheet>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1">
<si><t>hello</t></si>
</sst>"#;

struct PackageBuilder {
    parts: Vec<(String, String)>,
}

impl PackageBuilder {
    fn minimal() -> Self {
        Self {
            parts: vec![
                ("[Content_Types].xml".to_string(), CONTENT_TYPES.to_string()),
                ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
                ("xl/workbook.xml".to_string(), WORKBOOK.to_string()),
                ("xl/_rels/workbook.xml.rels".to_string(), WORKBOOK_RELS.to_string()),
                ("xl/worksheets/sheet1.xml".to_string(), SHEET.to_string()),
                ("xl/styles.xml".to_string(), STYLES.to_string()),
                ("xl/sharedStrings.xml".to_string(), SHARED_STRINGS.to_string()),
            ],
        }
    }

    fn replace(mut self, part: &str, content: String) -> Self {
        for (name, body) in &mut self.parts {
            if name == part {
                *body = content;
                return self;
            }
        }
        self.parts.push((part.to_string(), content));
        self
    }

    fn remove(mut self, part: &str) -> Self {
        self.parts.retain(|(name, _)| name != part);
        self
    }

    fn build(self) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, body) in &self.parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

#[test]
fn minimal_package_loads() {
    let bytes = PackageBuilder::minimal().build();
    let doc = load_from_bytes(&bytes).unwrap();
    assert_eq!(doc.workbook.sheets.len(), 1);
}

#[test]
fn every_counted_styles_container_is_validated() {
    let cases: &[(&str, &str, &str)] = &[
        ("numFmts", r#"<numFmts count="1">"#, r#"<numFmts count="2">"#),
        ("fonts", r#"<fonts count="1">"#, r#"<fonts count="5">"#),
        ("fills", r#"<fills count="2">"#, r#"<fills count="1">"#),
        ("borders", r#"<borders count="1">"#, r#"<borders count="3">"#),
        (
            "cellStyleXfs",
            r#"<cellStyleXfs count="1">"#,
            r#"<cellStyleXfs count="2">"#,
        ),
        ("cellXfs", r#"<cellXfs count="1">"#, r#"<cellXfs count="4">"#),
        (
            "cellStyles",
            r#"<cellStyles count="1">"#,
            r#"<cellStyles count="2">"#,
        ),
        ("dxfs", r#"<dxfs count="0"/>"#, r#"<dxfs count="1"/>"#),
    ];

    for (container, original, corrupted) in cases {
        let styles = STYLES.replace(original, corrupted);
        assert_ne!(&styles, STYLES, "replacement failed for {container}");
        let bytes = PackageBuilder::minimal()
            .replace("xl/styles.xml", styles)
            .build();
        let err = load_from_bytes(&bytes).unwrap_err();
        match err {
            ReadError::CountMismatch {
                container: reported,
                ..
            } => assert_eq!(&reported, container),
            other => panic!("{container}: expected CountMismatch, got {other:?}"),
        }
    }
}

#[test]
fn shared_string_unique_count_is_validated() {
    let sst = SHARED_STRINGS.replace(r#"uniqueCount="1""#, r#"uniqueCount="2""#);
    let bytes = PackageBuilder::minimal()
        .replace("xl/sharedStrings.xml", sst)
        .build();
    let err = load_from_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        ReadError::UniqueCountMismatch {
            declared: 2,
            actual: 1
        }
    ));
}

#[test]
fn unrecognized_workbook_content_type_is_rejected() {
    let content_types = CONTENT_TYPES.replace(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
        "application/vnd.example.not-a-spreadsheet",
    );
    let bytes = PackageBuilder::minimal()
        .replace("[Content_Types].xml", content_types)
        .build();
    let err = load_from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, ReadError::UnrecognizedContentType(_)));
}

#[test]
fn missing_claimed_part_is_rejected() {
    let bytes = PackageBuilder::minimal()
        .remove("xl/worksheets/sheet1.xml")
        .build();
    let err = load_from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, ReadError::MissingPart(_)));
}

#[test]
fn malformed_cell_reference_is_fatal() {
    let sheet = SHEET.replace(r#"<c r="A1">"#, r#"<c r="1A">"#);
    let bytes = PackageBuilder::minimal()
        .replace("xl/worksheets/sheet1.xml", sheet)
        .build();
    let err = load_from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, ReadError::InvalidCellRef(_)));
}

#[test]
fn shared_string_index_out_of_range_is_rejected() {
    let sheet = SHEET.replace(
        r#"<c r="A1"><v>1</v></c>"#,
        r#"<c r="A1" t="s"><v>9</v></c>"#,
    );
    let bytes = PackageBuilder::minimal()
        .replace("xl/worksheets/sheet1.xml", sheet)
        .build();
    let err = load_from_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        ReadError::SharedStringIndexOutOfRange { index: 9, count: 1 }
    ));
}

#[test]
fn unknown_element_policy_is_configurable_at_load() {
    let sheet = SHEET.replace(
        "<sheetData>",
        "<notInTheSchema><child/></notInTheSchema><sheetData>",
    );
    let bytes = PackageBuilder::minimal()
        .replace("xl/worksheets/sheet1.xml", sheet)
        .build();

    // Lenient mode skips the subtree and still loads the cell.
    let doc = load_from_bytes(&bytes).unwrap();
    assert_eq!(doc.workbook.sheets[0].cell_count(), 1);

    // Strict mode surfaces the stray element.
    let strict = ReadOptions {
        unknown_elements: UnknownElementPolicy::Fail,
    };
    let err = load_from_bytes_with(&bytes, &strict).unwrap_err();
    assert!(matches!(err, ReadError::UnexpectedElement { .. }));
}

#[test]
fn duplicate_relationship_ids_are_rejected() {
    let rels = WORKBOOK_RELS.replace(r#"Id="rId2""#, r#"Id="rId1""#);
    let bytes = PackageBuilder::minimal()
        .replace("xl/_rels/workbook.xml.rels", rels)
        .build();
    let err = load_from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, ReadError::Manifest(_)));
}
