//! The XLSX producer: mirrors the consumer's dependency order, emitting each
//! part's XML and assigning the manifest state a from-scratch workbook never
//! had (content types, sequential relationship ids, the workbook→sheet
//! relationship map). Re-saving a loaded document reuses the part paths and
//! relationship ids captured at load time.
//!
//! The calculation-chain part is never written, even when the loaded package
//! carried one: this library does not evaluate formulas, and a stale
//! calcChain makes consuming applications treat the file as corrupt, while
//! omitting it merely forces a recalculation on open.

mod comments;
mod properties;
mod styles;
mod theme;
mod worksheet;

use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Write};

use gridline_model::{CellValue, HyperlinkTarget, Workbook, Worksheet};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::error::WriteError;
use crate::manifest::{Manifest, Relationship, TargetMode};
use crate::openxml;
use crate::path::relativize;
use crate::xml::{escape_attr, escape_text};
use crate::{SheetMeta, XlsxDocument};

use worksheet::SheetRelIds;

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Serialize a workbook built through the object-model API, assigning all
/// package state fresh.
pub fn write_workbook(workbook: &Workbook) -> Result<Vec<u8>, WriteError> {
    write_to_vec(&XlsxDocument::new(workbook.clone()))
}

pub(crate) fn write_to_vec(doc: &XlsxDocument) -> Result<Vec<u8>, WriteError> {
    if !doc.workbook.has_visible_sheet() {
        return Err(WriteError::NoVisibleSheet);
    }

    let workbook = &doc.workbook;
    let sheets = sheet_metas(doc);

    let mut manifest = Manifest::new();
    manifest.register_default("rels", openxml::CONTENT_TYPE_RELATIONSHIPS);
    manifest.register_default("xml", openxml::CONTENT_TYPE_XML);

    // Parts in archive order; `[Content_Types].xml` is prepended at the end
    // once every part has registered its content type.
    let mut parts: Vec<(String, Vec<u8>)> = Vec::new();

    // Package-root relationships and the docProps parts.
    manifest.register_relationship(
        "",
        Relationship::internal("rId1", openxml::REL_TYPE_OFFICE_DOCUMENT, WORKBOOK_PART),
    )?;
    manifest.register_relationship(
        "",
        Relationship::internal("rId2", openxml::REL_TYPE_CORE_PROPERTIES, "docProps/core.xml"),
    )?;
    manifest.register_relationship(
        "",
        Relationship::internal(
            "rId3",
            openxml::REL_TYPE_EXTENDED_PROPERTIES,
            "docProps/app.xml",
        ),
    )?;
    if !workbook.custom_properties.is_empty() {
        manifest.register_relationship(
            "",
            Relationship::internal(
                "rId4",
                openxml::REL_TYPE_CUSTOM_PROPERTIES,
                "docProps/custom.xml",
            ),
        )?;
    }

    parts.push((
        "docProps/core.xml".to_string(),
        properties::write_core_properties_xml(&workbook.core_properties),
    ));
    manifest.register_override("/docProps/core.xml", openxml::CONTENT_TYPE_CORE_PROPERTIES);
    parts.push((
        "docProps/app.xml".to_string(),
        properties::write_extended_properties_xml(&workbook.extended_properties),
    ));
    manifest.register_override(
        "/docProps/app.xml",
        openxml::CONTENT_TYPE_EXTENDED_PROPERTIES,
    );
    if !workbook.custom_properties.is_empty() {
        parts.push((
            "docProps/custom.xml".to_string(),
            properties::write_custom_properties_xml(&workbook.custom_properties),
        ));
        manifest.register_override(
            "/docProps/custom.xml",
            openxml::CONTENT_TYPE_CUSTOM_PROPERTIES,
        );
    }

    // Workbook relationships: the sheet map first (reusing loaded ids), then
    // styles, theme, and shared strings.
    for meta in &sheets {
        manifest.register_relationship(
            WORKBOOK_PART,
            Relationship::internal(
                meta.relationship_id.clone(),
                openxml::REL_TYPE_WORKSHEET,
                relativize(WORKBOOK_PART, &meta.path),
            ),
        )?;
    }
    let styles_rel = manifest.next_relationship_id(WORKBOOK_PART);
    manifest.register_relationship(
        WORKBOOK_PART,
        Relationship::internal(styles_rel, openxml::REL_TYPE_STYLES, "styles.xml"),
    )?;
    let theme_rel = manifest.next_relationship_id(WORKBOOK_PART);
    manifest.register_relationship(
        WORKBOOK_PART,
        Relationship::internal(theme_rel, openxml::REL_TYPE_THEME, "theme/theme1.xml"),
    )?;

    let shared_string_refs = count_shared_string_refs(workbook);
    let write_shared_strings = !workbook.shared_strings.is_empty() || shared_string_refs > 0;
    if write_shared_strings {
        let shared_rel = manifest.next_relationship_id(WORKBOOK_PART);
        manifest.register_relationship(
            WORKBOOK_PART,
            Relationship::internal(
                shared_rel,
                openxml::REL_TYPE_SHARED_STRINGS,
                "sharedStrings.xml",
            ),
        )?;
    }

    parts.push((
        WORKBOOK_PART.to_string(),
        write_workbook_xml(workbook, &sheets),
    ));
    manifest.register_override(&format!("/{WORKBOOK_PART}"), openxml::CONTENT_TYPE_WORKBOOK);

    if write_shared_strings {
        parts.push((
            "xl/sharedStrings.xml".to_string(),
            write_shared_strings_xml(workbook, shared_string_refs),
        ));
        manifest.register_override(
            "/xl/sharedStrings.xml",
            openxml::CONTENT_TYPE_SHARED_STRINGS,
        );
    }

    parts.push((
        "xl/styles.xml".to_string(),
        styles::write_styles_xml(&workbook.stylesheet),
    ));
    manifest.register_override("/xl/styles.xml", openxml::CONTENT_TYPE_STYLES);

    parts.push((
        "xl/theme/theme1.xml".to_string(),
        theme::write_theme_xml(&workbook.theme),
    ));
    manifest.register_override("/xl/theme/theme1.xml", openxml::CONTENT_TYPE_THEME);

    // Worksheets, each with its relationship-bearing side parts.
    let mut comment_part_counter = 0usize;
    let mut printer_part_counter = 0usize;
    for meta in &sheets {
        let worksheet = workbook
            .sheet(meta.worksheet_id)
            .expect("sheet meta refers to an existing sheet");

        let mut rel_ids = SheetRelIds::default();

        // External hyperlinks: one relationship per distinct URI.
        let mut url_rels: BTreeMap<String, String> = BTreeMap::new();
        for (cell_ref, cell) in worksheet.iter_cells() {
            let Some(hyperlink) = &cell.hyperlink else {
                continue;
            };
            if let HyperlinkTarget::External(url) = &hyperlink.target {
                let rel_id = match url_rels.get(url) {
                    Some(existing) => existing.clone(),
                    None => {
                        let rel_id = manifest.next_relationship_id(&meta.path);
                        manifest.register_relationship(
                            &meta.path,
                            Relationship::external(
                                rel_id.clone(),
                                openxml::REL_TYPE_HYPERLINK,
                                url.clone(),
                            ),
                        )?;
                        url_rels.insert(url.clone(), rel_id.clone());
                        rel_id
                    }
                };
                rel_ids
                    .hyperlinks
                    .insert((cell_ref.row, cell_ref.col), rel_id);
            }
        }

        // Comments need both the comments part and its companion VML part.
        let sheet_comments: Vec<_> = worksheet
            .iter_cells()
            .filter_map(|(cell_ref, cell)| cell.comment.as_ref().map(|c| (cell_ref, c)))
            .collect();
        if !sheet_comments.is_empty() {
            comment_part_counter += 1;
            let comments_part = format!("xl/comments{comment_part_counter}.xml");
            let vml_part = format!("xl/drawings/vmlDrawing{comment_part_counter}.vml");

            let comments_rel = manifest.next_relationship_id(&meta.path);
            manifest.register_relationship(
                &meta.path,
                Relationship::internal(
                    comments_rel,
                    openxml::REL_TYPE_COMMENTS,
                    relativize(&meta.path, &comments_part),
                ),
            )?;
            let vml_rel = manifest.next_relationship_id(&meta.path);
            manifest.register_relationship(
                &meta.path,
                Relationship::internal(
                    vml_rel.clone(),
                    openxml::REL_TYPE_VML_DRAWING,
                    relativize(&meta.path, &vml_part),
                ),
            )?;
            rel_ids.legacy_drawing = Some(vml_rel);

            parts.push((
                comments_part.clone(),
                comments::write_comments_xml(&sheet_comments),
            ));
            manifest
                .register_override(&format!("/{comments_part}"), openxml::CONTENT_TYPE_COMMENTS);
            parts.push((vml_part, comments::write_vml_xml(&sheet_comments)));
            manifest.register_default("vml", openxml::CONTENT_TYPE_VML);
        }

        // Drawings ride through at their original part path.
        if let Some((drawing_part, drawing_bytes)) = &worksheet.drawing {
            let drawing_rel = manifest.next_relationship_id(&meta.path);
            manifest.register_relationship(
                &meta.path,
                Relationship::internal(
                    drawing_rel.clone(),
                    openxml::REL_TYPE_DRAWING,
                    relativize(&meta.path, drawing_part),
                ),
            )?;
            rel_ids.drawing = Some(drawing_rel);
            parts.push((drawing_part.clone(), drawing_bytes.clone()));
            manifest.register_override(
                &format!("/{drawing_part}"),
                "application/vnd.openxmlformats-officedocument.drawing+xml",
            );
        }

        // Printer settings blobs.
        if let Some(printer_bytes) = &worksheet.printer_settings {
            printer_part_counter += 1;
            let printer_part =
                format!("xl/printerSettings/printerSettings{printer_part_counter}.bin");
            let printer_rel = manifest.next_relationship_id(&meta.path);
            manifest.register_relationship(
                &meta.path,
                Relationship::internal(
                    printer_rel.clone(),
                    openxml::REL_TYPE_PRINTER_SETTINGS,
                    relativize(&meta.path, &printer_part),
                ),
            )?;
            rel_ids.printer_settings = Some(printer_rel);
            parts.push((printer_part, printer_bytes.clone()));
            manifest.register_default(
                "bin",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.printerSettings",
            );
        }

        parts.push((
            meta.path.clone(),
            worksheet::write_worksheet_xml(worksheet, &rel_ids).into_bytes(),
        ));
        manifest.register_override(&format!("/{}", meta.path), openxml::CONTENT_TYPE_WORKSHEET);
    }

    // Opaque media carried through from load (images, drawing .rels).
    for (part, bytes) in &workbook.media {
        parts.push((part.clone(), bytes.clone()));
        if let Some(extension) = part.rsplit_once('.').map(|(_, ext)| ext) {
            if manifest.content_type(part).is_none() {
                manifest.register_default(extension, media_content_type(extension));
            }
        }
    }

    // Relationship parts, rendered from the manifest.
    let mut rels_parts: Vec<(String, Vec<u8>)> = Vec::new();
    for source in manifest.sources().map(str::to_string).collect::<Vec<_>>() {
        let rels_part = if source.is_empty() {
            "_rels/.rels".to_string()
        } else {
            crate::path::rels_for_part(&source)
        };
        // A loaded drawing's .rels rides through media verbatim; don't
        // clobber it (the manifest has no relationships for drawing parts).
        rels_parts.push((rels_part, render_relationships(&manifest, &source)));
    }

    let content_types = render_content_types(&manifest);

    // Assemble the archive: content types, root rels, then everything else
    // in dependency order.
    let cursor = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(cursor);
    let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

    let mut written: HashSet<String> = HashSet::new();
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(&content_types)?;
    written.insert("[Content_Types].xml".to_string());

    for (name, bytes) in rels_parts
        .iter()
        .chain(parts.iter())
    {
        if !written.insert(name.clone()) {
            continue;
        }
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Media content types by extension for pass-through parts.
fn media_content_type(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
}

/// The sheet bookkeeping for this write pass: loaded assignments are reused,
/// sheets created since load get fresh sequential ids and paths.
fn sheet_metas(doc: &XlsxDocument) -> Vec<SheetMeta> {
    let loaded: BTreeMap<u32, &SheetMeta> = doc
        .sheets
        .iter()
        .map(|meta| (meta.worksheet_id, meta))
        .collect();

    let mut used_rel_ids: HashSet<String> = HashSet::new();
    let mut used_paths: HashSet<String> = HashSet::new();
    let mut max_sheet_id = 0u32;
    for sheet in &doc.workbook.sheets {
        if let Some(meta) = loaded.get(&sheet.id) {
            used_rel_ids.insert(meta.relationship_id.clone());
            used_paths.insert(meta.path.clone());
            max_sheet_id = max_sheet_id.max(meta.sheet_id);
        }
    }

    let mut next_rel = 1u32;
    let mut next_path = 1u32;
    let mut out = Vec::with_capacity(doc.workbook.sheets.len());
    for sheet in &doc.workbook.sheets {
        if let Some(meta) = loaded.get(&sheet.id) {
            out.push((*meta).clone());
            continue;
        }

        let rel_id = loop {
            let candidate = format!("rId{next_rel}");
            next_rel += 1;
            if !used_rel_ids.contains(&candidate) {
                break candidate;
            }
        };
        let path = loop {
            let candidate = format!("xl/worksheets/sheet{next_path}.xml");
            next_path += 1;
            if !used_paths.contains(&candidate) {
                break candidate;
            }
        };
        max_sheet_id += 1;
        used_rel_ids.insert(rel_id.clone());
        used_paths.insert(path.clone());
        out.push(SheetMeta {
            worksheet_id: sheet.id,
            sheet_id: max_sheet_id,
            relationship_id: rel_id,
            path,
        });
    }
    out
}

fn count_shared_string_refs(workbook: &Workbook) -> usize {
    workbook
        .sheets
        .iter()
        .flat_map(|sheet| sheet.iter_cells())
        .filter(|(_, cell)| matches!(cell.value, CellValue::SharedString(_)))
        .count()
}

fn write_shared_strings_xml(workbook: &Workbook, ref_count: usize) -> Vec<u8> {
    let table = &workbook.shared_strings;
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<sst xmlns="{}" count="{ref_count}" uniqueCount="{}">"#,
        openxml::NS_SPREADSHEETML,
        table.len()
    ));
    for entry in table.iter() {
        xml.push_str("<si>");
        crate::rich_text::write_rich_text(&mut xml, entry);
        xml.push_str("</si>");
    }
    xml.push_str("</sst>");
    xml.into_bytes()
}

fn write_workbook_xml(workbook: &Workbook, sheets: &[SheetMeta]) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<workbook xmlns="{}" xmlns:r="{}">"#,
        openxml::NS_SPREADSHEETML,
        openxml::NS_RELATIONSHIPS_DOC,
    ));

    xml.push_str("<workbookPr");
    if workbook.date_system == gridline_model::DateSystem::V1904 {
        xml.push_str(r#" date1904="1""#);
    }
    xml.push_str("/>");

    xml.push_str("<sheets>");
    for meta in sheets {
        let sheet = workbook
            .sheet(meta.worksheet_id)
            .expect("sheet meta refers to an existing sheet");
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}""#,
            escape_attr(&sheet.name),
            meta.sheet_id
        ));
        if let Some(state) = sheet.state.to_ooxml() {
            xml.push_str(&format!(r#" state="{state}""#));
        }
        xml.push_str(&format!(
            r#" r:id="{}"/>"#,
            escape_attr(&meta.relationship_id)
        ));
    }
    xml.push_str("</sheets>");

    write_defined_names(&mut xml, workbook, sheets);

    xml.push_str("</workbook>");
    xml.into_bytes()
}

/// Emit `<definedNames>`: the three reserved `_xlnm.*` names are rebuilt from
/// each worksheet's structured fields (never from a stored name list), then
/// generic names follow.
fn write_defined_names(xml: &mut String, workbook: &Workbook, sheets: &[SheetMeta]) {
    let mut entries = String::new();

    for (index, meta) in sheets.iter().enumerate() {
        let sheet = workbook
            .sheet(meta.worksheet_id)
            .expect("sheet meta refers to an existing sheet");

        if let Some(filter) = &sheet.auto_filter {
            entries.push_str(&format!(
                r#"<definedName name="_xlnm._FilterDatabase" localSheetId="{index}" hidden="1">{}</definedName>"#,
                escape_text(&sheet_qualified_range(sheet, &filter.to_a1_absolute()))
            ));
        }
        if let Some(area) = &sheet.print_area {
            entries.push_str(&format!(
                r#"<definedName name="_xlnm.Print_Area" localSheetId="{index}">{}</definedName>"#,
                escape_text(&sheet_qualified_range(sheet, &area.to_a1_absolute()))
            ));
        }
        let titles = print_titles_value(sheet);
        if let Some(titles) = titles {
            entries.push_str(&format!(
                r#"<definedName name="_xlnm.Print_Titles" localSheetId="{index}">{titles}</definedName>"#,
            ));
        }
    }

    for name in &workbook.defined_names {
        entries.push_str(&format!(
            r#"<definedName name="{}""#,
            escape_attr(&name.name)
        ));
        if let Some(sheet_index) = name.sheet_index {
            entries.push_str(&format!(r#" localSheetId="{sheet_index}""#));
        }
        if name.hidden {
            entries.push_str(r#" hidden="1""#);
        }
        entries.push('>');
        entries.push_str(&escape_text(&name.value));
        entries.push_str("</definedName>");
    }

    if !entries.is_empty() {
        xml.push_str("<definedNames>");
        xml.push_str(&entries);
        xml.push_str("</definedNames>");
    }
}

fn quoted_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn sheet_qualified_range(sheet: &Worksheet, reference: &str) -> String {
    format!("{}!{reference}", quoted_sheet_name(&sheet.name))
}

/// The `_xlnm.Print_Titles` value: `'Sheet'!$A:$C` for columns, `'Sheet'!$1:$4`
/// for rows, comma-joined (columns first) when both are set.
fn print_titles_value(sheet: &Worksheet) -> Option<String> {
    let mut components = Vec::new();
    if let Some((start, end)) = sheet.print_title_cols {
        components.push(format!(
            "{}!${}:${}",
            quoted_sheet_name(&sheet.name),
            gridline_model::CellRef::new(0, start).column_name(),
            gridline_model::CellRef::new(0, end).column_name(),
        ));
    }
    if let Some((start, end)) = sheet.print_title_rows {
        components.push(format!(
            "{}!${}:${}",
            quoted_sheet_name(&sheet.name),
            start + 1,
            end + 1,
        ));
    }
    if components.is_empty() {
        None
    } else {
        Some(escape_text(&components.join(",")))
    }
}

fn render_relationships(manifest: &Manifest, source: &str) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<Relationships xmlns="{}">"#,
        openxml::NS_RELATIONSHIPS_PKG
    ));
    for rel in manifest.relationships(source, None) {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}""#,
            escape_attr(&rel.id),
            escape_attr(&rel.type_uri),
            escape_attr(&rel.target)
        ));
        if rel.mode == TargetMode::External {
            xml.push_str(r#" TargetMode="External""#);
        }
        xml.push_str("/>");
    }
    xml.push_str("</Relationships>");
    xml.into_bytes()
}

fn render_content_types(manifest: &Manifest) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<Types xmlns="{}">"#,
        openxml::NS_CONTENT_TYPES
    ));
    for (extension, content_type) in manifest.defaults() {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            escape_attr(extension),
            escape_attr(content_type)
        ));
    }
    for (part, content_type) in manifest.overrides() {
        xml.push_str(&format!(
            r#"<Override PartName="{}" ContentType="{}"/>"#,
            escape_attr(part),
            escape_attr(content_type)
        ));
    }
    xml.push_str("</Types>");
    xml.into_bytes()
}

#[cfg(test)]
mod tests;
