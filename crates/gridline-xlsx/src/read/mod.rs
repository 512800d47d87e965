//! The XLSX consumer: drives the pull parser across every part of the
//! archive in dependency order and populates the object model.
//!
//! Order: `[Content_Types].xml` → root relationships → the non-document root
//! parts (docProps) → `xl/workbook.xml` → shared strings, styles, theme →
//! each worksheet in declared `<sheets>` order, with comment/drawing/printer
//! side parts resolved through the manifest after each sheet.

mod comments;
mod properties;
mod shared_strings;
mod styles;
mod theme;
mod worksheet;

pub(crate) use comments::parse_comments;
pub(crate) use properties::{format_w3cdtf, parse_core_properties, parse_w3cdtf};
pub(crate) use shared_strings::parse_shared_strings;
pub(crate) use styles::parse_stylesheet;
pub(crate) use theme::parse_theme;
pub(crate) use worksheet::{construct_cell, parse_cell, RawCell, SharedFormulas};

use worksheet::PendingHyperlink;

use std::io::{Read, Seek};
use std::path::Path;

use gridline_model::{
    CellRef, DefinedName, Hyperlink, Range, SheetState, Workbook, Worksheet, WorksheetId,
};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ReadError;
use crate::manifest::{Manifest, Relationship, TargetMode};
use crate::openxml;
use crate::package::Package;
use crate::path::{rels_for_part, resolve_target};
use crate::rich_text::{attr_string, attr_u32, read_text};
use crate::{SheetMeta, XlsxDocument};

/// What to do when the reader meets an element the grammar does not declare.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UnknownElementPolicy {
    /// Surface the element as a [`ReadError::UnexpectedElement`]; tests want
    /// loud failures.
    Fail,
    /// Recursively consume and discard the subtree; production wants
    /// graceful degradation.
    #[default]
    Skip,
}

/// Reader configuration.
#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    pub unknown_elements: UnknownElementPolicy,
}

/// Load a workbook from a file on disk.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<XlsxDocument, ReadError> {
    let bytes = std::fs::read(path)?;
    load_from_bytes(&bytes)
}

/// Load a workbook from in-memory package bytes.
pub fn load_from_bytes(bytes: &[u8]) -> Result<XlsxDocument, ReadError> {
    load_from_bytes_with(bytes, &ReadOptions::default())
}

pub fn load_from_bytes_with(
    bytes: &[u8],
    options: &ReadOptions,
) -> Result<XlsxDocument, ReadError> {
    let package = Package::from_bytes(bytes)?;
    load_from_package(&package, options)
}

/// Load a workbook from any seekable reader.
pub fn load_from_reader<R: Read + Seek>(reader: R) -> Result<XlsxDocument, ReadError> {
    let package = Package::from_reader(reader)?;
    load_from_package(&package, &ReadOptions::default())
}

pub(crate) fn load_from_package(
    package: &Package,
    options: &ReadOptions,
) -> Result<XlsxDocument, ReadError> {
    let mut manifest = Manifest::new();

    // Content types come first; everything else resolves through them.
    let content_types = package.part_required("[Content_Types].xml")?;
    parse_content_types(content_types, &mut manifest)?;

    // Root relationships discover the office document and the docProps parts.
    let root_rels = package.part_required("_rels/.rels")?;
    register_relationships(root_rels, "", &mut manifest)?;

    let office_rel = manifest
        .relationship_by_type("", openxml::REL_TYPE_OFFICE_DOCUMENT)?
        .clone();
    let workbook_part = manifest.target_part("", &office_rel);

    match manifest.content_type(&workbook_part) {
        Some(ct) if openxml::is_workbook_content_type(ct) => {}
        Some(ct) => return Err(ReadError::UnrecognizedContentType(ct.to_string())),
        None => {
            return Err(ReadError::UnrecognizedContentType(
                "<no content type declared>".to_string(),
            ))
        }
    }

    let mut workbook = Workbook::new();

    // Root-level property parts are read before the office document.
    for rel in manifest.relationships("", None).cloned().collect::<Vec<_>>() {
        if rel.mode == TargetMode::External {
            continue;
        }
        let target = manifest.target_part("", &rel);
        match rel.type_uri.as_str() {
            openxml::REL_TYPE_CORE_PROPERTIES => {
                let bytes = package.part_required(&target)?;
                workbook.core_properties = properties::parse_core_properties(bytes)?;
            }
            openxml::REL_TYPE_EXTENDED_PROPERTIES => {
                let bytes = package.part_required(&target)?;
                workbook.extended_properties = properties::parse_extended_properties(bytes)?;
            }
            openxml::REL_TYPE_CUSTOM_PROPERTIES => {
                let bytes = package.part_required(&target)?;
                workbook.custom_properties = properties::parse_custom_properties(bytes)?;
            }
            _ => {}
        }
    }

    // Workbook relationships, then the workbook part itself.
    let workbook_rels_part = rels_for_part(&workbook_part);
    if let Some(bytes) = package.part(&workbook_rels_part) {
        register_relationships(bytes, &workbook_part, &mut manifest)?;
    }

    let workbook_xml = package.part_required(&workbook_part)?;
    let meta = parse_workbook_xml(workbook_xml, &workbook_part, options)?;
    workbook.date_system = if meta.date_1904 {
        gridline_model::DateSystem::V1904
    } else {
        gridline_model::DateSystem::V1900
    };

    // Dependency parts before any worksheet: shared strings, styles, theme.
    if let Some(rel) = manifest
        .relationships(&workbook_part, Some(openxml::REL_TYPE_SHARED_STRINGS))
        .next()
        .cloned()
    {
        let target = manifest.target_part(&workbook_part, &rel);
        workbook.shared_strings = parse_shared_strings(package.part_required(&target)?)?;
    }
    if let Some(rel) = manifest
        .relationships(&workbook_part, Some(openxml::REL_TYPE_STYLES))
        .next()
        .cloned()
    {
        let target = manifest.target_part(&workbook_part, &rel);
        workbook.stylesheet = parse_stylesheet(package.part_required(&target)?, options)?;
    }
    if let Some(rel) = manifest
        .relationships(&workbook_part, Some(openxml::REL_TYPE_THEME))
        .next()
        .cloned()
    {
        let target = manifest.target_part(&workbook_part, &rel);
        workbook.theme = theme::parse_theme(package.part_required(&target)?)?;
    }

    // Worksheets, in declared order (which may differ from part order).
    let mut sheet_meta = Vec::with_capacity(meta.sheets.len());
    for entry in &meta.sheets {
        let rel = manifest
            .relationship_by_id(&workbook_part, &entry.rel_id)?
            .clone();
        let sheet_part = manifest.target_part(&workbook_part, &rel);
        let sheet_xml = package.part_required(&sheet_part)?;

        // The sheet is detached while its cells are constructed so the
        // shared string and style tables stay borrowable.
        let ws_id = workbook.add_sheet(entry.name.clone())?;
        let mut worksheet = workbook
            .remove_sheet(ws_id)
            .expect("sheet just inserted must exist");
        worksheet.state = entry.state;

        let hyperlinks = worksheet::parse_worksheet(
            &mut worksheet,
            &sheet_part,
            sheet_xml,
            &workbook.shared_strings,
            &workbook.stylesheet,
            options,
        )?;
        workbook.sheets.push(worksheet);

        // Sheet relationships feed hyperlinks and the comment/drawing/
        // printer-settings side reads.
        let sheet_rels_part = rels_for_part(&sheet_part);
        if let Some(bytes) = package.part(&sheet_rels_part) {
            register_relationships(bytes, &sheet_part, &mut manifest)?;
        }

        resolve_hyperlinks(&mut workbook, ws_id, &sheet_part, hyperlinks, &manifest)?;
        read_sheet_side_parts(&mut workbook, ws_id, &sheet_part, package, &manifest)?;

        sheet_meta.push(SheetMeta {
            worksheet_id: ws_id,
            sheet_id: entry.sheet_id,
            relationship_id: entry.rel_id.clone(),
            path: sheet_part,
        });
    }

    apply_defined_names(&mut workbook, meta.defined_names);

    Ok(XlsxDocument {
        workbook,
        manifest,
        sheets: sheet_meta,
    })
}

fn resolve_hyperlinks(
    workbook: &mut Workbook,
    ws_id: WorksheetId,
    sheet_part: &str,
    pending: Vec<PendingHyperlink>,
    manifest: &Manifest,
) -> Result<(), ReadError> {
    if pending.is_empty() {
        return Ok(());
    }
    let Some(worksheet) = workbook.sheet_mut(ws_id) else {
        return Ok(());
    };

    for link in pending {
        let mut hyperlink = if let Some(rel_id) = &link.rel_id {
            let rel = manifest.relationship_by_id(sheet_part, rel_id)?;
            Hyperlink::external(rel.target.clone())
        } else if let Some(location) = &link.location {
            Hyperlink::internal(location.clone())
        } else {
            continue;
        };
        hyperlink.display = link.display;
        hyperlink.tooltip = link.tooltip;

        match worksheet.cell_mut(link.cell) {
            Some(cell) => cell.hyperlink = Some(hyperlink),
            None => {
                let mut cell = gridline_model::Cell::default();
                cell.hyperlink = Some(hyperlink);
                worksheet.set_cell(link.cell, cell);
            }
        }
    }
    Ok(())
}

/// Comments, drawings (with their images) and printer settings hang off the
/// worksheet's relationship set and are read after its primary XML.
fn read_sheet_side_parts(
    workbook: &mut Workbook,
    ws_id: WorksheetId,
    sheet_part: &str,
    package: &Package,
    manifest: &Manifest,
) -> Result<(), ReadError> {
    // Comments.
    let comment_rels: Vec<Relationship> = manifest
        .relationships(sheet_part, Some(openxml::REL_TYPE_COMMENTS))
        .cloned()
        .collect();
    for rel in comment_rels {
        let target = manifest.target_part(sheet_part, &rel);
        let bytes = package.part_required(&target)?;
        let parsed = comments::parse_comments(bytes)?;
        if let Some(worksheet) = workbook.sheet_mut(ws_id) {
            for (cell_ref, comment) in parsed {
                match worksheet.cell_mut(cell_ref) {
                    Some(cell) => cell.comment = Some(comment),
                    None => {
                        let mut cell = gridline_model::Cell::default();
                        cell.comment = Some(comment);
                        worksheet.set_cell(cell_ref, cell);
                    }
                }
            }
        }
    }

    // Drawings are carried through opaquely, plus every image they point at.
    let drawing_rels: Vec<Relationship> = manifest
        .relationships(sheet_part, Some(openxml::REL_TYPE_DRAWING))
        .cloned()
        .collect();
    for rel in drawing_rels {
        let target = manifest.target_part(sheet_part, &rel);
        let bytes = package.part_required(&target)?.to_vec();

        let drawing_rels_part = rels_for_part(&target);
        if let Some(rels_bytes) = package.part(&drawing_rels_part) {
            // The drawing's own relationship part is carried through
            // verbatim alongside the images it points at.
            workbook
                .media
                .insert(drawing_rels_part.clone(), rels_bytes.to_vec());
            for image_rel in parse_relationships_list(rels_bytes)? {
                if image_rel.type_uri == openxml::REL_TYPE_IMAGE
                    && image_rel.mode == TargetMode::Internal
                {
                    let image_part = resolve_target(&target, &image_rel.target);
                    let image_bytes = package.part_required(&image_part)?.to_vec();
                    workbook.media.insert(image_part, image_bytes);
                }
            }
        }

        if let Some(worksheet) = workbook.sheet_mut(ws_id) {
            worksheet.drawing = Some((target, bytes));
        }
    }

    // Printer settings are an opaque binary blob.
    let printer_rels: Vec<Relationship> = manifest
        .relationships(sheet_part, Some(openxml::REL_TYPE_PRINTER_SETTINGS))
        .cloned()
        .collect();
    for rel in printer_rels {
        let target = manifest.target_part(sheet_part, &rel);
        if let Some(bytes) = package.part(&target) {
            if let Some(worksheet) = workbook.sheet_mut(ws_id) {
                worksheet.printer_settings = Some(bytes.to_vec());
            }
        }
    }

    Ok(())
}

/// Parse `[Content_Types].xml` into the manifest's default/override tables.
fn parse_content_types(xml: &[u8], manifest: &mut Manifest) -> Result<(), ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"Default" => {
                    if let (Some(extension), Some(content_type)) = (
                        attr_string(&e, b"Extension")?,
                        attr_string(&e, b"ContentType")?,
                    ) {
                        manifest.register_default(&extension, &content_type);
                    }
                }
                b"Override" => {
                    if let (Some(part_name), Some(content_type)) = (
                        attr_string(&e, b"PartName")?,
                        attr_string(&e, b"ContentType")?,
                    ) {
                        manifest.register_override(&part_name, &content_type);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Parse a `.rels` part and register every relationship under `source_part`.
pub(crate) fn register_relationships(
    xml: &[u8],
    source_part: &str,
    manifest: &mut Manifest,
) -> Result<(), ReadError> {
    for rel in parse_relationships_list(xml)? {
        manifest.register_relationship(source_part, rel)?;
    }
    Ok(())
}

pub(crate) fn parse_relationships_list(xml: &[u8]) -> Result<Vec<Relationship>, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e)
                if e.local_name().as_ref().eq_ignore_ascii_case(b"Relationship") =>
            {
                let id = attr_string(&e, b"Id")?;
                let type_uri = attr_string(&e, b"Type")?;
                let target = attr_string(&e, b"Target")?;
                let target_mode = attr_string(&e, b"TargetMode")?;
                if let (Some(id), Some(type_uri), Some(target)) = (id, type_uri, target) {
                    let mode = if target_mode
                        .as_deref()
                        .is_some_and(|m| m.trim().eq_ignore_ascii_case("External"))
                    {
                        TargetMode::External
                    } else {
                        TargetMode::Internal
                    };
                    out.push(Relationship {
                        id,
                        type_uri,
                        target,
                        mode,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[derive(Debug)]
pub(crate) struct SheetEntry {
    pub(crate) name: String,
    pub(crate) sheet_id: u32,
    pub(crate) rel_id: String,
    pub(crate) state: SheetState,
}

/// A defined name as read off the wire; reserved `_xlnm.*` names transfer
/// onto their worksheet and are then discarded.
#[derive(Debug)]
pub(crate) struct RawDefinedName {
    name: String,
    value: String,
    local_sheet_id: Option<u32>,
    hidden: bool,
}

#[derive(Debug, Default)]
pub(crate) struct WorkbookMeta {
    pub(crate) date_1904: bool,
    pub(crate) sheets: Vec<SheetEntry>,
    pub(crate) defined_names: Vec<RawDefinedName>,
}

pub(crate) fn parse_workbook_xml(
    xml: &[u8],
    part: &str,
    options: &ReadOptions,
) -> Result<WorkbookMeta, ReadError> {
    let xml = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut meta = WorkbookMeta::default();
    let mut in_sheets = false;
    let mut in_defined_names = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"workbook" => {
                // Root element; its children drive the arms below.
                drop(e);
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"workbookPr" => {
                if let Some(val) = attr_string(&e, b"date1904")? {
                    meta.date_1904 = openxml::parse_xml_bool(&val);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"sheets" => in_sheets = true,
            Event::End(e) if e.local_name().as_ref() == b"sheets" => in_sheets = false,
            Event::Start(e) | Event::Empty(e)
                if in_sheets && e.local_name().as_ref() == b"sheet" =>
            {
                let name = attr_string(&e, b"name")?.unwrap_or_default();
                let sheet_id = attr_u32(&e, b"sheetId")?.unwrap_or(0);
                let rel_id = attr_string(&e, b"id")?.unwrap_or_default();
                let state = attr_string(&e, b"state")?
                    .map(|v| SheetState::from_ooxml(&v))
                    .unwrap_or_default();
                meta.sheets.push(SheetEntry {
                    name,
                    sheet_id,
                    rel_id,
                    state,
                });
            }
            Event::Start(e) if e.local_name().as_ref() == b"definedNames" => {
                in_defined_names = true;
            }
            Event::End(e) if e.local_name().as_ref() == b"definedNames" => {
                in_defined_names = false;
            }
            Event::Start(e) if in_defined_names && e.local_name().as_ref() == b"definedName" => {
                let name = attr_string(&e, b"name")?.unwrap_or_default();
                let local_sheet_id = attr_u32(&e, b"localSheetId")?;
                let hidden = attr_string(&e, b"hidden")?
                    .map(|v| openxml::parse_xml_bool(&v))
                    .unwrap_or(false);
                let value = read_text(&mut reader, b"definedName")?;
                meta.defined_names.push(RawDefinedName {
                    name,
                    value,
                    local_sheet_id,
                    hidden,
                });
            }
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                if is_known_workbook_element(&local) {
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
                if !is_known_workbook_element(local)
                    && options.unknown_elements == UnknownElementPolicy::Fail
                {
                    return Err(ReadError::UnexpectedElement {
                        part: part.to_string(),
                        element: String::from_utf8_lossy(local).into_owned(),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(meta)
}

fn is_known_workbook_element(local: &[u8]) -> bool {
    matches!(
        local,
        b"fileVersion"
            | b"fileSharing"
            | b"workbookProtection"
            | b"bookViews"
            | b"workbookView"
            | b"functionGroups"
            | b"externalReferences"
            | b"calcPr"
            | b"oleSize"
            | b"customWorkbookViews"
            | b"pivotCaches"
            | b"smartTagPr"
            | b"smartTagTypes"
            | b"webPublishing"
            | b"fileRecoveryPr"
            | b"webPublishObjects"
            | b"extLst"
    )
}

/// Reserved names transfer their effect onto the owning worksheet; everything
/// else is kept as a generic defined name.
fn apply_defined_names(workbook: &mut Workbook, names: Vec<RawDefinedName>) {
    for raw in names {
        let sheet_index = raw.local_sheet_id;
        match raw.name.as_str() {
            "_xlnm._FilterDatabase" => {
                if let Some(worksheet) = sheet_by_index_mut(workbook, sheet_index) {
                    if let Some(range) = parse_sheet_qualified_range(&raw.value) {
                        worksheet.auto_filter = Some(range);
                    }
                }
            }
            "_xlnm.Print_Area" => {
                if let Some(worksheet) = sheet_by_index_mut(workbook, sheet_index) {
                    if let Some(range) = parse_sheet_qualified_range(&raw.value) {
                        worksheet.print_area = Some(range);
                    }
                }
            }
            "_xlnm.Print_Titles" => {
                if let Some(worksheet) = sheet_by_index_mut(workbook, sheet_index) {
                    apply_print_titles(worksheet, &raw.value);
                }
            }
            _ => {
                workbook.defined_names.push(DefinedName {
                    name: raw.name,
                    value: raw.value,
                    sheet_index: raw.local_sheet_id,
                    hidden: raw.hidden,
                });
            }
        }
    }
}

fn sheet_by_index_mut(
    workbook: &mut Workbook,
    index: Option<u32>,
) -> Option<&mut Worksheet> {
    workbook.sheets.get_mut(index? as usize)
}

/// Parse `'Sheet Name'!$A$1:$D$20` (the quoted sheet prefix is optional).
fn parse_sheet_qualified_range(value: &str) -> Option<Range> {
    let reference = value.rsplit_once('!').map(|(_, r)| r).unwrap_or(value);
    Range::from_a1(reference).ok()
}

/// Print titles come in the grammar `'Sheet'!$A:$C` (columns), `'Sheet'!$1:$4`
/// (rows), or both comma-joined.
fn apply_print_titles(worksheet: &mut Worksheet, value: &str) {
    for component in split_defined_name_components(value) {
        let reference = component
            .rsplit_once('!')
            .map(|(_, r)| r)
            .unwrap_or(&component);
        let Some((start, end)) = reference.split_once(':') else {
            continue;
        };
        let start = start.trim_start_matches('$');
        let end = end.trim_start_matches('$');

        if start.chars().all(|c| c.is_ascii_digit()) && end.chars().all(|c| c.is_ascii_digit()) {
            if let (Ok(a), Ok(b)) = (start.parse::<u32>(), end.parse::<u32>()) {
                if a >= 1 && b >= a {
                    worksheet.print_title_rows = Some((a - 1, b - 1));
                }
            }
        } else if start.chars().all(|c| c.is_ascii_alphabetic())
            && end.chars().all(|c| c.is_ascii_alphabetic())
        {
            let a = CellRef::from_a1(&format!("{start}1")).map(|c| c.col);
            let b = CellRef::from_a1(&format!("{end}1")).map(|c| c.col);
            if let (Ok(a), Ok(b)) = (a, b) {
                if b >= a {
                    worksheet.print_title_cols = Some((a, b));
                }
            }
        }
    }
}

/// Split a defined-name value on commas, respecting quoted sheet names.
fn split_defined_name_components(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in value.chars() {
        match ch {
            '\'' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_titles_grammar_parses_both_axes() {
        let mut worksheet = Worksheet::new(1, "Sheet1");
        apply_print_titles(&mut worksheet, "'Sheet1'!$A:$C,'Sheet1'!$1:$4");
        assert_eq!(worksheet.print_title_cols, Some((0, 2)));
        assert_eq!(worksheet.print_title_rows, Some((0, 3)));
    }

    #[test]
    fn sheet_qualified_range_strips_prefix() {
        assert_eq!(
            parse_sheet_qualified_range("'My Sheet'!$A$1:$D$20"),
            Some(Range::from_a1("A1:D20").unwrap())
        );
        assert_eq!(
            parse_sheet_qualified_range("$B$2"),
            Some(Range::from_a1("B2").unwrap())
        );
    }

    #[test]
    fn quoted_sheet_names_survive_component_split() {
        let parts = split_defined_name_components("'a,b'!$A:$B,'a,b'!$1:$2");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "'a,b'!$A:$B");
    }
}
