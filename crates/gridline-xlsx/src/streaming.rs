//! Single-pass streaming worksheet reads.
//!
//! [`SheetStream`] reads the package prelude (content types, relationships,
//! workbook metadata, shared strings, styles) up front, then walks one
//! worksheet at a time, advancing the underlying parser one `<row>`/`<c>` at
//! a time through a single reusable cell buffer. Only the current worksheet
//! is materialized; previously streamed sheets are not retained.
//!
//! Call order is a hard contract: [`SheetStream::has_cell`] /
//! [`SheetStream::read_cell`] must run to end-of-sheet before
//! [`SheetStream::next_sheet`] moves on, and the stream is not reentrant.
//! Aborting mid-read means dropping the stream; partially read data must be
//! discarded.

use std::io::{Cursor, Read, Seek};

use gridline_model::{Cell, CellRef, SharedStrings, Stylesheet};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ReadError;
use crate::manifest::Manifest;
use crate::openxml;
use crate::path::rels_for_part;
use crate::read::{
    construct_cell, parse_cell, parse_shared_strings, parse_stylesheet, parse_workbook_xml,
    register_relationships, RawCell, ReadOptions, SharedFormulas,
};
use crate::rich_text::attr_u32;

/// One cell as produced by the stream: its reference plus the same typed
/// representation the bulk reader constructs.
#[derive(Clone, Debug, Default)]
pub struct StreamedCell {
    pub reference: CellRef,
    pub cell: Cell,
}

struct SheetEntry {
    name: String,
    part: String,
}

struct SheetCursor {
    part: String,
    reader: Reader<Cursor<Vec<u8>>>,
    in_sheet_data: bool,
    done: bool,
    shared_formulas: SharedFormulas,
    current_row: u32,
    next_col: u32,
}

/// Streaming reader over the worksheets of one package.
pub struct SheetStream<R: Read + Seek> {
    archive: ZipArchive<R>,
    options: ReadOptions,
    shared_strings: SharedStrings,
    stylesheet: Stylesheet,
    sheets: Vec<SheetEntry>,
    next_sheet: usize,
    cursor: Option<SheetCursor>,
    // The single reusable buffers; one raw record and one streamed cell are
    // alive at a time, refilled in place.
    raw: RawCell,
    buffer: StreamedCell,
    buffered: bool,
}

impl SheetStream<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ReadError> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> SheetStream<R> {
    pub fn from_reader(reader: R) -> Result<Self, ReadError> {
        Self::from_reader_with(reader, ReadOptions::default())
    }

    pub fn from_reader_with(reader: R, options: ReadOptions) -> Result<Self, ReadError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut manifest = Manifest::new();

        let root_rels = read_zip_part_required(&mut archive, "_rels/.rels")?;
        register_relationships(&root_rels, "", &mut manifest)?;
        let office_rel = manifest
            .relationship_by_type("", openxml::REL_TYPE_OFFICE_DOCUMENT)?
            .clone();
        let workbook_part = manifest.target_part("", &office_rel);

        let workbook_rels_part = rels_for_part(&workbook_part);
        if let Some(bytes) = read_zip_part_optional(&mut archive, &workbook_rels_part)? {
            register_relationships(&bytes, &workbook_part, &mut manifest)?;
        }

        let workbook_xml = read_zip_part_required(&mut archive, &workbook_part)?;
        let meta = parse_workbook_xml(&workbook_xml, &workbook_part, &options)?;

        let shared_strings = match manifest
            .relationships(&workbook_part, Some(openxml::REL_TYPE_SHARED_STRINGS))
            .next()
            .cloned()
        {
            Some(rel) => {
                let target = manifest.target_part(&workbook_part, &rel);
                match read_zip_part_optional(&mut archive, &target)? {
                    Some(bytes) => parse_shared_strings(&bytes)?,
                    None => SharedStrings::new(),
                }
            }
            None => SharedStrings::new(),
        };

        let stylesheet = match manifest
            .relationships(&workbook_part, Some(openxml::REL_TYPE_STYLES))
            .next()
            .cloned()
        {
            Some(rel) => {
                let target = manifest.target_part(&workbook_part, &rel);
                match read_zip_part_optional(&mut archive, &target)? {
                    Some(bytes) => parse_stylesheet(&bytes, &options)?,
                    None => Stylesheet::new(),
                }
            }
            None => Stylesheet::new(),
        };

        let mut sheets = Vec::with_capacity(meta.sheets.len());
        for entry in &meta.sheets {
            let rel = manifest.relationship_by_id(&workbook_part, &entry.rel_id)?;
            sheets.push(SheetEntry {
                name: entry.name.clone(),
                part: manifest.target_part(&workbook_part, rel),
            });
        }

        Ok(Self {
            archive,
            options,
            shared_strings,
            stylesheet,
            sheets,
            next_sheet: 0,
            cursor: None,
            raw: RawCell::default(),
            buffer: StreamedCell::default(),
            buffered: false,
        })
    }

    /// Sheet names in declared order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    /// The shared string table, for resolving streamed shared-string cells.
    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared_strings
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    /// Open the next worksheet in declared order, returning its name, or
    /// `None` once every sheet has been streamed. Any unread cells of the
    /// previous sheet are discarded.
    pub fn next_sheet(&mut self) -> Result<Option<&str>, ReadError> {
        self.cursor = None;
        self.buffered = false;

        let Some(entry) = self.sheets.get(self.next_sheet) else {
            return Ok(None);
        };
        self.next_sheet += 1;

        let xml = read_zip_part_required(&mut self.archive, &entry.part)?;
        let mut reader = Reader::from_reader(Cursor::new(xml));
        reader.config_mut().trim_text(true);
        self.cursor = Some(SheetCursor {
            part: entry.part.clone(),
            reader,
            in_sheet_data: false,
            done: false,
            shared_formulas: SharedFormulas::default(),
            current_row: 0,
            next_col: 0,
        });

        Ok(Some(entry.name.as_str()))
    }

    /// Returns true while the current sheet has another cell, advancing the
    /// parser to it. `false` means `</sheetData>` has been consumed.
    pub fn has_cell(&mut self) -> Result<bool, ReadError> {
        if self.buffered {
            return Ok(true);
        }
        self.advance()
    }

    /// The next cell of the current sheet, or `None` at end-of-sheet. The
    /// returned reference points into the stream's reusable buffer and is
    /// invalidated by the next call.
    pub fn read_cell(&mut self) -> Result<Option<&StreamedCell>, ReadError> {
        if !self.has_cell()? {
            return Ok(None);
        }
        self.buffered = false;
        Ok(Some(&self.buffer))
    }

    fn advance(&mut self) -> Result<bool, ReadError> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(false);
        };
        if cursor.done {
            return Ok(false);
        }

        let mut buf = Vec::new();
        let mut got_cell = false;
        loop {
            match cursor.reader.read_event_into(&mut buf)? {
                Event::Start(e)
                    if cursor.in_sheet_data && e.local_name().as_ref() == b"c" =>
                {
                    parse_cell(
                        &mut cursor.reader,
                        &cursor.part,
                        &e,
                        false,
                        &mut self.raw,
                        &self.options,
                    )?;
                    got_cell = true;
                }
                Event::Empty(e) if cursor.in_sheet_data && e.local_name().as_ref() == b"c" => {
                    parse_cell(
                        &mut cursor.reader,
                        &cursor.part,
                        &e,
                        true,
                        &mut self.raw,
                        &self.options,
                    )?;
                    got_cell = true;
                }
                Event::Start(e) | Event::Empty(e)
                    if cursor.in_sheet_data && e.local_name().as_ref() == b"row" =>
                {
                    if let Some(row) = attr_u32(&e, b"r")? {
                        if row >= 1 {
                            cursor.current_row = row - 1;
                            cursor.next_col = 0;
                        }
                    }
                }
                Event::Start(e) if !cursor.in_sheet_data => {
                    if e.local_name().as_ref() == b"sheetData" {
                        cursor.in_sheet_data = true;
                    } else if e.local_name().as_ref() != b"worksheet" {
                        // Pre-sheetData sections are not streamed.
                        let name = e.name().as_ref().to_vec();
                        cursor
                            .reader
                            .read_to_end_into(quick_xml::name::QName(&name), &mut Vec::new())?;
                    }
                }
                Event::Empty(e)
                    if !cursor.in_sheet_data && e.local_name().as_ref() == b"sheetData" =>
                {
                    cursor.done = true;
                    return Ok(false);
                }
                Event::End(e) if e.local_name().as_ref() == b"sheetData" => {
                    cursor.done = true;
                    return Ok(false);
                }
                Event::Eof => {
                    cursor.done = true;
                    return Ok(false);
                }
                _ => {}
            }
            if got_cell {
                break;
            }
            buf.clear();
        }

        self.fill_buffer()
    }

    /// Convert the raw buffer into the streamed cell buffer.
    fn fill_buffer(&mut self) -> Result<bool, ReadError> {
        let cursor = self.cursor.as_mut().expect("cursor is set while advancing");

        let reference = match self.raw.reference {
            Some(reference) => reference,
            // Cells without an `r` attribute take the next column of the
            // current row.
            None => CellRef::new(cursor.current_row, cursor.next_col),
        };
        cursor.current_row = reference.row;
        cursor.next_col = reference.col + 1;

        let cell = construct_cell(
            &self.raw,
            &cursor.part,
            &self.shared_strings,
            &self.stylesheet,
            &mut cursor.shared_formulas,
            &self.options,
        )?;

        self.buffer.reference = reference;
        self.buffer.cell = cell;
        self.buffered = true;
        Ok(true)
    }
}

fn read_zip_part_required<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, ReadError> {
    read_zip_part_optional(archive, name)?
        .ok_or_else(|| ReadError::MissingPart(name.to_string()))
}

fn read_zip_part_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, ReadError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            if file.is_dir() {
                return Ok(None);
            }
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
