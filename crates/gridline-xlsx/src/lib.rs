//! XLSX import/export for Gridline workbooks.
//!
//! The crate pairs two stateful streaming halves over the OPC ZIP package:
//! the consumer ([`load_from_bytes`] and friends) walks `[Content_Types].xml`,
//! the relationship graph and every part in dependency order to populate a
//! [`gridline_model::Workbook`]; the producer ([`XlsxDocument::save_to_vec`],
//! [`write_workbook`]) mirrors that traversal to emit the package, assigning
//! relationship ids and content types for workbooks that were never loaded
//! from a file.
//!
//! A [`streaming::SheetStream`] offers a single-pass low-memory read path for
//! one worksheet at a time.

pub mod error;
pub mod header_footer;
pub mod manifest;
pub mod openxml;
mod package;
pub mod path;
mod read;
mod rich_text;
pub mod streaming;
mod write;
mod xml;

use std::path::Path;

use gridline_model::{Workbook, WorksheetId};

pub use error::{ReadError, WriteError};
pub use manifest::{Manifest, ManifestError, Relationship, TargetMode};
pub use read::{
    load_from_bytes, load_from_bytes_with, load_from_path, load_from_reader, ReadOptions,
    UnknownElementPolicy,
};
pub use streaming::{SheetStream, StreamedCell};
pub use write::write_workbook;

/// Package-level bookkeeping for one worksheet: where its part lives and
/// which workbook relationship points at it.
#[derive(Clone, Debug)]
pub struct SheetMeta {
    pub worksheet_id: WorksheetId,
    pub sheet_id: u32,
    pub relationship_id: String,
    pub path: String,
}

/// A workbook paired with the manifest state captured while loading it, so a
/// re-save can reuse the original part paths and relationship ids instead of
/// inventing new ones.
#[derive(Clone, Debug)]
pub struct XlsxDocument {
    pub workbook: Workbook,
    manifest: Manifest,
    sheets: Vec<SheetMeta>,
}

impl XlsxDocument {
    /// Wrap a workbook built through the object-model API. Part paths and
    /// relationship ids are assigned when the document is written.
    pub fn new(workbook: Workbook) -> Self {
        Self {
            workbook,
            manifest: Manifest::new(),
            sheets: Vec::new(),
        }
    }

    /// The relationship graph captured at load time (empty for documents
    /// built from scratch). Rebuilt fresh on every write pass.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Sheet part bookkeeping captured at load time.
    pub fn sheet_meta(&self) -> &[SheetMeta] {
        &self.sheets
    }

    /// Serialize the document to XLSX package bytes.
    pub fn save_to_vec(&self) -> Result<Vec<u8>, WriteError> {
        write::write_to_vec(self)
    }

    /// Serialize the document to a file on disk.
    pub fn save_to_path(&self, target: impl AsRef<Path>) -> Result<(), WriteError> {
        let bytes = self.save_to_vec()?;
        std::fs::write(target, bytes)?;
        Ok(())
    }
}

impl From<Workbook> for XlsxDocument {
    fn from(workbook: Workbook) -> Self {
        Self::new(workbook)
    }
}
