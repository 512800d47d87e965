use quick_xml::events::attributes::AttrError;
use thiserror::Error;

use crate::manifest::ManifestError;

/// Errors raised while reading an XLSX package.
///
/// A load either returns a fully populated workbook or fails with one of
/// these; a partially populated workbook is never handed back silently.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] AttrError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A counted container's `count` attribute disagrees with its parsed
    /// children. The format has no checksum; this is the primary structural
    /// corruption detector.
    #[error("{part}: {container} count mismatch: declared {declared}, found {actual}")]
    CountMismatch {
        part: String,
        container: &'static str,
        declared: usize,
        actual: usize,
    },
    #[error("sharedStrings.xml: uniqueCount mismatch: declared {declared}, found {actual}")]
    UniqueCountMismatch { declared: usize, actual: usize },
    #[error("cell references shared string {index} but the table has {count} entries")]
    SharedStringIndexOutOfRange { index: u32, count: usize },
    #[error("workbook part has unrecognized content type: {0}")]
    UnrecognizedContentType(String),
    #[error("missing required part: {0}")]
    MissingPart(String),
    #[error("{part}: unexpected element <{element}>")]
    UnexpectedElement { part: String, element: String },
    #[error("invalid cell reference: {0}")]
    InvalidCellRef(String),
    #[error("invalid range reference: {0}")]
    InvalidRangeRef(String),
    #[error("{part}: invalid value {value:?} for {what}")]
    InvalidValue {
        part: String,
        what: &'static str,
        value: String,
    },
    #[error("invalid worksheet: {0}")]
    InvalidSheet(#[from] gridline_model::WorkbookError),
    #[error("worksheet merge error: {0}")]
    Merge(#[from] gridline_model::MergeError),
}

/// Errors raised while writing an XLSX package.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("workbook has no visible worksheet")]
    NoVisibleSheet,
}
