//! Core in-memory data model for Gridline spreadsheets.
//!
//! This crate contains plain data holders: workbooks, worksheets, cells,
//! styles, shared strings, rich text, document properties and page layout.
//! It knows nothing about the on-disk XLSX package format; the
//! `gridline-xlsx` crate reads and writes these types.

pub mod address;
pub mod cell;
pub mod comments;
pub mod datetime;
pub mod hyperlink;
pub mod page;
pub mod properties;
pub mod rich_text;
pub mod shared_strings;
pub mod style;
pub mod theme;
pub mod value;
pub mod workbook;
pub mod worksheet;

pub use address::{A1ParseError, CellRef, Range, RangeIter, RangeParseError};
pub use cell::{Cell, CellKey, MAX_COLS, MAX_ROWS};
pub use comments::Comment;
pub use datetime::DateSystem;
pub use hyperlink::{Hyperlink, HyperlinkTarget};
pub use page::{
    HeaderFooter, HeaderFooterSection, PageBreaks, PageMargins, PageOrientation, PageSetup,
    PaperSize,
};
pub use properties::{CoreProperties, CustomProperty, CustomValue, ExtendedProperties};
pub use rich_text::{PhoneticProperties, PhoneticRun, RichText, RichTextRun, RunFont};
pub use shared_strings::SharedStrings;
pub use style::{
    Alignment, Argb, Border, BorderSide, BorderStyle, Color, Fill, Font, Format, FormatDiff,
    GradientFill, HorizontalAlignment, NamedStyle, NumberFormat, PatternFill, PatternFillType,
    Protection, Stylesheet, UnderlineStyle, VerticalAlignment,
};
pub use theme::ThemePalette;
pub use value::{CellValue, ErrorValue};
pub use workbook::{DefinedName, Workbook, WorkbookError};
pub use worksheet::{
    ColumnProperties, MergeError, Pane, PaneState, RowProperties, Selection, SheetState, SheetView,
    Worksheet, WorksheetId,
};
