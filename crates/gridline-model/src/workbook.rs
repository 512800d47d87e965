use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::datetime::DateSystem;
use crate::properties::{CoreProperties, CustomProperty, ExtendedProperties};
use crate::shared_strings::SharedStrings;
use crate::style::Stylesheet;
use crate::theme::ThemePalette;
use crate::worksheet::{SheetState, Worksheet, WorksheetId};

/// Errors raised by workbook-level operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WorkbookError {
    #[error("sheet name cannot be empty")]
    EmptySheetName,
    #[error("a sheet named {0:?} already exists")]
    DuplicateSheetName(String),
    #[error("sheet not found")]
    SheetNotFound,
}

/// A defined name (named range / constant / formula).
///
/// The three reserved `_xlnm.*` names are never stored here; they live on the
/// owning worksheet's auto-filter / print fields and are synthesized back on
/// write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedName {
    pub name: String,
    /// Raw formula-like value, stored without a leading `=`.
    pub value: String,
    /// Index of the owning sheet for sheet-scoped names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_index: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

/// A workbook: ordered worksheets plus the shared tables every sheet
/// references.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workbook {
    /// Worksheets in declaration order (the `<sheets>` list order, which may
    /// differ from physical part order in a package).
    pub sheets: Vec<Worksheet>,
    pub shared_strings: SharedStrings,
    pub stylesheet: Stylesheet,
    pub theme: ThemePalette,
    #[serde(default)]
    pub date_system: DateSystem,
    #[serde(default, skip_serializing_if = "CoreProperties::is_empty")]
    pub core_properties: CoreProperties,
    #[serde(default, skip_serializing_if = "ExtendedProperties::is_empty")]
    pub extended_properties: ExtendedProperties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_properties: Vec<CustomProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defined_names: Vec<DefinedName>,
    /// Opaque media parts carried through a round-trip (part path → bytes).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub media: BTreeMap<String, Vec<u8>>,

    #[serde(skip)]
    next_sheet_id: WorksheetId,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Create an empty workbook with no sheets.
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            shared_strings: SharedStrings::new(),
            stylesheet: Stylesheet::new(),
            theme: ThemePalette::office(),
            date_system: DateSystem::default(),
            core_properties: CoreProperties::default(),
            extended_properties: ExtendedProperties::default(),
            custom_properties: Vec::new(),
            defined_names: Vec::new(),
            media: BTreeMap::new(),
            next_sheet_id: 1,
        }
    }

    /// Add a worksheet, returning its id.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> Result<WorksheetId, WorkbookError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(WorkbookError::EmptySheetName);
        }
        if self
            .sheets
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(trimmed))
        {
            return Err(WorkbookError::DuplicateSheetName(trimmed.to_string()));
        }
        let id = self.next_sheet_id;
        self.next_sheet_id = self.next_sheet_id.wrapping_add(1);
        self.sheets.push(Worksheet::new(id, trimmed));
        Ok(id)
    }

    pub fn sheet(&self, id: WorksheetId) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    pub fn sheet_mut(&mut self, id: WorksheetId) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.id == id)
    }

    /// Find a sheet by name (case-insensitive, as in Excel).
    pub fn sheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn remove_sheet(&mut self, id: WorksheetId) -> Result<Worksheet, WorkbookError> {
        let idx = self
            .sheets
            .iter()
            .position(|s| s.id == id)
            .ok_or(WorkbookError::SheetNotFound)?;
        Ok(self.sheets.remove(idx))
    }

    /// Returns true when at least one sheet is visible. A workbook with no
    /// visible sheet cannot be written.
    pub fn has_visible_sheet(&self) -> bool {
        self.sheets.iter().any(|s| s.state == SheetState::Visible)
    }

    /// Look up a generic defined name. The reserved `_xlnm.*` names are not
    /// reachable here.
    pub fn defined_name(&self, name: &str) -> Option<&DefinedName> {
        self.defined_names
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }

    pub fn add_defined_name(&mut self, name: DefinedName) {
        self.defined_names.push(name);
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names_are_unique_case_insensitive() {
        let mut wb = Workbook::new();
        wb.add_sheet("Data").unwrap();
        assert_eq!(
            wb.add_sheet("data"),
            Err(WorkbookError::DuplicateSheetName("data".to_string()))
        );
        assert_eq!(wb.add_sheet(""), Err(WorkbookError::EmptySheetName));
    }

    #[test]
    fn visible_sheet_detection() {
        let mut wb = Workbook::new();
        let id = wb.add_sheet("Sheet1").unwrap();
        assert!(wb.has_visible_sheet());
        wb.sheet_mut(id).unwrap().state = SheetState::Hidden;
        assert!(!wb.has_visible_sheet());
    }

    #[test]
    fn sheet_lookup_by_name() {
        let mut wb = Workbook::new();
        wb.add_sheet("Report").unwrap();
        assert!(wb.sheet_by_name("report").is_some());
        assert!(wb.sheet_by_name("missing").is_none());
    }
}
