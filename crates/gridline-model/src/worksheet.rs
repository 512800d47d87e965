use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellKey};
use crate::page::{HeaderFooter, PageBreaks, PageMargins, PageSetup};
use crate::value::CellValue;
use crate::{CellRef, Range};

/// Identifier for a worksheet within its workbook.
pub type WorksheetId = u32;

/// Visibility of a sheet tab.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    pub fn from_ooxml(s: &str) -> Self {
        match s {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }

    pub fn to_ooxml(self) -> Option<&'static str> {
        match self {
            SheetState::Visible => None,
            SheetState::Hidden => Some("hidden"),
            SheetState::VeryHidden => Some("veryHidden"),
        }
    }
}

/// Per-row presentation properties.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub custom_height: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Row-level format record index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<u32>,
}

impl RowProperties {
    pub fn is_default(&self) -> bool {
        *self == RowProperties::default()
    }
}

/// Per-column presentation properties.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub custom_width: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub best_fit: bool,
    /// Column-level format record index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<u32>,
}

impl ColumnProperties {
    pub fn is_default(&self) -> bool {
        *self == ColumnProperties::default()
    }
}

/// Frozen/split pane state of a sheet view.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaneState {
    #[default]
    Split,
    Frozen,
    FrozenSplit,
}

impl PaneState {
    pub fn from_ooxml(s: &str) -> Self {
        match s {
            "frozen" => PaneState::Frozen,
            "frozenSplit" => PaneState::FrozenSplit,
            _ => PaneState::Split,
        }
    }

    pub fn to_ooxml(self) -> &'static str {
        match self {
            PaneState::Split => "split",
            PaneState::Frozen => "frozen",
            PaneState::FrozenSplit => "frozenSplit",
        }
    }
}

/// `<pane>` of a sheet view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pane {
    pub x_split: f64,
    pub y_split: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_left_cell: Option<CellRef>,
    #[serde(default)]
    pub state: PaneState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_pane: Option<String>,
}

/// `<selection>` of a sheet view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_cell: Option<CellRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqref: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pane: Option<String>,
}

/// `<sheetView>` state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetView {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub show_grid_lines: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub tab_selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_left_cell: Option<CellRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pane: Option<Pane>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<Selection>,
}

impl Default for SheetView {
    fn default() -> Self {
        Self {
            show_grid_lines: true,
            tab_selected: false,
            zoom_scale: None,
            top_left_cell: None,
            pane: None,
            selections: Vec::new(),
        }
    }
}

impl SheetView {
    pub fn is_default(&self) -> bool {
        *self == SheetView::default()
    }
}

/// Error raised when adding an overlapping merged range.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("merged range {new} overlaps existing merged range {existing}")]
    Overlap { new: Range, existing: Range },
}

/// A worksheet: a sparse cell map plus presentation and print state.
///
/// Cells are keyed row-major; iteration order over the map is the row-major
/// order the package format wants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Worksheet {
    pub id: WorksheetId,
    pub name: String,
    #[serde(default)]
    pub state: SheetState,

    cells: BTreeMap<CellKey, Cell>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub row_properties: BTreeMap<u32, RowProperties>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_properties: BTreeMap<u32, ColumnProperties>,

    merged_ranges: Vec<Range>,

    #[serde(default, skip_serializing_if = "SheetView::is_default")]
    pub view: SheetView,

    #[serde(default, skip_serializing_if = "PageSetup::is_default")]
    pub page_setup: PageSetup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_margins: Option<PageMargins>,
    #[serde(default, skip_serializing_if = "PageBreaks::is_empty")]
    pub page_breaks: PageBreaks,
    #[serde(default, skip_serializing_if = "HeaderFooter::is_empty")]
    pub header_footer: HeaderFooter,

    /// Auto-filter range; round-trips through the `_xlnm._FilterDatabase`
    /// defined name and the worksheet `<autoFilter>` element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_filter: Option<Range>,
    /// Print area; round-trips through `_xlnm.Print_Area`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_area: Option<Range>,
    /// Rows repeated at the top of every printed page (0-indexed, inclusive);
    /// round-trips through `_xlnm.Print_Titles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_title_rows: Option<(u32, u32)>,
    /// Columns repeated at the left of every printed page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_title_cols: Option<(u32, u32)>,

    /// Raw drawing part carried through unmodified: `(part path, xml bytes)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing: Option<(String, Vec<u8>)>,
    /// Raw printer settings blob carried through unmodified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer_settings: Option<Vec<u8>>,
}

impl Worksheet {
    pub fn new(id: WorksheetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: SheetState::Visible,
            cells: BTreeMap::new(),
            row_properties: BTreeMap::new(),
            column_properties: BTreeMap::new(),
            merged_ranges: Vec::new(),
            view: SheetView::default(),
            page_setup: PageSetup::default(),
            page_margins: None,
            page_breaks: PageBreaks::default(),
            header_footer: HeaderFooter::default(),
            auto_filter: None,
            print_area: None,
            print_title_rows: None,
            print_title_cols: None,
            drawing: None,
            printer_settings: None,
        }
    }

    pub fn cell(&self, cell: CellRef) -> Option<&Cell> {
        self.cells.get(&CellKey::from_ref(cell))
    }

    pub fn cell_mut(&mut self, cell: CellRef) -> Option<&mut Cell> {
        self.cells.get_mut(&CellKey::from_ref(cell))
    }

    pub fn has_cell(&self, cell: CellRef) -> bool {
        self.cells.contains_key(&CellKey::from_ref(cell))
    }

    /// Insert or replace a cell. Truly empty cells are removed instead so the
    /// map stays sparse.
    pub fn set_cell(&mut self, cell_ref: CellRef, cell: Cell) {
        let key = CellKey::from_ref(cell_ref);
        if cell.is_truly_empty() {
            self.cells.remove(&key);
        } else {
            self.cells.insert(key, cell);
        }
    }

    /// Set a cell's value, keeping any other cell state.
    pub fn set_value(&mut self, cell_ref: CellRef, value: CellValue) {
        let key = CellKey::from_ref(cell_ref);
        match self.cells.get_mut(&key) {
            Some(cell) => {
                cell.value = value;
                if cell.is_truly_empty() {
                    self.cells.remove(&key);
                }
            }
            None => {
                let cell = Cell::new(value);
                if !cell.is_truly_empty() {
                    self.cells.insert(key, cell);
                }
            }
        }
    }

    /// Set or clear a cell's formula text.
    pub fn set_formula(&mut self, cell_ref: CellRef, formula: Option<String>) {
        let key = CellKey::from_ref(cell_ref);
        match self.cells.get_mut(&key) {
            Some(cell) => {
                cell.formula = formula;
                if cell.is_truly_empty() {
                    self.cells.remove(&key);
                }
            }
            None => {
                if let Some(formula) = formula {
                    let mut cell = Cell::default();
                    cell.formula = Some(formula);
                    self.cells.insert(key, cell);
                }
            }
        }
    }

    pub fn formula(&self, cell_ref: CellRef) -> Option<&str> {
        self.cell(cell_ref).and_then(|c| c.formula.as_deref())
    }

    pub fn clear_cell(&mut self, cell_ref: CellRef) {
        self.cells.remove(&CellKey::from_ref(cell_ref));
    }

    /// Row-major iteration over stored cells.
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells.iter().map(|(key, cell)| (key.to_ref(), cell))
    }

    pub fn iter_cells_mut(&mut self) -> impl Iterator<Item = (CellRef, &mut Cell)> {
        self.cells.iter_mut().map(|(key, cell)| (key.to_ref(), cell))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The smallest range containing every stored cell, if any.
    pub fn used_range(&self) -> Option<Range> {
        let mut iter = self.cells.keys();
        let first = iter.next()?;
        let mut min_row = first.row();
        let mut max_row = first.row();
        let mut min_col = first.col();
        let mut max_col = first.col();
        for key in iter {
            min_row = min_row.min(key.row());
            max_row = max_row.max(key.row());
            min_col = min_col.min(key.col());
            max_col = max_col.max(key.col());
        }
        Some(Range::new(
            CellRef::new(min_row, min_col),
            CellRef::new(max_row, max_col),
        ))
    }

    /// Merge a range of cells. Merged ranges must not overlap.
    pub fn merge_cells(&mut self, range: Range) -> Result<(), MergeError> {
        for existing in &self.merged_ranges {
            if existing.overlaps(&range) {
                return Err(MergeError::Overlap {
                    new: range,
                    existing: *existing,
                });
            }
        }
        self.merged_ranges.push(range);
        Ok(())
    }

    pub fn unmerge_cells(&mut self, range: Range) -> bool {
        let Some(idx) = self.merged_ranges.iter().position(|r| *r == range) else {
            return false;
        };
        self.merged_ranges.remove(idx);
        true
    }

    pub fn merged_ranges(&self) -> &[Range] {
        &self.merged_ranges
    }

    /// Returns true when `cell` lies inside a merged range without being its
    /// top-left anchor.
    pub fn is_merged_interior(&self, cell: CellRef) -> bool {
        self.merged_ranges
            .iter()
            .any(|r| r.contains(cell) && r.start != cell)
    }

    pub fn set_row_height(&mut self, row: u32, height: Option<f64>) {
        let props = self.row_properties.entry(row).or_default();
        props.height = height;
        props.custom_height = height.is_some();
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        self.row_properties.entry(row).or_default().hidden = hidden;
    }

    pub fn set_col_width(&mut self, col: u32, width: Option<f64>) {
        let props = self.column_properties.entry(col).or_default();
        props.width = width;
        props.custom_width = width.is_some();
    }

    pub fn set_col_hidden(&mut self, col: u32, hidden: bool) {
        self.column_properties.entry(col).or_default().hidden = hidden;
    }

    /// Freeze the first `rows` rows and `cols` columns.
    pub fn freeze_panes(&mut self, rows: u32, cols: u32) {
        if rows == 0 && cols == 0 {
            self.view.pane = None;
            return;
        }
        self.view.pane = Some(Pane {
            x_split: cols as f64,
            y_split: rows as f64,
            top_left_cell: Some(CellRef::new(rows, cols)),
            state: PaneState::Frozen,
            active_pane: None,
        });
    }
}

fn default_true() -> bool {
    true
}

fn is_true(b: &bool) -> bool {
    *b
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_cells_and_used_range() {
        let mut ws = Worksheet::new(1, "Sheet1");
        assert_eq!(ws.used_range(), None);

        ws.set_value(CellRef::new(1, 1), CellValue::Number(1.0));
        ws.set_value(CellRef::new(4, 3), CellValue::Number(2.0));
        assert_eq!(
            ws.used_range(),
            Some(Range::new(CellRef::new(1, 1), CellRef::new(4, 3)))
        );

        ws.set_value(CellRef::new(1, 1), CellValue::Empty);
        assert_eq!(ws.cell_count(), 1);
    }

    #[test]
    fn iteration_is_row_major() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.set_value(CellRef::new(1, 0), CellValue::Number(3.0));
        ws.set_value(CellRef::new(0, 1), CellValue::Number(2.0));
        ws.set_value(CellRef::new(0, 0), CellValue::Number(1.0));
        let refs: Vec<String> = ws.iter_cells().map(|(r, _)| r.to_a1()).collect();
        assert_eq!(refs, vec!["A1", "B1", "A2"]);
    }

    #[test]
    fn merged_ranges_must_not_overlap() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.merge_cells(Range::from_a1("A1:B2").unwrap()).unwrap();
        let err = ws.merge_cells(Range::from_a1("B2:C3").unwrap());
        assert!(matches!(err, Err(MergeError::Overlap { .. })));
        assert!(ws.merge_cells(Range::from_a1("D4:E5").unwrap()).is_ok());
    }

    #[test]
    fn merged_interior_detection() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.merge_cells(Range::from_a1("A1:B2").unwrap()).unwrap();
        assert!(!ws.is_merged_interior(CellRef::new(0, 0)));
        assert!(ws.is_merged_interior(CellRef::new(1, 1)));
        assert!(!ws.is_merged_interior(CellRef::new(5, 5)));
    }

    #[test]
    fn freeze_panes_sets_frozen_pane() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.freeze_panes(2, 1);
        let pane = ws.view.pane.as_ref().unwrap();
        assert_eq!(pane.state, PaneState::Frozen);
        assert_eq!(pane.top_left_cell, Some(CellRef::new(2, 1)));
    }
}
