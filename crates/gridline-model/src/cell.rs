use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::comments::Comment;
use crate::hyperlink::Hyperlink;
use crate::{CellRef, CellValue};

/// Maximum rows per worksheet (Excel limit profile: 1,048,576).
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum columns per worksheet (Excel limit profile: 16,384).
pub const MAX_COLS: u32 = 16_384;

const COL_BITS: u32 = 14; // 2^14 = 16,384 columns.
const COL_MASK: u64 = (1u64 << COL_BITS) - 1;

/// Compact key used for sparse cell storage.
///
/// The key packs `(row, col)` into a `u64` as `(row << 14) | col`, so the
/// natural `Ord` on keys is row-major order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(transparent)]
pub struct CellKey(u64);

impl CellKey {
    /// Encode a `(row, col)` coordinate into a compact [`CellKey`].
    #[inline]
    pub fn new(row: u32, col: u32) -> Self {
        assert!(row < MAX_ROWS, "row out of bounds: {row}");
        assert!(col < MAX_COLS, "col out of bounds: {col}");
        Self(((row as u64) << COL_BITS) | (col as u64))
    }

    /// Decode the row component (0-indexed).
    #[inline]
    pub const fn row(self) -> u32 {
        (self.0 >> COL_BITS) as u32
    }

    /// Decode the column component (0-indexed).
    #[inline]
    pub const fn col(self) -> u32 {
        (self.0 & COL_MASK) as u32
    }

    /// Convert to a [`CellRef`].
    #[inline]
    pub const fn to_ref(self) -> CellRef {
        CellRef::new(self.row(), self.col())
    }

    /// Create a key from a [`CellRef`].
    #[inline]
    pub fn from_ref(cell: CellRef) -> Self {
        Self::new(cell.row, cell.col)
    }
}

impl<'de> Deserialize<'de> for CellKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u64::deserialize(deserializer)?;
        let row = raw >> COL_BITS;
        let col = raw & COL_MASK;
        if row >= MAX_ROWS as u64 {
            return Err(D::Error::custom(format!("CellKey row out of bounds: {row}")));
        }
        if col >= MAX_COLS as u64 {
            return Err(D::Error::custom(format!("CellKey col out of bounds: {col}")));
        }
        Ok(CellKey(raw))
    }
}

impl From<CellRef> for CellKey {
    fn from(value: CellRef) -> Self {
        Self::from_ref(value)
    }
}

/// A single cell record.
///
/// Cells are stored sparsely: a cell with no value, no formula, no format
/// reference and no attachments is removed from the worksheet map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// The cell's stored value.
    #[serde(default)]
    pub value: CellValue,

    /// Formula text (without the leading `=`), if the cell contains one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    /// Index into the stylesheet's format records, when a format is applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<Hyperlink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,

    /// Whether phonetic guide text is shown for this cell.
    #[serde(default, skip_serializing_if = "is_false")]
    pub show_phonetics: bool,
}

impl Cell {
    /// Create a new cell with the given value.
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    /// Returns true if this cell has no observable content or formatting.
    /// Such cells should not be stored in the sparse map.
    pub fn is_truly_empty(&self) -> bool {
        self.value.is_empty()
            && self.formula.is_none()
            && self.format.is_none()
            && self.hyperlink.is_none()
            && self.comment.is_none()
            && !self.show_phonetics
    }

    /// Reset every field to its default. The streaming reader reuses one
    /// buffer cell across `<c>` elements through this.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_key_is_row_major() {
        let a1 = CellKey::new(0, 0);
        let b1 = CellKey::new(0, 1);
        let a2 = CellKey::new(1, 0);
        assert!(a1 < b1);
        assert!(b1 < a2);
        assert_eq!(a2.to_ref(), CellRef::new(1, 0));
    }

    #[test]
    fn truly_empty_detection() {
        assert!(Cell::default().is_truly_empty());
        assert!(!Cell::new(CellValue::Number(1.0)).is_truly_empty());
        let mut styled = Cell::default();
        styled.format = Some(3);
        assert!(!styled.is_truly_empty());
    }
}
