use serde::{Deserialize, Serialize};

/// Workbook theme palette: the twelve color-scheme slots of `theme1.xml`
/// (dk1/lt1/dk2/lt2, accent1..6, hlink/folHlink) plus the scheme name.
///
/// Stored as raw `RRGGBB` hex strings so the part round-trips without color
/// interpretation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePalette {
    pub name: String,
    /// Slot order: dk1, lt1, dk2, lt2, accent1..accent6, hlink, folHlink.
    pub colors: [String; 12],
}

impl ThemePalette {
    /// The stock Office theme written for from-scratch workbooks.
    pub fn office() -> Self {
        Self {
            name: "Office".to_string(),
            colors: [
                "000000".to_string(),
                "FFFFFF".to_string(),
                "44546A".to_string(),
                "E7E6E6".to_string(),
                "4472C4".to_string(),
                "ED7D31".to_string(),
                "A5A5A5".to_string(),
                "FFC000".to_string(),
                "5B9BD5".to_string(),
                "70AD47".to_string(),
                "0563C1".to_string(),
                "954F72".to_string(),
            ],
        }
    }

    /// Color for a theme slot index, as used by `<color theme="N"/>`.
    pub fn color(&self, index: u32) -> Option<&str> {
        self.colors.get(index as usize).map(|s| s.as_str())
    }
}

impl Default for ThemePalette {
    fn default() -> Self {
        Self::office()
    }
}
