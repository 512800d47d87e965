use serde::{Deserialize, Serialize};

/// Page orientation for printing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// Paper sizes (subset of ST_PaperSize; the id round-trips regardless).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperSize(pub u32);

impl PaperSize {
    pub const LETTER: PaperSize = PaperSize(1);
    pub const A4: PaperSize = PaperSize(9);
}

impl Default for PaperSize {
    fn default() -> Self {
        PaperSize::LETTER
    }
}

/// `<pageSetup>` state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    #[serde(default)]
    pub orientation: PageOrientation,
    #[serde(default)]
    pub paper_size: PaperSize,
    /// Print scale percentage (100 = no scaling).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_to_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_to_height: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub horizontal_centered: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub vertical_centered: bool,
}

impl PageSetup {
    pub fn is_default(&self) -> bool {
        *self == PageSetup::default()
    }
}

/// `<pageMargins>` in inches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub header: f64,
    pub footer: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            left: 0.7,
            right: 0.7,
            top: 0.75,
            bottom: 0.75,
            header: 0.3,
            footer: 0.3,
        }
    }
}

impl PageMargins {
    pub fn is_default(&self) -> bool {
        *self == PageMargins::default()
    }
}

/// Manual page breaks, stored as the 0-indexed row/column before which the
/// break occurs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBreaks {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cols: Vec<u32>,
}

impl PageBreaks {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.cols.is_empty()
    }
}

/// One header or footer text, already split into its page sections. Each
/// section holds the raw escape-code text (`&P`, `&B`, ...); the codec
/// converts to and from rich text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFooterSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
}

impl HeaderFooterSection {
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.center.is_none() && self.right.is_none()
    }
}

/// `<headerFooter>` state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFooter {
    #[serde(default, skip_serializing_if = "HeaderFooterSection::is_empty")]
    pub odd_header: HeaderFooterSection,
    #[serde(default, skip_serializing_if = "HeaderFooterSection::is_empty")]
    pub odd_footer: HeaderFooterSection,
    #[serde(default, skip_serializing_if = "HeaderFooterSection::is_empty")]
    pub even_header: HeaderFooterSection,
    #[serde(default, skip_serializing_if = "HeaderFooterSection::is_empty")]
    pub even_footer: HeaderFooterSection,
    #[serde(default, skip_serializing_if = "HeaderFooterSection::is_empty")]
    pub first_header: HeaderFooterSection,
    #[serde(default, skip_serializing_if = "HeaderFooterSection::is_empty")]
    pub first_footer: HeaderFooterSection,
    #[serde(default, skip_serializing_if = "is_false")]
    pub different_odd_even: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub different_first: bool,
}

impl HeaderFooter {
    pub fn is_empty(&self) -> bool {
        self.odd_header.is_empty()
            && self.odd_footer.is_empty()
            && self.even_header.is_empty()
            && self.even_footer.is_empty()
            && self.first_header.is_empty()
            && self.first_footer.is_empty()
            && !self.different_odd_even
            && !self.different_first
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}
