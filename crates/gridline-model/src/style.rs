use core::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A cell color: explicit ARGB, a theme palette slot, an indexed palette
/// entry, or automatic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Color {
    Rgb(Argb),
    Theme { index: u32, tint_1000: Option<i32> },
    Indexed(u32),
    Auto,
}

impl Color {
    pub const fn rgb(argb: u32) -> Self {
        Color::Rgb(Argb(argb))
    }

    pub const fn black() -> Self {
        Color::Rgb(Argb(0xFF000000))
    }
}

/// An ARGB color value, serialized as an `AARRGGBB` hex string.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Argb(pub u32);

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl Serialize for Argb {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Argb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.trim();
        if s.len() != 8 {
            return Err(D::Error::custom("color must be 8 hex digits (AARRGGBB)"));
        }
        let argb = u32::from_str_radix(s, 16).map_err(|_| D::Error::custom("invalid hex"))?;
        Ok(Argb(argb))
    }
}

/// Underline styles an OOXML font can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderlineStyle {
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

impl UnderlineStyle {
    pub fn from_ooxml(val: Option<&str>) -> Option<Self> {
        match val {
            None | Some("single") => Some(UnderlineStyle::Single),
            Some("double") => Some(UnderlineStyle::Double),
            Some("singleAccounting") => Some(UnderlineStyle::SingleAccounting),
            Some("doubleAccounting") => Some(UnderlineStyle::DoubleAccounting),
            Some("none") => Some(UnderlineStyle::None),
            _ => None,
        }
    }

    pub fn to_ooxml(self) -> Option<&'static str> {
        match self {
            UnderlineStyle::Single => None,
            UnderlineStyle::Double => Some("double"),
            UnderlineStyle::SingleAccounting => Some("singleAccounting"),
            UnderlineStyle::DoubleAccounting => Some("doubleAccounting"),
            UnderlineStyle::None => Some("none"),
        }
    }
}

/// Font attribute record (one entry in the stylesheet's font vector).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub name: String,
    /// Size in points.
    pub size: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<UnderlineStyle>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Calibri".to_string(),
            size: 11.0,
            bold: false,
            italic: false,
            underline: None,
            strikethrough: false,
            color: Some(Color::Theme {
                index: 1,
                tint_1000: None,
            }),
            family: Some(2),
            charset: None,
            scheme: Some("minor".to_string()),
        }
    }
}

/// Pattern fill types from ST_PatternType.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternFillType {
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

impl PatternFillType {
    pub fn from_ooxml(s: &str) -> Option<Self> {
        Some(match s {
            "none" => Self::None,
            "solid" => Self::Solid,
            "mediumGray" => Self::MediumGray,
            "darkGray" => Self::DarkGray,
            "lightGray" => Self::LightGray,
            "darkHorizontal" => Self::DarkHorizontal,
            "darkVertical" => Self::DarkVertical,
            "darkDown" => Self::DarkDown,
            "darkUp" => Self::DarkUp,
            "darkGrid" => Self::DarkGrid,
            "darkTrellis" => Self::DarkTrellis,
            "lightHorizontal" => Self::LightHorizontal,
            "lightVertical" => Self::LightVertical,
            "lightDown" => Self::LightDown,
            "lightUp" => Self::LightUp,
            "lightGrid" => Self::LightGrid,
            "lightTrellis" => Self::LightTrellis,
            "gray125" => Self::Gray125,
            "gray0625" => Self::Gray0625,
            _ => return None,
        })
    }

    pub fn to_ooxml(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Solid => "solid",
            Self::MediumGray => "mediumGray",
            Self::DarkGray => "darkGray",
            Self::LightGray => "lightGray",
            Self::DarkHorizontal => "darkHorizontal",
            Self::DarkVertical => "darkVertical",
            Self::DarkDown => "darkDown",
            Self::DarkUp => "darkUp",
            Self::DarkGrid => "darkGrid",
            Self::DarkTrellis => "darkTrellis",
            Self::LightHorizontal => "lightHorizontal",
            Self::LightVertical => "lightVertical",
            Self::LightDown => "lightDown",
            Self::LightUp => "lightUp",
            Self::LightGrid => "lightGrid",
            Self::LightTrellis => "lightTrellis",
            Self::Gray125 => "gray125",
            Self::Gray0625 => "gray0625",
        }
    }
}

/// A `<patternFill>` record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternFill {
    pub pattern: PatternFillType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
}

impl PatternFill {
    pub fn none() -> Self {
        Self {
            pattern: PatternFillType::None,
            foreground: None,
            background: None,
        }
    }

    pub fn solid(color: Color) -> Self {
        Self {
            pattern: PatternFillType::Solid,
            foreground: Some(color),
            background: None,
        }
    }
}

/// A `<gradientFill>` record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GradientFill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<f64>,
    /// `(position, color)` stops in document order.
    pub stops: Vec<(f64, Color)>,
}

/// Fill attribute record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Fill {
    Pattern(PatternFill),
    Gradient(GradientFill),
}

impl Default for Fill {
    fn default() -> Self {
        Fill::Pattern(PatternFill::none())
    }
}

/// Border line styles from ST_BorderStyle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BorderStyle {
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderStyle {
    pub fn from_ooxml(s: &str) -> Option<Self> {
        Some(match s {
            "thin" => Self::Thin,
            "medium" => Self::Medium,
            "thick" => Self::Thick,
            "dashed" => Self::Dashed,
            "dotted" => Self::Dotted,
            "double" => Self::Double,
            "hair" => Self::Hair,
            "mediumDashed" => Self::MediumDashed,
            "dashDot" => Self::DashDot,
            "mediumDashDot" => Self::MediumDashDot,
            "dashDotDot" => Self::DashDotDot,
            "mediumDashDotDot" => Self::MediumDashDotDot,
            "slantDashDot" => Self::SlantDashDot,
            _ => return None,
        })
    }

    pub fn to_ooxml(self) -> &'static str {
        match self {
            Self::Thin => "thin",
            Self::Medium => "medium",
            Self::Thick => "thick",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::Double => "double",
            Self::Hair => "hair",
            Self::MediumDashed => "mediumDashed",
            Self::DashDot => "dashDot",
            Self::MediumDashDot => "mediumDashDot",
            Self::DashDotDot => "dashDotDot",
            Self::MediumDashDotDot => "mediumDashDotDot",
            Self::SlantDashDot => "slantDashDot",
        }
    }
}

/// One side of a border.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BorderSide {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<BorderStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl BorderSide {
    pub fn is_empty(&self) -> bool {
        self.style.is_none() && self.color.is_none()
    }
}

/// Border attribute record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Border {
    #[serde(default)]
    pub left: BorderSide,
    #[serde(default)]
    pub right: BorderSide,
    #[serde(default)]
    pub top: BorderSide,
    #[serde(default)]
    pub bottom: BorderSide,
    #[serde(default)]
    pub diagonal: BorderSide,
    #[serde(default, skip_serializing_if = "is_false")]
    pub diagonal_up: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub diagonal_down: bool,
}

/// Number format record. Custom formats carry ids >= 164; builtin ids map to
/// well-known format codes that are usually not written out.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumberFormat {
    pub id: u32,
    pub format_code: String,
}

/// First id available for custom number formats.
pub const CUSTOM_NUMBER_FORMAT_BASE: u32 = 164;

impl NumberFormat {
    pub fn new(id: u32, format_code: impl Into<String>) -> Self {
        Self {
            id,
            format_code: format_code.into(),
        }
    }

    /// The format code of a builtin number format id, when defined.
    pub fn builtin_format_code(id: u32) -> Option<&'static str> {
        Some(match id {
            0 => "General",
            1 => "0",
            2 => "0.00",
            3 => "#,##0",
            4 => "#,##0.00",
            9 => "0%",
            10 => "0.00%",
            11 => "0.00E+00",
            12 => "# ?/?",
            13 => "# ??/??",
            14 => "mm-dd-yy",
            15 => "d-mmm-yy",
            16 => "d-mmm",
            17 => "mmm-yy",
            18 => "h:mm AM/PM",
            19 => "h:mm:ss AM/PM",
            20 => "h:mm",
            21 => "h:mm:ss",
            22 => "m/d/yy h:mm",
            37 => "#,##0 ;(#,##0)",
            38 => "#,##0 ;[Red](#,##0)",
            39 => "#,##0.00;(#,##0.00)",
            40 => "#,##0.00;[Red](#,##0.00)",
            45 => "mm:ss",
            46 => "[h]:mm:ss",
            47 => "mmss.0",
            48 => "##0.0E+0",
            49 => "@",
            _ => return None,
        })
    }

    /// Returns true when a format id/code means the formatted value is a date
    /// or time. Date-ness is inferred here because OOXML has no date cell
    /// type; a numeric cell whose format is a date format holds a date.
    pub fn is_date_format(&self) -> bool {
        if matches!(self.id, 14..=22 | 45..=47) {
            return true;
        }
        is_date_format_code(&self.format_code)
    }
}

/// Heuristic date detection for custom format codes: a date format contains a
/// day/month/year/hour/second token outside quoted literals and color tags.
pub fn is_date_format_code(code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut prev_escape = false;
    for ch in code.chars() {
        if prev_escape {
            prev_escape = false;
            continue;
        }
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' => prev_escape = true,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' | 'm' | 'M' if !in_quotes && !in_brackets => {
                return true
            }
            _ => {}
        }
    }
    false
}

/// Horizontal alignment options.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HorizontalAlignment {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

impl HorizontalAlignment {
    pub fn from_ooxml(s: &str) -> Option<Self> {
        Some(match s {
            "general" => Self::General,
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            "fill" => Self::Fill,
            "justify" => Self::Justify,
            "centerContinuous" => Self::CenterContinuous,
            "distributed" => Self::Distributed,
            _ => return None,
        })
    }

    pub fn to_ooxml(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Fill => "fill",
            Self::Justify => "justify",
            Self::CenterContinuous => "centerContinuous",
            Self::Distributed => "distributed",
        }
    }
}

/// Vertical alignment options.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlignment {
    pub fn from_ooxml(s: &str) -> Option<Self> {
        Some(match s {
            "top" => Self::Top,
            "center" => Self::Center,
            "bottom" => Self::Bottom,
            "justify" => Self::Justify,
            "distributed" => Self::Distributed,
            _ => return None,
        })
    }

    pub fn to_ooxml(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
            Self::Justify => "justify",
            Self::Distributed => "distributed",
        }
    }
}

/// Alignment sub-record of a format.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<HorizontalAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalAlignment>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrap_text: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub shrink_to_fit: bool,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub indent: u32,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub rotation: i32,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        *self == Alignment::default()
    }
}

/// Protection sub-record of a format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

impl Protection {
    pub fn is_default(&self) -> bool {
        *self == Protection::default()
    }
}

/// One format record (`<xf>` in `cellXfs`): optional indices into the four
/// attribute vectors, an alignment and protection sub-record, and an
/// "applied" flag per attribute distinguishing "inherit" from "explicitly set
/// to the default".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Format {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_id: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub apply_number_format: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub apply_font: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub apply_fill: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub apply_border: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub apply_alignment: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub apply_protection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<Protection>,
    /// Position of the named style (`xfId`) this format descends from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<u32>,
}

/// A named cell style: a display name plus its own format record
/// (`cellStyleXfs` entry), e.g. "Normal".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedStyle {
    pub name: String,
    pub format: Format,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin_id: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

/// A differential format record (`<dxf>`), used by conditional formatting.
/// Unlike `Format` it has no xf indirection: the overridden attributes are
/// stored inline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatDiff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
}

/// The workbook stylesheet: four independent attribute vectors plus the
/// format and named-style indirection levels.
///
/// Vector order is meaning: a record's position is its referenced index.
/// Loaded vectors are reused positionally on re-save, never re-sorted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stylesheet {
    pub number_formats: Vec<NumberFormat>,
    pub fonts: Vec<Font>,
    pub fills: Vec<Fill>,
    pub borders: Vec<Border>,
    /// Format records (`cellXfs`); cell format references index this vector.
    pub formats: Vec<Format>,
    /// Named styles (`cellStyleXfs` + `cellStyles`).
    pub styles: Vec<NamedStyle>,
    /// Differential formats (`dxfs`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub format_diffs: Vec<FormatDiff>,
}

impl Default for Stylesheet {
    fn default() -> Self {
        // The baseline stylesheet every from-scratch workbook carries: one
        // default font, the required none + gray125 fills, one empty border,
        // the "Normal" style, and one default format record.
        Self {
            number_formats: Vec::new(),
            fonts: vec![Font::default()],
            fills: vec![
                Fill::Pattern(PatternFill::none()),
                Fill::Pattern(PatternFill {
                    pattern: PatternFillType::Gray125,
                    foreground: None,
                    background: None,
                }),
            ],
            borders: vec![Border::default()],
            formats: vec![Format {
                number_format_id: Some(0),
                font_id: Some(0),
                fill_id: Some(0),
                border_id: Some(0),
                style_id: Some(0),
                ..Format::default()
            }],
            styles: vec![NamedStyle {
                name: "Normal".to_string(),
                format: Format {
                    number_format_id: Some(0),
                    font_id: Some(0),
                    fill_id: Some(0),
                    border_id: Some(0),
                    ..Format::default()
                },
                builtin_id: Some(0),
                hidden: false,
            }],
            format_diffs: Vec::new(),
        }
    }
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a font, reusing an existing identical record.
    pub fn intern_font(&mut self, font: Font) -> u32 {
        intern_by_eq(&mut self.fonts, font)
    }

    pub fn intern_fill(&mut self, fill: Fill) -> u32 {
        intern_by_eq(&mut self.fills, fill)
    }

    pub fn intern_border(&mut self, border: Border) -> u32 {
        intern_by_eq(&mut self.borders, border)
    }

    /// Intern a number format by code, allocating a custom id when new.
    pub fn intern_number_format(&mut self, format_code: &str) -> u32 {
        if let Some(existing) = self
            .number_formats
            .iter()
            .find(|nf| nf.format_code == format_code)
        {
            return existing.id;
        }
        let next_id = self
            .number_formats
            .iter()
            .map(|nf| nf.id + 1)
            .max()
            .unwrap_or(CUSTOM_NUMBER_FORMAT_BASE)
            .max(CUSTOM_NUMBER_FORMAT_BASE);
        self.number_formats
            .push(NumberFormat::new(next_id, format_code));
        next_id
    }

    /// Intern a complete format record.
    ///
    /// Two cells given identical formatting resolve to the same index; any
    /// differing attribute yields a different index.
    pub fn intern_format(&mut self, format: Format) -> u32 {
        if let Some(idx) = self.formats.iter().position(|f| *f == format) {
            return idx as u32;
        }
        self.formats.push(format);
        (self.formats.len() - 1) as u32
    }

    pub fn format(&self, index: u32) -> Option<&Format> {
        self.formats.get(index as usize)
    }

    /// Look up a number format record by id, falling back to builtin codes.
    pub fn number_format_code(&self, id: u32) -> Option<String> {
        if let Some(nf) = self.number_formats.iter().find(|nf| nf.id == id) {
            return Some(nf.format_code.clone());
        }
        NumberFormat::builtin_format_code(id).map(|s| s.to_string())
    }

    /// Returns true when the format at `index` renders its numeric value as a
    /// date or time.
    pub fn format_is_date(&self, index: u32) -> bool {
        let Some(format) = self.format(index) else {
            return false;
        };
        let Some(id) = format.number_format_id else {
            return false;
        };
        if let Some(nf) = self.number_formats.iter().find(|nf| nf.id == id) {
            return nf.is_date_format();
        }
        matches!(id, 14..=22 | 45..=47)
    }
}

fn intern_by_eq<T: PartialEq>(vec: &mut Vec<T>, value: T) -> u32 {
    if let Some(idx) = vec.iter().position(|v| *v == value) {
        return idx as u32;
    }
    vec.push(value);
    (vec.len() - 1) as u32
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_interning_is_stable() {
        let mut sheet = Stylesheet::new();
        let bold = sheet.intern_font(Font {
            bold: true,
            ..Font::default()
        });
        let f1 = sheet.intern_format(Format {
            font_id: Some(bold),
            apply_font: true,
            ..Format::default()
        });
        let f2 = sheet.intern_format(Format {
            font_id: Some(bold),
            apply_font: true,
            ..Format::default()
        });
        assert_eq!(f1, f2);

        let f3 = sheet.intern_format(Format {
            font_id: Some(bold),
            apply_font: true,
            apply_fill: true,
            fill_id: Some(1),
            ..Format::default()
        });
        assert_ne!(f1, f3);
    }

    #[test]
    fn default_stylesheet_shape() {
        let sheet = Stylesheet::new();
        assert_eq!(sheet.fonts.len(), 1);
        assert_eq!(sheet.fills.len(), 2);
        assert_eq!(sheet.borders.len(), 1);
        assert_eq!(sheet.formats.len(), 1);
        assert_eq!(sheet.styles.len(), 1);
        assert_eq!(sheet.styles[0].name, "Normal");
    }

    #[test]
    fn date_format_detection() {
        let mut sheet = Stylesheet::new();
        let id = sheet.intern_number_format("yyyy-mm-dd");
        let fmt = sheet.intern_format(Format {
            number_format_id: Some(id),
            apply_number_format: true,
            ..Format::default()
        });
        assert!(sheet.format_is_date(fmt));

        let plain = sheet.intern_number_format("0.00");
        let fmt2 = sheet.intern_format(Format {
            number_format_id: Some(plain),
            apply_number_format: true,
            ..Format::default()
        });
        assert!(!sheet.format_is_date(fmt2));
    }

    #[test]
    fn builtin_date_ids_are_dates() {
        let mut sheet = Stylesheet::new();
        let fmt = sheet.intern_format(Format {
            number_format_id: Some(14),
            apply_number_format: true,
            ..Format::default()
        });
        assert!(sheet.format_is_date(fmt));
    }

    #[test]
    fn quoted_literals_do_not_trigger_date_detection() {
        assert!(!is_date_format_code("0.00\"m\""));
        assert!(is_date_format_code("yyyy"));
        assert!(!is_date_format_code("[Red]0.00"));
    }
}
