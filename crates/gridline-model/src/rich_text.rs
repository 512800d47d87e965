use serde::{Deserialize, Serialize};

use crate::style::{Color, UnderlineStyle};

/// Rich (multi-style) text.
///
/// `text` holds the full visible string; `runs` carries per-range font
/// overrides. Offsets in runs are `char` indices into `text`, not byte
/// offsets.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RichText {
    pub text: String,
    pub runs: Vec<RichTextRun>,
    /// Phonetic guide ("ruby") runs attached to the string.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phonetic_runs: Vec<PhoneticRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_properties: Option<PhoneticProperties>,
}

impl RichText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            runs: Vec::new(),
            phonetic_runs: Vec::new(),
            phonetic_properties: None,
        }
    }

    pub fn plain_text(&self) -> &str {
        &self.text
    }

    /// Returns true when the text carries no run styling and no phonetics, so
    /// it can be written as a bare `<t>` element.
    pub fn is_plain(&self) -> bool {
        self.runs.iter().all(|r| r.font.is_none())
            && self.phonetic_runs.is_empty()
            && self.phonetic_properties.is_none()
    }

    /// Build rich text from `(text, font override)` segments.
    pub fn from_segments(segments: impl IntoIterator<Item = (String, Option<RunFont>)>) -> Self {
        let mut text = String::new();
        let mut runs = Vec::new();
        let mut cursor = 0usize;

        for (segment_text, font) in segments {
            let start = cursor;
            cursor += segment_text.chars().count();
            let end = cursor;
            text.push_str(&segment_text);
            runs.push(RichTextRun { start, end, font });
        }

        Self {
            text,
            runs,
            phonetic_runs: Vec::new(),
            phonetic_properties: None,
        }
    }

    /// The `(text, font)` segments of this string, synthesizing a single
    /// unstyled segment for plain text.
    pub fn segments(&self) -> Vec<(String, Option<RunFont>)> {
        if self.runs.is_empty() {
            if self.text.is_empty() {
                return Vec::new();
            }
            return vec![(self.text.clone(), None)];
        }
        self.runs
            .iter()
            .map(|run| (slice_by_char_range(&self.text, run.start, run.end).to_string(), run.font.clone()))
            .collect()
    }
}

impl PartialEq for RichText {
    fn eq(&self, other: &Self) -> bool {
        // Equality is based on the visible text, its style runs and phonetics.
        self.text == other.text
            && self.runs == other.runs
            && self.phonetic_runs == other.phonetic_runs
    }
}

impl From<&str> for RichText {
    fn from(value: &str) -> Self {
        RichText::new(value)
    }
}

impl From<String> for RichText {
    fn from(value: String) -> Self {
        RichText::new(value)
    }
}

/// One styled run within a [`RichText`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextRun {
    pub start: usize,
    pub end: usize,
    /// Per-run font override; `None` inherits the cell font.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<RunFont>,
}

/// Font override carried by a rich text run (`<rPr>`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFont {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Size in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<UnderlineStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl RunFont {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.size.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.strikethrough.is_none()
            && self.color.is_none()
    }
}

/// A phonetic guide run (`<rPh>`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneticRun {
    /// First base-text character the run annotates.
    pub start: u32,
    /// One past the last base-text character the run annotates.
    pub end: u32,
    pub text: String,
}

/// Phonetic display properties (`<phoneticPr>`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneticProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_type: Option<String>,
}

fn slice_by_char_range(text: &str, start: usize, end: usize) -> &str {
    if start == end {
        return "";
    }

    let mut start_byte = None;
    let mut end_byte = None;

    for (i, (byte_idx, _ch)) in text.char_indices().enumerate() {
        if i == start {
            start_byte = Some(byte_idx);
        }
        if i == end {
            end_byte = Some(byte_idx);
            break;
        }
    }

    let start_byte = start_byte.unwrap_or(text.len());
    let end_byte = end_byte.unwrap_or(text.len());

    &text[start_byte..end_byte]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_segments_builds_runs_with_char_indices() {
        let rt = RichText::from_segments(vec![
            ("Hi ".to_string(), None),
            (
                "世界".to_string(),
                Some(RunFont {
                    bold: Some(true),
                    ..Default::default()
                }),
            ),
        ]);

        assert_eq!(rt.text, "Hi 世界");
        assert_eq!(rt.runs.len(), 2);
        assert_eq!(rt.runs[0].start, 0);
        assert_eq!(rt.runs[0].end, 3);
        assert_eq!(rt.runs[1].start, 3);
        assert_eq!(rt.runs[1].end, 5);
        assert!(!rt.is_plain());
    }

    #[test]
    fn segments_roundtrip() {
        let rt = RichText::from_segments(vec![
            ("a".to_string(), None),
            (
                "b".to_string(),
                Some(RunFont {
                    italic: Some(true),
                    ..Default::default()
                }),
            ),
        ]);
        let rebuilt = RichText::from_segments(rt.segments());
        assert_eq!(rt, rebuilt);
    }

    #[test]
    fn plain_text_is_plain() {
        assert!(RichText::new("hello").is_plain());
    }
}
