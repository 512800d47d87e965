use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::rich_text::RichText;

/// The workbook's shared string table: an ordered sequence of rich-text
/// values referenced by zero-based index from shared-string cells.
///
/// Indices are assigned at first insertion and never renumbered within one
/// write pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SharedStrings {
    items: Vec<RichText>,
    /// Intern index keyed by plain text. Rich entries that share a plain text
    /// fall back to a linear scan; plain strings are the common case.
    #[serde(skip)]
    by_text: HashMap<String, Vec<u32>>,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&RichText> {
        self.items.get(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RichText> {
        self.items.iter()
    }

    /// Intern a value, returning its stable index. Writing the same string
    /// into N cells yields one entry referenced N times.
    pub fn intern(&mut self, value: RichText) -> u32 {
        if let Some(candidates) = self.by_text.get(&value.text) {
            for &idx in candidates {
                if self.items[idx as usize] == value {
                    return idx;
                }
            }
        }
        let idx = self.items.len() as u32;
        self.by_text
            .entry(value.text.clone())
            .or_default()
            .push(idx);
        self.items.push(value);
        idx
    }

    /// Append an entry without dedup. The reader uses this so file order and
    /// indices survive verbatim.
    pub fn push_raw(&mut self, value: RichText) -> u32 {
        let idx = self.items.len() as u32;
        self.by_text
            .entry(value.text.clone())
            .or_default()
            .push(idx);
        self.items.push(value);
        idx
    }
}

impl<'de> Deserialize<'de> for SharedStrings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = Vec::<RichText>::deserialize(deserializer)?;
        let mut table = SharedStrings::default();
        for item in items {
            table.push_raw(item);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let mut table = SharedStrings::new();
        let a = table.intern(RichText::new("hello"));
        let b = table.intern(RichText::new("world"));
        let c = table.intern(RichText::new("hello"));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rich_and_plain_with_same_text_are_distinct() {
        use crate::rich_text::RunFont;

        let mut table = SharedStrings::new();
        let plain = table.intern(RichText::new("x"));
        let rich = table.intern(RichText::from_segments(vec![(
            "x".to_string(),
            Some(RunFont {
                bold: Some(true),
                ..Default::default()
            }),
        )]));
        assert_ne!(plain, rich);
        assert_eq!(table.len(), 2);
    }
}
