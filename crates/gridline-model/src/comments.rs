use serde::{Deserialize, Serialize};

use crate::rich_text::RichText;

/// A legacy note comment attached to a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: RichText,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<RichText>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    pub fn plain_text(&self) -> &str {
        self.text.plain_text()
    }
}
