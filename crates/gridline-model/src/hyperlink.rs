use serde::{Deserialize, Serialize};

/// A cell hyperlink: either an external URL (carried through a worksheet
/// relationship on disk) or an internal location within the workbook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HyperlinkTarget {
    /// External URI, e.g. `https://example.com`.
    External(String),
    /// Internal reference, e.g. `Sheet2!A1`.
    Internal(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperlink {
    pub target: HyperlinkTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl Hyperlink {
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            target: HyperlinkTarget::External(url.into()),
            display: None,
            tooltip: None,
        }
    }

    pub fn internal(location: impl Into<String>) -> Self {
        Self {
            target: HyperlinkTarget::Internal(location.into()),
            display: None,
            tooltip: None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.target {
            HyperlinkTarget::External(url) => Some(url),
            HyperlinkTarget::Internal(_) => None,
        }
    }
}
