//! Announcement record data structure.

use serde::{Deserialize, Serialize};

/// Number of body characters used as identity when a record has no title.
pub const IDENTITY_BODY_CHARS: usize = 50;

/// How a record was produced by the extractor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A repeating listing item matched by a structural selector.
    #[default]
    Item,

    /// Whole-page text captured when no structural selector matched.
    GeneralContent,
}

impl RecordKind {
    pub fn is_item(&self) -> bool {
        matches!(self, RecordKind::Item)
    }
}

/// One announcement extracted from the listing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Heading or link text of the item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Target of the title element, when the title element is a link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Text excerpt of the whole item
    #[serde(default)]
    pub body: String,

    /// Extraction path that produced this record
    #[serde(default, skip_serializing_if = "RecordKind::is_item")]
    pub kind: RecordKind,
}

impl Record {
    /// Create a structured listing item.
    pub fn item(title: Option<String>, link: Option<String>, body: impl Into<String>) -> Self {
        Self {
            title,
            link,
            body: body.into(),
            kind: RecordKind::Item,
        }
    }

    /// Create a whole-page fallback record.
    pub fn general_content(body: impl Into<String>) -> Self {
        Self {
            title: None,
            link: None,
            body: body.into(),
            kind: RecordKind::GeneralContent,
        }
    }

    /// Title, if present and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether the record carries any text at all.
    pub fn has_text(&self) -> bool {
        self.title().is_some() || !self.body.is_empty()
    }

    /// Whether the record takes part in item-by-item diffing.
    pub fn is_diffable(&self) -> bool {
        self.kind.is_item()
    }

    /// Heuristic key used to match the same announcement across runs.
    ///
    /// The title when present, otherwise the first characters of the body.
    /// Not unique: paraphrased titles produce different keys and distinct
    /// items with the same title share one.
    pub fn identity_key(&self) -> String {
        match self.title() {
            Some(title) => title.to_string(),
            None => self.body.chars().take(IDENTITY_BODY_CHARS).collect(),
        }
    }
}
