use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod catalog;
pub mod outcome;

pub use catalog::CatalogItem;
pub use outcome::{BookmarkState, ToggleFailure, ToggleOutcome};

/// Kind of catalog item a bookmark points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Movie,
    Tv,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Movie => "movie",
            ItemType::Tv => "tv",
        }
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(ItemType::Movie),
            "tv" => Ok(ItemType::Tv),
            other => Err(format!("unknown item type '{}'", other)),
        }
    }
}

/// Identity of a bookmark
///
/// Catalog endpoints hand out ids as JSON numbers while the bookmark endpoints echo them back as
/// strings, so the id is normalized to trimmed text before it takes part in any comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookmarkKey {
    item_id: String,
    item_type: ItemType,
}

impl BookmarkKey {
    pub fn new(item_id: impl Display, item_type: ItemType) -> Self {
        Self {
            item_id: item_id.to_string().trim().to_string(),
            item_type,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }
}

impl Display for BookmarkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.item_type, self.item_id)
    }
}

/// A bookmarked item with the display data needed to list it without a catalog lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkRecord {
    pub key: BookmarkKey,
    pub title: String,
    pub poster_path: Option<String>,
}

impl BookmarkRecord {
    pub fn new(key: BookmarkKey, title: impl Into<String>, poster_path: Option<String>) -> Self {
        Self {
            key,
            title: title.into(),
            poster_path,
        }
    }
}

// ============================================================================
// Bookmark API Types
// ============================================================================

/// An id as it appears on the wire: either a JSON number or a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(u64),
    Text(String),
}

impl Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireId::Number(id) => write!(f, "{}", id),
            WireId::Text(id) => write!(f, "{}", id.trim()),
        }
    }
}

fn deserialize_wire_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    WireId::deserialize(deserializer).map(|id| id.to_string())
}

/// Bookmark body exchanged with the remote store (`GET /bookmarks` items, `POST /bookmark` body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPayload {
    #[serde(deserialize_with = "deserialize_wire_id")]
    pub item_id: String,
    pub item_type: ItemType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl From<&BookmarkRecord> for BookmarkPayload {
    fn from(record: &BookmarkRecord) -> Self {
        Self {
            item_id: record.key.item_id().to_string(),
            item_type: record.key.item_type(),
            title: record.title.clone(),
            poster_path: record.poster_path.clone(),
        }
    }
}

impl TryFrom<BookmarkPayload> for BookmarkRecord {
    type Error = String;

    fn try_from(payload: BookmarkPayload) -> Result<Self, Self::Error> {
        let key = BookmarkKey::new(&payload.item_id, payload.item_type);
        if key.item_id().is_empty() {
            return Err(format!("bookmark '{}' has an empty item id", payload.title));
        }

        Ok(BookmarkRecord::new(key, payload.title, payload.poster_path))
    }
}

/// `{ message }` body the remote store answers every mutation with
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}
