use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{BookmarkKey, BookmarkRecord, ItemType, WireId},
};

/// A movie or TV show as the catalog endpoints return it
///
/// Movie payloads carry `title`, TV payloads carry `name`; both may be present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(default)]
    pub tmdb_id: Option<WireId>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl CatalogItem {
    /// Creates a catalog item with a text id and title
    pub fn new(tmdb_id: impl Into<String>, item_type: ItemType, title: impl Into<String>) -> Self {
        Self {
            tmdb_id: Some(WireId::Text(tmdb_id.into())),
            item_type,
            title: Some(title.into()),
            name: None,
            poster_path: None,
        }
    }

    pub fn with_poster(mut self, poster_path: impl Into<String>) -> Self {
        self.poster_path = Some(poster_path.into());
        self
    }

    /// Display title, falling back to `name` for TV payloads
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    /// Bookmark identity of this item
    ///
    /// An item without an id cannot be bookmarked; asking for its key is a caller bug.
    pub fn key(&self) -> AppResult<BookmarkKey> {
        let key = self
            .tmdb_id
            .as_ref()
            .map(|id| BookmarkKey::new(id, self.item_type))
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "catalog item '{}' has no id",
                    self.display_title()
                ))
            })?;

        if key.item_id().is_empty() {
            return Err(AppError::InvalidInput(format!(
                "catalog item '{}' has a blank id",
                self.display_title()
            )));
        }

        Ok(key)
    }

    /// Record stored in the registry when this item gets bookmarked
    pub fn to_record(&self) -> AppResult<BookmarkRecord> {
        Ok(BookmarkRecord::new(
            self.key()?,
            self.display_title(),
            self.poster_path.clone(),
        ))
    }
}
