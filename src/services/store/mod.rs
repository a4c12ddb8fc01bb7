/// Remote bookmark store abstraction
///
/// The server holds the authoritative bookmark set of the signed-in user. The engine only ever
/// talks to it through this trait, so tests can swap the HTTP implementation for a mock.
use crate::{
    error::StoreError,
    models::{BookmarkKey, BookmarkRecord},
};

pub mod http;

pub use http::HttpBookmarkStore;

/// Trait for remote bookmark stores
///
/// Mutations resolve with the server's `message` on success. Failures are classified into
/// [`StoreError`] variants so callers never inspect raw responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteBookmarkStore: Send + Sync {
    /// Fetch every bookmark of the current user
    async fn list(&self) -> Result<Vec<BookmarkRecord>, StoreError>;

    /// Create a bookmark
    async fn create(&self, record: &BookmarkRecord) -> Result<String, StoreError>;

    /// Delete the bookmark for `key`
    async fn delete(&self, key: &BookmarkKey) -> Result<String, StoreError>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}
