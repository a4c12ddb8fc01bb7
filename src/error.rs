use crate::models::BookmarkKey;

/// Message the remote store answers a create with when the bookmark already exists
pub const ALREADY_BOOKMARKED: &str = "Already bookmarked";

/// Message the remote store answers a delete with when there is nothing to delete
pub const BOOKMARK_NOT_FOUND: &str = "Bookmark not found";

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Remote store error: {0}")]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure of the remote bookmark store, classified from the response
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    AlreadyBookmarked(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Remote store returned status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Remote call timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Classifies a non-success response by its `{ message }` body, then by status
    pub fn from_response(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match message.as_str() {
            ALREADY_BOOKMARKED => StoreError::AlreadyBookmarked(message),
            BOOKMARK_NOT_FOUND => StoreError::NotFound(message),
            _ if status == 401 || status == 403 => StoreError::Unauthorized(message),
            _ => StoreError::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            StoreError::Timeout
        } else if error.is_decode() {
            StoreError::Malformed(error.to_string())
        } else {
            StoreError::Transport(error.to_string())
        }
    }
}

/// Failure to populate the registry at session start
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Duplicate bookmark {0} in initial data")]
    DuplicateKey(BookmarkKey),

    #[error("Malformed bookmark data: {0}")]
    Malformed(String),

    #[error("Failed to fetch bookmarks: {0}")]
    Remote(StoreError),

    #[error("Session ended before bookmarks were loaded")]
    SessionEnded,
}

impl From<StoreError> for LoadError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Malformed(message) => LoadError::Malformed(message),
            other => LoadError::Remote(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_messages_win_over_status() {
        assert_eq!(
            StoreError::from_response(400, "Already bookmarked"),
            StoreError::AlreadyBookmarked("Already bookmarked".to_string())
        );
        assert_eq!(
            StoreError::from_response(404, "Bookmark not found"),
            StoreError::NotFound("Bookmark not found".to_string())
        );
    }

    #[test]
    fn test_auth_and_generic_failures() {
        assert!(matches!(
            StoreError::from_response(401, "jwt expired"),
            StoreError::Unauthorized(_)
        ));
        assert_eq!(
            StoreError::from_response(500, "boom"),
            StoreError::Rejected {
                status: 500,
                message: "boom".to_string()
            }
        );
        // Near-miss spellings are not treated as reconciled
        assert!(matches!(
            StoreError::from_response(409, "already bookmarked"),
            StoreError::Rejected { status: 409, .. }
        ));
    }

    #[test]
    fn test_malformed_store_error_becomes_malformed_load_error() {
        assert_eq!(
            LoadError::from(StoreError::Malformed("bad".to_string())),
            LoadError::Malformed("bad".to_string())
        );
        assert_eq!(
            LoadError::from(StoreError::Timeout),
            LoadError::Remote(StoreError::Timeout)
        );
    }
}
