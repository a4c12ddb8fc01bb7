use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Whether a key is bookmarked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkState {
    Present,
    Absent,
}

impl BookmarkState {
    pub fn from_present(present: bool) -> Self {
        if present {
            BookmarkState::Present
        } else {
            BookmarkState::Absent
        }
    }

    pub fn flip(&self) -> Self {
        match self {
            BookmarkState::Present => BookmarkState::Absent,
            BookmarkState::Absent => BookmarkState::Present,
        }
    }
}

/// Why a toggle was rolled back
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToggleFailure {
    /// Network, timeout or server error; clicking again retries
    Transient { message: String },
    /// Missing or expired credentials; the caller should re-authenticate
    Auth { message: String },
}

impl ToggleFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToggleFailure::Transient { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ToggleFailure::Transient { message } | ToggleFailure::Auth { message } => message,
        }
    }
}

impl Display for ToggleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToggleFailure::Transient { message } => write!(f, "transient failure: {}", message),
            ToggleFailure::Auth { message } => write!(f, "authentication failure: {}", message),
        }
    }
}

/// Resolution of a single toggle request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// The remote store accepted the change; the optimistic state stands
    Confirmed {
        state: BookmarkState,
        message: Option<String>,
    },
    /// The remote store already held the requested state; nothing was reverted
    AlreadyReconciled {
        state: BookmarkState,
        message: String,
    },
    /// The remote call failed and the registry was rolled back to `state`
    Reverted {
        state: BookmarkState,
        failure: ToggleFailure,
    },
    /// The session ended before the toggle resolved
    Discarded,
}

impl ToggleOutcome {
    /// Bookmark state the registry holds for the key once this outcome was produced
    pub fn state(&self) -> Option<BookmarkState> {
        match self {
            ToggleOutcome::Confirmed { state, .. }
            | ToggleOutcome::AlreadyReconciled { state, .. }
            | ToggleOutcome::Reverted { state, .. } => Some(*state),
            ToggleOutcome::Discarded => None,
        }
    }

    pub fn is_reverted(&self) -> bool {
        matches!(self, ToggleOutcome::Reverted { .. })
    }

    /// Short message suitable for a toast
    pub fn notice(&self) -> String {
        match self {
            ToggleOutcome::Confirmed { state, message } => message.clone().unwrap_or_else(|| {
                match state {
                    BookmarkState::Present => "Bookmarked!",
                    BookmarkState::Absent => "Bookmark removed!",
                }
                .to_string()
            }),
            ToggleOutcome::AlreadyReconciled { state, .. } => match state {
                BookmarkState::Present => "Already bookmarked",
                BookmarkState::Absent => "Bookmark already removed",
            }
            .to_string(),
            ToggleOutcome::Reverted {
                failure: ToggleFailure::Auth { .. },
                ..
            } => "Session expired, please log in again".to_string(),
            // `state` is what the registry went back to, so the failed request was its flip
            ToggleOutcome::Reverted { state, .. } => match state {
                BookmarkState::Absent => "Failed to add bookmark",
                BookmarkState::Present => "Failed to remove bookmark",
            }
            .to_string(),
            ToggleOutcome::Discarded => "Session ended".to_string(),
        }
    }
}

impl Display for ToggleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.notice())
    }
}
