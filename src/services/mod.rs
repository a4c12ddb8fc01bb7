pub mod coordinator;
pub mod engine;
pub mod projection;
pub mod registry;
pub mod store;

pub use coordinator::{PendingToggle, ToggleCoordinator};
pub use engine::BookmarkEngine;
pub use projection::{is_bookmarked, BookmarkView, Subscribers, Subscription};
pub use registry::BookmarkRegistry;
pub use store::{HttpBookmarkStore, RemoteBookmarkStore};
