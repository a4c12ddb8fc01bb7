pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

pub use config::Config;
pub use error::{AppError, AppResult, LoadError, StoreError};
pub use models::{
    BookmarkKey, BookmarkRecord, BookmarkState, CatalogItem, ItemType, ToggleFailure,
    ToggleOutcome,
};
pub use services::{BookmarkEngine, BookmarkView, Subscription};
