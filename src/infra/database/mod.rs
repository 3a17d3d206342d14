//! Durable token storage.

pub mod sqlite;

pub use sqlite::{DATABASE_FILE_NAME, SqliteConfig, SqliteTokenStore};
