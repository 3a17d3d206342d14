//! Infrastructure layer implementations.

pub mod database;
pub mod monzo;
pub mod session;

pub use database::{SqliteConfig, SqliteTokenStore};
pub use monzo::{MonzoClient, MonzoConfig};
pub use session::{Session, SessionStore};
