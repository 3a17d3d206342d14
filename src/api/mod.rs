//! The API layer, containing web handlers and routing.

pub mod auth;
pub mod handlers;
pub mod router;

pub use auth::{SESSION_COOKIE, session_id};
pub use handlers::ApiDoc;
pub use router::{MAX_BODY_BYTES, create_router};
