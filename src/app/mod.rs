//! Application layer containing business logic and shared state.

pub mod registration;
pub mod service;
pub mod state;

pub use registration::RegistrationService;
pub use service::{NotificationService, WebhookOutcome};
pub use state::AppState;
