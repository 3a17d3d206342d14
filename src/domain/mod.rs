//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod events;
pub mod spend;
pub mod traits;
pub mod types;

pub use error::{AppError, BankingError, ConfigError, DatabaseError, EXPIRED_ACCESS_TOKEN_CODE};
pub use events::{Classification, OutgoingTransaction, SkipReason, classify};
pub use spend::IncomeProfile;
pub use traits::{BankingApi, TokenStore};
pub use types::{
    Account, AccountCredential, ErrorDetail, ErrorResponse, FeedItem, FeedItemType, FeedSettings,
    HealthResponse, HealthStatus, TokenPair, Webhook,
};
