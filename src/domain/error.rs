//! Error types shared across layers.

use thiserror::Error;

/// Upstream error code Monzo returns when a bearer token has expired.
pub const EXPIRED_ACCESS_TOKEN_CODE: &str = "unauthorized.bad_access_token.expired";

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    /// Inbound payload could not be read or decoded
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No credential on file for the account a webhook refers to
    #[error("No access token for account ID {0}")]
    UnknownAccount(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Banking API error: {0}")]
    Banking(#[from] BankingError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the banking API rejected the call because the access token expired.
    #[must_use]
    pub fn is_expired_token(&self) -> bool {
        matches!(self, AppError::Banking(BankingError::AccessTokenExpired))
    }
}

/// Errors returned by the banking provider client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankingError {
    #[error("{EXPIRED_ACCESS_TOKEN_CODE}: Access token has expired")]
    AccessTokenExpired,

    #[error("{code}: {message} (HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl BankingError {
    /// Build an error from an upstream error body, recognising the expired-token code.
    #[must_use]
    pub fn from_upstream(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        if code == EXPIRED_ACCESS_TOKEN_CODE {
            return BankingError::AccessTokenExpired;
        }
        BankingError::Api {
            status,
            code,
            message: message.into(),
        }
    }
}

/// Token store errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Connection(err.to_string())
            }
            sqlx::Error::Migrate(e) => DatabaseError::Migration(e.to_string()),
            other => DatabaseError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(DatabaseError::from(err))
    }
}

/// Startup configuration errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(String),

    #[error("{key} is invalid: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_code_maps_to_structured_variant() {
        let err = BankingError::from_upstream(401, EXPIRED_ACCESS_TOKEN_CODE, "Access token has expired");
        assert_eq!(err, BankingError::AccessTokenExpired);
        assert!(AppError::from(err).is_expired_token());
    }

    #[test]
    fn test_other_codes_stay_generic() {
        let err = BankingError::from_upstream(401, "unauthorized.bad_access_token", "Bad token");
        assert!(matches!(err, BankingError::Api { status: 401, .. }));
        assert!(!AppError::from(err).is_expired_token());
    }

    #[test]
    fn test_expired_display_matches_upstream_message() {
        assert_eq!(
            BankingError::AccessTokenExpired.to_string(),
            "unauthorized.bad_access_token.expired: Access token has expired"
        );
    }
}
