//! Domain types shared between the services, the store and the banking client.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OAuth token pair issued by the banking provider
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
        }
    }
}

/// Access/refresh token pair authorising API calls for one bank account
#[derive(Debug, Clone)]
pub struct AccountCredential {
    pub account_id: String,
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl AccountCredential {
    #[must_use]
    pub fn new(account_id: impl Into<String>, tokens: &TokenPair) -> Self {
        Self {
            account_id: account_id.into(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
        }
    }

    /// Compare token material without exposing it in logs
    #[must_use]
    pub fn same_tokens(&self, other: &AccountCredential) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.refresh_token.expose_secret() == other.refresh_token.expose_secret()
    }
}

/// Bank account as listed by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// Webhook registration held by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Webhook {
    pub id: String,
    pub account_id: String,
    pub url: String,
}

/// Kind of feed item; the provider only renders `basic` for third parties
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedItemType {
    #[default]
    Basic,
}

impl FeedItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
        }
    }
}

/// Outbound notification posted to an account's feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    pub account_id: String,
    #[serde(rename = "type")]
    pub item_type: FeedItemType,
    pub title: String,
    pub body: String,
    pub image_url: String,
    pub url: String,
}

/// Static parts of every feed item
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub url: String,
    pub image_url: String,
}

impl FeedItem {
    /// Feed item announcing how many hours of disposable income a payment cost.
    #[must_use]
    pub fn hours_spent(
        account_id: impl Into<String>,
        hours_spent: f64,
        merchant: &str,
        settings: &FeedSettings,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            item_type: FeedItemType::Basic,
            title: format!("{:.2} hours spent", hours_spent),
            body: format!("at {}", merchant),
            image_url: settings.image_url.clone(),
            url: settings.url.clone(),
        }
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Token store health status
    pub database: HealthStatus,
    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
    /// Application version
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(database: HealthStatus) -> Self {
        Self {
            status: database,
            database,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Error type identifier
    #[schema(example = "malformed_payload")]
    pub r#type: String,
    /// Human-readable error message
    #[schema(example = "Malformed payload: missing field `type`")]
    pub message: String,
}
