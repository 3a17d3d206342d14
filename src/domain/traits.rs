//! Domain traits defining contracts for external systems.

use async_trait::async_trait;
use secrecy::SecretString;

use super::error::AppError;
use super::types::{Account, AccountCredential, FeedItem, TokenPair, Webhook};

/// Durable account → token mapping
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Check storage connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Credential for an account, `None` if the account was never registered
    async fn get(&self, account_id: &str) -> Result<Option<AccountCredential>, AppError>;

    /// Insert or replace the credential keyed by its account ID
    async fn put(&self, credential: &AccountCredential) -> Result<(), AppError>;
}

/// Banking provider API used by the webhook and registration flows
#[async_trait]
pub trait BankingApi: Send + Sync {
    /// Consent URL the user is redirected to from `/login`
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an OAuth authorization code for a token pair
    async fn exchange_code(&self, code: &str) -> Result<TokenPair, AppError>;

    /// Obtain a fresh token pair. Only the refresh token is sent; a stale
    /// bearer header would be rejected before the refresh is processed.
    async fn refresh_token(&self, refresh_token: &SecretString) -> Result<TokenPair, AppError>;

    /// Post an item to the account's feed
    async fn create_feed_item(
        &self,
        access_token: &SecretString,
        item: &FeedItem,
    ) -> Result<(), AppError>;

    /// Retail accounts visible to the token
    async fn list_accounts(&self, access_token: &SecretString) -> Result<Vec<Account>, AppError>;

    async fn list_webhooks(
        &self,
        access_token: &SecretString,
        account_id: &str,
    ) -> Result<Vec<Webhook>, AppError>;

    async fn register_webhook(
        &self,
        access_token: &SecretString,
        account_id: &str,
        url: &str,
    ) -> Result<Webhook, AppError>;

    async fn delete_webhook(
        &self,
        access_token: &SecretString,
        webhook_id: &str,
    ) -> Result<(), AppError>;
}
