//! Account registration after a successful OAuth login.

use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::domain::{AccountCredential, AppError, BankingApi, TokenPair, TokenStore};

/// Stores credentials for every account and points its webhook at us
pub struct RegistrationService {
    token_store: Arc<dyn TokenStore>,
    banking: Arc<dyn BankingApi>,
    webhook_url: String,
}

impl RegistrationService {
    #[must_use]
    pub fn new(
        token_store: Arc<dyn TokenStore>,
        banking: Arc<dyn BankingApi>,
        webhook_url: String,
    ) -> Self {
        Self {
            token_store,
            banking,
            webhook_url,
        }
    }

    /// Complete the OAuth callback: exchange the code, then register.
    #[instrument(skip(self, code))]
    pub async fn register_with_code(&self, code: &str) -> Result<Vec<String>, AppError> {
        let tokens = self
            .banking
            .exchange_code(code)
            .await
            .inspect_err(|e| error!(error = %e, "OAuth code exchange failed"))?;
        self.register(&tokens).await
    }

    /// Persist `tokens` for every account and re-register its webhook.
    ///
    /// Any failure aborts the remaining accounts. Accounts already processed
    /// stay registered.
    #[instrument(skip(self, tokens), fields(webhook_url = %self.webhook_url))]
    pub async fn register(&self, tokens: &TokenPair) -> Result<Vec<String>, AppError> {
        let accounts = self
            .banking
            .list_accounts(&tokens.access_token)
            .await
            .inspect_err(|e| error!(error = %e, "Couldn't resolve accounts"))?;

        let mut registered = Vec::with_capacity(accounts.len());
        for account in accounts {
            self.token_store
                .put(&AccountCredential::new(&account.id, tokens))
                .await
                .inspect_err(|e| error!(account_id = %account.id, error = %e, "Failed to save access tokens"))?;

            let hooks = self
                .banking
                .list_webhooks(&tokens.access_token, &account.id)
                .await
                .inspect_err(|e| error!(account_id = %account.id, error = %e, "Couldn't list webhooks"))?;
            for hook in hooks.iter().filter(|h| h.url == self.webhook_url) {
                self.banking
                    .delete_webhook(&tokens.access_token, &hook.id)
                    .await
                    .inspect_err(|e| error!(webhook_id = %hook.id, error = %e, "Couldn't delete stale webhook"))?;
                info!(account_id = %account.id, webhook_id = %hook.id, "Deleted stale webhook");
            }

            let hook = self
                .banking
                .register_webhook(&tokens.access_token, &account.id, &self.webhook_url)
                .await
                .inspect_err(|e| error!(account_id = %account.id, error = %e, "Couldn't register webhook"))?;

            info!(account_id = %account.id, webhook_id = %hook.id, "Webhook registered");
            registered.push(account.id);
        }

        Ok(registered)
    }
}
