//! Webhook handling: classify, convert, look up credentials, post to the feed.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    AccountCredential, AppError, BankingApi, Classification, FeedItem, FeedSettings,
    HealthResponse, HealthStatus, IncomeProfile, SkipReason, TokenStore, classify,
};

/// What happened to an inbound webhook
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// Acknowledged without any downstream call
    Skipped(SkipReason),
    /// Feed item created
    Posted {
        account_id: String,
        hours_spent: f64,
        /// True when the access token had to be refreshed first
        refreshed: bool,
    },
}

/// Turns outgoing transactions into "hours spent" feed items
pub struct NotificationService {
    token_store: Arc<dyn TokenStore>,
    banking: Arc<dyn BankingApi>,
    income: IncomeProfile,
    feed: FeedSettings,
}

impl NotificationService {
    #[must_use]
    pub fn new(
        token_store: Arc<dyn TokenStore>,
        banking: Arc<dyn BankingApi>,
        income: IncomeProfile,
        feed: FeedSettings,
    ) -> Self {
        Self {
            token_store,
            banking,
            income,
            feed,
        }
    }

    /// Process one raw webhook body.
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    pub async fn handle_webhook(&self, body: &[u8]) -> Result<WebhookOutcome, AppError> {
        debug!(payload = %String::from_utf8_lossy(body), "Webhook received");

        let tx = match classify(body) {
            Ok(Classification::Outgoing(tx)) => tx,
            Ok(Classification::Skip(reason)) => {
                info!(reason = %reason, "Skipping webhook");
                return Ok(WebhookOutcome::Skipped(reason));
            }
            Err(e) => {
                warn!(error = %e, "Rejecting webhook payload");
                return Err(e);
            }
        };

        let hours_spent = self.income.hours_spent(tx.amount);

        let credential = self
            .token_store
            .get(&tx.account_id)
            .await?
            .ok_or_else(|| {
                warn!(account_id = %tx.account_id, "No access token for account");
                AppError::UnknownAccount(tx.account_id.clone())
            })?;

        let item = FeedItem::hours_spent(&tx.account_id, hours_spent, tx.payee(), &self.feed);

        let refreshed = match self
            .banking
            .create_feed_item(&credential.access_token, &item)
            .await
        {
            Ok(()) => false,
            Err(e) if e.is_expired_token() => {
                info!(account_id = %tx.account_id, "Access token expired, refreshing");
                self.refresh_and_retry(&credential, &item).await?;
                true
            }
            Err(e) => {
                error!(account_id = %tx.account_id, error = %e, "Failed to create feed item");
                return Err(e);
            }
        };

        info!(
            account_id = %tx.account_id,
            transaction_id = %tx.transaction_id,
            amount = tx.amount,
            currency = %tx.currency,
            hours_spent = %format!("{:.2}", hours_spent),
            refreshed,
            "Feed item created"
        );

        Ok(WebhookOutcome::Posted {
            account_id: tx.account_id,
            hours_spent,
            refreshed,
        })
    }

    /// Single recovery path: refresh, persist, post again once.
    async fn refresh_and_retry(
        &self,
        stale: &AccountCredential,
        item: &FeedItem,
    ) -> Result<(), AppError> {
        let tokens = self
            .banking
            .refresh_token(&stale.refresh_token)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to refresh client token"))?;

        let refreshed = AccountCredential::new(&stale.account_id, &tokens);
        self.token_store
            .put(&refreshed)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to save refreshed access tokens"))?;

        self.banking
            .create_feed_item(&refreshed.access_token, item)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create feed item after refresh"))
    }

    /// Token store health
    pub async fn health_check(&self) -> HealthResponse {
        let database = match self.token_store.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                error!(error = %e, "Token store health check failed");
                HealthStatus::Unhealthy
            }
        };
        HealthResponse::new(database)
    }
}
