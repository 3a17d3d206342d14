//! Monzo API client.
//!
//! Requests are form-encoded and authenticated with a bearer token, responses
//! are JSON. Error bodies carry a dotted `code`; the expired-token code is
//! surfaced as [`BankingError::AccessTokenExpired`] so callers can refresh.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::domain::{
    Account, AppError, BankingApi, BankingError, FeedItem, TokenPair, Webhook,
};

pub const DEFAULT_API_URL: &str = "https://api.monzo.com";
pub const DEFAULT_AUTH_URL: &str = "https://auth.monzo.com";

/// Only personal current accounts can host third-party feed items
const ACCOUNT_TYPE: &str = "uk_retail";

/// OAuth client registration and endpoints
#[derive(Debug, Clone)]
pub struct MonzoConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Where Monzo sends the user back after consent (`<base>/register`)
    pub redirect_uri: String,
    pub api_url: String,
    pub auth_url: String,
    pub timeout: Duration,
}

impl MonzoConfig {
    #[must_use]
    pub fn new(client_id: String, client_secret: SecretString, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`BankingApi`] implementation talking to Monzo over HTTPS
#[derive(Debug, Clone)]
pub struct MonzoClient {
    http_client: Client,
    config: MonzoConfig,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

impl From<TokenResponse> for TokenPair {
    fn from(res: TokenResponse) -> Self {
        TokenPair::new(res.access_token, res.refresh_token)
    }
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct WebhooksResponse {
    webhooks: Vec<Webhook>,
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    webhook: Webhook,
}

impl MonzoClient {
    pub fn new(config: MonzoConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Send a request and decode a successful JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Monzo API request failed");
            AppError::Banking(BankingError::Network(e.to_string()))
        })?;

        let response = Self::check_status(response).await?;

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Monzo response");
            AppError::Banking(BankingError::Parse(e.to_string()))
        })
    }

    async fn check_status(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) if !parsed.code.is_empty() => {
                BankingError::from_upstream(status.as_u16(), parsed.code, parsed.message)
            }
            _ => BankingError::Api {
                status: status.as_u16(),
                code: String::new(),
                message: body,
            },
        };
        debug!(status = %status, error = %err, "Monzo API returned error");
        Err(AppError::Banking(err))
    }
}

#[async_trait]
impl BankingApi for MonzoClient {
    fn authorize_url(&self, state: &str) -> String {
        let base = format!("{}/", self.config.auth_url.trim_end_matches('/'));
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("state", state),
        ];
        match Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            // auth_url is validated at startup; fall back to the raw base
            Err(_) => base,
        }
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<TokenPair, AppError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];
        let res: TokenResponse = self
            .send(self.http_client.post(self.api("/oauth2/token")).form(&form))
            .await?;
        Ok(res.into())
    }

    #[instrument(skip_all)]
    async fn refresh_token(&self, refresh_token: &SecretString) -> Result<TokenPair, AppError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("refresh_token", refresh_token.expose_secret()),
        ];
        let res: TokenResponse = self
            .send(self.http_client.post(self.api("/oauth2/token")).form(&form))
            .await?;
        Ok(res.into())
    }

    #[instrument(skip(self, access_token, item), fields(account_id = %item.account_id))]
    async fn create_feed_item(
        &self,
        access_token: &SecretString,
        item: &FeedItem,
    ) -> Result<(), AppError> {
        let form = [
            ("account_id", item.account_id.as_str()),
            ("type", item.item_type.as_str()),
            ("url", item.url.as_str()),
            ("params[title]", item.title.as_str()),
            ("params[body]", item.body.as_str()),
            ("params[image_url]", item.image_url.as_str()),
        ];
        let _: serde_json::Value = self
            .send(
                self.http_client
                    .post(self.api("/feed"))
                    .bearer_auth(access_token.expose_secret())
                    .form(&form),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn list_accounts(&self, access_token: &SecretString) -> Result<Vec<Account>, AppError> {
        let res: AccountsResponse = self
            .send(
                self.http_client
                    .get(self.api("/accounts"))
                    .bearer_auth(access_token.expose_secret())
                    .query(&[("account_type", ACCOUNT_TYPE)]),
            )
            .await?;
        Ok(res.accounts)
    }

    #[instrument(skip(self, access_token))]
    async fn list_webhooks(
        &self,
        access_token: &SecretString,
        account_id: &str,
    ) -> Result<Vec<Webhook>, AppError> {
        let res: WebhooksResponse = self
            .send(
                self.http_client
                    .get(self.api("/webhooks"))
                    .bearer_auth(access_token.expose_secret())
                    .query(&[("account_id", account_id)]),
            )
            .await?;
        Ok(res.webhooks)
    }

    #[instrument(skip(self, access_token))]
    async fn register_webhook(
        &self,
        access_token: &SecretString,
        account_id: &str,
        url: &str,
    ) -> Result<Webhook, AppError> {
        let res: WebhookResponse = self
            .send(
                self.http_client
                    .post(self.api("/webhooks"))
                    .bearer_auth(access_token.expose_secret())
                    .form(&[("account_id", account_id), ("url", url)]),
            )
            .await?;
        Ok(res.webhook)
    }

    #[instrument(skip(self, access_token))]
    async fn delete_webhook(
        &self,
        access_token: &SecretString,
        webhook_id: &str,
    ) -> Result<(), AppError> {
        let _: serde_json::Value = self
            .send(
                self.http_client
                    .delete(self.api(&format!("/webhooks/{}", webhook_id)))
                    .bearer_auth(access_token.expose_secret()),
            )
            .await?;
        Ok(())
    }
}
