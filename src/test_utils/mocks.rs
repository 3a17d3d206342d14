//! Mock implementations for testing.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::{
    Account, AccountCredential, AppError, BankingApi, BankingError, DatabaseError, FeedItem,
    TokenPair, TokenStore, Webhook,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }

    fn error(&self) -> AppError {
        let msg = self
            .error_message
            .clone()
            .unwrap_or_else(|| "Mock error".to_string());
        AppError::Database(DatabaseError::Query(msg))
    }
}

/// In-memory token store with call counters
pub struct MockTokenStore {
    storage: Mutex<HashMap<String, AccountCredential>>,
    config: Mutex<MockConfig>,
    put_config: Mutex<MockConfig>,
    is_healthy: AtomicBool,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MockTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            storage: Mutex::new(HashMap::new()),
            config: Mutex::new(config),
            put_config: Mutex::new(MockConfig::success()),
            is_healthy: AtomicBool::new(true),
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Every operation fails with a query error
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    /// Only writes fail from now on
    pub fn fail_puts(&self, message: impl Into<String>) {
        *self.put_config.lock().unwrap() = MockConfig::failure(message);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.get_calls.store(0, Ordering::SeqCst);
        self.put_calls.store(0, Ordering::SeqCst);
    }

    /// Stored account IDs, sorted
    pub fn account_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.storage.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        let config = self.config.lock().unwrap();
        if config.should_fail {
            return Err(config.error());
        }
        Ok(())
    }
}

impl Default for MockTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Database(DatabaseError::Connection(
                "Unhealthy".to_string(),
            )));
        }
        self.check_should_fail()
    }

    async fn get(&self, account_id: &str) -> Result<Option<AccountCredential>, AppError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_should_fail()?;
        Ok(self.storage.lock().unwrap().get(account_id).cloned())
    }

    async fn put(&self, credential: &AccountCredential) -> Result<(), AppError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_should_fail()?;
        {
            let put_config = self.put_config.lock().unwrap();
            if put_config.should_fail {
                return Err(put_config.error());
            }
        }
        self.storage
            .lock()
            .unwrap()
            .insert(credential.account_id.clone(), credential.clone());
        Ok(())
    }
}

#[derive(Default)]
struct BankingState {
    feed_results: VecDeque<Result<(), BankingError>>,
    feed_items: Vec<(String, FeedItem)>,
    refresh_result: Option<Result<TokenPair, BankingError>>,
    refreshed_with: Vec<String>,
    exchange_tokens: Option<TokenPair>,
    exchanged_codes: Vec<String>,
    accounts: Vec<Account>,
    webhooks: Vec<Webhook>,
    deleted_webhooks: Vec<String>,
    register_failures: HashMap<String, BankingError>,
    list_webhooks_failure: Option<BankingError>,
    next_webhook_id: usize,
}

/// Scriptable banking API that keeps webhooks in memory
pub struct MockBankingApi {
    state: Mutex<BankingState>,
    calls: AtomicUsize,
}

impl MockBankingApi {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BankingState::default()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue the outcome of the next `create_feed_item`; an empty queue succeeds
    pub fn push_feed_result(&self, result: Result<(), BankingError>) {
        self.state.lock().unwrap().feed_results.push_back(result);
    }

    pub fn set_refresh_tokens(&self, tokens: TokenPair) {
        self.state.lock().unwrap().refresh_result = Some(Ok(tokens));
    }

    pub fn fail_refresh(&self, err: BankingError) {
        self.state.lock().unwrap().refresh_result = Some(Err(err));
    }

    pub fn set_exchange_tokens(&self, tokens: TokenPair) {
        self.state.lock().unwrap().exchange_tokens = Some(tokens);
    }

    pub fn set_accounts(&self, accounts: Vec<Account>) {
        self.state.lock().unwrap().accounts = accounts;
    }

    /// Seed a pre-existing webhook
    pub fn add_webhook(&self, webhook: Webhook) {
        self.state.lock().unwrap().webhooks.push(webhook);
    }

    pub fn fail_register_webhook_for(&self, account_id: &str, err: BankingError) {
        self.state
            .lock()
            .unwrap()
            .register_failures
            .insert(account_id.to_string(), err);
    }

    pub fn fail_list_webhooks(&self, err: BankingError) {
        self.state.lock().unwrap().list_webhooks_failure = Some(err);
    }

    /// Posted items with the bearer token used for each
    pub fn feed_items(&self) -> Vec<(String, FeedItem)> {
        self.state.lock().unwrap().feed_items.clone()
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.lock().unwrap().refreshed_with.len()
    }

    /// Refresh tokens presented to `refresh_token`
    pub fn refreshed_with(&self) -> Vec<String> {
        self.state.lock().unwrap().refreshed_with.clone()
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.state.lock().unwrap().exchanged_codes.clone()
    }

    pub fn webhooks_for(&self, account_id: &str) -> Vec<Webhook> {
        self.state
            .lock()
            .unwrap()
            .webhooks
            .iter()
            .filter(|w| w.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn deleted_webhooks(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_webhooks.clone()
    }

    /// Number of async API calls made, of any kind
    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MockBankingApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BankingApi for MockBankingApi {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://auth.example.test/?client_id=mock&state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, AppError> {
        self.record_call();
        let mut state = self.state.lock().unwrap();
        state.exchanged_codes.push(code.to_string());
        Ok(state
            .exchange_tokens
            .clone()
            .unwrap_or_else(|| TokenPair::new(format!("access-{}", code), format!("refresh-{}", code))))
    }

    async fn refresh_token(&self, refresh_token: &SecretString) -> Result<TokenPair, AppError> {
        self.record_call();
        let mut state = self.state.lock().unwrap();
        state
            .refreshed_with
            .push(refresh_token.expose_secret().to_string());
        match state.refresh_result.clone() {
            Some(Ok(tokens)) => Ok(tokens),
            Some(Err(e)) => Err(AppError::Banking(e)),
            None => Ok(TokenPair::new("refreshed-access", "refreshed-refresh")),
        }
    }

    async fn create_feed_item(
        &self,
        access_token: &SecretString,
        item: &FeedItem,
    ) -> Result<(), AppError> {
        self.record_call();
        let mut state = self.state.lock().unwrap();
        state
            .feed_items
            .push((access_token.expose_secret().to_string(), item.clone()));
        state
            .feed_results
            .pop_front()
            .unwrap_or(Ok(()))
            .map_err(AppError::Banking)
    }

    async fn list_accounts(&self, _access_token: &SecretString) -> Result<Vec<Account>, AppError> {
        self.record_call();
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn list_webhooks(
        &self,
        _access_token: &SecretString,
        account_id: &str,
    ) -> Result<Vec<Webhook>, AppError> {
        self.record_call();
        if let Some(err) = self.state.lock().unwrap().list_webhooks_failure.clone() {
            return Err(AppError::Banking(err));
        }
        Ok(self.webhooks_for(account_id))
    }

    async fn register_webhook(
        &self,
        _access_token: &SecretString,
        account_id: &str,
        url: &str,
    ) -> Result<Webhook, AppError> {
        self.record_call();
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.register_failures.get(account_id) {
            return Err(AppError::Banking(err.clone()));
        }
        state.next_webhook_id += 1;
        let webhook = Webhook {
            id: format!("webhook_{}", state.next_webhook_id),
            account_id: account_id.to_string(),
            url: url.to_string(),
        };
        state.webhooks.push(webhook.clone());
        Ok(webhook)
    }

    async fn delete_webhook(
        &self,
        _access_token: &SecretString,
        webhook_id: &str,
    ) -> Result<(), AppError> {
        self.record_call();
        let mut state = self.state.lock().unwrap();
        state.webhooks.retain(|w| w.id != webhook_id);
        state.deleted_webhooks.push(webhook_id.to_string());
        Ok(())
    }
}
