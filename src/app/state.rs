//! Application state management.

use std::sync::Arc;

use crate::domain::{BankingApi, FeedSettings, IncomeProfile, TokenStore};
use crate::infra::SessionStore;

use super::registration::RegistrationService;
use super::service::NotificationService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub notifications: Arc<NotificationService>,
    pub registration: Arc<RegistrationService>,
    pub banking: Arc<dyn BankingApi>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Wire the services around the given collaborators
    #[must_use]
    pub fn new(
        token_store: Arc<dyn TokenStore>,
        banking: Arc<dyn BankingApi>,
        income: IncomeProfile,
        feed: FeedSettings,
        webhook_url: String,
    ) -> Self {
        let notifications = Arc::new(NotificationService::new(
            Arc::clone(&token_store),
            Arc::clone(&banking),
            income,
            feed,
        ));
        let registration = Arc::new(RegistrationService::new(
            token_store,
            Arc::clone(&banking),
            webhook_url,
        ));
        Self {
            notifications,
            registration,
            banking,
            sessions: Arc::new(SessionStore::new()),
        }
    }
}
