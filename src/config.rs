//! Process configuration loaded once from the environment.

use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;
use validator::Validate;

use crate::domain::{ConfigError, FeedSettings, IncomeProfile};
use crate::infra::MonzoConfig;
use crate::infra::monzo::{DEFAULT_API_URL, DEFAULT_AUTH_URL};

pub const DEFAULT_FEED_URL: &str = "https://github.com/RJacksonm1/time-is-money";
pub const DEFAULT_FEED_IMAGE_URL: &str = "https://emojipedia-us.s3.dualstack.us-west-1.amazonaws.com/thumbs/240/apple/155/alarm-clock_23f0.png";
pub const DEFAULT_WORKING_HOURS: f64 = 150.0;
pub const DEFAULT_PORT: u16 = 8000;

/// Application configuration
#[derive(Debug, Clone, Validate)]
pub struct Config {
    pub monzo_client_id: String,
    pub monzo_client_secret: SecretString,
    pub income: IncomeProfile,
    #[validate(url(message = "FEED_URL must be a URL"))]
    pub feed_url: String,
    #[validate(url(message = "FEED_IMAGE_URL must be a URL"))]
    pub feed_image_url: String,
    /// Externally reachable origin, without a trailing slash
    #[validate(url(message = "PUBLIC_BASE_URL must be a URL"))]
    pub public_base_url: String,
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    #[validate(url(message = "MONZO_API_URL must be a URL"))]
    pub monzo_api_url: String,
    #[validate(url(message = "MONZO_AUTH_URL must be a URL"))]
    pub monzo_auth_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let monzo_client_id = required("MONZO_CLIENT_ID")?;
        let monzo_client_secret = SecretString::from(required("MONZO_CLIENT_SECRET")?);

        let monthly_income: f64 = parse("MONTHLY_INCOME", &required("MONTHLY_INCOME")?)?;
        let monthly_outgoings: f64 = parse("MONTHLY_OUTGOINGS", &required("MONTHLY_OUTGOINGS")?)?;
        let monthly_working_hours = match get("MONTHLY_WORKING_HOURS") {
            Some(v) => parse("MONTHLY_WORKING_HOURS", &v)?,
            None => DEFAULT_WORKING_HOURS,
        };
        let income = IncomeProfile::new(monthly_income, monthly_outgoings, monthly_working_hours)?;

        let public_base_url = required("PUBLIC_BASE_URL")?
            .trim_end_matches('/')
            .to_string();

        let port = match get("PORT") {
            Some(v) => parse("PORT", &v)?,
            None => DEFAULT_PORT,
        };

        let config = Self {
            monzo_client_id,
            monzo_client_secret,
            income,
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            feed_image_url: get("FEED_IMAGE_URL")
                .unwrap_or_else(|| DEFAULT_FEED_IMAGE_URL.to_string()),
            public_base_url,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| ".".to_string())),
            monzo_api_url: get("MONZO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            monzo_auth_url: get("MONZO_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
        };

        config
            .validate()
            .map_err(|e| ConfigError::invalid("configuration", e.to_string()))?;

        info!(
            port = config.port,
            data_dir = %config.data_dir.display(),
            public_base_url = %config.public_base_url,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// URL Monzo delivers webhooks to
    #[must_use]
    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.public_base_url)
    }

    /// OAuth redirect target
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/register", self.public_base_url)
    }

    #[must_use]
    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            url: self.feed_url.clone(),
            image_url: self.feed_image_url.clone(),
        }
    }

    #[must_use]
    pub fn monzo_config(&self) -> MonzoConfig {
        let mut monzo = MonzoConfig::new(
            self.monzo_client_id.clone(),
            self.monzo_client_secret.clone(),
            self.redirect_uri(),
        );
        monzo.api_url = self.monzo_api_url.clone();
        monzo.auth_url = self.monzo_auth_url.clone();
        monzo
    }

    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(key, format!("{:?}: {}", value, e)))
}
