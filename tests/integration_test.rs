//! End-to-end tests: real router, real SQLite token store, Monzo mocked with wiremock.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header as header_eq, method, path},
};

use time_is_money::api::create_router;
use time_is_money::app::AppState;
use time_is_money::config::Config;
use time_is_money::domain::{AccountCredential, TokenPair, TokenStore};
use time_is_money::infra::{MonzoClient, SqliteTokenStore};

struct Harness {
    router: Router,
    store: Arc<SqliteTokenStore>,
    monzo: MockServer,
    /// Removed on drop, including when an assertion panics
    _data_dir: TempDir,
}

impl Harness {
    async fn start() -> Self {
        let monzo = MockServer::start().await;
        let data_dir = tempfile::tempdir().unwrap();

        let monzo_uri = monzo.uri();
        let dir = data_dir.path().display().to_string();
        let config = Config::from_lookup(|key| {
            let value = match key {
                "MONZO_CLIENT_ID" => "oauth2client_e2e",
                "MONZO_CLIENT_SECRET" => "secret",
                "MONTHLY_INCOME" => "2000",
                "MONTHLY_OUTGOINGS" => "1000",
                "PUBLIC_BASE_URL" => "https://tim.example.com/",
                "MONZO_API_URL" => monzo_uri.as_str(),
                "DATA_DIR" => dir.as_str(),
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap();

        let store = Arc::new(SqliteTokenStore::with_defaults(&config.data_dir).await.unwrap());
        store.run_migrations().await.unwrap();
        let banking = Arc::new(MonzoClient::new(config.monzo_config()).unwrap());

        let state = AppState::new(
            Arc::clone(&store) as _,
            banking as _,
            config.income,
            config.feed_settings(),
            config.webhook_url(),
        );

        Self {
            router: create_router(Arc::new(state)),
            store,
            monzo,
            _data_dir: data_dir,
        }
    }

    async fn seed(&self, account_id: &str, access: &str, refresh: &str) {
        self.store
            .put(&AccountCredential::new(
                account_id,
                &TokenPair::new(access, refresh),
            ))
            .await
            .unwrap();
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_webhook(&self, body: serde_json::Value) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap().status()
    }

    async fn teardown(self) {
        self.store.close().await;
    }
}

fn outgoing(account_id: &str, amount: i64) -> serde_json::Value {
    json!({
        "type": "transaction.created",
        "data": {
            "id": "tx_e2e",
            "account_id": account_id,
            "amount": amount,
            "currency": "GBP",
            "description": "TFL TRAVEL CH",
            "settled": null,
            "merchant": {"id": "merch_tfl", "name": "Transport for London"}
        }
    })
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 21600,
        "token_type": "Bearer",
        "user_id": "user_e2e"
    })
}

#[tokio::test]
async fn test_outgoing_transaction_reaches_feed() {
    let h = Harness::start().await;
    h.seed("acc_1", "access-1", "refresh-1").await;

    Mock::given(method("POST"))
        .and(path("/feed"))
        .and(header_eq("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&h.monzo)
        .await;

    assert_eq!(h.post_webhook(outgoing("acc_1", -1000)).await, StatusCode::OK);

    let requests = h.monzo.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    let url = Url::parse(&format!("http://form.test/?{}", body)).unwrap();
    let title = url
        .query_pairs()
        .find(|(k, _)| k == "params[title]")
        .map(|(_, v)| v.into_owned());
    // 10.00 / (1000 / 150) = 1.5
    assert_eq!(title.as_deref(), Some("1.50 hours spent"));

    h.teardown().await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let h = Harness::start().await;
    h.seed("acc_1", "stale-access", "refresh-1").await;

    Mock::given(method("POST"))
        .and(path("/feed"))
        .and(header_eq("authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "unauthorized.bad_access_token.expired",
            "message": "Access token has expired"
        })))
        .expect(1)
        .mount(&h.monzo)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh-access", "refresh-2")))
        .expect(1)
        .mount(&h.monzo)
        .await;
    Mock::given(method("POST"))
        .and(path("/feed"))
        .and(header_eq("authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&h.monzo)
        .await;

    assert_eq!(h.post_webhook(outgoing("acc_1", -500)).await, StatusCode::OK);

    let stored = h.store.get("acc_1").await.unwrap().unwrap();
    assert_eq!(stored.access_token.expose_secret(), "fresh-access");
    assert_eq!(stored.refresh_token.expose_secret(), "refresh-2");

    h.teardown().await;
}

#[tokio::test]
async fn test_failed_refresh_keeps_old_tokens() {
    let h = Harness::start().await;
    h.seed("acc_1", "stale-access", "refresh-1").await;

    Mock::given(method("POST"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "unauthorized.bad_access_token.expired",
            "message": "Access token has expired"
        })))
        .mount(&h.monzo)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "unauthorized.bad_refresh_token",
            "message": "Refresh token is invalid"
        })))
        .mount(&h.monzo)
        .await;

    assert_eq!(
        h.post_webhook(outgoing("acc_1", -500)).await,
        StatusCode::INTERNAL_SERVER_ERROR
    );

    let stored = h.store.get("acc_1").await.unwrap().unwrap();
    assert_eq!(stored.access_token.expose_secret(), "stale-access");

    h.teardown().await;
}

#[tokio::test]
async fn test_unregistered_account_never_calls_monzo() {
    let h = Harness::start().await;

    assert_eq!(
        h.post_webhook(outgoing("acc_nobody", -500)).await,
        StatusCode::UNAUTHORIZED
    );
    assert!(h.monzo.received_requests().await.unwrap().is_empty());

    h.teardown().await;
}

#[tokio::test]
async fn test_oauth_login_registers_accounts() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new-access", "new-refresh")))
        .expect(1)
        .mount(&h.monzo)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{"id": "acc_1", "description": "user_e2e"}]
        })))
        .mount(&h.monzo)
        .await;
    Mock::given(method("GET"))
        .and(path("/webhooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "webhooks": [
                {"id": "webhook_stale", "account_id": "acc_1", "url": "https://tim.example.com/webhook"},
                {"id": "webhook_other", "account_id": "acc_1", "url": "https://other.example.com/hook"}
            ]
        })))
        .mount(&h.monzo)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/webhooks/webhook_stale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&h.monzo)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "webhook": {"id": "webhook_new", "account_id": "acc_1", "url": "https://tim.example.com/webhook"}
        })))
        .expect(1)
        .mount(&h.monzo)
        .await;

    let response = h.get("/login", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let consent = Url::parse(
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(consent.host_str(), Some("auth.monzo.com"));
    let pairs: Vec<(String, String)> = consent
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&(
        "redirect_uri".to_string(),
        "https://tim.example.com/register".to_string()
    )));
    let state = pairs
        .iter()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.clone())
        .unwrap();

    let response = h
        .get(
            &format!("/register?code=consent-code&state={}", state),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let stored = h.store.get("acc_1").await.unwrap().unwrap();
    assert!(stored.same_tokens(&AccountCredential {
        account_id: "acc_1".to_string(),
        access_token: SecretString::from("new-access".to_string()),
        refresh_token: SecretString::from("new-refresh".to_string()),
    }));

    h.teardown().await;
}
