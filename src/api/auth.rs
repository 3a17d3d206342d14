//! OAuth login flow: session cookie, consent redirect, callback and logout.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::app::AppState;
use crate::domain::AppError;
use crate::infra::session::SESSION_TTL_HOURS;

pub const SESSION_COOKIE: &str = "tim_session";

/// Query parameters Monzo appends to the redirect URI
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Session ID from the request's `Cookie` headers, if present.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn session_cookie(id: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        id,
        SESSION_TTL_HOURS * 3600
    )
}

fn expired_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Start the OAuth flow by redirecting to the consent screen.
pub async fn login_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let purged = state.sessions.purge_expired();
    if purged > 0 {
        info!(purged, "Purged expired sessions");
    }

    let session = state.sessions.get_or_create(session_id(&headers).as_deref());
    if session.authenticated {
        return Redirect::temporary("/").into_response();
    }

    // The session was created or refreshed just above
    let Some(oauth_state) = state.sessions.begin_login(&session.id) else {
        return AppError::Internal("Session vanished during login".to_string()).into_response();
    };

    (
        [(header::SET_COOKIE, session_cookie(&session.id))],
        Redirect::temporary(&state.banking.authorize_url(&oauth_state)),
    )
        .into_response()
}

/// OAuth redirect target: verify state, exchange the code and register accounts.
#[instrument(skip_all)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let session_id = session_id(&headers)
        .ok_or_else(|| AppError::Authentication("No session; start at /login".to_string()))?;

    if state.sessions.is_authenticated(&session_id) {
        return Ok(Redirect::temporary("/").into_response());
    }

    if let Some(err) = params.error {
        warn!(error = %err, "Consent was not granted");
        return Err(AppError::Authentication(format!("Consent failed: {}", err)));
    }

    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        return Err(AppError::Authentication(
            "Missing code or state parameter".to_string(),
        ));
    };

    if !state.sessions.verify_state(&session_id, &oauth_state) {
        warn!("OAuth state mismatch");
        return Err(AppError::Authentication("OAuth state mismatch".to_string()));
    }

    let accounts = state.registration.register_with_code(&code).await?;
    state.sessions.mark_authenticated(&session_id);
    info!(accounts = accounts.len(), "Registration complete");

    Ok(Redirect::temporary("/").into_response())
}

/// Forget the session. Stored account tokens are kept.
pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.sessions.remove(&id);
    }
    ([(header::SET_COOKIE, expired_cookie())], "Logged out").into_response()
}

pub async fn index_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> &'static str {
    let authenticated = session_id(&headers).is_some_and(|id| state.sessions.is_authenticated(&id));
    if authenticated {
        "You're logged in :) Visit /logout if you've had enough"
    } else {
        "Visit /login to auth"
    }
}
