//! Supabase-backed session provider.
//!
//! Wraps the Supabase auth REST surface: builds the OAuth authorize URL,
//! resolves a session from the redirect fragment, and publishes session
//! changes over a watch channel. At most one session is active at a time;
//! every change bumps a monotonically increasing epoch that the fetch layer
//! uses as its staleness token.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    #[error("Authentication error: {0}")]
    Provider(String),

    #[error("No session found")]
    NoSession,
}

/// An authenticated user's credential bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub display_name: Option<String>,
    /// Supabase access token, used against the auth endpoints.
    pub access_token: String,
    /// Bearer credential for the statistics service. Supabase forwards it
    /// from the OAuth provider; it can be absent on refreshed sessions.
    pub provider_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Tokens carried in the implicit-grant redirect fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub provider_token: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    name: Option<String>,
    display_name: Option<String>,
    full_name: Option<String>,
}

struct Inner {
    session: Option<Session>,
    epoch: u64,
}

pub struct SessionProvider {
    supabase_url: String,
    anon_key: String,
    redirect_uri: String,
    http: reqwest::Client,
    state: Mutex<Inner>,
    changes: watch::Sender<Option<Session>>,
}

impl SessionProvider {
    pub fn new(supabase_url: &str, anon_key: &str, redirect_uri: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build reqwest client");
        let (changes, _) = watch::channel(None);
        Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            redirect_uri: redirect_uri.to_string(),
            http,
            state: Mutex::new(Inner {
                session: None,
                epoch: 0,
            }),
            changes,
        }
    }

    /// Build the external authorization URL for the given scopes.
    /// Navigation is the caller's responsibility.
    pub fn authorize_url(&self, scopes: &str) -> Url {
        let nonce: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let mut url = Url::parse(&format!("{}/auth/v1/authorize", self.supabase_url))
            .expect("supabase_url is validated at config time");
        url.query_pairs_mut()
            .append_pair("provider", "spotify")
            .append_pair("redirect_to", &self.redirect_uri)
            .append_pair("scopes", scopes)
            .append_pair("state", &nonce);
        url
    }

    /// Resolve a full session from the post-login redirect: parse the token
    /// fragment, then look up the user's display metadata. The session is
    /// installed and published before returning.
    pub async fn establish_from_redirect(&self, redirect: &str) -> Result<Session, AuthError> {
        let tokens = parse_callback_fragment(redirect)?;
        let user = self.fetch_user(&tokens.access_token).await?;

        let session = Session {
            user_id: user.id,
            display_name: resolve_display_name(&user.user_metadata),
            access_token: tokens.access_token,
            provider_token: tokens.provider_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        };
        self.install(session.clone());
        Ok(session)
    }

    /// Install a resolved session, replacing any previous one, and notify
    /// subscribers. Bumps the session epoch.
    pub fn install(&self, session: Session) {
        {
            let mut inner = self.state.lock().unwrap();
            inner.epoch += 1;
            inner.session = Some(session.clone());
        }
        info!("Session established for user {}", session.user_id);
        self.changes.send_replace(Some(session));
    }

    pub fn current(&self) -> Option<Session> {
        self.state.lock().unwrap().session.clone()
    }

    /// Monotonic counter bumped on every session change. A fetch captures it
    /// before starting and discards its result if it moved.
    pub fn epoch(&self) -> u64 {
        self.state.lock().unwrap().epoch
    }

    /// Session change stream. The orchestration layer owns one receiver at a
    /// time and drops it on teardown.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.changes.subscribe()
    }

    /// Invalidate the current session. The provider-side logout is best
    /// effort: a failure is logged, local state is cleared regardless.
    pub async fn sign_out(&self) {
        let access_token = {
            let inner = self.state.lock().unwrap();
            inner.session.as_ref().map(|s| s.access_token.clone())
        };

        if let Some(token) = access_token {
            let url = format!("{}/auth/v1/logout", self.supabase_url);
            let result = self
                .http
                .post(&url)
                .header("apikey", &self.anon_key)
                .bearer_auth(&token)
                .send()
                .await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    warn!("Logout returned {}", response.status());
                }
                Err(e) => warn!("Logout request failed: {}", e),
                _ => {}
            }
        }

        {
            let mut inner = self.state.lock().unwrap();
            inner.epoch += 1;
            inner.session = None;
        }
        info!("Session cleared");
        self.changes.send_replace(None);
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserResponse, AuthError> {
        let url = format!("{}/auth/v1/user", self.supabase_url);
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("User lookup failed: {} {}", status, body);
            return Err(AuthError::Provider(format!(
                "user lookup returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("malformed user response: {}", e)))
    }
}

/// Resolve the user's display name the way the result view does:
/// `name` first, then `display_name`, then `full_name`.
fn resolve_display_name(metadata: &UserMetadata) -> Option<String> {
    metadata
        .name
        .clone()
        .or_else(|| metadata.display_name.clone())
        .or_else(|| metadata.full_name.clone())
}

/// Parse the implicit-grant fragment from a pasted redirect.
///
/// Accepts either the full redirect URL (`https://host/result#access_token=…`)
/// or just the fragment, with or without the leading `#`.
pub fn parse_callback_fragment(input: &str) -> Result<CallbackTokens, AuthError> {
    let fragment = match input.split_once('#') {
        Some((_, frag)) => frag,
        None => input,
    };
    let fragment = fragment.trim().trim_start_matches('#');
    if fragment.is_empty() {
        return Err(AuthError::NoSession);
    }

    let mut access_token = None;
    let mut refresh_token = None;
    let mut provider_token = None;
    let mut expires_in = None;

    for pair in fragment.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "access_token" => access_token = Some(value),
            "refresh_token" => refresh_token = Some(value),
            "provider_token" => provider_token = Some(value),
            "expires_in" => expires_in = value.parse().ok(),
            _ => {}
        }
    }

    let access_token = access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
        AuthError::Provider("redirect fragment carries no access_token".to_string())
    })?;

    Ok(CallbackTokens {
        access_token,
        refresh_token,
        provider_token,
        expires_in,
    })
}
