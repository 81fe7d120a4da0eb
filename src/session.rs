//! OAuth token ownership and the implicit-grant authorization flow.
//!
//! The token arrives through a redirect fragment (`access_token` +
//! `expires_in`), is persisted via [`StateStorage`], and is evicted on the
//! first read after expiry. There is no silent refresh: once the token
//! expires the caller must send the user back through the authorization
//! URL.

use crate::persistence::StateStorage;
use crate::{QuizlistError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Google's OAuth 2.0 authorization endpoint.
pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Read-only access to the user's YouTube account.
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// A bearer token and its absolute expiry.
///
/// Owned exclusively by [`AuthSession`]; never copied into the
/// track/playlist model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// OAuth bearer token
    pub access_token: String,
    /// Absolute expiry in epoch milliseconds
    pub expires_at_epoch_ms: i64,
}

impl AuthToken {
    /// Whether the token is still valid at the given instant.
    pub fn is_valid_at(&self, now_epoch_ms: i64) -> bool {
        self.expires_at_epoch_ms > now_epoch_ms
    }
}

/// Owns the OAuth token and its lifecycle.
///
/// Created from persisted state with [`AuthSession::restore`]; all reads go
/// through expiry eviction, so an expired token behaves exactly like an
/// absent one (including removal of the persisted copy).
#[derive(Debug)]
pub struct AuthSession<S: StateStorage> {
    storage: S,
    token: Option<AuthToken>,
}

impl<S: StateStorage> AuthSession<S> {
    /// Initialize the session from whatever the storage holds.
    pub async fn restore(storage: S) -> Self {
        let token = match storage.load_token().await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("failed to load persisted token, starting unauthenticated: {e}");
                None
            }
        };
        Self { storage, token }
    }

    /// The current token, or `None` when absent or expired.
    ///
    /// An expired token is evicted here, together with its persisted copy.
    pub async fn current_token(&mut self) -> Option<AuthToken> {
        self.evict_if_expired().await;
        self.token.clone()
    }

    /// Whether a token is present and unexpired.
    pub async fn is_valid(&mut self) -> bool {
        self.current_token().await.is_some()
    }

    /// Consume the parameters of an authorization redirect fragment.
    ///
    /// Expects `access_token` and `expires_in` (seconds); computes the
    /// absolute expiry, stores the token, and persists it. Clearing the
    /// fragment from the visible location is the host's responsibility.
    pub async fn consume_authorization_fragment(
        &mut self,
        params: &HashMap<String, String>,
    ) -> Result<AuthToken> {
        let access_token = params
            .get("access_token")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| QuizlistError::Auth("redirect fragment missing access_token".into()))?;
        let expires_in: i64 = params
            .get("expires_in")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                QuizlistError::Auth("redirect fragment missing or invalid expires_in".into())
            })?;

        let token = AuthToken {
            access_token: access_token.clone(),
            expires_at_epoch_ms: Utc::now().timestamp_millis() + expires_in * 1000,
        };
        self.storage.save_token(&token).await?;
        log::info!("authorization complete, token valid for {expires_in}s");
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Drop the token and its persisted copy.
    pub async fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.storage.clear_token().await
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    async fn evict_if_expired(&mut self) {
        let now = Utc::now().timestamp_millis();
        if let Some(token) = &self.token {
            if !token.is_valid_at(now) {
                log::debug!("access token expired, evicting");
                self.token = None;
                if let Err(e) = self.storage.clear_token().await {
                    log::warn!("failed to evict persisted token: {e}");
                }
            }
        }
    }
}

/// Build the authorization redirect URL for the implicit grant.
///
/// The host navigates the user to this URL; control leaves the process and
/// comes back through the redirect target's URL fragment.
pub fn authorization_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{AUTH_ENDPOINT}?client_id={}&redirect_uri={}&response_type=token&scope={}&include_granted_scopes=true&state={}",
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(YOUTUBE_READONLY_SCOPE),
        urlencoding::encode(state),
    )
}

/// Parse a redirect URL fragment (`access_token=...&expires_in=3600`) into
/// key/value pairs. A leading `#` is tolerated.
pub fn parse_fragment(fragment: &str) -> HashMap<String, String> {
    fragment
        .trim_start_matches('#')
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((
                urlencoding::decode(key).ok()?.into_owned(),
                urlencoding::decode(value).ok()?.into_owned(),
            ))
        })
        .collect()
}
