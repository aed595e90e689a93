//! Spotify OAuth: token cache file, refresh, and the one-time interactive
//! authorization flow over a loopback callback server.

use crate::error::{LyricsdError, Result};
use crate::paths;
use axum::{extract::Query, response::Html, routing::get, Router};
use rspotify::{prelude::*, scopes, AuthCodeSpotify, Credentials, OAuth, Token};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyricsd::spotify::oauth";

/// Timeout for the interactive OAuth callback (5 minutes)
const OAUTH_CALLBACK_TIMEOUT_SECS: u64 = 300;

/// Refresh the token proactively if it expires within this many seconds
const PROACTIVE_REFRESH_THRESHOLD_SECS: i64 = 60;

/// Token data as persisted to the cache file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>, // Unix timestamp
    scopes: Vec<String>,
}

impl From<&Token> for PersistedToken {
    fn from(token: &Token) -> Self {
        Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token.expires_at.map(|d| d.timestamp()),
            scopes: token.scopes.iter().cloned().collect(),
        }
    }
}

impl From<PersistedToken> for Token {
    fn from(persisted: PersistedToken) -> Self {
        Self {
            access_token: persisted.access_token,
            refresh_token: persisted.refresh_token,
            expires_at: persisted
                .expires_at
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            expires_in: chrono::TimeDelta::zero(),
            scopes: persisted.scopes.into_iter().collect(),
        }
    }
}

/// Spotify OAuth manager around an [`AuthCodeSpotify`] client.
///
/// Obtained tokens are persisted to `~/.config/lyricsd/`, so interactive
/// authorization is only needed once.
pub struct SpotifyOAuth {
    client: AuthCodeSpotify,
    token_path: PathBuf,
}

impl SpotifyOAuth {
    #[must_use]
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        let creds = Credentials::new(client_id, client_secret);
        let oauth = OAuth {
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes!("user-read-currently-playing", "user-read-playback-state"),
            ..Default::default()
        };

        Self {
            client: AuthCodeSpotify::new(creds, oauth),
            token_path: paths::token_cache_path(),
        }
    }

    /// Get the underlying Spotify client.
    #[must_use]
    pub const fn client(&self) -> &AuthCodeSpotify {
        &self.client
    }

    async fn lock_token(&self) -> Result<futures::lock::MutexGuard<'_, Option<Token>>> {
        self.client
            .token
            .lock()
            .await
            .map_err(|_| LyricsdError::AuthFailed {
                reason: "Failed to acquire token lock".to_string(),
            })
    }

    /// Make sure a usable token is in place: cached, refreshed, or obtained
    /// interactively on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the cache nor the interactive flow
    /// produces a valid token.
    pub async fn ensure_authenticated(&self) -> Result<()> {
        if self.load_cached_token().await? {
            info!(target: LOG_TARGET, "Using cached Spotify token");
            return Ok(());
        }

        info!(
            target: LOG_TARGET,
            "No valid cached token, starting interactive authorization"
        );
        self.authenticate_interactive().await
    }

    /// Refresh the access token if it is missing an expiry or about to
    /// expire. Called before every API request.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh round-trip fails.
    pub async fn ensure_fresh(&self) -> Result<()> {
        let needs_refresh = {
            let guard = self.lock_token().await?;
            match guard.as_ref().and_then(|t| t.expires_at) {
                Some(expires_at) => {
                    (expires_at - chrono::Utc::now()).num_seconds()
                        <= PROACTIVE_REFRESH_THRESHOLD_SECS
                }
                None => false,
            }
        };

        if needs_refresh {
            debug!(target: LOG_TARGET, "Access token near expiry, refreshing");
            self.refresh_token().await?;
        }
        Ok(())
    }

    /// Try to load the cached token, refreshing it if expired. Returns
    /// whether a usable token is now in place.
    async fn load_cached_token(&self) -> Result<bool> {
        if !self.token_path.exists() {
            info!(target: LOG_TARGET, "No token cache at {:?}", self.token_path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.token_path)?;
        let persisted: PersistedToken = serde_json::from_str(&content)?;
        let token = Token::from(persisted);

        if token.is_expired() {
            if token.refresh_token.is_none() {
                info!(
                    target: LOG_TARGET,
                    "Cached token expired with no refresh token, re-authorization required"
                );
                return Ok(false);
            }
            info!(target: LOG_TARGET, "Cached token expired, refreshing");
            *self.lock_token().await? = Some(token);
            return self.refresh_token().await.map(|()| true);
        }

        *self.lock_token().await? = Some(token);
        Ok(true)
    }

    async fn save_token(&self) -> Result<()> {
        let guard = self.lock_token().await?;
        if let Some(ref token) = *guard {
            let persisted = PersistedToken::from(token);
            if let Some(parent) = self.token_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.token_path, serde_json::to_string_pretty(&persisted)?)?;
            debug!(target: LOG_TARGET, "Saved Spotify token to {:?}", self.token_path);
        }
        Ok(())
    }

    async fn refresh_token(&self) -> Result<()> {
        self.client
            .refresh_token()
            .await
            .map_err(|e| LyricsdError::AuthFailed {
                reason: format!("Token refresh failed: {e}"),
            })?;
        self.save_token().await
    }

    /// Run the interactive flow: open the browser, catch the redirect on a
    /// loopback server, exchange the code for a token pair.
    async fn authenticate_interactive(&self) -> Result<()> {
        let (addr, callback_path) = parse_redirect_uri(&self.client.oauth.redirect_uri)?;

        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(tokio::sync::Mutex::new(Some(tx)));

        let app = Router::new().route(
            &callback_path,
            get(move |Query(params): Query<CallbackParams>| {
                let tx = tx.clone();
                async move { handle_callback_request(params, tx).await }
            }),
        );

        let listener =
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| LyricsdError::AuthFailed {
                    reason: format!("Failed to bind to {addr}: {e}"),
                })?;

        let auth_url = self
            .client
            .get_authorize_url(false)
            .map_err(|e| LyricsdError::AuthFailed {
                reason: format!("Failed to generate auth URL: {e}"),
            })?;

        if let Err(e) = open::that(&auth_url) {
            warn!(target: LOG_TARGET, "Could not open browser automatically: {}", e);
            info!(target: LOG_TARGET, "Open this URL to authorize:\n{}", auth_url);
        }
        info!(
            target: LOG_TARGET,
            "Waiting for authorization callback on http://{}{}", addr, callback_path
        );

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!(target: LOG_TARGET, "Callback server error: {}", e);
            }
        });

        let code = tokio::select! {
            result = rx => result.map_err(|_| LyricsdError::AuthFailed {
                reason: "Callback channel closed unexpectedly".into(),
            }),
            () = tokio::time::sleep(Duration::from_secs(OAUTH_CALLBACK_TIMEOUT_SECS)) => {
                Err(LyricsdError::AuthFailed {
                    reason: format!(
                        "OAuth callback timed out after {} minutes",
                        OAUTH_CALLBACK_TIMEOUT_SECS / 60
                    ),
                })
            }
        };
        server.abort();
        let code = code?;

        self.client
            .request_token(&code)
            .await
            .map_err(|e| LyricsdError::AuthFailed {
                reason: format!("Token exchange failed: {e}"),
            })?;
        self.save_token().await?;
        info!(target: LOG_TARGET, "Successfully authenticated with Spotify");
        Ok(())
    }
}

/// Query parameters Spotify appends to the redirect
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

async fn handle_callback_request(
    params: CallbackParams,
    tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<String>>>>,
) -> Html<&'static str> {
    if let Some(code) = params.code {
        if let Some(sender) = tx.lock().await.take() {
            let _ = sender.send(code);
        }
        Html("Authorization successful. You can close this window.")
    } else {
        if let Some(error) = params.error {
            warn!(target: LOG_TARGET, "Authorization denied: {}", error);
        }
        Html("Authorization failed. Close this window and try again.")
    }
}

fn parse_redirect_uri(redirect_uri: &str) -> Result<(SocketAddr, String)> {
    let parsed = url::Url::parse(redirect_uri).map_err(|e| LyricsdError::AuthFailed {
        reason: format!("Invalid redirect URI: {e}"),
    })?;

    let host = match parsed.host_str() {
        Some("localhost") | None => "127.0.0.1",
        Some(host) => host,
    };
    let port = parsed.port().unwrap_or(8888);
    let addr: SocketAddr =
        format!("{host}:{port}")
            .parse()
            .map_err(|e| LyricsdError::AuthFailed {
                reason: format!("Invalid redirect address: {e}"),
            })?;

    Ok((addr, parsed.path().to_string()))
}
