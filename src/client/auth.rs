//! OAuth token handling for the Gmail client.
//!
//! Two modes: a static access token (short-lived, handy for testing), or a
//! refresh token plus client credentials exchanged against the Google OAuth
//! token endpoint. Interactive consent flows are out of scope; the refresh
//! token must already exist.

use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ClientError, ConfigError};

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// OAuth credentials, built from environment variables.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

impl AuthConfig {
    /// Build from environment variables.
    ///
    /// Requires either `GMAIL_ACCESS_TOKEN`, or all of `GMAIL_REFRESH_TOKEN`,
    /// `GMAIL_CLIENT_ID`, and `GMAIL_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            access_token: lookup("GMAIL_ACCESS_TOKEN").map(SecretString::from),
            refresh_token: lookup("GMAIL_REFRESH_TOKEN").map(SecretString::from),
            client_id: lookup("GMAIL_CLIENT_ID"),
            client_secret: lookup("GMAIL_CLIENT_SECRET").map(SecretString::from),
        };

        let has_refresh_credentials = config.refresh_token.is_some()
            && config.client_id.is_some()
            && config.client_secret.is_some();

        if config.access_token.is_none() && !has_refresh_credentials {
            return Err(ConfigError::MissingRequired {
                key: "GMAIL_ACCESS_TOKEN".into(),
                hint: "Set GMAIL_ACCESS_TOKEN, or GMAIL_REFRESH_TOKEN + GMAIL_CLIENT_ID + \
                       GMAIL_CLIENT_SECRET for automatic refresh."
                    .into(),
            });
        }

        Ok(config)
    }
}

struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

/// Provides a valid bearer token, refreshing when the cached one expires.
pub struct TokenProvider {
    http: reqwest::Client,
    auth: AuthConfig,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: u64,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, auth: AuthConfig) -> Self {
        Self {
            http,
            auth,
            cached: Mutex::new(None),
        }
    }

    /// A currently-valid access token.
    pub async fn access_token(&self) -> Result<SecretString, ClientError> {
        // A statically-configured token is used as-is.
        if let Some(token) = &self.auth.access_token {
            return Ok(token.clone());
        }

        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref()
            && entry.expires_at > Instant::now()
        {
            return Ok(entry.token.clone());
        }

        let fresh = self.refresh().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh(&self) -> Result<CachedToken, ClientError> {
        let refresh_token = self
            .auth
            .refresh_token
            .as_ref()
            .ok_or_else(|| ClientError::Auth("no refresh token configured".into()))?;
        let client_id = self
            .auth
            .client_id
            .as_ref()
            .ok_or_else(|| ClientError::Auth("no client id configured".into()))?;
        let client_secret = self
            .auth
            .client_secret
            .as_ref()
            .ok_or_else(|| ClientError::Auth("no client secret configured".into()))?;

        debug!("Refreshing Gmail access token");

        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth(format!(
                "token refresh failed ({status}): {body}"
            )));
        }

        let parsed: RefreshResponse = response.json().await?;
        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_MARGIN);

        Ok(CachedToken {
            token: SecretString::from(parsed.access_token),
            expires_at: Instant::now() + lifetime,
        })
    }
}
