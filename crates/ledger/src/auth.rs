//! Access tokens for the ledger JSON API.
//!
//! Tokens are obtained from the identity provider with the OAuth2
//! client-credentials grant and cached per acting-party set until shortly
//! before expiry. A `static-token` mode carries a pre-issued token for
//! local sandbox ledgers that skip the identity provider entirely.

use std::collections::HashMap;
use std::sync::RwLock;

use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::LedgerError;
use crate::Party;

/// Refresh tokens this many seconds before the provider-reported expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    ClientCredentials(ClientCredentialsConfig),
    StaticToken { token: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentialsConfig {
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn expires_soon(&self) -> bool {
        Utc::now() + Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

pub struct AuthService {
    http: reqwest::Client,
    config: AuthConfig,
    tokens: RwLock<HashMap<Vec<Party>, CachedToken>>,
}

impl AuthService {
    pub fn new(http: reqwest::Client, config: AuthConfig) -> Self {
        Self {
            http,
            config,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Bearer token authorizing commands submitted on behalf of `act_as`.
    ///
    /// The cache key is the sorted, deduplicated party set, so the same
    /// parties in any order share one token.
    ///
    /// # Errors
    /// Returns `LedgerError::Auth` when the token endpoint rejects the
    /// request, `LedgerError::Http` on transport failures.
    pub async fn bearer_for(&self, act_as: &[Party]) -> Result<String, LedgerError> {
        let credentials = match &self.config {
            AuthConfig::StaticToken { token } => return Ok(token.clone()),
            AuthConfig::ClientCredentials(credentials) => credentials,
        };

        let mut key: Vec<Party> = act_as.to_vec();
        key.sort();
        key.dedup();

        {
            let tokens = match self.tokens.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(cached) = tokens.get(&key) {
                if !cached.expires_soon() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let fetched = self.request_token(credentials, &key).await?;
        let access_token = fetched.access_token.clone();
        let mut tokens = match self.tokens.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tokens.insert(key, fetched);
        Ok(access_token)
    }

    async fn request_token(
        &self,
        config: &ClientCredentialsConfig,
        act_as: &[Party],
    ) -> Result<CachedToken, LedgerError> {
        let parties = act_as
            .iter()
            .map(Party::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let credentials =
            BASE64_STANDARD.encode(format!("{}:{}", config.client_id, config.client_secret));
        let body = format!(
            "grant_type=client_credentials&audience={}&act_as={}",
            urlencoding::encode(&config.audience),
            urlencoding::encode(&parties)
        );

        debug!(act_as = %parties, "requesting ledger access token");

        let response = self
            .http
            .post(config.token_url.clone())
            .header("Authorization", format!("Basic {credentials}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await?;
            return Err(LedgerError::Auth { status, message });
        }

        let token: TokenResponse = response.json().await?;
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}
