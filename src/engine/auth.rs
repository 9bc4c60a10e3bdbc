use super::http_client::send;
use super::normalize::problem_from_response;
use super::traits::EngineResult;
use crate::problem::ProblemDetails;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const TOKEN_PATH: &str = "/archivist/iam/v1/appidp/token";
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 300;
/// Longer lifetimes are treated as this long.
const MAX_TOKEN_LIFETIME_SECS: u64 = 24 * 60 * 60;
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Client-credentials bearer token source with a single cached token.
pub struct TokenSource {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(client: Client, base_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            client,
            token_url: format!("{}{TOKEN_PATH}", base_url.trim_end_matches('/')),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, fetching a new one if none is cached or the
    /// cached one is about to expire.
    pub async fn bearer(&self) -> EngineResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() + EXPIRY_MARGIN < token.expires_at
        {
            return Ok(token.value.clone());
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self) -> EngineResult<CachedToken> {
        tracing::debug!(url = %self.token_url, "requesting access token");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let reply = send(self.client.post(&self.token_url).form(&form)).await?;
        if !reply.is_success() {
            return Err(problem_from_response(reply.status, &reply.body));
        }

        let token: TokenResponse = serde_json::from_slice(&reply.body)
            .map_err(|e| ProblemDetails::malformed(format!("token response: {e}")))?;
        let lifetime = token
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
            .min(MAX_TOKEN_LIFETIME_SECS);
        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(lifetime))
            .unwrap_or(now);
        Ok(CachedToken {
            value: token.access_token,
            expires_at,
        })
    }
}
