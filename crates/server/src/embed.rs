//! Data-export dashboard embed client.
//!
//! Each data-export page view requests a fresh signed embed URL from the
//! analytics provider. Missing credentials is an expected deployment state
//! (local development), so it is a distinct error variant the handler
//! degrades on instead of failing the page.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct EmbedConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub api_url: String,
    pub account_id: String,
    pub dashboard_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embed credentials not configured")]
    MissingCredentials,
    #[error("embed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embed service returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Deserialize)]
struct EmbedUrlResponse {
    embed_url: String,
}

/// How long a fetched embed URL stays valid, in minutes.
const SESSION_LIFETIME_MINUTES: u32 = 100;

#[derive(Clone)]
pub struct EmbedClient {
    client: reqwest::Client,
    config: EmbedConfig,
}

impl EmbedClient {
    pub fn new(config: EmbedConfig) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client, config })
    }

    /// Request a fresh signed embed URL for the data-export dashboard.
    pub async fn fetch_embed_url(&self) -> Result<String, EmbedError> {
        let (Some(key_id), Some(secret)) = (
            self.config.access_key_id.as_deref(),
            self.config.secret_access_key.as_deref(),
        ) else {
            return Err(EmbedError::MissingCredentials);
        };

        let url = format!(
            "{}/dashboards/{}/embed-url",
            self.config.api_url.trim_end_matches('/'),
            self.config.dashboard_id
        );

        let resp = self
            .client
            .post(&url)
            .header("x-access-key-id", key_id)
            .header("x-secret-access-key", secret)
            .json(&serde_json::json!({
                "account_id": self.config.account_id,
                "session_lifetime_minutes": SESSION_LIFETIME_MINUTES,
                "undo_redo_disabled": true,
                "reset_disabled": true,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedUrlResponse = resp.json().await?;
        Ok(parsed.embed_url)
    }
}
