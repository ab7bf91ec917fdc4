use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use flagboard_api::FlagContext;

use crate::FlagsError;

/// Flag service configuration, usually read from environment variables by
/// the server binary.
#[derive(Debug, Clone)]
pub struct FlagsConfig {
    /// SDK key for the remote service. `None` puts the client in offline
    /// mode: only overrides and defaults are served.
    pub sdk_key: Option<String>,
    pub base_url: String,
    pub events_url: String,
    pub timeout: Duration,
    /// Local flag values that win over remote evaluation. Loaded from the
    /// override file in development and tests.
    pub overrides: HashMap<String, bool>,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self {
            sdk_key: None,
            base_url: "https://flags.flagboard.dev/api/v1".into(),
            events_url: "https://events.flagboard.dev/api/v1".into(),
            timeout: Duration::from_secs(2),
            overrides: HashMap::new(),
        }
    }
}

#[derive(Serialize)]
struct EvalRequest<'a> {
    context: &'a FlagContext,
    default: bool,
}

#[derive(Deserialize)]
struct EvalResponse {
    value: bool,
}

#[derive(Serialize)]
struct TrackRequest<'a> {
    event: &'a str,
    context: &'a FlagContext,
}

/// Client for boolean flag evaluation and conversion tracking.
///
/// Cheap to clone; handlers share one instance through the app state.
#[derive(Clone)]
pub struct FlagsClient {
    client: reqwest::Client,
    sdk_key: Option<String>,
    base_url: String,
    events_url: String,
    overrides: Arc<HashMap<String, bool>>,
}

impl FlagsClient {
    pub fn new(config: FlagsConfig) -> Result<Self, FlagsError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            sdk_key: config.sdk_key.filter(|s| !s.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            events_url: config.events_url.trim_end_matches('/').to_string(),
            overrides: Arc::new(config.overrides),
        })
    }

    /// Offline client: serves overrides and defaults, sends nothing.
    pub fn offline(overrides: HashMap<String, bool>) -> Self {
        Self {
            client: reqwest::Client::new(),
            sdk_key: None,
            base_url: String::new(),
            events_url: String::new(),
            overrides: Arc::new(overrides),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.sdk_key.is_none()
    }

    /// Evaluate a boolean flag for a context.
    ///
    /// Resolution order: local override, then remote evaluation, then the
    /// caller's default. Remote errors are logged at warn and degrade to
    /// the default — this method cannot fail.
    pub async fn variation(&self, flag_key: &str, ctx: &FlagContext, default: bool) -> bool {
        if let Some(value) = self.overrides.get(flag_key) {
            return *value;
        }
        if self.is_offline() {
            return default;
        }
        match self.eval_remote(flag_key, ctx, default).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("flag {flag_key}: evaluation failed, using default: {e}");
                default
            }
        }
    }

    /// Record a conversion event for a context. Fire-and-forget: delivery
    /// failures are logged at warn and swallowed.
    pub async fn track(&self, event_key: &str, ctx: &FlagContext) {
        if self.is_offline() {
            tracing::debug!("flags offline, dropping event {event_key}");
            return;
        }
        if let Err(e) = self.post_event(event_key, ctx).await {
            tracing::warn!("event {event_key}: delivery failed: {e}");
        }
    }

    async fn eval_remote(
        &self,
        flag_key: &str,
        ctx: &FlagContext,
        default: bool,
    ) -> Result<bool, FlagsError> {
        let url = format!("{}/eval/{}", self.base_url, flag_key);
        let resp = self
            .authorized(self.client.post(&url))
            .json(&EvalRequest { context: ctx, default })
            .send()
            .await?;
        let parsed: EvalResponse = parse_response(resp).await?;
        Ok(parsed.value)
    }

    async fn post_event(&self, event_key: &str, ctx: &FlagContext) -> Result<(), FlagsError> {
        let url = format!("{}/track", self.events_url);
        let resp = self
            .authorized(self.client.post(&url))
            .json(&TrackRequest { event: event_key, context: ctx })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FlagsError::Api { status: status.as_u16(), body });
        }
        Ok(())
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.sdk_key {
            Some(key) => req.header("Authorization", key),
            None => req,
        }
    }
}

/// Parse an HTTP response: deserialized body on 2xx, otherwise an error
/// carrying the status and body text.
async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, FlagsError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FlagsError::Api { status: status.as_u16(), body });
    }
    Ok(resp.json().await?)
}
