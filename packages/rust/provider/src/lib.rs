//! OpenRouter-backed [`Invoker`] for treesum.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint with a blocking
//! HTTP client. The cost of a call is the `usage.cost` reported by OpenRouter,
//! falling back to the configured per-model token prices.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use treesum_core::{ChatCompletion, Invocation, Invoker, Usage};
use treesum_shared::{AppConfig, ModelPricing, Result, SynthesisError, resolve_api_key};

/// User agent sent with every request.
const USER_AGENT: &str = concat!("treesum/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 1],
    usage: UsageAccounting,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Asks OpenRouter to include the billed cost in `usage`.
#[derive(Debug, Serialize)]
struct UsageAccounting {
    include: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// OpenRouterInvoker
// ---------------------------------------------------------------------------

/// Blocking chat-completions client.
#[derive(Debug)]
pub struct OpenRouterInvoker {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    pricing: BTreeMap<String, ModelPricing>,
}

impl OpenRouterInvoker {
    /// Create a client for `base_url` (e.g. `https://openrouter.ai/api/v1`).
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                SynthesisError::invocation(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            pricing: BTreeMap::new(),
        })
    }

    /// Build from the `[openrouter]` and `[pricing]` config sections.
    ///
    /// Fails if the API key env var is unset.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        let invoker = Self::new(
            &config.openrouter.base_url,
            Some(api_key),
            Duration::from_secs(config.openrouter.timeout_secs),
        )?;
        Ok(invoker.with_pricing(config.pricing.clone()))
    }

    /// Token prices used when the service does not report a cost.
    pub fn with_pricing(mut self, pricing: BTreeMap<String, ModelPricing>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn cost_of(&self, model: &str, usage: Option<&Usage>) -> f64 {
        let Some(usage) = usage else {
            warn!(model, "response carries no usage, charging 0");
            return 0.0;
        };

        if let Some(cost) = usage.cost {
            return cost;
        }

        match self.pricing.get(model) {
            Some(pricing) => pricing.cost(usage.prompt_tokens, usage.completion_tokens),
            None => {
                warn!(model, "no reported cost and no pricing configured, charging 0");
                0.0
            }
        }
    }
}

impl Invoker for OpenRouterInvoker {
    #[instrument(skip_all, fields(model = %model, prompt_len = prompt.len()))]
    fn invoke(&self, model: &str, prompt: &str) -> Result<Invocation> {
        let request = ChatRequest {
            model,
            messages: [RequestMessage {
                role: "user",
                content: prompt,
            }],
            usage: UsageAccounting { include: true },
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().map_err(|e| {
            SynthesisError::invocation(format!("request to {} failed: {e}", self.endpoint))
        })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SynthesisError::invocation(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        // OpenRouter may report mid-generation failures with a 200 status.
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
            return Err(SynthesisError::invocation(format!(
                "service error{}: {}",
                envelope
                    .error
                    .code
                    .map(|c| format!(" ({c})"))
                    .unwrap_or_default(),
                envelope
                    .error
                    .message
                    .unwrap_or_else(|| "unknown error".into())
            )));
        }

        let payload: ChatCompletion = serde_json::from_str(&body).map_err(|e| {
            SynthesisError::malformed(format!(
                "invalid chat completion body: {e} (got: {})",
                body.chars().take(200).collect::<String>()
            ))
        })?;

        let cost = self.cost_of(model, payload.usage.as_ref());
        debug!(status = %status, cost, "model call finished");

        Ok(Invocation { payload, cost })
    }
}

/// Map a non-2xx response to an invocation error.
fn status_error(status: StatusCode, body: &str) -> SynthesisError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.trim().to_string());

    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "authentication rejected",
        StatusCode::PAYMENT_REQUIRED => "insufficient credits",
        StatusCode::TOO_MANY_REQUESTS => "rate limited",
        s if s.is_server_error() => "service unavailable",
        _ => "request rejected",
    };

    SynthesisError::invocation(format!("{kind} (HTTP {status}): {detail}"))
}
