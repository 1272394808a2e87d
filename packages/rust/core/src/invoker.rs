//! The model invocation boundary.
//!
//! The reducer only needs `(model, prompt) → (payload, cost)`. Payloads follow
//! the OpenAI chat-completions shape; the answer is the first choice's message
//! content.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use treesum_shared::{Result, SynthesisError};

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// A chat-completions response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    /// Billed cost in USD, when the service reports it (OpenRouter does).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl ChatCompletion {
    /// A single-choice assistant response carrying `text`.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message: ChatMessage {
                    role: "assistant".into(),
                    content: Some(text.into()),
                },
                finish_reason: Some("stop".into()),
            }],
            ..Default::default()
        }
    }

    /// The answer text: `choices[0].message.content`.
    pub fn primary_text(&self) -> Result<&str> {
        let choice = self
            .choices
            .first()
            .ok_or_else(|| SynthesisError::malformed("response has no choices"))?;

        choice
            .message
            .content
            .as_deref()
            .ok_or_else(|| SynthesisError::malformed("first choice has no message content"))
    }
}

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

/// One completed model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub payload: ChatCompletion,
    /// Cost charged for this call.
    pub cost: f64,
}

/// Sends a rendered prompt to a text-generation service.
///
/// Implementations must return an error on transport, authentication, or
/// quota failures rather than an empty payload. Retries, if any, belong here
/// and not in the reducer.
pub trait Invoker: Send + Sync {
    fn invoke(&self, model: &str, prompt: &str) -> Result<Invocation>;
}

impl<T: Invoker + ?Sized> Invoker for &T {
    fn invoke(&self, model: &str, prompt: &str) -> Result<Invocation> {
        (**self).invoke(model, prompt)
    }
}

impl<T: Invoker + ?Sized> Invoker for Box<T> {
    fn invoke(&self, model: &str, prompt: &str) -> Result<Invocation> {
        (**self).invoke(model, prompt)
    }
}

impl<T: Invoker + ?Sized> Invoker for Arc<T> {
    fn invoke(&self, model: &str, prompt: &str) -> Result<Invocation> {
        (**self).invoke(model, prompt)
    }
}

// ---------------------------------------------------------------------------
// EchoInvoker
// ---------------------------------------------------------------------------

/// Offline invoker for dry runs: answers describe the prompt, cost is zero.
#[derive(Debug, Default)]
pub struct EchoInvoker {
    calls: AtomicUsize,
}

impl EchoInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Invoker for EchoInvoker {
    fn invoke(&self, model: &str, prompt: &str) -> Result<Invocation> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let text = format!(
            "[{model} #{n}] {} prompt chars, {} lines",
            prompt.chars().count(),
            prompt.lines().count()
        );
        Ok(Invocation {
            payload: ChatCompletion::from_text(text),
            cost: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_text_reads_first_choice() {
        let json = r#"{
            "id": "gen-1",
            "model": "openai/gpt-4o-mini",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12, "cost": 0.0001}
        }"#;
        let payload: ChatCompletion = serde_json::from_str(json).unwrap();
        assert_eq!(payload.primary_text().unwrap(), "first");
        assert_eq!(payload.usage.unwrap().cost, Some(0.0001));
    }

    #[test]
    fn missing_choices_is_malformed() {
        let payload: ChatCompletion = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = payload.primary_text().unwrap_err();
        assert!(matches!(err, SynthesisError::MalformedResponse { .. }));
    }

    #[test]
    fn null_content_is_malformed() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let payload: ChatCompletion = serde_json::from_str(json).unwrap();
        let err = payload.primary_text().unwrap_err();
        assert!(err.to_string().contains("no message content"));
    }

    #[test]
    fn from_text_round_trips_through_primary_text() {
        let payload = ChatCompletion::from_text("hello");
        assert_eq!(payload.primary_text().unwrap(), "hello");
    }

    #[test]
    fn echo_invoker_is_free_and_counts_calls() {
        let echo = EchoInvoker::new();
        let a = echo.invoke("m", "one\ntwo").unwrap();
        let b = (&echo).invoke("m", "three").unwrap();
        assert_eq!(a.cost, 0.0);
        assert_eq!(a.payload.primary_text().unwrap(), "[m #1] 7 prompt chars, 2 lines");
        assert!(b.payload.primary_text().unwrap().starts_with("[m #2]"));
        assert_eq!(echo.calls(), 2);
    }
}
