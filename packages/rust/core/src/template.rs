//! Prompt templates with named `{slot}` placeholders.
//!
//! `{{` and `}}` render as literal braces. A template must use every slot it
//! declares and no others.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use treesum_shared::{Result, SynthesisError};

/// Slots of the question-answering template.
pub const QA_SLOTS: &[&str] = &["question", "context"];

/// Slots of the summary template.
pub const SUMMARY_SLOTS: &[&str] = &["question", "answers"];

/// Default template for answering from a batch of passages.
pub const DEFAULT_QA_PROMPT: &str = "
Below is a question:
-----------------------------------------------------------
{question}
-----------------------------------------------------------

Context information is below:
-----------------------------------------------------------
{context}
-----------------------------------------------------------

Assuming no prior knowledge and based on the context information ONLY,
please answer the question.
Briefly justify your answer in one or two sentences.
";

/// Default template for merging a batch of earlier answers.
pub const DEFAULT_SUMMARY_PROMPT: &str = "
Below is a question:
-----------------------------------------------------------
{question}
-----------------------------------------------------------

We already have several existing answers, each of which is
concluded based on partial and distinct context information:
-----------------------------------------------------------
{answers}
-----------------------------------------------------------

Assuming no prior knowledge and based on these answers ONLY,
please answer the question.
Briefly justify your answer in one or two sentences.
";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex")
});

/// A validated prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
    slots: &'static [&'static str],
}

impl PromptTemplate {
    /// Validate `text` against the expected slot set.
    pub fn new(text: impl Into<String>, slots: &'static [&'static str]) -> Result<Self> {
        let text = text.into();

        let found: BTreeSet<&str> = PLACEHOLDER_RE
            .captures_iter(&text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        if let Some(unknown) = found.iter().find(|name| !slots.contains(*name)) {
            return Err(SynthesisError::config(format!(
                "prompt template uses unknown slot {{{unknown}}} (expected {})",
                describe(slots)
            )));
        }

        if let Some(missing) = slots.iter().find(|name| !found.contains(*name)) {
            return Err(SynthesisError::config(format!(
                "prompt template is missing slot {{{missing}}} (expected {})",
                describe(slots)
            )));
        }

        Ok(Self { text, slots })
    }

    /// Question-answering template (`{question}`, `{context}`).
    pub fn qa(text: impl Into<String>) -> Result<Self> {
        Self::new(text, QA_SLOTS)
    }

    /// Summary template (`{question}`, `{answers}`).
    pub fn summary(text: impl Into<String>) -> Result<Self> {
        Self::new(text, SUMMARY_SLOTS)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn slots(&self) -> &'static [&'static str] {
        self.slots
    }

    /// Substitute slot values. Substituted text is not scanned again.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.text, |caps: &Captures<'_>| match caps.get(1) {
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
                Some(name) => values
                    .iter()
                    .find(|(slot, _)| *slot == name.as_str())
                    .map(|(_, value)| (*value).to_string())
                    .unwrap_or_else(|| caps[0].to_string()),
            })
            .into_owned()
    }
}

fn describe(slots: &[&str]) -> String {
    slots
        .iter()
        .map(|s| format!("{{{s}}}"))
        .collect::<Vec<_>>()
        .join(", ")
}
