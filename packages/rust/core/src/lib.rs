//! Tree-reduction response synthesis for treesum.
//!
//! This crate answers a question over more passages than fit into one model
//! context: passages are answered batch by batch, and the partial answers are
//! batched and summarized again, round after round, until one answer remains.

pub mod batching;
pub mod invoker;
pub mod synthesizer;
pub mod template;

pub use invoker::{ChatCompletion, ChatMessage, Choice, EchoInvoker, Invocation, Invoker, Usage};
pub use synthesizer::{
    SilentProgress, SynthesisProgress, SynthesizerOptions, TreeSummarizer,
};
pub use template::{DEFAULT_QA_PROMPT, DEFAULT_SUMMARY_PROMPT, PromptTemplate};
