//! Shared types, error model, and configuration for treesum.
//!
//! This crate is the foundation depended on by all other treesum crates.
//! It provides:
//! - [`SynthesisError`] — the unified error type
//! - Report types ([`SynthesisReport`], [`RoundSummary`], [`RoundKind`])
//! - Configuration ([`AppConfig`], [`SynthesizerConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ModelPricing, OpenRouterConfig, SynthesizerConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, SynthesisError};
pub use types::{RoundKind, RoundSummary, SynthesisReport};
