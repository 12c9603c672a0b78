//! LLM-backed decision-makers for Entente matches.
//!
//! [`LlmDecider`] implements the core [`DecisionMaker`] trait by rendering
//! the power's view into a prompt, asking an HTTP LLM backend for a reply
//! constrained to the legal-action set, and filtering the parsed reply
//! through the same catalog.
//!
//! # Modules
//!
//! - [`config`] -- Backend and sampling settings from the environment.
//! - [`llm`] -- OpenAI-compatible and Anthropic backends.
//! - [`prompt`] -- `minijinja` templates and phase guidance.
//! - [`schema`] -- Closed-choice JSON schemas for orders and press.
//! - [`parse`] -- Reply recovery and catalog filtering.
//! - [`decider`] -- [`LlmDecider`].
//! - [`error`] -- [`AgentError`].
//!
//! [`DecisionMaker`]: entente_core::decision::DecisionMaker
//! [`LlmDecider`]: decider::LlmDecider
//! [`AgentError`]: error::AgentError

pub mod config;
pub mod decider;
pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod schema;

pub use config::LlmConfig;
pub use decider::LlmDecider;
pub use error::AgentError;
