//! Rules-engine boundary and reference adjudicator for Entente matches.
//!
//! The orchestration core talks to any game-rules engine through the
//! [`RulesEngine`] trait. [`StandardEngine`] is a complete in-memory
//! engine for the classic seven-power map, used for self-play and tests.
//!
//! # Modules
//!
//! - [`engine`] -- The [`RulesEngine`] trait
//! - [`standard`] -- [`StandardEngine`]: phase cycle, option generation,
//!   retreats, builds and disbands
//! - [`adjudicator`] -- Movement resolution
//! - [`order`] -- Order grammar
//! - [`map`] -- Classic map data
//! - [`error`] -- [`RulesError`]

pub mod adjudicator;
pub mod engine;
pub mod error;
pub mod map;
pub mod order;
pub mod standard;

pub use engine::RulesEngine;
pub use error::RulesError;
pub use standard::{DEFAULT_VICTORY_CENTERS, StandardEngine};
