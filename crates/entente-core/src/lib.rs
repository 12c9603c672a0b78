//! Board store, decision collection, and turn orchestration for Entente
//! matches.
//!
//! This crate owns the phase cycle that drives a match: gather the active
//! powers, negotiate, collect orders concurrently, validate and stage them,
//! and resolve the phase through the rules engine.
//!
//! # Modules
//!
//! - [`catalog`] -- Per-power legal-action catalogs from the engine.
//! - [`store`] -- [`BoardStore`]: snapshots, validated staging, resolution.
//! - [`view`] -- Per-power [`ActorView`] construction.
//! - [`press`] -- The append-only [`PressLog`].
//! - [`decision`] -- [`DecisionMaker`] trait, [`HoldDecider`], and
//!   [`RandomDecider`].
//! - [`collector`] -- [`DecisionCollector`]: concurrent negotiation and
//!   order rounds with per-power deadlines.
//! - [`phase`] -- One full phase and the [`TurnState`] machine.
//! - [`runner`] -- [`run_match`], the match loop.
//! - [`config`] -- Configuration loading from `entente.yaml`.
//! - [`error`] -- Store, decision, and press errors.
//!
//! [`ActorView`]: entente_types::ActorView
//! [`BoardStore`]: store::BoardStore
//! [`PressLog`]: press::PressLog
//! [`DecisionMaker`]: decision::DecisionMaker
//! [`HoldDecider`]: decision::HoldDecider
//! [`RandomDecider`]: decision::RandomDecider
//! [`DecisionCollector`]: collector::DecisionCollector
//! [`TurnState`]: phase::TurnState
//! [`run_match`]: runner::run_match

pub mod catalog;
pub mod collector;
pub mod config;
pub mod decision;
pub mod error;
pub mod phase;
pub mod press;
pub mod runner;
pub mod store;
pub mod view;
