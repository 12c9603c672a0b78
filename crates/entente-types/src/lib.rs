//! Shared type definitions for Entente matches.
//!
//! This crate is the single source of truth for the data model shared by
//! the rules engine facade, the orchestration core, and the decision-makers.
//! Raw engine tokens (power names, phase strings, unit letters) are parsed
//! into the closed types defined here and never travel further as strings.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for match identifiers
//! - [`enums`] -- Powers, press recipients, unit types, seasons, phase types
//! - [`phase`] -- The compact [`PhaseToken`] (`S1901M`)
//! - [`structs`] -- Locations, units, board snapshots, press messages
//! - [`actions`] -- Order strings and the per-location legal-action catalog
//! - [`view`] -- The per-power [`ActorView`] handed to decision-makers
//! - [`error`] -- [`ParseError`] for rejected tokens

pub mod actions;
pub mod enums;
pub mod error;
pub mod ids;
pub mod phase;
pub mod structs;
pub mod view;

// Re-export all public types at crate root for convenience.
pub use actions::{LegalActions, Order};
pub use enums::{PhaseType, Power, Recipient, Season, UnitType};
pub use error::ParseError;
pub use ids::MatchId;
pub use phase::PhaseToken;
pub use structs::{BoardSnapshot, Location, PowerState, PressDraft, PressMessage, Unit};
pub use view::ActorView;
