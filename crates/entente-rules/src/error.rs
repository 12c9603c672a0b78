//! Error types for the `entente-rules` crate.
//!
//! All fallible engine operations return [`RulesError`].

use entente_types::{PhaseToken, Power};

/// Errors raised at the rules-engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// An order string does not follow the engine's order grammar.
    #[error("{power}: malformed order '{order}': {reason}")]
    MalformedOrder {
        /// The submitting power.
        power: Power,
        /// The offending order text.
        order: String,
        /// What the parser rejected.
        reason: String,
    },

    /// A well-formed order names a unit or build site the power does not
    /// control, or an instruction that does not fit the current phase.
    #[error("{power}: order '{order}' cannot be given in {phase}: {reason}")]
    NotOrderable {
        /// The submitting power.
        power: Power,
        /// The offending order text.
        order: String,
        /// The phase the order was submitted in.
        phase: PhaseToken,
        /// Why the order does not apply.
        reason: String,
    },

    /// A starting position names a location or unit placement the map does
    /// not allow.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// The match has already ended; no further phases can be processed.
    #[error("match is over")]
    MatchOver,
}
