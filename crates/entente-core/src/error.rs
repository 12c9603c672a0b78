//! Error types for the `entente-core` crate.
//!
//! Errors split into two families. [`StoreError::InvalidActor`] and
//! [`StoreError::Resolution`] are structural and end the match.
//! [`StoreError::IllegalBatch`], [`DecisionError`] and [`PressError`] are
//! contained by the decision collector and never stop the turn loop.

use entente_rules::RulesError;
use entente_types::{Order, PhaseToken, Power};

/// Errors raised by the board store, catalog, and view builder.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The power is not part of this match.
    #[error("power {power} is not part of this match")]
    InvalidActor {
        /// The unknown power.
        power: Power,
    },

    /// A submitted batch contained orders outside the power's catalog.
    /// Nothing from the batch was staged.
    #[error("{power}: batch rejected, {} illegal order(s)", illegal.len())]
    IllegalBatch {
        /// The submitting power.
        power: Power,
        /// Every submitted order that is not in the catalog.
        illegal: Vec<Order>,
    },

    /// The rules engine failed while accepting staged orders or processing
    /// the phase.
    #[error("resolution failed in {phase}: {source}")]
    Resolution {
        /// The last phase the store knew to be valid.
        phase: PhaseToken,
        /// The engine error.
        #[source]
        source: RulesError,
    },
}

impl StoreError {
    /// Whether the error ends the match.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::IllegalBatch { .. })
    }
}

/// A decision-maker call that produced no usable contribution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// The call did not return within the per-power deadline.
    #[error("{power} timed out (deadline: {timeout_ms}ms)")]
    Timeout {
        /// The power whose call timed out.
        power: Power,
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The decision-maker returned an error.
    #[error("{power}: decision failed: {message}")]
    Failed {
        /// The power whose call failed.
        power: Power,
        /// Description of the failure.
        message: String,
    },

    /// The decision task panicked or was cancelled.
    #[error("{power}: decision task aborted")]
    Panicked {
        /// The power whose task aborted.
        power: Power,
    },
}

impl DecisionError {
    /// Shorthand for a [`DecisionError::Failed`].
    pub fn failed(power: Power, message: impl Into<String>) -> Self {
        Self::Failed {
            power,
            message: message.into(),
        }
    }

    /// The power the error concerns.
    pub const fn power(&self) -> Power {
        match self {
            Self::Timeout { power, .. } | Self::Failed { power, .. } | Self::Panicked { power } => {
                *power
            }
        }
    }
}

/// A press draft refused at the collector boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PressError {
    /// The message body exceeds the configured limit.
    #[error("{sender}: message of {length} chars exceeds limit of {limit}")]
    TooLong {
        /// The sending power.
        sender: Power,
        /// Length of the trimmed body in characters.
        length: usize,
        /// The configured limit.
        limit: usize,
    },
}
