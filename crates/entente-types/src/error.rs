//! Error type for token parsing.
//!
//! Every raw string that crosses the rules-engine boundary is parsed into a
//! typed value; [`ParseError`] reports the token that could not be mapped.

/// A raw token could not be parsed into its typed representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The token is not one of the seven power names.
    #[error("unknown power '{0}'")]
    UnknownPower(String),

    /// The token is neither a power name nor `ALL`.
    #[error("unknown press recipient '{0}'")]
    UnknownRecipient(String),

    /// The token is not a unit-type letter (`A` or `F`).
    #[error("unknown unit type '{0}'")]
    UnknownUnitType(String),

    /// The token is not a phase token such as `S1901M`.
    #[error("malformed phase token '{0}'")]
    MalformedPhase(String),
}
