//! The compact phase token.
//!
//! A phase is identified by season, year and phase type, rendered as
//! `S1901M`, `F1901R`, `W1901A`. Tokens order chronologically: by year,
//! then season, then phase type.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::enums::{PhaseType, Season};
use crate::error::ParseError;

/// Identifies one phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhaseToken {
    /// Calendar year (1901 for the opening phase).
    pub year: u16,
    /// Season within the year.
    pub season: Season,
    /// Kind of phase.
    pub phase_type: PhaseType,
}

impl PhaseToken {
    /// Year of the opening phase in the classic scenario.
    pub const OPENING_YEAR: u16 = 1901;

    /// Construct a token from its parts.
    pub const fn new(season: Season, year: u16, phase_type: PhaseType) -> Self {
        Self {
            year,
            season,
            phase_type,
        }
    }

    /// `S1901M`, the first phase of a classic match.
    pub const fn opening() -> Self {
        Self::new(Season::Spring, Self::OPENING_YEAR, PhaseType::Movement)
    }

    /// Whether press is exchanged in this phase.
    pub fn is_movement(self) -> bool {
        self.phase_type == PhaseType::Movement
    }

    /// Long-form rendering, e.g. `SPRING 1901 MOVEMENT`.
    pub fn long_name(self) -> String {
        format!(
            "{} {} {}",
            self.season.long_name(),
            self.year,
            self.phase_type.long_name()
        )
    }
}

impl fmt::Display for PhaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.season.letter(),
            self.year,
            self.phase_type.letter()
        )
    }
}

impl FromStr for PhaseToken {
    type Err = ParseError;

    /// Accepts the compact form (`S1901M`) or the long form
    /// (`SPRING 1901 MOVEMENT`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseError::MalformedPhase(s.to_owned());
        let trimmed = s.trim();

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if let [season, year, phase_type] = parts.as_slice() {
            let season = Season::parse_token(season).ok_or_else(malformed)?;
            let year = year.parse::<u16>().map_err(|_bad| malformed())?;
            let phase_type = PhaseType::parse_token(phase_type).ok_or_else(malformed)?;
            return Ok(Self::new(season, year, phase_type));
        }

        let mut chars = trimmed.chars();
        let first = chars.next().ok_or_else(malformed)?;
        let last = chars.next_back().ok_or_else(malformed)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let season = Season::parse_token(&first.to_string()).ok_or_else(malformed)?;
        let phase_type = PhaseType::parse_token(&last.to_string()).ok_or_else(malformed)?;
        let year = digits.parse::<u16>().map_err(|_bad| malformed())?;
        Ok(Self::new(season, year, phase_type))
    }
}

impl TryFrom<String> for PhaseToken {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PhaseToken> for String {
    fn from(value: PhaseToken) -> Self {
        value.to_string()
    }
}
