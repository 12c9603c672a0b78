//! Enumeration types for Entente matches.
//!
//! Every closed vocabulary the rules engine speaks in (power names, press
//! recipients, unit letters, seasons, phase-type letters) lives here as an
//! enum with a single canonical token form. Parsing is strict: an unknown
//! token is a [`ParseError`], never a silent default.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Powers
// ---------------------------------------------------------------------------

/// One of the seven great powers that compete for supply centres.
///
/// The derived ordering is alphabetical, which is also the canonical
/// enumeration order used wherever iteration order must be deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Power {
    /// Austria-Hungary.
    Austria,
    /// England.
    England,
    /// France.
    France,
    /// Germany.
    Germany,
    /// Italy.
    Italy,
    /// Russia.
    Russia,
    /// Turkey.
    Turkey,
}

impl Power {
    /// All powers in canonical order.
    pub const ALL: [Self; 7] = [
        Self::Austria,
        Self::England,
        Self::France,
        Self::Germany,
        Self::Italy,
        Self::Russia,
        Self::Turkey,
    ];

    /// The upper-case engine token for this power.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Austria => "AUSTRIA",
            Self::England => "ENGLAND",
            Self::France => "FRANCE",
            Self::Germany => "GERMANY",
            Self::Italy => "ITALY",
            Self::Russia => "RUSSIA",
            Self::Turkey => "TURKEY",
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Power {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == token)
            .ok_or_else(|| ParseError::UnknownPower(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Press recipients
// ---------------------------------------------------------------------------

/// Addressee of a press message: one power, or every power at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Recipient {
    /// Broadcast to all powers.
    All,
    /// Private message to a single power.
    Power(Power),
}

impl Recipient {
    /// Whether a message addressed to this recipient is delivered to `power`.
    pub fn includes(self, power: Power) -> bool {
        match self {
            Self::All => true,
            Self::Power(p) => p == power,
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Power(p) => p.fmt(f),
        }
    }
}

impl FromStr for Recipient {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            return Ok(Self::All);
        }
        s.parse::<Power>()
            .map(Self::Power)
            .map_err(|_unknown| ParseError::UnknownRecipient(s.to_owned()))
    }
}

impl TryFrom<String> for Recipient {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Recipient> for String {
    fn from(value: Recipient) -> Self {
        value.to_string()
    }
}

impl From<Power> for Recipient {
    fn from(value: Power) -> Self {
        Self::Power(value)
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// The two kinds of military unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitType {
    /// An army, which moves over land and can be convoyed.
    #[serde(rename = "A")]
    Army,
    /// A fleet, which moves over water and along coasts.
    #[serde(rename = "F")]
    Fleet,
}

impl UnitType {
    /// Single-letter engine token (`A` or `F`).
    pub const fn letter(self) -> char {
        match self {
            Self::Army => 'A',
            Self::Fleet => 'F',
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for UnitType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::Army),
            "F" | "f" => Ok(Self::Fleet),
            _ => Err(ParseError::UnknownUnitType(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// Season of the game year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    /// Spring: movement and its retreats.
    Spring,
    /// Fall: movement and its retreats, then supply-centre ownership updates.
    Fall,
    /// Winter: adjustments (builds and disbands).
    Winter,
}

impl Season {
    /// Single-letter phase-token prefix.
    pub const fn letter(self) -> char {
        match self {
            Self::Spring => 'S',
            Self::Fall => 'F',
            Self::Winter => 'W',
        }
    }

    /// Long-form upper-case name used by engines that spell phases out.
    pub const fn long_name(self) -> &'static str {
        match self {
            Self::Spring => "SPRING",
            Self::Fall => "FALL",
            Self::Winter => "WINTER",
        }
    }

    /// Parse either the single letter or the long-form name.
    pub fn parse_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "S" | "SPRING" => Some(Self::Spring),
            "F" | "FALL" => Some(Self::Fall),
            "W" | "WINTER" => Some(Self::Winter),
            _ => None,
        }
    }
}

/// The kind of phase, which determines what orders are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhaseType {
    /// Units hold, move, support, or convoy. Press is exchanged before
    /// orders are collected.
    Movement,
    /// Dislodged units retreat or disband.
    Retreat,
    /// Powers build or disband to match unit count to centre count.
    Adjustment,
}

impl PhaseType {
    /// Single-letter phase-token suffix.
    pub const fn letter(self) -> char {
        match self {
            Self::Movement => 'M',
            Self::Retreat => 'R',
            Self::Adjustment => 'A',
        }
    }

    /// Long-form upper-case name.
    pub const fn long_name(self) -> &'static str {
        match self {
            Self::Movement => "MOVEMENT",
            Self::Retreat => "RETREATS",
            Self::Adjustment => "ADJUSTMENTS",
        }
    }

    /// Parse either the single letter or a long-form name.
    ///
    /// Engines disagree on singular versus plural, so both are accepted.
    pub fn parse_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "M" | "MOVEMENT" | "MOVEMENTS" => Some(Self::Movement),
            "R" | "RETREAT" | "RETREATS" => Some(Self::Retreat),
            "A" | "ADJUSTMENT" | "ADJUSTMENTS" | "BUILD" | "BUILDS" => Some(Self::Adjustment),
            _ => None,
        }
    }
}
