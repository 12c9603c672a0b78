//! Board and press data structures.
//!
//! The board snapshot is the read-only picture of a match at one phase: for
//! every power its owned supply centres and its units. Press messages are
//! the diplomatic log, stored in total send order and filtered per power.

use core::borrow::Borrow;
use core::fmt;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Power, Recipient, UnitType};
use crate::phase::PhaseToken;

// ---------------------------------------------------------------------------
// Locations and units
// ---------------------------------------------------------------------------

/// A map location token such as `PAR`, `ENG`, or `STP/NC`.
///
/// The part before a `/` is the province; the optional suffix names a coast.
/// Tokens are stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    /// Build a location from any token, normalising to upper case.
    pub fn new(token: impl Into<String>) -> Self {
        let mut token = token.into();
        token.make_ascii_uppercase();
        Self(token.trim().to_owned())
    }

    /// The full token, including any coast suffix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The province part of the token (`STP/NC` becomes `STP`).
    pub fn province(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(p, _)| p)
    }

    /// The coast suffix, if any (`STP/NC` gives `NC`).
    pub fn coast(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, c)| c)
    }

    /// The same location with the coast suffix removed.
    pub fn without_coast(&self) -> Self {
        Self(self.province().to_owned())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Location {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A unit on the board.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Army or fleet.
    pub unit_type: UnitType,
    /// Where the unit stands (with coast for fleets on split coasts).
    pub location: Location,
    /// Whether the unit was dislodged and must retreat or disband.
    pub dislodged: bool,
}

impl Unit {
    /// A unit in its normal (not dislodged) state.
    pub fn new(unit_type: UnitType, location: impl Into<Location>) -> Self {
        Self {
            unit_type,
            location: location.into(),
            dislodged: false,
        }
    }
}

impl fmt::Display for Unit {
    /// Renders `A PAR`, or `*A PAR` for a dislodged unit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dislodged {
            f.write_str("*")?;
        }
        write!(f, "{} {}", self.unit_type, self.location)
    }
}

// ---------------------------------------------------------------------------
// Board snapshot
// ---------------------------------------------------------------------------

/// Holdings of one power.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerState {
    /// Supply centres owned, sorted.
    pub centers: Vec<Location>,
    /// Units on the board, including dislodged ones awaiting retreat.
    pub units: Vec<Unit>,
}

impl PowerState {
    /// Number of owned supply centres.
    pub fn center_count(&self) -> usize {
        self.centers.len()
    }

    /// Number of units (dislodged units included).
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// A power is still in the match while it owns a centre or a unit.
    pub fn is_active(&self) -> bool {
        !self.centers.is_empty() || !self.units.is_empty()
    }

    /// Units keyed by location.
    ///
    /// A dislodged unit shares its province with the unit that dislodged it,
    /// but never with another unit of the same power, so the map is lossless.
    pub fn units_by_location(&self) -> BTreeMap<Location, UnitType> {
        self.units
            .iter()
            .map(|u| (u.location.clone(), u.unit_type))
            .collect()
    }

    /// Number of dislodged units awaiting a retreat order.
    pub fn dislodged_count(&self) -> usize {
        self.units.iter().filter(|u| u.dislodged).count()
    }
}

/// Read-only picture of the board at one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// The phase this snapshot describes.
    pub phase: PhaseToken,
    /// Whether the rules engine has declared the match over.
    pub done: bool,
    /// Holdings of every power in the match, eliminated ones included.
    pub powers: BTreeMap<Power, PowerState>,
    /// Supply centres no power owns yet.
    pub unowned_centers: Vec<Location>,
    /// The most recent press messages, oldest first.
    pub recent_press: Vec<PressMessage>,
}

impl BoardSnapshot {
    /// Calendar year of the snapshot's phase.
    pub const fn year(&self) -> u16 {
        self.phase.year
    }

    /// Holdings of one power.
    pub fn power(&self, power: Power) -> Option<&PowerState> {
        self.powers.get(&power)
    }

    /// Supply-centre count for every power.
    pub fn center_counts(&self) -> BTreeMap<Power, usize> {
        self.powers
            .iter()
            .map(|(p, s)| (*p, s.center_count()))
            .collect()
    }

    /// Unit count for every power.
    pub fn unit_counts(&self) -> BTreeMap<Power, usize> {
        self.powers
            .iter()
            .map(|(p, s)| (*p, s.unit_count()))
            .collect()
    }

    /// Powers that still own a centre or a unit, in canonical order.
    pub fn active_powers(&self) -> Vec<Power> {
        self.powers
            .iter()
            .filter(|(_, s)| s.is_active())
            .map(|(p, _)| *p)
            .collect()
    }

    /// The power with the most supply centres. Ties go to the earlier power
    /// in canonical order.
    pub fn leader(&self) -> Option<(Power, usize)> {
        self.powers
            .iter()
            .map(|(p, s)| (*p, s.center_count()))
            .fold(None, |best, (p, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((p, n)),
            })
    }
}

// ---------------------------------------------------------------------------
// Press
// ---------------------------------------------------------------------------

/// One delivered press message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressMessage {
    /// Position in the match-wide send order, starting at zero.
    pub seq: u64,
    /// Phase during which the message was sent.
    pub phase: PhaseToken,
    /// Sending power.
    pub sender: Power,
    /// Addressee.
    pub recipient: Recipient,
    /// Message body, already trimmed and length-checked.
    pub text: String,
    /// Wall-clock send time.
    pub sent_at: DateTime<Utc>,
}

impl PressMessage {
    /// A power sees messages it sent, messages addressed to it, and
    /// broadcasts.
    pub fn visible_to(&self, power: Power) -> bool {
        self.sender == power || self.recipient.includes(power)
    }
}

/// A message a decision-maker wants to send, before it is sequenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressDraft {
    /// Addressee.
    #[serde(rename = "to")]
    pub recipient: Recipient,
    /// Message body as produced by the decision-maker.
    pub text: String,
}

impl PressDraft {
    /// Build a draft.
    pub fn new(recipient: impl Into<Recipient>, text: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(sender: Power, recipient: Recipient) -> PressMessage {
        PressMessage {
            seq: 0,
            phase: PhaseToken::opening(),
            sender,
            recipient,
            text: "hello".to_owned(),
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn location_splits_coast() {
        let stp = Location::new("stp/nc");
        assert_eq!(stp.as_str(), "STP/NC");
        assert_eq!(stp.province(), "STP");
        assert_eq!(stp.coast(), Some("NC"));
        assert_eq!(Location::new("PAR").coast(), None);
        assert_eq!(stp.without_coast(), Location::new("STP"));
    }

    #[test]
    fn dislodged_unit_renders_with_star() {
        let mut unit = Unit::new(UnitType::Army, "MUN");
        assert_eq!(unit.to_string(), "A MUN");
        unit.dislodged = true;
        assert_eq!(unit.to_string(), "*A MUN");
    }

    #[test]
    fn press_visibility() {
        let private = message(Power::France, Recipient::Power(Power::England));
        assert!(private.visible_to(Power::France));
        assert!(private.visible_to(Power::England));
        assert!(!private.visible_to(Power::Germany));

        let broadcast = message(Power::France, Recipient::All);
        assert!(Power::ALL.iter().all(|p| broadcast.visible_to(*p)));
    }

    #[test]
    fn leader_prefers_canonical_order_on_ties() {
        let mut powers = BTreeMap::new();
        for p in Power::ALL {
            powers.insert(p, PowerState::default());
        }
        powers.get_mut(&Power::Russia).unwrap().centers = vec!["MOS".into(), "WAR".into()];
        powers.get_mut(&Power::England).unwrap().centers = vec!["LON".into(), "EDI".into()];
        let snapshot = BoardSnapshot {
            phase: PhaseToken::opening(),
            done: false,
            powers,
            unowned_centers: Vec::new(),
            recent_press: Vec::new(),
        };
        assert_eq!(snapshot.leader(), Some((Power::England, 2)));
        assert_eq!(snapshot.active_powers(), vec![Power::England, Power::Russia]);
    }

    #[test]
    fn press_draft_uses_to_field() {
        let draft: PressDraft =
            serde_json::from_str(r#"{"to": "ALL", "text": "peace"}"#).unwrap();
        assert_eq!(draft.recipient, Recipient::All);
    }
}
