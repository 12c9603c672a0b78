//! The per-power view handed to decision-makers.
//!
//! A view is built fresh from a snapshot each time a decision-maker is
//! consulted. It carries everything the power is entitled to see: its own
//! holdings, public centre and unit counts, its legal options, and the
//! press it sent or received.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actions::LegalActions;
use crate::enums::{Power, UnitType};
use crate::phase::PhaseToken;
use crate::structs::{BoardSnapshot, Location, PressMessage};

/// Everything one power may see when deciding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorView {
    /// The deciding power.
    pub power: Power,
    /// Current phase.
    pub phase: PhaseToken,
    /// Own units keyed by location.
    pub own_units: BTreeMap<Location, UnitType>,
    /// Own supply centres, sorted.
    pub own_centers: Vec<Location>,
    /// Own dislodged units awaiting a retreat order.
    pub dislodged: Vec<Location>,
    /// Supply-centre count for every power.
    pub center_counts: BTreeMap<Power, usize>,
    /// Unit count for every power.
    pub unit_counts: BTreeMap<Power, usize>,
    /// Legal options for this power this phase.
    pub legal_actions: LegalActions,
    /// Press visible to this power, oldest first.
    pub press_history: Vec<PressMessage>,
    /// Full public board, for decision-makers that reason globally.
    pub board: BoardSnapshot,
}

impl ActorView {
    /// Calendar year.
    pub const fn year(&self) -> u16 {
        self.phase.year
    }

    /// Own centre count minus own unit count.
    ///
    /// Positive means builds are owed in an adjustment phase; negative means
    /// disbands are owed.
    pub fn adjustment_delta(&self) -> i64 {
        let centers = i64::try_from(self.own_centers.len()).unwrap_or(i64::MAX);
        let units = i64::try_from(self.own_units.len()).unwrap_or(i64::MAX);
        centers.saturating_sub(units)
    }

    /// Other powers still in the match.
    pub fn rivals(&self) -> Vec<Power> {
        self.board
            .active_powers()
            .into_iter()
            .filter(|p| *p != self.power)
            .collect()
    }
}
