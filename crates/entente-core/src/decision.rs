//! Decision-maker trait and the fixed-policy players.
//!
//! The collector presents each active power with an [`ActorView`] and
//! awaits its orders, and during movement phases its press. The
//! [`DecisionMaker`] trait abstracts who answers: a generative model, a
//! scripted bot, or a test stub. Decision-makers only read their view and
//! return values; they never touch the board or the press log.
//!
//! Two fixed policies live here:
//!
//! - [`HoldDecider`] holds every unit and stays silent.
//! - [`RandomDecider`] picks uniformly among legal options, seeded per
//!   power and phase so a match replays identically for a given seed.

use entente_types::{ActorView, Order, PhaseType, Power, PressDraft};
use futures::future::BoxFuture;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::error::DecisionError;

/// A player for one or more powers.
///
/// Calls for different powers run concurrently, so implementations must
/// not rely on being called in any order, and each call sees only its own
/// view.
pub trait DecisionMaker: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Choose this phase's orders.
    ///
    /// Every returned order must be copied from `view.legal_actions`. An
    /// empty list means hold everywhere.
    fn decide<'a>(
        &'a self,
        view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Vec<Order>, DecisionError>>;

    /// Produce at most one press message for the current negotiation round.
    ///
    /// The default stays silent.
    fn negotiate<'a>(
        &'a self,
        _view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Option<PressDraft>, DecisionError>> {
        Box::pin(async { Ok(None) })
    }
}

// ---------------------------------------------------------------------------
// Hold
// ---------------------------------------------------------------------------

/// Holds every unit in movement phases and otherwise submits nothing,
/// leaving retreats and adjustments to the engine's defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldDecider;

impl HoldDecider {
    /// Create a hold decider.
    pub const fn new() -> Self {
        Self
    }
}

/// The explicit hold orders in a view's catalog.
pub fn hold_orders(view: &ActorView) -> Vec<Order> {
    if view.phase.phase_type != PhaseType::Movement {
        return Vec::new();
    }
    view.legal_actions
        .iter()
        .filter_map(|(_, options)| options.iter().find(|o| o.as_str().ends_with(" H")))
        .cloned()
        .collect()
}

impl DecisionMaker for HoldDecider {
    fn name(&self) -> &str {
        "hold"
    }

    fn decide<'a>(
        &'a self,
        view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Vec<Order>, DecisionError>> {
        let orders = hold_orders(view);
        Box::pin(async move { Ok(orders) })
    }
}

// ---------------------------------------------------------------------------
// Random
// ---------------------------------------------------------------------------

/// Picks uniformly among legal options.
///
/// Movement and retreat phases get one random option per location.
/// Adjustment phases respect the owed count: a power owed builds picks
/// that many random sites, and a power owing disbands picks that many
/// random units.
#[derive(Debug, Clone, Copy)]
pub struct RandomDecider {
    seed: u64,
}

impl RandomDecider {
    /// Create a random decider from a match seed.
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The generator for one power in one phase.
    fn rng_for(&self, power: Power, view: &ActorView) -> StdRng {
        let power_index = Power::ALL.iter().position(|p| *p == power).unwrap_or(0);
        let phase = &view.phase;
        let [year_lo, year_hi] = phase.year.to_le_bytes();
        let salt = u64::from_le_bytes([
            u8::try_from(power_index).unwrap_or(u8::MAX),
            year_lo,
            year_hi,
            u8::try_from(phase.season.letter()).unwrap_or(0),
            u8::try_from(phase.phase_type.letter()).unwrap_or(0),
            0,
            0,
            0,
        ]);
        StdRng::seed_from_u64(self.seed.rotate_left(21) ^ salt)
    }

    /// Choose orders for a view without going through the trait.
    pub fn choose(&self, view: &ActorView) -> Vec<Order> {
        let mut rng = self.rng_for(view.power, view);
        let locations: Vec<&[Order]> = view.legal_actions.iter().map(|(_, o)| o).collect();

        if view.phase.phase_type != PhaseType::Adjustment {
            return locations
                .iter()
                .filter_map(|options| options.choose(&mut rng).cloned())
                .collect();
        }

        let owed = usize::try_from(view.adjustment_delta().unsigned_abs()).unwrap_or(usize::MAX);
        let mut candidates = locations;
        candidates.shuffle(&mut rng);
        let building = view.adjustment_delta() > 0;
        candidates
            .into_iter()
            .filter_map(|options| {
                let acting: Vec<&Order> = options
                    .iter()
                    .filter(|o| {
                        let text = o.as_str();
                        text.ends_with(if building { " B" } else { " D" })
                    })
                    .collect();
                acting.choose(&mut rng).map(|o| (*o).clone())
            })
            .take(owed)
            .collect()
    }
}

impl DecisionMaker for RandomDecider {
    fn name(&self) -> &str {
        "random"
    }

    fn decide<'a>(
        &'a self,
        view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Vec<Order>, DecisionError>> {
        let orders = self.choose(view);
        Box::pin(async move { Ok(orders) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use entente_rules::{RulesEngine, StandardEngine};
    use entente_types::{Location, PhaseToken, Season, Unit, UnitType};
    use rand::Rng;

    use super::*;
    use crate::catalog::legal_actions;
    use crate::press::PressLog;
    use crate::store::BoardStore;
    use crate::view::build_view;

    fn view_of(engine: StandardEngine, power: Power) -> ActorView {
        let catalog = legal_actions(&engine, power).unwrap();
        let snapshot = BoardStore::new(Box::new(engine)).snapshot();
        build_view(&snapshot, power, catalog, &PressLog::new(), 10).unwrap()
    }

    #[tokio::test]
    async fn hold_decider_holds_everything() {
        let view = view_of(StandardEngine::new(), Power::Austria);
        let orders = HoldDecider::new().decide(&view).await.unwrap();
        assert_eq!(orders.len(), 3);
        assert!(orders.iter().all(|o| view.legal_actions.contains(o)));
        assert!(orders.iter().all(|o| o.as_str().ends_with(" H")));
        assert!(HoldDecider.negotiate(&view).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn random_decider_is_legal_and_reproducible() {
        let view = view_of(StandardEngine::new(), Power::Russia);
        let decider = RandomDecider::new(7);
        let first = decider.decide(&view).await.unwrap();
        let second = decider.decide(&view).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|o| view.legal_actions.contains(o)));
    }

    #[test]
    fn random_decider_varies_with_power() {
        let decider = RandomDecider::new(7);
        let view = view_of(StandardEngine::new(), Power::Russia);
        let mut other = view.clone();
        other.power = Power::Turkey;
        assert_ne!(
            decider.rng_for(view.power, &view).random::<u64>(),
            decider.rng_for(other.power, &other).random::<u64>()
        );
    }

    #[test]
    fn random_builds_respect_owed_count() {
        // France owns four centres with one unit left: three builds owed.
        let phase = PhaseToken::new(Season::Winter, 1901, PhaseType::Adjustment);
        let mut units = BTreeMap::new();
        units.insert(Power::France, vec![Unit::new(UnitType::Army, "BUR")]);
        units.insert(Power::Germany, vec![Unit::new(UnitType::Army, "MUN")]);
        let mut centers = BTreeMap::new();
        centers.insert(
            Power::France,
            ["BRE", "MAR", "PAR", "SPA"].map(Location::new).to_vec(),
        );
        centers.insert(Power::Germany, vec![Location::new("MUN")]);
        let engine = StandardEngine::from_position(phase, &units, &centers).unwrap();
        assert_eq!(engine.current_phase(), phase);

        let view = view_of(engine, Power::France);
        assert_eq!(view.adjustment_delta(), 3);
        let orders = RandomDecider::new(1).choose(&view);
        assert_eq!(orders.len(), 3);
        assert!(orders.iter().all(|o| o.as_str().ends_with(" B")));
        assert!(orders.iter().all(|o| view.legal_actions.contains(o)));
    }
}
