//! The rules-engine boundary.
//!
//! The orchestration core never adjudicates. It asks an engine what each
//! power may order, stages orders with it, and tells it to process the
//! phase. Any engine that can answer these questions plugs in behind
//! [`RulesEngine`].

use std::collections::BTreeMap;

use entente_types::{Location, Order, PhaseToken, Power, Unit};

use crate::error::RulesError;

/// A game-rules engine for one match.
///
/// Every query reflects the current phase. Orders given through
/// [`set_orders`] replace any orders previously given by the same power in
/// the same phase and take effect on [`process`].
///
/// [`set_orders`]: RulesEngine::set_orders
/// [`process`]: RulesEngine::process
pub trait RulesEngine: Send {
    /// Powers taking part in the match, in canonical order.
    fn powers(&self) -> Vec<Power> {
        Power::ALL.to_vec()
    }

    /// The phase awaiting orders.
    fn current_phase(&self) -> PhaseToken;

    /// Whether the match has reached a terminal state.
    fn is_done(&self) -> bool;

    /// Supply centres owned by `power`, sorted.
    fn centers(&self, power: Power) -> Vec<Location>;

    /// Units of `power`, including dislodged units awaiting retreat.
    fn units(&self, power: Power) -> Vec<Unit>;

    /// Supply centres no power owns, sorted.
    fn unowned_centers(&self) -> Vec<Location>;

    /// Every location that can be ordered this phase, with the full set of
    /// orders the engine would accept there.
    fn possible_orders(&self) -> BTreeMap<Location, Vec<Order>>;

    /// Locations `power` may give orders for this phase.
    fn orderable_locations(&self, power: Power) -> Vec<Location>;

    /// Stage `power`'s orders for the current phase, replacing any earlier
    /// submission. An empty slice clears the power's orders.
    fn set_orders(&mut self, power: Power, orders: &[Order]) -> Result<(), RulesError>;

    /// Adjudicate the current phase and advance to the next one. Returns
    /// the new current phase.
    fn process(&mut self) -> Result<PhaseToken, RulesError>;
}
