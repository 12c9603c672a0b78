//! The legal-action catalog.
//!
//! The catalog is the per-power slice of the engine's possible orders,
//! restricted to the locations the power may order this phase. It is
//! recomputed from the engine on every query, so a catalog can never
//! outlive the position it was computed for.

use std::collections::BTreeMap;

use entente_rules::RulesEngine;
use entente_types::{LegalActions, Location, Order, Power};
use tracing::warn;

use crate::error::StoreError;

/// Legal orders for `power` in the engine's current phase, keyed by
/// location.
///
/// Every listed location has at least one option. A power with nothing to
/// order gets an empty catalog.
///
/// # Errors
///
/// Returns [`StoreError::InvalidActor`] if `power` is not in the match.
pub fn legal_actions(engine: &dyn RulesEngine, power: Power) -> Result<LegalActions, StoreError> {
    ensure_known(engine, power)?;
    let mut possible = engine.possible_orders();
    Ok(slice_for(engine, &mut possible, power))
}

/// Catalogs for several powers at once, sharing one query of the engine's
/// possible orders.
///
/// # Errors
///
/// Returns [`StoreError::InvalidActor`] if any power is not in the match.
pub fn legal_actions_for(
    engine: &dyn RulesEngine,
    powers: &[Power],
) -> Result<BTreeMap<Power, LegalActions>, StoreError> {
    for power in powers {
        ensure_known(engine, *power)?;
    }
    let mut possible = engine.possible_orders();
    Ok(powers
        .iter()
        .map(|power| (*power, slice_for(engine, &mut possible, *power)))
        .collect())
}

fn ensure_known(engine: &dyn RulesEngine, power: Power) -> Result<(), StoreError> {
    if engine.powers().contains(&power) {
        Ok(())
    } else {
        Err(StoreError::InvalidActor { power })
    }
}

fn slice_for(
    engine: &dyn RulesEngine,
    possible: &mut BTreeMap<Location, Vec<Order>>,
    power: Power,
) -> LegalActions {
    let mut table = BTreeMap::new();
    for location in engine.orderable_locations(power) {
        match possible.remove(&location) {
            Some(orders) if !orders.is_empty() => {
                table.insert(location, orders);
            }
            _ => {
                warn!(%power, %location, "orderable location has no options");
            }
        }
    }
    LegalActions::new(table)
}
