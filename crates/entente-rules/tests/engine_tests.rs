//! Integration tests for the reference engine through the [`RulesEngine`]
//! trait object, the way the orchestration core drives it.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use entente_rules::{RulesEngine, StandardEngine};
use entente_types::{Order, Power};
use proptest::prelude::*;

fn boxed() -> Box<dyn RulesEngine> {
    Box::new(StandardEngine::new())
}

#[test]
fn every_power_has_orderable_units_at_the_opening() {
    let engine = boxed();
    let all = engine.possible_orders();
    for power in Power::ALL {
        let locations = engine.orderable_locations(power);
        assert!(!locations.is_empty(), "{power} has nothing to order");
        for loc in locations {
            assert!(all.contains_key(&loc), "{power} {loc} has no options");
        }
    }
}

#[test]
fn a_full_year_of_holds_returns_to_spring() {
    let mut engine = boxed();
    assert_eq!(engine.process().unwrap().to_string(), "F1901M");
    // Nobody captured anything, so there is no winter phase.
    assert_eq!(engine.process().unwrap().to_string(), "S1902M");
    assert!(!engine.is_done());
}

#[test]
fn resubmitting_replaces_earlier_orders() {
    let mut engine = boxed();
    engine
        .set_orders(Power::France, &[Order::new("A PAR - BUR")])
        .unwrap();
    engine
        .set_orders(Power::France, &[Order::new("A PAR - PIC")])
        .unwrap();
    engine.process().unwrap();
    let locations: BTreeSet<String> = engine
        .units(Power::France)
        .iter()
        .map(|u| u.location.to_string())
        .collect();
    assert!(locations.contains("PIC"));
    assert!(!locations.contains("BUR"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Any combination of catalogued options is accepted by the engine and
    /// processes to a later phase with the same number of units or fewer.
    #[test]
    fn catalogued_options_always_process(picks in proptest::collection::vec(any::<prop::sample::Index>(), 22)) {
        let mut engine = boxed();
        let before = engine.current_phase();
        let all = engine.possible_orders();
        for power in Power::ALL {
            let chosen: Vec<Order> = engine
                .orderable_locations(power)
                .iter()
                .zip(picks.iter())
                .filter_map(|(loc, pick)| {
                    let options = all.get(loc)?;
                    options.get(pick.index(options.len())).cloned()
                })
                .collect();
            engine.set_orders(power, &chosen).unwrap();
        }
        let after = engine.process().unwrap();
        prop_assert!(after > before);
        let units: usize = Power::ALL.iter().map(|p| engine.units(*p).len()).sum();
        prop_assert!(units <= 22);
    }
}
