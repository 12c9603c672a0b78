//! Integration tests for the match loop against a scripted engine: engine
//! ends, eliminations, and structural failures.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use entente_core::collector::{DecisionCollector, SharedDecisionMaker};
use entente_core::config::GameConfig;
use entente_core::error::StoreError;
use entente_core::phase::{EndReason, PhaseOutcome, run_phase};
use entente_core::press::PressLog;
use entente_core::runner::{NoOpCallback, RunnerError, run_match};
use entente_core::store::BoardStore;
use entente_types::{Order, PhaseToken, Power};

use common::{Holding, Scripted, ScriptedEngine, Step, collector};

fn holdings(list: &[(Power, Holding)]) -> BTreeMap<Power, Holding> {
    list.iter().cloned().collect()
}

fn scripted_collector(maker: &Arc<Scripted>) -> DecisionCollector {
    let shared: SharedDecisionMaker = Arc::clone(maker) as SharedDecisionMaker;
    collector(&shared, &[], 1, Duration::from_secs(5))
}

#[tokio::test]
async fn engine_victory_ends_the_match_after_one_commit() {
    let engine = ScriptedEngine::new(
        holdings(&[
            (Power::France, Holding::armies("FR", 3)),
            (Power::England, Holding::armies("EN", 3)),
        ]),
        vec![Step {
            holdings: holdings(&[
                (Power::France, Holding::armies("FR", 18)),
                (Power::England, Holding::armies("EN", 1)),
            ]),
            done: true,
        }],
    );
    let log = engine.log_handle();
    let mut store = BoardStore::new(Box::new(engine));
    let maker = Arc::new(Scripted::default());

    let result = run_match(
        &mut store,
        &scripted_collector(&maker),
        &mut PressLog::new(),
        &GameConfig::default(),
        &mut NoOpCallback,
    )
    .await
    .unwrap();

    assert_eq!(
        result.end_reason,
        EndReason::Victory {
            power: Power::France,
            centers: 18
        }
    );
    assert_eq!(result.phases_played, 1);
    assert_eq!(log.lock().unwrap().processed, [PhaseToken::opening()]);
}

#[tokio::test]
async fn eliminated_power_is_not_asked_but_still_reported() {
    let after = holdings(&[
        (Power::France, Holding::armies("FR", 4)),
        (Power::Germany, Holding::default()),
    ]);
    let engine = ScriptedEngine::new(
        holdings(&[
            (Power::France, Holding::armies("FR", 2)),
            (Power::Germany, Holding::armies("GE", 2)),
        ]),
        vec![
            Step {
                holdings: after.clone(),
                done: false,
            },
            Step {
                holdings: after,
                done: false,
            },
        ],
    );
    let log = engine.log_handle();
    let mut store = BoardStore::new(Box::new(engine));
    let maker = Arc::new(Scripted::with_orders(&[
        (Power::France, &["A FR0 - FR0-ALT"]),
        (Power::Germany, &["A GE1 H"]),
    ]));
    let limits = GameConfig {
        max_phases: 2,
        ..GameConfig::default()
    };

    let result = run_match(
        &mut store,
        &scripted_collector(&maker),
        &mut PressLog::new(),
        &limits,
        &mut NoOpCallback,
    )
    .await
    .unwrap();

    assert_eq!(result.end_reason, EndReason::PhaseLimit { max_phases: 2 });
    let first = result.summaries.first().unwrap();
    assert_eq!(first.eliminated, [Power::Germany]);

    let spring = PhaseToken::opening();
    let fall: PhaseToken = "F1901M".parse().unwrap();
    let mut asked = maker.asked();
    asked.sort_unstable();
    assert_eq!(
        asked,
        [
            (spring, Power::France),
            (spring, Power::Germany),
            (fall, Power::France)
        ]
    );
    assert_eq!(result.center_counts().get(&Power::Germany), Some(&0));
    assert_eq!(result.center_counts().get(&Power::France), Some(&4));

    let log = log.lock().unwrap();
    let fall_batches: Vec<Power> = log
        .set_orders
        .iter()
        .filter(|(phase, _, _)| *phase == fall)
        .map(|(_, power, _)| *power)
        .collect();
    assert_eq!(fall_batches, [Power::France]);
    assert!(log.set_orders.contains(&(
        spring,
        Power::Germany,
        vec![Order::new("A GE1 H")]
    )));
}

#[tokio::test]
async fn losing_every_power_ends_without_a_second_commit() {
    let engine = ScriptedEngine::new(
        holdings(&[
            (Power::Italy, Holding::armies("IT", 1)),
            (Power::Austria, Holding::armies("AU", 1)),
        ]),
        vec![Step::default()],
    );
    let log = engine.log_handle();
    let mut store = BoardStore::new(Box::new(engine));
    let maker = Arc::new(Scripted::default());

    let result = run_match(
        &mut store,
        &scripted_collector(&maker),
        &mut PressLog::new(),
        &GameConfig::default(),
        &mut NoOpCallback,
    )
    .await
    .unwrap();

    assert_eq!(result.end_reason, EndReason::NoActivePowers);
    assert_eq!(result.phases_played, 1);
    assert_eq!(log.lock().unwrap().processed.len(), 1);
    let first = result.summaries.first().unwrap();
    assert_eq!(first.eliminated, [Power::Austria, Power::Italy]);
}

#[tokio::test]
async fn empty_board_commits_nothing() {
    let engine = ScriptedEngine::new(holdings(&[(Power::Russia, Holding::default())]), Vec::new());
    let log = engine.log_handle();
    let mut store = BoardStore::new(Box::new(engine));
    let maker = Arc::new(Scripted::default());

    let outcome = run_phase(&mut store, &scripted_collector(&maker), &mut PressLog::new())
        .await
        .unwrap();

    assert_eq!(outcome, PhaseOutcome::NoActivePowers);
    assert!(log.lock().unwrap().processed.is_empty());
    assert!(maker.asked().is_empty());
}

#[tokio::test]
async fn resolution_failure_aborts_with_the_phase() {
    let mut engine = ScriptedEngine::new(
        holdings(&[(Power::Turkey, Holding::armies("TU", 2))]),
        Vec::new(),
    );
    engine.fail_on_process = true;
    let mut store = BoardStore::new(Box::new(engine));
    let maker = Arc::new(Scripted::default());

    let err = run_match(
        &mut store,
        &scripted_collector(&maker),
        &mut PressLog::new(),
        &GameConfig::default(),
        &mut NoOpCallback,
    )
    .await
    .unwrap_err();

    let RunnerError::Aborted { phase, source } = err;
    assert_eq!(phase, PhaseToken::opening());
    assert!(matches!(source, StoreError::Resolution { .. }));
}

#[tokio::test]
async fn player_turn_sees_only_its_own_catalog() {
    let engine = ScriptedEngine::new(
        holdings(&[
            (Power::England, Holding::armies("EN", 2)),
            (Power::Russia, Holding::armies("RU", 1)),
        ]),
        Vec::new(),
    );
    let mut store = BoardStore::new(Box::new(engine));
    let maker = Arc::new(Scripted::default());

    run_phase(&mut store, &scripted_collector(&maker), &mut PressLog::new())
        .await
        .unwrap();

    let seen = maker.seen.lock().unwrap();
    let england = seen.iter().find(|v| v.power == Power::England).unwrap();
    assert_eq!(england.legal_actions.location_count(), 2);
    assert!(england.legal_actions.at("RU0").is_none());
    assert!(england.legal_actions.contains(&Order::new("A EN1 - EN1-ALT")));
}
