//! Shared fixtures for the orchestration integration tests: a scripted
//! rules engine and instrumented decision-makers.

#![allow(clippy::unwrap_used, dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use entente_core::collector::{DecisionCollector, SharedDecisionMaker};
use entente_core::config::NegotiationConfig;
use entente_core::decision::DecisionMaker;
use entente_core::error::DecisionError;
use entente_rules::{RulesEngine, RulesError};
use entente_types::{
    ActorView, Location, Order, PhaseToken, PhaseType, Power, PressDraft, Recipient, Season, Unit,
    UnitType,
};
use futures::future::BoxFuture;

// ---------------------------------------------------------------------------
// Scripted engine
// ---------------------------------------------------------------------------

/// Holdings of one power in a scripted position.
#[derive(Debug, Clone, Default)]
pub struct Holding {
    pub centers: Vec<Location>,
    pub units: Vec<Unit>,
}

impl Holding {
    /// `n` armies on `n` centres, all at distinct locations prefixed by
    /// `tag`.
    pub fn armies(tag: &str, n: usize) -> Self {
        let locations: Vec<Location> = (0..n).map(|i| Location::new(format!("{tag}{i}"))).collect();
        Self {
            units: locations
                .iter()
                .map(|l| Unit::new(UnitType::Army, l.clone()))
                .collect(),
            centers: locations,
        }
    }
}

/// The position an engine moves to when processed.
#[derive(Debug, Clone, Default)]
pub struct Step {
    pub holdings: BTreeMap<Power, Holding>,
    pub done: bool,
}

/// What the scripted engine saw, shared with the test after the engine is
/// boxed into a store.
#[derive(Debug, Default)]
pub struct EngineLog {
    pub set_orders: Vec<(PhaseToken, Power, Vec<Order>)>,
    pub processed: Vec<PhaseToken>,
}

/// A rules engine that replays a fixed sequence of positions.
///
/// Every unit may hold (`A X H`) or move to `X-ALT` (`A X - X-ALT`). Each
/// `process` call records the orders it was given and jumps to the next
/// scripted position, or keeps the current one when the script runs out.
pub struct ScriptedEngine {
    pub roster: Vec<Power>,
    pub phase: PhaseToken,
    pub done: bool,
    pub holdings: BTreeMap<Power, Holding>,
    pub script: VecDeque<Step>,
    pub fail_on_process: bool,
    pub log: Arc<Mutex<EngineLog>>,
    pending: BTreeMap<Power, Vec<Order>>,
}

impl ScriptedEngine {
    pub fn new(holdings: BTreeMap<Power, Holding>, script: Vec<Step>) -> Self {
        Self {
            roster: holdings.keys().copied().collect(),
            phase: PhaseToken::opening(),
            done: false,
            holdings,
            script: script.into(),
            fail_on_process: false,
            log: Arc::new(Mutex::new(EngineLog::default())),
            pending: BTreeMap::new(),
        }
    }

    pub fn log_handle(&self) -> Arc<Mutex<EngineLog>> {
        Arc::clone(&self.log)
    }

    fn options_at(unit: &Unit) -> Vec<Order> {
        vec![
            Order::new(format!("{unit} H")),
            Order::new(format!("{unit} - {}-ALT", unit.location)),
        ]
    }

    fn next_phase(phase: PhaseToken) -> PhaseToken {
        match phase.season {
            Season::Spring => PhaseToken::new(Season::Fall, phase.year, PhaseType::Movement),
            Season::Fall | Season::Winter => {
                PhaseToken::new(Season::Spring, phase.year.saturating_add(1), PhaseType::Movement)
            }
        }
    }
}

impl RulesEngine for ScriptedEngine {
    fn powers(&self) -> Vec<Power> {
        self.roster.clone()
    }

    fn current_phase(&self) -> PhaseToken {
        self.phase
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn centers(&self, power: Power) -> Vec<Location> {
        self.holdings
            .get(&power)
            .map(|h| h.centers.clone())
            .unwrap_or_default()
    }

    fn units(&self, power: Power) -> Vec<Unit> {
        self.holdings
            .get(&power)
            .map(|h| h.units.clone())
            .unwrap_or_default()
    }

    fn unowned_centers(&self) -> Vec<Location> {
        Vec::new()
    }

    fn possible_orders(&self) -> BTreeMap<Location, Vec<Order>> {
        self.holdings
            .values()
            .flat_map(|h| h.units.iter())
            .map(|u| (u.location.clone(), Self::options_at(u)))
            .collect()
    }

    fn orderable_locations(&self, power: Power) -> Vec<Location> {
        self.holdings
            .get(&power)
            .map(|h| h.units.iter().map(|u| u.location.clone()).collect())
            .unwrap_or_default()
    }

    fn set_orders(&mut self, power: Power, orders: &[Order]) -> Result<(), RulesError> {
        self.log
            .lock()
            .unwrap()
            .set_orders
            .push((self.phase, power, orders.to_vec()));
        self.pending.insert(power, orders.to_vec());
        Ok(())
    }

    fn process(&mut self) -> Result<PhaseToken, RulesError> {
        if self.done {
            return Err(RulesError::MatchOver);
        }
        if self.fail_on_process {
            return Err(RulesError::InvalidPosition("scripted failure".to_owned()));
        }
        self.log.lock().unwrap().processed.push(self.phase);
        self.pending.clear();
        if let Some(step) = self.script.pop_front() {
            self.holdings = step.holdings;
            self.done = step.done;
        }
        self.phase = Self::next_phase(self.phase);
        Ok(self.phase)
    }
}

// ---------------------------------------------------------------------------
// Decision-makers
// ---------------------------------------------------------------------------

/// Returns fixed orders per power and records every view it was shown.
#[derive(Default)]
pub struct Scripted {
    pub orders: BTreeMap<Power, Vec<Order>>,
    pub press: BTreeMap<Power, PressDraft>,
    pub delays: BTreeMap<Power, Duration>,
    pub seen: Mutex<Vec<ActorView>>,
}

impl Scripted {
    pub fn with_orders(orders: &[(Power, &[&str])]) -> Self {
        Self {
            orders: orders
                .iter()
                .map(|(p, list)| (*p, list.iter().map(|o| Order::new(*o)).collect()))
                .collect(),
            ..Self::default()
        }
    }

    /// Powers asked to decide, in the order the calls were recorded.
    pub fn asked(&self) -> Vec<(PhaseToken, Power)> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|v| (v.phase, v.power))
            .collect()
    }

    async fn pause(&self, power: Power) {
        if let Some(delay) = self.delays.get(&power) {
            tokio::time::sleep(*delay).await;
        }
    }
}

impl DecisionMaker for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn decide<'a>(
        &'a self,
        view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Vec<Order>, DecisionError>> {
        Box::pin(async move {
            self.pause(view.power).await;
            self.seen.lock().unwrap().push(view.clone());
            Ok(self.orders.get(&view.power).cloned().unwrap_or_default())
        })
    }

    fn negotiate<'a>(
        &'a self,
        view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Option<PressDraft>, DecisionError>> {
        Box::pin(async move {
            self.pause(view.power).await;
            Ok(self.press.get(&view.power).cloned())
        })
    }
}

/// Never answers.
pub struct Silent;

impl DecisionMaker for Silent {
    fn name(&self) -> &str {
        "silent"
    }

    fn decide<'a>(
        &'a self,
        _view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Vec<Order>, DecisionError>> {
        Box::pin(std::future::pending())
    }

    fn negotiate<'a>(
        &'a self,
        _view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Option<PressDraft>, DecisionError>> {
        Box::pin(std::future::pending())
    }
}

/// Always errors.
pub struct Broken;

impl DecisionMaker for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn decide<'a>(
        &'a self,
        view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Vec<Order>, DecisionError>> {
        let power = view.power;
        Box::pin(async move { Err(DecisionError::failed(power, "backend unreachable")) })
    }
}

/// A broadcast draft.
pub fn broadcast(text: &str) -> PressDraft {
    PressDraft::new(Recipient::All, text)
}

/// A collector assigning `maker` to every power, with overrides.
pub fn collector(
    maker: &SharedDecisionMaker,
    overrides: &[(Power, SharedDecisionMaker)],
    rounds: u32,
    timeout: Duration,
) -> DecisionCollector {
    let mut makers: BTreeMap<Power, SharedDecisionMaker> =
        Power::ALL.iter().map(|p| (*p, Arc::clone(maker))).collect();
    for (power, m) in overrides {
        makers.insert(*power, Arc::clone(m));
    }
    let negotiation = NegotiationConfig {
        rounds,
        ..NegotiationConfig::default()
    };
    DecisionCollector::new(makers, negotiation, timeout)
}

/// The unit type at `location` owned by `power`, if any.
pub fn unit_at(
    snapshot: &entente_types::BoardSnapshot,
    power: Power,
    location: &str,
) -> Option<UnitType> {
    snapshot
        .power(power)
        .and_then(|s| s.units_by_location().get(location).copied())
}
