//! The decision collector.
//!
//! Each round follows the same fan-out and fan-in shape:
//!
//! 1. Build every active power's view from one snapshot.
//! 2. Spawn one task per power, each wrapped in the per-power deadline.
//! 3. Join all tasks, then apply results one power at a time in canonical
//!    order.
//!
//! Decision tasks only hold their own view and return values. The press
//! log and the board store are written here, after the join, so no task
//! can observe another power's choice for the same phase, and the order in
//! which results are applied does not depend on which task finished first.
//!
//! A call that times out, errors, or panics contributes nothing: no press
//! for a negotiation round, no staged orders (hold) for the order round.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use entente_types::{ActorView, BoardSnapshot, LegalActions, Order, PhaseToken, Power, PressDraft};
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::{error::Elapsed, timeout};
use tracing::{debug, info, warn};

use crate::config::{MatchConfig, NegotiationConfig};
use crate::decision::DecisionMaker;
use crate::error::{DecisionError, PressError, StoreError};
use crate::press::PressLog;
use crate::store::BoardStore;
use crate::view::build_view;

/// Shared handle to a decision-maker.
pub type SharedDecisionMaker = Arc<dyn DecisionMaker>;

/// What the negotiation rounds of one phase produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationReport {
    /// Rounds actually run.
    pub rounds: u32,
    /// Messages appended to the press log.
    pub messages: usize,
    /// Drafts refused at the boundary.
    pub refused: Vec<PressError>,
    /// Calls that produced nothing.
    pub failures: Vec<DecisionError>,
}

/// What the order round of one phase produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReport {
    /// The phase the orders were collected for.
    pub phase: PhaseToken,
    /// Powers whose batch was staged, with the batch size.
    pub accepted: BTreeMap<Power, usize>,
    /// Powers whose batch was rejected, with the illegal orders.
    pub rejected: BTreeMap<Power, Vec<Order>>,
    /// Powers whose call produced nothing.
    pub failures: BTreeMap<Power, DecisionError>,
    /// Active powers with nothing to order this phase. They are not asked.
    pub idle: Vec<Power>,
}

/// Fans decision calls out to every active power and applies the results.
pub struct DecisionCollector {
    makers: BTreeMap<Power, SharedDecisionMaker>,
    negotiation: NegotiationConfig,
    timeout: Duration,
}

impl DecisionCollector {
    /// Create a collector. Powers without an entry in `makers` are treated
    /// as failing every call.
    pub const fn new(
        makers: BTreeMap<Power, SharedDecisionMaker>,
        negotiation: NegotiationConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            makers,
            negotiation,
            timeout,
        }
    }

    /// Create a collector with the negotiation and deadline settings of a
    /// match configuration.
    pub fn from_config(config: &MatchConfig, makers: BTreeMap<Power, SharedDecisionMaker>) -> Self {
        Self::new(makers, config.negotiation.clone(), config.decisions.timeout())
    }

    /// The decision-maker assigned to `power`.
    pub fn maker(&self, power: Power) -> Option<&SharedDecisionMaker> {
        self.makers.get(&power)
    }

    /// The negotiation settings in use.
    pub const fn negotiation(&self) -> &NegotiationConfig {
        &self.negotiation
    }

    /// The per-power deadline in milliseconds.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Snapshot with the public press tail attached.
    pub fn board(&self, store: &BoardStore, press: &PressLog) -> BoardSnapshot {
        let mut snapshot = store.snapshot();
        snapshot.recent_press = press.public_tail(self.negotiation.history_limit);
        snapshot
    }

    /// Run the negotiation rounds for a movement phase.
    ///
    /// Each round asks every active power for at most one message and
    /// appends the non-empty ones in canonical power order. Negotiation
    /// stops early after a round in which nobody spoke. Non-movement
    /// phases have no negotiation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidActor`] if an active power is not in the
    /// match.
    pub async fn run_negotiation(
        &self,
        store: &BoardStore,
        press: &mut PressLog,
        active: &[Power],
    ) -> Result<NegotiationReport, StoreError> {
        let mut report = NegotiationReport::default();
        let phase = store.phase();
        if !phase.is_movement() || active.is_empty() {
            return Ok(report);
        }

        for round in 1..=self.negotiation.rounds {
            let views = self.views(store, press, active)?;
            let results = self.dispatch(views, negotiate_call).await;

            let mut spoken = 0_usize;
            for (power, result) in results {
                match result {
                    Ok(Some(draft)) => match self.deliver(press, phase, power, draft) {
                        Ok(true) => spoken = spoken.saturating_add(1),
                        Ok(false) => {}
                        Err(refused) => report.refused.push(refused),
                    },
                    Ok(None) => {}
                    Err(err) => {
                        log_decision_failure(phase, &err);
                        report.failures.push(err);
                    }
                }
            }

            report.rounds = round;
            report.messages = report.messages.saturating_add(spoken);
            info!(%phase, round, messages = spoken, "Negotiation round");
            if spoken == 0 {
                break;
            }
        }
        Ok(report)
    }

    /// Ask every active power with something to order for its orders, then
    /// stage the answers.
    ///
    /// All calls see views built from the same snapshot. Staging happens
    /// after every call has returned or timed out. A rejected batch only
    /// affects its own power. Committing is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidActor`] if an active power is not in the
    /// match.
    pub async fn collect_orders(
        &self,
        store: &mut BoardStore,
        press: &PressLog,
        active: &[Power],
    ) -> Result<OrderReport, StoreError> {
        let phase = store.phase();
        let mut catalogs = store.legal_actions_for(active)?;
        let snapshot = self.board(store, press);

        let mut idle = Vec::new();
        let mut views = BTreeMap::new();
        for power in active {
            let catalog = catalogs.get(power).cloned().unwrap_or_default();
            if catalog.is_empty() {
                debug!(%phase, %power, "nothing to order");
                idle.push(*power);
                continue;
            }
            let view = build_view(
                &snapshot,
                *power,
                catalog,
                press,
                self.negotiation.history_limit,
            )?;
            views.insert(*power, view);
        }

        let results = self.dispatch(views, decide_call).await;

        let mut report = OrderReport {
            phase,
            accepted: BTreeMap::new(),
            rejected: BTreeMap::new(),
            failures: BTreeMap::new(),
            idle,
        };
        for (power, result) in results {
            let orders = match result {
                Ok(orders) => orders,
                Err(err) => {
                    log_decision_failure(phase, &err);
                    report.failures.insert(power, err);
                    continue;
                }
            };
            let catalog = catalogs.remove(&power).unwrap_or_default();
            match store.stage_against(&catalog, power, orders) {
                Ok(batch) => {
                    report.accepted.insert(power, batch.order_count);
                }
                Err(StoreError::IllegalBatch { illegal, .. }) => {
                    report.rejected.insert(power, illegal);
                }
                Err(fatal) => return Err(fatal),
            }
        }
        Ok(report)
    }

    /// Views for every active power from one snapshot.
    fn views(
        &self,
        store: &BoardStore,
        press: &PressLog,
        active: &[Power],
    ) -> Result<BTreeMap<Power, ActorView>, StoreError> {
        let mut catalogs = store.legal_actions_for(active)?;
        let snapshot = self.board(store, press);
        active
            .iter()
            .map(|power| {
                let catalog: LegalActions = catalogs.remove(power).unwrap_or_default();
                let view = build_view(
                    &snapshot,
                    *power,
                    catalog,
                    press,
                    self.negotiation.history_limit,
                )?;
                Ok((*power, view))
            })
            .collect()
    }

    /// Append one draft. Returns whether a message was added.
    fn deliver(
        &self,
        press: &mut PressLog,
        phase: PhaseToken,
        power: Power,
        draft: PressDraft,
    ) -> Result<bool, PressError> {
        let recipient = draft.recipient;
        match press.append(phase, power, draft, self.negotiation.max_message_chars) {
            Ok(Some(message)) => {
                debug!(%phase, %power, to = %recipient, seq = message.seq, "press delivered");
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(refused) => {
                warn!(%phase, %power, error = %refused, "press refused");
                Err(refused)
            }
        }
    }

    /// Spawn one deadline-bounded task per view and join them all.
    ///
    /// Results come back keyed by power, so callers apply them in
    /// canonical order whatever the completion order was.
    async fn dispatch<T, F>(
        &self,
        views: BTreeMap<Power, ActorView>,
        call: F,
    ) -> BTreeMap<Power, Result<T, DecisionError>>
    where
        T: Send + 'static,
        F: Fn(SharedDecisionMaker, ActorView) -> BoxFuture<'static, Result<T, DecisionError>>,
    {
        let mut results = BTreeMap::new();
        let mut handles: BTreeMap<Power, JoinHandle<Result<Result<T, DecisionError>, Elapsed>>> =
            BTreeMap::new();

        for (power, view) in views {
            let Some(maker) = self.makers.get(&power).cloned() else {
                results.insert(
                    power,
                    Err(DecisionError::failed(power, "no decision-maker assigned")),
                );
                continue;
            };
            debug!(%power, maker = maker.name(), "dispatching decision call");
            handles.insert(power, tokio::spawn(timeout(self.timeout, call(maker, view))));
        }

        for (power, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(result)) => result,
                Ok(Err(_elapsed)) => Err(DecisionError::Timeout {
                    power,
                    timeout_ms: self.timeout_ms(),
                }),
                Err(join_error) => {
                    warn!(%power, error = %join_error, "decision task aborted");
                    Err(DecisionError::Panicked { power })
                }
            };
            results.insert(power, outcome);
        }
        results
    }
}

impl core::fmt::Debug for DecisionCollector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let makers: BTreeMap<Power, &str> =
            self.makers.iter().map(|(p, m)| (*p, m.name())).collect();
        f.debug_struct("DecisionCollector")
            .field("makers", &makers)
            .field("negotiation", &self.negotiation)
            .field("timeout_ms", &self.timeout_ms())
            .finish()
    }
}

fn negotiate_call(
    maker: SharedDecisionMaker,
    view: ActorView,
) -> BoxFuture<'static, Result<Option<PressDraft>, DecisionError>> {
    Box::pin(async move { maker.negotiate(&view).await })
}

fn decide_call(
    maker: SharedDecisionMaker,
    view: ActorView,
) -> BoxFuture<'static, Result<Vec<Order>, DecisionError>> {
    Box::pin(async move { maker.decide(&view).await })
}

fn log_decision_failure(phase: PhaseToken, err: &DecisionError) {
    match err {
        DecisionError::Timeout { power, timeout_ms } => {
            warn!(%phase, %power, timeout_ms, "decision deadline exceeded, contributing nothing");
        }
        DecisionError::Failed { power, message } => {
            warn!(%phase, %power, error = %message, "decision failed, contributing nothing");
        }
        DecisionError::Panicked { power } => {
            warn!(%phase, %power, "decision task aborted, contributing nothing");
        }
    }
}
