//! One phase of the turn cycle, and the turn state machine.
//!
//! A phase runs as:
//!
//! 1. **Gather**: snapshot the board and find the active powers.
//! 2. **Negotiate**: movement phases only, up to the configured rounds.
//! 3. **Decide**: one concurrent order round, staged per power.
//! 4. **Resolve**: exactly one commit, after every power was dispatched.
//! 5. **Account**: report powers that dropped out of the match.
//!
//! [`TurnState`] tracks where the match is between those steps and decides,
//! after each resolution, whether play continues.

use std::collections::BTreeMap;

use entente_types::{BoardSnapshot, Order, PhaseToken, Power};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collector::DecisionCollector;
use crate::config::GameConfig;
use crate::error::{DecisionError, StoreError};
use crate::press::PressLog;
use crate::store::BoardStore;

// ---------------------------------------------------------------------------
// Turn state machine
// ---------------------------------------------------------------------------

/// Why a match stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    /// The engine ended the match with a single winner: a power reached the
    /// victory threshold or is the last one owning centres.
    Victory {
        /// The winning power.
        power: Power,
        /// Its supply-centre count.
        centers: usize,
    },
    /// The engine ended the match without a single winner.
    Stalemate,
    /// The configured number of phases was played.
    PhaseLimit {
        /// The configured limit.
        max_phases: u32,
    },
    /// Play reached a year past the configured last year.
    YearLimit {
        /// The configured last year.
        max_year: u16,
    },
    /// No power has centres or units left.
    NoActivePowers,
}

/// Where the match is in the turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the decisions of the given phase.
    AwaitingDecisions(PhaseToken),
    /// The given phase has been committed and is being evaluated.
    Resolving(PhaseToken),
    /// The match is over.
    Done(EndReason),
}

impl TurnState {
    /// The state at the start of play.
    pub const fn start(phase: PhaseToken) -> Self {
        Self::AwaitingDecisions(phase)
    }

    /// Whether the match is over.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// The state after a resolution produced `snapshot`, with
    /// `phases_played` phases resolved so far.
    ///
    /// An engine-reported end takes priority over the configured limits,
    /// which are controlled early stops rather than game results.
    pub fn after_resolution(
        snapshot: &BoardSnapshot,
        phases_played: u32,
        limits: &GameConfig,
    ) -> Self {
        if snapshot.done {
            return Self::Done(engine_end_reason(snapshot, limits.victory_centers));
        }
        if snapshot.active_powers().is_empty() {
            return Self::Done(EndReason::NoActivePowers);
        }
        if limits.max_phases > 0 && phases_played >= limits.max_phases {
            return Self::Done(EndReason::PhaseLimit {
                max_phases: limits.max_phases,
            });
        }
        if limits.max_year > 0 && snapshot.year() > limits.max_year {
            return Self::Done(EndReason::YearLimit {
                max_year: limits.max_year,
            });
        }
        Self::AwaitingDecisions(snapshot.phase)
    }
}

/// Classify an engine-reported end.
fn engine_end_reason(snapshot: &BoardSnapshot, victory_centers: usize) -> EndReason {
    let holders: Vec<Power> = snapshot
        .powers
        .iter()
        .filter(|(_, s)| s.center_count() > 0)
        .map(|(p, _)| *p)
        .collect();
    match snapshot.leader() {
        Some((power, centers)) if centers >= victory_centers || holders == [power] => {
            EndReason::Victory { power, centers }
        }
        _ => EndReason::Stalemate,
    }
}

// ---------------------------------------------------------------------------
// One phase
// ---------------------------------------------------------------------------

/// What happened in one resolved phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSummary {
    /// The phase that was resolved.
    pub phase: PhaseToken,
    /// The phase that followed.
    pub next_phase: PhaseToken,
    /// Powers that took part.
    pub active: Vec<Power>,
    /// Negotiation rounds run.
    pub negotiation_rounds: u32,
    /// Press messages delivered.
    pub messages: usize,
    /// Powers whose batch was staged, with the batch size.
    pub accepted: BTreeMap<Power, usize>,
    /// Powers whose batch was rejected, with the illegal orders.
    pub rejected: BTreeMap<Power, Vec<Order>>,
    /// Powers whose order call hit the deadline.
    pub timed_out: Vec<Power>,
    /// Powers whose order call errored or aborted.
    pub failed: Vec<Power>,
    /// Powers that had nothing to order.
    pub idle: Vec<Power>,
    /// Powers that owned centres before the phase and own none after it.
    pub eliminated: Vec<Power>,
    /// Supply-centre count per power after resolution.
    pub center_counts: BTreeMap<Power, usize>,
}

/// Result of [`run_phase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// The phase was resolved.
    Resolved(Box<PhaseSummary>),
    /// No power was left to act. Nothing was committed.
    NoActivePowers,
}

/// Run one full phase: negotiate, collect, stage, and commit once.
///
/// # Errors
///
/// Returns a fatal [`StoreError`] if a power is unknown to the match or the
/// engine fails to resolve. Rejected batches and failed decision calls are
/// reported in the summary instead.
pub async fn run_phase(
    store: &mut BoardStore,
    collector: &DecisionCollector,
    press: &mut PressLog,
) -> Result<PhaseOutcome, StoreError> {
    let phase = store.phase();
    let before = store.snapshot();
    let active = before.active_powers();
    if active.is_empty() {
        info!(%phase, "No active powers left");
        return Ok(PhaseOutcome::NoActivePowers);
    }

    info!(
        %phase,
        active = ?active.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        "Phase started"
    );

    let negotiation = collector.run_negotiation(store, press, &active).await?;
    let orders = collector.collect_orders(store, press, &active).await?;
    let next_phase = store.commit_and_resolve()?;

    let after = store.snapshot();
    let eliminated: Vec<Power> = active
        .iter()
        .copied()
        .filter(|p| {
            let had = before.power(*p).is_some_and(|s| s.center_count() > 0);
            let has = after.power(*p).is_some_and(|s| s.center_count() > 0);
            had && !has
        })
        .collect();
    for power in &eliminated {
        let units = after.power(*power).map_or(0, |s| s.unit_count());
        info!(%phase, %power, units_left = units, "Power eliminated");
    }

    let mut timed_out = Vec::new();
    let mut failed = Vec::new();
    for (power, err) in &orders.failures {
        match err {
            DecisionError::Timeout { .. } => timed_out.push(*power),
            DecisionError::Failed { .. } | DecisionError::Panicked { .. } => failed.push(*power),
        }
    }

    Ok(PhaseOutcome::Resolved(Box::new(PhaseSummary {
        phase,
        next_phase,
        active,
        negotiation_rounds: negotiation.rounds,
        messages: negotiation.messages,
        accepted: orders.accepted,
        rejected: orders.rejected,
        timed_out,
        failed,
        idle: orders.idle,
        eliminated,
        center_counts: after.center_counts(),
    })))
}
