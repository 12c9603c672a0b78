//! Match loop runner.
//!
//! This module provides [`run_match`], the top-level async function that
//! drives the [`TurnState`] machine from the opening phase to a terminal
//! state:
//!
//! - **Phases**: one [`run_phase`] per `AwaitingDecisions` state, strictly
//!   sequential
//! - **Engine end**: victory threshold reached or a single power left
//! - **Limits**: stop after `max_phases` resolved phases or past `max_year`
//! - **Elimination**: stop without committing once no power is left
//!
//! A fatal store error ends the run with the last phase the store knew.
//!
//! [`run_phase`]: crate::phase::run_phase

use std::collections::BTreeMap;

use entente_types::{BoardSnapshot, MatchId, PhaseToken, Power};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span, warn};

use crate::collector::DecisionCollector;
use crate::config::GameConfig;
use crate::error::StoreError;
use crate::phase::{self, EndReason, PhaseOutcome, PhaseSummary, TurnState};
use crate::press::PressLog;
use crate::store::BoardStore;

/// Errors that end a match run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A structural failure in the store or the engine.
    #[error("match aborted in {phase}: {source}")]
    Aborted {
        /// The last phase known to be valid.
        phase: PhaseToken,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },
}

impl RunnerError {
    /// The last phase known to be valid.
    pub const fn phase(&self) -> PhaseToken {
        match self {
            Self::Aborted { phase, .. } => *phase,
        }
    }
}

/// Result of a match run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Identity of the match.
    pub match_id: MatchId,
    /// Why the match ended.
    pub end_reason: EndReason,
    /// Number of phases resolved.
    pub phases_played: u32,
    /// The board when play stopped.
    pub final_snapshot: BoardSnapshot,
    /// One summary per resolved phase, in order.
    pub summaries: Vec<PhaseSummary>,
}

impl MatchResult {
    /// Final supply-centre count per power, eliminated powers included.
    pub fn center_counts(&self) -> BTreeMap<Power, usize> {
        self.final_snapshot.center_counts()
    }

    /// The last resolved phase summary, if any phase was played.
    pub fn final_summary(&self) -> Option<&PhaseSummary> {
        self.summaries.last()
    }
}

/// Callback invoked after each resolved phase.
///
/// Implementations can use this to stream progress or export state. The
/// callback receives the phase summary and the board after resolution.
pub trait PhaseCallback: Send {
    /// Called after a phase resolves.
    fn on_phase(&mut self, summary: &PhaseSummary, snapshot: &BoardSnapshot);
}

/// A no-op phase callback for testing.
pub struct NoOpCallback;

impl PhaseCallback for NoOpCallback {
    fn on_phase(&mut self, _summary: &PhaseSummary, _snapshot: &BoardSnapshot) {}
}

/// Run a match until a terminal state is reached.
///
/// # Arguments
///
/// * `store` - Board store positioned at the first phase to play
/// * `collector` - Decision-makers and per-power deadlines
/// * `press` - The match's press log, appended to during negotiation
/// * `limits` - Phase and year limits, victory threshold
/// * `callback` - Called after each resolved phase
///
/// # Errors
///
/// Returns [`RunnerError::Aborted`] with the last known phase if the store
/// or the engine fails structurally.
pub async fn run_match(
    store: &mut BoardStore,
    collector: &DecisionCollector,
    press: &mut PressLog,
    limits: &GameConfig,
    callback: &mut dyn PhaseCallback,
) -> Result<MatchResult, RunnerError> {
    let match_id = MatchId::new();
    let span = info_span!("match", %match_id);
    drive(match_id, store, collector, press, limits, callback)
        .instrument(span)
        .await
}

async fn drive(
    match_id: MatchId,
    store: &mut BoardStore,
    collector: &DecisionCollector,
    press: &mut PressLog,
    limits: &GameConfig,
    callback: &mut dyn PhaseCallback,
) -> Result<MatchResult, RunnerError> {
    let mut summaries: Vec<PhaseSummary> = Vec::new();
    let mut phases_played: u32 = 0;
    let mut state = if store.is_done() {
        TurnState::after_resolution(&store.snapshot(), phases_played, limits)
    } else {
        TurnState::start(store.phase())
    };

    info!(
        phase = %store.phase(),
        max_phases = limits.max_phases,
        max_year = limits.max_year,
        victory_centers = limits.victory_centers,
        "Match starting"
    );

    let end_reason = loop {
        state = match state {
            TurnState::AwaitingDecisions(phase) => {
                let outcome = phase::run_phase(store, collector, press)
                    .await
                    .map_err(|source| abort(phase, source))?;
                match outcome {
                    PhaseOutcome::Resolved(summary) => {
                        phases_played = phases_played.saturating_add(1);
                        let next = summary.next_phase;
                        callback.on_phase(&summary, &store.snapshot());
                        summaries.push(*summary);
                        TurnState::Resolving(next)
                    }
                    PhaseOutcome::NoActivePowers => TurnState::Done(EndReason::NoActivePowers),
                }
            }
            TurnState::Resolving(_) => {
                TurnState::after_resolution(&store.snapshot(), phases_played, limits)
            }
            TurnState::Done(reason) => break reason,
        };
    };

    Ok(MatchResult {
        match_id,
        end_reason,
        phases_played,
        final_snapshot: store.snapshot(),
        summaries,
    })
}

fn abort(phase: PhaseToken, source: StoreError) -> RunnerError {
    let phase = match &source {
        StoreError::Resolution { phase, .. } => *phase,
        StoreError::InvalidActor { .. } | StoreError::IllegalBatch { .. } => phase,
    };
    error!(%phase, error = %source, "Match aborted");
    RunnerError::Aborted { phase, source }
}

/// Log the match end sequence.
pub fn log_match_end(result: &MatchResult) {
    info!(
        match_id = %result.match_id,
        reason = ?result.end_reason,
        phases_played = result.phases_played,
        final_phase = %result.final_snapshot.phase,
        "Match ended"
    );

    for (power, centers) in result.center_counts() {
        let units = result
            .final_snapshot
            .power(power)
            .map_or(0, |s| s.unit_count());
        info!(%power, centers, units, "Final standing");
    }

    if result.summaries.is_empty() {
        warn!("Match ended with no phases played");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use entente_rules::StandardEngine;

    use super::*;
    use crate::collector::SharedDecisionMaker;
    use crate::config::NegotiationConfig;
    use crate::decision::{HoldDecider, RandomDecider};

    fn collector(maker: SharedDecisionMaker) -> DecisionCollector {
        let makers = Power::ALL.iter().map(|p| (*p, Arc::clone(&maker))).collect();
        DecisionCollector::new(makers, NegotiationConfig::default(), Duration::from_secs(5))
    }

    struct Counting(u32);

    impl PhaseCallback for Counting {
        fn on_phase(&mut self, _summary: &PhaseSummary, _snapshot: &BoardSnapshot) {
            self.0 = self.0.saturating_add(1);
        }
    }

    #[tokio::test]
    async fn phase_limit_stops_the_match() {
        let mut store = BoardStore::new(Box::new(StandardEngine::new()));
        let mut press = PressLog::new();
        let limits = GameConfig {
            max_phases: 3,
            ..GameConfig::default()
        };
        let mut counting = Counting(0);

        let result = run_match(
            &mut store,
            &collector(Arc::new(HoldDecider)),
            &mut press,
            &limits,
            &mut counting,
        )
        .await
        .unwrap();

        assert_eq!(result.end_reason, EndReason::PhaseLimit { max_phases: 3 });
        assert_eq!(result.phases_played, 3);
        assert_eq!(counting.0, 3);
        let phases: Vec<String> = result
            .summaries
            .iter()
            .map(|s| s.phase.to_string())
            .collect();
        assert_eq!(phases, ["S1901M", "F1901M", "S1902M"]);
        assert_eq!(result.final_snapshot.phase.to_string(), "F1902M");
        assert_eq!(result.center_counts().values().sum::<usize>(), 22);
    }

    #[tokio::test]
    async fn year_limit_stops_the_match() {
        let mut store = BoardStore::new(Box::new(StandardEngine::new()));
        let limits = GameConfig {
            max_year: 1902,
            ..GameConfig::default()
        };
        let result = run_match(
            &mut store,
            &collector(Arc::new(RandomDecider::new(3))),
            &mut PressLog::new(),
            &limits,
            &mut NoOpCallback,
        )
        .await
        .unwrap();

        assert_eq!(result.end_reason, EndReason::YearLimit { max_year: 1902 });
        assert_eq!(result.final_snapshot.year(), 1903);
        assert!(result.summaries.iter().all(|s| s.rejected.is_empty()));
        assert!(
            result
                .summaries
                .windows(2)
                .all(|w| w.first().map(|a| a.next_phase) == w.get(1).map(|b| b.phase))
        );
    }

    #[test]
    fn runner_error_reports_resolution_phase() {
        let phase: PhaseToken = "F1903M".parse().unwrap();
        let err = abort(
            PhaseToken::opening(),
            StoreError::Resolution {
                phase,
                source: entente_rules::RulesError::MatchOver,
            },
        );
        assert_eq!(err.phase(), phase);
    }
}
