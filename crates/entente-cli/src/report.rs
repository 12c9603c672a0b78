//! Progress callback and end-of-match reporting.
//!
//! [`HistoryCallback`] records the board after every resolved phase.
//! [`standings_table`] renders the final table printed to stdout, and
//! [`write_record`] saves the whole match as one JSON document.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use entente_core::phase::{EndReason, PhaseSummary};
use entente_core::runner::{MatchResult, PhaseCallback};
use entente_types::{BoardSnapshot, PhaseToken, PressMessage};
use serde::Serialize;
use tracing::info;

/// The board after one resolved phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRecord {
    /// The phase that was resolved.
    pub resolved: PhaseToken,
    /// The board after resolution.
    pub snapshot: BoardSnapshot,
}

/// Phase callback that logs standings and keeps the board history.
#[derive(Debug, Default)]
pub struct HistoryCallback {
    history: Vec<PhaseRecord>,
}

impl HistoryCallback {
    /// Create an empty history.
    pub const fn new() -> Self {
        Self {
            history: Vec::new(),
        }
    }

    /// Recorded phases, oldest first.
    pub fn history(&self) -> &[PhaseRecord] {
        &self.history
    }
}

impl PhaseCallback for HistoryCallback {
    fn on_phase(&mut self, summary: &PhaseSummary, snapshot: &BoardSnapshot) {
        let standings: Vec<String> = summary
            .center_counts
            .iter()
            .filter(|(_, centers)| **centers > 0)
            .map(|(power, centers)| format!("{power}={centers}"))
            .collect();
        info!(
            phase = %summary.phase,
            next = %summary.next_phase,
            standings = %standings.join(" "),
            "Standings"
        );
        self.history.push(PhaseRecord {
            resolved: summary.phase,
            snapshot: snapshot.clone(),
        });
    }
}

/// A one-line description of why the match ended.
pub fn describe_end(reason: &EndReason) -> String {
    match reason {
        EndReason::Victory { power, centers } => {
            format!("{power} wins with {centers} supply centres")
        }
        EndReason::Stalemate => "the engine ended the match without a winner".to_owned(),
        EndReason::PhaseLimit { max_phases } => format!("phase limit of {max_phases} reached"),
        EndReason::YearLimit { max_year } => format!("year limit {max_year} passed"),
        EndReason::NoActivePowers => "no active powers left".to_owned(),
    }
}

/// Render the final standings: one row per power, most centres first.
pub fn standings_table(result: &MatchResult) -> String {
    let snapshot = &result.final_snapshot;
    let mut rows: Vec<(String, usize, usize)> = snapshot
        .powers
        .iter()
        .map(|(power, state)| (power.to_string(), state.center_count(), state.unit_count()))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Match {} ended in {} after {} phases: {}",
        result.match_id,
        snapshot.phase,
        result.phases_played,
        describe_end(&result.end_reason)
    );
    let _ = writeln!(out, "{:<10} {:>7} {:>5}", "POWER", "CENTRES", "UNITS");
    for (power, centers, units) in rows {
        let _ = writeln!(out, "{power:<10} {centers:>7} {units:>5}");
    }
    out
}

/// Everything written by `--output`.
#[derive(Debug, Serialize)]
pub struct MatchRecord<'a> {
    /// The match result, including per-phase summaries.
    pub result: &'a MatchResult,
    /// The board after every resolved phase.
    pub history: &'a [PhaseRecord],
    /// Every press message, in send order.
    pub press: &'a [PressMessage],
}

/// Write a match record as pretty-printed JSON.
pub fn write_record(path: &Path, record: &MatchRecord<'_>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(record).context("failed to serialize match record")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write match record to {}", path.display()))?;
    info!(path = %path.display(), "Match record written");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use entente_types::{MatchId, Power, PowerState, Unit, UnitType};

    use super::*;

    fn result(end_reason: EndReason) -> MatchResult {
        let phase = PhaseToken::opening();
        let mut powers = BTreeMap::new();
        powers.insert(
            Power::France,
            PowerState {
                centers: vec!["PAR".into(), "MAR".into(), "BRE".into(), "SPA".into()],
                units: vec![
                    Unit::new(UnitType::Army, "PAR"),
                    Unit::new(UnitType::Fleet, "BRE"),
                ],
            },
        );
        powers.insert(
            Power::Austria,
            PowerState {
                centers: vec!["VIE".into()],
                units: vec![Unit::new(UnitType::Army, "VIE")],
            },
        );
        powers.insert(Power::Italy, PowerState::default());
        MatchResult {
            match_id: MatchId::new(),
            end_reason,
            phases_played: 6,
            final_snapshot: BoardSnapshot {
                phase,
                done: false,
                powers,
                unowned_centers: Vec::new(),
                recent_press: Vec::new(),
            },
            summaries: Vec::new(),
        }
    }

    #[test]
    fn table_lists_powers_by_centres() {
        let table = standings_table(&result(EndReason::PhaseLimit { max_phases: 6 }));
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines.first().unwrap().ends_with("phase limit of 6 reached"));
        assert!(lines.get(2).unwrap().starts_with("FRANCE"));
        assert!(lines.get(2).unwrap().ends_with("4     2"));
        assert!(lines.get(3).unwrap().starts_with("AUSTRIA"));
        assert!(lines.get(4).unwrap().starts_with("ITALY"));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn end_reasons_read_plainly() {
        assert_eq!(
            describe_end(&EndReason::Victory {
                power: Power::Turkey,
                centers: 18
            }),
            "TURKEY wins with 18 supply centres"
        );
        assert_eq!(
            describe_end(&EndReason::YearLimit { max_year: 1905 }),
            "year limit 1905 passed"
        );
    }

    #[test]
    fn record_is_written_as_json() {
        let result = result(EndReason::Stalemate);
        let history = vec![PhaseRecord {
            resolved: PhaseToken::opening(),
            snapshot: result.final_snapshot.clone(),
        }];
        let press = vec![PressMessage {
            seq: 0,
            phase: PhaseToken::opening(),
            sender: Power::France,
            recipient: entente_types::Recipient::All,
            text: "Peace in the west".to_owned(),
            sent_at: chrono::Utc::now(),
        }];
        let path = std::env::temp_dir().join(format!("entente-record-{}.json", result.match_id));
        write_record(
            &path,
            &MatchRecord {
                result: &result,
                history: &history,
                press: &press,
            },
        )
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            written.pointer("/history").and_then(serde_json::Value::as_array).map(Vec::len),
            Some(1)
        );
        assert_eq!(
            written.pointer("/press/0/text").and_then(serde_json::Value::as_str),
            Some("Peace in the west")
        );
        assert_eq!(
            written.pointer("/result/phases_played").and_then(serde_json::Value::as_u64),
            Some(6)
        );
    }
}
