//! Actor view construction.

use entente_types::{ActorView, BoardSnapshot, LegalActions, Power, Recipient};

use crate::error::StoreError;
use crate::press::PressLog;

/// Build the view `power` decides from.
///
/// The view carries the power's own holdings, every power's public centre
/// and unit counts, its catalog, and the last `history_limit` press
/// messages it may read. The embedded board keeps only broadcasts, so a
/// view never exposes private press between other powers.
///
/// # Errors
///
/// Returns [`StoreError::InvalidActor`] if the snapshot has no entry for
/// `power`.
pub fn build_view(
    snapshot: &BoardSnapshot,
    power: Power,
    legal_actions: LegalActions,
    press: &PressLog,
    history_limit: usize,
) -> Result<ActorView, StoreError> {
    let state = snapshot
        .power(power)
        .ok_or(StoreError::InvalidActor { power })?;

    let mut board = snapshot.clone();
    board.recent_press.retain(|m| m.recipient == Recipient::All);

    Ok(ActorView {
        power,
        phase: snapshot.phase,
        own_units: state.units_by_location(),
        own_centers: state.centers.clone(),
        dislodged: state
            .units
            .iter()
            .filter(|u| u.dislodged)
            .map(|u| u.location.clone())
            .collect(),
        center_counts: snapshot.center_counts(),
        unit_counts: snapshot.unit_counts(),
        legal_actions,
        press_history: press.visible_to(power, history_limit),
        board,
    })
}
