//! The board state store.
//!
//! [`BoardStore`] owns the rules engine for a match. It projects snapshots
//! out of the engine, validates order batches against the legal-action
//! catalog before they can reach the engine, and is the only path through
//! which a phase is resolved.
//!
//! Staging is local: accepted batches are held in the store and handed to
//! the engine together in [`BoardStore::commit_and_resolve`]. The engine
//! never sees an order that failed validation.

use std::collections::BTreeMap;

use entente_rules::RulesEngine;
use entente_types::{BoardSnapshot, LegalActions, Order, PhaseToken, Power, PowerState};
use tracing::{debug, info, warn};

use crate::catalog;
use crate::error::StoreError;

/// Outcome of an accepted [`BoardStore::stage_actions`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBatch {
    /// The submitting power.
    pub power: Power,
    /// The phase the batch was staged for.
    pub phase: PhaseToken,
    /// Number of orders staged. Zero means hold everywhere.
    pub order_count: usize,
    /// Whether an earlier batch from the same power was replaced.
    pub replaced: bool,
}

/// The single owner of a match's board state.
pub struct BoardStore {
    engine: Box<dyn RulesEngine>,
    staged: BTreeMap<Power, Vec<Order>>,
}

impl BoardStore {
    /// Wrap an engine positioned at the phase where play starts.
    pub fn new(engine: Box<dyn RulesEngine>) -> Self {
        Self {
            engine,
            staged: BTreeMap::new(),
        }
    }

    /// The current phase.
    pub fn phase(&self) -> PhaseToken {
        self.engine.current_phase()
    }

    /// Whether the engine has declared the match over.
    pub fn is_done(&self) -> bool {
        self.engine.is_done()
    }

    /// Powers taking part in the match.
    pub fn powers(&self) -> Vec<Power> {
        self.engine.powers()
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &dyn RulesEngine {
        self.engine.as_ref()
    }

    /// Project the current position. Press history is left empty; the
    /// caller attaches whatever press the audience may see.
    pub fn snapshot(&self) -> BoardSnapshot {
        let powers = self
            .engine
            .powers()
            .into_iter()
            .map(|power| {
                let state = PowerState {
                    centers: self.engine.centers(power),
                    units: self.engine.units(power),
                };
                (power, state)
            })
            .collect();
        BoardSnapshot {
            phase: self.engine.current_phase(),
            done: self.engine.is_done(),
            powers,
            unowned_centers: self.engine.unowned_centers(),
            recent_press: Vec::new(),
        }
    }

    /// The legal-action catalog for `power` in the current phase.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidActor`] if `power` is not in the match.
    pub fn legal_actions(&self, power: Power) -> Result<LegalActions, StoreError> {
        catalog::legal_actions(self.engine.as_ref(), power)
    }

    /// Catalogs for several powers from one engine query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidActor`] if any power is not in the match.
    pub fn legal_actions_for(
        &self,
        powers: &[Power],
    ) -> Result<BTreeMap<Power, LegalActions>, StoreError> {
        catalog::legal_actions_for(self.engine.as_ref(), powers)
    }

    /// Validate and stage a batch of orders for `power`.
    ///
    /// The batch is accepted only if every order is a member of the power's
    /// current catalog. An accepted batch replaces any earlier batch from
    /// the same power; an empty batch is accepted and means hold everywhere.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IllegalBatch`] listing the offending orders if
    /// any order is not in the catalog. Nothing from the batch is staged
    /// and an earlier accepted batch stays in place. Returns
    /// [`StoreError::InvalidActor`] if `power` is not in the match.
    pub fn stage_actions(
        &mut self,
        power: Power,
        orders: Vec<Order>,
    ) -> Result<StagedBatch, StoreError> {
        let catalog = self.legal_actions(power)?;
        self.stage_against(&catalog, power, orders)
    }

    /// [`stage_actions`](Self::stage_actions) against a catalog already
    /// fetched from this store's engine for the current phase. The catalog
    /// must come from the engine, so this stays inside the crate.
    ///
    /// # Errors
    ///
    /// As for [`stage_actions`](Self::stage_actions).
    pub(crate) fn stage_against(
        &mut self,
        catalog: &LegalActions,
        power: Power,
        orders: Vec<Order>,
    ) -> Result<StagedBatch, StoreError> {
        let phase = self.engine.current_phase();
        if !self.engine.powers().contains(&power) {
            return Err(StoreError::InvalidActor { power });
        }

        let illegal = catalog.illegal_in(&orders);
        if !illegal.is_empty() {
            warn!(
                %phase,
                %power,
                submitted = orders.len(),
                illegal = ?illegal.iter().map(Order::as_str).collect::<Vec<_>>(),
                "ORDERS_REJECTED"
            );
            return Err(StoreError::IllegalBatch { power, illegal });
        }

        let order_count = orders.len();
        let replaced = self.staged.insert(power, orders).is_some();
        info!(%phase, %power, orders = order_count, replaced, "ORDERS_ACCEPTED");
        Ok(StagedBatch {
            power,
            phase,
            order_count,
            replaced,
        })
    }

    /// The batch currently staged for `power`, if any.
    pub fn staged(&self, power: Power) -> Option<&[Order]> {
        self.staged.get(&power).map(Vec::as_slice)
    }

    /// Hand every staged batch to the engine, resolve the phase, and clear
    /// the staging area. Returns the new phase.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Resolution`] carrying the phase being resolved
    /// if the engine refuses a staged batch or fails to process.
    pub fn commit_and_resolve(&mut self) -> Result<PhaseToken, StoreError> {
        let phase = self.engine.current_phase();
        let staged = std::mem::take(&mut self.staged);

        for (power, orders) in &staged {
            debug!(%phase, %power, orders = orders.len(), "handing orders to engine");
            self.engine
                .set_orders(*power, orders)
                .map_err(|source| StoreError::Resolution { phase, source })?;
        }

        let next = self
            .engine
            .process()
            .map_err(|source| StoreError::Resolution { phase, source })?;
        info!(from = %phase, to = %next, done = self.engine.is_done(), "Phase resolved");
        Ok(next)
    }
}

impl core::fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BoardStore")
            .field("phase", &self.engine.current_phase())
            .field("staged", &self.staged)
            .finish_non_exhaustive()
    }
}
