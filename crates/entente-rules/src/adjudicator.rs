//! Movement-phase adjudication.
//!
//! Orders are first normalised against the map: anything a unit cannot
//! physically carry out (a move to a non-adjacent province, a support the
//! supporter cannot reach) becomes a hold. Moves are then resolved by
//! repeated strength comparison until every move has succeeded or failed.
//!
//! Strength terms:
//!
//! - *attack*: 1 plus supports. Zero against a unit of the mover's own
//!   power that stays put, and supports from the defender's power do not
//!   count against that defender.
//! - *hold*: 1 plus hold supports for a stationary unit, 1 for a unit whose
//!   move failed, 0 for an empty province or a unit that moved away.
//! - *defend*: the attack strength of the opposing unit in a head-to-head.
//! - *prevent*: 1 plus supports for any other move into the same province,
//!   0 if that move lost a head-to-head battle.
//!
//! A move succeeds when its attack beats every opposing strength. Moves
//! still undecided after the fixed point form rings and all succeed.
//! Supports cut by dislodgement and convoys broken by a dislodged fleet are
//! fed back in, and the board is re-resolved until nothing changes.

use std::collections::{BTreeMap, BTreeSet};

use entente_types::{Power, UnitType};
use tracing::trace;

use crate::map::{Map, province_of};
use crate::order::OrderKind;

/// A unit taking part in adjudication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    /// Owner.
    pub power: Power,
    /// Army or fleet.
    pub unit_type: UnitType,
    /// Current location (with coast for fleets on split coasts).
    pub location: &'static str,
}

/// Result of adjudicating one movement phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementOutcome {
    /// Successful moves, origin province to destination location.
    pub moves: BTreeMap<&'static str, &'static str>,
    /// Dislodged units by province, with the attacker's origin province
    /// when the attack came over land or along a coast. Convoyed attackers
    /// leave no origin, so the dislodged unit may retreat there.
    pub dislodged: BTreeMap<&'static str, Option<&'static str>>,
    /// Provinces that at least one move targeted and none entered.
    pub standoffs: BTreeSet<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Hold,
    Move {
        dest_loc: &'static str,
        dest: &'static str,
        convoy: bool,
    },
    SupportHold {
        target: &'static str,
    },
    SupportMove {
        target: &'static str,
        dest: &'static str,
    },
    Convoy {
        army: &'static str,
        dest: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Move {
    dest_loc: &'static str,
    dest: &'static str,
    convoy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Unresolved,
    Succeeds,
    Fails,
}

type Bounds = (usize, usize);

/// Adjudicate a movement phase.
///
/// `pieces` and `orders` are keyed by the province of the ordered unit.
/// Units without an order hold.
pub fn adjudicate(
    map: &Map,
    pieces: &BTreeMap<&'static str, Piece>,
    orders: &BTreeMap<&'static str, OrderKind>,
) -> MovementOutcome {
    let intents = pieces
        .iter()
        .map(|(province, piece)| {
            let kind = orders.get(province).copied().unwrap_or(OrderKind::Hold);
            (*province, normalise(map, pieces, *province, piece, kind))
        })
        .collect();
    let board = Board {
        map,
        pieces,
        intents,
    };

    let mut broken_convoys = BTreeSet::new();
    let mut dislodged_supporters = BTreeSet::new();
    loop {
        let round = board.resolve(&broken_convoys, &dislodged_supporters);

        let mut changed = false;
        for province in round.dislodged.keys() {
            match board.intents.get(province) {
                Some(Intent::Convoy { .. }) => changed |= broken_convoys.insert(*province),
                Some(Intent::SupportHold { .. } | Intent::SupportMove { .. }) => {
                    changed |= dislodged_supporters.insert(*province);
                }
                _ => {}
            }
        }
        if !changed {
            return round;
        }
        trace!(
            broken_convoys = broken_convoys.len(),
            cut_supports = dislodged_supporters.len(),
            "re-resolving after dislodgement"
        );
    }
}

fn normalise(
    map: &Map,
    pieces: &BTreeMap<&'static str, Piece>,
    province: &'static str,
    piece: &Piece,
    kind: OrderKind,
) -> Intent {
    match kind {
        OrderKind::Move { dest, via_convoy } => {
            let dest_province = province_of(dest);
            if dest_province == province {
                return Intent::Hold;
            }
            match piece.unit_type {
                UnitType::Army => {
                    let by_land = map.move_target(UnitType::Army, piece.location, dest_province);
                    if let (Some(d), false) = (by_land, via_convoy) {
                        return Intent::Move {
                            dest_loc: d,
                            dest: d,
                            convoy: false,
                        };
                    }
                    if map.is_coastal(province) && map.is_coastal(dest_province) {
                        Intent::Move {
                            dest_loc: dest_province,
                            dest: dest_province,
                            convoy: true,
                        }
                    } else {
                        Intent::Hold
                    }
                }
                UnitType::Fleet => map
                    .move_target(UnitType::Fleet, piece.location, dest)
                    .map_or(Intent::Hold, |d| Intent::Move {
                        dest_loc: d,
                        dest: province_of(d),
                        convoy: false,
                    }),
            }
        }
        OrderKind::SupportHold { target, .. } => {
            let target = province_of(target);
            if target != province
                && pieces.contains_key(target)
                && map.reaches_province(piece.unit_type, piece.location, target)
            {
                Intent::SupportHold { target }
            } else {
                Intent::Hold
            }
        }
        OrderKind::SupportMove { target, dest, .. } => {
            let target = province_of(target);
            if target != province
                && dest != province
                && pieces.contains_key(target)
                && map.reaches_province(piece.unit_type, piece.location, dest)
            {
                Intent::SupportMove { target, dest }
            } else {
                Intent::Hold
            }
        }
        OrderKind::Convoy { army, dest } => {
            let army_piece = pieces.get(army);
            if piece.unit_type == UnitType::Fleet
                && map.is_sea(province)
                && army_piece.is_some_and(|a| a.unit_type == UnitType::Army)
            {
                Intent::Convoy { army, dest }
            } else {
                Intent::Hold
            }
        }
        OrderKind::Hold
        | OrderKind::Retreat { .. }
        | OrderKind::Disband
        | OrderKind::Build => Intent::Hold,
    }
}

struct Board<'a> {
    map: &'a Map,
    pieces: &'a BTreeMap<&'static str, Piece>,
    intents: BTreeMap<&'static str, Intent>,
}

impl Board<'_> {
    fn power_at(&self, province: &str) -> Option<Power> {
        self.pieces.get(province).map(|p| p.power)
    }

    /// Moves that can physically happen: land and coast moves, plus
    /// convoyed moves with an intact chain of convoying fleets.
    fn valid_moves(&self, broken: &BTreeSet<&'static str>) -> BTreeMap<&'static str, Move> {
        self.intents
            .iter()
            .filter_map(|(origin, intent)| {
                let Intent::Move {
                    dest_loc,
                    dest,
                    convoy,
                } = *intent
                else {
                    return None;
                };
                if convoy {
                    let seas: BTreeSet<&'static str> = self
                        .intents
                        .iter()
                        .filter(|(sea, i)| {
                            **i == Intent::Convoy {
                                army: *origin,
                                dest,
                            } && !broken.contains(*sea)
                        })
                        .map(|(sea, _)| *sea)
                        .collect();
                    if !self.map.convoy_path_exists(*origin, dest, &seas) {
                        return None;
                    }
                }
                Some((
                    *origin,
                    Move {
                        dest_loc,
                        dest,
                        convoy,
                    },
                ))
            })
            .collect()
    }

    /// Supporters whose support is cut, either by an attack from a province
    /// other than the one the support is aimed at, or by dislodgement.
    fn cut_supports(
        &self,
        moves: &BTreeMap<&'static str, Move>,
        dislodged_supporters: &BTreeSet<&'static str>,
    ) -> BTreeSet<&'static str> {
        self.intents
            .iter()
            .filter(|(province, intent)| {
                let aimed_at = match intent {
                    Intent::SupportMove { dest, .. } => Some(*dest),
                    Intent::SupportHold { .. } => None,
                    _ => return false,
                };
                if dislodged_supporters.contains(*province) {
                    return true;
                }
                let defender = self.power_at(province);
                moves.iter().any(|(origin, mv)| {
                    mv.dest == **province
                        && self.power_at(origin) != defender
                        && aimed_at != Some(*origin)
                })
            })
            .map(|(province, _)| *province)
            .collect()
    }

    /// Powers of the uncut supporters of the move from `origin`.
    fn move_support(
        &self,
        origin: &str,
        mv: &Move,
        cut: &BTreeSet<&'static str>,
    ) -> Vec<Power> {
        self.intents
            .iter()
            .filter(|(supporter, intent)| {
                !cut.contains(*supporter)
                    && matches!(intent, Intent::SupportMove { target, dest }
                        if *target == origin && *dest == mv.dest)
            })
            .filter_map(|(supporter, _)| self.power_at(supporter))
            .collect()
    }

    /// Hold strength of a unit that was not ordered to move.
    fn hold_strength(&self, province: &str, cut: &BTreeSet<&'static str>) -> usize {
        let supports = self
            .intents
            .iter()
            .filter(|(supporter, intent)| {
                !cut.contains(*supporter)
                    && matches!(intent, Intent::SupportHold { target } if *target == province)
            })
            .count();
        supports.saturating_add(1)
    }

    fn resolve(
        &self,
        broken: &BTreeSet<&'static str>,
        dislodged_supporters: &BTreeSet<&'static str>,
    ) -> MovementOutcome {
        let moves = self.valid_moves(broken);
        let cut = self.cut_supports(&moves, dislodged_supporters);
        let mut state: BTreeMap<&'static str, Resolution> = moves
            .keys()
            .map(|o| (*o, Resolution::Unresolved))
            .collect();

        loop {
            let mut changed = false;
            for (origin, mv) in &moves {
                if state.get(origin) != Some(&Resolution::Unresolved) {
                    continue;
                }
                if let Some(success) = self.decide(*origin, mv, &moves, &state, &cut) {
                    let outcome = if success {
                        Resolution::Succeeds
                    } else {
                        Resolution::Fails
                    };
                    state.insert(*origin, outcome);
                    changed = true;
                }
            }
            if changed {
                continue;
            }
            let unresolved: Vec<&'static str> = state
                .iter()
                .filter(|(_, r)| **r == Resolution::Unresolved)
                .map(|(o, _)| *o)
                .collect();
            let Some(first) = unresolved.first() else {
                break;
            };
            if let Some(ring) = find_ring(&moves, &state) {
                for origin in ring {
                    state.insert(origin, Resolution::Succeeds);
                }
            } else {
                state.insert(*first, Resolution::Fails);
            }
        }

        self.outcome(&moves, &state)
    }

    fn decide(
        &self,
        origin: &'static str,
        mv: &Move,
        moves: &BTreeMap<&'static str, Move>,
        state: &BTreeMap<&'static str, Resolution>,
        cut: &BTreeSet<&'static str>,
    ) -> Option<bool> {
        let mover = self.power_at(origin)?;
        let supporters = self.move_support(origin, mv, cut);
        let full = supporters.len().saturating_add(1);
        let occupant = self.power_at(mv.dest);
        let occupant_move = moves.get(mv.dest);
        let occupant_state = state.get(mv.dest).copied();
        let head_to_head = occupant_move
            .is_some_and(|o| o.dest == origin && !o.convoy && !mv.convoy);

        let staying_attack = |defender: Power| -> usize {
            if defender == mover {
                0
            } else {
                supporters
                    .iter()
                    .filter(|p| **p != defender)
                    .count()
                    .saturating_add(1)
            }
        };

        let attack: Bounds = match (occupant, occupant_move) {
            (None, _) => (full, full),
            (Some(defender), None) => (staying_attack(defender), staying_attack(defender)),
            (Some(defender), Some(_)) if head_to_head => {
                (staying_attack(defender), staying_attack(defender))
            }
            (Some(defender), Some(_)) => match occupant_state {
                Some(Resolution::Succeeds) => (full, full),
                Some(Resolution::Fails) => (staying_attack(defender), staying_attack(defender)),
                _ => (staying_attack(defender), full),
            },
        };

        let mut opposition: Vec<Bounds> = Vec::new();
        if occupant.is_some() {
            let resisting = match occupant_move {
                None => {
                    let h = self.hold_strength(mv.dest, cut);
                    (h, h)
                }
                Some(theirs) if head_to_head => {
                    let d = self
                        .move_support(mv.dest, theirs, cut)
                        .len()
                        .saturating_add(1);
                    (d, d)
                }
                Some(_) => match occupant_state {
                    Some(Resolution::Succeeds) => (0, 0),
                    Some(Resolution::Fails) => (1, 1),
                    _ => (0, 1),
                },
            };
            opposition.push(resisting);
        }
        for (rival, theirs) in moves {
            if *rival == origin || theirs.dest != mv.dest {
                continue;
            }
            let prevent = self
                .move_support(rival, theirs, cut)
                .len()
                .saturating_add(1);
            let lost_head_to_head = occupant_move
                .is_some_and(|o| o.dest == *rival && !o.convoy && !theirs.convoy);
            let bounds = if lost_head_to_head {
                match occupant_state {
                    Some(Resolution::Succeeds) => (0, 0),
                    Some(Resolution::Fails) => (prevent, prevent),
                    _ => (0, prevent),
                }
            } else {
                (prevent, prevent)
            };
            opposition.push(bounds);
        }

        let (attack_min, attack_max) = attack;
        if opposition.iter().all(|(_, max)| attack_min > *max) {
            Some(true)
        } else if opposition.iter().any(|(min, _)| attack_max <= *min) {
            Some(false)
        } else {
            None
        }
    }

    fn outcome(
        &self,
        moves: &BTreeMap<&'static str, Move>,
        state: &BTreeMap<&'static str, Resolution>,
    ) -> MovementOutcome {
        let succeeded = |origin: &str| state.get(origin) == Some(&Resolution::Succeeds);

        let successful: BTreeMap<&'static str, &'static str> = moves
            .iter()
            .filter(|(o, _)| succeeded(o))
            .map(|(o, mv)| (*o, mv.dest_loc))
            .collect();

        let mut dislodged = BTreeMap::new();
        for province in self.pieces.keys() {
            if succeeded(province) {
                continue;
            }
            let attacker = moves
                .iter()
                .find(|(o, mv)| mv.dest == *province && succeeded(o));
            if let Some((origin, mv)) = attacker {
                dislodged.insert(*province, (!mv.convoy).then_some(*origin));
            }
        }

        let standoffs = moves
            .values()
            .map(|mv| mv.dest)
            .filter(|dest| {
                !moves
                    .iter()
                    .any(|(o, mv)| mv.dest == *dest && succeeded(o))
            })
            .collect();

        MovementOutcome {
            moves: successful,
            dislodged,
            standoffs,
        }
    }
}

/// Find a closed chain of unresolved moves, each into the province the
/// next one is leaving.
fn find_ring(
    moves: &BTreeMap<&'static str, Move>,
    state: &BTreeMap<&'static str, Resolution>,
) -> Option<Vec<&'static str>> {
    let unresolved = |o: &str| state.get(o) == Some(&Resolution::Unresolved);
    for start in moves.keys().filter(|o| unresolved(o)) {
        let mut path: Vec<&'static str> = vec![*start];
        let mut current = *start;
        while let Some(mv) = moves.get(current) {
            let next = mv.dest;
            if !unresolved(next) {
                break;
            }
            if let Some(pos) = path.iter().position(|p| *p == next) {
                return Some(path.split_off(pos));
            }
            path.push(next);
            current = next;
        }
    }
    None
}
