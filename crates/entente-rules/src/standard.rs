//! The reference rules engine for the classic map.
//!
//! [`StandardEngine`] keeps the whole board in memory and implements
//! [`RulesEngine`]. Phases cycle Spring movement, optional Spring retreats,
//! Fall movement, optional Fall retreats, then a Winter adjustment phase
//! when any power owes builds or disbands. Supply-centre ownership changes
//! at the end of Fall, and the match ends when one power reaches the
//! victory threshold.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use entente_types::{Location, Order, PhaseToken, PhaseType, Power, Season, Unit, UnitType};
use tracing::{debug, info};

use crate::adjudicator::{Piece, adjudicate};
use crate::engine::RulesEngine;
use crate::error::RulesError;
use crate::map::{self, Map, province_of};
use crate::order::{self, OrderKind, ParsedOrder};

/// Supply centres needed to win on the classic map.
pub const DEFAULT_VICTORY_CENTERS: usize = 18;

/// A dislodged unit and the locations it may retreat to.
#[derive(Debug, Clone)]
struct Dislodged {
    piece: Piece,
    retreats: BTreeSet<&'static str>,
}

/// In-memory classic-map engine.
#[derive(Debug, Clone)]
pub struct StandardEngine {
    map: &'static Map,
    phase: PhaseToken,
    done: bool,
    victory_centers: usize,
    units: BTreeMap<&'static str, Piece>,
    dislodged: BTreeMap<&'static str, Dislodged>,
    owners: BTreeMap<&'static str, Power>,
    orders: BTreeMap<Power, Vec<ParsedOrder>>,
}

impl Default for StandardEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardEngine {
    /// The classic opening position at `S1901M`.
    pub fn new() -> Self {
        let map = map::classic();
        let units = map::STARTING_UNITS
            .iter()
            .map(|&(power, unit_type, location)| {
                (
                    province_of(location),
                    Piece {
                        power,
                        unit_type,
                        location,
                    },
                )
            })
            .collect();
        let owners = Power::ALL
            .iter()
            .flat_map(|p| map.home_centers(*p).into_iter().map(move |c| (c, *p)))
            .collect();
        Self {
            map,
            phase: PhaseToken::opening(),
            done: false,
            victory_centers: DEFAULT_VICTORY_CENTERS,
            units,
            dislodged: BTreeMap::new(),
            owners,
            orders: BTreeMap::new(),
        }
    }

    /// Start from an arbitrary position.
    ///
    /// `phase` must be a movement or adjustment phase. Every unit location
    /// must exist and suit the unit type, no province may hold two units,
    /// and every listed centre must be a supply centre owned at most once.
    pub fn from_position(
        phase: PhaseToken,
        units: &BTreeMap<Power, Vec<Unit>>,
        centers: &BTreeMap<Power, Vec<Location>>,
    ) -> Result<Self, RulesError> {
        if phase.phase_type == PhaseType::Retreat {
            return Err(RulesError::InvalidPosition(format!(
                "cannot start in retreat phase {phase}"
            )));
        }
        let map = map::classic();

        let mut placed = BTreeMap::new();
        for (power, list) in units {
            for unit in list {
                let location = map.canonical(unit.location.as_str()).ok_or_else(|| {
                    RulesError::InvalidPosition(format!("unknown location {}", unit.location))
                })?;
                if !map.can_occupy(unit.unit_type, location) {
                    return Err(RulesError::InvalidPosition(format!(
                        "{} cannot stand at {location}",
                        unit.unit_type
                    )));
                }
                let piece = Piece {
                    power: *power,
                    unit_type: unit.unit_type,
                    location,
                };
                if placed.insert(province_of(location), piece).is_some() {
                    return Err(RulesError::InvalidPosition(format!(
                        "two units in {}",
                        province_of(location)
                    )));
                }
            }
        }

        let mut owners = BTreeMap::new();
        for (power, list) in centers {
            for center in list {
                let province = map
                    .canonical(center.province())
                    .filter(|p| map.province(p).is_some_and(|info| info.supply_center))
                    .ok_or_else(|| {
                        RulesError::InvalidPosition(format!("{center} is not a supply centre"))
                    })?;
                if owners.insert(province, *power).is_some() {
                    return Err(RulesError::InvalidPosition(format!(
                        "{province} owned twice"
                    )));
                }
            }
        }

        Ok(Self {
            map,
            phase,
            done: false,
            victory_centers: DEFAULT_VICTORY_CENTERS,
            units: placed,
            dislodged: BTreeMap::new(),
            owners,
            orders: BTreeMap::new(),
        })
    }

    /// Override the number of supply centres that wins the match.
    #[must_use]
    pub const fn with_victory_centers(mut self, centers: usize) -> Self {
        self.victory_centers = centers;
        self
    }

    fn center_count(&self, power: Power) -> usize {
        self.owners.values().filter(|p| **p == power).count()
    }

    fn unit_count(&self, power: Power) -> usize {
        self.units.values().filter(|u| u.power == power).count()
    }

    /// Owned, unoccupied home centres of `power`.
    fn free_build_sites(&self, power: Power) -> Vec<&'static str> {
        self.map
            .home_centers(power)
            .into_iter()
            .filter(|c| self.owners.get(c) == Some(&power) && !self.units.contains_key(c))
            .collect()
    }

    /// Seas holding a fleet that connect to `army_province` through other
    /// fleet-held seas.
    fn convoy_network(&self, army_province: &'static str) -> BTreeSet<&'static str> {
        let fleet_seas: BTreeSet<&'static str> = self
            .units
            .iter()
            .filter(|(p, u)| u.unit_type == UnitType::Fleet && self.map.is_sea(p))
            .map(|(p, _)| *p)
            .collect();
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&'static str> = self
            .map
            .seas_touching(army_province)
            .into_iter()
            .filter(|s| fleet_seas.contains(s))
            .collect();
        while let Some(sea) = queue.pop_front() {
            if seen.insert(sea) {
                queue.extend(self.map.seas_adjacent(sea).filter(|s| fleet_seas.contains(s)));
            }
        }
        seen
    }

    fn convoy_destinations(&self, network: &BTreeSet<&'static str>, origin: &str) -> BTreeSet<&'static str> {
        network
            .iter()
            .flat_map(|sea| self.map.coasts_touching(*sea))
            .filter(|c| *c != origin)
            .collect()
    }

    /// Provinces the unit could enter this phase, by land, sea, or convoy.
    fn reachable_provinces(&self, province: &'static str, piece: &Piece) -> BTreeSet<&'static str> {
        let mut reach: BTreeSet<&'static str> = self
            .map
            .neighbours(piece.unit_type, piece.location)
            .map(province_of)
            .collect();
        if piece.unit_type == UnitType::Army && self.map.is_coastal(province) {
            let network = self.convoy_network(province);
            reach.extend(self.convoy_destinations(&network, province));
        }
        reach
    }

    fn movement_options(&self, province: &'static str, piece: &Piece) -> Vec<ParsedOrder> {
        let order = |kind| ParsedOrder {
            unit_type: piece.unit_type,
            location: piece.location,
            kind,
        };
        let mut options = vec![order(OrderKind::Hold)];

        for dest in self.map.neighbours(piece.unit_type, piece.location) {
            options.push(order(OrderKind::Move {
                dest,
                via_convoy: false,
            }));
        }
        if piece.unit_type == UnitType::Army && self.map.is_coastal(province) {
            let network = self.convoy_network(province);
            for dest in self.convoy_destinations(&network, province) {
                options.push(order(OrderKind::Move {
                    dest,
                    via_convoy: true,
                }));
            }
        }

        for (other_province, other) in &self.units {
            if *other_province == province {
                continue;
            }
            if self
                .map
                .reaches_province(piece.unit_type, piece.location, other_province)
            {
                options.push(order(OrderKind::SupportHold {
                    target_type: other.unit_type,
                    target: other.location,
                }));
            }
            for dest in self.reachable_provinces(*other_province, other) {
                if dest != province
                    && self
                        .map
                        .reaches_province(piece.unit_type, piece.location, dest)
                {
                    options.push(order(OrderKind::SupportMove {
                        target_type: other.unit_type,
                        target: other.location,
                        dest,
                    }));
                }
            }
        }

        if piece.unit_type == UnitType::Fleet && self.map.is_sea(province) {
            for (army_province, army) in &self.units {
                if army.unit_type != UnitType::Army || !self.map.is_coastal(army_province) {
                    continue;
                }
                let network = self.convoy_network(*army_province);
                if !network.contains(province) {
                    continue;
                }
                for dest in self.convoy_destinations(&network, army_province) {
                    options.push(order(OrderKind::Convoy {
                        army: *army_province,
                        dest,
                    }));
                }
            }
        }
        options
    }

    fn retreat_options(&self, unit: &Dislodged) -> Vec<ParsedOrder> {
        let order = |kind| ParsedOrder {
            unit_type: unit.piece.unit_type,
            location: unit.piece.location,
            kind,
        };
        let mut options: Vec<ParsedOrder> = unit
            .retreats
            .iter()
            .map(|dest| order(OrderKind::Retreat { dest }))
            .collect();
        options.push(order(OrderKind::Disband));
        options
    }

    /// Build or disband options for `power`, keyed by location.
    fn adjustment_options(&self, power: Power) -> BTreeMap<&'static str, Vec<String>> {
        let centers = self.center_count(power);
        let units = self.unit_count(power);
        let mut options = BTreeMap::new();
        if centers > units {
            for site in self.free_build_sites(power) {
                let mut builds = Vec::new();
                if self.map.can_occupy(UnitType::Army, site) {
                    builds.push(format!("A {site} B"));
                }
                for loc in self.map.fleet_locations(site) {
                    if self.map.can_occupy(UnitType::Fleet, loc) {
                        builds.push(format!("F {loc} B"));
                    }
                }
                builds.push("WAIVE".to_owned());
                options.insert(site, builds);
            }
        } else if units > centers {
            for unit in self.units.values().filter(|u| u.power == power) {
                options.insert(
                    unit.location,
                    vec![format!("{} {} D", unit.unit_type, unit.location)],
                );
            }
        }
        options
    }

    fn adjustments_pending(&self) -> bool {
        Power::ALL.iter().any(|p| {
            let centers = self.center_count(*p);
            let units = self.unit_count(*p);
            units > centers || (centers > units && !self.free_build_sites(*p).is_empty())
        })
    }

    /// Check that a parsed order names something `power` may order now.
    fn check_orderable(&self, power: Power, order: &ParsedOrder) -> Result<(), String> {
        let province = order.province();
        let own_unit = |unit: Option<&Piece>| match unit {
            Some(u) if u.power != power => Err(format!("unit in {province} belongs to {}", u.power)),
            Some(u) if u.location != order.location || u.unit_type != order.unit_type => Err(
                format!("no {} at {}", order.unit_type, order.location),
            ),
            Some(_) => Ok(()),
            None => Err(format!("no unit in {province}")),
        };
        match (self.phase.phase_type, order.kind) {
            (
                PhaseType::Movement,
                OrderKind::Hold
                | OrderKind::Move { .. }
                | OrderKind::SupportHold { .. }
                | OrderKind::SupportMove { .. }
                | OrderKind::Convoy { .. },
            ) => own_unit(self.units.get(province)),
            (PhaseType::Retreat, OrderKind::Retreat { .. } | OrderKind::Disband) => {
                own_unit(self.dislodged.get(province).map(|d| &d.piece))
            }
            (PhaseType::Adjustment, OrderKind::Disband) => own_unit(self.units.get(province)),
            (PhaseType::Adjustment, OrderKind::Build) => {
                if self.map.home_centers(power).contains(&province) {
                    Ok(())
                } else {
                    Err(format!("{province} is not a home centre of {power}"))
                }
            }
            (phase_type, _) => Err(format!(
                "instruction not allowed in a {} phase",
                phase_type.long_name().to_ascii_lowercase()
            )),
        }
    }

    fn process_movement(&mut self) {
        let orders: BTreeMap<&'static str, OrderKind> = self
            .orders
            .values()
            .flatten()
            .map(|o| (o.province(), o.kind))
            .collect();
        let outcome = adjudicate(self.map, &self.units, &orders);
        debug!(
            phase = %self.phase,
            moves = outcome.moves.len(),
            dislodged = outcome.dislodged.len(),
            standoffs = outcome.standoffs.len(),
            "movement adjudicated"
        );

        let mut movers = Vec::new();
        for (origin, dest) in &outcome.moves {
            if let Some(piece) = self.units.remove(origin) {
                movers.push((*dest, piece));
            }
        }
        let mut dislodged_pieces = Vec::new();
        for (province, attacker) in &outcome.dislodged {
            if let Some(piece) = self.units.remove(province) {
                dislodged_pieces.push((*province, *attacker, piece));
            }
        }
        for (dest, mut piece) in movers {
            piece.location = dest;
            self.units.insert(province_of(dest), piece);
        }

        self.dislodged = dislodged_pieces
            .into_iter()
            .map(|(province, attacker, piece)| {
                let retreats = self
                    .map
                    .neighbours(piece.unit_type, piece.location)
                    .filter(|n| {
                        let p = province_of(*n);
                        !self.units.contains_key(p)
                            && Some(p) != attacker
                            && !outcome.standoffs.contains(p)
                    })
                    .collect();
                (province, Dislodged { piece, retreats })
            })
            .collect();

        if self.dislodged.is_empty() {
            self.finish_season();
        } else {
            self.phase = PhaseToken::new(self.phase.season, self.phase.year, PhaseType::Retreat);
        }
    }

    fn process_retreats(&mut self) {
        let mut wanted: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
        for order in self.orders.values().flatten() {
            let OrderKind::Retreat { dest } = order.kind else {
                continue;
            };
            let Some(unit) = self.dislodged.get(order.province()) else {
                continue;
            };
            let target = if unit.retreats.contains(dest) {
                Some(dest)
            } else {
                let mut by_province = unit.retreats.iter().filter(|r| province_of(**r) == dest);
                match (by_province.next(), by_province.next()) {
                    (Some(only), None) => Some(*only),
                    _ => None,
                }
            };
            if let Some(target) = target {
                wanted.entry(province_of(target)).or_default().push(order.province());
                self.dislodged
                    .entry(order.province())
                    .and_modify(|d| d.piece.location = target);
            }
        }

        let mut retreated = 0_usize;
        for origins in wanted.values() {
            if let [only] = origins.as_slice()
                && let Some(unit) = self.dislodged.remove(only)
            {
                self.units.insert(province_of(unit.piece.location), unit.piece);
                retreated = retreated.saturating_add(1);
            }
        }
        debug!(
            phase = %self.phase,
            retreated,
            disbanded = self.dislodged.len(),
            "retreats resolved"
        );
        self.dislodged.clear();
        self.finish_season();
    }

    fn process_adjustments(&mut self) {
        for power in Power::ALL {
            let centers = self.center_count(power);
            let units = self.unit_count(power);
            let orders = self.orders.get(&power).cloned().unwrap_or_default();

            if centers > units {
                let mut allowed = centers.saturating_sub(units);
                let sites = self.free_build_sites(power);
                for order in orders.iter().filter(|o| o.kind == OrderKind::Build) {
                    if allowed == 0 {
                        break;
                    }
                    let province = order.province();
                    if sites.contains(&province)
                        && !self.units.contains_key(province)
                        && self.map.can_occupy(order.unit_type, order.location)
                    {
                        self.units.insert(
                            province,
                            Piece {
                                power,
                                unit_type: order.unit_type,
                                location: order.location,
                            },
                        );
                        allowed = allowed.saturating_sub(1);
                    }
                }
            } else if units > centers {
                let mut owed = units.saturating_sub(centers);
                for order in orders.iter().filter(|o| o.kind == OrderKind::Disband) {
                    if owed == 0 {
                        break;
                    }
                    let province = order.province();
                    if self.units.get(province).is_some_and(|u| u.power == power) {
                        self.units.remove(province);
                        owed = owed.saturating_sub(1);
                    }
                }
                if owed > 0 {
                    info!(%power, owed, "civil disorder disbands");
                    self.civil_disorder(power, owed);
                }
            }
        }
        self.phase = PhaseToken::new(
            Season::Spring,
            self.phase.year.saturating_add(1),
            PhaseType::Movement,
        );
    }

    /// Disband `count` units of a power that failed to order its disbands:
    /// furthest from its home centres first, fleets before armies, then
    /// alphabetically.
    fn civil_disorder(&mut self, power: Power, count: usize) {
        let homes: BTreeSet<&'static str> = self.map.home_centers(power).into_iter().collect();
        let mut ranked: Vec<(usize, UnitType, &'static str)> = self
            .units
            .iter()
            .filter(|(_, u)| u.power == power)
            .map(|(p, u)| {
                let distance = self.map.distance_to(u.location, &homes).unwrap_or(usize::MAX);
                (distance, u.unit_type, *p)
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| fleet_first(a.1).cmp(&fleet_first(b.1)))
                .then_with(|| a.2.cmp(&b.2))
        });
        for (_, _, province) in ranked.into_iter().take(count) {
            self.units.remove(province);
        }
    }

    fn finish_season(&mut self) {
        let year = self.phase.year;
        match self.phase.season {
            Season::Spring => {
                self.phase = PhaseToken::new(Season::Fall, year, PhaseType::Movement);
            }
            Season::Fall => {
                self.update_ownership();
                self.check_victory();
                self.phase = if self.adjustments_pending() {
                    PhaseToken::new(Season::Winter, year, PhaseType::Adjustment)
                } else {
                    PhaseToken::new(Season::Spring, year.saturating_add(1), PhaseType::Movement)
                };
            }
            Season::Winter => {
                self.phase =
                    PhaseToken::new(Season::Spring, year.saturating_add(1), PhaseType::Movement);
            }
        }
    }

    fn update_ownership(&mut self) {
        for center in self.map.supply_centers() {
            if let Some(unit) = self.units.get(center) {
                self.owners.insert(center, unit.power);
            }
        }
    }

    fn check_victory(&mut self) {
        if let Some(winner) = Power::ALL
            .into_iter()
            .find(|p| self.center_count(*p) >= self.victory_centers)
        {
            info!(power = %winner, centers = self.center_count(winner), "victory threshold reached");
            self.done = true;
            return;
        }
        let holders = Power::ALL
            .into_iter()
            .filter(|p| self.center_count(*p) > 0)
            .count();
        if holders <= 1 {
            info!(holders, "at most one power still holds centres");
            self.done = true;
        }
    }
}

const fn fleet_first(unit_type: UnitType) -> u8 {
    match unit_type {
        UnitType::Fleet => 0,
        UnitType::Army => 1,
    }
}

impl RulesEngine for StandardEngine {
    fn current_phase(&self) -> PhaseToken {
        self.phase
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn centers(&self, power: Power) -> Vec<Location> {
        self.owners
            .iter()
            .filter(|(_, p)| **p == power)
            .map(|(c, _)| Location::new(*c))
            .collect()
    }

    fn units(&self, power: Power) -> Vec<Unit> {
        let standing = self
            .units
            .values()
            .filter(|u| u.power == power)
            .map(|u| Unit::new(u.unit_type, Location::new(u.location)));
        let dislodged = self
            .dislodged
            .values()
            .filter(|d| d.piece.power == power)
            .map(|d| Unit {
                unit_type: d.piece.unit_type,
                location: Location::new(d.piece.location),
                dislodged: true,
            });
        standing.chain(dislodged).collect()
    }

    fn unowned_centers(&self) -> Vec<Location> {
        self.map
            .supply_centers()
            .filter(|c| !self.owners.contains_key(c))
            .map(Location::new)
            .collect()
    }

    fn possible_orders(&self) -> BTreeMap<Location, Vec<Order>> {
        let rendered = |orders: Vec<ParsedOrder>| -> Vec<Order> {
            let unique: BTreeSet<String> = orders.iter().map(ToString::to_string).collect();
            unique.into_iter().map(Order::new).collect()
        };
        match self.phase.phase_type {
            PhaseType::Movement => self
                .units
                .iter()
                .map(|(p, u)| (Location::new(u.location), rendered(self.movement_options(*p, u))))
                .collect(),
            PhaseType::Retreat => self
                .dislodged
                .values()
                .map(|d| (Location::new(d.piece.location), rendered(self.retreat_options(d))))
                .collect(),
            PhaseType::Adjustment => Power::ALL
                .iter()
                .flat_map(|p| self.adjustment_options(*p))
                .map(|(loc, opts)| (Location::new(loc), opts.into_iter().map(Order::new).collect()))
                .collect(),
        }
    }

    fn orderable_locations(&self, power: Power) -> Vec<Location> {
        match self.phase.phase_type {
            PhaseType::Movement => self
                .units
                .values()
                .filter(|u| u.power == power)
                .map(|u| Location::new(u.location))
                .collect(),
            PhaseType::Retreat => self
                .dislodged
                .values()
                .filter(|d| d.piece.power == power)
                .map(|d| Location::new(d.piece.location))
                .collect(),
            PhaseType::Adjustment => self
                .adjustment_options(power)
                .into_keys()
                .map(Location::new)
                .collect(),
        }
    }

    fn set_orders(&mut self, power: Power, orders: &[Order]) -> Result<(), RulesError> {
        let mut parsed = Vec::with_capacity(orders.len());
        for text in orders {
            let parsed_order = order::parse(self.map, text.as_str()).map_err(|reason| {
                RulesError::MalformedOrder {
                    power,
                    order: text.to_string(),
                    reason,
                }
            })?;
            let Some(parsed_order) = parsed_order else {
                continue;
            };
            self.check_orderable(power, &parsed_order)
                .map_err(|reason| RulesError::NotOrderable {
                    power,
                    order: text.to_string(),
                    phase: self.phase,
                    reason,
                })?;
            parsed.push(parsed_order);
        }
        self.orders.insert(power, parsed);
        Ok(())
    }

    fn process(&mut self) -> Result<PhaseToken, RulesError> {
        if self.done {
            return Err(RulesError::MatchOver);
        }
        let from = self.phase;
        match from.phase_type {
            PhaseType::Movement => self.process_movement(),
            PhaseType::Retreat => self.process_retreats(),
            PhaseType::Adjustment => self.process_adjustments(),
        }
        self.orders.clear();
        debug!(%from, to = %self.phase, done = self.done, "phase processed");
        Ok(self.phase)
    }
}
