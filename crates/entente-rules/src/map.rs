//! The classic map: 75 provinces, 34 supply centres, three split coasts.
//!
//! Province and adjacency data are compiled in. Armies move along land
//! borders between land and coastal provinces; fleets move between sea
//! areas and coast locations, where `BUL`, `SPA` and `STP` expose one
//! location per coast (`STP/NC`, `STP/SC`, ...).
//!
//! All location strings handed out by [`Map`] are `&'static str` slices
//! of the compiled tables, so callers can key maps on them freely.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::LazyLock;

use entente_types::{Power, UnitType};

/// Terrain of a province.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    /// Inland: armies only.
    Land,
    /// Coastal: armies, and fleets along the coast.
    Coast,
    /// Open water: fleets only.
    Sea,
}

/// Static description of one province.
#[derive(Debug, Clone)]
pub struct Province {
    /// Three-letter abbreviation.
    pub name: &'static str,
    /// Terrain.
    pub terrain: Terrain,
    /// Whether the province holds a supply centre.
    pub supply_center: bool,
    /// The power this is a home centre of, if any.
    pub home: Option<Power>,
    /// Coast locations for split-coast provinces; empty otherwise.
    pub coasts: &'static [&'static str],
}

use Terrain::{Coast, Land, Sea};

const NO_COASTS: &[&str] = &[];

/// `(name, terrain, supply centre, home power)`.
const PROVINCES: &[(&str, Terrain, bool, Option<Power>)] = &[
    // Inland
    ("BOH", Land, false, None),
    ("BUD", Land, true, Some(Power::Austria)),
    ("BUR", Land, false, None),
    ("GAL", Land, false, None),
    ("MOS", Land, true, Some(Power::Russia)),
    ("MUN", Land, true, Some(Power::Germany)),
    ("PAR", Land, true, Some(Power::France)),
    ("RUH", Land, false, None),
    ("SER", Land, true, None),
    ("SIL", Land, false, None),
    ("TYR", Land, false, None),
    ("UKR", Land, false, None),
    ("VIE", Land, true, Some(Power::Austria)),
    ("WAR", Land, true, Some(Power::Russia)),
    // Sea
    ("ADR", Sea, false, None),
    ("AEG", Sea, false, None),
    ("BAL", Sea, false, None),
    ("BAR", Sea, false, None),
    ("BLA", Sea, false, None),
    ("BOT", Sea, false, None),
    ("EAS", Sea, false, None),
    ("ENG", Sea, false, None),
    ("HEL", Sea, false, None),
    ("ION", Sea, false, None),
    ("IRI", Sea, false, None),
    ("LYO", Sea, false, None),
    ("MAO", Sea, false, None),
    ("NAO", Sea, false, None),
    ("NTH", Sea, false, None),
    ("NWG", Sea, false, None),
    ("SKA", Sea, false, None),
    ("TYS", Sea, false, None),
    ("WES", Sea, false, None),
    // Coastal
    ("ALB", Coast, false, None),
    ("ANK", Coast, true, Some(Power::Turkey)),
    ("APU", Coast, false, None),
    ("ARM", Coast, false, None),
    ("BEL", Coast, true, None),
    ("BER", Coast, true, Some(Power::Germany)),
    ("BRE", Coast, true, Some(Power::France)),
    ("BUL", Coast, true, None),
    ("CLY", Coast, false, None),
    ("CON", Coast, true, Some(Power::Turkey)),
    ("DEN", Coast, true, None),
    ("EDI", Coast, true, Some(Power::England)),
    ("FIN", Coast, false, None),
    ("GAS", Coast, false, None),
    ("GRE", Coast, true, None),
    ("HOL", Coast, true, None),
    ("KIE", Coast, true, Some(Power::Germany)),
    ("LON", Coast, true, Some(Power::England)),
    ("LVN", Coast, false, None),
    ("LVP", Coast, true, Some(Power::England)),
    ("MAR", Coast, true, Some(Power::France)),
    ("NAF", Coast, false, None),
    ("NAP", Coast, true, Some(Power::Italy)),
    ("NWY", Coast, true, None),
    ("PIC", Coast, false, None),
    ("PIE", Coast, false, None),
    ("POR", Coast, true, None),
    ("PRU", Coast, false, None),
    ("ROM", Coast, true, Some(Power::Italy)),
    ("RUM", Coast, true, None),
    ("SEV", Coast, true, Some(Power::Russia)),
    ("SMY", Coast, true, Some(Power::Turkey)),
    ("SPA", Coast, true, None),
    ("STP", Coast, true, Some(Power::Russia)),
    ("SWE", Coast, true, None),
    ("SYR", Coast, false, None),
    ("TRI", Coast, true, Some(Power::Austria)),
    ("TUN", Coast, true, None),
    ("TUS", Coast, false, None),
    ("VEN", Coast, true, Some(Power::Italy)),
    ("WAL", Coast, false, None),
    ("YOR", Coast, false, None),
];

const SPLIT_COASTS: &[(&str, &[&str])] = &[
    ("BUL", &["BUL/EC", "BUL/SC"]),
    ("SPA", &["SPA/NC", "SPA/SC"]),
    ("STP", &["STP/NC", "STP/SC"]),
];

/// Land borders usable by armies.
const ARMY_EDGES: &[(&str, &str)] = &[
    ("ALB", "GRE"), ("ALB", "SER"), ("ALB", "TRI"),
    ("ANK", "ARM"), ("ANK", "CON"), ("ANK", "SMY"),
    ("APU", "NAP"), ("APU", "ROM"), ("APU", "VEN"),
    ("ARM", "SEV"), ("ARM", "SMY"), ("ARM", "SYR"),
    ("BEL", "BUR"), ("BEL", "HOL"), ("BEL", "PIC"), ("BEL", "RUH"),
    ("BER", "KIE"), ("BER", "MUN"), ("BER", "PRU"), ("BER", "SIL"),
    ("BOH", "GAL"), ("BOH", "MUN"), ("BOH", "SIL"), ("BOH", "TYR"), ("BOH", "VIE"),
    ("BRE", "GAS"), ("BRE", "PAR"), ("BRE", "PIC"),
    ("BUD", "GAL"), ("BUD", "RUM"), ("BUD", "SER"), ("BUD", "TRI"), ("BUD", "VIE"),
    ("BUL", "CON"), ("BUL", "GRE"), ("BUL", "RUM"), ("BUL", "SER"),
    ("BUR", "GAS"), ("BUR", "MAR"), ("BUR", "MUN"), ("BUR", "PAR"), ("BUR", "PIC"),
    ("BUR", "RUH"),
    ("CLY", "EDI"), ("CLY", "LVP"),
    ("CON", "SMY"),
    ("DEN", "KIE"), ("DEN", "SWE"),
    ("EDI", "LVP"), ("EDI", "YOR"),
    ("FIN", "NWY"), ("FIN", "STP"), ("FIN", "SWE"),
    ("GAL", "RUM"), ("GAL", "SIL"), ("GAL", "UKR"), ("GAL", "VIE"), ("GAL", "WAR"),
    ("GAS", "MAR"), ("GAS", "PAR"), ("GAS", "SPA"),
    ("GRE", "SER"),
    ("HOL", "KIE"), ("HOL", "RUH"),
    ("KIE", "MUN"), ("KIE", "RUH"),
    ("LON", "WAL"), ("LON", "YOR"),
    ("LVN", "MOS"), ("LVN", "PRU"), ("LVN", "STP"), ("LVN", "WAR"),
    ("LVP", "WAL"), ("LVP", "YOR"),
    ("MAR", "PIE"), ("MAR", "SPA"),
    ("MOS", "SEV"), ("MOS", "STP"), ("MOS", "UKR"), ("MOS", "WAR"),
    ("MUN", "RUH"), ("MUN", "SIL"), ("MUN", "TYR"),
    ("NAF", "TUN"),
    ("NAP", "ROM"),
    ("NWY", "STP"), ("NWY", "SWE"),
    ("PAR", "PIC"),
    ("PIE", "TUS"), ("PIE", "TYR"), ("PIE", "VEN"),
    ("POR", "SPA"),
    ("PRU", "SIL"), ("PRU", "WAR"),
    ("ROM", "TUS"), ("ROM", "VEN"),
    ("RUM", "SER"), ("RUM", "SEV"), ("RUM", "UKR"),
    ("SER", "TRI"),
    ("SEV", "UKR"),
    ("SIL", "WAR"),
    ("SMY", "SYR"),
    ("TRI", "TYR"), ("TRI", "VEN"), ("TRI", "VIE"),
    ("TUS", "VEN"),
    ("TYR", "VEN"), ("TYR", "VIE"),
    ("UKR", "WAR"),
    ("WAL", "YOR"),
];

/// Sea lanes and coastlines usable by fleets.
const FLEET_EDGES: &[(&str, &str)] = &[
    // Sea to sea
    ("ADR", "ION"),
    ("AEG", "EAS"), ("AEG", "ION"),
    ("BAL", "BOT"),
    ("BAR", "NWG"),
    ("EAS", "ION"),
    ("ENG", "IRI"), ("ENG", "MAO"), ("ENG", "NTH"),
    ("HEL", "NTH"),
    ("ION", "TYS"),
    ("IRI", "MAO"), ("IRI", "NAO"),
    ("LYO", "TYS"), ("LYO", "WES"),
    ("MAO", "NAO"), ("MAO", "WES"),
    ("NAO", "NWG"),
    ("NTH", "NWG"), ("NTH", "SKA"),
    ("TYS", "WES"),
    // Sea to coast
    ("ADR", "ALB"), ("ADR", "APU"), ("ADR", "TRI"), ("ADR", "VEN"),
    ("AEG", "BUL/SC"), ("AEG", "CON"), ("AEG", "GRE"), ("AEG", "SMY"),
    ("BAL", "BER"), ("BAL", "DEN"), ("BAL", "KIE"), ("BAL", "LVN"), ("BAL", "PRU"),
    ("BAL", "SWE"),
    ("BAR", "NWY"), ("BAR", "STP/NC"),
    ("BLA", "ANK"), ("BLA", "ARM"), ("BLA", "BUL/EC"), ("BLA", "CON"), ("BLA", "RUM"),
    ("BLA", "SEV"),
    ("BOT", "FIN"), ("BOT", "LVN"), ("BOT", "STP/SC"), ("BOT", "SWE"),
    ("EAS", "SMY"), ("EAS", "SYR"),
    ("ENG", "BEL"), ("ENG", "BRE"), ("ENG", "LON"), ("ENG", "PIC"), ("ENG", "WAL"),
    ("HEL", "DEN"), ("HEL", "HOL"), ("HEL", "KIE"),
    ("ION", "ALB"), ("ION", "APU"), ("ION", "GRE"), ("ION", "NAP"), ("ION", "TUN"),
    ("IRI", "LVP"), ("IRI", "WAL"),
    ("LYO", "MAR"), ("LYO", "PIE"), ("LYO", "SPA/SC"), ("LYO", "TUS"),
    ("MAO", "BRE"), ("MAO", "GAS"), ("MAO", "NAF"), ("MAO", "POR"), ("MAO", "SPA/NC"),
    ("MAO", "SPA/SC"),
    ("NAO", "CLY"), ("NAO", "LVP"),
    ("NTH", "BEL"), ("NTH", "DEN"), ("NTH", "EDI"), ("NTH", "HOL"), ("NTH", "LON"),
    ("NTH", "NWY"), ("NTH", "YOR"),
    ("NWG", "CLY"), ("NWG", "EDI"), ("NWG", "NWY"),
    ("SKA", "DEN"), ("SKA", "NWY"), ("SKA", "SWE"),
    ("TYS", "NAP"), ("TYS", "ROM"), ("TYS", "TUN"), ("TYS", "TUS"),
    ("WES", "NAF"), ("WES", "SPA/SC"), ("WES", "TUN"),
    // Coast to coast
    ("ALB", "GRE"), ("ALB", "TRI"),
    ("ANK", "ARM"), ("ANK", "CON"),
    ("APU", "NAP"), ("APU", "VEN"),
    ("ARM", "SEV"),
    ("BEL", "HOL"), ("BEL", "PIC"),
    ("BER", "KIE"), ("BER", "PRU"),
    ("BRE", "GAS"), ("BRE", "PIC"),
    ("BUL/EC", "CON"), ("BUL/EC", "RUM"),
    ("BUL/SC", "CON"), ("BUL/SC", "GRE"),
    ("CLY", "EDI"), ("CLY", "LVP"),
    ("CON", "SMY"),
    ("DEN", "KIE"), ("DEN", "SWE"),
    ("EDI", "YOR"),
    ("FIN", "STP/SC"), ("FIN", "SWE"),
    ("GAS", "SPA/NC"),
    ("HOL", "KIE"),
    ("LON", "WAL"), ("LON", "YOR"),
    ("LVN", "PRU"), ("LVN", "STP/SC"),
    ("LVP", "WAL"),
    ("MAR", "PIE"), ("MAR", "SPA/SC"),
    ("NAF", "TUN"),
    ("NAP", "ROM"),
    ("NWY", "STP/NC"), ("NWY", "SWE"),
    ("PIE", "TUS"),
    ("POR", "SPA/NC"), ("POR", "SPA/SC"),
    ("ROM", "TUS"),
    ("RUM", "SEV"),
    ("SMY", "SYR"),
    ("TRI", "VEN"),
];

/// Starting units of the classic scenario, `(power, unit type, location)`.
pub const STARTING_UNITS: &[(Power, UnitType, &str)] = &[
    (Power::Austria, UnitType::Army, "VIE"),
    (Power::Austria, UnitType::Army, "BUD"),
    (Power::Austria, UnitType::Fleet, "TRI"),
    (Power::England, UnitType::Fleet, "LON"),
    (Power::England, UnitType::Fleet, "EDI"),
    (Power::England, UnitType::Army, "LVP"),
    (Power::France, UnitType::Fleet, "BRE"),
    (Power::France, UnitType::Army, "PAR"),
    (Power::France, UnitType::Army, "MAR"),
    (Power::Germany, UnitType::Fleet, "KIE"),
    (Power::Germany, UnitType::Army, "BER"),
    (Power::Germany, UnitType::Army, "MUN"),
    (Power::Italy, UnitType::Fleet, "NAP"),
    (Power::Italy, UnitType::Army, "ROM"),
    (Power::Italy, UnitType::Army, "VEN"),
    (Power::Russia, UnitType::Army, "WAR"),
    (Power::Russia, UnitType::Army, "MOS"),
    (Power::Russia, UnitType::Fleet, "SEV"),
    (Power::Russia, UnitType::Fleet, "STP/SC"),
    (Power::Turkey, UnitType::Fleet, "ANK"),
    (Power::Turkey, UnitType::Army, "CON"),
    (Power::Turkey, UnitType::Army, "SMY"),
];

/// The compiled classic map.
static CLASSIC: LazyLock<Map> = LazyLock::new(Map::build);

/// Province table plus army and fleet adjacency.
#[derive(Debug)]
pub struct Map {
    provinces: BTreeMap<&'static str, Province>,
    army: BTreeMap<&'static str, BTreeSet<&'static str>>,
    fleet: BTreeMap<&'static str, BTreeSet<&'static str>>,
}

/// The classic map, built on first use.
pub fn classic() -> &'static Map {
    &CLASSIC
}

/// Strip a coast suffix from a location string.
pub fn province_of(location: &'static str) -> &'static str {
    location.split_once('/').map_or(location, |(p, _)| p)
}

fn link(
    table: &mut BTreeMap<&'static str, BTreeSet<&'static str>>,
    a: &'static str,
    b: &'static str,
) {
    table.entry(a).or_default().insert(b);
    table.entry(b).or_default().insert(a);
}

impl Map {
    fn build() -> Self {
        let provinces = PROVINCES
            .iter()
            .map(|&(name, terrain, supply_center, home)| {
                let coasts = SPLIT_COASTS
                    .iter()
                    .find(|(p, _)| *p == name)
                    .map_or(NO_COASTS, |(_, c)| *c);
                (
                    name,
                    Province {
                        name,
                        terrain,
                        supply_center,
                        home,
                        coasts,
                    },
                )
            })
            .collect();

        let mut army = BTreeMap::new();
        for &(a, b) in ARMY_EDGES {
            link(&mut army, a, b);
        }
        let mut fleet = BTreeMap::new();
        for &(a, b) in FLEET_EDGES {
            link(&mut fleet, a, b);
        }

        Self {
            provinces,
            army,
            fleet,
        }
    }

    /// Look up a province by its abbreviation.
    pub fn province(&self, name: &str) -> Option<&Province> {
        self.provinces.get(name)
    }

    /// All provinces in alphabetical order.
    pub fn provinces(&self) -> impl Iterator<Item = &Province> {
        self.provinces.values()
    }

    /// Map a user-supplied token onto the canonical static location.
    ///
    /// Accepts plain provinces (`PAR`) and coast locations (`STP/NC`),
    /// case-insensitively.
    pub fn canonical(&self, token: &str) -> Option<&'static str> {
        let upper = token.trim().to_ascii_uppercase();
        let (province_name, coast) = match upper.split_once('/') {
            Some((p, c)) => (p, Some(c)),
            None => (upper.as_str(), None),
        };
        let province = self.provinces.get(province_name)?;
        match coast {
            None => Some(province.name),
            Some(_) => province.coasts.iter().copied().find(|c| *c == upper),
        }
    }

    /// Terrain of the province a location belongs to.
    pub fn terrain(&self, location: &'static str) -> Option<Terrain> {
        self.provinces.get(province_of(location)).map(|p| p.terrain)
    }

    /// Whether a unit of `unit_type` may stand at `location`.
    ///
    /// Fleets on split-coast provinces must name their coast.
    pub fn can_occupy(&self, unit_type: UnitType, location: &'static str) -> bool {
        let Some(province) = self.provinces.get(province_of(location)) else {
            return false;
        };
        let has_coast = location.contains('/');
        match (unit_type, province.terrain) {
            (UnitType::Army, Land | Coast) => !has_coast,
            (UnitType::Fleet, Sea) => !has_coast,
            (UnitType::Fleet, Coast) => {
                if province.coasts.is_empty() {
                    !has_coast
                } else {
                    province.coasts.contains(&location)
                }
            }
            (UnitType::Army, Sea) | (UnitType::Fleet, Land) => false,
        }
    }

    /// Locations a unit can move to in one step.
    pub fn neighbours(
        &self,
        unit_type: UnitType,
        location: &'static str,
    ) -> impl Iterator<Item = &'static str> + '_ {
        let table = match unit_type {
            UnitType::Army => self.army.get(province_of(location)),
            UnitType::Fleet => self.fleet.get(location),
        };
        table.into_iter().flatten().copied()
    }

    /// Whether a unit at `from` can reach any location of `province`.
    ///
    /// This is the reach test for supports, which name provinces only.
    pub fn reaches_province(
        &self,
        unit_type: UnitType,
        from: &'static str,
        province: &str,
    ) -> bool {
        self.neighbours(unit_type, from)
            .any(|n| province_of(n) == province)
    }

    /// Resolve a move target for a unit, filling in the coast for fleets
    /// when it is unambiguous.
    pub fn move_target(
        &self,
        unit_type: UnitType,
        from: &'static str,
        target: &'static str,
    ) -> Option<&'static str> {
        match unit_type {
            UnitType::Army => {
                let dest = province_of(target);
                (target == dest && self.neighbours(UnitType::Army, from).any(|n| n == dest))
                    .then_some(dest)
            }
            UnitType::Fleet => {
                if self.neighbours(UnitType::Fleet, from).any(|n| n == target) {
                    return Some(target);
                }
                if target.contains('/') {
                    return None;
                }
                let mut candidates = self
                    .neighbours(UnitType::Fleet, from)
                    .filter(|n| province_of(*n) == target);
                match (candidates.next(), candidates.next()) {
                    (Some(only), None) => Some(only),
                    _ => None,
                }
            }
        }
    }

    /// Whether the province is open water.
    pub fn is_sea(&self, province: &str) -> bool {
        self.provinces
            .get(province)
            .is_some_and(|p| p.terrain == Sea)
    }

    /// Whether the province is coastal.
    pub fn is_coastal(&self, province: &str) -> bool {
        self.provinces
            .get(province)
            .is_some_and(|p| p.terrain == Coast)
    }

    /// Fleet locations belonging to a province: its coasts when split,
    /// otherwise the province itself.
    pub fn fleet_locations(&self, province: &'static str) -> Vec<&'static str> {
        match self.provinces.get(province) {
            Some(p) if !p.coasts.is_empty() => p.coasts.to_vec(),
            Some(p) if p.terrain != Land => vec![p.name],
            _ => Vec::new(),
        }
    }

    /// Sea areas bordering a province (on any of its coasts).
    pub fn seas_touching(&self, province: &'static str) -> BTreeSet<&'static str> {
        self.fleet_locations(province)
            .into_iter()
            .flat_map(|loc| self.neighbours(UnitType::Fleet, loc))
            .filter(|n| self.is_sea(n))
            .collect()
    }

    /// Coastal provinces bordering a sea area.
    pub fn coasts_touching(&self, sea: &'static str) -> BTreeSet<&'static str> {
        self.neighbours(UnitType::Fleet, sea)
            .map(province_of)
            .filter(|p| self.is_coastal(p))
            .collect()
    }

    /// Sea areas bordering a sea area.
    pub fn seas_adjacent(&self, sea: &'static str) -> impl Iterator<Item = &'static str> + '_ {
        self.neighbours(UnitType::Fleet, sea)
            .filter(|n| self.is_sea(n))
    }

    /// Whether an army can be carried from `origin` to `dest` through the
    /// given set of sea areas.
    pub fn convoy_path_exists(
        &self,
        origin: &'static str,
        dest: &'static str,
        seas: &BTreeSet<&'static str>,
    ) -> bool {
        if origin == dest || !self.is_coastal(origin) || !self.is_coastal(dest) {
            return false;
        }
        let mut seen: BTreeSet<&'static str> = BTreeSet::new();
        let mut queue: VecDeque<&'static str> = self
            .seas_touching(origin)
            .into_iter()
            .filter(|s| seas.contains(s))
            .collect();
        while let Some(sea) = queue.pop_front() {
            if !seen.insert(sea) {
                continue;
            }
            if self.coasts_touching(sea).contains(dest) {
                return true;
            }
            queue.extend(self.seas_adjacent(sea).filter(|s| seas.contains(s) && !seen.contains(s)));
        }
        false
    }

    /// Every supply centre, alphabetical.
    pub fn supply_centers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.provinces
            .values()
            .filter(|p| p.supply_center)
            .map(|p| p.name)
    }

    /// Home centres of one power, alphabetical.
    pub fn home_centers(&self, power: Power) -> Vec<&'static str> {
        self.provinces
            .values()
            .filter(|p| p.home == Some(power))
            .map(|p| p.name)
            .collect()
    }

    /// Shortest number of moves (ignoring unit type) from `from` to any of
    /// `targets`. `None` when no target is reachable.
    pub fn distance_to(
        &self,
        from: &'static str,
        targets: &BTreeSet<&'static str>,
    ) -> Option<usize> {
        let start = province_of(from);
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([(start, 0_usize)]);
        while let Some((province, dist)) = queue.pop_front() {
            if targets.contains(province) {
                return Some(dist);
            }
            let next_dist = dist.saturating_add(1);
            let mut step = |n: &'static str| {
                let p = province_of(n);
                if seen.insert(p) {
                    queue.push_back((p, next_dist));
                }
            };
            self.army.get(province).into_iter().flatten().copied().for_each(&mut step);
            for loc in self.fleet_locations(province) {
                self.neighbours(UnitType::Fleet, loc).for_each(&mut step);
            }
        }
        None
    }

    /// Every location that appears in an adjacency table. Used by tests to
    /// check the tables against the province list.
    pub fn adjacency_locations(&self) -> BTreeSet<&'static str> {
        self.army
            .keys()
            .chain(self.fleet.keys())
            .copied()
            .collect()
    }
}
