//! Order grammar of the reference engine.
//!
//! ```text
//! A PAR H                 hold
//! A PAR - BUR             move
//! A LON - BRE VIA         move by convoy
//! A MAR S A PAR           support hold
//! A MAR S A PAR - BUR     support move
//! F ENG C A LON - BRE     convoy
//! A MUN R RUH             retreat
//! A MUN D                 disband
//! A PAR B                 build
//! WAIVE                   decline a build
//! ```
//!
//! Parsing resolves every location against the map, so a [`ParsedOrder`]
//! only ever holds canonical static location strings.

use core::fmt;

use entente_types::UnitType;

use crate::map::{Map, province_of};

/// What an order asks its unit to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    /// Stay in place.
    Hold,
    /// Move to an adjacent location, or by convoy when `via_convoy` is set.
    Move {
        /// Destination location (with coast for fleets, when given).
        dest: &'static str,
        /// Explicit request to travel by convoy.
        via_convoy: bool,
    },
    /// Support the unit in `target` holding its position.
    SupportHold {
        /// Type of the supported unit as written.
        target_type: UnitType,
        /// Location of the supported unit as written.
        target: &'static str,
    },
    /// Support the unit in `target` moving to `dest`.
    SupportMove {
        /// Type of the supported unit as written.
        target_type: UnitType,
        /// Location of the supported unit as written.
        target: &'static str,
        /// Province the supported unit moves into.
        dest: &'static str,
    },
    /// Carry the army in `army` to `dest`.
    Convoy {
        /// Province of the convoyed army.
        army: &'static str,
        /// Province the army is carried to.
        dest: &'static str,
    },
    /// Retreat a dislodged unit.
    Retreat {
        /// Destination location.
        dest: &'static str,
    },
    /// Remove the unit (retreat or adjustment phase).
    Disband,
    /// Build a new unit at this location (adjustment phase).
    Build,
}

/// A parsed unit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedOrder {
    /// Type of the ordered (or built) unit.
    pub unit_type: UnitType,
    /// Location of the ordered unit, or the build site.
    pub location: &'static str,
    /// The instruction.
    pub kind: OrderKind,
}

impl ParsedOrder {
    /// Province of the ordered unit.
    pub fn province(&self) -> &'static str {
        province_of(self.location)
    }

    /// Province of the unit this order supports, if it is a support.
    pub fn supported_province(&self) -> Option<&'static str> {
        match self.kind {
            OrderKind::SupportHold { target, .. } | OrderKind::SupportMove { target, .. } => {
                Some(province_of(target))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParsedOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = format!("{} {}", self.unit_type, self.location);
        match self.kind {
            OrderKind::Hold => write!(f, "{unit} H"),
            OrderKind::Move { dest, via_convoy } => {
                write!(f, "{unit} - {dest}")?;
                if via_convoy {
                    f.write_str(" VIA")?;
                }
                Ok(())
            }
            OrderKind::SupportHold {
                target_type,
                target,
            } => write!(f, "{unit} S {target_type} {target}"),
            OrderKind::SupportMove {
                target_type,
                target,
                dest,
            } => write!(f, "{unit} S {target_type} {target} - {dest}"),
            OrderKind::Convoy { army, dest } => write!(f, "{unit} C A {army} - {dest}"),
            OrderKind::Retreat { dest } => write!(f, "{unit} R {dest}"),
            OrderKind::Disband => write!(f, "{unit} D"),
            OrderKind::Build => write!(f, "{unit} B"),
        }
    }
}

/// Parse one order. `Ok(None)` is a `WAIVE`.
pub fn parse(map: &Map, text: &str) -> Result<Option<ParsedOrder>, String> {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(str::to_ascii_uppercase)
        .collect();
    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();

    if words == ["WAIVE"] {
        return Ok(None);
    }

    let loc = |token: &str| {
        map.canonical(token)
            .ok_or_else(|| format!("unknown location '{token}'"))
    };
    let unit_type = |token: &str| {
        token
            .parse::<UnitType>()
            .map_err(|_bad| format!("unknown unit type '{token}'"))
    };
    let province = |token: &str| loc(token).map(province_of);

    let kind = match words.as_slice() {
        [_, _, "H"] => OrderKind::Hold,
        [_, _, "-", dest] => OrderKind::Move {
            dest: loc(dest)?,
            via_convoy: false,
        },
        [_, _, "-", dest, "VIA"] => OrderKind::Move {
            dest: loc(dest)?,
            via_convoy: true,
        },
        [_, _, "S", t, target] => OrderKind::SupportHold {
            target_type: unit_type(t)?,
            target: loc(target)?,
        },
        [_, _, "S", t, target, "-", dest] => OrderKind::SupportMove {
            target_type: unit_type(t)?,
            target: loc(target)?,
            dest: province(dest)?,
        },
        [_, _, "C", "A", army, "-", dest] => OrderKind::Convoy {
            army: province(army)?,
            dest: province(dest)?,
        },
        [_, _, "R", dest] => OrderKind::Retreat { dest: loc(dest)? },
        [_, _, "D"] => OrderKind::Disband,
        [_, _, "B"] => OrderKind::Build,
        _ => return Err(format!("unrecognised order '{text}'")),
    };

    let (Some(t), Some(l)) = (words.first(), words.get(1)) else {
        return Err(format!("unrecognised order '{text}'"));
    };
    Ok(Some(ParsedOrder {
        unit_type: unit_type(t)?,
        location: loc(l)?,
        kind,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::map::classic;

    fn p(text: &str) -> ParsedOrder {
        parse(classic(), text).unwrap().unwrap()
    }

    #[test]
    fn parses_every_order_form() {
        assert_eq!(p("A PAR H").kind, OrderKind::Hold);
        assert_eq!(
            p("a par - bur").kind,
            OrderKind::Move {
                dest: "BUR",
                via_convoy: false
            }
        );
        assert_eq!(
            p("A LON - BRE VIA").kind,
            OrderKind::Move {
                dest: "BRE",
                via_convoy: true
            }
        );
        assert_eq!(
            p("A MAR S A PAR").kind,
            OrderKind::SupportHold {
                target_type: UnitType::Army,
                target: "PAR"
            }
        );
        assert_eq!(
            p("F MAO S F SPA/NC - POR").kind,
            OrderKind::SupportMove {
                target_type: UnitType::Fleet,
                target: "SPA/NC",
                dest: "POR"
            }
        );
        assert_eq!(
            p("F ENG C A LON - BRE").kind,
            OrderKind::Convoy {
                army: "LON",
                dest: "BRE"
            }
        );
        assert_eq!(p("A MUN R RUH").kind, OrderKind::Retreat { dest: "RUH" });
        assert_eq!(p("A MUN D").kind, OrderKind::Disband);
        let build = p("F STP/NC B");
        assert_eq!(build.kind, OrderKind::Build);
        assert_eq!(build.location, "STP/NC");
        assert_eq!(build.province(), "STP");
        assert!(parse(classic(), "WAIVE").unwrap().is_none());
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "A PAR", "A XYZ H", "Q PAR H", "A PAR - ", "A PAR S X PAR", "hello"] {
            assert!(parse(classic(), bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn display_round_trips_canonical_text() {
        for text in [
            "A PAR - BUR",
            "A MAR S A PAR - BUR",
            "F ENG C A LON - BRE",
            "A LON - BRE VIA",
            "A MUN D",
        ] {
            assert_eq!(p(text).to_string(), text);
        }
    }
}
