//! Orders and the legal-action catalog.
//!
//! An [`Order`] is an opaque engine-format string (`A PAR - BUR`). The
//! orchestration layer never interprets order text; it only checks
//! membership in the [`LegalActions`] catalog the rules engine produced for
//! the current phase.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::structs::Location;

/// One order in engine text form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Order(String);

impl Order {
    /// Wrap an engine-format order string.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The order text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Order {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Order {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Per-location catalog of legal orders for one power in one phase.
///
/// Only locations where the power may act appear, and every listed
/// location has at least one option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegalActions(BTreeMap<Location, Vec<Order>>);

impl LegalActions {
    /// Build a catalog, dropping locations that have no options.
    pub fn new(by_location: BTreeMap<Location, Vec<Order>>) -> Self {
        Self(
            by_location
                .into_iter()
                .filter(|(_, orders)| !orders.is_empty())
                .collect(),
        )
    }

    /// Whether the power has nothing to decide this phase.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of locations with options.
    pub fn location_count(&self) -> usize {
        self.0.len()
    }

    /// Total number of options across all locations.
    pub fn order_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Locations with options, sorted.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.0.keys()
    }

    /// Options at one location.
    pub fn at(&self, location: &str) -> Option<&[Order]> {
        self.0.get(location).map(Vec::as_slice)
    }

    /// Iterate `(location, options)` pairs in location order.
    pub fn iter(&self) -> impl Iterator<Item = (&Location, &[Order])> {
        self.0.iter().map(|(l, o)| (l, o.as_slice()))
    }

    /// Whether `order` is a legal option at any location.
    pub fn contains(&self, order: &Order) -> bool {
        self.0.values().any(|opts| opts.contains(order))
    }

    /// The flattened set of every legal option.
    pub fn legal_set(&self) -> BTreeSet<&Order> {
        self.0.values().flatten().collect()
    }

    /// Every legal option in location order, duplicates removed.
    pub fn flatten(&self) -> Vec<Order> {
        self.legal_set().into_iter().cloned().collect()
    }

    /// Resolve free text to a catalog entry.
    ///
    /// Matching is exact after trimming and collapsing internal whitespace,
    /// so a decision-maker can only ever produce an order that is a member
    /// of the catalog.
    pub fn select(&self, text: &str) -> Option<Order> {
        let wanted = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.0
            .values()
            .flatten()
            .find(|o| o.as_str() == wanted)
            .cloned()
    }

    /// The orders in `batch` that are not in the catalog.
    pub fn illegal_in(&self, batch: &[Order]) -> Vec<Order> {
        let legal = self.legal_set();
        batch
            .iter()
            .filter(|o| !legal.contains(o))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn catalog() -> LegalActions {
        let mut map = BTreeMap::new();
        map.insert(
            Location::new("PAR"),
            vec![Order::new("A PAR H"), Order::new("A PAR - BUR")],
        );
        map.insert(Location::new("MAR"), vec![Order::new("A MAR H")]);
        map.insert(Location::new("BRE"), Vec::new());
        LegalActions::new(map)
    }

    #[test]
    fn empty_locations_are_dropped() {
        let c = catalog();
        assert_eq!(c.location_count(), 2);
        assert!(c.at("BRE").is_none());
        assert_eq!(c.order_count(), 3);
    }

    #[test]
    fn select_normalises_whitespace_but_not_content() {
        let c = catalog();
        assert_eq!(c.select("  A PAR  -   BUR "), Some(Order::new("A PAR - BUR")));
        assert_eq!(c.select("A PAR - PIC"), None);
        assert_eq!(c.select("a par h"), None);
    }

    #[test]
    fn illegal_in_reports_non_members() {
        let c = catalog();
        let batch = vec![Order::new("A PAR H"), Order::new("A MAR - SPA")];
        assert_eq!(c.illegal_in(&batch), vec![Order::new("A MAR - SPA")]);
    }

    #[test]
    fn serializes_as_plain_map() {
        let json = serde_json::to_value(catalog()).unwrap();
        assert_eq!(json["MAR"][0], "A MAR H");
    }
}
