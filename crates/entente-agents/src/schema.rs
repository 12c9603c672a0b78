//! Closed-choice response schemas.
//!
//! Rather than validating free text after the fact, the order request
//! carries a JSON schema whose array items are an `enum` of the exact legal
//! order strings for the deciding power. Backends that support structured
//! output then cannot produce anything outside the catalog. Very large
//! enums are sent non-strict, since providers reject strict schemas past a
//! size limit; the parser still filters the reply through the catalog.

use entente_types::{LegalActions, Power, Recipient};
use serde_json::{Value, json};

/// Largest legal set sent as a strict schema.
pub const STRICT_ENUM_LIMIT: usize = 500;

/// A named JSON schema attached to an LLM request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    /// Schema name, used as the tool or format name by the backend.
    pub name: &'static str,
    /// Short description of what the reply contains.
    pub description: &'static str,
    /// The JSON schema itself. Always an object at the root.
    pub schema: Value,
    /// Whether the backend should enforce the schema strictly.
    pub strict: bool,
}

/// Schema for an order reply: `{"orders": [<legal order>, ...]}`.
pub fn order_schema(catalog: &LegalActions) -> ResponseSchema {
    let options: Vec<String> = catalog
        .flatten()
        .into_iter()
        .map(|o| o.as_str().to_owned())
        .collect();
    let strict = options.len() <= STRICT_ENUM_LIMIT;
    ResponseSchema {
        name: "valid_orders",
        description: "Return a list of valid orders for your power in the current phase.",
        schema: json!({
            "type": "object",
            "properties": {
                "orders": {
                    "type": "array",
                    "items": { "type": "string", "enum": options }
                }
            },
            "required": ["orders"],
            "additionalProperties": false
        }),
        strict,
    }
}

/// Schema for a press reply: `{"to": "ALL" | <power>, "text": "..."}`.
///
/// The speaker is left out of the recipient enum.
pub fn press_schema(speaker: Power) -> ResponseSchema {
    let recipients: Vec<String> = std::iter::once(Recipient::All)
        .chain(
            Power::ALL
                .iter()
                .filter(|p| **p != speaker)
                .map(|p| Recipient::Power(*p)),
        )
        .map(|r| r.to_string())
        .collect();
    ResponseSchema {
        name: "press_message",
        description: "Your next press message, or an empty text to stay silent.",
        schema: json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "enum": recipients },
                "text": { "type": "string" }
            },
            "required": ["to", "text"],
            "additionalProperties": false
        }),
        strict: true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use entente_types::{Location, Order};

    use super::*;

    fn catalog(per_location: usize, locations: usize) -> LegalActions {
        let mut map = BTreeMap::new();
        for l in 0..locations {
            let loc = format!("L{l:03}");
            let options = (0..per_location)
                .map(|o| Order::new(format!("A {loc} - X{o:03}")))
                .collect();
            map.insert(Location::new(loc), options);
        }
        LegalActions::new(map)
    }

    #[test]
    fn order_enum_lists_exactly_the_catalog() {
        let c = catalog(3, 2);
        let schema = order_schema(&c);
        let options = schema
            .schema
            .pointer("/properties/orders/items/enum")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(options.len(), 6);
        assert!(options.contains(&json!("A L001 - X002")));
        assert!(schema.strict);
    }

    #[test]
    fn large_catalogs_are_not_strict() {
        assert!(order_schema(&catalog(50, 10)).strict);
        assert!(!order_schema(&catalog(50, 11)).strict);
    }

    #[test]
    fn press_recipients_exclude_the_speaker() {
        let schema = press_schema(Power::France);
        let recipients = schema
            .schema
            .pointer("/properties/to/enum")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(recipients.len(), 7);
        assert_eq!(recipients.first(), Some(&json!("ALL")));
        assert!(!recipients.contains(&json!("FRANCE")));
    }
}
