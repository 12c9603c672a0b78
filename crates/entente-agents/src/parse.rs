//! LLM response parsing into orders and press drafts.
//!
//! The LLM returns raw text, ideally JSON matching the request schema. This
//! module extracts the JSON through several recovery strategies and then
//! filters every order through the power's [`LegalActions`], so nothing
//! outside the catalog leaves the agent. Unknown strings are dropped and
//! reported; at most one order per location is kept.

use std::collections::BTreeSet;

use entente_types::{LegalActions, Location, Order, PressDraft, Recipient};
use serde_json::Value;
use tracing::warn;

use crate::error::AgentError;

/// Orders recovered from an LLM reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOrders {
    /// Catalog members, in reply order, one per location.
    pub orders: Vec<Order>,
    /// Strings that were not catalog members or repeated a location.
    pub dropped: Vec<String>,
}

/// Parse an order reply and filter it through `catalog`.
///
/// Accepts `{"orders": [...]}` or a bare JSON array of strings.
///
/// # Errors
///
/// Returns [`AgentError::Parse`] if no JSON value of either shape can be
/// recovered from the reply.
pub fn parse_orders(raw: &str, catalog: &LegalActions) -> Result<ParsedOrders, AgentError> {
    let value = extract_json(raw)?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("orders")
            .and_then(Value::as_array)
            .ok_or_else(|| AgentError::Parse("reply object has no \"orders\" array".to_owned()))?,
        other => {
            return Err(AgentError::Parse(format!(
                "expected an order list, got {other}"
            )));
        }
    };

    let mut parsed = ParsedOrders::default();
    let mut ordered: BTreeSet<&Location> = BTreeSet::new();
    for item in items {
        let Some(text) = item.as_str() else {
            parsed.dropped.push(item.to_string());
            continue;
        };
        let Some(order) = catalog.select(text) else {
            parsed.dropped.push(text.to_owned());
            continue;
        };
        let location = catalog
            .iter()
            .find(|(_, options)| options.contains(&order))
            .map(|(location, _)| location);
        match location {
            Some(location) if ordered.insert(location) => parsed.orders.push(order),
            _ => parsed.dropped.push(text.to_owned()),
        }
    }

    if !parsed.dropped.is_empty() {
        warn!(dropped = ?parsed.dropped, "LLM reply contained orders outside the catalog");
    }
    Ok(parsed)
}

/// Parse a press reply.
///
/// Accepts `{"to": ..., "text": ...}` or a bare JSON string, which is read
/// as a broadcast. An empty text means the power stays silent.
///
/// # Errors
///
/// Returns [`AgentError::Parse`] if no JSON can be recovered or the
/// recipient is not `ALL` or a power name.
pub fn parse_press(raw: &str) -> Result<Option<PressDraft>, AgentError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value = extract_json(raw)?;
    let (recipient, text) = match &value {
        Value::String(text) => (Recipient::All, text.as_str()),
        Value::Object(map) => {
            let text = map.get("text").and_then(Value::as_str).unwrap_or_default();
            let recipient = match map.get("to").and_then(Value::as_str) {
                Some(to) => to
                    .parse::<Recipient>()
                    .map_err(|e| AgentError::Parse(e.to_string()))?,
                None => Recipient::All,
            };
            (recipient, text)
        }
        other => {
            return Err(AgentError::Parse(format!(
                "expected a press object, got {other}"
            )));
        }
    };

    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(PressDraft::new(recipient, text.trim())))
}

/// Recover a JSON value through multiple strategies:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from a markdown code block
/// 3. Strip trailing commas and retry
/// 4. Take the outermost `{...}` or `[...]` span
fn extract_json(raw: &str) -> Result<Value, AgentError> {
    let trimmed = raw.trim();

    let mut candidates: Vec<String> = vec![trimmed.to_owned()];
    if let Some(block) = extract_json_from_codeblock(trimmed) {
        candidates.push(block.to_owned());
    }
    if let Some(span) = outermost_span(trimmed) {
        candidates.push(span.to_owned());
    }

    for candidate in &candidates {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
        if let Ok(value) = serde_json::from_str::<Value>(&strip_trailing_commas(candidate)) {
            return Ok(value);
        }
    }

    Err(AgentError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Extract JSON from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = text.get(open.checked_add(3)?..)?;
    let body_start = after_fence.find('\n').and_then(|nl| nl.checked_add(1))?;
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// The span from the first `{` or `[` to the last matching closer.
fn outermost_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text.get(start..)?.starts_with('{') {
        '}'
    } else {
        ']'
    };
    let end = text.rfind(closer)?;
    if end <= start {
        return None;
    }
    text.get(start..=end)
}

/// Strip trailing commas before closing braces and brackets (common LLM error).
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    for (i, c) in chars.iter().enumerate() {
        if *c == ',' {
            let next = chars
                .iter()
                .skip(i.saturating_add(1))
                .find(|n| !n.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        result.push(*c);
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use entente_types::Power;

    use super::*;

    fn catalog() -> LegalActions {
        let mut map = BTreeMap::new();
        map.insert(
            Location::new("PAR"),
            vec![Order::new("A PAR H"), Order::new("A PAR - BUR")],
        );
        map.insert(
            Location::new("MAR"),
            vec![Order::new("A MAR H"), Order::new("A MAR - SPA")],
        );
        LegalActions::new(map)
    }

    #[test]
    fn object_reply_is_filtered_through_the_catalog() {
        let raw = r#"{"orders": ["A PAR - BUR", "A MAR - PIE", "F BRE - MAO"]}"#;
        let parsed = parse_orders(raw, &catalog()).unwrap();
        assert_eq!(parsed.orders, [Order::new("A PAR - BUR")]);
        assert_eq!(parsed.dropped, ["A MAR - PIE", "F BRE - MAO"]);
    }

    #[test]
    fn bare_array_and_whitespace_are_accepted() {
        let raw = r#"["A  PAR   H", " A MAR - SPA "]"#;
        let parsed = parse_orders(raw, &catalog()).unwrap();
        assert_eq!(parsed.orders, [Order::new("A PAR H"), Order::new("A MAR - SPA")]);
        assert!(parsed.dropped.is_empty());
    }

    #[test]
    fn one_order_per_location() {
        let raw = r#"{"orders": ["A PAR H", "A PAR - BUR"]}"#;
        let parsed = parse_orders(raw, &catalog()).unwrap();
        assert_eq!(parsed.orders, [Order::new("A PAR H")]);
        assert_eq!(parsed.dropped, ["A PAR - BUR"]);
    }

    #[test]
    fn codeblock_and_trailing_commas_are_recovered() {
        let raw = "Here are my orders:\n\n```json\n{\"orders\": [\"A MAR H\",]}\n```\nGood luck.";
        let parsed = parse_orders(raw, &catalog()).unwrap();
        assert_eq!(parsed.orders, [Order::new("A MAR H")]);
    }

    #[test]
    fn prose_around_json_is_ignored() {
        let raw = r#"I will move to Burgundy: {"orders": ["A PAR - BUR"]} as planned."#;
        let parsed = parse_orders(raw, &catalog()).unwrap();
        assert_eq!(parsed.orders, [Order::new("A PAR - BUR")]);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_orders("I think I should attack Spain.", &catalog()),
            Err(AgentError::Parse(_))
        ));
        assert!(matches!(
            parse_orders(r#"{"moves": []}"#, &catalog()),
            Err(AgentError::Parse(_))
        ));
    }

    #[test]
    fn empty_order_list_means_hold() {
        let parsed = parse_orders(r#"{"orders": []}"#, &catalog()).unwrap();
        assert!(parsed.orders.is_empty());
    }

    #[test]
    fn press_object_with_private_recipient() {
        let draft = parse_press(r#"{"to": "england", "text": "  DMZ in the Channel?  "}"#)
            .unwrap()
            .unwrap();
        assert_eq!(draft.recipient, Recipient::Power(Power::England));
        assert_eq!(draft.text, "DMZ in the Channel?");
    }

    #[test]
    fn press_string_is_a_broadcast_and_empty_is_silence() {
        let draft = parse_press(r#""Peace for all""#).unwrap().unwrap();
        assert_eq!(draft.recipient, Recipient::All);
        assert!(parse_press(r#"{"to": "ALL", "text": ""}"#).unwrap().is_none());
        assert!(parse_press("   ").unwrap().is_none());
    }

    #[test]
    fn press_with_unknown_recipient_is_rejected() {
        assert!(parse_press(r#"{"to": "PRUSSIA", "text": "hi"}"#).is_err());
    }

    #[test]
    fn strip_trailing_commas_basic() {
        assert_eq!(strip_trailing_commas(r#"{"a": 1, "b": 2,}"#), r#"{"a": 1, "b": 2}"#);
        assert_eq!(strip_trailing_commas("[1, 2, 3, \n]"), "[1, 2, 3 \n]");
    }

    #[test]
    fn extract_json_from_plain_codeblock() {
        let text = "```\n[\"A PAR H\"]\n```";
        assert_eq!(extract_json_from_codeblock(text), Some("[\"A PAR H\"]"));
    }
}
