//! Migration plan parser
//!
//! Models wrap JSON in prose or code fences more often than not, so the
//! parser looks for the plan object instead of expecting a bare document.

use serde::de::IgnoredAny;

use super::MigrationPlan;
use crate::{Error, Result};

/// Parse a plan from a model reply
pub fn parse_plan(reply: &str) -> Result<MigrationPlan> {
    let json = json_values(reply)
        .find(|json| json.starts_with('{'))
        .ok_or_else(|| Error::Plan("No JSON object found in planning reply".to_string()))?;

    serde_json::from_str(json)
        .map_err(|e| Error::Plan(format!("Planning reply is not a valid migration plan: {}", e)))
}

/// Locate the JSON payload in a reply
///
/// Returns the first complete value, skipping brackets in the surrounding
/// prose that do not open valid JSON.
pub fn extract_json(reply: &str) -> Option<&str> {
    json_values(reply).next()
}

/// Every complete JSON object or array in a reply, by start offset
///
/// Values nested inside an earlier value are yielded too, after it.
pub fn json_values(reply: &str) -> impl Iterator<Item = &str> + '_ {
    reply.match_indices(['{', '[']).filter_map(move |(start, _)| {
        let rest = &reply[start..];
        let mut values = serde_json::Deserializer::from_str(rest).into_iter::<IgnoredAny>();
        match values.next() {
            Some(Ok(_)) => Some(&rest[..values.byte_offset()]),
            _ => None,
        }
    })
}
