//! Record normalizer — turns an arbitrary raw payload into a usable [`Record`].
//!
//! Normalization is total: it never fails and never rejects input. A payload
//! that parses as a JSON object gets per-field defaulting on type mismatches;
//! anything else becomes a synthetic "raw" record carrying the original
//! payload text as its single message line.

use crate::types::Record;
use chrono::Utc;
use serde_json::Value;

/// Normalize a raw payload into a [`Record`].
///
/// Defaulting rules for a JSON object payload:
/// - string fields that are absent or not strings become `""`
/// - numeric fields that are absent or not numbers become `0`
/// - a scalar `messages` is wrapped into a single-element sequence
/// - an absent, null, or empty `messages` becomes `[""]` so the non-empty
///   invariant holds
///
/// Any payload that is not a JSON object (including bare scalars and arrays)
/// yields the synthetic raw record: `role = "unknown"`, `label = "raw"`,
/// `level = 0`, `time` = current wall-clock millis, and the payload text as
/// the only message.
pub fn normalize(payload: &str) -> Record {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Record {
            role: str_field(map.get("role")),
            label: str_field(map.get("label")),
            file: str_field(map.get("file")),
            function: str_field(map.get("function")),
            time: int_field(map.get("time")),
            process_id: int_field(map.get("process_id")),
            thread_id: int_field(map.get("thread_id")),
            line: int_field(map.get("line")),
            level: int_field(map.get("level")),
            messages: messages_field(map.get("messages")),
        },
        _ => raw_record(payload),
    }
}

/// Build the synthetic record for an unparseable payload.
pub fn raw_record(payload: &str) -> Record {
    Record {
        role: "unknown".to_string(),
        label: "raw".to_string(),
        file: String::new(),
        function: String::new(),
        time: Utc::now().timestamp_millis(),
        process_id: 0,
        thread_id: 0,
        line: 0,
        level: 0,
        messages: vec![payload.to_string()],
    }
}

fn str_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn int_field(value: Option<&Value>) -> i64 {
    match value {
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        None => 0,
    }
}

fn messages_field(value: Option<&Value>) -> Vec<String> {
    let messages = match value {
        Some(Value::Array(items)) => items.iter().map(scalar_text).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(v) => vec![scalar_text(v)],
    };
    if messages.is_empty() {
        vec![String::new()]
    } else {
        messages
    }
}

/// String form of a message element: strings verbatim, everything else as
/// its JSON rendering.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
