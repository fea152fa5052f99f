//! Payload normalization: raw bytes → `NormalizedEvent`.
//!
//! The transport decodes the wire envelope and calls [`normalize`] before
//! handing the event to the engine. Extraction walks explicit key lists
//! over the generic JSON map; a field is set only when the payload
//! actually carried it. No schema registration, no defaults, and the
//! input map is never mutated.

use agentdeck_types::NormalizedEvent;
use serde_json::Value;

use crate::classify::classify;

/// Containers a command (and exit code) may be nested under.
pub(crate) const NESTED_CONTAINERS: &[&str] = &[
    "item",
    "process",
    "args",
    "arguments",
    "msg",
    "data",
    "payload",
];

const TEXT_KEYS: &[&str] = &["delta", "text", "content", "output", "message"];

const COMMAND_KEYS: &[&str] = &[
    "uiCommand",
    "command",
    "cmd",
    "command_display",
    "commandDisplay",
    "displayCommand",
];

/// Decodes raw bytes and projects them onto a `NormalizedEvent`.
pub fn normalize(raw_type: &str, method: &str, raw: &[u8]) -> NormalizedEvent {
    let payload = decode_payload(raw);
    normalize_value(raw_type, method, &payload)
}

/// Like [`normalize`] but over an already-decoded payload.
pub fn normalize_value(raw_type: &str, method: &str, payload: &Value) -> NormalizedEvent {
    let ui_type = classify(raw_type, method, payload);

    // File-change begin events name exactly one file; everything else may
    // also carry a `files` array.
    let single_file_only =
        raw_type == "patch_apply_begin" || method == "item/fileChange/started";
    let files = if single_file_only {
        Vec::new()
    } else {
        files_list(payload)
    };

    let wants_exit_code = matches!(
        raw_type,
        "exec_command_end" | "item/completed" | "codex/event/item_completed"
    ) || method == "item/completed";

    NormalizedEvent {
        ui_type,
        text: extract_text(payload),
        command: extract_command(payload),
        file: non_empty_string(payload.get("file")),
        files,
        exit_code: if wants_exit_code {
            extract_exit_code(payload)
        } else {
            None
        },
        raw_type: raw_type.to_string(),
        method: method.to_string(),
    }
}

/// Tolerant payload decode: unparseable, null, empty, or non-object JSON
/// all become an empty map so classification can still proceed by
/// `rawType`/`method`.
pub fn decode_payload(raw: &[u8]) -> Value {
    if raw.is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    match serde_json::from_slice::<Value>(raw) {
        Ok(v) if v.is_object() => v,
        _ => Value::Object(serde_json::Map::new()),
    }
}

/// First non-empty of `delta, text, content, output, message`.
pub(crate) fn extract_text(payload: &Value) -> Option<String> {
    TEXT_KEYS
        .iter()
        .find_map(|key| non_empty_string(payload.get(key)))
}

/// Command lookup: the key list at the top level, then the same keys under
/// each nested container.
pub(crate) fn extract_command(payload: &Value) -> Option<String> {
    if let Some(cmd) = command_in(payload) {
        return Some(cmd);
    }
    NESTED_CONTAINERS
        .iter()
        .filter_map(|c| payload.get(c))
        .find_map(command_in)
}

fn command_in(container: &Value) -> Option<String> {
    COMMAND_KEYS
        .iter()
        .find_map(|key| command_value(container.get(key)?))
}

/// Commands appear both as display strings and as argv arrays.
fn command_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

/// `files[]` entries; plain strings only.
pub(crate) fn files_list(payload: &Value) -> Vec<String> {
    payload
        .get("files")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Exit code from `exit_code`/`exitCode`, top level first, then nested.
pub(crate) fn extract_exit_code(payload: &Value) -> Option<i64> {
    if let Some(code) = exit_code_in(payload) {
        return Some(code);
    }
    NESTED_CONTAINERS
        .iter()
        .filter_map(|c| payload.get(c))
        .find_map(exit_code_in)
}

fn exit_code_in(container: &Value) -> Option<i64> {
    ["exit_code", "exitCode"]
        .iter()
        .find_map(|key| coerce_i64(container.get(key)?))
}

/// Integer coercion tolerating floats and numeric strings; anything else
/// leaves the field unset.
pub(crate) fn coerce_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn non_empty_string(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
