//! Field resolution: normalized fields merged with payload fallbacks,
//! plus plan-snapshot extraction.
//!
//! Resolution prefers values the normalizer already extracted and falls
//! back to the same key lists over the payload, so events that skipped
//! normalization (hydration replays, partial transports) still resolve.

use agentdeck_types::NormalizedEvent;
use serde_json::Value;

use crate::normalize::{
    extract_command, extract_exit_code, extract_text, files_list, non_empty_string,
};

/// Fully resolved per-event fields consumed by the lifecycle tracker and
/// the timeline builder.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedFields {
    pub text: Option<String>,
    pub command: Option<String>,
    pub file: Option<String>,
    pub files: Vec<String>,
    pub exit_code: Option<i64>,
    /// True when the payload carried a full plan snapshot; `text` then
    /// holds the formatted snapshot and replaces any streamed content.
    pub plan_set: bool,
    pub plan_done: bool,
}

pub(crate) fn resolve(normalized: &NormalizedEvent, payload: &Value) -> ResolvedFields {
    let mut fields = ResolvedFields {
        text: normalized
            .text
            .clone()
            .or_else(|| extract_text(payload)),
        command: normalized
            .command
            .clone()
            .or_else(|| extract_command(payload)),
        file: normalized
            .file
            .clone()
            .or_else(|| non_empty_string(payload.get("file"))),
        files: if normalized.files.is_empty() {
            files_list(payload)
        } else {
            normalized.files.clone()
        },
        exit_code: normalized.exit_code.or_else(|| extract_exit_code(payload)),
        plan_set: false,
        plan_done: false,
    };

    if let Some((text, done)) = plan_snapshot(payload) {
        fields.text = Some(text);
        fields.plan_set = true;
        fields.plan_done = done;
    }

    fields
}

/// Formats a `plan[]` snapshot (top level or under `msg`/`data`/`payload`)
/// into the progress header plus one symbol-prefixed line per step.
///
/// An empty `plan[]` is treated as no snapshot; it would otherwise mark a
/// plan done before any step exists.
fn plan_snapshot(payload: &Value) -> Option<(String, bool)> {
    let containers = [
        Some(payload),
        payload.get("msg"),
        payload.get("data"),
        payload.get("payload"),
    ];
    for container in containers.into_iter().flatten() {
        let Some(steps) = container.get("plan").and_then(Value::as_array) else {
            continue;
        };
        if steps.is_empty() {
            continue;
        }

        let total = steps.len();
        let mut completed = 0usize;
        let mut lines = Vec::with_capacity(total);
        for (i, step) in steps.iter().enumerate() {
            let label = step
                .get("step")
                .and_then(Value::as_str)
                .or_else(|| step.get("text").and_then(Value::as_str))
                .unwrap_or("");
            let status = step.get("status").and_then(Value::as_str).unwrap_or("");
            let symbol = match status {
                "completed" | "done" => {
                    completed += 1;
                    "☑"
                }
                "in_progress" | "inProgress" => "◐",
                "failed" | "error" => "⚠",
                _ => "○",
            };
            lines.push(format!("{}. {symbol} {label}", i + 1));
        }

        let mut text = format!("✓ 已完成 {completed}/{total} 项任务");
        for line in &lines {
            text.push('\n');
            text.push_str(line);
        }
        return Some((text, completed == total));
    }
    None
}
