//! Token-window accounting with outlier rejection.
//!
//! Usage totals arrive in several payload shapes depending on the wire
//! generation (`tokenUsage.last/total`, `usage.total`,
//! `info.last_token_usage`, `info.total_token_usage`, flat keys). The
//! accountant walks the candidate paths in a fixed order, ignores zero
//! context windows, and rejects totals that exceed the window (a
//! cumulative counter leaking through where a last-turn value belongs).

use agentdeck_types::TokenUsageSnapshot;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::normalize::coerce_i64;

/// Whether this event feeds the accountant.
pub(crate) fn is_token_event(raw_type: &str, method: &str) -> bool {
    matches!(raw_type, "token_count" | "context_compacted")
        || matches!(method, "thread/tokenUsage/updated" | "thread/compacted")
}

/// Computes the next usage snapshot, or `None` when the payload carries
/// nothing usable and there is no window to preserve.
pub(crate) fn apply_token_usage(
    payload: &Value,
    previous: Option<&TokenUsageSnapshot>,
    now: DateTime<Utc>,
) -> Option<TokenUsageSnapshot> {
    let limit = context_window(payload)
        .or_else(|| {
            previous
                .map(|p| p.context_window_tokens)
                .filter(|&l| l > 0)
        })
        .unwrap_or(0);

    let candidate = used_tokens(payload);
    if candidate.is_none() && limit == 0 {
        return None;
    }
    let mut used = candidate
        .or_else(|| previous.map(|p| p.used_tokens))
        .unwrap_or(0)
        .max(0);

    if limit > 0 && used > limit {
        let fallback = previous
            .map(|p| p.used_tokens)
            .filter(|&u| u <= limit)
            .or_else(|| last_usage_total(payload).filter(|&u| u <= limit))
            .unwrap_or(0);
        warn!(used, limit, fallback, "rejecting token usage outlier");
        used = fallback;
    }

    let (used_percent, left_percent) = if limit > 0 {
        let pct = ((used as f64 / limit as f64) * 100.0).clamp(0.0, 100.0);
        (pct, 100.0 - pct)
    } else {
        (0.0, 0.0)
    };

    Some(TokenUsageSnapshot {
        used_tokens: used,
        context_window_tokens: limit,
        used_percent,
        left_percent,
        updated_at: now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    })
}

/// Context-window lookup; zero windows are never surfaced.
fn context_window(payload: &Value) -> Option<i64> {
    let nested = [
        ("tokenUsage", "modelContextWindow"),
        ("usage", "modelContextWindow"),
        ("info", "model_context_window"),
    ];
    for (container, key) in nested {
        if let Some(limit) = payload
            .get(container)
            .and_then(|c| c.get(key))
            .and_then(coerce_i64)
            .filter(|&l| l > 0)
        {
            return Some(limit);
        }
    }
    [
        "context_window_tokens",
        "contextWindowTokens",
        "model_context_window",
        "modelContextWindow",
    ]
    .iter()
    .find_map(|key| coerce_i64(payload.get(key)?).filter(|&l| l > 0))
}

/// Used-token candidates, in preference order: `last` containers, `total`
/// containers, `info.last_token_usage`, `info.total_token_usage` (total
/// or input+output), flat totals, flat input+output.
fn used_tokens(payload: &Value) -> Option<i64> {
    for (container, key) in [("tokenUsage", "last"), ("usage", "last")] {
        if let Some(used) = usage_total(payload.get(container).and_then(|c| c.get(key))) {
            return Some(used);
        }
    }
    for (container, key) in [("tokenUsage", "total"), ("usage", "total")] {
        if let Some(used) = usage_total(payload.get(container).and_then(|c| c.get(key))) {
            return Some(used);
        }
    }
    if let Some(used) = usage_total(payload.get("info").and_then(|i| i.get("last_token_usage"))) {
        return Some(used);
    }
    if let Some(used) = usage_total(payload.get("info").and_then(|i| i.get("total_token_usage"))) {
        return Some(used);
    }
    for key in ["total_tokens", "totalTokens", "used_tokens", "usedTokens"] {
        if let Some(used) = payload.get(key).and_then(coerce_i64) {
            return Some(used);
        }
    }
    flat_in_out_sum(payload)
}

/// Total of one usage object: explicit total first, then input+output.
fn usage_total(obj: Option<&Value>) -> Option<i64> {
    let obj = obj?;
    for key in ["total_tokens", "totalTokens", "total"] {
        if let Some(total) = obj.get(key).and_then(coerce_i64) {
            return Some(total);
        }
    }
    flat_in_out_sum(obj)
}

fn flat_in_out_sum(obj: &Value) -> Option<i64> {
    let input = ["input_tokens", "inputTokens", "input"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(coerce_i64));
    let output = ["output_tokens", "outputTokens", "output"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(coerce_i64));
    match (input, output) {
        (None, None) => None,
        (i, o) => Some(i.unwrap_or(0) + o.unwrap_or(0)),
    }
}

/// The payload's own last-turn total, used as an outlier fallback.
fn last_usage_total(payload: &Value) -> Option<i64> {
    usage_total(payload.get("info").and_then(|i| i.get("last_token_usage")))
        .or_else(|| usage_total(payload.get("last_token_usage")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn apply(payload: &Value, previous: Option<&TokenUsageSnapshot>) -> Option<TokenUsageSnapshot> {
        apply_token_usage(payload, previous, Utc::now())
    }

    #[test]
    fn test_total_path_with_window() {
        let usage = apply(
            &json!({"tokenUsage": {"total": {"totalTokens": 119_000}, "modelContextWindow": 258_000}}),
            None,
        )
        .unwrap();
        assert_eq!(usage.used_tokens, 119_000);
        assert_eq!(usage.context_window_tokens, 258_000);
        assert!((usage.used_percent - 46.124).abs() < 0.01);
        assert!((usage.used_percent + usage.left_percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_preferred_over_total() {
        let usage = apply(
            &json!({"tokenUsage": {
                "last": {"totalTokens": 500},
                "total": {"totalTokens": 9000},
                "modelContextWindow": 10_000,
            }}),
            None,
        )
        .unwrap();
        assert_eq!(usage.used_tokens, 500);
    }

    #[test]
    fn test_outlier_rejected_in_favor_of_previous() {
        let previous = apply(
            &json!({"tokenUsage": {"total": {"totalTokens": 119_000}, "modelContextWindow": 258_000}}),
            None,
        )
        .unwrap();
        let usage = apply(
            &json!({"info": {
                "total_token_usage": {"total_tokens": 40_900_000i64},
                "model_context_window": 258_000,
            }}),
            Some(&previous),
        )
        .unwrap();
        assert_eq!(usage.used_tokens, 119_000);
        assert_eq!(usage.context_window_tokens, 258_000);
    }

    #[test]
    fn test_outlier_falls_back_to_payload_last_then_zero() {
        let usage = apply(
            &json!({"info": {
                "total_token_usage": {"total_tokens": 40_900_000i64},
                "last_token_usage": {"total_tokens": 12_000},
                "model_context_window": 258_000,
            }}),
            None,
        )
        .unwrap();
        assert_eq!(usage.used_tokens, 12_000);

        let usage = apply(
            &json!({"info": {
                "total_token_usage": {"total_tokens": 40_900_000i64},
                "model_context_window": 258_000,
            }}),
            None,
        )
        .unwrap();
        assert_eq!(usage.used_tokens, 0);
    }

    #[test]
    fn test_zero_window_never_surfaced() {
        let usage = apply(
            &json!({"tokenUsage": {"total": {"totalTokens": 100}, "modelContextWindow": 0}}),
            None,
        )
        .unwrap();
        assert_eq!(usage.context_window_tokens, 0);
        assert_eq!(usage.used_percent, 0.0);
        assert_eq!(usage.left_percent, 0.0);
    }

    #[test]
    fn test_window_preserved_from_previous() {
        let previous = apply(
            &json!({"tokenUsage": {"total": {"totalTokens": 100}, "modelContextWindow": 1000}}),
            None,
        )
        .unwrap();
        let usage = apply(&json!({"tokenUsage": {"total": {"totalTokens": 200}}}), Some(&previous))
            .unwrap();
        assert_eq!(usage.context_window_tokens, 1000);
        assert_eq!(usage.used_tokens, 200);
        assert!((usage.used_percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_input_output_sum() {
        let usage = apply(
            &json!({"input_tokens": 300, "output_tokens": 200, "context_window_tokens": 1000}),
            None,
        )
        .unwrap();
        assert_eq!(usage.used_tokens, 500);
    }

    #[test]
    fn test_empty_payload_yields_nothing() {
        assert!(apply(&json!({}), None).is_none());
    }
}
