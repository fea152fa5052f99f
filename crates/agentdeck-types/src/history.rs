//! Persisted history records replayed by the hydrator.
//!
//! The persistence layer stores one record per backend event plus user
//! messages. Hydration sorts records by `id` and replays them through the
//! same ingestion pipeline that handled the live stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Monotonic store id; replay order is ascending by this.
    pub id: i64,
    /// `user`, `assistant` or `system`.
    #[serde(default)]
    pub role: String,
    /// Raw wire event type the record was persisted from.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Raw JSON-RPC method, when the event arrived via one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    /// Flattened display text of the event.
    #[serde(default)]
    pub content: String,
    /// Original event payload; may be `null` for old records.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    /// Extra metadata; user records carry attachments under `input[]`.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl HistoryRecord {
    /// A minimal record, for callers assembling records in code.
    pub fn new(id: i64, role: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            kind: kind.into(),
            method: String::new(),
            content: String::new(),
            payload: Value::Null,
            metadata: Value::Null,
        }
    }
}
