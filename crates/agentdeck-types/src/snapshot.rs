//! The aggregate runtime snapshot handed to the front end.
//!
//! Snapshots are owned deep copies: the engine clones its internal record
//! under the read lock and the caller may consume the result without any
//! further coordination. The "light" variant elides the heavy per-thread
//! fields (timelines, diff text) for high-frequency polling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::timeline::TimelineItem;
use crate::workspace::WorkspaceCache;

/// Resolved per-thread state shown in the thread list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThreadState {
    #[default]
    Idle,
    Starting,
    Thinking,
    Responding,
    Running,
    Editing,
    Waiting,
    Syncing,
    Error,
}

impl ThreadState {
    /// Whether a thread in this state can be interrupted by the user.
    ///
    /// True for every in-flight state; false for `idle` and `error`.
    pub fn interruptible(self) -> bool {
        !matches!(self, ThreadState::Idle | ThreadState::Error)
    }
}

/// A visible thread entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnapshot {
    pub id: String,
    /// Alias when one is set, otherwise the id.
    pub name: String,
    pub state: ThreadState,
}

/// Per-agent metadata maintained alongside the thread list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentMeta {
    #[serde(default)]
    pub alias: String,
    /// RFC3339 UTC timestamp of the last event touching this thread.
    #[serde(default)]
    pub last_active_at: String,
    #[serde(default)]
    pub is_main: bool,
}

/// Context-window accounting for one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageSnapshot {
    pub used_tokens: i64,
    pub context_window_tokens: i64,
    /// Clamped to 0..100; `used + left == 100` whenever the window is known.
    pub used_percent: f64,
    pub left_percent: f64,
    pub updated_at: String,
}

/// Per-thread activity counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub lsp_calls: i64,
    pub commands: i64,
    pub file_edits: i64,
    #[serde(default)]
    pub tool_calls: BTreeMap<String, i64>,
}

/// Severity of an alert entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Error,
    Warning,
    Stall,
}

/// One entry in a thread's alert ring (most recent 20 retained).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEntry {
    pub id: String,
    /// Wall-clock `HH:MM`, for compact display.
    pub time: String,
    pub level: AlertLevel,
    pub message: String,
}

/// Aggregate snapshot of all runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    pub threads: Vec<ThreadSnapshot>,
    pub statuses: BTreeMap<String, ThreadState>,
    /// Derived from `statuses` at clone time; never stored.
    pub interruptible_by_thread: BTreeMap<String, bool>,
    pub status_headers_by_thread: BTreeMap<String, String>,
    pub status_details_by_thread: BTreeMap<String, String>,
    pub timelines_by_thread: BTreeMap<String, Vec<TimelineItem>>,
    /// Raw unified diff per thread; parsing is a renderer concern.
    pub diff_text_by_thread: BTreeMap<String, String>,
    pub token_usage_by_thread: BTreeMap<String, TokenUsageSnapshot>,
    pub activity_stats_by_thread: BTreeMap<String, ActivityStats>,
    pub alerts_by_thread: BTreeMap<String, Vec<AlertEntry>>,
    pub agent_meta_by_id: BTreeMap<String, AgentMeta>,
    pub workspace: WorkspaceCache,
}

/// Diagnostic counters over the timelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStats {
    pub items_by_thread: BTreeMap<String, usize>,
    pub total_diff_bytes: usize,
}
