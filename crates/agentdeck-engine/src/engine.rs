//! The runtime state engine.
//!
//! A single value guards the aggregate runtime record with a
//! reader-writer lock: every mutator takes the write lock, every reader
//! the read lock, and the lock serializes all mutations into a total
//! order. Operations are CPU-bound and brief; there are no suspension
//! points. Snapshots handed out are owned deep copies.
//!
//! Per event the flow is: ensure thread → touch metadata → resolve
//! fields → lifecycle side-effects → per-`UiType` handler → status
//! derivation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use agentdeck_types::{
    AlertEntry, AlertLevel, NormalizedEvent, RuntimeSnapshot, ThreadSnapshot, TimelineAttachment,
    TimelineItem, TimelineStats, UiType, WorkspaceMergeResult, WorkspaceRun,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;

use crate::attachments::normalize_attachment;
use crate::normalize::{coerce_i64, non_empty_string};
use crate::resolve::resolve;
use crate::runtime::{BackgroundOverlay, ThreadRuntime};
use crate::status;
use crate::timeline::TimelineOps;
use crate::usage;

/// Alert entries retained per thread.
const MAX_ALERTS_PER_THREAD: usize = 20;

/// The UI runtime state engine. Cheap to create; tests instantiate a
/// fresh engine per case.
pub struct Engine {
    inner: RwLock<EngineInner>,
}

#[derive(Default)]
pub(crate) struct EngineInner {
    pub(crate) snapshot: RuntimeSnapshot,
    pub(crate) runtime: HashMap<String, ThreadRuntime>,
    pub(crate) seq: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(EngineInner::default()),
        }
    }

    /// Lock poisoning is not recoverable state we care about: the inner
    /// record never holds partial updates across unwinds that matter, so
    /// both guards just take the lock.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, EngineInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, EngineInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Ingress: event application
    // ------------------------------------------------------------------

    /// Applies one backend event to a thread. The transport decodes the
    /// wire envelope, calls `normalize`, and passes both projections in.
    /// Threads are created implicitly on first reference.
    pub fn apply_agent_event(&self, thread_id: &str, normalized: &NormalizedEvent, payload: &Value) {
        self.write()
            .apply_event(thread_id, normalized, payload, Utc::now());
    }

    // ------------------------------------------------------------------
    // Ingress: thread management
    // ------------------------------------------------------------------

    /// Upserts the visible thread list. Caller-provided states are only
    /// adopted for threads without derived state; once events flowed,
    /// the derived state wins.
    pub fn replace_threads(&self, threads: &[ThreadSnapshot]) {
        self.write().replace_threads(threads, Utc::now());
    }

    pub fn set_thread_name(&self, thread_id: &str, alias: &str) {
        let mut inner = self.write();
        inner.ensure_thread(thread_id, Utc::now());
        if let Some(meta) = inner.snapshot.agent_meta_by_id.get_mut(thread_id) {
            meta.alias = alias.to_string();
        }
        if let Some(entry) = inner
            .snapshot
            .threads
            .iter_mut()
            .find(|t| t.id == thread_id)
        {
            entry.name = if alias.is_empty() {
                thread_id.to_string()
            } else {
                alias.to_string()
            };
        }
    }

    pub fn set_main_agent(&self, thread_id: &str) {
        let mut inner = self.write();
        inner.ensure_thread(thread_id, Utc::now());
        for (id, meta) in &mut inner.snapshot.agent_meta_by_id {
            meta.is_main = id == thread_id;
        }
    }

    /// Appends a user message with its attachments; paths are normalized
    /// for preview and names derived when absent.
    pub fn append_user_message(
        &self,
        thread_id: &str,
        text: &str,
        attachments: Vec<TimelineAttachment>,
    ) {
        let attachments = attachments.into_iter().map(normalize_attachment).collect();
        self.write()
            .append_user_item(thread_id, text, attachments, Utc::now());
    }

    /// Drops the thread's timeline, diff, and runtime record.
    pub fn clear_thread_timeline(&self, thread_id: &str) {
        let mut inner = self.write();
        inner.reset_thread(thread_id, Utc::now());
        inner.refresh_status(thread_id);
    }

    // ------------------------------------------------------------------
    // Ingress: out-of-band integrations
    // ------------------------------------------------------------------

    /// Bumps an activity counter (`lsp`, `command`, `fileEdit`,
    /// `toolCall`) for integrations outside the event stream.
    pub fn incr_activity_stat(&self, thread_id: &str, kind: &str, tool_name: &str) {
        let mut inner = self.write();
        inner.ensure_thread(thread_id, Utc::now());
        let Some(stats) = inner.snapshot.activity_stats_by_thread.get_mut(thread_id) else {
            return;
        };
        match kind {
            "lsp" | "lspCall" | "lsp_call" => stats.lsp_calls += 1,
            "command" | "commands" => stats.commands += 1,
            "fileEdit" | "file_edit" | "edit" => stats.file_edits += 1,
            "toolCall" | "tool_call" | "tool" => {
                let name = if tool_name.is_empty() { "tool" } else { tool_name };
                *stats.tool_calls.entry(name.to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    pub fn push_alert(&self, thread_id: &str, level: AlertLevel, message: &str) {
        let now = Utc::now();
        let mut inner = self.write();
        inner.ensure_thread(thread_id, now);
        let EngineInner { snapshot, seq, .. } = &mut *inner;
        push_alert_entry(
            &mut snapshot.alerts_by_thread,
            seq,
            thread_id,
            level,
            message,
            now,
        );
    }

    // ------------------------------------------------------------------
    // Ingress: workspace-run cache
    // ------------------------------------------------------------------

    pub fn replace_workspace_runs(&self, runs: Vec<WorkspaceRun>) {
        let mut inner = self.write();
        inner.snapshot.workspace.runs = runs;
        inner.snapshot.workspace.available = true;
        inner.snapshot.workspace.unavailable_reason = None;
    }

    pub fn upsert_workspace_run(&self, run: WorkspaceRun) {
        let mut inner = self.write();
        inner.snapshot.workspace.available = true;
        inner.snapshot.workspace.unavailable_reason = None;
        let runs = &mut inner.snapshot.workspace.runs;
        if let Some(existing) = runs.iter_mut().find(|r| r.id == run.id) {
            *existing = run;
        } else {
            runs.push(run);
        }
    }

    pub fn apply_workspace_merge_result(&self, result: &WorkspaceMergeResult) {
        let mut inner = self.write();
        if let Some(run) = inner
            .snapshot
            .workspace
            .runs
            .iter_mut()
            .find(|r| r.id == result.run_id)
        {
            run.merge_status = Some(result.status.clone());
            run.merge_message = Some(result.message.clone());
        }
    }

    pub fn set_workspace_unavailable(&self, reason: &str) {
        let mut inner = self.write();
        inner.snapshot.workspace.available = false;
        inner.snapshot.workspace.unavailable_reason = Some(reason.to_string());
    }

    // ------------------------------------------------------------------
    // Egress
    // ------------------------------------------------------------------

    /// Full deep copy of the runtime snapshot.
    pub fn snapshot(&self) -> RuntimeSnapshot {
        self.read().cloned_snapshot(false)
    }

    /// Deep copy without timelines and diff text, for frequent polling.
    pub fn snapshot_light(&self) -> RuntimeSnapshot {
        self.read().cloned_snapshot(true)
    }

    /// The thread's timeline as an owned copy.
    pub fn thread_timeline(&self, thread_id: &str) -> Vec<TimelineItem> {
        self.read()
            .snapshot
            .timelines_by_thread
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The thread's raw unified diff text.
    pub fn thread_diff(&self, thread_id: &str) -> String {
        self.read()
            .snapshot
            .diff_text_by_thread
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Diagnostic counters: per-thread item counts and total diff bytes.
    pub fn timeline_stats(&self) -> TimelineStats {
        let inner = self.read();
        TimelineStats {
            items_by_thread: inner
                .snapshot
                .timelines_by_thread
                .iter()
                .map(|(id, items)| (id.clone(), items.len()))
                .collect(),
            total_diff_bytes: inner
                .snapshot
                .diff_text_by_thread
                .values()
                .map(String::len)
                .sum(),
        }
    }
}

impl EngineInner {
    /// Lazily materializes every per-thread record the maps need, so no
    /// handler ever sees a missing entry.
    pub(crate) fn ensure_thread(&mut self, thread_id: &str, now: DateTime<Utc>) {
        self.runtime.entry(thread_id.to_string()).or_default();
        if !self.snapshot.threads.iter().any(|t| t.id == thread_id) {
            self.snapshot.threads.push(ThreadSnapshot {
                id: thread_id.to_string(),
                name: thread_id.to_string(),
                state: agentdeck_types::ThreadState::Idle,
            });
        }
        self.snapshot
            .statuses
            .entry(thread_id.to_string())
            .or_default();
        self.snapshot
            .status_headers_by_thread
            .entry(thread_id.to_string())
            .or_insert_with(|| {
                status::default_header(agentdeck_types::ThreadState::Idle).to_string()
            });
        self.snapshot
            .status_details_by_thread
            .entry(thread_id.to_string())
            .or_default();
        self.snapshot
            .timelines_by_thread
            .entry(thread_id.to_string())
            .or_default();
        self.snapshot
            .activity_stats_by_thread
            .entry(thread_id.to_string())
            .or_default();
        let meta = self
            .snapshot
            .agent_meta_by_id
            .entry(thread_id.to_string())
            .or_default();
        if meta.last_active_at.is_empty() {
            meta.last_active_at = timestamp(now);
        }
    }

    pub(crate) fn apply_event(
        &mut self,
        thread_id: &str,
        normalized: &NormalizedEvent,
        payload: &Value,
        now: DateTime<Utc>,
    ) {
        debug!(
            thread = thread_id,
            ui_type = normalized.ui_type.as_str(),
            raw_type = %normalized.raw_type,
            "apply agent event"
        );
        self.ensure_thread(thread_id, now);

        let Self {
            snapshot,
            runtime,
            seq,
        } = self;
        let Some(rt) = runtime.get_mut(thread_id) else {
            return;
        };

        if let Some(meta) = snapshot.agent_meta_by_id.get_mut(thread_id) {
            meta.last_active_at = timestamp(now);
        }
        rt.has_derived_state = true;

        let resolved = resolve(normalized, payload);

        // Lifecycle side-effects, applied before the per-type handler.

        if normalized.ui_type == UiType::Error {
            rt.stream_error_text = resolved
                .text
                .clone()
                .unwrap_or_else(|| "发生错误".to_string());
            if normalized.raw_type == "stream_error" {
                rt.stream_error_details =
                    non_empty_string(payload.get("details")).unwrap_or_default();
                push_alert_entry(
                    &mut snapshot.alerts_by_thread,
                    seq,
                    thread_id,
                    AlertLevel::Error,
                    &rt.stream_error_text,
                    now,
                );
            }
        } else {
            rt.stream_error_text.clear();
            rt.stream_error_details.clear();
        }

        if is_terminal_interaction(normalized) {
            if stdin_missing(payload) {
                rt.terminal_wait = Some(resolved.command.clone().unwrap_or_default());
            } else {
                rt.terminal_wait = None;
            }
        } else {
            // Live signal: any other event supersedes the wait overlay.
            rt.terminal_wait = None;
        }

        if is_mcp_startup(normalized, "update") {
            rt.mcp_startup = Some(mcp_label(payload));
        } else if is_mcp_startup(normalized, "complete") {
            rt.mcp_startup = None;
        }

        if normalized.raw_type == "background_event" || normalized.method == "background/event" {
            if background_finished(payload) {
                rt.background = None;
            } else {
                rt.background = Some(background_overlay(payload));
            }
        }

        if normalized.raw_type.starts_with("collab_") {
            if normalized.raw_type.ends_with("_begin") {
                rt.collab_depth += 1;
            } else if normalized.raw_type.ends_with("_end") {
                rt.collab_depth = rt.collab_depth.saturating_sub(1);
            }
        }

        if usage::is_token_event(&normalized.raw_type, &normalized.method) {
            if let Some(next) = usage::apply_token_usage(
                payload,
                snapshot.token_usage_by_thread.get(thread_id),
                now,
            ) {
                snapshot
                    .token_usage_by_thread
                    .insert(thread_id.to_string(), next);
            }
        }

        if normalized.raw_type == "thread/status/changed"
            || normalized.method == "thread/status/changed"
        {
            rt.coerce_from_status(payload);
        }

        if normalized.raw_type == "agent_reasoning_section_break"
            || normalized.method == "item/reasoning/sectionBreak"
        {
            rt.reasoning_header_buf.clear();
        }

        if normalized.ui_type == UiType::ReasoningDelta {
            if let Some(text) = resolved.text.as_deref() {
                status::capture_reasoning_header(rt, text);
            }
        }

        // Per-type handler.

        let items = snapshot
            .timelines_by_thread
            .entry(thread_id.to_string())
            .or_default();
        let stats = snapshot
            .activity_stats_by_thread
            .entry(thread_id.to_string())
            .or_default();
        let mut ops = TimelineOps::new(items, rt, seq, now);
        match normalized.ui_type {
            UiType::TurnStarted => ops.open_turn(),
            UiType::TurnComplete => ops.complete_turn(),
            UiType::AssistantDelta => ops.assistant_delta(resolved.text.as_deref().unwrap_or("")),
            UiType::AssistantDone => ops.assistant_done(resolved.text.as_deref()),
            UiType::ReasoningDelta => ops.reasoning_delta(resolved.text.as_deref().unwrap_or("")),
            UiType::CommandStart => {
                ops.rt.command_depth += 1;
                stats.commands += 1;
                ops.command_start(resolved.command.as_deref());
            }
            UiType::CommandOutput => ops.command_output(resolved.text.as_deref().unwrap_or("")),
            UiType::CommandDone => {
                ops.rt.command_depth = ops.rt.command_depth.saturating_sub(1);
                ops.command_done(resolved.exit_code);
            }
            UiType::FileEditStart => {
                ops.rt.file_edit_depth += 1;
                let opened = ops.file_edit_start(resolved.file.as_deref(), &resolved.files);
                stats.file_edits += opened as i64;
            }
            UiType::FileEditDone => {
                ops.rt.file_edit_depth = ops.rt.file_edit_depth.saturating_sub(1);
                ops.file_edit_done(resolved.file.as_deref(), &resolved.files);
            }
            UiType::ToolCall => {
                let name = tool_name(normalized, payload);
                let ended = tool_call_ended(normalized);
                if is_mcp_tool_call(normalized) {
                    if ended {
                        ops.rt.tool_call_depth = ops.rt.tool_call_depth.saturating_sub(1);
                    } else {
                        ops.rt.tool_call_depth += 1;
                    }
                }
                if !ended {
                    *stats.tool_calls.entry(name.clone()).or_insert(0) += 1;
                }
                ops.tool_call(
                    &name,
                    tool_preview(payload),
                    resolved.file.clone(),
                    tool_elapsed_ms(payload),
                    ended,
                    tool_failed(payload),
                );
            }
            UiType::ApprovalRequest => {
                ops.rt.approval_depth += 1;
                ops.approval_request(resolved.text.as_deref());
            }
            UiType::PlanDelta => ops.plan_delta(
                resolved.text.as_deref().unwrap_or(""),
                resolved.plan_set,
                resolved.plan_done,
            ),
            UiType::DiffUpdate => {
                let diff = resolved
                    .text
                    .clone()
                    .or_else(|| diff_text(payload))
                    .unwrap_or_default();
                snapshot
                    .diff_text_by_thread
                    .insert(thread_id.to_string(), diff);
            }
            UiType::UserMessage => {
                ops.user_message(resolved.text.as_deref().unwrap_or(""), Vec::new());
            }
            UiType::Error => ops.error_item(resolved.text.as_deref().unwrap_or("发生错误")),
            UiType::System => {}
        }

        let derived = status::derive(rt);
        snapshot.statuses.insert(thread_id.to_string(), derived.state);
        snapshot
            .status_headers_by_thread
            .insert(thread_id.to_string(), derived.header);
        snapshot
            .status_details_by_thread
            .insert(thread_id.to_string(), derived.details);
        if let Some(entry) = snapshot.threads.iter_mut().find(|t| t.id == thread_id) {
            entry.state = derived.state;
        }
    }

    pub(crate) fn replace_threads(&mut self, threads: &[ThreadSnapshot], now: DateTime<Utc>) {
        let mut list = Vec::with_capacity(threads.len());
        for incoming in threads {
            self.ensure_thread(&incoming.id, now);
            let has_derived = self
                .runtime
                .get(&incoming.id)
                .is_some_and(|rt| rt.has_derived_state);
            let state = if has_derived {
                self.snapshot
                    .statuses
                    .get(&incoming.id)
                    .copied()
                    .unwrap_or_default()
            } else {
                self.snapshot
                    .statuses
                    .insert(incoming.id.clone(), incoming.state);
                self.snapshot.status_headers_by_thread.insert(
                    incoming.id.clone(),
                    status::default_header(incoming.state).to_string(),
                );
                incoming.state
            };
            let alias = self
                .snapshot
                .agent_meta_by_id
                .get(&incoming.id)
                .map(|meta| meta.alias.clone())
                .unwrap_or_default();
            let name = if !alias.is_empty() {
                alias
            } else if !incoming.name.is_empty() {
                incoming.name.clone()
            } else {
                incoming.id.clone()
            };
            list.push(ThreadSnapshot {
                id: incoming.id.clone(),
                name,
                state,
            });
        }
        self.snapshot.threads = list;
    }

    pub(crate) fn append_user_item(
        &mut self,
        thread_id: &str,
        text: &str,
        attachments: Vec<TimelineAttachment>,
        now: DateTime<Utc>,
    ) {
        self.ensure_thread(thread_id, now);
        let Self {
            snapshot,
            runtime,
            seq,
        } = self;
        let Some(rt) = runtime.get_mut(thread_id) else {
            return;
        };
        if let Some(meta) = snapshot.agent_meta_by_id.get_mut(thread_id) {
            meta.last_active_at = timestamp(now);
        }
        let items = snapshot
            .timelines_by_thread
            .entry(thread_id.to_string())
            .or_default();
        let mut ops = TimelineOps::new(items, rt, seq, now);
        ops.user_message(text, attachments);
    }

    /// Timeline, diff, and runtime record reset for one thread.
    pub(crate) fn reset_thread(&mut self, thread_id: &str, now: DateTime<Utc>) {
        self.ensure_thread(thread_id, now);
        self.snapshot
            .timelines_by_thread
            .insert(thread_id.to_string(), Vec::new());
        self.snapshot.diff_text_by_thread.remove(thread_id);
        self.runtime
            .insert(thread_id.to_string(), ThreadRuntime::default());
    }

    /// Recomputes `(state, header, details)` for one thread.
    pub(crate) fn refresh_status(&mut self, thread_id: &str) {
        let Some(rt) = self.runtime.get(thread_id) else {
            return;
        };
        let derived = status::derive(rt);
        self.snapshot
            .statuses
            .insert(thread_id.to_string(), derived.state);
        self.snapshot
            .status_headers_by_thread
            .insert(thread_id.to_string(), derived.header);
        self.snapshot
            .status_details_by_thread
            .insert(thread_id.to_string(), derived.details);
        if let Some(entry) = self
            .snapshot
            .threads
            .iter_mut()
            .find(|t| t.id == thread_id)
        {
            entry.state = derived.state;
        }
    }

    /// Deep copy with `interruptibleByThread` rederived from statuses.
    pub(crate) fn cloned_snapshot(&self, light: bool) -> RuntimeSnapshot {
        let interruptible: BTreeMap<String, bool> = self
            .snapshot
            .statuses
            .iter()
            .map(|(id, state)| (id.clone(), state.interruptible()))
            .collect();
        if light {
            return RuntimeSnapshot {
                threads: self.snapshot.threads.clone(),
                statuses: self.snapshot.statuses.clone(),
                interruptible_by_thread: interruptible,
                status_headers_by_thread: self.snapshot.status_headers_by_thread.clone(),
                status_details_by_thread: self.snapshot.status_details_by_thread.clone(),
                timelines_by_thread: BTreeMap::new(),
                diff_text_by_thread: BTreeMap::new(),
                token_usage_by_thread: self.snapshot.token_usage_by_thread.clone(),
                activity_stats_by_thread: self.snapshot.activity_stats_by_thread.clone(),
                alerts_by_thread: self.snapshot.alerts_by_thread.clone(),
                agent_meta_by_id: self.snapshot.agent_meta_by_id.clone(),
                workspace: self.snapshot.workspace.clone(),
            };
        }
        let mut snap = self.snapshot.clone();
        snap.interruptible_by_thread = interruptible;
        snap
    }
}

pub(crate) fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn push_alert_entry(
    alerts: &mut BTreeMap<String, Vec<AlertEntry>>,
    seq: &mut u64,
    thread_id: &str,
    level: AlertLevel,
    message: &str,
    now: DateTime<Utc>,
) {
    *seq += 1;
    let entry = AlertEntry {
        id: format!("alert-{}-{}", now.timestamp_millis(), seq),
        time: now.format("%H:%M").to_string(),
        level,
        message: message.to_string(),
    };
    let ring = alerts.entry(thread_id.to_string()).or_default();
    ring.push(entry);
    if ring.len() > MAX_ALERTS_PER_THREAD {
        let overflow = ring.len() - MAX_ALERTS_PER_THREAD;
        ring.drain(..overflow);
    }
}

// ----------------------------------------------------------------------
// Payload predicates and small extractors
// ----------------------------------------------------------------------

fn is_terminal_interaction(normalized: &NormalizedEvent) -> bool {
    normalized.raw_type == "terminal_interaction"
        || normalized.method == "item/commandExecution/terminalInteraction"
}

fn stdin_missing(payload: &Value) -> bool {
    let stdin = payload
        .get("stdin")
        .or_else(|| payload.get("item").and_then(|i| i.get("stdin")));
    match stdin {
        None => true,
        Some(v) => v.as_str().is_none_or(str::is_empty),
    }
}

fn is_mcp_startup(normalized: &NormalizedEvent, phase: &str) -> bool {
    let matches_phase =
        |s: &str| s.contains("mcp") && s.contains("startup") && s.contains(phase);
    matches_phase(&normalized.raw_type) || matches_phase(&normalized.method)
}

fn mcp_label(payload: &Value) -> String {
    ["server", "name", "label", "message"]
        .iter()
        .find_map(|key| non_empty_string(payload.get(key)))
        .unwrap_or_default()
}

fn background_finished(payload: &Value) -> bool {
    if payload.get("done").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    if payload.get("active").and_then(Value::as_bool) == Some(false) {
        return true;
    }
    matches!(
        payload.get("status").and_then(Value::as_str),
        Some(
            "done"
                | "completed"
                | "finished"
                | "success"
                | "succeeded"
                | "idle"
                | "stopped"
                | "closed"
                | "ended"
        )
    )
}

fn background_overlay(payload: &Value) -> BackgroundOverlay {
    let label = ["label", "title", "message", "text"]
        .iter()
        .find_map(|key| non_empty_string(payload.get(key)))
        .unwrap_or_else(|| "后台任务运行中".to_string());
    let details = ["details", "description"]
        .iter()
        .find_map(|key| non_empty_string(payload.get(key)))
        .unwrap_or_default();
    BackgroundOverlay { label, details }
}

fn tool_name(normalized: &NormalizedEvent, payload: &Value) -> String {
    let containers = [
        Some(payload),
        payload.get("invocation"),
        payload.get("item"),
        payload.get("msg"),
        payload.get("data"),
    ];
    for container in containers.into_iter().flatten() {
        for key in ["tool", "name", "tool_name", "toolName"] {
            if let Some(name) = non_empty_string(container.get(key)) {
                return name;
            }
        }
    }
    if normalized.raw_type.starts_with("web_search") || normalized.method.contains("webSearch") {
        return "web_search".to_string();
    }
    "tool".to_string()
}

fn tool_call_ended(normalized: &NormalizedEvent) -> bool {
    normalized.raw_type.ends_with("_end") || normalized.method.ends_with("/completed")
}

fn is_mcp_tool_call(normalized: &NormalizedEvent) -> bool {
    normalized.raw_type.starts_with("mcp_tool_call")
        || normalized.method.starts_with("item/mcpToolCall")
}

fn tool_preview(payload: &Value) -> Option<String> {
    ["preview", "snippet", "query", "result"]
        .iter()
        .find_map(|key| non_empty_string(payload.get(key)))
}

fn tool_elapsed_ms(payload: &Value) -> Option<i64> {
    let containers = [Some(payload), payload.get("item")];
    containers.into_iter().flatten().find_map(|container| {
        ["elapsed_ms", "elapsedMs", "duration_ms", "durationMs"]
            .iter()
            .find_map(|key| container.get(*key).and_then(coerce_i64))
    })
}

fn tool_failed(payload: &Value) -> bool {
    let containers = [Some(payload), payload.get("item"), payload.get("msg")];
    containers.into_iter().flatten().any(|container| {
        container.get("success").and_then(Value::as_bool) == Some(false)
            || container.get("ok").and_then(Value::as_bool) == Some(false)
    })
}

fn diff_text(payload: &Value) -> Option<String> {
    ["unified_diff", "unifiedDiff", "diff"]
        .iter()
        .find_map(|key| non_empty_string(payload.get(key)))
}
