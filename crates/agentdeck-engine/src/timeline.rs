//! Timeline builder: append/patch operations over a thread's transcript.
//!
//! Items are append-only from the outside; streaming merges patch the
//! open item tracked by index in the thread runtime. All operations run
//! under the engine's write lock.

use agentdeck_types::{ItemStatus, TimelineAttachment, TimelineItem, TimelineItemKind};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::runtime::ThreadRuntime;

/// Mutable view over one thread's timeline plus its runtime record.
pub(crate) struct TimelineOps<'a> {
    pub items: &'a mut Vec<TimelineItem>,
    pub rt: &'a mut ThreadRuntime,
    seq: &'a mut u64,
    now: DateTime<Utc>,
}

impl<'a> TimelineOps<'a> {
    pub fn new(
        items: &'a mut Vec<TimelineItem>,
        rt: &'a mut ThreadRuntime,
        seq: &'a mut u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            items,
            rt,
            seq,
            now,
        }
    }

    /// Appends a bare item and returns its index. Ids are monotonic:
    /// `"<kind>-<unixMillis>-<seq>"`, minted under the write lock.
    fn push(&mut self, kind: TimelineItemKind) -> usize {
        *self.seq += 1;
        let id = format!(
            "{}-{}-{}",
            kind.as_str(),
            self.now.timestamp_millis(),
            self.seq
        );
        let ts = self.now.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.items.push(TimelineItem::new(kind, id, ts));
        self.items.len() - 1
    }

    /// In-place edit; silent no-op when the index is stale.
    fn patch(&mut self, index: usize, mutate: impl FnOnce(&mut TimelineItem)) {
        if let Some(item) = self.items.get_mut(index) {
            mutate(item);
        }
    }

    // ------------------------------------------------------------------
    // Assistant stream
    // ------------------------------------------------------------------

    pub fn assistant_delta(&mut self, delta: &str) {
        if self.rt.assistant_index.is_none() {
            self.finish_open_thinking();
            let idx = self.push(TimelineItemKind::Assistant);
            self.patch(idx, |item| item.text = Some(String::new()));
            self.rt.assistant_index = Some(idx);
        }
        if let Some(idx) = self.rt.assistant_index {
            self.patch(idx, |item| {
                item.text.get_or_insert_with(String::new).push_str(delta);
            });
        }
    }

    /// Closes the assistant stream. The done-text may duplicate, extend,
    /// or arrive after the streamed deltas; only the missing remainder is
    /// ever appended.
    pub fn assistant_done(&mut self, done_text: Option<&str>) {
        let done = done_text.map(str::trim).unwrap_or("");
        let open = self
            .rt
            .assistant_index
            .take()
            .filter(|&idx| idx < self.items.len());

        let Some(idx) = open else {
            if !done.is_empty() {
                self.finish_open_thinking();
                let idx = self.push(TimelineItemKind::Assistant);
                self.patch(idx, |item| item.text = Some(done.to_string()));
            }
            return;
        };

        let current = self.items[idx].text.clone().unwrap_or_default();
        let is_last = idx + 1 == self.items.len();

        if done.is_empty() || current.contains(done) {
            return;
        }
        if let Some(rest) = done.strip_prefix(current.as_str()).filter(|_| !current.is_empty()) {
            let rest = rest.to_string();
            if is_last {
                self.patch(idx, |item| {
                    item.text.get_or_insert_with(String::new).push_str(&rest);
                });
            } else {
                // Late arrival: the stream item is closed, the remainder
                // becomes its own entry.
                let new_idx = self.push(TimelineItemKind::Assistant);
                self.patch(new_idx, |item| item.text = Some(rest));
            }
            return;
        }
        if !current.is_empty() && !is_last {
            let new_idx = self.push(TimelineItemKind::Assistant);
            self.patch(new_idx, |item| item.text = Some(done.to_string()));
            return;
        }
        self.patch(idx, |item| item.text = Some(done.to_string()));
    }

    // ------------------------------------------------------------------
    // Thinking stream
    // ------------------------------------------------------------------

    pub fn reasoning_delta(&mut self, delta: &str) {
        if self.rt.thinking_index.is_none() {
            let idx = self.push(TimelineItemKind::Thinking);
            self.patch(idx, |item| item.text = Some(String::new()));
            self.rt.thinking_index = Some(idx);
        }
        if let Some(idx) = self.rt.thinking_index {
            self.patch(idx, |item| {
                item.text.get_or_insert_with(String::new).push_str(delta);
            });
        }
    }

    /// Closes the open thinking item: empty placeholders are elided (and
    /// the other open indices shifted), non-empty ones are marked done.
    pub fn finish_open_thinking(&mut self) {
        let Some(idx) = self.rt.thinking_index.take() else {
            return;
        };
        let Some(item) = self.items.get(idx) else {
            return;
        };
        let is_empty = item.text.as_deref().is_none_or(|t| t.trim().is_empty());
        if is_empty {
            self.items.remove(idx);
            self.rt.shift_indices_after(idx);
        } else {
            self.patch(idx, |item| item.done = Some(true));
        }
    }

    // ------------------------------------------------------------------
    // Command stream
    // ------------------------------------------------------------------

    pub fn command_start(&mut self, command: Option<&str>) {
        self.finish_open_thinking();
        let idx = self.push(TimelineItemKind::Command);
        let command = command.unwrap_or("").to_string();
        self.patch(idx, |item| {
            item.command = Some(command);
            item.status = Some(ItemStatus::Running);
        });
        self.rt.command_index = Some(idx);
    }

    pub fn command_output(&mut self, chunk: &str) {
        if self.rt.command_index.is_none() {
            // Unmatched output implicitly opens a running command.
            let idx = self.push(TimelineItemKind::Command);
            self.patch(idx, |item| {
                item.command = Some(String::new());
                item.status = Some(ItemStatus::Running);
            });
            self.rt.command_index = Some(idx);
        }
        if let Some(idx) = self.rt.command_index {
            self.patch(idx, |item| {
                item.output.get_or_insert_with(String::new).push_str(chunk);
            });
        }
    }

    pub fn command_done(&mut self, exit_code: Option<i64>) {
        if let Some(idx) = self.rt.command_index.take() {
            self.patch(idx, |item| {
                let failed = exit_code.is_some_and(|code| code != 0);
                item.status = Some(if failed {
                    ItemStatus::Failed
                } else {
                    ItemStatus::Completed
                });
                if exit_code.is_some() {
                    item.exit_code = exit_code;
                }
            });
        }
    }

    // ------------------------------------------------------------------
    // File edits
    // ------------------------------------------------------------------

    /// One `editing` item per file; returns how many were opened.
    pub fn file_edit_start(&mut self, file: Option<&str>, files: &[String]) -> usize {
        let targets = collect_files(file, files);
        for f in &targets {
            let idx = self.push(TimelineItemKind::File);
            let name = f.clone();
            self.patch(idx, |item| {
                item.file = Some(name);
                item.status = Some(ItemStatus::Editing);
            });
            if !self.rt.editing_files.contains(f) {
                self.rt.editing_files.push(f.clone());
            }
        }
        targets.len()
    }

    /// Marks the named files saved; with no files given, flushes every
    /// file still marked editing.
    pub fn file_edit_done(&mut self, file: Option<&str>, files: &[String]) {
        let mut targets = collect_files(file, files);
        if targets.is_empty() {
            targets = std::mem::take(&mut self.rt.editing_files);
        } else {
            self.rt.editing_files.retain(|f| !targets.contains(f));
        }
        for f in &targets {
            self.mark_file_saved(f);
        }
    }

    fn mark_file_saved(&mut self, file: &str) {
        if let Some(item) = self.items.iter_mut().rev().find(|item| {
            item.kind == TimelineItemKind::File
                && item.status == Some(ItemStatus::Editing)
                && item.file.as_deref() == Some(file)
        }) {
            item.status = Some(ItemStatus::Saved);
        }
    }

    // ------------------------------------------------------------------
    // Tool calls
    // ------------------------------------------------------------------

    /// Appends a tool item, unless the immediately previous item is the
    /// same tool and this call only supplies fields it is still missing
    /// (file, preview, elapsed); then the previous item is patched.
    pub fn tool_call(
        &mut self,
        name: &str,
        preview: Option<String>,
        file: Option<String>,
        elapsed_ms: Option<i64>,
        ended: bool,
        failed: bool,
    ) {
        let status = if !ended {
            ItemStatus::Running
        } else if failed {
            ItemStatus::Failed
        } else {
            ItemStatus::Completed
        };

        if let Some(last) = self.items.last_mut() {
            let same_tool =
                last.kind == TimelineItemKind::Tool && last.tool.as_deref() == Some(name);
            let only_missing = preview.is_none() || last.preview.is_none();
            let only_missing = only_missing && (file.is_none() || last.file.is_none());
            let only_missing = only_missing && (elapsed_ms.is_none() || last.elapsed_ms.is_none());
            if same_tool && only_missing {
                if let Some(p) = preview {
                    last.preview = Some(p);
                }
                if let Some(f) = file {
                    last.file = Some(f);
                }
                if let Some(ms) = elapsed_ms {
                    last.elapsed_ms = Some(ms);
                }
                last.status = Some(status);
                return;
            }
        }

        let idx = self.push(TimelineItemKind::Tool);
        let name = name.to_string();
        self.patch(idx, |item| {
            item.tool = Some(name);
            item.preview = preview;
            item.file = file;
            item.elapsed_ms = elapsed_ms;
            item.status = Some(status);
        });
    }

    // ------------------------------------------------------------------
    // Approval / plan / user / error
    // ------------------------------------------------------------------

    pub fn approval_request(&mut self, text: Option<&str>) {
        let idx = self.push(TimelineItemKind::Approval);
        let text = text.unwrap_or("").to_string();
        self.patch(idx, |item| {
            item.text = Some(text);
            item.status = Some(ItemStatus::Pending);
        });
    }

    /// Plan snapshots replace the open plan item's text wholesale; plain
    /// deltas append.
    pub fn plan_delta(&mut self, text: &str, plan_set: bool, plan_done: bool) {
        if self.rt.plan_index.is_none() {
            let idx = self.push(TimelineItemKind::Plan);
            self.patch(idx, |item| {
                item.text = Some(String::new());
                item.done = Some(false);
            });
            self.rt.plan_index = Some(idx);
        }
        if let Some(idx) = self.rt.plan_index {
            let text = text.to_string();
            self.patch(idx, |item| {
                if plan_set {
                    item.text = Some(text);
                    item.done = Some(plan_done);
                } else {
                    item.text.get_or_insert_with(String::new).push_str(&text);
                }
            });
        }
    }

    pub fn user_message(&mut self, text: &str, attachments: Vec<TimelineAttachment>) {
        let idx = self.push(TimelineItemKind::User);
        let text = text.to_string();
        self.patch(idx, |item| {
            item.text = Some(text);
            item.attachments = attachments;
        });
    }

    pub fn error_item(&mut self, text: &str) {
        let idx = self.push(TimelineItemKind::Error);
        let text = text.to_string();
        self.patch(idx, |item| item.text = Some(text));
    }

    // ------------------------------------------------------------------
    // Turn boundaries
    // ------------------------------------------------------------------

    /// New turn: turn-scoped runtime state resets and an empty thinking
    /// placeholder opens so reasoning deltas have somewhere to land.
    pub fn open_turn(&mut self) {
        self.rt.reset_lifecycle();
        self.rt.turn_depth = 1;
        let idx = self.push(TimelineItemKind::Thinking);
        self.patch(idx, |item| item.text = Some(String::new()));
        self.rt.thinking_index = Some(idx);
    }

    /// Turn cleanup: closes every open stream. A still-running command is
    /// forced to `completed` with exit 0. Renderers distinguish the
    /// forced close from a real exit code by its adjacency to the turn
    /// boundary, so this must never become `failed`.
    pub fn complete_turn(&mut self) {
        self.finish_open_thinking();
        self.rt.assistant_index = None;

        if let Some(idx) = self.rt.command_index.take() {
            self.patch(idx, |item| {
                if item.status == Some(ItemStatus::Running) {
                    item.status = Some(ItemStatus::Completed);
                    if item.exit_code.is_none() {
                        item.exit_code = Some(0);
                    }
                }
            });
        }

        if let Some(idx) = self.rt.plan_index.take() {
            self.patch(idx, |item| item.done = Some(true));
        }

        let editing = std::mem::take(&mut self.rt.editing_files);
        for file in &editing {
            self.mark_file_saved(file);
        }

        self.rt.clear_depths();
        self.rt.mcp_startup = None;
        self.rt.reasoning_header_buf.clear();
    }
}

fn collect_files(file: Option<&str>, files: &[String]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::with_capacity(files.len() + 1);
    if let Some(f) = file.filter(|f| !f.is_empty()) {
        targets.push(f.to_string());
    }
    for f in files {
        if !f.is_empty() && !targets.contains(f) {
            targets.push(f.clone());
        }
    }
    targets
}
