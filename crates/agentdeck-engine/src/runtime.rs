//! Hidden per-thread runtime record.
//!
//! Streaming state is kept as integer indices into the append-only
//! timeline rather than back-pointers, which keeps the snapshot deep-copy
//! trivial and cycle-free. Depth counters floor at zero; overlays are
//! live signals set and cleared by the lifecycle tracker.

use serde_json::Value;

/// Background-task overlay label and details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BackgroundOverlay {
    pub label: String,
    pub details: String,
}

/// Internal mutable state for one thread.
#[derive(Debug, Default)]
pub(crate) struct ThreadRuntime {
    /// Open-item indices into the thread timeline. `None` means no item
    /// of that kind is currently accepting streaming appends.
    pub thinking_index: Option<usize>,
    pub assistant_index: Option<usize>,
    pub command_index: Option<usize>,
    pub plan_index: Option<usize>,

    /// Files with an `editing` item not yet flushed to `saved`.
    pub editing_files: Vec<String>,

    pub turn_depth: u32,
    pub approval_depth: u32,
    pub user_input_depth: u32,
    pub command_depth: u32,
    pub file_edit_depth: u32,
    pub tool_call_depth: u32,
    pub collab_depth: u32,

    /// `Some` while a command waits on terminal stdin; holds the command
    /// label for the status header.
    pub terminal_wait: Option<String>,
    /// `Some` while MCP servers are starting up; holds a display label.
    pub mcp_startup: Option<String>,
    pub background: Option<BackgroundOverlay>,
    pub stream_error_text: String,
    pub stream_error_details: String,

    /// Header captured from the reasoning stream (`**…**`).
    pub status_header: String,
    pub reasoning_header_buf: String,

    /// Once events have been applied, externally supplied states
    /// (`replace_threads`) no longer override the derived one.
    pub has_derived_state: bool,
}

impl ThreadRuntime {
    /// Resets turn-scoped state at a turn boundary. Overlays survive;
    /// they have their own lifecycle.
    pub fn reset_lifecycle(&mut self) {
        self.clear_depths();
        self.thinking_index = None;
        self.assistant_index = None;
        self.command_index = None;
        self.plan_index = None;
        self.editing_files.clear();
        self.status_header.clear();
        self.reasoning_header_buf.clear();
    }

    pub fn clear_depths(&mut self) {
        self.turn_depth = 0;
        self.approval_depth = 0;
        self.user_input_depth = 0;
        self.command_depth = 0;
        self.file_edit_depth = 0;
        self.tool_call_depth = 0;
        self.collab_depth = 0;
    }

    /// Shifts open indices down after the item at `removed` was elided.
    pub fn shift_indices_after(&mut self, removed: usize) {
        for idx in [
            &mut self.thinking_index,
            &mut self.assistant_index,
            &mut self.command_index,
            &mut self.plan_index,
        ] {
            match *idx {
                Some(i) if i > removed => *idx = Some(i - 1),
                Some(i) if i == removed => *idx = None,
                _ => {}
            }
        }
    }

    /// Coerces depth counters from an externally reported thread status
    /// (`thread/status/changed`): `status.type` seeds the shape,
    /// `activeFlags` floors individual counters at one.
    pub fn coerce_from_status(&mut self, payload: &Value) {
        let status = payload.get("status").unwrap_or(payload);
        let status_type = status.get("type").and_then(Value::as_str).unwrap_or("");

        self.clear_depths();
        match status_type {
            "running" | "executing" => {
                self.turn_depth = 1;
                self.command_depth = 1;
            }
            "waitingInput" | "waiting_input" | "waitingForInput" => {
                self.turn_depth = 1;
                self.user_input_depth = 1;
            }
            "waitingApproval" | "waiting_approval" => {
                self.turn_depth = 1;
                self.approval_depth = 1;
            }
            "thinking" | "responding" | "active" | "busy" => self.turn_depth = 1,
            _ => {}
        }

        let Some(flags) = status.get("activeFlags").and_then(Value::as_array) else {
            return;
        };
        for flag in flags.iter().filter_map(Value::as_str) {
            let counter = if flag.contains("command") {
                &mut self.command_depth
            } else if flag.contains("fileEdit") || flag.contains("edit") {
                &mut self.file_edit_depth
            } else if flag.contains("tool") {
                &mut self.tool_call_depth
            } else if flag.contains("approval") {
                &mut self.approval_depth
            } else if flag.contains("input") {
                &mut self.user_input_depth
            } else if flag.contains("collab") {
                &mut self.collab_depth
            } else {
                continue;
            };
            *counter = (*counter).max(1);
            self.turn_depth = self.turn_depth.max(1);
        }
    }

    /// True when any command/tool/collab activity is in flight.
    pub fn has_activity(&self) -> bool {
        self.command_depth > 0 || self.tool_call_depth > 0 || self.collab_depth > 0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_shift_indices_after_elision() {
        let mut rt = ThreadRuntime {
            assistant_index: Some(3),
            command_index: Some(1),
            plan_index: Some(0),
            ..ThreadRuntime::default()
        };
        rt.shift_indices_after(1);
        assert_eq!(rt.assistant_index, Some(2));
        assert_eq!(rt.command_index, None);
        assert_eq!(rt.plan_index, Some(0));
    }

    #[test]
    fn test_coerce_from_status_type_and_flags() {
        let mut rt = ThreadRuntime {
            command_depth: 4,
            ..ThreadRuntime::default()
        };
        rt.coerce_from_status(&json!({"status": {"type": "idle"}}));
        assert_eq!(rt.command_depth, 0);
        assert_eq!(rt.turn_depth, 0);

        rt.coerce_from_status(&json!({"status": {
            "type": "running",
            "activeFlags": ["fileEdit", "toolCall"],
        }}));
        assert_eq!(rt.turn_depth, 1);
        assert_eq!(rt.command_depth, 1);
        assert_eq!(rt.file_edit_depth, 1);
        assert_eq!(rt.tool_call_depth, 1);

        rt.coerce_from_status(&json!({"type": "waitingApproval"}));
        assert_eq!(rt.approval_depth, 1);
        assert_eq!(rt.command_depth, 0);
    }
}
