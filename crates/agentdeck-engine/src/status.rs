//! Status derivation: runtime flags → `(state, header, details)`.
//!
//! Overlay precedence is a total-order cascade; new overlays slot into
//! the right position instead of being blended. The reasoning-header
//! parser is a tiny state machine over a whitespace-collapsed buffer,
//! not a Markdown parser: only the first `**…**` pair counts, and
//! section breaks reset it.

use agentdeck_types::ThreadState;

use crate::runtime::ThreadRuntime;

/// Captured reasoning headers are truncated to this many characters.
const HEADER_MAX_CHARS: usize = 80;
/// The reasoning buffer only needs to span a delimiter pair across a few
/// deltas; keep it bounded.
const BUF_MAX_BYTES: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DerivedStatus {
    pub state: ThreadState,
    pub header: String,
    pub details: String,
}

/// Default header per state; also used when adopting externally supplied
/// states in `replace_threads`.
pub(crate) fn default_header(state: ThreadState) -> &'static str {
    match state {
        ThreadState::Idle => "等待指示",
        ThreadState::Starting => "正在启动",
        ThreadState::Thinking => "正在思考",
        ThreadState::Responding => "正在回复",
        ThreadState::Running => "正在执行",
        ThreadState::Editing => "正在编辑文件",
        ThreadState::Waiting => "等待输入",
        ThreadState::Syncing => "正在同步",
        ThreadState::Error => "发生错误",
    }
}

/// Resolves the thread status with fixed precedence:
/// stream error → terminal wait → user input → approval → editing →
/// running → thinking → MCP startup → idle. The background overlay only
/// overrides default headers, never the states or the explicit waiting/
/// error headers above it.
pub(crate) fn derive(rt: &ThreadRuntime) -> DerivedStatus {
    if !rt.stream_error_text.is_empty() {
        return DerivedStatus {
            state: ThreadState::Error,
            header: rt.stream_error_text.clone(),
            details: rt.stream_error_details.clone(),
        };
    }

    if let Some(command) = &rt.terminal_wait {
        let header = if command.is_empty() {
            "等待后台终端".to_string()
        } else {
            format!("等待后台终端 · {command}")
        };
        return DerivedStatus {
            state: ThreadState::Waiting,
            header,
            details: "命令正在等待终端输入".to_string(),
        };
    }

    if rt.user_input_depth > 0 {
        return plain(ThreadState::Waiting, "等待输入");
    }
    if rt.approval_depth > 0 {
        return plain(ThreadState::Waiting, "等待确认");
    }

    if rt.file_edit_depth > 0 {
        return with_background(rt, ThreadState::Editing, None);
    }
    if rt.has_activity() {
        return with_background(rt, ThreadState::Running, None);
    }
    if rt.turn_depth > 0 {
        let header = (!rt.status_header.is_empty()).then(|| rt.status_header.clone());
        return with_background(rt, ThreadState::Thinking, header);
    }

    if let Some(label) = &rt.mcp_startup {
        let header = if label.is_empty() {
            default_header(ThreadState::Syncing).to_string()
        } else {
            format!("{} · {label}", default_header(ThreadState::Syncing))
        };
        return DerivedStatus {
            state: ThreadState::Syncing,
            header,
            details: String::new(),
        };
    }

    with_background(rt, ThreadState::Idle, None)
}

fn plain(state: ThreadState, header: &str) -> DerivedStatus {
    DerivedStatus {
        state,
        header: header.to_string(),
        details: String::new(),
    }
}

fn with_background(
    rt: &ThreadRuntime,
    state: ThreadState,
    header_override: Option<String>,
) -> DerivedStatus {
    if let Some(bg) = rt.background.as_ref().filter(|bg| !bg.label.is_empty()) {
        return DerivedStatus {
            state,
            header: bg.label.clone(),
            details: bg.details.clone(),
        };
    }
    DerivedStatus {
        state,
        header: header_override.unwrap_or_else(|| default_header(state).to_string()),
        details: String::new(),
    }
}

/// Feeds a reasoning delta into the header parser. When the collapsed
/// buffer contains a complete `**…**` pair, the inner text (truncated to
/// 80 chars) becomes the status header and the buffer resets.
pub(crate) fn capture_reasoning_header(rt: &mut ThreadRuntime, delta: &str) {
    if delta.is_empty() {
        return;
    }
    rt.reasoning_header_buf.push_str(delta);

    let collapsed = rt
        .reasoning_header_buf
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(start) = collapsed.find("**") {
        let after = start + 2;
        if let Some(len) = collapsed[after..].find("**") {
            let inner = collapsed[after..after + len].trim();
            if !inner.is_empty() {
                rt.status_header = inner.chars().take(HEADER_MAX_CHARS).collect();
            }
            rt.reasoning_header_buf.clear();
            return;
        }
    }

    if rt.reasoning_header_buf.len() > BUF_MAX_BYTES {
        let mut cut = rt.reasoning_header_buf.len() - BUF_MAX_BYTES / 2;
        while cut < rt.reasoning_header_buf.len()
            && !rt.reasoning_header_buf.is_char_boundary(cut)
        {
            cut += 1;
        }
        rt.reasoning_header_buf.drain(..cut);
    }
}
