//! End-to-end scenarios over the public engine API: event streams in,
//! snapshots out. Each test builds a fresh engine.

use agentdeck_engine::{Engine, normalize};
use agentdeck_types::{
    HistoryRecord, ItemStatus, ThreadState, TimelineItem, TimelineItemKind,
};
use serde_json::{Value, json};

const T: &str = "thread-1";

fn apply(engine: &Engine, thread: &str, raw_type: &str, method: &str, payload: Value) {
    let bytes = payload.to_string();
    let normalized = normalize(raw_type, method, bytes.as_bytes());
    engine.apply_agent_event(thread, &normalized, &payload);
}

/// Timeline projection that ignores generated ids and timestamps.
fn shape(items: &[TimelineItem]) -> Vec<(TimelineItemKind, Option<String>, Option<ItemStatus>)> {
    items
        .iter()
        .map(|item| (item.kind, item.text.clone(), item.status))
        .collect()
}

#[test]
fn test_s1_assistant_streaming_and_done() {
    let engine = Engine::new();
    apply(&engine, T, "turn_started", "", json!({}));
    apply(&engine, T, "agent_message_delta", "", json!({"delta": "Hel"}));
    apply(&engine, T, "agent_message_delta", "", json!({"delta": "lo"}));
    apply(&engine, T, "agent_message", "", json!({}));
    apply(&engine, T, "turn_complete", "", json!({}));

    let timeline = engine.thread_timeline(T);
    assert_eq!(timeline.len(), 1, "empty thinking placeholder is elided");
    assert_eq!(timeline[0].kind, TimelineItemKind::Assistant);
    assert_eq!(timeline[0].text.as_deref(), Some("Hello"));

    let snap = engine.snapshot();
    assert_eq!(snap.statuses[T], ThreadState::Idle);
    assert_eq!(snap.status_headers_by_thread[T], "等待指示");
}

#[test]
fn test_s2_command_with_exit_one() {
    let engine = Engine::new();
    apply(&engine, T, "exec_command_begin", "", json!({"command": "ls x"}));
    {
        let timeline = engine.thread_timeline(T);
        assert_eq!(timeline[0].kind, TimelineItemKind::Command);
        assert_eq!(timeline[0].command.as_deref(), Some("ls x"));
        assert_eq!(timeline[0].status, Some(ItemStatus::Running));
        assert_eq!(engine.snapshot().statuses[T], ThreadState::Running);
    }

    apply(&engine, T, "exec_output_delta", "", json!({"delta": "nope\n"}));
    assert_eq!(
        engine.thread_timeline(T)[0].output.as_deref(),
        Some("nope\n")
    );

    apply(&engine, T, "exec_command_end", "", json!({"exit_code": 1}));
    let timeline = engine.thread_timeline(T);
    assert_eq!(timeline[0].status, Some(ItemStatus::Failed));
    assert_eq!(timeline[0].exit_code, Some(1));
    assert_eq!(engine.snapshot().statuses[T], ThreadState::Idle);
}

#[test]
fn test_s3_token_accountant_rejects_outlier() {
    let engine = Engine::new();
    apply(
        &engine,
        T,
        "token_count",
        "",
        json!({"tokenUsage": {"total": {"totalTokens": 119_000}, "modelContextWindow": 258_000}}),
    );
    {
        let snap = engine.snapshot();
        let usage = &snap.token_usage_by_thread[T];
        assert_eq!(usage.used_tokens, 119_000);
        assert_eq!(usage.context_window_tokens, 258_000);
        assert!((usage.used_percent - 46.12).abs() < 0.01);
    }

    apply(
        &engine,
        T,
        "token_count",
        "",
        json!({"info": {
            "total_token_usage": {"total_tokens": 40_900_000i64},
            "model_context_window": 258_000,
        }}),
    );
    let snap = engine.snapshot();
    let usage = &snap.token_usage_by_thread[T];
    assert_eq!(usage.used_tokens, 119_000, "outlier rejected, previous retained");
    assert_eq!(usage.context_window_tokens, 258_000);
    assert!(usage.used_tokens <= usage.context_window_tokens);
    assert!((usage.used_percent + usage.left_percent - 100.0).abs() < 1e-9);
}

#[test]
fn test_s4_hydrate_skips_while_streaming() {
    let engine = Engine::new();
    let records = vec![
        HistoryRecord {
            id: 1,
            role: "user".to_string(),
            kind: "user_message".to_string(),
            method: String::new(),
            content: "hi".to_string(),
            payload: Value::Null,
            metadata: Value::Null,
        },
        HistoryRecord {
            id: 2,
            role: "assistant".to_string(),
            kind: "agent_message".to_string(),
            method: String::new(),
            content: "hello there".to_string(),
            payload: Value::Null,
            metadata: Value::Null,
        },
    ];

    apply(&engine, T, "turn_started", "", json!({}));
    apply(&engine, T, "agent_message_delta", "", json!({"delta": "Hel"}));

    let before = engine.thread_timeline(T);
    assert!(!engine.hydrate_history(T, &records));
    assert_eq!(engine.thread_timeline(T), before, "timeline unchanged");

    apply(&engine, T, "agent_message", "", json!({}));
    apply(&engine, T, "turn_complete", "", json!({}));

    assert!(engine.hydrate_history(T, &records));
    let timeline = engine.thread_timeline(T);
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].kind, TimelineItemKind::User);
    assert_eq!(timeline[0].text.as_deref(), Some("hi"));
    assert_eq!(timeline[1].kind, TimelineItemKind::Assistant);
    assert_eq!(timeline[1].text.as_deref(), Some("hello there"));
}

#[test]
fn test_s5_plan_snapshot_replaces() {
    let engine = Engine::new();
    apply(
        &engine,
        T,
        "plan_update",
        "",
        json!({"plan": [
            {"step": "A", "status": "in_progress"},
            {"step": "B", "status": "pending"},
        ]}),
    );
    apply(
        &engine,
        T,
        "plan_update",
        "",
        json!({"plan": [
            {"step": "A", "status": "completed"},
            {"step": "B", "status": "completed"},
        ]}),
    );

    let timeline = engine.thread_timeline(T);
    let plans: Vec<_> = timeline
        .iter()
        .filter(|item| item.kind == TimelineItemKind::Plan)
        .collect();
    assert_eq!(plans.len(), 1);
    assert_eq!(
        plans[0].text.as_deref(),
        Some("✓ 已完成 2/2 项任务\n1. ☑ A\n2. ☑ B")
    );
    assert_eq!(plans[0].done, Some(true));
}

#[test]
fn test_s6_terminal_wait_overlay_precedence() {
    let engine = Engine::new();
    apply(
        &engine,
        T,
        "",
        "item/commandExecution/terminalInteraction",
        json!({"stdin": "", "command": "tail -f app.log"}),
    );
    let snap = engine.snapshot();
    assert_eq!(snap.statuses[T], ThreadState::Waiting);
    assert!(snap.status_headers_by_thread[T].contains("等待后台终端"));
    assert!(snap.status_headers_by_thread[T].contains("tail -f app.log"));
    assert_eq!(snap.status_details_by_thread[T], "命令正在等待终端输入");

    apply(
        &engine,
        T,
        "exec_command_output_delta",
        "",
        json!({"delta": "line\n"}),
    );
    let snap = engine.snapshot();
    assert!(!snap.status_headers_by_thread[T].contains("等待后台终端"));
}

#[test]
fn test_turn_depths_reset_and_forced_command_completion() {
    let engine = Engine::new();
    apply(&engine, T, "turn_started", "", json!({}));
    apply(&engine, T, "exec_command_begin", "", json!({"command": "sleep 100"}));
    apply(&engine, T, "patch_apply_begin", "", json!({"file": "a.rs"}));
    assert_eq!(engine.snapshot().statuses[T], ThreadState::Editing);

    apply(&engine, T, "turn_complete", "", json!({}));
    let snap = engine.snapshot();
    assert_eq!(snap.statuses[T], ThreadState::Idle);

    let timeline = engine.thread_timeline(T);
    let command = timeline
        .iter()
        .find(|item| item.kind == TimelineItemKind::Command)
        .unwrap();
    // Forced close at the turn boundary is completed/exit 0, not failed.
    assert_eq!(command.status, Some(ItemStatus::Completed));
    assert_eq!(command.exit_code, Some(0));

    let file = timeline
        .iter()
        .find(|item| item.kind == TimelineItemKind::File)
        .unwrap();
    assert_eq!(file.status, Some(ItemStatus::Saved));
}

#[test]
fn test_interruptible_follows_status() {
    let engine = Engine::new();
    apply(&engine, "a", "turn_started", "", json!({}));
    apply(&engine, "b", "exec_command_begin", "", json!({"command": "ls"}));
    apply(&engine, "c", "session_configured", "", json!({}));
    apply(&engine, "d", "error", "", json!({"message": "boom"}));

    let snap = engine.snapshot();
    for (id, state) in &snap.statuses {
        let expected = !matches!(state, ThreadState::Idle | ThreadState::Error);
        assert_eq!(snap.interruptible_by_thread[id], expected, "thread {id}");
    }
    assert!(snap.interruptible_by_thread["a"]);
    assert!(snap.interruptible_by_thread["b"]);
    assert!(!snap.interruptible_by_thread["c"]);
    assert!(!snap.interruptible_by_thread["d"]);
}

#[test]
fn test_snapshot_is_pure_and_detached() {
    let engine = Engine::new();
    apply(&engine, T, "agent_message_delta", "", json!({"delta": "hi"}));

    let first = engine.snapshot();
    let second = engine.snapshot();
    assert_eq!(first, second);

    // Mutating the returned copy does not affect the engine.
    let mut mutated = engine.snapshot();
    mutated.statuses.insert(T.to_string(), ThreadState::Error);
    mutated
        .timelines_by_thread
        .get_mut(T)
        .unwrap()
        .clear();
    let third = engine.snapshot();
    assert_eq!(first, third);
}

#[test]
fn test_hydrate_is_idempotent_when_not_streaming() {
    let engine = Engine::new();
    let records = vec![
        HistoryRecord {
            id: 3,
            role: "assistant".to_string(),
            kind: "agent_message".to_string(),
            method: String::new(),
            content: "done".to_string(),
            payload: Value::Null,
            metadata: Value::Null,
        },
        HistoryRecord {
            id: 1,
            role: "user".to_string(),
            kind: "user_message".to_string(),
            method: String::new(),
            content: "go".to_string(),
            payload: Value::Null,
            metadata: Value::Null,
        },
        HistoryRecord {
            id: 2,
            role: "system".to_string(),
            kind: "exec_command_begin".to_string(),
            method: String::new(),
            content: String::new(),
            payload: json!({"command": "make"}),
            metadata: Value::Null,
        },
    ];

    assert!(engine.hydrate_history(T, &records));
    let once = shape(&engine.thread_timeline(T));
    assert!(engine.hydrate_history(T, &records));
    let twice = shape(&engine.thread_timeline(T));
    assert_eq!(once, twice);

    // Records replay in ascending id order regardless of input order.
    let timeline = engine.thread_timeline(T);
    assert_eq!(timeline[0].kind, TimelineItemKind::User);
    assert_eq!(timeline[1].kind, TimelineItemKind::Command);
    assert_eq!(timeline[2].kind, TimelineItemKind::Assistant);
}

#[test]
fn test_hydrate_drops_injected_skill_blocks() {
    let engine = Engine::new();
    let records = vec![
        HistoryRecord {
            id: 1,
            role: "user".to_string(),
            kind: "user_message".to_string(),
            method: String::new(),
            content: "[skill:review] 摘要: 审查代码\n可选段落: 无\n使用方式: /review".to_string(),
            payload: Value::Null,
            metadata: Value::Null,
        },
        HistoryRecord {
            id: 2,
            role: "user".to_string(),
            kind: "user_message".to_string(),
            method: String::new(),
            content: "请看一下 [skill:review] 的输出".to_string(),
            payload: Value::Null,
            metadata: Value::Null,
        },
    ];
    assert!(engine.hydrate_history(T, &records));
    let timeline = engine.thread_timeline(T);
    assert_eq!(timeline.len(), 1);
    assert_eq!(
        timeline[0].text.as_deref(),
        Some("请看一下 [skill:review] 的输出")
    );
}

#[test]
fn test_hydrate_clears_transient_overlays() {
    let engine = Engine::new();
    let records = vec![HistoryRecord {
        id: 1,
        role: "system".to_string(),
        kind: "mcp_startup_update".to_string(),
        method: String::new(),
        content: String::new(),
        payload: json!({"server": "fs"}),
        metadata: Value::Null,
    }];
    assert!(engine.hydrate_history(T, &records));
    // The replayed startup event must not leave the thread syncing.
    assert_eq!(engine.snapshot().statuses[T], ThreadState::Idle);
}

#[test]
fn test_append_history_does_not_reset() {
    let engine = Engine::new();
    apply(&engine, T, "user_message", "", json!({"message": "first"}));
    engine.append_history(
        T,
        &[HistoryRecord {
            id: 9,
            role: "assistant".to_string(),
            kind: "agent_message".to_string(),
            method: String::new(),
            content: "second".to_string(),
            payload: Value::Null,
            metadata: Value::Null,
        }],
    );
    let timeline = engine.thread_timeline(T);
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].text.as_deref(), Some("first"));
    assert_eq!(timeline[1].text.as_deref(), Some("second"));
}

#[test]
fn test_approval_request_waits_for_confirmation() {
    let engine = Engine::new();
    apply(&engine, T, "turn_started", "", json!({}));
    apply(
        &engine,
        T,
        "exec_approval_request",
        "",
        json!({"message": "run rm -rf target?"}),
    );
    let snap = engine.snapshot();
    assert_eq!(snap.statuses[T], ThreadState::Waiting);
    assert_eq!(snap.status_headers_by_thread[T], "等待确认");

    let timeline = engine.thread_timeline(T);
    let approval = timeline
        .iter()
        .find(|item| item.kind == TimelineItemKind::Approval)
        .unwrap();
    assert_eq!(approval.status, Some(ItemStatus::Pending));

    apply(&engine, T, "turn_complete", "", json!({}));
    assert_eq!(engine.snapshot().statuses[T], ThreadState::Idle);
}

#[test]
fn test_reasoning_header_shows_while_thinking() {
    let engine = Engine::new();
    apply(&engine, T, "turn_started", "", json!({}));
    apply(
        &engine,
        T,
        "agent_reasoning_delta",
        "",
        json!({"delta": "**Scanning the repo** for entry points"}),
    );
    let snap = engine.snapshot();
    assert_eq!(snap.statuses[T], ThreadState::Thinking);
    assert_eq!(snap.status_headers_by_thread[T], "Scanning the repo");

    let timeline = engine.thread_timeline(T);
    assert_eq!(timeline[0].kind, TimelineItemKind::Thinking);
    assert_eq!(
        timeline[0].text.as_deref(),
        Some("**Scanning the repo** for entry points")
    );
}

#[test]
fn test_mcp_tool_call_lifecycle() {
    let engine = Engine::new();
    apply(&engine, T, "turn_started", "", json!({}));
    apply(
        &engine,
        T,
        "mcp_tool_call_begin",
        "",
        json!({"invocation": {"server": "fs", "tool": "read_file"}}),
    );
    assert_eq!(engine.snapshot().statuses[T], ThreadState::Running);

    apply(
        &engine,
        T,
        "mcp_tool_call_end",
        "",
        json!({"invocation": {"tool": "read_file"}, "elapsed_ms": 42, "success": true}),
    );
    assert_eq!(engine.snapshot().statuses[T], ThreadState::Thinking);

    let timeline = engine.thread_timeline(T);
    let tools: Vec<_> = timeline
        .iter()
        .filter(|item| item.kind == TimelineItemKind::Tool)
        .collect();
    assert_eq!(tools.len(), 1, "end patches the begin item");
    assert_eq!(tools[0].tool.as_deref(), Some("read_file"));
    assert_eq!(tools[0].elapsed_ms, Some(42));
    assert_eq!(tools[0].status, Some(ItemStatus::Completed));

    let snap = engine.snapshot();
    assert_eq!(snap.activity_stats_by_thread[T].tool_calls["read_file"], 1);
}
