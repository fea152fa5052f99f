//! Event classification: `(rawType, method, payload)` → `UiType`.
//!
//! Two-level lookup. The raw event type (codex-style snake_case names) is
//! consulted first, then the JSON-RPC method (app-server path style).
//! Generic lifecycle envelopes (`item/started`, `item/updated`,
//! `item/completed`) carry the item type inside the payload and are
//! disambiguated by inspecting `payload.type`, `payload.item.type`, and
//! the same keys nested under `msg`/`data`/`payload` containers.
//! Anything unknown classifies as `UiType::System`.
//!
//! This function is pure: it never mutates the payload and has no side
//! effects.

use agentdeck_types::UiType;
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
enum ItemPhase {
    Started,
    Updated,
    Completed,
}

/// Classifies one raw wire event into the fixed UI taxonomy.
pub fn classify(raw_type: &str, method: &str, payload: &Value) -> UiType {
    if let Some(ui) = classify_raw_type(raw_type, payload) {
        return ui;
    }
    if let Some(ui) = classify_method(method, payload) {
        return ui;
    }
    UiType::System
}

fn classify_raw_type(raw_type: &str, payload: &Value) -> Option<UiType> {
    let ui = match raw_type {
        "task_started" | "turn_started" => UiType::TurnStarted,
        "task_complete" | "turn_complete" | "turn_completed" | "turn_aborted" => {
            UiType::TurnComplete
        }
        "agent_message_delta" => UiType::AssistantDelta,
        "agent_message" => UiType::AssistantDone,
        "agent_reasoning"
        | "agent_reasoning_delta"
        | "agent_reasoning_raw_content"
        | "agent_reasoning_raw_content_delta" => UiType::ReasoningDelta,
        "exec_command_begin" => UiType::CommandStart,
        "exec_command_output_delta" | "exec_output_delta" => UiType::CommandOutput,
        "exec_command_end" => UiType::CommandDone,
        "exec_approval_request" | "apply_patch_approval_request" | "elicitation_request" => {
            UiType::ApprovalRequest
        }
        "patch_apply_begin" => UiType::FileEditStart,
        "patch_apply_end" => UiType::FileEditDone,
        "mcp_tool_call_begin" | "mcp_tool_call_end" | "web_search_begin" | "web_search_end" => {
            UiType::ToolCall
        }
        "plan_update" | "update_plan" => UiType::PlanDelta,
        "turn_diff" => UiType::DiffUpdate,
        "user_message" => UiType::UserMessage,
        "error" | "stream_error" => UiType::Error,
        "item/started" | "codex/event/item_started" => {
            return item_envelope(payload, ItemPhase::Started);
        }
        "item/updated" | "codex/event/item_updated" => {
            return item_envelope(payload, ItemPhase::Updated);
        }
        "item/completed" | "codex/event/item_completed" => {
            return item_envelope(payload, ItemPhase::Completed);
        }
        // Lifecycle chatter without a timeline representation. Overlays
        // and accounting for these are handled by the lifecycle tracker.
        "token_count"
        | "context_compacted"
        | "background_event"
        | "mcp_startup_update"
        | "mcp_startup_complete"
        | "agent_reasoning_section_break"
        | "terminal_interaction"
        | "session_configured"
        | "shutdown_complete"
        | "conversation_history"
        | "get_history_entry_response"
        | "mcp_list_tools_response"
        | "list_custom_prompts_response"
        | "thread/status/changed" => UiType::System,
        _ if raw_type.starts_with("collab_") => UiType::System,
        _ => return None,
    };
    Some(ui)
}

fn classify_method(method: &str, payload: &Value) -> Option<UiType> {
    let ui = match method {
        "turn/started" => UiType::TurnStarted,
        "turn/completed" | "turn/failed" | "turn/aborted" => UiType::TurnComplete,
        "item/agentMessage/delta" => UiType::AssistantDelta,
        "item/agentMessage/completed" => UiType::AssistantDone,
        "item/reasoning/delta" | "item/reasoning/summaryDelta" => UiType::ReasoningDelta,
        "item/commandExecution/started" => UiType::CommandStart,
        "item/commandExecution/outputDelta" => UiType::CommandOutput,
        "item/commandExecution/completed" => UiType::CommandDone,
        "item/fileChange/started" => UiType::FileEditStart,
        "item/fileChange/completed" => UiType::FileEditDone,
        "item/mcpToolCall/started"
        | "item/mcpToolCall/completed"
        | "item/webSearch/started"
        | "item/webSearch/completed" => UiType::ToolCall,
        "item/todoList/updated" | "item/plan/updated" => UiType::PlanDelta,
        "turn/diff/updated" => UiType::DiffUpdate,
        "thread/userMessage" => UiType::UserMessage,
        "error" | "thread/error" => UiType::Error,
        "item/started" => return item_envelope(payload, ItemPhase::Started),
        "item/updated" => return item_envelope(payload, ItemPhase::Updated),
        "item/completed" => return item_envelope(payload, ItemPhase::Completed),
        "thread/tokenUsage/updated"
        | "thread/compacted"
        | "thread/status/changed"
        | "item/commandExecution/terminalInteraction"
        | "item/reasoning/sectionBreak" => UiType::System,
        _ => return None,
    };
    Some(ui)
}

/// Resolves a generic `item/*` envelope by the item type in the payload.
fn item_envelope(payload: &Value, phase: ItemPhase) -> Option<UiType> {
    let Some(item_type) = item_type(payload) else {
        return Some(UiType::System);
    };
    let ui = match (item_type.as_str(), phase) {
        ("commandExecution" | "command_execution", ItemPhase::Started) => UiType::CommandStart,
        ("commandExecution" | "command_execution", ItemPhase::Updated) => UiType::CommandOutput,
        ("commandExecution" | "command_execution", ItemPhase::Completed) => UiType::CommandDone,
        ("fileChange" | "file_change" | "patchApply", ItemPhase::Started) => UiType::FileEditStart,
        ("fileChange" | "file_change" | "patchApply", ItemPhase::Completed) => UiType::FileEditDone,
        ("agentMessage" | "agent_message", ItemPhase::Completed) => UiType::AssistantDone,
        ("agentMessage" | "agent_message", _) => UiType::AssistantDelta,
        ("reasoning", ItemPhase::Started | ItemPhase::Updated) => UiType::ReasoningDelta,
        ("mcpToolCall" | "mcp_tool_call" | "webSearch" | "web_search" | "collabToolCall", _) => {
            UiType::ToolCall
        }
        ("todoList" | "todo_list" | "plan", _) => UiType::PlanDelta,
        ("userMessage" | "user_message", _) => UiType::UserMessage,
        ("error", _) => UiType::Error,
        _ => UiType::System,
    };
    Some(ui)
}

fn item_type(payload: &Value) -> Option<String> {
    let containers = [
        Some(payload),
        payload.get("msg"),
        payload.get("data"),
        payload.get("payload"),
    ];
    for container in containers.into_iter().flatten() {
        if let Some(t) = container
            .get("item")
            .and_then(|i| i.get("type"))
            .and_then(Value::as_str)
        {
            return Some(t.to_string());
        }
        if let Some(t) = container.get("type").and_then(Value::as_str) {
            return Some(t.to_string());
        }
    }
    None
}
