//! UI event taxonomy and the normalized wire event.
//!
//! The transport decodes raw envelopes (`rawType`, `method`, JSON bytes)
//! and hands the engine a `NormalizedEvent`: the classified `UiType` plus
//! whatever fields were actually present in the payload. Normalization
//! never invents defaults; absent fields stay absent.

use serde::{Deserialize, Serialize};

/// Fixed UI event taxonomy the classifier maps raw wire events onto.
///
/// Roughly seventy wire event types collapse into these seventeen. Events
/// that carry no timeline content (token accounting, overlay lifecycle,
/// acknowledgements) classify as `System`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiType {
    /// Incremental assistant text chunk.
    AssistantDelta,
    /// Assistant message finished (full text may accompany it).
    AssistantDone,
    /// Incremental reasoning (extended thinking) chunk.
    ReasoningDelta,
    /// A shell command started executing.
    CommandStart,
    /// Output chunk from a running command.
    CommandOutput,
    /// A shell command finished.
    CommandDone,
    /// A file edit (patch application) started.
    FileEditStart,
    /// A file edit finished.
    FileEditDone,
    /// A tool invocation (MCP, web search, ...) started or finished.
    ToolCall,
    /// The agent is waiting for the user to approve an action.
    ApprovalRequest,
    /// Plan/todo-list update, either a full snapshot or a streaming delta.
    PlanDelta,
    /// A conversational turn began.
    TurnStarted,
    /// A conversational turn finished (completed, failed, or aborted).
    TurnComplete,
    /// Unified diff for the turn changed.
    DiffUpdate,
    /// A user message echoed through the event stream.
    UserMessage,
    /// An error surfaced by the backend.
    Error,
    /// Everything else: lifecycle chatter with no timeline representation.
    System,
}

impl UiType {
    /// Stable string form, matching the serde rename.
    pub fn as_str(self) -> &'static str {
        match self {
            UiType::AssistantDelta => "assistant_delta",
            UiType::AssistantDone => "assistant_done",
            UiType::ReasoningDelta => "reasoning_delta",
            UiType::CommandStart => "command_start",
            UiType::CommandOutput => "command_output",
            UiType::CommandDone => "command_done",
            UiType::FileEditStart => "file_edit_start",
            UiType::FileEditDone => "file_edit_done",
            UiType::ToolCall => "tool_call",
            UiType::ApprovalRequest => "approval_request",
            UiType::PlanDelta => "plan_delta",
            UiType::TurnStarted => "turn_started",
            UiType::TurnComplete => "turn_complete",
            UiType::DiffUpdate => "diff_update",
            UiType::UserMessage => "user_message",
            UiType::Error => "error",
            UiType::System => "system",
        }
    }
}

/// Projection of a raw wire event onto the fields the engine consumes.
///
/// Every field except `ui_type`, `raw_type` and `method` is optional:
/// it is set only when the payload actually carried it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub ui_type: UiType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    pub raw_type: String,
    pub method: String,
}

impl NormalizedEvent {
    /// An empty event of the given type, for callers that synthesize
    /// events outside the transport path (hydration, tests).
    pub fn empty(ui_type: UiType, raw_type: impl Into<String>) -> Self {
        Self {
            ui_type,
            text: None,
            command: None,
            file: None,
            files: Vec::new(),
            exit_code: None,
            raw_type: raw_type.into(),
            method: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_type_serde_matches_as_str() {
        for ui in [
            UiType::AssistantDelta,
            UiType::ReasoningDelta,
            UiType::CommandDone,
            UiType::TurnComplete,
            UiType::System,
        ] {
            let json = serde_json::to_string(&ui).unwrap();
            assert_eq!(json, format!("\"{}\"", ui.as_str()));
        }
    }

    #[test]
    fn test_normalized_event_omits_absent_fields() {
        let ev = NormalizedEvent::empty(UiType::System, "session_configured");
        let json = serde_json::to_string(&ev).unwrap();
        assert!(!json.contains("text"));
        assert!(!json.contains("exitCode"));
        assert!(json.contains("\"rawType\":\"session_configured\""));
    }
}
