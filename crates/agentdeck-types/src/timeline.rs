//! Timeline items: the replayable per-thread transcript.
//!
//! A timeline is append-only from the outside; the engine may patch the
//! currently open (streaming) item in place. Items are tagged records: a
//! `kind` discriminator plus optional per-kind fields, so the JSON
//! projection simply omits whatever a kind does not use.

use serde::{Deserialize, Serialize};

/// Discriminator for timeline items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineItemKind {
    User,
    Assistant,
    Thinking,
    Command,
    File,
    Tool,
    Approval,
    Plan,
    Error,
}

impl TimelineItemKind {
    /// Stable string form, used as the id prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineItemKind::User => "user",
            TimelineItemKind::Assistant => "assistant",
            TimelineItemKind::Thinking => "thinking",
            TimelineItemKind::Command => "command",
            TimelineItemKind::File => "file",
            TimelineItemKind::Tool => "tool",
            TimelineItemKind::Approval => "approval",
            TimelineItemKind::Plan => "plan",
            TimelineItemKind::Error => "error",
        }
    }
}

/// Lifecycle status carried by command, file, tool and approval items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Running,
    Completed,
    Failed,
    Editing,
    Saved,
    Pending,
}

/// Attachment kind for user-message attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

/// An attachment riding on a user timeline item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineAttachment {
    pub kind: AttachmentKind,
    pub name: String,
    pub path: String,
    pub preview_url: String,
}

/// One entry in a thread's timeline.
///
/// `id` is monotonic (`"<kind>-<unixMillis>-<seq>"`), `ts` is RFC3339 UTC.
/// Which optional fields are populated depends on `kind`:
/// `text` (user/assistant/thinking/approval/plan/error), `command` +
/// `output` + `exit_code` + `status` (command), `file` + `status` (file),
/// `tool` + `preview` + `elapsed_ms` + `status` (tool), `done`
/// (thinking/plan), `attachments` (user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    pub kind: TimelineItemKind,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<TimelineAttachment>,
}

impl TimelineItem {
    /// A bare item of the given kind with all optional fields unset.
    pub fn new(kind: TimelineItemKind, id: String, ts: String) -> Self {
        Self {
            id,
            kind,
            ts,
            text: None,
            command: None,
            output: None,
            exit_code: None,
            status: None,
            file: None,
            tool: None,
            preview: None,
            elapsed_ms: None,
            done: None,
            attachments: Vec::new(),
        }
    }
}
