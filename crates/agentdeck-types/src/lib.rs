//! Shared data model for the agentdeck runtime state engine.
//!
//! These types form the contract between the event transport, the state
//! engine, and the front end: the UI event taxonomy, timeline items, the
//! aggregate runtime snapshot, persisted history records, and the
//! workspace-run cache. Everything here is plain serializable data; all
//! behavior lives in `agentdeck-engine`.

pub mod event;
pub mod history;
pub mod snapshot;
pub mod timeline;
pub mod workspace;

pub use event::{NormalizedEvent, UiType};
pub use history::HistoryRecord;
pub use snapshot::{
    ActivityStats, AgentMeta, AlertEntry, AlertLevel, RuntimeSnapshot, ThreadSnapshot, ThreadState,
    TimelineStats, TokenUsageSnapshot,
};
pub use timeline::{AttachmentKind, ItemStatus, TimelineAttachment, TimelineItem, TimelineItemKind};
pub use workspace::{WorkspaceCache, WorkspaceMergeResult, WorkspaceRun};
