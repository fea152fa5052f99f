//! History hydration: rebuilding a thread's timeline by replaying stored
//! records through the live ingestion pipeline.
//!
//! Replay never runs while a stream is mid-flight; an open assistant or
//! thinking item with text means live deltas would be clobbered, so the
//! rebuild is refused and the caller retries later. Transient overlays
//! (MCP startup, terminal wait, background) are live signals; replayed
//! system events would falsely reactivate them, so they are force-cleared
//! after the rebuild.

use agentdeck_types::{AttachmentKind, HistoryRecord, TimelineAttachment, UiType};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::attachments::{attachment_name, normalize_preview_path};
use crate::engine::{Engine, EngineInner};
use crate::normalize::normalize_value;

impl Engine {
    /// Rebuilds the thread's timeline from stored records. Returns
    /// `false` (leaving everything untouched) when the thread is
    /// actively streaming; an empty thinking placeholder from a
    /// just-received turn start does not count as streaming.
    pub fn hydrate_history(&self, thread_id: &str, records: &[HistoryRecord]) -> bool {
        let now = Utc::now();
        let mut inner = self.write();
        if inner.is_streaming(thread_id) {
            debug!(thread = thread_id, "hydration skipped: stream in progress");
            return false;
        }
        debug!(thread = thread_id, records = records.len(), "hydrating history");
        inner.reset_thread(thread_id, now);
        let mut ordered: Vec<&HistoryRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.id);
        for record in ordered {
            inner.replay_record(thread_id, record, now);
        }
        inner.clear_transient_overlays(thread_id);
        inner.refresh_status(thread_id);
        true
    }

    /// Incremental variant: same per-record path, but no streaming
    /// guard, no reset, and no overlay clearing.
    pub fn append_history(&self, thread_id: &str, records: &[HistoryRecord]) {
        let now = Utc::now();
        let mut inner = self.write();
        let mut ordered: Vec<&HistoryRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.id);
        for record in ordered {
            inner.replay_record(thread_id, record, now);
        }
    }
}

impl EngineInner {
    /// A thread is streaming when an open assistant or thinking item
    /// holds non-empty text.
    pub(crate) fn is_streaming(&self, thread_id: &str) -> bool {
        let Some(rt) = self.runtime.get(thread_id) else {
            return false;
        };
        let timeline = self.snapshot.timelines_by_thread.get(thread_id);
        let open_has_text = |index: Option<usize>| {
            index
                .and_then(|i| timeline.and_then(|items| items.get(i)))
                .and_then(|item| item.text.as_deref())
                .is_some_and(|text| !text.trim().is_empty())
        };
        open_has_text(rt.assistant_index) || open_has_text(rt.thinking_index)
    }

    pub(crate) fn clear_transient_overlays(&mut self, thread_id: &str) {
        if let Some(rt) = self.runtime.get_mut(thread_id) {
            rt.mcp_startup = None;
            rt.terminal_wait = None;
            rt.background = None;
        }
    }

    pub(crate) fn replay_record(
        &mut self,
        thread_id: &str,
        record: &HistoryRecord,
        now: DateTime<Utc>,
    ) {
        if record.role == "user" {
            if is_injected_skill_block(&record.content) {
                return;
            }
            let attachments = attachments_from_metadata(&record.metadata);
            self.append_user_item(thread_id, &record.content, attachments, now);
            return;
        }

        // Seed the stored display text into whichever extraction keys the
        // payload left unset, then run the normal pipeline.
        let mut payload = match &record.payload {
            Value::Object(map) => Value::Object(map.clone()),
            _ => Value::Object(serde_json::Map::new()),
        };
        if !record.content.is_empty() {
            if let Value::Object(map) = &mut payload {
                for key in ["delta", "text", "content", "output"] {
                    if map.get(key).is_none_or(Value::is_null) {
                        map.insert(key.to_string(), Value::String(record.content.clone()));
                    }
                }
            }
        }

        let mut normalized = normalize_value(&record.kind, &record.method, &payload);
        // Old stores persisted finished assistant messages under system
        // shapes; promote them so the text still lands in the timeline.
        if record.role == "assistant"
            && normalized.ui_type == UiType::System
            && !record.content.trim().is_empty()
        {
            normalized.ui_type = UiType::AssistantDone;
            if normalized.text.is_none() {
                normalized.text = Some(record.content.clone());
            }
        }
        self.apply_event(thread_id, &normalized, &payload, now);
    }
}

/// User attachments from record metadata: `input[]` items typed `image`,
/// `localImage`, `mention`, or `filecontent`.
fn attachments_from_metadata(metadata: &Value) -> Vec<TimelineAttachment> {
    let Some(items) = metadata.get("input").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut attachments = Vec::new();
    for item in items {
        let item_type = item.get("type").and_then(Value::as_str).unwrap_or("");
        let kind = match item_type {
            "image" | "localImage" | "local_image" => AttachmentKind::Image,
            "mention" | "filecontent" | "fileContent" => AttachmentKind::File,
            _ => continue,
        };
        let Some(path) = ["path", "url", "src"]
            .iter()
            .find_map(|key| item.get(*key).and_then(Value::as_str).filter(|s| !s.is_empty()))
        else {
            continue;
        };
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map_or_else(|| attachment_name(path), str::to_string);
        attachments.push(TimelineAttachment {
            kind,
            name,
            path: path.to_string(),
            preview_url: normalize_preview_path(path),
        });
    }
    attachments
}

/// True when the whole message is an injected skill block: a first line
/// of the form `[skill:…] 摘要: …` plus the `可选段落:` and `使用方式:`
/// sections. Manually written messages that merely mention a skill tag
/// stay.
pub(crate) fn is_injected_skill_block(text: &str) -> bool {
    let trimmed = text.trim();
    let Some(first_line) = trimmed.lines().next() else {
        return false;
    };
    first_line.starts_with("[skill:")
        && first_line.contains("摘要:")
        && trimmed
            .lines()
            .any(|line| line.trim_start().starts_with("可选段落:"))
        && trimmed
            .lines()
            .any(|line| line.trim_start().starts_with("使用方式:"))
}
