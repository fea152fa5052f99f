//! Workspace-run cache: a thin pass-through the front end polls.
//!
//! The engine does not interpret these; collaborators push the current
//! run list and merge results, and snapshots carry them verbatim.

use serde::{Deserialize, Serialize};

/// One workspace run (worktree/branch job) as reported by the workspace
/// integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRun {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_message: Option<String>,
}

/// Outcome of merging a workspace run back into the main branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMergeResult {
    pub run_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Cached workspace state carried inside the runtime snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceCache {
    pub runs: Vec<WorkspaceRun>,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

impl Default for WorkspaceCache {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            available: true,
            unavailable_reason: None,
        }
    }
}
