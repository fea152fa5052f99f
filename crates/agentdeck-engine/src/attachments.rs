//! Attachment preview-path normalization.
//!
//! URLs and data URIs pass through untouched; bare filesystem paths are
//! wrapped as `file://` so the renderer can preview them uniformly.

use agentdeck_types::TimelineAttachment;

/// Normalizes a path for preview use.
pub fn normalize_preview_path(path: &str) -> String {
    if path.starts_with("http://")
        || path.starts_with("https://")
        || path.starts_with("data:image/")
        || path.starts_with("file://")
    {
        return path.to_string();
    }
    format!("file://{path}")
}

/// Display name for an attachment path: the last URL path segment, or
/// `image.<subtype>` for data URIs.
pub fn attachment_name(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("data:image/") {
        let subtype: String = rest.chars().take_while(|c| *c != ';' && *c != ',').collect();
        if subtype.is_empty() {
            return "image".to_string();
        }
        return format!("image.{subtype}");
    }
    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = without_query.trim_end_matches('/');
    trimmed
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(trimmed)
        .to_string()
}

/// Fills derived fields (name, preview URL) an attachment arrived without.
pub fn normalize_attachment(mut attachment: TimelineAttachment) -> TimelineAttachment {
    if attachment.preview_url.is_empty() {
        attachment.preview_url = normalize_preview_path(&attachment.path);
    }
    if attachment.name.is_empty() {
        attachment.name = attachment_name(&attachment.path);
    }
    attachment
}
