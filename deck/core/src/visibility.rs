//! Visibility filter
//!
//! Decides which folded entries reach the screen. Rules are checked in order
//! and the first match drops the entry:
//!
//! 1. `task_complete` request with empty text
//! 2. `request_failed`, `resume_task`, `resume_completed_task` requests
//! 3. `request_finished` / `request_retried` notices left over after folding
//! 4. `text` notice with empty text and no attachments

use crate::events::{EventKind, NoticeKind, RequestKind};
use crate::fold::FoldedEntry;

/// Whether an entry should be displayed
#[must_use]
pub fn is_visible(entry: &FoldedEntry) -> bool {
    let FoldedEntry::Passthrough(event) = entry else {
        return true;
    };
    match &event.kind {
        EventKind::Request(RequestKind::TaskComplete) => !event.text().is_empty(),
        EventKind::Request(
            RequestKind::RequestFailed | RequestKind::ResumeTask | RequestKind::ResumeCompletedTask,
        ) => false,
        EventKind::Notice(NoticeKind::RequestFinished | NoticeKind::RequestRetried) => false,
        EventKind::Notice(NoticeKind::Text) => {
            !event.text().is_empty() || !event.attachments.is_empty()
        }
        _ => true,
    }
}

/// Visible projection of a folded sequence, in order
#[must_use]
pub fn visible_entries(entries: &[FoldedEntry]) -> Vec<&FoldedEntry> {
    entries.iter().filter(|entry| is_visible(entry)).collect()
}
