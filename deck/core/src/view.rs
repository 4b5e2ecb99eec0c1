//! Conversation View
//!
//! Everything derived from one snapshot of the log in a single pass: the task
//! header, the folded rows, the visible projection and the running metrics.
//! The four are always computed together so they never disagree.

use serde::Serialize;

use crate::events::{AgentEvent, SequenceId};
use crate::fold::{fold_events, FoldedEntry};
use crate::metrics::ApiMetrics;
use crate::visibility::is_visible;

/// Derived, read-only view of a snapshot
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConversationView {
    /// The first event: the task as the user stated it
    pub task: Option<AgentEvent>,
    /// Folded rows after the task event
    pub entries: Vec<FoldedEntry>,
    /// Indices into `entries` that should be shown
    pub visible: Vec<usize>,
    /// Totals over every API call
    pub metrics: ApiMetrics,
}

impl ConversationView {
    /// Derive the view from a full snapshot
    #[must_use]
    pub fn derive(events: &[AgentEvent]) -> Self {
        let Some((task, rest)) = events.split_first() else {
            return Self::default();
        };
        let entries = fold_events(rest);
        let visible = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| is_visible(entry))
            .map(|(index, _)| index)
            .collect();
        let metrics = ApiMetrics::aggregate(&entries);
        Self {
            task: Some(task.clone()),
            entries,
            visible,
            metrics,
        }
    }

    /// Visible rows in order
    pub fn visible_entries(&self) -> impl Iterator<Item = &FoldedEntry> + '_ {
        self.visible.iter().filter_map(|&index| self.entries.get(index))
    }

    /// Sequence ids of visible rows, used to detect list changes
    #[must_use]
    pub fn visible_ids(&self) -> Vec<SequenceId> {
        self.visible_entries().map(FoldedEntry::sequence_id).collect()
    }
}
