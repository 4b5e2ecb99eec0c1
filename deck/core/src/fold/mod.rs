//! Event Folding
//!
//! Collapses the flat event log into the entries a surface actually shows.
//! Folding runs as two independent passes over an immutable snapshot:
//!
//! ```text
//! events ──► commands::fold_commands ──► api_requests::fold_api_requests ──► Vec<FoldedEntry>
//! ```
//!
//! Each pass keeps its own scan state local to the call. Nothing here is
//! persisted; entries are rebuilt from scratch for every snapshot, so folding
//! the same snapshot twice always yields the same result.

pub mod api_requests;
pub mod commands;

use serde::Serialize;

use crate::events::{AgentEvent, SequenceId};

pub use api_requests::{fold_api_requests, ApiUsage};
pub use commands::fold_commands;

/// A shell command and everything it printed
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommandEntry {
    /// Sequence id of the `run_command` request that opened the run
    pub started_at: SequenceId,
    /// The command line
    pub command: String,
    /// Output chunks concatenated verbatim
    pub accumulated_output: String,
    /// False once the agent signalled it is waiting for the command to exit
    pub still_running: bool,
}

/// One API round-trip: the request summary and, once known, its usage
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiCallEntry {
    /// Sequence id of the `request_started` notice
    pub started_at: SequenceId,
    /// Decoded request summary (empty object when undecodable)
    pub request: serde_json::Value,
    /// Usage reported by the terminal notice
    pub usage: ApiUsage,
    /// At least one retry was observed
    pub retried: bool,
    /// A `request_finished` notice closed this call
    pub finished: bool,
}

impl ApiCallEntry {
    /// No terminal `request_finished` seen yet
    #[must_use]
    pub fn in_flight(&self) -> bool {
        !self.finished
    }
}

/// Result of folding: a merged run or an untouched event
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum FoldedEntry {
    /// `run_command` plus its output
    Command(CommandEntry),
    /// `request_started` plus its terminal notice
    ApiCall(ApiCallEntry),
    /// Any event that was not folded
    Passthrough(AgentEvent),
}

impl FoldedEntry {
    /// Sequence id of the first source event
    #[must_use]
    pub fn sequence_id(&self) -> SequenceId {
        match self {
            Self::Command(entry) => entry.started_at,
            Self::ApiCall(entry) => entry.started_at,
            Self::Passthrough(event) => event.sequence_id,
        }
    }

    /// The wrapped event, for pass-through entries
    #[must_use]
    pub fn as_event(&self) -> Option<&AgentEvent> {
        match self {
            Self::Passthrough(event) => Some(event),
            _ => None,
        }
    }
}

/// Run both folding passes over a slice of events
///
/// The slice is folded as given. Callers holding a full log usually split the
/// task event off first (see [`crate::view::ConversationView::derive`]).
#[must_use]
pub fn fold_events(events: &[AgentEvent]) -> Vec<FoldedEntry> {
    let folded = fold_api_requests(fold_commands(events));
    tracing::debug!(
        events = events.len(),
        entries = folded.len(),
        "folded event snapshot"
    );
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NoticeKind, RequestKind};
    use pretty_assertions::assert_eq;

    fn mixed_log() -> Vec<AgentEvent> {
        vec![
            AgentEvent::notice(2, NoticeKind::Text, "looking around"),
            AgentEvent::notice(3, NoticeKind::RequestStarted, r#"{"model":"m"}"#),
            AgentEvent::request(4, RequestKind::RunCommand, "ls"),
            AgentEvent::notice(5, NoticeKind::CommandOutput, "a\n"),
            AgentEvent::notice(6, NoticeKind::CommandOutput, "b\n"),
            AgentEvent::notice(7, NoticeKind::RequestFinished, r#"{"tokensIn":5}"#),
            AgentEvent::request(8, RequestKind::FollowUp, "done?"),
        ]
    }

    #[test]
    fn test_fold_is_idempotent() {
        let events = mixed_log();
        assert_eq!(fold_events(&events), fold_events(&events));
    }

    #[test]
    fn test_fold_preserves_order() {
        let folded = fold_events(&mixed_log());
        let ids: Vec<u64> = folded.iter().map(|e| e.sequence_id().0).collect();
        assert_eq!(ids, vec![2, 3, 4, 8]);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_passes_compose() {
        let folded = fold_events(&mixed_log());
        match (&folded[1], &folded[2]) {
            (FoldedEntry::ApiCall(call), FoldedEntry::Command(cmd)) => {
                assert!(call.finished);
                assert_eq!(call.usage.tokens_in, Some(5));
                assert_eq!(cmd.accumulated_output, "a\nb\n");
            }
            other => panic!("unexpected entries: {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(fold_events(&[]).is_empty());
    }
}
