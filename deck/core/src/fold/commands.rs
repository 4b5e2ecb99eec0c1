//! Command-sequence folding
//!
//! A `run_command` request followed by any number of `command_output` notices
//! becomes a single [`CommandEntry`]. A `command_output` *request* in the middle
//! of a run marks the command as waiting for exit; later output still lands in
//! the same entry.

use super::{CommandEntry, FoldedEntry};
use crate::events::{AgentEvent, EventKind, NoticeKind, RequestKind};

/// First folding pass: merge command runs
#[must_use]
pub fn fold_commands(events: &[AgentEvent]) -> Vec<FoldedEntry> {
    let mut out = Vec::with_capacity(events.len());
    // Index in `out` of the run still accepting output
    let mut open: Option<usize> = None;

    for event in events {
        match &event.kind {
            EventKind::Request(RequestKind::RunCommand) => {
                out.push(FoldedEntry::Command(CommandEntry {
                    started_at: event.sequence_id,
                    command: event.text().to_string(),
                    accumulated_output: String::new(),
                    still_running: true,
                }));
                open = Some(out.len() - 1);
            }
            EventKind::Notice(NoticeKind::CommandOutput) => match open_entry(&mut out, open) {
                Some(entry) => entry.accumulated_output.push_str(event.text()),
                None => out.push(FoldedEntry::Passthrough(event.clone())),
            },
            EventKind::Request(RequestKind::CommandOutput) => match open_entry(&mut out, open) {
                Some(entry) => {
                    entry.still_running = false;
                    entry.accumulated_output.push_str(event.text());
                }
                None => out.push(FoldedEntry::Passthrough(event.clone())),
            },
            _ => {
                open = None;
                out.push(FoldedEntry::Passthrough(event.clone()));
            }
        }
    }

    out
}

fn open_entry(out: &mut [FoldedEntry], open: Option<usize>) -> Option<&mut CommandEntry> {
    match out.get_mut(open?) {
        Some(FoldedEntry::Command(entry)) => Some(entry),
        _ => None,
    }
}
