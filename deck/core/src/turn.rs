//! Turn State
//!
//! Which input affordances are live is a pure function of the log tail. There
//! is no stored transition table: every snapshot is projected through
//! [`derive_transition`] and the composer applies the result.
//!
//! | last event                                   | transition            |
//! |----------------------------------------------|-----------------------|
//! | request `follow_up`                          | input on, no buttons  |
//! | request `tool_use`                           | Approve / Reject      |
//! | request `run_command`                        | Run Command / Reject  |
//! | request `command_output`                     | Exit Command, stdin   |
//! | request `task_complete`                      | Continue              |
//! | `request_started` after `command_output` ask | suspend               |
//! | anything else                                | unchanged             |

use serde::Serialize;

use crate::events::{AgentEvent, EventKind, NoticeKind, RequestKind};

/// Label for approving a tool use
pub const APPROVE: &str = "Approve";
/// Label for rejecting a tool use or command
pub const REJECT: &str = "Reject";
/// Label for approving a shell command
pub const RUN_COMMAND: &str = "Run Command";
/// Label for leaving a running command
pub const EXIT_COMMAND: &str = "Exit Command";
/// Label for continuing after completion
pub const CONTINUE: &str = "Continue";

/// Placeholder while typed text goes to a running command
pub const STDIN_PLACEHOLDER: &str = "Type input to command stdin...";
/// Placeholder for ordinary messages
pub const MESSAGE_PLACEHOLDER: &str = "Type a message...";

/// Where submitted text goes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTarget {
    /// A chat message to the agent
    #[default]
    NewMessage,
    /// Stdin of the running command
    CommandStdin,
}

/// Input affordances for the current turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnState {
    /// The request awaiting an answer, if any
    pub pending: Option<RequestKind>,
    /// Text entry accepts input
    pub input_enabled: bool,
    /// Destination of submitted text
    pub target: InputTarget,
    /// Primary button label
    pub primary_label: Option<&'static str>,
    /// Secondary button label
    pub secondary_label: Option<&'static str>,
    /// Buttons accept presses
    pub buttons_enabled: bool,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            pending: None,
            input_enabled: true,
            target: InputTarget::NewMessage,
            primary_label: None,
            secondary_label: None,
            buttons_enabled: false,
        }
    }
}

impl TurnState {
    /// State entered when the given request is the last event
    ///
    /// Returns `None` for requests that do not open a turn.
    #[must_use]
    pub fn for_request(kind: &RequestKind) -> Option<Self> {
        let (target, primary, secondary) = match kind {
            RequestKind::FollowUp => (InputTarget::NewMessage, None, None),
            RequestKind::ToolUse => (InputTarget::NewMessage, Some(APPROVE), Some(REJECT)),
            RequestKind::RunCommand => (InputTarget::NewMessage, Some(RUN_COMMAND), Some(REJECT)),
            RequestKind::CommandOutput => (InputTarget::CommandStdin, Some(EXIT_COMMAND), None),
            RequestKind::TaskComplete => (InputTarget::NewMessage, Some(CONTINUE), None),
            RequestKind::RequestFailed
            | RequestKind::ResumeTask
            | RequestKind::ResumeCompletedTask
            | RequestKind::Other(_) => return None,
        };
        Some(Self {
            pending: Some(kind.clone()),
            input_enabled: true,
            target,
            primary_label: primary,
            secondary_label: secondary,
            buttons_enabled: primary.is_some(),
        })
    }

    /// Whether the primary button does anything right now
    #[must_use]
    pub fn primary_active(&self) -> bool {
        self.buttons_enabled
            && matches!(
                self.pending,
                Some(
                    RequestKind::ToolUse
                        | RequestKind::RunCommand
                        | RequestKind::CommandOutput
                        | RequestKind::TaskComplete
                )
            )
    }

    /// Whether the secondary button does anything right now
    #[must_use]
    pub fn secondary_active(&self) -> bool {
        self.buttons_enabled
            && matches!(
                self.pending,
                Some(RequestKind::ToolUse | RequestKind::RunCommand)
            )
    }

    /// Close the turn after the user answered or the agent moved on
    pub fn settle(&mut self) {
        self.pending = None;
        self.input_enabled = false;
        self.buttons_enabled = false;
    }
}

/// What the composer should do with a new snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnTransition {
    /// A request opened a turn
    Enter(TurnState),
    /// The agent resumed work after a running command; drop any draft
    Suspend,
    /// Keep the current state
    Unchanged,
}

/// Project the log tail into a transition
///
/// Only the last event matters, except for the suspend rule which also looks
/// at the one before it.
#[must_use]
pub fn derive_transition(tail: &[AgentEvent]) -> TurnTransition {
    let Some((last, rest)) = tail.split_last() else {
        return TurnTransition::Unchanged;
    };
    match &last.kind {
        EventKind::Request(kind) => TurnState::for_request(kind)
            .map_or(TurnTransition::Unchanged, TurnTransition::Enter),
        EventKind::Notice(NoticeKind::RequestStarted)
            if rest
                .last()
                .is_some_and(|prev| prev.is_request(&RequestKind::CommandOutput)) =>
        {
            TurnTransition::Suspend
        }
        EventKind::Notice(_) => TurnTransition::Unchanged,
    }
}

/// Whether submitted text is piped to a running command
#[must_use]
pub fn is_piping(last: Option<&AgentEvent>) -> bool {
    last.is_some_and(|event| event.is_request(&RequestKind::CommandOutput))
}

/// Placeholder text for the input box
#[must_use]
pub fn placeholder(last: Option<&AgentEvent>) -> &'static str {
    if is_piping(last) {
        STDIN_PLACEHOLDER
    } else {
        MESSAGE_PLACEHOLDER
    }
}
