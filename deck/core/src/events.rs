//! Agent Events
//!
//! The raw interaction log emitted by the agent. Every update from the host is
//! a snapshot of this log; everything else in the crate is derived from it.
//!
//! # Design Philosophy
//!
//! The log is append-only and strictly ordered by [`SequenceId`]. Events are
//! either *requests* (the agent waits for the user) or *notices* (informational
//! only). The two kind families are kept apart in the type system because some
//! names overlap: a `command_output` request means "a command is running and may
//! take stdin", while a `command_output` notice is a chunk of streamed output.

use std::fmt;
use std::io::BufRead;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::EventError;

// ============================================
// Identity
// ============================================

/// Position of an event in the log (strictly increasing, never reused)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub u64);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to an attached image: an inline data URL or an opaque URI
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    /// Wrap any string as an image reference
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// View as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the image is carried inline as a `data:` URL
    #[must_use]
    pub fn is_data_url(&self) -> bool {
        self.0.starts_with("data:")
    }
}

// ============================================
// Kinds
// ============================================

/// What the agent is asking the user for
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Agent asked a question and expects free text
    FollowUp,
    /// Agent wants to use a tool and needs approval
    ToolUse,
    /// Agent wants to run a shell command and needs approval
    RunCommand,
    /// A command is running; the user may pipe stdin or exit it
    CommandOutput,
    /// Agent considers the task complete
    TaskComplete,
    /// An API request failed
    RequestFailed,
    /// An interrupted task can be resumed
    ResumeTask,
    /// A completed task can be resumed
    ResumeCompletedTask,
    /// A request kind this build does not know
    Other(String),
}

impl RequestKind {
    /// Parse a wire name, accepting the legacy front-end names as aliases
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "follow_up" | "followup" => Self::FollowUp,
            "tool_use" | "tool" => Self::ToolUse,
            "run_command" | "command" => Self::RunCommand,
            "command_output" => Self::CommandOutput,
            "task_complete" | "completion_result" => Self::TaskComplete,
            "request_failed" | "api_req_failed" => Self::RequestFailed,
            "resume_task" => Self::ResumeTask,
            "resume_completed_task" => Self::ResumeCompletedTask,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FollowUp => "follow_up",
            Self::ToolUse => "tool_use",
            Self::RunCommand => "run_command",
            Self::CommandOutput => "command_output",
            Self::TaskComplete => "task_complete",
            Self::RequestFailed => "request_failed",
            Self::ResumeTask => "resume_task",
            Self::ResumeCompletedTask => "resume_completed_task",
            Self::Other(name) => name,
        }
    }
}

impl Serialize for RequestKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Informational event flavours
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// Plain text from the agent
    Text,
    /// An API request was sent (payload: JSON request summary)
    RequestStarted,
    /// An API request completed (payload: JSON usage/cost)
    RequestFinished,
    /// An API request is being retried
    RequestRetried,
    /// A chunk of output from the running command
    CommandOutput,
    /// A notice kind this build does not know
    Other(String),
}

impl NoticeKind {
    /// Parse a wire name, accepting the legacy front-end names as aliases
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "text" => Self::Text,
            "request_started" | "api_req_started" => Self::RequestStarted,
            "request_finished" | "api_req_finished" => Self::RequestFinished,
            "request_retried" | "api_req_retried" => Self::RequestRetried,
            "command_output" => Self::CommandOutput,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::RequestStarted => "request_started",
            Self::RequestFinished => "request_finished",
            Self::RequestRetried => "request_retried",
            Self::CommandOutput => "command_output",
            Self::Other(name) => name,
        }
    }
}

impl Serialize for NoticeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Request or notice, with its specific kind
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Awaits a response from the user
    Request(RequestKind),
    /// Informational only
    Notice(NoticeKind),
}

// ============================================
// AgentEvent
// ============================================

/// One atomic record of the interaction log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEvent", into = "WireEvent")]
pub struct AgentEvent {
    /// Ordering key and stable identity
    pub sequence_id: SequenceId,
    /// Request or notice kind
    pub kind: EventKind,
    /// Free-form payload (message, output chunk, or serialized JSON)
    pub text: Option<String>,
    /// Attached images, in order
    pub attachments: Vec<ImageRef>,
}

impl AgentEvent {
    /// Create a request event
    pub fn request(sequence_id: u64, kind: RequestKind, text: impl Into<String>) -> Self {
        Self {
            sequence_id: SequenceId(sequence_id),
            kind: EventKind::Request(kind),
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    /// Create a notice event
    pub fn notice(sequence_id: u64, kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            sequence_id: SequenceId(sequence_id),
            kind: EventKind::Notice(kind),
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    /// Drop the text payload entirely (as opposed to an empty string)
    #[must_use]
    pub fn without_text(mut self) -> Self {
        self.text = None;
        self
    }

    /// Attach images
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<ImageRef>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Text payload, empty when absent
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Request kind, if this is a request
    #[must_use]
    pub fn request_kind(&self) -> Option<&RequestKind> {
        match &self.kind {
            EventKind::Request(kind) => Some(kind),
            EventKind::Notice(_) => None,
        }
    }

    /// Notice kind, if this is a notice
    #[must_use]
    pub fn notice_kind(&self) -> Option<&NoticeKind> {
        match &self.kind {
            EventKind::Notice(kind) => Some(kind),
            EventKind::Request(_) => None,
        }
    }

    /// Whether this is a request of the given kind
    #[must_use]
    pub fn is_request(&self, kind: &RequestKind) -> bool {
        self.request_kind() == Some(kind)
    }

    /// Whether this is a notice of the given kind
    #[must_use]
    pub fn is_notice(&self, kind: &NoticeKind) -> bool {
        self.notice_kind() == Some(kind)
    }
}

/// Flat wire shape. Kinds are validated when converting into [`AgentEvent`].
#[derive(Serialize, Deserialize)]
struct WireEvent {
    #[serde(alias = "ts")]
    sequence_id: u64,
    #[serde(alias = "type")]
    kind: String,
    #[serde(default, alias = "ask", skip_serializing_if = "Option::is_none")]
    request_kind: Option<String>,
    #[serde(default, alias = "say", skip_serializing_if = "Option::is_none")]
    notice_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "images", skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ImageRef>,
}

impl TryFrom<WireEvent> for AgentEvent {
    type Error = EventError;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        let sequence_id = wire.sequence_id;
        let kind = match wire.kind.as_str() {
            "request" | "ask" => {
                if wire.notice_kind.is_some() {
                    return Err(EventError::UnexpectedKindField {
                        sequence_id,
                        kind: "request",
                        field: "notice_kind",
                    });
                }
                let name = wire.request_kind.ok_or(EventError::MissingKindField {
                    sequence_id,
                    kind: "request",
                    field: "request_kind",
                })?;
                EventKind::Request(RequestKind::parse(&name))
            }
            "notice" | "say" => {
                if wire.request_kind.is_some() {
                    return Err(EventError::UnexpectedKindField {
                        sequence_id,
                        kind: "notice",
                        field: "request_kind",
                    });
                }
                let name = wire.notice_kind.ok_or(EventError::MissingKindField {
                    sequence_id,
                    kind: "notice",
                    field: "notice_kind",
                })?;
                EventKind::Notice(NoticeKind::parse(&name))
            }
            other => return Err(EventError::UnknownEventKind(other.to_string())),
        };

        Ok(Self {
            sequence_id: SequenceId(sequence_id),
            kind,
            text: wire.text,
            attachments: wire.attachments,
        })
    }
}

impl From<AgentEvent> for WireEvent {
    fn from(event: AgentEvent) -> Self {
        let (kind, request_kind, notice_kind) = match &event.kind {
            EventKind::Request(kind) => ("request", Some(kind.as_str().to_string()), None),
            EventKind::Notice(kind) => ("notice", None, Some(kind.as_str().to_string())),
        };
        Self {
            sequence_id: event.sequence_id.0,
            kind: kind.to_string(),
            request_kind,
            notice_kind,
            text: event.text,
            attachments: event.attachments,
        }
    }
}

// ============================================
// EventLog
// ============================================

/// Append-only buffer of events, owned by the host
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<AgentEvent>,
}

impl EventLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event
    ///
    /// # Errors
    ///
    /// Returns [`EventError::OutOfOrder`] if the event's sequence id is not
    /// strictly greater than the last one.
    pub fn append(&mut self, event: AgentEvent) -> Result<(), EventError> {
        if let Some(last) = self.events.last() {
            if event.sequence_id <= last.sequence_id {
                return Err(EventError::OutOfOrder {
                    last: last.sequence_id,
                    actual: event.sequence_id,
                });
            }
        }
        self.events.push(event);
        Ok(())
    }

    /// Decode a single JSONL line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Decode`] carrying `line_number`.
    pub fn parse_line(line: &str, line_number: usize) -> Result<Option<AgentEvent>, EventError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(trimmed)
            .map(Some)
            .map_err(|source| EventError::Decode {
                line: line_number,
                source,
            })
    }

    /// Load a whole log from JSONL
    ///
    /// # Errors
    ///
    /// Fails on the first undecodable line, IO error, or out-of-order event.
    pub fn from_jsonl<R: BufRead>(reader: R) -> Result<Self, EventError> {
        let mut log = Self::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(event) = Self::parse_line(&line, index + 1)? {
                log.append(event)?;
            }
        }
        tracing::debug!(events = log.len(), "event log loaded");
        Ok(log)
    }

    /// Immutable snapshot of every event
    #[must_use]
    pub fn events(&self) -> &[AgentEvent] {
        &self.events
    }

    /// Most recent event
    #[must_use]
    pub fn last(&self) -> Option<&AgentEvent> {
        self.events.last()
    }

    /// Number of events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
