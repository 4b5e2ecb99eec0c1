//! Surface Messages
//!
//! The wire vocabulary between a host and the chat surface.
//!
//! # Design Philosophy
//!
//! The host owns the event log and the transport to the agent. It pushes whole
//! snapshots down; the surface never edits the log itself. Everything the user
//! does comes back up as a [`SurfaceMessage`], and the host decides how to turn
//! it into new log events.
//!
//! ```text
//!  host ── HostMessage ──► ChatSurface ── SurfaceMessage ──► host
//!                              │
//!                              └── SurfaceDirective ──► renderer
//! ```

use serde::{Deserialize, Serialize};

use crate::events::{AgentEvent, ImageRef};

/// The user's answer to an open request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AskResponse {
    /// Free text, possibly with images
    Message {
        /// Trimmed message text
        text: String,
        /// Images sent along
        #[serde(default)]
        attachments: Vec<ImageRef>,
    },
    /// Primary button: approve, run, exit command, continue
    Affirm,
    /// Secondary button: reject
    Deny,
}

/// Messages from the host to the surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Full snapshot of the log
    State {
        /// Every event so far, in sequence order
        events: Vec<AgentEvent>,
        /// Active model, if the host knows it
        #[serde(default)]
        model_id: Option<String>,
    },

    /// The surface was brought to the front
    DidBecomeVisible,

    /// The native image picker returned
    AttachmentsSelected {
        /// Chosen images
        attachments: Vec<ImageRef>,
    },

    /// The surface was hidden or revealed
    VisibilityChanged {
        /// True when hidden
        hidden: bool,
    },
}

/// Messages from the surface to the host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceMessage {
    /// Answer to the open request
    Response {
        /// The answer
        response: AskResponse,
    },

    /// Open the native image picker
    SelectImages,

    /// Close the current task
    ClearTask,

    /// Start a new task with this prompt
    NewTask {
        /// Task prompt
        text: String,
    },

    /// Sent once when the surface starts
    SurfaceLaunched,
}

/// Rendering hints produced alongside state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceDirective {
    /// Move keyboard focus to the input box
    FocusInput,
    /// The visible list changed; scroll to the newest row
    ScrollToBottom,
}
