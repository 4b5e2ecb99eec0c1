//! Composer
//!
//! Owns the draft text, staged attachments and the current [`TurnState`].
//! Snapshots are fed through [`Composer::observe`]; user actions come in
//! through the button and submit methods, each of which yields at most one
//! [`AskResponse`] per open request.

use serde::Serialize;

use crate::attachments::AttachmentStaging;
use crate::events::{AgentEvent, ImageRef, SequenceId};
use crate::messages::AskResponse;
use crate::turn::{self, derive_transition, InputTarget, TurnState, TurnTransition};

/// Everything a renderer needs to draw the input area
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InputView {
    /// Draft text
    pub text: String,
    /// Text entry accepts input
    pub input_enabled: bool,
    /// Destination of submitted text
    pub target: InputTarget,
    /// Placeholder for an empty input box
    pub placeholder: &'static str,
    /// Primary button label
    pub primary_label: Option<&'static str>,
    /// Secondary button label
    pub secondary_label: Option<&'static str>,
    /// Buttons accept presses
    pub buttons_enabled: bool,
    /// The image picker can be opened
    pub attachments_enabled: bool,
    /// Staged images
    pub attachments: Vec<ImageRef>,
}

/// Draft input plus turn state
#[derive(Clone, Debug, Default)]
pub struct Composer {
    text: String,
    staging: AttachmentStaging,
    turn: TurnState,
    last_event: Option<AgentEvent>,
    last_applied: Option<SequenceId>,
}

impl Composer {
    /// Create a composer with the given attachment cap
    #[must_use]
    pub fn new(max_attachments: usize) -> Self {
        Self {
            staging: AttachmentStaging::new(max_attachments),
            ..Self::default()
        }
    }

    /// Apply a snapshot
    ///
    /// Returns false when the snapshot's last event was already applied, in
    /// which case nothing changes. This keeps a re-delivered snapshot from
    /// re-arming buttons the user already pressed.
    pub fn observe(&mut self, events: &[AgentEvent]) -> bool {
        let Some(last) = events.last() else {
            return false;
        };
        if self.last_applied == Some(last.sequence_id) {
            return false;
        }
        self.last_applied = Some(last.sequence_id);
        self.last_event = Some(last.clone());

        match derive_transition(events) {
            TurnTransition::Enter(state) => {
                tracing::debug!(sequence_id = %last.sequence_id, pending = ?state.pending, "turn opened");
                self.turn = state;
            }
            TurnTransition::Suspend => {
                tracing::debug!(sequence_id = %last.sequence_id, "turn suspended");
                self.text.clear();
                self.staging.clear();
                self.turn.settle();
            }
            TurnTransition::Unchanged => {}
        }
        true
    }

    /// Replace the draft text. Ignored while input is disabled.
    pub fn set_text(&mut self, text: impl Into<String>) {
        if self.turn.input_enabled {
            self.text = text.into();
        }
    }

    /// Handle the Enter key
    ///
    /// Shift+Enter inserts a newline. Enter during IME composition does
    /// nothing. Plain Enter submits.
    pub fn enter(&mut self, shift: bool, composing: bool) -> Option<AskResponse> {
        if shift {
            if self.turn.input_enabled {
                self.text.push('\n');
            }
            return None;
        }
        if composing {
            return None;
        }
        self.submit()
    }

    /// Send the draft as a message
    ///
    /// Works whenever input is enabled. Blank text with nothing staged is a
    /// no-op.
    pub fn submit(&mut self) -> Option<AskResponse> {
        if !self.turn.input_enabled {
            return None;
        }
        let text = self.text.trim();
        if text.is_empty() && self.staging.is_empty() {
            return None;
        }
        let response = AskResponse::Message {
            text: text.to_string(),
            attachments: self.staging.take(),
        };
        self.text.clear();
        self.turn.settle();
        Some(response)
    }

    /// Press the primary button
    pub fn primary(&mut self) -> Option<AskResponse> {
        if !self.turn.primary_active() {
            return None;
        }
        self.turn.settle();
        Some(AskResponse::Affirm)
    }

    /// Press the secondary button
    pub fn secondary(&mut self) -> Option<AskResponse> {
        if !self.turn.secondary_active() {
            return None;
        }
        self.turn.settle();
        Some(AskResponse::Deny)
    }

    /// Whether the image picker may be opened
    #[must_use]
    pub fn attachments_enabled(&self, model_supports_images: bool) -> bool {
        model_supports_images
            && self.turn.input_enabled
            && !self.staging.is_full()
            && !self.is_piping()
    }

    /// Stage images, subject to the cap. Returns how many were staged.
    pub fn attach(&mut self, images: Vec<ImageRef>) -> usize {
        let offered = images.len();
        let staged = self.staging.add(images);
        if staged < offered {
            tracing::debug!(offered, staged, max = self.staging.max(), "attachment cap reached");
        }
        staged
    }

    /// Remove one staged image
    pub fn remove_attachment(&mut self, index: usize) -> Option<ImageRef> {
        self.staging.remove(index)
    }

    /// Disable input until the next request opens a turn
    pub fn lock_input(&mut self) {
        self.turn.settle();
    }

    /// Drop the draft and staged images, keeping the turn
    pub fn clear_draft(&mut self) {
        self.text.clear();
        self.staging.clear();
    }

    /// Forget everything, as for a fresh task
    pub fn reset(&mut self) {
        *self = Self::new(self.staging.max());
    }

    /// Current turn state
    #[must_use]
    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    /// Draft text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Staged images
    #[must_use]
    pub fn attachments(&self) -> &[ImageRef] {
        self.staging.items()
    }

    /// Sequence id of the last applied snapshot tail
    #[must_use]
    pub fn last_applied(&self) -> Option<SequenceId> {
        self.last_applied
    }

    /// Submitted text would go to a running command
    #[must_use]
    pub fn is_piping(&self) -> bool {
        turn::is_piping(self.last_event.as_ref())
    }

    /// Placeholder for the input box
    #[must_use]
    pub fn placeholder(&self) -> &'static str {
        turn::placeholder(self.last_event.as_ref())
    }

    /// Snapshot of the input area
    #[must_use]
    pub fn view(&self, model_supports_images: bool) -> InputView {
        InputView {
            text: self.text.clone(),
            input_enabled: self.turn.input_enabled,
            target: self.turn.target,
            placeholder: self.placeholder(),
            primary_label: self.turn.primary_label,
            secondary_label: self.turn.secondary_label,
            buttons_enabled: self.turn.buttons_enabled,
            attachments_enabled: self.attachments_enabled(model_supports_images),
            attachments: self.staging.items().to_vec(),
        }
    }
}
