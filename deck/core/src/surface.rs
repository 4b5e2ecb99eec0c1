//! Chat Surface
//!
//! The controller a host drives. It holds the latest snapshot and its derived
//! [`ConversationView`], the [`Composer`], the active model, and per-row UI
//! state. Host messages and user actions go in; outbound [`SurfaceMessage`]s
//! leave through an mpsc channel and rendering hints come back as
//! [`SurfaceDirective`]s.

use std::collections::BTreeSet;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::attachments::{decode_pasted, PastedImage};
use crate::automation::AutomationSetup;
use crate::composer::{Composer, InputView};
use crate::config::DeckConfig;
use crate::events::{AgentEvent, ImageRef, SequenceId};
use crate::messages::{AskResponse, HostMessage, SurfaceDirective, SurfaceMessage};
use crate::models::{ModelCatalog, ModelInfo};
use crate::view::ConversationView;

/// Something the user did on the surface
#[derive(Clone, Debug)]
pub enum UserAction {
    /// The input box content changed
    SetText(String),
    /// Enter was pressed
    Enter {
        /// Shift was held
        shift: bool,
        /// An IME composition is in progress
        composing: bool,
    },
    /// The send button was clicked
    Send,
    /// The primary button was clicked
    Primary,
    /// The secondary button was clicked
    Secondary,
    /// The attach button was clicked
    SelectImages,
    /// Images were pasted or dropped onto the input
    Paste(Vec<PastedImage>),
    /// A staged image was removed
    RemoveAttachment(usize),
    /// A row was expanded or collapsed
    ToggleRow(SequenceId),
    /// The task header was closed
    ClearTask,
    /// A task was started with this prompt
    NewTask(String),
    /// The automation panel's start button was clicked
    StartAutomation(AutomationSetup),
}

/// Controller for one chat surface
#[derive(Debug)]
pub struct ChatSurface {
    tx: mpsc::Sender<SurfaceMessage>,
    events: Vec<AgentEvent>,
    view: ConversationView,
    composer: Composer,
    catalog: ModelCatalog,
    default_model: String,
    requested_model: String,
    model: ModelInfo,
    max_requests_per_task: usize,
    expanded: BTreeSet<SequenceId>,
    hidden: bool,
    launched: bool,
}

impl ChatSurface {
    /// Create a surface that sends to `tx`
    #[must_use]
    pub fn new(config: &DeckConfig, tx: mpsc::Sender<SurfaceMessage>) -> Self {
        let catalog = config.catalog();
        let model = catalog.resolve(Some(&config.model_id));
        Self {
            tx,
            events: Vec::new(),
            view: ConversationView::default(),
            composer: Composer::new(config.max_attachments),
            catalog,
            default_model: config.model_id.clone(),
            requested_model: config.model_id.clone(),
            model,
            max_requests_per_task: config.max_requests_per_task,
            expanded: BTreeSet::new(),
            hidden: false,
            launched: false,
        }
    }

    /// Announce the surface to the host. Only the first call sends.
    ///
    /// # Errors
    ///
    /// Fails if the host side of the channel is gone.
    pub async fn launch(&mut self) -> anyhow::Result<()> {
        if self.launched {
            return Ok(());
        }
        self.launched = true;
        self.send(SurfaceMessage::SurfaceLaunched).await
    }

    /// Handle a message from the host
    ///
    /// # Errors
    ///
    /// Fails if the host side of the channel is gone.
    pub async fn handle_host_message(
        &mut self,
        msg: HostMessage,
    ) -> anyhow::Result<Vec<SurfaceDirective>> {
        let mut directives = Vec::new();
        match msg {
            HostMessage::State { events, model_id } => {
                self.apply_state(events, model_id, &mut directives);
            }
            HostMessage::DidBecomeVisible => {
                self.push_focus(&mut directives);
            }
            HostMessage::AttachmentsSelected { attachments } => {
                self.stage(attachments);
            }
            HostMessage::VisibilityChanged { hidden } => {
                self.hidden = hidden;
                self.push_focus(&mut directives);
            }
        }
        Ok(directives)
    }

    /// Handle a user action
    ///
    /// # Errors
    ///
    /// Fails if the host side of the channel is gone.
    pub async fn handle_action(
        &mut self,
        action: UserAction,
    ) -> anyhow::Result<Vec<SurfaceDirective>> {
        let mut directives = Vec::new();
        match action {
            UserAction::SetText(text) => self.composer.set_text(text),
            UserAction::Enter { shift, composing } => {
                if self.events.is_empty() && !shift && !composing {
                    self.start_task_from_draft().await?;
                } else {
                    let response = self.composer.enter(shift, composing);
                    self.respond(response).await?;
                }
            }
            UserAction::Send => {
                if self.events.is_empty() {
                    self.start_task_from_draft().await?;
                } else {
                    let response = self.composer.submit();
                    self.respond(response).await?;
                }
            }
            UserAction::Primary => {
                let response = self.composer.primary();
                self.respond(response).await?;
            }
            UserAction::Secondary => {
                let response = self.composer.secondary();
                self.respond(response).await?;
            }
            UserAction::SelectImages => {
                if self.attachments_enabled() {
                    self.send(SurfaceMessage::SelectImages).await?;
                }
            }
            UserAction::Paste(images) => {
                if self.attachments_enabled() {
                    let decoded = decode_pasted(images).await;
                    self.stage(decoded);
                }
            }
            UserAction::RemoveAttachment(index) => {
                self.composer.remove_attachment(index);
            }
            UserAction::ToggleRow(id) => {
                // Expanding the newest row pushes content below the fold
                let is_last = self.view.visible_ids().last() == Some(&id);
                if self.toggle_row(id) && is_last {
                    directives.push(SurfaceDirective::ScrollToBottom);
                }
            }
            UserAction::ClearTask => {
                self.composer.reset();
                self.expanded.clear();
                self.send(SurfaceMessage::ClearTask).await?;
            }
            UserAction::NewTask(text) => self.start_task(&text).await?,
            UserAction::StartAutomation(setup) => match setup.prompt() {
                Some(prompt) => self.start_task(&prompt).await?,
                None => tracing::debug!(?setup, "automation setup incomplete, nothing sent"),
            },
        }
        Ok(directives)
    }

    fn apply_state(
        &mut self,
        events: Vec<AgentEvent>,
        model_id: Option<String>,
        directives: &mut Vec<SurfaceDirective>,
    ) {
        let model_id = model_id.unwrap_or_else(|| self.default_model.clone());
        if model_id != self.requested_model {
            self.model = self.catalog.resolve(Some(&model_id));
            self.requested_model = model_id;
        }

        let view = ConversationView::derive(&events);
        if view.visible_ids() != self.view.visible_ids() {
            directives.push(SurfaceDirective::ScrollToBottom);
        }

        let turn_changed = if events.is_empty() {
            let had_state = self.composer.last_applied().is_some();
            if had_state {
                self.composer.reset();
                self.expanded.clear();
            }
            had_state
        } else {
            self.composer.observe(&events)
        };

        tracing::debug!(
            events = events.len(),
            visible = view.visible.len(),
            requests = view.metrics.request_count,
            turn_changed,
            "applied snapshot"
        );
        if view.metrics.request_count >= self.max_requests_per_task
            && self.view.metrics.request_count < self.max_requests_per_task
        {
            tracing::info!(
                max = self.max_requests_per_task,
                "request budget for this task reached"
            );
        }

        self.view = view;
        self.events = events;
        if turn_changed {
            self.push_focus(directives);
        }
    }

    fn stage(&mut self, images: Vec<ImageRef>) {
        if images.is_empty() {
            return;
        }
        if !self.attachments_enabled() {
            tracing::debug!(count = images.len(), "attaching disabled, dropping images");
            return;
        }
        self.composer.attach(images);
    }

    async fn start_task(&mut self, text: &str) -> anyhow::Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.composer.lock_input();
        self.send(SurfaceMessage::NewTask {
            text: text.to_string(),
        })
        .await
    }

    async fn start_task_from_draft(&mut self) -> anyhow::Result<()> {
        let text = self.composer.text().to_string();
        if text.trim().is_empty() {
            return Ok(());
        }
        self.composer.clear_draft();
        self.start_task(&text).await
    }

    async fn respond(&self, response: Option<AskResponse>) -> anyhow::Result<()> {
        match response {
            Some(response) => self.send(SurfaceMessage::Response { response }).await,
            None => Ok(()),
        }
    }

    async fn send(&self, msg: SurfaceMessage) -> anyhow::Result<()> {
        self.tx
            .send(msg)
            .await
            .context("host stopped listening to the surface")
    }

    fn push_focus(&self, directives: &mut Vec<SurfaceDirective>) {
        if self.should_focus_input() {
            directives.push(SurfaceDirective::FocusInput);
        }
    }

    /// Expand or collapse a row. Returns whether it is now expanded.
    pub fn toggle_row(&mut self, id: SequenceId) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    /// Whether a row is expanded
    #[must_use]
    pub fn is_expanded(&self, id: SequenceId) -> bool {
        self.expanded.contains(&id)
    }

    /// Input should take focus: visible, enabled, and no buttons to press
    #[must_use]
    pub fn should_focus_input(&self) -> bool {
        let turn = self.composer.turn();
        !self.hidden && turn.input_enabled && !turn.buttons_enabled
    }

    /// Whether the image picker may be opened
    #[must_use]
    pub fn attachments_enabled(&self) -> bool {
        self.composer.attachments_enabled(self.model.supports_images)
    }

    /// API requests left in this task's budget
    #[must_use]
    pub fn requests_remaining(&self) -> usize {
        self.view
            .metrics
            .requests_remaining(self.max_requests_per_task)
    }

    /// Derived view of the latest snapshot
    #[must_use]
    pub fn view(&self) -> &ConversationView {
        &self.view
    }

    /// Latest snapshot
    #[must_use]
    pub fn events(&self) -> &[AgentEvent] {
        &self.events
    }

    /// Draft and turn state
    #[must_use]
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Renderable input area
    #[must_use]
    pub fn input_view(&self) -> InputView {
        self.composer.view(self.model.supports_images)
    }

    /// Active model
    #[must_use]
    pub fn model(&self) -> &ModelInfo {
        &self.model
    }

    /// Whether the surface is hidden
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NoticeKind, RequestKind};
    use pretty_assertions::assert_eq;

    fn surface() -> (ChatSurface, mpsc::Receiver<SurfaceMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (ChatSurface::new(&DeckConfig::default(), tx), rx)
    }

    fn state(events: Vec<AgentEvent>) -> HostMessage {
        HostMessage::State {
            events,
            model_id: None,
        }
    }

    fn task() -> AgentEvent {
        AgentEvent::notice(1, NoticeKind::Text, "fix the build")
    }

    #[tokio::test]
    async fn test_launch_sends_once() {
        let (mut surface, mut rx) = surface();
        surface.launch().await.unwrap();
        surface.launch().await.unwrap();
        assert_eq!(rx.recv().await, Some(SurfaceMessage::SurfaceLaunched));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_approve_sends_single_response() {
        let (mut surface, mut rx) = surface();
        let events = vec![task(), AgentEvent::request(2, RequestKind::ToolUse, "{}")];
        surface
            .handle_host_message(state(events.clone()))
            .await
            .unwrap();

        surface.handle_action(UserAction::Primary).await.unwrap();
        surface.handle_action(UserAction::Primary).await.unwrap();
        surface.handle_host_message(state(events)).await.unwrap();
        surface.handle_action(UserAction::Primary).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(SurfaceMessage::Response {
                response: AskResponse::Affirm
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_scroll_on_visible_change_only() {
        let (mut surface, _rx) = surface();
        let events = vec![task(), AgentEvent::notice(2, NoticeKind::Text, "hi")];
        let directives = surface
            .handle_host_message(state(events.clone()))
            .await
            .unwrap();
        assert!(directives.contains(&SurfaceDirective::ScrollToBottom));

        let directives = surface.handle_host_message(state(events)).await.unwrap();
        assert!(!directives.contains(&SurfaceDirective::ScrollToBottom));
    }

    #[tokio::test]
    async fn test_focus_rules() {
        let (mut surface, _rx) = surface();
        let directives = surface
            .handle_host_message(state(vec![
                task(),
                AgentEvent::request(2, RequestKind::FollowUp, "which file?"),
            ]))
            .await
            .unwrap();
        assert!(directives.contains(&SurfaceDirective::FocusInput));

        surface
            .handle_host_message(HostMessage::VisibilityChanged { hidden: true })
            .await
            .unwrap();
        let directives = surface
            .handle_host_message(HostMessage::DidBecomeVisible)
            .await
            .unwrap();
        assert!(directives.is_empty());

        surface
            .handle_host_message(HostMessage::VisibilityChanged { hidden: false })
            .await
            .unwrap();
        surface
            .handle_host_message(state(vec![
                task(),
                AgentEvent::request(2, RequestKind::FollowUp, "which file?"),
                AgentEvent::request(3, RequestKind::ToolUse, "{}"),
            ]))
            .await
            .unwrap();
        let directives = surface
            .handle_host_message(HostMessage::DidBecomeVisible)
            .await
            .unwrap();
        assert!(directives.is_empty());
    }

    #[tokio::test]
    async fn test_select_images_respects_model() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut config = DeckConfig::default();
        config.models.push(ModelInfo {
            id: "text-only".into(),
            supports_images: false,
            supports_prompt_cache: false,
            max_tokens: 1024,
            input_price: 0.0,
            output_price: 0.0,
            cache_writes_price: None,
            cache_reads_price: None,
        });
        let mut surface = ChatSurface::new(&config, tx);
        let events = vec![task(), AgentEvent::request(2, RequestKind::FollowUp, "?")];

        surface
            .handle_host_message(HostMessage::State {
                events: events.clone(),
                model_id: Some("text-only".into()),
            })
            .await
            .unwrap();
        surface.handle_action(UserAction::SelectImages).await.unwrap();
        assert!(rx.try_recv().is_err());

        surface
            .handle_host_message(state(events))
            .await
            .unwrap();
        surface.handle_action(UserAction::SelectImages).await.unwrap();
        assert_eq!(rx.recv().await, Some(SurfaceMessage::SelectImages));
    }

    #[tokio::test]
    async fn test_selected_attachments_go_out_with_message() {
        let (mut surface, mut rx) = surface();
        surface
            .handle_host_message(state(vec![
                task(),
                AgentEvent::request(2, RequestKind::FollowUp, "?"),
            ]))
            .await
            .unwrap();
        surface
            .handle_host_message(HostMessage::AttachmentsSelected {
                attachments: vec![ImageRef::new("data:image/png;base64,AA")],
            })
            .await
            .unwrap();
        surface
            .handle_action(UserAction::SetText("see image".into()))
            .await
            .unwrap();
        surface
            .handle_action(UserAction::Enter {
                shift: false,
                composing: false,
            })
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(SurfaceMessage::Response {
                response: AskResponse::Message {
                    text: "see image".into(),
                    attachments: vec![ImageRef::new("data:image/png;base64,AA")],
                }
            })
        );
    }

    #[tokio::test]
    async fn test_first_message_starts_task() {
        let (mut surface, mut rx) = surface();
        surface
            .handle_action(UserAction::SetText(" write tests ".into()))
            .await
            .unwrap();
        surface.handle_action(UserAction::Send).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(SurfaceMessage::NewTask {
                text: "write tests".into()
            })
        );
        assert_eq!(surface.composer().text(), "");
    }

    #[tokio::test]
    async fn test_input_locked_after_new_task_until_request() {
        let (mut surface, mut rx) = surface();
        surface
            .handle_action(UserAction::SetText("go".into()))
            .await
            .unwrap();
        surface.handle_action(UserAction::Send).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(SurfaceMessage::NewTask { text: "go".into() })
        );

        surface
            .handle_host_message(state(vec![
                AgentEvent::notice(1, NoticeKind::Text, "go"),
                AgentEvent::notice(2, NoticeKind::Text, "thinking"),
            ]))
            .await
            .unwrap();
        assert!(!surface.input_view().input_enabled);
        surface
            .handle_action(UserAction::SetText("more detail".into()))
            .await
            .unwrap();
        surface.handle_action(UserAction::Send).await.unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(surface.composer().text(), "");

        surface
            .handle_host_message(state(vec![
                AgentEvent::notice(1, NoticeKind::Text, "go"),
                AgentEvent::notice(2, NoticeKind::Text, "thinking"),
                AgentEvent::request(3, RequestKind::FollowUp, "which branch?"),
            ]))
            .await
            .unwrap();
        assert!(surface.input_view().input_enabled);
        surface
            .handle_action(UserAction::SetText("main".into()))
            .await
            .unwrap();
        surface.handle_action(UserAction::Send).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(SurfaceMessage::Response {
                response: AskResponse::Message {
                    text: "main".into(),
                    attachments: vec![],
                }
            })
        );
    }

    #[tokio::test]
    async fn test_paste_keeps_first_twenty_in_order() {
        use base64::prelude::{Engine as _, BASE64_STANDARD};

        let (mut surface, mut rx) = surface();
        surface
            .handle_host_message(state(vec![
                task(),
                AgentEvent::request(2, RequestKind::FollowUp, "screenshots?"),
            ]))
            .await
            .unwrap();

        let pasted: Vec<PastedImage> = (0u8..25)
            .map(|n| PastedImage::Bytes {
                mime_type: "image/png".into(),
                data: vec![n],
            })
            .collect();
        surface
            .handle_action(UserAction::Paste(pasted))
            .await
            .unwrap();

        let expected: Vec<ImageRef> = (0u8..20)
            .map(|n| {
                ImageRef(format!(
                    "data:image/png;base64,{}",
                    BASE64_STANDARD.encode([n])
                ))
            })
            .collect();
        assert_eq!(surface.composer().attachments(), expected.as_slice());
        assert!(!surface.attachments_enabled());

        surface.handle_action(UserAction::Send).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(SurfaceMessage::Response {
                response: AskResponse::Message {
                    text: String::new(),
                    attachments: expected,
                }
            })
        );
    }

    #[tokio::test]
    async fn test_automation_setup_starts_task() {
        use crate::automation::{AutomationType, TargetLanguage};

        let (mut surface, mut rx) = surface();
        let mut setup = AutomationSetup::new();
        setup.set_type(AutomationType::Api);
        setup.load_document(
            r#"{"paths":{"/pets":{"get":{},"post":{}},"/pets/{id}":{"delete":{}}}}"#,
        );
        assert!(setup.toggle_endpoint("GET /pets"));

        // No language yet: nothing goes out
        surface
            .handle_action(UserAction::StartAutomation(setup.clone()))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());

        setup.set_language(TargetLanguage::Python);
        surface
            .handle_action(UserAction::StartAutomation(setup))
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await,
            Some(SurfaceMessage::NewTask {
                text: "Create an API automation framework for api using python. Endpoints: GET /pets"
                    .into()
            })
        );
        assert!(!surface.input_view().input_enabled);
    }

    #[tokio::test]
    async fn test_clear_task_resets() {
        let (mut surface, mut rx) = surface();
        surface
            .handle_host_message(state(vec![
                task(),
                AgentEvent::request(2, RequestKind::FollowUp, "?"),
            ]))
            .await
            .unwrap();
        surface.toggle_row(SequenceId(2));
        surface.handle_action(UserAction::ClearTask).await.unwrap();
        assert_eq!(rx.recv().await, Some(SurfaceMessage::ClearTask));
        assert!(!surface.is_expanded(SequenceId(2)));
        assert_eq!(surface.composer().last_applied(), None);
    }

    #[tokio::test]
    async fn test_expanding_last_row_scrolls() {
        let (mut surface, _rx) = surface();
        surface
            .handle_host_message(state(vec![
                task(),
                AgentEvent::request(2, RequestKind::RunCommand, "ls"),
                AgentEvent::notice(3, NoticeKind::Text, "done"),
            ]))
            .await
            .unwrap();
        let directives = surface
            .handle_action(UserAction::ToggleRow(SequenceId(2)))
            .await
            .unwrap();
        assert!(directives.is_empty());
        let directives = surface
            .handle_action(UserAction::ToggleRow(SequenceId(3)))
            .await
            .unwrap();
        assert_eq!(directives, vec![SurfaceDirective::ScrollToBottom]);
    }

    #[tokio::test]
    async fn test_toggle_row() {
        let (mut surface, _rx) = surface();
        assert!(surface.toggle_row(SequenceId(4)));
        assert!(surface.is_expanded(SequenceId(4)));
        assert!(!surface.toggle_row(SequenceId(4)));
        assert!(!surface.is_expanded(SequenceId(4)));
    }

    #[tokio::test]
    async fn test_requests_remaining() {
        let (mut surface, _rx) = surface();
        surface
            .handle_host_message(state(vec![
                task(),
                AgentEvent::notice(2, NoticeKind::RequestStarted, "{}"),
                AgentEvent::notice(3, NoticeKind::RequestFinished, "{}"),
                AgentEvent::notice(4, NoticeKind::RequestStarted, "{}"),
            ]))
            .await
            .unwrap();
        assert_eq!(surface.requests_remaining(), 18);
    }

    #[tokio::test]
    async fn test_closed_channel_is_an_error() {
        let (mut surface, rx) = surface();
        drop(rx);
        assert!(surface.launch().await.is_err());
    }
}
