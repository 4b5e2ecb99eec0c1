//! Deck Core - Headless Chat Surface Logic for agent-deck
//!
//! This crate turns the raw interaction log of a long-running coding agent into
//! something a person can follow and answer. It knows nothing about how the log
//! is transported or how it is drawn; a host feeds it snapshots and a renderer
//! draws what it derives.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Host                                │
//! │        owns the EventLog, talks to the agent, runs a renderer    │
//! └───────────────┬──────────────────────────────────▲───────────────┘
//!                 │ HostMessage (down)               │ SurfaceMessage (up)
//! ┌───────────────┼──────────────────────────────────┼───────────────┐
//! │               ▼          DECK CORE               │               │
//! │  ┌──────────────────────────┐       ┌────────────┴────────────┐  │
//! │  │      ConversationView    │       │        Composer         │  │
//! │  │  ┌────────┐ ┌─────────┐  │       │  ┌──────┐ ┌──────────┐  │  │
//! │  │  │commands│→│api_reqs │  │       │  │ turn │ │attachment│  │  │
//! │  │  └────────┘ └────┬────┘  │       │  └──────┘ └──────────┘  │  │
//! │  │        ┌─────────┴──┐    │       └─────────────────────────┘  │
//! │  │        ▼            ▼    │                                    │
//! │  │   visibility     metrics │            ChatSurface             │
//! │  └──────────────────────────┘     (ties both halves together)    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`AgentEvent`]: One record of the interaction log
//! - [`FoldedEntry`]: A command run, an API call, or an untouched event
//! - [`ConversationView`]: Folded rows, visible projection and metrics
//! - [`TurnState`]: Which input affordances are live
//! - [`ChatSurface`]: The controller a host drives
//!
//! # Quick Start
//!
//! ```ignore
//! use deck_core::{ChatSurface, DeckConfig, HostMessage, UserAction};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (tx, mut rx) = mpsc::channel(32);
//!     let mut surface = ChatSurface::new(&DeckConfig::default(), tx);
//!     surface.launch().await?;
//!
//!     surface
//!         .handle_host_message(HostMessage::State { events, model_id: None })
//!         .await?;
//!     surface.handle_action(UserAction::Primary).await?;
//!
//!     while let Ok(msg) = rx.try_recv() {
//!         // Forward to the agent
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod attachments;
pub mod automation;
pub mod composer;
pub mod config;
pub mod error;
pub mod events;
pub mod fold;
pub mod messages;
pub mod metrics;
pub mod models;
pub mod surface;
pub mod turn;
pub mod view;
pub mod visibility;

// Re-export main types
pub use attachments::{decode_pasted, AttachmentStaging, PastedImage};
pub use automation::{AutomationSetup, AutomationType, TargetLanguage};
pub use composer::{Composer, InputView};
pub use config::{load_config, ConfigOverrides, ConfigSource, DeckConfig};
pub use error::{ConfigError, EventError};
pub use events::{AgentEvent, EventKind, EventLog, ImageRef, NoticeKind, RequestKind, SequenceId};
pub use fold::{fold_events, ApiCallEntry, ApiUsage, CommandEntry, FoldedEntry};
pub use messages::{AskResponse, HostMessage, SurfaceDirective, SurfaceMessage};
pub use metrics::ApiMetrics;
pub use models::{ModelCatalog, ModelInfo};
pub use surface::{ChatSurface, UserAction};
pub use turn::{derive_transition, InputTarget, TurnState, TurnTransition};
pub use view::ConversationView;
pub use visibility::{is_visible, visible_entries};
