//! Deck Replay - Drive a chat surface from an event log
//!
//! Plays the host role for the deck core: reads a JSONL event log, feeds it to
//! a [`ChatSurface`] and prints what the surface would show. Optionally
//! performs one user action and prints the resulting outbound messages as JSON
//! lines, which makes it handy for scripting and end-to-end checks.
//!
//! # Usage
//!
//! ```bash
//! # Render a saved session
//! deck-replay session.jsonl
//!
//! # Approve the pending tool use and print the response
//! deck-replay session.jsonl --action approve
//!
//! # Answer a follow-up question with an image
//! deck-replay session.jsonl --action send --text "like this" --attach shot.png
//!
//! # Start an API automation task from an OpenAPI document
//! deck-replay --action automate --openapi petstore.json \
//!     --endpoint "GET /pets" --language java
//!
//! # Re-render after every event of a live log
//! tail -f session.jsonl | deck-replay --follow
//!
//! # Verbose logging
//! RUST_LOG=debug deck-replay session.jsonl
//! ```
//!
//! Logs go to stderr; stdout carries only the rendering and outbound messages.

mod render;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

use deck_core::automation::{AutomationSetup, AutomationType, TargetLanguage};
use deck_core::config::{load_config_from_path, ConfigOverrides};
use deck_core::turn::{APPROVE, CONTINUE, EXIT_COMMAND, RUN_COMMAND};
use deck_core::{
    ChatSurface, EventLog, HostMessage, PastedImage, SequenceId, SurfaceDirective,
    SurfaceMessage, UserAction,
};

/// Deck Replay - render an agent event log the way a chat surface would
#[derive(Parser, Debug)]
#[command(name = "deck-replay")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSONL event log (`-` or omitted reads stdin)
    #[arg(value_name = "LOG")]
    log: Option<PathBuf>,

    /// Re-render after every event instead of once at the end
    #[arg(short = 'f', long)]
    follow: bool,

    /// Configuration file path
    #[arg(short = 'c', long, env = "DECK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model id override
    #[arg(short = 'm', long, value_name = "ID")]
    model: Option<String>,

    /// Attachment cap override
    #[arg(long, value_name = "N")]
    max_attachments: Option<usize>,

    /// Request budget override
    #[arg(long, value_name = "N")]
    max_requests: Option<usize>,

    /// Print the derived view as JSON
    #[arg(long)]
    json: bool,

    /// Act on the final state
    #[arg(short = 'a', long, value_enum)]
    action: Option<Action>,

    /// Text typed into the input before acting
    #[arg(short = 't', long)]
    text: Option<String>,

    /// Image files pasted into the input before acting
    #[arg(long = "attach", value_name = "IMAGE")]
    attach: Vec<PathBuf>,

    /// OpenAPI document for `--action automate`
    #[arg(long, value_name = "FILE")]
    openapi: Option<PathBuf>,

    /// Endpoint to automate, as `METHOD /path` (at most two)
    #[arg(long = "endpoint", value_name = "ENDPOINT")]
    endpoints: Vec<String>,

    /// Language of the generated framework
    #[arg(long, value_enum, default_value_t = Language::Python)]
    language: Language,

    /// Expand the row with this sequence id
    #[arg(long, value_name = "ID")]
    expand: Vec<u64>,

    /// Treat the surface as hidden
    #[arg(long)]
    hidden: bool,

    /// Wrap width for text output
    #[arg(short = 'w', long, default_value_t = 100)]
    width: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "DECK_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// One user action
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Approve a tool use
    Approve,
    /// Reject a tool use or command
    Reject,
    /// Approve a shell command
    Run,
    /// Leave a running command
    Exit,
    /// Continue after completion
    Continue,
    /// Send `--text` and attachments
    Send,
    /// Close the task
    ClearTask,
    /// Start an automation task from `--openapi`
    Automate,
}

/// Target language for `--action automate`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Language {
    /// Python
    Python,
    /// Java
    Java,
    /// JavaScript
    Javascript,
}

impl From<Language> for TargetLanguage {
    fn from(language: Language) -> Self {
        match language {
            Language::Python => Self::Python,
            Language::Java => Self::Java,
            Language::Javascript => Self::Javascript,
        }
    }
}

impl Action {
    /// The primary button label this action expects, if it presses primary
    fn expected_primary(self) -> Option<&'static str> {
        match self {
            Self::Approve => Some(APPROVE),
            Self::Run => Some(RUN_COMMAND),
            Self::Exit => Some(EXIT_COMMAND),
            Self::Continue => Some(CONTINUE),
            Self::Reject | Self::Send | Self::ClearTask | Self::Automate => None,
        }
    }

    /// The surface action, for everything but `Automate`
    fn user_action(self) -> Option<UserAction> {
        match self {
            Self::Approve | Self::Run | Self::Exit | Self::Continue => Some(UserAction::Primary),
            Self::Reject => Some(UserAction::Secondary),
            Self::Send => Some(UserAction::Send),
            Self::ClearTask => Some(UserAction::ClearTask),
            Self::Automate => None,
        }
    }
}

/// Initialize logging with the specified level, writing to stderr
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("deck_replay={level},deck_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_log(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open event log: {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

fn state_message(log: &EventLog) -> HostMessage {
    HostMessage::State {
        events: log.events().to_vec(),
        model_id: None,
    }
}

fn print_view(surface: &ChatSurface, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string(&render::render_json(surface)?)?);
    } else {
        print!("{}", render::render_text(surface, args.width));
    }
    Ok(())
}

fn log_directives(directives: &[SurfaceDirective]) {
    for directive in directives {
        debug!(?directive, "surface directive");
    }
}

fn drain(rx: &mut mpsc::Receiver<SurfaceMessage>) -> Vec<SurfaceMessage> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

async fn automation_setup(args: &Args) -> Result<AutomationSetup> {
    let Some(path) = &args.openapi else {
        bail!("--action automate needs --openapi");
    };
    let document = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read OpenAPI document: {}", path.display()))?;

    let mut setup = AutomationSetup::new();
    setup.set_type(AutomationType::Api);
    let found = setup.load_document(&document);
    debug!(endpoints = found, "OpenAPI document loaded");
    for endpoint in &args.endpoints {
        if !setup.toggle_endpoint(endpoint) {
            warn!(%endpoint, "endpoint not selected (unknown, repeated or over the limit)");
        }
    }
    setup.set_language(args.language.into());
    Ok(setup)
}

async fn perform(surface: &mut ChatSurface, args: &Args, action: Action) -> Result<()> {
    if !args.attach.is_empty() {
        let images = args.attach.iter().cloned().map(PastedImage::File).collect();
        surface.handle_action(UserAction::Paste(images)).await?;
        let staged = surface.composer().attachments().len();
        if staged < args.attach.len() {
            warn!(requested = args.attach.len(), staged, "not every image was attached");
        }
    }
    if let Some(text) = &args.text {
        surface.handle_action(UserAction::SetText(text.clone())).await?;
    }
    if let Some(expected) = action.expected_primary() {
        let actual = surface.input_view().primary_label;
        if actual != Some(expected) {
            warn!(?action, expected, ?actual, "primary button does not match the action");
        }
    }
    let user_action = match action.user_action() {
        Some(user_action) => user_action,
        None => UserAction::StartAutomation(automation_setup(args).await?),
    };
    let directives = surface.handle_action(user_action).await?;
    log_directives(&directives);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = match &args.config {
        Some(path) => load_config_from_path(Some(path.clone()))?,
        None => deck_core::load_config()?,
    };
    let mut overrides = ConfigOverrides::new();
    if let Some(model) = &args.model {
        overrides = overrides.with_model_id(model.clone());
    }
    if let Some(max) = args.max_attachments {
        overrides = overrides.with_max_attachments(max);
    }
    if let Some(max) = args.max_requests {
        overrides = overrides.with_max_requests_per_task(max);
    }
    overrides.apply(&mut config)?;
    info!(source = %config.source(), model = %config.model_id, "configuration loaded");

    let (tx, mut rx) = mpsc::channel(32);
    let mut surface = ChatSurface::new(&config, tx);
    surface.launch().await?;
    for msg in drain(&mut rx) {
        debug!(?msg, "surface launched");
    }

    if args.hidden {
        let directives = surface
            .handle_host_message(HostMessage::VisibilityChanged { hidden: true })
            .await?;
        log_directives(&directives);
    }

    let reader = open_log(args.log.as_deref()).await?;
    let mut lines = LinesStream::new(reader.lines());
    let mut log = EventLog::new();
    let mut line_number = 0;
    while let Some(line) = lines.next().await {
        line_number += 1;
        let line = line.context("Failed to read event log")?;
        let Some(event) = EventLog::parse_line(&line, line_number)? else {
            continue;
        };
        log.append(event)?;
        if args.follow {
            let directives = surface.handle_host_message(state_message(&log)).await?;
            log_directives(&directives);
            print_view(&surface, &args)?;
        }
    }
    info!(events = log.len(), "event log read");

    if !args.follow || log.is_empty() {
        let directives = surface.handle_host_message(state_message(&log)).await?;
        log_directives(&directives);
    }
    for id in &args.expand {
        surface
            .handle_action(UserAction::ToggleRow(SequenceId(*id)))
            .await?;
    }
    if !args.follow || !args.expand.is_empty() || log.is_empty() {
        print_view(&surface, &args)?;
    }

    if let Some(action) = args.action {
        perform(&mut surface, &args, action).await?;
        let sent = drain(&mut rx);
        if sent.is_empty() {
            bail!("{action:?} had no effect: no matching request is open");
        }
        for msg in sent {
            println!("{}", serde_json::to_string(&msg)?);
        }
    }

    Ok(())
}
