//! Plain-text and JSON rendering of a surface
//!
//! Stands in for a real renderer: the task header with running totals, one
//! block per visible row, then the input area with its buttons.

use std::fmt::Write as _;

use deck_core::fold::{ApiCallEntry, CommandEntry};
use deck_core::{AgentEvent, ChatSurface, EventKind, FoldedEntry, NoticeKind};
use textwrap::Options;

/// Collapsed command output shows at most this many trailing lines
pub const COLLAPSED_OUTPUT_LINES: usize = 10;

const INDENT: &str = "    ";

fn wrap_into(out: &mut String, text: &str, width: usize, indent: &str) {
    let options = Options::new(width.max(indent.len() + 8))
        .initial_indent(indent)
        .subsequent_indent(indent);
    for line in text.lines() {
        if line.trim().is_empty() {
            out.push('\n');
            continue;
        }
        for wrapped in textwrap::wrap(line, &options) {
            out.push_str(&wrapped);
            out.push('\n');
        }
    }
}

fn unknown_or<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

fn render_event(out: &mut String, event: &AgentEvent, width: usize) {
    let label = match &event.kind {
        EventKind::Notice(NoticeKind::Text) => None,
        EventKind::Notice(kind) => Some(kind.as_str().to_string()),
        EventKind::Request(kind) => Some(format!("{}?", kind.as_str())),
    };
    match label {
        Some(label) => {
            let _ = writeln!(out, "[{}] {label}", event.sequence_id);
        }
        None => {
            let _ = writeln!(out, "[{}]", event.sequence_id);
        }
    }
    wrap_into(out, event.text(), width, INDENT);
    if !event.attachments.is_empty() {
        let _ = writeln!(out, "{INDENT}[{} image(s)]", event.attachments.len());
    }
}

fn render_command(out: &mut String, cmd: &CommandEntry, expanded: bool, width: usize) {
    let status = if cmd.still_running { "" } else { " (waiting for exit)" };
    let _ = writeln!(out, "[{}] $ {}{status}", cmd.started_at, cmd.command);
    let lines: Vec<&str> = cmd.accumulated_output.lines().collect();
    let skip = if expanded {
        0
    } else {
        lines.len().saturating_sub(COLLAPSED_OUTPUT_LINES)
    };
    if skip > 0 {
        let _ = writeln!(out, "{INDENT}... {skip} more line(s)");
    }
    wrap_into(out, &lines[skip..].join("\n"), width, INDENT);
}

fn render_api_call(out: &mut String, call: &ApiCallEntry, show_cache: bool) {
    let mut status = Vec::new();
    if call.retried {
        status.push("retried");
    }
    if call.in_flight() {
        status.push("in flight");
    }
    let status = if status.is_empty() {
        String::new()
    } else {
        format!(" ({})", status.join(", "))
    };
    let usage = &call.usage;
    let _ = write!(
        out,
        "[{}] API request{status}: in {} / out {}",
        call.started_at,
        unknown_or(usage.tokens_in),
        unknown_or(usage.tokens_out),
    );
    if show_cache {
        let _ = write!(
            out,
            " / cache +{} ~{}",
            unknown_or(usage.cache_writes),
            unknown_or(usage.cache_reads)
        );
    }
    let cost = usage
        .cost_usd
        .map_or_else(|| "?".to_string(), |c| format!("${c:.4}"));
    let _ = writeln!(out, " / {cost}");
}

/// Render everything a surface would show
#[must_use]
pub fn render_text(surface: &ChatSurface, width: usize) -> String {
    let view = surface.view();
    let model = surface.model();
    let mut out = String::new();

    if let Some(task) = &view.task {
        out.push_str("Task:\n");
        wrap_into(&mut out, task.text(), width, INDENT);
        let metrics = &view.metrics;
        let _ = write!(
            out,
            "Tokens: in {} / out {}",
            metrics.total_tokens_in, metrics.total_tokens_out
        );
        if model.supports_prompt_cache {
            let _ = write!(
                out,
                " | Cache: +{} ~{}",
                metrics.total_cache_writes, metrics.total_cache_reads
            );
        }
        let _ = writeln!(
            out,
            " | Cost: {} | Requests: {} ({} left)",
            metrics.format_cost(),
            metrics.request_count,
            surface.requests_remaining()
        );
        out.push_str(&"-".repeat(width.min(80)));
        out.push('\n');
    }

    for entry in view.visible_entries() {
        match entry {
            FoldedEntry::Passthrough(event) => render_event(&mut out, event, width),
            FoldedEntry::Command(cmd) => render_command(
                &mut out,
                cmd,
                surface.is_expanded(cmd.started_at),
                width,
            ),
            FoldedEntry::ApiCall(call) => {
                render_api_call(&mut out, call, model.supports_prompt_cache);
            }
        }
    }

    let input = surface.input_view();
    out.push('\n');
    let prompt = if input.text.is_empty() {
        input.placeholder
    } else {
        input.text.as_str()
    };
    let state = if input.input_enabled { "" } else { " (disabled)" };
    let _ = writeln!(out, "> {prompt}{state}");
    let buttons: Vec<String> = [input.primary_label, input.secondary_label]
        .into_iter()
        .flatten()
        .map(|label| {
            if input.buttons_enabled {
                format!("[{label}]")
            } else {
                format!("[{label} (disabled)]")
            }
        })
        .collect();
    if !buttons.is_empty() {
        let _ = writeln!(out, "{}", buttons.join(" "));
    }
    if !input.attachments.is_empty() {
        let _ = writeln!(out, "{} image(s) attached", input.attachments.len());
    }
    let attach = if input.attachments_enabled { "on" } else { "off" };
    let _ = writeln!(out, "model: {} | images: {attach}", model.id);
    out
}

/// Machine-readable snapshot of the surface
///
/// # Errors
///
/// Fails only if a value cannot be represented as JSON.
pub fn render_json(surface: &ChatSurface) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::json!({
        "view": serde_json::to_value(surface.view())?,
        "input": serde_json::to_value(surface.input_view())?,
        "model": surface.model().id,
        "requests_remaining": surface.requests_remaining(),
    }))
}
