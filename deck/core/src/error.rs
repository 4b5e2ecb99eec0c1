//! Error Types
//!
//! Errors surfaced by the deck core. Most failure modes in this crate are
//! recovered locally (malformed bookkeeping payloads, failed attachment reads);
//! the types here cover the few places where a caller has to decide what to do:
//! decoding the raw event log and loading configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::events::SequenceId;

/// Errors raised while decoding or appending agent events
#[derive(Debug, Error)]
pub enum EventError {
    /// The `kind` field was neither a request nor a notice
    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),

    /// A request event without `request_kind`, or a notice without `notice_kind`
    #[error("event {sequence_id} is a {kind} but has no {field}")]
    MissingKindField {
        /// Offending event
        sequence_id: u64,
        /// The declared event kind
        kind: &'static str,
        /// The field that should have been present
        field: &'static str,
    },

    /// A request carrying `notice_kind`, or a notice carrying `request_kind`
    #[error("event {sequence_id} is a {kind} but also carries {field}")]
    UnexpectedKindField {
        /// Offending event
        sequence_id: u64,
        /// The declared event kind
        kind: &'static str,
        /// The field that should have been absent
        field: &'static str,
    },

    /// Append would break the strictly increasing sequence order
    #[error("sequence conflict: expected an id after {last}, got {actual}")]
    OutOfOrder {
        /// Last sequence id in the log
        last: SequenceId,
        /// Sequence id that was rejected
        actual: SequenceId,
    },

    /// A JSONL line could not be decoded
    #[error("failed to decode event on line {line}: {source}")]
    Decode {
        /// 1-based line number
        line: usize,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Reading the log failed
    #[error("failed to read event log: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
