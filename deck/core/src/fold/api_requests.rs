//! API-request folding
//!
//! Pairs each `request_started` notice with the terminal notice that follows
//! it. Unrelated entries may sit between the two and keep their place.
//! Payloads are JSON carried in the event text; anything that fails to decode
//! is logged and replaced with an empty value so the fold never fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{ApiCallEntry, FoldedEntry};
use crate::events::{AgentEvent, NoticeKind};

/// Token and cost figures reported for one API call. `None` means unknown.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUsage {
    /// Input tokens
    #[serde(default)]
    pub tokens_in: Option<u64>,
    /// Output tokens
    #[serde(default)]
    pub tokens_out: Option<u64>,
    /// Prompt-cache write tokens
    #[serde(default)]
    pub cache_writes: Option<u64>,
    /// Prompt-cache read tokens
    #[serde(default)]
    pub cache_reads: Option<u64>,
    /// Cost in US dollars
    #[serde(default, rename = "cost", alias = "costUsd")]
    pub cost_usd: Option<f64>,
}

impl ApiUsage {
    /// Decode usage from a terminal notice's text, tolerating garbage
    ///
    /// Each field is read on its own: a wrong-typed field becomes unknown
    /// without discarding the others.
    #[must_use]
    pub fn from_notice(event: &AgentEvent) -> Self {
        let Some(text) = event.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Self::default();
        };
        let fields = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                warn!(
                    sequence_id = %event.sequence_id,
                    "usage payload is not a JSON object, treating as unknown"
                );
                return Self::default();
            }
            Err(err) => {
                warn!(
                    sequence_id = %event.sequence_id,
                    error = %err,
                    "malformed usage payload, treating as unknown"
                );
                return Self::default();
            }
        };

        let count = |key: &str| {
            let value = fields.get(key).filter(|v| !v.is_null())?;
            let parsed = as_count(value);
            if parsed.is_none() {
                warn!(sequence_id = %event.sequence_id, field = key, %value, "ignoring usage field");
            }
            parsed
        };
        let cost = ["cost", "costUsd"]
            .into_iter()
            .find_map(|key| fields.get(key).filter(|v| !v.is_null()).map(|v| (key, v)))
            .and_then(|(key, value)| {
                let parsed = value.as_f64();
                if parsed.is_none() {
                    warn!(sequence_id = %event.sequence_id, field = key, %value, "ignoring usage field");
                }
                parsed
            });

        Self {
            tokens_in: count("tokensIn"),
            tokens_out: count("tokensOut"),
            cache_writes: count("cacheWrites"),
            cache_reads: count("cacheReads"),
            cost_usd: cost,
        }
    }
}

/// Non-negative integer, also accepting integral floats such as `100.0`
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && (0.0..=u64::MAX as f64).contains(f))
            .map(|f| f as u64)
    })
}

fn decode_request(event: &AgentEvent) -> Value {
    let empty = || Value::Object(serde_json::Map::new());
    let Some(text) = event.text.as_deref().filter(|t| !t.trim().is_empty()) else {
        return empty();
    };
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            warn!(
                sequence_id = %event.sequence_id,
                "request payload is not a JSON object, ignoring"
            );
            empty()
        }
        Err(err) => {
            warn!(
                sequence_id = %event.sequence_id,
                error = %err,
                "malformed request payload, ignoring"
            );
            empty()
        }
    }
}

/// Second folding pass: merge API request bookkeeping
#[must_use]
pub fn fold_api_requests(entries: Vec<FoldedEntry>) -> Vec<FoldedEntry> {
    let mut out = Vec::with_capacity(entries.len());
    // Index in `out` of the call awaiting its terminal notice
    let mut open: Option<usize> = None;

    for entry in entries {
        let notice = entry.as_event().and_then(AgentEvent::notice_kind).cloned();
        match notice {
            Some(NoticeKind::RequestStarted) => {
                let Some(event) = entry.as_event() else {
                    continue;
                };
                out.push(FoldedEntry::ApiCall(ApiCallEntry {
                    started_at: event.sequence_id,
                    request: decode_request(event),
                    usage: ApiUsage::default(),
                    retried: false,
                    finished: false,
                }));
                // The previous call, if any, stays in flight
                open = Some(out.len() - 1);
            }
            Some(NoticeKind::RequestRetried) => match open_call(&mut out, open) {
                Some(call) => call.retried = true,
                None => out.push(entry),
            },
            Some(NoticeKind::RequestFinished) => match open_call(&mut out, open) {
                Some(call) => {
                    if let Some(event) = entry.as_event() {
                        call.usage = ApiUsage::from_notice(event);
                    }
                    call.finished = true;
                    open = None;
                }
                None => out.push(entry),
            },
            _ => out.push(entry),
        }
    }

    out
}

fn open_call(out: &mut [FoldedEntry], open: Option<usize>) -> Option<&mut ApiCallEntry> {
    match out.get_mut(open?) {
        Some(FoldedEntry::ApiCall(call)) => Some(call),
        _ => None,
    }
}
