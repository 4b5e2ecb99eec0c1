//! Usage and cost metrics over folded entries

use serde::Serialize;

use crate::fold::FoldedEntry;

/// Running totals across every API call in a snapshot
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ApiMetrics {
    /// Sum of input tokens
    pub total_tokens_in: u64,
    /// Sum of output tokens
    pub total_tokens_out: u64,
    /// Sum of prompt-cache writes
    pub total_cache_writes: u64,
    /// Sum of prompt-cache reads
    pub total_cache_reads: u64,
    /// Sum of cost in US dollars
    pub total_cost: f64,
    /// Number of API calls, in flight included
    pub request_count: usize,
}

impl ApiMetrics {
    /// Sum usage over all API calls. Unknown fields count as zero.
    #[must_use]
    pub fn aggregate(entries: &[FoldedEntry]) -> Self {
        entries
            .iter()
            .filter_map(|entry| match entry {
                FoldedEntry::ApiCall(call) => Some(&call.usage),
                _ => None,
            })
            .fold(Self::default(), |mut acc, usage| {
                acc.total_tokens_in += usage.tokens_in.unwrap_or(0);
                acc.total_tokens_out += usage.tokens_out.unwrap_or(0);
                acc.total_cache_writes += usage.cache_writes.unwrap_or(0);
                acc.total_cache_reads += usage.cache_reads.unwrap_or(0);
                acc.total_cost += usage.cost_usd.unwrap_or(0.0);
                acc.request_count += 1;
                acc
            })
    }

    /// Cost as dollars with four decimals, e.g. `$0.0123`
    #[must_use]
    pub fn format_cost(&self) -> String {
        format!("${:.4}", self.total_cost)
    }

    /// Requests left before hitting a per-task budget
    #[must_use]
    pub fn requests_remaining(&self, max_requests: usize) -> usize {
        max_requests.saturating_sub(self.request_count)
    }

    /// Whether anything has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.request_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AgentEvent, NoticeKind};
    use crate::fold::fold_events;

    #[test]
    fn test_partial_usage() {
        let events = vec![
            AgentEvent::notice(1, NoticeKind::RequestStarted, "{}"),
            AgentEvent::notice(2, NoticeKind::RequestFinished, r#"{"tokensIn":10}"#),
            AgentEvent::notice(3, NoticeKind::RequestStarted, "{}"),
            AgentEvent::notice(4, NoticeKind::RequestFinished, r#"{"tokensOut":5}"#),
        ];
        let metrics = ApiMetrics::aggregate(&fold_events(&events));
        assert_eq!(metrics.total_tokens_in, 10);
        assert_eq!(metrics.total_tokens_out, 5);
        assert_eq!(metrics.total_cache_writes, 0);
        assert_eq!(metrics.total_cost, 0.0);
        assert_eq!(metrics.request_count, 2);
    }

    #[test]
    fn test_partial_usage_across_calls() {
        let events = vec![
            AgentEvent::notice(1, NoticeKind::RequestStarted, "{}"),
            AgentEvent::notice(
                2,
                NoticeKind::RequestFinished,
                r#"{"tokensIn":100,"tokensOut":50,"costUsd":0.01}"#,
            ),
            AgentEvent::notice(3, NoticeKind::RequestStarted, "{}"),
            AgentEvent::notice(4, NoticeKind::RequestFinished, r#"{"tokensIn":20}"#),
        ];
        let metrics = ApiMetrics::aggregate(&fold_events(&events));
        assert_eq!(metrics.total_tokens_in, 120);
        assert_eq!(metrics.total_tokens_out, 50);
        assert_eq!(metrics.total_cache_writes, 0);
        assert_eq!(metrics.total_cache_reads, 0);
        assert!((metrics.total_cost - 0.01).abs() < 1e-12);
        assert_eq!(metrics.request_count, 2);
    }

    #[test]
    fn test_in_flight_counts() {
        let events = vec![AgentEvent::notice(1, NoticeKind::RequestStarted, "{}")];
        let metrics = ApiMetrics::aggregate(&fold_events(&events));
        assert_eq!(metrics.request_count, 1);
        assert_eq!(metrics.total_tokens_in, 0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let entries = fold_events(&[
            AgentEvent::notice(1, NoticeKind::RequestStarted, "{}"),
            AgentEvent::notice(2, NoticeKind::RequestFinished, r#"{"cost":0.25}"#),
        ]);
        assert_eq!(
            ApiMetrics::aggregate(&entries),
            ApiMetrics::aggregate(&entries)
        );
    }

    #[test]
    fn test_format_cost() {
        let metrics = ApiMetrics {
            total_cost: 0.012_34,
            ..Default::default()
        };
        assert_eq!(metrics.format_cost(), "$0.0123");
        assert_eq!(ApiMetrics::default().format_cost(), "$0.0000");
    }

    #[test]
    fn test_requests_remaining() {
        let metrics = ApiMetrics {
            request_count: 3,
            ..Default::default()
        };
        assert_eq!(metrics.requests_remaining(20), 17);
        assert_eq!(metrics.requests_remaining(2), 0);
    }
}
