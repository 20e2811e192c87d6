// crates/core/src/metrics.rs
//! Derived metrics computed on read from a parsed transcript.
//!
//! Every ratio is defined as `0.0` when its divisor is zero, so callers can
//! render or sum them without special-casing empty sessions.

use serde::Serialize;

use crate::types::{ParsedTranscript, SessionMetrics};

/// Total tokens across all four counters, sub-agent usage included.
pub fn total_tokens(metrics: &SessionMetrics) -> u64 {
    metrics.usage.total()
}

/// Cache Hit Ratio
///
/// Formula: cache_read / (input + cache_read + cache_write)
///
/// Share of context tokens served from the prompt cache. Range 0.0 to 1.0.
pub fn cache_hit_ratio(metrics: &SessionMetrics) -> f64 {
    ratio(
        metrics.usage.cache_read_tokens as f64,
        metrics.usage.context_tokens() as f64,
    )
}

/// Average Tokens Per Turn
///
/// Formula: total_tokens / turn_count
pub fn average_tokens_per_turn(metrics: &SessionMetrics) -> f64 {
    ratio(total_tokens(metrics) as f64, metrics.turn_count as f64)
}

/// Cost Per Turn
///
/// Formula: cost_usd / turn_count
///
/// An unpriced session has no cost, which counts as zero here.
pub fn cost_per_turn(metrics: &SessionMetrics) -> f64 {
    ratio(metrics.cost_usd.unwrap_or(0.0), metrics.turn_count as f64)
}

/// Sub-agent Token Share
///
/// Formula: sum(sub-agent total tokens) / session total tokens
///
/// Session totals already include sub-agent usage, so the result is at most 1.0.
pub fn subagent_token_share(parsed: &ParsedTranscript) -> f64 {
    let subagent_tokens: u64 = parsed.subagents.iter().map(|s| s.usage.total()).sum();
    ratio(subagent_tokens as f64, total_tokens(&parsed.metrics) as f64)
}

/// Zero when `denominator` is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// All derived metrics of one transcript, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub total_tokens: u64,
    pub cache_hit_ratio: f64,
    pub average_tokens_per_turn: f64,
    pub cost_per_turn: f64,
    pub subagent_token_share: f64,
    pub duration_secs: i64,
}

impl DerivedMetrics {
    pub fn from_transcript(parsed: &ParsedTranscript) -> Self {
        let m = &parsed.metrics;
        Self {
            total_tokens: total_tokens(m),
            cache_hit_ratio: cache_hit_ratio(m),
            average_tokens_per_turn: average_tokens_per_turn(m),
            cost_per_turn: cost_per_turn(m),
            subagent_token_share: subagent_token_share(parsed),
            duration_secs: parsed.duration_secs(),
        }
    }
}

/// Round to 2 decimal places for display. Calculations keep full precision.
pub fn round_for_display(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
