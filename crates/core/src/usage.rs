// crates/core/src/usage.rs
//! Token usage quadruple shared by session totals, per-record usage and
//! sub-agent completions.

use serde::{Deserialize, Deserializer, Serialize};

/// Four additive token counters.
///
/// Deserializes from the Anthropic API `usage` object
/// (`input_tokens`, `output_tokens`, `cache_read_input_tokens`,
/// `cache_creation_input_tokens`) as well as from its own camelCase
/// serialization. Missing or `null` counters read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Usage {
    #[serde(default, alias = "inputTokens", deserialize_with = "count_or_zero")]
    pub input_tokens: u64,
    #[serde(default, alias = "outputTokens", deserialize_with = "count_or_zero")]
    pub output_tokens: u64,
    #[serde(
        default,
        alias = "cache_read_input_tokens",
        alias = "cacheReadTokens",
        deserialize_with = "count_or_zero"
    )]
    pub cache_read_tokens: u64,
    #[serde(
        default,
        alias = "cache_creation_input_tokens",
        alias = "cache_creation_tokens",
        alias = "cacheWriteTokens",
        deserialize_with = "count_or_zero"
    )]
    pub cache_write_tokens: u64,
}

impl Usage {
    pub fn new(input: u64, output: u64, cache_read: u64, cache_write: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
            cache_read_tokens: cache_read,
            cache_write_tokens: cache_write,
        }
    }

    /// Add another quadruple into this one. Saturates instead of wrapping.
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(other.cache_read_tokens);
        self.cache_write_tokens = self
            .cache_write_tokens
            .saturating_add(other.cache_write_tokens);
    }

    /// Tokens that occupy the context window: input plus both cache counters.
    /// This is the quantity compared against a long-context threshold.
    pub fn context_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.cache_read_tokens)
            .saturating_add(self.cache_write_tokens)
    }

    pub fn total(&self) -> u64 {
        self.context_tokens().saturating_add(self.output_tokens)
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

fn count_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}
