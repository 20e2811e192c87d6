//! Pricing resolver for session cost estimates.
//!
//! Single source of truth for:
//! - `ModelPricing` (per-model rates in USD per million tokens)
//! - `calculate_cost()` with long-context tier selection
//! - `PricingCatalog` with exact → configured-default resolution
//! - Built-in defaults for offline use

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::usage::Usage;

/// Cache read rate as a fraction of the input rate, when not configured.
pub const CACHE_READ_MULTIPLIER: f64 = 0.1;
/// Cache write rate as a multiple of the input rate, when not configured.
pub const CACHE_WRITE_MULTIPLIER: f64 = 1.25;

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub input_per_million: f64,
    pub output_per_million: f64,
    /// Defaults to `input × 0.1` when unset.
    #[serde(default)]
    pub cache_read_per_million: Option<f64>,
    /// Defaults to `input × 1.25` when unset.
    #[serde(default)]
    pub cache_write_per_million: Option<f64>,
    /// Context size (input + cache tokens) above which long-context rates apply.
    #[serde(default)]
    pub long_context_threshold: Option<u64>,
    #[serde(default)]
    pub long_context_input_per_million: Option<f64>,
    #[serde(default)]
    pub long_context_output_per_million: Option<f64>,
    /// If unset, the standard cache rate is scaled by the long/standard input ratio.
    #[serde(default)]
    pub long_context_cache_read_per_million: Option<f64>,
    #[serde(default)]
    pub long_context_cache_write_per_million: Option<f64>,
}

impl ModelPricing {
    pub fn new(id: impl Into<String>, input: f64, output: f64) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            input_per_million: input,
            output_per_million: output,
            cache_read_per_million: None,
            cache_write_per_million: None,
            long_context_threshold: None,
            long_context_input_per_million: None,
            long_context_output_per_million: None,
            long_context_cache_read_per_million: None,
            long_context_cache_write_per_million: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_cache(mut self, read: f64, write: f64) -> Self {
        self.cache_read_per_million = Some(read);
        self.cache_write_per_million = Some(write);
        self
    }

    pub fn with_long_context(mut self, threshold: u64, input: f64, output: f64) -> Self {
        self.long_context_threshold = Some(threshold);
        self.long_context_input_per_million = Some(input);
        self.long_context_output_per_million = Some(output);
        self
    }

    pub fn standard_cache_read(&self) -> f64 {
        self.cache_read_per_million
            .unwrap_or(self.input_per_million * CACHE_READ_MULTIPLIER)
    }

    pub fn standard_cache_write(&self) -> f64 {
        self.cache_write_per_million
            .unwrap_or(self.input_per_million * CACHE_WRITE_MULTIPLIER)
    }

    fn has_long_context_rates(&self) -> bool {
        self.long_context_input_per_million.is_some()
            || self.long_context_output_per_million.is_some()
    }

    /// Reject rates that are negative, NaN or infinite.
    pub fn validate(&self) -> Result<(), String> {
        let rates = [
            ("input_per_million", Some(self.input_per_million)),
            ("output_per_million", Some(self.output_per_million)),
            ("cache_read_per_million", self.cache_read_per_million),
            ("cache_write_per_million", self.cache_write_per_million),
            ("long_context_input_per_million", self.long_context_input_per_million),
            ("long_context_output_per_million", self.long_context_output_per_million),
            ("long_context_cache_read_per_million", self.long_context_cache_read_per_million),
            ("long_context_cache_write_per_million", self.long_context_cache_write_per_million),
        ];
        for (field, rate) in rates {
            if let Some(r) = rate {
                if !r.is_finite() || r < 0.0 {
                    return Err(format!("model {}: {} must be a non-negative number, got {}", self.id, field, r));
                }
            }
        }
        Ok(())
    }
}

/// Which rate tier produced a cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingTier {
    Standard,
    LongContext,
}

/// The four effective rates (USD per million tokens) actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRates {
    pub tier: PricingTier,
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cache_read_per_million: f64,
    pub cache_write_per_million: f64,
}

/// Result of pricing one usage quadruple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub amount_usd: f64,
    pub rates: AppliedRates,
}

/// Price a usage quadruple.
///
/// Input and both cache counters count toward the long-context threshold.
/// Once it is exceeded, long-context input/output rates replace the standard
/// ones for *all* tokens, and cache rates without an explicit long-context
/// value are scaled by the same factor as the input rate.
pub fn calculate_cost(pricing: &ModelPricing, usage: &Usage) -> CostEstimate {
    let over_threshold = pricing
        .long_context_threshold
        .is_some_and(|threshold| usage.context_tokens() > threshold);
    let long_context = over_threshold && pricing.has_long_context_rates();

    let rates = if long_context {
        let input = pricing
            .long_context_input_per_million
            .unwrap_or(pricing.input_per_million);
        let scale = safe_ratio(input, pricing.input_per_million);
        AppliedRates {
            tier: PricingTier::LongContext,
            input_per_million: input,
            output_per_million: pricing
                .long_context_output_per_million
                .unwrap_or(pricing.output_per_million),
            cache_read_per_million: pricing
                .long_context_cache_read_per_million
                .unwrap_or(pricing.standard_cache_read() * scale),
            cache_write_per_million: pricing
                .long_context_cache_write_per_million
                .unwrap_or(pricing.standard_cache_write() * scale),
        }
    } else {
        AppliedRates {
            tier: PricingTier::Standard,
            input_per_million: pricing.input_per_million,
            output_per_million: pricing.output_per_million,
            cache_read_per_million: pricing.standard_cache_read(),
            cache_write_per_million: pricing.standard_cache_write(),
        }
    };

    let amount_usd = per_million(rates.input_per_million, usage.input_tokens)
        + per_million(rates.output_per_million, usage.output_tokens)
        + per_million(rates.cache_read_per_million, usage.cache_read_tokens)
        + per_million(rates.cache_write_per_million, usage.cache_write_tokens);

    CostEstimate { amount_usd, rates }
}

fn per_million(rate: f64, tokens: u64) -> f64 {
    rate * tokens as f64 / 1_000_000.0
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Pricing entries keyed by model id, with an optional default entry used
/// when a model id has no exact match.
#[derive(Debug, Clone, Default)]
pub struct PricingCatalog {
    models: HashMap<String, ModelPricing>,
    default_model: Option<String>,
}

impl PricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded with [`default_pricing`]. No default entry is set.
    pub fn builtin() -> Self {
        Self {
            models: default_pricing(),
            default_model: None,
        }
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, pricing: ModelPricing) {
        self.models.insert(pricing.id.clone(), pricing);
    }

    pub fn set_default_model(&mut self, model_id: Option<String>) {
        self.default_model = model_id;
    }

    pub fn with_default_model(mut self, model_id: impl Into<String>) -> Self {
        self.default_model = Some(model_id.into());
        self
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelPricing> {
        self.models.get(model_id)
    }

    /// Exact match on `model_id`, then the default entry, then nothing.
    pub fn resolve(&self, model_id: Option<&str>) -> Option<&ModelPricing> {
        model_id
            .and_then(|id| self.models.get(id))
            .or_else(|| self.default_model.as_deref().and_then(|id| self.models.get(id)))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Anthropic pricing table for offline use (USD per million tokens).
///
/// Cache multipliers follow the published convention:
///   - cache write = 1.25x base input
///   - cache read  = 0.10x base input
pub fn default_pricing() -> HashMap<String, ModelPricing> {
    const LONG_CONTEXT_THRESHOLD: u64 = 200_000;

    let entries = [
        // Current generation
        ModelPricing::new("claude-opus-4-6", 5.0, 25.0)
            .with_display_name("Claude Opus 4.6")
            .with_cache(0.5, 6.25)
            .with_long_context(LONG_CONTEXT_THRESHOLD, 10.0, 37.5),
        ModelPricing::new("claude-sonnet-4-6", 3.0, 15.0)
            .with_display_name("Claude Sonnet 4.6")
            .with_cache(0.3, 3.75)
            .with_long_context(LONG_CONTEXT_THRESHOLD, 6.0, 22.5),
        ModelPricing::new("claude-sonnet-4-5-20250929", 3.0, 15.0)
            .with_display_name("Claude Sonnet 4.5")
            .with_cache(0.3, 3.75)
            .with_long_context(LONG_CONTEXT_THRESHOLD, 6.0, 22.5),
        ModelPricing::new("claude-haiku-4-5-20251001", 1.0, 5.0)
            .with_display_name("Claude Haiku 4.5")
            .with_cache(0.1, 1.25),
        // Legacy
        ModelPricing::new("claude-opus-4-5-20251101", 5.0, 25.0)
            .with_display_name("Claude Opus 4.5")
            .with_cache(0.5, 6.25),
        ModelPricing::new("claude-opus-4-1-20250805", 15.0, 75.0)
            .with_display_name("Claude Opus 4.1")
            .with_cache(1.5, 18.75),
        ModelPricing::new("claude-opus-4-20250514", 15.0, 75.0)
            .with_display_name("Claude Opus 4")
            .with_cache(1.5, 18.75),
        ModelPricing::new("claude-sonnet-4-20250514", 3.0, 15.0)
            .with_display_name("Claude Sonnet 4")
            .with_cache(0.3, 3.75)
            .with_long_context(LONG_CONTEXT_THRESHOLD, 6.0, 22.5),
        ModelPricing::new("claude-3-7-sonnet-20250219", 3.0, 15.0)
            .with_display_name("Claude Sonnet 3.7")
            .with_cache(0.3, 3.75),
        ModelPricing::new("claude-3-5-haiku-20241022", 0.8, 4.0)
            .with_display_name("Claude Haiku 3.5")
            .with_cache(0.08, 1.0),
    ];

    entries.into_iter().map(|p| (p.id.clone(), p)).collect()
}
