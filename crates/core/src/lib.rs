// crates/core/src/lib.rs
pub mod accumulator;
pub mod config;
pub mod error;
pub mod ingest;
pub mod invocation;
pub mod metrics;
pub mod parser;
pub mod pricing;
pub mod record;
pub mod scanner;
pub mod store;
pub mod subagent;
pub mod types;
pub mod usage;

pub use config::EngineConfig;
pub use error::*;
pub use ingest::{apply_pricing, ingest_transcript};
pub use metrics::DerivedMetrics;
pub use parser::{parse_reader, parse_transcript, ParseOptions};
pub use pricing::{calculate_cost, AppliedRates, CostEstimate, ModelPricing, PricingCatalog, PricingTier};
pub use store::{MemoryStore, SessionRecord, SessionStore};
pub use subagent::FallbackPolicy;
pub use types::*;
pub use usage::Usage;
