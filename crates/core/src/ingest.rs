// crates/core/src/ingest.rs
//! Caller-side orchestration: parse, price, persist.

use std::path::Path;

use tracing::{debug, info};

use crate::error::IngestError;
use crate::parser::{parse_transcript, ParseOptions};
use crate::pricing::{calculate_cost, PricingCatalog};
use crate::store::{SessionRecord, SessionStore};
use crate::types::ParsedTranscript;

/// Price a parsed transcript in place.
///
/// The session is priced against its detected model (exact match, then the
/// catalog default). Each sub-agent is priced against its own model override
/// when that has an exact catalog entry, otherwise against the session's
/// pricing. Entries without any pricing keep `cost_usd = None`.
///
/// Returns `true` if the session itself was priced.
pub fn apply_pricing(parsed: &mut ParsedTranscript, catalog: &PricingCatalog) -> bool {
    let session_pricing = catalog.resolve(parsed.model.as_deref());

    match session_pricing {
        Some(pricing) => {
            let estimate = calculate_cost(pricing, &parsed.metrics.usage);
            parsed.metrics.cost_usd = Some(estimate.amount_usd);
            parsed.metrics.rates = Some(estimate.rates);
        }
        None => {
            debug!(model = ?parsed.model, "No pricing entry for session model");
            parsed.metrics.cost_usd = None;
            parsed.metrics.rates = None;
        }
    }

    for subagent in &mut parsed.subagents {
        let pricing = subagent
            .model
            .as_deref()
            .and_then(|id| catalog.get(id))
            .or(session_pricing);
        subagent.cost_usd = pricing.map(|p| calculate_cost(p, &subagent.usage).amount_usd);
    }

    session_pricing.is_some()
}

/// Parse one transcript, price it and persist every entity under
/// `session_key`.
///
/// A parse failure persists nothing. A store failure stops at the failing
/// call; earlier writes are not rolled back, that is the store's concern.
pub fn ingest_transcript<S: SessionStore>(
    path: &Path,
    session_key: &str,
    options: &ParseOptions,
    catalog: &PricingCatalog,
    store: &mut S,
) -> Result<ParsedTranscript, IngestError> {
    let mut parsed = parse_transcript(path, options)?;
    apply_pricing(&mut parsed, catalog);

    let session = SessionRecord {
        session_key: session_key.to_string(),
        transcript_path: path.to_path_buf(),
        started_at: parsed.started_at,
        ended_at: parsed.ended_at,
        model: parsed.model.clone(),
    };

    let store_err = |e: S::Error| IngestError::Store {
        session_key: session_key.to_string(),
        source: Box::new(e),
    };
    store.create_session(&session).map_err(store_err)?;
    store
        .create_session_metrics(session_key, &parsed.metrics)
        .map_err(store_err)?;
    store
        .create_tools(session_key, &parsed.tools)
        .map_err(store_err)?;
    store
        .create_file_operations(session_key, &parsed.file_operations)
        .map_err(store_err)?;
    store
        .create_commands(session_key, &parsed.commands)
        .map_err(store_err)?;
    store
        .create_subagents(session_key, &parsed.subagents)
        .map_err(store_err)?;

    info!(
        session_key,
        tools = parsed.tools.len(),
        files = parsed.file_operations.len(),
        commands = parsed.commands.len(),
        subagents = parsed.subagents.len(),
        cost_usd = parsed.metrics.cost_usd,
        "Ingested transcript"
    );

    Ok(parsed)
}
