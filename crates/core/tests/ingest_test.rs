//! End-to-end ingest: parse, price and persist through a `SessionStore`.

use std::io::Write;
use std::path::{Path, PathBuf};

use agent_tally_core::{
    ingest_transcript, CommandRecord, EngineConfig, FileOperationSummary, IngestError,
    MemoryStore, ParseError, ParseOptions, PricingCatalog, SessionMetrics, SessionRecord,
    SessionStore, SubagentUsageRecord, ToolInvocationSummary,
};

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn test_ingest_persists_every_entity() {
    let config = EngineConfig::default();
    let mut store = MemoryStore::new();
    let path = fixtures_path().join("subagents.jsonl");

    let parsed = ingest_transcript(
        &path,
        "session-1",
        &config.parse_options(),
        &config.catalog(),
        &mut store,
    )
    .unwrap();

    let stored = store.get("session-1").unwrap();
    let session = stored.session.as_ref().unwrap();
    assert_eq!(session.session_key, "session-1");
    assert_eq!(session.transcript_path, path);
    assert_eq!(session.model.as_deref(), Some("claude-opus-4-6"));
    assert_eq!(session.started_at, parsed.started_at);

    let metrics = stored.metrics.as_ref().unwrap();
    assert_eq!(metrics, &parsed.metrics);
    assert!(metrics.cost_usd.is_some());
    assert!(metrics.rates.is_some());

    assert_eq!(stored.tools, parsed.tools);
    assert_eq!(stored.subagents.len(), 2);
    assert!(stored.subagents.iter().all(|s| s.cost_usd.is_some()));
    assert!(stored.commands.is_empty());
    assert!(stored.file_operations.is_empty());
}

#[test]
fn test_ingest_parse_failure_persists_nothing() {
    let mut store = MemoryStore::new();
    let err = ingest_transcript(
        Path::new("/nonexistent/session.jsonl"),
        "missing",
        &ParseOptions::default(),
        &PricingCatalog::builtin(),
        &mut store,
    )
    .unwrap_err();

    assert!(matches!(err, IngestError::Parse(ParseError::NotFound { .. })));
    assert!(store.is_empty());
}

#[test]
fn test_ingest_unpriced_model_still_persists() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"type":"user","message":{{"role":"user","content":"hi"}}}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"type":"assistant","message":{{"role":"assistant","model":"local-llama","content":"hello","usage":{{"input_tokens":7,"output_tokens":3}}}}}}"#
    )
    .unwrap();

    let mut store = MemoryStore::new();
    ingest_transcript(
        file.path(),
        "local",
        &ParseOptions::default(),
        &PricingCatalog::builtin(),
        &mut store,
    )
    .unwrap();

    let metrics = store.get("local").unwrap().metrics.as_ref().unwrap();
    assert_eq!(metrics.turn_count, 1);
    assert_eq!(metrics.usage.total(), 10);
    assert!(metrics.cost_usd.is_none());
}

// ============================================================================
// Store failures
// ============================================================================

#[derive(Debug, thiserror::Error)]
#[error("disk full")]
struct DiskFull;

/// Accepts the session row, then fails on the first batch write.
#[derive(Default)]
struct FailingStore {
    calls: Vec<&'static str>,
}

impl SessionStore for FailingStore {
    type Error = DiskFull;

    fn create_session(&mut self, _: &SessionRecord) -> Result<(), DiskFull> {
        self.calls.push("session");
        Ok(())
    }

    fn create_session_metrics(&mut self, _: &str, _: &SessionMetrics) -> Result<(), DiskFull> {
        self.calls.push("metrics");
        Ok(())
    }

    fn create_tools(&mut self, _: &str, _: &[ToolInvocationSummary]) -> Result<(), DiskFull> {
        self.calls.push("tools");
        Err(DiskFull)
    }

    fn create_file_operations(
        &mut self,
        _: &str,
        _: &[FileOperationSummary],
    ) -> Result<(), DiskFull> {
        self.calls.push("files");
        Ok(())
    }

    fn create_commands(&mut self, _: &str, _: &[CommandRecord]) -> Result<(), DiskFull> {
        self.calls.push("commands");
        Ok(())
    }

    fn create_subagents(&mut self, _: &str, _: &[SubagentUsageRecord]) -> Result<(), DiskFull> {
        self.calls.push("subagents");
        Ok(())
    }
}

#[test]
fn test_store_failure_stops_ingest() {
    let mut store = FailingStore::default();
    let err = ingest_transcript(
        &fixtures_path().join("simple.jsonl"),
        "s-simple",
        &ParseOptions::default(),
        &PricingCatalog::builtin(),
        &mut store,
    )
    .unwrap_err();

    match err {
        IngestError::Store { session_key, source } => {
            assert_eq!(session_key, "s-simple");
            assert_eq!(source.to_string(), "disk full");
        }
        other => panic!("expected Store error, got {other:?}"),
    }
    assert_eq!(store.calls, vec!["session", "metrics", "tools"]);
}
