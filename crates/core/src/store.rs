// crates/core/src/store.rs
//! Persistence boundary for parsed transcripts.
//!
//! The engine never talks to storage directly. [`ingest_transcript`] hands the
//! parsed entities to a [`SessionStore`] implementation, one call per entity
//! kind. [`MemoryStore`] keeps everything in a map, keyed by session key.
//!
//! [`ingest_transcript`]: crate::ingest::ingest_transcript

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{
    CommandRecord, FileOperationSummary, SessionMetrics, SubagentUsageRecord,
    ToolInvocationSummary,
};

/// Session row handed to [`SessionStore::create_session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_key: String,
    pub transcript_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Write side of a session repository.
///
/// Every method receives the session key the entities belong to. Batch
/// methods may be called with an empty slice.
pub trait SessionStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_session(&mut self, session: &SessionRecord) -> Result<(), Self::Error>;

    fn create_session_metrics(
        &mut self,
        session_key: &str,
        metrics: &SessionMetrics,
    ) -> Result<(), Self::Error>;

    fn create_tools(
        &mut self,
        session_key: &str,
        tools: &[ToolInvocationSummary],
    ) -> Result<(), Self::Error>;

    fn create_file_operations(
        &mut self,
        session_key: &str,
        operations: &[FileOperationSummary],
    ) -> Result<(), Self::Error>;

    fn create_commands(
        &mut self,
        session_key: &str,
        commands: &[CommandRecord],
    ) -> Result<(), Self::Error>;

    fn create_subagents(
        &mut self,
        session_key: &str,
        subagents: &[SubagentUsageRecord],
    ) -> Result<(), Self::Error>;
}

/// Everything stored for one session key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SessionMetrics>,
    pub tools: Vec<ToolInvocationSummary>,
    pub file_operations: Vec<FileOperationSummary>,
    pub commands: Vec<CommandRecord>,
    pub subagents: Vec<SubagentUsageRecord>,
}

/// In-memory [`SessionStore`]. Batch writes append.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: BTreeMap<String, StoredSession>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_key: &str) -> Option<&StoredSession> {
        self.sessions.get(session_key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn entry(&mut self, session_key: &str) -> &mut StoredSession {
        self.sessions.entry(session_key.to_string()).or_default()
    }
}

impl SessionStore for MemoryStore {
    type Error = Infallible;

    fn create_session(&mut self, session: &SessionRecord) -> Result<(), Self::Error> {
        self.entry(&session.session_key).session = Some(session.clone());
        Ok(())
    }

    fn create_session_metrics(
        &mut self,
        session_key: &str,
        metrics: &SessionMetrics,
    ) -> Result<(), Self::Error> {
        self.entry(session_key).metrics = Some(metrics.clone());
        Ok(())
    }

    fn create_tools(
        &mut self,
        session_key: &str,
        tools: &[ToolInvocationSummary],
    ) -> Result<(), Self::Error> {
        self.entry(session_key).tools.extend_from_slice(tools);
        Ok(())
    }

    fn create_file_operations(
        &mut self,
        session_key: &str,
        operations: &[FileOperationSummary],
    ) -> Result<(), Self::Error> {
        self.entry(session_key)
            .file_operations
            .extend_from_slice(operations);
        Ok(())
    }

    fn create_commands(
        &mut self,
        session_key: &str,
        commands: &[CommandRecord],
    ) -> Result<(), Self::Error> {
        self.entry(session_key).commands.extend_from_slice(commands);
        Ok(())
    }

    fn create_subagents(
        &mut self,
        session_key: &str,
        subagents: &[SubagentUsageRecord],
    ) -> Result<(), Self::Error> {
        self.entry(session_key).subagents.extend_from_slice(subagents);
        Ok(())
    }
}
