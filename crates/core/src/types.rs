// crates/core/src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::AppliedRates;
use crate::usage::Usage;

/// Per-tool invocation summary, one per distinct tool name in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationSummary {
    pub tool_name: String,
    pub invocation_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,
    pub error_count: u32,
}

/// File operation kind derived from the invoking tool's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperationKind {
    Read,
    Write,
    Edit,
}

impl FileOperationKind {
    /// Fixed mapping from tool name to operation kind. Other tools produce no
    /// file operation even when their input names a path.
    pub fn from_tool_name(tool_name: &str) -> Option<Self> {
        match tool_name {
            "Read" => Some(Self::Read),
            "Write" => Some(Self::Write),
            "Edit" => Some(Self::Edit),
            _ => None,
        }
    }
}

/// Aggregated file operations keyed by `(file_path, operation)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOperationSummary {
    pub file_path: String,
    pub operation: FileOperationKind,
    pub count: u32,
}

/// One shell invocation. Never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    /// Tool-use id of the invocation, when the log supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
}

/// Delegation style of a sub-agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Task,
    Skill,
}

impl AgentKind {
    pub fn from_tool_name(tool_name: &str) -> Option<Self> {
        match tool_name {
            "Task" => Some(Self::Task),
            "Skill" => Some(Self::Skill),
            _ => None,
        }
    }
}

/// Usage reported back by one correlated sub-agent completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentUsageRecord {
    pub agent_kind: AgentKind,
    pub agent_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub tool_use_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,
    pub tool_use_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

/// Session-level aggregate.
///
/// `usage` includes every sub-agent's usage, folded in when its completion
/// was correlated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub user_messages: u32,
    pub assistant_messages: u32,
    /// Always `min(user_messages, assistant_messages)`.
    pub turn_count: u32,
    pub usage: Usage,
    pub error_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    /// Rates that produced `cost_usd`, kept so later catalog changes do not
    /// rewrite historical reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rates: Option<AppliedRates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Diagnostics about the parse itself. Metrics never depend on these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseStats {
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub unresolved_subagents: usize,
}

/// Everything extracted from one transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTranscript {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub metrics: SessionMetrics,
    pub tools: Vec<ToolInvocationSummary>,
    pub file_operations: Vec<FileOperationSummary>,
    pub commands: Vec<CommandRecord>,
    pub subagents: Vec<SubagentUsageRecord>,
    pub stats: ParseStats,
}

impl ParsedTranscript {
    pub fn is_empty(&self) -> bool {
        self.metrics.user_messages == 0
            && self.metrics.assistant_messages == 0
            && self.metrics.usage.is_zero()
    }

    /// Session duration in seconds, zero when either bound is missing.
    pub fn duration_secs(&self) -> i64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => (end - start).num_seconds().max(0),
            _ => 0,
        }
    }
}
