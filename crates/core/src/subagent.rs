// crates/core/src/subagent.rs
//! Sub-agent correlation.
//!
//! A delegation tool call (`Task` / `Skill`) opens a pending entry keyed by
//! its tool-use id. A later user record carrying a completion payload closes
//! it: the entry is removed and a [`SubagentUsageRecord`] is emitted. Entries
//! still pending when the log ends are dropped silently.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::invocation::DelegationRequest;
use crate::record::{CompletionPayload, ContentBlock};
use crate::types::{AgentKind, SubagentUsageRecord};
use crate::usage::Usage;

/// Agent type recorded for a task delegation without `subagent_type`.
pub const DEFAULT_TASK_AGENT_TYPE: &str = "general-purpose";

/// What to do with a completion whose tool results reference no pending id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Attribute it to the oldest pending invocation.
    #[default]
    Oldest,
    /// Treat it as unmatched.
    Disabled,
}

/// A delegation waiting for its completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubagent {
    pub tool_use_id: String,
    pub kind: AgentKind,
    pub agent_type: String,
    pub description: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskInput {
    subagent_type: Option<String>,
    description: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SkillInput {
    #[serde(alias = "command")]
    skill: String,
    description: Option<String>,
    model: Option<String>,
}

impl PendingSubagent {
    /// Build a pending entry from a delegation call. Returns `None` when the
    /// input payload does not have the expected shape.
    pub fn from_delegation(request: &DelegationRequest<'_>) -> Option<Self> {
        let (agent_type, description, model) = match request.kind {
            AgentKind::Task => {
                let input = TaskInput::deserialize(request.input).ok()?;
                let agent_type = input
                    .subagent_type
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_TASK_AGENT_TYPE.to_string());
                (agent_type, input.description, input.model)
            }
            AgentKind::Skill => {
                let input = SkillInput::deserialize(request.input).ok()?;
                (input.skill, input.description, input.model)
            }
        };

        Some(Self {
            tool_use_id: request.tool_use_id.to_string(),
            kind: request.kind,
            agent_type,
            description: description.filter(|d| !d.trim().is_empty()),
            model: model.filter(|m| !m.trim().is_empty()),
        })
    }

    fn into_record(self, completion: &CompletionPayload) -> SubagentUsageRecord {
        SubagentUsageRecord {
            agent_kind: self.kind,
            agent_type: self.agent_type,
            description: self.description,
            model: self.model,
            tool_use_id: self.tool_use_id,
            agent_id: completion.agent_id.clone(),
            status: completion.status.clone(),
            usage: completion.usage.unwrap_or_default(),
            total_duration_ms: completion.total_duration_ms,
            tool_use_count: completion.total_tool_use_count.unwrap_or(0),
            cost_usd: None,
        }
    }
}

/// Per-parse correlation state. Pending entries keep insertion order so the
/// fallback is deterministic.
#[derive(Debug, Default)]
pub struct SubagentCorrelator {
    pending: Vec<PendingSubagent>,
    records: Vec<SubagentUsageRecord>,
    policy: FallbackPolicy,
}

impl SubagentCorrelator {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            pending: Vec::new(),
            records: Vec::new(),
            policy,
        }
    }

    /// Open a pending entry. Unparseable input and duplicate ids are ignored.
    pub fn open(&mut self, request: &DelegationRequest<'_>) {
        let Some(entry) = PendingSubagent::from_delegation(request) else {
            debug!(
                tool_use_id = request.tool_use_id,
                "Ignoring delegation with unparseable input"
            );
            return;
        };
        if self.pending.iter().any(|p| p.tool_use_id == entry.tool_use_id) {
            debug!(tool_use_id = %entry.tool_use_id, "Delegation already pending");
            return;
        }
        self.pending.push(entry);
    }

    /// Try to close a pending entry with a completion payload.
    ///
    /// Matching order: the first `tool_result` block whose id is pending;
    /// otherwise the fallback policy. On success the sub-agent's usage is
    /// returned so the caller can fold it into the session totals.
    pub fn complete(
        &mut self,
        blocks: &[ContentBlock],
        completion: &CompletionPayload,
    ) -> Option<Usage> {
        if self.pending.is_empty() {
            debug!("Completion payload with no pending sub-agent");
            return None;
        }

        let matched = blocks.iter().find_map(|block| match block {
            ContentBlock::ToolResult {
                tool_use_id: Some(id),
                ..
            } => self.pending.iter().position(|p| &p.tool_use_id == id),
            _ => None,
        });

        let idx = match (matched, self.policy) {
            (Some(idx), _) => idx,
            (None, FallbackPolicy::Oldest) => {
                // The referenced id may belong to an ordinary tool call; the
                // oldest entry is still claimed.
                warn!(
                    tool_use_id = %self.pending[0].tool_use_id,
                    referenced_id = ?referenced_id(blocks),
                    pending = self.pending.len(),
                    "Completion matched no pending id; attributing to oldest pending sub-agent"
                );
                0
            }
            (None, FallbackPolicy::Disabled) => {
                debug!(
                    pending = self.pending.len(),
                    "Completion matched no pending id; fallback disabled"
                );
                return None;
            }
        };

        let record = self.pending.remove(idx).into_record(completion);
        let usage = record.usage;
        self.records.push(record);
        Some(usage)
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Correlated records in completion order, and the number left unresolved.
    pub fn finish(self) -> (Vec<SubagentUsageRecord>, usize) {
        if !self.pending.is_empty() {
            debug!(
                unresolved = self.pending.len(),
                "Session ended with pending sub-agent invocations"
            );
        }
        (self.records, self.pending.len())
    }
}

/// The first correlation id referenced by a `tool_result` block.
fn referenced_id(blocks: &[ContentBlock]) -> Option<&str> {
    blocks.iter().find_map(|block| match block {
        ContentBlock::ToolResult {
            tool_use_id: Some(id),
            ..
        } => Some(id.as_str()),
        _ => None,
    })
}
