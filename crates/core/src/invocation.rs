// crates/core/src/invocation.rs
//
// Tool-use correlation: per-tool counts, file operations and shell commands
// extracted from assistant `tool_use` blocks, plus error/duration/exit-code
// attribution from later `tool_result` blocks that reference them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::record::{CompletionPayload, ContentBlock};
use crate::types::{
    AgentKind, CommandRecord, FileOperationKind, FileOperationSummary, ToolInvocationSummary,
};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A delegation-style tool call seen on an assistant message, handed to the
/// sub-agent correlator.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegationRequest<'a> {
    pub kind: AgentKind,
    pub tool_use_id: &'a str,
    pub input: &'a Value,
}

/// Aggregated tool activity for one session.
///
/// Output collections keep first-seen order.
#[derive(Debug, Default)]
pub struct ToolTracker {
    tools: Vec<ToolInvocationSummary>,
    tool_index: HashMap<String, usize>,
    files: Vec<FileOperationSummary>,
    file_index: HashMap<(String, FileOperationKind), usize>,
    commands: Vec<CommandRecord>,
    /// tool_use id -> tool name, for attributing later results.
    tool_names_by_id: HashMap<String, String>,
}

impl ToolTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every `tool_use` block of one assistant message.
    ///
    /// Returns the delegation calls (task/skill) that carry both an id and an
    /// input payload, in block order.
    pub fn observe_assistant<'a>(
        &mut self,
        blocks: &'a [ContentBlock],
        timestamp: Option<DateTime<Utc>>,
    ) -> Vec<DelegationRequest<'a>> {
        let mut delegations = Vec::new();

        for block in blocks {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };

            self.bump_tool(name);
            if let Some(id) = id {
                self.tool_names_by_id.insert(id.clone(), name.clone());
            }

            if let Some(input) = input {
                if let Some(path) = input.get("file_path").and_then(Value::as_str) {
                    if let Some(operation) = FileOperationKind::from_tool_name(name) {
                        self.bump_file(path, operation);
                    }
                }
                if let Some(command) = input.get("command").and_then(Value::as_str) {
                    self.commands.push(CommandRecord {
                        command: command.to_string(),
                        exit_code: None,
                        executed_at: timestamp,
                        tool_use_id: id.clone(),
                    });
                }
            }

            if let (Some(kind), Some(id), Some(input)) =
                (AgentKind::from_tool_name(name), id.as_deref(), input.as_ref())
            {
                delegations.push(DelegationRequest {
                    kind,
                    tool_use_id: id,
                    input,
                });
            }
        }

        delegations
    }

    /// Attribute `tool_result` blocks of a user message back to their tools.
    ///
    /// - `is_error: true` increments the originating tool's error count.
    /// - The completion's duration is added to the first referenced tool.
    /// - The completion's exit code fills the referenced command, if unset.
    pub fn observe_results(
        &mut self,
        blocks: &[ContentBlock],
        completion: Option<&CompletionPayload>,
    ) {
        let mut duration = completion.and_then(|c| c.total_duration_ms);
        let exit_code = completion.and_then(|c| c.exit_code);

        for block in blocks {
            let ContentBlock::ToolResult {
                tool_use_id: Some(id),
                is_error,
            } = block
            else {
                continue;
            };

            if let Some(summary) = self
                .tool_names_by_id
                .get(id)
                .and_then(|name| self.tool_index.get(name))
                .map(|&idx| &mut self.tools[idx])
            {
                if *is_error {
                    summary.error_count += 1;
                }
                if let Some(ms) = duration.take() {
                    let total = summary.total_duration_ms.get_or_insert(0);
                    *total = total.saturating_add(ms);
                }
            }

            if let Some(code) = exit_code {
                if let Some(cmd) = self
                    .commands
                    .iter_mut()
                    .find(|c| c.tool_use_id.as_deref() == Some(id.as_str()))
                {
                    cmd.exit_code.get_or_insert(code);
                }
            }
        }
    }

    /// Best-effort: attach an exit code to the most recently recorded command
    /// that does not have one yet. Returns `false` if there was none.
    pub fn backfill_exit_code(&mut self, exit_code: i64) -> bool {
        match self.commands.iter_mut().rev().find(|c| c.exit_code.is_none()) {
            Some(cmd) => {
                cmd.exit_code = Some(exit_code);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    fn total_invocations(&self) -> u32 {
        self.tools.iter().map(|t| t.invocation_count).sum()
    }

    pub fn finish(
        self,
    ) -> (
        Vec<ToolInvocationSummary>,
        Vec<FileOperationSummary>,
        Vec<CommandRecord>,
    ) {
        (self.tools, self.files, self.commands)
    }

    fn bump_tool(&mut self, name: &str) {
        match self.tool_index.get(name) {
            Some(&idx) => self.tools[idx].invocation_count += 1,
            None => {
                self.tool_index.insert(name.to_string(), self.tools.len());
                self.tools.push(ToolInvocationSummary {
                    tool_name: name.to_string(),
                    invocation_count: 1,
                    total_duration_ms: None,
                    error_count: 0,
                });
            }
        }
    }

    fn bump_file(&mut self, path: &str, operation: FileOperationKind) {
        let key = (path.to_string(), operation);
        match self.file_index.get(&key) {
            Some(&idx) => self.files[idx].count += 1,
            None => {
                self.file_index.insert(key, self.files.len());
                self.files.push(FileOperationSummary {
                    file_path: path.to_string(),
                    operation,
                    count: 1,
                });
            }
        }
    }
}
