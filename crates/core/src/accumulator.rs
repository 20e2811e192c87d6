//! Per-parse session accumulator.
//!
//! `SessionAccumulator` is the context object threaded through one parse call.
//! It owns the timestamp tracker, message counters, token totals and both
//! correlators. Nothing here is shared between calls: build one per transcript,
//! feed it decoded records in log order, then call
//! [`finish`](SessionAccumulator::finish).

use chrono::{DateTime, Utc};

use crate::invocation::ToolTracker;
use crate::record::{RecordBody, TranscriptRecord};
use crate::subagent::{FallbackPolicy, SubagentCorrelator};
use crate::types::{ParseStats, ParsedTranscript, SessionMetrics};
use crate::usage::Usage;

#[derive(Debug, Default)]
pub struct SessionAccumulator {
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    model: Option<String>,
    user_messages: u32,
    assistant_messages: u32,
    error_count: u32,
    usage: Usage,
    tools: ToolTracker,
    subagents: SubagentCorrelator,
}

impl SessionAccumulator {
    pub fn new(fallback: FallbackPolicy) -> Self {
        Self {
            subagents: SubagentCorrelator::new(fallback),
            ..Self::default()
        }
    }

    /// Fold one decoded record into the session state.
    pub fn process_record(&mut self, record: &TranscriptRecord) {
        if let Some(ts) = record.timestamp {
            self.started_at.get_or_insert(ts);
            self.ended_at = Some(ts);
        }

        // Usage is counted for every record kind, result records included.
        if let Some(usage) = &record.usage {
            self.usage.add(usage);
        }

        match &record.body {
            RecordBody::User {
                message,
                completion,
            } => {
                self.user_messages += 1;
                let blocks = message.as_ref().map(|m| m.content.as_slice()).unwrap_or(&[]);
                self.tools.observe_results(blocks, completion.as_ref());
                if let Some(completion) = completion {
                    if let Some(subagent_usage) = self.subagents.complete(blocks, completion) {
                        self.usage.add(&subagent_usage);
                    }
                }
            }
            RecordBody::Assistant { model, message } => {
                self.assistant_messages += 1;
                if self.model.is_none() {
                    if let Some(model) = model.as_deref().filter(|m| !m.trim().is_empty()) {
                        self.model = Some(model.to_string());
                    }
                }
                if let Some(message) = message {
                    let delegations = self.tools.observe_assistant(&message.content, record.timestamp);
                    for request in &delegations {
                        self.subagents.open(request);
                    }
                }
            }
            RecordBody::Result {
                is_error,
                exit_code,
            } => {
                if *is_error {
                    self.error_count += 1;
                }
                if let Some(code) = exit_code {
                    self.tools.backfill_exit_code(*code);
                }
            }
            RecordBody::Unknown => {}
        }
    }

    pub fn user_messages(&self) -> u32 {
        self.user_messages
    }

    pub fn assistant_messages(&self) -> u32 {
        self.assistant_messages
    }

    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Flatten the accumulated state into the output aggregate.
    ///
    /// `stats` carries the scanner-level counters; the unresolved sub-agent
    /// count is filled in here.
    pub fn finish(self, mut stats: ParseStats) -> ParsedTranscript {
        let (tools, file_operations, commands) = self.tools.finish();
        let (subagents, unresolved) = self.subagents.finish();
        stats.unresolved_subagents = unresolved;

        let metrics = SessionMetrics {
            user_messages: self.user_messages,
            assistant_messages: self.assistant_messages,
            turn_count: self.user_messages.min(self.assistant_messages),
            usage: self.usage,
            error_count: self.error_count,
            cost_usd: None,
            rates: None,
            model: self.model.clone(),
        };

        ParsedTranscript {
            started_at: self.started_at,
            ended_at: self.ended_at,
            model: self.model,
            metrics,
            tools,
            file_operations,
            commands,
            subagents,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::decode_line;

    fn feed(acc: &mut SessionAccumulator, lines: &[&str]) {
        for line in lines {
            let record = decode_line(line.as_bytes()).unwrap();
            acc.process_record(&record);
        }
    }

    #[test]
    fn test_counts_and_turns() {
        let mut acc = SessionAccumulator::default();
        feed(
            &mut acc,
            &[
                r#"{"type":"user","message":{"role":"user","content":"hi"}}"#,
                r#"{"type":"assistant","message":{"role":"assistant","content":"hello"}}"#,
                r#"{"type":"user","message":{"role":"user","content":"more"}}"#,
                r#"{"type":"system","content":"ignored"}"#,
            ],
        );
        assert_eq!(acc.user_messages(), 2);
        assert_eq!(acc.assistant_messages(), 1);
        let parsed = acc.finish(ParseStats::default());
        assert_eq!(parsed.metrics.turn_count, 1);
    }

    #[test]
    fn test_timestamps_first_and_last() {
        let mut acc = SessionAccumulator::default();
        feed(
            &mut acc,
            &[
                r#"{"type":"user","timestamp":"2026-01-10T09:00:00Z","message":{"content":"a"}}"#,
                r#"{"type":"assistant","message":{"content":"no timestamp"}}"#,
                r#"{"type":"assistant","timestamp":"not a time","message":{"content":"b"}}"#,
                r#"{"type":"progress","timestamp":"2026-01-10T09:05:00Z"}"#,
            ],
        );
        let parsed = acc.finish(ParseStats::default());
        assert_eq!(
            parsed.started_at.unwrap().to_rfc3339(),
            "2026-01-10T09:00:00+00:00"
        );
        assert_eq!(parsed.ended_at.unwrap().to_rfc3339(), "2026-01-10T09:05:00+00:00");
    }

    #[test]
    fn test_first_model_wins() {
        let mut acc = SessionAccumulator::default();
        feed(
            &mut acc,
            &[
                r#"{"type":"assistant","message":{"model":"","content":"x"}}"#,
                r#"{"type":"assistant","message":{"model":"claude-opus-4-6","content":"x"}}"#,
                r#"{"type":"assistant","message":{"model":"claude-haiku-4-5-20251001","content":"x"}}"#,
            ],
        );
        let parsed = acc.finish(ParseStats::default());
        assert_eq!(parsed.model.as_deref(), Some("claude-opus-4-6"));
        assert_eq!(parsed.metrics.model.as_deref(), Some("claude-opus-4-6"));
    }

    #[test]
    fn test_usage_on_every_record_kind() {
        let mut acc = SessionAccumulator::default();
        feed(
            &mut acc,
            &[
                r#"{"type":"assistant","message":{"content":"a","usage":{"input_tokens":10,"output_tokens":5}}}"#,
                r#"{"type":"result","usage":{"input_tokens":1,"cache_read_input_tokens":2}}"#,
                r#"{"type":"summary","usage":{"cache_creation_input_tokens":3}}"#,
            ],
        );
        assert_eq!(*acc.usage(), Usage::new(11, 5, 2, 3));
    }

    #[test]
    fn test_result_errors_and_exit_code_backfill() {
        let mut acc = SessionAccumulator::default();
        feed(
            &mut acc,
            &[
                r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"b1","name":"Bash","input":{"command":"cargo build"}}]}}"#,
                r#"{"type":"result","is_error":true,"exit_code":101}"#,
                r#"{"type":"result","is_error":false}"#,
            ],
        );
        let parsed = acc.finish(ParseStats::default());
        assert_eq!(parsed.metrics.error_count, 1);
        assert_eq!(parsed.commands.len(), 1);
        assert_eq!(parsed.commands[0].exit_code, Some(101));
    }

    #[test]
    fn test_subagent_usage_folds_into_session() {
        let mut acc = SessionAccumulator::default();
        feed(
            &mut acc,
            &[
                r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"X","name":"Task","input":{"subagent_type":"Explore","description":"find it"}}],"usage":{"input_tokens":100,"output_tokens":10}}}"#,
                r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"X","content":"done"}]},"toolUseResult":{"status":"completed","totalDurationMs":900,"totalToolUseCount":3,"usage":{"input_tokens":4000,"output_tokens":500,"cache_read_input_tokens":400,"cache_creation_input_tokens":100}}}"#,
            ],
        );
        let parsed = acc.finish(ParseStats {
            lines_read: 2,
            ..Default::default()
        });
        assert_eq!(parsed.subagents.len(), 1);
        assert_eq!(parsed.subagents[0].usage, Usage::new(4000, 500, 400, 100));
        assert_eq!(parsed.metrics.usage, Usage::new(4100, 510, 400, 100));
        assert_eq!(parsed.stats.lines_read, 2);
        assert_eq!(parsed.stats.unresolved_subagents, 0);
        // The completion's duration is also attributed to the Task tool.
        assert_eq!(parsed.tools[0].total_duration_ms, Some(900));
    }

    #[test]
    fn test_null_block_fields_keep_message_and_usage() {
        let mut acc = SessionAccumulator::default();
        feed(
            &mut acc,
            &[
                r#"{"type":"assistant","message":{"content":[{"type":"text","text":null}],"usage":{"input_tokens":500,"output_tokens":50}}}"#,
                r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"r1","is_error":null}]}}"#,
            ],
        );
        let parsed = acc.finish(ParseStats::default());
        assert_eq!(parsed.metrics.assistant_messages, 1);
        assert_eq!(parsed.metrics.user_messages, 1);
        assert_eq!(parsed.metrics.turn_count, 1);
        assert_eq!(parsed.metrics.usage, Usage::new(500, 50, 0, 0));
    }

    #[test]
    fn test_oldest_fallback_accepts_non_delegation_result() {
        // A Read result with an object payload arrives before the Task
        // completion and takes the oldest pending slot.
        let mut acc = SessionAccumulator::new(FallbackPolicy::Oldest);
        feed(
            &mut acc,
            &[
                r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"T","name":"Task","input":{"subagent_type":"Explore"}},{"type":"tool_use","id":"R","name":"Read","input":{"file_path":"/a.rs"}}]}}"#,
                r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"R","content":"fn a() {}"}]},"toolUseResult":{"type":"text","file":{"filePath":"/a.rs"}}}"#,
                r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"T","content":"done"}]},"toolUseResult":{"status":"completed","usage":{"input_tokens":4000,"output_tokens":500}}}"#,
            ],
        );
        let parsed = acc.finish(ParseStats::default());
        assert_eq!(parsed.subagents.len(), 1);
        assert_eq!(parsed.subagents[0].tool_use_id, "T");
        assert!(parsed.subagents[0].usage.is_zero());
        assert!(parsed.metrics.usage.is_zero());

        // With the fallback disabled the real completion is matched by id.
        let mut acc = SessionAccumulator::new(FallbackPolicy::Disabled);
        feed(
            &mut acc,
            &[
                r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"T","name":"Task","input":{"subagent_type":"Explore"}},{"type":"tool_use","id":"R","name":"Read","input":{"file_path":"/a.rs"}}]}}"#,
                r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"R","content":"fn a() {}"}]},"toolUseResult":{"type":"text","file":{"filePath":"/a.rs"}}}"#,
                r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"T","content":"done"}]},"toolUseResult":{"status":"completed","usage":{"input_tokens":4000,"output_tokens":500}}}"#,
            ],
        );
        let parsed = acc.finish(ParseStats::default());
        assert_eq!(parsed.subagents[0].usage, Usage::new(4000, 500, 0, 0));
        assert_eq!(parsed.metrics.usage, Usage::new(4000, 500, 0, 0));
    }

    #[test]
    fn test_unresolved_subagents_counted() {
        let mut acc = SessionAccumulator::new(FallbackPolicy::Disabled);
        feed(
            &mut acc,
            &[
                r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"A","name":"Task","input":{}},{"type":"tool_use","id":"B","name":"Skill","input":{"skill":"pdf"}}]}}"#,
            ],
        );
        let parsed = acc.finish(ParseStats::default());
        assert!(parsed.subagents.is_empty());
        assert_eq!(parsed.stats.unresolved_subagents, 2);
    }
}
