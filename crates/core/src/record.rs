// crates/core/src/record.rs
//! Record decoder: one JSONL line into one [`TranscriptRecord`].
//!
//! Agent transcripts wrap API messages inside a `"message"` field:
//! ```json
//! {"type": "assistant", "timestamp": "...", "message": {"model": "...", "usage": {...}, "content": [...]}}
//! {"type": "user", "message": {"content": [{"type": "tool_result", "tool_use_id": "..."}]}, "toolUseResult": {...}}
//! {"type": "result", "is_error": false, "exit_code": 0}
//! ```
//! Record kinds and content blocks decode into closed enums. Unknown record
//! kinds become [`RecordBody::Unknown`] and unknown block kinds become
//! [`ContentBlock::Other`]; neither is an error. A content block whose fields
//! have the wrong shape also becomes [`ContentBlock::Other`], so one bad block
//! never costs the record its usage. A line that is not valid JSON, or whose
//! envelope fields have the wrong shape, fails to decode and is skipped by the
//! caller.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::usage::Usage;

/// One decoded transcript line. Lives only for the duration of its processing.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    pub timestamp: Option<DateTime<Utc>>,
    /// Top-level `usage` if present, otherwise `message.usage`.
    pub usage: Option<Usage>,
    pub body: RecordBody,
}

/// Kind-specific payload of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    User {
        message: Option<Message>,
        /// Nested completion payload (`toolUseResult`), only kept when it is an object.
        completion: Option<CompletionPayload>,
    },
    Assistant {
        model: Option<String>,
        message: Option<Message>,
    },
    Result {
        is_error: bool,
        exit_code: Option<i64>,
    },
    Unknown,
}

/// A message body with its content normalized to blocks.
/// Plain string content becomes a single [`ContentBlock::Text`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        input: Option<Value>,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        is_error: bool,
    },
    #[serde(other)]
    Other,
}

/// Completion details attached to a user record (`toolUseResult`).
///
/// For delegated sub-agents this carries the sub-agent's own usage, its
/// wall-clock duration and how many tools it invoked. Shell results may carry
/// an exit code instead.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionPayload {
    pub usage: Option<Usage>,
    #[serde(alias = "durationMs", alias = "total_duration_ms")]
    pub total_duration_ms: Option<u64>,
    #[serde(alias = "total_tool_use_count")]
    pub total_tool_use_count: Option<u32>,
    #[serde(alias = "agent_id")]
    pub agent_id: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "exit_code")]
    pub exit_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    timestamp: Option<Value>,
    model: Option<String>,
    message: Option<RawMessage>,
    usage: Option<Usage>,
    #[serde(rename = "toolUseResult", alias = "tool_use_result")]
    tool_use_result: Option<Value>,
    #[serde(alias = "isError")]
    is_error: Option<bool>,
    #[serde(alias = "exitCode")]
    exit_code: Option<i64>,
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    model: Option<String>,
    content: Option<RawContent>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Blocks(Vec<Value>),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a single raw line.
pub fn decode_line(raw: &[u8]) -> Result<TranscriptRecord, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(raw)?;
    Ok(TranscriptRecord::from_envelope(envelope))
}

impl TranscriptRecord {
    fn from_envelope(env: Envelope) -> Self {
        let timestamp = env
            .timestamp
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        let nested_usage = env.message.as_ref().and_then(|m| m.usage);
        let usage = env.usage.or(nested_usage);

        let nested_model = env.message.as_ref().and_then(|m| m.model.clone());
        let message = env.message.map(Message::from);

        let body = match env.kind.as_deref() {
            Some("user") => RecordBody::User {
                message,
                completion: env.tool_use_result.as_ref().and_then(CompletionPayload::from_value),
            },
            Some("assistant") => RecordBody::Assistant {
                model: env.model.or(nested_model),
                message,
            },
            Some("result") => {
                let payload = env.result.as_ref().filter(|r| r.is_object());
                let is_error = env
                    .is_error
                    .or_else(|| payload.and_then(|p| p.get("is_error")).and_then(Value::as_bool))
                    .unwrap_or(false);
                let exit_code = env.exit_code.or_else(|| {
                    payload.and_then(|p| {
                        p.get("exit_code")
                            .or_else(|| p.get("exitCode"))
                            .and_then(Value::as_i64)
                    })
                });
                RecordBody::Result { is_error, exit_code }
            }
            _ => RecordBody::Unknown,
        };

        Self {
            timestamp,
            usage,
            body,
        }
    }
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        let content = match raw.content {
            Some(RawContent::Blocks(blocks)) => blocks
                .iter()
                .map(|block| ContentBlock::deserialize(block).unwrap_or(ContentBlock::Other))
                .collect(),
            Some(RawContent::Text(text)) => vec![ContentBlock::Text { text }],
            None => Vec::new(),
        };
        Self { content }
    }
}

impl CompletionPayload {
    /// Decode a completion payload. Non-object payloads (plain strings such as
    /// error text) and objects with mistyped fields yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        CompletionPayload::deserialize(value).ok()
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one interpreted as UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(ts, fmt).ok())
                .map(|ndt| ndt.and_utc())
        })
}
