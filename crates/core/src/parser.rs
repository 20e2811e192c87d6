// crates/core/src/parser.rs
//! Transcript parse entry points.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::accumulator::SessionAccumulator;
use crate::error::ParseError;
use crate::record::decode_line;
use crate::scanner::{LineScanner, DEFAULT_MAX_LINE_BYTES};
use crate::subagent::FallbackPolicy;
use crate::types::{ParseStats, ParsedTranscript};

/// Knobs for a single parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Lines longer than this abort the parse with [`ParseError::LineTooLong`].
    pub max_line_bytes: usize,
    pub fallback: FallbackPolicy,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            fallback: FallbackPolicy::default(),
        }
    }
}

/// Parse a transcript file in one pass.
///
/// Malformed lines are skipped. Open/read failures and oversized lines are
/// fatal and no partial result is returned. The file handle is released on
/// every exit path.
///
/// # Example
/// ```ignore
/// use agent_tally_core::{parse_transcript, ParseOptions};
///
/// let parsed = parse_transcript(Path::new("session.jsonl"), &ParseOptions::default())?;
/// println!("{} turns", parsed.metrics.turn_count);
/// ```
pub fn parse_transcript(path: &Path, options: &ParseOptions) -> Result<ParsedTranscript, ParseError> {
    let file = File::open(path).map_err(|e| ParseError::io(path, e))?;
    parse_reader(BufReader::new(file), path, options)
}

/// Parse any buffered reader. `label` names the source in errors and logs.
pub fn parse_reader<R: BufRead>(
    reader: R,
    label: impl AsRef<Path>,
    options: &ParseOptions,
) -> Result<ParsedTranscript, ParseError> {
    let label = label.as_ref();
    let start = Instant::now();

    let mut scanner = LineScanner::new(reader, label, options.max_line_bytes);
    let mut acc = SessionAccumulator::new(options.fallback);
    let mut lines_skipped = 0usize;

    while let Some(line) = scanner.next_line()? {
        match decode_line(line.bytes) {
            Ok(record) => acc.process_record(&record),
            Err(e) => {
                lines_skipped += 1;
                debug!(
                    "Skipping malformed JSON at line {} in {:?}: {}",
                    line.number, label, e
                );
            }
        }
    }

    let stats = ParseStats {
        lines_read: scanner.lines_read(),
        lines_skipped,
        unresolved_subagents: 0,
    };
    let parsed = acc.finish(stats);

    info!(
        source = %label.display(),
        lines_read = parsed.stats.lines_read,
        lines_skipped = parsed.stats.lines_skipped,
        user_messages = parsed.metrics.user_messages,
        assistant_messages = parsed.metrics.assistant_messages,
        subagents = parsed.subagents.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Parsed transcript"
    );

    Ok(parsed)
}
