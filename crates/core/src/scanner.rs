// crates/core/src/scanner.rs
//! Line scanner over a newline-delimited transcript.
//!
//! Lines are assembled from the reader's buffer with `memchr`, so a single
//! record may be much larger than the read buffer. Each line is bounded by
//! `max_line_bytes`; exceeding it is fatal for the whole parse. Blank lines
//! are skipped, but still counted for line numbering.

use std::io::{BufRead, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::ParseError;

/// Default per-line cap: 32 MiB.
pub const DEFAULT_MAX_LINE_BYTES: usize = 32 * 1024 * 1024;

/// One non-blank line, borrowed from the scanner's buffer.
#[derive(Debug)]
pub struct RawLine<'a> {
    /// 1-based physical line number.
    pub number: usize,
    pub bytes: &'a [u8],
}

pub struct LineScanner<R> {
    reader: R,
    path: PathBuf,
    buf: Vec<u8>,
    max_line_bytes: usize,
    line_number: usize,
}

impl<R: BufRead> LineScanner<R> {
    /// `path` is only used to label errors.
    pub fn new(reader: R, path: impl AsRef<Path>, max_line_bytes: usize) -> Self {
        Self {
            reader,
            path: path.as_ref().to_path_buf(),
            buf: Vec::new(),
            max_line_bytes,
            line_number: 0,
        }
    }

    /// Number of physical lines consumed so far, blank ones included.
    pub fn lines_read(&self) -> usize {
        self.line_number
    }

    /// Advance to the next non-blank line. Returns `Ok(None)` at end of input.
    pub fn next_line(&mut self) -> Result<Option<RawLine<'_>>, ParseError> {
        loop {
            self.buf.clear();
            let at_eof = self.fill_line()?;
            if at_eof && self.buf.is_empty() {
                return Ok(None);
            }
            self.line_number += 1;

            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(RawLine {
                number: self.line_number,
                bytes: &self.buf,
            }));
        }
    }

    /// Read bytes into `buf` up to (not including) the next newline.
    /// Returns `true` if end of input was reached before a newline.
    fn fill_line(&mut self) -> Result<bool, ParseError> {
        loop {
            let available = match self.reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ParseError::io(&self.path, e)),
            };
            if available.is_empty() {
                return Ok(true);
            }

            let (take, found_newline) = match memchr::memchr(b'\n', available) {
                Some(pos) => (pos, true),
                None => (available.len(), false),
            };
            if self.buf.len() + take > self.max_line_bytes {
                return Err(ParseError::LineTooLong {
                    path: self.path.clone(),
                    line: self.line_number + 1,
                    limit: self.max_line_bytes,
                });
            }
            self.buf.extend_from_slice(&available[..take]);

            let consumed = if found_newline { take + 1 } else { take };
            self.reader.consume(consumed);
            if found_newline {
                return Ok(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn collect(input: &[u8], max: usize) -> Result<Vec<(usize, String)>, ParseError> {
        let mut scanner = LineScanner::new(Cursor::new(input), "mem.jsonl", max);
        let mut out = Vec::new();
        while let Some(line) = scanner.next_line()? {
            out.push((line.number, String::from_utf8_lossy(line.bytes).into_owned()));
        }
        Ok(out)
    }

    #[test]
    fn test_empty_input() {
        assert!(collect(b"", 1024).unwrap().is_empty());
    }

    #[test]
    fn test_skips_blank_lines_but_counts_them() {
        let lines = collect(b"a\n\n   \nb\r\n", 1024).unwrap();
        assert_eq!(lines, vec![(1, "a".to_string()), (4, "b".to_string())]);
    }

    #[test]
    fn test_trailing_partial_line_is_returned() {
        let lines = collect(b"{\"a\":1}\n{\"b\":", 1024).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].1, "{\"b\":");
    }

    #[test]
    fn test_line_longer_than_read_buffer() {
        let long = "x".repeat(10_000);
        let input = format!("{}\nshort\n", long);
        // Tiny read buffer forces the line to be assembled across many fills.
        let mut scanner = LineScanner::new(
            BufReader::with_capacity(16, Cursor::new(input.into_bytes())),
            "mem.jsonl",
            20_000,
        );
        let first = scanner.next_line().unwrap().unwrap();
        assert_eq!(first.bytes.len(), 10_000);
        let second = scanner.next_line().unwrap().unwrap();
        assert_eq!(second.bytes, b"short");
        assert!(scanner.next_line().unwrap().is_none());
        assert_eq!(scanner.lines_read(), 2);
    }

    #[test]
    fn test_line_over_cap_is_fatal() {
        let err = collect(b"ok\n0123456789abcdef\n", 8).unwrap_err();
        match err {
            ParseError::LineTooLong { line, limit, .. } => {
                assert_eq!(line, 2);
                assert_eq!(limit, 8);
            }
            other => panic!("expected LineTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_line_exactly_at_cap_is_accepted() {
        let lines = collect(b"12345678\n", 8).unwrap();
        assert_eq!(lines, vec![(1, "12345678".to_string())]);
    }

    #[test]
    fn test_read_error_is_fatal() {
        struct Failing;
        impl std::io::Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::Other, "disk gone"))
            }
        }
        let mut scanner = LineScanner::new(BufReader::new(Failing), "bad.jsonl", 1024);
        let err = scanner.next_line().unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
