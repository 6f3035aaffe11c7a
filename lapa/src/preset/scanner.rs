//! Line-oriented `key = value` scanner for preset text.
//!
//! The scanner is lenient by contract: comment and blank lines are skipped, an
//! unterminated quoted value runs to the end of its line, and the first
//! malformed line simply ends the scan. Callers treat any key that was never
//! produced as absent.

use std::iter::FusedIterator;
use std::str::Lines;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    Truncated,
    Finished,
}

/// A lazy, non-restartable sequence of `(key, value)` pairs.
///
/// Returning `None` is the end marker; once reached the scanner stays exhausted.
pub struct Scanner<'a> {
    lines: Lines<'a>,
    line: usize,
    state: State,
}

enum ScannedLine<'a> {
    Skip,
    Pair(&'a str, &'a str),
    Malformed,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Scanner {
            lines: text.lines(),
            line: 0,
            state: State::Scanning,
        }
    }

    /// Whether the scan ended on a malformed line rather than at the end of the text.
    pub fn truncated(&self) -> bool {
        self.state == State::Truncated
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != State::Scanning {
            return None;
        }

        for line in self.lines.by_ref() {
            self.line += 1;
            match scan_line(line) {
                ScannedLine::Skip => continue,
                ScannedLine::Pair(key, value) => return Some((key, value)),
                ScannedLine::Malformed => {
                    tracing::warn!(
                        "preset scan stopped at malformed line {}: {:?}",
                        self.line,
                        line
                    );
                    self.state = State::Truncated;
                    return None;
                }
            }
        }

        self.state = State::Finished;
        None
    }
}

impl FusedIterator for Scanner<'_> {}

fn is_blank(byte: u8) -> bool {
    byte == b' ' || byte == b'\t' || byte == b'\r'
}

fn skip_blanks(line: &str, mut at: usize) -> usize {
    let bytes = line.as_bytes();
    while at < bytes.len() && is_blank(bytes[at]) {
        at += 1;
    }
    at
}

fn scan_line(line: &str) -> ScannedLine<'_> {
    let bytes = line.as_bytes();
    let start = skip_blanks(line, 0);

    if start == bytes.len() || bytes[start] == b'#' || line[start..].starts_with("//") {
        return ScannedLine::Skip;
    }

    if !bytes[start].is_ascii_alphabetic() {
        return ScannedLine::Malformed;
    }

    let mut end = start + 1;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
    {
        end += 1;
    }
    let key = &line[start..end];

    let equals = skip_blanks(line, end);
    if equals == bytes.len() || bytes[equals] != b'=' {
        return ScannedLine::Malformed;
    }

    let value_start = skip_blanks(line, equals + 1);
    if value_start == bytes.len() {
        return ScannedLine::Malformed;
    }

    if bytes[value_start] == b'"' {
        let quoted = value_start + 1;
        let mut at = quoted;
        while at < bytes.len() {
            match bytes[at] {
                b'\\' => at += 2,
                b'"' => return ScannedLine::Pair(key, &line[quoted..at]),
                _ => at += 1,
            }
        }
        // unterminated: the value runs to the end of the line
        return ScannedLine::Pair(key, line[quoted..].trim_end_matches('\r'));
    }

    let mut value_end = value_start;
    while value_end < bytes.len()
        && !bytes[value_end].is_ascii_whitespace()
        && bytes[value_end] != b'#'
    {
        value_end += 1;
    }

    if value_end == value_start {
        return ScannedLine::Malformed;
    }

    ScannedLine::Pair(key, &line[value_start..value_end])
}
