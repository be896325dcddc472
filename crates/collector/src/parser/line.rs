//! The line parser: payload bytes in, leveled timestamped records out.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};

use super::ansi::strip_ansi;
use super::model::{Level, LogRecord, RecordIds};
use crate::wire::StreamKind;

// Whole-word vocabularies, checked in priority order. First hit wins.
const ERROR_WORDS: &str = "error|err|fail|failed|failure|fatal|panic|exception|critical";
const WARN_WORDS: &str = "warn|warning|deprecated";
const INFO_WORDS: &str = "info|notice|started|starting|listening|ready|connected";
const DEBUG_WORDS: &str = "debug|trace|verbose";

/// Stateless line parser. Holds only its pre-built level matchers, so one
/// instance per pump task is cheap and the parse path allocates nothing
/// beyond the records it returns.
pub struct LineParser {
    error_words: RegexMatcher,
    warn_words: RegexMatcher,
    info_words: RegexMatcher,
    debug_words: RegexMatcher,
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            error_words: word_matcher(ERROR_WORDS),
            warn_words: word_matcher(WARN_WORDS),
            info_words: word_matcher(INFO_WORDS),
            debug_words: word_matcher(DEBUG_WORDS),
        }
    }

    /// Parse one demultiplexed payload into records.
    ///
    /// Never fails: invalid UTF-8 is decoded lossily, blank lines are
    /// discarded, unparseable timestamps fall back to arrival time. Ids
    /// are drawn from the shared generator once per emitted record, in
    /// emission order.
    pub fn parse_chunk(
        &self,
        payload: &Bytes,
        source_id: &str,
        source_name: &str,
        kind: StreamKind,
        ids: &RecordIds,
    ) -> Vec<LogRecord> {
        if payload.is_empty() {
            return Vec::new();
        }

        let text = String::from_utf8_lossy(payload);
        let mut records = Vec::new();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }

            let clean = strip_ansi(line);
            let (timestamp, message) = match leading_timestamp(&clean) {
                Some((ts, consumed)) => (ts, clean[consumed..].to_string()),
                None => (Utc::now(), clean.into_owned()),
            };
            let level = self.classify(&message);

            records.push(LogRecord {
                id: ids.next(),
                source_id: source_id.to_string(),
                source_name: source_name.to_string(),
                timestamp,
                message,
                stream: kind,
                level,
                raw: line.to_string(),
            });
        }

        records
    }

    fn classify(&self, message: &str) -> Level {
        let bytes = message.as_bytes();
        if self.error_words.is_match(bytes).unwrap_or(false) {
            Level::Error
        } else if self.warn_words.is_match(bytes).unwrap_or(false) {
            Level::Warn
        } else if self.info_words.is_match(bytes).unwrap_or(false) {
            Level::Info
        } else if self.debug_words.is_match(bytes).unwrap_or(false) {
            Level::Debug
        } else {
            Level::Unknown
        }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

fn word_matcher(words: &str) -> RegexMatcher {
    RegexMatcherBuilder::new()
        .case_insensitive(true)
        .word(true)
        .build(words)
        .expect("static level vocabulary")
}

/// Recognize a leading ISO-8601 timestamp token followed by exactly one
/// space. The container engine prepends one per line when timestamps are
/// requested; applications often emit their own as well.
///
/// Accepted shape: `YYYY-MM-DDTHH:MM:SS[.frac](Z|±HH:MM) `. Returns the
/// parsed instant and the byte offset of the message after the space.
fn leading_timestamp(line: &str) -> Option<(DateTime<Utc>, usize)> {
    let b = line.as_bytes();
    if b.len() < 20 {
        return None;
    }
    if !b[0].is_ascii_digit() || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    if b[10] != b'T' || b[13] != b':' || b[16] != b':' {
        return None;
    }

    let mut i = 19;
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return None;
        }
    }

    if i < b.len() && b[i] == b'Z' {
        i += 1;
    } else if i + 5 < b.len()
        && (b[i] == b'+' || b[i] == b'-')
        && b[i + 1].is_ascii_digit()
        && b[i + 2].is_ascii_digit()
        && b[i + 3] == b':'
        && b[i + 4].is_ascii_digit()
        && b[i + 5].is_ascii_digit()
    {
        i += 6;
    } else {
        return None;
    }

    if i >= b.len() || b[i] != b' ' {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(&line[..i]).ok()?;
    Some((parsed.with_timezone(&Utc), i + 1))
}
