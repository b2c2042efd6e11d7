use std::borrow::Cow;

use tracing::trace;

use crate::rules::RuleSet;

pub mod log_scanner;

/// One line of a kernel log dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLine<'a> {
    /// Line text as it appeared in the dump, surrounding whitespace included.
    pub raw: &'a str,
    /// `raw` without leading/trailing whitespace; used for matching and display.
    pub trimmed: &'a str,
}

impl<'a> LogLine<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            trimmed: raw.trim(),
        }
    }
}

/// A scanned line together with the category assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntry<'a> {
    /// 1-based position of the line in the original dump.
    pub line_number: usize,
    pub line: LogLine<'a>,
    /// Name of the highest-priority matching rule, `None` when nothing matched.
    pub category: Option<&'a str>,
}

impl ClassifiedEntry<'_> {
    pub fn is_classified(&self) -> bool {
        self.category.is_some()
    }
}

/// Knobs for a single scan. The defaults scan every line and keep matches only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Only scan the last `n` lines of the dump.
    pub tail: Option<usize>,
    /// Keep non-blank lines that matched no rule, with an absent category.
    pub include_unmatched: bool,
}

/// Category of the highest-priority rule matching `line`, if any.
pub fn classify<'r>(line: &str, rules: &'r RuleSet) -> Option<&'r str> {
    if line.is_empty() {
        return None;
    }
    rules.first_match(line).map(|rule| rule.name.as_str())
}

/// Like [`classify`], for lines that may not be valid UTF-8.
pub fn classify_bytes<'r>(line: &[u8], rules: &'r RuleSet) -> Option<&'r str> {
    classify(&decode_log(line), rules)
}

/// Decode a raw dump, replacing invalid UTF-8 sequences with U+FFFD.
pub fn decode_log(bytes: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        trace!(len = bytes.len(), "replaced invalid UTF-8 sequences in log input");
    }
    text
}
