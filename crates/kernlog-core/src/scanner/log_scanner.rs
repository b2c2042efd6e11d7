use tracing::{debug, instrument};

use super::{classify, ClassifiedEntry, LogLine, ScanOptions};
use crate::rules::RuleSet;

/// Splits a kernel log dump into lines and classifies each one against a rule set.
#[derive(Debug, Clone, Copy)]
pub struct LogScanner<'r> {
    rules: &'r RuleSet,
    options: ScanOptions,
}

impl<'r> LogScanner<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self::with_options(rules, ScanOptions::default())
    }

    pub fn with_options(rules: &'r RuleSet, options: ScanOptions) -> Self {
        Self { rules, options }
    }

    pub fn rules(&self) -> &'r RuleSet {
        self.rules
    }

    /// Classify every line of `raw`, preserving source order.
    ///
    /// Unless `include_unmatched` is set only lines with a category are returned.
    #[instrument(name = "scan_log", skip(self, raw), fields(input_len = raw.len()))]
    pub fn scan<'a>(&self, raw: &'a str) -> Vec<ClassifiedEntry<'a>>
    where
        'r: 'a,
    {
        let skip = match self.options.tail {
            Some(limit) => raw.lines().count().saturating_sub(limit),
            None => 0,
        };

        let mut entries = Vec::new();
        let mut scanned = 0usize;
        let mut matched = 0usize;
        for (idx, text) in raw.lines().enumerate().skip(skip) {
            scanned += 1;
            let line = LogLine::new(text);
            if line.trimmed.is_empty() {
                continue;
            }
            let category = classify(line.trimmed, self.rules);
            if category.is_some() {
                matched += 1;
            } else if !self.options.include_unmatched {
                continue;
            }
            entries.push(ClassifiedEntry {
                line_number: idx + 1,
                line,
                category,
            });
        }

        debug!(lines = scanned, matched, skipped = skip, "scan completed");
        entries
    }
}

/// Classify `raw` with default options.
pub fn scan<'a>(raw: &'a str, rules: &'a RuleSet) -> Vec<ClassifiedEntry<'a>> {
    LogScanner::new(rules).scan(raw)
}
