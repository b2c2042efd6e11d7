use std::fmt::{self, Write};

use crate::rules::builtin::{KERNEL_PANIC, OOM_KILL};
use crate::scanner::ClassifiedEntry;

pub const REPORT_HEADER: &str = "=== Kernel Log Analysis ===";
pub const REPORT_FOOTER: &str = "=== End of Kernel Log Analysis ===";
/// Category shown for lines kept by an audit scan that matched no rule.
pub const UNCATEGORIZED: &str = "UNCATEGORIZED";

const SEPARATOR_WIDTH: usize = 80;
const SEVERITY_WIDTH: usize = 14;
const CATEGORY_WIDTH: usize = 21;

/// Framing applied to a report line, derived from the entry's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Memory,
    System,
    Info,
}

impl Severity {
    pub fn for_category(category: Option<&str>) -> Self {
        match category {
            Some(KERNEL_PANIC) => Self::Critical,
            Some(OOM_KILL) => Self::Memory,
            Some(_) => Self::System,
            None => Self::Info,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL ALERT",
            Self::Memory => "Memory Issue",
            Self::System => "System Error",
            Self::Info => "Info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional report sections. The default renders the base report only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Append per-category line counts before the footer.
    pub summary: bool,
}

/// Number of entries per category, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts<'a> {
    counts: Vec<(&'a str, usize)>,
    uncategorized: usize,
}

impl<'a> CategoryCounts<'a> {
    pub fn tally(entries: &[ClassifiedEntry<'a>]) -> Self {
        let mut tally = Self::default();
        for entry in entries {
            match entry.category {
                Some(name) => match tally.counts.iter_mut().find(|(seen, _)| *seen == name) {
                    Some((_, count)) => *count += 1,
                    None => tally.counts.push((name, 1)),
                },
                None => tally.uncategorized += 1,
            }
        }
        tally
    }

    pub fn get(&self, category: &str) -> usize {
        self.counts
            .iter()
            .find(|(name, _)| *name == category)
            .map_or(0, |(_, count)| *count)
    }

    pub fn uncategorized(&self) -> usize {
        self.uncategorized
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum::<usize>() + self.uncategorized
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, usize)> + '_ {
        self.counts.iter().copied()
    }
}

/// Render the base report for the given entries.
pub fn render(entries: &[ClassifiedEntry<'_>]) -> anyhow::Result<String> {
    render_report(entries, RenderOptions::default())
}

/// Produce the plain-text report. Entries keep their scan order.
pub fn render_report(
    entries: &[ClassifiedEntry<'_>],
    options: RenderOptions,
) -> anyhow::Result<String> {
    let mut out = String::new();
    let separator = "-".repeat(SEPARATOR_WIDTH);

    writeln!(out, "{REPORT_HEADER}")?;
    write_row(&mut out, "SEVERITY", "CATEGORY", "MESSAGE")?;
    writeln!(out, "{separator}")?;

    for entry in entries {
        let severity = Severity::for_category(entry.category);
        write_row(
            &mut out,
            severity.label(),
            entry.category.unwrap_or(UNCATEGORIZED),
            entry.line.trimmed,
        )?;
    }

    if options.summary {
        let counts = CategoryCounts::tally(entries);
        writeln!(out, "{separator}")?;
        writeln!(out, "Summary ({} line(s)):", counts.total())?;
        for (category, count) in counts.iter() {
            writeln!(out, "  {category}: {count}")?;
        }
        if counts.uncategorized() > 0 {
            writeln!(out, "  {UNCATEGORIZED}: {}", counts.uncategorized())?;
        }
    }

    writeln!(out, "{REPORT_FOOTER}")?;
    Ok(out)
}

fn write_row(out: &mut String, severity: &str, category: &str, message: &str) -> fmt::Result {
    writeln!(
        out,
        "{severity:<sw$} | {category:<cw$} | {message}",
        sw = SEVERITY_WIDTH,
        cw = CATEGORY_WIDTH,
    )
}
