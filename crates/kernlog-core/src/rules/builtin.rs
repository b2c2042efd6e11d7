//! Built-in kernel log categories, in priority order.

use once_cell::sync::Lazy;

use super::{ClassificationRule, RuleSet};

pub const KERNEL_PANIC: &str = "KERNEL_PANIC";
pub const OOM_KILL: &str = "OOM_KILL";
pub const FILESYSTEM_CORRUPTION: &str = "FILESYSTEM_CORRUPTION";
pub const HARDWARE_FAIL: &str = "HARDWARE_FAIL";
pub const SEGFAULT: &str = "SEGFAULT";

// Panic and OOM come first so they win over generic I/O or hardware phrases
// appearing on the same line.
const DEFINITIONS: &[(&str, &str, &str)] = &[
    (
        KERNEL_PANIC,
        "Kernel panic, oops call trace or crash-kernel boot",
        r"kernel\s+panic|call\s+trace:|doing\s+fast\s+boot",
    ),
    (
        OOM_KILL,
        "Out-of-memory killer activity or failed page allocation",
        r"out\s+of\s+memory|oom-killer|kill\s+process|page\s+allocation\s+failure",
    ),
    (
        FILESYSTEM_CORRUPTION,
        "Block I/O errors, filesystem errors or forced read-only remounts",
        r"i/o\s+error|ext[234]-fs\s+error|xfs_error|btrfs:?\s+error|journal\s+commit\s+i/o\s+error|remounting\s+filesystem\s+read-only",
    ),
    (
        HARDWARE_FAIL,
        "Machine check exceptions, link resets or thermal events",
        r"mce:\s*\[hardware\s+error\]|hard\s+resetting\s+link|critical\s+temperature",
    ),
    (
        SEGFAULT,
        "User-space segmentation faults",
        r"segfault|segmentation\s+fault",
    ),
];

pub(crate) static BUILTIN_RULE_SET: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new(all_rules()).expect("built-in kernel log rules must compile")
});

/// The built-in rules in declaration (priority) order.
pub fn all_rules() -> Vec<ClassificationRule> {
    DEFINITIONS
        .iter()
        .map(|(name, description, pattern)| ClassificationRule {
            name: (*name).to_string(),
            description: (*description).to_string(),
            pattern: (*pattern).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(line: &str) -> Option<&'static str> {
        RuleSet::builtin()
            .first_match(line)
            .map(|rule| rule.name.as_str())
    }

    #[test]
    fn builtin_rules_compile_in_declared_order() {
        let names: Vec<_> = RuleSet::builtin()
            .rules()
            .iter()
            .map(|rule| rule.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![KERNEL_PANIC, OOM_KILL, FILESYSTEM_CORRUPTION, HARDWARE_FAIL, SEGFAULT]
        );
    }

    #[test]
    fn recognises_representative_phrases() {
        let cases = [
            ("Kernel panic - not syncing: Fatal exception", KERNEL_PANIC),
            ("Call Trace:", KERNEL_PANIC),
            ("Doing fast boot SMP init", KERNEL_PANIC),
            ("Out of memory: Killed process 4242 (java)", OOM_KILL),
            ("nginx invoked oom-killer: gfp_mask=0x201da", OOM_KILL),
            ("Kill process 1234 (foo) score 900 or sacrifice child", OOM_KILL),
            ("kworker/u8:2: page allocation failure: order:4", OOM_KILL),
            ("blk_update_request: I/O error, dev sda, sector 2048", FILESYSTEM_CORRUPTION),
            ("EXT4-fs error (device sda1): ext4_find_entry:1455", FILESYSTEM_CORRUPTION),
            ("EXT3-fs error (device sdb2)", FILESYSTEM_CORRUPTION),
            ("XFS (dm-0): xfs_error_report", FILESYSTEM_CORRUPTION),
            ("BTRFS: error (device sdc) in btrfs_run_delayed_refs", FILESYSTEM_CORRUPTION),
            ("Remounting filesystem read-only", FILESYSTEM_CORRUPTION),
            ("mce: [Hardware Error]: Machine check events logged", HARDWARE_FAIL),
            ("ata1: hard resetting link", HARDWARE_FAIL),
            ("CPU0: Core temperature above threshold, critical temperature reached", HARDWARE_FAIL),
            ("app[812]: segfault at 0 ip 00007f sp 00007ffd error 4", SEGFAULT),
            ("Segmentation fault (core dumped)", SEGFAULT),
        ];
        for (line, expected) in cases {
            assert_eq!(category(line), Some(expected), "line: {line}");
        }
    }

    #[test]
    fn ignores_ordinary_boot_messages() {
        for line in [
            "Linux version 6.4.0-150600.23-default (geeko@buildhost)",
            "usb 1-1: new high-speed USB device number 2 using xhci_hcd",
            "EXT4-fs (sda1): mounted filesystem with ordered data mode",
            "",
        ] {
            assert_eq!(category(line), None, "line: {line}");
        }
    }

    #[test]
    fn journal_io_error_stays_filesystem() {
        assert_eq!(
            category("JBD2: Detected IO errors while flushing file data; journal commit I/O error"),
            Some(FILESYSTEM_CORRUPTION)
        );
    }

    #[test]
    fn panic_outranks_every_other_category() {
        assert_eq!(
            category("segfault then I/O error then Kernel panic - not syncing: Out of memory"),
            Some(KERNEL_PANIC)
        );
        assert_eq!(
            category("ata2: hard resetting link after segfault"),
            Some(HARDWARE_FAIL)
        );
    }
}
