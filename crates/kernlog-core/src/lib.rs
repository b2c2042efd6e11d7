//! Kernel ring buffer classification: rules, line classifier, scanner and report renderer.

pub mod report;
pub mod rules;
pub mod scanner;

pub use report::{render, render_report, CategoryCounts, RenderOptions, Severity};
pub use rules::{
    builtin::all_rules, file_repository::FileRuleRepository, BuiltinRules, ClassificationRule,
    RuleRepository, RuleSet, RuleSetError,
};
pub use scanner::{
    classify, classify_bytes, decode_log,
    log_scanner::{scan, LogScanner},
    ClassifiedEntry, LogLine, ScanOptions,
};
