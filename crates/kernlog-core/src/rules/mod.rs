use anyhow::Result as AnyResult;
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, trace};

pub mod builtin;
pub mod file_repository;

/// Definition of a single classification rule.
///
/// Priority is implicit: a rule's position inside its [`RuleSet`] decides which
/// category wins when several patterns match the same line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Stable category identifier (e.g. `KERNEL_PANIC`).
    pub name: String,
    /// Human-readable summary shown when listing rules.
    pub description: String,
    /// Regex source, compiled case-insensitively.
    pub pattern: String,
}

impl ClassificationRule {
    /// Construct a rule from a raw regular expression, validating invariants.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self, RuleSetError> {
        let rule = Self {
            name: name.into(),
            description: description.into(),
            pattern: pattern.into(),
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Construct a rule matching any of the given literal phrases.
    ///
    /// Phrases are escaped and any run of whitespace inside a phrase matches
    /// any run of whitespace in the log line.
    pub fn from_phrases<S: AsRef<str>>(
        name: impl Into<String>,
        description: impl Into<String>,
        phrases: &[S],
    ) -> Result<Self, RuleSetError> {
        let name = name.into();
        let mut alternatives = Vec::with_capacity(phrases.len());
        for phrase in phrases {
            let pattern = phrase_pattern(phrase.as_ref());
            if pattern.is_empty() {
                return Err(RuleSetError::EmptyPattern { name });
            }
            alternatives.push(pattern);
        }
        Self::new(name, description, alternatives.join("|"))
    }

    /// Validate invariants that do not require compiling the pattern.
    pub fn validate(&self) -> Result<(), RuleSetError> {
        if self.name.trim().is_empty() {
            return Err(RuleSetError::EmptyName);
        }
        if self.pattern.trim().is_empty() {
            return Err(RuleSetError::EmptyPattern {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    fn compile(&self) -> Result<Regex, RuleSetError> {
        let regex = RegexBuilder::new(&self.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RuleSetError::InvalidPattern {
                name: self.name.clone(),
                source,
            })?;
        if regex.is_match("") {
            return Err(RuleSetError::MatchesEmpty {
                name: self.name.clone(),
            });
        }
        Ok(regex)
    }
}

/// Escape a literal phrase and make its internal whitespace tolerant.
pub fn phrase_pattern(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

/// Errors raised while building a rule set. All of them are fatal for the set.
#[derive(Debug, Error, Clone)]
pub enum RuleSetError {
    #[error("rule name must not be blank")]
    EmptyName,
    #[error("rule `{name}` pattern must not be empty")]
    EmptyPattern { name: String },
    #[error("rule `{name}` must define either `phrases` or `pattern`, not both")]
    AmbiguousPattern { name: String },
    #[error("duplicate rule name `{name}`")]
    DuplicateName { name: String },
    #[error("rule `{name}` pattern failed to compile: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule `{name}` pattern matches the empty string")]
    MatchesEmpty { name: String },
    #[error("failed to compile combined rule set: {0}")]
    Combined(#[from] regex::Error),
}

/// Ordered, immutable set of compiled classification rules.
///
/// All patterns are evaluated in a single pass per line; when several match,
/// the one declared first wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
    matcher: RegexSet,
}

impl RuleSet {
    /// Validate and compile the rules in declaration order.
    pub fn new(rules: Vec<ClassificationRule>) -> Result<Self, RuleSetError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !seen.insert(rule.name.as_str()) {
                return Err(RuleSetError::DuplicateName {
                    name: rule.name.clone(),
                });
            }
            rule.compile()?;
            trace!(rule = %rule.name, "compiled rule pattern");
        }
        let matcher = RegexSetBuilder::new(rules.iter().map(|rule| rule.pattern.as_str()))
            .case_insensitive(true)
            .build()?;
        debug!(rules = rules.len(), "rule set constructed");
        Ok(Self { rules, matcher })
    }

    /// The built-in kernel log rules, compiled once per process.
    pub fn builtin() -> &'static RuleSet {
        &builtin::BUILTIN_RULE_SET
    }

    /// Concatenate rules from each repository in order and compile them.
    pub fn load(repositories: &[&dyn RuleRepository]) -> AnyResult<Self> {
        let mut rules = Vec::new();
        for repo in repositories {
            rules.extend(repo.load_rules()?);
        }
        Ok(Self::new(rules)?)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Highest-priority rule matching `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&ClassificationRule> {
        self.matcher
            .matches(text)
            .iter()
            .next()
            .and_then(|idx| self.rules.get(idx))
    }
}

/// Abstraction over rule sources so built-in and file-backed packs compose.
pub trait RuleRepository: Send + Sync {
    /// Retrieve every rule this source provides, in priority order.
    fn load_rules(&self) -> AnyResult<Vec<ClassificationRule>>;

    /// Fetch a single rule by name if it exists.
    fn get_rule(&self, name: &str) -> AnyResult<Option<ClassificationRule>> {
        Ok(self
            .load_rules()?
            .into_iter()
            .find(|rule| rule.name == name))
    }
}

/// Repository serving the built-in kernel log rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinRules;

impl RuleRepository for BuiltinRules {
    fn load_rules(&self) -> AnyResult<Vec<ClassificationRule>> {
        Ok(builtin::all_rules())
    }
}
