use std::{collections::HashSet, fs, path::PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing::debug;

use super::{ClassificationRule, RuleRepository, RuleSetError};

/// Loads an additional rule pack from a JSON file.
///
/// The file holds an array of `{ "name", "description"?, "phrases"? | "pattern"? }`
/// objects. The pack is parsed on first use and cached afterwards.
pub struct FileRuleRepository {
    path: PathBuf,
    cache: OnceCell<Vec<ClassificationRule>>,
}

impl FileRuleRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    fn load_pack(&self) -> Result<Vec<ClassificationRule>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read rule pack at {}", self.path.display()))?;
        let items: Vec<JsonRule> = serde_json::from_str(&raw).with_context(|| {
            format!("invalid JSON structure in rule pack at {}", self.path.display())
        })?;
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.name.clone()) {
                return Err(RuleSetError::DuplicateName { name: item.name }.into());
            }
            let rule = item
                .into_rule()
                .with_context(|| format!("invalid rule in {}", self.path.display()))?;
            rules.push(rule);
        }
        debug!(path = %self.path.display(), rules = rules.len(), "rule pack loaded");
        Ok(rules)
    }
}

impl RuleRepository for FileRuleRepository {
    fn load_rules(&self) -> Result<Vec<ClassificationRule>> {
        let rules = self.cache.get_or_try_init(|| self.load_pack())?;
        Ok(rules.clone())
    }
}

#[derive(serde::Deserialize)]
struct JsonRule {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    phrases: Vec<String>,
    #[serde(default)]
    pattern: Option<String>,
}

impl JsonRule {
    fn into_rule(self) -> Result<ClassificationRule, RuleSetError> {
        match (self.phrases.is_empty(), self.pattern) {
            (false, Some(_)) => Err(RuleSetError::AmbiguousPattern { name: self.name }),
            (false, None) => {
                ClassificationRule::from_phrases(self.name, self.description, self.phrases.as_slice())
            }
            (true, Some(pattern)) => ClassificationRule::new(self.name, self.description, pattern),
            (true, None) => Err(RuleSetError::EmptyPattern { name: self.name }),
        }
    }
}
