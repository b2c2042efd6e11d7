use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, Map};
use serde::Deserialize;

/// Layered CLI configuration: optional config file, then `KERNLOG_*` environment variables.
///
/// Command-line flags are applied on top by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Extra JSON rule pack appended after the built-in rules.
    pub rules_file: Option<PathBuf>,
    /// Only scan the last N lines of the dump.
    pub tail: Option<usize>,
    /// Append per-category counts to the report.
    pub summary: bool,
    /// Keep unmatched lines in the report as `UNCATEGORIZED`.
    pub audit: bool,
    /// `tracing` filter used when neither `RUST_LOG` nor `--debug` is given.
    pub log_level: Option<String>,
}

impl Settings {
    const ENV_PREFIX: &'static str = "KERNLOG";

    /// Load settings from an optional file and the process environment.
    ///
    /// * `KERNLOG_RULES_FILE`: path to a JSON rule pack.
    /// * `KERNLOG_TAIL`: number of trailing lines to scan.
    /// * `KERNLOG_SUMMARY` / `KERNLOG_AUDIT`: `true` to enable.
    /// * `KERNLOG_LOG_LEVEL`: default log filter.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(Self::ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );
        let config = builder.build().with_context(|| match path {
            Some(path) => format!("failed to load configuration from {}", path.display()),
            None => "failed to load configuration from environment".to_string(),
        })?;
        config
            .try_deserialize()
            .context("configuration contains invalid values")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::write;

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let settings = Settings::load_with_env(None, env(&[])).expect("should load defaults");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn reads_toml_file() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write(
            file.path(),
            "rules_file = \"rules/kernel-extra.json\"\ntail = 500\nsummary = true\n",
        )
        .unwrap();
        let settings =
            Settings::load_with_env(Some(file.path()), env(&[])).expect("should parse toml");
        assert_eq!(
            settings.rules_file.as_deref(),
            Some(Path::new("rules/kernel-extra.json"))
        );
        assert_eq!(settings.tail, Some(500));
        assert!(settings.summary);
        assert!(!settings.audit);
    }

    #[test]
    fn environment_overrides_file() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write(file.path(), "tail: 500\nlog_level: info\n").unwrap();
        let settings = Settings::load_with_env(
            Some(file.path()),
            env(&[
                ("KERNLOG_TAIL", "20"),
                ("KERNLOG_AUDIT", "true"),
                ("OTHER_TAIL", "1"),
            ]),
        )
        .expect("should merge env");
        assert_eq!(settings.tail, Some(20));
        assert!(settings.audit);
        assert_eq!(settings.log_level.as_deref(), Some("info"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Settings::load_with_env(Some(Path::new("/nonexistent/kernlog.toml")), env(&[]))
            .expect_err("missing config should error");
        assert!(err.to_string().contains("/nonexistent/kernlog.toml"));
    }

    #[test]
    fn rejects_non_numeric_tail() {
        let err = Settings::load_with_env(None, env(&[("KERNLOG_TAIL", "lots")]))
            .expect_err("tail must be numeric");
        assert!(err.to_string().contains("invalid values"));
    }
}
