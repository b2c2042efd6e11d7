mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kernlog_core::{
    decode_log, render_report, BuiltinRules, FileRuleRepository, LogScanner, RenderOptions,
    RuleSet, ScanOptions,
};
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser, Debug)]
#[command(
    name = "kernlog",
    author,
    version,
    about = "Kernel ring buffer triage CLI"
)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// JSON rule pack appended after the built-in rules
    #[arg(long = "rules-file", value_name = "FILE", global = true)]
    rules_file: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a kernel log dump and print the report
    Scan {
        /// Read the dump from FILE instead of stdin
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Only scan the last N lines
        #[arg(long, value_name = "N")]
        tail: Option<usize>,
        /// Append per-category counts
        #[arg(long)]
        summary: bool,
        /// Also list lines that matched no rule
        #[arg(long)]
        audit: bool,
    },
    /// List the active rules in priority order
    ListRules {
        /// Emit rules as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_tracing(cli.debug, settings.log_level.as_deref());

    let rules_file = cli.rules_file.or_else(|| settings.rules_file.clone());
    let rules = load_rule_set(rules_file.as_deref())?;

    match cli.command.unwrap_or(Commands::ListRules { json: false }) {
        Commands::Scan {
            input,
            tail,
            summary,
            audit,
        } => {
            let scan_options = ScanOptions {
                tail: tail.or(settings.tail),
                include_unmatched: audit || settings.audit,
            };
            let render_options = RenderOptions {
                summary: summary || settings.summary,
            };
            scan(&rules, input.as_deref(), scan_options, render_options).await?
        }
        Commands::ListRules { json } => list_rules(&rules, rules_file.as_deref(), json)?,
    }
    Ok(())
}

fn load_rule_set(rules_file: Option<&Path>) -> Result<RuleSet> {
    let Some(path) = rules_file else {
        return Ok(RuleSet::builtin().clone());
    };
    let pack = FileRuleRepository::new(path);
    let rules = RuleSet::load(&[&BuiltinRules, &pack])
        .with_context(|| format!("failed to load rules from {}", path.display()))?;
    debug!(rules = rules.len(), path = %path.display(), "loaded rule pack");
    Ok(rules)
}

async fn scan(
    rules: &RuleSet,
    input: Option<&Path>,
    scan_options: ScanOptions,
    render_options: RenderOptions,
) -> Result<()> {
    let raw = read_input(input).await?;
    let text = decode_log(&raw);
    let entries = LogScanner::with_options(rules, scan_options).scan(&text);
    let report = render_report(&entries, render_options)?;
    print!("{report}");
    Ok(())
}

async fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read kernel log from {}", path.display())),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("failed to read kernel log from stdin")?;
            Ok(buf)
        }
    }
}

fn list_rules(rules: &RuleSet, rules_file: Option<&Path>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rules.rules())?);
        return Ok(());
    }

    let source = rules_file
        .map(|path| format!("built-in + {}", path.display()))
        .unwrap_or_else(|| "built-in".to_string());
    println!("{} rule(s) active ({source}), highest priority first", rules.len());
    for (idx, rule) in rules.rules().iter().enumerate() {
        println!(
            "{rank:>3}. {name:<21} :: {desc}",
            rank = idx + 1,
            name = rule.name,
            desc = rule.description,
        );
        println!("     /{}/", rule.pattern);
    }
    Ok(())
}

fn init_tracing(debug: bool, configured: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(configured.unwrap_or(DEFAULT_LOG_FILTER))
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
