//! `rule-cli run --rules <path> --input <path> [--config <toml>]`: loads a
//! ruleset and a stream of input documents from disk, wires the reference
//! implementations of every external collaborator, and drives `apply_rules`
//! once per input line.

mod config;

use clap::{Parser, Subcommand};
use config::RuleEngineConfig;
use rule_core::{Context, Driver, Rule, Value};
use rule_metrics::InMemoryMetrics;
use rule_stdlib::{InMemoryActionRegistry, MqttTopicMatcher, SerdeJsonCodec, StdFunctionLibrary};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rule-cli", about = "Rule evaluation runtime driver", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a ruleset against a stream of JSON Lines input documents.
    Run {
        /// Path to a JSON file holding an array of compiled rules.
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Path to a JSON Lines file of input documents.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Optional TOML config file layered under these flags.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Log level passed to the tracing subscriber (overrides RUST_LOG).
        #[arg(long)]
        log_level: Option<String>,
    },
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            rules,
            input,
            config,
            log_level,
        } => run(rules, input, config, log_level),
    }
}

fn run(
    rules_flag: Option<PathBuf>,
    input_flag: Option<PathBuf>,
    config_flag: Option<PathBuf>,
    log_level_flag: Option<String>,
) -> std::process::ExitCode {
    let file_config = config_flag
        .as_deref()
        .map(RuleEngineConfig::from_toml_file)
        .unwrap_or_default();
    let cfg = file_config.layered_over(RuleEngineConfig {
        ruleset_path: rules_flag,
        input_path: input_flag,
        log_level: log_level_flag,
    });

    init_tracing(cfg.log_level.as_deref().unwrap_or("info"));

    let Some(ruleset_path) = cfg.ruleset_path else {
        eprintln!("missing --rules (or ruleset_path in --config)");
        return std::process::ExitCode::FAILURE;
    };
    let Some(input_path) = cfg.input_path else {
        eprintln!("missing --input (or input_path in --config)");
        return std::process::ExitCode::FAILURE;
    };

    let rules: Vec<Rule> = match std::fs::read_to_string(&ruleset_path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(rules) => rules,
        Err(err) => {
            eprintln!("failed to load ruleset from {}: {err}", ruleset_path.display());
            return std::process::ExitCode::FAILURE;
        }
    };

    let input_text = match std::fs::read_to_string(&input_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("failed to read input from {}: {err}", input_path.display());
            return std::process::ExitCode::FAILURE;
        }
    };

    let functions = StdFunctionLibrary;
    let topics = MqttTopicMatcher;
    let json = SerdeJsonCodec;
    let registry = InMemoryActionRegistry::new();
    let metrics = InMemoryMetrics::new();

    for (line_no, line) in input_text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let input: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(line = line_no + 1, error = %err, "skipping malformed input line");
                continue;
            }
        };
        let driver = Driver {
            ctx: Context {
                functions: &functions,
                topics: &topics,
                json: &json,
            },
            registry: &registry,
            metrics: &metrics,
        };
        rule_core::apply_rules(&rules, &input, &driver);
    }

    for ((id, counter), value) in metrics.snapshot() {
        println!("{id} {counter} {value}");
    }
    std::process::ExitCode::SUCCESS
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
