//! AdShield-X CLI
//!
//! Developer tooling: compile a stored configuration into the installed
//! ruleset, check URLs against it, replay message logs and export the
//! TypeScript bindings.

mod replay;
mod ruleset_file;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;

use ax_core::domain::normalize_domains;
use ax_core::url::hostname;
use replay::{run_replay, ReplayOptions};
use ruleset_file::{compile_config, read_config, write_json};

#[derive(Parser)]
#[command(name = "ax-cli")]
#[command(about = "AdShield-X ruleset compiler and tools")]
struct Cli {
    /// Log filter, overriding RUST_LOG (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a configuration file into the dynamic ruleset
    Compile {
        /// Configuration JSON (blockingEnabled, customRules, whitelist)
        #[arg(short, long)]
        input: PathBuf,

        /// Output ruleset file
        #[arg(short, long, default_value = "rules.json")]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decide whether pages would be blocked under a configuration
    Check {
        /// Configuration JSON
        #[arg(short, long)]
        config: PathBuf,

        /// Page URLs to check
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Normalize allowlist entries as the extension stores them
    Normalize {
        #[arg(required = true)]
        domains: Vec<String>,
    },

    /// Replay a JSONL message log against in-memory storage
    Replay {
        /// Messages, one JSON object per line
        #[arg(short, long)]
        messages: PathBuf,

        /// Initial configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reject updates past this many installed rules
        #[arg(long)]
        max_rules: Option<usize>,
    },

    /// Write TypeScript definitions for the message protocol
    ExportTypes {
        #[arg(short, long, default_value = "bindings")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filters) = &cli.log_level {
        logger.parse_filters(filters);
    }
    logger.init();

    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            verbose,
        } => cmd_compile(&input, &output, verbose),
        Commands::Check { config, urls } => cmd_check(&config, &urls),
        Commands::Normalize { domains } => cmd_normalize(&domains),
        Commands::Replay {
            messages,
            config,
            max_rules,
        } => cmd_replay(&messages, config.as_deref(), max_rules),
        Commands::ExportTypes { output } => cmd_export_types(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_compile(input: &Path, output: &Path, verbose: bool) -> Result<(), String> {
    let config = read_config(input)?;
    let (compiled, elapsed_ms) = compile_config(&config);

    if verbose {
        for rule in &compiled.rules {
            println!(
                "  [{}] priority {} {}",
                rule.id,
                rule.priority,
                rule.action.action_type.as_str()
            );
        }
    }

    let rules = serde_json::to_value(&compiled.rules)
        .map_err(|e| format!("Failed to encode rules: {}", e))?;
    write_json(output, &rules)?;

    let stats = compiled.stats;
    println!("Compiled '{}' to '{}'", input.display(), output.display());
    println!("  Blocking: {}", if config.blocking_enabled { "enabled" } else { "disabled" });
    println!("  Rules:    {} ({} custom, {} allow)", stats.total(), stats.custom_rules, stats.allow_rules);
    if stats.dropped_rules > 0 {
        println!("  Dropped:  {} custom rules with conflicting ids", stats.dropped_rules);
    }
    println!("  Time:     {:.2}ms", elapsed_ms);

    Ok(())
}

fn cmd_check(config: &Path, urls: &[String]) -> Result<(), String> {
    let config = read_config(config)?;

    for url in urls {
        let host = hostname(url);
        let verdict = json!({
            "url": url,
            "hostname": host,
            "shouldBlock": config.should_block_url(url),
        });
        println!("{}", verdict);
    }

    Ok(())
}

fn cmd_normalize(domains: &[String]) -> Result<(), String> {
    for domain in normalize_domains(domains) {
        println!("{}", domain);
    }
    Ok(())
}

fn cmd_replay(messages: &Path, config: Option<&Path>, max_rules: Option<usize>) -> Result<(), String> {
    let summary = run_replay(ReplayOptions {
        config,
        messages,
        max_rules,
    })?;

    eprintln!("Replayed {} messages ({} without reply)", summary.messages, summary.ignored);
    eprintln!("  Logged matches:  {}", summary.matches_logged);
    eprintln!("  Installed rules: {}", summary.installed_rules);
    Ok(())
}

fn cmd_export_types(output: &Path) -> Result<(), String> {
    use ts_rs::TS;

    ax_service::message::Request::export_all_to(output)
        .map_err(|e| format!("Failed to export Request: {}", e))?;
    ax_service::message::Response::export_all_to(output)
        .map_err(|e| format!("Failed to export Response: {}", e))?;
    ax_core::types::ResourceType::export_all_to(output)
        .map_err(|e| format!("Failed to export ResourceType: {}", e))?;

    println!("Wrote TypeScript bindings to '{}'", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_is_optional_override() {
        let cli = Cli::try_parse_from(["ax-cli", "normalize", "a.com"]).unwrap();
        assert_eq!(cli.log_level, None);

        let cli = Cli::try_parse_from(["ax-cli", "normalize", "a.com", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
