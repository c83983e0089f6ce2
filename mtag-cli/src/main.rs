//! mtag - rule-based auto-tagging for local music libraries
//!
//! **Usage:**
//! ```bash
//! mtag [--config FILE] [-v] tag [--execute] [--path DIR]...
//! mtag check
//! mtag fields
//! mtag backup --output FILE
//! mtag restore --input FILE [--tags title,album] [--execute]
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mtag_cli::commands::{self, TagReport};
use mtag_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use mtag_common::logging::init_logging;
use mtag_common::{AppConfig, Field};
use std::path::PathBuf;
use tracing::info;

/// Rule-based auto-tagging for local music libraries
#[derive(Parser, Debug)]
#[command(name = "mtag")]
#[command(about = "Rule-based auto-tagging for local music libraries")]
#[command(version)]
struct Args {
    /// Config file (YAML, JSON or TOML)
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply the tagging rules to the library
    Tag {
        /// Write changes to files even when the config sets dry_run
        #[arg(long)]
        execute: bool,

        /// Library folder to use instead of the configured paths
        #[arg(short, long = "path", value_name = "DIR")]
        paths: Vec<PathBuf>,
    },

    /// Validate the config and print the tagging rules
    Check,

    /// List the field names rules can use
    Fields,

    /// Write the tags of every library track to a JSON file
    Backup {
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[arg(short, long = "path", value_name = "DIR")]
        paths: Vec<PathBuf>,
    },

    /// Restore tags from a backup file
    Restore {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Comma separated tag fields to restore (default: all)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long)]
        execute: bool,

        #[arg(short, long = "path", value_name = "DIR")]
        paths: Vec<PathBuf>,
    },
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let path = resolve_config_path(args.config.as_deref())?;
    AppConfig::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn print_report(report: &TagReport) {
    let failed: Vec<_> = report.saved.iter().filter(|r| r.error.is_some()).collect();
    if report.dry_run {
        println!(
            "{} track(s) would change ({} to save). Run with --execute to write.",
            report.diffs.len(),
            report.saved.len()
        );
    } else {
        println!(
            "{} track(s) changed, {} saved, {} failed",
            report.diffs.len(),
            report.saved.iter().filter(|r| r.saved).count(),
            failed.len()
        );
    }
    for result in failed {
        println!(
            "  failed: {} ({})",
            result.path.display(),
            result.error.as_deref().unwrap_or_default()
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::Fields = args.command {
        for line in commands::fields() {
            println!("{}", line);
        }
        return Ok(());
    }

    let config = load_config(&args)?;
    init_logging(&config.logging, args.verbose).context("Failed to initialise logging")?;

    info!("Starting mtag");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match &args.command {
        Command::Tag { execute, paths } => {
            let report = commands::tag(&config, paths, *execute).context("Tagging failed")?;
            print_report(&report);
        }
        Command::Check => {
            println!("{}", commands::check(&config));
        }
        Command::Fields => {}
        Command::Backup { output, paths } => {
            let count = commands::backup(&config, paths, output).context("Backup failed")?;
            println!("Backed up {} track(s) to {}", count, output.display());
        }
        Command::Restore {
            input,
            tags,
            execute,
            paths,
        } => {
            let fields = Field::from_names(tags.as_slice())?;
            let report = commands::restore(&config, paths, input, &fields, *execute)
                .context("Restore failed")?;
            print_report(&report);
        }
    }

    Ok(())
}
