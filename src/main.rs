// SPDX-License-Identifier: PMPL-1.0-or-later

//! slophound: audit a source tree for AI-generated code smell.
//!
//! A tool that scans a project with assistant-fingerprint, quality, and
//! cross-file detection rules, scores the result on a 0-100 scale, and
//! tracks baselines and score history under `.slophound/`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use slophound::config::{self, Config};
use slophound::rules::Registry;
use slophound::scan::{scan, ScanOptions};
use slophound::{baseline, history, report};

#[derive(Parser)]
#[command(name = "slophound")]
#[command(version)]
#[command(about = "Audit a source tree for AI-generated code smell")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Terminal,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full audit and print the scored report
    Scan {
        /// Project root to scan
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,

        /// Scoring profile (default, strict, lenient)
        #[arg(short, long)]
        profile: Option<String>,

        /// Score threshold, overriding the configured one
        #[arg(short, long)]
        threshold: Option<u32>,

        /// Exit 1 when the score falls below N (implies the threshold)
        #[arg(long, value_name = "N")]
        fail_under: Option<u32>,

        /// Skip the violation cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Worker thread count, overriding config and environment
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// List the registered rules and their metadata
    Rules {
        /// Only rules enabled by the project configuration
        #[arg(long)]
        enabled_only: bool,

        /// Listing format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,
    },

    /// Scan and write the accepted-findings baseline
    Baseline {
        /// Project root to scan
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Baseline file to write (default: the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the recorded score history
    Trend {
        /// Project root holding the history log
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Number of newest entries to show
        #[arg(short, long, default_value = "20")]
        last: usize,

        /// Report format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            format,
            profile,
            threshold,
            fail_under,
            no_cache,
            workers,
        } => {
            let registry = Registry::with_builtins()?;
            let options = ScanOptions {
                workers,
                use_cache: no_cache.then_some(false),
                profile,
                skip_baseline: false,
            };
            let outcome = scan(&registry, &path, &options)?;

            let effective_threshold = fail_under
                .or(threshold)
                .unwrap_or(outcome.config.threshold);
            let fail_on_slop = fail_under.is_some() || outcome.config.fail_on_slop;

            match format {
                FormatArg::Terminal => {
                    print!(
                        "{}",
                        report::render_terminal(&outcome.summary, &path, effective_threshold)
                    );
                }
                FormatArg::Json => println!("{}", report::render_json(&outcome.summary)?),
            }

            if fail_on_slop && outcome.summary.score < effective_threshold {
                std::process::exit(1);
            }
        }

        Commands::Rules {
            enabled_only,
            format,
        } => {
            let registry = Registry::with_builtins()?;
            let metas = if enabled_only {
                let config = Config::load(std::path::Path::new("."))?;
                let enabled = config::enabled_rule_ids(&config.rules, &registry.ids());
                registry
                    .metas()
                    .into_iter()
                    .filter(|meta| enabled.contains(&meta.id))
                    .collect()
            } else {
                registry.metas()
            };
            match format {
                FormatArg::Terminal => print!("{}", report::render_rules_terminal(&metas)),
                FormatArg::Json => println!("{}", report::render_rules_json(&metas)?),
            }
        }

        Commands::Baseline { path, output } => {
            let registry = Registry::with_builtins()?;
            let options = ScanOptions {
                skip_baseline: true,
                ..ScanOptions::default()
            };
            let outcome = scan(&registry, &path, &options)?;

            let target = match output {
                Some(file) => file,
                None => match outcome.config.baseline.as_deref() {
                    Some(configured) => path.join(configured),
                    None => path.join(baseline::DEFAULT_BASELINE_PATH),
                },
            };
            let document = baseline::build_baseline(&outcome.summary.violations, &path);
            baseline::save_baseline(&document, &target)?;
            println!(
                "Baseline saved to: {} ({} findings accepted)",
                target.display(),
                outcome.summary.violations.len()
            );
        }

        Commands::Trend { path, last, format } => {
            let config = Config::load(&path)?;
            let entries = history::load(&path.join(&config.history.path));
            let shown = entries.len().saturating_sub(last);
            let window = &entries[shown..];
            match format {
                FormatArg::Terminal => print!("{}", report::render_trend_terminal(window)),
                FormatArg::Json => println!("{}", report::render_trend_json(window)?),
            }
        }
    }

    Ok(())
}
