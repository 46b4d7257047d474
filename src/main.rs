//! lox-memory - CLI
//!
//! Drives the growth policy and the reallocator so their behavior can be
//! inspected from the shell.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lox_memory::runtime::memory::GrowthPolicy;
use lox_memory::util::config::{load_config, save_config, MemoryConfig};
use lox_memory::util::logger::{self, LogLevel};
use lox_memory::{growth_sequence, simulate_growth, NAME, VERSION};
use std::path::PathBuf;

/// Inspect the interpreter's memory growth policy
#[derive(Parser, Debug)]
#[command(name = "lox-memory")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (RON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append N values into a growable array and show every reallocation
    Grow {
        /// Number of values to append
        #[arg(value_name = "N")]
        count: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the capacities the growth policy produces
    Policy {
        /// Capacity to start from
        #[arg(value_name = "START", default_value_t = 0)]
        start: usize,

        /// Number of growth steps
        #[arg(value_name = "STEPS", default_value_t = 8)]
        steps: usize,
    },

    /// Print the effective configuration, or write it to a file
    Config {
        /// Write the configuration (RON) here instead of printing it
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => MemoryConfig::default(),
    };

    if args.verbose {
        logger::init_with_level(LogLevel::Trace);
    } else {
        logger::init_with_level(config.log_level);
    }

    match args.command {
        Commands::Grow { count, json } => {
            let report = simulate_growth(count, &config).context("Failed to simulate growth")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let capacities: Vec<String> =
                    report.capacities().iter().map(|c| c.to_string()).collect();
                println!("appended:      {}/{}", report.appended, report.requested);
                println!("capacity:      {}", capacities.join(" -> "));
                println!("reallocations: {}", report.reallocations);
                for t in &report.transitions {
                    println!("  {:>10} -> {:<10} {:?}", t.old_size, t.new_size, t.kind);
                }
                if let Some(err) = &report.error {
                    eprintln!("stopped: {}", err);
                }
            }
        }
        Commands::Policy { start, steps } => {
            let policy: GrowthPolicy = config.growth;
            let sequence: Vec<String> = growth_sequence(policy, start, steps)
                .iter()
                .map(|c| c.to_string())
                .collect();
            println!("{}", sequence.join(" -> "));
        }
        Commands::Config { write } => match write {
            Some(path) => {
                save_config(&path, &config)
                    .with_context(|| format!("Failed to write config: {}", path.display()))?;
                eprintln!("Wrote {}", path.display());
            }
            None => println!("{}", serde_json::to_string_pretty(&config)?),
        },
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
