//! dapter command-line front end
//!
//! Usage:
//!   dapter convert --from json --to csv --many -i people.json
//!   dapter formats
//!   dapter migrate --dir migrations upgrade head
//!
//! Format settings come from `dapter.toml` unless `--config` points elsewhere.

use std::io::{self, Read};
use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dapter_cli::{MigrateAction, build_table, convert, list_formats, migrate};
use dapter_formats::FormatConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "dapter")]
#[command(about = "Convert records between formats and manage schema migrations")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a document from one format to another
    Convert {
        /// Source format key
        #[arg(long)]
        from: String,

        /// Target format key
        #[arg(long)]
        to: String,

        /// Treat the input as a batch of records
        #[arg(long)]
        many: bool,

        /// Input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to format config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the registered format keys
    Formats {
        /// Path to format config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Manage schema migrations
    Migrate {
        /// Migrations directory
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,

        #[command(subcommand)]
        action: MigrateAction,
    },
}

fn load_config(path: Option<PathBuf>) -> FormatConfig {
    FormatConfig::load_from(path.unwrap_or_else(FormatConfig::default_path))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    match args.command {
        Command::Convert {
            from,
            to,
            many,
            input,
            output,
            config,
        } => {
            let table = build_table(&load_config(config))?;
            let text = match &input {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };

            let rendered = convert(&table, &text, &from, &to, many)?;
            match &output {
                Some(path) => {
                    fs::write(path, &rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} output to {}", to, path.display());
                }
                None => println!("{rendered}"),
            }
        }
        Command::Formats { config } => {
            let table = build_table(&load_config(config))?;
            for key in list_formats(&table) {
                println!("{key}");
            }
        }
        Command::Migrate { dir, action } => {
            println!("{}", migrate(&dir, &action)?);
        }
    }

    Ok(())
}
