//! Kiln CLI, the command-line front-end of the caching Sass compiler.
//!
//! Provides `kiln compile` for compiling inline text and files to CSS, and
//! `kiln cache` for inspecting and resetting the compilation cache.

#![warn(missing_docs)]

mod cache_cmd;
mod compile;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use kiln_config::{discover_config, load_config, EnvOverrides, KilnConfig};
use kiln_input::{OutputStyle, WriteAttachments};

/// Kiln, a caching Sass compiler.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Caching Sass compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `kiln.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile Sass to CSS.
    Compile(CompileArgs),
    /// Inspect or reset the compilation cache.
    Cache(CacheArgs),
}

/// Arguments for the `kiln compile` subcommand.
///
/// Fragments are assembled in a fixed order: variables, files, text, then
/// attachments.
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Sass files to import, in order.
    pub files: Vec<PathBuf>,

    /// Inline Sass source. Read from stdin when no files or text are given.
    #[arg(long)]
    pub text: Option<String>,

    /// Variable binding (e.g., `--var width=122px`).
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_pair)]
    pub vars: Vec<(String, String)>,

    /// Write CSS to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output style: nested, expanded, compact, or compressed.
    #[arg(long)]
    pub style: Option<OutputStyle>,

    /// Numeric precision.
    #[arg(long)]
    pub precision: Option<u8>,

    /// Parse inline text and stdin as indented Sass syntax.
    #[arg(long)]
    pub indented: bool,

    /// Additional import directory (repeatable).
    #[arg(short = 'I', long = "include-path", value_name = "DIR")]
    pub include_paths: Vec<PathBuf>,

    /// Force caching on.
    #[arg(long, overrides_with = "no_cache")]
    pub cache: bool,

    /// Force caching off.
    #[arg(long, overrides_with = "cache")]
    pub no_cache: bool,

    /// Cache directory.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Extra material mixed into the cache key.
    #[arg(long)]
    pub cache_key_extra: Option<String>,

    /// Attachment handling: always, never, or warn.
    #[arg(long)]
    pub write_attachments: Option<WriteAttachments>,

    /// File or directory to place next to the output (e.g., `--attach fonts=assets/fonts`).
    #[arg(long = "attach", value_name = "DEST=SRC", value_parser = parse_pair)]
    pub attachments: Vec<(String, String)>,
}

/// Arguments for the `kiln cache` subcommand.
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Cache directory.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// The cache action.
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Actions of `kiln cache`.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CacheAction {
    /// Print the cache directory.
    Path,
    /// Print cache usage and limits.
    Info {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Remove every cache entry.
    Clear,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags and configuration.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// The loaded configuration, with environment overrides applied.
    pub config: KilnConfig,
}

/// Parses a `KEY=VALUE` argument.
fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Loads the configuration named on the command line, or `kiln.toml` in
/// the current directory, then applies environment overrides.
fn load_settings(cli: &Cli) -> Result<KilnConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => discover_config(&std::env::current_dir()?)?.0,
    };
    EnvOverrides::from_env().apply(&mut config)?;
    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    let config = match load_settings(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    logging::init(cli.quiet, cli.verbose, config.log.level.as_deref());

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config,
    };

    let result = match cli.command {
        Command::Compile(ref args) => compile::run(args, &global),
        Command::Cache(ref args) => cache_cmd::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
