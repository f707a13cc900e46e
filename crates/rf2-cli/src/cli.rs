//! CLI argument definitions for the RF2 release builder.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "rf2-build",
    version,
    about = "RF2 release builder - turn delta inputs into Full, Snapshot and Delta files",
    long_about = "Build an RF2 terminology release from a release manifest.\n\n\
                  Input deltas are transformed, reconciled against the previous\n\
                  release, packaged as Full/Snapshot/Delta files and validated."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a release from a manifest.
    Build(BuildArgs),

    /// List the RF2 files of a folder and the schema recognised for each.
    Inspect(InspectArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Release manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Folder holding the input delta files (default: the manifest's folder).
    #[arg(long = "input-dir", value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Folder the release package is written to (default: <INPUT_DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Scratch folder for the build (default: <OUTPUT_DIR>/work).
    #[arg(long = "workspace", value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Override the manifest's effective time (yyyyMMdd).
    #[arg(long = "effective-time", value_name = "DATE")]
    pub effective_time: Option<String>,

    /// Override the folder holding the previous release.
    #[arg(long = "previous-release", value_name = "DIR")]
    pub previous_release: Option<PathBuf>,

    /// Copy the finished package into this folder.
    #[arg(long = "publish-dir", value_name = "DIR")]
    pub publish_dir: Option<PathBuf>,

    /// Who the build is run for.
    #[arg(long = "user", default_value = "local")]
    pub user: String,

    /// Number of build workers.
    #[arg(long = "workers", default_value_t = 1)]
    pub workers: usize,

    /// Number of tables released side by side within the build.
    #[arg(long = "table-workers", default_value_t = 1)]
    pub table_workers: usize,

    /// Continue past failed validation gates.
    ///
    /// WARNING: packages built with this flag may not be releasable.
    #[arg(long = "allow-validation-errors")]
    pub allow_validation_errors: bool,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// Folder containing RF2 files.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
