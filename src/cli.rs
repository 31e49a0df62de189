// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_pipeline_path;
use crate::pipelines::{PrefixMode, WindowMode};

/// Command-line arguments for `filedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "filedag",
    version,
    about = "Run file-producing shell commands as a dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FILEDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate and print the rendered commands, but don't execute anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Write the binding graph as Graphviz DOT to this path.
    #[arg(long, global = true, value_name = "PATH")]
    pub dot: Option<PathBuf>,

    /// Seed for the pipeline parameter generator.
    #[arg(long, global = true, value_name = "N")]
    pub seed: Option<u64>,

    /// Override the workflow's maximum concurrency.
    #[arg(long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Override the directory commands run in.
    #[arg(long, global = true, value_name = "DIR")]
    pub workdir: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a pipeline described by a TOML file.
    Run {
        /// Path to the pipeline file.
        #[arg(long, value_name = "PATH", default_value_os_t = default_pipeline_path())]
        config: PathBuf,
    },

    /// GC ratio over a window of lines shared by both DNA segments.
    GcRatio {
        /// Directory containing `dna_segment_1` and `dna_segment_2`.
        base_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = WindowMode::Normal)]
        mode: WindowMode,
    },

    /// GC ratio over independent prefixes of each DNA segment.
    GcPrefix {
        /// Directory containing `dna_segment_1` and `dna_segment_2`.
        base_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = PrefixMode::Normal)]
        mode: PrefixMode,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
