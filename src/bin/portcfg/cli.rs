//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// portcfg - Build-time capability negotiation for portable C++ libraries
#[derive(Parser)]
#[command(name = "portcfg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect the environment and print its signals as TOML
    Probe(ProbeArgs),

    /// Check the environment against the minimum requirements
    Check(CheckArgs),

    /// Resolve the configuration and emit a header or JSON
    Resolve(ResolveArgs),

    /// Explain which rule decided a flag, constant or shim
    Explain(ExplainArgs),

    /// Negotiate every case of a compatibility matrix
    Matrix(MatrixArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where the signals come from.
///
/// Precedence: `--signals`, then `--macros`, then `--preset`, then probing
/// a real compiler.
#[derive(Args, Debug, Clone, Default)]
pub struct SignalArgs {
    /// Signal file (TOML, as printed by `portcfg probe`)
    #[arg(long, value_name = "PATH")]
    pub signals: Option<PathBuf>,

    /// Saved predefined-macro dump (`c++ -dM -E`)
    #[arg(long, value_name = "PATH", conflicts_with = "signals")]
    pub macros: Option<PathBuf>,

    /// Built-in environment description
    #[arg(long, value_name = "NAME", conflicts_with_all = ["signals", "macros"])]
    pub preset: Option<String>,

    /// Override the compiler version of the signal set
    #[arg(long, value_name = "VERSION")]
    pub compiler_version: Option<String>,

    /// C++ compiler to probe
    #[arg(long, value_name = "PATH", env = "CXX")]
    pub cc: Option<PathBuf>,

    /// External definition, as with `-D` (NAME or NAME=VALUE)
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Extra argument passed to the probed compiler
    #[arg(long = "extra-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,

    /// Namespace prefix for configuration names
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,
}

#[derive(Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub signals: SignalArgs,

    /// Write the signals to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub signals: SignalArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// C/C++ configuration header
    Header,
    /// JSON view of every decision
    Json,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub signals: SignalArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "header")]
    pub format: OutputFormat,

    /// Write to a file instead of stdout (unchanged files are left alone)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include guard for the header
    #[arg(long)]
    pub guard: Option<String>,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Flag, constant or shim name, with or without the prefix
    pub name: String,

    #[command(flatten)]
    pub signals: SignalArgs,
}

#[derive(Args)]
pub struct MatrixArgs {
    /// Matrix file (TOML with `[[case]]` tables)
    pub file: PathBuf,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
