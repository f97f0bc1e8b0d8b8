//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    call::CallArgs,
    completions::CompletionsArgs,
    config::ConfigCommands,
    data::DataCommands,
    import::ImportArgs,
    init::InitArgs,
    mat::MatCommands,
    normalize::NormalizeArgs,
    params::ParamsArgs,
    report::ReportCommands,
    status::StatusArgs,
    sup::SupCommands,
};

#[derive(Parser)]
#[command(name = "ims")]
#[command(author, version, about = "Inventory management spreadsheets, reports and analysis")]
#[command(long_about = "Import inventory workbooks into a local store, then query \
reconciliation, aging and analysis reports as tables or JSON envelopes.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .ims/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Database connection: a path, sqlite://<path>, or sqlite::memory:
    #[arg(long, global = true)]
    pub database: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new IMS project
    Init(InitArgs),

    /// Import a workbook sheet or CSV file into a collection
    Import(ImportArgs),

    /// Generic create/read/update/delete on any collection
    #[command(subcommand)]
    Data(DataCommands),

    /// Supplier management (codes, listing)
    #[command(subcommand)]
    Sup(SupCommands),

    /// Material management (code generation)
    #[command(subcommand)]
    Mat(MatCommands),

    /// Business reports (inventory, sales, aging, reconciliation)
    #[command(subcommand)]
    Report(ReportCommands),

    /// Call an analysis or report method and print its JSON envelope
    Call(CallArgs),

    /// Validate method parameters without running the method
    Params(ParamsArgs),

    /// Repair any JSON result read from stdin into a standard envelope
    Normalize(NormalizeArgs),

    /// Show project status: collections, imports and source files
    Status(StatusArgs),

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (table for lists, yaml for show)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just keys, one per line
    Id,
}
