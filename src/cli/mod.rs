//! Command-line parsing for the mortgage assessment wizard.
//!
//! Argument parsing and command dispatch stay separate from the wizard and
//! document-mapping code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mortgage", version, about = "Mortgage approval assessment wizard")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Prediction service base URL (overrides MORTGAGE_API_URL).
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Remote sample spreadsheet URL (overrides MORTGAGE_SAMPLE_URL).
    #[arg(long = "sample-url", global = true, value_name = "URL")]
    pub sample_url: Option<String>,

    /// Log level or filter directive (overrides MORTGAGE_LOG).
    #[arg(long = "log-level", global = true, value_name = "FILTER")]
    pub log_level: Option<String>,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive wizard (default).
    Tui,
    /// Map a spreadsheet, submit it, and print the assessment.
    Predict(PredictArgs),
    /// Save the sample application spreadsheet.
    Sample(SampleArgs),
    /// Print the spreadsheet column → request field mapping.
    Fields,
}

#[derive(Debug, Clone, Parser)]
pub struct PredictArgs {
    /// Spreadsheet to read (.xlsx, .xls, .xlsb, .ods or .csv). Prompts when omitted.
    #[arg(short = 'f', long, value_name = "FILE", conflicts_with = "sample")]
    pub file: Option<PathBuf>,

    /// Use the sample application instead of a file.
    #[arg(long)]
    pub sample: bool,

    /// Write the request and result to a JSON file.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Also print the mapped application before submitting.
    #[arg(long)]
    pub show_record: bool,
}

#[derive(Debug, Clone, Parser)]
pub struct SampleArgs {
    /// Destination file or directory.
    #[arg(long, value_name = "PATH", default_value = crate::data::sample::SAMPLE_DOWNLOAD_NAME)]
    pub out: PathBuf,
}
