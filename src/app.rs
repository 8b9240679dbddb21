//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves configuration
//! - resets the session store and installs logging
//! - dispatches to the TUI or one of the one-shot commands

use std::path::Path;

use clap::Parser;
use tracing::info;

use crate::cli::{Command, PredictArgs, SampleArgs};
use crate::config::AppConfig;
use crate::data::predict::{PredictionClient, PredictionService};
use crate::data::sample::{SampleSource, download_sample_document, load_sample_document};
use crate::error::AppError;
use crate::telemetry::LogTarget;
use crate::wizard::{Screen, Wizard};

/// Entry point for the `mortgage` binary.
pub fn run() -> Result<(), AppError> {
    // `mortgage` and `mortgage --endpoint URL` behave like `mortgage tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let config = AppConfig::from_env()?.with_overrides(&cli.global)?;
    crate::session::reset_session_store(&config.state_dir)?;

    let target = match cli.command {
        Command::Tui => LogTarget::File(config.log_file.clone()),
        _ => LogTarget::Stderr,
    };
    crate::telemetry::init(&config.log_level, &target)?;

    match cli.command {
        Command::Tui => crate::tui::run(config),
        Command::Predict(args) => handle_predict(&args, &config),
        Command::Sample(args) => handle_sample(&args, &config),
        Command::Fields => {
            print!("{}", crate::report::format_field_table());
            Ok(())
        }
    }
}

pub fn sample_source(config: &AppConfig) -> SampleSource {
    SampleSource::from_url(config.sample_url.as_deref(), Some(&config.state_dir))
}

fn handle_predict(args: &PredictArgs, config: &AppConfig) -> Result<(), AppError> {
    let partial = if args.sample {
        load_sample_document(&sample_source(config))?
    } else {
        let path = match &args.file {
            Some(path) => path.clone(),
            None => crate::cli::picker::prompt_for_document_path()?,
        };
        crate::io::document::parse_document(&path)?
    };

    let client = PredictionClient::new(config.api_url.clone());
    let wizard = predict_document(&partial, &client)?;

    if args.show_record {
        println!("{}", crate::report::format_record_summary(wizard.record()));
    }

    let result = wizard
        .result()
        .ok_or_else(|| AppError::remote("Prediction service returned no result."))?;
    println!("{}", crate::report::format_result_summary(result));

    if let Some(path) = &args.export {
        crate::io::export::write_result_json(path, wizard.record(), result)?;
        info!(path = %path.display(), "wrote assessment JSON");
    }

    Ok(())
}

/// Run a mapped document through the same wizard path the TUI uses:
/// populate, land on the summary, submit once.
pub fn predict_document(
    partial: &crate::domain::PartialRecord,
    service: &dyn PredictionService,
) -> Result<Wizard, AppError> {
    let mut wizard = Wizard::new();
    wizard.apply_document(partial);

    let ticket = wizard
        .submit()
        .ok_or_else(|| AppError::input("The application is not ready to submit."))?;
    let outcome = service.predict(&ticket.request);
    let failure = outcome.as_ref().err().cloned();
    wizard.complete_submission(outcome);

    match failure {
        Some(err) => Err(err),
        None if wizard.screen() == Screen::Result => Ok(wizard),
        None => Err(AppError::remote("Prediction service returned no result.")),
    }
}

fn handle_sample(args: &SampleArgs, config: &AppConfig) -> Result<(), AppError> {
    let path = download_sample_document(&sample_source(config), Path::new(&args.out))?;
    println!("Saved sample application to {}", path.display());
    Ok(())
}

/// Rewrite argv so `mortgage` defaults to `mortgage tui`.
///
/// Rules:
/// - `mortgage`                        -> `mortgage tui`
/// - `mortgage --endpoint URL ...`     -> `mortgage tui --endpoint URL ...`
/// - `mortgage --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "predict" | "sample" | "fields");
    if is_subcommand {
        return argv;
    }

    // A leading flag is treated as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(args(&["mortgage"])), args(&["mortgage", "tui"]));
        assert_eq!(
            rewrite_args(args(&["mortgage", "--endpoint", "http://x"])),
            args(&["mortgage", "tui", "--endpoint", "http://x"])
        );
    }

    #[test]
    fn explicit_commands_and_help_are_untouched() {
        assert_eq!(rewrite_args(args(&["mortgage", "fields"])), args(&["mortgage", "fields"]));
        assert_eq!(rewrite_args(args(&["mortgage", "--help"])), args(&["mortgage", "--help"]));
    }
}
