//! Batch conversion command.

use std::path::PathBuf;

use clap::Args;
use twigify_config::{CliSettings, Config};
use twigify_core::{ConvertOptions, Converter};

use crate::batch;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for a conversion run.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Path to configuration file (default: auto-discover twigify.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to scan for source templates (overrides config).
    #[arg(short, long = "input")]
    input_dir: Option<PathBuf>,

    /// Directory to write converted templates to (overrides config).
    #[arg(short, long = "output")]
    output_dir: Option<PathBuf>,

    /// Convert without writing anything.
    #[arg(long)]
    check: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Counts of a finished run.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Report {
    pub converted: usize,
    pub failed: usize,
}

impl ConvertArgs {
    /// Execute the conversion run.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or an output file cannot be
    /// written. Failures of individual documents are counted in the report.
    pub(crate) fn execute(self) -> Result<Report, CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            input_dir: self.input_dir,
            output_dir: self.output_dir,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::info!(path = %path.display(), "Loaded configuration");
        }

        let options = ConvertOptions::default()
            .with_source_extension(config.convert.source_extension.as_str())
            .with_target_extension(config.convert.target_extension.as_str())
            .with_macro_library(config.convert.macro_library.as_str());
        let input_dir = &config.paths_resolved.input_dir;
        let output_dir = &config.paths_resolved.output_dir;

        output.scanning(input_dir, &options.source_extension);
        let files = match batch::scan(input_dir, &options) {
            Ok(files) => files,
            Err(e) => {
                output.error(&format!("Unable to scan directory: {e}"));
                return Ok(Report::default());
            }
        };
        if files.is_empty() {
            output.warning("No templates found");
            return Ok(Report::default());
        }

        let converter = Converter::new(options);
        let mut report = Report::default();
        for converted in batch::convert_all(&files, &converter) {
            match converted.result {
                Ok(_) if self.check => {
                    output.info(&format!("{}: ok", converted.source.display()));
                    report.converted += 1;
                }
                Ok(text) => {
                    let target = batch::write_output(output_dir, &converted.target_name, &text)?;
                    output.converted(&converted.source, &target);
                    report.converted += 1;
                }
                Err(e) => {
                    output.failed(&converted.source, &e.to_string());
                    report.failed += 1;
                }
            }
        }

        output.summary(report.converted, report.failed, self.check);
        Ok(report)
    }
}
