//! `thoughts check` command implementation.
//!
//! Pulls the repository once, the same way `serve` does on startup, and
//! prints what would be served.

use clap::Args;
use thoughts_config::CliSettings;
use thoughts_server::{build_source, server_config_from_config, start_engine};

use super::SourceArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the repository cannot be
    /// pulled and indexed.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.source.load_config(CliSettings::default())?;
        let server_config = server_config_from_config(&config)?;

        output.info(&format!("Checking {}...", server_config.repo));
        let source = build_source(&server_config)?;
        let engine = start_engine(source, &server_config).await?;
        let Some(snapshot) = engine.active() else {
            return Ok(());
        };

        output.highlight(&format!("Fingerprint: {}", snapshot.fingerprint()));
        output.info(&format!("  / ({})", snapshot.index().path()));
        for route in snapshot.routes() {
            output.info(&format!("  /{route}"));
        }
        output.success(&format!("{} document(s) plus index", snapshot.len()));

        Ok(())
    }
}
