//! `thoughts serve` command implementation.

use clap::Args;
use thoughts_config::CliSettings;
use thoughts_server::{Shutdown, run_server, server_config_from_config};
use tracing::{info, warn};

use super::SourceArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Page title (overrides config).
    #[arg(long)]
    site_title: Option<String>,

    /// Seconds between background refreshes (overrides config).
    #[arg(long)]
    interval: Option<u64>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the first sync fails or the
    /// server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.source.load_config(CliSettings {
            host: self.host,
            port: self.port,
            site_title: self.site_title,
            interval_secs: self.interval,
            ..CliSettings::default()
        })?;
        let server_config = server_config_from_config(&config)?;

        output.highlight(&format!("thoughts v{version}"));
        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }
        output.info(&format!("Repository: {}", server_config.repo));
        output.info(&format!(
            "Refresh interval: {}s",
            server_config.interval.as_secs()
        ));
        if let Some(dir) = &server_config.cache_dir {
            output.info(&format!("Cache: {}", dir.display()));
        }
        output.info(&format!(
            "Listening on http://{}:{}",
            server_config.host, server_config.port
        ));
        output.info("");

        let shutdown = Shutdown::new();
        tokio::spawn(trigger_on_interrupt(shutdown.clone()));

        run_server(server_config, shutdown).await?;

        output.success("Server stopped");
        Ok(())
    }
}

async fn trigger_on_interrupt(shutdown: Shutdown) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Interrupt received");
            shutdown.trigger();
        }
        Err(e) => warn!(error = %e, "Cannot listen for interrupt signal"),
    }
}
