//! `lw serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use lw_config::{CliSettings, Config};
use lw_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Directory to serve (overrides config, default: current directory).
    dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover lw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Serve index.html for unknown paths (single-page applications).
    #[arg(long)]
    spa: bool,

    /// Enable live reload.
    #[arg(short = 'l', long)]
    live_reload: bool,

    /// Disable live reload (overrides config).
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,

    /// Port for the live reload listener (overrides config).
    #[arg(long)]
    lr_port: Option<u16>,

    /// Extra directory to watch for changes (repeatable).
    #[arg(short, long)]
    watch: Vec<PathBuf>,

    /// Open the start page in a browser after startup.
    #[arg(short, long)]
    open: bool,

    /// URL to open instead of the server root.
    #[arg(long)]
    open_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub(crate) silent: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        // Resolve flags before moving into CliSettings
        let livereload = self.resolve_live_reload();

        // Build CLI settings from args; flags only override when given
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            dir: self.dir,
            spa: self.spa.then_some(true),
            livereload,
            lr_port: self.lr_port,
            watch: self.watch,
            open: self.open.then_some(true),
            open_url: self.open_url,
        };

        // Load config
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        // Print startup info
        if !self.silent {
            output.info(&format!(
                "Serving directory: {}",
                config.serve_resolved.dir.display()
            ));
            if config.live_reload_resolved.enabled {
                output.info(&format!(
                    "Live reload: enabled (port {})",
                    config.live_reload_resolved.port
                ));
            } else {
                output.info("Live reload: disabled");
            }

            let url = format!("http://{}:{}", config.server.host, config.server.port);
            output.success(&format!("Server running at {url}"));

            if config.open.enabled {
                let start_page = config.open.url.clone().unwrap_or(url);
                output.info(&format!("Opening start page: {start_page}"));
            }
        }

        // Build server config and run
        let server_config = server_config_from_config(&config, self.verbose, self.silent);
        run_server(server_config).await?;

        Ok(())
    }

    /// Resolve the live reload override from --live-reload/--no-live-reload.
    fn resolve_live_reload(&self) -> Option<bool> {
        self.no_live_reload
            .then_some(false)
            .or_else(|| self.live_reload.then_some(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ServeArgs,
    }

    fn parse(argv: &[&str]) -> ServeArgs {
        TestCli::parse_from(std::iter::once("lw").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_live_reload_flags_default_to_no_override() {
        assert_eq!(parse(&[]).resolve_live_reload(), None);
    }

    #[test]
    fn test_live_reload_flag_enables() {
        assert_eq!(parse(&["--live-reload"]).resolve_live_reload(), Some(true));
        assert_eq!(parse(&["-l"]).resolve_live_reload(), Some(true));
    }

    #[test]
    fn test_no_live_reload_flag_disables() {
        assert_eq!(
            parse(&["--no-live-reload"]).resolve_live_reload(),
            Some(false)
        );
    }

    #[test]
    fn test_conflicting_live_reload_flags_rejected() {
        let result = TestCli::try_parse_from(["lw", "--live-reload", "--no-live-reload"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_silent_conflicts_with_verbose() {
        let result = TestCli::try_parse_from(["lw", "--silent", "--verbose"]);
        assert!(result.is_err());
    }
}
