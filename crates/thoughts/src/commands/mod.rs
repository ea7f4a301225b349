//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod serve;

use std::path::PathBuf;

use clap::Args;
use thoughts_config::{CliSettings, Config};

pub(crate) use check::CheckArgs;
pub(crate) use serve::ServeArgs;

use crate::error::CliError;

/// Options shared by every command that talks to the repository.
#[derive(Args)]
pub(crate) struct SourceArgs {
    /// Path to configuration file (default: auto-discover thoughts.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repository URL, https://github.com/{owner}/{name} (overrides config).
    #[arg(short, long, env = "THOUGHTS_REPO")]
    repo: Option<String>,

    /// Persist pulls to and fall back on the disk cache (overrides config).
    #[arg(long)]
    cache: Option<bool>,

    /// Disable the disk cache.
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,

    /// Enable verbose output (info-level logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SourceArgs {
    /// Resolve `cache_enabled` from --cache/--no-cache flags.
    fn resolve_cache_enabled(&self) -> Option<bool> {
        self.no_cache.then_some(false).or(self.cache)
    }

    /// Load configuration with these flags (plus `extra`) applied.
    fn load_config(&self, extra: CliSettings) -> Result<Config, CliError> {
        let settings = CliSettings {
            repo: self.repo.clone(),
            cache_enabled: self.resolve_cache_enabled(),
            ..extra
        };
        Ok(Config::load(self.config.as_deref(), Some(&settings))?)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        source: SourceArgs,
    }

    fn parse(args: &[&str]) -> SourceArgs {
        Harness::try_parse_from(std::iter::once("thoughts").chain(args.iter().copied()))
            .unwrap()
            .source
    }

    #[test]
    fn test_cache_unset_by_default() {
        assert_eq!(parse(&[]).resolve_cache_enabled(), None);
    }

    #[test]
    fn test_cache_flag() {
        assert_eq!(parse(&["--cache", "true"]).resolve_cache_enabled(), Some(true));
        assert_eq!(parse(&["--cache", "false"]).resolve_cache_enabled(), Some(false));
    }

    #[test]
    fn test_no_cache_flag() {
        assert_eq!(parse(&["--no-cache"]).resolve_cache_enabled(), Some(false));
    }
}
