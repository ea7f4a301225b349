//! Configuration management for thoughts.
//!
//! Parses `thoughts.toml` with serde and auto-discovers the file in the
//! current directory and its parents. CLI flags are layered on top via
//! [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! These string values support `${VAR}` and `${VAR:-default}`:
//!
//! - `server.host`
//! - `site.title`
//! - `source.repo`
//! - `source.api_url`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "thoughts.toml";

/// Default GitHub REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// CLI settings that override configuration file values.
///
/// Only `Some` values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the remote repository URL.
    pub repo: Option<String>,
    /// Override the site title.
    pub site_title: Option<String>,
    /// Override the disk cache flag.
    pub cache_enabled: Option<bool>,
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the refresh interval in seconds.
    pub interval_secs: Option<u64>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Site presentation settings.
    pub site: SiteConfig,
    /// Remote content source settings.
    pub source: SourceConfig,
    /// Background refresh settings.
    pub sync: SyncConfig,
    /// Disk cache settings (paths are relative strings from TOML).
    cache: CacheConfigRaw,

    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Seconds in-flight requests may take to drain on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Shutdown grace period as a [`Duration`].
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Site presentation configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Title rendered into every page.
    pub title: String,
    /// Top-level file served at `/`.
    pub index: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "thoughts".to_owned(),
            index: "README.md".to_owned(),
        }
    }
}

/// Remote content source configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Repository URL, `https://github.com/{owner}/{name}`.
    pub repo: Option<String>,
    /// REST API base URL.
    pub api_url: String,
    /// Branch whose archive is downloaded.
    pub branch: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repo: None,
            api_url: DEFAULT_API_URL.to_owned(),
            branch: "main".to_owned(),
            timeout_secs: 5,
        }
    }
}

impl SourceConfig {
    /// HTTP timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Repository URL, required for any command that talks to the remote.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if no repository is configured.
    pub fn require_repo(&self) -> Result<&str, ConfigError> {
        self.repo.as_deref().ok_or_else(|| {
            ConfigError::Validation(
                "source.repo is required (set it in thoughts.toml or pass --repo)".to_owned(),
            )
        })
    }
}

/// Background refresh configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between refreshes of the inactive snapshot.
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

impl SyncConfig {
    /// Refresh interval as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Raw cache configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
}

/// Resolved disk cache configuration.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Whether pulls are persisted to and served from disk.
    pub enabled: bool,
    /// Absolute cache directory.
    pub dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`source.repo`").
        field: String,
        /// Error message (e.g., "${`NOTES_REPO`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `thoughts.toml` in the current directory and its parents, falling
    /// back to defaults relative to the current directory.
    ///
    /// CLI settings are applied last and the result is validated.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit `config_path` doesn't exist, parsing or
    /// expansion fails, or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(repo) = &settings.repo {
            self.source.repo = Some(repo.clone());
        }
        if let Some(title) = &settings.site_title {
            self.site.title.clone_from(title);
        }
        if let Some(enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = enabled;
        }
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(interval) = settings.interval_secs {
            self.sync.interval_secs = interval;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with the cache directory relative to `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            site: SiteConfig::default(),
            source: SourceConfig::default(),
            sync: SyncConfig::default(),
            cache: CacheConfigRaw::default(),
            cache_resolved: CacheConfig {
                enabled: false,
                dir: base.join("cache"),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()?;
        Self::load_from_file_in(path, &cwd)
    }

    fn load_from_file_in(path: &Path, cwd: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir, cwd);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// The repository is not required here so that `--repo` can supply it;
    /// commands that contact the remote call [`SourceConfig::require_repo`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_site()?;
        self.validate_source()?;
        self.validate_sync()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.site.index, "site.index")?;
        if self.site.index.contains('/') {
            return Err(ConfigError::Validation(
                "site.index must be a top-level file name".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_source(&self) -> Result<(), ConfigError> {
        if let Some(repo) = &self.source.repo {
            require_non_empty(repo, "source.repo")?;
            require_http_url(repo, "source.repo")?;
        }
        require_http_url(&self.source.api_url, "source.api_url")?;
        require_non_empty(&self.source.branch, "source.branch")?;
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "source.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_sync(&self) -> Result<(), ConfigError> {
        if self.sync.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sync.interval_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.site.title = expand::expand_env(&self.site.title, "site.title")?;
        self.source.api_url = expand::expand_env(&self.source.api_url, "source.api_url")?;
        if let Some(repo) = &self.source.repo {
            self.source.repo = Some(expand::expand_env(repo, "source.repo")?);
        }
        Ok(())
    }

    /// Resolve the cache directory: an explicit `[cache] dir` is relative to
    /// the config file's directory, the default `cache` to `cwd`.
    fn resolve_paths(&mut self, config_dir: &Path, cwd: &Path) {
        let dir = match self.cache.dir.as_deref() {
            Some(dir) => config_dir.join(dir),
            None => cwd.join("cache"),
        };
        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(false),
            dir,
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_validation_error(config: &Config, expected: &str) {
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "expected validation error, got {err:?}"
        );
        assert!(
            err.to_string().contains(expected),
            "error '{err}' should mention '{expected}'"
        );
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/srv"));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.site.title, "thoughts");
        assert_eq!(config.site.index, "README.md");
        assert_eq!(config.source.repo, None);
        assert_eq!(config.source.api_url, DEFAULT_API_URL);
        assert_eq!(config.source.branch, "main");
        assert_eq!(config.source.timeout(), Duration::from_secs(5));
        assert_eq!(config.sync.interval(), Duration::from_secs(300));
        assert!(!config.cache_resolved.enabled);
        assert_eq!(config.cache_resolved.dir, PathBuf::from("/srv/cache"));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site.title, "thoughts");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
shutdown_grace_secs = 2

[site]
title = "field notes"
index = "INDEX.md"

[source]
repo = "https://github.com/alice/notes"
api_url = "http://localhost:3000"
branch = "trunk"
timeout_secs = 10

[sync]
interval_secs = 60

[cache]
enabled = true
dir = "var/mirror"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"), Path::new("/cwd"));

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.shutdown_grace_secs, 2);
        assert_eq!(config.site.title, "field notes");
        assert_eq!(config.site.index, "INDEX.md");
        assert_eq!(
            config.source.repo.as_deref(),
            Some("https://github.com/alice/notes")
        );
        assert_eq!(config.source.api_url, "http://localhost:3000");
        assert_eq!(config.source.branch, "trunk");
        assert_eq!(config.source.timeout_secs, 10);
        assert_eq!(config.sync.interval_secs, 60);
        assert!(config.cache_resolved.enabled);
        assert_eq!(
            config.cache_resolved.dir,
            PathBuf::from("/project/var/mirror")
        );
    }

    #[test]
    fn test_load_from_file_resolves_and_expands() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("THOUGHTS_TEST_CFG_REPO", "https://github.com/bob/journal");
        }
        std::fs::write(
            &path,
            "[source]\nrepo = \"${THOUGHTS_TEST_CFG_REPO}\"\n[cache]\nenabled = true\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        unsafe {
            std::env::remove_var("THOUGHTS_TEST_CFG_REPO");
        }

        assert_eq!(
            config.source.repo.as_deref(),
            Some("https://github.com/bob/journal")
        );
        assert!(config.cache_resolved.enabled);
        assert_eq!(
            config.cache_resolved.dir,
            std::env::current_dir().unwrap().join("cache")
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_default_cache_dir_follows_working_directory() {
        let project = tempfile::TempDir::new().unwrap();
        let cwd = project.path().join("notes/drafts");
        let path = project.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[cache]\nenabled = true\n").unwrap();

        let config = Config::load_from_file_in(&path, &cwd).unwrap();

        assert_eq!(config.cache_resolved.dir, cwd.join("cache"));
    }

    #[test]
    fn test_explicit_cache_dir_follows_config_file() {
        let project = tempfile::TempDir::new().unwrap();
        let cwd = project.path().join("notes/drafts");
        let path = project.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[cache]\ndir = \"mirror\"\n").unwrap();

        let config = Config::load_from_file_in(&path, &cwd).unwrap();

        assert_eq!(config.cache_resolved.dir, project.path().join("mirror"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/thoughts.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.apply_cli_settings(&CliSettings {
            repo: Some("https://github.com/alice/notes".to_owned()),
            site_title: Some("alice".to_owned()),
            cache_enabled: Some(true),
            host: Some("127.0.0.1".to_owned()),
            port: Some(3000),
            interval_secs: Some(30),
        });

        assert_eq!(
            config.source.repo.as_deref(),
            Some("https://github.com/alice/notes")
        );
        assert_eq!(config.site.title, "alice");
        assert!(config.cache_resolved.enabled);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sync.interval_secs, 30);
    }

    #[test]
    fn test_apply_cli_settings_empty_keeps_values() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site.title, "thoughts");
        assert!(!config.cache_resolved.enabled);
    }

    #[test]
    fn test_require_repo() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        let err = config.source.require_repo().unwrap_err();
        assert!(err.to_string().contains("--repo"));

        config.source.repo = Some("https://github.com/alice/notes".to_owned());
        assert_eq!(
            config.source.require_repo().unwrap(),
            "https://github.com/alice/notes"
        );
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default_with_base(Path::new("/srv")).validate().is_ok());
    }

    #[test]
    fn test_validate_port_zero() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.server.port = 0;
        assert_validation_error(&config, "server.port");
    }

    #[test]
    fn test_validate_empty_host() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.server.host = String::new();
        assert_validation_error(&config, "server.host");
    }

    #[test]
    fn test_validate_nested_index() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.site.index = "docs/README.md".to_owned();
        assert_validation_error(&config, "site.index");
    }

    #[test]
    fn test_validate_repo_scheme() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.source.repo = Some("github.com/alice/notes".to_owned());
        assert_validation_error(&config, "source.repo");
    }

    #[test]
    fn test_validate_api_url_scheme() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.source.api_url = "api.github.com".to_owned();
        assert_validation_error(&config, "source.api_url");
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.sync.interval_secs = 0;
        assert_validation_error(&config, "sync.interval_secs");
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default_with_base(Path::new("/srv"));
        config.source.timeout_secs = 0;
        assert_validation_error(&config, "source.timeout_secs");
    }
}
