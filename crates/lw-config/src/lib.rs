//! Configuration management for lw.
//!
//! Parses `lw.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override served directory.
    pub dir: Option<PathBuf>,
    /// Override SPA mode flag.
    pub spa: Option<bool>,
    /// Override live reload enabled flag.
    pub livereload: Option<bool>,
    /// Override live reload listener port.
    pub lr_port: Option<u16>,
    /// Additional watch roots (appended to config file values).
    pub watch: Vec<PathBuf>,
    /// Override browser-open flag.
    pub open: Option<bool>,
    /// Override URL opened at startup.
    pub open_url: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "lw.toml";

/// Default live reload listener port.
pub const DEFAULT_LR_PORT: u16 = 35729;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Serving configuration (paths are relative strings from TOML).
    serve: ServeSectionRaw,
    /// Live reload configuration (paths are relative strings from TOML).
    live_reload: LiveReloadSectionRaw,
    /// Browser open configuration.
    pub open: OpenSection,

    /// Resolved serving configuration (set after loading).
    #[serde(skip)]
    pub serve_resolved: ServeConfig,
    /// Resolved live reload configuration (set after loading).
    #[serde(skip)]
    pub live_reload_resolved: LiveReloadConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8080,
        }
    }
}

/// Raw serving configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ServeSectionRaw {
    dir: Option<String>,
    spa: Option<bool>,
}

/// Resolved serving configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ServeConfig {
    /// Directory served over HTTP.
    pub dir: PathBuf,
    /// Whether SPA fallback routing is enabled.
    pub spa: bool,
}

/// Raw live reload configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LiveReloadSectionRaw {
    enabled: Option<bool>,
    port: Option<u16>,
    watch: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

/// Resolved live reload configuration.
#[derive(Debug)]
pub struct LiveReloadConfig {
    /// Whether live reload is enabled.
    pub enabled: bool,
    /// Port for the reload notification listener.
    pub port: u16,
    /// Additional watch roots beyond the served directory.
    pub watch: Vec<PathBuf>,
    /// Extra exclusion patterns for the served-directory watch root.
    pub exclude: Vec<String>,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_LR_PORT,
            watch: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// Browser open configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct OpenSection {
    /// Open the server URL in a browser at startup.
    pub enabled: bool,
    /// Explicit URL to open instead of the server URL.
    pub url: Option<String>,
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
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `lw.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
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

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(dir) = &settings.dir {
            self.serve_resolved.dir.clone_from(dir);
        }
        if let Some(spa) = settings.spa {
            self.serve_resolved.spa = spa;
        }
        if let Some(livereload) = settings.livereload {
            self.live_reload_resolved.enabled = livereload;
        }
        if let Some(lr_port) = settings.lr_port {
            self.live_reload_resolved.port = lr_port;
        }
        self.live_reload_resolved
            .watch
            .extend(settings.watch.iter().cloned());
        if let Some(open) = settings.open {
            self.open.enabled = open;
        }
        if let Some(open_url) = &settings.open_url {
            self.open.url = Some(open_url.clone());
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but it's
        // unlikely to be intentional in a config file
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        if !self.serve_resolved.dir.exists() {
            return Err(ConfigError::Validation(format!(
                "serve.dir does not exist: {}",
                self.serve_resolved.dir.display()
            )));
        }

        if self.live_reload_resolved.enabled {
            if self.live_reload_resolved.port == 0 {
                return Err(ConfigError::Validation(
                    "live_reload.port cannot be 0".to_owned(),
                ));
            }
            if self.live_reload_resolved.port == self.server.port {
                return Err(ConfigError::Validation(
                    "live_reload.port must differ from server.port".to_owned(),
                ));
            }
        }

        Ok(())
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

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerSection::default(),
            serve: ServeSectionRaw::default(),
            live_reload: LiveReloadSectionRaw::default(),
            open: OpenSection::default(),
            serve_resolved: ServeConfig {
                dir: base.to_path_buf(),
                spa: false,
            },
            live_reload_resolved: LiveReloadConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.serve_resolved = ServeConfig {
            dir: config_dir.join(self.serve.dir.as_deref().unwrap_or(".")),
            spa: self.serve.spa.unwrap_or(false),
        };

        self.live_reload_resolved = LiveReloadConfig {
            enabled: self.live_reload.enabled.unwrap_or(false),
            port: self.live_reload.port.unwrap_or(DEFAULT_LR_PORT),
            watch: self
                .live_reload
                .watch
                .iter()
                .flatten()
                .map(|p| config_dir.join(p))
                .collect(),
            exclude: self.live_reload.exclude.clone().unwrap_or_default(),
        };
    }
}
