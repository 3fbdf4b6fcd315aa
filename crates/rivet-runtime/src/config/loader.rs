//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Config file (`rivet.json`, `config.json`, or `rivet.toml` with the
//!    `toml-config` feature)
//! 3. Environment variables (`RIVET_*`)
//! 4. Programmatic merges
//!
//! Files are searched in the current directory, then in
//! `<config dir>/rivet`. The first file found wins.
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `RIVET_` prefix with `__` as separator:
//!
//! - `RIVET_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `RIVET_LOGGING__OUTPUT=stderr` → `logging.output = "stderr"`
//!
//! # Example
//!
//! ```rust,ignore
//! use rivet_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//!
//! let config = ConfigLoader::new()
//!     .file("./bots/config.json")
//!     .without_env()
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::{RivetConfig, SupervisorConfig};

/// File names tried in each search path, in order.
#[cfg(not(feature = "toml-config"))]
const CONFIG_FILE_NAMES: &[&str] = &["rivet.json", "config.json"];
#[cfg(feature = "toml-config")]
const CONFIG_FILE_NAMES: &[&str] = &["rivet.json", "config.json", "rivet.toml"];

const ENV_PREFIX: &str = "RIVET_";

/// Keys that mark a document holding one bot at the root.
const ROOT_BOT_KEYS: &[&str] = &["identity", "username"];

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a configuration on top of every other source.
    pub fn merge(mut self, config: RivetConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    ///
    /// A document with a top-level `identity` (or `username`) describes a
    /// single bot at the root; that bot becomes the first `bots` entry.
    pub fn load(self) -> ConfigResult<RivetConfig> {
        let figment = self.build_figment()?;
        let mut config: RivetConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(bot) = Self::extract_root_bot(&figment)? {
            debug!(identity = %bot.identity, "Reading single-bot document");
            config.bots.insert(0, bot);
        }

        debug!(
            bots = config.bots.len(),
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Returns the file `load` would read, if any.
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_file {
            return path.exists().then(|| path.clone());
        }
        self.resolve_search_paths()
            .into_iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.exists())
    }

    /// Writes `config` to `path` as pretty JSON, creating parent directories.
    pub fn save_json<P: AsRef<Path>>(path: P, config: &RivetConfig) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let document = serde_json::to_string_pretty(config)?;
        std::fs::write(path, document)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(RivetConfig::default()));

        match &self.config_file {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, path)?;
            }
            Some(path) => return Err(ConfigError::FileNotFound(path.clone())),
            None => match self.locate() {
                Some(path) => {
                    info!(path = %path.display(), "Loading configuration file");
                    figment = Self::merge_config_file(figment, &path)?;
                }
                None => warn!("No configuration file found, using defaults"),
            },
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let user_figment = std::mem::take(&mut self.figment);
        Ok(figment.merge(user_figment))
    }

    fn extract_root_bot(figment: &Figment) -> ConfigResult<Option<SupervisorConfig>> {
        if !ROOT_BOT_KEYS.iter().any(|key| figment.contains(key)) {
            return Ok(None);
        }
        figment
            .extract::<SupervisorConfig>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError(format!("single-bot document: {e}")))
    }

    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "json" => Ok(figment.merge(Json::file(path))),
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("rivet"));
        }
        paths
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<RivetConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from a specific file.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<RivetConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rivet-config-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = scratch_dir("empty");
        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config.logging.level.as_str(), "info");
        assert!(config.bots.is_empty());
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/rivet.json")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_save_then_load_legacy_document() {
        let dir = scratch_dir("legacy");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.json"),
            r#"{ "bots": [{ "username": "scout", "password": "pw", "auto_reconnect": true }] }"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config.bots.len(), 1);
        assert_eq!(config.bots[0].identity, "scout");
        assert!(config.bots[0].auto_reconnect);

        let saved = dir.join("nested").join("rivet.json");
        ConfigLoader::save_json(&saved, &config).unwrap();
        let reloaded = load_config_from_file(&saved).unwrap();
        assert_eq!(reloaded.bots, config.bots);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_single_bot_document_at_root() {
        let dir = scratch_dir("flat");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{"username":"scout","password":"pw","auto_reconnect":true,"white_list":["alice"]}"#,
        )
        .unwrap();

        let config = ConfigLoader::new().file(&path).without_env().load().unwrap();
        assert_eq!(config.bots.len(), 1);
        let bot = &config.bots[0];
        assert_eq!(bot.identity, "scout");
        assert_eq!(bot.secret, "pw");
        assert!(bot.auto_reconnect);
        assert!(bot.is_allowed("alice"));
        assert_eq!(config.logging.level, LogLevel::Info);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_single_bot_document_with_bad_field() {
        let dir = scratch_dir("flat-bad");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"username":"scout","auto_reconnect":"sometimes"}"#).unwrap();

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_merge_overrides_file() {
        let dir = scratch_dir("merge");
        let mut overrides = RivetConfig {
            bots: vec![SupervisorConfig::new("scout", "pw")],
            ..Default::default()
        };
        overrides.logging.level = LogLevel::Debug;

        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.bots[0].identity, "scout");
    }
}
