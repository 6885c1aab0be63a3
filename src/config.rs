//! Configuration module for the reload coordination server.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PODIUM_` and use double
//! underscores to separate nested levels:
//! - `PODIUM_SERVER__BIND=0.0.0.0:5179` sets `server.bind`
//! - `PODIUM_WATCH__DEBOUNCE_MS=50` sets `watch.debounce_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .podium is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Logical path of the root application manifest, relative to the
    /// workspace root. Doubles as the manifest-rebuilt sentinel on the wire.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// Optional indirection file (JSON) whose `ensembles` array replaces
    /// the inline list when readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_config: Option<PathBuf>,

    /// Externally-mounted ensemble declarations
    #[serde(default)]
    pub ensembles: Vec<EnsembleConfig>,

    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// File watch settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One externally-mounted ensemble, as declared in configuration.
///
/// Entries without `external` set, or without a path, are ignored when
/// building watch patterns and alias overrides.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EnsembleConfig {
    /// Logical ensemble name, used as the `@name/` alias prefix
    pub name: String,

    /// Physical root of the ensemble's files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Whether the ensemble lives outside the workspace root
    #[serde(default)]
    pub external: bool,

    /// Whether changes under this ensemble should notify clients
    #[serde(default = "default_true")]
    pub watch_enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Bind address for the dev server
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Broadcast channel capacity for reload notifications
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// How long a file must be stable before its change is published
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// File extensions watched under `app/` and each ensemble root
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_manifest_path() -> String {
    "public/app.json".to_string()
}
fn default_true() -> bool {
    true
}
fn default_bind() -> String {
    "127.0.0.1:5179".to_string()
}
fn default_channel_capacity() -> usize {
    100
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_extensions() -> Vec<String> {
    vec!["json".to_string(), "js".to_string(), "jsx".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            manifest_path: default_manifest_path(),
            external_config: None,
            ensembles: Vec::new(),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            extensions: default_extensions(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".podium/settings.toml"));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore becomes a dot, single underscore stays
            // inside field names
            .merge(Env::prefixed("PODIUM_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration, degrading to defaults on any failure.
    ///
    /// Configuration loading is best-effort for the reload feature: a
    /// malformed settings file must not prevent the server from starting.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("[config] failed to load settings: {e}. Using defaults.");
                let mut settings = Settings::default();
                settings.workspace_root = Self::workspace_root();
                settings
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }

    /// Find the workspace config by looking for a .podium directory,
    /// searching from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".podium");
            if config_dir.exists() && config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Get the workspace root directory (where .podium is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".podium");
            if config_dir.exists() && config_dir.is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }

        None
    }

    /// Resolve the workspace root, falling back to the current directory.
    pub fn resolved_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Physical location of the root application manifest.
    pub fn manifest_file(&self) -> PathBuf {
        self.resolved_root().join(&self.manifest_path)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
        let parent = path
            .as_ref()
            .parent()
            .ok_or_else(|| anyhow::anyhow!("invalid settings path"))?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file at `.podium/settings.toml`
    pub fn init_config_file(force: bool) -> anyhow::Result<PathBuf> {
        let config_path = PathBuf::from(".podium/settings.toml");

        if !force && config_path.exists() {
            anyhow::bail!("Configuration file already exists. Use --force to overwrite");
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        if force {
            println!("Overwrote configuration at: {}", config_path.display());
        } else {
            println!("Created default configuration at: {}", config_path.display());
        }

        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.manifest_path, "public/app.json");
        assert_eq!(settings.server.bind, "127.0.0.1:5179");
        assert!(settings.ensembles.is_empty());
        assert_eq!(settings.watch.extensions, vec!["json", "js", "jsx"]);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2
manifest_path = "dist/app.json"

[server]
bind = "0.0.0.0:9000"

[watch]
debounce_ms = 50
extensions = ["json"]

[[ensembles]]
name = "shared"
path = "/mnt/shared"
external = true

[[ensembles]]
name = "local"
external = false
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.manifest_path, "dist/app.json");
        assert_eq!(settings.server.bind, "0.0.0.0:9000");
        assert_eq!(settings.watch.debounce_ms, 50);
        assert_eq!(settings.watch.extensions, vec!["json"]);
        assert_eq!(settings.ensembles.len(), 2);
        assert_eq!(settings.ensembles[0].name, "shared");
        assert!(settings.ensembles[0].external);
        assert!(settings.ensembles[0].watch_enabled);
        assert!(!settings.ensembles[1].external);
        assert!(settings.ensembles[1].path.is_none());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[watch]
debounce_ms = 10
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.watch.debounce_ms, 10);

        // Default values should still be present
        assert_eq!(settings.version, 1);
        assert_eq!(settings.manifest_path, "public/app.json");
        assert_eq!(settings.watch.extensions, vec!["json", "js", "jsx"]);
    }

    #[test]
    fn test_save_settings_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.watch.debounce_ms = 5;
        settings.ensembles.push(EnsembleConfig {
            name: "widgets".to_string(),
            path: Some(PathBuf::from("/opt/widgets")),
            external: true,
            watch_enabled: false,
        });

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.debounce_ms, 5);
        assert_eq!(loaded.ensembles.len(), 1);
        assert_eq!(loaded.ensembles[0].name, "widgets");
        assert!(!loaded.ensembles[0].watch_enabled);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "version = \"not a number\"").unwrap();

        assert!(Settings::load_from(&config_path).is_err());
    }
}
