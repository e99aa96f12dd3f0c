//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.casekeep.toml` files. Every root the components need (data directory,
//! content root, backup root) comes from here — no ambient globals.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Score record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Backup settings.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Case scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Score record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSON score document per law.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/speed-quiz")
}

/// Backup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Content root subject to change detection, relative to the repository
    /// root.
    #[serde(default = "default_content_root")]
    pub content_root: String,

    /// Default backup root for timestamped snapshots, relative to the
    /// repository root.
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            backup_root: default_backup_root(),
        }
    }
}

fn default_content_root() -> String {
    "public/cases".to_string()
}

fn default_backup_root() -> PathBuf {
    PathBuf::from("data/case-backups")
}

/// Case scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// File extensions counted as case modules.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// File names skipped entirely.
    #[serde(default = "default_ignore_names")]
    pub ignore_names: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore_names: default_ignore_names(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["js".to_string()]
}

fn default_ignore_names() -> Vec<String> {
    vec!["index.js".to_string()]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".casekeep.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; only
    /// explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.store.data_dir = data_dir.clone();
        }
        if let Some(ref content_root) = args.content_root {
            self.backup.content_root = content_root.clone();
        }
        if let Some(ref backup_root) = args.backup_root {
            self.backup.backup_root = backup_root.clone();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.data_dir, PathBuf::from("data/speed-quiz"));
        assert_eq!(config.backup.content_root, "public/cases");
        assert_eq!(config.backup.backup_root, PathBuf::from("data/case-backups"));
        assert_eq!(config.scanner.extensions, vec!["js"]);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[store]
data_dir = "var/progress"

[backup]
content_root = "content/cases"
backup_root = "var/backups"

[scanner]
extensions = ["js", "mjs"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.store.data_dir, PathBuf::from("var/progress"));
        assert_eq!(config.backup.content_root, "content/cases");
        assert_eq!(config.scanner.extensions, vec!["js", "mjs"]);
        // Unset sections keep their defaults.
        assert_eq!(config.scanner.ignore_names, vec!["index.js"]);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[backup]"));
        assert!(toml_str.contains("[scanner]"));
    }
}
