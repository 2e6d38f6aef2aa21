//! Configuration management.
//!
//! Configuration is resolved in layers: built-in defaults, then an optional
//! TOML file, then environment variables. Environment always wins, matching
//! the deployment story where the MCP host sets
//! `TASKDECK_STORAGE_BACKEND` / `TASKDECK_DATA_DIR` per server entry.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable selecting the storage backend.
pub const ENV_STORAGE_BACKEND: &str = "TASKDECK_STORAGE_BACKEND";

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "TASKDECK_DATA_DIR";

/// Fixed snapshot document filename within the data directory.
const SNAPSHOT_FILENAME: &str = "tasks.json";

/// Fixed `SQLite` database filename within the data directory.
const SQLITE_FILENAME: &str = "tasks.db";

/// Storage backend selection.
///
/// Fixed once at startup; the selection is never revisited per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Whole-collection JSON snapshot file (default).
    #[default]
    Snapshot,
    /// Row-oriented `SQLite` store.
    Sqlite,
}

impl BackendKind {
    /// Parses a backend selector string.
    ///
    /// Unrecognized values fall back to the snapshot backend rather than
    /// erroring, so a misconfigured deployment still starts.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sqlite" => Self::Sqlite,
            other => {
                if !other.is_empty() && other != "json" && other != "snapshot" {
                    tracing::warn!(
                        selector = other,
                        "Unrecognized storage backend, defaulting to snapshot"
                    );
                }
                Self::Snapshot
            },
        }
    }

    /// Returns the backend kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Main configuration for taskdeck.
#[derive(Debug, Clone)]
pub struct TaskdeckConfig {
    /// Directory holding the on-disk store for both backends.
    pub data_dir: PathBuf,
    /// Which storage backend to use.
    pub backend: BackendKind,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Storage backend selector.
    pub storage_backend: Option<String>,
}

impl Default for TaskdeckConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::default(),
        }
    }
}

impl TaskdeckConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default locations and the environment.
    ///
    /// Checks the following sources in order (later sources win):
    /// 1. Platform-specific config dir (`~/Library/Application Support/taskdeck/` on macOS)
    /// 2. XDG config dir (`~/.config/taskdeck/` for Unix compatibility)
    /// 3. `TASKDECK_DATA_DIR` and `TASKDECK_STORAGE_BACKEND` environment variables
    #[must_use]
    pub fn load_default() -> Self {
        let mut config = Self::load_file_layer();
        config.apply_env();
        config
    }

    /// Loads the file layer without the environment overlay.
    fn load_file_layer() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        // Check platform-specific config dir first
        let platform_config = base_dirs.config_dir().join("taskdeck").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        // Fall back to XDG-style ~/.config/taskdeck/ for Unix compatibility
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("taskdeck")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Applies environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(selector) = std::env::var(ENV_STORAGE_BACKEND) {
            self.backend = BackendKind::parse(&selector);
        }
    }

    /// Converts a `ConfigFile` to `TaskdeckConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(selector) = file.storage_backend {
            config.backend = BackendKind::parse(&selector);
        }

        config
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the storage backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Path of the snapshot document within the data directory.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILENAME)
    }

    /// Path of the `SQLite` database within the data directory.
    #[must_use]
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(SQLITE_FILENAME)
    }
}

/// Resolves the default data directory.
///
/// Uses the platform data dir (`~/.local/share/taskdeck` on Linux); falls
/// back to a `.taskdeck` directory under the current directory when no home
/// is available (containers, stripped-down CI).
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "taskdeck").map_or_else(
        || PathBuf::from(".taskdeck"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("sqlite", BackendKind::Sqlite)]
    #[test_case("SQLite", BackendKind::Sqlite; "uppercase sqlite")]
    #[test_case("json", BackendKind::Snapshot)]
    #[test_case("snapshot", BackendKind::Snapshot)]
    #[test_case("", BackendKind::Snapshot)]
    #[test_case("postgres", BackendKind::Snapshot; "unrecognized falls back")]
    fn test_backend_parse(input: &str, expected: BackendKind) {
        assert_eq!(BackendKind::parse(input), expected);
    }

    #[test]
    fn test_default_backend_is_snapshot() {
        assert_eq!(TaskdeckConfig::default().backend, BackendKind::Snapshot);
    }

    #[test]
    fn test_fixed_filenames() {
        let config = TaskdeckConfig::default().with_data_dir("/tmp/deck");
        assert!(config.snapshot_path().ends_with("tasks.json"));
        assert!(config.sqlite_path().ends_with("tasks.db"));
    }

    #[test]
    fn test_config_file_parsing() {
        let file: ConfigFile =
            toml::from_str("data_dir = \"/var/lib/deck\"\nstorage_backend = \"sqlite\"").unwrap();
        let config = TaskdeckConfig::from_config_file(file);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/deck"));
        assert_eq!(config.backend, BackendKind::Sqlite);
    }
}
