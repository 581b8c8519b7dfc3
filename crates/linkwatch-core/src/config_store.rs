//! TOML configuration files shared by both roles.
//!
//! Each role keeps its own schema and implements [`ConfigFile`] for it; this
//! module owns where the file lives and how it is read and written.  Files
//! sit in a `linkwatch` directory under the platform config base:
//! - Windows:  `%APPDATA%\linkwatch\<file>`
//! - Linux:    `$XDG_CONFIG_HOME/linkwatch/<file>`, else `~/.config/linkwatch/<file>`
//! - macOS:    `~/Library/Application Support/linkwatch/<file>`
//!
//! A missing file yields the schema's defaults.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is outside its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A configuration schema stored as one TOML file.
pub trait ConfigFile: Serialize + DeserializeOwned + Default {
    /// File name inside the `linkwatch` config directory.
    const FILE_NAME: &'static str;

    /// Checks ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Resolves the default path of `C`'s file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path<C: ConfigFile>() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join(C::FILE_NAME))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads and validates the config at `path`, or the defaults if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] for malformed TOML and [`ConfigError::Invalid`] for
/// out-of-range values.
pub fn load_config_from<C: ConfigFile>(path: &Path) -> Result<C, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => C::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Loads `C` from its platform path.
///
/// # Errors
///
/// See [`config_file_path`] and [`load_config_from`].
pub fn load_config<C: ConfigFile>() -> Result<C, ConfigError> {
    load_config_from(&config_file_path::<C>()?)
}

/// Writes `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to<C: ConfigFile>(path: &Path, config: &C) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `linkwatch` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("linkwatch"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("linkwatch"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("linkwatch")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct SampleConfig {
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
        #[serde(default)]
        label: String,
    }

    fn default_interval_ms() -> u64 {
        1000
    }

    impl Default for SampleConfig {
        fn default() -> Self {
            Self {
                interval_ms: default_interval_ms(),
                label: String::new(),
            }
        }
    }

    impl ConfigFile for SampleConfig {
        const FILE_NAME: &'static str = "sample.toml";

        fn validate(&self) -> Result<(), ConfigError> {
            if self.interval_ms == 0 {
                return Err(ConfigError::Invalid("interval_ms must be non-zero".into()));
            }
            Ok(())
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("linkwatch_store_test_{}", Uuid::new_v4()))
            .join(SampleConfig::FILE_NAME)
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg: SampleConfig = load_config_from(&temp_path()).expect("defaults");
        assert_eq!(cfg, SampleConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        // Arrange
        let path = temp_path();
        let cfg = SampleConfig {
            interval_ms: 250,
            label: "bench".to_string(),
        };

        // Act
        save_config_to(&path, &cfg).expect("save");
        let loaded: SampleConfig = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_load_runs_schema_validation() {
        let path = temp_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).expect("mkdir");
        }
        std::fs::write(&path, "interval_ms = 0\n").expect("write");

        let result = load_config_from::<SampleConfig>(&path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let path = temp_path();
        save_config_to(&path, &SampleConfig::default()).expect("save");
        std::fs::write(&path, "interval_ms = [").expect("write");

        let result = load_config_from::<SampleConfig>(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_config_file_path_uses_schema_file_name() {
        if let Ok(path) = config_file_path::<SampleConfig>() {
            assert!(path.ends_with("linkwatch/sample.toml"), "got {path:?}");
        }
    }
}
