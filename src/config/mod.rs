//! Persisted process-wide settings.
//!
//! Configuration lives in `config.toml` inside the config directory
//! (`~/.config/tributary` by default). A missing file yields defaults; missing
//! fields in an existing file fall back to their defaults as well.

pub mod colors;

pub use colors::{assign_color, color_range, ColorMapUpdate, DEFAULT_PALETTE};

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Whether rendered output carries ANSI styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Styling {
    /// Styled when stdout is a terminal.
    #[default]
    Default,
    Enabled,
    Disabled,
}

impl Styling {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Default),
            1 => Some(Self::Enabled),
            2 => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    /// Maximum number of in-flight requests.
    pub batch_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    pub styling: Styling,
    pub summary: bool,
    pub hide_future_items: bool,
    pub miniflux_token: String,
    /// List identifier -> terminal color code.
    #[serde(with = "color_map_keys")]
    pub color_map: BTreeMap<u8, u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: String::new(),
            user_agent: String::new(),
            timeout: DEFAULT_TIMEOUT_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            last_run: None,
            styling: Styling::Default,
            summary: false,
            hide_future_items: false,
            miniflux_token: String::new(),
            color_map: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or defaults if the file doesn't exist.
    ///
    /// An existing but unreadable or invalid file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Stamp the running version, fill in a user agent if none is set and
    /// reset zero timeout or batch size to their defaults.
    pub fn init(&mut self, version: &str) {
        self.version = version.to_string();
        if self.user_agent.is_empty() {
            self.user_agent = default_user_agent(version);
        }
        if self.timeout == 0 {
            self.timeout = DEFAULT_TIMEOUT_SECS;
        }
        if self.batch_size == 0 {
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        write_atomic(path, content.as_bytes()).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config directory: `~/.config/tributary`
    pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("tributary"))
    }
}

pub fn default_user_agent(version: &str) -> String {
    format!("tributary/v{}", version)
}

/// Replace `path` with `contents` without ever exposing a half-written file.
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// TOML keys are strings, so the color map round-trips through string keys.
mod color_map_keys {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(map: &BTreeMap<u8, u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        map.iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<String, u8>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<u8, u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        BTreeMap::<String, u8>::deserialize(deserializer)?
            .into_iter()
            .map(|(k, v)| {
                k.parse::<u8>()
                    .map(|k| (k, v))
                    .map_err(|_| D::Error::custom(format!("invalid color map key: {}", k)))
            })
            .collect()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine cache directory")]
    NoCacheDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");

        assert_eq!(config.timeout, 30);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.styling, Styling::Default);
        assert!(config.color_map.is_empty());
        assert!(config.last_run.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r#"
timeout = 5
styling = "disabled"

[color_map]
1 = 2
"#;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.timeout, 5);
        assert_eq!(config.styling, Styling::Disabled);
        assert_eq!(config.color_map.get(&1), Some(&2));
        // Default value
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.init("0.1.0");
        config.last_run = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        config.color_map.insert(1, 2);
        config.color_map.insert(3, 4);
        config.hide_future_items = true;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout = [not toml").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_init_sets_user_agent_once() {
        let mut config = Config::default();
        config.init("0.1.0");
        assert_eq!(config.user_agent, "tributary/v0.1.0");

        config.user_agent = "My User Agent".into();
        config.init("0.2.0");
        assert_eq!(config.user_agent, "My User Agent");
        assert_eq!(config.version, "0.2.0");
    }

    #[test]
    fn test_init_resets_zero_limits() {
        let mut config: Config = toml::from_str("timeout = 0\nbatch_size = 0").unwrap();
        config.init("0.1.0");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);

        config.timeout = 5;
        config.init("0.1.0");
        assert_eq!(config.timeout, 5);
    }

    #[test]
    fn test_styling_codes() {
        assert_eq!(Styling::from_code(0), Some(Styling::Default));
        assert_eq!(Styling::from_code(1), Some(Styling::Enabled));
        assert_eq!(Styling::from_code(2), Some(Styling::Disabled));
        assert_eq!(Styling::from_code(3), None);
    }
}
