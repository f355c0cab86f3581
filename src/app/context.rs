use std::path::PathBuf;
use std::sync::Arc;

use crate::app::clock::{Clock, SystemClock};
use crate::app::error::Result;
use crate::config::{Config, ConfigError};
use crate::engine::{Aggregator, EngineSettings};
use crate::registry::Registry;
use crate::store::SqliteCache;

pub const CONFIG_DIR_ENV: &str = "TRIBUTARY_CONFIG_DIR";
pub const CACHE_DIR_ENV: &str = "TRIBUTARY_CACHE_DIR";

/// Where persisted state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Paths {
    /// Platform directories, overridable through the environment.
    pub fn resolve() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => Config::default_config_dir()?,
        };
        let cache_dir = match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .ok_or(ConfigError::NoCacheDir)?
                .join("tributary"),
        };
        Ok(Self {
            config_dir,
            cache_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn lists_file(&self) -> PathBuf {
        self.config_dir.join("lists.toml")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join("cache.db")
    }
}

pub struct AppContext {
    pub paths: Paths,
    pub config: Config,
    pub registry: Registry,
    pub cache: SqliteCache,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    pub fn new(paths: Paths) -> Result<Self> {
        let mut config = Config::load(&paths.config_file())?;
        config.init(env!("CARGO_PKG_VERSION"));

        let registry = Registry::load(&paths.lists_file())?;
        let cache = SqliteCache::new(paths.cache_file())?;

        Ok(Self {
            paths,
            config,
            registry,
            cache,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn save_config(&self) -> Result<()> {
        self.config.save(&self.paths.config_file())?;
        Ok(())
    }

    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(
            &self.registry,
            &self.cache,
            self.clock.as_ref(),
            EngineSettings::from(&self.config),
        )
    }
}
