//! # Application Configuration
//!
//! ```toml
//! [cache]
//! max_regions = 64
//!
//! [scheduler]
//! worker_threads = 0
//! stall_timeout_secs = 600
//!
//! [[worlds]]
//! name = "overworld"
//! region_dir = "/srv/world/region"
//! seed = -4172144997902289642
//!
//! [[worlds]]
//! name = "nether"
//! region_dir = "/srv/world/DIM-1/region"
//! raw_seed = 12345
//!
//! [block_colors]
//! "minecraft:stone" = "#7F7F7F"
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cartograph_render::SchedulerConfig;
use cartograph_world::block::parse_color;
use cartograph_world::{BlockRegistry, CacheConfig, WorldConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Config file.
        path: PathBuf,
        /// Cause.
        source: io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A block color override is not `#RRGGBB` or `AARRGGBB`.
    #[error("invalid color '{value}' for block '{block}'")]
    InvalidColor {
        /// Block name.
        block: String,
        /// Offending value.
        value: String,
    },

    /// Two worlds share a name, so they would share a tracker file.
    #[error("duplicate world name '{0}'")]
    DuplicateWorld(String),

    /// A world has no name.
    #[error("world with region_dir {0} has an empty name")]
    UnnamedWorld(PathBuf),
}

/// Everything the binary needs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worlds to render.
    pub worlds: Vec<WorldConfig>,
    /// Region cache bounds, per world.
    pub cache: CacheConfig,
    /// Worker pool settings.
    pub scheduler: SchedulerConfig,
    /// Block name -> color overrides.
    pub block_colors: HashMap<String, String>,
}

impl AppConfig {
    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates config text.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for world in &self.worlds {
            if world.name.trim().is_empty() {
                return Err(ConfigError::UnnamedWorld(world.region_dir.clone()));
            }
            if !names.insert(world.name.as_str()) {
                return Err(ConfigError::DuplicateWorld(world.name.clone()));
            }
        }
        self.color_overrides().map(|_| ())
    }

    fn color_overrides(&self) -> Result<HashMap<String, u32>, ConfigError> {
        self.block_colors
            .iter()
            .map(|(block, value)| {
                parse_color(value)
                    .map(|color| (block.clone(), color))
                    .ok_or_else(|| ConfigError::InvalidColor {
                        block: block.clone(),
                        value: value.clone(),
                    })
            })
            .collect()
    }

    /// Block table with the configured color overrides applied.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidColor`] for an unparsable override.
    pub fn block_registry(&self) -> Result<BlockRegistry, ConfigError> {
        Ok(BlockRegistry::with_overrides(&self.color_overrides()?))
    }

    /// The named world, if configured.
    #[must_use]
    pub fn world(&self, name: &str) -> Option<&WorldConfig> {
        self.worlds.iter().find(|w| w.name == name)
    }
}
