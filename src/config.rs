use crate::error::Result;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loglevel: LevelFilter,
    pub permissions: PermissionScale,
    pub commands: Commands,
}

impl Config {
    /// Loads the config from a toml file.
    pub fn from_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let buf = fs::read_to_string(path)?;
        Ok(toml::from_str(&buf)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: LevelFilter::Info,
            permissions: PermissionScale::default(),
            commands: Commands::default(),
        }
    }
}

/// The permission levels known to the host. Commands declare one of
/// the levels, the dispatch layer enforces them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionScale {
    pub levels: BTreeMap<String, i64>,
    /// Name of the level used by commands that don't declare one.
    pub default: String,
}

impl PermissionScale {
    pub fn level<T>(&self, name: T) -> Option<i64>
    where
        T: AsRef<str>,
    {
        self.levels.get(name.as_ref()).copied()
    }

    pub fn default_level(&self) -> Option<i64> {
        self.level(&self.default)
    }

    pub fn contains(&self, level: i64) -> bool {
        self.levels.values().any(|l| *l == level)
    }
}

impl Default for PermissionScale {
    fn default() -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(String::from("user"), 0);
        levels.insert(String::from("moderator"), 50);
        levels.insert(String::from("admin"), 100);

        Self {
            levels,
            default: String::from("user"),
        }
    }
}

/// Command loading section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commands {
    /// Directory containing the command definition files.
    pub directory: PathBuf,
    /// Directory containing one resource directory per command.
    pub resource_dir: PathBuf,
    /// Whether a reload also sweeps `resource_dir/<name>`.
    pub sweep_resource_dir: bool,
    /// A resource whose first line equals the marker is evicted for good
    /// on reload.
    pub deletion_marker: String,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./commands"),
            resource_dir: PathBuf::from("./resources"),
            sweep_resource_dir: true,
            deletion_marker: String::from("#!delete"),
        }
    }
}
