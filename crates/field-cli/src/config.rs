// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scenario profiles: storage port, JSON service and filesystem store.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::scenario::Scenario;

/// Storage port for raw profile blobs, keyed by profile name.
pub trait ConfigStore {
    /// Load a raw blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// Profile names become file names; separators and dot-names are refused.
    #[error("invalid profile name {0:?}")]
    InvalidKey(String),
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Serializes values as JSON and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Load and deserialize the value for `key`. Returns `Ok(None)` if missing.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist the value for `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}

/// Profiles as `{name}.json` files in one directory.
#[derive(Clone, Debug)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Store rooted at the user config directory (e.g. `~/.config/field`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "field")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Self::at(proj.config_dir())
    }

    /// Store rooted at `dir`, created if missing.
    pub fn at(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = dir.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory holding the profiles.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ConfigError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(ConfigError::InvalidKey(key.to_owned()));
        }
        Ok(self.base.join(format!("{key}.json")))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

/// Everything needed to build and run one scenario.
///
/// Missing fields in a stored profile take their default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Which program to run.
    pub scenario: Scenario,
    /// Seed for placement, movement and program draws.
    pub seed: u64,
    /// Lattice columns.
    pub width: u32,
    /// Lattice rows.
    pub height: u32,
    /// Lattice spacing.
    pub spacing: f64,
    /// Maximum displacement of each lattice point on each axis.
    pub deformation: f64,
    /// Communication range.
    pub radius: f64,
    /// Time between two rounds of the same node.
    pub period: f64,
    /// Simulation horizon.
    pub until: f64,
    /// Distance from the source-target path that still counts as channel.
    pub channel_width: f64,
    /// Leader election area.
    pub area: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Channel,
            seed: 42,
            width: 20,
            height: 20,
            spacing: 0.1,
            deformation: 0.01,
            radius: 0.12,
            period: 0.1,
            until: 10.0,
            channel_width: 0.12,
            area: 0.5,
        }
    }
}
