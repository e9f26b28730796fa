//! TOML-backed reference datasets.
//!
//! Example:
//! ```toml
//! [ranks]
//! Common = 1
//! Rare = 3
//!
//! [items.sword]
//! rarity = "Rare"
//!
//! [rarities]
//! Common = ["stick", "pebble"]
//!
//! [[containers]]
//! id = "starter"
//! price = 100
//! ```

use std::path::{Path, PathBuf};

use tether_contracts::{
    dataset::DatasetBundle,
    error::{HostFault, TetherError, TetherResult},
};

/// Parse a dataset bundle from TOML.
///
/// Returns `DatasetUnavailable` if the document is malformed.
pub fn from_toml_str(s: &str) -> TetherResult<DatasetBundle> {
    toml::from_str(s).map_err(|e| TetherError::DatasetUnavailable {
        reason: format!("failed to parse dataset TOML: {}", e),
    })
}

pub fn from_file(path: &Path) -> TetherResult<DatasetBundle> {
    let contents = std::fs::read_to_string(path).map_err(|e| TetherError::DatasetUnavailable {
        reason: format!("failed to read dataset file '{}': {}", path.display(), e),
    })?;
    from_toml_str(&contents)
}

/// A dataset source reading one TOML file on every load.
///
/// Hosts delegate `Host::load_datasets` to this.
#[derive(Debug, Clone)]
pub struct TomlDatasetSource {
    path: PathBuf,
}

impl TomlDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<DatasetBundle, HostFault> {
        from_file(&self.path).map_err(|e| HostFault::new(e.to_string()))
    }
}
