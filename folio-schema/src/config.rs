//! Configuration loading using Figment
//!
//! Sources in precedence order (later sources override earlier ones):
//! 1. Built-in defaults
//! 2. `folio.toml` in the project directory
//! 3. `folio.yaml` in the project directory
//! 4. `FOLIO_*` environment variables (`FOLIO_SHAPES_DIR`, `FOLIO_STORE_DIR`,
//!    `FOLIO_PRUNE_ORPHANS`)

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Runtime configuration for schema discovery and synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Directory holding one YAML shape declaration per content type
    pub shapes_dir: PathBuf,
    /// Root of the YAML schema store
    pub store_dir: PathBuf,
    /// Prune orphaned definitions during initialization
    pub prune_orphans: bool,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            shapes_dir: PathBuf::from("shapes"),
            store_dir: PathBuf::from(".folio/schema"),
            prune_orphans: false,
        }
    }
}

impl FolioConfig {
    /// Load configuration for the current working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&std::env::current_dir()?)
    }

    /// Load configuration for `dir`. Relative paths resolve against `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let config: FolioConfig = Self::figment(dir).extract()?;
        let config = config.resolve(dir);
        debug!(?config, "loaded configuration");
        Ok(config)
    }

    fn figment(dir: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(FolioConfig::default()))
            .merge(Toml::file(dir.join("folio.toml")))
            .merge(Yaml::file(dir.join("folio.yaml")))
            .merge(Env::prefixed("FOLIO_"))
    }

    fn resolve(mut self, dir: &Path) -> Self {
        if self.shapes_dir.is_relative() {
            self.shapes_dir = dir.join(&self.shapes_dir);
        }
        if self.store_dir.is_relative() {
            self.store_dir = dir.join(&self.store_dir);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for key in ["FOLIO_SHAPES_DIR", "FOLIO_STORE_DIR", "FOLIO_PRUNE_ORPHANS"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_resolve_against_directory() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let config = FolioConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.shapes_dir, dir.path().join("shapes"));
        assert_eq!(config.store_dir, dir.path().join(".folio/schema"));
        assert!(!config.prune_orphans);
    }

    #[test]
    #[serial]
    fn yaml_overrides_toml() {
        clear_env();
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("folio.toml"),
            "shapes_dir = \"content/shapes\"\nprune_orphans = true\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("folio.yaml"), "shapes_dir: declared\n").unwrap();

        let config = FolioConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.shapes_dir, dir.path().join("declared"));
        assert!(config.prune_orphans);
    }

    #[test]
    #[serial]
    fn environment_wins() {
        clear_env();
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("folio.toml"), "prune_orphans = false\n").unwrap();
        std::env::set_var("FOLIO_PRUNE_ORPHANS", "true");
        std::env::set_var("FOLIO_STORE_DIR", "/var/lib/folio");

        let config = FolioConfig::load_from(dir.path());
        clear_env();
        let config = config.unwrap();
        assert!(config.prune_orphans);
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/folio"));
    }

    #[test]
    #[serial]
    fn invalid_value_is_a_config_error() {
        clear_env();
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("folio.toml"), "prune_orphans = \"sometimes\"\n").unwrap();
        let err = FolioConfig::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, crate::error::SchemaError::Config(_)), "{err:?}");
    }
}
