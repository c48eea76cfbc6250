//! Defaults for the init tool.
//!
//! Settings are layered: built-in defaults, then an optional settings file
//! (TOML or JSON), then `FERROFS_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Environment variable prefix, e.g. `FERROFS_KEY_TYPE`.
pub const ENV_PREFIX: &str = "FERROFS";

/// Defaults used by `ferrofs-init` when a flag is not given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitSettings {
    /// Key size for fresh key generation
    pub bits: usize,

    /// Key algorithm name
    pub key_type: String,

    /// Where the node configuration is written
    pub output: PathBuf,
}

impl Default for InitSettings {
    fn default() -> Self {
        Self {
            bits: 2048,
            key_type: "Ed25519".to_string(),
            output: PathBuf::from("config.json"),
        }
    }
}

impl InitSettings {
    /// Load settings from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading init settings from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Save settings to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = InitSettings::default();

        assert_eq!(settings.bits, 2048);
        assert_eq!(settings.key_type, "Ed25519");
        assert_eq!(settings.output, PathBuf::from("config.json"));
    }

    #[test]
    fn test_settings_from_file() -> anyhow::Result<()> {
        let toml_content = r#"
bits = 4096
key_type = "RSA"
"#;

        let temp_dir = tempfile::tempdir()?;
        let temp_path = temp_dir.path().join("init.toml");
        std::fs::write(&temp_path, toml_content)?;

        let settings = InitSettings::load(Some(&temp_path))?;

        assert_eq!(settings.bits, 4096);
        assert_eq!(settings.key_type, "RSA");
        // Unset keys keep their defaults
        assert_eq!(settings.output, PathBuf::from("config.json"));

        Ok(())
    }

    #[test]
    fn test_save_and_load_settings() -> anyhow::Result<()> {
        let settings = InitSettings {
            bits: 3072,
            key_type: "Secp256k1".to_string(),
            output: PathBuf::from("node/config.json"),
        };

        let temp_dir = tempfile::tempdir()?;
        let temp_path = temp_dir.path().join("saved.toml");
        settings.save_to_file(&temp_path)?;

        let loaded = InitSettings::load(Some(&temp_path))?;
        assert_eq!(loaded, settings);

        Ok(())
    }

    #[test]
    fn test_missing_settings_file() {
        let result = InitSettings::load(Some(Path::new("nonexistent-settings.toml")));
        assert!(matches!(result, Err(crate::Error::Settings(_))));
    }
}
