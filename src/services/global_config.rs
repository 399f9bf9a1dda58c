//! Global configuration service: path helpers under `~/.agora` and
//! load/save of the client config file.

use std::path::{Path, PathBuf};

use crate::error::{AgoraError, Result};
use crate::models::ClientConfig;

/// Get the agora config directory (~/.agora)
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".agora"))
        .ok_or_else(|| AgoraError::GlobalConfig("Could not determine home directory".into()))
}

/// Get the path to the config file (~/.agora/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the logs directory (~/.agora/logs)
pub fn logs_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("logs"))
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_or_default() -> Result<ClientConfig> {
    load_from(&config_path()?)
}

/// Load a config file from an explicit path, with the same
/// missing-file-means-defaults behavior.
pub fn load_from(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

/// Write the config file, creating the config directory if needed.
pub fn save(config: &ClientConfig) -> Result<()> {
    save_to(config, &config_path()?)
}

pub fn save_to(config: &ClientConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(config)?;
    std::fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ClientConfig::default();
        config.frontend.logging_level = 3;
        config.frontend.binary = PathBuf::from("/opt/agora/frontend");

        save_to(&config, &path).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "frontend = \"not a table\"").unwrap();
        assert!(load_from(&path).is_err());
    }
}
