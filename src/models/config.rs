//! Client configuration model, persisted at `~/.agora/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level config file model. Missing sections and fields fall back to
/// defaults so a partial or absent config file always loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub frontend: FrontendSection,
}

/// How the frontend daemon is launched and supervised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendSection {
    /// Path to the frontend daemon binary
    pub binary: PathBuf,
    /// Arguments placed before the connection flags (e.g. a subcommand)
    pub base_args: Vec<String>,
    /// Address the client listener binds on and advertises to the daemon
    pub client_ip: String,
    /// Verbosity forwarded to the daemon via --logginglevel
    pub logging_level: u8,
    /// Delay between relaunch attempts after the daemon exits
    pub restart_delay_secs: u64,
}

impl Default for FrontendSection {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("agora-frontend"),
            base_args: vec!["run".to_string()],
            client_ip: "127.0.0.1".to_string(),
            logging_level: 1,
            restart_delay_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_loads_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.frontend.binary, PathBuf::from("agora-frontend"));
        assert_eq!(config.frontend.base_args, vec!["run".to_string()]);
        assert_eq!(config.frontend.client_ip, "127.0.0.1");
        assert_eq!(config.frontend.restart_delay_secs, 10);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [frontend]
            binary = "/opt/agora/frontend"
            logging_level = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.frontend.binary, PathBuf::from("/opt/agora/frontend"));
        assert_eq!(config.frontend.logging_level, 2);
        assert_eq!(config.frontend.restart_delay_secs, 10);
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = ClientConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: ClientConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
