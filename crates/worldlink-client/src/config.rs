//! Client configuration management
//!
//! All session parameters come from a TOML file, with a few command-line
//! overrides applied on top. The session key is established out of band and
//! pasted into the file as hex; this client never runs the login exchange
//! itself.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use worldlink_core::SessionKey;

use crate::cli::Cli;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Configuration Sections
// ----------------------------------------------------------------------------

/// Complete configuration for one client session
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// World server endpoint
    pub server: ServerConfig,

    /// Account credentials
    pub account: AccountConfig,

    /// Character selection
    #[serde(default)]
    pub character: CharacterConfig,

    /// Chat behavior
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// host:port of the world server
    pub address: String,

    /// Realm id reported during authentication
    #[serde(default = "default_realm_id")]
    pub realm_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Account name as registered with the server
    pub name: String,

    /// 40-byte session key as hex
    pub session_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterConfig {
    /// Character to enter the world with; the first listed character is
    /// used when unset
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatConfig {
    /// Channels to join right after entering the world
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_realm_id() -> u32 {
    1
}

// ----------------------------------------------------------------------------
// Loading and Validation
// ----------------------------------------------------------------------------

impl ClientConfig {
    /// Load configuration from a TOML file and apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = Self::load_from_file(&cli.config)?;
        if let Some(character) = &cli.character {
            config.character.name = Some(character.clone());
        }
        if let Some(address) = &cli.address {
            config.server.address = address.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            CliError::Config(format!("could not read {}: {}", path.display(), err))
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Validate the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<()> {
        if !self.server.address.contains(':') {
            return Err(CliError::Config(format!(
                "server address '{}' is missing a port",
                self.server.address
            )));
        }
        if self.account.name.is_empty() {
            return Err(CliError::Config("account name must not be empty".into()));
        }
        self.session_key()?;
        Ok(())
    }

    /// The decoded session key.
    pub fn session_key(&self) -> Result<SessionKey> {
        Ok(SessionKey::from_str(&self.account.session_key)?)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [server]
        address = "world.example.net:8085"
        realm_id = 3

        [account]
        name = "tester"
        session_key = "1B5A8D2E7C4F90A1B2C3D4E5F60718293A4B5C6D7E8F9012B3C4D5E6F7A8B9C0D1E2F3A4B5C6D7E8"

        [character]
        name = "Ohgren"

        [chat]
        channels = ["General", "Trade"]
    "#;

    const MINIMAL: &str = r#"
        [server]
        address = "world.example.net:8085"

        [account]
        name = "tester"
        session_key = "1B5A8D2E7C4F90A1B2C3D4E5F60718293A4B5C6D7E8F9012B3C4D5E6F7A8B9C0D1E2F3A4B5C6D7E8"
    "#;

    #[test]
    fn full_config_parses() {
        let config: ClientConfig = toml::from_str(FULL).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.realm_id, 3);
        assert_eq!(config.character.name.as_deref(), Some("Ohgren"));
        assert_eq!(config.chat.channels, vec!["General", "Trade"]);
    }

    #[test]
    fn optional_sections_default() {
        let config: ClientConfig = toml::from_str(MINIMAL).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.realm_id, 1);
        assert!(config.character.name.is_none());
        assert!(config.chat.channels.is_empty());
    }

    #[test]
    fn bad_session_key_fails_validation() {
        let mut config: ClientConfig = toml::from_str(MINIMAL).unwrap();
        config.account.session_key = "not-hex".into();
        assert!(config.validate().is_err());

        config.account.session_key = "AABB".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn address_must_carry_a_port() {
        let mut config: ClientConfig = toml::from_str(MINIMAL).unwrap();
        config.server.address = "world.example.net".into();
        assert!(config.validate().is_err());
    }
}
