//! tls-handshake-io
//! https://github.com/grahamking/ort
//!
//! MIT License
//! Copyright (c) 2025 Graham King

use std::fs;
use std::{env, path::PathBuf};

use crate::error::{Context as _, HsResult};

const CONFIG_FILE: &str = "hsio.json";

/// Client-auth negotiation mode (spec §4.3: drives CLIENT_AUTH / NO_CLIENT_CERT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMode {
    #[default]
    None,
    Optional,
    Required,
}

/// Driver-level knobs the spec treats as externally supplied configuration.
/// Everything here is read once per connection; the driver itself never
/// mutates it.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub client_auth_mode: ClientAuthMode,
    /// Whether the transport layer manages TCP_CORK/TCP_NOPUSH for us.
    pub corked_io: bool,
    /// Whether this endpoint is willing to issue/consume session tickets.
    pub use_tickets: bool,
    pub max_handshake_message_len: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client_auth_mode: ClientAuthMode::None,
            corked_io: true,
            use_tickets: false,
            max_handshake_message_len: crate::handshake::MAX_HANDSHAKE_MESSAGE_LENGTH,
        }
    }
}

/// Load `$XDG_CONFIG_HOME/hsio.json` (or `~/.config/hsio.json`), falling
/// back to defaults when the file is absent. Mirrors the teacher's
/// `ort.json` loader shape.
pub fn load() -> HsResult<Config> {
    let config_dir = match env::var("XDG_CONFIG_HOME") {
        Ok(c) => PathBuf::from(c),
        _ => {
            let Some(home_dir) = std::env::home_dir() else {
                return Ok(Config::default());
            };
            home_dir.join(".config")
        }
    };
    let config_file = config_dir.join(CONFIG_FILE);
    match fs::read_to_string(&config_file) {
        Ok(cfg_str) => serde_json::from_str(&cfg_str).context("failed to parse config"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).context(config_file.display().to_string()),
    }
}
