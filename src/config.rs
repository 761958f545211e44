// Connection parameters for the flashing host, read from a JSON file
// kept next to the project (and out of version control).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    /// Skip the known_hosts check for the server key. Off by default;
    /// enabling it restores the old accept-anything behavior for bench
    /// hosts that are reimaged often.
    #[serde(default)]
    pub accept_unknown_host_key: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: "pi".to_string(),
            password: String::new(),
            port: 22,
            accept_unknown_host_key: false,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading server config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing server config {}", path.display()))
    }
}
