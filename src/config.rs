//! Connection settings
//!
//! Settings are layered, highest priority first: command-line flags and
//! `TOWER_*` environment variables, then the file named by `--config-file`,
//! then `~/.config/tower-inventory/config.toml`.
//!
//! ```toml
//! [general]
//! host = "https://awx.example.com"
//! username = "admin"
//! password = "secret"
//! verify_ssl = true
//! timeout_secs = 30
//! ```

use crate::cli::ConnectionArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use towerkit::{Auth, ClientConfig, DEFAULT_HOST};

/// Contents of a connection settings file
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TowerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub oauth_token: Option<String>,
    pub verify_ssl: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl TowerConfig {
    /// Parse a settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Load the explicit file if given, else the default one
    ///
    /// A missing default file yields empty settings; a missing explicit file
    /// is an error.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            let path = paths::expand(path);
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            log::debug!("Loading connection settings from {}", path.display());
            return Self::from_file(&path);
        }

        let path = paths::default_config_file()?;
        if !path.exists() {
            log::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        log::debug!("Loading connection settings from {}", path.display());
        Self::from_file(&path)
    }
}

/// Merge flags over file settings into a client configuration
pub fn resolve(args: &ConnectionArgs, file: TowerConfig) -> Result<ClientConfig> {
    let general = file.general;

    let host = args
        .host
        .clone()
        .or(general.host)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let token = args.oauth_token.clone().or(general.oauth_token);
    let username = args.username.clone().or(general.username);
    let password = args.password.clone().or(general.password);

    let auth = match (token, username, password) {
        (Some(token), _, _) => Auth::Token(token),
        (None, Some(username), Some(password)) => Auth::Basic { username, password },
        (None, Some(username), None) => {
            bail!("A password is required for user '{username}' (--password or TOWER_PASSWORD)")
        }
        (None, None, Some(_)) => bail!("A password was given without a username"),
        (None, None, None) => {
            log::warn!("No credentials configured, requests will be anonymous");
            Auth::None
        }
    };

    let mut config = ClientConfig::new(&host)
        .auth(auth)
        .verify_ssl(args.verify_ssl.or(general.verify_ssl).unwrap_or(true));
    if let Some(secs) = args.timeout.or(general.timeout_secs) {
        config = config.timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

/// Load settings and resolve them against the flags
pub fn load(args: &ConnectionArgs) -> Result<ClientConfig> {
    let file = TowerConfig::load(args.config_file.as_deref())?;
    resolve(args, file)
}
