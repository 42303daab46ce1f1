//! Client configuration.
//!
//! [`ClientConfig`] is the serializable form of the connection settings. It
//! can be built in code, deserialized, or read from `MYTHIC_*` environment
//! variables, then handed to [`MythicClientBuilder::from_config`](crate::MythicClientBuilder::from_config).

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{MythicLinkError, Result};

/// Connection settings for a Mythic server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server address, e.g. `mythic.example.com:7443`. A scheme prefix is
    /// accepted and ignored; `ssl` picks the scheme.
    pub server_url: String,

    /// Mythic API token (preferred credential).
    #[serde(default)]
    pub api_token: Option<String>,

    /// Username for `/auth` login.
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// JWT access token from an earlier login.
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Use HTTPS/WSS instead of HTTP/WS.
    #[serde(default = "default_true")]
    pub ssl: bool,

    /// Whole-request timeout for HTTP calls, in seconds. `0` means none.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub skip_tls_verify: bool,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            api_token: None,
            username: None,
            password: None,
            access_token: None,
            refresh_token: None,
            ssl: default_true(),
            timeout_secs: default_timeout_secs(),
            skip_tls_verify: false,
        }
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the environment.
    ///
    /// Supported environment variables:
    /// - MYTHIC_SERVER_URL (or MYTHIC_URL)
    /// - MYTHIC_API_TOKEN
    /// - MYTHIC_USERNAME / MYTHIC_PASSWORD
    /// - MYTHIC_SSL: `true`/`false`
    /// - MYTHIC_SKIP_TLS_VERIFY: `true`/`false`
    /// - MYTHIC_TIMEOUT_SECS
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("MYTHIC_SERVER_URL").or_else(|| lookup("MYTHIC_URL")) {
            self.server_url = url;
        }
        if let Some(token) = lookup("MYTHIC_API_TOKEN").filter(|t| !t.is_empty()) {
            self.api_token = Some(token);
        }
        if let Some(username) = lookup("MYTHIC_USERNAME").filter(|u| !u.is_empty()) {
            self.username = Some(username);
        }
        if let Some(password) = lookup("MYTHIC_PASSWORD").filter(|p| !p.is_empty()) {
            self.password = Some(password);
        }
        if let Some(ssl) = lookup("MYTHIC_SSL") {
            self.ssl = parse_bool("MYTHIC_SSL", &ssl)?;
        }
        if let Some(skip) = lookup("MYTHIC_SKIP_TLS_VERIFY") {
            self.skip_tls_verify = parse_bool("MYTHIC_SKIP_TLS_VERIFY", &skip)?;
        }
        if let Some(secs) = lookup("MYTHIC_TIMEOUT_SECS") {
            self.timeout_secs = secs.trim().parse().map_err(|_| {
                MythicLinkError::ConfigurationError(format!(
                    "Invalid MYTHIC_TIMEOUT_SECS value: {}",
                    secs
                ))
            })?;
        }
        Ok(())
    }

    /// Only the server URL is required; credentials are checked when they
    /// are first needed.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(MythicLinkError::ConfigurationError(
                "server_url is required".to_string(),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(MythicLinkError::ConfigurationError(
                "username and password must be set together".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(MythicLinkError::ConfigurationError(format!(
            "Invalid {} value: {}",
            key, value
        ))),
    }
}
