//! Client configuration and identity.
//!
//! # Design
//! `ClientConfig` is what callers fill in (directly, from TOML, or from
//! `SBLOOKUP_*` environment variables). `ClientIdentity` is the validated,
//! immutable subset that goes on the wire with every request.

use std::path::Path;

use serde::Deserialize;

use crate::error::ClientError;

pub const DEFAULT_ENDPOINT: &str = "https://sb-ssl.google.com/safebrowsing/api/lookup";
pub const DEFAULT_CLIENT: &str = "rust";
pub const DEFAULT_APP_VERSION: &str = "0.1";
pub const DEFAULT_PROTOCOL_VERSION: &str = "3.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_PREFIX: &str = "SBLOOKUP_";

/// Options for building a `LookupClient`. Every field except `api_key` has a
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub api_key: String,
    /// Client name sent as the `client` query parameter.
    pub client: String,
    /// Sent as `appver`.
    pub app_version: String,
    /// Sent as `pver`.
    pub protocol_version: String,
    pub endpoint: String,
    /// Log request bodies, URLs and transport failure details.
    pub debug: bool,
    /// Log error diagnostics even when `debug` is off.
    pub report_errors: bool,
    /// Global timeout for the bundled `ureq` transport.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            client: DEFAULT_CLIENT.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            debug: false,
            report_errors: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_report_errors(mut self, report_errors: bool) -> Self {
        self.report_errors = report_errors;
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ClientError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Defaults overridden by any `SBLOOKUP_*` variables that are set.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::default().merge_env(|name| std::env::var(name).ok())
    }

    /// Override fields from a variable lookup. Split out from `from_env` so
    /// the parsing can be exercised without touching the process environment.
    pub fn merge_env<F>(mut self, lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, v)) = var("API_KEY") {
            self.api_key = v;
        }
        if let Some((_, v)) = var("CLIENT") {
            self.client = v;
        }
        if let Some((_, v)) = var("APP_VERSION") {
            self.app_version = v;
        }
        if let Some((_, v)) = var("PROTOCOL_VERSION") {
            self.protocol_version = v;
        }
        if let Some((_, v)) = var("ENDPOINT") {
            self.endpoint = v;
        }
        if let Some((name, v)) = var("DEBUG") {
            self.debug = parse_flag(name, v)?;
        }
        if let Some((name, v)) = var("REPORT_ERRORS") {
            self.report_errors = parse_flag(name, v)?;
        }
        if let Some((name, v)) = var("TIMEOUT_SECS") {
            self.timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| ClientError::ConfigEnv { name, value: v })?;
        }
        Ok(self)
    }
}

fn parse_flag(name: String, value: String) -> Result<bool, ClientError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ClientError::ConfigEnv { name, value }),
    }
}

/// The credentials and version strings sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    api_key: String,
    client: String,
    app_version: String,
    protocol_version: String,
}

impl ClientIdentity {
    /// Fails with `ClientError::MissingApiKey` when the key is empty.
    pub fn new(
        api_key: impl Into<String>,
        client: impl Into<String>,
        app_version: impl Into<String>,
        protocol_version: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ClientError::MissingApiKey);
        }
        Ok(Self {
            api_key,
            client: client.into(),
            app_version: app_version.into(),
            protocol_version: protocol_version.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(
            config.api_key.clone(),
            config.client.clone(),
            config.app_version.clone(),
            config.protocol_version.clone(),
        )
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Query parameters in wire order.
    pub fn query_pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("client", self.client.as_str()),
            ("apikey", self.api_key.as_str()),
            ("appver", self.app_version.as_str()),
            ("pver", self.protocol_version.as_str()),
        ]
    }
}
