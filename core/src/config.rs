use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_NETWORK: &str = "hifisolves.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const NETWORK_ENV: &str = "OMICS_AI_NETWORK";
pub const ACCESS_TOKEN_ENV: &str = "OMICS_AI_ACCESS_TOKEN";
pub const TIMEOUT_ENV: &str = "OMICS_AI_TIMEOUT_SECS";

/// Settings used to construct an `ExplorerClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Network alias, domain or full base URL.
    pub network: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK)
    }
}

impl ClientConfig {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }

    /// Read `OMICS_AI_NETWORK`, `OMICS_AI_ACCESS_TOKEN` and
    /// `OMICS_AI_TIMEOUT_SECS`, falling back to defaults for unset values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new(lookup(NETWORK_ENV).unwrap_or_else(|| DEFAULT_NETWORK.to_string()));
        config.access_token = lookup(ACCESS_TOKEN_ENV).filter(|token| !token.is_empty());
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| Error::Validation(format!("{TIMEOUT_ENV} must be a whole number of seconds, got `{secs}`")))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

fn default_user_agent() -> String {
    format!("omics-explorer-rust/{}", env!("CARGO_PKG_VERSION"))
}
