//! Agent settings.
//!
//! Loaded from TOML, then overridden by `ARIES_*` environment variables.
//!
//! # Example
//!
//! ```toml
//! preserve_exchange_records = false
//! auto_respond_credential_offer = true
//! auto_store_credential = true
//! trace = false
//! tails_dir = "/var/lib/aries/tails"
//! offer_cache_ttl_secs = 3600
//! holder_did = "LjgpST2rjsoxYegQDRm7EL"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

pub const ENV_PREFIX: &str = "ARIES_";

fn default_ttl() -> u64 {
    3600
}

fn default_tails_dir() -> PathBuf {
    std::env::temp_dir().join("aries-tails")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Keep exchange records after completion. When false, new exchanges
    /// default to `auto_remove`.
    pub preserve_exchange_records: bool,
    pub auto_respond_credential_proposal: bool,
    pub auto_respond_credential_offer: bool,
    pub auto_respond_credential_request: bool,
    pub auto_store_credential: bool,
    pub auto_respond_presentation_proposal: bool,
    pub auto_verify_presentation: bool,
    /// Default for the per-exchange trace flag.
    pub trace: bool,
    pub tails_dir: PathBuf,
    #[serde(default = "default_ttl")]
    pub offer_cache_ttl_secs: u64,
    #[serde(default = "default_ttl")]
    pub request_cache_ttl_secs: u64,
    /// DID used for credential requests made without an explicit one.
    pub holder_did: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            preserve_exchange_records: false,
            auto_respond_credential_proposal: false,
            auto_respond_credential_offer: false,
            auto_respond_credential_request: false,
            auto_store_credential: false,
            auto_respond_presentation_proposal: false,
            auto_verify_presentation: false,
            trace: false,
            tails_dir: default_tails_dir(),
            offer_cache_ttl_secs: default_ttl(),
            request_cache_ttl_secs: default_ttl(),
            holder_did: None,
        }
    }
}

impl AgentSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, ExchangeError> {
        toml::from_str(content).map_err(|e| ExchangeError::Config(e.to_string()))
    }

    /// Read `path`, then apply environment overrides.
    pub fn from_toml_file(path: &Path) -> Result<Self, ExchangeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExchangeError::Config(format!("could not read '{}': {}", path.display(), e))
        })?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.apply_env_overrides(std::env::vars())?;
        Ok(settings)
    }

    /// Apply `ARIES_<KEY>` overrides, e.g. `ARIES_AUTO_STORE_CREDENTIAL=true`.
    /// Unknown `ARIES_` variables are ignored.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<(), ExchangeError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key = key.to_ascii_lowercase();
            match key.as_str() {
                "preserve_exchange_records" => {
                    self.preserve_exchange_records = parse_bool(&name, &value)?
                }
                "auto_respond_credential_proposal" => {
                    self.auto_respond_credential_proposal = parse_bool(&name, &value)?
                }
                "auto_respond_credential_offer" => {
                    self.auto_respond_credential_offer = parse_bool(&name, &value)?
                }
                "auto_respond_credential_request" => {
                    self.auto_respond_credential_request = parse_bool(&name, &value)?
                }
                "auto_store_credential" => self.auto_store_credential = parse_bool(&name, &value)?,
                "auto_respond_presentation_proposal" => {
                    self.auto_respond_presentation_proposal = parse_bool(&name, &value)?
                }
                "auto_verify_presentation" => {
                    self.auto_verify_presentation = parse_bool(&name, &value)?
                }
                "trace" => self.trace = parse_bool(&name, &value)?,
                "tails_dir" => self.tails_dir = PathBuf::from(value),
                "offer_cache_ttl_secs" => self.offer_cache_ttl_secs = parse_u64(&name, &value)?,
                "request_cache_ttl_secs" => {
                    self.request_cache_ttl_secs = parse_u64(&name, &value)?
                }
                "holder_did" => self.holder_did = Some(value),
                _ => {}
            }
        }
        Ok(())
    }

    /// `auto_remove` for exchanges that do not set it explicitly.
    pub fn default_auto_remove(&self) -> bool {
        !self.preserve_exchange_records
    }

    pub fn offer_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.offer_cache_ttl_secs)
    }

    pub fn request_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.request_cache_ttl_secs)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ExchangeError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ExchangeError::Config(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

fn parse_u64(name: &str, value: &str) -> Result<u64, ExchangeError> {
    value
        .trim()
        .parse()
        .map_err(|_| ExchangeError::Config(format!("{} must be an integer, got '{}'", name, value)))
}
