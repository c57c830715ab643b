//! Provider and runtime configuration.
//!
//! `InpageConfig` is the top-level document the CLI loads from JSON; every
//! field has a default so an empty object `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

use inpage_core::config::DEFAULT_MAX_PENDING;
use inpage_core::logging::LogConfig;
use inpage_core::{ProviderError, RpcCenterConfig};

use crate::discovery::ProviderInfo;

/// Configuration of the provider's request channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Channel name the provider listens on.
    #[serde(default = "default_message_name")]
    pub message_name: String,
    /// Name of the content-script context requests are addressed to.
    #[serde(default = "default_message_target")]
    pub message_target: String,
    /// Origin to post to and accept replies from; the page's own origin
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_origin: Option<String>,
    /// Maximum concurrently outstanding calls.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_message_name() -> String {
    "octopus-request".to_string()
}

fn default_message_target() -> String {
    "octopus-content-js".to_string()
}

fn default_max_pending() -> usize {
    DEFAULT_MAX_PENDING
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            message_name: default_message_name(),
            message_target: default_message_target(),
            target_origin: None,
            max_pending: default_max_pending(),
        }
    }
}

impl ProviderConfig {
    /// Channel configuration derived from this provider configuration.
    pub fn rpc_center(&self) -> RpcCenterConfig {
        let config = RpcCenterConfig::new(&self.message_name, &self.message_target)
            .with_max_pending(self.max_pending);
        match &self.target_origin {
            Some(origin) => config.with_target_origin(origin),
            None => config,
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        self.rpc_center().validate()
    }
}

/// Everything needed to stand up a provider in a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InpageConfig {
    /// Origin of the simulated page.
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Identity announced over EIP-6963.
    #[serde(default)]
    pub info: ProviderInfo,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_origin() -> String {
    "https://dapp.example".to_string()
}

impl Default for InpageConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            provider: ProviderConfig::default(),
            info: ProviderInfo::default(),
            log: LogConfig::default(),
        }
    }
}

impl InpageConfig {
    /// Parse from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the channel settings and the announced identity.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.origin.is_empty() {
            return Err(ProviderError::InvalidConfig("origin must not be empty".into()));
        }
        self.provider.validate()?;
        self.info.validate()
    }
}
