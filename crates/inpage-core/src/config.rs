//! Request channel configuration.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Default cap on concurrently outstanding calls.
pub const DEFAULT_MAX_PENDING: usize = 100;

/// Configuration for an [`RpcCenter`](crate::RpcCenter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCenterConfig {
    /// This channel's own name; inbound messages must be addressed to it.
    pub name: String,
    /// Name of the destination context written into every request.
    pub target: String,
    /// Origin requests are posted to and replies must come from.
    /// Defaults to the host window's own origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_origin: Option<String>,
    /// Maximum number of outstanding calls before new ones are rejected.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_max_pending() -> usize {
    DEFAULT_MAX_PENDING
}

impl RpcCenterConfig {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            target_origin: None,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }

    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = Some(origin.into());
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.name.is_empty() {
            return Err(ProviderError::InvalidConfig("channel name must not be empty".into()));
        }
        if self.target.is_empty() {
            return Err(ProviderError::InvalidConfig("channel target must not be empty".into()));
        }
        if self.name == self.target {
            return Err(ProviderError::InvalidConfig(format!(
                "channel name and target must differ (both are {:?})",
                self.name
            )));
        }
        if self.max_pending == 0 {
            return Err(ProviderError::InvalidConfig("max_pending must be greater than 0".into()));
        }
        Ok(())
    }
}
