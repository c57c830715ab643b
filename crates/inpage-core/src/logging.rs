//! Subscriber setup for the inpage crates.
//!
//! Library code only emits `tracing` events: the channel logs each sent and
//! resolved call at debug level, the provider logs state transitions and
//! dropped notifications. Whoever embeds the runtime (the `inpage` CLI, or a
//! host test) decides where they go by calling [`init_tracing`] once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `log` section of the runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level for everything without an override. Accepts any `EnvFilter`
    /// level name; `debug` shows per-call channel traffic.
    #[serde(default = "default_level")]
    pub level: String,
    /// Per-crate overrides keyed by crate name: `inpage-core`,
    /// `inpage-provider`, or `inpage` for the demo binary. Dashes are
    /// accepted.
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// One JSON object per line instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Filter directives, e.g. `"info,inpage_core=debug"`.
    pub fn directives(&self) -> String {
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();

        let mut directives = self.level.clone();
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Install the global subscriber. Call once at startup; a second call
/// returns an error instead of replacing the first subscriber.
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    }
}
