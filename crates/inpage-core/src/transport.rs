//! Seams between the runtime and its host: the cross-context message
//! channel (`HostWindow`) and the provider surface handed to page code
//! (`Eip1193`).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ProviderError;
use crate::request::RequestArguments;

/// A message delivered by the host's cross-context channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Origin of the sending context, as reported by the host.
    pub origin: String,
    /// Structured-clone payload.
    pub data: Value,
}

pub type MessageListener = Box<dyn Fn(&MessageEvent) + Send + Sync>;

/// The page-global object the provider is injected into.
///
/// Constructor-injected so tests and embedders can supply their own host.
pub trait HostWindow: Send + Sync + 'static {
    /// Origin of this window.
    fn origin(&self) -> &str;

    /// Post `message` to this window, to be delivered only if the window's
    /// origin matches `target_origin` (`"*"` matches any origin).
    fn post_message(&self, message: Value, target_origin: &str) -> Result<(), ProviderError>;

    /// Subscribe to every message delivered to this window.
    fn add_message_listener(&self, listener: MessageListener);
}

/// EIP-1193 provider surface exposed to page code.
///
/// Object-safe: discovery hands providers out as `Arc<dyn Eip1193>`.
#[async_trait]
pub trait Eip1193: Send + Sync + 'static {
    /// Issue a call to the wallet backend.
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderError>;

    /// Currently connected chain, hex encoded.
    fn chain_id(&self) -> Option<String>;

    /// First connected account.
    fn selected_address(&self) -> Option<String>;

    fn is_connected(&self) -> bool;

    /// Convenience: issue a call and deserialize the result.
    async fn request_as<T>(&self, args: RequestArguments) -> Result<T, ProviderError>
    where
        Self: Sized,
        T: DeserializeOwned + Send,
    {
        let value = self.request(args).await?;
        serde_json::from_value(value).map_err(ProviderError::Deserialization)
    }
}
