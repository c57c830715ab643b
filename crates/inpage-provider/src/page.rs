//! In-memory page scope.
//!
//! `PageScope` stands in for the page's global object: it has an origin,
//! delivers `postMessage` traffic to `message` listeners, dispatches the
//! EIP-6963 discovery events, and holds the injected provider slot. It is
//! passed to the provider and the announcer explicitly rather than looked
//! up globally, so each test gets its own page.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;

use inpage_core::{
    BusEvent, Eip1193, EventBus, HostWindow, ListenerFailure, ListenerId, MessageEvent,
    MessageListener, ProviderError,
};

use crate::discovery::{ProviderDetail, ANNOUNCE_EVENT, REQUEST_EVENT};

pub const MESSAGE_EVENT: &str = "message";

/// Events dispatched on a page.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// A cross-context message delivered by `postMessage`.
    Message(MessageEvent),
    /// `eip6963:announceProvider`.
    AnnounceProvider(ProviderDetail),
    /// `eip6963:requestProvider`.
    RequestProvider,
    /// Any other event. Page scripts can dispatch arbitrary events under
    /// any name, including the discovery names.
    Custom { event_type: String, detail: Value },
}

impl BusEvent for PageEvent {
    fn event_type(&self) -> &str {
        match self {
            Self::Message(_) => MESSAGE_EVENT,
            Self::AnnounceProvider(_) => ANNOUNCE_EVENT,
            Self::RequestProvider => REQUEST_EVENT,
            Self::Custom { event_type, .. } => event_type,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Custom { detail, .. } => detail.to_string(),
            other => other.event_type().to_string(),
        }
    }
}

/// The page-global scope a provider is injected into.
pub struct PageScope {
    origin: String,
    events: EventBus<PageEvent>,
    ethereum: RwLock<Option<Arc<dyn Eip1193>>>,
}

impl PageScope {
    pub fn new(origin: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.into(),
            events: EventBus::new(),
            ethereum: RwLock::new(None),
        })
    }

    /// Dispatch `event` synchronously to its listeners.
    pub fn dispatch_event(&self, event: PageEvent) -> Result<bool, ProviderError> {
        self.events.emit(event)
    }

    pub fn add_event_listener<F>(&self, event_type: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&PageEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.on(event_type, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.events.listener_count(event_type)
    }

    /// Failures raised by page listeners, e.g. a rejected discovery request.
    pub fn listener_failures(&self) -> mpsc::UnboundedReceiver<ListenerFailure> {
        self.events.listener_failures()
    }

    /// Deliver `data` as if posted by a context running at `origin`.
    pub fn post_message_from(&self, origin: impl Into<String>, data: Value) {
        let event = PageEvent::Message(MessageEvent {
            origin: origin.into(),
            data,
        });
        if let Err(err) = self.events.emit(event) {
            tracing::warn!(error = %err, "message dispatch failed");
        }
    }

    /// Expose `provider` as the page's `ethereum` object.
    pub fn inject_provider(&self, provider: Arc<dyn Eip1193>) {
        let previous = self.ethereum.write().replace(provider);
        if previous.is_some() {
            tracing::warn!(origin = %self.origin, "replacing previously injected provider");
        }
    }

    /// The injected provider, if any.
    pub fn ethereum(&self) -> Option<Arc<dyn Eip1193>> {
        self.ethereum.read().clone()
    }
}

impl HostWindow for PageScope {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn post_message(&self, message: Value, target_origin: &str) -> Result<(), ProviderError> {
        if target_origin != "*" && target_origin != self.origin {
            // Mismatched target origins are dropped silently by the host.
            tracing::warn!(
                origin = %self.origin,
                target_origin,
                "postMessage target origin does not match page, message dropped"
            );
            return Ok(());
        }
        self.post_message_from(self.origin.clone(), message);
        Ok(())
    }

    fn add_message_listener(&self, listener: MessageListener) {
        self.events.on(MESSAGE_EVENT, move |event| {
            if let PageEvent::Message(message) = event {
                listener(message);
            }
            Ok(())
        });
    }
}

impl std::fmt::Debug for PageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageScope")
            .field("origin", &self.origin)
            .field("has_ethereum", &self.ethereum.read().is_some())
            .finish()
    }
}
