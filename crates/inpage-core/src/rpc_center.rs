//! Cross-context request/reply multiplexer.
//!
//! Every outbound call gets a fresh v4 correlation id and a single-use
//! completion callback stored in the pending table *before* the envelope is
//! posted. Replies are matched strictly by id, so they may arrive in any
//! order. The table is capped; once full, new calls are rejected without
//! being transmitted.
//!
//! There is no timeout: an id whose reply never arrives keeps its slot.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::RpcCenterConfig;
use crate::error::ProviderError;
use crate::request::{interpret_reply, ChannelMessage, Envelope, RequestArguments};
use crate::transport::{HostWindow, MessageEvent};

/// Single-use completion invoked with the raw reply data.
pub type ReplyCallback = Box<dyn FnOnce(Value) + Send>;

/// Receiver for messages that pass the origin/target checks but match no
/// pending call.
pub type NotificationHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Request/reply multiplexer over a [`HostWindow`].
pub struct RpcCenter {
    name: String,
    target: String,
    target_origin: String,
    max_pending: usize,
    window: Arc<dyn HostWindow>,
    pending: Mutex<HashMap<String, ReplyCallback>>,
    notifications: Mutex<Option<NotificationHandler>>,
}

impl RpcCenter {
    /// Create a channel and subscribe it to `window`'s messages.
    pub fn new(config: RpcCenterConfig, window: Arc<dyn HostWindow>) -> Arc<Self> {
        let target_origin = config
            .target_origin
            .unwrap_or_else(|| window.origin().to_string());

        let center = Arc::new(Self {
            name: config.name,
            target: config.target,
            target_origin,
            max_pending: config.max_pending,
            window: Arc::clone(&window),
            pending: Mutex::new(HashMap::new()),
            notifications: Mutex::new(None),
        });

        let weak = Arc::downgrade(&center);
        window.add_message_listener(Box::new(move |event: &MessageEvent| {
            if let Some(center) = weak.upgrade() {
                center.on_message(event);
            }
        }));

        center
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// Number of calls still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Route unsolicited messages to `handler`, replacing any previous one.
    pub fn set_notification_handler(&self, handler: NotificationHandler) {
        *self.notifications.lock() = Some(handler);
    }

    /// Post `payload` and register `callback` as its completion.
    ///
    /// Returns the correlation id. Fails with `ResourceExhausted`, leaving
    /// the table untouched and posting nothing, when the table is full.
    pub fn send_with(
        &self,
        payload: RequestArguments,
        callback: ReplyCallback,
    ) -> Result<String, ProviderError> {
        let method = payload.method.clone();
        let data = serde_json::to_value(&payload)?;

        let id = {
            let mut pending = self.pending.lock();
            if pending.len() >= self.max_pending {
                tracing::warn!(
                    method = %method,
                    limit = self.max_pending,
                    "pending request table full, rejecting call"
                );
                return Err(ProviderError::ResourceExhausted {
                    limit: self.max_pending,
                });
            }
            let id = loop {
                let candidate = Uuid::new_v4().to_string();
                if !pending.contains_key(&candidate) {
                    break candidate;
                }
            };
            pending.insert(id.clone(), callback);
            id
        };

        let envelope = Envelope::correlated(id.clone(), self.target.clone(), data);
        let message = match serde_json::to_value(&envelope) {
            Ok(message) => message,
            Err(err) => {
                self.pending.lock().remove(&id);
                return Err(err.into());
            }
        };

        if let Err(err) = self.window.post_message(message, &self.target_origin) {
            // The request never left the page; release its slot.
            self.pending.lock().remove(&id);
            tracing::warn!(id = %id, method = %method, error = %err, "failed to post request");
            return Err(err);
        }

        tracing::debug!(id = %id, method = %method, destination = %self.target, "request posted");
        Ok(id)
    }

    /// Post `payload`; the returned future resolves with the interpreted reply.
    pub fn send(&self, payload: RequestArguments) -> Result<PendingReply, ProviderError> {
        self.send_with_hook(payload, |_| {})
    }

    /// Like [`send`](Self::send), but `hook` observes the interpreted reply
    /// before the returned future is resolved with it.
    pub fn send_with_hook<F>(
        &self,
        payload: RequestArguments,
        hook: F,
    ) -> Result<PendingReply, ProviderError>
    where
        F: FnOnce(&Result<Value, ProviderError>) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let id = self.send_with(
            payload,
            Box::new(move |data: Value| {
                let result = interpret_reply(data);
                hook(&result);
                let _ = tx.send(result);
            }),
        )?;
        Ok(PendingReply { id, rx })
    }

    /// Handle one inbound channel message.
    ///
    /// Messages from another origin, or addressed to another channel, are
    /// dropped. A matching pending entry is removed and its callback invoked
    /// exactly once; anything else goes to the notification handler.
    pub fn on_message(&self, event: &MessageEvent) {
        if event.origin != self.target_origin {
            tracing::debug!(origin = %event.origin, "dropping message from unexpected origin");
            return;
        }

        let message: ChannelMessage = match serde_json::from_value(event.data.clone()) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "dropping malformed channel message");
                return;
            }
        };

        if message.target != self.name {
            tracing::trace!(addressed_to = %message.target, "message addressed elsewhere");
            return;
        }

        let callback = message
            .correlation_id
            .as_deref()
            .and_then(|id| self.pending.lock().remove(id));

        match callback {
            Some(callback) => {
                tracing::debug!(id = ?message.correlation_id, "reply matched");
                callback(message.data);
            }
            None => self.dispatch_notification(message),
        }
    }

    fn dispatch_notification(&self, message: ChannelMessage) {
        let handler = self.notifications.lock().clone();
        match handler {
            Some(handler) => handler(message.data),
            None => tracing::debug!(
                id = ?message.correlation_id,
                "unsolicited message with no handler, dropping"
            ),
        }
    }
}

impl std::fmt::Debug for RpcCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcCenter")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("target_origin", &self.target_origin)
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Deferred result of a call posted through [`RpcCenter`].
#[derive(Debug)]
pub struct PendingReply {
    id: String,
    rx: oneshot::Receiver<Result<Value, ProviderError>>,
}

impl PendingReply {
    /// Correlation id of the call.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for PendingReply {
    type Output = Result<Value, ProviderError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ProviderError::ReplyDropped)),
            Poll::Pending => Poll::Pending,
        }
    }
}
