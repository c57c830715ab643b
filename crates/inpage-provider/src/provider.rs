//! The injected EIP-1193 provider.
//!
//! `InpageProvider` owns the connection / account / chain state and turns
//! wallet notifications into deduplicated, ordered events. Calls are routed
//! through an [`RpcCenter`]; account-listing calls update account state
//! before the caller sees the result.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use inpage_core::{
    BusEvent, Eip1193, EventBus, HostWindow, ListenerFailure, ListenerId, ProviderError,
    ProviderRpcError, RequestArguments, RpcCenter, ERROR_EVENT,
};

use crate::config::ProviderConfig;

pub const INITIALIZED_EVENT: &str = "_initialized";
pub const CONNECT_EVENT: &str = "connect";
pub const DISCONNECT_EVENT: &str = "disconnect";
pub const ACCOUNTS_CHANGED_EVENT: &str = "accountsChanged";
pub const CHAIN_CHANGED_EVENT: &str = "chainChanged";

/// Events emitted by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Initialized,
    Connect { chain_id: String },
    Disconnect,
    AccountsChanged(Vec<String>),
    ChainChanged(String),
    Error(ProviderRpcError),
}

impl BusEvent for ProviderEvent {
    fn event_type(&self) -> &str {
        match self {
            Self::Initialized => INITIALIZED_EVENT,
            Self::Connect { .. } => CONNECT_EVENT,
            Self::Disconnect => DISCONNECT_EVENT,
            Self::AccountsChanged(_) => ACCOUNTS_CHANGED_EVENT,
            Self::ChainChanged(_) => CHAIN_CHANGED_EVENT,
            Self::Error(_) => ERROR_EVENT,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Error(err) => err.message.clone(),
            other => other.event_type().to_string(),
        }
    }
}

/// Server-initiated notification pushed by the wallet backend:
/// `{ "method": <name>, "params": <value> }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum ProviderNotification {
    Connect {
        #[serde(rename = "chainId")]
        chain_id: String,
    },
    Disconnect,
    AccountsChanged(Vec<String>),
    ChainChanged {
        #[serde(rename = "chainId")]
        chain_id: String,
    },
    UnlockStateChanged {
        #[serde(default)]
        accounts: Option<Vec<String>>,
        #[serde(alias = "isUnlocked")]
        unlocked: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProviderState {
    pub(crate) chain_id: Option<String>,
    pub(crate) accounts: Option<Vec<String>>,
    pub(crate) selected_address: Option<String>,
    pub(crate) is_connected: bool,
    pub(crate) is_unlocked: bool,
    pub(crate) initialized: bool,
}

/// Returns `true` for `0x`-prefixed, non-empty hexadecimal chain ids.
pub fn is_valid_chain_id(chain_id: &str) -> bool {
    chain_id
        .strip_prefix("0x")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()))
}

/// EIP-1193 provider injected into the page.
pub struct InpageProvider {
    me: Weak<InpageProvider>,
    rpc: Arc<RpcCenter>,
    state: Mutex<ProviderState>,
    events: EventBus<ProviderEvent>,
}

impl InpageProvider {
    /// Build an uninitialized provider talking through `window`.
    ///
    /// The provider also registers itself for the wallet's push
    /// notifications on the channel.
    pub fn new(config: ProviderConfig, window: Arc<dyn HostWindow>) -> Arc<Self> {
        let rpc = RpcCenter::new(config.rpc_center(), window);
        let provider = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            rpc,
            state: Mutex::new(ProviderState::default()),
            events: EventBus::new(),
        });

        let weak = provider.me.clone();
        provider
            .rpc
            .set_notification_handler(Arc::new(move |data: Value| {
                if let Some(provider) = weak.upgrade() {
                    provider.handle_notification(data);
                }
            }));

        provider
    }

    /// Flip the one-way `initialized` latch and emit `_initialized`.
    pub fn initialize(&self) -> Result<(), ProviderError> {
        {
            let mut state = self.state.lock();
            if state.initialized {
                return Err(ProviderError::AlreadyInitialized);
            }
            state.initialized = true;
        }
        self.notify(ProviderEvent::Initialized);
        Ok(())
    }

    /// Issue a call to the wallet.
    ///
    /// Resolves with the call's result once the matching reply arrives.
    /// For `eth_accounts` / `eth_requestAccounts`, account state is updated
    /// from a successful result before this future resolves.
    pub async fn request(&self, args: RequestArguments) -> Result<Value, ProviderError> {
        args.validate()?;

        let track_accounts = args.is_account_listing();
        let me = self.me.clone();
        let reply = self.rpc.send_with_hook(args, move |result| {
            if !track_accounts {
                return;
            }
            if let (Ok(value), Some(provider)) = (result, me.upgrade()) {
                provider.sync_accounts(value);
            }
        })?;

        reply.await
    }

    /// Issue a call from untyped arguments, validating their shape first.
    pub async fn request_value(&self, args: Value) -> Result<Value, ProviderError> {
        let args = RequestArguments::try_from(args)?;
        self.request(args).await
    }

    fn sync_accounts(&self, result: &Value) {
        let accounts = match result {
            Value::Null => Vec::new(),
            other => match serde_json::from_value::<Vec<String>>(other.clone()) {
                Ok(accounts) => accounts,
                Err(err) => {
                    tracing::warn!(error = %err, "account listing returned a non-address result");
                    return;
                }
            },
        };
        self.handle_accounts_changed(&accounts);
    }

    // ─── Notification handlers ────────────────────────────────────────────

    /// Mark the provider connected. No-op if already connected.
    pub fn handle_connect(&self, chain_id: &str) {
        let connected = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.is_connected, true)
        };
        if connected {
            tracing::info!(chain_id, "connected");
            self.notify(ProviderEvent::Connect {
                chain_id: chain_id.to_string(),
            });
        }
    }

    /// Mark the provider disconnected and clear chain and account state.
    /// No-op if already disconnected.
    pub fn handle_disconnect(&self) {
        {
            let mut state = self.state.lock();
            if !state.is_connected {
                return;
            }
            state.is_connected = false;
            state.chain_id = None;
            state.accounts = None;
            state.selected_address = None;
            state.is_unlocked = false;
        }
        tracing::info!("disconnected");
        self.notify(ProviderEvent::Disconnect);
    }

    /// Track the wallet's lock state; a change cascades into
    /// [`handle_accounts_changed`](Self::handle_accounts_changed).
    pub fn handle_unlock_state_changed(&self, accounts: Option<Vec<String>>, unlocked: bool) {
        {
            let mut state = self.state.lock();
            if state.is_unlocked == unlocked {
                return;
            }
            state.is_unlocked = unlocked;
        }
        self.handle_accounts_changed(&accounts.unwrap_or_default());
    }

    /// Replace the account list. Identical lists are ignored; events are
    /// only emitted once the provider is initialized.
    pub fn handle_accounts_changed(&self, accounts: &[String]) {
        let next = accounts.to_vec();
        let initialized = {
            let mut state = self.state.lock();
            if state.accounts.as_deref() == Some(next.as_slice()) {
                return;
            }
            state.selected_address = next.first().cloned();
            state.accounts = Some(next.clone());
            state.initialized
        };
        tracing::debug!(count = next.len(), "accounts changed");
        if initialized {
            self.notify(ProviderEvent::AccountsChanged(next));
        }
    }

    /// Switch chains. Invalid ids are ignored. A valid id always implies
    /// connectivity, so `connect` fires (once) before `chainChanged`.
    pub fn handle_chain_changed(&self, chain_id: Option<&str>) {
        let Some(chain_id) = chain_id.filter(|id| is_valid_chain_id(id)) else {
            tracing::debug!(chain_id = ?chain_id, "ignoring invalid chain id");
            return;
        };

        self.handle_connect(chain_id);

        let initialized = {
            let mut state = self.state.lock();
            if state.chain_id.as_deref() == Some(chain_id) {
                return;
            }
            state.chain_id = Some(chain_id.to_string());
            state.initialized
        };
        if initialized {
            self.notify(ProviderEvent::ChainChanged(chain_id.to_string()));
        }
    }

    /// Route a decoded push notification to its handler.
    pub fn apply_notification(&self, notification: ProviderNotification) {
        match notification {
            ProviderNotification::Connect { chain_id } => self.handle_connect(&chain_id),
            ProviderNotification::Disconnect => self.handle_disconnect(),
            ProviderNotification::AccountsChanged(accounts) => {
                self.handle_accounts_changed(&accounts)
            }
            ProviderNotification::ChainChanged { chain_id } => {
                self.handle_chain_changed(Some(&chain_id))
            }
            ProviderNotification::UnlockStateChanged { accounts, unlocked } => {
                self.handle_unlock_state_changed(accounts, unlocked)
            }
        }
    }

    fn handle_notification(&self, data: Value) {
        match serde_json::from_value::<ProviderNotification>(data) {
            Ok(notification) => self.apply_notification(notification),
            Err(err) => tracing::debug!(error = %err, "ignoring unrecognised notification"),
        }
    }

    // ─── Read-only accessors ─────────────────────────────────────────────

    pub fn chain_id(&self) -> Option<String> {
        self.state.lock().chain_id.clone()
    }

    pub fn selected_address(&self) -> Option<String> {
        self.state.lock().selected_address.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().is_connected
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.lock().is_unlocked
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Number of calls waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.rpc.pending_count()
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> ProviderState {
        self.state.lock().clone()
    }

    // ─── Events ──────────────────────────────────────────────────────────

    pub fn on<F>(&self, event_type: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.on(event_type, listener)
    }

    pub fn once<F>(&self, event_type: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.once(event_type, listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.events.listener_count(event_type)
    }

    pub fn listener_failures(&self) -> mpsc::UnboundedReceiver<ListenerFailure> {
        self.events.listener_failures()
    }

    /// Emit an event on the provider's bus.
    pub fn emit(&self, event: ProviderEvent) -> Result<bool, ProviderError> {
        self.events.emit(event)
    }

    fn notify(&self, event: ProviderEvent) {
        if let Err(err) = self.events.emit(event) {
            tracing::warn!(error = %err, "provider event went unhandled");
        }
    }
}

impl std::fmt::Debug for InpageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InpageProvider")
            .field("chain_id", &state.chain_id)
            .field("selected_address", &state.selected_address)
            .field("is_connected", &state.is_connected)
            .field("initialized", &state.initialized)
            .finish()
    }
}

#[async_trait]
impl Eip1193 for InpageProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value, ProviderError> {
        InpageProvider::request(self, args).await
    }

    fn chain_id(&self) -> Option<String> {
        InpageProvider::chain_id(self)
    }

    fn selected_address(&self) -> Option<String> {
        InpageProvider::selected_address(self)
    }

    fn is_connected(&self) -> bool {
        InpageProvider::is_connected(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageScope;
    use futures::FutureExt;
    use inpage_core::MessageEvent;
    use serde_json::json;

    const ORIGIN: &str = "https://dapp.example";

    struct Harness {
        page: Arc<PageScope>,
        provider: Arc<InpageProvider>,
        requests: Arc<Mutex<Vec<Value>>>,
        events: Arc<Mutex<Vec<ProviderEvent>>>,
    }

    impl Harness {
        fn new() -> Self {
            let page = PageScope::new(ORIGIN);
            let requests = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&requests);
            page.add_message_listener(Box::new(move |event: &MessageEvent| {
                if event.data["target"] == "octopus-content-js" {
                    sink.lock().push(event.data.clone());
                }
            }));

            let provider = InpageProvider::new(ProviderConfig::default(), page.clone());
            let events = Arc::new(Mutex::new(Vec::new()));
            for name in [
                CONNECT_EVENT,
                DISCONNECT_EVENT,
                ACCOUNTS_CHANGED_EVENT,
                CHAIN_CHANGED_EVENT,
            ] {
                let sink = Arc::clone(&events);
                provider.on(name, move |event| {
                    sink.lock().push(event.clone());
                    Ok(())
                });
            }

            Self {
                page,
                provider,
                requests,
                events,
            }
        }

        fn initialized() -> Self {
            let harness = Self::new();
            harness.provider.initialize().unwrap();
            harness
        }

        fn reply_to_last(&self, data: Value) {
            let id = self.requests.lock().last().unwrap()["correlationId"].clone();
            self.page.post_message_from(
                ORIGIN,
                json!({"correlationId": id, "target": "octopus-request", "data": data}),
            );
        }

        fn push(&self, notification: Value) {
            self.page.post_message_from(
                ORIGIN,
                json!({"target": "octopus-request", "data": notification}),
            );
        }

        fn take_events(&self) -> Vec<ProviderEvent> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    fn accounts(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn chain_id_validation() {
        assert!(is_valid_chain_id("0x1"));
        assert!(is_valid_chain_id("0xaBc"));
        assert!(!is_valid_chain_id("0x"));
        assert!(!is_valid_chain_id("1"));
        assert!(!is_valid_chain_id("0xzz"));
    }

    #[test]
    fn initialize_twice_fails() {
        let h = Harness::new();
        let seen = Arc::new(Mutex::new(0));
        let s = Arc::clone(&seen);
        h.provider.on(INITIALIZED_EVENT, move |_| {
            *s.lock() += 1;
            Ok(())
        });

        h.provider.initialize().unwrap();
        let err = h.provider.initialize().unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyInitialized));
        assert!(err.is_fatal());
        assert_eq!(*seen.lock(), 1);
        assert!(h.provider.is_initialized());
    }

    #[test]
    fn identical_accounts_emit_once() {
        let h = Harness::initialized();
        let list = accounts(&["0xaa", "0xbb"]);

        h.provider.handle_accounts_changed(&list);
        h.provider.handle_accounts_changed(&list);

        assert_eq!(h.take_events(), vec![ProviderEvent::AccountsChanged(list)]);
        assert_eq!(h.provider.selected_address().as_deref(), Some("0xaa"));
    }

    #[test]
    fn accounts_are_tracked_silently_before_initialization() {
        let h = Harness::new();
        h.provider.handle_accounts_changed(&accounts(&["0xaa"]));

        assert!(h.take_events().is_empty());
        assert_eq!(h.provider.selected_address().as_deref(), Some("0xaa"));

        h.provider.handle_accounts_changed(&[]);
        assert_eq!(h.provider.selected_address(), None);
        assert_eq!(h.provider.snapshot().accounts, Some(Vec::new()));
    }

    #[test]
    fn chain_changed_connects_first_then_reports_chain() {
        let h = Harness::initialized();

        h.provider.handle_chain_changed(Some("0x1"));
        assert!(h.provider.is_connected());
        assert_eq!(h.provider.chain_id().as_deref(), Some("0x1"));
        assert_eq!(
            h.take_events(),
            vec![
                ProviderEvent::Connect {
                    chain_id: "0x1".into()
                },
                ProviderEvent::ChainChanged("0x1".into()),
            ]
        );

        h.provider.handle_chain_changed(Some("0x1"));
        assert!(h.take_events().is_empty());

        h.provider.handle_chain_changed(Some("0x89"));
        assert_eq!(
            h.take_events(),
            vec![ProviderEvent::ChainChanged("0x89".into())]
        );
    }

    #[test]
    fn invalid_chain_id_is_ignored() {
        let h = Harness::initialized();
        h.provider.handle_chain_changed(Some("mainnet"));
        h.provider.handle_chain_changed(None);

        assert!(!h.provider.is_connected());
        assert_eq!(h.provider.chain_id(), None);
        assert!(h.take_events().is_empty());
    }

    #[test]
    fn connect_and_disconnect_only_fire_on_change() {
        let h = Harness::initialized();
        h.provider.handle_disconnect();
        assert!(h.take_events().is_empty());

        h.provider.handle_connect("0x1");
        h.provider.handle_connect("0x1");
        h.provider.handle_chain_changed(Some("0x1"));
        h.provider.handle_accounts_changed(&accounts(&["0xaa"]));
        h.provider.handle_unlock_state_changed(None, true);
        h.take_events();

        h.provider.handle_disconnect();
        h.provider.handle_disconnect();
        assert_eq!(h.take_events(), vec![ProviderEvent::Disconnect]);

        let state = h.provider.snapshot();
        assert!(!state.is_connected);
        assert!(!state.is_unlocked);
        assert_eq!(state.chain_id, None);
        assert_eq!(state.accounts, None);
        assert_eq!(state.selected_address, None);
    }

    #[test]
    fn unlock_change_cascades_into_accounts() {
        let h = Harness::initialized();

        h.provider
            .handle_unlock_state_changed(Some(accounts(&["0xaa"])), true);
        assert!(h.provider.is_unlocked());
        assert_eq!(
            h.take_events(),
            vec![ProviderEvent::AccountsChanged(accounts(&["0xaa"]))]
        );

        // Unchanged lock state is a no-op even with different accounts.
        h.provider
            .handle_unlock_state_changed(Some(accounts(&["0xbb"])), true);
        assert!(h.take_events().is_empty());

        h.provider.handle_unlock_state_changed(None, false);
        assert_eq!(
            h.take_events(),
            vec![ProviderEvent::AccountsChanged(Vec::new())]
        );
        assert_eq!(h.provider.selected_address(), None);
    }

    #[tokio::test]
    async fn account_listing_updates_state_before_resolving() {
        let h = Harness::initialized();
        let mut call = Box::pin(h.provider.request(RequestArguments::new("eth_requestAccounts")));
        assert!((&mut call).now_or_never().is_none());
        assert_eq!(h.provider.pending_requests(), 1);

        h.reply_to_last(json!(["0xaa", "0xbb"]));
        assert_eq!(h.provider.selected_address().as_deref(), Some("0xaa"));

        let result = call.await.unwrap();
        assert_eq!(result, json!(["0xaa", "0xbb"]));
        assert_eq!(
            h.take_events(),
            vec![ProviderEvent::AccountsChanged(accounts(&["0xaa", "0xbb"]))]
        );
    }

    #[tokio::test]
    async fn failed_account_listing_leaves_accounts_alone() {
        let h = Harness::initialized();
        h.provider.handle_accounts_changed(&accounts(&["0xaa"]));
        h.take_events();

        let call = h.provider.request(RequestArguments::new("eth_accounts"));
        let mut call = Box::pin(call);
        assert!((&mut call).now_or_never().is_none());
        h.reply_to_last(json!({"error": {"code": 4100, "message": "Unauthorized"}}));

        let err = call.await.unwrap_err();
        assert_eq!(err.code(), 4100);
        assert_eq!(h.provider.selected_address().as_deref(), Some("0xaa"));
        assert!(h.take_events().is_empty());
    }

    #[tokio::test]
    async fn other_methods_do_not_touch_accounts() {
        let h = Harness::initialized();
        let mut call = Box::pin(h.provider.request(RequestArguments::new("eth_getBalance")));
        assert!((&mut call).now_or_never().is_none());
        h.reply_to_last(json!(["0xaa"]));

        assert_eq!(call.await.unwrap(), json!(["0xaa"]));
        assert_eq!(h.provider.selected_address(), None);
    }

    #[tokio::test]
    async fn malformed_arguments_are_rejected_before_sending() {
        let h = Harness::initialized();

        let err = h.provider.request_value(json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequestArgs { .. }));
        let err = h.provider.request_value(json!({"method": ""})).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequestMethod { .. }));
        let err = h
            .provider
            .request_value(json!({"method": "eth_call", "params": 7}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequestParams { .. }));
        assert_eq!(err.to_rpc_error().code, -32600);

        assert!(h.requests.lock().is_empty());
    }

    #[test]
    fn push_notifications_drive_the_state_machine() {
        let h = Harness::initialized();

        h.push(json!({"method": "chainChanged", "params": {"chainId": "0x5"}}));
        h.push(json!({"method": "accountsChanged", "params": ["0xaa"]}));
        h.push(json!({"method": "unlockStateChanged", "params": {"accounts": ["0xbb"], "isUnlocked": true}}));
        h.push(json!({"method": "somethingElse", "params": 1}));
        h.push(json!({"method": "disconnect"}));

        assert_eq!(
            h.take_events(),
            vec![
                ProviderEvent::Connect {
                    chain_id: "0x5".into()
                },
                ProviderEvent::ChainChanged("0x5".into()),
                ProviderEvent::AccountsChanged(accounts(&["0xaa"])),
                ProviderEvent::AccountsChanged(accounts(&["0xbb"])),
                ProviderEvent::Disconnect,
            ]
        );
    }

    #[test]
    fn unlock_push_accepts_unlocked_key() {
        let h = Harness::initialized();

        h.push(json!({"method": "unlockStateChanged", "params": {"accounts": ["0xaa"], "unlocked": true}}));
        assert!(h.provider.is_unlocked());
        assert_eq!(h.provider.selected_address().as_deref(), Some("0xaa"));

        h.push(json!({"method": "unlockStateChanged", "params": {"unlocked": false}}));
        assert!(!h.provider.is_unlocked());
        assert_eq!(
            h.take_events(),
            vec![
                ProviderEvent::AccountsChanged(accounts(&["0xaa"])),
                ProviderEvent::AccountsChanged(Vec::new()),
            ]
        );
    }

    #[test]
    fn chain_changed_push_requires_a_chain_id() {
        let decoded = serde_json::from_value::<ProviderNotification>(
            json!({"method": "chainChanged", "params": {"chainId": "0x1"}}),
        )
        .unwrap();
        assert_eq!(
            decoded,
            ProviderNotification::ChainChanged {
                chain_id: "0x1".into()
            }
        );
        assert!(serde_json::from_value::<ProviderNotification>(json!({"method": "chainChanged"})).is_err());

        let h = Harness::initialized();
        h.push(json!({"method": "chainChanged"}));
        h.push(json!({"method": "chainChanged", "params": {}}));
        assert!(!h.provider.is_connected());
        assert!(h.take_events().is_empty());
    }

    #[test]
    fn failing_listener_does_not_block_others() {
        let h = Harness::initialized();
        let mut failures = h.provider.listener_failures();
        h.provider.on(ACCOUNTS_CHANGED_EVENT, |_| anyhow::bail!("listener blew up"));
        let reached = Arc::new(Mutex::new(false));
        let r = Arc::clone(&reached);
        h.provider.on(ACCOUNTS_CHANGED_EVENT, move |_| {
            *r.lock() = true;
            Ok(())
        });

        h.provider.handle_accounts_changed(&accounts(&["0xaa"]));

        assert!(*reached.lock());
        let failure = failures.try_recv().unwrap();
        assert_eq!(failure.event_type, ACCOUNTS_CHANGED_EVENT);
        assert!(failure.message.contains("listener blew up"));
    }

    #[test]
    fn unhandled_error_event_fails_loudly() {
        let h = Harness::new();
        let error = ProviderRpcError::new(4900, "Disconnected");

        let err = h.provider.emit(ProviderEvent::Error(error.clone())).unwrap_err();
        assert!(matches!(err, ProviderError::UnhandledErrorEvent(ref m) if m == "Disconnected"));

        h.provider.on(ERROR_EVENT, |_| Ok(()));
        assert!(h.provider.emit(ProviderEvent::Error(error)).unwrap());
    }
}
