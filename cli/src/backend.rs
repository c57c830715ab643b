//! Scripted wallet backend for the demo.
//!
//! Plays the content-script side of the channel: it listens for requests
//! addressed to the configured target and answers them from a small fixed
//! script, and can push unsolicited notifications to the provider.

use std::sync::{Arc, Weak};

use inpage_core::{codes, Envelope, HostWindow, MessageEvent, ProviderRpcError};
use inpage_provider::{PageScope, ProviderConfig};
use serde_json::{json, Value};

pub struct ScriptedWallet {
    page: Weak<PageScope>,
    origin: String,
    reply_to: String,
    accounts: Vec<String>,
    chain_id: String,
}

impl ScriptedWallet {
    /// Attach a wallet to `page`, answering requests sent through `config`'s
    /// channel.
    pub fn install(page: &Arc<PageScope>, config: &ProviderConfig) -> Arc<Self> {
        let wallet = Arc::new(Self {
            page: Arc::downgrade(page),
            origin: page.origin().to_string(),
            reply_to: config.message_name.clone(),
            accounts: vec![
                "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".to_string(),
                "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359".to_string(),
            ],
            chain_id: "0x1".to_string(),
        });

        let listen_as = config.message_target.clone();
        let w = Arc::downgrade(&wallet);
        page.add_message_listener(Box::new(move |event: &MessageEvent| {
            let Ok(request) = serde_json::from_value::<Envelope<Value>>(event.data.clone()) else {
                return;
            };
            if request.target != listen_as {
                return;
            }
            if let (Some(wallet), Some(id)) = (w.upgrade(), request.correlation_id) {
                let reply = wallet.answer(&request.data);
                wallet.post(Envelope::correlated(id, wallet.reply_to.clone(), reply));
            }
        }));

        wallet
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Push a server-initiated notification to the provider.
    pub fn push(&self, method: &str, params: Value) {
        let data = json!({"method": method, "params": params});
        self.post(Envelope::unsolicited(self.reply_to.clone(), data));
    }

    fn answer(&self, request: &Value) -> Value {
        let method = request["method"].as_str().unwrap_or_default();
        tracing::debug!(method, "wallet received request");
        match method {
            "eth_chainId" => json!({"result": self.chain_id}),
            "eth_accounts" | "eth_requestAccounts" => json!(self.accounts),
            "eth_blockNumber" => json!({"result": "0x12a05f2"}),
            "eth_sendTransaction" => rpc_error(ProviderRpcError::new(
                codes::USER_REJECTED_REQUEST,
                "User rejected the request.",
            )),
            other => rpc_error(
                ProviderRpcError::new(codes::UNSUPPORTED_METHOD, "")
                    .with_data(json!({"method": other})),
            ),
        }
    }

    fn post(&self, envelope: Envelope<Value>) {
        let Some(page) = self.page.upgrade() else {
            return;
        };
        match serde_json::to_value(&envelope) {
            Ok(message) => page.post_message_from(self.origin.clone(), message),
            Err(err) => tracing::warn!(error = %err, "failed to encode wallet message"),
        }
    }
}

fn rpc_error(error: ProviderRpcError) -> Value {
    json!({ "error": error })
}
