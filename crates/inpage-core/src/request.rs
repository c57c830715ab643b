//! Wire types exchanged between the page and the wallet backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProviderError, ProviderRpcError};

/// Methods whose successful result is the connected account list.
pub const ACCOUNT_METHODS: [&str; 2] = ["eth_accounts", "eth_requestAccounts"];

/// Positional or named call parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestParams {
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl From<Vec<Value>> for RequestParams {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(fields: Map<String, Value>) -> Self {
        Self::Object(fields)
    }
}

/// Arguments of a provider call, also the `data` payload of a request envelope.
///
/// `params` is left out of the serialized form when absent, so "no params"
/// and "empty params" stay distinguishable on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArguments {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: impl Into<RequestParams>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Returns `true` for `eth_accounts` / `eth_requestAccounts`.
    pub fn is_account_listing(&self) -> bool {
        ACCOUNT_METHODS.contains(&self.method.as_str())
    }

    /// Check the invariants the type system does not already enforce.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.method.is_empty() {
            return Err(ProviderError::InvalidRequestMethod {
                args: serde_json::to_value(self)?,
            });
        }
        Ok(())
    }
}

impl TryFrom<Value> for RequestArguments {
    type Error = ProviderError;

    /// Validate untyped call arguments in order: shape, method, params.
    fn try_from(args: Value) -> Result<Self, Self::Error> {
        if !args.is_object() {
            return Err(ProviderError::InvalidRequestArgs { args });
        }

        let method = args
            .get("method")
            .and_then(Value::as_str)
            .filter(|method| !method.is_empty())
            .map(str::to_owned);
        let Some(method) = method else {
            return Err(ProviderError::InvalidRequestMethod { args });
        };

        let params = match args.get("params") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(RequestParams::Array(items.clone())),
            Some(Value::Object(fields)) => Some(RequestParams::Object(fields.clone())),
            Some(_) => return Err(ProviderError::InvalidRequestParams { args: args.clone() }),
        };

        Ok(Self { method, params })
    }
}

/// Cross-context envelope: `{ correlationId, target, data }`.
///
/// Outbound requests always carry a correlation id; inbound push
/// notifications may omit it. The id is also accepted under the key `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub target: String,
    pub data: T,
}

/// Envelope of an outbound call.
pub type RequestEnvelope = Envelope<RequestArguments>;

/// Envelope as received from the channel, payload still untyped.
pub type ChannelMessage = Envelope<Value>;

impl<T> Envelope<T> {
    /// Envelope answering (or initiating) correlation `id`.
    pub fn correlated(id: impl Into<String>, target: impl Into<String>, data: T) -> Self {
        Self {
            correlation_id: Some(id.into()),
            target: target.into(),
            data,
        }
    }

    /// Envelope without a correlation id (server-initiated push).
    pub fn unsolicited(target: impl Into<String>, data: T) -> Self {
        Self {
            correlation_id: None,
            target: target.into(),
            data,
        }
    }
}

/// Turn reply data into the value the caller's future resolves with.
///
/// - an object with a non-null `error` rejects with that error
/// - an array resolves as is
/// - an object with a `result` field resolves to that field
/// - any other value is a bare result
pub fn interpret_reply(data: Value) -> Result<Value, ProviderError> {
    match data {
        Value::Object(mut fields) => {
            match fields.remove("error") {
                None | Some(Value::Null) => {}
                Some(error) => return Err(ProviderError::Rpc(ProviderRpcError::from_reply(error))),
            }
            match fields.remove("result") {
                Some(result) => Ok(result),
                None => Ok(Value::Object(fields)),
            }
        }
        other => Ok(other),
    }
}
