//! Provider error types and the numeric error-code registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Numeric error codes from EIP-1193 (provider errors) and EIP-1474 /
/// JSON-RPC 2.0 (RPC errors).
pub mod codes {
    /// The user rejected the request.
    pub const USER_REJECTED_REQUEST: i64 = 4001;
    /// The requested method and/or account has not been authorized by the user.
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider does not support the requested method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// The provider is disconnected from all chains.
    pub const DISCONNECTED: i64 = 4900;
    /// The provider is not connected to the requested chain.
    pub const CHAIN_DISCONNECTED: i64 = 4901;

    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Request exceeds a defined limit (EIP-1474).
    pub const LIMIT_EXCEEDED: i64 = -32005;

    /// Default human-readable message for a registered code.
    pub fn default_message(code: i64) -> Option<&'static str> {
        let message = match code {
            USER_REJECTED_REQUEST => "User rejected the request.",
            UNAUTHORIZED => {
                "The requested account and/or method has not been authorized by the user."
            }
            UNSUPPORTED_METHOD => "The requested method is not supported by this Ethereum provider.",
            DISCONNECTED => "The provider is disconnected from all chains.",
            CHAIN_DISCONNECTED => "The provider is disconnected from the specified chain.",
            PARSE_ERROR => "Invalid JSON was received by the server.",
            INVALID_REQUEST => "The JSON sent is not a valid Request object.",
            METHOD_NOT_FOUND => "The method does not exist / is not available.",
            INVALID_PARAMS => "Invalid method parameter(s).",
            INTERNAL_ERROR => "Internal JSON-RPC error.",
            LIMIT_EXCEEDED => "Request exceeds defined limit.",
            _ => return None,
        };
        Some(message)
    }

    /// Returns `true` if `code` is present in the registry.
    pub fn is_known(code: i64) -> bool {
        default_message(code).is_some()
    }
}

/// Structured error as seen by page code: `{ code, message, data? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    /// Build an error with an explicit message. An empty message falls back to
    /// the registry default for `code`.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            codes::default_message(code)
                .unwrap_or("Unknown error.")
                .to_string()
        } else {
            message
        };
        Self {
            code,
            message,
            data: None,
        }
    }

    /// Build an error carrying the registry's default message.
    /// Returns `None` for codes outside the registry.
    pub fn from_code(code: i64) -> Option<Self> {
        codes::default_message(code).map(|message| Self::new(code, message))
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Interpret the `error` field of a wallet reply.
    ///
    /// Well-formed `{code, message, data?}` objects are taken as is; a bare
    /// string becomes the message of an internal error; anything else is
    /// attached as `data` of an internal error.
    pub fn from_reply(error: Value) -> Self {
        if let Ok(parsed) = serde_json::from_value::<ProviderRpcError>(error.clone()) {
            return Self::new(parsed.code, parsed.message).with_optional_data(parsed.data);
        }
        match error {
            Value::String(message) => Self::new(codes::INTERNAL_ERROR, message),
            other => Self::new(codes::INTERNAL_ERROR, "").with_data(other),
        }
    }

    fn with_optional_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }
}

impl std::fmt::Display for ProviderRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "provider error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderRpcError {}

/// Errors surfaced by the provider runtime.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request arguments were not a single non-array object.
    #[error("Expected a single, non-array, object argument.")]
    InvalidRequestArgs { args: Value },

    /// `args.method` missing or empty.
    #[error("'args.method' must be a non-empty string.")]
    InvalidRequestMethod { args: Value },

    /// `args.params` present but neither an array nor an object.
    #[error("'args.params' must be an object or array if provided.")]
    InvalidRequestParams { args: Value },

    /// The pending request table is full.
    #[error("Too many requests in progress ({limit} pending). Please try again later.")]
    ResourceExhausted { limit: usize },

    /// An EIP-6963 provider identity failed validation.
    #[error("Invalid EIP-6963 ProviderDetail object: {0}. See https://eips.ethereum.org/EIPS/eip-6963 for requirements.")]
    InvalidPeerIdentity(String),

    /// A discovery request signal was not a genuine request event.
    #[error("Invalid EIP-6963 RequestProviderEvent object received from {event} event. See https://eips.ethereum.org/EIPS/eip-6963 for requirements.")]
    InvalidDiscoveryRequest { event: String },

    /// `initialize` was called on an already initialized provider.
    #[error("Provider already initialized.")]
    AlreadyInitialized,

    /// The wallet answered the call with an error object.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(ProviderRpcError),

    /// The pending entry was dropped without a reply.
    #[error("Reply channel closed before a response arrived")]
    ReplyDropped,

    /// The host refused to transmit the message.
    #[error("postMessage failed: {0}")]
    PostMessage(String),

    /// An `error` event was emitted with nobody listening.
    #[error("Unhandled error. ({0})")]
    UnhandledErrorEvent(String),

    /// Configuration rejected before use.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A payload could not be (de)serialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Registry code for this error.
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidRequestArgs { .. }
            | Self::InvalidRequestMethod { .. }
            | Self::InvalidRequestParams { .. } => codes::INVALID_REQUEST,
            Self::ResourceExhausted { .. } => codes::LIMIT_EXCEEDED,
            Self::Rpc(err) => err.code,
            Self::Deserialization(_) => codes::PARSE_ERROR,
            Self::InvalidPeerIdentity(_)
            | Self::InvalidDiscoveryRequest { .. }
            | Self::AlreadyInitialized
            | Self::ReplyDropped
            | Self::PostMessage(_)
            | Self::UnhandledErrorEvent(_)
            | Self::InvalidConfig(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Returns `true` for programming errors that cannot be recovered from by
    /// retrying the same operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInitialized
                | Self::InvalidPeerIdentity(_)
                | Self::InvalidDiscoveryRequest { .. }
                | Self::InvalidConfig(_)
        )
    }

    /// Returns `true` if the call was rejected before anything was transmitted.
    pub fn is_rejected_before_send(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequestArgs { .. }
                | Self::InvalidRequestMethod { .. }
                | Self::InvalidRequestParams { .. }
                | Self::ResourceExhausted { .. }
        )
    }

    /// Structured `{code, message, data?}` form handed to page code.
    pub fn to_rpc_error(&self) -> ProviderRpcError {
        match self {
            Self::Rpc(err) => err.clone(),
            Self::InvalidRequestArgs { args }
            | Self::InvalidRequestMethod { args }
            | Self::InvalidRequestParams { args } => {
                ProviderRpcError::new(self.code(), self.to_string()).with_data(args.clone())
            }
            other => ProviderRpcError::new(other.code(), other.to_string()),
        }
    }
}

impl From<ProviderRpcError> for ProviderError {
    fn from(err: ProviderRpcError) -> Self {
        Self::Rpc(err)
    }
}
