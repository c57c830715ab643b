//! inpage-core — request correlation and event plumbing for an in-page
//! wallet provider.
//!
//! # Overview
//!
//! - [`RpcCenter`] — multiplexes calls over a cross-context message channel,
//!   matching replies by correlation id, with a bounded pending table
//! - [`EventBus`] — fault-isolated publish/subscribe
//! - [`HostWindow`] / [`Eip1193`] — seams to the host page and to page code
//! - [`RequestArguments`] / [`Envelope`] — wire types
//! - [`ProviderError`] / [`ProviderRpcError`] — error taxonomy and code registry
//! - [`logging`] — tracing subscriber setup

pub mod config;
pub mod error;
pub mod event_bus;
pub mod logging;
pub mod request;
pub mod rpc_center;
pub mod transport;

pub use config::RpcCenterConfig;
pub use error::{codes, ProviderError, ProviderRpcError};
pub use event_bus::{BusEvent, EventBus, ListenerFailure, ListenerId, ERROR_EVENT};
pub use request::{
    interpret_reply, ChannelMessage, Envelope, RequestArguments, RequestEnvelope, RequestParams,
};
pub use rpc_center::{PendingReply, RpcCenter};
pub use transport::{Eip1193, HostWindow, MessageEvent, MessageListener};
