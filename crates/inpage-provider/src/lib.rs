//! inpage-provider — an EIP-1193 provider for in-page wallets, with EIP-6963
//! discovery.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use inpage_provider::{create_inpage_provider, PageScope, ProviderConfig, ProviderInfo};
//! use inpage_core::RequestArguments;
//!
//! # async fn run() -> Result<(), inpage_core::ProviderError> {
//! let page = PageScope::new("https://dapp.example");
//! let provider = create_inpage_provider(&page, ProviderConfig::default(), ProviderInfo::default())?;
//!
//! provider.on("accountsChanged", |event| {
//!     println!("{event:?}");
//!     Ok(())
//! });
//! let accounts = provider.request(RequestArguments::new("eth_requestAccounts")).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod page;
pub mod provider;

use std::sync::Arc;

use inpage_core::{HostWindow, ProviderError};

pub use config::{InpageConfig, ProviderConfig};
pub use discovery::{announce_provider, ProviderDetail, ProviderInfo, ANNOUNCE_EVENT, REQUEST_EVENT};
pub use page::{PageEvent, PageScope, MESSAGE_EVENT};
pub use provider::{is_valid_chain_id, InpageProvider, ProviderEvent, ProviderNotification};

/// Build a provider for `scope`, initialize it, announce it over EIP-6963
/// and inject it as the page's `ethereum` object.
///
/// Configuration and identity are validated up front, so nothing is wired
/// into the page when either is invalid.
pub fn create_inpage_provider(
    scope: &Arc<PageScope>,
    config: ProviderConfig,
    info: ProviderInfo,
) -> Result<Arc<InpageProvider>, ProviderError> {
    config.validate()?;
    info.validate()?;

    let window: Arc<dyn HostWindow> = scope.clone();
    let provider = InpageProvider::new(config, window);
    provider.initialize()?;

    announce_provider(scope, info, provider.clone())?;
    scope.inject_provider(provider.clone());

    tracing::info!(origin = %scope.origin(), "in-page provider ready");
    Ok(provider)
}
