//! EIP-6963 multi-provider discovery.
//!
//! A provider announces itself on the page as soon as it is ready, and again
//! every time a dapp broadcasts `eip6963:requestProvider`, so discovery works
//! regardless of which side loads first.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use inpage_core::{Eip1193, ListenerId, ProviderError};

use crate::page::{PageEvent, PageScope};

pub const ANNOUNCE_EVENT: &str = "eip6963:announceProvider";
pub const REQUEST_EVENT: &str = "eip6963:requestProvider";

/// Lowercase v4 UUID, or the all-zero nil UUID.
static UUID_V4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[a-f0-9]{8}-[a-f0-9]{4}-4[a-f0-9]{3}-[a-f0-9]{4}-[a-f0-9]{12}|0{8}-0{4}-0{4}-0{4}-0{12})$",
    )
    .expect("static regex")
});

/// Reverse-DNS name: dot-separated labels that neither start nor end with
/// `-`, ending in an alphabetic top-level label. Overall length is checked
/// separately.
static RDNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,63}$")
        .expect("static regex")
});

const RDNS_LEN: std::ops::RangeInclusive<usize> = 4..=253;

/// Identity a wallet announces to dapps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Per-session v4 UUID.
    pub uuid: String,
    /// Human-readable wallet name.
    pub name: String,
    /// Icon as a `data:image/...` URI.
    pub icon: String,
    /// Reverse-DNS identifier, e.g. `com.example.wallet`.
    pub rdns: String,
}

impl Default for ProviderInfo {
    fn default() -> Self {
        Self {
            uuid: "350670db-19fa-4704-a166-e52e178b59d2".to_string(),
            name: "Octopus Wallet".to_string(),
            icon: "data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg'/>".to_string(),
            rdns: "io.octopus.wallet".to_string(),
        }
    }
}

impl ProviderInfo {
    pub fn validate(&self) -> Result<(), ProviderError> {
        if !UUID_V4.is_match(&self.uuid) {
            return Err(invalid(format!("uuid {:?} is not a v4 UUID", self.uuid)));
        }
        if self.name.is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if !self.icon.starts_with("data:image") {
            return Err(invalid("icon must be a data:image URI".to_string()));
        }
        if !RDNS_LEN.contains(&self.rdns.len()) || !RDNS.is_match(&self.rdns) {
            return Err(invalid(format!(
                "rdns {:?} is not a reverse-DNS domain name",
                self.rdns
            )));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> ProviderError {
    ProviderError::InvalidPeerIdentity(reason)
}

/// Payload of an announcement: a frozen copy of the identity plus the
/// provider handle itself.
#[derive(Clone)]
pub struct ProviderDetail {
    pub info: Arc<ProviderInfo>,
    pub provider: Arc<dyn Eip1193>,
}

impl std::fmt::Debug for ProviderDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDetail")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Announce `provider` on `scope` and keep answering discovery requests.
///
/// Nothing is dispatched if `info` is invalid. Returns the id of the
/// request listener, which stays registered for the life of the page.
pub fn announce_provider(
    scope: &Arc<PageScope>,
    info: ProviderInfo,
    provider: Arc<dyn Eip1193>,
) -> Result<ListenerId, ProviderError> {
    info.validate()?;

    let detail = ProviderDetail {
        info: Arc::new(info),
        provider,
    };

    scope.dispatch_event(PageEvent::AnnounceProvider(detail.clone()))?;
    tracing::info!(
        uuid = %detail.info.uuid,
        rdns = %detail.info.rdns,
        "provider announced"
    );

    let page = Arc::downgrade(scope);
    let id = scope.add_event_listener(REQUEST_EVENT, move |event| {
        if !matches!(event, PageEvent::RequestProvider) {
            return Err(ProviderError::InvalidDiscoveryRequest {
                event: REQUEST_EVENT.to_string(),
            }
            .into());
        }
        if let Some(page) = page.upgrade() {
            tracing::debug!(uuid = %detail.info.uuid, "re-announcing on request");
            page.dispatch_event(PageEvent::AnnounceProvider(detail.clone()))?;
        }
        Ok(())
    });

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inpage_core::RequestArguments;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    struct StubProvider;

    #[async_trait]
    impl Eip1193 for StubProvider {
        async fn request(&self, _args: RequestArguments) -> Result<Value, ProviderError> {
            Ok(Value::Null)
        }

        fn chain_id(&self) -> Option<String> {
            None
        }

        fn selected_address(&self) -> Option<String> {
            None
        }

        fn is_connected(&self) -> bool {
            false
        }
    }

    fn record_announcements(page: &PageScope) -> Arc<Mutex<Vec<ProviderInfo>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        page.add_event_listener(ANNOUNCE_EVENT, move |event| {
            if let PageEvent::AnnounceProvider(detail) = event {
                sink.lock().push((*detail.info).clone());
            }
            Ok(())
        });
        seen
    }

    #[test]
    fn default_identity_is_valid() {
        assert!(ProviderInfo::default().validate().is_ok());
    }

    #[test]
    fn nil_uuid_is_accepted() {
        let info = ProviderInfo {
            uuid: "00000000-0000-0000-0000-000000000000".into(),
            ..ProviderInfo::default()
        };
        assert!(info.validate().is_ok());
    }

    #[test]
    fn rejects_bad_identities() {
        let cases = [
            ProviderInfo {
                // version nibble is 1, not 4
                uuid: "350670db-19fa-1704-a166-e52e178b59d2".into(),
                ..ProviderInfo::default()
            },
            ProviderInfo {
                uuid: "350670DB-19FA-4704-A166-E52E178B59D2".into(),
                ..ProviderInfo::default()
            },
            ProviderInfo {
                name: String::new(),
                ..ProviderInfo::default()
            },
            ProviderInfo {
                icon: "https://wallet.example/icon.png".into(),
                ..ProviderInfo::default()
            },
            ProviderInfo {
                rdns: "localhost".into(),
                ..ProviderInfo::default()
            },
            ProviderInfo {
                rdns: "-io.octopus".into(),
                ..ProviderInfo::default()
            },
            ProviderInfo {
                rdns: "io.octopus.1x".into(),
                ..ProviderInfo::default()
            },
            ProviderInfo {
                rdns: format!("{}.io", "a.".repeat(130)),
                ..ProviderInfo::default()
            },
        ];
        for info in cases {
            let err = info.validate().unwrap_err();
            assert!(matches!(err, ProviderError::InvalidPeerIdentity(_)), "{info:?}");
            assert!(err
                .to_string()
                .ends_with("See https://eips.ethereum.org/EIPS/eip-6963 for requirements."));
        }
    }

    #[test]
    fn invalid_identity_is_never_broadcast() {
        let page = PageScope::new("https://dapp.example");
        let seen = record_announcements(&page);
        let info = ProviderInfo {
            icon: "icon.png".into(),
            ..ProviderInfo::default()
        };

        let err = announce_provider(&page, info, Arc::new(StubProvider)).unwrap_err();
        assert!(err.is_fatal());
        assert!(seen.lock().is_empty());
        assert_eq!(page.listener_count(REQUEST_EVENT), 0);
    }

    #[test]
    fn announces_immediately_and_once_per_request() {
        let page = PageScope::new("https://dapp.example");
        let seen = record_announcements(&page);

        announce_provider(&page, ProviderInfo::default(), Arc::new(StubProvider)).unwrap();
        assert_eq!(seen.lock().len(), 1);

        page.dispatch_event(PageEvent::RequestProvider).unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[1], ProviderInfo::default());
    }

    #[test]
    fn late_consumer_discovers_via_request() {
        let page = PageScope::new("https://dapp.example");
        announce_provider(&page, ProviderInfo::default(), Arc::new(StubProvider)).unwrap();

        let seen = record_announcements(&page);
        assert!(seen.lock().is_empty());
        page.dispatch_event(PageEvent::RequestProvider).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn forged_request_is_rejected_without_reannouncing() {
        let page = PageScope::new("https://dapp.example");
        let mut failures = page.listener_failures();
        announce_provider(&page, ProviderInfo::default(), Arc::new(StubProvider)).unwrap();
        let seen = record_announcements(&page);

        page.dispatch_event(PageEvent::Custom {
            event_type: REQUEST_EVENT.into(),
            detail: json!({"forged": true}),
        })
        .unwrap();

        assert!(seen.lock().is_empty());
        let failure = failures.try_recv().unwrap();
        assert_eq!(failure.event_type, REQUEST_EVENT);
        assert!(failure.message.contains("Invalid EIP-6963 RequestProviderEvent"));
    }
}
