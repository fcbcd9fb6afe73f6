//! Process-wide push client.
//!
//! Every dashboard in the process shares one connection. The first caller's
//! configuration wins; later callers get the same instance.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};

use crate::client::LiveClient;
use crate::config::LiveConfig;

static SHARED: Mutex<Option<Arc<LiveClient>>> = Mutex::new(None);

fn lock_shared() -> MutexGuard<'static, Option<Arc<LiveClient>>> {
    SHARED.lock().unwrap_or_else(|e| e.into_inner())
}

/// Returns the shared client, creating it from `config` on first use.
///
/// The connection itself is not opened until something subscribes.
pub fn shared_client(config: &LiveConfig) -> Arc<LiveClient> {
    let mut shared = lock_shared();
    if let Some(client) = shared.as_ref() {
        if client.config().endpoint() != config.endpoint() {
            warn!(
                "Shared push client already points at {}, ignoring {}",
                client.config().endpoint(),
                config.endpoint()
            );
        }
        return Arc::clone(client);
    }

    info!("Creating shared push client for {}", config.endpoint());
    let client = Arc::new(LiveClient::new(config.clone()));
    *shared = Some(Arc::clone(&client));
    client
}

/// Returns the shared client if one has been created.
pub fn current_shared_client() -> Option<Arc<LiveClient>> {
    lock_shared().clone()
}

/// Drops the shared client and stops its connection.
///
/// Returns `false` if there was nothing to reset. Clients already handed out
/// stay usable but are disconnected; the next [`shared_client`] call starts
/// a fresh one.
pub fn reset_shared_client() -> bool {
    let Some(client) = lock_shared().take() else {
        return false;
    };
    client.shutdown_now();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: the singleton is global to the test binary.
    #[test]
    fn shared_client_is_created_once_and_reset() {
        reset_shared_client();
        assert!(current_shared_client().is_none());
        assert!(!reset_shared_client());

        let first = shared_client(&LiveConfig::new("http://localhost:3000").unwrap());
        let second = shared_client(&LiveConfig::new("http://localhost:4000").unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.config().server_url.as_str(), "http://localhost:3000/");
        assert!(current_shared_client().is_some_and(|c| Arc::ptr_eq(&c, &first)));

        assert!(reset_shared_client());
        assert!(current_shared_client().is_none());

        let third = shared_client(&LiveConfig::new("http://localhost:4000").unwrap());
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(reset_shared_client());
    }
}
