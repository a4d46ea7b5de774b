//! Registry of the bulbs seen on the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::session::{BulbClient, BulbSession, EventSink};

/// A bulb found on the network.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredBulb {
    /// Network address of the bulb, `ip:port`.
    pub address: String,
    pub label: Option<String>,
}

impl DiscoveredBulb {
    pub fn new(address: &str, label: Option<&str>) -> Self {
        DiscoveredBulb {
            address: address.to_string(),
            label: label.map(String::from),
        }
    }
}

/// Sessions of every known bulb, keyed by address.
///
/// Discovery may report a bulb any number of times and from several threads;
/// each address gets exactly one session.
pub struct BulbRegistry {
    config: BridgeConfig,
    sink: Arc<dyn EventSink>,
    bulbs: Mutex<HashMap<String, Arc<BulbSession>>>,
}

impl BulbRegistry {
    pub fn new(config: BridgeConfig, sink: Arc<dyn EventSink>) -> Self {
        BulbRegistry {
            config,
            sink,
            bulbs: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Create a session for `bulb` unless its address is already known.
    ///
    /// Returns the new session, or `None` if the bulb was registered before.
    pub fn register(
        &self,
        bulb: &DiscoveredBulb,
        client: Arc<dyn BulbClient>,
    ) -> Option<Arc<BulbSession>> {
        let mut bulbs = self.lock();
        if bulbs.contains_key(&bulb.address) {
            return None;
        }

        let session = Arc::new(BulbSession::new(
            &bulb.address,
            bulb.label.as_deref(),
            client,
            self.sink.clone(),
            &self.config,
        ));
        debug!("registered bulb {} as {}", bulb.address, session.id());
        bulbs.insert(bulb.address.clone(), session.clone());
        Some(session)
    }

    pub fn get(&self, address: &str) -> Option<Arc<BulbSession>> {
        self.lock().get(address).cloned()
    }

    pub fn find_by_id(&self, id: &Uuid) -> Option<Arc<BulbSession>> {
        self.lock()
            .values()
            .find(|session| session.id() == *id)
            .cloned()
    }

    pub fn remove(&self, address: &str) -> Option<Arc<BulbSession>> {
        let removed = self.lock().remove(address);
        if removed.is_some() {
            debug!("removed bulb {}", address);
        }
        removed
    }

    /// Known addresses, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<_> = self.lock().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<BulbSession>>> {
        self.bulbs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DeviceCommand;
    use crate::echo::BusEvent;
    use crate::runtime::BoxFuture;
    use std::io;
    use std::thread;

    struct NullClient;

    impl BulbClient for NullClient {
        fn apply<'a>(&'a self, _command: &'a DeviceCommand) -> BoxFuture<'a, io::Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct NullSink;

    impl EventSink for NullSink {
        fn emit(&self, _event: BusEvent) {}
    }

    fn registry() -> BulbRegistry {
        BulbRegistry::new(BridgeConfig::default(), Arc::new(NullSink))
    }

    #[test]
    fn test_register_once_per_address() {
        let registry = registry();
        let bulb = DiscoveredBulb::new("10.0.0.7:56700", Some("Hall"));

        let session = registry.register(&bulb, Arc::new(NullClient)).unwrap();
        assert_eq!(session.label(), Some("Hall"));
        assert!(registry.register(&bulb, Arc::new(NullClient)).is_none());
        assert_eq!(registry.len(), 1);

        let found = registry.find_by_id(&session.id()).unwrap();
        assert!(Arc::ptr_eq(&found, &session));
        assert!(Arc::ptr_eq(&registry.get("10.0.0.7:56700").unwrap(), &session));
    }

    #[test]
    fn test_sessions_share_config() {
        let config = BridgeConfig::default().with_history_size(3);
        let registry = BulbRegistry::new(config.clone(), Arc::new(NullSink));
        assert_eq!(registry.config(), &config);
        assert!(registry.is_empty());

        let session = registry
            .register(&DiscoveredBulb::new("10.0.0.5:56700", None), Arc::new(NullClient))
            .unwrap();
        assert!(session.label().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove() {
        let registry = registry();
        registry.register(&DiscoveredBulb::new("10.0.0.8:56700", None), Arc::new(NullClient));
        registry.register(&DiscoveredBulb::new("10.0.0.2:56700", None), Arc::new(NullClient));
        assert_eq!(registry.addresses(), ["10.0.0.2:56700", "10.0.0.8:56700"]);

        assert!(registry.remove("10.0.0.8:56700").is_some());
        assert!(registry.remove("10.0.0.8:56700").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_register() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    registry
                        .register(
                            &DiscoveredBulb::new("10.0.0.9:56700", None),
                            Arc::new(NullClient),
                        )
                        .is_some()
                })
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|created| *created)
            .count();
        assert_eq!(created, 1);
        assert_eq!(registry.len(), 1);
    }
}
