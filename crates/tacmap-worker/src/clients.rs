//! Pages controlled by the worker.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Identifier of an open page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub String);

impl ClientId {
    /// Create a client ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Open pages and the worker version controlling each of them.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<BTreeMap<ClientId, Option<String>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened page. It starts uncontrolled.
    pub fn register(&self, id: ClientId) {
        self.lock().entry(id).or_insert(None);
    }

    /// Forget a closed page.
    pub fn unregister(&self, id: &ClientId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Version controlling a page, if any.
    pub fn controller(&self, id: &ClientId) -> Option<String> {
        self.lock().get(id).cloned().flatten()
    }

    /// Make `version` the controller of every open page.
    ///
    /// Returns how many pages changed controller.
    pub fn claim(&self, version: &str) -> usize {
        let mut clients = self.lock();
        let mut changed = 0;
        for controller in clients.values_mut() {
            if controller.as_deref() != Some(version) {
                *controller = Some(version.to_string());
                changed += 1;
            }
        }
        changed
    }

    /// Number of open pages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no page is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ClientId, Option<String>>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clients_are_uncontrolled() {
        let registry = ClientRegistry::new();
        registry.register(ClientId::new("tab-1"));
        assert_eq!(registry.controller(&ClientId::new("tab-1")), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_claim_takes_over_all_clients() {
        let registry = ClientRegistry::new();
        registry.register(ClientId::new("tab-1"));
        registry.register(ClientId::new("tab-2"));

        assert_eq!(registry.claim("tacmap-v1"), 2);
        assert_eq!(
            registry.controller(&ClientId::new("tab-2")).as_deref(),
            Some("tacmap-v1")
        );
        assert_eq!(registry.claim("tacmap-v1"), 0);
        assert_eq!(registry.claim("tacmap-v2"), 2);
    }

    #[test]
    fn test_register_keeps_existing_controller() {
        let registry = ClientRegistry::new();
        registry.register(ClientId::new("tab-1"));
        registry.claim("tacmap-v1");
        registry.register(ClientId::new("tab-1"));
        assert_eq!(
            registry.controller(&ClientId::new("tab-1")).as_deref(),
            Some("tacmap-v1")
        );
    }

    #[test]
    fn test_unregister() {
        let registry = ClientRegistry::new();
        registry.register(ClientId::new("tab-1"));
        assert!(registry.unregister(&ClientId::new("tab-1")));
        assert!(!registry.unregister(&ClientId::new("tab-1")));
        assert!(registry.is_empty());
    }
}
