//! Host-keyed map of live sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::session::SessionContext;

/// Each session is locked on its own; the map lock is held only for lookups.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionContext>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context for `key`, created empty on first access.
    pub async fn get_or_create(&self, key: &str) -> Arc<Mutex<SessionContext>> {
        if let Some(ctx) = self.sessions.read().await.get(key) {
            return Arc::clone(ctx);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(key.to_string()).or_insert_with(|| {
            debug!(key, "new session context");
            Arc::new(Mutex::new(SessionContext::new()))
        }))
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Mutex<SessionContext>>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Drops the registry's handle; callers holding a clone keep theirs.
    pub async fn remove(&self, key: &str) -> Option<Arc<Mutex<SessionContext>>> {
        self.sessions.write().await.remove(key)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_same_context() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("browser-1").await;
        let b = registry.get_or_create("browser-1").await;
        assert!(Arc::ptr_eq(&a, &b));

        let c = registry.get_or_create("browser-2").await;
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn remove_forgets_the_session() {
        let registry = SessionRegistry::new();
        let first = registry.get_or_create("k").await;
        first.lock().await.ensure_session_id();

        assert!(registry.remove("k").await.is_some());
        assert!(registry.get("k").await.is_none());

        let fresh = registry.get_or_create("k").await;
        assert!(fresh.lock().await.session_id().is_none());
    }
}
