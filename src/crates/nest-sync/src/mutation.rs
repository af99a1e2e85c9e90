//! Optimistic saved-flag mutations
//!
//! The local flag flips before the server answers. If the server rejects the
//! change the flag is put back and the caller gets the error.

use crate::error::Result;
use crate::events::ClientEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Local view state holding saved flags
pub trait LocalFlagStore: Send + Sync {
    /// Current flag of `entity_id`, if it is loaded anywhere
    fn saved_flag(&self, entity_id: &str) -> Option<bool>;

    /// Set the flag of `entity_id` everywhere it is loaded, returning the previous value
    fn set_saved_flag(&self, entity_id: &str, saved: bool) -> Option<bool>;
}

/// Mutation collaborator
#[async_trait]
pub trait SaveRemote: Send + Sync {
    /// Persist the saved flag of `entity_id` on the server
    async fn set_saved(&self, entity_id: &str, saved: bool) -> Result<()>;
}

/// One in-flight optimistic change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationIntent {
    /// Article URL
    pub entity_id: String,
    /// Flag before the change; `None` when the article was not loaded
    pub previous: Option<bool>,
    /// Flag requested
    pub desired: bool,
}

/// Applies saved-flag changes optimistically, one at a time per article
pub struct MutationCoordinator {
    store: Arc<dyn LocalFlagStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    intents: Mutex<HashMap<String, MutationIntent>>,
    events: broadcast::Sender<ClientEvent>,
}

impl MutationCoordinator {
    /// Create a coordinator writing flags into `store`
    pub fn new(store: Arc<dyn LocalFlagStore>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            intents: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// In-flight intent for `entity_id`
    pub fn pending(&self, entity_id: &str) -> Option<MutationIntent> {
        self.intents.lock().get(entity_id).cloned()
    }

    /// Number of in-flight intents
    pub fn pending_count(&self) -> usize {
        self.intents.lock().len()
    }

    /// Flip the flag of `entity_id` to `desired`, then confirm with `remote_call`
    ///
    /// A second call for the same entity waits until the first one has
    /// committed or rolled back. Calls for different entities run
    /// independently.
    pub async fn apply<F, Fut>(&self, entity_id: &str, desired: bool, remote_call: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let entity_lock = self.entity_lock(entity_id);
        let guard = entity_lock.lock().await;

        let intent = MutationIntent {
            entity_id: entity_id.to_string(),
            previous: self.store.set_saved_flag(entity_id, desired),
            desired,
        };
        self.intents
            .lock()
            .insert(entity_id.to_string(), intent.clone());
        debug!(entity = entity_id, desired, previous = ?intent.previous, "optimistic flag applied");

        let result = remote_call().await;
        self.intents.lock().remove(entity_id);

        let outcome = match result {
            Ok(()) => {
                info!(entity = entity_id, saved = desired, "saved flag committed");
                let _ = self.events.send(ClientEvent::MutationCommitted {
                    entity_id: entity_id.to_string(),
                    saved: desired,
                });
                Ok(())
            }
            Err(e) => {
                if let Some(previous) = intent.previous {
                    self.store.set_saved_flag(entity_id, previous);
                }
                let restored = intent.previous.unwrap_or(!desired);
                warn!(entity = entity_id, restored, error = %e, "saved flag rolled back");
                let _ = self.events.send(ClientEvent::MutationRolledBack {
                    entity_id: entity_id.to_string(),
                    saved: restored,
                    error: e.clone(),
                });
                Err(e)
            }
        };

        drop(guard);
        self.release_lock(entity_id, &entity_lock);
        outcome
    }

    fn entity_lock(&self, entity_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(entity_id.to_string())
            .or_default()
            .clone()
    }

    fn release_lock(&self, entity_id: &str, entity_lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        let idle = locks
            .get(entity_id)
            .is_some_and(|held| Arc::ptr_eq(held, entity_lock) && Arc::strong_count(entity_lock) == 2);
        if idle {
            locks.remove(entity_id);
        }
    }
}
