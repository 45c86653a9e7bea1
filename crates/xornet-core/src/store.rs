//! Keyed in-memory entity store.
//!
//! The store is a pure cache: it never fetches anything on its own.
//! Fetch triggering lives in [`RequestCoalescer`](crate::coalescer::RequestCoalescer).
//!
//! Every mutation is announced on a broadcast channel so views can
//! re-render without polling.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use tokio::sync::broadcast;

use crate::entity::Entity;
use crate::ids::EntityId;

/// Capacity of the change-notification channel. Slow observers see
/// `RecvError::Lagged` and should re-read the whole store.
const NOTIFY_CAPACITY: usize = 1024;

/// A change applied to an [`EntityStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Entity inserted or replaced.
    Upserted(EntityId),
    /// Entity removed.
    Removed(EntityId),
    /// Store wiped (logout).
    Cleared,
}

/// Mapping from entity id to entity value.
#[derive(Debug)]
pub struct EntityStore<T> {
    entries: IndexMap<EntityId, T>,
    notify: broadcast::Sender<StoreEvent>,
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        EntityStore {
            entries: IndexMap::new(),
            notify,
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    /// Upsert `entity` under its own id and notify observers.
    pub fn set(&mut self, entity: T) {
        let id = entity.id().clone();
        self.entries.insert(id.clone(), entity);
        let _ = self.notify.send(StoreEvent::Upserted(id));
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<T> {
        let removed = self.entries.shift_remove(id);
        if removed.is_some() {
            let _ = self.notify.send(StoreEvent::Removed(id.clone()));
        }
        removed
    }

    /// Snapshot of every entity. Order carries no meaning.
    pub fn get_all(&self) -> Vec<T> {
        self.entries.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        let _ = self.notify.send(StoreEvent::Cleared);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.notify.subscribe()
    }
}

/// Handle to a store shared between the sync driver, the coalescers
/// and the views.
///
/// Critical sections are short and never span an `.await`. A poisoned
/// lock is recovered rather than propagated: the map is still coherent
/// because every mutation is a single insert/remove.
#[derive(Debug)]
pub struct SharedStore<T>(Arc<RwLock<EntityStore<T>>>);

impl<T> Clone for SharedStore<T> {
    fn clone(&self) -> Self {
        SharedStore(Arc::clone(&self.0))
    }
}

impl<T: Entity> Default for SharedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> SharedStore<T> {
    pub fn new() -> Self {
        SharedStore(Arc::new(RwLock::new(EntityStore::new())))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, EntityStore<T>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, EntityStore<T>> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cloned lookup.
    pub fn get(&self, id: &EntityId) -> Option<T> {
        self.read().get(id).cloned()
    }

    pub fn set(&self, entity: T) {
        self.write().set(entity);
    }

    pub fn get_all(&self) -> Vec<T> {
        self.read().get_all()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.read().subscribe()
    }
}
