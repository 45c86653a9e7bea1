//! Request coalescer for on-demand entity fetches.
//!
//! Guarantees at most one in-flight fetch per entity id. Concurrent
//! callers asking for the same missing id share a single underlying
//! request and all observe the same result.
//!
//! The fetch runs on its own task, so the pending marker is cleared
//! when the fetch settles even if every caller stopped waiting. A
//! failed fetch is not retried here; the next `ensure_loaded` for that
//! id simply issues a new one.
//!
//! [`reset`](RequestCoalescer::reset) starts a new epoch: the store is
//! cleared and fetches begun before it may still finish, but their
//! results are no longer written to the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::entity::Entity;
use crate::error::FetchError;
use crate::ids::EntityId;
use crate::store::SharedStore;

/// Source of entities that are missing from the store.
#[async_trait]
pub trait EntityFetcher<T>: Send + Sync + 'static {
    async fn fetch(&self, id: &EntityId) -> Result<T, FetchError>;
}

type PendingFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;
type PendingMap<T> = Arc<Mutex<HashMap<EntityId, PendingEntry<T>>>>;

struct PendingEntry<T> {
    epoch: u64,
    fetch: PendingFetch<T>,
}

/// De-duplicates concurrent lookups of the same entity id.
pub struct RequestCoalescer<T: Entity> {
    store: SharedStore<T>,
    fetcher: Arc<dyn EntityFetcher<T>>,
    pending: PendingMap<T>,
    epoch: Arc<AtomicU64>,
}

impl<T: Entity> Clone for RequestCoalescer<T> {
    fn clone(&self) -> Self {
        RequestCoalescer {
            store: self.store.clone(),
            fetcher: Arc::clone(&self.fetcher),
            pending: Arc::clone(&self.pending),
            epoch: Arc::clone(&self.epoch),
        }
    }
}

impl<T: Entity> RequestCoalescer<T> {
    pub fn new(store: SharedStore<T>, fetcher: Arc<dyn EntityFetcher<T>>) -> Self {
        RequestCoalescer {
            store,
            fetcher,
            pending: Arc::new(Mutex::new(HashMap::new())),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &SharedStore<T> {
        &self.store
    }

    /// Make sure `id` is in the store, fetching it at most once.
    ///
    /// - already stored: returns the stored entity, no fetch
    /// - fetch in flight: waits on that fetch
    /// - otherwise: issues exactly one fetch
    pub async fn ensure_loaded(&self, id: &EntityId) -> Result<T, FetchError> {
        match self.begin(id)? {
            Lookup::Stored(entity) => Ok(entity),
            Lookup::Pending(fetch) => fetch.await,
        }
    }

    /// Start loading `id` in the background if it is neither stored nor
    /// already being fetched. Returns immediately.
    pub fn request(&self, id: &EntityId) {
        if let Err(e) = self.begin(id) {
            debug!("Skipping fetch for {:?}: {}", id, e);
        }
    }

    pub fn is_pending(&self, id: &EntityId) -> bool {
        lock(&self.pending).contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Clear the store and orphan every in-flight fetch. Orphaned fetches
    /// still answer their waiters but never write to the store.
    pub fn reset(&self) {
        {
            // Epoch bump and clear happen under the store lock, the same
            // lock a settling fetch holds while it checks the epoch.
            let mut store = self.store.write();
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            store.clear();
            debug!("Coalescer reset, epoch {}", epoch);
        }
        lock(&self.pending).clear();
    }

    fn begin(&self, id: &EntityId) -> Result<Lookup<T>, FetchError> {
        if id.is_empty() {
            return Err(FetchError::InvalidId);
        }

        // Store check and marker insert happen under the same lock so a
        // fetch settling in between cannot cause a second request.
        let mut pending = lock(&self.pending);

        if let Some(entity) = self.store.get(id) {
            return Ok(Lookup::Stored(entity));
        }

        if let Some(entry) = pending.get(id) {
            debug!("Joining in-flight fetch for {}", id);
            return Ok(Lookup::Pending(entry.fetch.clone()));
        }

        debug!("Fetching {}", id);
        let epoch = self.epoch();
        let fetch = self.spawn_fetch(id.clone(), epoch);
        pending.insert(
            id.clone(),
            PendingEntry {
                epoch,
                fetch: fetch.clone(),
            },
        );
        Ok(Lookup::Pending(fetch))
    }

    fn spawn_fetch(&self, id: EntityId, started: u64) -> PendingFetch<T> {
        let fetcher = Arc::clone(&self.fetcher);
        let store = self.store.clone();
        let pending = Arc::clone(&self.pending);
        let epoch = Arc::clone(&self.epoch);

        let task = tokio::spawn(async move {
            // Dropped after the store write, on success, failure or panic.
            let _marker = PendingMarker {
                pending,
                id: id.clone(),
                epoch: started,
            };

            let result = fetcher.fetch(&id).await;
            match &result {
                Ok(entity) => {
                    let mut store = store.write();
                    if epoch.load(Ordering::SeqCst) == started {
                        store.set(entity.clone());
                    } else {
                        debug!("Discarding {} fetched before a reset", id);
                    }
                }
                Err(e) => warn!("Fetch for {} failed: {}", id, e),
            }
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(FetchError::Aborted(e.to_string())),
            }
        }
        .boxed()
        .shared()
    }
}

/// Removes the pending entry for `id` when dropped, unless a reset
/// already replaced it with a newer fetch.
struct PendingMarker<T> {
    pending: PendingMap<T>,
    id: EntityId,
    epoch: u64,
}

impl<T> Drop for PendingMarker<T> {
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        if pending.get(&self.id).map_or(false, |entry| entry.epoch == self.epoch) {
            pending.remove(&self.id);
        }
    }
}

enum Lookup<T> {
    Stored(T),
    Pending(PendingFetch<T>),
}

fn lock<V>(m: &Mutex<V>) -> MutexGuard<'_, V> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
