// Remote collection cache
// Holds the last-known server value per resource key. While a request for a
// key is outstanding every new reader joins it instead of issuing another.
// View-models never write values here; after a mutation they invalidate the
// keys it touched and the entry reloads, keeping its stale value meanwhile.

mod entry;
mod key;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Method;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::ClientError;
use crate::http::Transport;

pub use entry::{CacheEntry, Status, Subscription};
pub use key::ResourceKey;

/// Outcome of one fetch, shared by everyone who joined it.
pub type FetchResult = Result<Arc<Value>, Arc<ClientError>>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct InFlight {
    generation: u64,
    request: SharedFetch,
}

struct Slot {
    entry: watch::Sender<CacheEntry>,
    /// Newest generation whose result has been written to `entry`.
    applied: u64,
    in_flight: Option<InFlight>,
}

impl Slot {
    /// `floor` is the newest generation issued so far; anything at or below it
    /// belongs to an earlier slot for the same key.
    fn new(key: ResourceKey, floor: u64) -> Self {
        let (entry, _) = watch::channel(CacheEntry::loading(key));
        Self {
            entry,
            applied: floor,
            in_flight: None,
        }
    }

    fn needs_fetch(&self) -> bool {
        self.in_flight.is_none() && self.entry.borrow().status == Status::Loading
    }

    /// The stored outcome, when nothing is loading.
    fn settled_result(&self) -> Option<FetchResult> {
        let entry = self.entry.borrow();
        match (entry.status, &entry.value, &entry.error) {
            (Status::Ready, Some(value), _) => Some(Ok(Arc::clone(value))),
            (Status::Error, _, Some(error)) => Some(Err(Arc::clone(error))),
            _ => None,
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    slots: Mutex<HashMap<ResourceKey, Slot>>,
    /// Fetch generations are cache-wide so a recreated slot never reuses one.
    generations: AtomicU64,
}

/// Shared handle; clones all point at the same cache.
#[derive(Clone)]
pub struct RemoteCache {
    inner: Arc<Inner>,
}

impl RemoteCache {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                slots: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<ResourceKey, Slot>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Watch `key`, fetching it first if it is absent or invalidated.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, key: &ResourceKey) -> Subscription {
        let mut slots = self.slots();
        let slot = self.slot_for(&mut slots, key);
        if slot.needs_fetch() {
            self.start_fetch(key, slot);
        }
        Subscription::new(slot.entry.subscribe())
    }

    /// Resolve the value for `key`, joining the in-flight request if there is one.
    ///
    /// A stored error is returned as-is; nothing is retried until the key is
    /// invalidated.
    pub async fn load(&self, key: &ResourceKey) -> FetchResult {
        let request = {
            let mut slots = self.slots();
            let slot = self.slot_for(&mut slots, key);
            match &slot.in_flight {
                Some(in_flight) => in_flight.request.clone(),
                None => match slot.settled_result() {
                    Some(result) => return result,
                    None => self.fetch(key, slot),
                },
            }
        };
        request.await
    }

    /// Current entry for `key` without triggering a fetch.
    pub fn peek(&self, key: &ResourceKey) -> Option<CacheEntry> {
        self.slots().get(key).map(|slot| slot.entry.borrow().clone())
    }

    /// Mark `key` stale and schedule a refetch.
    ///
    /// Subscribers see the entry drop back to loading with its old value, then
    /// the fresh one. Keys nobody has asked for are left alone.
    pub fn invalidate(&self, key: &ResourceKey) {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(key) else {
            tracing::debug!(%key, "Invalidate on uncached key ignored");
            return;
        };
        slot.entry.send_modify(|entry| {
            entry.status = Status::Loading;
            entry.error = None;
        });
        tracing::debug!(%key, "Invalidated");
        self.start_fetch(key, slot);
    }

    /// Slot for `key`, creating it if needed.
    ///
    /// Creating a slot first evicts idle ones: no live subscription and no
    /// request in flight. A later reader of an evicted key fetches it again.
    fn slot_for<'a>(
        &self,
        slots: &'a mut HashMap<ResourceKey, Slot>,
        key: &ResourceKey,
    ) -> &'a mut Slot {
        if !slots.contains_key(key) {
            slots.retain(|key, slot| {
                let idle = slot.in_flight.is_none() && slot.entry.receiver_count() == 0;
                if idle {
                    tracing::debug!(%key, "Evicted idle entry");
                }
                !idle
            });
        }
        let floor = self.inner.generations.load(Ordering::Relaxed);
        slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone(), floor))
    }

    /// Start a refetch nobody is waiting on directly; subscribers see it land.
    fn start_fetch(&self, key: &ResourceKey, slot: &mut Slot) {
        let _ = self.fetch(key, slot);
    }

    /// Register a new request for `key` and spawn the task that drives it.
    fn fetch(&self, key: &ResourceKey, slot: &mut Slot) -> SharedFetch {
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;

        let transport = Arc::clone(&self.inner.transport);
        let path = key.path().to_string();
        let request = async move {
            transport
                .send(Method::GET, &path, None)
                .await
                .map(Arc::new)
                .map_err(Arc::new)
        }
        .boxed()
        .shared();

        slot.in_flight = Some(InFlight {
            generation,
            request: request.clone(),
        });
        tracing::debug!(%key, generation, "Fetch started");

        let cache = self.clone();
        let key = key.clone();
        let driver = request.clone();
        tokio::spawn(async move {
            let result = driver.await;
            cache.apply(&key, generation, result);
        });

        request
    }

    /// Write a finished fetch into its entry.
    ///
    /// Results from a generation older than one already applied are dropped, so
    /// a slow pre-mutation response cannot overwrite a fresher one.
    fn apply(&self, key: &ResourceKey, generation: u64, result: FetchResult) {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(key) else {
            return;
        };

        if slot
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation)
        {
            slot.in_flight = None;
        }

        if generation <= slot.applied {
            tracing::debug!(%key, generation, applied = slot.applied, "Superseded fetch discarded");
            return;
        }
        slot.applied = generation;

        // A newer request is still out; keep reporting loading until it lands
        let pending = slot.in_flight.is_some();
        slot.entry.send_modify(|entry| match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.error = None;
                entry.updated_at = Some(Utc::now());
                entry.status = if pending { Status::Loading } else { Status::Ready };
                tracing::debug!(%key, generation, "Fetch applied");
            }
            Err(error) => {
                tracing::warn!(%key, generation, "Fetch failed: {}", error);
                entry.error = Some(error);
                entry.status = if pending { Status::Loading } else { Status::Error };
            }
        });
    }
}
