use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::core::errors::{CofreError, CofreResult};

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<Vec<T>>, CofreError>>>;

/// Single-flight promise cache for one collection. A slot is absent (never
/// fetched), in-flight (one memoized fetch shared by every caller), or
/// resolved (a frozen snapshot kept until explicit invalidation). Failed
/// fetches stay memoized too; invalidation is the only way to retry.
pub struct FlightCache<T> {
    slot: Mutex<Slot<T>>,
}

struct Slot<T> {
    // Bumped on invalidate so a fetch that resolves late cannot install a
    // stale snapshot over a fresher one.
    epoch: u64,
    inflight: Option<SharedFetch<T>>,
    snapshot: Option<Arc<Vec<T>>>,
}

impl<T> Default for FlightCache<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(Slot {
                epoch: 0,
                inflight: None,
                snapshot: None,
            }),
        }
    }
}

impl<T: Send + Sync + 'static> FlightCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the in-flight or resolved result for this collection. The
    /// fetch closure is invoked only when no memoized fetch exists, so two
    /// concurrent `load` calls share one underlying request.
    pub async fn load<F, Fut>(&self, fetch: F) -> CofreResult<Arc<Vec<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CofreResult<Vec<T>>> + Send + 'static,
    {
        let (epoch, shared) = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match &slot.inflight {
                Some(shared) => (slot.epoch, shared.clone()),
                None => {
                    let fut = fetch();
                    let shared = async move { fut.await.map(Arc::new) }.boxed().shared();
                    slot.inflight = Some(shared.clone());
                    (slot.epoch, shared)
                }
            }
        };

        let result = shared.await;
        if let Ok(snapshot) = &result {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.epoch == epoch {
                slot.snapshot = Some(snapshot.clone());
            }
        }
        result
    }

    /// Last resolved snapshot, without suspending. Absent until the first
    /// load resolves or after invalidation.
    pub fn peek(&self) -> Option<Arc<Vec<T>>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Discards both the memoized fetch and the snapshot; the next `load`
    /// always issues a fresh request.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.epoch += 1;
        slot.inflight = None;
        slot.snapshot = None;
    }
}
