//! Single-flight de-duplication of fetches.
//!
//! One mutex-guarded slot holds the in-flight future. The first caller that
//! finds the slot empty spawns the fetch as its own task and installs a
//! `Shared` handle to it; every caller arriving while it is pending clones that
//! handle and receives the same result. The task runs to completion even when
//! every waiter goes away, and empties the slot itself when it ends. A
//! generation id keeps a finished task from removing a newer flight.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinError;

type FlightFuture<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;
type Slot<T, E> = Arc<Mutex<Option<Flight<T, E>>>>;

struct Flight<T, E> {
    id: u64,
    future: FlightFuture<T, E>,
}

pub struct SingleFlight<T, E> {
    slot: Slot<T, E>,
    generation: AtomicU64,
}

impl<T, E> Default for SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Join the pending flight, or start one with `start` if none is pending.
    ///
    /// `start` is only invoked when this caller becomes the leader. Must be
    /// called from within a tokio runtime.
    pub async fn run<F, Fut>(&self, start: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.join_or_start(start).await
    }

    pub fn in_flight(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn join_or_start<F, Fut>(&self, start: F) -> FlightFuture<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = slot.as_ref() {
            return flight.future.clone();
        }

        let id = self.generation.fetch_add(1, Ordering::SeqCst);
        let fetch = start();
        let release = ReleaseOnDrop { slot: self.slot.clone(), id };
        let handle = tokio::spawn(async move {
            // released on completion and on panic
            let _release = release;
            fetch.await
        });
        let future = async move { handle.await.unwrap_or_else(|e| Err(E::from(e))) }
            .boxed()
            .shared();

        *slot = Some(Flight { id, future: future.clone() });
        future
    }
}

/// Empties the slot when the flight task ends, if it still holds flight `id`.
struct ReleaseOnDrop<T, E> {
    slot: Slot<T, E>,
    id: u64,
}

impl<T, E> Drop for ReleaseOnDrop<T, E> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|flight| flight.id == self.id) {
            *slot = None;
        }
    }
}
