//! Single-flight coordinator
//!
//! Collapses concurrent callers onto one in-flight computation. The first
//! caller starts the work; everyone arriving before it settles awaits the
//! same shared future and receives a clone of its output. The slot is
//! cleared by the flight itself as soon as it settles, success or failure,
//! so the next caller after that starts a fresh attempt.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type Flight<T> = Shared<BoxFuture<'static, T>>;

struct Slot<T> {
    /// Bumped for every new flight so a stale flight never clears a newer one
    generation: u64,
    inflight: Option<Flight<T>>,
}

/// One outstanding computation at a time, shared by all concurrent callers
pub struct SingleFlight<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                inflight: None,
            })),
        }
    }

    /// Run `f` unless a flight is already outstanding, in which case await
    /// that flight instead. `f` is only invoked by the caller that starts
    /// the flight.
    pub async fn run_exclusive<F, Fut>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = self.join_or_start(f);
        flight.await
    }

    /// Whether a flight is currently outstanding
    pub fn is_in_flight(&self) -> bool {
        lock(&self.slot).inflight.is_some()
    }

    fn join_or_start<F, Fut>(&self, f: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        if let Some(flight) = &slot.inflight {
            tracing::debug!("joining in-flight attempt");
            return flight.clone();
        }

        slot.generation += 1;
        let generation = slot.generation;
        let handle = Arc::clone(&self.slot);
        let work = f();

        let flight = async move {
            let output = work.await;
            {
                let mut slot = lock(&handle);
                if slot.generation == generation {
                    slot.inflight = None;
                }
            }
            output
        }
        .boxed()
        .shared();

        slot.inflight = Some(flight.clone());
        flight
    }
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    // The slot holds no invariant a panicking holder could break
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
