//! Shared engine handle with a single debounce slot.
//!
//! Every debounced call replaces the pending one. The replaced call resolves
//! with [`TypeaheadError::Superseded`]; a call cancelled by `cancel_pending` or
//! `reset` resolves with [`TypeaheadError::Cancelled`]. No call is left unsettled.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;
use typeahead_core::{EngineConfig, SearchOptions, SearchResult, TypeaheadError, TypeaheadResult};

use crate::Engine;

struct Pending {
    ticket: u64,
    cancel: oneshot::Sender<TypeaheadError>,
}

struct Shared {
    engine: Mutex<Engine>,
    pending: Mutex<Option<Pending>>,
    tickets: AtomicU64,
}

/// Cloneable handle; clones share one engine and one debounce slot.
#[derive(Clone)]
pub struct Typeahead {
    shared: Arc<Shared>,
}

impl Typeahead {
    pub fn new(config: EngineConfig) -> TypeaheadResult<Self> {
        Ok(Self::from_engine(Engine::new(config)?))
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine: Mutex::new(engine),
                pending: Mutex::new(None),
                tickets: AtomicU64::new(0),
            }),
        }
    }

    /// Exclusive access for synchronous operations. Do not hold across an await.
    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        self.shared.engine.lock()
    }

    /// Schedule a search after the configured debounce delay.
    ///
    /// The slot is taken when this is called, not when the future is first polled,
    /// so call order decides which search survives.
    pub fn search_debounced(
        &self,
        query: impl Into<String>,
        options: SearchOptions,
    ) -> impl Future<Output = TypeaheadResult<SearchResult>> + Send + 'static {
        let query = query.into();
        let ticket = self.shared.tickets.fetch_add(1, Ordering::Relaxed);
        let (delay, epoch) = {
            let engine = self.shared.engine.lock();
            (engine.config().debounce_delay, engine.epoch())
        };
        let deadline = Instant::now() + delay;
        let (tx, mut rx) = oneshot::channel();
        {
            // Reasons are sent while the slot is locked, so the timer branch can read them
            let mut slot = self.shared.pending.lock();
            if let Some(prev) = slot.replace(Pending { ticket, cancel: tx }) {
                debug!(superseded = prev.ticket, by = ticket, "debounced search superseded");
                metrics::counter!("typeahead_debounce_superseded_total", 1);
                let _ = prev.cancel.send(TypeaheadError::Superseded);
            }
        }
        let shared = Arc::clone(&self.shared);
        async move {
            tokio::select! {
                reason = &mut rx => Err(reason.unwrap_or(TypeaheadError::Cancelled)),
                _ = tokio::time::sleep_until(deadline) => {
                    // Lock order: pending, then engine
                    let mut slot = shared.pending.lock();
                    if slot.as_ref().map(|p| p.ticket) != Some(ticket) {
                        return Err(rx.try_recv().unwrap_or(TypeaheadError::Superseded));
                    }
                    slot.take();
                    let mut engine = shared.engine.lock();
                    drop(slot);
                    if engine.epoch() != epoch {
                        debug!(ticket, "engine reset while debounced search was pending");
                        return Err(TypeaheadError::Cancelled);
                    }
                    Ok(engine.search(&query, &options))
                }
            }
        }
    }

    /// Cancel the pending debounced search, if any. Returns whether one was pending.
    pub fn cancel_pending(&self) -> bool {
        let mut slot = self.shared.pending.lock();
        match slot.take() {
            Some(p) => {
                debug!(ticket = p.ticket, "debounced search cancelled");
                let _ = p.cancel.send(TypeaheadError::Cancelled);
                true
            }
            None => false,
        }
    }

    /// Cancel the pending timer first, then clear all engine state.
    ///
    /// A bare `lock().reset()` is also safe: the engine epoch changes, so a
    /// search scheduled before it resolves with `Cancelled` instead of running.
    pub fn reset(&self) {
        let mut slot = self.shared.pending.lock();
        if let Some(p) = slot.take() {
            debug!(ticket = p.ticket, "debounced search cancelled by reset");
            let _ = p.cancel.send(TypeaheadError::Cancelled);
        }
        let mut engine = self.shared.engine.lock();
        drop(slot);
        engine.reset();
    }
}

impl std::fmt::Debug for Typeahead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeahead")
            .field("pending", &self.shared.pending.lock().as_ref().map(|p| p.ticket))
            .finish_non_exhaustive()
    }
}
