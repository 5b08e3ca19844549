//! Lifecycle notifications and the observers that receive them.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{EngineConfig, Item};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EngineEvent {
    ItemAdded(Item),
    ItemRemoved(Item),
    ItemUpdated(Item),
    CacheHit { query: String },
    SearchCompleted { query: String, total: usize, elapsed: Duration },
    CacheCleared,
    ConfigUpdated(EngineConfig),
    ResetCompleted,
}

/// Observer invoked synchronously for every event.
///
/// Listeners run while the engine is borrowed. Under a shared `Typeahead`
/// handle that means its engine mutex is held, and the mutex is not
/// reentrant: a listener must not call back into the handle (`lock`,
/// `reset`, `search_debounced`) or it deadlocks. Forward work through a
/// channel instead, e.g. `Engine::subscribe_channel`.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

impl<F> EventListener for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: &EngineEvent) { self(event) }
}

/// Fan-out to trait-object listeners and channel subscribers.
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<Arc<dyn EventListener>>,
    channels: Vec<mpsc::UnboundedSender<EngineEvent>>,
}

impl Notifier {
    pub fn new() -> Self { Self::default() }

    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn subscribe_channel(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.push(tx);
        rx
    }

    pub fn listener_count(&self) -> usize { self.listeners.len() + self.channels.len() }

    pub fn emit(&mut self, event: EngineEvent) {
        for l in self.listeners.iter() {
            l.on_event(&event);
        }
        if self.channels.is_empty() { return; }
        // Drop subscribers whose receiver has gone away
        self.channels.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .field("channels", &self.channels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn closures_are_listeners() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut n = Notifier::new();
        let s = Arc::clone(&seen);
        n.subscribe(Arc::new(move |_: &EngineEvent| { s.fetch_add(1, Ordering::SeqCst); }));
        n.emit(EngineEvent::CacheCleared);
        n.emit(EngineEvent::ResetCompleted);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn closed_channels_are_pruned() {
        let mut n = Notifier::new();
        let mut rx = n.subscribe_channel();
        let dropped = n.subscribe_channel();
        drop(dropped);
        n.emit(EngineEvent::CacheCleared);
        assert_eq!(n.listener_count(), 1);
        assert_eq!(rx.try_recv().ok(), Some(EngineEvent::CacheCleared));
    }
}
