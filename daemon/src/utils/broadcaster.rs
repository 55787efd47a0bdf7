use log::{debug, error, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use warden_protocol::management::console::ConsoleEntry;
use warden_protocol::v1::event::{EventPacket, Events, UpdateNotice};

/// Serialized event packet, shared between every observer queue.
pub type Payload = Arc<str>;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Receiving end handed to one attached observer.
pub struct Observer {
    id: usize,
    rx: mpsc::Receiver<Payload>,
}

impl Observer {
    pub fn id(&self) -> usize {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }
}

/// Fan-out of daemon events to every attached observer.
///
/// Each observer owns a bounded queue; a slow observer loses events instead of
/// stalling the publisher or the other observers.
pub struct Broadcaster {
    next_id: AtomicUsize,
    capacity: usize,
    observers: scc::HashMap<usize, mpsc::Sender<Payload>, ahash::RandomState>,
    update_notice: RwLock<Option<UpdateNotice>>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            next_id: AtomicUsize::new(0),
            capacity: capacity.max(2),
            observers: scc::HashMap::default(),
            update_notice: RwLock::new(None),
        }
    }

    fn encode(event: Events) -> Option<Payload> {
        match serde_json::to_string(&EventPacket::new(event)) {
            Ok(text) => Some(Payload::from(text)),
            Err(err) => {
                error!("could not serialize event: {}", err);
                None
            }
        }
    }

    /// Registers a new observer. Its queue starts with the console replay and,
    /// when one is known, the pending update notice.
    pub fn attach(&self, replay: Vec<ConsoleEntry>) -> Observer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);

        if let Some(payload) = Self::encode(Events::ConsoleHistory { entries: replay }) {
            let _ = tx.try_send(payload);
        }
        let notice = self
            .update_notice
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(payload) = notice.and_then(|n| Self::encode(Events::UpdateAvailable(n))) {
            let _ = tx.try_send(payload);
        }

        let _ = self.observers.insert(id, tx);
        debug!("observer {} attached", id);
        Observer { id, rx }
    }

    pub fn detach(&self, id: usize) {
        if self.observers.remove(&id).is_some() {
            debug!("observer {} detached", id);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn publish(&self, event: Events) {
        let Some(payload) = Self::encode(event) else {
            return;
        };

        let mut closed = vec![];
        self.observers.scan(|id, tx| match tx.try_send(payload.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("observer {} is lagging, dropping one event", id);
            }
            Err(TrySendError::Closed(_)) => closed.push(*id),
        });

        for id in closed {
            self.detach(id);
        }
    }

    /// Remembers the notice for observers attaching later and tells the current ones.
    pub fn announce_update(&self, notice: UpdateNotice) {
        *self
            .update_notice
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(notice.clone());
        self.publish(Events::UpdateAvailable(notice));
    }
}
