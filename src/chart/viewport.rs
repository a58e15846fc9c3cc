use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::trace;

/// Width of the visible area, with per-listener resize notifications.
#[derive(Debug, Clone)]
pub struct Viewport {
    inner: Arc<Mutex<ViewportInner>>,
}

#[derive(Debug)]
struct ViewportInner {
    width: u32,
    next_id: u64,
    listeners: HashMap<u64, mpsc::UnboundedSender<u32>>,
}

/// Registration of one resize listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ResizeSubscription {
    id: u64,
    viewport: Viewport,
}

impl Viewport {
    pub fn new(width: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ViewportInner {
                width,
                next_id: 0,
                listeners: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn width(&self) -> u32 {
        self.lock().width
    }

    /// Records a new width and notifies listeners. Same-width resizes are dropped.
    pub fn resize(&self, width: u32) {
        let mut inner = self.lock();
        if inner.width == width {
            return;
        }
        inner.width = width;
        inner.listeners.retain(|_, tx| tx.send(width).is_ok());
        trace!(width, listeners = inner.listeners.len(), "viewport resized");
    }

    pub fn subscribe(&self) -> (ResizeSubscription, mpsc::UnboundedReceiver<u32>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, tx);

        let subscription = ResizeSubscription {
            id,
            viewport: self.clone(),
        };
        (subscription, rx)
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        self.viewport.lock().listeners.remove(&self.id);
    }
}
