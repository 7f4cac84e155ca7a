use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use super::events::ServerEvent;

/// Bounded per-session delivery queue between the hub and the session's
/// socket-writer task. Single consumer; producers are whichever tasks invoke
/// hub operations.
///
/// When the bound is reached the oldest queued droppable event makes room;
/// if nothing queued is droppable, a critical event is enqueued past the
/// bound (presence/control must not be lost) and a droppable one is
/// discarded.
pub struct OutboundQueue {
    events: Mutex<VecDeque<ServerEvent>>,
    notify: Notify,
    capacity: usize,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn push(&self, event: ServerEvent) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        {
            let mut events = self.events.lock();
            if events.len() >= self.capacity {
                if let Some(pos) = events.iter().position(|e| !e.is_critical()) {
                    events.remove(pos);
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(capacity = self.capacity, "Outbound queue full, dropped oldest event");
                } else if !event.is_critical() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(capacity = self.capacity, "Outbound queue full of critical events, dropped incoming");
                    return;
                }
            }
            events.push_back(event);
        }

        self.notify.notify_one();
    }

    /// Next event, waiting if the queue is empty. `None` once the queue is
    /// closed and drained.
    pub async fn pop(&self) -> Option<ServerEvent> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register for wakeups before re-checking state, otherwise a
            // push/close landing between the check and the await is lost.
            notified.as_mut().enable();

            if let Some(event) = self.events.lock().pop_front() {
                return Some(event);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }

            notified.await;
        }
    }

    /// Next event if one is queued, without waiting.
    pub fn try_pop(&self) -> Option<ServerEvent> {
        self.events.lock().pop_front()
    }

    /// Stops accepting events and wakes the consumer. Already-queued events
    /// are still drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
