//! The host's message queue.
//!
//! A single global FIFO shared by every producer (UI-thread callbacks, the
//! timer thread) and the logical consumer. Events are delivered in exactly the
//! order they were pushed, regardless of kind.
//!
//! Waiting uses a condition variable bound to the same lock that guards the
//! events, and the emptiness check is repeated after every wake-up, so a push
//! that lands between the check and the wait can never be lost.
//!
//! # Example
//!
//! ```
//! use easel_core::{Event, EventQueue, WindowId};
//!
//! let queue = EventQueue::new();
//! let window = WindowId::next();
//!
//! queue.push(Event::close(window));
//! assert!(queue.try_pop().is_some());
//! assert!(queue.try_pop().is_none());
//!
//! // After shutdown an empty queue yields the no-event sentinel.
//! queue.shutdown();
//! assert!(queue.pop_blocking().is_none());
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::event::Event;
use crate::logging::targets;

struct QueueState {
    events: VecDeque<Event>,
    shut_down: bool,
}

/// Thread-safe FIFO of pending events with blocking and non-blocking consumption.
pub struct EventQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl EventQueue {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                events: VecDeque::new(),
                shut_down: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an event to the tail and wake one blocked consumer.
    ///
    /// Never blocks beyond the queue lock. Returns `false` if the queue has
    /// been shut down, in which case the event is dropped.
    pub fn push(&self, event: Event) -> bool {
        let mut state = self.state.lock();
        if state.shut_down {
            tracing::trace!(target: targets::QUEUE, kind = ?event.kind(), "push after shutdown dropped");
            return false;
        }
        tracing::trace!(target: targets::QUEUE, kind = ?event.kind(), pending = state.events.len() + 1, "event queued");
        state.events.push_back(event);
        drop(state);
        self.available.notify_one();
        true
    }

    /// Remove and return the head, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue has been shut down and fully drained.
    pub fn pop_blocking(&self) -> Option<Event> {
        let mut state = self.state.lock();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            if state.shut_down {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Like [`pop_blocking`](Self::pop_blocking), but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            if state.shut_down {
                return None;
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return state.events.pop_front();
            }
        }
    }

    /// Remove and return the head if present. Never waits.
    pub fn try_pop(&self) -> Option<Event> {
        self.state.lock().events.pop_front()
    }

    /// Stop accepting events and release every blocked consumer.
    ///
    /// Events already queued are still delivered.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if !state.shut_down {
            tracing::debug!(target: targets::QUEUE, pending = state.events.len(), "queue shut down");
        }
        state.shut_down = true;
        drop(state);
        self.available.notify_all();
    }

    /// Discard pending events and reopen the queue for a new session.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.events.clear();
        state.shut_down = false;
    }

    /// Whether [`shutdown`](Self::shutdown) has been called since the last reset.
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().events.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventQueue")
            .field("pending", &state.events.len())
            .field("shut_down", &state.shut_down)
            .finish()
    }
}
