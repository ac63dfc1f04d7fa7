//! Periodic timers that feed the event queue.
//!
//! A [`TimerRegistry`] owns one background thread that sleeps until the
//! earliest pending tick and then pushes a `Timer` event for each timer that
//! is due. Ticks are enqueued while the registry lock is held, so once
//! [`cancel`](TimerRegistry::cancel) returns no further tick for that id can
//! reach the queue. Events that were already queued stay queued.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use slotmap::{SlotMap, new_key_type};

use crate::error::{HostError, Result};
use crate::event::{Event, TimerId, WindowId};
use crate::logging::targets;
use crate::queue::EventQueue;

/// Shortest interval a timer may tick at.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

new_key_type! {
    /// Key of one registration. Replacing a timer id yields a new key, which
    /// lets the tick heap discard entries of the old registration.
    struct RegistrationKey;
}

#[derive(Debug)]
struct Registration {
    timer_id: TimerId,
    interval: Duration,
}

/// An entry in the tick queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TickEntry {
    key: RegistrationKey,
    fire_time: Instant,
}

impl PartialEq for TickEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TickEntry {}

impl PartialOrd for TickEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TickEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.fire_time.cmp(&self.fire_time)
    }
}

struct RegistryState {
    registrations: SlotMap<RegistrationKey, Registration>,
    by_id: HashMap<TimerId, RegistrationKey>,
    ticks: BinaryHeap<TickEntry>,
    running: bool,
}

impl RegistryState {
    fn remove(&mut self, timer_id: TimerId) -> bool {
        match self.by_id.remove(&timer_id) {
            Some(key) => {
                self.registrations.remove(key);
                true
            }
            None => false,
        }
    }
}

struct Shared {
    state: Mutex<RegistryState>,
    wake: Condvar,
    queue: Arc<EventQueue>,
    window_id: WindowId,
}

/// Named periodic timers that inject `Timer` events into an [`EventQueue`].
pub struct TimerRegistry {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TimerRegistry {
    /// Create a registry whose ticks are pushed to `queue`, stamped with `window_id`.
    ///
    /// Spawns the registry's timer thread. Fails with
    /// [`HostError::TimerThread`] if the thread cannot be started.
    pub fn new(queue: Arc<EventQueue>, window_id: WindowId) -> Result<Self> {
        Self::start(queue, window_id, |worker| {
            thread::Builder::new()
                .name("easel-timers".to_string())
                .spawn(move || run_timer_thread(worker))
        })
    }

    fn start(
        queue: Arc<EventQueue>,
        window_id: WindowId,
        spawn: impl FnOnce(Arc<Shared>) -> io::Result<JoinHandle<()>>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(RegistryState {
                registrations: SlotMap::with_key(),
                by_id: HashMap::new(),
                ticks: BinaryHeap::new(),
                running: true,
            }),
            wake: Condvar::new(),
            queue,
            window_id,
        });

        let thread = spawn(shared.clone()).map_err(|e| {
            tracing::error!(target: targets::TIMER, error = %e, "failed to spawn timer thread");
            HostError::TimerThread(e.to_string())
        })?;

        Ok(Self {
            shared,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Start a periodic timer, replacing any timer already registered under `timer_id`.
    ///
    /// The first tick fires one `interval` from now.
    pub fn register(&self, timer_id: TimerId, interval: Duration) {
        let interval = interval.max(MIN_INTERVAL);
        let mut state = self.shared.state.lock();
        if state.remove(timer_id) {
            tracing::debug!(target: targets::TIMER, ?timer_id, "replacing existing timer");
        }

        let key = state.registrations.insert(Registration { timer_id, interval });
        state.by_id.insert(timer_id, key);
        state.ticks.push(TickEntry {
            key,
            fire_time: Instant::now() + interval,
        });
        drop(state);

        tracing::debug!(target: targets::TIMER, ?timer_id, interval_ms = interval.as_millis() as u64, "timer registered");
        self.shared.wake.notify_one();
    }

    /// Stop future ticks of `timer_id`.
    ///
    /// Returns `false` if no such timer was registered; that is not an error.
    pub fn cancel(&self, timer_id: TimerId) -> bool {
        let removed = self.shared.state.lock().remove(timer_id);
        if removed {
            tracing::debug!(target: targets::TIMER, ?timer_id, "timer cancelled");
        } else {
            tracing::trace!(target: targets::TIMER, ?timer_id, "cancel of unknown timer ignored");
        }
        removed
    }

    /// Stop every registered timer.
    pub fn cancel_all(&self) {
        let mut state = self.shared.state.lock();
        let count = state.by_id.len();
        state.by_id.clear();
        state.registrations.clear();
        state.ticks.clear();
        drop(state);
        if count > 0 {
            tracing::debug!(target: targets::TIMER, count, "all timers cancelled");
        }
    }

    /// Whether `timer_id` is currently registered.
    pub fn is_active(&self, timer_id: TimerId) -> bool {
        self.shared.state.lock().by_id.contains_key(&timer_id)
    }

    /// Number of registered timers.
    pub fn active_count(&self) -> usize {
        self.shared.state.lock().by_id.len()
    }

    /// Cancel all timers and stop the timer thread.
    ///
    /// Called automatically on drop.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.running = false;
            state.by_id.clear();
            state.registrations.clear();
            state.ticks.clear();
        }
        self.shared.wake.notify_all();

        if let Some(handle) = self.thread.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("window_id", &self.shared.window_id)
            .field("active", &self.active_count())
            .finish()
    }
}

fn run_timer_thread(shared: Arc<Shared>) {
    let mut state = shared.state.lock();
    while state.running {
        let now = Instant::now();

        while let Some(entry) = state.ticks.peek().copied() {
            if entry.fire_time > now {
                break;
            }
            state.ticks.pop();

            // Cancelled or replaced registrations leave stale entries behind.
            let Some(registration) = state.registrations.get(entry.key) else {
                continue;
            };
            let timer_id = registration.timer_id;
            let interval = registration.interval;

            tracing::trace!(target: targets::TIMER, ?timer_id, "timer fired");
            shared.queue.push(Event::timer(shared.window_id, timer_id));

            // Keep a fixed rate, but do not burst to catch up after a stall.
            let mut next = entry.fire_time + interval;
            if next <= now {
                next = now + interval;
            }
            state.ticks.push(TickEntry {
                key: entry.key,
                fire_time: next,
            });
        }

        match state.ticks.peek().map(|entry| entry.fire_time) {
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            }
            None => shared.wake.wait(&mut state),
        }
    }
    tracing::trace!(target: targets::TIMER, "timer thread exiting");
}
