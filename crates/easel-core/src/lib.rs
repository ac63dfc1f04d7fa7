//! Core systems for easel.
//!
//! This crate provides the windowing-independent half of easel's message loop:
//!
//! - **Events**: immutable key, mouse, timer and close records
//! - **Event Queue**: a thread-safe FIFO with blocking and non-blocking consumption
//! - **Timer Registry**: named periodic timers that feed the queue
//! - **Event Sink**: the callback surface native bindings use to produce events
//! - **Configuration**: window options, loadable from TOML
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use easel_core::{EventKind, EventQueue, EventSink, TimerId, TimerRegistry, WindowId};
//!
//! let queue = Arc::new(EventQueue::new());
//! let window = WindowId::next();
//!
//! // Native callbacks go through a sink...
//! let sink = EventSink::new(queue.clone(), window);
//! sink.close_requested();
//!
//! // ...and timers push their ticks into the same queue.
//! let timers = TimerRegistry::new(queue.clone(), window)?;
//! timers.register(TimerId(1), Duration::from_millis(10));
//!
//! assert_eq!(queue.pop_blocking().map(|e| e.kind()), Some(EventKind::Close));
//! assert_eq!(queue.pop_blocking().map(|e| e.kind()), Some(EventKind::Timer));
//! timers.cancel_all();
//! # Ok::<(), easel_core::HostError>(())
//! ```

mod color;
mod config;
mod error;
mod event;
pub mod logging;
mod queue;
pub mod sink;
mod timer;

pub use color::Color;
pub use config::HostConfig;
pub use error::{HostError, Result};
pub use event::{
    Event, EventKind, EventPayload, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent,
    TimerEvent, TimerId, WindowId, timestamp_now,
};
pub use logging::PerfSpan;
pub use queue::EventQueue;
pub use sink::{ButtonAction, EventSink};
pub use timer::TimerRegistry;
