//! The window host: a caller-owned handle over one UI session at a time.
//!
//! A [`Host`] moves through three states:
//!
//! ```text
//! Uninitialized --init--> Running --close / native close--> Closed
//!                            ^                                 |
//!                            +-------------init----------------+
//! ```
//!
//! Drawing calls are marshalled to the backend's UI thread and block until
//! the pixels have been presented. Native input and timer ticks are delivered
//! through one FIFO event queue that the consumer drains with
//! [`get_message`](Host::get_message) or [`peek_message`](Host::peek_message).
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use easel::{Color, EventKind, Host, HostConfig, KeyCode, TimerId};
//!
//! let mut host = Host::new();
//! host.init(HostConfig::new("Demo", 800, 600))?;
//! host.set_timer(TimerId(1), Duration::from_millis(500))?;
//!
//! while let Some(event) = host.get_message()? {
//!     match event.kind() {
//!         EventKind::Close => break,
//!         EventKind::KeyDown if event.is_key_down(KeyCode::Escape) => break,
//!         EventKind::Timer => host.clear(Color::LIGHT_BLUE)?,
//!         _ => {}
//!     }
//! }
//! host.close()?;
//! # Ok::<(), easel::HostError>(())
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use easel_core::logging::{span_names, targets};
use easel_core::{
    Color, Event, EventQueue, EventSink, HostConfig, HostError, PerfSpan, Result, TimerId,
    TimerRegistry, WindowId,
};

use crate::backend::{Backend, DrawOp, Session, UiCommand, await_reply};

/// Observable lifecycle state of a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// `init` has never succeeded.
    Uninitialized,
    /// A window is open.
    Running,
    /// The window was closed, by `close` or natively. `init` may start over.
    Closed,
}

struct ActiveSession {
    window_id: WindowId,
    session: Box<dyn Session>,
    timers: TimerRegistry,
}

enum Lifecycle {
    Uninitialized,
    Running(ActiveSession),
    Closed,
}

/// Owner of the single host window and its event queue.
pub struct Host {
    backend: Arc<dyn Backend>,
    queue: Arc<EventQueue>,
    lifecycle: Lifecycle,
}

impl Host {
    /// Create a host backed by a native OS window.
    #[cfg(feature = "native")]
    pub fn new() -> Self {
        Self::with_backend(crate::backend::native::WinitBackend::new())
    }

    /// Create a host that opens its window through `backend`.
    pub fn with_backend(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            queue: Arc::new(EventQueue::new()),
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    /// Open the window and start a new session.
    ///
    /// Fails with [`HostError::AlreadyInitialized`] while a session is running.
    /// From `Closed` a fresh session starts: new window id, empty queue, no
    /// timers.
    pub fn init(&mut self, config: HostConfig) -> Result<()> {
        if self.state() == HostState::Running {
            return Err(HostError::AlreadyInitialized);
        }
        // A natively closed session still holds its timer thread.
        self.teardown();
        config.validate()?;

        self.queue.reset();
        let window_id = WindowId::next();
        let sink = EventSink::new(self.queue.clone(), window_id);
        // Started first so a failure leaves no window behind.
        let timers = TimerRegistry::new(self.queue.clone(), window_id)?;
        let session = self.backend.launch(&config, sink)?;

        tracing::info!(
            target: targets::HOST,
            window_id = window_id.as_u64(),
            title = %config.title,
            width = config.width,
            height = config.height,
            "host initialized"
        );
        self.lifecycle = Lifecycle::Running(ActiveSession {
            window_id,
            session,
            timers,
        });
        Ok(())
    }

    /// The current lifecycle state.
    ///
    /// A session whose window was closed natively reports `Closed` even
    /// before [`close`](Self::close) has been called.
    pub fn state(&self) -> HostState {
        match &self.lifecycle {
            Lifecycle::Uninitialized => HostState::Uninitialized,
            Lifecycle::Running(active) if active.session.is_alive() => HostState::Running,
            Lifecycle::Running(_) | Lifecycle::Closed => HostState::Closed,
        }
    }

    /// Whether a window is currently open.
    pub fn is_running(&self) -> bool {
        self.state() == HostState::Running
    }

    /// Id of the session's window, until the host is closed.
    pub fn window_id(&self) -> Option<WindowId> {
        match &self.lifecycle {
            Lifecycle::Running(active) => Some(active.window_id),
            _ => None,
        }
    }

    fn live(&self) -> Result<&ActiveSession> {
        match &self.lifecycle {
            Lifecycle::Running(active) if active.session.is_alive() => Ok(active),
            _ => Err(HostError::NotInitialized),
        }
    }

    fn dispatch(&self, op: DrawOp) -> Result<()> {
        let active = self.live()?;
        if thread::current().id() == active.session.ui_thread() {
            return Err(HostError::WrongThread);
        }

        let _perf = PerfSpan::new(span_names::DRAW);
        tracing::trace!(target: targets::HOST, op = op.name(), "dispatch draw");
        let (command, outcome) = UiCommand::draw(op);
        active.session.post(command)?;
        await_reply(outcome, active.session.done())
    }

    /// Fill the whole canvas with `color`.
    pub fn clear(&self, color: Color) -> Result<()> {
        self.dispatch(DrawOp::Clear(color))
    }

    /// Outline a rectangle with lines `thickness` pixels wide.
    pub fn draw_rect(&self, x: i32, y: i32, width: i32, height: i32, color: Color, thickness: u32) -> Result<()> {
        self.dispatch(DrawOp::Rect {
            x,
            y,
            width,
            height,
            color,
            thickness,
        })
    }

    /// Fill a rectangle.
    pub fn fill_rect(&self, x: i32, y: i32, width: i32, height: i32, color: Color) -> Result<()> {
        self.dispatch(DrawOp::FillRect {
            x,
            y,
            width,
            height,
            color,
        })
    }

    /// Outline a circle centred at `(cx, cy)`.
    pub fn draw_circle(&self, cx: i32, cy: i32, radius: i32, color: Color, thickness: u32) -> Result<()> {
        self.dispatch(DrawOp::Circle {
            cx,
            cy,
            radius,
            color,
            thickness,
        })
    }

    /// Fill a circle centred at `(cx, cy)`.
    pub fn fill_circle(&self, cx: i32, cy: i32, radius: i32, color: Color) -> Result<()> {
        self.dispatch(DrawOp::FillCircle {
            cx,
            cy,
            radius,
            color,
        })
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn draw_text(&self, text: &str, x: i32, y: i32, font_size: f32, color: Color) -> Result<()> {
        self.dispatch(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            size: font_size,
            color,
        })
    }

    /// Start a periodic timer, replacing any timer with the same id.
    pub fn set_timer(&self, timer_id: TimerId, interval: Duration) -> Result<()> {
        self.live()?.timers.register(timer_id, interval);
        Ok(())
    }

    /// Stop a timer. Returns `false` if no timer had that id.
    ///
    /// Allowed after a native close, until the host is closed.
    pub fn kill_timer(&self, timer_id: TimerId) -> Result<bool> {
        Ok(self.session()?.timers.cancel(timer_id))
    }

    /// Stop every timer.
    pub fn kill_all_timers(&self) -> Result<()> {
        self.session()?.timers.cancel_all();
        Ok(())
    }

    fn session(&self) -> Result<&ActiveSession> {
        match &self.lifecycle {
            Lifecycle::Running(active) => Ok(active),
            _ => Err(HostError::NotInitialized),
        }
    }

    fn ensure_started(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Uninitialized => Err(HostError::NotInitialized),
            _ => Ok(()),
        }
    }

    /// Wait for the next event.
    ///
    /// Returns `Ok(None)` once the session has ended and every remaining event
    /// has been consumed.
    pub fn get_message(&self) -> Result<Option<Event>> {
        self.ensure_started()?;
        Ok(self.queue.pop_blocking())
    }

    /// Take the next event if one is queued, without waiting.
    pub fn peek_message(&self) -> Result<Option<Event>> {
        self.ensure_started()?;
        Ok(self.queue.try_pop())
    }

    /// Wait up to `timeout` for the next event.
    pub fn get_message_timeout(&self, timeout: Duration) -> Result<Option<Event>> {
        self.ensure_started()?;
        Ok(self.queue.pop_timeout(timeout))
    }

    /// Number of events waiting to be consumed.
    pub fn pending_messages(&self) -> usize {
        self.queue.len()
    }

    /// Close the window and end the session.
    ///
    /// Stops all timers, waits for the UI thread to finish, and releases any
    /// consumer blocked in [`get_message`](Self::get_message) once the queue
    /// is drained. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Uninitialized => Err(HostError::NotInitialized),
            Lifecycle::Closed => Ok(()),
            Lifecycle::Running(_) => {
                self.teardown();
                Ok(())
            }
        }
    }

    fn teardown(&mut self) {
        let Lifecycle::Running(active) = std::mem::replace(&mut self.lifecycle, Lifecycle::Closed) else {
            return;
        };
        let ActiveSession {
            window_id,
            session,
            timers,
        } = active;

        timers.shutdown();
        if session.is_alive() {
            // Fails only if the session ended in the meantime.
            let _ = session.post(UiCommand::Close);
        }
        session.join();
        self.queue.shutdown();

        tracing::info!(target: targets::HOST, window_id = window_id.as_u64(), "host closed");
    }
}

#[cfg(feature = "native")]
impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("state", &self.state())
            .field("window_id", &self.window_id())
            .field("pending", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use easel_core::{EventKind, KeyCode, Modifiers};

    use super::*;
    use crate::backend::headless::HeadlessBackend;

    fn config() -> HostConfig {
        HostConfig::new("host test", 64, 48)
    }

    #[test]
    fn test_operations_before_init_fail() {
        let host = Host::with_backend(HeadlessBackend::new());
        assert_eq!(host.state(), HostState::Uninitialized);
        assert_eq!(host.clear(Color::RED), Err(HostError::NotInitialized));
        assert_eq!(
            host.set_timer(TimerId(1), Duration::from_millis(10)),
            Err(HostError::NotInitialized)
        );
        assert_eq!(host.kill_timer(TimerId(1)), Err(HostError::NotInitialized));
        assert_eq!(host.get_message().unwrap_err(), HostError::NotInitialized);
        assert_eq!(host.peek_message().unwrap_err(), HostError::NotInitialized);
        assert!(host.window_id().is_none());
    }

    #[test]
    fn test_close_before_init_fails() {
        let mut host = Host::with_backend(HeadlessBackend::new());
        assert_eq!(host.close(), Err(HostError::NotInitialized));
    }

    #[test]
    fn test_double_init_rejected() {
        let mut host = Host::with_backend(HeadlessBackend::new());
        host.init(config()).unwrap();
        assert_eq!(host.init(config()), Err(HostError::AlreadyInitialized));
        assert!(host.is_running());
        host.close().unwrap();
    }

    #[test]
    fn test_invalid_config_keeps_state() {
        let mut host = Host::with_backend(HeadlessBackend::new());
        let err = host.init(HostConfig::new("bad", 0, 10)).unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
        assert_eq!(host.state(), HostState::Uninitialized);
    }

    #[test]
    fn test_shared_backend_is_exclusive() {
        let backend = HeadlessBackend::new();
        let mut first = Host::with_backend(backend.clone());
        let mut second = Host::with_backend(backend.clone());

        first.init(config()).unwrap();
        assert_eq!(second.init(config()), Err(HostError::AlreadyInitialized));

        first.close().unwrap();
        second.init(config()).unwrap();
        second.close().unwrap();
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut host = Host::with_backend(HeadlessBackend::new());
        host.init(config()).unwrap();
        host.close().unwrap();
        host.close().unwrap();

        assert_eq!(host.state(), HostState::Closed);
        assert_eq!(host.fill_rect(0, 0, 1, 1, Color::RED), Err(HostError::NotInitialized));

        // The close event stays consumable, then the sentinel follows.
        assert_eq!(host.get_message().unwrap().unwrap().kind(), EventKind::Close);
        assert!(host.get_message().unwrap().is_none());
        assert!(host.peek_message().unwrap().is_none());
    }

    #[test]
    fn test_draw_is_visible_when_call_returns() {
        let backend = HeadlessBackend::new();
        let mut host = Host::with_backend(backend.clone());
        host.init(config().with_background(Color::BLACK)).unwrap();
        let native = backend.controller().unwrap();

        host.fill_rect(10, 10, 5, 5, Color::RED).unwrap();
        host.draw_rect(30, 10, 10, 10, Color::GREEN, 1).unwrap();
        host.fill_circle(20, 35, 4, Color::BLUE).unwrap();
        host.draw_circle(50, 35, 6, Color::YELLOW, 2).unwrap();

        let canvas = native.snapshot().unwrap();
        assert_eq!(canvas.pixel(12, 12), Some(Color::RED));
        assert_eq!(canvas.pixel(30, 15), Some(Color::GREEN));
        assert_eq!(canvas.pixel(35, 15), Some(Color::BLACK));
        assert_eq!(canvas.pixel(20, 35), Some(Color::BLUE));
        assert_eq!(canvas.pixel(56, 35), Some(Color::YELLOW));
        assert_eq!(canvas.pixel(50, 35), Some(Color::BLACK));

        host.clear(Color::WHITE).unwrap();
        assert!(
            native
                .snapshot()
                .unwrap()
                .pixels()
                .iter()
                .all(|&p| p == Color::WHITE.to_u32())
        );
        host.close().unwrap();
    }

    #[test]
    fn test_native_close_reports_closed() {
        let backend = HeadlessBackend::new();
        let mut host = Host::with_backend(backend.clone());
        host.init(config()).unwrap();
        host.set_timer(TimerId(3), Duration::from_millis(20)).unwrap();

        backend.controller().unwrap().request_close();

        let mut saw_close = false;
        while let Some(event) = host.get_message().unwrap() {
            saw_close |= event.kind() == EventKind::Close;
        }
        assert!(saw_close);
        assert_eq!(host.state(), HostState::Closed);
        assert_eq!(host.clear(Color::RED), Err(HostError::NotInitialized));

        // Timers of a natively closed session can still be killed.
        assert_eq!(host.kill_timer(TimerId(3)), Ok(true));
        host.close().unwrap();
    }

    #[test]
    fn test_reinit_after_native_close() {
        let backend = HeadlessBackend::new();
        let mut host = Host::with_backend(backend.clone());
        host.init(config()).unwrap();
        let first = host.window_id().unwrap();

        backend.controller().unwrap().request_close();
        let start = Instant::now();
        while host.is_running() {
            assert!(start.elapsed() < Duration::from_secs(2));
            thread::sleep(Duration::from_millis(5));
        }

        host.init(config()).unwrap();
        let second = host.window_id().unwrap();
        assert_ne!(first, second);
        assert!(host.peek_message().unwrap().is_none());
        host.close().unwrap();
    }

    #[test]
    fn test_events_carry_window_id() {
        let backend = HeadlessBackend::new();
        let mut host = Host::with_backend(backend.clone());
        host.init(config()).unwrap();

        backend
            .controller()
            .unwrap()
            .key_down(KeyCode::Char('W'), Modifiers::NONE);
        let event = host
            .get_message_timeout(Duration::from_secs(2))
            .unwrap()
            .unwrap();
        assert!(event.is_key_down(KeyCode::Char('W')));
        assert_eq!(Some(event.window_id()), host.window_id());
        host.close().unwrap();
    }
}
