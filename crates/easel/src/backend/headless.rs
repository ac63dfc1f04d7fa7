//! A backend that runs the UI thread without any OS window.
//!
//! The headless backend executes draw commands against an in-memory
//! [`Canvas`] and lets a [`HeadlessController`] inject the callbacks a native
//! window would produce (keys, mouse, wheel, close). Injected callbacks are
//! executed on the UI thread, in order with draw commands, exactly as a native
//! binding would run them.
//!
//! # Example
//!
//! ```
//! use easel::backend::headless::HeadlessBackend;
//! use easel::{Color, EventKind, Host, HostConfig};
//!
//! let backend = HeadlessBackend::new();
//! let mut host = Host::with_backend(backend.clone());
//! host.init(HostConfig::new("test", 64, 64)).unwrap();
//!
//! host.fill_rect(0, 0, 8, 8, Color::RED).unwrap();
//! let native = backend.controller().unwrap();
//! assert_eq!(native.snapshot().unwrap().pixel(3, 3), Some(Color::RED));
//!
//! native.request_close();
//! let event = host.get_message().unwrap().unwrap();
//! assert_eq!(event.kind(), EventKind::Close);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender};
use easel_core::logging::{span_names, targets};
use easel_core::{
    ButtonAction, EventSink, HostConfig, HostError, KeyCode, Modifiers, MouseButton, Result,
};
use parking_lot::Mutex;

use super::{Backend, Painter, Session, UiCommand};
use crate::canvas::Canvas;

/// Native callbacks a controller can inject.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeInput {
    KeyDown(KeyCode, Modifiers),
    KeyUp(KeyCode, Modifiers),
    MouseMove {
        x: i32,
        y: i32,
        button: Option<MouseButton>,
    },
    MouseButton {
        action: ButtonAction,
        button: MouseButton,
        x: i32,
        y: i32,
        clicks: u32,
    },
    Wheel {
        x: i32,
        y: i32,
        delta: i32,
    },
    /// The user clicked the window's close button.
    CloseRequested,
}

enum Message {
    Command(UiCommand),
    Native(NativeInput),
    Snapshot(Sender<Canvas>),
}

#[derive(Default)]
struct Inner {
    active: AtomicBool,
    current: Mutex<Option<Sender<Message>>>,
}

/// A windowless backend for tests and CI.
///
/// Each instance allows one live session at a time; clones share that
/// session. Independent instances do not interfere with each other.
#[derive(Clone, Default)]
pub struct HeadlessBackend {
    inner: Arc<Inner>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a session is currently running.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// A controller for the current session, or `None` if no session is running.
    pub fn controller(&self) -> Option<HeadlessController> {
        self.inner
            .current
            .lock()
            .clone()
            .map(|sender| HeadlessController { sender })
    }
}

impl std::fmt::Debug for HeadlessBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessBackend")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Backend for HeadlessBackend {
    fn launch(&self, config: &HostConfig, sink: EventSink) -> Result<Box<dyn Session>> {
        if self.inner.active.swap(true, Ordering::AcqRel) {
            return Err(HostError::AlreadyInitialized);
        }

        let (sender, receiver) = crossbeam_channel::unbounded();
        let (alive, done) = crossbeam_channel::bounded::<()>(0);
        *self.inner.current.lock() = Some(sender.clone());

        let painter = Painter::new(config);
        let inner = self.inner.clone();
        let spawned = thread::Builder::new()
            .name("easel-ui-headless".to_string())
            .spawn(move || {
                let end = SessionEnd {
                    inner,
                    alive: Some(alive),
                    sink,
                };
                run_session(painter, receiver, &end.sink);
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                self.inner.current.lock().take();
                self.inner.active.store(false, Ordering::Release);
                return Err(HostError::WindowCreation(e.to_string()));
            }
        };

        tracing::debug!(target: targets::BACKEND, title = %config.title, "headless session started");
        Ok(Box::new(HeadlessSession {
            sender,
            done,
            ui_thread: thread.thread().id(),
            thread,
        }))
    }
}

/// Releases the backend and ends the session when the UI thread leaves
/// `run_session`, by returning or by unwinding.
struct SessionEnd {
    inner: Arc<Inner>,
    alive: Option<Sender<()>>,
    sink: EventSink,
}

impl Drop for SessionEnd {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!(target: targets::BACKEND, "headless UI thread panicked");
        }
        self.inner.current.lock().take();
        self.inner.active.store(false, Ordering::Release);
        self.alive.take();
        self.sink.session_ended();
    }
}

fn run_session(mut painter: Painter, receiver: Receiver<Message>, sink: &EventSink) {
    let _span = tracing::debug_span!(
        target: targets::BACKEND,
        span_names::SESSION,
        window_id = sink.window_id().as_u64()
    )
    .entered();

    for message in receiver.iter() {
        match message {
            Message::Command(UiCommand::Draw { op, reply }) => {
                painter.apply(&op);
                let _ = reply.send(Ok(()));
            }
            Message::Command(UiCommand::Close) => {
                sink.close_requested();
                break;
            }
            Message::Native(input) => {
                if dispatch_native(input, sink) {
                    break;
                }
            }
            Message::Snapshot(reply) => {
                let _ = reply.send(painter.canvas().clone());
            }
        }
    }
}

/// Run one native callback. Returns `true` if the window closed.
fn dispatch_native(input: NativeInput, sink: &EventSink) -> bool {
    match input {
        NativeInput::KeyDown(key, modifiers) => sink.key_down(key, modifiers),
        NativeInput::KeyUp(key, modifiers) => sink.key_up(key, modifiers),
        NativeInput::MouseMove { x, y, button } => sink.mouse_move(x, y, button),
        NativeInput::MouseButton {
            action,
            button,
            x,
            y,
            clicks,
        } => sink.mouse_button(action, button, x, y, clicks),
        NativeInput::Wheel { x, y, delta } => sink.wheel(x, y, delta),
        NativeInput::CloseRequested => {
            sink.close_requested();
            return true;
        }
    }
    false
}

struct HeadlessSession {
    sender: Sender<Message>,
    done: Receiver<()>,
    ui_thread: ThreadId,
    thread: JoinHandle<()>,
}

impl Session for HeadlessSession {
    fn post(&self, command: UiCommand) -> Result<()> {
        self.sender
            .send(Message::Command(command))
            .map_err(|_| HostError::NotInitialized)
    }

    fn done(&self) -> &Receiver<()> {
        &self.done
    }

    fn ui_thread(&self) -> ThreadId {
        self.ui_thread
    }

    fn join(self: Box<Self>) {
        let HeadlessSession { sender, thread, .. } = *self;
        drop(sender);
        if thread.join().is_err() {
            tracing::warn!(target: targets::BACKEND, "headless UI thread panicked");
        }
    }
}

/// Injects native callbacks into a running headless session.
///
/// Every method returns `false` once the session has ended.
#[derive(Clone)]
pub struct HeadlessController {
    sender: Sender<Message>,
}

impl HeadlessController {
    /// Deliver one native callback to the UI thread.
    pub fn inject(&self, input: NativeInput) -> bool {
        self.sender.send(Message::Native(input)).is_ok()
    }

    pub fn key_down(&self, key: KeyCode, modifiers: Modifiers) -> bool {
        self.inject(NativeInput::KeyDown(key, modifiers))
    }

    pub fn key_up(&self, key: KeyCode, modifiers: Modifiers) -> bool {
        self.inject(NativeInput::KeyUp(key, modifiers))
    }

    pub fn mouse_move(&self, x: i32, y: i32) -> bool {
        self.inject(NativeInput::MouseMove { x, y, button: None })
    }

    /// A single click: press, then release.
    pub fn click(&self, button: MouseButton, x: i32, y: i32) -> bool {
        self.mouse_button(ButtonAction::Pressed, button, x, y, 1)
            && self.mouse_button(ButtonAction::Released, button, x, y, 1)
    }

    pub fn mouse_button(&self, action: ButtonAction, button: MouseButton, x: i32, y: i32, clicks: u32) -> bool {
        self.inject(NativeInput::MouseButton {
            action,
            button,
            x,
            y,
            clicks,
        })
    }

    pub fn wheel(&self, x: i32, y: i32, delta: i32) -> bool {
        self.inject(NativeInput::Wheel { x, y, delta })
    }

    /// Simulate the user closing the window.
    pub fn request_close(&self) -> bool {
        self.inject(NativeInput::CloseRequested)
    }

    /// A copy of the canvas after every previously posted command has run.
    pub fn snapshot(&self) -> Option<Canvas> {
        let (reply, canvas) = crossbeam_channel::bounded(1);
        self.sender.send(Message::Snapshot(reply)).ok()?;
        canvas.recv().ok()
    }
}

impl std::fmt::Debug for HeadlessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessController").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use easel_core::{Color, EventKind, EventQueue, WindowId};

    use super::*;
    use crate::backend::{DrawOp, await_reply, session_finished};

    fn launch(backend: &HeadlessBackend) -> (Arc<EventQueue>, Box<dyn Session>) {
        let queue = Arc::new(EventQueue::new());
        let sink = EventSink::new(queue.clone(), WindowId::next());
        let session = backend
            .launch(&HostConfig::new("headless", 16, 16), sink)
            .unwrap();
        (queue, session)
    }

    #[test]
    fn test_single_session_per_backend() {
        let backend = HeadlessBackend::new();
        let (_queue, session) = launch(&backend);
        assert!(backend.is_active());

        let queue = Arc::new(EventQueue::new());
        let second = backend.launch(
            &HostConfig::default(),
            EventSink::new(queue, WindowId::next()),
        );
        assert!(matches!(second, Err(HostError::AlreadyInitialized)));

        session.post(UiCommand::Close).unwrap();
        session.join();
        assert!(!backend.is_active());
        assert!(backend.controller().is_none());

        // Relaunch after the first session ended.
        let (_queue, session) = launch(&backend);
        session.post(UiCommand::Close).unwrap();
        session.join();
    }

    #[test]
    fn test_draw_runs_on_ui_thread() {
        let backend = HeadlessBackend::new();
        let (_queue, session) = launch(&backend);

        let (command, outcome) = UiCommand::draw(DrawOp::Clear(Color::GREEN));
        session.post(command).unwrap();
        assert_eq!(await_reply(outcome, session.done()), Ok(()));
        assert_ne!(session.ui_thread(), thread::current().id());

        let canvas = backend.controller().unwrap().snapshot().unwrap();
        assert_eq!(canvas.pixel(0, 0), Some(Color::GREEN));

        session.post(UiCommand::Close).unwrap();
        session.join();
    }

    #[test]
    fn test_native_close_ends_session() {
        let backend = HeadlessBackend::new();
        let (queue, session) = launch(&backend);
        let native = backend.controller().unwrap();

        assert!(native.key_down(KeyCode::Char('Q'), Modifiers::NONE));
        assert!(native.request_close());

        assert_eq!(queue.pop_blocking().unwrap().kind(), EventKind::KeyDown);
        assert_eq!(queue.pop_blocking().unwrap().kind(), EventKind::Close);
        assert!(queue.pop_blocking().is_none());

        session.join();
        assert!(!native.wheel(0, 0, 120));
        assert!(native.snapshot().is_none());
    }

    #[test]
    fn test_programmatic_close_emits_single_close_event() {
        let backend = HeadlessBackend::new();
        let (queue, session) = launch(&backend);

        assert!(session.is_alive());
        session.post(UiCommand::Close).unwrap();
        session.join();

        assert_eq!(queue.try_pop().unwrap().kind(), EventKind::Close);
        assert!(queue.try_pop().is_none());
        assert!(queue.is_shut_down());
    }

    #[test]
    fn test_ui_thread_panic_still_ends_session() {
        let backend = HeadlessBackend::new();
        backend.inner.active.store(true, Ordering::Release);
        let queue = Arc::new(EventQueue::new());
        let sink = EventSink::new(queue.clone(), WindowId::next());
        let (alive, done) = crossbeam_channel::bounded::<()>(0);

        let inner = backend.inner.clone();
        let crashed = thread::spawn(move || {
            let _end = SessionEnd {
                inner,
                alive: Some(alive),
                sink,
            };
            panic!("UI thread died mid-draw");
        })
        .join();

        assert!(crashed.is_err());
        assert!(session_finished(&done));
        assert!(!backend.is_active());
        // A blocked consumer is released with the sentinel.
        assert!(queue.pop_blocking().is_none());
    }
}
