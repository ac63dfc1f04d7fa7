//! Native windows through winit, presented with softbuffer.
//!
//! winit allows a single event loop per process, so the loop lives on one
//! process-wide UI thread (`easel-ui`) that is started on first use and then
//! serves one session after another. Each session runs the loop with
//! `run_app_on_demand` until its window closes, which is what makes
//! re-initialization after a close possible.
//!
//! The loop is created with `with_any_thread`, which winit supports on
//! Windows, X11 and Wayland. Elsewhere [`WinitBackend::launch`] fails with
//! [`HostError::UnsupportedPlatform`].

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use easel_core::logging::{span_names, targets};
use easel_core::{
    ButtonAction, EventSink, HostConfig, HostError, KeyCode, Modifiers, MouseButton, Result,
};
use parking_lot::Mutex;
use softbuffer::{Context, Surface};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy, OwnedDisplayHandle};
use winit::keyboard::{KeyCode as NativeKey, ModifiersState, PhysicalKey};
use winit::platform::run_on_demand::EventLoopExtRunOnDemand;
use winit::window::{Window, WindowId as NativeWindowId};

use super::{Backend, Painter, Session, UiCommand, session_finished};

/// Two presses of the same button closer than this count as a double click.
const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);
/// Maximum pointer travel, in pixels on either axis, between double-click presses.
const DOUBLE_CLICK_DISTANCE: i32 = 4;
/// Wheel delta reported for one notch.
const WHEEL_DELTA_PER_LINE: f32 = 120.0;

/// A command tagged with the session it was posted to.
///
/// Commands still in flight when a session ends would otherwise be delivered
/// to the next session's window.
#[derive(Debug)]
struct Posted {
    session: u64,
    command: UiCommand,
}

struct SessionHandles {
    session: u64,
    proxy: EventLoopProxy<Posted>,
    /// Disconnects once the window is gone.
    done: Receiver<()>,
    /// Disconnects once the session's queue has been shut down.
    finished: Receiver<()>,
}

struct LaunchRequest {
    config: HostConfig,
    sink: EventSink,
    reply: Sender<Result<SessionHandles>>,
}

struct UiThread {
    launches: Sender<LaunchRequest>,
    thread_id: ThreadId,
    active: Arc<AtomicBool>,
}

static UI_THREAD: OnceLock<Result<UiThread>> = OnceLock::new();

fn ui_thread() -> Result<&'static UiThread> {
    UI_THREAD
        .get_or_init(start_ui_thread)
        .as_ref()
        .map_err(Clone::clone)
}

fn start_ui_thread() -> Result<UiThread> {
    let (launches, requests) = crossbeam_channel::unbounded();
    let (ready, started) = crossbeam_channel::bounded(1);
    let active = Arc::new(AtomicBool::new(false));

    let thread_active = active.clone();
    let handle = thread::Builder::new()
        .name("easel-ui".to_string())
        .spawn(move || {
            let mut event_loop = match build_event_loop() {
                Ok(event_loop) => event_loop,
                Err(e) => {
                    let _ = ready.send(Err(e));
                    return;
                }
            };
            let _ = ready.send(Ok(()));
            serve(&mut event_loop, &requests, &thread_active);
        })
        .map_err(|e| HostError::EventLoopCreation(e.to_string()))?;

    started
        .recv()
        .map_err(|_| HostError::EventLoopCreation("UI thread exited during startup".into()))??;

    tracing::info!(target: targets::BACKEND, "native UI thread started");
    Ok(UiThread {
        launches,
        thread_id: handle.thread().id(),
        active,
    })
}

#[cfg(any(
    target_os = "windows",
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
fn build_event_loop() -> Result<EventLoop<Posted>> {
    let mut builder = EventLoop::<Posted>::with_user_event();

    #[cfg(target_os = "windows")]
    winit::platform::windows::EventLoopBuilderExtWindows::with_any_thread(&mut builder, true);

    #[cfg(not(target_os = "windows"))]
    {
        winit::platform::x11::EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
        winit::platform::wayland::EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    builder
        .build()
        .map_err(|e| HostError::EventLoopCreation(e.to_string()))
}

#[cfg(not(any(
    target_os = "windows",
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
fn build_event_loop() -> Result<EventLoop<Posted>> {
    Err(HostError::UnsupportedPlatform)
}

/// Run one session per launch request until the process exits.
fn serve(event_loop: &mut EventLoop<Posted>, requests: &Receiver<LaunchRequest>, active: &AtomicBool) {
    let mut next_session = 0u64;

    for LaunchRequest { config, sink, reply } in requests.iter() {
        next_session += 1;
        let (alive, done) = crossbeam_channel::bounded::<()>(0);
        let (ended, finished) = crossbeam_channel::bounded::<()>(0);
        let mut end = SessionEnd {
            active,
            alive: Some(alive),
            sink: Some(sink.clone()),
            ended: Some(ended),
        };
        let handles = SessionHandles {
            session: next_session,
            proxy: event_loop.create_proxy(),
            done,
            finished,
        };
        let mut app = SessionApp::new(config, sink.clone(), handles, reply);

        {
            let _span = tracing::debug_span!(
                target: targets::BACKEND,
                span_names::SESSION,
                window_id = sink.window_id().as_u64()
            )
            .entered();
            if let Err(e) = event_loop.run_app_on_demand(&mut app) {
                tracing::warn!(target: targets::BACKEND, error = %e, "event loop failed");
                app.error.get_or_insert(HostError::EventLoopCreation(e.to_string()));
            }
        }

        let launch_failure = app
            .pending
            .take()
            .map(|(reply, _)| (reply, app.error.take()));
        drop(app);

        // The window never opened; the launching thread is still waiting and
        // the queue was never handed to a consumer.
        if let Some((reply, error)) = launch_failure {
            end.sink = None;
            drop(end);
            let error = error.unwrap_or_else(|| {
                HostError::WindowCreation("event loop exited before the window opened".into())
            });
            let _ = reply.send(Err(error));
        }
    }
}

/// Ends a native session when dropped, including when the UI thread unwinds.
///
/// The queue is shut down before `ended` disconnects, so a host joining the
/// session never sees a late shutdown after it has reset the queue.
struct SessionEnd<'a> {
    active: &'a AtomicBool,
    alive: Option<Sender<()>>,
    sink: Option<EventSink>,
    ended: Option<Sender<()>>,
}

impl Drop for SessionEnd<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!(target: targets::BACKEND, "native UI thread panicked");
        }
        self.active.store(false, Ordering::Release);
        self.alive.take();
        if let Some(sink) = self.sink.take() {
            sink.session_ended();
        }
        self.ended.take();
    }
}

/// The window and its presentation surface.
struct Presenter {
    surface: Surface<OwnedDisplayHandle, Arc<Window>>,
    window: Arc<Window>,
}

/// Per-session application state driven by the event loop.
struct SessionApp {
    session: u64,
    config: HostConfig,
    sink: EventSink,
    /// Launch reply and handles, held until the window is open.
    pending: Option<(Sender<Result<SessionHandles>>, SessionHandles)>,
    painter: Painter,
    presenter: Option<Presenter>,
    error: Option<HostError>,
    modifiers: Modifiers,
    cursor: (i32, i32),
    held: Option<MouseButton>,
    clicks: ClickCounter,
}

impl SessionApp {
    fn new(
        config: HostConfig,
        sink: EventSink,
        handles: SessionHandles,
        reply: Sender<Result<SessionHandles>>,
    ) -> Self {
        Self {
            session: handles.session,
            painter: Painter::new(&config),
            config,
            sink,
            pending: Some((reply, handles)),
            presenter: None,
            error: None,
            modifiers: Modifiers::NONE,
            cursor: (0, 0),
            held: None,
            clicks: ClickCounter::default(),
        }
    }

    fn open_window(&self, event_loop: &ActiveEventLoop) -> Result<Presenter> {
        let (width, height) = (self.config.width, self.config.height);
        let mut attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(self.config.resizable);

        if self.config.centered
            && let Some(monitor) = event_loop.primary_monitor()
        {
            let screen = monitor.size();
            let origin = monitor.position();
            let x = origin.x + (screen.width as i32 - width as i32).max(0) / 2;
            let y = origin.y + (screen.height as i32 - height as i32).max(0) / 2;
            attributes = attributes.with_position(PhysicalPosition::new(x, y));
        }

        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|e| HostError::WindowCreation(e.to_string()))?,
        );
        let context = Context::new(event_loop.owned_display_handle()).map_err(surface_error)?;
        let surface = Surface::new(&context, window.clone()).map_err(surface_error)?;

        Ok(Presenter { surface, window })
    }

    /// Copy the canvas to the window surface.
    fn present(&mut self) -> Result<()> {
        let Some(presenter) = self.presenter.as_mut() else {
            return Ok(());
        };
        let canvas = self.painter.canvas();
        let (Some(width), Some(height)) =
            (NonZeroU32::new(canvas.width()), NonZeroU32::new(canvas.height()))
        else {
            return Ok(());
        };

        presenter
            .surface
            .resize(width, height)
            .map_err(surface_error)?;
        let mut buffer = presenter.surface.buffer_mut().map_err(surface_error)?;
        buffer.copy_from_slice(canvas.pixels());
        presenter.window.pre_present_notify();
        buffer.present().map_err(surface_error)
    }

    /// Tear the window down and leave the event loop.
    fn shut(&mut self, event_loop: &ActiveEventLoop) {
        self.presenter = None;
        event_loop.exit();
    }

    fn on_mouse_input(&mut self, state: ElementState, button: MouseButton) {
        let (x, y) = self.cursor;
        match state {
            ElementState::Pressed => {
                let clicks = self.clicks.press(button, self.cursor, Instant::now());
                self.held = Some(button);
                self.sink
                    .mouse_button(ButtonAction::Pressed, button, x, y, clicks);
            }
            ElementState::Released => {
                if self.held == Some(button) {
                    self.held = None;
                }
                self.sink
                    .mouse_button(ButtonAction::Released, button, x, y, self.clicks.count());
            }
        }
    }
}

impl ApplicationHandler<Posted> for SessionApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.presenter.is_some() || self.pending.is_none() {
            return;
        }

        match self.open_window(event_loop) {
            Ok(presenter) => {
                presenter.window.request_redraw();
                self.presenter = Some(presenter);
                if let Some((reply, handles)) = self.pending.take() {
                    let _ = reply.send(Ok(handles));
                }
                tracing::debug!(target: targets::BACKEND, title = %self.config.title, "window opened");
            }
            Err(e) => {
                tracing::warn!(target: targets::BACKEND, error = %e, "window creation failed");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: NativeWindowId, event: WindowEvent) {
        if self.presenter.as_ref().map(|p| p.window.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.sink.close_requested();
                self.shut(event_loop);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.present() {
                    tracing::warn!(target: targets::BACKEND, error = %e, "present failed");
                }
            }
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    self.painter.resize(size.width, size.height);
                    if let Some(presenter) = &self.presenter {
                        presenter.window.request_redraw();
                    }
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = translate_modifiers(modifiers.state());
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let key = match event.physical_key {
                    PhysicalKey::Code(code) => translate_key(code),
                    PhysicalKey::Unidentified(_) => KeyCode::Unidentified,
                };
                match event.state {
                    ElementState::Pressed => self.sink.key_down(key, self.modifiers),
                    ElementState::Released => self.sink.key_up(key, self.modifiers),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as i32, position.y as i32);
                self.sink
                    .mouse_move(self.cursor.0, self.cursor.1, self.held);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.on_mouse_input(state, translate_button(button));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, lines) => (lines * WHEEL_DELTA_PER_LINE).round() as i32,
                    MouseScrollDelta::PixelDelta(pixels) => pixels.y.round() as i32,
                };
                if delta != 0 {
                    self.sink.wheel(self.cursor.0, self.cursor.1, delta);
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, posted: Posted) {
        if posted.session != self.session {
            tracing::trace!(target: targets::BACKEND, session = posted.session, "dropping stale command");
            return;
        }

        match posted.command {
            UiCommand::Draw { op, reply } => {
                self.painter.apply(&op);
                let _ = reply.send(self.present());
            }
            UiCommand::Close => {
                self.sink.close_requested();
                self.shut(event_loop);
            }
        }
    }
}

fn surface_error(err: softbuffer::SoftBufferError) -> HostError {
    HostError::Surface(err.to_string())
}

fn translate_modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        alt: state.alt_key(),
        control: state.control_key(),
        shift: state.shift_key(),
    }
}

fn translate_button(button: winit::event::MouseButton) -> MouseButton {
    use winit::event::MouseButton as Native;
    match button {
        Native::Left => MouseButton::Left,
        Native::Right => MouseButton::Right,
        Native::Middle => MouseButton::Middle,
        Native::Back => MouseButton::Back,
        Native::Forward => MouseButton::Forward,
        Native::Other(index) => MouseButton::Other(index),
    }
}

/// Map a physical key to an easel key code.
fn translate_key(code: NativeKey) -> KeyCode {
    const LETTERS: [NativeKey; 26] = [
        NativeKey::KeyA,
        NativeKey::KeyB,
        NativeKey::KeyC,
        NativeKey::KeyD,
        NativeKey::KeyE,
        NativeKey::KeyF,
        NativeKey::KeyG,
        NativeKey::KeyH,
        NativeKey::KeyI,
        NativeKey::KeyJ,
        NativeKey::KeyK,
        NativeKey::KeyL,
        NativeKey::KeyM,
        NativeKey::KeyN,
        NativeKey::KeyO,
        NativeKey::KeyP,
        NativeKey::KeyQ,
        NativeKey::KeyR,
        NativeKey::KeyS,
        NativeKey::KeyT,
        NativeKey::KeyU,
        NativeKey::KeyV,
        NativeKey::KeyW,
        NativeKey::KeyX,
        NativeKey::KeyY,
        NativeKey::KeyZ,
    ];
    const DIGITS: [(NativeKey, NativeKey); 10] = [
        (NativeKey::Digit0, NativeKey::Numpad0),
        (NativeKey::Digit1, NativeKey::Numpad1),
        (NativeKey::Digit2, NativeKey::Numpad2),
        (NativeKey::Digit3, NativeKey::Numpad3),
        (NativeKey::Digit4, NativeKey::Numpad4),
        (NativeKey::Digit5, NativeKey::Numpad5),
        (NativeKey::Digit6, NativeKey::Numpad6),
        (NativeKey::Digit7, NativeKey::Numpad7),
        (NativeKey::Digit8, NativeKey::Numpad8),
        (NativeKey::Digit9, NativeKey::Numpad9),
    ];
    const FUNCTION: [NativeKey; 12] = [
        NativeKey::F1,
        NativeKey::F2,
        NativeKey::F3,
        NativeKey::F4,
        NativeKey::F5,
        NativeKey::F6,
        NativeKey::F7,
        NativeKey::F8,
        NativeKey::F9,
        NativeKey::F10,
        NativeKey::F11,
        NativeKey::F12,
    ];

    if let Some(i) = LETTERS.iter().position(|&k| k == code) {
        return KeyCode::Char((b'A' + i as u8) as char);
    }
    if let Some(i) = DIGITS.iter().position(|&(d, n)| d == code || n == code) {
        return KeyCode::Char((b'0' + i as u8) as char);
    }
    if let Some(i) = FUNCTION.iter().position(|&k| k == code) {
        return KeyCode::Function(i as u8 + 1);
    }

    match code {
        NativeKey::Escape => KeyCode::Escape,
        NativeKey::Space => KeyCode::Space,
        NativeKey::Enter | NativeKey::NumpadEnter => KeyCode::Enter,
        NativeKey::Tab => KeyCode::Tab,
        NativeKey::Backspace => KeyCode::Backspace,
        NativeKey::Delete => KeyCode::Delete,
        NativeKey::Insert => KeyCode::Insert,
        NativeKey::Home => KeyCode::Home,
        NativeKey::End => KeyCode::End,
        NativeKey::PageUp => KeyCode::PageUp,
        NativeKey::PageDown => KeyCode::PageDown,
        NativeKey::ArrowLeft => KeyCode::Left,
        NativeKey::ArrowRight => KeyCode::Right,
        NativeKey::ArrowUp => KeyCode::Up,
        NativeKey::ArrowDown => KeyCode::Down,
        NativeKey::ShiftLeft | NativeKey::ShiftRight => KeyCode::Shift,
        NativeKey::ControlLeft | NativeKey::ControlRight => KeyCode::Control,
        NativeKey::AltLeft | NativeKey::AltRight => KeyCode::Alt,
        _ => KeyCode::Unidentified,
    }
}

/// Counts consecutive presses of one button to detect double clicks.
#[derive(Debug, Default)]
struct ClickCounter {
    last: Option<(MouseButton, (i32, i32), Instant)>,
    count: u32,
}

impl ClickCounter {
    /// Record a press and return its click count (1 or 2).
    fn press(&mut self, button: MouseButton, position: (i32, i32), now: Instant) -> u32 {
        let repeated = matches!(
            self.last,
            Some((last_button, (lx, ly), at))
                if last_button == button
                    && now.saturating_duration_since(at) <= DOUBLE_CLICK_TIME
                    && (lx - position.0).abs() <= DOUBLE_CLICK_DISTANCE
                    && (ly - position.1).abs() <= DOUBLE_CLICK_DISTANCE
        );
        self.count = if repeated && self.count == 1 { 2 } else { 1 };
        self.last = Some((button, position, now));
        self.count
    }

    /// Click count of the latest press.
    fn count(&self) -> u32 {
        self.count
    }
}

/// The native winit backend.
///
/// All instances share the process-wide UI thread, so at most one native
/// session can be live at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinitBackend;

impl WinitBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for WinitBackend {
    fn launch(&self, config: &HostConfig, sink: EventSink) -> Result<Box<dyn Session>> {
        let ui = ui_thread()?;
        if ui.active.swap(true, Ordering::AcqRel) {
            return Err(HostError::AlreadyInitialized);
        }

        let (reply, launched) = crossbeam_channel::bounded(1);
        let request = LaunchRequest {
            config: config.clone(),
            sink,
            reply,
        };
        if ui.launches.send(request).is_err() {
            ui.active.store(false, Ordering::Release);
            return Err(HostError::EventLoopCreation("UI thread is gone".into()));
        }

        match launched.recv() {
            Ok(Ok(handles)) => Ok(Box::new(WinitSession {
                session: handles.session,
                proxy: Mutex::new(handles.proxy),
                done: handles.done,
                finished: handles.finished,
                ui_thread: ui.thread_id,
            })),
            // The UI thread already released the active flag.
            Ok(Err(e)) => Err(e),
            Err(_) => {
                ui.active.store(false, Ordering::Release);
                Err(HostError::EventLoopCreation("UI thread exited".into()))
            }
        }
    }
}

struct WinitSession {
    session: u64,
    proxy: Mutex<EventLoopProxy<Posted>>,
    done: Receiver<()>,
    finished: Receiver<()>,
    ui_thread: ThreadId,
}

impl Session for WinitSession {
    fn post(&self, command: UiCommand) -> Result<()> {
        if session_finished(&self.done) {
            return Err(HostError::NotInitialized);
        }
        let posted = Posted {
            session: self.session,
            command,
        };
        self.proxy
            .lock()
            .send_event(posted)
            .map_err(|_| HostError::NotInitialized)
    }

    fn done(&self) -> &Receiver<()> {
        &self.done
    }

    fn ui_thread(&self) -> ThreadId {
        self.ui_thread
    }

    fn join(self: Box<Self>) {
        // Disconnects after the session's queue is shut down; nothing is ever sent.
        let _ = self.finished.recv();
    }
}
