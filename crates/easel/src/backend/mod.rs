//! Native UI backends.
//!
//! A [`Backend`] owns the platform side of the host: it opens the window on a
//! dedicated UI thread, forwards native input to an [`EventSink`], and executes
//! [`UiCommand`]s posted by the host. Two backends ship with easel:
//!
//! - [`WinitBackend`](native::WinitBackend) (feature `native`): a real OS window
//!   presented through a CPU surface.
//! - [`HeadlessBackend`](headless::HeadlessBackend): an in-memory canvas plus a
//!   controller that simulates native input. Used by tests and CI.
//!
//! # Threading
//!
//! Every command is executed on the backend's UI thread in the order it was
//! posted. A draw command carries a reply channel; the posting thread blocks
//! until the UI thread has applied the operation and answered, or until the
//! session ends.

pub mod headless;
#[cfg(feature = "native")]
pub mod native;

use std::thread::ThreadId;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use easel_core::{Color, EventSink, HostConfig, HostError, Result};

use crate::canvas::Canvas;
use crate::text::TextRenderer;

/// A drawing operation executed on the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Fill the whole canvas.
    Clear(Color),
    /// Outline a rectangle.
    Rect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Color,
        thickness: u32,
    },
    /// Fill a rectangle.
    FillRect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Color,
    },
    /// Outline a circle.
    Circle {
        cx: i32,
        cy: i32,
        radius: i32,
        color: Color,
        thickness: u32,
    },
    /// Fill a circle.
    FillCircle {
        cx: i32,
        cy: i32,
        radius: i32,
        color: Color,
    },
    /// Draw a line of text with its top-left corner at `(x, y)`.
    Text {
        text: String,
        x: i32,
        y: i32,
        size: f32,
        color: Color,
    },
}

impl DrawOp {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            DrawOp::Clear(_) => "clear",
            DrawOp::Rect { .. } => "rect",
            DrawOp::FillRect { .. } => "fill_rect",
            DrawOp::Circle { .. } => "circle",
            DrawOp::FillCircle { .. } => "fill_circle",
            DrawOp::Text { .. } => "text",
        }
    }
}

/// A request posted from a consumer thread to the UI thread.
#[derive(Debug)]
pub enum UiCommand {
    /// Apply `op`, present the canvas and send the outcome on `reply`.
    Draw {
        op: DrawOp,
        reply: Sender<Result<()>>,
    },
    /// Close the window and end the UI session.
    Close,
}

impl UiCommand {
    /// Build a draw command and the receiver its outcome arrives on.
    pub fn draw(op: DrawOp) -> (Self, Receiver<Result<()>>) {
        let (reply, outcome) = crossbeam_channel::bounded(1);
        (UiCommand::Draw { op, reply }, outcome)
    }
}

/// A platform binding able to open the host window.
pub trait Backend: Send + Sync {
    /// Open a window described by `config` and start delivering native input
    /// to `sink`.
    ///
    /// Returns [`HostError::AlreadyInitialized`] if this backend already has a
    /// live session.
    fn launch(&self, config: &HostConfig, sink: EventSink) -> Result<Box<dyn Session>>;
}

/// A live UI session created by [`Backend::launch`].
pub trait Session: Send + Sync {
    /// Deliver `command` to the UI thread and wake it.
    ///
    /// Fails with [`HostError::NotInitialized`] once the session has ended.
    fn post(&self, command: UiCommand) -> Result<()>;

    /// A receiver that disconnects when the UI session ends. Nothing is ever
    /// sent on it.
    fn done(&self) -> &Receiver<()>;

    /// The thread running this session's UI loop.
    fn ui_thread(&self) -> ThreadId;

    /// Block until the UI session has ended.
    fn join(self: Box<Self>);

    /// Whether the UI session is still running.
    fn is_alive(&self) -> bool {
        !session_finished(self.done())
    }
}

/// Whether the session owning `done` has ended.
pub(crate) fn session_finished(done: &Receiver<()>) -> bool {
    matches!(done.try_recv(), Err(TryRecvError::Disconnected))
}

/// Wait for a draw outcome, giving up if the session ends first.
pub(crate) fn await_reply(outcome: Receiver<Result<()>>, done: &Receiver<()>) -> Result<()> {
    crossbeam_channel::select! {
        recv(outcome) -> reply => reply.unwrap_or(Err(HostError::NotInitialized)),
        // The reply may have raced the shutdown.
        recv(done) -> _ => outcome.try_recv().unwrap_or(Err(HostError::NotInitialized)),
    }
}

/// UI-thread drawing state shared by the backends.
#[derive(Debug)]
pub(crate) struct Painter {
    canvas: Canvas,
    text: TextRenderer,
    background: Color,
}

impl Painter {
    pub(crate) fn new(config: &HostConfig) -> Self {
        Self {
            canvas: Canvas::new(config.width, config.height, config.background),
            text: TextRenderer::new(),
            background: config.background,
        }
    }

    pub(crate) fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    #[cfg_attr(not(feature = "native"), allow(dead_code))]
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.canvas.resize(width, height, self.background);
    }

    pub(crate) fn apply(&mut self, op: &DrawOp) {
        tracing::trace!(target: easel_core::logging::targets::BACKEND, op = op.name(), "draw");
        match *op {
            DrawOp::Clear(color) => self.canvas.clear(color),
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                color,
                thickness,
            } => self.canvas.draw_rect(x, y, width, height, color, thickness),
            DrawOp::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => self.canvas.fill_rect(x, y, width, height, color),
            DrawOp::Circle {
                cx,
                cy,
                radius,
                color,
                thickness,
            } => self.canvas.draw_circle(cx, cy, radius, color, thickness),
            DrawOp::FillCircle {
                cx,
                cy,
                radius,
                color,
            } => self.canvas.fill_circle(cx, cy, radius, color),
            DrawOp::Text {
                ref text,
                x,
                y,
                size,
                color,
            } => self.text.draw(&mut self.canvas, text, x, y, size, color),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_await_reply_delivers_outcome() {
        let (_alive, done) = crossbeam_channel::bounded::<()>(0);
        let (command, outcome) = UiCommand::draw(DrawOp::Clear(Color::RED));
        let UiCommand::Draw { reply, .. } = command else {
            panic!("expected a draw command");
        };
        reply.send(Err(HostError::Surface("lost".into()))).unwrap();

        assert_eq!(
            await_reply(outcome, &done),
            Err(HostError::Surface("lost".into()))
        );
    }

    #[test]
    fn test_await_reply_gives_up_when_session_ends() {
        let (alive, done) = crossbeam_channel::bounded::<()>(0);
        let (command, outcome) = UiCommand::draw(DrawOp::Clear(Color::RED));

        let ender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            drop(alive);
            // The command is never executed, but stays alive past the shutdown.
            command
        });

        assert!(!session_finished(&done));
        assert_eq!(await_reply(outcome, &done), Err(HostError::NotInitialized));
        assert!(session_finished(&done));
        drop(ender.join().unwrap());
    }

    #[test]
    fn test_painter_applies_ops() {
        let config = HostConfig::new("paint", 20, 20).with_background(Color::BLACK);
        let mut painter = Painter::new(&config);

        painter.apply(&DrawOp::FillRect {
            x: 0,
            y: 0,
            width: 5,
            height: 5,
            color: Color::RED,
        });
        painter.apply(&DrawOp::FillCircle {
            cx: 15,
            cy: 15,
            radius: 2,
            color: Color::BLUE,
        });

        assert_eq!(painter.canvas().pixel(4, 4), Some(Color::RED));
        assert_eq!(painter.canvas().pixel(15, 15), Some(Color::BLUE));
        assert_eq!(painter.canvas().pixel(10, 10), Some(Color::BLACK));

        painter.resize(30, 10);
        assert_eq!(painter.canvas().width(), 30);
        assert_eq!(painter.canvas().pixel(25, 5), Some(Color::BLACK));
    }
}
