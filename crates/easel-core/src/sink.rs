//! Bridge from native UI-thread callbacks to the event queue.
//!
//! Native windowing bindings do not build events themselves. They call the
//! named callbacks on an [`EventSink`] (`key_down`, `mouse_button`, `close_requested`
//! and so on) and the sink applies the translation rules, stamps the event
//! with the session's window id and enqueues it, waking any blocked consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::{Event, EventKind, KeyCode, Modifiers, MouseButton, MouseEvent, WindowId};
use crate::logging::targets;
use crate::queue::EventQueue;

/// Whether a mouse button went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Pressed,
    Released,
}

/// Map a native button callback to an event kind.
///
/// Left, right and middle map to their down/up kinds. Any other button maps to
/// `MouseMove`, which is what existing consumers of this message set expect.
pub fn translate_button(action: ButtonAction, button: MouseButton) -> EventKind {
    match (action, button) {
        (ButtonAction::Pressed, MouseButton::Left) => EventKind::LeftButtonDown,
        (ButtonAction::Released, MouseButton::Left) => EventKind::LeftButtonUp,
        (ButtonAction::Pressed, MouseButton::Right) => EventKind::RightButtonDown,
        (ButtonAction::Released, MouseButton::Right) => EventKind::RightButtonUp,
        (ButtonAction::Pressed, MouseButton::Middle) => EventKind::MiddleButtonDown,
        (ButtonAction::Released, MouseButton::Middle) => EventKind::MiddleButtonUp,
        _ => EventKind::MouseMove,
    }
}

/// Callback registrations a native binding invokes from its UI thread.
///
/// Cloning is cheap; all clones feed the same queue.
#[derive(Debug, Clone)]
pub struct EventSink {
    queue: Arc<EventQueue>,
    window_id: WindowId,
    close_sent: Arc<AtomicBool>,
}

impl EventSink {
    /// Create a sink that stamps events with `window_id` and pushes them to `queue`.
    pub fn new(queue: Arc<EventQueue>, window_id: WindowId) -> Self {
        Self {
            queue,
            window_id,
            close_sent: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The window id stamped on every event from this sink.
    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// A key was pressed.
    pub fn key_down(&self, key: KeyCode, modifiers: Modifiers) {
        self.queue.push(Event::key_down(self.window_id, key, modifiers));
    }

    /// A key was released.
    pub fn key_up(&self, key: KeyCode, modifiers: Modifiers) {
        self.queue.push(Event::key_up(self.window_id, key, modifiers));
    }

    /// The pointer moved to `(x, y)`; `button` is the button held, if any.
    pub fn mouse_move(&self, x: i32, y: i32, button: Option<MouseButton>) {
        let mouse = MouseEvent {
            x,
            y,
            wheel_delta: 0,
            button,
            clicks: 0,
        };
        self.queue
            .push(Event::mouse(EventKind::MouseMove, self.window_id, mouse));
    }

    /// A mouse button went down or up at `(x, y)`.
    pub fn mouse_button(&self, action: ButtonAction, button: MouseButton, x: i32, y: i32, clicks: u32) {
        let kind = translate_button(action, button);
        let mouse = MouseEvent {
            x,
            y,
            wheel_delta: 0,
            button: Some(button),
            clicks,
        };
        self.queue.push(Event::mouse(kind, self.window_id, mouse));
    }

    /// The wheel turned by `delta` (120 per notch) with the pointer at `(x, y)`.
    pub fn wheel(&self, x: i32, y: i32, delta: i32) {
        let mouse = MouseEvent {
            x,
            y,
            wheel_delta: delta,
            button: None,
            clicks: 0,
        };
        self.queue
            .push(Event::mouse(EventKind::Wheel, self.window_id, mouse));
    }

    /// The native window is closing.
    ///
    /// Enqueues exactly one `Close` event per session; later calls return `false`.
    pub fn close_requested(&self) -> bool {
        if self.close_sent.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::debug!(target: targets::SINK, window_id = self.window_id.as_u64(), "close requested");
        self.queue.push(Event::close(self.window_id));
        true
    }

    /// The native UI session has ended; blocked consumers get the no-event sentinel
    /// once the queue is drained.
    pub fn session_ended(&self) {
        tracing::debug!(target: targets::SINK, window_id = self.window_id.as_u64(), "UI session ended");
        self.queue.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> (Arc<EventQueue>, EventSink) {
        let queue = Arc::new(EventQueue::new());
        let sink = EventSink::new(queue.clone(), WindowId::next());
        (queue, sink)
    }

    #[test]
    fn test_button_translation() {
        use ButtonAction::*;
        assert_eq!(translate_button(Pressed, MouseButton::Left), EventKind::LeftButtonDown);
        assert_eq!(translate_button(Released, MouseButton::Left), EventKind::LeftButtonUp);
        assert_eq!(translate_button(Pressed, MouseButton::Right), EventKind::RightButtonDown);
        assert_eq!(translate_button(Released, MouseButton::Right), EventKind::RightButtonUp);
        assert_eq!(translate_button(Pressed, MouseButton::Middle), EventKind::MiddleButtonDown);
        assert_eq!(translate_button(Released, MouseButton::Middle), EventKind::MiddleButtonUp);
    }

    #[test]
    fn test_unknown_buttons_become_mouse_move() {
        use ButtonAction::*;
        for button in [MouseButton::Back, MouseButton::Forward, MouseButton::Other(9)] {
            assert_eq!(translate_button(Pressed, button), EventKind::MouseMove);
            assert_eq!(translate_button(Released, button), EventKind::MouseMove);
        }
    }

    #[test]
    fn test_mouse_button_payload() {
        let (queue, sink) = sink();
        sink.mouse_button(ButtonAction::Pressed, MouseButton::Back, 3, 4, 1);

        let event = queue.try_pop().unwrap();
        assert_eq!(event.kind(), EventKind::MouseMove);
        let mouse = event.as_mouse().unwrap();
        assert_eq!((mouse.x, mouse.y), (3, 4));
        assert_eq!(mouse.button, Some(MouseButton::Back));
        assert_eq!(mouse.clicks, 1);
    }

    #[test]
    fn test_wheel_and_keys() {
        let (queue, sink) = sink();
        let mods = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        sink.key_down(KeyCode::Char('A'), mods);
        sink.key_up(KeyCode::Char('A'), mods);
        sink.wheel(10, 20, -120);

        let down = queue.try_pop().unwrap();
        assert_eq!(down.kind(), EventKind::KeyDown);
        assert!(down.as_key().unwrap().modifiers.shift);
        assert_eq!(queue.try_pop().unwrap().kind(), EventKind::KeyUp);

        let wheel = queue.try_pop().unwrap();
        assert_eq!(wheel.kind(), EventKind::Wheel);
        assert_eq!(wheel.as_mouse().unwrap().wheel_delta, -120);
        assert_eq!(wheel.window_id(), sink.window_id());
    }

    #[test]
    fn test_close_enqueued_once() {
        let (queue, sink) = sink();
        assert!(sink.close_requested());
        assert!(!sink.clone().close_requested());
        sink.session_ended();

        assert_eq!(queue.pop_blocking().unwrap().kind(), EventKind::Close);
        assert!(queue.pop_blocking().is_none());
    }
}
