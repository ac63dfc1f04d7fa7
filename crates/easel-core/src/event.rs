//! Event types delivered through the host's message queue.
//!
//! Every event carries a kind, the id of the window that produced it and a
//! millisecond timestamp. Key, mouse and timer events additionally carry a
//! typed payload. Events are immutable once constructed: fields are private and
//! only exposed through accessors.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-wide epoch that event timestamps are measured from.
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed since the first event timestamp taken in this process.
pub fn timestamp_now() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_millis() as u64
}

/// Identity of a host window session.
///
/// A new id is allocated every time a host is initialized, so events from a
/// previous session can always be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(u64);

impl WindowId {
    /// Allocate a fresh, process-unique window id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value of this id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Caller-chosen identifier of a periodic timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u32);

/// The kind of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A key was pressed.
    KeyDown,
    /// A key was released.
    KeyUp,
    /// The pointer moved (also produced for presses of unrecognized buttons).
    MouseMove,
    /// Left button pressed.
    LeftButtonDown,
    /// Left button released.
    LeftButtonUp,
    /// Right button pressed.
    RightButtonDown,
    /// Right button released.
    RightButtonUp,
    /// Middle button pressed.
    MiddleButtonDown,
    /// Middle button released.
    MiddleButtonUp,
    /// The mouse wheel turned.
    Wheel,
    /// A periodic timer ticked.
    Timer,
    /// The window is closing.
    Close,
}

impl EventKind {
    /// Whether this kind carries a [`KeyEvent`] payload.
    pub fn is_key(self) -> bool {
        matches!(self, Self::KeyDown | Self::KeyUp)
    }

    /// Whether this kind carries a [`MouseEvent`] payload.
    pub fn is_mouse(self) -> bool {
        matches!(
            self,
            Self::MouseMove
                | Self::LeftButtonDown
                | Self::LeftButtonUp
                | Self::RightButtonDown
                | Self::RightButtonUp
                | Self::MiddleButtonDown
                | Self::MiddleButtonUp
                | Self::Wheel
        )
    }

    /// Whether this is one of the button-down kinds.
    pub fn is_button_down(self) -> bool {
        matches!(
            self,
            Self::LeftButtonDown | Self::RightButtonDown | Self::MiddleButtonDown
        )
    }

    /// Whether this is one of the button-up kinds.
    pub fn is_button_up(self) -> bool {
        matches!(
            self,
            Self::LeftButtonUp | Self::RightButtonUp | Self::MiddleButtonUp
        )
    }
}

/// Keyboard modifier state at the time of a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub alt: bool,
    pub control: bool,
    pub shift: bool,
}

impl Modifiers {
    /// No modifier held.
    pub const NONE: Self = Self {
        alt: false,
        control: false,
        shift: false,
    };

    /// Whether no modifier is held.
    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

/// A key identity, independent of the native windowing binding.
///
/// Letters are reported in upper case, matching physical key positions rather
/// than the produced text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A letter (`'A'..='Z'`) or digit (`'0'..='9'`) key.
    Char(char),
    /// A function key, `F1` is `Function(1)`.
    Function(u8),
    Escape,
    Space,
    Enter,
    Tab,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Left,
    Right,
    Up,
    Down,
    Shift,
    Control,
    Alt,
    /// A key the binding could not identify.
    Unidentified,
}

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    /// Any other button, by native index.
    Other(u16),
}

/// Payload of `KeyDown`/`KeyUp` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

/// Payload of mouse and wheel events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Pointer position in window client coordinates.
    pub x: i32,
    pub y: i32,
    /// Wheel movement in notches times 120; zero for non-wheel events.
    pub wheel_delta: i32,
    /// The button involved, if any.
    pub button: Option<MouseButton>,
    /// Number of consecutive clicks (1 single, 2 double).
    pub clicks: u32,
}

/// Payload of `Timer` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub timer_id: TimerId,
}

/// Kind-specific event data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    None,
    Key(KeyEvent),
    Mouse(MouseEvent),
    Timer(TimerEvent),
}

/// An immutable record of something that happened in a host window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    window_id: WindowId,
    timestamp_ms: u64,
    payload: EventPayload,
}

impl Event {
    fn stamped(kind: EventKind, window_id: WindowId, payload: EventPayload) -> Self {
        Self {
            kind,
            window_id,
            timestamp_ms: timestamp_now(),
            payload,
        }
    }

    /// A key press.
    pub fn key_down(window_id: WindowId, key: KeyCode, modifiers: Modifiers) -> Self {
        Self::stamped(
            EventKind::KeyDown,
            window_id,
            EventPayload::Key(KeyEvent { key, modifiers }),
        )
    }

    /// A key release.
    pub fn key_up(window_id: WindowId, key: KeyCode, modifiers: Modifiers) -> Self {
        Self::stamped(
            EventKind::KeyUp,
            window_id,
            EventPayload::Key(KeyEvent { key, modifiers }),
        )
    }

    /// A mouse event of the given kind.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `kind` is not a mouse kind.
    pub fn mouse(kind: EventKind, window_id: WindowId, mouse: MouseEvent) -> Self {
        debug_assert!(kind.is_mouse(), "{kind:?} is not a mouse event kind");
        Self::stamped(kind, window_id, EventPayload::Mouse(mouse))
    }

    /// A timer tick.
    pub fn timer(window_id: WindowId, timer_id: TimerId) -> Self {
        Self::stamped(
            EventKind::Timer,
            window_id,
            EventPayload::Timer(TimerEvent { timer_id }),
        )
    }

    /// A window close.
    pub fn close(window_id: WindowId) -> Self {
        Self::stamped(EventKind::Close, window_id, EventPayload::None)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// The key payload, for `KeyDown`/`KeyUp` events.
    pub fn as_key(&self) -> Option<&KeyEvent> {
        match &self.payload {
            EventPayload::Key(key) => Some(key),
            _ => None,
        }
    }

    /// The mouse payload, for mouse and wheel events.
    pub fn as_mouse(&self) -> Option<&MouseEvent> {
        match &self.payload {
            EventPayload::Mouse(mouse) => Some(mouse),
            _ => None,
        }
    }

    /// The timer payload, for `Timer` events.
    pub fn as_timer(&self) -> Option<&TimerEvent> {
        match &self.payload {
            EventPayload::Timer(timer) => Some(timer),
            _ => None,
        }
    }

    /// Whether this is a key press of `key`.
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.kind == EventKind::KeyDown && self.as_key().is_some_and(|k| k.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_ids_are_unique() {
        let a = WindowId::next();
        let b = WindowId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_payload_accessors() {
        let window = WindowId::next();

        let key = Event::key_down(window, KeyCode::Escape, Modifiers::NONE);
        assert_eq!(key.kind(), EventKind::KeyDown);
        assert!(key.is_key_down(KeyCode::Escape));
        assert!(key.as_mouse().is_none());

        let timer = Event::timer(window, TimerId(7));
        assert_eq!(timer.as_timer().map(|t| t.timer_id), Some(TimerId(7)));
        assert_eq!(timer.window_id(), window);

        let close = Event::close(window);
        assert_eq!(close.payload(), &EventPayload::None);
    }

    #[test]
    fn test_timestamps_are_monotonic() {
        let window = WindowId::next();
        let first = Event::close(window);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = Event::close(window);
        assert!(second.timestamp_ms() >= first.timestamp_ms() + 4);
    }

    #[test]
    fn test_kind_classification() {
        assert!(EventKind::Wheel.is_mouse());
        assert!(EventKind::MouseMove.is_mouse());
        assert!(!EventKind::Timer.is_mouse());
        assert!(EventKind::KeyUp.is_key());
        assert!(EventKind::MiddleButtonDown.is_button_down());
        assert!(EventKind::RightButtonUp.is_button_up());
        assert!(!EventKind::MouseMove.is_button_down());
    }
}
