//! Input event payloads.

use bitflags::bitflags;
use geom::Point;

/// Scroll wheel deltas are multiplied by this fixed factor into pixels.
pub const SCROLL_SPEED: i32 = 20;

bitflags! {
    /// Keyboard modifier bits. Combinable.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Modifier: u8 {
        const SHIFT = 1;
        const CONTROL = 2;
        const ALT = 4;
        const SUPER = 8;
    }
}

bitflags! {
    /// Held mouse buttons.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct MouseState: u8 {
        const LEFT = 1;
        const MIDDLE = 2;
        const RIGHT = 4;
    }
}

/// A single mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub const ALL: [MouseButton; 3] = [MouseButton::Left, MouseButton::Middle, MouseButton::Right];

    pub fn bit(self) -> MouseState {
        match self {
            MouseButton::Left => MouseState::LEFT,
            MouseButton::Middle => MouseState::MIDDLE,
            MouseButton::Right => MouseState::RIGHT,
        }
    }

    pub fn index(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        }
    }
}

/// Key transition reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
    Repeat,
}

/// Desktop keyboard keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardKey {
    Space,
    Apostrophe,
    Comma,
    Minus,
    Period,
    Slash,
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    Semicolon,
    Equal,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    LeftBracket,
    Backslash,
    RightBracket,
    GraveAccent,
    Escape,
    Enter,
    Tab,
    Backspace,
    Insert,
    Delete,
    Right,
    Left,
    Down,
    Up,
    PageUp,
    PageDown,
    Home,
    End,
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Kp0,
    Kp1,
    Kp2,
    Kp3,
    Kp4,
    Kp5,
    Kp6,
    Kp7,
    Kp8,
    Kp9,
    KpDecimal,
    KpDivide,
    KpMultiply,
    KpSubtract,
    KpAdd,
    KpEnter,
    KpEqual,
    LeftShift,
    LeftControl,
    LeftAlt,
    LeftSuper,
    RightShift,
    RightControl,
    RightAlt,
    RightSuper,
    Menu,
    Unknown,
}

/// Mouse event payload.
///
/// `point` is control-local; `window_point` is root-local. Controllers
/// rewrite `point` as they descend the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub point: Point,
    pub window_point: Point,
    pub state: MouseState,
    pub button: MouseButton,
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub modifier: Modifier,
}

impl MouseEvent {
    pub fn at(window_point: Point) -> Self {
        Self {
            point: window_point,
            window_point,
            state: MouseState::empty(),
            button: MouseButton::Left,
            scroll_x: 0,
            scroll_y: 0,
            modifier: Modifier::empty(),
        }
    }

    /// The same event translated into a child's coordinate space.
    pub fn localized(mut self, child_origin: Point) -> Self {
        self.point = self.point - child_origin;
        self
    }
}

/// Key down/up/repeat payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub key: KeyboardKey,
    pub modifier: Modifier,
}

/// Character input payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStrokeEvent {
    pub rune: char,
    pub modifier: Modifier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_bits_match_the_wire_values() {
        assert_eq!(Modifier::SHIFT.bits(), 1);
        assert_eq!(Modifier::CONTROL.bits(), 2);
        assert_eq!(Modifier::ALT.bits(), 4);
        assert_eq!(Modifier::SUPER.bits(), 8);
    }

    #[test]
    fn button_bits_are_distinct() {
        let all = MouseButton::ALL
            .iter()
            .fold(MouseState::empty(), |acc, b| acc | b.bit());
        assert_eq!(all.bits(), 7);
    }

    #[test]
    fn localized_translates_point_only() {
        let ev = MouseEvent::at(Point::new(10, 10)).localized(Point::new(3, 4));
        assert_eq!(ev.point, Point::new(7, 6));
        assert_eq!(ev.window_point, Point::new(10, 10));
    }
}
