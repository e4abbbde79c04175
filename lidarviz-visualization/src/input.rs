//! Raw input events and the per-frame window context handed to handlers

use serde::{Deserialize, Serialize};

/// A keyboard key code, using GLFW numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(pub i32);

impl Key {
    pub const SPACE: Key = Key(32);
    pub const MINUS: Key = Key(45);
    pub const NUM_0: Key = Key(48);
    pub const EQUAL: Key = Key(61);
    pub const A: Key = Key(65);
    pub const D: Key = Key(68);
    pub const R: Key = Key(82);
    pub const S: Key = Key(83);
    pub const W: Key = Key(87);
    pub const ESCAPE: Key = Key(256);
    pub const RIGHT: Key = Key(262);
    pub const LEFT: Key = Key(263);
    pub const DOWN: Key = Key(264);
    pub const UP: Key = Key(265);

    /// Key for an ASCII letter or digit
    pub fn from_char(c: char) -> Option<Key> {
        match c {
            'a'..='z' => Some(Key(c.to_ascii_uppercase() as i32)),
            'A'..='Z' | '0'..='9' => Some(Key(c as i32)),
            _ => None,
        }
    }
}

/// Modifier keys held during an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(0x1);
    pub const CONTROL: Modifiers = Modifiers(0x2);
    pub const ALT: Modifiers = Modifiers(0x4);
    pub const SUPER: Modifiers = Modifiers(0x8);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Modifiers(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Press,
    Repeat,
    Release,
}

/// An input event as produced by a backend's window system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Key { key: Key, mods: Modifiers, action: Action },
    MouseButton { button: MouseButton, mods: Modifiers, action: Action },
    CursorMoved { x: f64, y: f64 },
    Scroll { dx: f64, dy: f64 },
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// Read-only snapshot of pointer and viewport state given to input handlers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowCtx {
    /// True if the left mouse button is held
    pub lbutton_down: bool,
    /// True if the middle mouse button is held
    pub mbutton_down: bool,
    pub mouse_x: f64,
    pub mouse_y: f64,
    /// Viewport size in pixels
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl WindowCtx {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            lbutton_down: false,
            mbutton_down: false,
            mouse_x: 0.0,
            mouse_y: 0.0,
            viewport_width,
            viewport_height,
        }
    }

    /// Width over height, 1.0 for a degenerate viewport
    pub fn aspect(&self) -> f64 {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            1.0
        } else {
            self.viewport_width as f64 / self.viewport_height as f64
        }
    }

    /// Fold a state-changing event into a new snapshot
    pub(crate) fn apply(&self, event: &InputEvent) -> WindowCtx {
        let mut next = *self;
        match *event {
            InputEvent::MouseButton { button, action, .. } => {
                let down = action != Action::Release;
                match button {
                    MouseButton::Left => next.lbutton_down = down,
                    MouseButton::Middle => next.mbutton_down = down,
                    MouseButton::Right => {}
                }
            }
            InputEvent::CursorMoved { x, y } => {
                next.mouse_x = x;
                next.mouse_y = y;
            }
            InputEvent::Resized { width, height } => {
                next.viewport_width = width;
                next.viewport_height = height;
            }
            _ => {}
        }
        next
    }
}
