//! Input handler stacks
//!
//! Handlers form a stack of overlays: the most recently pushed handler sees
//! an event first. Returning `false` consumes the event; returning `true`
//! lets it fall through to handlers pushed earlier.

use std::sync::{Arc, Mutex};

use crate::input::{Action, Key, Modifiers, MouseButton, WindowCtx};
use crate::lock;

/// Called for key press and repeat events
pub type KeyHandler = dyn FnMut(&WindowCtx, Key, Modifiers) -> bool + Send;

/// Called for mouse button press and release events
pub type MouseButtonHandler = dyn FnMut(&WindowCtx, MouseButton, Action, Modifiers) -> bool + Send;

/// Called with the new cursor position; the context still holds the previous one
pub type MousePosHandler = dyn FnMut(&WindowCtx, f64, f64) -> bool + Send;

/// Called with horizontal and vertical scroll offsets
pub type ScrollHandler = dyn FnMut(&WindowCtx, f64, f64) -> bool + Send;

type Slot<F> = Arc<Mutex<Box<F>>>;

/// An ordered stack of handlers of one kind
pub struct HandlerStack<F: ?Sized> {
    handlers: Vec<Slot<F>>,
}

impl<F: ?Sized> HandlerStack<F> {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Push a handler on top of the stack
    pub fn push(&mut self, handler: Box<F>) {
        self.handlers.push(Arc::new(Mutex::new(handler)));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Cheap copy of the current stack, so the registry lock is not held
    /// while handlers run
    pub fn snapshot(&self) -> HandlerStack<F> {
        Self {
            handlers: self.handlers.clone(),
        }
    }

    /// Invoke handlers from the top of the stack down until one consumes the event
    ///
    /// Returns true if the event fell through every handler.
    pub fn dispatch(&self, mut call: impl FnMut(&mut F) -> bool) -> bool {
        for slot in self.handlers.iter().rev() {
            let mut handler = lock(slot);
            if !call(&mut **handler) {
                return false;
            }
        }
        true
    }
}

impl<F: ?Sized> Default for HandlerStack<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// All input handler stacks of a visualizer
#[derive(Default)]
pub struct InputHandlers {
    pub key: HandlerStack<KeyHandler>,
    pub mouse_button: HandlerStack<MouseButtonHandler>,
    pub mouse_pos: HandlerStack<MousePosHandler>,
    pub scroll: HandlerStack<ScrollHandler>,
}

impl InputHandlers {
    pub fn snapshot(&self) -> InputHandlers {
        InputHandlers {
            key: self.key.snapshot(),
            mouse_button: self.mouse_button.snapshot(),
            mouse_pos: self.mouse_pos.snapshot(),
            scroll: self.scroll.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        fall_through: bool,
    ) -> Box<KeyHandler> {
        let log = Arc::clone(log);
        Box::new(move |_ctx: &WindowCtx, _key: Key, _mods: Modifiers| {
            log.lock().unwrap().push(name);
            fall_through
        })
    }

    #[test]
    fn test_most_recent_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack: HandlerStack<KeyHandler> = HandlerStack::new();
        stack.push(recorder(&log, "defaults", true));
        stack.push(recorder(&log, "app", true));

        let ctx = WindowCtx::new(800, 600);
        let fell_through = stack.dispatch(|h| h(&ctx, Key::W, Modifiers::NONE));
        assert!(fell_through);
        assert_eq!(*log.lock().unwrap(), vec!["app", "defaults"]);
    }

    #[test]
    fn test_consumed_event_stops_propagation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack: HandlerStack<KeyHandler> = HandlerStack::new();
        stack.push(recorder(&log, "defaults", true));
        stack.push(recorder(&log, "overlay", false));
        stack.push(recorder(&log, "top", true));

        let ctx = WindowCtx::new(800, 600);
        assert!(!stack.dispatch(|h| h(&ctx, Key::A, Modifiers::NONE)));
        assert_eq!(*log.lock().unwrap(), vec!["top", "overlay"]);
    }

    #[test]
    fn test_snapshot_is_independent_of_later_pushes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack: HandlerStack<KeyHandler> = HandlerStack::new();
        stack.push(recorder(&log, "first", true));
        let snap = stack.snapshot();
        stack.push(recorder(&log, "second", true));

        assert_eq!(snap.len(), 1);
        assert_eq!(stack.len(), 2);
    }
}
