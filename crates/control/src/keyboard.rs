//! Window keyboard routing: bubble from the focused control to the root.

use events::Event;
use platform::{KeyStrokeEvent, KeyboardEvent};

use crate::{ControlId, ControlTree, FocusController};

/// Delivers key events up the ancestor chain of the focused control until
/// a control listens for them; unhandled events reach the window hubs.
pub struct KeyboardController {
    pub on_window_key_down: Event<KeyboardEvent>,
    pub on_window_key_up: Event<KeyboardEvent>,
    pub on_window_key_repeat: Event<KeyboardEvent>,
    pub on_window_key_stroke: Event<KeyStrokeEvent>,
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardController {
    pub fn new() -> Self {
        Self {
            on_window_key_down: Event::new(),
            on_window_key_up: Event::new(),
            on_window_key_repeat: Event::new(),
            on_window_key_stroke: Event::new(),
        }
    }

    pub fn key_down(&mut self, tree: &mut ControlTree, focus: &FocusController, ev: KeyboardEvent) {
        if !bubble(tree, focus.focus(), ev, |input| &mut input.key_down) {
            self.on_window_key_down.emit(&ev);
        }
    }

    pub fn key_up(&mut self, tree: &mut ControlTree, focus: &FocusController, ev: KeyboardEvent) {
        if !bubble(tree, focus.focus(), ev, |input| &mut input.key_up) {
            self.on_window_key_up.emit(&ev);
        }
    }

    pub fn key_repeat(
        &mut self,
        tree: &mut ControlTree,
        focus: &FocusController,
        ev: KeyboardEvent,
    ) {
        if !bubble(tree, focus.focus(), ev, |input| &mut input.key_repeat) {
            self.on_window_key_repeat.emit(&ev);
        }
    }

    pub fn key_stroke(
        &mut self,
        tree: &mut ControlTree,
        focus: &FocusController,
        ev: KeyStrokeEvent,
    ) {
        if !bubble(tree, focus.focus(), ev, |input| &mut input.key_stroke) {
            self.on_window_key_stroke.emit(&ev);
        }
    }
}

/// Emits on the first listening control from `start` up to the root.
/// Returns whether anything consumed the event.
fn bubble<T>(
    tree: &mut ControlTree,
    start: Option<ControlId>,
    ev: T,
    hub: impl Fn(&mut crate::InputEvents) -> &mut Event<T>,
) -> bool {
    let mut cursor = start;
    while let Some(id) = cursor {
        if !tree.contains(id) {
            return false;
        }
        let event = hub(&mut tree.base_mut(id).input);
        if event.has_listeners() {
            event.emit(&ev);
            return true;
        }
        cursor = tree.base(id).parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Block;
    use canvas::{Brush, Color};
    use geom::Size;
    use platform::{KeyboardKey, Modifier};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn nested_tree() -> (ControlTree, ControlId, ControlId, ControlId) {
        let mut tree = ControlTree::new();
        let root = tree.insert(Box::new(Block::new(
            Brush::new(Color::BLACK),
            Size::new(100, 100),
        )));
        let middle = tree.insert(Box::new(Block::new(
            Brush::new(Color::WHITE),
            Size::new(50, 50),
        )));
        let leaf = tree.insert(Box::new(Block::new(
            Brush::new(Color::RED),
            Size::new(10, 10),
        )));
        tree.add_child(root, middle);
        tree.add_child(middle, leaf);
        tree.set_root(root);
        tree.base_mut(leaf).set_focusable(true);
        (tree, root, middle, leaf)
    }

    fn press(key: KeyboardKey) -> KeyboardEvent {
        KeyboardEvent {
            key,
            modifier: Modifier::empty(),
        }
    }

    #[test]
    fn keys_bubble_to_the_first_listening_ancestor() {
        let (mut tree, root, middle, leaf) = nested_tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (id, tag) in [(root, "root"), (middle, "middle")] {
            let l = log.clone();
            let _ = tree
                .base_mut(id)
                .input
                .key_down
                .listen(move |_| l.borrow_mut().push(tag));
        }
        let mut focus = FocusController::new();
        focus.set_focus(&mut tree, Some(leaf));
        let mut keyboard = KeyboardController::new();
        keyboard.key_down(&mut tree, &focus, press(KeyboardKey::A));
        assert_eq!(*log.borrow(), vec!["middle"]);
    }

    #[test]
    fn unhandled_keys_reach_the_window() {
        let (mut tree, _, _, leaf) = nested_tree();
        let mut focus = FocusController::new();
        focus.set_focus(&mut tree, Some(leaf));
        let mut keyboard = KeyboardController::new();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let _ = keyboard
            .on_window_key_down
            .listen(move |_| *h.borrow_mut() += 1);
        keyboard.key_down(&mut tree, &focus, press(KeyboardKey::Escape));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn strokes_reach_the_focused_control() {
        let (mut tree, _, _, leaf) = nested_tree();
        let runes = Rc::new(RefCell::new(String::new()));
        let r = runes.clone();
        let _ = tree
            .base_mut(leaf)
            .input
            .key_stroke
            .listen(move |ev: &KeyStrokeEvent| r.borrow_mut().push(ev.rune));
        let mut focus = FocusController::new();
        focus.set_focus(&mut tree, Some(leaf));
        let mut keyboard = KeyboardController::new();
        for rune in ['h', 'i'] {
            keyboard.key_stroke(
                &mut tree,
                &focus,
                KeyStrokeEvent {
                    rune,
                    modifier: Modifier::empty(),
                },
            );
        }
        assert_eq!(*runes.borrow(), "hi");
    }

    #[test]
    fn without_focus_the_window_receives_the_event() {
        let (mut tree, _, _, _) = nested_tree();
        let focus = FocusController::new();
        let mut keyboard = KeyboardController::new();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let _ = keyboard
            .on_window_key_up
            .listen(move |_| *h.borrow_mut() += 1);
        keyboard.key_up(&mut tree, &focus, press(KeyboardKey::Tab));
        assert_eq!(*hits.borrow(), 1);
    }
}
