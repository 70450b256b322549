//! Window focus: at most one control holds it.

use crate::{ControlId, ControlTree};

/// Tracks the focused control and moves focus between focusables.
///
/// Each window owns one controller. `change_count` increments on every
/// `set_focus` call, so a caller can snapshot it, run arbitrary code, and
/// compare to learn whether focus moved in between.
pub struct FocusController {
    focus: Option<ControlId>,
    change_count: u64,
}

impl Default for FocusController {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusController {
    pub fn new() -> Self {
        Self {
            focus: None,
            change_count: 0,
        }
    }

    pub fn focus(&self) -> Option<ControlId> {
        self.focus
    }

    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// Moves focus to `target`, firing lost then gained. Panics when the
    /// target is not focusable or not attached.
    pub fn set_focus(&mut self, tree: &mut ControlTree, target: Option<ControlId>) {
        self.change_count += 1;
        if self.focus == target {
            return;
        }
        let marker = self.change_count;
        if let Some(old) = self.focus.take() {
            if tree.contains(old) {
                let base = tree.base_mut(old);
                base.set_has_focus(false);
                base.input.lost_focus.emit(&());
            }
        }
        // A lost-focus handler that rerouted focus wins.
        if self.change_count != marker {
            return;
        }
        if let Some(new) = target {
            let base = tree.base_mut(new);
            assert!(
                base.is_focusable(),
                "{:?} is not focusable and cannot take focus",
                new
            );
            assert!(
                base.is_attached(),
                "{:?} must be attached to take focus",
                new
            );
            base.set_has_focus(true);
            self.focus = Some(new);
            tree.base_mut(new).input.gained_focus.emit(&());
        }
        tracing::debug!(focus = ?self.focus, "focus changed");
    }

    /// Drops focus when the focused control left the tree. Call after any
    /// structural change; there is no per-control detach watch.
    pub fn validate(&mut self, tree: &mut ControlTree) {
        if let Some(id) = self.focus {
            if !tree.contains(id) || !tree.base(id).is_attached() {
                self.focus = None;
                self.change_count += 1;
                if tree.contains(id) {
                    let base = tree.base_mut(id);
                    base.set_has_focus(false);
                    base.input.lost_focus.emit(&());
                }
            }
        }
    }

    /// Focuses the next focusable in depth-first order, wrapping at the
    /// root. With no current focus, the first focusable wins.
    pub fn focus_next(&mut self, tree: &mut ControlTree) {
        self.step(tree, 1);
    }

    pub fn focus_prev(&mut self, tree: &mut ControlTree) {
        self.step(tree, -1);
    }

    fn step(&mut self, tree: &mut ControlTree, direction: isize) {
        let order = focus_order(tree);
        if order.is_empty() {
            return;
        }
        let next = match self.focus.and_then(|id| order.iter().position(|&o| o == id)) {
            Some(at) => {
                let len = order.len() as isize;
                order[((at as isize + direction).rem_euclid(len)) as usize]
            }
            None => {
                if direction > 0 {
                    order[0]
                } else {
                    order[order.len() - 1]
                }
            }
        };
        self.set_focus(tree, Some(next));
    }
}

/// Visible focusables in depth-first preorder.
fn focus_order(tree: &ControlTree) -> Vec<ControlId> {
    let mut order = Vec::new();
    if let Some(root) = tree.root() {
        collect(tree, root, &mut order);
    }
    order
}

fn collect(tree: &ControlTree, id: ControlId, order: &mut Vec<ControlId>) {
    let base = tree.base(id);
    if !base.is_visible() {
        return;
    }
    if base.is_focusable() {
        order.push(id);
    }
    for record in base.children() {
        collect(tree, record.id, order);
    }
}
