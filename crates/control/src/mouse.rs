//! Window mouse routing: hit testing, enter/exit diffs, click synthesis.

use std::time::{Duration, Instant};

use events::Event;
use geom::Point;
use platform::{MouseButton, MouseEvent};

use crate::base::window_origin;
use crate::{ControlId, ControlTree, FocusController};

/// Two clicks of the same button within this window form a double-click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// One control on the hit path, with the cursor in its local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitEntry {
    pub id: ControlId,
    pub point: Point,
}

/// Controls under the cursor, leaf first.
pub type HitPath = Vec<HitEntry>;

/// Routes window-space mouse events into the control tree.
///
/// The window feeds every native mouse event through here; the controller
/// keeps per-control `is_mouse_over`/`held` state in sync and synthesizes
/// click and double-click events on release.
pub struct MouseController {
    last_over: HitPath,
    last_down: [HitPath; 3],
    last_click_time: [Option<Instant>; 3],
    /// Fired when no control consumed a click.
    pub on_window_click: Event<MouseEvent>,
}

impl Default for MouseController {
    fn default() -> Self {
        Self::new()
    }
}

impl MouseController {
    pub fn new() -> Self {
        Self {
            last_over: Vec::new(),
            last_down: [Vec::new(), Vec::new(), Vec::new()],
            last_click_time: [None; 3],
            on_window_click: Event::new(),
        }
    }

    pub fn mouse_move(&mut self, tree: &mut ControlTree, event: MouseEvent) {
        let path = self.refresh_over(tree, event);
        for entry in &path {
            let local = at_entry(event, entry);
            tree.base_mut(entry.id).input.mouse_move.emit(&local);
        }
    }

    pub fn mouse_down(&mut self, tree: &mut ControlTree, event: MouseEvent) {
        let path = self.refresh_over(tree, event);
        for entry in &path {
            let local = at_entry(event, entry);
            let base = tree.base_mut(entry.id);
            base.input.held |= event.button.bit();
            base.input.mouse_down.emit(&local);
        }
        self.last_down[event.button.index()] = path;
    }

    /// Fires up on the pressed set, then walks it leaf-first firing click
    /// or double-click on the topmost control still under the cursor. The
    /// first control listening for the click consumes it; an unconsumed
    /// click reaches [`MouseController::on_window_click`]. If no handler
    /// moved focus, it lands on the topmost clicked focusable or clears.
    pub fn mouse_up(
        &mut self,
        tree: &mut ControlTree,
        focus: &mut FocusController,
        event: MouseEvent,
    ) {
        let over = self.refresh_over(tree, event);
        let pressed = std::mem::take(&mut self.last_down[event.button.index()]);
        for entry in &pressed {
            if !tree.contains(entry.id) {
                continue;
            }
            let local = localize(tree, entry.id, event);
            let base = tree.base_mut(entry.id);
            base.input.held -= event.button.bit();
            base.input.mouse_up.emit(&local);
        }

        let double = self.last_click_time[event.button.index()]
            .map(|at| at.elapsed() < DOUBLE_CLICK_WINDOW)
            .unwrap_or(false);
        self.last_click_time[event.button.index()] = Some(Instant::now());

        let focus_marker = focus.change_count();
        let mut consumed = false;
        for entry in &pressed {
            if !tree.contains(entry.id) || !over.iter().any(|o| o.id == entry.id) {
                continue;
            }
            let local = localize(tree, entry.id, event);
            let base = tree.base_mut(entry.id);
            let hub = if double {
                &mut base.input.double_click
            } else {
                &mut base.input.click
            };
            if hub.has_listeners() {
                hub.emit(&local);
                consumed = true;
                break;
            }
        }
        if !consumed {
            self.on_window_click.emit(&event);
        }

        if focus.change_count() == focus_marker {
            let target = pressed
                .iter()
                .find(|entry| {
                    tree.contains(entry.id)
                        && tree.base(entry.id).is_focusable()
                        && tree.base(entry.id).is_attached()
                })
                .map(|entry| entry.id);
            focus.set_focus(tree, target);
        }
    }

    /// Delivers scroll leaf-first until a control listens for it.
    pub fn mouse_scroll(&mut self, tree: &mut ControlTree, event: MouseEvent) {
        let path = self.refresh_over(tree, event);
        for entry in &path {
            let local = at_entry(event, entry);
            let hub = &mut tree.base_mut(entry.id).input.scroll;
            if hub.has_listeners() {
                hub.emit(&local);
                return;
            }
        }
    }

    /// Cursor left the window; everything under it exits.
    pub fn mouse_exit_window(&mut self, tree: &mut ControlTree, event: MouseEvent) {
        let previous = std::mem::take(&mut self.last_over);
        for entry in &previous {
            if !tree.contains(entry.id) {
                continue;
            }
            let local = localize(tree, entry.id, event);
            let base = tree.base_mut(entry.id);
            base.input.is_mouse_over = false;
            base.input.mouse_exit.emit(&local);
        }
    }

    pub fn over(&self) -> &HitPath {
        &self.last_over
    }

    /// Recomputes the hit path and fires exit for leavers, enter for
    /// arrivals.
    fn refresh_over(&mut self, tree: &mut ControlTree, event: MouseEvent) -> HitPath {
        let path = hit_path(tree, event.window_point);
        let previous = std::mem::replace(&mut self.last_over, path.clone());
        for entry in &previous {
            if path.iter().any(|p| p.id == entry.id) || !tree.contains(entry.id) {
                continue;
            }
            let local = localize(tree, entry.id, event);
            let base = tree.base_mut(entry.id);
            base.input.is_mouse_over = false;
            base.input.mouse_exit.emit(&local);
        }
        for entry in &path {
            if previous.iter().any(|p| p.id == entry.id) {
                continue;
            }
            let local = at_entry(event, entry);
            let base = tree.base_mut(entry.id);
            base.input.is_mouse_over = true;
            base.input.mouse_enter.emit(&local);
        }
        path
    }
}

fn at_entry(event: MouseEvent, entry: &HitEntry) -> MouseEvent {
    let mut local = event;
    local.point = entry.point;
    local
}

fn localize(tree: &ControlTree, id: ControlId, event: MouseEvent) -> MouseEvent {
    event.localized(window_origin(tree, id))
}

/// Controls under `point` (window space), leaf first. Among overlapping
/// siblings the one painted last wins.
pub fn hit_path(tree: &ControlTree, point: Point) -> HitPath {
    let mut path = Vec::new();
    if let Some(root) = tree.root() {
        if tree.get(root).contains_point(point) {
            descend(tree, root, point, &mut path);
        }
    }
    path
}

fn descend(tree: &ControlTree, id: ControlId, point: Point, path: &mut HitPath) {
    for record in tree.base(id).children().iter().rev() {
        let child_point = point - record.offset;
        if tree.get(record.id).contains_point(child_point) {
            descend(tree, record.id, child_point, path);
            break;
        }
    }
    path.push(HitEntry { id, point });
}
