//! # Kestrel Control Tree
//!
//! Controls live in an arena owned by [`ControlTree`]: a slot vector plus
//! a free list, addressed by stable [`ControlId`]s. Parent/child links are
//! ids, never references, so controls freely name each other without
//! ownership cycles.
//!
//! Hooks that need mutable tree access ([`Control::layout_children`],
//! [`Control::paint`], attach/detach) run with the node temporarily taken
//! out of its slot; a hook touching its own vacant slot is a contract
//! violation and panics. All tree access is single-threaded (the
//! application thread).

mod base;
mod block;
mod focus;
mod keyboard;
mod mouse;

pub use base::{ChildRecord, ControlBase, InputEvents};
pub use block::Block;
pub use focus::FocusController;
pub use keyboard::KeyboardController;
pub use mouse::{hit_path, HitEntry, HitPath, MouseController, DOUBLE_CLICK_WINDOW};

use std::fmt;
use std::sync::Arc;

use canvas::Canvas;
use events::Event;
use geom::{Point, Rect, Size};

/// Stable arena index of one control.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(u32);

impl ControlId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlId({})", self.0)
    }
}

/// A node of the control tree.
///
/// Implementations embed a [`ControlBase`] and override the hooks they
/// care about. Hooks receiving `&mut ControlTree` run while this node is
/// out of its slot.
pub trait Control: 'static {
    fn base(&self) -> &ControlBase;
    fn base_mut(&mut self) -> &mut ControlBase;

    /// Concrete-type access for callers that know what they inserted.
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    /// Preferred size within `[min, max]`.
    fn desired_size(&mut self, _tree: &mut ControlTree, _min: Size, max: Size) -> Size {
        max
    }

    /// Sizes and positions the children. Runs after this control's size
    /// changed or a relayout was requested.
    fn layout_children(&mut self, _tree: &mut ControlTree) {}

    /// Records this control's content. The default paints the children.
    fn paint(&mut self, tree: &mut ControlTree, canvas: &mut Canvas) {
        self.base().paint_children(tree, canvas);
    }

    /// Hit test in local coordinates.
    fn contains_point(&self, point: Point) -> bool {
        self.base().is_visible() && Rect::from_size(self.base().size()).contains(point)
    }

    fn on_attach(&mut self, _tree: &mut ControlTree) {}
    fn on_detach(&mut self, _tree: &mut ControlTree) {}
}

/// Arena of controls plus the tree-global layout scheduler.
pub struct ControlTree {
    slots: Vec<Option<Box<dyn Control>>>,
    free: Vec<u32>,
    root: Option<ControlId>,
    /// Ids currently inside their own `layout_children` hook.
    layout_stack: Vec<ControlId>,
    layout_dirty: bool,
    /// Fired when a relayout was scheduled; a window listens to repaint.
    pub on_update_needed: Event<()>,
}

impl Default for ControlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlTree {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            layout_stack: Vec::new(),
            layout_dirty: false,
            on_update_needed: Event::new(),
        }
    }

    /// Adds a control to the arena. The control starts detached and
    /// parentless.
    pub fn insert(&mut self, control: Box<dyn Control>) -> ControlId {
        let id = match self.free.pop() {
            Some(index) => ControlId(index),
            None => {
                self.slots.push(None);
                ControlId((self.slots.len() - 1) as u32)
            }
        };
        self.slots[id.index()] = Some(control);
        self.base_mut(id).assign_id(id);
        id
    }

    /// Frees a detached, parentless control's slot. Panics otherwise.
    pub fn remove(&mut self, id: ControlId) {
        {
            let base = self.base(id);
            assert!(
                !base.is_attached() && base.parent().is_none(),
                "remove of {:?} while still in the tree",
                id
            );
        }
        self.slots[id.index()] = None;
        self.free.push(id.0);
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.slots
            .get(id.index())
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn get(&self, id: ControlId) -> &dyn Control {
        self.slots[id.index()]
            .as_deref()
            .unwrap_or_else(|| panic!("{:?} is not resident (hook re-entry?)", id))
    }

    pub fn get_mut(&mut self, id: ControlId) -> &mut dyn Control {
        self.slots[id.index()]
            .as_deref_mut()
            .unwrap_or_else(|| panic!("{:?} is not resident (hook re-entry?)", id))
    }

    pub fn base(&self, id: ControlId) -> &ControlBase {
        self.get(id).base()
    }

    pub fn base_mut(&mut self, id: ControlId) -> &mut ControlBase {
        self.get_mut(id).base_mut()
    }

    /// Borrows the control as its concrete type. Panics when `id` holds a
    /// different type.
    pub fn downcast_ref<C: Control>(&self, id: ControlId) -> &C {
        self.get(id)
            .as_any()
            .downcast_ref::<C>()
            .unwrap_or_else(|| panic!("{:?} is not a {}", id, std::any::type_name::<C>()))
    }

    pub fn downcast_mut<C: Control>(&mut self, id: ControlId) -> &mut C {
        self.get_mut(id)
            .as_any_mut()
            .downcast_mut::<C>()
            .unwrap_or_else(|| panic!("{:?} is not a {}", id, std::any::type_name::<C>()))
    }

    /// Runs `f` with the node taken out of its slot, restoring it after.
    /// This is the hook-dispatch primitive: `f` gets the node and the rest
    /// of the tree without aliasing.
    pub fn with_control<R>(
        &mut self,
        id: ControlId,
        f: impl FnOnce(&mut Box<dyn Control>, &mut ControlTree) -> R,
    ) -> R {
        let mut node = self.slots[id.index()]
            .take()
            .unwrap_or_else(|| panic!("{:?} is not resident (hook re-entry?)", id));
        let result = f(&mut node, self);
        self.slots[id.index()] = Some(node);
        result
    }

    pub fn root(&self) -> Option<ControlId> {
        self.root
    }

    /// Installs the root control and attaches its subtree.
    pub fn set_root(&mut self, id: ControlId) {
        assert!(self.root.is_none(), "tree already has a root");
        self.root = Some(id);
        self.attach(id);
        self.relayout(id);
    }

    /// Links `child` under `parent`, attaching it when the parent is
    /// attached and scheduling a relayout of the parent.
    pub fn add_child(&mut self, parent: ControlId, child: ControlId) {
        assert!(
            self.base(child).parent().is_none(),
            "{:?} already has a parent",
            child
        );
        self.base_mut(child).set_parent(Some(parent));
        self.base_mut(parent).children_mut().push(ChildRecord {
            id: child,
            offset: Point::ZERO,
        });
        if self.base(parent).is_attached() {
            self.attach(child);
        }
        self.relayout(parent);
    }

    /// Unlinks `child` from `parent`, detaching it first when attached.
    pub fn remove_child(&mut self, parent: ControlId, child: ControlId) {
        let position = self
            .base(parent)
            .children()
            .iter()
            .position(|record| record.id == child)
            .unwrap_or_else(|| panic!("{:?} is not a child of {:?}", child, parent));
        if self.base(child).is_attached() {
            self.detach(child);
        }
        self.base_mut(parent).children_mut().remove(position);
        self.base_mut(child).set_parent(None);
        self.relayout(parent);
    }

    /// Links `child` under the control currently running a hook. The
    /// parent is out of its slot during hooks, so its base is passed
    /// explicitly; no relayout is scheduled.
    pub fn adopt_during_hook(&mut self, parent: &mut ControlBase, child: ControlId) {
        assert!(
            self.base(child).parent().is_none(),
            "{:?} already has a parent",
            child
        );
        self.base_mut(child).set_parent(Some(parent.id()));
        parent.children_mut().push(ChildRecord {
            id: child,
            offset: Point::ZERO,
        });
        if parent.is_attached() {
            self.attach(child);
        }
    }

    /// Unlinks a child adopted via [`ControlTree::adopt_during_hook`].
    pub fn release_during_hook(&mut self, parent: &mut ControlBase, child: ControlId) {
        let position = parent
            .children()
            .iter()
            .position(|record| record.id == child)
            .unwrap_or_else(|| panic!("{:?} is not a child here", child));
        if self.base(child).is_attached() {
            self.detach(child);
        }
        parent.children_mut().remove(position);
        self.base_mut(child).set_parent(None);
    }

    fn attach(&mut self, id: ControlId) {
        self.with_control(id, |node, tree| {
            node.base_mut().mark_attached(id);
            let children: Vec<ControlId> =
                node.base().children().iter().map(|record| record.id).collect();
            for child in children {
                tree.attach(child);
            }
            node.on_attach(tree);
            node.base_mut().emit_attach();
        });
    }

    fn detach(&mut self, id: ControlId) {
        self.with_control(id, |node, tree| {
            let children: Vec<ControlId> =
                node.base().children().iter().map(|record| record.id).collect();
            for child in children.into_iter().rev() {
                tree.detach(child);
            }
            node.on_detach(tree);
            node.base_mut().mark_detached(id);
            node.base_mut().emit_detach();
        });
    }

    /// Schedules a relayout. Panics if `id` is currently inside its own
    /// `layout_children` hook; while the control's layout is suspended the
    /// request is parked instead.
    pub fn relayout(&mut self, id: ControlId) {
        assert!(
            !self.layout_stack.contains(&id),
            "relayout of {:?} requested during its own layout",
            id
        );
        let base = self.base_mut(id);
        if base.is_layout_suspended() {
            base.park_relayout();
            return;
        }
        base.request_relayout();
        if !self.layout_dirty {
            self.layout_dirty = true;
            self.on_update_needed.emit(&());
        }
    }

    /// Pairs with [`ControlTree::resume_layout`]. Nested suspensions stack.
    pub fn suspend_layout(&mut self, id: ControlId) {
        self.base_mut(id).suspend_layout();
    }

    /// Panics when not suspended; a parked relayout is released.
    pub fn resume_layout(&mut self, id: ControlId) {
        if self.base_mut(id).resume_layout() {
            self.relayout(id);
        }
    }

    /// Runs pending layout from the root. A window calls this once per
    /// `on_update_needed` cycle.
    pub fn update(&mut self) {
        if !self.layout_dirty {
            return;
        }
        self.layout_dirty = false;
        if let Some(root) = self.root {
            self.perform_layout(root);
        }
    }

    /// Resizes a control, rerunning its layout when the size changed or a
    /// relayout is pending.
    pub fn set_size(&mut self, id: ControlId, size: Size) {
        let needs_layout = {
            let base = self.base_mut(id);
            let changed = base.size() != size;
            if changed {
                base.store_size(size);
            }
            changed || base.relayout_requested()
        };
        if needs_layout {
            self.perform_layout(id);
            self.base_mut(id).request_redraw();
        }
    }

    /// Runs the control's `layout_children` hook now.
    pub fn perform_layout(&mut self, id: ControlId) {
        self.base_mut(id).clear_relayout_request();
        self.layout_stack.push(id);
        self.with_control(id, |node, tree| {
            node.layout_children(tree);
        });
        self.layout_stack.pop();
    }

    /// Asks the control for its preferred size within `[min, max]`.
    pub fn desired_size(&mut self, id: ControlId, min: Size, max: Size) -> Size {
        self.with_control(id, |node, tree| node.desired_size(tree, min, max))
    }

    /// True when the control or any descendant must repaint.
    pub fn needs_repaint(&self, id: ControlId) -> bool {
        let base = self.base(id);
        if base.redraw_requested() || base.cached_canvas().is_none() {
            return true;
        }
        base.children()
            .iter()
            .any(|record| self.needs_repaint(record.id))
    }

    /// Returns the control's sealed canvas, repainting when needed.
    /// Panics on a zero-sized control; lay the tree out first.
    pub fn draw(&mut self, id: ControlId) -> Arc<Canvas> {
        if !self.needs_repaint(id) {
            if let Some(cached) = self.base(id).cached_canvas() {
                return cached;
            }
        }
        let size = self.base(id).size();
        assert!(
            !size.is_empty(),
            "draw of zero-sized {:?}; run layout before drawing",
            id
        );
        let mut canvas = Canvas::new(size);
        self.with_control(id, |node, tree| {
            node.paint(tree, &mut canvas);
        });
        canvas
            .complete()
            .unwrap_or_else(|e| panic!("paint of {:?} recorded an invalid canvas: {}", id, e));
        let canvas = Arc::new(canvas);
        self.base_mut(id).store_canvas(canvas.clone());
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::{Brush, Color};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn block(tree: &mut ControlTree, w: i32, h: i32) -> ControlId {
        tree.insert(Box::new(Block::new(
            Brush::new(Color::WHITE),
            Size::new(w, h),
        )))
    }

    #[test]
    fn insert_reuses_freed_slots() {
        let mut tree = ControlTree::new();
        let a = block(&mut tree, 10, 10);
        let b = block(&mut tree, 10, 10);
        tree.remove(a);
        let c = block(&mut tree, 10, 10);
        assert_eq!(a, c);
        assert_ne!(b, c);
        assert!(tree.contains(b));
    }

    #[test]
    #[should_panic(expected = "still in the tree")]
    fn removing_a_linked_control_panics() {
        let mut tree = ControlTree::new();
        let parent = block(&mut tree, 100, 100);
        let child = block(&mut tree, 10, 10);
        tree.add_child(parent, child);
        tree.remove(child);
    }

    #[test]
    fn attach_fires_once_per_subtree_node() {
        let mut tree = ControlTree::new();
        let parent = block(&mut tree, 100, 100);
        let child = block(&mut tree, 10, 10);
        tree.add_child(parent, child);
        let attaches = Rc::new(RefCell::new(0));
        let a = attaches.clone();
        let _sub = tree
            .base_mut(child)
            .on_attach_event()
            .listen(move |_| *a.borrow_mut() += 1);
        tree.set_root(parent);
        assert_eq!(*attaches.borrow(), 1);
        assert!(tree.base(child).is_attached());
    }

    #[test]
    #[should_panic(expected = "attached twice")]
    fn double_attach_panics() {
        let mut tree = ControlTree::new();
        let parent = block(&mut tree, 100, 100);
        let child = block(&mut tree, 10, 10);
        tree.set_root(parent);
        tree.add_child(parent, child);
        // Linking an attached control under a second attached parent must
        // trip the attach guard.
        let second = block(&mut tree, 50, 50);
        tree.add_child(parent, second);
        tree.base_mut(child).set_parent(None);
        tree.add_child(second, child);
    }

    #[test]
    fn detach_runs_leaf_first_and_fires_events() {
        let mut tree = ControlTree::new();
        let parent = block(&mut tree, 100, 100);
        let child = block(&mut tree, 10, 10);
        tree.add_child(parent, child);
        tree.set_root(parent);
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        let _s1 = tree
            .base_mut(child)
            .on_detach_event()
            .listen(move |_| o.borrow_mut().push("child"));
        let o = order.clone();
        let _s2 = tree
            .base_mut(parent)
            .on_detach_event()
            .listen(move |_| o.borrow_mut().push("parent"));
        tree.remove_child(parent, child);
        assert_eq!(*order.borrow(), vec!["child"]);
        assert!(!tree.base(child).is_attached());
        assert!(tree.base(child).parent().is_none());
    }

    #[test]
    fn relayout_schedules_one_update_notification() {
        let mut tree = ControlTree::new();
        let root = block(&mut tree, 100, 100);
        tree.set_root(root);
        tree.update();
        let notifications = Rc::new(RefCell::new(0));
        let n = notifications.clone();
        let _sub = tree
            .on_update_needed
            .listen(move |_| *n.borrow_mut() += 1);
        tree.relayout(root);
        tree.relayout(root);
        assert_eq!(*notifications.borrow(), 1);
        tree.update();
        tree.relayout(root);
        assert_eq!(*notifications.borrow(), 2);
    }

    #[test]
    fn suspended_layout_parks_the_request() {
        let mut tree = ControlTree::new();
        let root = block(&mut tree, 100, 100);
        tree.set_root(root);
        tree.update();
        let notifications = Rc::new(RefCell::new(0));
        let n = notifications.clone();
        let _sub = tree
            .on_update_needed
            .listen(move |_| *n.borrow_mut() += 1);
        tree.suspend_layout(root);
        tree.relayout(root);
        assert_eq!(*notifications.borrow(), 0);
        tree.resume_layout(root);
        assert_eq!(*notifications.borrow(), 1);
    }

    #[test]
    #[should_panic(expected = "layout resume")]
    fn unbalanced_resume_panics() {
        let mut tree = ControlTree::new();
        let root = block(&mut tree, 100, 100);
        tree.resume_layout(root);
    }

    struct RelayoutDuringLayout {
        base: ControlBase,
    }

    impl Control for RelayoutDuringLayout {
        fn base(&self) -> &ControlBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ControlBase {
            &mut self.base
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
        fn layout_children(&mut self, tree: &mut ControlTree) {
            let id = self.base.id();
            tree.relayout(id);
        }
    }

    #[test]
    #[should_panic(expected = "during its own layout")]
    fn relayout_inside_layout_children_panics() {
        let mut tree = ControlTree::new();
        let id = tree.insert(Box::new(RelayoutDuringLayout {
            base: ControlBase::new(),
        }));
        tree.set_size(id, Size::new(10, 10));
    }

    #[test]
    fn draw_caches_until_redraw_requested() {
        let mut tree = ControlTree::new();
        let root = block(&mut tree, 100, 100);
        tree.set_root(root);
        tree.set_size(root, Size::new(100, 100));
        let first = tree.draw(root);
        let second = tree.draw(root);
        assert!(Arc::ptr_eq(&first, &second));
        tree.base_mut(root).request_redraw();
        let third = tree.draw(root);
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn child_redraw_invalidates_the_parent() {
        let mut tree = ControlTree::new();
        let parent = block(&mut tree, 100, 100);
        let child = block(&mut tree, 10, 10);
        tree.add_child(parent, child);
        tree.set_root(parent);
        tree.set_size(parent, Size::new(100, 100));
        tree.set_size(child, Size::new(10, 10));
        let first = tree.draw(parent);
        tree.base_mut(child).request_redraw();
        assert!(tree.needs_repaint(parent));
        let second = tree.draw(parent);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn set_size_runs_layout_once_per_change() {
        let layouts = Rc::new(RefCell::new(0));

        struct Counting {
            base: ControlBase,
            layouts: Rc<RefCell<i32>>,
        }
        impl Control for Counting {
            fn base(&self) -> &ControlBase {
                &self.base
            }
            fn base_mut(&mut self) -> &mut ControlBase {
                &mut self.base
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
            fn layout_children(&mut self, _tree: &mut ControlTree) {
                *self.layouts.borrow_mut() += 1;
            }
        }

        let mut tree = ControlTree::new();
        let id = tree.insert(Box::new(Counting {
            base: ControlBase::new(),
            layouts: layouts.clone(),
        }));
        tree.set_size(id, Size::new(50, 50));
        tree.set_size(id, Size::new(50, 50));
        assert_eq!(*layouts.borrow(), 1);
        tree.set_size(id, Size::new(60, 50));
        assert_eq!(*layouts.borrow(), 2);
    }
}
