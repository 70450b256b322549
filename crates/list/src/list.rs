//! The virtualized item window.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use control::{Control, ControlBase, ControlId, ControlTree};
use events::{Event, Subscription};
use geom::{Point, Size};
use layouts::{Orientation, ScrollBar};

const SCROLL_BAR_THICKNESS: i32 = 8;

struct ItemDetails {
    child: ControlId,
    click_sub: Subscription,
    index: usize,
    mark: u64,
}

/// Instantiates only the adapter rows inside the viewport, reusing the
/// child for a token that stays visible and reaping the rest after every
/// layout pass.
pub struct ListControl<A: crate::Adapter> {
    base: ControlBase,
    adapter: A,
    orientation: Orientation,
    scroll_offset: i32,
    details: HashMap<A::Item, ItemDetails>,
    layout_mark: u64,
    scroll_bar: ControlId,
    selected: Option<A::Item>,
    clicked: Rc<RefCell<Event<A::Item>>>,
    pub on_selection_changed: Event<Option<A::Item>>,
}

impl<A: crate::Adapter> ListControl<A> {
    /// Inserts the list plus its scroll bar into the tree.
    pub fn build(tree: &mut ControlTree, adapter: A, orientation: Orientation) -> ControlId {
        let scroll_bar = tree.insert(Box::new(ScrollBar::new(orientation)));
        let list = tree.insert(Box::new(ListControl {
            base: ControlBase::new(),
            adapter,
            orientation,
            scroll_offset: 0,
            details: HashMap::new(),
            layout_mark: 0,
            scroll_bar,
            selected: None,
            clicked: Rc::new(RefCell::new(Event::new())),
            on_selection_changed: Event::new(),
        }));
        tree.add_child(list, scroll_bar);
        list
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn scroll_offset(&self) -> i32 {
        self.scroll_offset
    }

    pub fn selected(&self) -> Option<&A::Item> {
        self.selected.as_ref()
    }

    pub fn visible_item_count(&self) -> usize {
        self.details.len()
    }

    /// The instantiated child for `item`, when it is in the window.
    pub fn item_control(&self, item: &A::Item) -> Option<ControlId> {
        self.details.get(item).map(|d| d.child)
    }

    pub fn visible_indices(&self) -> Option<(usize, usize)> {
        let min = self.details.values().map(|d| d.index).min()?;
        let max = self.details.values().map(|d| d.index).max()?;
        Some((min, max))
    }

    /// Registers a listener for item clicks.
    pub fn listen_item_clicked(
        &self,
        f: impl FnMut(&A::Item) + 'static,
    ) -> Subscription {
        self.clicked.borrow_mut().listen(f)
    }

    fn major_extents(&self) -> (i32, i32) {
        let inner = self.base.size().contract(self.base.padding());
        let item = self.adapter.item_size();
        match self.orientation {
            Orientation::Vertical => (inner.h, item.h),
            Orientation::Horizontal => (inner.w, item.w),
        }
    }

    fn max_scroll(&self) -> i32 {
        let (major, item_major) = self.major_extents();
        (self.adapter.count() as i32 * item_major - major).max(0)
    }

    /// Scrolls to an absolute major-axis pixel offset, clamped.
    pub fn scroll_to(tree: &mut ControlTree, list: ControlId, offset: i32) {
        let this = tree.downcast_mut::<Self>(list);
        let clamped = offset.clamp(0, this.max_scroll());
        if clamped != this.scroll_offset {
            this.scroll_offset = clamped;
            tree.relayout(list);
        }
    }

    /// Scrolls just far enough that row `index` is fully visible.
    pub fn scroll_into_view(tree: &mut ControlTree, list: ControlId, index: usize) {
        let target = {
            let this = tree.downcast_ref::<Self>(list);
            let (major, item_major) = this.major_extents();
            let top = index as i32 * item_major;
            let bottom = top + item_major;
            if top < this.scroll_offset {
                top
            } else if bottom > this.scroll_offset + major {
                bottom - major
            } else {
                return;
            }
        };
        Self::scroll_to(tree, list, target);
    }

    /// Selects `item` if the adapter contains it, notifies, and scrolls it
    /// into view. Returns whether the selection took.
    pub fn select(tree: &mut ControlTree, list: ControlId, item: Option<A::Item>) -> bool {
        let index = {
            let this = tree.downcast_ref::<Self>(list);
            match &item {
                Some(item) => match this.adapter.item_index(item) {
                    Some(index) => Some(index),
                    None => return false,
                },
                None => None,
            }
        };
        {
            let this = tree.downcast_mut::<Self>(list);
            if this.selected == item {
                return true;
            }
            this.selected = item.clone();
            this.on_selection_changed.emit(&item);
        }
        if let Some(index) = index {
            Self::scroll_into_view(tree, list, index);
        }
        tree.relayout(list);
        true
    }

    pub fn select_next(tree: &mut ControlTree, list: ControlId) {
        Self::select_step(tree, list, 1);
    }

    pub fn select_previous(tree: &mut ControlTree, list: ControlId) {
        Self::select_step(tree, list, -1);
    }

    fn select_step(tree: &mut ControlTree, list: ControlId, step: isize) {
        let next = {
            let this = tree.downcast_ref::<Self>(list);
            let count = this.adapter.count();
            if count == 0 {
                return;
            }
            match this
                .selected
                .as_ref()
                .and_then(|item| this.adapter.item_index(item))
            {
                Some(at) => {
                    let at = (at as isize + step).clamp(0, count as isize - 1) as usize;
                    this.adapter.item_at(at)
                }
                None => this.adapter.item_at(if step > 0 { 0 } else { count - 1 }),
            }
        };
        Self::select(tree, list, Some(next));
    }

    /// Scrolls by one viewport length.
    pub fn page_down(tree: &mut ControlTree, list: ControlId) {
        Self::page(tree, list, 1);
    }

    pub fn page_up(tree: &mut ControlTree, list: ControlId) {
        Self::page(tree, list, -1);
    }

    fn page(tree: &mut ControlTree, list: ControlId, sign: i32) {
        let target = {
            let this = tree.downcast_ref::<Self>(list);
            let (major, _) = this.major_extents();
            this.scroll_offset + sign * major
        };
        Self::scroll_to(tree, list, target);
    }

    /// Rows changed in place; tokens are stable. Re-lays the window.
    pub fn data_changed(tree: &mut ControlTree, list: ControlId) {
        tree.downcast_mut::<Self>(list)
            .adapter
            .events()
            .data_changed
            .emit(&());
        tree.relayout(list);
    }

    /// The token universe changed; every instantiated child is rebuilt and
    /// a vanished selection is dropped.
    pub fn data_replaced(tree: &mut ControlTree, list: ControlId) {
        tree.with_control(list, |node, tree| {
            let this = node
                .as_any_mut()
                .downcast_mut::<Self>()
                .unwrap_or_else(|| panic!("{:?} is not a ListControl", list));
            let details = std::mem::take(&mut this.details);
            for (_, d) in details {
                tree.base_mut(d.child).input.click.forget(d.click_sub);
                tree.release_during_hook(&mut this.base, d.child);
                tree.remove(d.child);
            }
        });
        let stale_selection = {
            let this = tree.downcast_ref::<Self>(list);
            this.selected
                .as_ref()
                .map(|item| this.adapter.item_index(item).is_none())
                .unwrap_or(false)
        };
        if stale_selection {
            Self::select(tree, list, None);
        }
        tree.downcast_mut::<Self>(list)
            .adapter
            .events()
            .data_replaced
            .emit(&());
        tree.relayout(list);
    }
}

impl<A: crate::Adapter> Control for ListControl<A> {
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
        let padding = self.base.padding();
        let inner = self.base.size().contract(padding);
        let origin = Point::new(padding.l, padding.t);
        let (major, item_major) = self.major_extents();
        let count = self.adapter.count();

        if item_major <= 0 || major <= 0 {
            tree.base_mut(self.scroll_bar).set_visible(false);
            return;
        }

        self.scroll_offset = self.scroll_offset.clamp(0, self.max_scroll());
        let start = (self.scroll_offset / item_major) as usize;
        // One beyond the fully visible rows, so a partial row at each end
        // is always backed by a child.
        let window = ((major + item_major - 1) / item_major) as usize + 1;
        let end = count.min(start + window);

        self.layout_mark += 1;
        let mark = self.layout_mark;
        for index in start..end {
            let token = self.adapter.item_at(index);
            let child = match self.details.entry(token.clone()) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    let details = entry.get_mut();
                    assert!(
                        details.mark != mark,
                        "adapter returned duplicate token {:?}",
                        token
                    );
                    details.mark = mark;
                    details.index = index;
                    details.child
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    let child = self.adapter.create(tree, index);
                    tree.adopt_during_hook(&mut self.base, child);
                    let hub = self.clicked.clone();
                    let click_sub = tree
                        .base_mut(child)
                        .input
                        .click
                        .listen(move |_| hub.borrow_mut().emit(&token));
                    entry.insert(ItemDetails {
                        child,
                        click_sub,
                        index,
                        mark,
                    });
                    child
                }
            };

            let margin = tree.base(child).margin();
            let displacement = index as i32 * item_major - self.scroll_offset;
            let (size, at) = match self.orientation {
                Orientation::Vertical => (
                    Size::new((inner.w - margin.horizontal()).max(0), item_major),
                    Point::new(margin.l, displacement),
                ),
                Orientation::Horizontal => (
                    Size::new(item_major, (inner.h - margin.vertical()).max(0)),
                    Point::new(displacement, margin.t),
                ),
            };
            tree.set_size(child, size);
            self.base.set_child_offset(child, origin + at);
        }

        // Reap everything the window moved past.
        let stale: Vec<A::Item> = self
            .details
            .iter()
            .filter(|(_, d)| d.mark != mark)
            .map(|(token, _)| token.clone())
            .collect();
        if !stale.is_empty() {
            tracing::trace!(reaped = stale.len(), "list window reap");
        }
        for token in stale {
            let details = self
                .details
                .remove(&token)
                .unwrap_or_else(|| panic!("stale token vanished from the detail map"));
            tree.base_mut(details.child)
                .input
                .click
                .forget(details.click_sub);
            tree.release_during_hook(&mut self.base, details.child);
            tree.remove(details.child);
        }

        // Scroll bar on the trailing edge, only for a proper sub-window.
        let bar_needed = start > 0 || end < count;
        tree.base_mut(self.scroll_bar).set_visible(bar_needed);
        if bar_needed {
            let (size, at) = match self.orientation {
                Orientation::Vertical => (
                    Size::new(SCROLL_BAR_THICKNESS, inner.h),
                    Point::new(inner.w - SCROLL_BAR_THICKNESS, 0),
                ),
                Orientation::Horizontal => (
                    Size::new(inner.w, SCROLL_BAR_THICKNESS),
                    Point::new(0, inner.h - SCROLL_BAR_THICKNESS),
                ),
            };
            tree.set_size(self.scroll_bar, size);
            self.base.set_child_offset(self.scroll_bar, origin + at);
            let offset = self.scroll_offset;
            let limit = count as i32 * item_major;
            let bar = tree.downcast_mut::<ScrollBar>(self.scroll_bar);
            bar.set_scroll_limit(limit);
            bar.set_scroll_position(offset);
        }
    }
}
