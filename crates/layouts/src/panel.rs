//! Tabbed panel container.

use control::{Control, ControlBase, ControlId, ControlTree};
use events::Event;
use geom::{Point, Size};

const TAB_BAR_HEIGHT: i32 = 24;

struct PanelEntry {
    panel: ControlId,
    tab: ControlId,
}

/// A row of tabs over one visible panel.
///
/// Tabs are caller-supplied controls (so they can carry labels, close
/// buttons, whatever); the holder owns selection and the drag protocol
/// for moving a panel between holders in the same window.
pub struct PanelHolder {
    base: ControlBase,
    entries: Vec<PanelEntry>,
    selected: Option<usize>,
    pub on_selected: Event<Option<usize>>,
}

impl PanelHolder {
    pub fn new() -> Self {
        Self {
            base: ControlBase::new(),
            entries: Vec::new(),
            selected: None,
            on_selected: Event::new(),
        }
    }

    pub fn panel_count(&self) -> usize {
        self.entries.len()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn panel_at(&self, index: usize) -> ControlId {
        self.entries[index].panel
    }

    pub fn tab_at(&self, index: usize) -> ControlId {
        self.entries[index].tab
    }

    /// Appends a panel with its tab; the first panel becomes selected.
    pub fn add_panel(tree: &mut ControlTree, holder: ControlId, panel: ControlId, tab: ControlId) {
        let at = tree.downcast_ref::<PanelHolder>(holder).entries.len();
        Self::insert_panel(tree, holder, at, panel, tab);
    }

    pub fn insert_panel(
        tree: &mut ControlTree,
        holder: ControlId,
        at: usize,
        panel: ControlId,
        tab: ControlId,
    ) {
        tree.add_child(holder, tab);
        tree.add_child(holder, panel);
        tree.base_mut(panel).set_visible(false);
        let select_first = {
            let this = tree.downcast_mut::<PanelHolder>(holder);
            this.entries.insert(at, PanelEntry { panel, tab });
            if let Some(selected) = this.selected.as_mut() {
                if at <= *selected {
                    *selected += 1;
                }
            }
            this.selected.is_none()
        };
        if select_first {
            Self::select(tree, holder, Some(at));
        }
    }

    /// Unlinks the panel and tab at `index` and returns them, still
    /// resident in the tree, ready for re-insertion elsewhere.
    pub fn remove_panel(
        tree: &mut ControlTree,
        holder: ControlId,
        index: usize,
    ) -> (ControlId, ControlId) {
        let (panel, tab, reselect) = {
            let this = tree.downcast_mut::<PanelHolder>(holder);
            let entry = this.entries.remove(index);
            let reselect = match this.selected {
                Some(s) if s == index => {
                    this.selected = None;
                    if this.entries.is_empty() {
                        Some(None)
                    } else {
                        Some(Some(index.min(this.entries.len() - 1)))
                    }
                }
                Some(s) if s > index => {
                    this.selected = Some(s - 1);
                    None
                }
                _ => None,
            };
            (entry.panel, entry.tab, reselect)
        };
        tree.remove_child(holder, panel);
        tree.remove_child(holder, tab);
        tree.base_mut(panel).set_visible(true);
        if let Some(target) = reselect {
            Self::select(tree, holder, target);
        }
        (panel, tab)
    }

    /// Shows one panel, hides the rest, fires `on_selected`.
    pub fn select(tree: &mut ControlTree, holder: ControlId, index: Option<usize>) {
        {
            let this = tree.downcast_ref::<PanelHolder>(holder);
            if let Some(index) = index {
                assert!(index < this.entries.len(), "no panel {}", index);
            }
            if this.selected == index {
                return;
            }
        }
        let panels: Vec<ControlId> = tree
            .downcast_ref::<PanelHolder>(holder)
            .entries
            .iter()
            .map(|e| e.panel)
            .collect();
        for (i, panel) in panels.into_iter().enumerate() {
            tree.base_mut(panel).set_visible(index == Some(i));
        }
        tree.downcast_mut::<PanelHolder>(holder).selected = index;
        tree.downcast_mut::<PanelHolder>(holder)
            .on_selected
            .emit(&index);
        tree.relayout(holder);
    }

    /// Tab-drag target slot for a drop at holder-local `x`: the index of
    /// the first tab whose midpoint lies right of `x`.
    pub fn insertion_index(tree: &ControlTree, holder: ControlId, x: i32) -> usize {
        let this = tree.downcast_ref::<PanelHolder>(holder);
        for (i, entry) in this.entries.iter().enumerate() {
            let at = this.base.child_offset(entry.tab).x;
            let mid = at + tree.base(entry.tab).size().w / 2;
            if x < mid {
                return i;
            }
        }
        this.entries.len()
    }

    /// Moves a panel (and its tab) from one holder to another in the same
    /// tree, selecting it at its new home.
    pub fn move_panel(
        tree: &mut ControlTree,
        from: ControlId,
        index: usize,
        to: ControlId,
        insert_at: usize,
    ) {
        let (panel, tab) = Self::remove_panel(tree, from, index);
        Self::insert_panel(tree, to, insert_at, panel, tab);
        Self::select(tree, to, Some(insert_at));
    }
}

impl Default for PanelHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for PanelHolder {
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

        let mut x = 0;
        for entry in &self.entries {
            let max = Size::new((inner.w - x).max(0), TAB_BAR_HEIGHT);
            let desired = tree.desired_size(entry.tab, Size::ZERO, max);
            tree.set_size(entry.tab, desired);
            self.base
                .set_child_offset(entry.tab, origin + Point::new(x, 0));
            x += desired.w;
        }

        if let Some(selected) = self.selected {
            let panel = self.entries[selected].panel;
            let body = Size::new(inner.w, (inner.h - TAB_BAR_HEIGHT).max(0));
            tree.set_size(panel, body);
            self.base
                .set_child_offset(panel, origin + Point::new(0, TAB_BAR_HEIGHT));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::{Brush, Color};
    use control::Block;

    fn tab(tree: &mut ControlTree, w: i32) -> ControlId {
        tree.insert(Box::new(Block::new(
            Brush::new(Color::gray(0.3)),
            Size::new(w, TAB_BAR_HEIGHT),
        )))
    }

    fn panel(tree: &mut ControlTree) -> ControlId {
        tree.insert(Box::new(Block::new(
            Brush::new(Color::WHITE),
            Size::new(10, 10),
        )))
    }

    fn holder_with(tree: &mut ControlTree, tabs: &[i32]) -> ControlId {
        let holder = tree.insert(Box::new(PanelHolder::new()));
        for &w in tabs {
            let t = tab(tree, w);
            let p = panel(tree);
            PanelHolder::add_panel(tree, holder, p, t);
        }
        holder
    }

    #[test]
    fn the_first_panel_is_selected_and_visible() {
        let mut tree = ControlTree::new();
        let holder = holder_with(&mut tree, &[40, 40]);
        tree.set_root(holder);
        tree.set_size(holder, Size::new(200, 124));
        let this = tree.downcast_ref::<PanelHolder>(holder);
        assert_eq!(this.selected(), Some(0));
        let (p0, p1) = (this.panel_at(0), this.panel_at(1));
        assert!(tree.base(p0).is_visible());
        assert!(!tree.base(p1).is_visible());
        assert_eq!(tree.base(p0).size(), Size::new(200, 100));
        assert_eq!(tree.base(holder).child_offset(p0), Point::new(0, TAB_BAR_HEIGHT));
    }

    #[test]
    fn tabs_stack_left_to_right() {
        let mut tree = ControlTree::new();
        let holder = holder_with(&mut tree, &[40, 60, 30]);
        tree.set_root(holder);
        tree.set_size(holder, Size::new(200, 124));
        let this = tree.downcast_ref::<PanelHolder>(holder);
        let base = tree.base(holder);
        assert_eq!(base.child_offset(this.tab_at(0)), Point::new(0, 0));
        assert_eq!(base.child_offset(this.tab_at(1)), Point::new(40, 0));
        assert_eq!(base.child_offset(this.tab_at(2)), Point::new(100, 0));
    }

    #[test]
    fn selecting_swaps_visibility_and_notifies() {
        let mut tree = ControlTree::new();
        let holder = holder_with(&mut tree, &[40, 40]);
        tree.set_root(holder);
        tree.set_size(holder, Size::new(200, 124));
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let s = seen.clone();
        let _sub = tree
            .downcast_mut::<PanelHolder>(holder)
            .on_selected
            .listen(move |&i| s.borrow_mut().push(i));
        PanelHolder::select(&mut tree, holder, Some(1));
        let this = tree.downcast_ref::<PanelHolder>(holder);
        assert!(!tree.base(this.panel_at(0)).is_visible());
        assert!(tree.base(this.panel_at(1)).is_visible());
        assert_eq!(*seen.borrow(), vec![Some(1)]);
    }

    #[test]
    fn insertion_index_uses_tab_midpoints() {
        let mut tree = ControlTree::new();
        let holder = holder_with(&mut tree, &[40, 40]);
        tree.set_root(holder);
        tree.set_size(holder, Size::new(200, 124));
        assert_eq!(PanelHolder::insertion_index(&tree, holder, 10), 0);
        assert_eq!(PanelHolder::insertion_index(&tree, holder, 30), 1);
        assert_eq!(PanelHolder::insertion_index(&tree, holder, 70), 2);
        assert_eq!(PanelHolder::insertion_index(&tree, holder, 150), 2);
    }

    #[test]
    fn a_panel_drags_to_another_holder() {
        let mut tree = ControlTree::new();
        let root = tree.insert(Box::new(Block::new(
            Brush::new(Color::BLACK),
            Size::new(400, 200),
        )));
        let left = holder_with(&mut tree, &[40, 40]);
        let right = holder_with(&mut tree, &[40]);
        tree.add_child(root, left);
        tree.add_child(root, right);
        tree.set_root(root);
        tree.set_size(left, Size::new(200, 124));
        tree.set_size(right, Size::new(200, 124));
        let moved = tree.downcast_ref::<PanelHolder>(left).panel_at(1);
        PanelHolder::move_panel(&mut tree, left, 1, right, 0);
        let l = tree.downcast_ref::<PanelHolder>(left);
        let r = tree.downcast_ref::<PanelHolder>(right);
        assert_eq!(l.panel_count(), 1);
        assert_eq!(r.panel_count(), 2);
        assert_eq!(r.panel_at(0), moved);
        assert_eq!(r.selected(), Some(0));
        assert!(tree.base(moved).is_visible());
    }

    #[test]
    fn removing_the_selected_panel_reselects_a_neighbor() {
        let mut tree = ControlTree::new();
        let holder = holder_with(&mut tree, &[40, 40, 40]);
        tree.set_root(holder);
        tree.set_size(holder, Size::new(200, 124));
        PanelHolder::select(&mut tree, holder, Some(2));
        let _ = PanelHolder::remove_panel(&mut tree, holder, 2);
        let this = tree.downcast_ref::<PanelHolder>(holder);
        assert_eq!(this.selected(), Some(1));
        assert!(tree.base(this.panel_at(1)).is_visible());
    }
}
