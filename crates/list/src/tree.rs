//! Expandable node model flattened onto the list virtualizer.

use std::collections::HashSet;

use control::{ControlId, ControlTree};
use geom::{Size, Spacing};

use crate::{Adapter, AdapterEvents};

/// Left margin added per nesting level of a tree row.
pub const INDENT_PER_DEPTH: i32 = 16;

/// Hierarchical data source. `None` is the invisible root.
pub trait NodeAdapter: 'static {
    type Item: std::hash::Hash + Eq + Clone + std::fmt::Debug;

    fn child_count(&self, parent: Option<&Self::Item>) -> usize;
    fn child_at(&self, parent: Option<&Self::Item>, index: usize) -> Self::Item;
    fn create(&self, tree: &mut ControlTree, item: &Self::Item, depth: usize) -> ControlId;
    fn item_size(&self) -> Size;
}

/// Projects the expanded portion of a [`NodeAdapter`] as a flat
/// [`Adapter`], so a [`crate::ListControl`] virtualizes it unchanged.
/// Rows are indented by depth via their margin.
///
/// After `toggle`/`expand`/`collapse`, run
/// [`crate::ListControl::data_changed`] on the hosting list.
pub struct TreeAdapter<N: NodeAdapter> {
    nodes: N,
    expanded: HashSet<N::Item>,
    flat: Vec<(N::Item, usize)>,
    events: AdapterEvents,
}

impl<N: NodeAdapter> TreeAdapter<N> {
    pub fn new(nodes: N) -> Self {
        let mut adapter = Self {
            nodes,
            expanded: HashSet::new(),
            flat: Vec::new(),
            events: AdapterEvents::new(),
        };
        adapter.reflatten();
        adapter
    }

    pub fn nodes(&self) -> &N {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut N {
        &mut self.nodes
    }

    pub fn is_expanded(&self, item: &N::Item) -> bool {
        self.expanded.contains(item)
    }

    /// Depth of a visible row, when currently flattened in.
    pub fn depth_of(&self, item: &N::Item) -> Option<usize> {
        self.flat
            .iter()
            .find(|(i, _)| i == item)
            .map(|&(_, depth)| depth)
    }

    pub fn expand(&mut self, item: N::Item) {
        if self.expanded.insert(item) {
            self.reflatten();
        }
    }

    pub fn collapse(&mut self, item: &N::Item) {
        if self.expanded.remove(item) {
            self.reflatten();
        }
    }

    pub fn toggle(&mut self, item: N::Item) {
        if self.expanded.contains(&item) {
            self.collapse(&item);
        } else {
            self.expand(item);
        }
    }

    /// Call after mutating the underlying nodes directly.
    pub fn reflatten(&mut self) {
        self.flat.clear();
        // Split borrows; the walk reads nodes/expanded and writes flat.
        let nodes = &self.nodes;
        let expanded = &self.expanded;
        let flat = &mut self.flat;
        fn walk<N: NodeAdapter>(
            nodes: &N,
            expanded: &HashSet<N::Item>,
            parent: Option<&N::Item>,
            depth: usize,
            flat: &mut Vec<(N::Item, usize)>,
        ) {
            for index in 0..nodes.child_count(parent) {
                let item = nodes.child_at(parent, index);
                flat.push((item.clone(), depth));
                if expanded.contains(&item) {
                    walk(nodes, expanded, Some(&item), depth + 1, flat);
                }
            }
        }
        walk(nodes, expanded, None, 0, flat);
    }
}

impl<N: NodeAdapter> Adapter for TreeAdapter<N> {
    type Item = N::Item;

    fn count(&self) -> usize {
        self.flat.len()
    }

    fn item_at(&self, index: usize) -> N::Item {
        self.flat[index].0.clone()
    }

    fn item_index(&self, item: &N::Item) -> Option<usize> {
        self.flat.iter().position(|(i, _)| i == item)
    }

    fn create(&self, tree: &mut ControlTree, index: usize) -> ControlId {
        let (item, depth) = &self.flat[index];
        let child = self.nodes.create(tree, item, *depth);
        let mut margin = tree.base(child).margin();
        margin.l += *depth as i32 * INDENT_PER_DEPTH;
        tree.base_mut(child).set_margin(margin);
        child
    }

    fn item_size(&self) -> Size {
        self.nodes.item_size()
    }

    fn events(&mut self) -> &mut AdapterEvents {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ListControl;
    use canvas::{Brush, Color};
    use control::Block;
    use geom::Point;
    use layouts::Orientation;

    /// Two roots; "a" has children "a/x" and "a/y"; "a/x" has "a/x/1".
    struct Paths;

    impl Paths {
        fn children(parent: Option<&String>) -> Vec<String> {
            match parent.map(String::as_str) {
                None => vec!["a".into(), "b".into()],
                Some("a") => vec!["a/x".into(), "a/y".into()],
                Some("a/x") => vec!["a/x/1".into()],
                _ => Vec::new(),
            }
        }
    }

    impl NodeAdapter for Paths {
        type Item = String;

        fn child_count(&self, parent: Option<&String>) -> usize {
            Self::children(parent).len()
        }

        fn child_at(&self, parent: Option<&String>, index: usize) -> String {
            Self::children(parent)[index].clone()
        }

        fn create(&self, tree: &mut ControlTree, _item: &String, _depth: usize) -> ControlId {
            tree.insert(Box::new(Block::new(
                Brush::new(Color::WHITE),
                Size::new(10, 20),
            )))
        }

        fn item_size(&self) -> Size {
            Size::new(10, 20)
        }
    }

    #[test]
    fn collapsed_roots_flatten_to_the_top_level() {
        let adapter = TreeAdapter::new(Paths);
        assert_eq!(adapter.count(), 2);
        assert_eq!(adapter.item_at(0), "a");
        assert_eq!(adapter.item_at(1), "b");
    }

    #[test]
    fn expanding_splices_children_after_their_parent() {
        let mut adapter = TreeAdapter::new(Paths);
        adapter.expand("a".to_string());
        assert_eq!(adapter.count(), 4);
        assert_eq!(adapter.item_at(1), "a/x");
        assert_eq!(adapter.item_at(2), "a/y");
        assert_eq!(adapter.item_at(3), "b");
        adapter.expand("a/x".to_string());
        assert_eq!(adapter.count(), 5);
        assert_eq!(adapter.item_at(2), "a/x/1");
        assert_eq!(adapter.depth_of(&"a/x/1".to_string()), Some(2));
        adapter.collapse(&"a".to_string());
        // "a/x" stays marked expanded but is no longer visible.
        assert_eq!(adapter.count(), 2);
        assert!(adapter.is_expanded(&"a/x".to_string()));
    }

    #[test]
    fn rows_indent_by_depth_inside_a_list() {
        let mut tree = ControlTree::new();
        let mut adapter = TreeAdapter::new(Paths);
        adapter.expand("a".to_string());
        let list = ListControl::build(&mut tree, adapter, Orientation::Vertical);
        tree.set_root(list);
        tree.set_size(list, Size::new(100, 200));
        tree.update();
        let this = tree.downcast_ref::<ListControl<TreeAdapter<Paths>>>(list);
        let root_row = this.item_control(&"a".to_string()).unwrap();
        let child_row = this.item_control(&"a/x".to_string()).unwrap();
        let base = tree.base(list);
        assert_eq!(base.child_offset(root_row), Point::new(0, 0));
        assert_eq!(
            base.child_offset(child_row),
            Point::new(INDENT_PER_DEPTH, 20)
        );
        assert_eq!(tree.base(child_row).size().w, 100 - INDENT_PER_DEPTH);
    }

    #[test]
    fn toggling_through_the_list_relayouts_the_window() {
        let mut tree = ControlTree::new();
        let list = ListControl::build(&mut tree, TreeAdapter::new(Paths), Orientation::Vertical);
        tree.set_root(list);
        tree.set_size(list, Size::new(100, 200));
        tree.update();
        tree.downcast_mut::<ListControl<TreeAdapter<Paths>>>(list)
            .adapter_mut()
            .toggle("a".to_string());
        ListControl::<TreeAdapter<Paths>>::data_changed(&mut tree, list);
        tree.update();
        let this = tree.downcast_ref::<ListControl<TreeAdapter<Paths>>>(list);
        assert_eq!(this.visible_item_count(), 4);
        assert!(this.item_control(&"a/y".to_string()).is_some());
    }
}
