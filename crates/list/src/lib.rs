//! # Kestrel List
//!
//! Virtualized item controls: only the visible window of an adapter's
//! items is ever instantiated. [`ListControl`] does the windowing;
//! [`TreeAdapter`] flattens an expandable node model onto it.

mod list;
mod tree;

pub use list::ListControl;
pub use tree::{NodeAdapter, TreeAdapter, INDENT_PER_DEPTH};

use events::Event;
use geom::Size;

use control::{ControlId, ControlTree};

/// Data source for a [`ListControl`].
///
/// `Item` is an equality-stable token: the same logical row must yield an
/// equal token across data changes, and two live rows must never compare
/// equal. The virtualizer keys its child map by it.
pub trait Adapter: 'static {
    type Item: std::hash::Hash + Eq + Clone + std::fmt::Debug;

    fn count(&self) -> usize;
    fn item_at(&self, index: usize) -> Self::Item;
    fn item_index(&self, item: &Self::Item) -> Option<usize>;
    /// Builds the control for one row. The list parents and positions it.
    fn create(&self, tree: &mut ControlTree, index: usize) -> ControlId;
    /// Uniform per-row extent.
    fn item_size(&self) -> Size;

    fn events(&mut self) -> &mut AdapterEvents;
}

/// Change notifications every adapter carries.
///
/// `data_changed` means rows changed in place (tokens stable);
/// `data_replaced` means the token universe changed and instantiated
/// children must be rebuilt.
pub struct AdapterEvents {
    pub data_changed: Event<()>,
    pub data_replaced: Event<()>,
}

impl Default for AdapterEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterEvents {
    pub fn new() -> Self {
        Self {
            data_changed: Event::new(),
            data_replaced: Event::new(),
        }
    }
}
