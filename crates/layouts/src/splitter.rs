//! Weighted panes separated by draggable bars.

use canvas::{Brush, Canvas, Color};
use control::{Control, ControlBase, ControlId, ControlTree};
use geom::{Point, Rect, Size};

pub const DEFAULT_BAR_WIDTH: i32 = 4;

/// Axis along which panes are placed (and bars dragged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// The grab handle between two panes.
pub struct SplitterBar {
    base: ControlBase,
    brush: Brush,
}

impl SplitterBar {
    pub fn new() -> Self {
        Self {
            base: ControlBase::new(),
            brush: Brush::new(Color::gray(0.5)),
        }
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
        self.base.request_redraw();
    }
}

impl Default for SplitterBar {
    fn default() -> Self {
        Self::new()
    }
}

impl Control for SplitterBar {
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

    fn paint(&mut self, _tree: &mut ControlTree, canvas: &mut Canvas) {
        canvas.draw_rect(Rect::from_size(self.base.size()), self.brush);
    }
}

/// Divides the major axis between panes in proportion to their weights;
/// a [`SplitterBar`] sits between each adjacent pair.
pub struct SplitterLayout {
    base: ControlBase,
    orientation: Orientation,
    bar_width: i32,
    panes: Vec<ControlId>,
    bars: Vec<ControlId>,
    weights: Vec<f32>,
}

impl SplitterLayout {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            base: ControlBase::new(),
            orientation,
            bar_width: DEFAULT_BAR_WIDTH,
            panes: Vec::new(),
            bars: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_bar_width(&mut self, bar_width: i32) {
        assert!(bar_width >= 0, "bar width must be non-negative");
        self.bar_width = bar_width;
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn panes(&self) -> &[ControlId] {
        &self.panes
    }

    pub fn bars(&self) -> &[ControlId] {
        &self.bars
    }

    /// Appends a pane with weight 1, inserting a bar before it when it is
    /// not the first.
    pub fn add_pane(tree: &mut ControlTree, splitter: ControlId, pane: ControlId) {
        let needs_bar = !tree
            .downcast_ref::<SplitterLayout>(splitter)
            .panes
            .is_empty();
        if needs_bar {
            let bar = tree.insert(Box::new(SplitterBar::new()));
            tree.add_child(splitter, bar);
            tree.downcast_mut::<SplitterLayout>(splitter).bars.push(bar);
        }
        tree.add_child(splitter, pane);
        let this = tree.downcast_mut::<SplitterLayout>(splitter);
        this.panes.push(pane);
        this.weights.push(1.0);
    }

    /// Removes a pane and its neighboring bar.
    pub fn remove_pane(tree: &mut ControlTree, splitter: ControlId, pane: ControlId) {
        let (at, bar) = {
            let this = tree.downcast_ref::<SplitterLayout>(splitter);
            let at = this
                .panes
                .iter()
                .position(|&p| p == pane)
                .unwrap_or_else(|| panic!("{:?} is not a pane of this splitter", pane));
            let bar = if this.bars.is_empty() {
                None
            } else {
                Some(this.bars[at.saturating_sub(1).min(this.bars.len() - 1)])
            };
            (at, bar)
        };
        tree.remove_child(splitter, pane);
        if let Some(bar) = bar {
            tree.remove_child(splitter, bar);
            tree.remove(bar);
        }
        let this = tree.downcast_mut::<SplitterLayout>(splitter);
        this.panes.remove(at);
        this.weights.remove(at);
        if let Some(bar) = bar {
            this.bars.retain(|&b| b != bar);
        }
    }

    /// Explicit weight assignment; panics on length mismatch or a
    /// non-positive weight.
    pub fn set_weights(tree: &mut ControlTree, splitter: ControlId, weights: &[f32]) {
        {
            let this = tree.downcast_mut::<SplitterLayout>(splitter);
            assert_eq!(
                weights.len(),
                this.panes.len(),
                "one weight per pane required"
            );
            assert!(
                weights.iter().all(|&w| w > 0.0),
                "weights must be positive"
            );
            this.weights = weights.to_vec();
        }
        tree.relayout(splitter);
    }

    /// Drags bar `bar_index` so its leading edge lands at `position` on the
    /// major axis (splitter-local). The two adjacent weights are recomputed
    /// by a saturating ramp over their combined span; their sum is
    /// conserved, so every other pane keeps its extent.
    pub fn drag_bar(
        tree: &mut ControlTree,
        splitter: ControlId,
        bar_index: usize,
        position: i32,
    ) {
        {
            let this = tree.downcast_mut::<SplitterLayout>(splitter);
            assert!(bar_index < this.bars.len(), "no bar {}", bar_index);
            let extents = this.pane_extents();
            let span_start: i32 = extents[..bar_index]
                .iter()
                .map(|e| e + this.bar_width)
                .sum();
            // The two panes plus the bar between them.
            let span_len = extents[bar_index] + this.bar_width + extents[bar_index + 1];
            let frac = geom::ramp(position as f32, span_start as f32, (span_start + span_len) as f32);
            let combined = this.weights[bar_index] + this.weights[bar_index + 1];
            this.weights[bar_index] = combined * frac;
            this.weights[bar_index + 1] = combined * (1.0 - frac);
            tracing::trace!(bar_index, position, weights = ?this.weights, "splitter bar dragged");
        }
        tree.relayout(splitter);
    }

    /// Current pane extents on the major axis, in pane order.
    fn pane_extents(&self) -> Vec<i32> {
        let inner = self.base.size().contract(self.base.padding());
        let major = match self.orientation {
            Orientation::Horizontal => inner.w,
            Orientation::Vertical => inner.h,
        };
        let available = (major - self.bar_width * self.bars.len() as i32).max(0);
        let total: f32 = self.weights.iter().sum();
        if total <= 0.0 || self.panes.is_empty() {
            return vec![0; self.panes.len()];
        }
        let mut extents = Vec::with_capacity(self.panes.len());
        let mut used = 0;
        for (i, &weight) in self.weights.iter().enumerate() {
            let extent = if i + 1 == self.weights.len() {
                available - used
            } else {
                (available as f32 * weight / total).round() as i32
            };
            extents.push(extent.max(0));
            used += extent;
        }
        extents
    }
}

impl Control for SplitterLayout {
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
        let extents = self.pane_extents();
        let mut cursor = 0;
        for (i, (&pane, &extent)) in self.panes.iter().zip(&extents).enumerate() {
            let size = match self.orientation {
                Orientation::Horizontal => Size::new(extent, inner.h),
                Orientation::Vertical => Size::new(inner.w, extent),
            };
            let at = match self.orientation {
                Orientation::Horizontal => Point::new(cursor, 0),
                Orientation::Vertical => Point::new(0, cursor),
            };
            tree.set_size(pane, size);
            self.base.set_child_offset(pane, origin + at);
            cursor += extent;
            if i < self.bars.len() {
                let bar = self.bars[i];
                let bar_size = match self.orientation {
                    Orientation::Horizontal => Size::new(self.bar_width, inner.h),
                    Orientation::Vertical => Size::new(inner.w, self.bar_width),
                };
                let bar_at = match self.orientation {
                    Orientation::Horizontal => Point::new(cursor, 0),
                    Orientation::Vertical => Point::new(0, cursor),
                };
                tree.set_size(bar, bar_size);
                self.base.set_child_offset(bar, origin + bar_at);
                cursor += self.bar_width;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::{Brush, Color};
    use control::Block;

    fn split_in_two(bar_width: i32) -> (ControlTree, ControlId, [ControlId; 2]) {
        let mut tree = ControlTree::new();
        let splitter = tree.insert(Box::new(SplitterLayout::new(Orientation::Horizontal)));
        tree.downcast_mut::<SplitterLayout>(splitter).set_bar_width(bar_width);
        let a = tree.insert(Box::new(Block::new(
            Brush::new(Color::RED),
            Size::new(10, 10),
        )));
        let b = tree.insert(Box::new(Block::new(
            Brush::new(Color::BLUE),
            Size::new(10, 10),
        )));
        tree.set_root(splitter);
        SplitterLayout::add_pane(&mut tree, splitter, a);
        SplitterLayout::add_pane(&mut tree, splitter, b);
        tree.set_size(splitter, Size::new(200, 100));
        tree.update();
        (tree, splitter, [a, b])
    }

    #[test]
    fn equal_weights_halve_the_major_axis() {
        let (tree, splitter, [a, b]) = split_in_two(0);
        assert_eq!(tree.base(a).size(), Size::new(100, 100));
        assert_eq!(tree.base(b).size(), Size::new(100, 100));
        assert_eq!(tree.base(splitter).child_offset(b), Point::new(100, 0));
    }

    #[test]
    fn a_bar_drag_conserves_total_weight() {
        let (mut tree, splitter, [a, b]) = split_in_two(0);
        SplitterLayout::drag_bar(&mut tree, splitter, 0, 50);
        {
            let this = tree.downcast_ref::<SplitterLayout>(splitter);
            assert!((this.weights()[0] - 0.5).abs() < 1e-6);
            assert!((this.weights()[1] - 1.5).abs() < 1e-6);
        }
        tree.update();
        assert_eq!(tree.base(a).size().w, 50);
        assert_eq!(tree.base(b).size().w, 150);
    }

    #[test]
    fn the_bar_width_is_excluded_from_pane_space() {
        let (tree, splitter, [a, b]) = split_in_two(10);
        assert_eq!(tree.base(a).size().w, 95);
        assert_eq!(tree.base(b).size().w, 95);
        let bar = tree.downcast_ref::<SplitterLayout>(splitter).bars()[0];
        assert_eq!(tree.base(bar).size(), Size::new(10, 100));
        assert_eq!(tree.base(splitter).child_offset(bar), Point::new(95, 0));
    }

    #[test]
    fn drags_saturate_at_the_span_edges() {
        let (mut tree, splitter, [a, b]) = split_in_two(0);
        SplitterLayout::drag_bar(&mut tree, splitter, 0, -40);
        tree.update();
        assert_eq!(tree.base(a).size().w, 0);
        assert_eq!(tree.base(b).size().w, 200);
        SplitterLayout::drag_bar(&mut tree, splitter, 0, 900);
        tree.update();
        assert_eq!(tree.base(a).size().w, 200);
        assert_eq!(tree.base(b).size().w, 0);
    }

    #[test]
    fn removing_a_pane_also_removes_its_bar() {
        let (mut tree, splitter, [a, b]) = split_in_two(10);
        SplitterLayout::remove_pane(&mut tree, splitter, b);
        tree.update();
        let this = tree.downcast_ref::<SplitterLayout>(splitter);
        assert_eq!(this.panes(), &[a]);
        assert!(this.bars().is_empty());
        assert_eq!(tree.base(a).size().w, 200);
    }

    #[test]
    #[should_panic(expected = "one weight per pane")]
    fn mismatched_weight_list_panics() {
        let (mut tree, splitter, _) = split_in_two(0);
        SplitterLayout::set_weights(&mut tree, splitter, &[1.0]);
    }
}
