//! A solid-fill leaf control.

use canvas::{Brush, Canvas};
use geom::{Rect, Size};

use crate::{Control, ControlBase, ControlTree};

/// Fills its bounds with one brush and reports a fixed preferred size.
/// The simplest useful leaf; tests and demos compose trees out of it.
pub struct Block {
    base: ControlBase,
    brush: Brush,
    preferred: Size,
}

impl Block {
    pub fn new(brush: Brush, preferred: Size) -> Self {
        Self {
            base: ControlBase::new(),
            brush,
            preferred,
        }
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
        self.base.request_redraw();
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }
}

impl Control for Block {
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

    fn desired_size(&mut self, _tree: &mut ControlTree, min: Size, max: Size) -> Size {
        self.preferred.min(max).max(min)
    }

    fn paint(&mut self, tree: &mut ControlTree, canvas: &mut Canvas) {
        if self.brush.is_visible() {
            canvas.draw_rect(Rect::from_size(self.base.size()), self.brush);
        }
        self.base.paint_children(tree, canvas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::Color;

    #[test]
    fn desired_size_clamps_to_the_given_bounds() {
        let mut tree = ControlTree::new();
        let id = tree.insert(Box::new(Block::new(
            Brush::new(Color::RED),
            Size::new(50, 50),
        )));
        assert_eq!(
            tree.desired_size(id, Size::ZERO, Size::new(200, 200)),
            Size::new(50, 50)
        );
        assert_eq!(
            tree.desired_size(id, Size::ZERO, Size::new(30, 200)),
            Size::new(30, 50)
        );
        assert_eq!(
            tree.desired_size(id, Size::new(80, 80), Size::new(200, 200)),
            Size::new(80, 80)
        );
    }

    #[test]
    fn changing_the_brush_requests_a_redraw() {
        let mut tree = ControlTree::new();
        let id = tree.insert(Box::new(Block::new(
            Brush::new(Color::RED),
            Size::new(10, 10),
        )));
        tree.set_root(id);
        tree.set_size(id, Size::new(10, 10));
        let _ = tree.draw(id);
        assert!(!tree.needs_repaint(id));
        tree.downcast_mut::<Block>(id)
            .set_brush(Brush::new(Color::GREEN));
        assert!(tree.needs_repaint(id));
    }
}
