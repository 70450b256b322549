//! Scrollable single-child container with auto-hiding bars.

use canvas::{Brush, Canvas, Color};
use control::{Control, ControlBase, ControlId, ControlTree};
use events::Event;
use geom::{Point, Rect, Size};

use crate::Orientation;

/// Major-axis extent offered to the child on axes that can scroll.
const UNBOUNDED: i32 = 1 << 20;

const BAR_THICKNESS: i32 = 8;

/// Rail plus proportional thumb along one axis.
///
/// Pure state and painting; the hosting layout drives `scroll_position`
/// and `scroll_limit`.
pub struct ScrollBar {
    base: ControlBase,
    orientation: Orientation,
    scroll_position: i32,
    scroll_limit: i32,
    rail: Brush,
    thumb: Brush,
    pub on_scroll: Event<i32>,
}

impl ScrollBar {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            base: ControlBase::new(),
            orientation,
            scroll_position: 0,
            scroll_limit: 0,
            rail: Brush::new(Color::gray(0.15)),
            thumb: Brush::new(Color::gray(0.4)),
            on_scroll: Event::new(),
        }
    }

    pub fn scroll_position(&self) -> i32 {
        self.scroll_position
    }

    pub fn scroll_limit(&self) -> i32 {
        self.scroll_limit
    }

    /// Clamps into `[0, limit - viewport]` and fires `on_scroll` on change.
    pub fn set_scroll_position(&mut self, position: i32) {
        let clamped = position.clamp(0, self.max_scroll());
        if clamped != self.scroll_position {
            self.scroll_position = clamped;
            self.base.request_redraw();
            self.on_scroll.emit(&clamped);
        }
    }

    /// `limit` is the content extent; the viewport extent is this bar's
    /// own major-axis length.
    pub fn set_scroll_limit(&mut self, limit: i32) {
        if limit != self.scroll_limit {
            self.scroll_limit = limit;
            self.scroll_position = self.scroll_position.clamp(0, self.max_scroll());
            self.base.request_redraw();
        }
    }

    fn viewport_extent(&self) -> i32 {
        match self.orientation {
            Orientation::Horizontal => self.base.size().w,
            Orientation::Vertical => self.base.size().h,
        }
    }

    fn max_scroll(&self) -> i32 {
        (self.scroll_limit - self.viewport_extent()).max(0)
    }

    fn thumb_rect(&self) -> Rect {
        let extent = self.viewport_extent();
        if self.scroll_limit <= 0 || extent <= 0 {
            return Rect::ZERO;
        }
        let len = ((extent as i64 * extent as i64) / self.scroll_limit.max(1) as i64) as i32;
        let len = len.clamp(BAR_THICKNESS, extent);
        let travel = extent - len;
        let at = if self.max_scroll() == 0 {
            0
        } else {
            (travel as i64 * self.scroll_position as i64 / self.max_scroll() as i64) as i32
        };
        match self.orientation {
            Orientation::Horizontal => Rect::from_xywh(at, 0, len, self.base.size().h),
            Orientation::Vertical => Rect::from_xywh(0, at, self.base.size().w, len),
        }
    }
}

impl Control for ScrollBar {
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
        canvas.draw_rect(Rect::from_size(self.base.size()), self.rail);
        let thumb = self.thumb_rect();
        if !thumb.is_empty() {
            canvas.draw_rect(thumb, self.thumb);
        }
    }
}

/// Hosts one child at `-scroll_offset`, with bars on the trailing edges
/// that hide when the content fits.
pub struct ScrollLayout {
    base: ControlBase,
    child: Option<ControlId>,
    h_bar: ControlId,
    v_bar: ControlId,
    scroll_offset: Point,
    scroll_x: bool,
    scroll_y: bool,
}

impl ScrollLayout {
    /// Inserts the layout plus its two bars into the tree.
    pub fn build(tree: &mut ControlTree) -> ControlId {
        let h_bar = tree.insert(Box::new(ScrollBar::new(Orientation::Horizontal)));
        let v_bar = tree.insert(Box::new(ScrollBar::new(Orientation::Vertical)));
        let layout = tree.insert(Box::new(ScrollLayout {
            base: ControlBase::new(),
            child: None,
            h_bar,
            v_bar,
            scroll_offset: Point::ZERO,
            scroll_x: true,
            scroll_y: true,
        }));
        tree.add_child(layout, h_bar);
        tree.add_child(layout, v_bar);
        layout
    }

    pub fn child(&self) -> Option<ControlId> {
        self.child
    }

    pub fn scroll_offset(&self) -> Point {
        self.scroll_offset
    }

    pub fn h_bar(&self) -> ControlId {
        self.h_bar
    }

    pub fn v_bar(&self) -> ControlId {
        self.v_bar
    }

    /// Restricts scrolling to selected axes.
    pub fn set_scroll_axes(&mut self, scroll_x: bool, scroll_y: bool) {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
    }

    pub fn set_child(tree: &mut ControlTree, layout: ControlId, child: ControlId) {
        if let Some(old) = tree.downcast_ref::<ScrollLayout>(layout).child {
            tree.remove_child(layout, old);
        }
        tree.add_child(layout, child);
        tree.downcast_mut::<ScrollLayout>(layout).child = Some(child);
    }

    /// Scrolls to `offset`; the next layout clamps it against the content
    /// extent minus the viewport.
    pub fn scroll_to(tree: &mut ControlTree, layout: ControlId, offset: Point) {
        let requested = offset.max(Point::ZERO);
        let this = tree.downcast_mut::<ScrollLayout>(layout);
        if this.scroll_offset != requested {
            this.scroll_offset = requested;
            tree.relayout(layout);
        }
    }
}

impl Control for ScrollLayout {
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

        let child = match self.child {
            Some(child) => child,
            None => {
                tree.base_mut(self.h_bar).set_visible(false);
                tree.base_mut(self.v_bar).set_visible(false);
                return;
            }
        };

        // Scrollable axes are offered unbounded space.
        let offer = Size::new(
            if self.scroll_x { UNBOUNDED } else { inner.w },
            if self.scroll_y { UNBOUNDED } else { inner.h },
        );
        let content = tree.desired_size(child, Size::ZERO, offer);

        let h_visible = self.scroll_x && content.w > inner.w;
        let v_visible = self.scroll_y && content.h > inner.h;
        let viewport = Size::new(
            inner.w - if v_visible { BAR_THICKNESS } else { 0 },
            inner.h - if h_visible { BAR_THICKNESS } else { 0 },
        );

        self.scroll_offset = Point::new(
            self.scroll_offset.x.clamp(0, (content.w - viewport.w).max(0)),
            self.scroll_offset.y.clamp(0, (content.h - viewport.h).max(0)),
        );

        tree.set_size(child, content);
        self.base
            .set_child_offset(child, origin - self.scroll_offset);

        tree.base_mut(self.h_bar).set_visible(h_visible);
        tree.base_mut(self.v_bar).set_visible(v_visible);
        if h_visible {
            tree.set_size(self.h_bar, Size::new(viewport.w, BAR_THICKNESS));
            self.base.set_child_offset(
                self.h_bar,
                origin + Point::new(0, inner.h - BAR_THICKNESS),
            );
        }
        if v_visible {
            tree.set_size(self.v_bar, Size::new(BAR_THICKNESS, viewport.h));
            self.base.set_child_offset(
                self.v_bar,
                origin + Point::new(inner.w - BAR_THICKNESS, 0),
            );
        }
        let offset = self.scroll_offset;
        {
            let h = tree.downcast_mut::<ScrollBar>(self.h_bar);
            h.set_scroll_limit(content.w);
            h.scroll_position = offset.x;
        }
        let v = tree.downcast_mut::<ScrollBar>(self.v_bar);
        v.set_scroll_limit(content.h);
        v.scroll_position = offset.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::{Brush, Color};
    use control::Block;

    fn scrolling_block(content: Size) -> (ControlTree, ControlId, ControlId) {
        let mut tree = ControlTree::new();
        let layout = ScrollLayout::build(&mut tree);
        let child = tree.insert(Box::new(Block::new(Brush::new(Color::WHITE), content)));
        tree.set_root(layout);
        ScrollLayout::set_child(&mut tree, layout, child);
        tree.set_size(layout, Size::new(100, 100));
        tree.update();
        (tree, layout, child)
    }

    #[test]
    fn fitting_content_hides_both_bars() {
        let (tree, layout, child) = scrolling_block(Size::new(80, 80));
        let this = tree.downcast_ref::<ScrollLayout>(layout);
        assert!(!tree.base(this.h_bar()).is_visible());
        assert!(!tree.base(this.v_bar()).is_visible());
        assert_eq!(tree.base(layout).child_offset(child), Point::ZERO);
    }

    #[test]
    fn overflowing_content_shows_bars_on_the_trailing_edges() {
        let (tree, layout, _) = scrolling_block(Size::new(300, 400));
        let this = tree.downcast_ref::<ScrollLayout>(layout);
        let base = tree.base(layout);
        assert!(tree.base(this.h_bar()).is_visible());
        assert!(tree.base(this.v_bar()).is_visible());
        assert_eq!(base.child_offset(this.h_bar()), Point::new(0, 92));
        assert_eq!(base.child_offset(this.v_bar()), Point::new(92, 0));
    }

    #[test]
    fn scrolling_moves_the_child_negatively() {
        let (mut tree, layout, child) = scrolling_block(Size::new(300, 400));
        ScrollLayout::scroll_to(&mut tree, layout, Point::new(40, 70));
        tree.update();
        assert_eq!(tree.base(layout).child_offset(child), Point::new(-40, -70));
        let v_bar = tree.downcast_ref::<ScrollLayout>(layout).v_bar();
        assert_eq!(tree.downcast_ref::<ScrollBar>(v_bar).scroll_position(), 70);
    }

    #[test]
    fn scroll_clamps_at_the_content_extent() {
        let (mut tree, layout, child) = scrolling_block(Size::new(300, 400));
        ScrollLayout::scroll_to(&mut tree, layout, Point::new(9999, 9999));
        tree.update();
        let offset = tree.base(layout).child_offset(child);
        // 8px of each axis is claimed by the opposite bar.
        assert_eq!(offset, Point::new(-(300 - 92), -(400 - 92)));
    }

    #[test]
    fn bar_positions_clamp_and_notify() {
        let mut bar = ScrollBar::new(Orientation::Vertical);
        bar.set_scroll_limit(500);
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let s = seen.clone();
        let _sub = bar.on_scroll.listen(move |&p| s.borrow_mut().push(p));
        bar.set_scroll_position(200);
        bar.set_scroll_position(9000);
        assert_eq!(*seen.borrow(), vec![200, 500]);
    }
}
