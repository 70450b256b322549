//! Stacking layout along one axis.

use control::{Control, ControlBase, ControlTree};
use geom::{Point, Size};

/// Major-axis flow of a [`LinearLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    fn is_reversed(self) -> bool {
        matches!(self, Direction::RightToLeft | Direction::BottomToTop)
    }
}

/// Cross-axis alignment when the major axis is vertical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Cross-axis alignment when the major axis is horizontal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

/// Whether the layout sizes itself to the given bounds or to its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    Fill,
    Shrink,
}

/// Places children one after another along `direction`, aligning each on
/// the cross axis.
pub struct LinearLayout {
    base: ControlBase,
    direction: Direction,
    h_align: HAlign,
    v_align: VAlign,
    size_mode: SizeMode,
}

impl LinearLayout {
    pub fn new(direction: Direction) -> Self {
        Self {
            base: ControlBase::new(),
            direction,
            h_align: HAlign::Left,
            v_align: VAlign::Top,
            size_mode: SizeMode::Fill,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn set_h_align(&mut self, h_align: HAlign) {
        self.h_align = h_align;
    }

    pub fn set_v_align(&mut self, v_align: VAlign) {
        self.v_align = v_align;
    }

    pub fn set_size_mode(&mut self, size_mode: SizeMode) {
        self.size_mode = size_mode;
    }
}

impl Control for LinearLayout {
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

    fn desired_size(&mut self, tree: &mut ControlTree, min: Size, max: Size) -> Size {
        if self.size_mode == SizeMode::Fill {
            return max;
        }
        let inner_max = max.contract(self.base.padding());
        let children: Vec<_> = self.base.children().iter().map(|r| r.id).collect();
        let mut major = 0;
        let mut cross = 0;
        for child in children {
            let margin = tree.base(child).margin();
            let available = inner_max.contract(margin);
            let desired = tree.desired_size(child, Size::ZERO, available).expand(margin);
            if self.direction.is_horizontal() {
                major += desired.w;
                cross = cross.max(desired.h);
            } else {
                major += desired.h;
                cross = cross.max(desired.w);
            }
        }
        let content = if self.direction.is_horizontal() {
            Size::new(major, cross)
        } else {
            Size::new(cross, major)
        };
        content.expand(self.base.padding()).min(max).max(min)
    }

    fn layout_children(&mut self, tree: &mut ControlTree) {
        let padding = self.base.padding();
        let inner = self.base.size().contract(padding);
        let origin = Point::new(padding.l, padding.t);
        let children: Vec<_> = self.base.children().iter().map(|r| r.id).collect();

        let horizontal = self.direction.is_horizontal();
        let mut cursor = if self.direction.is_reversed() {
            if horizontal {
                inner.w
            } else {
                inner.h
            }
        } else {
            0
        };

        for child in children {
            let margin = tree.base(child).margin();
            let available = inner.contract(margin);
            let desired = tree.desired_size(child, Size::ZERO, available);
            tree.set_size(child, desired);

            let outer = desired.expand(margin);
            let step = if horizontal { outer.w } else { outer.h };
            let major_at = if self.direction.is_reversed() {
                cursor -= step;
                cursor
            } else {
                let at = cursor;
                cursor += step;
                at
            };

            let offset = if self.direction.is_horizontal() {
                let y = match self.v_align {
                    VAlign::Top => margin.t,
                    VAlign::Center => (inner.h - desired.h) / 2,
                    VAlign::Bottom => inner.h - desired.h - margin.b,
                };
                Point::new(major_at + margin.l, y)
            } else {
                let x = match self.h_align {
                    HAlign::Left => margin.l,
                    HAlign::Center => (inner.w - desired.w) / 2,
                    HAlign::Right => inner.w - desired.w - margin.r,
                };
                Point::new(x, major_at + margin.t)
            };
            self.base.set_child_offset(child, origin + offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::{Brush, Color};
    use control::{Block, ControlId};
    use geom::Spacing;

    fn block(tree: &mut ControlTree, w: i32, h: i32) -> ControlId {
        tree.insert(Box::new(Block::new(Brush::new(Color::WHITE), Size::new(w, h))))
    }

    fn layout_with(
        direction: Direction,
        sizes: &[(i32, i32)],
    ) -> (ControlTree, ControlId, Vec<ControlId>) {
        let mut tree = ControlTree::new();
        let layout = tree.insert(Box::new(LinearLayout::new(direction)));
        let kids: Vec<_> = sizes.iter().map(|&(w, h)| block(&mut tree, w, h)).collect();
        for &kid in &kids {
            tree.add_child(layout, kid);
        }
        tree.set_root(layout);
        tree.set_size(layout, Size::new(200, 100));
        (tree, layout, kids)
    }

    #[test]
    fn left_to_right_stacks_along_x() {
        let (tree, layout, kids) = layout_with(
            Direction::LeftToRight,
            &[(30, 20), (40, 20), (50, 20)],
        );
        let base = tree.base(layout);
        assert_eq!(base.child_offset(kids[0]), Point::new(0, 0));
        assert_eq!(base.child_offset(kids[1]), Point::new(30, 0));
        assert_eq!(base.child_offset(kids[2]), Point::new(70, 0));
    }

    #[test]
    fn right_to_left_stacks_from_the_far_edge() {
        let (tree, layout, kids) = layout_with(Direction::RightToLeft, &[(30, 20), (40, 20)]);
        let base = tree.base(layout);
        assert_eq!(base.child_offset(kids[0]), Point::new(170, 0));
        assert_eq!(base.child_offset(kids[1]), Point::new(130, 0));
    }

    #[test]
    fn top_to_bottom_respects_h_alignment() {
        let (mut tree, layout, kids) = layout_with(Direction::TopToBottom, &[(40, 20), (60, 20)]);
        tree.downcast_mut::<LinearLayout>(layout).set_h_align(HAlign::Center);
        tree.perform_layout(layout);
        let base = tree.base(layout);
        assert_eq!(base.child_offset(kids[0]), Point::new(80, 0));
        assert_eq!(base.child_offset(kids[1]), Point::new(70, 20));
    }

    #[test]
    fn margins_consume_major_axis_space() {
        let (mut tree, layout, kids) =
            layout_with(Direction::LeftToRight, &[(30, 20), (40, 20)]);
        tree.base_mut(kids[0]).set_margin(Spacing::new(5, 0, 7, 0));
        tree.perform_layout(layout);
        let base = tree.base(layout);
        assert_eq!(base.child_offset(kids[0]), Point::new(5, 0));
        assert_eq!(base.child_offset(kids[1]), Point::new(42, 0));
    }

    #[test]
    fn padding_shifts_the_flow_origin() {
        let (mut tree, layout, kids) = layout_with(Direction::LeftToRight, &[(30, 20)]);
        tree.base_mut(layout).set_padding(Spacing::new(10, 8, 0, 0));
        tree.perform_layout(layout);
        assert_eq!(tree.base(layout).child_offset(kids[0]), Point::new(10, 8));
    }

    #[test]
    fn shrink_mode_reports_the_content_size() {
        let (mut tree, layout, _) = layout_with(
            Direction::LeftToRight,
            &[(30, 20), (40, 25)],
        );
        tree.downcast_mut::<LinearLayout>(layout).set_size_mode(SizeMode::Shrink);
        let desired = tree.desired_size(layout, Size::ZERO, Size::new(500, 500));
        assert_eq!(desired, Size::new(70, 25));
    }

    #[test]
    fn oversized_children_are_clamped_to_the_inner_rect() {
        let (mut tree, layout, kids) = layout_with(Direction::LeftToRight, &[(400, 300)]);
        tree.perform_layout(layout);
        assert_eq!(tree.base(kids[0]).size(), Size::new(200, 100));
    }
}
