//! Fixed grid layout with multi-cell spans.

use control::{Control, ControlBase, ControlId, ControlTree};
use geom::{Point, Rect, Size};
use thiserror::Error;

/// A child's span in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRegion {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl CellRegion {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        assert!(w > 0 && h > 0, "cell region must span at least one cell");
        Self { x, y, w, h }
    }

    fn rect(self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.w, self.h)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("region {0:?} lies outside the {1}x{2} grid")]
    OutOfBounds(CellRegion, i32, i32),
    #[error("region {0:?} overlaps an existing child")]
    Overlap(CellRegion),
    #[error("cannot shrink to {0}x{1}: occupied cells would be removed")]
    TrackOccupied(i32, i32),
}

/// `rows x cols` grid; each child occupies a rectangular cell region.
pub struct TableLayout {
    base: ControlBase,
    rows: i32,
    cols: i32,
    cells: Vec<(ControlId, CellRegion)>,
}

impl TableLayout {
    pub fn new(rows: i32, cols: i32) -> Self {
        assert!(rows > 0 && cols > 0, "grid must have at least one cell");
        Self {
            base: ControlBase::new(),
            rows,
            cols,
            cells: Vec::new(),
        }
    }

    pub fn grid(&self) -> (i32, i32) {
        (self.rows, self.cols)
    }

    pub fn region_of(&self, child: ControlId) -> Option<CellRegion> {
        self.cells
            .iter()
            .find(|(id, _)| *id == child)
            .map(|&(_, region)| region)
    }

    /// Resizes the grid; fails when a child occupies a removed track.
    pub fn set_grid(
        tree: &mut ControlTree,
        table: ControlId,
        rows: i32,
        cols: i32,
    ) -> Result<(), TableError> {
        assert!(rows > 0 && cols > 0, "grid must have at least one cell");
        {
            let this = tree.downcast_mut::<TableLayout>(table);
            let occupied = this
                .cells
                .iter()
                .any(|(_, r)| r.x + r.w > cols || r.y + r.h > rows);
            if occupied {
                return Err(TableError::TrackOccupied(rows, cols));
            }
            this.rows = rows;
            this.cols = cols;
        }
        tree.relayout(table);
        Ok(())
    }

    /// Places `child` over `region`; fails on out-of-bounds or overlap.
    pub fn put(
        tree: &mut ControlTree,
        table: ControlId,
        child: ControlId,
        region: CellRegion,
    ) -> Result<(), TableError> {
        {
            let this = tree.downcast_ref::<TableLayout>(table);
            if region.x < 0
                || region.y < 0
                || region.x + region.w > this.cols
                || region.y + region.h > this.rows
            {
                return Err(TableError::OutOfBounds(region, this.rows, this.cols));
            }
            let overlaps = this
                .cells
                .iter()
                .any(|(_, r)| !r.rect().intersect(region.rect()).is_empty());
            if overlaps {
                return Err(TableError::Overlap(region));
            }
        }
        tree.add_child(table, child);
        tree.downcast_mut::<TableLayout>(table).cells.push((child, region));
        Ok(())
    }

    pub fn remove(tree: &mut ControlTree, table: ControlId, child: ControlId) {
        tree.remove_child(table, child);
        tree.downcast_mut::<TableLayout>(table)
            .cells
            .retain(|(id, _)| *id != child);
    }
}

impl Control for TableLayout {
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
        let cells: Vec<_> = self.cells.clone();
        for (child, region) in cells {
            // Edge coordinates rather than cell * extent, so rounding
            // never opens gaps between neighbors.
            let x0 = inner.w * region.x / self.cols;
            let x1 = inner.w * (region.x + region.w) / self.cols;
            let y0 = inner.h * region.y / self.rows;
            let y1 = inner.h * (region.y + region.h) / self.rows;
            tree.set_size(child, Size::new(x1 - x0, y1 - y0));
            self.base
                .set_child_offset(child, origin + Point::new(x0, y0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::{Brush, Color};
    use control::Block;

    fn grid_2x2() -> (ControlTree, ControlId) {
        let mut tree = ControlTree::new();
        let table = tree.insert(Box::new(TableLayout::new(2, 2)));
        tree.set_root(table);
        (tree, table)
    }

    fn block(tree: &mut ControlTree) -> ControlId {
        tree.insert(Box::new(Block::new(
            Brush::new(Color::WHITE),
            Size::new(10, 10),
        )))
    }

    #[test]
    fn children_land_in_their_cells() {
        let (mut tree, table) = grid_2x2();
        let a = block(&mut tree);
        let b = block(&mut tree);
        TableLayout::put(&mut tree, table, a, CellRegion::new(0, 0, 1, 1)).unwrap();
        TableLayout::put(&mut tree, table, b, CellRegion::new(1, 1, 1, 1)).unwrap();
        tree.set_size(table, Size::new(200, 100));
        tree.update();
        assert_eq!(tree.base(a).size(), Size::new(100, 50));
        assert_eq!(tree.base(table).child_offset(b), Point::new(100, 50));
    }

    #[test]
    fn spans_cover_multiple_cells() {
        let (mut tree, table) = grid_2x2();
        let wide = block(&mut tree);
        TableLayout::put(&mut tree, table, wide, CellRegion::new(0, 0, 2, 1)).unwrap();
        tree.set_size(table, Size::new(200, 100));
        tree.update();
        assert_eq!(tree.base(wide).size(), Size::new(200, 50));
    }

    #[test]
    fn overlapping_placement_is_refused() {
        let (mut tree, table) = grid_2x2();
        let a = block(&mut tree);
        let b = block(&mut tree);
        TableLayout::put(&mut tree, table, a, CellRegion::new(0, 0, 2, 1)).unwrap();
        let err = TableLayout::put(&mut tree, table, b, CellRegion::new(1, 0, 1, 1));
        assert_eq!(err, Err(TableError::Overlap(CellRegion::new(1, 0, 1, 1))));
    }

    #[test]
    fn out_of_bounds_placement_is_refused() {
        let (mut tree, table) = grid_2x2();
        let a = block(&mut tree);
        let region = CellRegion::new(1, 1, 2, 1);
        assert_eq!(
            TableLayout::put(&mut tree, table, a, region),
            Err(TableError::OutOfBounds(region, 2, 2))
        );
    }

    #[test]
    fn shrinking_over_occupied_tracks_is_refused() {
        let (mut tree, table) = grid_2x2();
        let a = block(&mut tree);
        TableLayout::put(&mut tree, table, a, CellRegion::new(1, 1, 1, 1)).unwrap();
        assert_eq!(
            TableLayout::set_grid(&mut tree, table, 1, 2),
            Err(TableError::TrackOccupied(1, 2))
        );
        TableLayout::remove(&mut tree, table, a);
        assert!(TableLayout::set_grid(&mut tree, table, 1, 2).is_ok());
    }

    #[test]
    fn uneven_division_leaves_no_gaps() {
        let mut tree = ControlTree::new();
        let table = tree.insert(Box::new(TableLayout::new(1, 3)));
        tree.set_root(table);
        let kids: Vec<_> = (0..3).map(|_| block(&mut tree)).collect();
        for (i, &kid) in kids.iter().enumerate() {
            TableLayout::put(&mut tree, table, kid, CellRegion::new(i as i32, 0, 1, 1)).unwrap();
        }
        tree.set_size(table, Size::new(100, 30));
        tree.update();
        let widths: Vec<_> = kids.iter().map(|&k| tree.base(k).size().w).collect();
        assert_eq!(widths.iter().sum::<i32>(), 100);
        let base = tree.base(table);
        assert_eq!(base.child_offset(kids[1]).x, widths[0]);
        assert_eq!(base.child_offset(kids[2]).x, widths[0] + widths[1]);
    }
}
