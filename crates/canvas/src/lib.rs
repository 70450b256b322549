//! # Kestrel Canvas
//!
//! The canvas is a record-then-seal command buffer: controls paint into it
//! on the application thread, `complete` seals it, and the driver thread
//! replays the recorded operations through a [`Backend`]. The canvas is
//! backend-agnostic; the GL blitter and the test mock both implement
//! [`Backend`].

mod color;
mod replay;
mod texture;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use geom::{PointF, Rect, Size};
use thiserror::Error;

pub use color::{Brush, Color, Pen};
pub use replay::{mock, Backend, DrawState};
pub use texture::Texture;

static NEXT_SHAPE_ID: AtomicU64 = AtomicU64::new(1);

fn next_shape_id() -> u64 {
    NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Polygon vertex: position in DIPs plus a corner radius. A radius of zero
/// is a sharp corner; positive radii tessellate into arcs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolyVertex {
    pub pos: PointF,
    pub radius: f32,
}

impl PolyVertex {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            pos: PointF::new(x, y),
            radius,
        }
    }

    pub fn sharp(x: f32, y: f32) -> Self {
        Self::new(x, y, 0.0)
    }
}

/// Glyph draw resolved by a [`GlyphProvider`]: one atlas-page quad.
#[derive(Debug, Clone, Copy)]
pub struct GlyphDraw {
    /// Atlas page identity within the provider, at the draw's resolution.
    pub page: u64,
    /// Source rect within the page, in texels.
    pub src: geom::RectF,
    /// Destination rect, in pixels relative to the rune's pen position.
    pub dst: geom::RectF,
}

/// Snapshot of one atlas page's bitmap for lazy GL upload.
pub struct PageSnapshot {
    /// Bumped whenever new glyphs were packed into the page.
    pub generation: u64,
    pub size: Size,
    /// Single-channel alpha bitmap, row major.
    pub alpha: Arc<Vec<u8>>,
}

/// Resolves runes into atlas-page quads at replay time. Implemented by the
/// font crate; the canvas only carries the trait so draw-runes ops stay
/// backend- and rasterizer-agnostic.
pub trait GlyphProvider: Send + Sync {
    /// Stable identity of the provider (one per font).
    fn font_id(&self) -> u64;
    /// Resolve `runes` at `resolution` (pixels per em bucket). Whitespace
    /// runes produce no draw. `pens_px[i]` is rune `i`'s pen position.
    fn resolve(&self, resolution: u32, runes: &[char], pens_px: &[PointF]) -> Vec<GlyphDraw>;
    /// Current bitmap of a page previously named by [`GlyphProvider::resolve`].
    fn page(&self, resolution: u32, page: u64) -> PageSnapshot;
}

/// A recorded draw operation, in DIP coordinates local to its canvas.
pub enum DrawOp {
    Push,
    Pop,
    AddClip(Rect),
    Clear(Color),
    DrawCanvas(Arc<Canvas>, geom::Point),
    DrawTexture(Texture, Rect),
    DrawRunes {
        provider: Arc<dyn GlyphProvider>,
        runes: Vec<char>,
        pens: Vec<PointF>,
        color: Color,
    },
    DrawLines {
        shape_id: u64,
        vertices: Vec<PolyVertex>,
        pen: Pen,
    },
    DrawPolygon {
        shape_id: u64,
        vertices: Vec<PolyVertex>,
        pen: Pen,
        brush: Brush,
    },
    DrawRect(Rect, Brush),
    DrawRoundedRect {
        shape_id: u64,
        rect: Rect,
        pen: Pen,
        brush: Brush,
        /// Corner radii: top-left, top-right, bottom-right, bottom-left.
        radii: [f32; 4],
    },
}

/// Sealing failures. Mutating a sealed canvas is a contract violation and
/// panics instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("canvas already completed")]
    AlreadyComplete,
    #[error("unbalanced push/pop: {depth} push(es) still open")]
    UnbalancedPush { depth: i32 },
}

/// An ordered list of draw operations over a DIP-sized surface.
///
/// Immutable once [`Canvas::complete`] succeeds.
pub struct Canvas {
    size: Size,
    ops: Vec<DrawOp>,
    push_depth: i32,
    built: bool,
}

impl Canvas {
    /// Panics unless `size.w > 0 && size.h >= 0`.
    pub fn new(size: Size) -> Self {
        assert!(size.w > 0 && size.h >= 0, "invalid canvas size {:?}", size);
        Self {
            size,
            ops: Vec::new(),
            push_depth: 0,
            built: false,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_complete(&self) -> bool {
        self.built
    }

    pub(crate) fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Seals the canvas. Fails on double-complete or unbalanced push/pop.
    pub fn complete(&mut self) -> Result<(), CanvasError> {
        if self.built {
            return Err(CanvasError::AlreadyComplete);
        }
        if self.push_depth != 0 {
            return Err(CanvasError::UnbalancedPush {
                depth: self.push_depth,
            });
        }
        self.built = true;
        Ok(())
    }

    fn op(&mut self, op: DrawOp) {
        assert!(!self.built, "draw on a completed canvas");
        self.ops.push(op);
    }

    /// Saves the clip/origin state.
    pub fn push(&mut self) {
        self.push_depth += 1;
        self.op(DrawOp::Push);
    }

    /// Restores the most recent [`Canvas::push`].
    pub fn pop(&mut self) {
        assert!(self.push_depth > 0, "pop without matching push");
        self.push_depth -= 1;
        self.op(DrawOp::Pop);
    }

    /// Intersects `rect` (canvas-local DIPs) with the current clip.
    pub fn add_clip(&mut self, rect: Rect) {
        self.op(DrawOp::AddClip(rect));
    }

    pub fn clear(&mut self, color: Color) {
        self.op(DrawOp::Clear(color));
    }

    /// Replays a sealed child canvas at `offset`. Panics if the child is
    /// not complete.
    pub fn draw_canvas(&mut self, child: Arc<Canvas>, offset: geom::Point) {
        assert!(child.is_complete(), "draw_canvas with an unsealed canvas");
        self.op(DrawOp::DrawCanvas(child, offset));
    }

    pub fn draw_texture(&mut self, texture: Texture, dst: Rect) {
        self.op(DrawOp::DrawTexture(texture, dst));
    }

    pub fn draw_runes(
        &mut self,
        provider: Arc<dyn GlyphProvider>,
        runes: Vec<char>,
        pens: Vec<PointF>,
        color: Color,
    ) {
        assert_eq!(runes.len(), pens.len(), "one pen position per rune");
        self.op(DrawOp::DrawRunes {
            provider,
            runes,
            pens,
            color,
        });
    }

    /// Open polyline stroked with `pen`.
    pub fn draw_lines(&mut self, vertices: Vec<PolyVertex>, pen: Pen) {
        self.op(DrawOp::DrawLines {
            shape_id: next_shape_id(),
            vertices,
            pen,
        });
    }

    /// Closed polygon filled with `brush` and stroked with `pen`.
    pub fn draw_polygon(&mut self, vertices: Vec<PolyVertex>, pen: Pen, brush: Brush) {
        self.op(DrawOp::DrawPolygon {
            shape_id: next_shape_id(),
            vertices,
            pen,
            brush,
        });
    }

    pub fn draw_rect(&mut self, rect: Rect, brush: Brush) {
        self.op(DrawOp::DrawRect(rect, brush));
    }

    /// Radii order: top-left, top-right, bottom-right, bottom-left. With
    /// all radii zero and an invisible pen this records a plain rect.
    pub fn draw_rounded_rect(&mut self, rect: Rect, pen: Pen, brush: Brush, radii: [f32; 4]) {
        if radii == [0.0; 4] && !pen.is_visible() {
            self.draw_rect(rect, brush);
            return;
        }
        self.op(DrawOp::DrawRoundedRect {
            shape_id: next_shape_id(),
            rect,
            pen,
            brush,
            radii,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Canvas {
        Canvas::new(Size::new(100, 100))
    }

    #[test]
    #[should_panic(expected = "invalid canvas size")]
    fn zero_width_canvas_panics() {
        let _ = Canvas::new(Size::new(0, 10));
    }

    #[test]
    fn complete_twice_fails() {
        let mut c = canvas();
        assert_eq!(c.complete(), Ok(()));
        assert_eq!(c.complete(), Err(CanvasError::AlreadyComplete));
    }

    #[test]
    fn unbalanced_push_fails_complete() {
        let mut c = canvas();
        c.push();
        assert_eq!(c.complete(), Err(CanvasError::UnbalancedPush { depth: 1 }));
        c.pop();
        assert_eq!(c.complete(), Ok(()));
    }

    #[test]
    #[should_panic(expected = "pop without matching push")]
    fn pop_without_push_panics() {
        canvas().pop();
    }

    #[test]
    #[should_panic(expected = "draw on a completed canvas")]
    fn draw_after_complete_panics() {
        let mut c = canvas();
        c.complete().unwrap();
        c.clear(Color::BLACK);
    }

    #[test]
    fn rounded_rect_devolves_to_rect() {
        let mut c = canvas();
        c.draw_rounded_rect(
            Rect::from_xywh(0, 0, 10, 10),
            Pen::new(1.0, Color::TRANSPARENT),
            Brush::new(Color::WHITE),
            [0.0; 4],
        );
        assert!(matches!(c.ops()[0], DrawOp::DrawRect(..)));
    }

    #[test]
    #[should_panic(expected = "unsealed canvas")]
    fn draw_unsealed_child_panics() {
        let child = Arc::new(canvas());
        canvas().draw_canvas(child, geom::Point::ZERO);
    }
}
