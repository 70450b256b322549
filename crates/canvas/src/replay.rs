//! Replaying sealed canvases through a backend.
//!
//! Replay owns the draw-state stack; backends receive absolute pixel
//! coordinates and never see canvas nesting.

use std::sync::Arc;

use geom::{DipsToPixels, Point, PointF, Rect};

use crate::{Brush, Canvas, Color, DrawOp, GlyphProvider, Pen, PolyVertex, Texture};

/// One entry of the draw-state stack: the active clip and the origin every
/// canvas-local coordinate is translated by, both in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawState {
    pub clip_px: Rect,
    pub origin_px: Point,
}

/// Consumer of replayed draw operations.
///
/// All coordinates are absolute pixels; the DIP conversion happened during
/// replay using [`Backend::dips_to_pixels`]. A zero-alpha pen or brush op
/// is filtered out before reaching the backend.
pub trait Backend {
    fn dips_to_pixels(&self) -> DipsToPixels;
    /// Glyph-table resolution bucket for the current output.
    fn resolution(&self) -> u32 {
        (self.dips_to_pixels().to_f32() * 256.0) as u32
    }
    fn set_clip(&mut self, clip_px: Rect);
    fn clear(&mut self, color: Color);
    fn draw_texture(&mut self, texture: &Texture, dst_px: Rect);
    fn draw_runes(
        &mut self,
        provider: &Arc<dyn GlyphProvider>,
        runes: &[char],
        pens_px: &[PointF],
        color: Color,
    );
    fn draw_lines(&mut self, shape_id: u64, vertices_px: &[PolyVertex], pen: Pen);
    fn draw_polygon(&mut self, shape_id: u64, vertices_px: &[PolyVertex], pen: Pen, brush: Brush);
    fn draw_rect(&mut self, rect_px: Rect, brush: Brush);
    fn draw_rounded_rect(
        &mut self,
        shape_id: u64,
        rect_px: Rect,
        pen: Pen,
        brush: Brush,
        radii_px: [f32; 4],
    );
    /// Flushes any batched work (glyph runs). Called at the end of replay.
    fn flush(&mut self) {}
}

impl Canvas {
    /// Replays this sealed canvas. `root` supplies the initial clip and
    /// origin. Panics if the canvas is not complete.
    pub fn replay(&self, backend: &mut dyn Backend, root: DrawState) {
        assert!(self.is_complete(), "replay of an unsealed canvas");
        let mut stack = vec![root];
        backend.set_clip(root.clip_px);
        self.replay_ops(backend, &mut stack);
        backend.flush();
    }

    fn replay_ops(&self, backend: &mut dyn Backend, stack: &mut Vec<DrawState>) {
        let ratio = backend.dips_to_pixels();
        for op in self.ops() {
            let head = *stack.last().unwrap();
            match op {
                DrawOp::Push => stack.push(head),
                DrawOp::Pop => {
                    stack.pop();
                    backend.set_clip(stack.last().unwrap().clip_px);
                }
                DrawOp::AddClip(rect) => {
                    let clip = ratio.rect(*rect).offset(head.origin_px);
                    let head = stack.last_mut().unwrap();
                    head.clip_px = head.clip_px.intersect(clip);
                    backend.set_clip(head.clip_px);
                }
                DrawOp::Clear(color) => backend.clear(*color),
                DrawOp::DrawCanvas(child, offset) => {
                    stack.push(DrawState {
                        clip_px: head.clip_px,
                        origin_px: head.origin_px + ratio.point(*offset),
                    });
                    child.replay_ops(backend, stack);
                    stack.pop();
                    backend.set_clip(stack.last().unwrap().clip_px);
                }
                DrawOp::DrawTexture(texture, dst) => {
                    backend.draw_texture(texture, ratio.rect(*dst).offset(head.origin_px));
                }
                DrawOp::DrawRunes {
                    provider,
                    runes,
                    pens,
                    color,
                } => {
                    if color.is_visible() {
                        let origin = PointF::from(head.origin_px);
                        let pens_px: Vec<PointF> = pens
                            .iter()
                            .map(|p| {
                                PointF::new(ratio.scale_f32(p.x), ratio.scale_f32(p.y)) + origin
                            })
                            .collect();
                        backend.draw_runes(provider, runes, &pens_px, *color);
                    }
                }
                DrawOp::DrawLines {
                    shape_id,
                    vertices,
                    pen,
                } => {
                    if pen.is_visible() && vertices.len() >= 2 {
                        let vs = scale_vertices(vertices, ratio, head.origin_px);
                        backend.draw_lines(*shape_id, &vs, scale_pen(*pen, ratio));
                    }
                }
                DrawOp::DrawPolygon {
                    shape_id,
                    vertices,
                    pen,
                    brush,
                } => {
                    if (pen.is_visible() || brush.is_visible()) && vertices.len() >= 3 {
                        let vs = scale_vertices(vertices, ratio, head.origin_px);
                        backend.draw_polygon(*shape_id, &vs, scale_pen(*pen, ratio), *brush);
                    }
                }
                DrawOp::DrawRect(rect, brush) => {
                    if brush.is_visible() {
                        backend.draw_rect(ratio.rect(*rect).offset(head.origin_px), *brush);
                    }
                }
                DrawOp::DrawRoundedRect {
                    shape_id,
                    rect,
                    pen,
                    brush,
                    radii,
                } => {
                    if pen.is_visible() || brush.is_visible() {
                        let radii_px = radii.map(|r| ratio.scale_f32(r));
                        backend.draw_rounded_rect(
                            *shape_id,
                            ratio.rect(*rect).offset(head.origin_px),
                            scale_pen(*pen, ratio),
                            *brush,
                            radii_px,
                        );
                    }
                }
            }
        }
    }
}

fn scale_pen(pen: Pen, ratio: DipsToPixels) -> Pen {
    Pen::new(ratio.scale_f32(pen.width), pen.color)
}

fn scale_vertices(vertices: &[PolyVertex], ratio: DipsToPixels, origin: Point) -> Vec<PolyVertex> {
    let origin = PointF::from(origin);
    vertices
        .iter()
        .map(|v| PolyVertex {
            pos: PointF::new(ratio.scale_f32(v.pos.x), ratio.scale_f32(v.pos.y)) + origin,
            radius: ratio.scale_f32(v.radius),
        })
        .collect()
}

/// Recording backend for tests: captures every call it receives.
pub mod mock {
    use super::*;

    /// One recorded backend call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        SetClip(Rect),
        Clear(Color),
        DrawTexture { id: u64, dst: Rect },
        DrawRunes { runes: Vec<char>, color: Color },
        DrawLines { shape_id: u64 },
        DrawPolygon { shape_id: u64 },
        DrawRect { rect: Rect, brush: Brush },
        DrawRoundedRect { rect: Rect },
        Flush,
    }

    /// Backend that records calls instead of drawing.
    pub struct MockBackend {
        pub ratio: DipsToPixels,
        pub calls: Vec<Recorded>,
    }

    impl MockBackend {
        pub fn new(ratio: DipsToPixels) -> Self {
            Self {
                ratio,
                calls: Vec::new(),
            }
        }

        pub fn rects(&self) -> Vec<Rect> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Recorded::DrawRect { rect, .. } => Some(*rect),
                    _ => None,
                })
                .collect()
        }
    }

    impl Backend for MockBackend {
        fn dips_to_pixels(&self) -> DipsToPixels {
            self.ratio
        }

        fn set_clip(&mut self, clip_px: Rect) {
            self.calls.push(Recorded::SetClip(clip_px));
        }

        fn clear(&mut self, color: Color) {
            self.calls.push(Recorded::Clear(color));
        }

        fn draw_texture(&mut self, texture: &Texture, dst_px: Rect) {
            self.calls.push(Recorded::DrawTexture {
                id: texture.id(),
                dst: dst_px,
            });
        }

        fn draw_runes(
            &mut self,
            _provider: &Arc<dyn GlyphProvider>,
            runes: &[char],
            _pens_px: &[PointF],
            color: Color,
        ) {
            self.calls.push(Recorded::DrawRunes {
                runes: runes.to_vec(),
                color,
            });
        }

        fn draw_lines(&mut self, shape_id: u64, _vertices_px: &[PolyVertex], _pen: Pen) {
            self.calls.push(Recorded::DrawLines { shape_id });
        }

        fn draw_polygon(
            &mut self,
            shape_id: u64,
            _vertices_px: &[PolyVertex],
            _pen: Pen,
            _brush: Brush,
        ) {
            self.calls.push(Recorded::DrawPolygon { shape_id });
        }

        fn draw_rect(&mut self, rect_px: Rect, brush: Brush) {
            self.calls.push(Recorded::DrawRect {
                rect: rect_px,
                brush,
            });
        }

        fn draw_rounded_rect(
            &mut self,
            _shape_id: u64,
            rect_px: Rect,
            _pen: Pen,
            _brush: Brush,
            _radii_px: [f32; 4],
        ) {
            self.calls.push(Recorded::DrawRoundedRect { rect: rect_px });
        }

        fn flush(&mut self) {
            self.calls.push(Recorded::Flush);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockBackend, Recorded};
    use super::*;
    use geom::Size;

    fn root(size: Size) -> DrawState {
        DrawState {
            clip_px: Rect::from_size(size),
            origin_px: Point::ZERO,
        }
    }

    #[test]
    fn nested_canvas_translates_by_offset() {
        let mut child = Canvas::new(Size::new(10, 10));
        child.draw_rect(Rect::from_xywh(1, 1, 2, 2), Brush::new(Color::WHITE));
        child.complete().unwrap();

        let mut parent = Canvas::new(Size::new(100, 100));
        parent.draw_canvas(Arc::new(child), Point::new(20, 30));
        parent.complete().unwrap();

        let mut backend = MockBackend::new(DipsToPixels::ONE);
        parent.replay(&mut backend, root(Size::new(100, 100)));
        assert_eq!(backend.rects(), vec![Rect::from_xywh(21, 31, 2, 2)]);
    }

    #[test]
    fn add_clip_intersects_and_pop_restores() {
        let mut c = Canvas::new(Size::new(100, 100));
        c.push();
        c.add_clip(Rect::from_xywh(10, 10, 20, 20));
        c.pop();
        c.complete().unwrap();

        let mut backend = MockBackend::new(DipsToPixels::ONE);
        c.replay(&mut backend, root(Size::new(100, 100)));
        let clips: Vec<_> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Recorded::SetClip(r) => Some(*r),
                _ => None,
            })
            .collect();
        assert_eq!(
            clips,
            vec![
                Rect::from_xywh(0, 0, 100, 100),
                Rect::from_xywh(10, 10, 20, 20),
                Rect::from_xywh(0, 0, 100, 100),
            ]
        );
    }

    #[test]
    fn scale_factor_applies_to_geometry() {
        let mut c = Canvas::new(Size::new(50, 50));
        c.draw_rect(Rect::from_xywh(1, 2, 3, 4), Brush::new(Color::WHITE));
        c.complete().unwrap();

        let mut backend = MockBackend::new(DipsToPixels::from_sizes(1, 2));
        c.replay(
            &mut backend,
            root(Size::new(100, 100)),
        );
        assert_eq!(backend.rects(), vec![Rect::from_xywh(2, 4, 6, 8)]);
    }

    #[test]
    fn invisible_ops_are_filtered() {
        let mut c = Canvas::new(Size::new(10, 10));
        c.draw_rect(Rect::from_xywh(0, 0, 5, 5), Brush::NONE);
        c.draw_lines(
            vec![PolyVertex::sharp(0.0, 0.0), PolyVertex::sharp(5.0, 5.0)],
            Pen::NONE,
        );
        c.complete().unwrap();

        let mut backend = MockBackend::new(DipsToPixels::ONE);
        c.replay(&mut backend, root(Size::new(10, 10)));
        assert_eq!(
            backend.calls,
            vec![
                Recorded::SetClip(Rect::from_xywh(0, 0, 10, 10)),
                Recorded::Flush
            ]
        );
    }
}
