//! OpenGL renderer for sealed canvases, built on [`glow`].
//!
//! A [`GlRenderer`] is created once per window on the driver thread, with
//! the window's context current. Each frame runs between [`GlRenderer::begin_draw`]
//! and [`GlRenderer::end_draw`]; GL resources not touched by a frame are
//! destroyed when it ends.

use std::sync::Arc;

use glow::HasContext;

use canvas::{Backend, Brush, Color, GlyphProvider, Pen, PolyVertex, Texture};
use geom::{DipsToPixels, PointF, Rect, Size};

mod blitter;
mod context;
mod shader;
mod shape;

pub use context::{
    FrameState, GlTexture, ResourceMap, StreamKey, StreamRole, TextureKey, TextureResource,
};
pub use shader::GlError;

use blitter::Blitter;

/// GL-backed implementation of the canvas [`Backend`].
pub struct GlRenderer {
    gl: Arc<glow::Context>,
    state: FrameState,
    blitter: Blitter,
}

impl GlRenderer {
    /// Builds the renderer against an already-current GL context.
    pub fn new(gl: Arc<glow::Context>) -> Result<GlRenderer, GlError> {
        let blitter = Blitter::new(&gl)?;
        Ok(GlRenderer {
            gl,
            state: FrameState::new(),
            blitter,
        })
    }

    /// Starts a frame over the window's current sizes and sets the fixed-
    /// function state every draw relies on.
    pub fn begin_draw(&mut self, size_dips: Size, size_px: Size) {
        self.state.begin(size_dips, size_px);
        unsafe {
            self.gl.viewport(0, 0, size_px.w, size_px.h);
            self.gl.enable(glow::SCISSOR_TEST);
            self.gl
                .scissor(0, 0, size_px.w, size_px.h);
            self.gl.enable(glow::BLEND);
            self.gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
            self.gl.disable(glow::DEPTH_TEST);
            self.gl.disable(glow::CULL_FACE);
        }
    }

    /// Ends the frame: commits pending glyphs, then reaps every resource
    /// the frame did not touch.
    pub fn end_draw(&mut self) {
        self.blitter.commit_glyphs(&self.gl, &mut self.state);
        let frame = self.state.frame;
        let mut reaped_textures = 0;
        for resource in self.state.textures.sweep(frame) {
            unsafe { self.gl.delete_texture(resource.texture) };
            reaped_textures += 1;
        }
        let mut reaped_buffers = 0;
        for resource in self.state.streams.sweep(frame) {
            unsafe { self.gl.delete_buffer(resource.buffer) };
            reaped_buffers += 1;
        }
        for resource in self.state.indices.sweep(frame) {
            unsafe { self.gl.delete_buffer(resource.buffer) };
            reaped_buffers += 1;
        }
        if reaped_textures + reaped_buffers > 0 {
            tracing::debug!(
                frame,
                textures = reaped_textures,
                buffers = reaped_buffers,
                "reaped stale GL resources"
            );
        }
        tracing::trace!(frame, draw_calls = self.state.draw_calls, "frame drawn");
    }

    /// Draw calls issued since `begin_draw`, for tests and stats overlays.
    pub fn draw_calls(&self) -> u32 {
        self.state.draw_calls
    }

    pub fn resident_textures(&self) -> usize {
        self.state.textures.len()
    }
}

impl Drop for GlRenderer {
    fn drop(&mut self) {
        for resource in self.state.textures.drain_all() {
            unsafe { self.gl.delete_texture(resource.texture) };
        }
        for resource in self.state.streams.drain_all() {
            unsafe { self.gl.delete_buffer(resource.buffer) };
        }
        for resource in self.state.indices.drain_all() {
            unsafe { self.gl.delete_buffer(resource.buffer) };
        }
        self.blitter.destroy(&self.gl);
    }
}

impl Backend for GlRenderer {
    fn dips_to_pixels(&self) -> DipsToPixels {
        self.state.ratio
    }

    fn set_clip(&mut self, clip_px: Rect) {
        self.blitter.set_clip(&self.gl, &mut self.state, clip_px);
    }

    fn clear(&mut self, color: Color) {
        self.blitter.clear(&self.gl, &mut self.state, color);
    }

    fn draw_texture(&mut self, texture: &Texture, dst_px: Rect) {
        self.blitter
            .blit_texture(&self.gl, &mut self.state, texture, dst_px);
    }

    fn draw_runes(
        &mut self,
        provider: &Arc<dyn GlyphProvider>,
        runes: &[char],
        pens_px: &[PointF],
        color: Color,
    ) {
        let resolution = self.resolution();
        self.blitter.draw_runes(
            &self.gl,
            &mut self.state,
            provider,
            resolution,
            runes,
            pens_px,
            color,
        );
    }

    fn draw_lines(&mut self, shape_id: u64, vertices_px: &[PolyVertex], pen: Pen) {
        self.blitter.blit_shape(
            &self.gl,
            &mut self.state,
            shape_id,
            vertices_px,
            false,
            pen,
            Brush::NONE,
        );
    }

    fn draw_polygon(&mut self, shape_id: u64, vertices_px: &[PolyVertex], pen: Pen, brush: Brush) {
        self.blitter.blit_shape(
            &self.gl,
            &mut self.state,
            shape_id,
            vertices_px,
            true,
            pen,
            brush,
        );
    }

    fn draw_rect(&mut self, rect_px: Rect, brush: Brush) {
        self.blitter
            .blit_rect(&self.gl, &mut self.state, rect_px, brush.color);
    }

    fn draw_rounded_rect(
        &mut self,
        shape_id: u64,
        rect_px: Rect,
        pen: Pen,
        brush: Brush,
        radii_px: [f32; 4],
    ) {
        let r = rect_px;
        let vertices = [
            PolyVertex::new(r.min.x as f32, r.min.y as f32, radii_px[0]),
            PolyVertex::new(r.max.x as f32, r.min.y as f32, radii_px[1]),
            PolyVertex::new(r.max.x as f32, r.max.y as f32, radii_px[2]),
            PolyVertex::new(r.min.x as f32, r.max.y as f32, radii_px[3]),
        ];
        self.blitter.blit_shape(
            &self.gl,
            &mut self.state,
            shape_id,
            &vertices,
            true,
            pen,
            brush,
        );
    }

    fn flush(&mut self) {
        self.blitter.commit_glyphs(&self.gl, &mut self.state);
    }
}
