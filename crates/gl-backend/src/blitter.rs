//! Draw-call emission: solid shapes, texture copies, batched glyph runs.
//!
//! The blitter owns the three shader programs and a unit quad. Glyph quads
//! accumulate in a batch keyed by atlas page; any non-glyph operation or a
//! clip change commits the batch so output order is preserved.

use std::sync::Arc;

use glow::HasContext;
use smallvec::SmallVec;

use canvas::{Brush, Color, GlyphProvider, Pen, PolyVertex, Texture};
use geom::{Mat3, Rect};

use crate::context::{
    FrameState, GlBuffer, IndexResource, StreamKey, StreamResource, StreamRole, TextureKey,
    TextureResource,
};
use crate::shader::{self, check_gl_error, GlError, Program, Stream, Uniform, UniformValue};
use crate::shape::{self, Tessellation};

/// Pending glyph quads for one atlas page.
struct GlyphBatch {
    key: Option<TextureKey>,
    dst: Vec<f32>,
    src: Vec<f32>,
    clip: Vec<f32>,
    color: Vec<f32>,
}

impl GlyphBatch {
    fn new() -> Self {
        Self {
            key: None,
            dst: Vec::new(),
            src: Vec::new(),
            clip: Vec::new(),
            color: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.dst.is_empty()
    }

    fn clear(&mut self) {
        self.key = None;
        self.dst.clear();
        self.src.clear();
        self.clip.clear();
        self.color.clear();
    }

    fn vertex_count(&self) -> i32 {
        (self.dst.len() / 2) as i32
    }
}

pub struct Blitter {
    solid: Program,
    copy: Program,
    glyph: Program,
    unit_quad: GlBuffer,
    batch: GlyphBatch,
}

impl Blitter {
    pub fn new(gl: &glow::Context) -> Result<Blitter, GlError> {
        let solid = Program::new(gl, shader::sources::SOLID_VS, shader::sources::SOLID_FS)?;
        let copy = Program::new(gl, shader::sources::COPY_VS, shader::sources::COPY_FS)?;
        let glyph = Program::new(gl, shader::sources::GLYPH_VS, shader::sources::GLYPH_FS)?;
        let unit_quad = unsafe {
            let buffer = gl.create_buffer().map_err(GlError::Link)?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            let quad: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                f32_slice_bytes(&quad),
                glow::STATIC_DRAW,
            );
            buffer
        };
        Ok(Blitter {
            solid,
            copy,
            glyph,
            unit_quad,
            batch: GlyphBatch::new(),
        })
    }

    pub fn destroy(&self, gl: &glow::Context) {
        self.solid.destroy(gl);
        self.copy.destroy(gl);
        self.glyph.destroy(gl);
        unsafe { gl.delete_buffer(self.unit_quad) };
    }

    /// Applies the scissor for `clip_px`, committing pending glyphs first.
    /// Redundant calls are elided against the cached clip.
    pub fn set_clip(&mut self, gl: &glow::Context, state: &mut FrameState, clip_px: Rect) {
        if state.clip_px == clip_px {
            return;
        }
        self.commit_glyphs(gl, state);
        state.clip_px = clip_px;
        let w = clip_px.w().max(0);
        let h = clip_px.h().max(0);
        // GL scissor rects are bottom-left origin.
        let y = state.size_px.h - clip_px.min.y - h;
        unsafe { gl.scissor(clip_px.min.x, y, w, h) };
    }

    /// Clears the scissored region.
    pub fn clear(&mut self, gl: &glow::Context, state: &mut FrameState, color: Color) {
        self.commit_glyphs(gl, state);
        let [r, g, b, a] = color.premultiplied();
        unsafe {
            gl.clear_color(r, g, b, a);
            gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Fills `rect_px` with a solid color.
    pub fn blit_rect(
        &mut self,
        gl: &glow::Context,
        state: &mut FrameState,
        rect_px: Rect,
        color: Color,
    ) {
        self.commit_glyphs(gl, state);
        let transform = rect_transform(state, rect_px);
        self.solid.bind(
            gl,
            &[unit_quad_stream(self.unit_quad)],
            &[
                Uniform {
                    name: "u_transform",
                    value: UniformValue::Mat3(transform),
                },
                Uniform {
                    name: "u_color",
                    value: UniformValue::Vec4(color.premultiplied()),
                },
            ],
        );
        unsafe { gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4) };
        self.solid.unbind(gl);
        state.draw_calls += 1;
        check_gl_error(gl, "rect blit");
    }

    /// Copies an RGBA texture into `dst_px`, creating and uploading the GL
    /// texture on first use. Straight-alpha textures switch the blend
    /// function for the duration of the copy.
    pub fn blit_texture(
        &mut self,
        gl: &glow::Context,
        state: &mut FrameState,
        texture: &Texture,
        dst_px: Rect,
    ) {
        self.commit_glyphs(gl, state);
        let frame = state.frame;
        let resource = state
            .textures
            .get_or_create(TextureKey::Image(texture.id()), frame, || {
                upload_rgba_texture(gl, texture)
            });
        let gl_texture = resource.texture;
        let transform = rect_transform(state, dst_px);
        if !texture.premultiplied() {
            unsafe { gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA) };
        }
        self.copy.bind(
            gl,
            &[unit_quad_stream(self.unit_quad)],
            &[
                Uniform {
                    name: "u_transform",
                    value: UniformValue::Mat3(transform),
                },
                Uniform {
                    name: "u_texture",
                    value: UniformValue::Sampler(gl_texture),
                },
            ],
        );
        unsafe { gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4) };
        self.copy.unbind(gl);
        if !texture.premultiplied() {
            unsafe { gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA) };
        }
        state.draw_calls += 1;
        check_gl_error(gl, "texture blit");
    }

    /// Draws a cached shape: fill fan and/or edge strip. Tessellation runs
    /// only when the shape's buffers are not already resident.
    pub fn blit_shape(
        &mut self,
        gl: &glow::Context,
        state: &mut FrameState,
        shape_id: u64,
        vertices_px: &[PolyVertex],
        closed: bool,
        pen: Pen,
        brush: Brush,
    ) {
        self.commit_glyphs(gl, state);
        let frame = state.frame;
        let fill_key = StreamKey {
            shape: shape_id,
            role: StreamRole::FillPos,
        };
        let edge_key = StreamKey {
            shape: shape_id,
            role: StreamRole::EdgePos,
        };
        let want_fill = brush.is_visible() && closed;
        let want_edge = pen.is_visible();

        let missing = (want_fill && !state.streams.contains(&fill_key))
            || (want_edge && !state.streams.contains(&edge_key));
        let tess: Option<Tessellation> =
            missing.then(|| shape::tessellate(vertices_px, closed, pen.width, want_fill));
        if let Some(t) = &tess {
            if want_fill {
                state.streams.get_or_create(fill_key, frame, || {
                    upload_stream(gl, &t.fill)
                });
                state.indices.get_or_create(shape_id, frame, || {
                    upload_indices(gl, &t.fill_indices)
                });
            }
            if want_edge {
                state.streams.get_or_create(edge_key, frame, || {
                    upload_stream(gl, &t.edge)
                });
            }
        }

        let transform = ortho(state);
        if want_fill {
            let (buffer, _) = stream_parts(state.streams.get_mut(&fill_key, frame));
            let (index_buffer, index_count) = index_parts(state.indices.get_mut(&shape_id, frame));
            self.solid.bind(
                gl,
                &[Stream {
                    name: "a_position",
                    buffer,
                    components: 2,
                    stride: 0,
                    offset: 0,
                }],
                &[
                    Uniform {
                        name: "u_transform",
                        value: UniformValue::Mat3(transform),
                    },
                    Uniform {
                        name: "u_color",
                        value: UniformValue::Vec4(brush.color.premultiplied()),
                    },
                ],
            );
            unsafe {
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
                gl.draw_elements(glow::TRIANGLES, index_count, glow::UNSIGNED_INT, 0);
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            }
            self.solid.unbind(gl);
            state.draw_calls += 1;
            check_gl_error(gl, "shape fill");
        }
        if want_edge {
            let (buffer, count) = stream_parts(state.streams.get_mut(&edge_key, frame));
            self.solid.bind(
                gl,
                &[Stream {
                    name: "a_position",
                    buffer,
                    components: 2,
                    stride: 0,
                    offset: 0,
                }],
                &[
                    Uniform {
                        name: "u_transform",
                        value: UniformValue::Mat3(transform),
                    },
                    Uniform {
                        name: "u_color",
                        value: UniformValue::Vec4(pen.color.premultiplied()),
                    },
                ],
            );
            unsafe { gl.draw_arrays(glow::TRIANGLE_STRIP, 0, count) };
            self.solid.unbind(gl);
            state.draw_calls += 1;
            check_gl_error(gl, "shape edge");
        }
    }

    /// Appends a rune run to the glyph batch, committing whenever the run
    /// crosses onto a different atlas page.
    pub fn draw_runes(
        &mut self,
        gl: &glow::Context,
        state: &mut FrameState,
        provider: &Arc<dyn GlyphProvider>,
        resolution: u32,
        runes: &[char],
        pens_px: &[geom::PointF],
        color: Color,
    ) {
        let draws = provider.resolve(resolution, runes, pens_px);
        let font = provider.font_id();
        let rgba = color.premultiplied();
        // Pages whose GL texture was already refreshed during this run.
        let mut ensured: SmallVec<[(TextureKey, geom::Size); 2]> = SmallVec::new();
        for draw in draws {
            let key = TextureKey::GlyphPage {
                font,
                resolution,
                page: draw.page,
            };
            if self.batch.key != Some(key) {
                self.commit_glyphs(gl, state);
                self.batch.key = Some(key);
            }
            let page_size = match ensured.iter().find(|(k, _)| *k == key) {
                Some((_, size)) => *size,
                None => {
                    let size = ensure_page_texture(gl, state, provider, resolution, draw.page, key);
                    ensured.push((key, size));
                    size
                }
            };
            let (pw, ph) = (page_size.w as f32, page_size.h as f32);
            let clip = [
                state.clip_px.min.x as f32,
                state.clip_px.min.y as f32,
                state.clip_px.max.x as f32,
                state.clip_px.max.y as f32,
            ];
            // Two triangles per quad.
            let d = draw.dst;
            let s = draw.src;
            let corners = [
                (d.min.x, d.min.y, s.min.x / pw, s.min.y / ph),
                (d.max.x, d.min.y, s.max.x / pw, s.min.y / ph),
                (d.max.x, d.max.y, s.max.x / pw, s.max.y / ph),
                (d.min.x, d.min.y, s.min.x / pw, s.min.y / ph),
                (d.max.x, d.max.y, s.max.x / pw, s.max.y / ph),
                (d.min.x, d.max.y, s.min.x / pw, s.max.y / ph),
            ];
            for (dx, dy, sx, sy) in corners {
                self.batch.dst.extend_from_slice(&[dx, dy]);
                self.batch.src.extend_from_slice(&[sx, sy]);
                self.batch.clip.extend_from_slice(&clip);
                self.batch.color.extend_from_slice(&rgba);
            }
        }
    }

    /// Draws and clears the pending glyph batch. The quad data lives in
    /// transient buffers deleted right after the draw; only the page
    /// texture is a cached resource.
    pub fn commit_glyphs(&mut self, gl: &glow::Context, state: &mut FrameState) {
        if self.batch.is_empty() {
            self.batch.key = None;
            return;
        }
        let key = self
            .batch
            .key
            .expect("non-empty glyph batch always has a page key");
        let frame = state.frame;
        let Some(texture) = state.textures.get_mut(&key, frame).map(|r| r.texture) else {
            self.batch.clear();
            return;
        };
        let transform = ortho(state);
        let dst = transient_buffer(gl, &self.batch.dst);
        let src = transient_buffer(gl, &self.batch.src);
        let clip = transient_buffer(gl, &self.batch.clip);
        let color = transient_buffer(gl, &self.batch.color);
        self.glyph.bind(
            gl,
            &[
                Stream {
                    name: "a_dst",
                    buffer: dst,
                    components: 2,
                    stride: 0,
                    offset: 0,
                },
                Stream {
                    name: "a_src",
                    buffer: src,
                    components: 2,
                    stride: 0,
                    offset: 0,
                },
                Stream {
                    name: "a_clip",
                    buffer: clip,
                    components: 4,
                    stride: 0,
                    offset: 0,
                },
                Stream {
                    name: "a_color",
                    buffer: color,
                    components: 4,
                    stride: 0,
                    offset: 0,
                },
            ],
            &[
                Uniform {
                    name: "u_transform",
                    value: UniformValue::Mat3(transform),
                },
                Uniform {
                    name: "u_page",
                    value: UniformValue::Sampler(texture),
                },
            ],
        );
        unsafe {
            gl.draw_arrays(glow::TRIANGLES, 0, self.batch.vertex_count());
        }
        self.glyph.unbind(gl);
        unsafe {
            gl.delete_buffer(dst);
            gl.delete_buffer(src);
            gl.delete_buffer(clip);
            gl.delete_buffer(color);
        }
        state.draw_calls += 1;
        check_gl_error(gl, "glyph batch");
        self.batch.clear();
    }
}

/// Creates or refreshes the GL texture for one atlas page and returns the
/// page size. A generation bump since the last upload re-uploads the bitmap.
fn ensure_page_texture(
    gl: &glow::Context,
    state: &mut FrameState,
    provider: &Arc<dyn GlyphProvider>,
    resolution: u32,
    page: u64,
    key: TextureKey,
) -> geom::Size {
    let snapshot = provider.page(resolution, page);
    let frame = state.frame;
    let resource = state.textures.get_or_create(key, frame, || {
        TextureResource::new(create_texture(gl), snapshot.size)
    });
    if resource.generation != snapshot.generation {
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(resource.texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::R8 as i32,
                snapshot.size.w,
                snapshot.size.h,
                0,
                glow::RED,
                glow::UNSIGNED_BYTE,
                Some(snapshot.alpha.as_slice()),
            );
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
        }
        resource.generation = snapshot.generation;
        resource.size = snapshot.size;
    }
    resource.size
}

fn create_texture(gl: &glow::Context) -> crate::context::GlTexture {
    unsafe {
        let texture = gl
            .create_texture()
            .unwrap_or_else(|e| panic!("texture allocation failed: {}", e));
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            glow::LINEAR as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MAG_FILTER,
            glow::LINEAR as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_S,
            glow::CLAMP_TO_EDGE as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_T,
            glow::CLAMP_TO_EDGE as i32,
        );
        texture
    }
}

fn upload_rgba_texture(gl: &glow::Context, texture: &Texture) -> TextureResource {
    let gl_texture = create_texture(gl);
    let size = texture.size_px();
    unsafe {
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            size.w,
            size.h,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            Some(texture.rgba().as_slice()),
        );
    }
    TextureResource::new(gl_texture, size)
}

fn upload_stream(gl: &glow::Context, points: &[geom::Vec2]) -> StreamResource {
    let buffer = unsafe {
        let buffer = gl
            .create_buffer()
            .unwrap_or_else(|e| panic!("buffer allocation failed: {}", e));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            &shape::positions_as_bytes(points),
            glow::STATIC_DRAW,
        );
        buffer
    };
    StreamResource {
        buffer,
        count: points.len() as i32,
        last_used_frame: 0,
    }
}

fn upload_indices(gl: &glow::Context, indices: &[u32]) -> IndexResource {
    let buffer = unsafe {
        let buffer = gl
            .create_buffer()
            .unwrap_or_else(|e| panic!("buffer allocation failed: {}", e));
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
        let mut bytes = Vec::with_capacity(indices.len() * 4);
        for i in indices {
            bytes.extend_from_slice(&i.to_le_bytes());
        }
        gl.buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, &bytes, glow::STATIC_DRAW);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
        buffer
    };
    IndexResource {
        buffer,
        count: indices.len() as i32,
        last_used_frame: 0,
    }
}

fn transient_buffer(gl: &glow::Context, data: &[f32]) -> GlBuffer {
    unsafe {
        let buffer = gl
            .create_buffer()
            .unwrap_or_else(|e| panic!("buffer allocation failed: {}", e));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, f32_slice_bytes(data), glow::STREAM_DRAW);
        buffer
    }
}

fn stream_parts(resource: Option<&mut StreamResource>) -> (GlBuffer, i32) {
    let r = resource.expect("shape stream resident after ensure");
    (r.buffer, r.count)
}

fn index_parts(resource: Option<&mut IndexResource>) -> (GlBuffer, i32) {
    let r = resource.expect("shape indices resident after ensure");
    (r.buffer, r.count)
}

fn unit_quad_stream(buffer: GlBuffer) -> Stream<'static> {
    Stream {
        name: "a_position",
        buffer,
        components: 2,
        stride: 0,
        offset: 0,
    }
}

/// Pixel-space orthographic projection for the current frame.
fn ortho(state: &FrameState) -> [f32; 9] {
    Mat3::ortho(state.size_px.w as f32, state.size_px.h as f32).to_column_major()
}

/// Maps the unit quad onto `rect_px` and into clip space.
fn rect_transform(state: &FrameState, rect_px: Rect) -> [f32; 9] {
    Mat3::ortho(state.size_px.w as f32, state.size_px.h as f32)
        .mul(Mat3::translate(rect_px.min.x as f32, rect_px.min.y as f32))
        .mul(Mat3::scale(rect_px.w() as f32, rect_px.h() as f32))
        .to_column_major()
}

fn f32_slice_bytes(data: &[f32]) -> &[u8] {
    // f32 slices are always validly viewable as bytes.
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, data.len() * 4) }
}
