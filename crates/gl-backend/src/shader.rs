//! Shader program compilation and reflected binding.
//!
//! Attribute streams are matched to active attributes by name; uniforms
//! are dispatched on their reflected datatype. Sampler uniforms get a
//! deterministic texture unit assigned at link time.

use glow::HasContext;
use thiserror::Error;

use crate::context::{GlBuffer, GlTexture};

/// GLSL sources for the three built-in programs.
pub mod sources {
    /// Solid-color shapes and rects. Color arrives premultiplied.
    pub const SOLID_VS: &str = r#"#version 330 core
uniform mat3 u_transform;
in vec2 a_position;
void main() {
    vec3 p = u_transform * vec3(a_position, 1.0);
    gl_Position = vec4(p.xy, 0.0, 1.0);
}
"#;

    pub const SOLID_FS: &str = r#"#version 330 core
uniform vec4 u_color;
out vec4 o_color;
void main() {
    o_color = u_color;
}
"#;

    /// General textured copy over a unit quad.
    pub const COPY_VS: &str = r#"#version 330 core
uniform mat3 u_transform;
in vec2 a_position;
out vec2 v_uv;
void main() {
    v_uv = a_position;
    vec3 p = u_transform * vec3(a_position, 1.0);
    gl_Position = vec4(p.xy, 0.0, 1.0);
}
"#;

    pub const COPY_FS: &str = r#"#version 330 core
uniform sampler2D u_texture;
in vec2 v_uv;
out vec4 o_color;
void main() {
    o_color = texture(u_texture, v_uv);
}
"#;

    /// Batched glyph quads: per-vertex destination, source, clip, color.
    pub const GLYPH_VS: &str = r#"#version 330 core
uniform mat3 u_transform;
in vec2 a_dst;
in vec2 a_src;
in vec4 a_clip;
in vec4 a_color;
out vec2 v_uv;
out vec4 v_clip;
out vec4 v_color;
out vec2 v_pos;
void main() {
    v_uv = a_src;
    v_clip = a_clip;
    v_color = a_color;
    v_pos = a_dst;
    vec3 p = u_transform * vec3(a_dst, 1.0);
    gl_Position = vec4(p.xy, 0.0, 1.0);
}
"#;

    pub const GLYPH_FS: &str = r#"#version 330 core
uniform sampler2D u_page;
in vec2 v_uv;
in vec4 v_clip;
in vec4 v_color;
in vec2 v_pos;
out vec4 o_color;
void main() {
    if (v_pos.x < v_clip.x || v_pos.y < v_clip.y ||
        v_pos.x >= v_clip.z || v_pos.y >= v_clip.w) {
        discard;
    }
    float alpha = texture(u_page, v_uv).r;
    o_color = v_color * alpha;
}
"#;
}

/// Program construction failures.
#[derive(Debug, Error)]
pub enum GlError {
    #[error("shader compile failed: {0}")]
    Compile(String),
    #[error("program link failed: {0}")]
    Link(String),
}

struct AttributeInfo {
    name: String,
    location: u32,
    /// GL datatype (`FLOAT`, `FLOAT_VEC2`, ...).
    gl_type: u32,
}

struct UniformInfo {
    name: String,
    location: <glow::Context as HasContext>::UniformLocation,
    gl_type: u32,
    /// Unit assigned at link time for sampler uniforms.
    texture_unit: Option<u32>,
}

/// A named vertex stream bound by attribute name.
pub struct Stream<'a> {
    pub name: &'a str,
    pub buffer: GlBuffer,
    /// Float components per vertex.
    pub components: i32,
    /// Byte stride between vertices (0 = tightly packed).
    pub stride: i32,
    /// Byte offset of the first component.
    pub offset: i32,
}

/// A uniform value to upload.
pub enum UniformValue {
    F32(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3([f32; 9]),
    Sampler(GlTexture),
}

/// One named uniform binding.
pub struct Uniform<'a> {
    pub name: &'a str,
    pub value: UniformValue,
}

/// A linked program plus its reflected interface.
pub struct Program {
    program: <glow::Context as HasContext>::Program,
    attributes: Vec<AttributeInfo>,
    uniforms: Vec<UniformInfo>,
}

fn components_of(gl_type: u32) -> i32 {
    match gl_type {
        glow::FLOAT => 1,
        glow::FLOAT_VEC2 => 2,
        glow::FLOAT_VEC3 => 3,
        glow::FLOAT_VEC4 => 4,
        other => panic!("unsupported attribute datatype 0x{:x}", other),
    }
}

impl Program {
    /// Compiles and links, then reflects attributes and uniforms.
    pub fn new(gl: &glow::Context, vs_src: &str, fs_src: &str) -> Result<Program, GlError> {
        unsafe {
            let vs = compile(gl, glow::VERTEX_SHADER, vs_src)?;
            let fs = compile(gl, glow::FRAGMENT_SHADER, fs_src)?;
            let program = gl.create_program().map_err(GlError::Link)?;
            gl.attach_shader(program, vs);
            gl.attach_shader(program, fs);
            gl.link_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(GlError::Link(log));
            }

            let mut attributes = Vec::new();
            for i in 0..gl.get_active_attributes(program) {
                if let Some(attr) = gl.get_active_attribute(program, i) {
                    let location = gl
                        .get_attrib_location(program, &attr.name)
                        .expect("active attribute has a location");
                    attributes.push(AttributeInfo {
                        name: attr.name,
                        location,
                        gl_type: attr.atype,
                    });
                }
            }

            let mut uniforms = Vec::new();
            let mut next_unit = 0;
            for i in 0..gl.get_active_uniforms(program) {
                if let Some(u) = gl.get_active_uniform(program, i) {
                    let location = gl
                        .get_uniform_location(program, &u.name)
                        .expect("active uniform has a location");
                    let texture_unit = (u.utype == glow::SAMPLER_2D).then(|| {
                        let unit = next_unit;
                        next_unit += 1;
                        unit
                    });
                    uniforms.push(UniformInfo {
                        name: u.name,
                        location,
                        gl_type: u.utype,
                        texture_unit,
                    });
                }
            }

            Ok(Program {
                program,
                attributes,
                uniforms,
            })
        }
    }

    /// Binds the program, pointing every active attribute at its matching
    /// stream and uploading every uniform. A missing stream/uniform or a
    /// datatype mismatch is a contract violation.
    pub fn bind(&self, gl: &glow::Context, streams: &[Stream<'_>], uniforms: &[Uniform<'_>]) {
        unsafe {
            gl.use_program(Some(self.program));
            for attr in &self.attributes {
                let stream = streams
                    .iter()
                    .find(|s| s.name == attr.name)
                    .unwrap_or_else(|| panic!("no stream named {}", attr.name));
                let expected = components_of(attr.gl_type);
                assert_eq!(
                    stream.components, expected,
                    "stream {} has {} components, shader expects {}",
                    attr.name, stream.components, expected
                );
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(stream.buffer));
                gl.enable_vertex_attrib_array(attr.location);
                gl.vertex_attrib_pointer_f32(
                    attr.location,
                    stream.components,
                    glow::FLOAT,
                    false,
                    stream.stride,
                    stream.offset,
                );
            }
            for u in uniforms {
                let info = self
                    .uniforms
                    .iter()
                    .find(|i| i.name == u.name)
                    .unwrap_or_else(|| panic!("no uniform named {}", u.name));
                match &u.value {
                    UniformValue::F32(v) => {
                        assert_eq!(info.gl_type, glow::FLOAT, "uniform {} type", u.name);
                        gl.uniform_1_f32(Some(&info.location), *v);
                    }
                    UniformValue::Vec2(v) => {
                        assert_eq!(info.gl_type, glow::FLOAT_VEC2, "uniform {} type", u.name);
                        gl.uniform_2_f32(Some(&info.location), v[0], v[1]);
                    }
                    UniformValue::Vec3(v) => {
                        assert_eq!(info.gl_type, glow::FLOAT_VEC3, "uniform {} type", u.name);
                        gl.uniform_3_f32(Some(&info.location), v[0], v[1], v[2]);
                    }
                    UniformValue::Vec4(v) => {
                        assert_eq!(info.gl_type, glow::FLOAT_VEC4, "uniform {} type", u.name);
                        gl.uniform_4_f32(Some(&info.location), v[0], v[1], v[2], v[3]);
                    }
                    UniformValue::Mat3(m) => {
                        assert_eq!(info.gl_type, glow::FLOAT_MAT3, "uniform {} type", u.name);
                        gl.uniform_matrix_3_f32_slice(Some(&info.location), false, m);
                    }
                    UniformValue::Sampler(texture) => {
                        assert_eq!(info.gl_type, glow::SAMPLER_2D, "uniform {} type", u.name);
                        let unit = info
                            .texture_unit
                            .expect("sampler uniforms get a unit at link time");
                        gl.active_texture(glow::TEXTURE0 + unit);
                        gl.bind_texture(glow::TEXTURE_2D, Some(*texture));
                        gl.uniform_1_i32(Some(&info.location), unit as i32);
                    }
                }
            }
        }
    }

    /// Disables the attribute arrays enabled by [`Program::bind`].
    pub fn unbind(&self, gl: &glow::Context) {
        unsafe {
            for attr in &self.attributes {
                gl.disable_vertex_attrib_array(attr.location);
            }
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_program(self.program) }
    }
}

unsafe fn compile(
    gl: &glow::Context,
    kind: u32,
    src: &str,
) -> Result<<glow::Context as HasContext>::Shader, GlError> {
    let shader = gl.create_shader(kind).map_err(GlError::Compile)?;
    gl.shader_source(shader, src);
    gl.compile_shader(shader);
    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(GlError::Compile(log));
    }
    Ok(shader)
}

/// Panics if the context recorded a GL error. Called after draw calls.
pub fn check_gl_error(gl: &glow::Context, what: &str) {
    let err = unsafe { gl.get_error() };
    if err != glow::NO_ERROR {
        panic!("GL error 0x{:x} after {}", err, what);
    }
}
