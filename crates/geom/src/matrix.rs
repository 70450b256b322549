//! Row-major 3×3 matrix for 2D transforms.

use crate::vector::Vec2;

/// Row-major 3×3 matrix. The GL backend transposes on upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub m: [f32; 9],
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Orthographic projection mapping `[0,w]×[0,h]` to clip space with a
    /// top-left origin.
    pub fn ortho(w: f32, h: f32) -> Mat3 {
        Mat3 {
            m: [
                2.0 / w, 0.0, -1.0, //
                0.0, -2.0 / h, 1.0, //
                0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn translate(x: f32, y: f32) -> Mat3 {
        Mat3 {
            m: [1.0, 0.0, x, 0.0, 1.0, y, 0.0, 0.0, 1.0],
        }
    }

    pub fn scale(x: f32, y: f32) -> Mat3 {
        Mat3 {
            m: [x, 0.0, 0.0, 0.0, y, 0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn mul(self, rhs: Mat3) -> Mat3 {
        let a = &self.m;
        let b = &rhs.m;
        let mut out = [0.0f32; 9];
        for row in 0..3 {
            for col in 0..3 {
                let mut acc = 0.0;
                for k in 0..3 {
                    acc += a[row * 3 + k] * b[k * 3 + col];
                }
                out[row * 3 + col] = acc;
            }
        }
        Mat3 { m: out }
    }

    pub fn apply(self, v: Vec2) -> Vec2 {
        let m = &self.m;
        Vec2::new(
            m[0] * v.x + m[1] * v.y + m[2],
            m[3] * v.x + m[4] * v.y + m[5],
        )
    }

    /// Column-major array for `uniform_matrix_3_f32_slice`.
    pub fn to_column_major(self) -> [f32; 9] {
        let m = &self.m;
        [m[0], m[3], m[6], m[1], m[4], m[7], m[2], m[5], m[8]]
    }
}
