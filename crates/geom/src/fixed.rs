//! 16.16 fixed-point DIP→pixel ratio.
//!
//! The backend converts layout coordinates to pixels with one multiply and
//! shift per component; keeping the ratio in fixed point makes the
//! conversion exact for the common integer scale factors.

use crate::{Point, Rect};

/// DIP-to-pixel scale as a 16.16 fixed-point ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DipsToPixels(i64);

impl DipsToPixels {
    pub const ONE: DipsToPixels = DipsToPixels(1 << 16);

    /// Ratio of `pixels / dips`. A zero DIP extent yields the identity.
    pub fn from_sizes(dips: i32, pixels: i32) -> DipsToPixels {
        if dips == 0 {
            return DipsToPixels::ONE;
        }
        DipsToPixels(((pixels as i64) << 16) / dips as i64)
    }

    pub fn from_f32(scale: f32) -> DipsToPixels {
        DipsToPixels((scale * 65536.0) as i64)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 65536.0
    }

    pub fn scale_i32(self, v: i32) -> i32 {
        ((v as i64 * self.0) >> 16) as i32
    }

    pub fn scale_f32(self, v: f32) -> f32 {
        v * self.to_f32()
    }

    pub fn point(self, p: Point) -> Point {
        Point::new(self.scale_i32(p.x), self.scale_i32(p.y))
    }

    pub fn rect(self, r: Rect) -> Rect {
        Rect::new(self.point(r.min), self.point(r.max))
    }
}
