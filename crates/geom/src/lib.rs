//! # Kestrel Geometry
//!
//! Device-independent-pixel geometry primitives shared by every layer of
//! the toolkit: integer points/sizes/rects for layout, float vectors and
//! a 3×3 matrix for the GL backend, and the saturation/interpolation
//! helpers the splitter and scroll math lean on.

pub mod fixed;
pub mod matrix;
pub mod vector;

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

pub use fixed::DipsToPixels;
pub use matrix::Mat3;
pub use vector::{Vec2, Vec3, Vec4};

/// Point in DIPs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise minimum.
    pub fn min(self, other: Point) -> Point {
        Point::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum.
    pub fn max(self, other: Point) -> Point {
        Point::new(self.x.max(other.x), self.y.max(other.y))
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        *self = *self + rhs;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        *self = *self - rhs;
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Add<Size> for Point {
    type Output = Point;
    fn add(self, rhs: Size) -> Point {
        Point::new(self.x + rhs.w, self.y + rhs.h)
    }
}

/// Point in fractional DIPs or pixels, used by text layout and tessellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const ZERO: PointF = PointF { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for PointF {
    fn from(p: Point) -> PointF {
        PointF::new(p.x as f32, p.y as f32)
    }
}

impl Add for PointF {
    type Output = PointF;
    fn add(self, rhs: PointF) -> PointF {
        PointF::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for PointF {
    type Output = PointF;
    fn sub(self, rhs: PointF) -> PointF {
        PointF::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle in fractional coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub min: PointF,
    pub max: PointF,
}

impl RectF {
    pub fn new(min: PointF, max: PointF) -> Self {
        Self { min, max }
    }

    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: PointF::new(x, y),
            max: PointF::new(x + w, y + h),
        }
    }

    pub fn w(self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn h(self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn offset(self, by: PointF) -> RectF {
        RectF::new(self.min + by, self.max + by)
    }
}

impl From<Rect> for RectF {
    fn from(r: Rect) -> RectF {
        RectF::new(r.min.into(), r.max.into())
    }
}

/// Size in DIPs. Components are never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl Size {
    pub const ZERO: Size = Size { w: 0, h: 0 };

    /// Panics if either component is negative.
    pub fn new(w: i32, h: i32) -> Self {
        assert!(w >= 0 && h >= 0, "size must be non-negative: {}x{}", w, h);
        Self { w, h }
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Component-wise maximum.
    pub fn max(self, other: Size) -> Size {
        Size::new(self.w.max(other.w), self.h.max(other.h))
    }

    /// Component-wise minimum.
    pub fn min(self, other: Size) -> Size {
        Size::new(self.w.min(other.w), self.h.min(other.h))
    }

    /// The rect `[0,0 .. w,h)`.
    pub fn rect(self) -> Rect {
        Rect::from_size(self)
    }

    /// Grows by spacing on all four edges.
    pub fn expand(self, s: Spacing) -> Size {
        Size::new(self.w + s.horizontal(), self.h + s.vertical())
    }

    /// Shrinks by spacing, clamping at zero.
    pub fn contract(self, s: Spacing) -> Size {
        Size::new(
            (self.w - s.horizontal()).max(0),
            (self.h - s.vertical()).max(0),
        )
    }
}

impl Add for Size {
    type Output = Size;
    fn add(self, rhs: Size) -> Size {
        Size::new(self.w + rhs.w, self.h + rhs.h)
    }
}

/// Axis-aligned rectangle `[min .. max)` in DIPs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        min: Point::ZERO,
        max: Point::ZERO,
    };

    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            min: Point::new(x, y),
            max: Point::new(x + w, y + h),
        }
    }

    /// `[0,0 .. size)`.
    pub fn from_size(size: Size) -> Self {
        Self {
            min: Point::ZERO,
            max: Point::new(size.w, size.h),
        }
    }

    pub fn size(self) -> Size {
        Size::new(
            (self.max.x - self.min.x).max(0),
            (self.max.y - self.min.y).max(0),
        )
    }

    pub fn w(self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn h(self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn is_empty(self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// Half-open containment test.
    pub fn contains(self, p: Point) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    pub fn intersect(self, other: Rect) -> Rect {
        Rect {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn union(self, other: Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn offset(self, by: Point) -> Rect {
        Rect {
            min: self.min + by,
            max: self.max + by,
        }
    }

    /// Grows outward by spacing.
    pub fn expand(self, s: Spacing) -> Rect {
        Rect {
            min: Point::new(self.min.x - s.l, self.min.y - s.t),
            max: Point::new(self.max.x + s.r, self.max.y + s.b),
        }
    }

    /// Shrinks inward by spacing. The result may be empty but never inverted.
    pub fn contract(self, s: Spacing) -> Rect {
        let min = Point::new(self.min.x + s.l, self.min.y + s.t);
        let max = Point::new((self.max.x - s.r).max(min.x), (self.max.y - s.b).max(min.y));
        Rect { min, max }
    }
}

/// Edge spacing (margin or padding) in DIPs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spacing {
    pub l: i32,
    pub t: i32,
    pub r: i32,
    pub b: i32,
}

impl Spacing {
    pub const ZERO: Spacing = Spacing { l: 0, t: 0, r: 0, b: 0 };

    pub fn new(l: i32, t: i32, r: i32, b: i32) -> Self {
        Self { l, t, r, b }
    }

    pub fn uniform(v: i32) -> Self {
        Self { l: v, t: v, r: v, b: v }
    }

    pub fn horizontal(self) -> i32 {
        self.l + self.r
    }

    pub fn vertical(self) -> i32 {
        self.t + self.b
    }
}

/// Clamps into `[min, max]`.
pub fn sat_i32(v: i32, min: i32, max: i32) -> i32 {
    v.clamp(min, max)
}

/// Clamps into `[0, 1]`.
pub fn sat_f32(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Linear interpolation; `t` outside `[0,1]` extrapolates.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Saturating linear ramp: 0 at `lo`, 1 at `hi`.
pub fn ramp(v: f32, lo: f32, hi: f32) -> f32 {
    if hi == lo {
        return if v >= hi { 1.0 } else { 0.0 };
    }
    sat_f32((v - lo) / (hi - lo))
}
