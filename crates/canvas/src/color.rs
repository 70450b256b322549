//! Colors, pens, and brushes.

use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA color, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Color = Color::rgba(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Color = Color::rgba(0.0, 0.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Color {
        Color { r, g, b, a: 1.0 }
    }

    pub fn gray(v: f32) -> Color {
        Color::rgba(v, v, v, 1.0)
    }

    pub fn mul_alpha(self, a: f32) -> Color {
        Color { a: self.a * a, ..self }
    }

    /// Premultiplied components, ready for the glyph shader.
    pub fn premultiplied(self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }

    /// A zero-alpha color draws nothing.
    pub fn is_visible(self) -> bool {
        self.a > 0.0
    }
}

/// Stroke parameters. A zero-alpha color suppresses the stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pen {
    pub width: f32,
    pub color: Color,
}

impl Pen {
    pub const NONE: Pen = Pen {
        width: 0.0,
        color: Color::TRANSPARENT,
    };

    pub fn new(width: f32, color: Color) -> Self {
        Self { width, color }
    }

    pub fn is_visible(self) -> bool {
        self.width > 0.0 && self.color.is_visible()
    }
}

/// Fill parameters. A zero-alpha color suppresses the fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub color: Color,
}

impl Brush {
    pub const NONE: Brush = Brush {
        color: Color::TRANSPARENT,
    };

    pub fn new(color: Color) -> Self {
        Self { color }
    }

    pub fn is_visible(self) -> bool {
        self.color.is_visible()
    }
}
