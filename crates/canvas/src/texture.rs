//! CPU-side texture wrapper. The GL texture is created lazily by the
//! backend the first time the texture is drawn.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use geom::Size;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// An RGBA8 image plus enough metadata for the backend to blit it.
#[derive(Clone)]
pub struct Texture {
    id: u64,
    size_px: Size,
    pixels_per_dip: f32,
    premultiplied: bool,
    rgba: Arc<Vec<u8>>,
}

impl Texture {
    /// Panics if `rgba` is not `w * h * 4` bytes.
    pub fn new(rgba: Vec<u8>, size_px: Size, pixels_per_dip: f32, premultiplied: bool) -> Self {
        assert_eq!(
            rgba.len(),
            (size_px.w * size_px.h * 4) as usize,
            "texture data does not match {}x{} RGBA",
            size_px.w,
            size_px.h
        );
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            size_px,
            pixels_per_dip,
            premultiplied,
            rgba: Arc::new(rgba),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size_px(&self) -> Size {
        self.size_px
    }

    /// Size in DIPs at the texture's declared density.
    pub fn size_dips(&self) -> Size {
        Size::new(
            (self.size_px.w as f32 / self.pixels_per_dip) as i32,
            (self.size_px.h as f32 / self.pixels_per_dip) as i32,
        )
    }

    pub fn premultiplied(&self) -> bool {
        self.premultiplied
    }

    pub fn rgba(&self) -> &Arc<Vec<u8>> {
        &self.rgba
    }
}
