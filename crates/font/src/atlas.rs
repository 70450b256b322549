//! Glyph atlas pages.
//!
//! A page is a fixed 512×512 single-channel bitmap packed row by row.
//! Pages are append-only: when the current row cannot fit a glyph the
//! cursor wraps to a new row, and when the page is full a new page is
//! appended to the table. The GL texture behind a page is created lazily
//! by the backend and re-uploaded when the page's generation advances.

use std::collections::HashMap;
use std::sync::Arc;

use geom::{Point, RectF, Size};

/// Atlas page edge length in pixels.
pub const PAGE_SIZE: i32 = 512;

/// Padding between packed glyphs, in pixels.
const PAD: i32 = 1;

/// Where a rasterized rune lives and how to place it against its pen.
#[derive(Debug, Clone, Copy)]
pub struct GlyphEntry {
    /// Index of the page holding the bitmap.
    pub page: usize,
    /// Top-left of the glyph within the page, in texels.
    pub atlas_offset: Point,
    /// Bitmap extent offset from the rune's baseline pen position,
    /// y-down pixels.
    pub tight_bounds: RectF,
}

/// One 512×512 alpha bitmap with a row-packer cursor.
pub struct Page {
    alpha: Arc<Vec<u8>>,
    cursor: Point,
    row_height: i32,
    generation: u64,
}

impl Page {
    fn new() -> Self {
        Self {
            alpha: Arc::new(vec![0; (PAGE_SIZE * PAGE_SIZE) as usize]),
            cursor: Point::ZERO,
            row_height: 0,
            generation: 0,
        }
    }

    /// Copies `bitmap` (w×h, row major) into the page if it fits, returning
    /// the packed offset.
    fn pack(&mut self, bitmap: &[u8], w: i32, h: i32) -> Option<Point> {
        if w > PAGE_SIZE || h > PAGE_SIZE {
            return None;
        }
        if self.cursor.x + w > PAGE_SIZE {
            // Wrap to the next row.
            self.cursor = Point::new(0, self.cursor.y + self.row_height + PAD);
            self.row_height = 0;
        }
        if self.cursor.y + h > PAGE_SIZE {
            return None;
        }
        let at = self.cursor;
        let alpha = Arc::make_mut(&mut self.alpha);
        for row in 0..h {
            let src = (row * w) as usize;
            let dst = ((at.y + row) * PAGE_SIZE + at.x) as usize;
            alpha[dst..dst + w as usize].copy_from_slice(&bitmap[src..src + w as usize]);
        }
        self.cursor.x += w + PAD;
        self.row_height = self.row_height.max(h);
        self.generation += 1;
        Some(at)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn alpha(&self) -> &Arc<Vec<u8>> {
        &self.alpha
    }

    pub fn size(&self) -> Size {
        Size::new(PAGE_SIZE, PAGE_SIZE)
    }
}

/// Per-resolution table of packed glyphs.
pub struct GlyphTable {
    pages: Vec<Page>,
    entries: HashMap<char, Option<GlyphEntry>>,
}

impl GlyphTable {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub fn page(&self, index: usize) -> &Page {
        &self.pages[index]
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Looks up `rune`, rasterizing and packing on first use. Runes with an
    /// empty bitmap (spaces) record `None`.
    pub fn entry(
        &mut self,
        rune: char,
        rasterize: impl FnOnce(char) -> (RectF, Vec<u8>, i32, i32),
    ) -> Option<GlyphEntry> {
        if let Some(entry) = self.entries.get(&rune) {
            return *entry;
        }
        let (tight_bounds, bitmap, w, h) = rasterize(rune);
        let entry = if w == 0 || h == 0 {
            None
        } else {
            Some(self.pack(rune, tight_bounds, &bitmap, w, h))
        };
        self.entries.insert(rune, entry);
        entry
    }

    fn pack(&mut self, _rune: char, tight_bounds: RectF, bitmap: &[u8], w: i32, h: i32) -> GlyphEntry {
        // Try the most recent page first; pages before it are full enough
        // that retrying them is not worth the scan.
        if let Some(last) = self.pages.last_mut() {
            if let Some(at) = last.pack(bitmap, w, h) {
                return GlyphEntry {
                    page: self.pages.len() - 1,
                    atlas_offset: at,
                    tight_bounds,
                };
            }
        }
        let mut page = Page::new();
        let at = page
            .pack(bitmap, w, h)
            .expect("glyph larger than an atlas page");
        self.pages.push(page);
        GlyphEntry {
            page: self.pages.len() - 1,
            atlas_offset: at,
            tight_bounds,
        }
    }
}
