//! # Kestrel Fonts
//!
//! Wraps a TrueType source (rasterized by `fontdue`) with the measurement
//! and layout operations text controls need, plus per-resolution glyph
//! tables packed into 512×512 atlas pages. The font implements the canvas
//! [`GlyphProvider`] trait so `draw_runes` ops can resolve glyph quads at
//! replay time on the driver thread.

pub mod atlas;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use canvas::{GlyphDraw, GlyphProvider, PageSnapshot};
use geom::{Point, PointF, Rect, RectF, Size};
use parking_lot::Mutex;
use thiserror::Error;

use atlas::GlyphTable;

static NEXT_FONT_ID: AtomicU64 = AtomicU64::new(1);

/// Font loading failures.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("font parse failed: {0}")]
    Parse(&'static str),
}

/// Horizontal alignment within a text block's align-rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical alignment within a text block's align-rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// A run of runes positioned against an align-rect.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub runes: Vec<char>,
    pub align_rect: Rect,
    pub h_align: HAlign,
    pub v_align: VAlign,
}

impl TextBlock {
    pub fn left_top(runes: Vec<char>, align_rect: Rect) -> Self {
        Self {
            runes,
            align_rect,
            h_align: HAlign::Left,
            v_align: VAlign::Top,
        }
    }
}

struct FontInner {
    id: u64,
    source: fontdue::Font,
    /// Nominal size in DIPs per em.
    size: u32,
    /// Line advance at the nominal size, DIPs.
    line_height: f32,
    /// Baseline offset from the line top at the nominal size, DIPs.
    ascent: f32,
    advances: Mutex<HashMap<char, f32>>,
    /// Resolution bucket → glyph table. The bucket is 256 × pixels-per-DIP.
    tables: Mutex<HashMap<u32, GlyphTable>>,
}

/// A sized font. Cheap to clone; glyph tables are shared.
#[derive(Clone)]
pub struct Font {
    inner: Arc<FontInner>,
}

impl Font {
    /// Parses TrueType bytes at a nominal DIP size.
    pub fn from_bytes(data: &[u8], size: u32) -> Result<Font, FontError> {
        let source = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(FontError::Parse)?;
        let metrics = source
            .horizontal_line_metrics(size as f32)
            .ok_or(FontError::Parse("font has no horizontal metrics"))?;
        Ok(Font {
            inner: Arc::new(FontInner {
                id: NEXT_FONT_ID.fetch_add(1, Ordering::Relaxed),
                line_height: metrics.new_line_size,
                ascent: metrics.ascent,
                source,
                size,
                advances: Mutex::new(HashMap::new()),
                tables: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn size(&self) -> u32 {
        self.inner.size
    }

    /// Line advance in DIPs.
    pub fn line_height(&self) -> i32 {
        self.inner.line_height.ceil() as i32
    }

    /// Baseline offset from a line's top, in DIPs.
    pub fn ascent(&self) -> f32 {
        self.inner.ascent
    }

    /// Advance of one rune in DIPs, cached.
    pub fn advance(&self, rune: char) -> f32 {
        *self
            .inner
            .advances
            .lock()
            .entry(rune)
            .or_insert_with(|| {
                self.inner
                    .source
                    .metrics(rune, self.inner.size as f32)
                    .advance_width
            })
    }

    /// Measures a block: newlines reset x and advance y by the line height,
    /// every other rune advances x by its cached advance.
    pub fn measure(&self, block: &TextBlock) -> Size {
        let (w, lines) = self.measure_extent(&block.runes);
        Size::new(w.ceil() as i32, lines * self.line_height())
    }

    /// Measures a bare rune slice (single- or multi-line).
    pub fn measure_runes(&self, runes: &[char]) -> Size {
        let (w, lines) = self.measure_extent(runes);
        Size::new(w.ceil() as i32, lines * self.line_height())
    }

    fn measure_extent(&self, runes: &[char]) -> (f32, i32) {
        let mut x = 0.0f32;
        let mut max_x = 0.0f32;
        let mut lines = 1;
        for &r in runes {
            if r == '\n' {
                x = 0.0;
                lines += 1;
                continue;
            }
            x += self.advance(r);
            max_x = max_x.max(x);
        }
        (max_x, lines)
    }

    /// Per-rune baseline pen positions, aligned against the block's
    /// align-rect. The i-th position corresponds to the i-th rune.
    pub fn layout(&self, block: &TextBlock) -> Vec<PointF> {
        let mut pens = Vec::with_capacity(block.runes.len());
        let mut x = 0.0f32;
        let mut line = 0;
        for &r in &block.runes {
            pens.push(PointF::new(
                x,
                line as f32 * self.inner.line_height + self.inner.ascent,
            ));
            if r == '\n' {
                x = 0.0;
                line += 1;
            } else {
                x += self.advance(r);
            }
        }
        let size = self.measure(block);
        let rect = block.align_rect;
        let dx = match block.h_align {
            HAlign::Left => rect.min.x as f32,
            HAlign::Center => rect.min.x as f32 + (rect.w() - size.w) as f32 / 2.0,
            HAlign::Right => (rect.max.x - size.w) as f32,
        };
        let dy = match block.v_align {
            VAlign::Top => rect.min.y as f32,
            VAlign::Middle => rect.min.y as f32 + (rect.h() - size.h) as f32 / 2.0,
            VAlign::Bottom => (rect.max.y - size.h) as f32,
        };
        for pen in &mut pens {
            pen.x += dx;
            pen.y += dy;
        }
        pens
    }

    /// Rasterizes `rune` at `resolution` and returns its tight bounds in
    /// y-down pixels relative to the baseline pen, plus the bitmap.
    fn rasterize(&self, resolution: u32, rune: char) -> (RectF, Vec<u8>, i32, i32) {
        let px = self.inner.size as f32 * resolution as f32 / 256.0;
        let (metrics, bitmap) = self.inner.source.rasterize(rune, px);
        let w = metrics.width as i32;
        let h = metrics.height as i32;
        let bounds = RectF::from_xywh(
            metrics.xmin as f32,
            -(metrics.ymin as f32 + h as f32),
            w as f32,
            h as f32,
        );
        (bounds, bitmap, w, h)
    }
}

impl GlyphProvider for Font {
    fn font_id(&self) -> u64 {
        self.inner.id
    }

    fn resolve(&self, resolution: u32, runes: &[char], pens_px: &[PointF]) -> Vec<GlyphDraw> {
        let mut tables = self.inner.tables.lock();
        let table = tables.entry(resolution).or_insert_with(GlyphTable::new);
        let mut draws = Vec::with_capacity(runes.len());
        for (&rune, &pen) in runes.iter().zip(pens_px) {
            if rune.is_whitespace() {
                continue;
            }
            let Some(entry) = table.entry(rune, |r| self.rasterize(resolution, r)) else {
                continue;
            };
            let src = entry
                .tight_bounds
                .offset(PointF::from(entry.atlas_offset) - entry.tight_bounds.min);
            draws.push(GlyphDraw {
                page: entry.page as u64,
                src,
                dst: entry.tight_bounds.offset(pen),
            });
        }
        draws
    }

    fn page(&self, resolution: u32, page: u64) -> PageSnapshot {
        let tables = self.inner.tables.lock();
        let table = tables
            .get(&resolution)
            .expect("page queried before any resolve at this resolution");
        let page = table.page(page as usize);
        PageSnapshot {
            generation: page.generation(),
            size: page.size(),
            alpha: page.alpha().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Deja Vu-style metrics are not needed; any parseable TTF works. The
    // test font is a tiny embedded subset used across the workspace tests.
    fn test_font() -> Font {
        Font::from_bytes(test_assets::FONT_BYTES, 12).expect("test font parses")
    }

    mod test_assets {
        // A minimal valid TTF is required at test time; the workspace
        // vendors one under tests/assets for the integration suite.
        pub static FONT_BYTES: &[u8] =
            include_bytes!("../../../tests/assets/DejaVuSansMono.ttf");
    }

    #[test]
    fn parse_garbage_fails() {
        assert!(Font::from_bytes(&[0, 1, 2, 3], 12).is_err());
    }

    #[test]
    fn measure_counts_lines() {
        let font = test_font();
        let one = font.measure_runes(&['a', 'b']);
        let two = font.measure_runes(&['a', '\n', 'b']);
        assert_eq!(two.h, one.h * 2);
        assert!(two.w <= one.w);
    }

    #[test]
    fn measure_width_is_monotonic() {
        let font = test_font();
        let short = font.measure_runes(&['a']);
        let long = font.measure_runes(&['a', 'a', 'a']);
        assert!(long.w > short.w);
    }

    #[test]
    fn layout_positions_match_measure() {
        let font = test_font();
        let block = TextBlock::left_top(vec!['h', 'i', '\n', 'x'], Rect::from_xywh(0, 0, 100, 100));
        let pens = font.layout(&block);
        assert_eq!(pens.len(), 4);
        // Second line starts back at x = 0.
        assert_eq!(pens[3].x, 0.0);
        assert!(pens[3].y > pens[0].y);
        // Measuring the layout extent reproduces measure().
        let measured = font.measure(&block);
        let max_x = pens
            .iter()
            .zip(&block.runes)
            .map(|(p, &r)| if r == '\n' { p.x } else { p.x + font.advance(r) })
            .fold(0.0f32, f32::max);
        assert_eq!(measured.w, max_x.ceil() as i32);
    }

    #[test]
    fn right_alignment_shifts_pens() {
        let font = test_font();
        let mut block = TextBlock::left_top(vec!['a'], Rect::from_xywh(0, 0, 100, 100));
        block.h_align = HAlign::Right;
        let pens = font.layout(&block);
        assert!(pens[0].x > 50.0);
    }

    #[test]
    fn resolve_skips_whitespace() {
        let font = test_font();
        let pens = vec![PointF::ZERO; 3];
        let draws = font.resolve(256, &['a', ' ', 'b'], &pens);
        assert_eq!(draws.len(), 2);
    }

    #[test]
    fn resolve_is_stable_across_calls() {
        let font = test_font();
        let pens = vec![PointF::ZERO];
        let a = font.resolve(256, &['a'], &pens);
        let b = font.resolve(256, &['a'], &pens);
        assert_eq!(a[0].src.min, b[0].src.min);
        assert_eq!(a[0].page, b[0].page);
    }
}
