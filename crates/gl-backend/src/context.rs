//! Per-GL-context resource tracking.
//!
//! Every GL resource the backend creates is owned by one of three maps
//! (textures, vertex streams, index buffers) stamped with the frame that
//! last touched it. `end_draw` destroys whatever the frame did not touch:
//! mark-and-sweep, bounding context memory to the most recent frame's
//! working set.

use std::collections::HashMap;
use std::hash::Hash;

use geom::{DipsToPixels, Rect, Size};

pub type GlTexture = <glow::Context as glow::HasContext>::Texture;
pub type GlBuffer = <glow::Context as glow::HasContext>::Buffer;

/// Identity of a texture in the context map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKey {
    /// An application image texture.
    Image(u64),
    /// One glyph-atlas page of a font at a resolution bucket.
    GlyphPage {
        font: u64,
        resolution: u32,
        page: u64,
    },
}

/// Role a vertex stream plays for a cached shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRole {
    FillPos,
    EdgePos,
}

/// Identity of a cached vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub shape: u64,
    pub role: StreamRole,
}

pub struct TextureResource {
    pub texture: GlTexture,
    /// Atlas-page generation at upload time; a newer snapshot re-uploads.
    pub generation: u64,
    pub size: Size,
    pub(crate) last_used_frame: u64,
}

impl TextureResource {
    /// Fresh resource at generation zero; the map stamps it on insertion.
    pub fn new(texture: GlTexture, size: Size) -> Self {
        Self {
            texture,
            generation: 0,
            size,
            last_used_frame: 0,
        }
    }
}

pub struct StreamResource {
    pub buffer: GlBuffer,
    /// Vertex count.
    pub count: i32,
    pub(crate) last_used_frame: u64,
}

pub struct IndexResource {
    pub buffer: GlBuffer,
    /// Index count.
    pub count: i32,
    pub(crate) last_used_frame: u64,
}

/// Frame-stamped resource map with mark-and-sweep reaping.
pub struct ResourceMap<K, R> {
    entries: HashMap<K, R>,
    stamp: fn(&mut R, u64),
    stamp_of: fn(&R) -> u64,
}

impl<K: Eq + Hash, R> ResourceMap<K, R> {
    fn new(stamp: fn(&mut R, u64), stamp_of: fn(&R) -> u64) -> Self {
        Self {
            entries: HashMap::new(),
            stamp,
            stamp_of,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Fetches the resource, creating it on a miss. Either way the entry is
    /// stamped with `frame`.
    pub fn get_or_create(&mut self, key: K, frame: u64, create: impl FnOnce() -> R) -> &mut R {
        let entry = self.entries.entry(key).or_insert_with(create);
        (self.stamp)(entry, frame);
        entry
    }

    pub fn get_mut(&mut self, key: &K, frame: u64) -> Option<&mut R> {
        let entry = self.entries.get_mut(key)?;
        (self.stamp)(entry, frame);
        Some(entry)
    }

    /// Removes and returns every resource whose stamp is not `frame`, for
    /// the caller to destroy.
    pub fn sweep(&mut self, frame: u64) -> Vec<R> {
        let stamp_of = self.stamp_of;
        let mut kept = HashMap::with_capacity(self.entries.len());
        let mut removed = Vec::new();
        for (k, r) in self.entries.drain() {
            if stamp_of(&r) == frame {
                kept.insert(k, r);
            } else {
                removed.push(r);
            }
        }
        self.entries = kept;
        removed
    }

    pub fn drain_all(&mut self) -> Vec<R> {
        self.entries.drain().map(|(_, r)| r).collect()
    }
}

/// Per-frame state of one GL context.
pub struct FrameState {
    pub textures: ResourceMap<TextureKey, TextureResource>,
    pub streams: ResourceMap<StreamKey, StreamResource>,
    pub indices: ResourceMap<u64, IndexResource>,
    pub frame: u64,
    pub ratio: DipsToPixels,
    pub size_px: Size,
    /// Cached scissor to skip redundant GL calls.
    pub clip_px: Rect,
    pub draw_calls: u32,
}

impl FrameState {
    pub fn new() -> Self {
        Self {
            textures: ResourceMap::new(
                |r, f| r.last_used_frame = f,
                |r| r.last_used_frame,
            ),
            streams: ResourceMap::new(
                |r, f| r.last_used_frame = f,
                |r| r.last_used_frame,
            ),
            indices: ResourceMap::new(
                |r, f| r.last_used_frame = f,
                |r| r.last_used_frame,
            ),
            frame: 0,
            ratio: DipsToPixels::ONE,
            size_px: Size::ZERO,
            clip_px: Rect::ZERO,
            draw_calls: 0,
        }
    }

    /// Starts a frame: computes the DIP ratio and resets statistics.
    pub fn begin(&mut self, size_dips: Size, size_px: Size) {
        self.frame += 1;
        self.ratio = DipsToPixels::from_sizes(size_dips.w, size_px.w);
        self.size_px = size_px;
        self.clip_px = Rect::from_size(size_px);
        self.draw_calls = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(stamp: u64) -> TextureResource {
        TextureResource {
            texture: glow::NativeTexture(std::num::NonZeroU32::new(1).unwrap()),
            generation: 0,
            size: Size::new(1, 1),
            last_used_frame: stamp,
        }
    }

    #[test]
    fn sweep_keeps_only_current_frame() {
        let mut state = FrameState::new();
        state
            .textures
            .get_or_create(TextureKey::Image(1), 1, || texture(0));
        state
            .textures
            .get_or_create(TextureKey::Image(2), 1, || texture(0));
        // Frame 2 touches only texture 1.
        state.textures.get_mut(&TextureKey::Image(1), 2);
        let reaped = state.textures.sweep(2);
        assert_eq!(reaped.len(), 1);
        assert_eq!(state.textures.len(), 1);
        assert!(state.textures.contains(&TextureKey::Image(1)));
    }

    #[test]
    fn untouched_resource_survives_until_missed_frame() {
        let mut state = FrameState::new();
        state
            .textures
            .get_or_create(TextureKey::Image(7), 1, || texture(0));
        assert!(state.textures.sweep(1).is_empty());
        // Nothing touched it in frame 2.
        let reaped = state.textures.sweep(2);
        assert_eq!(reaped.len(), 1);
        assert_eq!(state.textures.len(), 0);
    }

    #[test]
    fn begin_resets_stats_and_ratio() {
        let mut state = FrameState::new();
        state.draw_calls = 10;
        state.begin(Size::new(100, 100), Size::new(200, 200));
        assert_eq!(state.draw_calls, 0);
        assert_eq!(state.ratio, DipsToPixels::from_sizes(1, 2));
        assert_eq!(state.frame, 1);
    }

    #[test]
    fn glyph_page_keys_are_distinct_per_resolution() {
        let a = TextureKey::GlyphPage {
            font: 1,
            resolution: 256,
            page: 0,
        };
        let b = TextureKey::GlyphPage {
            font: 1,
            resolution: 512,
            page: 0,
        };
        assert_ne!(a, b);
    }
}
