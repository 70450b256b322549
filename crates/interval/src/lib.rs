//! # Kestrel Intervals
//!
//! Sorted, non-overlapping lists of half-open `[start, end)` spans with
//! attached payloads. Syntax layers store their colored ranges in one of
//! these, and line painting uses [`IntervalList::visit`] to walk the
//! pieces of a span that fall inside a line.

use serde::{Deserialize, Serialize};

/// Half-open span `[start, end)` of rune offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Panics if inverted.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "inverted span {}..{}", start, end);
        Self { start, end }
    }

    pub fn len(self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(self, point: usize) -> bool {
        point >= self.start && point < self.end
    }

    /// Non-empty intersection, if any.
    pub fn intersect(self, other: Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then(|| Span { start, end })
    }

    /// True when the spans overlap or share an endpoint.
    pub fn touches(self, other: Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Sorted non-overlapping span list with payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalList<P> {
    entries: Vec<(Span, P)>,
}

impl<P: Clone + PartialEq> IntervalList<P> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Span, &P)> {
        self.entries.iter().map(|(s, p)| (*s, p))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Inserts `span`, coalescing with touching neighbors that carry an
    /// equal payload. Overlapped ranges with a different payload are
    /// overwritten.
    pub fn merge(&mut self, span: Span, payload: P) {
        if span.is_empty() {
            return;
        }
        let mut span = span;
        self.carve(span);
        // Absorb touching equal-payload neighbors.
        while let Some(pos) = self
            .entries
            .iter()
            .position(|(s, p)| s.touches(span) && *p == payload)
        {
            let (s, _) = self.entries.remove(pos);
            span = Span::new(span.start.min(s.start), span.end.max(s.end));
        }
        self.insert_sorted(span, payload);
    }

    /// Inserts `span`, overwriting whatever it overlaps. Partially covered
    /// neighbors are trimmed or split.
    pub fn replace(&mut self, span: Span, payload: P) {
        if span.is_empty() {
            return;
        }
        self.carve(span);
        self.insert_sorted(span, payload);
    }

    /// Removes `span`'s range, trimming or splitting partial overlaps.
    pub fn remove(&mut self, span: Span) {
        if !span.is_empty() {
            self.carve(span);
        }
    }

    /// Calls `f` with the intersection of each stored span and `query`,
    /// in ascending order.
    pub fn visit(&self, query: Span, mut f: impl FnMut(Span, &P)) {
        for (s, p) in &self.entries {
            if s.start >= query.end {
                break;
            }
            if let Some(hit) = s.intersect(query) {
                f(hit, p);
            }
        }
    }

    /// Index of the entry containing `point`.
    pub fn index_of(&self, point: usize) -> Option<usize> {
        self.entries
            .binary_search_by(|(s, _)| {
                if s.contains(point) {
                    std::cmp::Ordering::Equal
                } else if s.end <= point {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                }
            })
            .ok()
    }

    pub fn entry(&self, index: usize) -> (Span, &P) {
        let (s, p) = &self.entries[index];
        (*s, p)
    }

    /// Shifts every endpoint at or beyond `at` by `delta`, clamping into
    /// `[0, clamp_len]`. Entries collapsing to nothing are dropped. This is
    /// the lock-step translation syntax layers apply on text edits.
    pub fn shift_for_edit(&mut self, at: usize, delta: isize, clamp_len: usize) {
        let adjust = |v: usize| -> usize {
            if v >= at {
                let shifted = v as isize + delta;
                shifted.clamp(0, clamp_len as isize) as usize
            } else {
                v.min(clamp_len)
            }
        };
        self.entries.retain_mut(|(s, _)| {
            let start = adjust(s.start);
            let end = adjust(s.end).max(start);
            *s = Span { start, end };
            !s.is_empty()
        });
    }

    /// Removes every stored part of `span.start..` not covered, leaving the
    /// gap carve ready for insertion.
    fn carve(&mut self, span: Span) {
        let mut out: Vec<(Span, P)> = Vec::with_capacity(self.entries.len() + 1);
        for (s, p) in self.entries.drain(..) {
            if s.end <= span.start || s.start >= span.end {
                out.push((s, p));
                continue;
            }
            if s.start < span.start {
                out.push((Span::new(s.start, span.start), p.clone()));
            }
            if s.end > span.end {
                out.push((Span::new(span.end, s.end), p));
            }
        }
        self.entries = out;
    }

    fn insert_sorted(&mut self, span: Span, payload: P) {
        let pos = self
            .entries
            .iter()
            .position(|(s, _)| s.start >= span.end)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, (span, payload));
    }

    #[cfg(test)]
    fn assert_sorted_non_overlapping(&self) {
        for pair in self.entries.windows(2) {
            assert!(pair[0].0.end <= pair[1].0.start, "overlap: {:?}", self.entries.iter().map(|(s, _)| *s).collect::<Vec<_>>());
        }
    }
}
