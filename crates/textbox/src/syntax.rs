//! Syntax highlight layers: interval-list spans tagged with optional
//! foreground, background, and border colors. Layers paint in declared
//! order; [`CodeEditorLine`](crate::CodeEditorLine) resolves overlaps.

use canvas::Color;
use interval::{IntervalList, Span};

use crate::TextEdit;

/// One highlight class: a set of rune spans plus how to paint them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyntaxLayer {
    spans: IntervalList<()>,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub border: Option<Color>,
}

impl SyntaxLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a span, merging into any it touches.
    pub fn add(&mut self, span: Span) {
        self.spans.merge(span, ());
    }

    pub fn clear(&mut self) {
        self.spans = IntervalList::new();
    }

    pub fn spans(&self) -> &IntervalList<()> {
        &self.spans
    }

    /// Translates every span for an edit batch so highlights stay glued
    /// to the runes they cover.
    pub fn shift_for_edits(&mut self, edits: &[TextEdit], rune_count: usize) {
        for edit in edits {
            self.spans.shift_for_edit(edit.at, edit.delta, rune_count);
        }
    }
}

/// Ordered layer stack for a code editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeSyntaxLayers {
    layers: Vec<SyntaxLayer>,
}

impl CodeSyntaxLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: SyntaxLayer) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SyntaxLayer> {
        self.layers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SyntaxLayer> {
        self.layers.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyntaxLayer> {
        self.layers.iter()
    }

    pub fn shift_for_edits(&mut self, edits: &[TextEdit], rune_count: usize) {
        for layer in &mut self.layers {
            layer.shift_for_edits(edits, rune_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_spans(layer: &SyntaxLayer) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        layer
            .spans()
            .visit(Span::new(0, usize::MAX), |s, _| out.push((s.start, s.end)));
        out
    }

    #[test]
    fn an_insertion_slides_later_spans_right() {
        let mut layer = SyntaxLayer::new();
        layer.add(Span::new(2, 5));
        layer.add(Span::new(8, 10));
        layer.shift_for_edits(&[TextEdit { at: 6, delta: 3 }], 13);
        assert_eq!(layer_spans(&layer), vec![(2, 5), (11, 13)]);
    }

    #[test]
    fn a_deletion_clamps_spans_into_the_new_text() {
        let mut layer = SyntaxLayer::new();
        layer.add(Span::new(4, 9));
        layer.shift_for_edits(&[TextEdit { at: 0, delta: -4 }], 6);
        assert_eq!(layer_spans(&layer), vec![(0, 5)]);
    }

    #[test]
    fn a_stack_shift_reaches_every_layer() {
        let mut layers = CodeSyntaxLayers::new();
        let mut keywords = SyntaxLayer::new();
        keywords.foreground = Some(Color::BLUE);
        keywords.add(Span::new(0, 3));
        let mut strings = SyntaxLayer::new();
        strings.foreground = Some(Color::GREEN);
        strings.add(Span::new(5, 8));
        layers.push(keywords);
        layers.push(strings);
        layers.shift_for_edits(&[TextEdit { at: 4, delta: 2 }], 10);
        assert_eq!(layer_spans(layers.get(0).unwrap()), vec![(0, 3)]);
        assert_eq!(layer_spans(layers.get(1).unwrap()), vec![(7, 10)]);
    }
}
