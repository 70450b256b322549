//! Line views: one control per visible text line.
//!
//! [`TextBoxLine`] paints runes, selection highlights, and carets for a
//! single line of a shared [`TextBoxController`]. [`CodeEditorLine`] adds
//! syntax layers. Both are leaf controls meant to be virtualized by a
//! list; `set_line` retargets a live view to another row.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use canvas::{Brush, Canvas, Color, Pen};
use control::{Control, ControlBase, ControlTree};
use font::{Font, TextBlock};
use geom::{Rect, Size};
use interval::{IntervalList, Span};

use crate::{CodeSyntaxLayers, TextBoxController};

/// Shared handle line views hold on the editing engine.
pub type ControllerRef = Rc<RefCell<TextBoxController>>;

/// X offset of rune `index` within its line, by measuring the prefix.
fn caret_x(font: &Font, runes: &[char], line_start: usize, index: usize) -> i32 {
    font.measure_runes(&runes[line_start..index]).w
}

/// Line-local rect covering `span`, full line height.
fn span_rect(font: &Font, runes: &[char], line_start: usize, span: Span, height: i32) -> Rect {
    let x0 = caret_x(font, runes, line_start, span.start);
    let x1 = caret_x(font, runes, line_start, span.end);
    Rect::from_xywh(x0, 0, x1 - x0, height)
}

/// Paints the parts of every non-empty selection that fall on the line.
fn paint_selections(
    canvas: &mut Canvas,
    ctl: &TextBoxController,
    font: &Font,
    line: usize,
    color: Color,
) {
    let start = ctl.line_start(line);
    let end = ctl.line_end(line);
    if start == end {
        return;
    }
    let mut spans = IntervalList::new();
    for sel in ctl.selections() {
        if !sel.is_empty() {
            spans.merge(sel.span(), ());
        }
    }
    let height = font.line_height();
    spans.visit(Span::new(start, end), |s, _| {
        canvas.draw_rect(span_rect(font, ctl.runes(), start, s, height), Brush::new(color));
    });
}

/// Paints one caret per selection whose caret sits on the line.
fn paint_carets(
    canvas: &mut Canvas,
    ctl: &TextBoxController,
    font: &Font,
    line: usize,
    color: Color,
) {
    let start = ctl.line_start(line);
    let end = ctl.line_end(line);
    let height = font.line_height();
    for sel in ctl.selections() {
        let caret = sel.caret();
        if caret >= start && caret <= end {
            let x = caret_x(font, ctl.runes(), start, caret);
            canvas.draw_rect(Rect::from_xywh(x, 0, 1, height), Brush::new(color));
        }
    }
}

/// Draws the line's runes on `span` in `color`, reusing the full-line pen
/// positions.
fn paint_span_runes(
    canvas: &mut Canvas,
    font: &Font,
    runes: &[char],
    pens: &[geom::PointF],
    line_start: usize,
    span: Span,
    color: Color,
) {
    let lo = span.start - line_start;
    let hi = span.end - line_start;
    canvas.draw_runes(
        Arc::new(font.clone()),
        runes[lo..hi].to_vec(),
        pens[lo..hi].to_vec(),
        color,
    );
}

/// One line of a plain text box.
pub struct TextBoxLine {
    base: ControlBase,
    controller: ControllerRef,
    font: Font,
    line: usize,
    focused: bool,
    pub text_color: Color,
    pub selection_color: Color,
    pub caret_color: Color,
}

impl TextBoxLine {
    pub fn new(controller: ControllerRef, font: Font, line: usize) -> Self {
        Self {
            base: ControlBase::new(),
            controller,
            font,
            line,
            focused: false,
            text_color: Color::BLACK,
            selection_color: Color::rgba(0.5, 0.5, 1.0, 0.5),
            caret_color: Color::BLACK,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Retargets this view to another line. Lists reuse views this way.
    pub fn set_line(&mut self, line: usize) {
        if self.line != line {
            self.line = line;
            self.base.request_redraw();
        }
    }

    /// Whether to paint selections and carets.
    pub fn set_focused(&mut self, focused: bool) {
        if self.focused != focused {
            self.focused = focused;
            self.base.request_redraw();
        }
    }
}

impl Control for TextBoxLine {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn desired_size(&mut self, _tree: &mut ControlTree, min: Size, max: Size) -> Size {
        let ctl = self.controller.borrow();
        let start = ctl.line_start(self.line);
        let end = ctl.line_end(self.line);
        let measured = self.font.measure_runes(&ctl.runes()[start..end]);
        Size::new(measured.w, self.font.line_height())
            .min(max)
            .max(min)
    }

    fn paint(&mut self, tree: &mut ControlTree, canvas: &mut Canvas) {
        let ctl = self.controller.borrow();
        if self.focused {
            paint_selections(canvas, &ctl, &self.font, self.line, self.selection_color);
        }
        let start = ctl.line_start(self.line);
        let end = ctl.line_end(self.line);
        if start < end {
            let runes: Vec<char> = ctl.runes()[start..end].to_vec();
            let block = TextBlock::left_top(runes.clone(), Rect::from_size(self.base.size()));
            let pens = self.font.layout(&block);
            canvas.draw_runes(Arc::new(self.font.clone()), runes, pens, self.text_color);
        }
        if self.focused {
            paint_carets(canvas, &ctl, &self.font, self.line, self.caret_color);
        }
        drop(ctl);
        self.base.paint_children(tree, canvas);
    }
}

/// One line of a code editor: text-box painting plus syntax layers.
///
/// Paint order per line: layer backgrounds front-to-back with overlap
/// subtraction, selection highlights, layer foregrounds with the leftover
/// runes in the default color, layer borders, carets.
pub struct CodeEditorLine {
    base: ControlBase,
    controller: ControllerRef,
    layers: Rc<RefCell<CodeSyntaxLayers>>,
    font: Font,
    line: usize,
    focused: bool,
    pub text_color: Color,
    pub selection_color: Color,
    pub caret_color: Color,
}

impl CodeEditorLine {
    pub fn new(
        controller: ControllerRef,
        layers: Rc<RefCell<CodeSyntaxLayers>>,
        font: Font,
        line: usize,
    ) -> Self {
        Self {
            base: ControlBase::new(),
            controller,
            layers,
            font,
            line,
            focused: false,
            text_color: Color::BLACK,
            selection_color: Color::rgba(0.5, 0.5, 1.0, 0.5),
            caret_color: Color::BLACK,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn set_line(&mut self, line: usize) {
        if self.line != line {
            self.line = line;
            self.base.request_redraw();
        }
    }

    pub fn set_focused(&mut self, focused: bool) {
        if self.focused != focused {
            self.focused = focused;
            self.base.request_redraw();
        }
    }
}

impl Control for CodeEditorLine {
    fn base(&self) -> &ControlBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn desired_size(&mut self, _tree: &mut ControlTree, min: Size, max: Size) -> Size {
        let ctl = self.controller.borrow();
        let start = ctl.line_start(self.line);
        let end = ctl.line_end(self.line);
        let measured = self.font.measure_runes(&ctl.runes()[start..end]);
        Size::new(measured.w, self.font.line_height())
            .min(max)
            .max(min)
    }

    fn paint(&mut self, tree: &mut ControlTree, canvas: &mut Canvas) {
        let ctl = self.controller.borrow();
        let layers = self.layers.borrow();
        let start = ctl.line_start(self.line);
        let end = ctl.line_end(self.line);
        let height = self.font.line_height();

        if start < end {
            let line_span = Span::new(start, end);

            // Backgrounds. Earlier layers win overlaps: each drawn part is
            // subtracted from the remaining coverage before the next layer
            // looks.
            let mut remaining = IntervalList::new();
            remaining.merge(line_span, ());
            for layer in layers.iter() {
                if let Some(bg) = layer.background {
                    let mut hits = Vec::new();
                    layer.spans().visit(line_span, |s, _| hits.push(s));
                    for hit in hits {
                        let mut parts = Vec::new();
                        remaining.visit(hit, |p, _| parts.push(p));
                        for part in parts {
                            canvas.draw_rect(
                                span_rect(&self.font, ctl.runes(), start, part, height),
                                Brush::new(bg),
                            );
                            remaining.remove(part);
                        }
                    }
                }
            }

            if self.focused {
                paint_selections(canvas, &ctl, &self.font, self.line, self.selection_color);
            }

            // Foregrounds, same subtraction; leftover runes take the
            // default color.
            let runes: Vec<char> = ctl.runes()[start..end].to_vec();
            let block = TextBlock::left_top(runes.clone(), Rect::from_size(self.base.size()));
            let pens = self.font.layout(&block);
            let mut uncolored = IntervalList::new();
            uncolored.merge(line_span, ());
            for layer in layers.iter() {
                if let Some(fg) = layer.foreground {
                    let mut hits = Vec::new();
                    layer.spans().visit(line_span, |s, _| hits.push(s));
                    for hit in hits {
                        let mut parts = Vec::new();
                        uncolored.visit(hit, |p, _| parts.push(p));
                        for part in parts {
                            paint_span_runes(canvas, &self.font, &runes, &pens, start, part, fg);
                            uncolored.remove(part);
                        }
                    }
                }
            }
            let mut leftover = Vec::new();
            uncolored.visit(line_span, |p, _| leftover.push(p));
            for part in leftover {
                paint_span_runes(
                    canvas,
                    &self.font,
                    &runes,
                    &pens,
                    start,
                    part,
                    self.text_color,
                );
            }

            // Borders outline their spans; overlaps are fine here.
            for layer in layers.iter() {
                if let Some(border) = layer.border {
                    let mut hits = Vec::new();
                    layer.spans().visit(line_span, |s, _| hits.push(s));
                    for hit in hits {
                        canvas.draw_rounded_rect(
                            span_rect(&self.font, ctl.runes(), start, hit, height),
                            Pen::new(1.0, border),
                            Brush::NONE,
                            [2.0; 4],
                        );
                    }
                }
            }
        } else if self.focused {
            paint_selections(canvas, &ctl, &self.font, self.line, self.selection_color);
        }

        if self.focused {
            paint_carets(canvas, &ctl, &self.font, self.line, self.caret_color);
        }
        drop(layers);
        drop(ctl);
        self.base.paint_children(tree, canvas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::mock::{MockBackend, Recorded};
    use canvas::DrawState;
    use geom::{DipsToPixels, Point};

    use crate::SyntaxLayer;

    const FONT_BYTES: &[u8] = include_bytes!("../../../tests/assets/DejaVuSansMono.ttf");

    fn test_font() -> Font {
        Font::from_bytes(FONT_BYTES, 12).unwrap()
    }

    fn draw(tree: &mut ControlTree, id: control::ControlId, size: Size) -> MockBackend {
        tree.set_root(id);
        tree.set_size(id, size);
        let canvas = tree.draw(id);
        let mut backend = MockBackend::new(DipsToPixels::ONE);
        canvas.replay(
            &mut backend,
            DrawState {
                clip_px: Rect::from_size(size),
                origin_px: Point::ZERO,
            },
        );
        backend
    }

    fn rune_draws(backend: &MockBackend) -> Vec<(String, Color)> {
        backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Recorded::DrawRunes { runes, color } => {
                    Some((runes.iter().collect::<String>(), *color))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn a_caret_paints_at_the_measured_prefix_width() {
        let font = test_font();
        let ctl = Rc::new(RefCell::new(TextBoxController::from_text("abc")));
        ctl.borrow_mut().set_caret(2);
        let expected_x = font.measure_runes(&['a', 'b']).w;

        let mut tree = ControlTree::new();
        let mut line = TextBoxLine::new(ctl, font, 0);
        line.set_focused(true);
        let id = tree.insert(Box::new(line));
        let backend = draw(&mut tree, id, Size::new(100, 20));

        let caret = backend
            .rects()
            .into_iter()
            .find(|r| r.w() == 1)
            .unwrap();
        assert_eq!(caret.min.x, expected_x);
    }

    #[test]
    fn a_selection_highlight_covers_the_measured_range() {
        let font = test_font();
        let ctl = Rc::new(RefCell::new(TextBoxController::from_text("abcdef")));
        ctl.borrow_mut()
            .set_selections(vec![crate::Selection::new(1, 4, false)]);
        let x0 = font.measure_runes(&['a']).w;
        let x1 = font.measure_runes(&['a', 'b', 'c', 'd']).w;

        let mut tree = ControlTree::new();
        let mut line = TextBoxLine::new(ctl, font, 0);
        line.set_focused(true);
        let id = tree.insert(Box::new(line));
        let backend = draw(&mut tree, id, Size::new(200, 20));

        let highlight = backend
            .rects()
            .into_iter()
            .find(|r| r.w() > 1)
            .unwrap();
        assert_eq!((highlight.min.x, highlight.max.x), (x0, x1));
    }

    #[test]
    fn an_unfocused_line_paints_no_carets() {
        let ctl = Rc::new(RefCell::new(TextBoxController::from_text("abc")));
        ctl.borrow_mut().set_caret(1);
        let mut tree = ControlTree::new();
        let id = tree.insert(Box::new(TextBoxLine::new(ctl, test_font(), 0)));
        let backend = draw(&mut tree, id, Size::new(100, 20));
        assert!(backend.rects().is_empty());
        assert_eq!(rune_draws(&backend).len(), 1);
    }

    #[test]
    fn carets_paint_only_on_their_own_line() {
        let ctl = Rc::new(RefCell::new(TextBoxController::from_text("ab\ncd")));
        ctl.borrow_mut().set_carets(&[1, 4]);
        let mut tree = ControlTree::new();
        let mut line = TextBoxLine::new(ctl, test_font(), 1);
        line.set_focused(true);
        let id = tree.insert(Box::new(line));
        let backend = draw(&mut tree, id, Size::new(100, 20));
        // Only the caret at offset 4 (line 1, column 1) lands here.
        assert_eq!(backend.rects().len(), 1);
    }

    #[test]
    fn earlier_background_layers_win_overlaps() {
        let font = test_font();
        let ctl = Rc::new(RefCell::new(TextBoxController::from_text("abcdef")));
        let mut first = SyntaxLayer::new();
        first.background = Some(Color::RED);
        first.add(Span::new(0, 4));
        let mut second = SyntaxLayer::new();
        second.background = Some(Color::GREEN);
        second.add(Span::new(2, 6));
        let mut layers = CodeSyntaxLayers::new();
        layers.push(first);
        layers.push(second);

        let mut tree = ControlTree::new();
        let id = tree.insert(Box::new(CodeEditorLine::new(
            ctl,
            Rc::new(RefCell::new(layers)),
            font.clone(),
            0,
        )));
        let backend = draw(&mut tree, id, Size::new(200, 20));

        let boundary = font.measure_runes(&['a', 'b', 'c', 'd']).w;
        let rects = backend.rects();
        assert_eq!(rects.len(), 2);
        assert_eq!((rects[0].min.x, rects[0].max.x), (0, boundary));
        assert_eq!(rects[1].min.x, boundary);
    }

    #[test]
    fn foreground_layers_color_their_spans_and_the_rest_is_default() {
        let ctl = Rc::new(RefCell::new(TextBoxController::from_text("let x")));
        let mut keywords = SyntaxLayer::new();
        keywords.foreground = Some(Color::BLUE);
        keywords.add(Span::new(0, 3));
        let mut layers = CodeSyntaxLayers::new();
        layers.push(keywords);

        let mut tree = ControlTree::new();
        let id = tree.insert(Box::new(CodeEditorLine::new(
            ctl,
            Rc::new(RefCell::new(layers)),
            test_font(),
            0,
        )));
        let backend = draw(&mut tree, id, Size::new(200, 20));

        assert_eq!(
            rune_draws(&backend),
            vec![
                ("let".to_string(), Color::BLUE),
                (" x".to_string(), Color::BLACK),
            ]
        );
    }

    #[test]
    fn border_layers_stroke_rounded_rects() {
        let ctl = Rc::new(RefCell::new(TextBoxController::from_text("abc")));
        let mut marks = SyntaxLayer::new();
        marks.border = Some(Color::RED);
        marks.add(Span::new(0, 3));
        let mut layers = CodeSyntaxLayers::new();
        layers.push(marks);

        let mut tree = ControlTree::new();
        let id = tree.insert(Box::new(CodeEditorLine::new(
            ctl,
            Rc::new(RefCell::new(layers)),
            test_font(),
            0,
        )));
        let backend = draw(&mut tree, id, Size::new(200, 20));

        let borders = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Recorded::DrawRoundedRect { .. }))
            .count();
        assert_eq!(borders, 1);
    }
}
