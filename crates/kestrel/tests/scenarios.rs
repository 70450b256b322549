//! End-to-end scenarios across the member crates.

use std::num::NonZeroU32;

use canvas::mock::{MockBackend, Recorded};
use canvas::{DrawState, GlyphProvider};
use gl_backend::{FrameState, TextureKey, TextureResource};
use kestrel::{
    Adapter, AdapterEvents, Block, Brush, Color, ControlId, ControlTree, Direction, Font,
    LinearLayout, ListControl, Orientation, Point, PointF, Rect, Selection, Size, SizeMode,
    SplitterLayout, TextBoxController, TextEdit,
};

const FONT_BYTES: &[u8] = include_bytes!("../../../tests/assets/DejaVuSansMono.ttf");

// ---- text editing ----

#[test]
fn single_line_edit_shifts_the_caret_past_the_insertion() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut ctl = TextBoxController::from_text("hello");
    let seen: Rc<RefCell<Vec<Vec<TextEdit>>>> = Rc::default();
    let sink = seen.clone();
    let _sub = ctl
        .on_text_changed
        .listen(move |edits| sink.borrow_mut().push(edits.clone()));

    ctl.set_caret(3);
    ctl.replace_all_runes(&['X']);

    assert_eq!(ctl.text(), "helXlo");
    assert_eq!(ctl.selections(), &[Selection::new(4, 4, false)]);
    assert_eq!(
        seen.borrow().as_slice(),
        &[vec![TextEdit { at: 3, delta: 1 }]]
    );
}

#[test]
fn multi_caret_paste_lands_one_insertion_per_caret() {
    let mut ctl = TextBoxController::from_text("a\nb\nc");
    ctl.set_carets(&[1, 3, 5]);
    ctl.replace_all("Z");
    assert_eq!(ctl.text(), "aZ\nbZ\ncZ");
    assert_eq!(
        ctl.selections(),
        &[
            Selection::new(2, 2, false),
            Selection::new(5, 5, false),
            Selection::new(8, 8, false),
        ]
    );
}

#[test]
fn selection_aware_delete_collapses_to_the_range_start() {
    let mut ctl = TextBoxController::from_text("abcdef");
    ctl.set_selections(vec![Selection::new(1, 4, false)]);
    ctl.delete();
    assert_eq!(ctl.text(), "aef");
    assert_eq!(ctl.selections(), &[Selection::new(1, 1, false)]);
}

// ---- splitter ----

#[test]
fn a_splitter_drag_conserves_total_weight() {
    let mut tree = ControlTree::new();
    let splitter = tree.insert(Box::new(SplitterLayout::new(Orientation::Horizontal)));
    let a = tree.insert(Box::new(Block::new(
        Brush::new(Color::RED),
        Size::new(10, 10),
    )));
    let b = tree.insert(Box::new(Block::new(
        Brush::new(Color::BLUE),
        Size::new(10, 10),
    )));
    tree.set_root(splitter);
    SplitterLayout::add_pane(&mut tree, splitter, a);
    SplitterLayout::add_pane(&mut tree, splitter, b);
    tree.downcast_mut::<SplitterLayout>(splitter).set_bar_width(0);
    tree.set_size(splitter, Size::new(200, 100));
    tree.update();

    SplitterLayout::drag_bar(&mut tree, splitter, 0, 50);
    {
        let this = tree.downcast_ref::<SplitterLayout>(splitter);
        assert!((this.weights()[0] - 0.5).abs() < 1e-6);
        assert!((this.weights()[1] - 1.5).abs() < 1e-6);
    }
    tree.update();
    assert_eq!(tree.base(a).size().w, 50);
    assert_eq!(tree.base(b).size().w, 150);
}

// ---- list virtualization ----

struct Items {
    count: usize,
    height: i32,
    events: AdapterEvents,
}

impl Adapter for Items {
    type Item = usize;

    fn count(&self) -> usize {
        self.count
    }

    fn item_at(&self, index: usize) -> usize {
        index
    }

    fn item_index(&self, item: &usize) -> Option<usize> {
        (*item < self.count).then_some(*item)
    }

    fn create(&self, tree: &mut ControlTree, _index: usize) -> ControlId {
        tree.insert(Box::new(Block::new(
            Brush::new(Color::WHITE),
            Size::new(10, self.height),
        )))
    }

    fn item_size(&self) -> Size {
        Size::new(10, self.height)
    }

    fn events(&mut self) -> &mut AdapterEvents {
        &mut self.events
    }
}

#[test]
fn a_list_instantiates_only_the_visible_window() {
    let mut tree = ControlTree::new();
    let list = ListControl::build(
        &mut tree,
        Items {
            count: 10_000,
            height: 20,
            events: AdapterEvents::new(),
        },
        Orientation::Vertical,
    );
    tree.set_root(list);
    tree.set_size(list, Size::new(100, 200));
    tree.update();

    {
        let this = tree.downcast_ref::<ListControl<Items>>(list);
        assert_eq!(this.visible_item_count(), 11);
        assert_eq!(this.visible_indices(), Some((0, 10)));
    }

    ListControl::<Items>::scroll_to(&mut tree, list, 50_000);
    tree.update();
    let this = tree.downcast_ref::<ListControl<Items>>(list);
    assert_eq!(this.visible_item_count(), 11);
    assert_eq!(this.visible_indices(), Some((2500, 2510)));
}

// ---- glyph page reaping ----

/// One simulated driver frame: resolves each text through its font and
/// stamps the named glyph pages, then sweeps. Returns the reap count.
fn render_frame(state: &mut FrameState, draws: &[(&Font, &str)]) -> usize {
    state.begin(Size::new(100, 100), Size::new(100, 100));
    let resolution = 256; // one pixel per DIP
    for (font, text) in draws {
        let runes: Vec<char> = text.chars().collect();
        let pens = vec![PointF::new(0.0, 0.0); runes.len()];
        for draw in font.resolve(resolution, &runes, &pens) {
            let key = TextureKey::GlyphPage {
                font: font.font_id(),
                resolution,
                page: draw.page,
            };
            let frame = state.frame;
            state.textures.get_or_create(key, frame, || {
                TextureResource::new(
                    glow::NativeTexture(NonZeroU32::new(1).unwrap()),
                    Size::new(1, 1),
                )
            });
        }
    }
    let frame = state.frame;
    state.textures.sweep(frame).len()
}

#[test]
fn an_untouched_glyph_page_is_reaped_and_recreated_on_reuse() {
    let body = Font::from_bytes(FONT_BYTES, 12).unwrap();
    let heading = Font::from_bytes(FONT_BYTES, 12).unwrap();
    let mut state = FrameState::new();

    assert_eq!(render_frame(&mut state, &[(&body, "A"), (&heading, "BC")]), 0);
    assert_eq!(state.textures.len(), 2);

    // The heading font goes unused for a frame; its page is swept.
    assert_eq!(render_frame(&mut state, &[(&body, "A")]), 1);
    assert_eq!(state.textures.len(), 1);

    // Using it again recreates the page texture.
    assert_eq!(render_frame(&mut state, &[(&body, "A"), (&heading, "BC")]), 0);
    assert_eq!(state.textures.len(), 2);
}

// ---- paint round trip ----

#[test]
fn a_control_tree_paints_through_the_mock_backend() {
    let mut tree = ControlTree::new();
    let row = tree.insert(Box::new(LinearLayout::new(Direction::LeftToRight)));
    tree.downcast_mut::<LinearLayout>(row).set_size_mode(SizeMode::Fill);
    let left = tree.insert(Box::new(Block::new(
        Brush::new(Color::RED),
        Size::new(30, 40),
    )));
    let right = tree.insert(Box::new(Block::new(
        Brush::new(Color::GREEN),
        Size::new(30, 40),
    )));
    tree.set_root(row);
    tree.add_child(row, left);
    tree.add_child(row, right);
    tree.set_size(row, Size::new(100, 40));
    tree.update();

    let canvas = tree.draw(row);
    let mut backend = MockBackend::new(geom::DipsToPixels::ONE);
    canvas.replay(
        &mut backend,
        DrawState {
            clip_px: Rect::from_size(Size::new(100, 40)),
            origin_px: Point::ZERO,
        },
    );

    let rects: Vec<(Rect, Color)> = backend
        .calls
        .iter()
        .filter_map(|c| match c {
            Recorded::DrawRect { rect, brush } => Some((*rect, brush.color)),
            _ => None,
        })
        .collect();
    assert_eq!(
        rects,
        vec![
            (Rect::from_xywh(0, 0, 30, 40), Color::RED),
            (Rect::from_xywh(30, 0, 30, 40), Color::GREEN),
        ]
    );
}
