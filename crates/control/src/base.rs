//! Shared per-control state embedded by every [`Control`] implementation.

use std::sync::Arc;

use canvas::Canvas;
use events::Event;
use geom::{Point, Rect, Size, Spacing};
use platform::{KeyStrokeEvent, KeyboardEvent, MouseEvent, MouseState};

use crate::{Control, ControlId, ControlTree};

/// One child link: the child's id plus its offset in the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRecord {
    pub id: ControlId,
    pub offset: Point,
}

/// Per-control input event hubs plus transient pointer state.
///
/// The mouse controller keeps `is_mouse_over` and `held` in sync; controls
/// only read them.
pub struct InputEvents {
    pub mouse_enter: Event<MouseEvent>,
    pub mouse_exit: Event<MouseEvent>,
    pub mouse_move: Event<MouseEvent>,
    pub mouse_down: Event<MouseEvent>,
    pub mouse_up: Event<MouseEvent>,
    pub click: Event<MouseEvent>,
    pub double_click: Event<MouseEvent>,
    pub scroll: Event<MouseEvent>,
    pub key_down: Event<KeyboardEvent>,
    pub key_up: Event<KeyboardEvent>,
    pub key_repeat: Event<KeyboardEvent>,
    pub key_stroke: Event<KeyStrokeEvent>,
    pub gained_focus: Event<()>,
    pub lost_focus: Event<()>,
    pub is_mouse_over: bool,
    pub held: MouseState,
}

impl InputEvents {
    fn new() -> Self {
        Self {
            mouse_enter: Event::new(),
            mouse_exit: Event::new(),
            mouse_move: Event::new(),
            mouse_down: Event::new(),
            mouse_up: Event::new(),
            click: Event::new(),
            double_click: Event::new(),
            scroll: Event::new(),
            key_down: Event::new(),
            key_up: Event::new(),
            key_repeat: Event::new(),
            key_stroke: Event::new(),
            gained_focus: Event::new(),
            lost_focus: Event::new(),
            is_mouse_over: false,
            held: MouseState::empty(),
        }
    }
}

/// The state every control carries: identity, tree links, geometry,
/// layout bookkeeping, the draw cache, and input hubs.
pub struct ControlBase {
    id: Option<ControlId>,
    attached: bool,
    parent: Option<ControlId>,
    children: Vec<ChildRecord>,
    visible: bool,
    focusable: bool,
    has_focus: bool,
    size: Size,
    margin: Spacing,
    padding: Spacing,
    relayout_requested: bool,
    relayout_parked: bool,
    layout_suspensions: u32,
    redraw_requested: bool,
    canvas: Option<Arc<Canvas>>,
    on_attach: Event<()>,
    on_detach: Event<()>,
    pub input: InputEvents,
}

impl Default for ControlBase {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBase {
    pub fn new() -> Self {
        Self {
            id: None,
            attached: false,
            parent: None,
            children: Vec::new(),
            visible: true,
            focusable: false,
            has_focus: false,
            size: Size::ZERO,
            margin: Spacing::ZERO,
            padding: Spacing::ZERO,
            relayout_requested: false,
            relayout_parked: false,
            layout_suspensions: 0,
            redraw_requested: false,
            canvas: None,
            on_attach: Event::new(),
            on_detach: Event::new(),
            input: InputEvents::new(),
        }
    }

    /// This control's arena id. Panics before the control is inserted.
    pub fn id(&self) -> ControlId {
        match self.id {
            Some(id) => id,
            None => panic!("control base used before insertion into a tree"),
        }
    }

    pub(crate) fn assign_id(&mut self, id: ControlId) {
        self.id = Some(id);
    }

    // Attachment.

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn mark_attached(&mut self, id: ControlId) {
        assert!(!self.attached, "{:?} attached twice", id);
        self.attached = true;
    }

    pub(crate) fn mark_detached(&mut self, id: ControlId) {
        assert!(self.attached, "{:?} detached while not attached", id);
        self.attached = false;
    }

    pub(crate) fn emit_attach(&mut self) {
        self.on_attach.emit(&());
    }

    pub(crate) fn emit_detach(&mut self) {
        self.on_detach.emit(&());
    }

    pub fn on_attach_event(&mut self) -> &mut Event<()> {
        &mut self.on_attach
    }

    pub fn on_detach_event(&mut self) -> &mut Event<()> {
        &mut self.on_detach
    }

    // Tree links.

    pub fn parent(&self) -> Option<ControlId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ControlId>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[ChildRecord] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ChildRecord> {
        &mut self.children
    }

    /// Moves a child within the parent. Panics when `child` is not linked.
    pub fn set_child_offset(&mut self, child: ControlId, offset: Point) {
        let record = self
            .children
            .iter_mut()
            .find(|record| record.id == child)
            .unwrap_or_else(|| panic!("{:?} is not a child here", child));
        if record.offset != offset {
            record.offset = offset;
            self.redraw_requested = true;
        }
    }

    pub fn child_offset(&self, child: ControlId) -> Point {
        self.children
            .iter()
            .find(|record| record.id == child)
            .map(|record| record.offset)
            .unwrap_or_else(|| panic!("{:?} is not a child here", child))
    }

    // Visibility and focus.

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.redraw_requested = true;
        }
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    pub fn set_focusable(&mut self, focusable: bool) {
        self.focusable = focusable;
    }

    /// True while the focus controller points at this control.
    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub(crate) fn set_has_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    // Geometry.

    pub fn size(&self) -> Size {
        self.size
    }

    pub(crate) fn store_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn margin(&self) -> Spacing {
        self.margin
    }

    pub fn set_margin(&mut self, margin: Spacing) {
        self.margin = margin;
    }

    pub fn padding(&self) -> Spacing {
        self.padding
    }

    pub fn set_padding(&mut self, padding: Spacing) {
        self.padding = padding;
    }

    // Layout bookkeeping, driven by the tree.

    pub(crate) fn request_relayout(&mut self) {
        self.relayout_requested = true;
    }

    pub(crate) fn clear_relayout_request(&mut self) {
        self.relayout_requested = false;
    }

    pub(crate) fn relayout_requested(&self) -> bool {
        self.relayout_requested
    }

    pub(crate) fn is_layout_suspended(&self) -> bool {
        self.layout_suspensions > 0
    }

    pub(crate) fn suspend_layout(&mut self) {
        self.layout_suspensions += 1;
    }

    /// Returns true when the last suspension released a parked request.
    pub(crate) fn resume_layout(&mut self) -> bool {
        assert!(
            self.layout_suspensions > 0,
            "layout resume without a matching suspend"
        );
        self.layout_suspensions -= 1;
        if self.layout_suspensions == 0 && self.relayout_parked {
            self.relayout_parked = false;
            return true;
        }
        false
    }

    pub(crate) fn park_relayout(&mut self) {
        self.relayout_parked = true;
    }

    // Draw cache.

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn redraw_requested(&self) -> bool {
        self.redraw_requested
    }

    pub fn cached_canvas(&self) -> Option<Arc<Canvas>> {
        self.canvas.clone()
    }

    pub(crate) fn store_canvas(&mut self, canvas: Arc<Canvas>) {
        self.canvas = Some(canvas);
        self.redraw_requested = false;
    }

    /// Records every visible child, each clipped to its own rectangle.
    /// The default `paint` hook delegates here.
    pub fn paint_children(&self, tree: &mut ControlTree, canvas: &mut Canvas) {
        for record in &self.children {
            let base = tree.base(record.id);
            if !base.is_visible() || base.size().is_empty() {
                continue;
            }
            let bounds = Rect::from_size(base.size()).offset(record.offset);
            let child_canvas = tree.draw(record.id);
            canvas.push();
            canvas.add_clip(bounds);
            canvas.draw_canvas(child_canvas, record.offset);
            canvas.pop();
        }
    }
}

/// Returns the ancestor chain of `id`, root first, `id` last.
pub(crate) fn path_to_root(tree: &ControlTree, id: ControlId) -> Vec<ControlId> {
    let mut path = vec![id];
    let mut cursor = id;
    while let Some(parent) = tree.base(cursor).parent() {
        path.push(parent);
        cursor = parent;
    }
    path.reverse();
    path
}

/// Root-local origin of `id`, summing child offsets down the chain.
pub(crate) fn window_origin(tree: &ControlTree, id: ControlId) -> Point {
    let path = path_to_root(tree, id);
    let mut origin = Point::ZERO;
    for pair in path.windows(2) {
        origin = origin + tree.base(pair[0]).child_offset(pair[1]);
    }
    origin
}

impl dyn Control {
    /// Convenience downcast-free hit test against a child record.
    pub fn hit(&self, record_offset: Point, point: Point) -> bool {
        self.contains_point(point - record_offset)
    }
}
