//! # Kestrel
//!
//! A retained-mode UI toolkit: controls paint into record-then-seal
//! canvases on the application thread, a driver thread replays them
//! through an OpenGL backend, and input flows back through channeled
//! event hubs. This crate re-exports the public surface of the member
//! crates; depend on it unless you need exactly one piece.

pub use canvas::{Brush, Canvas, Color, Pen, PolyVertex, Texture};
pub use control::{
    Block, Control, ControlBase, ControlId, ControlTree, FocusController, KeyboardController,
    MouseController,
};
pub use driver::Driver;
pub use events::{ChanneledEvent, Event, Subscription};
pub use font::{Font, FontError, TextBlock};
pub use geom::{Point, PointF, Rect, Size, Spacing};
pub use gl_backend::GlRenderer;
pub use interval::{IntervalList, Span};
pub use layouts::{
    Direction, LinearLayout, Orientation, PanelHolder, ScrollBar, ScrollLayout, SizeMode,
    SplitterLayout, TableLayout,
};
pub use list::{Adapter, AdapterEvents, ListControl, NodeAdapter, TreeAdapter};
pub use platform::{KeyboardEvent, KeyboardKey, Modifier, MouseButton, MouseEvent, Platform};
pub use textbox::{
    CodeEditorLine, CodeSyntaxLayers, Selection, SyntaxLayer, TextBoxController, TextBoxLine,
    TextEdit,
};
pub use viewport::Viewport;
