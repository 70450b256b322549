//! # Kestrel Layouts
//!
//! Container controls that size and position their children inside the
//! inner rect (size minus padding). Each is an ordinary [`control::Control`]
//! whose `layout_children` hook does the arranging; structural operations
//! are associated functions taking the tree plus the container's id.

mod linear;
mod panel;
mod scroll;
mod splitter;
mod table;

pub use linear::{Direction, HAlign, LinearLayout, SizeMode, VAlign};
pub use panel::PanelHolder;
pub use scroll::{ScrollBar, ScrollLayout};
pub use splitter::{Orientation, SplitterBar, SplitterLayout, DEFAULT_BAR_WIDTH};
pub use table::{CellRegion, TableError, TableLayout};
