//! # Kestrel TextBox
//!
//! Multi-caret text editing. [`TextBoxController`] owns the rune array,
//! line bounds, selections, and caret history; [`TextBoxLine`] and
//! [`CodeEditorLine`] are per-line views a list virtualizes over it;
//! [`SyntaxLayer`] carries highlight spans that follow the text through
//! edits.

mod controller;
mod line;
mod syntax;

pub use controller::{is_word_rune, Selection, TextBoxController, TextEdit};
pub use line::{CodeEditorLine, ControllerRef, TextBoxLine};
pub use syntax::{CodeSyntaxLayers, SyntaxLayer};
