//! # Kestrel Platform
//!
//! The toolkit treats the native window and GL-context provider as an
//! external collaborator: a GLFW-like library implements [`Platform`] and
//! [`PlatformWindow`], and everything above programs against these traits.
//! Input payload types live here too, since the provider produces them.
//!
//! [`headless`] hosts an in-memory implementation used throughout the
//! workspace tests.

pub mod headless;
mod input;

use geom::Size;
use thiserror::Error;

pub use input::{
    KeyAction, KeyStrokeEvent, KeyboardEvent, KeyboardKey, Modifier, MouseButton, MouseEvent,
    MouseState, SCROLL_SPEED,
};

/// Clipboard access failures, surfaced to the caller as recoverable errors.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Native callbacks a window delivers on the driver thread.
///
/// Every field is optional; unset callbacks drop the event.
#[derive(Default)]
pub struct WindowCallbacks {
    pub cursor_move: Option<Box<dyn FnMut(f64, f64) + Send>>,
    pub cursor_enter: Option<Box<dyn FnMut(bool) + Send>>,
    pub mouse_button: Option<Box<dyn FnMut(MouseButton, bool, Modifier) + Send>>,
    pub scroll: Option<Box<dyn FnMut(f64, f64, Modifier) + Send>>,
    pub key: Option<Box<dyn FnMut(KeyboardKey, KeyAction, Modifier) + Send>>,
    pub rune: Option<Box<dyn FnMut(char, Modifier) + Send>>,
    pub resize: Option<Box<dyn FnMut(Size, Size) + Send>>,
    pub close: Option<Box<dyn FnMut() + Send>>,
    pub refresh: Option<Box<dyn FnMut() + Send>>,
}

/// One native window with a current-able GL context.
///
/// All methods are driver-thread confined, like the GL context itself.
pub trait PlatformWindow: Send {
    fn size_dips(&self) -> Size;
    fn size_px(&self) -> Size;
    fn set_title(&mut self, title: &str);
    fn show(&mut self);
    fn destroy(&mut self);
    fn make_current(&self);
    fn swap_buffers(&self);
    /// Installs the callback set; replaces any previous one.
    fn set_callbacks(&mut self, callbacks: WindowCallbacks);
    /// GL symbol loader for `glow::Context::from_loader_function`.
    fn gl_proc_address(&self, symbol: &str) -> *const std::ffi::c_void;
}

/// The windowing library itself.
pub trait Platform: Send + Sync {
    /// `fullscreen` with a zero dimension adopts the monitor's current
    /// video mode.
    fn create_window(
        &self,
        width: i32,
        height: i32,
        title: &str,
        fullscreen: bool,
    ) -> Box<dyn PlatformWindow>;
    /// Current monitor mode in DIPs.
    fn monitor_size(&self) -> Size;
    /// Blocks the driver thread until an event or a wake arrives.
    fn wait_events(&self);
    /// Wakes a thread blocked in [`Platform::wait_events`].
    fn post_empty_event(&self);
    fn get_clipboard(&self) -> Result<String, ClipboardError>;
    fn set_clipboard(&self, text: String);
}
