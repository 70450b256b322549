//! In-memory platform used by the workspace tests.
//!
//! Windows record their lifecycle and let tests inject native callbacks;
//! `wait_events` parks until `post_empty_event`.

use std::sync::Arc;

use geom::Size;
use parking_lot::{Condvar, Mutex};

use crate::{
    ClipboardError, KeyAction, KeyboardKey, Modifier, MouseButton, Platform, PlatformWindow,
    WindowCallbacks,
};

#[derive(Default)]
struct HeadlessState {
    clipboard: Mutex<String>,
    wakes: Mutex<u64>,
    wake_signal: Condvar,
    windows: Mutex<Vec<HeadlessWindowHandle>>,
}

/// Test double for the windowing library.
#[derive(Clone, Default)]
pub struct HeadlessPlatform {
    state: Arc<HeadlessState>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `post_empty_event` wakes observed.
    pub fn wake_count(&self) -> u64 {
        *self.state.wakes.lock()
    }

    /// Handle to the `index`-th window created through this platform, so
    /// tests can drive a window after it moved into a viewport.
    pub fn window(&self, index: usize) -> HeadlessWindowHandle {
        self.state.windows.lock()[index].clone()
    }

    pub fn window_count(&self) -> usize {
        self.state.windows.lock().len()
    }
}

impl Platform for HeadlessPlatform {
    fn create_window(
        &self,
        width: i32,
        height: i32,
        _title: &str,
        fullscreen: bool,
    ) -> Box<dyn PlatformWindow> {
        let size = if fullscreen && (width == 0 || height == 0) {
            self.monitor_size()
        } else {
            Size::new(width, height)
        };
        let window = HeadlessWindow::new(size);
        self.state.windows.lock().push(window.handle());
        Box::new(window)
    }

    fn monitor_size(&self) -> Size {
        Size::new(1920, 1080)
    }

    fn wait_events(&self) {
        let mut wakes = self.state.wakes.lock();
        let seen = *wakes;
        while *wakes == seen {
            self.state.wake_signal.wait(&mut wakes);
        }
    }

    fn post_empty_event(&self) {
        *self.state.wakes.lock() += 1;
        self.state.wake_signal.notify_all();
    }

    fn get_clipboard(&self) -> Result<String, ClipboardError> {
        Ok(self.state.clipboard.lock().clone())
    }

    fn set_clipboard(&self, text: String) {
        *self.state.clipboard.lock() = text;
    }
}

struct WindowShared {
    size: Size,
    callbacks: WindowCallbacks,
    destroyed: bool,
    visible: bool,
    title: String,
}

/// Headless window: records state and replays injected input through the
/// installed callbacks, the way a real provider would on its event thread.
pub struct HeadlessWindow {
    shared: Arc<Mutex<WindowShared>>,
}

impl HeadlessWindow {
    pub fn new(size: Size) -> Self {
        Self {
            shared: Arc::new(Mutex::new(WindowShared {
                size,
                callbacks: WindowCallbacks::default(),
                destroyed: false,
                visible: false,
                title: String::new(),
            })),
        }
    }

    /// A handle tests keep to drive the window after it moves into a
    /// viewport.
    pub fn handle(&self) -> HeadlessWindowHandle {
        HeadlessWindowHandle {
            shared: self.shared.clone(),
        }
    }
}

/// Test-side driver for a [`HeadlessWindow`].
#[derive(Clone)]
pub struct HeadlessWindowHandle {
    shared: Arc<Mutex<WindowShared>>,
}

impl HeadlessWindowHandle {
    pub fn is_destroyed(&self) -> bool {
        self.shared.lock().destroyed
    }

    pub fn is_visible(&self) -> bool {
        self.shared.lock().visible
    }

    pub fn title(&self) -> String {
        self.shared.lock().title.clone()
    }

    pub fn emit_cursor_move(&self, x: f64, y: f64) {
        let mut shared = self.shared.lock();
        if let Some(f) = shared.callbacks.cursor_move.as_mut() {
            f(x, y);
        }
    }

    pub fn emit_mouse_button(&self, button: MouseButton, pressed: bool, modifier: Modifier) {
        let mut shared = self.shared.lock();
        if let Some(f) = shared.callbacks.mouse_button.as_mut() {
            f(button, pressed, modifier);
        }
    }

    pub fn emit_scroll(&self, dx: f64, dy: f64, modifier: Modifier) {
        let mut shared = self.shared.lock();
        if let Some(f) = shared.callbacks.scroll.as_mut() {
            f(dx, dy, modifier);
        }
    }

    pub fn emit_key(&self, key: KeyboardKey, action: KeyAction, modifier: Modifier) {
        let mut shared = self.shared.lock();
        if let Some(f) = shared.callbacks.key.as_mut() {
            f(key, action, modifier);
        }
    }

    pub fn emit_rune(&self, rune: char, modifier: Modifier) {
        let mut shared = self.shared.lock();
        if let Some(f) = shared.callbacks.rune.as_mut() {
            f(rune, modifier);
        }
    }

    pub fn emit_resize(&self, dips: Size, px: Size) {
        let mut shared = self.shared.lock();
        shared.size = dips;
        if let Some(f) = shared.callbacks.resize.as_mut() {
            f(dips, px);
        }
    }

    pub fn emit_close(&self) {
        let mut shared = self.shared.lock();
        if let Some(f) = shared.callbacks.close.as_mut() {
            f();
        }
    }
}

impl PlatformWindow for HeadlessWindow {
    fn size_dips(&self) -> Size {
        self.shared.lock().size
    }

    fn size_px(&self) -> Size {
        self.shared.lock().size
    }

    fn set_title(&mut self, title: &str) {
        self.shared.lock().title = title.to_string();
    }

    fn show(&mut self) {
        self.shared.lock().visible = true;
    }

    fn destroy(&mut self) {
        self.shared.lock().destroyed = true;
    }

    fn make_current(&self) {}

    fn swap_buffers(&self) {}

    fn set_callbacks(&mut self, callbacks: WindowCallbacks) {
        self.shared.lock().callbacks = callbacks;
    }

    fn gl_proc_address(&self, _symbol: &str) -> *const std::ffi::c_void {
        std::ptr::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn zero_dimension_fullscreen_adopts_monitor_mode() {
        let platform = HeadlessPlatform::new();
        let window = platform.create_window(0, 0, "test", true);
        assert_eq!(window.size_dips(), platform.monitor_size());
    }

    #[test]
    fn windowed_size_is_honored() {
        let platform = HeadlessPlatform::new();
        let window = platform.create_window(800, 600, "test", false);
        assert_eq!(window.size_dips(), Size::new(800, 600));
    }

    #[test]
    fn clipboard_round_trips() {
        let platform = HeadlessPlatform::new();
        platform.set_clipboard("copied".into());
        assert_eq!(platform.get_clipboard().unwrap(), "copied");
    }

    #[test]
    fn post_empty_event_wakes_wait_events() {
        let platform = HeadlessPlatform::new();
        let waiter = platform.clone();
        let join = std::thread::spawn(move || waiter.wait_events());
        std::thread::sleep(Duration::from_millis(10));
        platform.post_empty_event();
        join.join().unwrap();
        assert_eq!(platform.wake_count(), 1);
    }

    #[test]
    fn injected_callbacks_fire() {
        let mut window = HeadlessWindow::new(Size::new(100, 100));
        let handle = window.handle();
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        let mut callbacks = WindowCallbacks::default();
        callbacks.cursor_move = Some(Box::new(move |_, _| *h.lock() += 1));
        window.set_callbacks(callbacks);
        handle.emit_cursor_move(3.0, 4.0);
        assert_eq!(*hits.lock(), 1);
    }
}
