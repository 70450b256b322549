//! A viewport marries one platform window to its renderer and exposes the
//! window's input as channeled event hubs.
//!
//! The window's GL context and renderer are driver-thread confined; they
//! live in a thread-local registry keyed by viewport id, so the shared
//! [`Viewport`] handle stays `Send + Sync` for the application thread.
//! Native callbacks arrive on the driver thread, are translated into input
//! payloads, and delivered through [`ChanneledEvent`] hubs that the
//! application queue drains.
//!
//! Mouse-move and scroll events coalesce: only the newest pending value of
//! each kind is delivered, no matter how many arrived while the
//! application was busy.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use canvas::{Backend, Canvas, DrawState};
use events::channeled::{ChanneledEvent, Thunk};
use geom::{Point, Rect, Size};
use gl_backend::GlRenderer;
use platform::{
    KeyAction, KeyStrokeEvent, KeyboardEvent, Modifier, MouseEvent, MouseState, Platform,
    PlatformWindow, SCROLL_SPEED,
};

static NEXT_VIEWPORT_ID: AtomicU64 = AtomicU64::new(1);

struct WindowSlot {
    window: Box<dyn PlatformWindow>,
    renderer: Option<GlRenderer>,
}

thread_local! {
    /// Driver-thread registry of window slots. Confining windows and GL
    /// renderers here keeps [`Viewport`] free of non-`Sync` state.
    static REGISTRY: RefCell<HashMap<u64, WindowSlot>> = RefCell::new(HashMap::new());
}

/// The channeled input hubs of one viewport.
pub struct ViewportEvents {
    pub close: ChanneledEvent<()>,
    pub resize: ChanneledEvent<Size>,
    pub mouse_move: ChanneledEvent<MouseEvent>,
    pub mouse_enter: ChanneledEvent<MouseEvent>,
    pub mouse_exit: ChanneledEvent<MouseEvent>,
    pub mouse_down: ChanneledEvent<MouseEvent>,
    pub mouse_up: ChanneledEvent<MouseEvent>,
    pub mouse_scroll: ChanneledEvent<MouseEvent>,
    pub key_down: ChanneledEvent<KeyboardEvent>,
    pub key_up: ChanneledEvent<KeyboardEvent>,
    pub key_repeat: ChanneledEvent<KeyboardEvent>,
    pub key_stroke: ChanneledEvent<KeyStrokeEvent>,
}

impl ViewportEvents {
    fn new(app_tx: &Sender<Thunk>) -> Self {
        Self {
            close: ChanneledEvent::new(app_tx.clone()),
            resize: ChanneledEvent::new(app_tx.clone()),
            mouse_move: ChanneledEvent::new(app_tx.clone()),
            mouse_enter: ChanneledEvent::new(app_tx.clone()),
            mouse_exit: ChanneledEvent::new(app_tx.clone()),
            mouse_down: ChanneledEvent::new(app_tx.clone()),
            mouse_up: ChanneledEvent::new(app_tx.clone()),
            mouse_scroll: ChanneledEvent::new(app_tx.clone()),
            key_down: ChanneledEvent::new(app_tx.clone()),
            key_up: ChanneledEvent::new(app_tx.clone()),
            key_repeat: ChanneledEvent::new(app_tx.clone()),
            key_stroke: ChanneledEvent::new(app_tx.clone()),
        }
    }
}

/// Cursor and modifier state tracked across native callbacks.
#[derive(Default)]
struct InputState {
    point: Point,
    held: MouseState,
    modifier: Modifier,
}

/// One pending coalesced event per kind. A promotion thunk queued on the
/// application queue drains the newest value.
#[derive(Default)]
struct Coalescer {
    pending_move: Mutex<Option<MouseEvent>>,
    pending_scroll: Mutex<Option<MouseEvent>>,
}

/// Shared handle to one window of the application.
pub struct Viewport {
    id: u64,
    platform: Arc<dyn Platform>,
    driver_tx: Sender<Thunk>,
    size_dips: Mutex<Size>,
    title: Mutex<String>,
    destroyed: AtomicBool,
    /// Bumped by `set_canvas`; stale repaint thunks compare and bail.
    redraw_generation: AtomicU64,
    latest_canvas: Mutex<Option<Arc<Canvas>>>,
    events: ViewportEvents,
}

impl Viewport {
    /// Creates the window, wires its callbacks, and registers the renderer.
    /// Must run on the driver thread with no GL context current.
    ///
    /// A window whose provider exposes no GL symbols (the headless test
    /// platform) gets no renderer; [`Viewport::present`] still replays.
    pub fn open(
        platform: Arc<dyn Platform>,
        driver_tx: Sender<Thunk>,
        app_tx: Sender<Thunk>,
        width: i32,
        height: i32,
        title: &str,
        fullscreen: bool,
    ) -> Arc<Viewport> {
        let id = NEXT_VIEWPORT_ID.fetch_add(1, Ordering::Relaxed);
        let mut window = platform.create_window(width, height, title, fullscreen);
        let viewport = Arc::new(Viewport {
            id,
            platform: platform.clone(),
            driver_tx,
            size_dips: Mutex::new(window.size_dips()),
            title: Mutex::new(title.to_string()),
            destroyed: AtomicBool::new(false),
            redraw_generation: AtomicU64::new(0),
            latest_canvas: Mutex::new(None),
            events: ViewportEvents::new(&app_tx),
        });
        install_callbacks(&viewport, &app_tx, window.as_mut());

        let renderer = if window.gl_proc_address("glGetString").is_null() {
            tracing::debug!(id, "window provider exposes no GL symbols; rendering disabled");
            None
        } else {
            window.make_current();
            let gl = unsafe {
                glow::Context::from_loader_function(|symbol| window.gl_proc_address(symbol))
            };
            match GlRenderer::new(Arc::new(gl)) {
                Ok(renderer) => Some(renderer),
                Err(err) => {
                    tracing::error!(id, error = %err, "renderer creation failed");
                    None
                }
            }
        };
        window.show();
        tracing::info!(id, width, height, fullscreen, title, "viewport opened");
        REGISTRY.with(|registry| {
            registry
                .borrow_mut()
                .insert(id, WindowSlot { window, renderer })
        });
        viewport
    }

    pub fn events(&self) -> &ViewportEvents {
        &self.events
    }

    pub fn size_dips(&self) -> Size {
        *self.size_dips.lock()
    }

    pub fn title(&self) -> String {
        self.title.lock().clone()
    }

    pub fn set_title(self: &Arc<Self>, title: &str) {
        *self.title.lock() = title.to_string();
        let this = self.clone();
        let title = title.to_string();
        self.on_driver_thread(move || {
            with_slot(this.id, |slot| slot.window.set_title(&title));
        });
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Adopts a sealed canvas as the viewport content and schedules a
    /// repaint. Repaints triggered by older canvases are superseded.
    pub fn set_canvas(self: &Arc<Self>, canvas: Arc<Canvas>) {
        assert!(canvas.is_complete(), "set_canvas with an unsealed canvas");
        *self.latest_canvas.lock() = Some(canvas);
        let generation = self.redraw_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        self.on_driver_thread(move || this.repaint_now(generation));
    }

    /// Replays the latest canvas into `backend`. Test seam; the GL repaint
    /// path goes through the driver-thread registry instead.
    pub fn present(&self, backend: &mut dyn Backend) {
        let canvas = self.latest_canvas.lock().clone();
        if let Some(canvas) = canvas {
            let clip_px = backend.dips_to_pixels().rect(Rect::from_size(self.size_dips()));
            canvas.replay(
                backend,
                DrawState {
                    clip_px,
                    origin_px: Point::ZERO,
                },
            );
        }
    }

    /// Requests asynchronous window destruction. Idempotent.
    pub fn close(self: &Arc<Self>) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        self.on_driver_thread(move || this.destroy_now_inner());
    }

    /// Destroys the window immediately. Driver thread only; the driver
    /// calls this while terminating.
    pub fn destroy_now(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.destroy_now_inner();
    }

    fn destroy_now_inner(&self) {
        let slot = REGISTRY.with(|registry| registry.borrow_mut().remove(&self.id));
        if let Some(mut slot) = slot {
            slot.renderer = None;
            slot.window.destroy();
            tracing::info!(id = self.id, "viewport destroyed");
        }
    }

    fn on_driver_thread(&self, f: impl FnOnce() + Send + 'static) {
        if self.driver_tx.send(Box::new(f)).is_ok() {
            self.platform.post_empty_event();
        }
    }

    fn repaint_now(&self, generation: u64) {
        if self.is_destroyed() || generation != self.redraw_generation.load(Ordering::SeqCst) {
            return;
        }
        let canvas = self.latest_canvas.lock().clone();
        let Some(canvas) = canvas else { return };
        with_slot(self.id, |slot| {
            let Some(renderer) = slot.renderer.as_mut() else {
                return;
            };
            slot.window.make_current();
            let size_px = slot.window.size_px();
            renderer.begin_draw(slot.window.size_dips(), size_px);
            canvas.replay(
                renderer,
                DrawState {
                    clip_px: Rect::from_size(size_px),
                    origin_px: Point::ZERO,
                },
            );
            renderer.end_draw();
            slot.window.swap_buffers();
        });
    }
}

fn with_slot(id: u64, f: impl FnOnce(&mut WindowSlot)) {
    REGISTRY.with(|registry| {
        if let Some(slot) = registry.borrow_mut().get_mut(&id) {
            f(slot);
        }
    });
}

/// Wires the native callback set. Runs during `open`, before the window is
/// registered, so callbacks can safely capture the viewport handle.
fn install_callbacks(viewport: &Arc<Viewport>, app_tx: &Sender<Thunk>, window: &mut dyn PlatformWindow) {
    let input = Arc::new(Mutex::new(InputState::default()));
    let coalescer = Arc::new(Coalescer::default());
    let mut callbacks = platform::WindowCallbacks::default();

    {
        let input = input.clone();
        let coalescer = coalescer.clone();
        let hub = viewport.events.mouse_move.clone();
        let app_tx = app_tx.clone();
        callbacks.cursor_move = Some(Box::new(move |x, y| {
            let mut input = input.lock();
            input.point = Point::new(x as i32, y as i32);
            let mut event = MouseEvent::at(input.point);
            event.state = input.held;
            event.modifier = input.modifier;
            let mut pending = coalescer.pending_move.lock();
            let first = pending.is_none();
            *pending = Some(event);
            drop(pending);
            if first {
                let coalescer = coalescer.clone();
                let hub = hub.clone();
                let _ = app_tx.send(Box::new(move || {
                    if let Some(event) = coalescer.pending_move.lock().take() {
                        hub.emit_now(&event);
                    }
                }));
            }
        }));
    }

    {
        let input = input.clone();
        let enter = viewport.events.mouse_enter.clone();
        let exit = viewport.events.mouse_exit.clone();
        callbacks.cursor_enter = Some(Box::new(move |entered| {
            let input = input.lock();
            let mut event = MouseEvent::at(input.point);
            event.state = input.held;
            event.modifier = input.modifier;
            if entered {
                enter.emit(event);
            } else {
                exit.emit(event);
            }
        }));
    }

    {
        let input = input.clone();
        let down = viewport.events.mouse_down.clone();
        let up = viewport.events.mouse_up.clone();
        callbacks.mouse_button = Some(Box::new(move |button, pressed, modifier| {
            let mut input = input.lock();
            input.modifier = modifier;
            if pressed {
                input.held |= button.bit();
            } else {
                input.held -= button.bit();
            }
            let mut event = MouseEvent::at(input.point);
            event.state = input.held;
            event.button = button;
            event.modifier = modifier;
            if pressed {
                down.emit(event);
            } else {
                up.emit(event);
            }
        }));
    }

    {
        let input = input.clone();
        let coalescer = coalescer.clone();
        let hub = viewport.events.mouse_scroll.clone();
        let app_tx = app_tx.clone();
        callbacks.scroll = Some(Box::new(move |dx, dy, modifier| {
            let mut input = input.lock();
            input.modifier = modifier;
            let mut pending = coalescer.pending_scroll.lock();
            let first = pending.is_none();
            let event = pending.get_or_insert_with(|| {
                let mut event = MouseEvent::at(input.point);
                event.state = input.held;
                event
            });
            // Deltas accumulate while the application is behind.
            event.scroll_x += (dx * SCROLL_SPEED as f64) as i32;
            event.scroll_y += (dy * SCROLL_SPEED as f64) as i32;
            event.modifier = modifier;
            drop(pending);
            if first {
                let coalescer = coalescer.clone();
                let hub = hub.clone();
                let _ = app_tx.send(Box::new(move || {
                    if let Some(event) = coalescer.pending_scroll.lock().take() {
                        hub.emit_now(&event);
                    }
                }));
            }
        }));
    }

    {
        let input = input.clone();
        let down = viewport.events.key_down.clone();
        let up = viewport.events.key_up.clone();
        let repeat = viewport.events.key_repeat.clone();
        callbacks.key = Some(Box::new(move |key, action, modifier| {
            input.lock().modifier = modifier;
            let event = KeyboardEvent { key, modifier };
            match action {
                KeyAction::Press => down.emit(event),
                KeyAction::Release => up.emit(event),
                KeyAction::Repeat => repeat.emit(event),
            };
        }));
    }

    {
        let hub = viewport.events.key_stroke.clone();
        callbacks.rune = Some(Box::new(move |rune, modifier| {
            hub.emit(KeyStrokeEvent { rune, modifier });
        }));
    }

    {
        let this = viewport.clone();
        callbacks.resize = Some(Box::new(move |dips, _px| {
            *this.size_dips.lock() = dips;
            this.events.resize.emit(dips);
            // Repaint the current content at the new size.
            this.repaint_now(this.redraw_generation.load(Ordering::SeqCst));
        }));
    }

    {
        let hub = viewport.events.close.clone();
        callbacks.close = Some(Box::new(move || {
            hub.emit(());
        }));
    }

    {
        let this = viewport.clone();
        callbacks.refresh = Some(Box::new(move || {
            this.repaint_now(this.redraw_generation.load(Ordering::SeqCst));
        }));
    }

    window.set_callbacks(callbacks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::Color;
    use canvas::mock::{MockBackend, Recorded};
    use crossbeam_channel::{bounded, Receiver};
    use geom::DipsToPixels;
    use platform::headless::HeadlessPlatform;
    use platform::MouseButton;
    use std::sync::atomic::AtomicI32;

    fn drain(rx: &Receiver<Thunk>) {
        while let Ok(thunk) = rx.try_recv() {
            thunk();
        }
    }

    fn open_headless() -> (
        Arc<Viewport>,
        HeadlessPlatform,
        Receiver<Thunk>,
        Receiver<Thunk>,
    ) {
        let platform = HeadlessPlatform::new();
        let (driver_tx, driver_rx) = bounded(256);
        let (app_tx, app_rx) = bounded(256);
        let viewport = Viewport::open(
            Arc::new(platform.clone()),
            driver_tx,
            app_tx,
            640,
            480,
            "test",
            false,
        );
        (viewport, platform, driver_rx, app_rx)
    }

    #[test]
    fn button_events_reach_listeners_via_the_app_queue() {
        let (viewport, platform, _driver_rx, app_rx) = open_headless();
        let window = platform.window(0);
        let downs = Arc::new(AtomicI32::new(0));
        let d = downs.clone();
        let _sub = viewport.events().mouse_down.listen(move |ev| {
            assert!(ev.state.contains(MouseState::LEFT));
            assert_eq!(ev.button, MouseButton::Left);
            d.fetch_add(1, Ordering::SeqCst);
        });
        window.emit_mouse_button(MouseButton::Left, true, Modifier::empty());
        assert_eq!(downs.load(Ordering::SeqCst), 0);
        drain(&app_rx);
        assert_eq!(downs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mouse_moves_coalesce_to_the_newest_point() {
        let (viewport, platform, _driver_rx, app_rx) = open_headless();
        let window = platform.window(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = viewport
            .events()
            .mouse_move
            .listen(move |ev| s.lock().push(ev.point));
        window.emit_cursor_move(1.0, 1.0);
        window.emit_cursor_move(2.0, 2.0);
        window.emit_cursor_move(3.0, 4.0);
        drain(&app_rx);
        assert_eq!(*seen.lock(), vec![Point::new(3, 4)]);
    }

    #[test]
    fn scroll_deltas_accumulate_while_pending() {
        let (viewport, platform, _driver_rx, app_rx) = open_headless();
        let window = platform.window(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = viewport
            .events()
            .mouse_scroll
            .listen(move |ev| s.lock().push((ev.scroll_x, ev.scroll_y)));
        window.emit_scroll(0.0, 1.0, Modifier::empty());
        window.emit_scroll(0.0, 1.0, Modifier::empty());
        drain(&app_rx);
        assert_eq!(*seen.lock(), vec![(0, 2 * SCROLL_SPEED)]);
    }

    #[test]
    fn set_canvas_schedules_a_wake_and_present_replays() {
        let (viewport, platform, driver_rx, _app_rx) = open_headless();
        let mut canvas = Canvas::new(Size::new(640, 480));
        canvas.clear(Color::BLUE);
        canvas.complete().unwrap();
        viewport.set_canvas(Arc::new(canvas));
        assert!(platform.wake_count() >= 1);
        // The repaint thunk is a no-op without a GL renderer.
        drain(&driver_rx);
        let mut backend = MockBackend::new(DipsToPixels::ONE);
        viewport.present(&mut backend);
        assert!(backend.calls.contains(&Recorded::Clear(Color::BLUE)));
    }

    #[test]
    fn stale_repaints_are_superseded() {
        let (viewport, _platform, driver_rx, _app_rx) = open_headless();
        let seal = |color| {
            let mut canvas = Canvas::new(Size::new(640, 480));
            canvas.clear(color);
            canvas.complete().unwrap();
            Arc::new(canvas)
        };
        viewport.set_canvas(seal(Color::RED));
        viewport.set_canvas(seal(Color::GREEN));
        drain(&driver_rx);
        let mut backend = MockBackend::new(DipsToPixels::ONE);
        viewport.present(&mut backend);
        assert_eq!(backend.calls[1], Recorded::Clear(Color::GREEN));
    }

    #[test]
    fn close_destroys_the_window_on_the_driver_thread() {
        let (viewport, platform, driver_rx, _app_rx) = open_headless();
        let window = platform.window(0);
        viewport.close();
        assert!(viewport.is_destroyed());
        assert!(!window.is_destroyed());
        drain(&driver_rx);
        assert!(window.is_destroyed());
    }

    #[test]
    fn resize_updates_size_and_notifies() {
        let (viewport, platform, _driver_rx, app_rx) = open_headless();
        let window = platform.window(0);
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let s = sizes.clone();
        let _sub = viewport.events().resize.listen(move |size| s.lock().push(*size));
        window.emit_resize(Size::new(800, 600), Size::new(800, 600));
        drain(&app_rx);
        assert_eq!(viewport.size_dips(), Size::new(800, 600));
        assert_eq!(*sizes.lock(), vec![Size::new(800, 600)]);
    }
}
