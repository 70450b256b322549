//! The two-thread heart of the toolkit.
//!
//! [`Driver::start`] takes over the calling thread as the driver thread,
//! which owns every window and GL context, and spawns the application
//! thread for user code. Each thread drains a bounded thunk queue; work
//! crosses threads only through those queues. `call`/`call_sync` enqueue
//! onto the driver queue; channeled events deliver on the application
//! queue.
//!
//! Termination destroys every viewport on the driver thread, gives
//! in-flight thunks a grace period to drain, then flags both loops down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use canvas::{Canvas, Texture};
use events::channeled::Thunk;
use font::{Font, FontError};
use geom::Size;
use platform::{ClipboardError, Platform};
use viewport::Viewport;

/// Capacity of each thunk queue. A full queue blocks the producer, which
/// back-pressures a runaway thread instead of growing without bound.
const QUEUE_CAPACITY: usize = 256;

/// How long `terminate` waits for in-flight thunks to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

struct Inner {
    platform: Arc<dyn Platform>,
    driver_tx: Sender<Thunk>,
    driver_rx: Receiver<Thunk>,
    app_tx: Sender<Thunk>,
    app_rx: Receiver<Thunk>,
    terminated: AtomicBool,
    driver_thread: Mutex<Option<ThreadId>>,
    viewports: Mutex<Vec<Arc<Viewport>>>,
}

/// Cloneable handle to the running driver.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<Inner>,
}

impl Driver {
    /// Runs the driver loop on the calling thread and `app` on a new
    /// application thread. Returns when the driver has terminated and the
    /// application thread has drained; an application panic is re-raised
    /// here.
    pub fn start(platform: Arc<dyn Platform>, app: impl FnOnce(Driver) + Send + 'static) {
        let (driver_tx, driver_rx) = bounded(QUEUE_CAPACITY);
        let (app_tx, app_rx) = bounded(QUEUE_CAPACITY);
        let driver = Driver {
            inner: Arc::new(Inner {
                platform,
                driver_tx,
                driver_rx,
                app_tx,
                app_rx,
                terminated: AtomicBool::new(false),
                driver_thread: Mutex::new(Some(thread::current().id())),
                viewports: Mutex::new(Vec::new()),
            }),
        };
        tracing::info!("driver starting");

        let app_driver = driver.clone();
        let app_thread = thread::Builder::new()
            .name("kestrel-app".into())
            .spawn(move || {
                let inner = app_driver.inner.clone();
                app(app_driver);
                // Pump channeled events until termination.
                while let Ok(thunk) = inner.app_rx.recv() {
                    thunk();
                    if inner.terminated.load(Ordering::SeqCst) {
                        break;
                    }
                }
                while let Ok(thunk) = inner.app_rx.try_recv() {
                    thunk();
                }
                tracing::debug!("application thread drained");
            })
            .unwrap_or_else(|e| panic!("application thread failed to spawn: {}", e));

        driver.run_driver_loop();

        if let Err(panic) = app_thread.join() {
            std::panic::resume_unwind(panic);
        }
        tracing::info!("driver stopped");
    }

    fn run_driver_loop(&self) {
        let inner = &self.inner;
        loop {
            while let Ok(thunk) = inner.driver_rx.try_recv() {
                thunk();
            }
            if inner.terminated.load(Ordering::SeqCst) {
                break;
            }
            inner.platform.wait_events();
        }
        while let Ok(thunk) = inner.driver_rx.try_recv() {
            thunk();
        }
        tracing::debug!("driver thread drained");
    }

    fn on_driver_thread(&self) -> bool {
        *self.inner.driver_thread.lock() == Some(thread::current().id())
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::SeqCst)
    }

    /// Enqueues `f` onto the driver queue. The thunk runs the next time
    /// the driver thread wakes. False iff the driver has terminated.
    pub fn call(&self, f: impl FnOnce() + Send + 'static) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.inner.driver_tx.send(Box::new(f)).is_ok()
    }

    /// Enqueues `f` and wakes the driver thread immediately.
    pub fn async_driver(&self, f: impl FnOnce() + Send + 'static) -> bool {
        let ok = self.call(f);
        if ok {
            self.inner.platform.post_empty_event();
        }
        ok
    }

    /// Runs `f` on the driver thread and blocks until it finished. Calls
    /// from the driver thread itself run inline.
    pub fn call_sync(&self, f: impl FnOnce() + Send + 'static) -> bool {
        if self.is_terminated() {
            return false;
        }
        if self.on_driver_thread() {
            f();
            return true;
        }
        let (done_tx, done_rx) = bounded::<()>(1);
        let ok = self.async_driver(move || {
            f();
            let _ = done_tx.send(());
        });
        ok && done_rx.recv().is_ok()
    }

    /// Enqueues `f` onto the application queue. False iff terminated.
    pub fn events(&self, f: impl FnOnce() + Send + 'static) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.inner.app_tx.send(Box::new(f)).is_ok()
    }

    /// Destroys every viewport, drains both queues for up to the grace
    /// period, then stops both loops. Idempotent.
    pub fn terminate(&self) {
        if self.is_terminated() {
            return;
        }
        tracing::info!("driver terminating");
        let inner = self.inner.clone();
        self.call_sync(move || {
            for viewport in inner.viewports.lock().drain(..) {
                viewport.destroy_now();
            }
        });
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        let on_driver = self.on_driver_thread();
        while Instant::now() < deadline
            && !(self.inner.driver_rx.is_empty() && self.inner.app_rx.is_empty())
        {
            // Pump whichever queue this thread owns; the other thread
            // drains its own once woken.
            let own_rx = if on_driver {
                &self.inner.driver_rx
            } else {
                &self.inner.app_rx
            };
            while let Ok(thunk) = own_rx.try_recv() {
                thunk();
            }
            thread::sleep(Duration::from_millis(5));
        }
        if !(self.inner.driver_rx.is_empty() && self.inner.app_rx.is_empty()) {
            tracing::warn!("shutdown grace expired with thunks still queued");
        }
        self.inner.terminated.store(true, Ordering::SeqCst);
        // Wake both loops so they observe the flag.
        let _ = self.inner.app_tx.send(Box::new(|| {}));
        self.inner.platform.post_empty_event();
        tracing::info!("driver terminated");
    }

    /// Opens a window of `width`×`height` DIPs.
    pub fn create_windowed_viewport(
        &self,
        width: i32,
        height: i32,
        title: &str,
    ) -> Option<Arc<Viewport>> {
        self.create_viewport(width, height, title, false)
    }

    /// Opens a fullscreen window; zero dimensions adopt the monitor's
    /// current video mode.
    pub fn create_fullscreen_viewport(
        &self,
        width: i32,
        height: i32,
        title: &str,
    ) -> Option<Arc<Viewport>> {
        self.create_viewport(width, height, title, true)
    }

    fn create_viewport(
        &self,
        width: i32,
        height: i32,
        title: &str,
        fullscreen: bool,
    ) -> Option<Arc<Viewport>> {
        if self.is_terminated() {
            return None;
        }
        let (tx, rx) = bounded(1);
        let inner = self.inner.clone();
        let title = title.to_string();
        let ok = self.call_sync(move || {
            let viewport = Viewport::open(
                inner.platform.clone(),
                inner.driver_tx.clone(),
                inner.app_tx.clone(),
                width,
                height,
                &title,
                fullscreen,
            );
            inner.viewports.lock().push(viewport.clone());
            let _ = tx.send(viewport);
        });
        if !ok {
            return None;
        }
        rx.try_recv().ok()
    }

    pub fn create_font(&self, data: &[u8], size: u32) -> Result<Font, FontError> {
        Font::from_bytes(data, size)
    }

    pub fn create_canvas(&self, size: Size) -> Canvas {
        Canvas::new(size)
    }

    pub fn create_texture(
        &self,
        rgba: Vec<u8>,
        size_px: Size,
        pixels_per_dip: f32,
        premultiplied: bool,
    ) -> Texture {
        Texture::new(rgba, size_px, pixels_per_dip, premultiplied)
    }

    pub fn get_clipboard(&self) -> Result<String, ClipboardError> {
        self.inner.platform.get_clipboard()
    }

    pub fn set_clipboard(&self, text: String) {
        self.inner.platform.set_clipboard(text);
    }
}
