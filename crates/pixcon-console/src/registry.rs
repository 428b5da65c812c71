#![forbid(unsafe_code)]

//! Registry of active consoles and the blink timer.
//!
//! [`ConsoleRegistry`] owns every live terminal-to-device binding for a
//! service: created at service start, entries added and removed per
//! attach/detach, dropped wholesale at shutdown. Each console sits behind
//! its own mutex, which is the lock shared by terminal operations and the
//! blink tick — the two can never interleave on one surface, and detach
//! waits for an in-flight operation to finish rather than tearing the
//! surface out from under it.
//!
//! [`BlinkTicker`] is the fixed-rate blink driver for platforms without a
//! vertical-blank hook: a background thread that ticks every registered
//! console. Platforms with a vblank interrupt call
//! [`ConsoleRegistry::tick_all`] (or `Console::blink_tick` directly) from
//! their own handler instead.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use pixcon_core::device::DisplayDevice;

use crate::console::Console;

/// Handle to a registered console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsoleId(usize);

/// Owner of all active terminal-to-device bindings.
pub struct ConsoleRegistry<D: DisplayDevice + Send = Box<dyn DisplayDevice + Send>> {
    entries: Mutex<Vec<Option<Arc<Mutex<Console<D>>>>>>,
}

impl<D: DisplayDevice + Send> ConsoleRegistry<D> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a console, returning its id. Freed slots are reused.
    pub fn attach(&self, console: Console<D>) -> ConsoleId {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let slot = Arc::new(Mutex::new(console));
        if let Some(pos) = entries.iter().position(Option::is_none) {
            entries[pos] = Some(slot);
            ConsoleId(pos)
        } else {
            entries.push(Some(slot));
            ConsoleId(entries.len() - 1)
        }
    }

    /// Remove a console, returning `true` if the id was registered.
    ///
    /// Blocks until any in-flight operation on that console completes; a
    /// surface is never detached mid-scroll.
    pub fn detach(&self, id: ConsoleId) -> bool {
        let taken = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.get_mut(id.0).and_then(Option::take)
        };
        match taken {
            Some(slot) => {
                // Wait out any operation still running under the lock.
                drop(slot.lock().unwrap_or_else(|e| e.into_inner()));
                true
            }
            None => false,
        }
    }

    /// Run `f` against a registered console.
    pub fn with<R>(&self, id: ConsoleId, f: impl FnOnce(&mut Console<D>) -> R) -> Option<R> {
        let slot = {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.get(id.0).and_then(|slot| slot.clone())
        };
        slot.map(|slot| {
            let mut console = slot.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut console)
        })
    }

    /// Advance the cursor blink phase on every registered console.
    pub fn tick_all(&self) {
        let slots: Vec<_> = {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.iter().flatten().cloned().collect()
        };
        for slot in slots {
            let mut console = slot.lock().unwrap_or_else(|e| e.into_inner());
            console.blink_tick();
        }
    }

    /// Number of registered consoles.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().flatten().count()
    }

    /// Whether no consoles are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: DisplayDevice + Send> Default for ConsoleRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-rate blink driver backed by a background thread.
///
/// The thread wakes every `period` and ticks all registered consoles.
/// Dropping the ticker (or calling [`shutdown`](Self::shutdown)) stops
/// and joins the thread.
#[derive(Debug)]
pub struct BlinkTicker {
    stop: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl BlinkTicker {
    /// Spawn the blink thread.
    pub fn spawn<D: DisplayDevice + Send + 'static>(
        registry: Arc<ConsoleRegistry<D>>,
        period: Duration,
    ) -> std::io::Result<Self> {
        let (stop, rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("pixcon-blink".into())
            .spawn(move || loop {
                match rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => registry.tick_all(),
                    _ => break,
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the blink thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BlinkTicker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsoleConfig;
    use pixcon_core::device::{DeviceGeometry, MemoryDevice, PixelLayout, ScrollCaps};
    use pixcon_core::font::FontRegistry;
    use pixcon_render::packed::PackedRenderer;

    fn console() -> Console<MemoryDevice> {
        let geometry = DeviceGeometry {
            xres: 64,
            yres: 64,
            xres_virtual: 64,
            yres_virtual: 64,
            stride: 64,
            layout: PixelLayout::Packed { bpp: 8 },
        };
        let device = MemoryDevice::new(geometry, ScrollCaps::NONE);
        Console::new(
            device,
            Box::new(PackedRenderer::new()),
            Arc::new(FontRegistry::new()),
            ConsoleConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn attach_detach_roundtrip() {
        let registry = ConsoleRegistry::new();
        let id = registry.attach(console());
        assert_eq!(registry.len(), 1);
        assert!(registry.detach(id));
        assert!(registry.is_empty());
        assert!(!registry.detach(id));
    }

    #[test]
    fn slot_reuse_after_detach() {
        let registry = ConsoleRegistry::new();
        let a = registry.attach(console());
        let b = registry.attach(console());
        registry.detach(a);
        let c = registry.attach(console());
        assert_eq!(a, c);
        assert_ne!(b, c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn with_reaches_console() {
        let registry = ConsoleRegistry::new();
        let id = registry.attach(console());
        let rows = registry.with(id, |c| c.rows()).unwrap();
        assert_eq!(rows, 8);
        registry.detach(id);
        assert!(registry.with(id, |c| c.rows()).is_none());
    }

    #[test]
    fn ticker_runs_and_shuts_down() {
        let registry = Arc::new(ConsoleRegistry::new());
        let id = registry.attach(console());
        registry.with(id, |c| c.cursor_set(0, 0, true));

        let ticker = BlinkTicker::spawn(Arc::clone(&registry), Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        ticker.shutdown();
        // The console is still reachable and consistent after ticking.
        assert_eq!(registry.with(id, |c| c.rows()).unwrap(), 8);
    }
}
