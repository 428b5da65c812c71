//! Whole-service lifecycle: registry, shared fonts, switching, blink.

use std::sync::Arc;
use std::time::Duration;

use pixcon_console::console::{Console, ConsoleConfig};
use pixcon_console::registry::{BlinkTicker, ConsoleRegistry};
use pixcon_console::ScrollDir;
use pixcon_core::device::{DeviceGeometry, MemoryDevice, PixelLayout, ScrollCaps};
use pixcon_core::font::FontRegistry;
use pixcon_render::packed::PackedRenderer;

fn device() -> MemoryDevice {
    let geometry = DeviceGeometry {
        xres: 64,
        yres: 64,
        xres_virtual: 64,
        yres_virtual: 128,
        stride: 64,
        layout: PixelLayout::Packed { bpp: 8 },
    };
    MemoryDevice::new(
        geometry,
        ScrollCaps {
            pan_step: 0,
            wrap_step: 8,
        },
    )
}

fn console(fonts: &Arc<FontRegistry>) -> Console<MemoryDevice> {
    Console::new(
        device(),
        Box::new(PackedRenderer::new()),
        Arc::clone(fonts),
        ConsoleConfig::default(),
    )
    .unwrap()
}

#[test]
fn consoles_share_one_font_instance() {
    let fonts = Arc::new(FontRegistry::new());
    let registry = ConsoleRegistry::new();

    let a = registry.attach(console(&fonts));
    let b = registry.attach(console(&fonts));
    let c = registry.attach(console(&fonts));

    let font = registry.with(a, |con| Arc::clone(con.font())).unwrap();
    assert_eq!(fonts.refcount(&font), 3);

    registry.detach(b);
    assert_eq!(fonts.refcount(&font), 2);
    registry.detach(a);
    registry.detach(c);
    assert_eq!(fonts.refcount(&font), 0);
    assert!(!fonts.contains(&font));
}

#[test]
fn switching_between_consoles_restores_each_view() {
    let fonts = Arc::new(FontRegistry::new());
    let registry = ConsoleRegistry::new();
    let a = registry.attach(console(&fonts));
    let b = registry.attach(console(&fonts));

    registry.with(a, |con| {
        con.put_run(0, 0, &[b'A' as u16; 8], 0x07);
        con.scroll(ScrollDir::Up, 2);
        con.switch_out();
    });

    // Console B takes the (conceptually shared) display.
    registry.with(b, |con| {
        con.switch_in();
        con.put_run(0, 0, &[b'B' as u16; 8], 0x07);
    });

    // Back to A: offsets reset, content repainted from its own store.
    registry.with(a, |con| {
        con.switch_in();
        assert_eq!(con.yscroll(), 0);
        assert_eq!(con.device().scan_offset(), (0, 0));
        // Row 0 shows what scrolled up two rows ago: blank (A only wrote
        // one row which is now in scrollback territory).
        assert_eq!(con.scrollback_depth(), 2);
    });
}

#[test]
fn blink_ticker_drives_cursor_under_the_console_lock() {
    let fonts = Arc::new(FontRegistry::new());
    let registry = Arc::new(ConsoleRegistry::new());
    let id = registry.attach(console(&fonts));

    registry.with(id, |con| {
        con.put_run(2, 0, &[b'x' as u16; 4], 0x07);
        con.cursor_set(2, 1, true);
    });

    let ticker = BlinkTicker::spawn(Arc::clone(&registry), Duration::from_millis(2)).unwrap();

    // Terminal operations race the ticker; the per-console lock keeps
    // every read-modify-write whole.
    for i in 0..50u32 {
        registry.with(id, |con| {
            con.put_glyph(3, (i % 8) as u32, b'y' as u16, 0x07);
            con.scroll(ScrollDir::Up, i % 2);
        });
        std::thread::sleep(Duration::from_millis(1));
    }
    ticker.shutdown();

    // Cursor off: the surface must be byte-exact reproducible, no
    // half-applied inversions left behind.
    registry.with(id, |con| {
        con.cursor_set(2, 1, false);
        con.switch_in();
    });
    let final_a = registry
        .with(id, |con| con.device().mem().to_vec())
        .unwrap();
    // A forced repaint from the store must not change a single pixel.
    registry.with(id, |con| con.switch_in());
    let final_b = registry
        .with(id, |con| con.device().mem().to_vec())
        .unwrap();
    let visible = 64 * 64;
    assert_eq!(&final_a[..visible], &final_b[..visible]);
}
