//! Scroll-strategy throughput on a RAM-backed 8-bit surface.

use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use pixcon_console::console::{Console, ConsoleConfig};
use pixcon_console::ScrollDir;
use pixcon_core::device::{DeviceGeometry, MemoryDevice, PixelLayout, ScrollCaps};
use pixcon_core::font::FontRegistry;
use pixcon_render::packed::PackedRenderer;

fn console(caps: ScrollCaps, yres_virtual: u32) -> Console<MemoryDevice> {
    let geometry = DeviceGeometry {
        xres: 640,
        yres: 480,
        xres_virtual: 640,
        yres_virtual,
        stride: 640,
        layout: PixelLayout::Packed { bpp: 8 },
    };
    let mut console = Console::new(
        MemoryDevice::new(geometry, caps),
        Box::new(PackedRenderer::new()),
        Arc::new(FontRegistry::new()),
        ConsoleConfig::default(),
    )
    .unwrap();
    for r in 0..console.rows() {
        let codes: Vec<u16> = (0..console.cols()).map(|c| 0x21 + (r + c) as u16 % 0x5E).collect();
        console.put_run(r, 0, &codes, 0x07);
    }
    console
}

fn bench_scroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll_up_1");

    group.bench_function("wrap", |b| {
        let mut console = console(
            ScrollCaps {
                pan_step: 0,
                wrap_step: 16,
            },
            960,
        );
        b.iter(|| {
            console.scroll(ScrollDir::Up, black_box(1));
        });
    });

    group.bench_function("pan", |b| {
        let mut console = console(
            ScrollCaps {
                pan_step: 16,
                wrap_step: 0,
            },
            960,
        );
        b.iter(|| {
            console.scroll(ScrollDir::Up, black_box(1));
        });
    });

    group.bench_function("move", |b| {
        let mut console = console(ScrollCaps::NONE, 480);
        b.iter(|| {
            console.scroll(ScrollDir::Up, black_box(1));
        });
    });

    group.finish();
}

fn bench_redraw(c: &mut Criterion) {
    c.bench_function("scrollback_page_flip", |b| {
        let mut console = console(ScrollCaps::NONE, 480);
        for _ in 0..60 {
            console.scroll(ScrollDir::Up, 1);
        }
        b.iter(|| {
            console.scrollback_scroll(black_box(10));
            console.scrollback_scroll(black_box(-10));
        });
    });
}

criterion_group!(benches, bench_scroll, bench_redraw);
criterion_main!(benches);
