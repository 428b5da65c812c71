#![forbid(unsafe_code)]

//! Packed-pixel renderer for linear chunky surfaces (8/16/24/32 bpp).
//!
//! Glyph bitmap rows expand MSB-first into foreground/background pixel
//! values resolved through the surface palette. Moves copy whole
//! scanline spans with `copy_within`, choosing top-down or bottom-up row
//! order so overlapping regions are never read after being overwritten.
//! The software cursor XORs the cell rectangle with `fg ^ bg`, which
//! swaps the two colors and is its own inverse.
//!
//! Planar, interleaved-planar, and monochrome layouts are rejected at
//! setup; surfaces using them degrade to the dummy renderer.

use pixcon_core::cell::Cell;
use pixcon_core::device::PixelLayout;
use pixcon_core::font::Font;

use crate::renderer::{CellRenderer, GlyphWidths, RenderCaps, RenderError};
use crate::surface::RenderSurface;

/// Renderer for linear packed-pixel surfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedRenderer {
    bytes_pp: usize,
}

impl PackedRenderer {
    pub const fn new() -> Self {
        Self { bytes_pp: 0 }
    }
}

#[inline]
fn write_pixel(fb: &mut [u8], off: usize, bytes_pp: usize, val: u32) {
    fb[off..off + bytes_pp].copy_from_slice(&val.to_le_bytes()[..bytes_pp]);
}

#[inline]
fn read_pixel(fb: &[u8], off: usize, bytes_pp: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes[..bytes_pp].copy_from_slice(&fb[off..off + bytes_pp]);
    u32::from_le_bytes(bytes)
}

impl CellRenderer for PackedRenderer {
    fn setup(&mut self, surface: &RenderSurface) -> Result<(), RenderError> {
        match surface.layout.bytes_per_pixel() {
            Some(bytes_pp) => {
                self.bytes_pp = bytes_pp;
                #[cfg(feature = "tracing")]
                tracing::debug!(layout = %surface.layout, stride = surface.stride, "packed renderer bound");
                Ok(())
            }
            None => Err(RenderError::UnsupportedPixelLayout(surface.layout)),
        }
    }

    fn caps(&self) -> RenderCaps {
        RenderCaps::RELIABLE_MOVE
    }

    fn supported_widths(&self) -> GlyphWidths {
        GlyphWidths::up_to(Font::MAX_WIDTH)
    }

    fn bitmap_move(
        &mut self,
        fb: &mut [u8],
        surface: &RenderSurface,
        src_row: u32,
        src_col: u32,
        dst_row: u32,
        dst_col: u32,
        rows: u32,
        cols: u32,
    ) {
        let fw = surface.font.width() as usize;
        let fh = surface.font.height() as usize;
        let stride = surface.stride;
        let span = cols as usize * fw * self.bytes_pp;
        let scanlines = rows as usize * fh;
        let src_y = src_row as usize * fh;
        let dst_y = dst_row as usize * fh;
        let src_x = src_col as usize * fw * self.bytes_pp;
        let dst_x = dst_col as usize * fw * self.bytes_pp;

        let line = |y: usize, x: usize| y * stride + x;
        if line(src_y + scanlines, 0) > fb.len() || line(dst_y + scanlines, 0) > fb.len() {
            debug_assert!(false, "bitmap_move out of bounds");
            return;
        }

        if dst_y <= src_y {
            for dy in 0..scanlines {
                let s = line(src_y + dy, src_x);
                let d = line(dst_y + dy, dst_x);
                fb.copy_within(s..s + span, d);
            }
        } else {
            for dy in (0..scanlines).rev() {
                let s = line(src_y + dy, src_x);
                let d = line(dst_y + dy, dst_x);
                fb.copy_within(s..s + span, d);
            }
        }
    }

    fn clear_region(
        &mut self,
        fb: &mut [u8],
        surface: &RenderSurface,
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
        bg: u8,
    ) {
        let fw = surface.font.width() as usize;
        let fh = surface.font.height() as usize;
        let stride = surface.stride;
        let bgpix = surface.palette.pixel(bg, surface.layout);
        let x0 = col as usize * fw * self.bytes_pp;
        let span = cols as usize * fw * self.bytes_pp;
        let y0 = row as usize * fh;
        let scanlines = rows as usize * fh;

        if (y0 + scanlines) * stride > fb.len() {
            debug_assert!(false, "clear_region out of bounds");
            return;
        }

        for dy in 0..scanlines {
            let off = (y0 + dy) * stride + x0;
            let line = &mut fb[off..off + span];
            if self.bytes_pp == 1 {
                line.fill(bgpix as u8);
            } else {
                for px in line.chunks_exact_mut(self.bytes_pp) {
                    px.copy_from_slice(&bgpix.to_le_bytes()[..self.bytes_pp]);
                }
            }
        }
    }

    fn draw_run(
        &mut self,
        fb: &mut [u8],
        surface: &RenderSurface,
        row: u32,
        col: u32,
        cells: &[Cell],
    ) {
        let font = &surface.font;
        let fw = font.width() as usize;
        let fh = font.height() as usize;
        let row_bytes = font.row_bytes();
        let stride = surface.stride;
        let y0 = row as usize * fh;

        for (i, &cell) in cells.iter().enumerate() {
            let x0 = (col as usize + i) * fw * self.bytes_pp;
            if (y0 + fh - 1) * stride + x0 + fw * self.bytes_pp > fb.len() {
                debug_assert!(false, "draw_run out of bounds");
                return;
            }
            let fg = surface.palette.pixel(surface.codec.fg(cell), surface.layout);
            let bg = surface.palette.pixel(surface.codec.bg(cell), surface.layout);
            let bitmap = font.glyph(surface.codec.glyph(cell));

            for gy in 0..fh {
                let line = &bitmap[gy * row_bytes..(gy + 1) * row_bytes];
                let base = (y0 + gy) * stride + x0;
                for gx in 0..fw {
                    let ink = (line[gx / 8] >> (7 - (gx & 7))) & 1 == 1;
                    write_pixel(fb, base + gx * self.bytes_pp, self.bytes_pp, if ink { fg } else { bg });
                }
            }
        }
    }

    fn invert_glyph(
        &mut self,
        fb: &mut [u8],
        surface: &RenderSurface,
        row: u32,
        col: u32,
        cell: Cell,
    ) {
        let fw = surface.font.width() as usize;
        let fh = surface.font.height() as usize;
        let stride = surface.stride;
        let y0 = row as usize * fh;
        let x0 = col as usize * fw * self.bytes_pp;
        if (y0 + fh - 1) * stride + x0 + fw * self.bytes_pp > fb.len() {
            debug_assert!(false, "invert_glyph out of bounds");
            return;
        }

        let fg = surface.palette.pixel(surface.codec.fg(cell), surface.layout);
        let bg = surface.palette.pixel(surface.codec.bg(cell), surface.layout);
        let mask = fg ^ bg;
        if mask == 0 {
            return;
        }
        for gy in 0..fh {
            let base = (y0 + gy) * stride + x0;
            for gx in 0..fw {
                let off = base + gx * self.bytes_pp;
                let px = read_pixel(fb, off, self.bytes_pp);
                write_pixel(fb, off, self.bytes_pp, px ^ mask);
            }
        }
    }
}
