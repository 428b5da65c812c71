#![forbid(unsafe_code)]

//! The no-op renderer.
//!
//! Installed surface-wide when no real backend can serve the surface's
//! pixel layout. Every operation succeeds and touches no memory, so the
//! terminal stays fully usable — put, clear, move, and scroll all keep
//! working against the cell store — it just isn't drawn until a
//! compatible font/device combination is configured.

use pixcon_core::cell::Cell;

use crate::renderer::{CellRenderer, GlyphWidths, RenderCaps, RenderError};
use crate::surface::RenderSurface;

/// Renderer whose every operation is a successful no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyRenderer;

impl DummyRenderer {
    pub const fn new() -> Self {
        Self
    }
}

impl CellRenderer for DummyRenderer {
    fn setup(&mut self, _surface: &RenderSurface) -> Result<(), RenderError> {
        Ok(())
    }

    fn caps(&self) -> RenderCaps {
        // Moves "succeed" trivially, so the scroll engine never needs the
        // redraw path on a dummy-bound surface.
        RenderCaps::RELIABLE_MOVE
    }

    fn supported_widths(&self) -> GlyphWidths {
        GlyphWidths::ALL
    }

    fn bitmap_move(
        &mut self,
        _fb: &mut [u8],
        _surface: &RenderSurface,
        _src_row: u32,
        _src_col: u32,
        _dst_row: u32,
        _dst_col: u32,
        _rows: u32,
        _cols: u32,
    ) {
    }

    fn clear_region(
        &mut self,
        _fb: &mut [u8],
        _surface: &RenderSurface,
        _row: u32,
        _col: u32,
        _rows: u32,
        _cols: u32,
        _bg: u8,
    ) {
    }

    fn draw_run(
        &mut self,
        _fb: &mut [u8],
        _surface: &RenderSurface,
        _row: u32,
        _col: u32,
        _cells: &[Cell],
    ) {
    }

    fn invert_glyph(
        &mut self,
        _fb: &mut [u8],
        _surface: &RenderSurface,
        _row: u32,
        _col: u32,
        _cell: Cell,
    ) {
    }
}
