#![forbid(unsafe_code)]

//! The renderer capability contract.
//!
//! A [`CellRenderer`] implements the cell-level drawing operations for one
//! pixel memory layout. The scroll engine hands it *physical* row
//! coordinates — positions already resolved through the virtual ring
//! buffer — so a renderer never reasons about scrolling; it only turns
//! cells into pixels at the rows it is told.
//!
//! Operations other than [`setup`](CellRenderer::setup) are infallible by
//! contract: a renderer that cannot serve a surface at all is rejected at
//! setup time and replaced by the no-op [`DummyRenderer`], so the terminal
//! layer above never has to handle a drawing failure mid-session.

use std::fmt;

use pixcon_core::cell::Cell;
use pixcon_core::device::PixelLayout;

use crate::surface::RenderSurface;

bitflags::bitflags! {
    /// Static capabilities a renderer declares at setup time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderCaps: u8 {
        /// `bitmap_move` is pixel-accurate, including overlapping copies.
        /// Without it the scroll engine falls back to full redraws.
        const RELIABLE_MOVE = 1 << 0;
        /// `draw_cursor` drives a hardware cursor; the controller will
        /// not fall back to glyph inversion.
        const HW_CURSOR = 1 << 1;
    }
}

/// Set of glyph pixel widths a renderer can draw, one bit per width.
///
/// Bit `w - 1` set means width `w` is supported, for `1 ..= 32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphWidths(u32);

impl GlyphWidths {
    /// Every width from 1 to 32.
    pub const ALL: Self = Self(u32::MAX);

    /// Exactly one width.
    #[inline]
    #[must_use]
    pub const fn single(width: u32) -> Self {
        Self(1 << (width - 1))
    }

    /// Every width from 1 up to and including `width`.
    #[inline]
    #[must_use]
    pub const fn up_to(width: u32) -> Self {
        if width >= 32 {
            Self::ALL
        } else {
            Self((1 << width) - 1)
        }
    }

    /// Whether `width` is in the set.
    #[inline]
    pub const fn supports(self, width: u32) -> bool {
        width >= 1 && width <= 32 && (self.0 >> (width - 1)) & 1 == 1
    }
}

/// Cursor operation passed to a hardware-cursor-capable renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOp {
    Draw,
    Erase,
}

/// Errors a renderer can report at setup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The surface's pixel layout is not one this renderer implements.
    UnsupportedPixelLayout(PixelLayout),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPixelLayout(layout) => {
                write!(f, "no renderer support for pixel layout: {layout}")
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// Cell-level drawing backend for one pixel memory layout.
///
/// All `row`/`col` arguments are physical cell coordinates into the
/// virtual plane; `fb` is the device's mapped pixel memory. Out-of-range
/// coordinates must be ignored, never panicked on.
pub trait CellRenderer: fmt::Debug + Send {
    /// Validate the surface and compute per-surface constants.
    ///
    /// Called once per binding and again whenever the surface geometry or
    /// font changes.
    fn setup(&mut self, surface: &RenderSurface) -> Result<(), RenderError>;

    /// Static capabilities of this renderer.
    fn caps(&self) -> RenderCaps;

    /// Glyph pixel widths this renderer can draw.
    fn supported_widths(&self) -> GlyphWidths;

    /// Copy a rectangle of already-rendered cells, pixel-accurate.
    ///
    /// Source and destination may overlap in either direction.
    #[allow(clippy::too_many_arguments)]
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
    );

    /// Fill a rectangle of cells with a background color index.
    fn clear_region(
        &mut self,
        fb: &mut [u8],
        surface: &RenderSurface,
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
        bg: u8,
    );

    /// Draw a run of cells starting at `(row, col)`, colors decoded from
    /// each cell's attribute fields. A single glyph is a run of one.
    fn draw_run(&mut self, fb: &mut [u8], surface: &RenderSurface, row: u32, col: u32, cells: &[Cell]);

    /// Swap foreground and background at one cell (software cursor).
    ///
    /// `cell` is the cell currently rendered there; applying the operation
    /// twice restores the original pixels.
    fn invert_glyph(&mut self, fb: &mut [u8], surface: &RenderSurface, row: u32, col: u32, cell: Cell);

    /// Drive a hardware cursor at the given cell.
    ///
    /// Returns `false` when unimplemented, in which case the cursor
    /// controller falls back to [`invert_glyph`](Self::invert_glyph).
    fn draw_cursor(
        &mut self,
        _fb: &mut [u8],
        _surface: &RenderSurface,
        _op: CursorOp,
        _row: u32,
        _col: u32,
    ) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_widths_single() {
        let w = GlyphWidths::single(8);
        assert!(w.supports(8));
        assert!(!w.supports(7));
        assert!(!w.supports(9));
    }

    #[test]
    fn glyph_widths_up_to() {
        let w = GlyphWidths::up_to(16);
        assert!(w.supports(1));
        assert!(w.supports(16));
        assert!(!w.supports(17));
        assert!(GlyphWidths::up_to(32).supports(32));
    }

    #[test]
    fn glyph_widths_bounds() {
        assert!(!GlyphWidths::ALL.supports(0));
        assert!(!GlyphWidths::ALL.supports(33));
        assert!(GlyphWidths::ALL.supports(32));
    }
}
