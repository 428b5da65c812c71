#![forbid(unsafe_code)]

//! Per-binding scroll geometry.
//!
//! [`SurfaceState`] is the console's bookkeeping for one terminal-to-
//! device binding: the cell grid derived from resolution and font
//! metrics, the hardware scroll granularity, the current scroll offset,
//! and the selected strategy.
//!
//! # Invariants
//!
//! 1. `0 <= yscroll < vrows` after every operation
//! 2. `vrows >= rows` (the virtual plane holds at least the visible grid)
//! 3. `yscroll == 0` unless `mode` is `Wrap` or `Pan`
//! 4. Under `Pan`, additionally `yscroll <= vrows - rows`

use pixcon_core::device::{DeviceGeometry, ScrollCaps};
use pixcon_core::font::Font;

use crate::scroll::{self, ScrollMode, ScrollPolicy};

/// Geometry and scroll bookkeeping for one display surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceState {
    /// Visible width in pixels.
    pub xres: u32,
    /// Visible height in pixels.
    pub yres: u32,
    /// Scrollable plane height in pixels.
    pub yres_virtual: u32,
    /// Hardware pan granularity in pixels (0 = unsupported).
    pub pan_step: u32,
    /// Hardware wrap granularity in pixels (0 = unsupported).
    pub wrap_step: u32,
    /// Visible grid height in cells.
    pub rows: u32,
    /// Visible grid width in cells.
    pub cols: u32,
    /// Virtual plane height in cell rows.
    pub vrows: u32,
    /// Current vertical scroll offset in cell rows.
    pub yscroll: u32,
    /// Selected scroll strategy.
    pub mode: ScrollMode,
    /// Whether the device can blank without losing pixel memory.
    pub can_soft_blank: bool,
    /// Whether the display is currently blanked.
    pub blanked: bool,
}

impl SurfaceState {
    /// Bookkeeping for a fresh binding; grid fields are filled in by
    /// [`recompute`](Self::recompute).
    pub(crate) fn new(geometry: DeviceGeometry, caps: ScrollCaps, can_soft_blank: bool) -> Self {
        Self {
            xres: geometry.xres,
            yres: geometry.yres,
            yres_virtual: geometry.yres_virtual,
            pan_step: caps.pan_step,
            wrap_step: caps.wrap_step,
            rows: 0,
            cols: 0,
            vrows: 0,
            yscroll: 0,
            mode: ScrollMode::Redraw,
            can_soft_blank,
            blanked: false,
        }
    }

    /// Re-derive the cell grid and scroll strategy after a font or
    /// resolution change. Resets the scroll offset.
    pub(crate) fn recompute(&mut self, font: &Font, reliable_move: bool, policy: ScrollPolicy) {
        let fw = font.width().max(1);
        let fh = font.height().max(1);
        self.rows = self.yres / fh;
        self.cols = self.xres / fw;
        self.vrows = (self.yres_virtual / fh).max(self.rows);
        self.yscroll = 0;
        self.mode = scroll::select_mode(
            ScrollCaps {
                pan_step: self.pan_step,
                wrap_step: self.wrap_step,
            },
            fh,
            self.yres,
            self.yres_virtual,
            reliable_move,
            policy,
        );
    }

    /// Physical row of a logical row under the current offset.
    #[inline]
    pub fn real_row(&self, logical: u32) -> u32 {
        match self.mode {
            ScrollMode::Wrap => (logical + self.yscroll) % self.vrows,
            _ => logical + self.yscroll,
        }
    }

    /// Logical row at which the ring seam sits, for wrap-split purposes.
    ///
    /// Non-ring surfaces return `u32::MAX`, which disables splitting.
    #[inline]
    pub(crate) fn y_break(&self) -> u32 {
        match self.mode {
            ScrollMode::Wrap => self.vrows - self.yscroll,
            _ => u32::MAX,
        }
    }
}
