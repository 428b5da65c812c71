#![forbid(unsafe_code)]

//! The terminal adapter: one console per terminal-to-device binding.
//!
//! [`Console`] owns everything a binding needs — the device, the active
//! renderer, the bound font, the logical cell store, and a physical
//! shadow of what is actually on screen — and translates terminal
//! operations into renderer and device calls. Scrolls go through the
//! strategy selected in [`crate::scroll`]; moves and clears that cross
//! the virtual ring seam are split before they reach the renderer, so
//! renderers only ever see seam-free physical coordinates.
//!
//! # Stores
//!
//! - `cells` — the logical visible grid (`rows * cols`), the source of
//!   truth for redraws.
//! - `shadow` — one entry per *physical* cell of the virtual plane,
//!   recording what was last drawn there. The redraw strategy skips
//!   cells whose shadow already matches, which turns repeated redraws of
//!   mostly-unchanged screens into small partial updates.
//!
//! # Error policy
//!
//! Font and renderer binding errors are returned synchronously from the
//! calls that change bindings ([`Console::new`], [`Console::set_font`]).
//! Drawing operations never fail: a surface with no compatible renderer
//! runs against the no-op backend, and a device that refuses a scan
//! offset gets a software scroll for that operation only.

use std::sync::Arc;

use smallvec::SmallVec;

use pixcon_core::cell::{AttrCodec, Cell};
use pixcon_core::device::DisplayDevice;
use pixcon_core::font::{Font, FontError, FontRegistry};
use pixcon_render::dummy::DummyRenderer;
use pixcon_render::renderer::{CellRenderer, CursorOp, RenderCaps};
use pixcon_render::surface::{Palette, RenderSurface};

use crate::cursor::CursorState;
use crate::scroll::{self, MoveSpan, ScrollDir, ScrollMode, ScrollPolicy};
use crate::scrollback::Scrollback;
use crate::surface::SurfaceState;

/// Font selection passed to [`Console::set_font`].
#[derive(Debug, Clone, Copy)]
pub enum FontRequest<'a> {
    /// The resolution-appropriate default font.
    Default,
    /// A registered or built-in font by name.
    Named(&'a str),
    /// Caller-supplied bitmap data.
    Data {
        name: &'a str,
        width: u32,
        height: u32,
        glyph_count: u32,
        data: &'a [u8],
    },
}

/// Construction-time configuration for a console.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Font to bind, `None` for the resolution default.
    pub font_name: Option<String>,
    /// Scrollback capacity in rows; 0 disables scrollback.
    pub scrollback_lines: usize,
    /// Scroll strategy policy.
    pub policy: ScrollPolicy,
    /// Blink-timer ticks per cursor phase; 0 for a solid cursor.
    pub blink_ticks: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            font_name: None,
            scrollback_lines: 120,
            policy: ScrollPolicy::default(),
            blink_ticks: 5,
        }
    }
}

/// One terminal-to-device binding.
pub struct Console<D: DisplayDevice + Send> {
    device: D,
    renderer: Box<dyn CellRenderer + Send>,
    fonts: Arc<FontRegistry>,
    rsurf: RenderSurface,
    state: SurfaceState,
    policy: ScrollPolicy,
    degraded: bool,
    attr: u8,
    cells: Vec<Cell>,
    shadow: Vec<Cell>,
    shadow_valid: bool,
    scrollback: Scrollback,
    sb_offset: usize,
    cursor: CursorState,
    scratch: Vec<Cell>,
}

impl<D: DisplayDevice + Send> Console<D> {
    /// Bind a terminal to a device.
    ///
    /// Resolves and attaches the font, validates the renderer against the
    /// surface, and paints the initial (blank) screen. A renderer that
    /// rejects the surface's pixel layout is replaced by the no-op
    /// backend — that is a warning, not an error; the console stays
    /// usable. Font resolution failures are returned to the caller.
    pub fn new(
        device: D,
        renderer: Box<dyn CellRenderer + Send>,
        fonts: Arc<FontRegistry>,
        config: ConsoleConfig,
    ) -> Result<Self, FontError> {
        let geometry = device.geometry();
        let caps = device.scroll_caps();
        let can_soft_blank = device.can_soft_blank();

        let font = fonts.acquire(config.font_name.as_deref(), geometry.xres, geometry.yres)?;
        let rsurf = RenderSurface {
            layout: geometry.layout,
            stride: geometry.stride,
            xres: geometry.xres,
            yres: geometry.yres,
            yres_virtual: geometry.yres_virtual,
            codec: AttrCodec::for_glyph_count(font.glyph_count()),
            font,
            palette: Palette::default(),
        };

        let mut renderer = renderer;
        let degraded = match renderer.setup(&rsurf) {
            Ok(()) => false,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "installing no-op renderer");
                renderer = Box::new(DummyRenderer::new());
                let _ = renderer.setup(&rsurf);
                true
            }
        };
        if !renderer.supported_widths().supports(rsurf.font.width()) {
            return Err(FontError::UnsupportedGlyphWidth(rsurf.font.width()));
        }
        fonts.attach(&rsurf.font);

        let mut state = SurfaceState::new(geometry, caps, can_soft_blank);
        state.recompute(
            &rsurf.font,
            renderer.caps().contains(RenderCaps::RELIABLE_MOVE),
            config.policy,
        );

        let mut console = Self {
            device,
            renderer,
            fonts,
            rsurf,
            state,
            policy: config.policy,
            degraded,
            attr: 0x07,
            cells: Vec::new(),
            shadow: Vec::new(),
            shadow_valid: false,
            scrollback: Scrollback::new(config.scrollback_lines),
            sb_offset: 0,
            cursor: CursorState::new(config.blink_ticks),
            scratch: Vec::new(),
        };
        console.alloc_stores();
        console.switch_in();
        Ok(console)
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Visible grid height in cells.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.state.rows
    }

    /// Visible grid width in cells.
    #[inline]
    pub fn cols(&self) -> u32 {
        self.state.cols
    }

    /// Current vertical scroll offset in cell rows.
    #[inline]
    pub fn yscroll(&self) -> u32 {
        self.state.yscroll
    }

    /// Selected scroll strategy.
    #[inline]
    pub fn scroll_mode(&self) -> ScrollMode {
        self.state.mode
    }

    /// Whether the no-op renderer is installed (graceful degradation).
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Metrics of the bound font: (width, height, glyph count).
    #[inline]
    pub fn font_metrics(&self) -> (u32, u32, u32) {
        let f = &self.rsurf.font;
        (f.width(), f.height(), f.glyph_count())
    }

    /// The bound font.
    #[inline]
    pub fn font(&self) -> &Arc<Font> {
        &self.rsurf.font
    }

    /// The active cell bit layout.
    #[inline]
    pub fn codec(&self) -> AttrCodec {
        self.rsurf.codec
    }

    /// Stored cell at a logical grid position.
    pub fn cell_at(&self, row: u32, col: u32) -> Option<Cell> {
        if row < self.state.rows && col < self.state.cols {
            Some(self.cells[(row * self.state.cols + col) as usize])
        } else {
            None
        }
    }

    /// Rows currently held in scrollback.
    #[inline]
    pub fn scrollback_depth(&self) -> usize {
        self.scrollback.len()
    }

    /// Rows of scrollback currently shown (0 = live view).
    #[inline]
    pub fn scrollback_offset(&self) -> usize {
        self.sb_offset
    }

    /// The underlying device.
    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the underlying device (driver ioctls and the
    /// like; the engine's own bookkeeping is not affected).
    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Set the attribute byte used for cleared cells.
    #[inline]
    pub fn set_attr(&mut self, attr: u8) {
        self.attr = attr;
    }

    // ── Terminal operations ─────────────────────────────────────────

    /// Write one glyph at a grid position.
    pub fn put_glyph(&mut self, row: u32, col: u32, code: u16, attr: u8) {
        self.put_run(row, col, &[code], attr);
    }

    /// Write a run of glyphs sharing one attribute byte.
    ///
    /// The run is clipped at the right edge; out-of-range rows are
    /// ignored.
    pub fn put_run(&mut self, row: u32, col: u32, codes: &[u16], attr: u8) {
        self.leave_scrollback();
        let (rows, cols) = (self.state.rows, self.state.cols);
        if row >= rows || col >= cols || codes.is_empty() {
            return;
        }
        let len = codes.len().min((cols - col) as usize);
        self.hide_cursor();

        let base = (row * cols + col) as usize;
        for (i, &code) in codes[..len].iter().enumerate() {
            self.cells[base + i] = self.rsurf.codec.with_attr(code, attr);
        }
        self.sync_shadow_span(row, col, len);
        if !self.state.blanked {
            let phys = self.state.real_row(row);
            let fb = self.device.framebuffer();
            self.renderer
                .draw_run(fb, &self.rsurf, phys, col, &self.cells[base..base + len]);
        }
        self.restore_cursor();
    }

    /// Clear a cell rectangle to the current attribute's background.
    pub fn clear(&mut self, row: u32, col: u32, rows: u32, cols: u32) {
        self.leave_scrollback();
        if row >= self.state.rows || col >= self.state.cols {
            return;
        }
        let rows = rows.min(self.state.rows - row);
        let cols = cols.min(self.state.cols - col);
        if rows == 0 || cols == 0 {
            return;
        }
        self.hide_cursor();

        let blank = self.rsurf.codec.erase_cell(self.attr);
        let width = self.state.cols;
        for r in row..row + rows {
            let base = (r * width + col) as usize;
            self.cells[base..base + cols as usize].fill(blank);
        }
        self.clear_render(row, col, rows, cols);
        self.restore_cursor();
    }

    /// Copy a cell rectangle, overlap-safe.
    pub fn move_region(
        &mut self,
        src_row: u32,
        src_col: u32,
        dst_row: u32,
        dst_col: u32,
        rows: u32,
        cols: u32,
    ) {
        self.leave_scrollback();
        let (grows, gcols) = (self.state.rows, self.state.cols);
        let fits = |r: u32, c: u32| {
            r.checked_add(rows).is_some_and(|re| re <= grows)
                && c.checked_add(cols).is_some_and(|ce| ce <= gcols)
        };
        if rows == 0 || cols == 0 || !fits(src_row, src_col) || !fits(dst_row, dst_col) {
            return;
        }
        if src_row == dst_row && src_col == dst_col {
            return;
        }
        self.hide_cursor();

        self.store_move(src_row, src_col, dst_row, dst_col, rows, cols);

        let mut legs: SmallVec<[MoveSpan; 4]> = SmallVec::new();
        scroll::split_move(src_row, dst_row, rows, self.state.y_break(), &mut legs);
        if !self.state.blanked {
            let fb = self.device.framebuffer();
            for leg in &legs {
                let ps = self.state.real_row(leg.src);
                let pd = self.state.real_row(leg.dst);
                self.renderer
                    .bitmap_move(fb, &self.rsurf, ps, src_col, pd, dst_col, leg.rows, cols);
            }
        }
        for r in dst_row..dst_row + rows {
            self.sync_shadow_span(r, dst_col, cols as usize);
        }
        self.restore_cursor();
    }

    /// Scroll the visible grid.
    ///
    /// Amounts beyond the virtual row count are clamped; an amount
    /// covering the whole grid degenerates to "clear everything". Zero
    /// is a no-op. This call cannot fail: hardware-assisted strategies
    /// fall back to software for any single operation the device
    /// refuses, without abandoning the strategy.
    pub fn scroll(&mut self, dir: ScrollDir, count: u32) {
        self.leave_scrollback();
        let count = count.min(self.state.vrows);
        if count == 0 {
            return;
        }
        self.hide_cursor();
        match dir {
            ScrollDir::Up => self.scroll_up(count),
            ScrollDir::Down => self.scroll_down(count),
        }
        self.restore_cursor();
    }

    /// Move the cursor and set its visibility.
    ///
    /// Calling with an unchanged position and visibility does nothing —
    /// no erase/redraw churn, no blink reset.
    pub fn cursor_set(&mut self, row: u32, col: u32, visible: bool) {
        if self.cursor.row == row && self.cursor.col == col && self.cursor.visible == visible {
            return;
        }
        self.hide_cursor();
        self.cursor.row = row;
        self.cursor.col = col;
        self.cursor.visible = visible;
        self.restore_cursor();
    }

    /// Advance the cursor blink phase by one tick.
    ///
    /// Driven by a fixed-rate timer ([`crate::registry::BlinkTicker`]) or
    /// the platform's vertical-blank hook. Runs under the same exclusive
    /// access as every other console call, so a tick never interleaves
    /// with a half-finished terminal operation.
    pub fn blink_tick(&mut self) {
        if !self.cursor.visible || self.state.blanked || self.sb_offset != 0 {
            return;
        }
        if self.cursor.tick() {
            if self.cursor.drawn {
                self.flip_cursor(CursorOp::Erase);
                self.cursor.drawn = false;
            } else {
                self.flip_cursor(CursorOp::Draw);
                self.cursor.drawn = true;
            }
        }
    }

    /// Replace the bound font.
    ///
    /// On success the grid is re-derived from the new metrics, stored
    /// cells are re-encoded if the glyph-count class changed, scrollback
    /// is cleared, and the screen is repainted. On failure the previous
    /// font remains active and no state changes.
    pub fn set_font(&mut self, request: FontRequest<'_>) -> Result<(), FontError> {
        let new = match request {
            FontRequest::Default => {
                self.fonts
                    .acquire(None, self.rsurf.xres, self.rsurf.yres)?
            }
            FontRequest::Named(name) => {
                self.fonts
                    .acquire(Some(name), self.rsurf.xres, self.rsurf.yres)?
            }
            FontRequest::Data {
                name,
                width,
                height,
                glyph_count,
                data,
            } => self
                .fonts
                .insert(Font::from_data(name, width, height, glyph_count, data)?),
        };
        if Arc::ptr_eq(&new, &self.rsurf.font) {
            return Ok(());
        }
        if !self.renderer.supported_widths().supports(new.width()) {
            return Err(FontError::UnsupportedGlyphWidth(new.width()));
        }

        self.hide_cursor();
        self.fonts.attach(&new);
        let old = std::mem::replace(&mut self.rsurf.font, new);
        self.fonts.detach(&old);
        let old_codec = self.rsurf.codec;
        self.rsurf.codec = AttrCodec::for_glyph_count(self.rsurf.font.glyph_count());
        self.rebind(old_codec);
        self.restore_cursor();
        Ok(())
    }

    /// Re-query device geometry and rebuild the grid.
    ///
    /// Content in the overlapping region is preserved; scrollback is
    /// cleared (old rows are meaningless under the new shape).
    pub fn resize(&mut self) {
        self.hide_cursor();
        let geometry = self.device.geometry();
        self.rsurf.layout = geometry.layout;
        self.rsurf.stride = geometry.stride;
        self.rsurf.xres = geometry.xres;
        self.rsurf.yres = geometry.yres;
        self.rsurf.yres_virtual = geometry.yres_virtual;
        self.state.xres = geometry.xres;
        self.state.yres = geometry.yres;
        self.state.yres_virtual = geometry.yres_virtual;
        let codec = self.rsurf.codec;
        self.rebind(codec);
        self.restore_cursor();
    }

    /// Take ownership of the display after a console switch.
    ///
    /// Scroll offsets are reset, the shadow is discarded (another console
    /// may have drawn anything), and the full view is repainted.
    pub fn switch_in(&mut self) {
        self.state.yscroll = 0;
        let _ = self.device.set_scan_offset(0, 0);
        self.sb_offset = 0;
        self.shadow_valid = false;
        if !self.state.blanked {
            self.redraw_view();
        }
        self.restore_cursor();
    }

    /// Yield the display to another console.
    pub fn switch_out(&mut self) {
        self.hide_cursor();
    }

    /// Blank or unblank the display.
    ///
    /// Devices that can soft-blank keep their pixel memory; everything
    /// else gets the visible window painted black and a full repaint on
    /// unblank. Terminal operations keep updating the stores while
    /// blanked.
    pub fn blank(&mut self, on: bool) {
        if on == self.state.blanked {
            return;
        }
        if on {
            self.hide_cursor();
            self.state.blanked = true;
            if self.state.can_soft_blank && self.device.blank(true).is_ok() {
                return;
            }
            let rows = self.state.rows;
            let cols = self.state.cols;
            let y_break = self.state.y_break();
            let fb = self.device.framebuffer();
            for (r0, n) in scroll::split_span(0, rows, y_break) {
                let phys = self.state.real_row(r0);
                self.renderer
                    .clear_region(fb, &self.rsurf, phys, 0, n, cols, 0);
            }
        } else {
            self.state.blanked = false;
            if self.state.can_soft_blank {
                let _ = self.device.blank(false);
            }
            self.shadow_valid = false;
            self.redraw_view();
            self.restore_cursor();
        }
    }

    /// Page back into scrollback by `delta` rows (negative pages toward
    /// the live view). The view is regenerated from the store, shadow-
    /// diffed; any mutating operation snaps back to the live view.
    pub fn scrollback_scroll(&mut self, delta: i32) {
        let max = self.scrollback.len() as i64;
        let new = (self.sb_offset as i64 + delta as i64).clamp(0, max) as usize;
        if new == self.sb_offset {
            return;
        }
        self.hide_cursor();
        self.sb_offset = new;
        if !self.state.blanked {
            self.redraw_view();
        }
        self.restore_cursor();
    }

    /// Return to the live view.
    pub fn scrollback_reset(&mut self) {
        if self.sb_offset == 0 {
            return;
        }
        self.hide_cursor();
        self.sb_offset = 0;
        if !self.state.blanked {
            self.redraw_view();
        }
        self.restore_cursor();
    }

    // ── Scrolling internals ─────────────────────────────────────────

    fn scroll_up(&mut self, n: u32) {
        let rows = self.state.rows;
        let cols = self.state.cols;
        let width = cols as usize;
        let blank = self.rsurf.codec.erase_cell(self.attr);

        if n >= rows {
            // Everything scrolls out: archive the grid and clear.
            for r in 0..rows {
                let base = (r * cols) as usize;
                self.scrollback.push_row(&self.cells[base..base + width]);
            }
            self.cells.fill(blank);
            self.clear_render(0, 0, rows, cols);
            return;
        }

        for r in 0..n {
            let base = (r * cols) as usize;
            self.scrollback.push_row(&self.cells[base..base + width]);
        }
        let total = (rows * cols) as usize;
        self.cells.copy_within((n * cols) as usize..total, 0);
        self.cells[((rows - n) * cols) as usize..].fill(blank);

        match self.state.mode {
            ScrollMode::Wrap => {
                let ys = (self.state.yscroll + n) % self.state.vrows;
                if self.program_yscroll(ys) {
                    self.clear_render(rows - n, 0, n, cols);
                } else {
                    self.soft_scroll_up(n);
                }
            }
            ScrollMode::Pan => {
                let ys = self.state.yscroll;
                if ys + n + rows <= self.state.vrows {
                    if self.program_yscroll(ys + n) {
                        self.clear_render(rows - n, 0, n, cols);
                    } else {
                        self.soft_scroll_up(n);
                    }
                } else if self.program_yscroll(0) {
                    // Window hit the bottom of the plane: fold the
                    // surviving rows back to the top, then continue from
                    // offset zero.
                    if !self.state.blanked {
                        let fb = self.device.framebuffer();
                        self.renderer
                            .bitmap_move(fb, &self.rsurf, ys + n, 0, 0, 0, rows - n, cols);
                    }
                    for r in 0..rows - n {
                        self.sync_shadow_span(r, 0, width);
                    }
                    self.clear_render(rows - n, 0, n, cols);
                } else {
                    self.soft_scroll_up(n);
                }
            }
            ScrollMode::Move => self.soft_scroll_up(n),
            ScrollMode::Redraw => self.redraw_view(),
        }
    }

    fn scroll_down(&mut self, n: u32) {
        let rows = self.state.rows;
        let cols = self.state.cols;
        let width = cols as usize;
        let blank = self.rsurf.codec.erase_cell(self.attr);

        if n >= rows {
            self.cells.fill(blank);
            self.clear_render(0, 0, rows, cols);
            return;
        }

        self.cells
            .copy_within(0..((rows - n) * cols) as usize, (n * cols) as usize);
        self.cells[..(n * cols) as usize].fill(blank);

        match self.state.mode {
            ScrollMode::Wrap => {
                let vrows = self.state.vrows;
                let ys = (self.state.yscroll + vrows - n) % vrows;
                if self.program_yscroll(ys) {
                    self.clear_render(0, 0, n, cols);
                } else {
                    self.soft_scroll_down(n);
                }
            }
            ScrollMode::Pan => {
                let ys = self.state.yscroll;
                if ys >= n {
                    if self.program_yscroll(ys - n) {
                        self.clear_render(0, 0, n, cols);
                    } else {
                        self.soft_scroll_down(n);
                    }
                } else {
                    // Window hit the top of the plane: park it at the
                    // bottom and move the surviving rows under it.
                    let target = self.state.vrows - rows;
                    if self.program_yscroll(target) {
                        if !self.state.blanked {
                            let fb = self.device.framebuffer();
                            self.renderer.bitmap_move(
                                fb,
                                &self.rsurf,
                                ys,
                                0,
                                target + n,
                                0,
                                rows - n,
                                cols,
                            );
                        }
                        for r in n..rows {
                            self.sync_shadow_span(r, 0, width);
                        }
                        self.clear_render(0, 0, n, cols);
                    } else {
                        self.soft_scroll_down(n);
                    }
                }
            }
            ScrollMode::Move => self.soft_scroll_down(n),
            ScrollMode::Redraw => self.redraw_view(),
        }
    }

    /// Software scroll-up inside the current window (strategy fallback).
    fn soft_scroll_up(&mut self, n: u32) {
        if !self
            .renderer
            .caps()
            .contains(RenderCaps::RELIABLE_MOVE)
        {
            self.redraw_view();
            return;
        }
        let rows = self.state.rows;
        let cols = self.state.cols;
        let mut legs: SmallVec<[MoveSpan; 4]> = SmallVec::new();
        scroll::split_move(n, 0, rows - n, self.state.y_break(), &mut legs);
        if !self.state.blanked {
            let fb = self.device.framebuffer();
            for leg in &legs {
                let ps = self.state.real_row(leg.src);
                let pd = self.state.real_row(leg.dst);
                self.renderer
                    .bitmap_move(fb, &self.rsurf, ps, 0, pd, 0, leg.rows, cols);
            }
        }
        for r in 0..rows - n {
            self.sync_shadow_span(r, 0, cols as usize);
        }
        self.clear_render(rows - n, 0, n, cols);
    }

    /// Software scroll-down inside the current window (strategy fallback).
    fn soft_scroll_down(&mut self, n: u32) {
        if !self
            .renderer
            .caps()
            .contains(RenderCaps::RELIABLE_MOVE)
        {
            self.redraw_view();
            return;
        }
        let rows = self.state.rows;
        let cols = self.state.cols;
        let mut legs: SmallVec<[MoveSpan; 4]> = SmallVec::new();
        scroll::split_move(0, n, rows - n, self.state.y_break(), &mut legs);
        if !self.state.blanked {
            let fb = self.device.framebuffer();
            for leg in &legs {
                let ps = self.state.real_row(leg.src);
                let pd = self.state.real_row(leg.dst);
                self.renderer
                    .bitmap_move(fb, &self.rsurf, ps, 0, pd, 0, leg.rows, cols);
            }
        }
        for r in n..rows {
            self.sync_shadow_span(r, 0, cols as usize);
        }
        self.clear_render(0, 0, n, cols);
    }

    /// Program the device scan offset for a new row offset.
    ///
    /// On success the surface offset is committed. On failure the offset
    /// is left untouched and the caller degrades to a software scroll for
    /// this operation; the strategy itself is not downgraded, so the next
    /// scroll retries the hardware path.
    fn program_yscroll(&mut self, ys: u32) -> bool {
        let yoff = ys * self.rsurf.font.height();
        match self.device.set_scan_offset(0, yoff) {
            Ok(()) => {
                self.state.yscroll = ys;
                true
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    error = %_err,
                    yscroll = ys,
                    "scan-offset programming failed; software scroll for this operation"
                );
                false
            }
        }
    }

    // ── Rendering internals ─────────────────────────────────────────

    /// Render a cleared cell rectangle and sync its shadow. The store
    /// must already hold the cleared cells.
    fn clear_render(&mut self, row: u32, col: u32, rows: u32, cols: u32) {
        let bg = self.attr >> 4;
        if !self.state.blanked {
            let y_break = self.state.y_break();
            let fb = self.device.framebuffer();
            for (r0, n) in scroll::split_span(row, rows, y_break) {
                let phys = self.state.real_row(r0);
                self.renderer
                    .clear_region(fb, &self.rsurf, phys, col, n, cols, bg);
            }
        }
        for r in row..row + rows {
            self.sync_shadow_span(r, col, cols as usize);
        }
    }

    /// Copy a logical row span into the shadow at its physical position.
    fn sync_shadow_span(&mut self, logical_row: u32, col: u32, len: usize) {
        let phys = self.state.real_row(logical_row);
        let src = (logical_row * self.state.cols + col) as usize;
        let dst = (phys * self.state.cols + col) as usize;
        self.shadow[dst..dst + len].copy_from_slice(&self.cells[src..src + len]);
    }

    /// Move a rectangle within the logical store, overlap-safe.
    fn store_move(&mut self, sy: u32, sx: u32, dy: u32, dx: u32, rows: u32, cols: u32) {
        let width = self.state.cols as usize;
        let w = cols as usize;
        let idx = |r: u32, c: u32| r as usize * width + c as usize;
        if dy <= sy {
            for i in 0..rows {
                let s = idx(sy + i, sx);
                self.cells.copy_within(s..s + w, idx(dy + i, dx));
            }
        } else {
            for i in (0..rows).rev() {
                let s = idx(sy + i, sx);
                self.cells.copy_within(s..s + w, idx(dy + i, dx));
            }
        }
    }

    /// Regenerate the visible view from the store (and scrollback when
    /// paged back), skipping cells whose shadow already matches.
    fn redraw_view(&mut self) {
        let rows = self.state.rows;
        let cols = self.state.cols as usize;
        for l in 0..rows {
            self.compose_view_row(l);
            let phys = self.state.real_row(l);
            let base = phys as usize * cols;
            let mut x = 0usize;
            while x < cols {
                if self.shadow_valid && self.scratch[x] == self.shadow[base + x] {
                    x += 1;
                    continue;
                }
                let x0 = x;
                while x < cols && !(self.shadow_valid && self.scratch[x] == self.shadow[base + x])
                {
                    x += 1;
                }
                if !self.state.blanked {
                    let fb = self.device.framebuffer();
                    self.renderer
                        .draw_run(fb, &self.rsurf, phys, x0 as u32, &self.scratch[x0..x]);
                }
                self.shadow[base + x0..base + x].copy_from_slice(&self.scratch[x0..x]);
            }
        }
        self.shadow_valid = true;
    }

    /// Fill `scratch` with what logical row `l` should display: the
    /// newest `sb_offset` scrollback rows on top, live rows below.
    fn compose_view_row(&mut self, l: u32) {
        let cols = self.state.cols as usize;
        self.scratch.resize(cols, Cell::default());
        let paged = self.sb_offset;
        let li = l as usize;
        if li < paged {
            let blank = self.rsurf.codec.erase_cell(self.attr);
            match self.scrollback.line(paged - 1 - li) {
                Some(line) => {
                    let n = line.len().min(cols);
                    self.scratch[..n].copy_from_slice(&line[..n]);
                    self.scratch[n..].fill(blank);
                }
                None => self.scratch.fill(blank),
            }
        } else {
            let base = (li - paged) * cols;
            self.scratch.copy_from_slice(&self.cells[base..base + cols]);
        }
    }

    // ── Cursor internals ────────────────────────────────────────────

    /// Invert (or hardware-toggle) the cursor cell.
    fn flip_cursor(&mut self, op: CursorOp) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        if row >= self.state.rows || col >= self.state.cols || self.state.blanked {
            return;
        }
        let phys = self.state.real_row(row);
        let cell = self.shadow[(phys * self.state.cols + col) as usize];
        let fb = self.device.framebuffer();
        if !self.renderer.draw_cursor(fb, &self.rsurf, op, phys, col) {
            self.renderer.invert_glyph(fb, &self.rsurf, phys, col, cell);
        }
    }

    /// Take the cursor image off screen before mutating under it.
    fn hide_cursor(&mut self) {
        if self.cursor.drawn {
            self.flip_cursor(CursorOp::Erase);
            self.cursor.drawn = false;
        }
    }

    /// Put the cursor image back after a mutation, if it should show.
    fn restore_cursor(&mut self) {
        if self.cursor.visible
            && !self.cursor.drawn
            && !self.state.blanked
            && self.sb_offset == 0
        {
            self.flip_cursor(CursorOp::Draw);
            self.cursor.drawn = true;
            self.cursor.reset_blink();
        }
    }

    // ── Binding internals ───────────────────────────────────────────

    /// Rebuild grid-derived state after a font or geometry change,
    /// migrating (and if needed re-encoding) the overlapping content.
    fn rebind(&mut self, old_codec: AttrCodec) {
        let old_rows = self.state.rows;
        let old_cols = self.state.cols;
        let old_cells = std::mem::take(&mut self.cells);

        if self.renderer.setup(&self.rsurf).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(layout = %self.rsurf.layout, "installing no-op renderer");
            self.renderer = Box::new(DummyRenderer::new());
            let _ = self.renderer.setup(&self.rsurf);
            self.degraded = true;
        }
        self.state.recompute(
            &self.rsurf.font,
            self.renderer.caps().contains(RenderCaps::RELIABLE_MOVE),
            self.policy,
        );
        let _ = self.device.set_scan_offset(0, 0);
        self.alloc_stores();

        let new_codec = self.rsurf.codec;
        for r in 0..old_rows.min(self.state.rows) {
            for c in 0..old_cols.min(self.state.cols) {
                let cell = old_cells[(r * old_cols + c) as usize];
                self.cells[(r * self.state.cols + c) as usize] = old_codec.recode(cell, new_codec);
            }
        }

        self.cursor.row = self.cursor.row.min(self.state.rows.saturating_sub(1));
        self.cursor.col = self.cursor.col.min(self.state.cols.saturating_sub(1));
        self.scrollback.clear();
        self.sb_offset = 0;
        self.shadow_valid = false;
        if !self.state.blanked {
            self.redraw_view();
        }
    }

    /// Size the stores for the current grid and blank them.
    fn alloc_stores(&mut self) {
        let blank = self.rsurf.codec.erase_cell(self.attr);
        let visible = (self.state.rows * self.state.cols) as usize;
        let physical = (self.state.vrows * self.state.cols) as usize;
        self.cells.clear();
        self.cells.resize(visible, blank);
        self.shadow.clear();
        self.shadow.resize(physical, blank);
        self.shadow_valid = false;
        self.scratch.clear();
        self.scratch.resize(self.state.cols as usize, blank);
    }

    /// Mutating operations act on the live grid; snap back first.
    fn leave_scrollback(&mut self) {
        if self.sb_offset != 0 {
            self.scrollback_reset();
        }
    }
}

impl<D: DisplayDevice + Send> Drop for Console<D> {
    fn drop(&mut self) {
        self.fonts.detach(&self.rsurf.font);
    }
}

impl<D: DisplayDevice + Send> std::fmt::Debug for Console<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("rows", &self.state.rows)
            .field("cols", &self.state.cols)
            .field("mode", &self.state.mode)
            .field("yscroll", &self.state.yscroll)
            .field("font", &self.rsurf.font.name())
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}


/// Top-level `#[cfg(test)]` scope: the `proptest!` macro has edition-2024
/// compatibility issues when nested inside another test module.
#[cfg(test)]
mod console_proptests {
    use super::*;
    use pixcon_core::device::{DeviceGeometry, MemoryDevice, PixelLayout, ScrollCaps};
    use pixcon_render::packed::PackedRenderer;
    use proptest::prelude::*;

    fn wrap_console(yres: u32, yres_virtual: u32) -> Console<MemoryDevice> {
        let geometry = DeviceGeometry {
            xres: 64,
            yres,
            xres_virtual: 64,
            yres_virtual,
            stride: 64,
            layout: PixelLayout::Packed { bpp: 8 },
        };
        let device = MemoryDevice::new(
            geometry,
            ScrollCaps {
                pan_step: 0,
                wrap_step: 8,
            },
        );
        Console::new(
            device,
            Box::new(PackedRenderer::new()),
            Arc::new(FontRegistry::new()),
            ConsoleConfig::default(),
        )
        .unwrap()
    }

    proptest! {
        #[test]
        fn yscroll_invariant_holds_across_scroll_sequences(
            ops in proptest::collection::vec((proptest::bool::ANY, 0u32..40), 1..40),
        ) {
            let mut console = wrap_console(64, 128);
            let vrows = console.state.vrows;
            for (up, count) in ops {
                let dir = if up { ScrollDir::Up } else { ScrollDir::Down };
                console.scroll(dir, count);
                prop_assert!(console.yscroll() < vrows,
                    "yscroll {} out of range 0..{vrows}", console.yscroll());
            }
        }

        #[test]
        fn scrolled_content_matches_an_unassisted_surface(
            ops in proptest::collection::vec((proptest::bool::ANY, 0u32..12), 1..16),
        ) {
            // The wrap surface must show, row for row, what a plain
            // move-strategy surface shows after the same operations.
            let mut wrap = wrap_console(64, 128);
            let geometry = DeviceGeometry {
                xres: 64,
                yres: 64,
                xres_virtual: 64,
                yres_virtual: 64,
                stride: 64,
                layout: PixelLayout::Packed { bpp: 8 },
            };
            let mut plain = Console::new(
                MemoryDevice::new(geometry, ScrollCaps::NONE),
                Box::new(PackedRenderer::new()),
                Arc::new(FontRegistry::new()),
                ConsoleConfig::default(),
            )
            .unwrap();
            prop_assert_eq!(wrap.scroll_mode(), ScrollMode::Wrap);
            prop_assert_eq!(plain.scroll_mode(), ScrollMode::Move);

            for (i, (up, count)) in ops.into_iter().enumerate() {
                let code = 0x21 + (i as u16 % 0x5E);
                let row = (i as u32 * 3) % 8;
                wrap.put_run(row, 0, &[code; 8], 0x07);
                plain.put_run(row, 0, &[code; 8], 0x07);
                let dir = if up { ScrollDir::Up } else { ScrollDir::Down };
                wrap.scroll(dir, count);
                plain.scroll(dir, count);
            }

            // Compare the visible window pixel-for-pixel, resolving the
            // wrap surface's ring mapping.
            let ys = wrap.yscroll();
            let vrows = wrap.state.vrows;
            let wrap_mem = wrap.device().mem().to_vec();
            let plain_mem = plain.device().mem().to_vec();
            for l in 0..8u32 {
                let phys = (l + ys) % vrows;
                let w = &wrap_mem[(phys * 8 * 64) as usize..((phys + 1) * 8 * 64) as usize];
                let p = &plain_mem[(l * 8 * 64) as usize..((l + 1) * 8 * 64) as usize];
                prop_assert_eq!(w, p, "visible row {} differs", l);
            }
        }
    }
}
