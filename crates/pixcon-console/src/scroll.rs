#![forbid(unsafe_code)]

//! Scroll strategy selection and the wrap-boundary split.
//!
//! # Strategies
//!
//! Scrolling one console row can cost anywhere from a single register
//! write to a full-screen redraw, depending on what the device offers:
//!
//! - **Wrap** — the scan offset advances modulo the virtual plane height;
//!   no pixels move, only the newly exposed rows are cleared. Valid when
//!   the hardware wrap step divides the glyph height and the glyph height
//!   divides the virtual resolution.
//! - **Pan** — like wrap, but the visible window must stay inside the
//!   plane; hitting an edge folds the content back with one bitmap move.
//!   Valid when the pan step divides the glyph height and the plane has
//!   at least one spare glyph row.
//! - **Move** — no hardware assist: bitmap-move the surviving rows and
//!   clear the exposed band.
//! - **Redraw** — regenerate visible cells from the store, skipping cells
//!   whose shadow copy already matches. Used when bitmap moves are
//!   unreliable for the surface.
//!
//! Selection is recomputed whenever the font or resolution changes and is
//! a pure function of the inputs, so the same device/font pair always
//! lands on the same strategy.
//!
//! # Wrap-boundary split
//!
//! Under the wrap strategy the virtual plane is a vertical ring: logical
//! row `l` lives at physical row `(l + yscroll) % vrows`. A move or clear
//! whose row range straddles the ring seam (`vrows - yscroll` in logical
//! coordinates) must be split so every renderer call stays on one side of
//! the seam. For moves the split recurses: after splitting the source
//! range, either half's destination can straddle the seam and needs a
//! second split. Halves are emitted in an order that never lets a copy
//! overwrite pixels another half still has to read.

use pixcon_core::device::ScrollCaps;
use smallvec::SmallVec;

/// Scroll strategy for one display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Advance the scan offset through the virtual ring buffer.
    Wrap,
    /// Shift the visible window inside the virtual plane.
    Pan,
    /// Bitmap-move the surviving rows.
    Move,
    /// Regenerate visible cells from the store, shadow-diffed.
    Redraw,
}

/// Scroll direction, from the terminal's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDir {
    /// Content moves up; new rows appear at the bottom.
    Up,
    /// Content moves down; new rows appear at the top.
    Down,
}

/// Tie-break when both wrap and pan are valid for a surface.
///
/// Which one wins on real hardware is quirk-driven, so it is policy
/// rather than a fixed rule. Wrap is the default: it never needs the
/// fold-back move pan performs at the plane edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    #[default]
    PreferWrap,
    PreferPan,
}

/// Configurable scroll-selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollPolicy {
    pub tie_break: TieBreak,
}

/// Pick the scroll strategy for a surface.
///
/// Pure in its inputs: the same `(caps, font_height, yres, yres_virtual,
/// reliable_move, policy)` tuple always yields the same strategy.
pub fn select_mode(
    caps: ScrollCaps,
    font_height: u32,
    yres: u32,
    yres_virtual: u32,
    reliable_move: bool,
    policy: ScrollPolicy,
) -> ScrollMode {
    if font_height == 0 {
        return if reliable_move {
            ScrollMode::Move
        } else {
            ScrollMode::Redraw
        };
    }
    // The ring must at least hold the visible screen.
    let good_wrap = caps.wrap_step > 0
        && font_height % caps.wrap_step == 0
        && yres_virtual % font_height == 0
        && yres_virtual >= yres;
    let good_pan = caps.pan_step > 0
        && font_height % caps.pan_step == 0
        && yres_virtual >= yres + font_height;

    match (good_wrap, good_pan) {
        (true, true) => match policy.tie_break {
            TieBreak::PreferWrap => ScrollMode::Wrap,
            TieBreak::PreferPan => ScrollMode::Pan,
        },
        (true, false) => ScrollMode::Wrap,
        (false, true) => ScrollMode::Pan,
        (false, false) if reliable_move => ScrollMode::Move,
        (false, false) => ScrollMode::Redraw,
    }
}

/// One seam-free leg of a split move, in logical rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MoveSpan {
    pub src: u32,
    pub dst: u32,
    pub rows: u32,
}

/// Split a row-range move at the ring seam, recursively.
///
/// Emits seam-free legs into `out` in execution order. When source and
/// destination overlap, the leg whose destination precedes its source is
/// emitted bottom-half-last (and vice versa) so no leg reads rows an
/// earlier leg already overwrote. Passing `u32::MAX` as `y_break`
/// disables splitting (non-ring surfaces).
pub(crate) fn split_move(
    src: u32,
    dst: u32,
    rows: u32,
    y_break: u32,
    out: &mut SmallVec<[MoveSpan; 4]>,
) {
    if rows == 0 {
        return;
    }
    if src < y_break && src + rows > y_break {
        let b = y_break - src;
        if dst < src {
            split_move(src, dst, b, y_break, out);
            split_move(src + b, dst + b, rows - b, y_break, out);
        } else {
            split_move(src + b, dst + b, rows - b, y_break, out);
            split_move(src, dst, b, y_break, out);
        }
        return;
    }
    if dst < y_break && dst + rows > y_break {
        let b = y_break - dst;
        if dst < src {
            split_move(src, dst, b, y_break, out);
            split_move(src + b, dst + b, rows - b, y_break, out);
        } else {
            split_move(src + b, dst + b, rows - b, y_break, out);
            split_move(src, dst, b, y_break, out);
        }
        return;
    }
    out.push(MoveSpan { src, dst, rows });
}

/// Split a row range at the ring seam (for clears; order is irrelevant).
pub(crate) fn split_span(row: u32, rows: u32, y_break: u32) -> SmallVec<[(u32, u32); 2]> {
    let mut out = SmallVec::new();
    if rows == 0 {
        return out;
    }
    if row < y_break && row + rows > y_break {
        out.push((row, y_break - row));
        out.push((y_break, rows - (y_break - row)));
    } else {
        out.push((row, rows));
    }
    out
}


/// Top-level `#[cfg(test)]` scope: the `proptest!` macro has edition-2024
/// compatibility issues when nested inside another test module.
#[cfg(test)]
mod scroll_proptests {
    use super::*;
    use proptest::prelude::*;

    /// Execute the split legs against a physical ring the way the engine
    /// does: each leg becomes one contiguous memmove at
    /// `(row + yscroll) % vrows`.
    fn apply_legs(ring: &mut [u16], cols: usize, yscroll: u32, legs: &[MoveSpan]) {
        let vrows = (ring.len() / cols) as u32;
        for leg in legs {
            let ps = ((leg.src + yscroll) % vrows) as usize;
            let pd = ((leg.dst + yscroll) % vrows) as usize;
            let rows = leg.rows as usize;
            let src = ps * cols..(ps + rows) * cols;
            ring.copy_within(src, pd * cols);
        }
    }

    proptest! {
        #[test]
        fn split_moves_match_flat_move(
            vrows in 4u32..24,
            yscroll_seed in 0u32..24,
            src_seed in 0u32..24,
            dst_seed in 0u32..24,
            rows_seed in 1u32..24,
        ) {
            let cols = 3usize;
            let yscroll = yscroll_seed % vrows;
            // Visible rows occupy the whole ring for maximum seam traffic.
            let visible = vrows;
            let src = src_seed % visible;
            let dst = dst_seed % visible;
            let rows = (rows_seed % visible).max(1).min(visible - src.max(dst));
            prop_assume!(rows > 0);

            // Physical ring tagged with unique values.
            let mut ring: Vec<u16> = (0..vrows as usize * cols).map(|i| i as u16).collect();

            // Expected: perform the move on the flattened logical view.
            let view = |ring: &[u16], l: u32| {
                let p = ((l + yscroll) % vrows) as usize;
                ring[p * cols..(p + 1) * cols].to_vec()
            };
            let mut flat: Vec<u16> = (0..visible).flat_map(|l| view(&ring, l)).collect();
            flat.copy_within(src as usize * cols..(src + rows) as usize * cols, dst as usize * cols);

            // Actual: split at the seam and execute per-leg ring moves.
            let mut legs = SmallVec::new();
            split_move(src, dst, rows, vrows - yscroll, &mut legs);
            apply_legs(&mut ring, cols, yscroll, &legs);

            let got: Vec<u16> = (0..visible).flat_map(|l| view(&ring, l)).collect();
            prop_assert_eq!(got, flat);
        }

        #[test]
        fn selection_is_deterministic(
            pan in 0u32..32,
            wrap in 0u32..32,
            fh in 1u32..33,
            yres in 1u32..2048,
            extra in 0u32..2048,
            reliable in proptest::bool::ANY,
        ) {
            let caps = ScrollCaps { pan_step: pan, wrap_step: wrap };
            let a = select_mode(caps, fh, yres, yres + extra, reliable, ScrollPolicy::default());
            let b = select_mode(caps, fh, yres, yres + extra, reliable, ScrollPolicy::default());
            prop_assert_eq!(a, b);
        }
    }
}
