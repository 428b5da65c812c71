#![forbid(unsafe_code)]

//! Cell encoding and the attribute codec.
//!
//! A [`Cell`] packs one character-grid position into a `u16`: a glyph index
//! into the active font plus foreground/background color fields. Two bit
//! layouts exist, selected by the active font's glyph count:
//!
//! ```text
//! 256-glyph fonts:  [bg:4][fg:4][glyph:8]    bits 15-12, 11-8, 7-0
//! 512-glyph fonts:  [bg:4][fg:3][glyph:9]    bits 15-12, 11-9, 8-0
//! ```
//!
//! With a 512-glyph font the foreground field gives up its intensity bit to
//! glyph bit 8, leaving 8 foreground colors instead of 16. The background
//! field is 4 bits in both layouts.
//!
//! [`AttrCodec`] describes which layout is active and provides field access
//! plus [`AttrCodec::recode`], the transform applied to every stored cell
//! when a font swap changes the glyph-count class.

/// One character-grid cell: glyph index + color attribute, packed in 16 bits.
///
/// The bit layout depends on the active [`AttrCodec`]; a raw `Cell` is
/// meaningless without one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Cell(u16);

impl Cell {
    /// Reconstruct from a raw `u16`.
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw `u16` value.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl core::fmt::Debug for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Cell({:#06x})", self.0)
    }
}

impl From<u8> for Cell {
    /// A byte becomes a glyph index with the default attribute (light gray
    /// on black) in the 256-glyph layout.
    #[inline]
    fn from(glyph: u8) -> Self {
        Self(0x0700 | glyph as u16)
    }
}

/// Describes the active cell bit layout.
///
/// Constructed from the bound font's glyph count; every component that
/// reads or writes cells goes through the codec so a font swap only has to
/// swap the codec (and [`recode`](Self::recode) the stored cells).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrCodec {
    hi_font: bool,
}

impl AttrCodec {
    /// Codec for a font with the given glyph count (256 or 512).
    #[inline]
    pub const fn for_glyph_count(count: u32) -> Self {
        Self {
            hi_font: count > 256,
        }
    }

    /// Whether the 512-glyph layout is active.
    #[inline]
    pub const fn hi_font(self) -> bool {
        self.hi_font
    }

    /// Mask covering the glyph-index bits.
    #[inline]
    pub const fn glyph_mask(self) -> u16 {
        if self.hi_font { 0x01FF } else { 0x00FF }
    }

    /// Number of representable foreground colors (8 or 16).
    #[inline]
    pub const fn fg_colors(self) -> u8 {
        if self.hi_font { 8 } else { 16 }
    }

    /// Encode a cell from its fields. Out-of-range fields are masked.
    #[inline]
    pub const fn encode(self, glyph: u16, fg: u8, bg: u8) -> Cell {
        let bg = ((bg & 0x0F) as u16) << 12;
        if self.hi_font {
            Cell(bg | (((fg & 0x07) as u16) << 9) | (glyph & 0x01FF))
        } else {
            Cell(bg | (((fg & 0x0F) as u16) << 8) | (glyph & 0x00FF))
        }
    }

    /// Encode a cell from a glyph index and a VGA-style attribute byte
    /// (`[bg:4][fg:4]`; the foreground intensity bit is dropped under the
    /// 512-glyph layout).
    #[inline]
    pub const fn with_attr(self, glyph: u16, attr: u8) -> Cell {
        self.encode(glyph, attr & 0x0F, attr >> 4)
    }

    /// Glyph index of a cell.
    #[inline]
    pub const fn glyph(self, cell: Cell) -> u16 {
        cell.0 & self.glyph_mask()
    }

    /// Foreground color index of a cell.
    #[inline]
    pub const fn fg(self, cell: Cell) -> u8 {
        if self.hi_font {
            ((cell.0 >> 9) & 0x07) as u8
        } else {
            ((cell.0 >> 8) & 0x0F) as u8
        }
    }

    /// Background color index of a cell.
    #[inline]
    pub const fn bg(self, cell: Cell) -> u8 {
        (cell.0 >> 12) as u8
    }

    /// The blank cell used for cleared regions: a space glyph carrying the
    /// given attribute byte.
    #[inline]
    pub const fn erase_cell(self, attr: u8) -> Cell {
        self.with_attr(b' ' as u16, attr)
    }

    /// Re-encode a cell stored under `self` into the layout of `to`.
    ///
    /// - 256→512: the foreground keeps its low 3 bits (bits 8-10 shift up
    ///   to 9-11); the intensity bit is dropped; glyph bit 8 starts at 0.
    /// - 512→256: the foreground shifts back down (bits 9-11 to 8-10) with
    ///   the intensity bit cleared; glyph indices ≥ 256 have no image in a
    ///   256-glyph font and are truncated to their low 8 bits.
    ///
    /// The background field is preserved exactly in both directions.
    #[inline]
    pub const fn recode(self, cell: Cell, to: AttrCodec) -> Cell {
        if self.hi_font == to.hi_font {
            return cell;
        }
        let raw = cell.0;
        if to.hi_font {
            Cell((raw & 0xF000) | ((raw & 0x0700) << 1) | (raw & 0x00FF))
        } else {
            Cell((raw & 0xF000) | ((raw & 0x0E00) >> 1) | (raw & 0x00FF))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LO: AttrCodec = AttrCodec::for_glyph_count(256);
    const HI: AttrCodec = AttrCodec::for_glyph_count(512);

    // --- Field round-trips ---

    #[test]
    fn encode_decode_256() {
        let cell = LO.encode(0xAB, 0x0C, 0x05);
        assert_eq!(LO.glyph(cell), 0xAB);
        assert_eq!(LO.fg(cell), 0x0C);
        assert_eq!(LO.bg(cell), 0x05);
    }

    #[test]
    fn encode_decode_512() {
        let cell = HI.encode(0x1AB, 0x05, 0x0F);
        assert_eq!(HI.glyph(cell), 0x1AB);
        assert_eq!(HI.fg(cell), 0x05);
        assert_eq!(HI.bg(cell), 0x0F);
    }

    #[test]
    fn encode_masks_out_of_range_fields() {
        let cell = LO.encode(0x3FF, 0xFF, 0xFF);
        assert_eq!(LO.glyph(cell), 0xFF);
        assert_eq!(LO.fg(cell), 0x0F);
        assert_eq!(LO.bg(cell), 0x0F);
    }

    #[test]
    fn attr_byte_split() {
        let cell = LO.with_attr(b'A' as u16, 0x4E);
        assert_eq!(LO.glyph(cell), b'A' as u16);
        assert_eq!(LO.fg(cell), 0x0E);
        assert_eq!(LO.bg(cell), 0x04);
    }

    #[test]
    fn hi_font_drops_intensity_bit() {
        let cell = HI.with_attr(0, 0x0F);
        assert_eq!(HI.fg(cell), 0x07);
    }

    // --- Recode ---

    #[test]
    fn recode_same_layout_is_identity() {
        let cell = LO.encode(0x42, 3, 1);
        assert_eq!(LO.recode(cell, LO), cell);
    }

    #[test]
    fn recode_lo_to_hi_shifts_fg() {
        let cell = LO.encode(0x42, 0x05, 0x09);
        let out = LO.recode(cell, HI);
        assert_eq!(HI.glyph(out), 0x42);
        assert_eq!(HI.fg(out), 0x05);
        assert_eq!(HI.bg(out), 0x09);
    }

    #[test]
    fn recode_hi_to_lo_truncates_glyph() {
        let cell = HI.encode(0x1C3, 0x06, 0x02);
        let out = HI.recode(cell, LO);
        assert_eq!(LO.glyph(out), 0xC3);
        assert_eq!(LO.fg(out), 0x06);
        assert_eq!(LO.bg(out), 0x02);
    }

    #[test]
    fn recode_lo_to_hi_drops_intensity() {
        let cell = LO.encode(0x10, 0x0D, 0x00);
        let out = LO.recode(cell, HI);
        // 0x0D & 0x07 == 0x05
        assert_eq!(HI.fg(out), 0x05);
    }

    #[test]
    fn byte_conversion_uses_default_attr() {
        let cell: Cell = b'x'.into();
        assert_eq!(LO.glyph(cell), b'x' as u16);
        assert_eq!(LO.fg(cell), 0x07);
        assert_eq!(LO.bg(cell), 0x00);
    }
}

/// Top-level `#[cfg(test)]` scope: the `proptest!` macro has edition-2024
/// compatibility issues when nested inside another test module.
#[cfg(test)]
mod cell_proptests {
    use super::{AttrCodec, Cell};
    use proptest::prelude::*;

    const LO: AttrCodec = AttrCodec::for_glyph_count(256);
    const HI: AttrCodec = AttrCodec::for_glyph_count(512);

    proptest! {
        #[test]
        fn encode_roundtrips_256(glyph in 0u16..256, fg in 0u8..16, bg in 0u8..16) {
            let cell = LO.encode(glyph, fg, bg);
            prop_assert_eq!(LO.glyph(cell), glyph);
            prop_assert_eq!(LO.fg(cell), fg);
            prop_assert_eq!(LO.bg(cell), bg);
        }

        #[test]
        fn encode_roundtrips_512(glyph in 0u16..512, fg in 0u8..8, bg in 0u8..16) {
            let cell = HI.encode(glyph, fg, bg);
            prop_assert_eq!(HI.glyph(cell), glyph);
            prop_assert_eq!(HI.fg(cell), fg);
            prop_assert_eq!(HI.bg(cell), bg);
        }

        #[test]
        fn recode_preserves_bg_both_ways(raw in any::<u16>()) {
            let cell = Cell::from_raw(raw);
            prop_assert_eq!(HI.bg(LO.recode(cell, HI)), LO.bg(cell));
            prop_assert_eq!(LO.bg(HI.recode(cell, LO)), HI.bg(cell));
        }

        #[test]
        fn recode_roundtrip_preserves_low_fg_and_glyph(glyph in 0u16..256, fg in 0u8..8, bg in 0u8..16) {
            // Cells whose fields are representable in both layouts survive
            // a there-and-back swap unchanged.
            let cell = LO.encode(glyph, fg, bg);
            let back = HI.recode(LO.recode(cell, HI), LO);
            prop_assert_eq!(back, cell);
        }
    }
}
