#![forbid(unsafe_code)]

//! Bitmap fonts and the shared font registry.
//!
//! A [`Font`] is an ordered sequence of fixed-size glyph bitmaps: `width`
//! pixels per row, MSB-first, `ceil(width / 8)` bytes per row, `height`
//! rows per glyph, 256 or 512 glyphs total.
//!
//! The [`FontRegistry`] owns every font in the process and tracks an
//! explicit reference count per entry. Consoles that share a display
//! device share the same `Font` instance; the count goes up on attach,
//! down on detach or replacement, and the entry is dropped when it reaches
//! zero. The registry's interior lock makes attach/detach atomic across
//! independently-owned consoles.
//!
//! # Built-in fonts
//!
//! Two fonts ship with the engine so it is usable with no font file:
//! `builtin8x8` and `builtin8x16`. Their glyph images are rasterized
//! procedurally (a bordered box with a deterministic per-glyph bit
//! pattern, blank for whitespace); legible enough to tell glyphs apart,
//! and stable across runs so rendered output is reproducible in tests.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Errors from font lookup, validation, and binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontError {
    /// A font was requested by name and no match exists.
    NotFound(String),
    /// The active renderer cannot draw glyphs of this pixel width.
    UnsupportedGlyphWidth(u32),
    /// Allocation for the font bitmap failed; the previous font stays
    /// bound.
    OutOfMemory,
    /// The supplied font data is malformed (bad dimensions or byte count).
    InvalidData(&'static str),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "font not found: {name}"),
            Self::UnsupportedGlyphWidth(w) => {
                write!(f, "renderer does not support glyph width {w}")
            }
            Self::OutOfMemory => write!(f, "font allocation failed"),
            Self::InvalidData(why) => write!(f, "invalid font data: {why}"),
        }
    }
}

impl std::error::Error for FontError {}

/// A fixed-cell bitmap font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    name: String,
    width: u32,
    height: u32,
    glyph_count: u32,
    data: Vec<u8>,
    user_supplied: bool,
}

impl Font {
    /// Maximum supported glyph width in pixels.
    pub const MAX_WIDTH: u32 = 32;

    /// Maximum supported glyph height in pixels.
    pub const MAX_HEIGHT: u32 = 64;

    /// Build a font from caller-supplied bitmap data.
    ///
    /// `data` must hold `glyph_count * height * ceil(width / 8)` bytes,
    /// glyph-major, row-major within a glyph, MSB-first within a byte.
    /// The bytes are copied; a failed allocation reports
    /// [`FontError::OutOfMemory`] without any state change.
    pub fn from_data(
        name: &str,
        width: u32,
        height: u32,
        glyph_count: u32,
        data: &[u8],
    ) -> Result<Self, FontError> {
        if width == 0 || width > Self::MAX_WIDTH {
            return Err(FontError::InvalidData("glyph width out of range"));
        }
        if height == 0 || height > Self::MAX_HEIGHT {
            return Err(FontError::InvalidData("glyph height out of range"));
        }
        if glyph_count != 256 && glyph_count != 512 {
            return Err(FontError::InvalidData("glyph count must be 256 or 512"));
        }
        let row_bytes = width.div_ceil(8) as usize;
        let expected = glyph_count as usize * height as usize * row_bytes;
        if data.len() != expected {
            return Err(FontError::InvalidData("bitmap byte count mismatch"));
        }

        let mut copy = Vec::new();
        copy.try_reserve_exact(data.len())
            .map_err(|_| FontError::OutOfMemory)?;
        copy.extend_from_slice(data);

        Ok(Self {
            name: name.to_owned(),
            width,
            height,
            glyph_count,
            data: copy,
            user_supplied: true,
        })
    }

    /// Generate a built-in font of the given cell size (8×8 or 8×16).
    ///
    /// # Panics
    ///
    /// Panics if the size is not one of the built-in sizes; callers go
    /// through [`FontRegistry::acquire`], which only passes known sizes.
    pub(crate) fn builtin(width: u32, height: u32) -> Self {
        assert!(width == 8 && (height == 8 || height == 16));
        let mut data = Vec::with_capacity(256 * height as usize);
        for code in 0u32..256 {
            rasterize_builtin_glyph(code, width, height, &mut data);
        }
        Self {
            name: format!("builtin{width}x{height}"),
            width,
            height,
            glyph_count: 256,
            data,
            user_supplied: false,
        }
    }

    /// Font name as known to the registry.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Glyph width in pixels.
    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Glyph height in pixels.
    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of glyphs (256 or 512).
    #[inline]
    pub const fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    /// Whether this font was supplied by the user (vs built-in).
    #[inline]
    pub const fn is_user_supplied(&self) -> bool {
        self.user_supplied
    }

    /// Bytes per bitmap row: `ceil(width / 8)`.
    #[inline]
    pub const fn row_bytes(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// Bitmap of one glyph: `height * row_bytes()` bytes.
    ///
    /// The index is masked to the glyph count, so any encodable glyph
    /// index yields a valid slice.
    #[inline]
    pub fn glyph(&self, index: u16) -> &[u8] {
        let idx = (index as usize) & (self.glyph_count as usize - 1);
        let len = self.height as usize * self.row_bytes();
        &self.data[idx * len..(idx + 1) * len]
    }
}

/// Deterministic placeholder rasterization for built-in glyphs: blank for
/// control characters and spaces, otherwise a border plus a per-glyph hash
/// pattern. Width is fixed at 8, one byte per row.
fn rasterize_builtin_glyph(code: u32, width: u32, height: u32, out: &mut Vec<u8>) {
    if code < 0x21 || code == 0x7F || code == 0xA0 {
        out.extend(std::iter::repeat_n(0u8, height as usize));
        return;
    }
    let seed = code.wrapping_mul(0x9E37_79B9) ^ (width << 16) ^ height;
    for y in 0..height {
        let mut row = 0u8;
        for x in 0..width {
            let border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            let bit_index = (x + y * 7) & 31;
            let hash_bit = ((seed >> bit_index) & 1) == 1;
            let stripe = ((x * 3 + y + seed) % 11) == 0;
            if border || (hash_bit && stripe) {
                row |= 0x80 >> x;
            }
        }
        out.push(row);
    }
}

struct FontSlot {
    font: Arc<Font>,
    refs: usize,
}

/// Process-wide font store with explicit per-entry reference counts.
pub struct FontRegistry {
    slots: Mutex<Vec<FontSlot>>,
}

impl FontRegistry {
    /// Create an empty registry. Built-in fonts are materialized lazily on
    /// first acquire.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Resolve a font by name, or pick a resolution-appropriate default.
    ///
    /// With a name: registered fonts are matched first, then the built-in
    /// names (`builtin8x8`, `builtin8x16`); anything else is
    /// [`FontError::NotFound`]. Without a name: `builtin8x16` for
    /// `yres >= 400`, `builtin8x8` below.
    ///
    /// Acquiring does not count as a use; call [`attach`](Self::attach)
    /// when binding the font to a console.
    pub fn acquire(
        &self,
        name: Option<&str>,
        _xres: u32,
        yres: u32,
    ) -> Result<Arc<Font>, FontError> {
        let name = match name {
            Some(name) => name.to_owned(),
            None if yres >= 400 => "builtin8x16".to_owned(),
            None => "builtin8x8".to_owned(),
        };

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.iter().find(|s| s.font.name() == name) {
            return Ok(slot.font.clone());
        }
        let font = match name.as_str() {
            "builtin8x8" => Font::builtin(8, 8),
            "builtin8x16" => Font::builtin(8, 16),
            _ => return Err(FontError::NotFound(name)),
        };
        let font = Arc::new(font);
        slots.push(FontSlot {
            font: font.clone(),
            refs: 0,
        });
        Ok(font)
    }

    /// Register a user-supplied font and return its shared handle.
    ///
    /// A same-named existing entry is left alone; the new font shadows it
    /// for subsequent [`acquire`](Self::acquire) calls only if the old one
    /// is later dropped, so callers that replace a font by name should
    /// pass the returned handle onward rather than re-acquiring.
    pub fn insert(&self, font: Font) -> Arc<Font> {
        let font = Arc::new(font);
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.push(FontSlot {
            font: font.clone(),
            refs: 0,
        });
        font
    }

    /// Record one more console using `font`.
    pub fn attach(&self, font: &Arc<Font>) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.iter_mut().find(|s| Arc::ptr_eq(&s.font, font)) {
            slot.refs += 1;
        } else {
            // Handle re-attach of a font that was freed in between.
            slots.push(FontSlot {
                font: font.clone(),
                refs: 1,
            });
        }
    }

    /// Record one fewer console using `font`.
    ///
    /// Returns `true` if this was the last use and the entry was freed.
    pub fn detach(&self, font: &Arc<Font>) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pos) = slots.iter().position(|s| Arc::ptr_eq(&s.font, font)) {
            let slot = &mut slots[pos];
            slot.refs = slot.refs.saturating_sub(1);
            if slot.refs == 0 {
                slots.remove(pos);
                return true;
            }
        }
        false
    }

    /// Current reference count of `font` (0 if not registered).
    pub fn refcount(&self, font: &Arc<Font>) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .iter()
            .find(|s| Arc::ptr_eq(&s.font, font))
            .map_or(0, |s| s.refs)
    }

    /// Whether `font` still has a registry entry.
    pub fn contains(&self, font: &Arc<Font>) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.iter().any(|s| Arc::ptr_eq(&s.font, font))
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = f.debug_map();
        for slot in slots.iter() {
            map.entry(&slot.font.name(), &slot.refs);
        }
        map.finish()
    }
}
