#![forbid(unsafe_code)]

//! Renderer capability contract and pixel backends.
//!
//! A renderer turns cell operations into pixel writes for one memory
//! layout. [`renderer::CellRenderer`] is the contract; [`packed`] is the
//! reference backend for linear chunky surfaces; [`dummy`] is the no-op
//! backend installed when nothing else matches, so rendering degrades
//! gracefully instead of failing; [`recording`] logs operations for
//! deterministic validation.

pub mod dummy;
pub mod packed;
pub mod recording;
pub mod renderer;
pub mod surface;

pub use dummy::DummyRenderer;
pub use packed::PackedRenderer;
pub use renderer::{CellRenderer, CursorOp, GlyphWidths, RenderCaps, RenderError};
pub use surface::{Palette, RenderSurface, Rgb};
