#![forbid(unsafe_code)]

//! Data model for the pixcon engine: cells, fonts, and the display-device
//! contract.

pub mod cell;
pub mod device;
pub mod font;

pub use cell::{AttrCodec, Cell};
pub use device::{
    DeviceError, DeviceGeometry, DisplayDevice, MemoryDevice, PixelLayout, ScrollCaps,
};
pub use font::{Font, FontError, FontRegistry};
