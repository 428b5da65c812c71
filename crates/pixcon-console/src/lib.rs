#![forbid(unsafe_code)]

//! Scroll engine, cursor controller, and terminal adapter.
//!
//! This crate is the control plane of the engine: [`console::Console`]
//! translates terminal operations (put, clear, move, scroll, font change,
//! console switch) into renderer and device calls, [`scroll`] selects and
//! executes the cheapest scroll strategy the device supports, [`cursor`]
//! runs the blink state machine, and [`registry`] owns the set of active
//! terminal-to-device bindings.

pub mod console;
pub mod cursor;
pub mod registry;
pub mod scroll;
pub mod scrollback;
pub mod surface;

pub use console::{Console, ConsoleConfig, FontRequest};
pub use registry::{BlinkTicker, ConsoleId, ConsoleRegistry};
pub use scroll::{ScrollDir, ScrollMode, ScrollPolicy, TieBreak};
