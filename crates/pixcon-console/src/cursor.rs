#![forbid(unsafe_code)]

//! Cursor blink state machine.
//!
//! The cursor is in one of three states:
//!
//! - **hidden** — `visible == false`, nothing on screen;
//! - **visible-drawn** — `visible && drawn`, inverted cell on screen;
//! - **visible-erased** — `visible && !drawn`, between blink phases.
//!
//! [`CursorState`] only tracks state and blink timing; the console owns
//! the actual glyph inversion (or hardware-cursor call) and runs both the
//! terminal-driven transitions and the periodic tick under one lock, so a
//! tick can never interleave with a half-finished move or erase.

/// Cursor position, visibility, and blink countdown.
#[derive(Debug, Clone, Copy)]
pub struct CursorState {
    /// Logical row of the cursor.
    pub row: u32,
    /// Column of the cursor.
    pub col: u32,
    /// Whether the terminal wants a cursor shown at all.
    pub visible: bool,
    /// Whether the cursor image is currently on screen.
    pub(crate) drawn: bool,
    countdown: u32,
    blink_ticks: u32,
}

impl CursorState {
    /// New hidden cursor at the origin.
    ///
    /// `blink_ticks` is the number of periodic ticks per blink phase;
    /// `0` disables blinking (the cursor stays solid while visible).
    pub fn new(blink_ticks: u32) -> Self {
        Self {
            row: 0,
            col: 0,
            visible: false,
            drawn: false,
            countdown: blink_ticks,
            blink_ticks,
        }
    }

    /// Whether the cursor image is currently on screen.
    #[inline]
    pub const fn is_drawn(&self) -> bool {
        self.drawn
    }

    /// Restart the blink phase (called after any draw so the cursor is
    /// solid right after it moves).
    #[inline]
    pub(crate) fn reset_blink(&mut self) {
        self.countdown = self.blink_ticks;
    }

    /// Advance the blink countdown by one tick.
    ///
    /// Returns `true` when the drawn/erased phase should toggle now.
    /// Only meaningful while the cursor is visible.
    pub(crate) fn tick(&mut self) -> bool {
        if self.blink_ticks == 0 {
            return false;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.blink_ticks;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_hidden() {
        let c = CursorState::new(3);
        assert!(!c.visible);
        assert!(!c.is_drawn());
    }

    #[test]
    fn tick_fires_every_blink_ticks() {
        let mut c = CursorState::new(3);
        assert!(!c.tick());
        assert!(!c.tick());
        assert!(c.tick());
        // Countdown reloads after firing.
        assert!(!c.tick());
        assert!(!c.tick());
        assert!(c.tick());
    }

    #[test]
    fn reset_blink_restarts_phase() {
        let mut c = CursorState::new(2);
        assert!(!c.tick());
        c.reset_blink();
        assert!(!c.tick());
        assert!(c.tick());
    }

    #[test]
    fn zero_ticks_never_toggles() {
        let mut c = CursorState::new(0);
        for _ in 0..10 {
            assert!(!c.tick());
        }
    }
}
