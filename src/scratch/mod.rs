//! Scratch-off overlay
//!
//! The overlay lives in a software [`Pixmap`] so erasure and the progress
//! scan behave the same in the browser and in tests. The shell blits the
//! pixels onto the card's canvas each frame.

pub mod pixmap;
pub mod surface;

pub use pixmap::Pixmap;
pub use surface::{
    DEFAULT_REVEAL_THRESHOLD, ERASE_RADIUS, ERASED_ALPHA_CUTOFF, Gesture, RevealLatch, ScratchCue,
    ScratchEvent, ScratchState, ScratchSurface,
};
