//! Decorative frame-driven animations
//!
//! Both effects are [`FrameTask`](crate::tasks::FrameTask)s drawing on the
//! full-window overlay canvas. Neither affects the outcome of a card.

pub mod confetti;
pub mod intro;

pub use confetti::{CONFETTI_COUNT, CONFETTI_DURATION_MS, ConfettiBurst, Particle, ParticleShape};
pub use intro::{INTRO_DURATION_MS, IntroAnimation};
