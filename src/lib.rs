//! Scratch Reveal - a promotional scratch card
//!
//! Core modules:
//! - `reward`: Weighted reward draw and coupon codes
//! - `scratch`: The foil overlay, erasure and reveal progress
//! - `effects`: Confetti and the intro splash
//! - `audio`: Procedural sound effects
//! - `session`: Card lifecycle tying everything together
//! - `claims`: Claim form validation and the claim service
//! - `settings`: User preferences

pub mod audio;
pub mod claims;
pub mod effects;
pub mod notice;
pub mod render;
pub mod reward;
pub mod scratch;
pub mod session;
pub mod settings;
pub mod tasks;

pub use claims::{ClaimForm, ClaimService, LocalClaimStore};
pub use reward::{CouponCode, RewardDistributor, RewardResult, RewardTable};
pub use session::{Phase, Session, SessionEvent};
pub use settings::{SessionConfig, Settings};

use glam::Vec2;

/// Card configuration constants
pub mod consts {
    /// Reference frame length; effect physics is tuned per 60 fps frame
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Overlay backing resolution
    pub const CARD_WIDTH: u32 = 320;
    pub const CARD_HEIGHT: u32 = 320;
}

/// Pointer position relative to an element's top-left corner
#[inline]
pub fn local_point(client: Vec2, element_origin: Vec2) -> Vec2 {
    client - element_origin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_point() {
        let p = local_point(Vec2::new(130.0, 75.0), Vec2::new(100.0, 50.0));
        assert_eq!(p, Vec2::new(30.0, 25.0));
    }
}
