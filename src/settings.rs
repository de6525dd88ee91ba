//! User preferences for the scratch card
//!
//! Persisted separately from claim data in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::reward::RewardTable;
use crate::scratch::DEFAULT_REVEAL_THRESHOLD;

/// Lowest reveal threshold a saved setting can request
pub const MIN_REVEAL_THRESHOLD: f32 = 0.05;

/// Card preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Scratched share that reveals the reward
    pub reveal_threshold: f32,

    // === Audio ===
    /// Sound effects on/off
    pub sound: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,

    // === Effects ===
    /// Confetti on a winning reveal
    pub confetti: bool,
    /// Water-drop intro before the card
    pub intro: bool,

    // === Accessibility ===
    /// Reduced motion (skips intro and confetti)
    pub reduced_motion: bool,

    /// How long the claim confirmation stays up
    pub notice_duration_ms: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reveal_threshold: DEFAULT_REVEAL_THRESHOLD,

            // Audio
            sound: true,
            master_volume: 0.8,
            sfx_volume: 1.0,

            // Effects - all on by default
            confetti: true,
            intro: true,

            // Accessibility
            reduced_motion: false,

            notice_duration_ms: 6000.0,
        }
    }
}

impl Settings {
    /// Pull out-of-range values back into bounds
    pub fn sanitized(mut self) -> Self {
        self.reveal_threshold = if self.reveal_threshold.is_finite() {
            self.reveal_threshold.clamp(MIN_REVEAL_THRESHOLD, 1.0)
        } else {
            DEFAULT_REVEAL_THRESHOLD
        };
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = self.sfx_volume.clamp(0.0, 1.0);
        if !(self.notice_duration_ms.is_finite() && self.notice_duration_ms > 0.0) {
            self.notice_duration_ms = Self::default().notice_duration_ms;
        }
        self
    }

    /// Effective output volume (0 when sound is off)
    pub fn effective_volume(&self) -> f32 {
        if self.sound {
            self.master_volume * self.sfx_volume
        } else {
            0.0
        }
    }

    /// Effective confetti (respects reduced_motion)
    pub fn effective_confetti(&self) -> bool {
        self.confetti && !self.reduced_motion
    }

    /// Effective intro (respects reduced_motion)
    pub fn effective_intro(&self) -> bool {
        self.intro && !self.reduced_motion
    }

    /// Parse saved JSON, falling back to defaults on anything malformed
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Settings>(json) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                log::warn!("Ignoring saved settings: {e}");
                Self::default()
            }
        }
    }

    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "scratch_reveal_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                log::info!("Loaded settings from LocalStorage");
                return Self::from_json(&json);
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

/// Everything a [`Session`](crate::session::Session) needs to deal cards
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub reveal_threshold: f32,
    /// Coupon prefix; `None` uses the default
    pub code_prefix: Option<String>,
    pub table: RewardTable,
    pub confetti: bool,
    pub intro: bool,
    pub notice_duration_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            reveal_threshold: settings.reveal_threshold,
            code_prefix: None,
            table: RewardTable::standard(),
            confetti: settings.effective_confetti(),
            intro: settings.effective_intro(),
            notice_duration_ms: settings.notice_duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.reveal_threshold, 0.6);
        assert!((s.effective_volume() - 0.8).abs() < 1e-6);
        assert!(s.effective_confetti());
        assert!(s.effective_intro());
        assert_eq!(s.notice_duration_ms, 6000.0);
    }

    #[test]
    fn test_reduced_motion_suppresses_effects() {
        let s = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        assert!(!s.effective_confetti());
        assert!(!s.effective_intro());

        let config = SessionConfig::from(&s);
        assert!(!config.confetti);
        assert!(!config.intro);
    }

    #[test]
    fn test_sound_off_is_silent() {
        let s = Settings {
            sound: false,
            ..Settings::default()
        };
        assert_eq!(s.effective_volume(), 0.0);
    }

    #[test]
    fn test_threshold_clamped_on_load() {
        let s = Settings::from_json(r#"{"reveal_threshold": 0.0, "master_volume": 3.0}"#);
        assert_eq!(s.reveal_threshold, MIN_REVEAL_THRESHOLD);
        assert_eq!(s.master_volume, 1.0);
        // Missing fields keep their defaults
        assert!(s.sound);

        let s = Settings::from_json(r#"{"reveal_threshold": 7.5}"#);
        assert_eq!(s.reveal_threshold, 1.0);
    }

    #[test]
    fn test_malformed_json_uses_defaults() {
        assert_eq!(Settings::from_json("{not json"), Settings::default());
    }

    #[test]
    fn test_round_trip_through_json() {
        let s = Settings {
            confetti: false,
            notice_duration_ms: 3000.0,
            ..Settings::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(Settings::from_json(&json), s);
    }
}
