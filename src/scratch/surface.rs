//! Scratch surface: overlay painting, gesture handling and reveal detection

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::pixmap::Pixmap;
use crate::render::Rgba;
use crate::tasks::FrameRequest;

/// Radius of every erase stroke, in surface pixels
pub const ERASE_RADIUS: f32 = 28.0;

/// Pixels with alpha below this count as scratched off
pub const ERASED_ALPHA_CUTOFF: u8 = 128;

/// Default share of the surface that must be scratched before the reveal
pub const DEFAULT_REVEAL_THRESHOLD: f32 = 0.6;

const SPECKLE_COUNT: usize = 800;
const SPECKLE_MAX_RADIUS: f32 = 1.5;
const SPECKLE_MAX_ALPHA: f32 = 0.15;
const LABEL: &str = "✦ SCRATCH HERE ✦";

/// Silver foil gradient
const FOIL_STOPS: [(f32, Rgba); 4] = [
    (0.0, Rgba::hex(0xb0bec5)),
    (0.3, Rgba::hex(0xcfd8dc)),
    (0.6, Rgba::hex(0x90a4ae)),
    (1.0, Rgba::hex(0xb0bec5)),
];

/// Pointer gesture state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Idle,
    /// Pointer is down, no movement yet
    Pressed,
    Dragging,
}

/// One-way latch for the reveal notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealLatch {
    Armed,
    Fired,
}

/// One-way latch for the first-scratch sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchCue {
    Pending,
    Played,
}

/// Side effects the owner must act on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScratchEvent {
    /// Play the scratch noise
    ScratchSound,
    /// Progress crossed the threshold for the first time
    Revealed { progress: f32 },
}

/// Snapshot of the surface's progress flags
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScratchState {
    pub progress: f32,
    pub revealed: bool,
    pub played_scratch_cue: bool,
}

/// The foil layer the user scratches off
#[derive(Debug)]
pub struct ScratchSurface {
    pixmap: Pixmap,
    /// On-screen size pointer coordinates are measured in
    display_size: Vec2,
    reveal_threshold: f32,
    texture_seed: u64,
    gesture: Gesture,
    latch: RevealLatch,
    cue: ScratchCue,
    progress: f32,
    erased_any: bool,
    progress_frame: FrameRequest,
}

impl ScratchSurface {
    pub fn new(width: u32, height: u32, reveal_threshold: f32, texture_seed: u64) -> Self {
        let mut surface = Self {
            pixmap: Pixmap::new(0, 0),
            display_size: Vec2::new(width as f32, height as f32),
            reveal_threshold: reveal_threshold.clamp(0.0, 1.0),
            texture_seed,
            gesture: Gesture::Idle,
            latch: RevealLatch::Armed,
            cue: ScratchCue::Pending,
            progress: 0.0,
            erased_any: false,
            progress_frame: FrameRequest::default(),
        };
        surface.initialize(width, height);
        surface
    }

    /// Paint a fresh overlay at the given resolution
    ///
    /// Same size and seed always yield the same pixels. Progress restarts
    /// from zero; a reveal that already fired stays fired.
    pub fn initialize(&mut self, width: u32, height: u32) {
        let mut pixmap = Pixmap::new(width, height);
        pixmap.fill_diagonal_gradient(&FOIL_STOPS);

        let mut rng = Pcg32::seed_from_u64(self.texture_seed);
        let (w, h) = (width as f32, height as f32);
        for _ in 0..SPECKLE_COUNT {
            let center = Vec2::new(rng.random::<f32>() * w, rng.random::<f32>() * h);
            let radius = rng.random::<f32>() * SPECKLE_MAX_RADIUS;
            let base = if rng.random_bool(0.5) {
                Rgba::WHITE
            } else {
                Rgba::BLACK
            };
            let color = base.with_opacity(rng.random::<f32>() * SPECKLE_MAX_ALPHA);
            pixmap.fill_disc(center, radius, color);
        }

        let label_color = Rgba::WHITE.with_opacity(0.7);
        let center = Vec2::new(w / 2.0, h / 2.0);
        if !pixmap.draw_text(LABEL, center, 2, label_color) {
            pixmap.draw_text(LABEL, center, 1, label_color);
        }

        self.pixmap = pixmap;
        self.progress = 0.0;
        self.erased_any = false;
        self.gesture = Gesture::Idle;
        self.progress_frame.cancel();
    }

    /// Track the element's on-screen size (CSS pixels)
    pub fn set_display_size(&mut self, width: f32, height: f32) {
        self.display_size = Vec2::new(width, height);
    }

    /// Map an on-screen position to surface pixels
    pub fn to_surface(&self, pos: Vec2) -> Vec2 {
        let internal = Vec2::new(self.pixmap.width() as f32, self.pixmap.height() as f32);
        if self.display_size.x <= 0.0 || self.display_size.y <= 0.0 {
            return pos;
        }
        pos * (internal / self.display_size)
    }

    /// Destination-out disc at a surface position
    pub fn erase(&mut self, at: Vec2, radius: f32) {
        self.pixmap.erase_disc(at, radius);
        self.erased_any = true;
    }

    pub fn pointer_down(&mut self, pos: Vec2) {
        self.gesture = Gesture::Pressed;
        let at = self.to_surface(pos);
        self.erase(at, ERASE_RADIUS);
    }

    /// Returns the scratch sound on the surface's first drag
    pub fn pointer_move(&mut self, pos: Vec2) -> Option<ScratchEvent> {
        if self.gesture == Gesture::Idle {
            return None;
        }
        self.gesture = Gesture::Dragging;
        let at = self.to_surface(pos);
        self.erase(at, ERASE_RADIUS);
        self.progress_frame.request();

        match self.cue {
            ScratchCue::Pending => {
                self.cue = ScratchCue::Played;
                Some(ScratchEvent::ScratchSound)
            }
            ScratchCue::Played => None,
        }
    }

    /// Ends the gesture; returns a sound cue once anything was scratched
    pub fn pointer_up(&mut self) -> Option<ScratchEvent> {
        self.gesture = Gesture::Idle;
        self.erased_any.then_some(ScratchEvent::ScratchSound)
    }

    /// Frame callback: run the pending progress scan, if any
    pub fn on_frame(&mut self) -> Option<ScratchEvent> {
        if !self.progress_frame.take() {
            return None;
        }
        self.update_progress()
    }

    /// Recompute progress now and check the threshold
    pub fn update_progress(&mut self) -> Option<ScratchEvent> {
        let measured = self.compute_progress();
        self.progress = self.progress.max(measured);

        if self.latch == RevealLatch::Armed && self.progress >= self.reveal_threshold {
            self.latch = RevealLatch::Fired;
            return Some(ScratchEvent::Revealed {
                progress: self.progress,
            });
        }
        None
    }

    /// Share of pixels scratched below the alpha cutoff; O(width * height)
    pub fn compute_progress(&self) -> f32 {
        let total = self.pixmap.pixel_count();
        if total == 0 {
            return 0.0;
        }
        self.pixmap.count_alpha_below(ERASED_ALPHA_CUTOFF) as f32 / total as f32
    }

    /// Drop the pending frame work and any gesture in progress
    pub fn teardown(&mut self) {
        self.progress_frame.cancel();
        self.gesture = Gesture::Idle;
    }

    pub fn state(&self) -> ScratchState {
        ScratchState {
            progress: self.progress,
            revealed: self.latch == RevealLatch::Fired,
            played_scratch_cue: self.cue == ScratchCue::Played,
        }
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_revealed(&self) -> bool {
        self.latch == RevealLatch::Fired
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn reveal_threshold(&self) -> f32 {
        self.reveal_threshold
    }

    pub fn has_pending_frame(&self) -> bool {
        self.progress_frame.is_pending()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SIZE: u32 = 320;

    fn surface() -> ScratchSurface {
        ScratchSurface::new(SIZE, SIZE, DEFAULT_REVEAL_THRESHOLD, 42)
    }

    /// Drag across every row from `top` to `bottom`, one frame per row
    fn sweep(s: &mut ScratchSurface, top: f32, bottom: f32) -> Vec<ScratchEvent> {
        let mut events = Vec::new();
        let mut y = top;
        s.pointer_down(Vec2::new(0.0, y));
        while y <= bottom {
            let mut x = 0.0;
            while x <= SIZE as f32 {
                events.extend(s.pointer_move(Vec2::new(x, y)));
                x += 20.0;
            }
            events.extend(s.on_frame());
            y += 20.0;
        }
        events.extend(s.pointer_up());
        events
    }

    fn reveals(events: &[ScratchEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ScratchEvent::Revealed { .. }))
            .count()
    }

    #[test]
    fn test_fresh_surface_is_fully_covered() {
        let s = surface();
        assert_eq!(s.compute_progress(), 0.0);
        assert_eq!(s.pixmap().count_alpha_below(255), 0);
        assert!(!s.is_revealed());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut s = surface();
        let first = s.pixmap().clone();
        s.initialize(SIZE, SIZE);
        assert_eq!(s.pixmap(), &first);

        s.initialize(200, 100);
        assert_eq!(s.pixmap().width(), 200);
        assert_eq!(s.pixmap().height(), 100);
        assert_eq!(s.compute_progress(), 0.0);
    }

    #[test]
    fn test_coordinates_scale_from_display_size() {
        let mut s = surface();
        s.set_display_size(160.0, 160.0);
        assert_eq!(s.to_surface(Vec2::new(80.0, 40.0)), Vec2::new(160.0, 80.0));

        s.pointer_down(Vec2::new(80.0, 80.0));
        assert_eq!(s.pixmap().pixel(160, 160).unwrap().a, 0);
        assert_eq!(s.pixmap().pixel(80, 80).unwrap().a, 255);
    }

    #[test]
    fn test_move_without_press_does_nothing() {
        let mut s = surface();
        assert_eq!(s.pointer_move(Vec2::new(100.0, 100.0)), None);
        assert_eq!(s.compute_progress(), 0.0);
        assert!(!s.has_pending_frame());
        assert_eq!(s.pointer_up(), None);
    }

    #[test]
    fn test_scratch_sound_once_then_on_lift() {
        let mut s = surface();
        s.pointer_down(Vec2::new(10.0, 10.0));
        assert_eq!(s.gesture(), Gesture::Pressed);
        assert_eq!(
            s.pointer_move(Vec2::new(20.0, 10.0)),
            Some(ScratchEvent::ScratchSound)
        );
        assert_eq!(s.gesture(), Gesture::Dragging);
        assert_eq!(s.pointer_move(Vec2::new(30.0, 10.0)), None);
        assert_eq!(s.pointer_up(), Some(ScratchEvent::ScratchSound));

        // Second gesture: no first-move cue, still a lift cue
        s.pointer_down(Vec2::new(100.0, 100.0));
        assert_eq!(s.pointer_move(Vec2::new(110.0, 100.0)), None);
        assert_eq!(s.pointer_up(), Some(ScratchEvent::ScratchSound));
        assert!(s.state().played_scratch_cue);
    }

    #[test]
    fn test_progress_scan_coalesced_per_frame() {
        let mut s = surface();
        s.pointer_down(Vec2::new(50.0, 50.0));
        for x in 0..10 {
            s.pointer_move(Vec2::new(50.0 + x as f32 * 5.0, 50.0));
        }
        assert!(s.has_pending_frame());
        assert_eq!(s.progress(), 0.0);

        assert_eq!(s.on_frame(), None);
        let after = s.progress();
        assert!(after > 0.0);
        // Nothing pending: a second frame does no scan
        assert!(!s.has_pending_frame());
        assert_eq!(s.on_frame(), None);
        assert_eq!(s.progress(), after);
    }

    #[test]
    fn test_reveal_fires_once_at_threshold() {
        let mut s = surface();
        // Roughly 70% of the rows
        let events = sweep(&mut s, 0.0, 220.0);
        assert_eq!(reveals(&events), 1);
        assert!(s.progress() >= DEFAULT_REVEAL_THRESHOLD);

        // Scratching the rest never fires again
        let events = sweep(&mut s, 200.0, SIZE as f32);
        assert_eq!(reveals(&events), 0);
        assert!(s.is_revealed());
    }

    #[test]
    fn test_zero_and_full_erasure() {
        let mut s = surface();
        assert_eq!(s.update_progress(), None);
        assert_eq!(s.progress(), 0.0);

        let events = sweep(&mut s, 0.0, SIZE as f32);
        assert_eq!(s.progress(), 1.0);
        assert_eq!(reveals(&events), 1);
        assert_eq!(s.update_progress(), None);
    }

    #[test]
    fn test_teardown_drops_pending_scan() {
        let mut s = surface();
        s.pointer_down(Vec2::new(50.0, 50.0));
        s.pointer_move(Vec2::new(60.0, 50.0));
        s.teardown();
        assert_eq!(s.gesture(), Gesture::Idle);
        assert_eq!(s.on_frame(), None);
        assert_eq!(s.progress(), 0.0);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let mut s = ScratchSurface::new(100, 100, 0.05, 1);
        s.pointer_down(Vec2::new(50.0, 50.0));
        s.pointer_move(Vec2::new(50.0, 50.0));
        assert!(matches!(s.on_frame(), Some(ScratchEvent::Revealed { .. })));
    }

    proptest! {
        #[test]
        fn prop_disjoint_erasures_commute(
            ax in 0.0f32..130.0, ay in 0.0f32..320.0,
            bx in 190.0f32..320.0, by in 0.0f32..320.0,
        ) {
            // x ranges are more than two radii apart
            let (a, b) = (Vec2::new(ax, ay), Vec2::new(bx, by));
            let mut first = surface();
            first.erase(a, ERASE_RADIUS);
            first.erase(b, ERASE_RADIUS);
            let mut second = surface();
            second.erase(b, ERASE_RADIUS);
            second.erase(a, ERASE_RADIUS);
            prop_assert_eq!(first.compute_progress(), second.compute_progress());
            prop_assert_eq!(first.pixmap(), second.pixmap());
        }

        #[test]
        fn prop_progress_never_decreases(
            points in proptest::collection::vec((0.0f32..320.0, 0.0f32..320.0), 1..30)
        ) {
            let mut s = surface();
            let mut last = 0.0;
            for (x, y) in points {
                s.erase(Vec2::new(x, y), ERASE_RADIUS);
                let p = s.compute_progress();
                prop_assert!(p >= last);
                prop_assert!((0.0..=1.0).contains(&p));
                last = p;
            }
        }
    }
}
