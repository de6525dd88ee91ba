//! Water-drop splash shown before the card

use glam::Vec2;
use rand::Rng;

use crate::render::{Canvas2d, Rgba, Shape};
use crate::tasks::{FrameTask, TaskStatus};

pub const INTRO_DURATION_MS: f64 = 2200.0;
pub const DROP_COUNT: usize = 20;

/// Drops start fading at this share of the run
const FADE_START: f32 = 0.7;

const BACKDROP_TOP: Rgba = Rgba::rgb(29, 78, 216);
const BACKDROP_BOTTOM: Rgba = Rgba::rgb(219, 234, 254);
const BACKDROP_ALPHA: f32 = 0.9;
const DROP_COLOR: Rgba = Rgba::rgb(96, 165, 250);

#[derive(Debug, Clone, Copy)]
pub struct WaterDrop {
    /// Start position; y is above the top edge
    pub origin: Vec2,
    pub size: f32,
    pub opacity: f32,
    /// Share of the run before this drop starts falling
    pub delay: f32,
}

/// Intro splash animation
#[derive(Debug, Clone)]
pub struct IntroAnimation {
    drops: Vec<WaterDrop>,
    viewport: Vec2,
    duration_ms: f64,
}

impl IntroAnimation {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, viewport: Vec2) -> Self {
        let drops = (0..DROP_COUNT)
            .map(|_| WaterDrop {
                origin: Vec2::new(
                    rng.random::<f32>() * viewport.x,
                    -rng.random::<f32>() * viewport.y * 0.5,
                ),
                size: 8.0 + rng.random::<f32>() * 18.0,
                opacity: 0.6 + rng.random::<f32>() * 0.4,
                delay: rng.random::<f32>() * 0.8,
            })
            .collect();
        Self {
            drops,
            viewport,
            duration_ms: INTRO_DURATION_MS,
        }
    }

    pub fn drops(&self) -> &[WaterDrop] {
        &self.drops
    }

    /// Position and opacity of `drop` at overall `progress`, if it has started
    pub fn drop_at(&self, drop: &WaterDrop, progress: f32) -> Option<(Vec2, f32)> {
        let local = ((progress - drop.delay) / (1.0 - drop.delay)).max(0.0);
        if local <= 0.0 {
            return None;
        }
        let y = drop.origin.y + local * self.viewport.y * 1.3;
        let fade = if progress > FADE_START {
            1.0 - (progress - FADE_START) / (1.0 - FADE_START)
        } else {
            1.0
        };
        Some((Vec2::new(drop.origin.x, y), drop.opacity * fade))
    }

    fn draw<C: Canvas2d + ?Sized>(&self, canvas: &mut C, progress: f32) {
        canvas.clear();
        canvas.fill(
            &Shape::Backdrop {
                top: BACKDROP_TOP,
                bottom: BACKDROP_BOTTOM,
            },
            Rgba::WHITE.with_opacity(BACKDROP_ALPHA * (1.0 - progress)),
        );
        for drop in &self.drops {
            if let Some((center, opacity)) = self.drop_at(drop, progress) {
                canvas.fill(
                    &Shape::Drop {
                        center,
                        size: drop.size,
                    },
                    DROP_COLOR.with_opacity(opacity),
                );
            }
        }
    }
}

impl<C: Canvas2d + ?Sized> FrameTask<C> for IntroAnimation {
    fn tick(&mut self, canvas: &mut C, elapsed_ms: f64) -> TaskStatus {
        let progress = (elapsed_ms / self.duration_ms).min(1.0) as f32;
        if progress < 1.0 {
            self.draw(canvas, progress);
            TaskStatus::Running
        } else {
            canvas.clear();
            TaskStatus::Done
        }
    }

    fn on_cancel(&mut self, canvas: &mut C) {
        canvas.clear();
    }
}
