//! Confetti burst fired on a winning reveal

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::FRAME_MS;
use crate::render::{Canvas2d, Rgba, Shape};
use crate::tasks::{FrameTask, TaskStatus};

/// Particles per burst
pub const CONFETTI_COUNT: usize = 120;

/// Total animation length
pub const CONFETTI_DURATION_MS: f64 = 3500.0;

/// Downward acceleration, pixels per frame²
const GRAVITY: f32 = 0.25;
/// Horizontal velocity kept per frame
const DRAG: f32 = 0.99;
/// Opacity reaches zero a little before the end
const FADE_RATE: f32 = 1.2;

/// Brand blues, whites and golds
pub const PALETTE: [Rgba; 10] = [
    Rgba::hex(0x1d4ed8),
    Rgba::hex(0x2563eb),
    Rgba::hex(0x3b82f6),
    Rgba::hex(0x60a5fa),
    Rgba::hex(0xffffff),
    Rgba::hex(0xf0f9ff),
    Rgba::hex(0xf59e0b),
    Rgba::hex(0xfbbf24),
    Rgba::hex(0xfcd34d),
    Rgba::hex(0xfde68a),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleShape {
    /// 2:1 strip
    Rect,
    Disc,
}

/// A piece of confetti; velocities are per 60 fps frame
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub rotation: f32,
    pub spin: f32,
    pub color: Rgba,
    pub size: f32,
    pub shape: ParticleShape,
    pub opacity: f32,
}

impl Particle {
    /// Random particle near the upper middle of a `viewport`-sized surface
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, viewport: Vec2) -> Self {
        let pos = Vec2::new(
            viewport.x / 2.0 + (rng.random::<f32>() - 0.5) * viewport.x * 0.4,
            viewport.y * 0.3 + rng.random::<f32>() * viewport.y * 0.2,
        );
        let vel = Vec2::new(
            (rng.random::<f32>() - 0.5) * 8.0,
            -6.0 - rng.random::<f32>() * 8.0,
        );
        Self {
            pos,
            vel,
            rotation: rng.random::<f32>() * std::f32::consts::TAU,
            spin: (rng.random::<f32>() - 0.5) * 0.2,
            color: PALETTE[rng.random_range(0..PALETTE.len())],
            size: 6.0 + rng.random::<f32>() * 8.0,
            shape: if rng.random_bool(0.5) {
                ParticleShape::Rect
            } else {
                ParticleShape::Disc
            },
            opacity: 1.0,
        }
    }

    /// Advance by `frames` (fractional) 60 fps frames
    fn integrate(&mut self, frames: f32) {
        self.pos += self.vel * frames;
        self.vel.y += GRAVITY * frames;
        self.vel.x *= DRAG.powf(frames);
        self.rotation += self.spin * frames;
    }

    fn shape(&self) -> Shape {
        match self.shape {
            ParticleShape::Rect => Shape::Rect {
                center: self.pos,
                size: Vec2::new(self.size, self.size / 2.0),
                rotation: self.rotation,
            },
            ParticleShape::Disc => Shape::Disc {
                center: self.pos,
                radius: self.size / 2.0,
            },
        }
    }
}

/// One confetti run
#[derive(Debug, Clone)]
pub struct ConfettiBurst {
    particles: Vec<Particle>,
    duration_ms: f64,
    last_elapsed_ms: f64,
}

impl ConfettiBurst {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, viewport: Vec2) -> Self {
        Self::with_count(rng, viewport, CONFETTI_COUNT)
    }

    pub fn with_count<R: Rng + ?Sized>(rng: &mut R, viewport: Vec2, count: usize) -> Self {
        Self {
            particles: (0..count).map(|_| Particle::spawn(rng, viewport)).collect(),
            duration_ms: CONFETTI_DURATION_MS,
            last_elapsed_ms: 0.0,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Move the simulation to `elapsed_ms`; returns false once expired
    pub fn step(&mut self, elapsed_ms: f64) -> bool {
        let frames = ((elapsed_ms - self.last_elapsed_ms) / FRAME_MS).max(0.0) as f32;
        self.last_elapsed_ms = elapsed_ms;

        let t = (elapsed_ms / self.duration_ms) as f32;
        let opacity = (1.0 - t * FADE_RATE).max(0.0);
        for p in &mut self.particles {
            p.integrate(frames);
            p.opacity = opacity;
        }
        elapsed_ms < self.duration_ms
    }

    pub fn draw<C: Canvas2d + ?Sized>(&self, canvas: &mut C) {
        for p in &self.particles {
            if p.opacity <= 0.0 {
                continue;
            }
            canvas.fill(&p.shape(), p.color.with_opacity(p.opacity));
        }
    }
}

impl<C: Canvas2d + ?Sized> FrameTask<C> for ConfettiBurst {
    fn tick(&mut self, canvas: &mut C, elapsed_ms: f64) -> TaskStatus {
        canvas.clear();
        if self.step(elapsed_ms) {
            self.draw(canvas);
            TaskStatus::Running
        } else {
            canvas.clear();
            self.particles.clear();
            TaskStatus::Done
        }
    }

    fn on_cancel(&mut self, canvas: &mut C) {
        canvas.clear();
        self.particles.clear();
    }
}
