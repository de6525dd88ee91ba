//! Software RGBA buffer for the scratch overlay
//!
//! Straight (non-premultiplied) alpha, row-major, 4 bytes per pixel, the
//! same layout as browser `ImageData` so it can be blitted as-is.

use glam::Vec2;

use crate::render::Rgba;

/// Width/height of the built-in glyphs, in font pixels
const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Fully transparent buffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw RGBA bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        let p = &self.data[i..i + 4];
        Some(Rgba {
            r: p[0],
            g: p[1],
            b: p[2],
            a: p[3],
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Diagonal gradient from the top-left to the bottom-right corner
    ///
    /// `stops` are `(offset, color)` pairs in ascending offset order.
    pub fn fill_diagonal_gradient(&mut self, stops: &[(f32, Rgba)]) {
        let Some(&(_, first)) = stops.first() else {
            return;
        };
        let (w, h) = (self.width as f32, self.height as f32);
        let len_sq = (w * w + h * h).max(f32::EPSILON);

        for y in 0..self.height {
            for x in 0..self.width {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let t = ((px * w + py * h) / len_sq).clamp(0.0, 1.0);

                let mut color = first;
                for pair in stops.windows(2) {
                    let ((t0, c0), (t1, c1)) = (pair[0], pair[1]);
                    if t >= t0 && t <= t1 {
                        let span = (t1 - t0).max(f32::EPSILON);
                        color = c0.lerp(c1, (t - t0) / span);
                        break;
                    }
                    color = c1;
                }
                self.put(x, y, color);
            }
        }
    }

    fn put(&mut self, x: u32, y: u32, c: Rgba) {
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&[c.r, c.g, c.b, c.a]);
    }

    /// Source-over blend of one pixel, `coverage` in [0, 1]
    fn blend(&mut self, x: u32, y: u32, src: Rgba, coverage: f32) {
        let sa = src.a as f32 / 255.0 * coverage;
        if sa <= 0.0 {
            return;
        }
        let i = self.index(x, y);
        let da = self.data[i + 3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return;
        }

        let channel = |s: u8, d: u8| {
            let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };
        self.data[i] = channel(src.r, self.data[i]);
        self.data[i + 1] = channel(src.g, self.data[i + 1]);
        self.data[i + 2] = channel(src.b, self.data[i + 2]);
        self.data[i + 3] = (out_a * 255.0).round() as u8;
    }

    /// Visit every pixel touched by a disc with its anti-aliased coverage
    fn for_each_in_disc(
        &mut self,
        center: Vec2,
        radius: f32,
        mut f: impl FnMut(&mut Self, u32, u32, f32),
    ) {
        if radius <= 0.0 || self.width == 0 || self.height == 0 {
            return;
        }
        let reach = radius + 0.5;
        let x0 = (center.x - reach).floor().max(0.0) as u32;
        let y0 = (center.y - reach).floor().max(0.0) as u32;
        let x1 = (center.x + reach).ceil().min(self.width as f32);
        let y1 = (center.y + reach).ceil().min(self.height as f32);
        if x1 <= 0.0 || y1 <= 0.0 {
            return;
        }

        for y in y0..y1 as u32 {
            for x in x0..x1 as u32 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    f(self, x, y, coverage);
                }
            }
        }
    }

    /// Paint a disc over existing content
    pub fn fill_disc(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.for_each_in_disc(center, radius, |pm, x, y, cov| pm.blend(x, y, color, cov));
    }

    /// Destination-out: remove coverage inside the disc
    pub fn erase_disc(&mut self, center: Vec2, radius: f32) {
        self.for_each_in_disc(center, radius, |pm, x, y, cov| {
            let i = pm.index(x, y) + 3;
            let a = pm.data[i] as f32 * (1.0 - cov);
            pm.data[i] = a.round() as u8;
        });
    }

    /// Pixels whose alpha is strictly below `cutoff`
    pub fn count_alpha_below(&self, cutoff: u8) -> usize {
        self.data.chunks_exact(4).filter(|p| p[3] < cutoff).count()
    }

    /// Draw `text` centered on `center` with the built-in 5x7 font
    ///
    /// Returns false (and draws nothing) if the text does not fit.
    pub fn draw_text(&mut self, text: &str, center: Vec2, scale: u32, color: Rgba) -> bool {
        let scale = scale.max(1);
        let advance = (GLYPH_W + 1) * scale;
        let count = text.chars().count() as u32;
        if count == 0 {
            return true;
        }
        let text_w = count * advance - scale;
        let text_h = GLYPH_H * scale;
        if text_w > self.width || text_h > self.height {
            return false;
        }

        let left = (center.x - text_w as f32 / 2.0).round().max(0.0) as u32;
        let top = (center.y - text_h as f32 / 2.0).round().max(0.0) as u32;

        for (n, ch) in text.chars().enumerate() {
            let Some(rows) = glyph(ch) else { continue };
            let gx = left + n as u32 * advance;
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let x = gx + col * scale + dx;
                            let y = top + row as u32 * scale + dy;
                            if x < self.width && y < self.height {
                                self.blend(x, y, color, 1.0);
                            }
                        }
                    }
                }
            }
        }
        true
    }
}

/// 5x7 bitmaps for the overlay label, MSB is the leftmost column
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        '✦' => [0b00100, 0b00100, 0b01110, 0b11111, 0b01110, 0b00100, 0b00100],
        _ => return None,
    };
    Some(rows)
}
