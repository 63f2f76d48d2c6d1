// ============================================================
// Layer 4 — Image Transforms
// ============================================================
// Turns raw 8-bit samples into the floats the network eats.
//
//   Normalize: v → (v/255 − 0.5) / 0.5
//              0 → −1.0, 255 → +1.0
//
//   Augment:   random horizontal flip, then a random 32×32 crop
//              out of the image zero-padded by `crop_padding`
//              pixels on every side, then Normalize.
//              Padding samples are 0 and normalise to −1.0, so the
//              output stays in [−1, 1].
//
// Augment draws from its own seeded StdRng behind a Mutex —
// the Dataset trait only gives us &self, and the loader may
// call get() from a prefetch thread.
//
// Reference: rand crate documentation (SeedableRng, Rng)

use std::sync::Mutex;

use anyhow::{ensure, Result};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::image::{ImageRecord, CHANNELS, HEIGHT, IMAGE_LEN, WIDTH};
use crate::domain::traits::ImageTransform;

/// Map one sample into [-1, 1].
pub fn normalize_sample(v: u8) -> f32 {
    (v as f32 / 255.0 - 0.5) / 0.5
}

// ─── Normalize ────────────────────────────────────────────────────────────────
/// The deterministic transform used for validation and test data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalize;

impl ImageTransform for Normalize {
    fn apply(&self, image: &ImageRecord) -> Vec<f32> {
        image.pixels().iter().map(|&v| normalize_sample(v)).collect()
    }
}

// ─── Augment ──────────────────────────────────────────────────────────────────
/// Training-time transform: flip + padded crop + Normalize.
#[derive(Debug)]
pub struct Augment {
    flip_prob:    f64,
    crop_padding: usize,
    rng:          Mutex<StdRng>,
}

impl Augment {
    /// `flip_prob` must lie in [0, 1]; NaN is rejected.
    pub fn new(flip_prob: f64, crop_padding: usize, seed: u64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&flip_prob),
            "flip probability must be in [0, 1], got {}",
            flip_prob
        );
        Ok(Self {
            flip_prob,
            crop_padding,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    /// Draw (flip, row offset, col offset) for one access.
    fn draw(&self) -> (bool, usize, usize) {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let flip = rng.gen_bool(self.flip_prob);
        let dy = rng.gen_range(0..=2 * self.crop_padding);
        let dx = rng.gen_range(0..=2 * self.crop_padding);
        (flip, dy, dx)
    }
}

impl ImageTransform for Augment {
    fn apply(&self, image: &ImageRecord) -> Vec<f32> {
        let (flip, dy, dx) = self.draw();
        let pad = self.crop_padding;
        let mut out = Vec::with_capacity(IMAGE_LEN);

        for channel in 0..CHANNELS {
            for row in 0..HEIGHT {
                for col in 0..WIDTH {
                    // Position in the padded image, shifted back into source space
                    let src_row = (row + dy).checked_sub(pad).filter(|&r| r < HEIGHT);
                    let src_col = (col + dx).checked_sub(pad).filter(|&c| c < WIDTH);
                    let v = match (src_row, src_col) {
                        (Some(r), Some(c)) => {
                            let c = if flip { WIDTH - 1 - c } else { c };
                            image.at(channel, r, c)
                        }
                        _ => 0,
                    };
                    out.push(normalize_sample(v));
                }
            }
        }
        out
    }
}
