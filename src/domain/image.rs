// ============================================================
// Layer 3 — Image Record and Label
// ============================================================
// The two values every other layer passes around:
//
//   ImageRecord — one 3×32×32 image, 8-bit samples,
//                 channel-major (all red, then green, then blue)
//   Label       — one of the ten CIFAR-10 classes
//
// Both are validated on construction so nothing downstream
// has to re-check shapes or ranges.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Number of colour channels per image
pub const CHANNELS: usize = 3;
/// Image height in pixels
pub const HEIGHT: usize = 32;
/// Image width in pixels
pub const WIDTH: usize = 32;
/// Samples per image (3 × 32 × 32)
pub const IMAGE_LEN: usize = CHANNELS * HEIGHT * WIDTH;
/// Number of classes the model distinguishes
pub const NUM_CLASSES: usize = 10;

/// Class names, indexed by label value.
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

// ─── ImageRecord ──────────────────────────────────────────────────────────────
/// One immutable CIFAR image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pixels: Box<[u8]>,
}

impl ImageRecord {
    /// Wrap raw channel-major bytes. Fails unless exactly 3072 bytes are given.
    pub fn new(pixels: Vec<u8>) -> Result<Self> {
        ensure!(
            pixels.len() == IMAGE_LEN,
            "image record must hold {} samples, got {}",
            IMAGE_LEN,
            pixels.len()
        );
        Ok(Self { pixels: pixels.into_boxed_slice() })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Sample at (channel, row, col)
    pub fn at(&self, channel: usize, row: usize, col: usize) -> u8 {
        self.pixels[channel * HEIGHT * WIDTH + row * WIDTH + col]
    }
}

// ─── Label ────────────────────────────────────────────────────────────────────
/// A class index in `0..NUM_CLASSES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(u8);

impl Label {
    pub fn new(value: i64) -> Result<Self> {
        ensure!(
            (0..NUM_CLASSES as i64).contains(&value),
            "label {} outside 0..{}",
            value,
            NUM_CLASSES
        );
        Ok(Self(value as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rejects_wrong_length() {
        assert!(ImageRecord::new(vec![0; IMAGE_LEN - 1]).is_err());
        assert!(ImageRecord::new(vec![0; IMAGE_LEN]).is_ok());
    }

    #[test]
    fn test_record_indexing_is_channel_major() {
        let mut pixels = vec![0u8; IMAGE_LEN];
        pixels[HEIGHT * WIDTH + 2 * WIDTH + 5] = 77;
        let record = ImageRecord::new(pixels).unwrap();
        assert_eq!(record.at(1, 2, 5), 77);
        assert_eq!(record.at(0, 2, 5), 0);
    }

    #[test]
    fn test_label_range() {
        assert!(Label::new(-1).is_err());
        assert!(Label::new(10).is_err());
        assert_eq!(Label::new(9).unwrap().index(), 9);
    }
}
