// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams other layers program against:
//
//   ImageTransform — turns one raw image into network input.
//                    The dataset is handed one at construction
//                    and applies it on every access.
//
//   PredictionSink — anything that accepts the final ordered
//                    list of predicted labels (the submission
//                    writer is the only one today).
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::image::ImageRecord;

// ─── ImageTransform ───────────────────────────────────────────────────────────
/// Maps an image to `IMAGE_LEN` floats in channel-major order.
///
/// Implementations:
///   - Normalize → deterministic, used for validation and test data
///   - Augment   → random flip/crop then Normalize, used for training
///
/// `Send + Sync` because burn's DataLoader may read the dataset
/// from a prefetch thread.
pub trait ImageTransform: Send + Sync {
    fn apply(&self, image: &ImageRecord) -> Vec<f32>;
}

// ─── PredictionSink ───────────────────────────────────────────────────────────
/// Receives predictions in dataset order.
pub trait PredictionSink {
    fn publish(&self, predictions: &[usize]) -> Result<()>;
}
