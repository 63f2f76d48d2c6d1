// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, loss and optimiser code lives here. The domain
// layer stays free of Burn so it can be tested without any
// backend.
//
// What's in this layer:
//
//   backend.rs    — CPU / GPU device choice carried in the config
//
//   model.rs      — The CNN:
//                   • two 3×3 conv layers with ReLU
//                   • 2×2 max pooling after each
//                   • a hidden fully-connected layer
//                   • dropout (train mode only)
//                   • a 10-way output layer (raw logits)
//
//   evaluator.rs  — Stable cross-entropy, arg-max predictions,
//                   correct-count
//
//   trainer.rs    — The training loop: forward pass, loss,
//                   backward pass, Adam step, validation pass,
//                   per-epoch metrics
//
//   inferencer.rs — Runs the trained model over label-free
//                   images and returns one class per image
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Device selection
pub mod backend;

/// CNN image classifier
pub mod model;

/// Loss and prediction helpers
pub mod evaluator;

/// Training loop with validation and metrics
pub mod trainer;

/// Batch prediction over a dataset
pub mod inferencer;
