// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the .npz archive to device-ready batches.
//
//   cifar.npz
//       │
//       ▼
//   NpzLoader         → reads the three arrays, validates shapes
//       │
//       ▼
//   split_train_val   → seeded 80/20 split of the training arrays
//       │
//       ▼
//   CifarDataset<T>   → implements Burn's Dataset trait,
//       │               applies the injected ImageTransform on get()
//       ▼
//   CifarBatcher      → stacks items into [N, 3, 32, 32] tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the trainer / inferencer
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the .npz dataset archive
pub mod archive;

/// Normalisation and training-time augmentation
pub mod transform;

/// Implements Burn's Dataset trait for CIFAR images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
