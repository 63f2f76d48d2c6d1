// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the network or the disk:
//
//   fetch.rs       — Downloads the dataset archive if it is
//                    missing (ureq), writing through a .part file.
//
//   metrics.rs     — Per-epoch metrics appended to a CSV file.
//
//   artifacts.rs   — Run config, loss trace and classification
//                    report written as JSON / text.
//
//   submission.rs  — The descriptor + entry script handed to the
//                    competition platform.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Download-if-absent for the dataset archive
pub mod fetch;

/// Training metrics CSV logger
pub mod metrics;

/// Config, loss trace and report persistence
pub mod artifacts;

/// Competition submission files
pub mod submission;
