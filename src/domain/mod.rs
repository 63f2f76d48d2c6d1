// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define what the
// system works with. No burn types, no file I/O.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Image records, labels and the fixed class list
pub mod image;

// Training vs evaluation mode
pub mod mode;

// Confusion matrix and per-class scores
pub mod confusion;

// Core abstractions (traits) that other layers implement
pub mod traits;
