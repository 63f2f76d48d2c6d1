// ============================================================
// Layer 3 — Execution Mode
// ============================================================
// Which way the model is being run. The model reads it to
// decide whether training-only layers (dropout) are active;
// the trainer reads it to label which phase it is in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Parameters are being updated; stochastic layers are on
    Train,
    /// Read-only evaluation or inference
    Eval,
}

impl ExecutionMode {
    pub fn is_training(self) -> bool {
        matches!(self, ExecutionMode::Train)
    }
}
