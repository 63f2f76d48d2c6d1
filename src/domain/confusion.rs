// ============================================================
// Layer 3 — Confusion Matrix and Classification Report
// ============================================================
// Pure bookkeeping over (true label, predicted label) pairs.
//
//   counts[t][p] = number of items whose true class is t
//                  and whose predicted class is p
//
// Everything else is derived from those counts:
//   accuracy  = trace / total
//   precision = counts[c][c] / column_sum(c)
//   recall    = counts[c][c] / row_sum(c)
//   f1        = harmonic mean of precision and recall
//
// A class with no support (or never predicted) reports 0.0
// instead of NaN.

use std::fmt::Write;

use anyhow::{ensure, Result};
use serde::Serialize;

use crate::domain::image::NUM_CLASSES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    counts: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

/// Per-class scores for the classification report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self { counts: [[0; NUM_CLASSES]; NUM_CLASSES] }
    }

    /// Build from parallel slices of true and predicted class indices.
    pub fn from_pairs(truth: &[usize], predicted: &[usize]) -> Result<Self> {
        ensure!(
            truth.len() == predicted.len(),
            "{} true labels but {} predictions",
            truth.len(),
            predicted.len()
        );
        let mut matrix = Self::new();
        for (&t, &p) in truth.iter().zip(predicted) {
            matrix.record(t, p)?;
        }
        Ok(matrix)
    }

    pub fn record(&mut self, truth: usize, predicted: usize) -> Result<()> {
        ensure!(
            truth < NUM_CLASSES && predicted < NUM_CLASSES,
            "class pair ({}, {}) outside 0..{}",
            truth,
            predicted,
            NUM_CLASSES
        );
        self.counts[truth][predicted] += 1;
        Ok(())
    }

    pub fn count(&self, truth: usize, predicted: usize) -> usize {
        self.counts[truth][predicted]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn trace(&self) -> usize {
        (0..NUM_CLASSES).map(|c| self.counts[c][c]).sum()
    }

    /// Number of items whose true class is `class`
    pub fn row_sum(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    /// Number of items predicted as `class`
    pub fn column_sum(&self, class: usize) -> usize {
        self.counts.iter().map(|row| row[class]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.trace(), self.total())
    }

    pub fn class_scores(&self, class: usize) -> ClassScores {
        let hits = self.counts[class][class];
        let precision = ratio(hits, self.column_sum(class));
        let recall = ratio(hits, self.row_sum(class));
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassScores { precision, recall, f1, support: self.row_sum(class) }
    }

    /// Plain-text report: one line per class, then accuracy and the matrix.
    pub fn render_report(&self, class_names: &[&str; NUM_CLASSES]) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        );
        for (class, name) in class_names.iter().enumerate() {
            let s = self.class_scores(class);
            let _ = writeln!(
                out,
                "{:>12} {:>9.3} {:>9.3} {:>9.3} {:>9}",
                name, s.precision, s.recall, s.f1, s.support
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{:>12} {:>29.3} {:>9}", "accuracy", self.accuracy(), self.total());
        let _ = writeln!(out);

        // Confusion matrix: rows = true class, columns = predicted class
        let _ = write!(out, "{:>12}", "");
        for c in 0..NUM_CLASSES {
            let _ = write!(out, " {:>5}", c);
        }
        let _ = writeln!(out);
        for (t, name) in class_names.iter().enumerate() {
            let _ = write!(out, "{:>12}", name);
            for p in 0..NUM_CLASSES {
                let _ = write!(out, " {:>5}", self.count(t, p));
            }
            let _ = writeln!(out);
        }
        out
    }
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
