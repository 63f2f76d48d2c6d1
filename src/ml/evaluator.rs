// ============================================================
// Layer 5 — Loss and Prediction Helpers
// ============================================================
// Cross-entropy over raw logits via Burn's CrossEntropyLoss,
// which takes log_softmax with the row max subtracted first,
// so large logits never overflow exp().
//
// Plus the host-side views the trainer and inferencer need:
// arg-max predictions and a correct-count.

use burn::{
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
    tensor::ElementConversion,
};

/// Mean cross-entropy of `logits` [batch, classes] against `targets` [batch].
/// Returns a one-element tensor so it can be back-propagated.
pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits, targets)
}

/// Arg-max class per row, in row order.
pub fn predicted_classes<B: Backend>(logits: Tensor<B, 2>) -> Vec<usize> {
    logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .into_data()
        .iter::<i64>()
        .map(|class| class as usize)
        .collect()
}

/// Number of rows whose arg-max equals the target.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn logits(rows: Vec<[f32; 10]>) -> Tensor<TestBackend, 2> {
        let n = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        Tensor::from_data(TensorData::new(flat, [n, 10]), &Default::default())
    }

    fn targets(values: &[i64]) -> Tensor<TestBackend, 1, Int> {
        Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), &Default::default())
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_uniform_logits_give_ln_10() {
        let loss = scalar(cross_entropy(logits(vec![[0.0; 10]; 4]), targets(&[0, 3, 5, 9])));
        assert!((loss - 10f64.ln()).abs() < 1e-5, "loss = {loss}");
    }

    #[test]
    fn test_confident_correct_prediction_is_near_zero() {
        let mut row = [0.0f32; 10];
        row[7] = 50.0;
        let loss = scalar(cross_entropy(logits(vec![row]), targets(&[7])));
        assert!(loss >= 0.0 && loss < 1e-6, "loss = {loss}");
    }

    #[test]
    fn test_large_logits_do_not_overflow() {
        let mut row = [1000.0f32; 10];
        row[2] = 1010.0;
        let loss = scalar(cross_entropy(logits(vec![row]), targets(&[0])));
        assert!(loss.is_finite());
        assert!((loss - 10.0).abs() < 1e-2, "loss = {loss}");
    }

    #[test]
    fn test_predicted_classes_and_correct_count() {
        let mut a = [0.0f32; 10];
        a[4] = 1.0;
        let mut b = [0.0f32; 10];
        b[9] = 2.0;
        let l = logits(vec![a, b]);
        assert_eq!(predicted_classes(l.clone()), vec![4, 9]);
        assert_eq!(count_correct(l, targets(&[4, 1])), 1);
    }
}
