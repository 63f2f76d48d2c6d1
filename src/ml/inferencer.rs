// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs a trained model over a dataset in eval mode and returns
// the arg-max class of every item, in dataset order. Labels, if
// the dataset has any, are ignored.

use anyhow::{ensure, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    prelude::*,
};

use crate::data::{batcher::CifarBatcher, dataset::CifarDataset};
use crate::domain::{mode::ExecutionMode, traits::ImageTransform};
use crate::ml::evaluator::predicted_classes;
use crate::ml::model::Cnn;

pub struct Inferencer<B: Backend> {
    model:      Cnn<B>,
    device:     B::Device,
    batch_size: usize,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: Cnn<B>, device: B::Device, batch_size: usize) -> Self {
        Self { model, device, batch_size }
    }

    pub fn predict<T: ImageTransform + 'static>(&self, dataset: CifarDataset<T>) -> Result<Vec<usize>> {
        ensure!(self.batch_size > 0, "Batch size must be at least 1");

        let expected = dataset.len();
        if expected == 0 {
            tracing::warn!("Nothing to predict: dataset is empty");
            return Ok(Vec::new());
        }

        // No shuffle: predictions must line up with the input order
        let loader = DataLoaderBuilder::new(CifarBatcher::<B>::new(self.device.clone()))
            .batch_size(self.batch_size)
            .build(dataset);

        let mut predictions = Vec::with_capacity(expected);
        for batch in loader.iter() {
            let logits = self.model.forward(batch.images, ExecutionMode::Eval);
            predictions.extend(predicted_classes(logits));
        }

        ensure!(
            predictions.len() == expected,
            "Expected {} predictions, got {}",
            expected,
            predictions.len()
        );
        tracing::debug!("Predicted {} items", predictions.len());
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transform::Normalize;
    use crate::domain::image::{ImageRecord, IMAGE_LEN, NUM_CLASSES};
    use crate::ml::model::CnnConfig;

    type TestBackend = burn::backend::NdArray;

    fn inferencer(batch_size: usize) -> Inferencer<TestBackend> {
        let device = Default::default();
        let model = CnnConfig::new().init(&device, 4);
        Inferencer::new(model, device, batch_size)
    }

    fn unlabelled(n: usize) -> CifarDataset<Normalize> {
        let records = (0..n)
            .map(|i| ImageRecord::new(vec![(i * 12) as u8; IMAGE_LEN]).unwrap())
            .collect();
        CifarDataset::unlabelled(records, Normalize)
    }

    #[test]
    fn test_one_prediction_per_item() {
        let predictions = inferencer(8).predict(unlabelled(20)).unwrap();
        assert_eq!(predictions.len(), 20);
        assert!(predictions.iter().all(|&p| p < NUM_CLASSES));
    }

    #[test]
    fn test_batch_size_does_not_change_predictions() {
        let a = inferencer(3).predict(unlabelled(10)).unwrap();
        let b = inferencer(10).predict(unlabelled(10)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset_gives_no_predictions() {
        assert!(inferencer(4).predict(unlabelled(0)).unwrap().is_empty());
    }
}
