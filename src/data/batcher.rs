// ============================================================
// Layer 4 — CIFAR Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<CifarItem>
// into device tensors.
//
//   Input:  N items, each IMAGE_LEN floats (+ optional label)
//   Output: images  [N, 3, 32, 32]
//           targets [N]            (only when every item has a label)
//
// The batcher owns the device so the caller decides once,
// at startup, where tensors live.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::CifarItem;
use crate::domain::image::{CHANNELS, HEIGHT, WIDTH};

// ─── CifarBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct CifarBatch<B: Backend> {
    /// Shape: [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,

    /// Shape: [batch_size]. None for label-free (test) data.
    pub targets: Option<Tensor<B, 1, Int>>,
}

impl<B: Backend> CifarBatch<B> {
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── CifarBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct CifarBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> CifarBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<CifarItem, CifarBatch<B>> for CifarBatcher<B> {
    fn batch(&self, items: Vec<CifarItem>) -> CifarBatch<B> {
        let batch_size = items.len();

        // Flatten every image into one buffer, then give it its 4-D shape
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, CHANNELS, HEIGHT, WIDTH]),
            &self.device,
        );

        // Targets exist only if every item carries a label
        let labels: Option<Vec<i64>> = items
            .iter()
            .map(|item| item.label.map(|l| l.index() as i64))
            .collect();
        let targets = labels.map(|labels| {
            Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), &self.device)
        });

        CifarBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{Label, IMAGE_LEN};

    type TestBackend = burn::backend::NdArray;

    fn item(label: Option<i64>) -> CifarItem {
        CifarItem {
            pixels: vec![0.5; IMAGE_LEN],
            label:  label.map(|l| Label::new(l).unwrap()),
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = CifarBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(Some(1)), item(Some(7)), item(Some(0))]);
        assert_eq!(batch.images.dims(), [3, 3, 32, 32]);
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());

        let targets: Vec<i64> = batch.targets.unwrap().into_data().iter::<i64>().collect();
        assert_eq!(targets, vec![1, 7, 0]);
    }

    #[test]
    fn test_unlabelled_batch_has_no_targets() {
        let batcher = CifarBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(None), item(None)]);
        assert!(batch.targets.is_none());
    }

    #[test]
    fn test_partially_labelled_batch_has_no_targets() {
        let batcher = CifarBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(Some(2)), item(None)]);
        assert!(batch.targets.is_none());
    }
}
