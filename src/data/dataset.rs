use burn::data::dataset::Dataset;

use crate::domain::image::{ImageRecord, Label};
use crate::domain::traits::ImageTransform;

/// One transformed item as handed to the batcher.
#[derive(Debug, Clone)]
pub struct CifarItem {
    /// `IMAGE_LEN` floats, channel-major
    pub pixels: Vec<f32>,
    pub label:  Option<Label>,
}

/// Images plus optional labels; applies `T` on every `get`.
pub struct CifarDataset<T: ImageTransform> {
    records:   Vec<ImageRecord>,
    labels:    Option<Vec<Label>>,
    transform: T,
}

impl<T: ImageTransform> CifarDataset<T> {
    /// A labelled partition (training or validation).
    pub fn labelled(records: Vec<ImageRecord>, labels: Vec<Label>, transform: T) -> anyhow::Result<Self> {
        anyhow::ensure!(
            records.len() == labels.len(),
            "{} images but {} labels",
            records.len(),
            labels.len()
        );
        Ok(Self { records, labels: Some(labels), transform })
    }

    /// A label-free partition (test).
    pub fn unlabelled(records: Vec<ImageRecord>, transform: T) -> Self {
        Self { records, labels: None, transform }
    }

    pub fn is_labelled(&self) -> bool {
        self.labels.is_some()
    }
}

impl<T: ImageTransform> Dataset<CifarItem> for CifarDataset<T> {
    fn get(&self, index: usize) -> Option<CifarItem> {
        let record = self.records.get(index)?;
        let label = match &self.labels {
            Some(labels) => Some(*labels.get(index)?),
            None => None,
        };
        Some(CifarItem { pixels: self.transform.apply(record), label })
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
