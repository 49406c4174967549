use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

/// Preprocessed partition held in host memory.
///
/// images: `[count, height, width, 1]`, values in [0, 1]
/// labels: `[count, num_classes]`, one-hot
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBatch {
    images:      Vec<f32>,
    labels:      Vec<f32>,
    height:      usize,
    width:       usize,
    num_classes: usize,
}

impl TensorBatch {
    pub fn new(
        images:      Vec<f32>,
        labels:      Vec<f32>,
        height:      usize,
        width:       usize,
        num_classes: usize,
    ) -> PipelineResult<Self> {
        let image_len = height * width;
        let n_images  = if image_len == 0 { 0 } else { images.len() / image_len };
        let n_labels  = if num_classes == 0 { 0 } else { labels.len() / num_classes };

        if n_images * image_len != images.len() || n_labels * num_classes != labels.len() {
            return Err(PipelineError::InputShape {
                expected: vec![height, width, 1, num_classes],
                found:    vec![images.len(), labels.len()],
            });
        }
        if n_images != n_labels {
            return Err(PipelineError::ShapeMismatch { images: n_images, labels: n_labels });
        }

        Ok(Self { images, labels, height, width, num_classes })
    }

    pub fn len(&self) -> usize {
        self.labels.len() / self.num_classes.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn image_shape(&self) -> [usize; 4] {
        [self.len(), self.height, self.width, 1]
    }

    pub fn label_shape(&self) -> [usize; 2] {
        [self.len(), self.num_classes]
    }

    pub fn image(&self, index: usize) -> &[f32] {
        let n = self.height * self.width;
        &self.images[index * n..(index + 1) * n]
    }

    pub fn label(&self, index: usize) -> &[f32] {
        &self.labels[index * self.num_classes..(index + 1) * self.num_classes]
    }

    /// Class index of each one-hot label row.
    pub fn class_indices(&self) -> Vec<usize> {
        (0..self.len()).map(|i| argmax(self.label(i))).collect()
    }
}

/// Index of the largest value; first index wins ties.
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v { (i, v) } else { (best_i, best_v) }
        })
        .0
}

/// One image + one-hot label, as served to the DataLoader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceSample {
    pub pixels: Vec<f32>,
    pub label:  Vec<f32>,
}

pub struct FaceDataset {
    samples: Vec<FaceSample>,
}

impl FaceDataset {
    pub fn new(samples: Vec<FaceSample>) -> Self { Self { samples } }
}

impl From<&TensorBatch> for FaceDataset {
    fn from(batch: &TensorBatch) -> Self {
        let samples = (0..batch.len())
            .map(|i| FaceSample {
                pixels: batch.image(i).to_vec(),
                label:  batch.label(i).to_vec(),
            })
            .collect();
        Self::new(samples)
    }
}

impl Dataset<FaceSample> for FaceDataset {
    fn get(&self, index: usize) -> Option<FaceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
