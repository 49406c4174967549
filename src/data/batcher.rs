// ============================================================
// Layer 4 — Face Batcher
// ============================================================
// Implements Burn's Batcher trait to stack FaceSamples into
// device tensors.
//
// How batching works here:
//   Input:  Vec of N FaceSamples, each with H*W pixels and
//           a one-hot label of width C
//   Output: FaceBatch with
//             images  [N, H, W, 1]
//             targets [N, C]
//
//   All pixels are flattened into one Vec and reshaped, exactly
//   as they are laid out in the CSV (row-major, channels last).
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    prelude::*,
};
use std::sync::Arc;

use crate::data::dataset::{FaceDataset, FaceSample, TensorBatch};

// ─── FaceBatch ────────────────────────────────────────────────────────────────
/// A batch of faces ready for the forward pass.
#[derive(Debug, Clone)]
pub struct FaceBatch<B: Backend> {
    /// Normalised pixels, shape [batch_size, height, width, 1]
    pub images: Tensor<B, 4>,

    /// One-hot emotion labels, shape [batch_size, num_classes]
    pub targets: Tensor<B, 2>,
}

// ─── FaceBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct FaceBatcher<B: Backend> {
    pub device: B::Device,
    height:     usize,
    width:      usize,
}

impl<B: Backend> FaceBatcher<B> {
    pub fn new(device: B::Device, height: usize, width: usize) -> Self {
        Self { device, height, width }
    }
}

impl<B: Backend> Batcher<FaceSample, FaceBatch<B>> for FaceBatcher<B> {
    fn batch(&self, items: Vec<FaceSample>) -> FaceBatch<B> {
        let batch_size  = items.len();
        let num_classes = items.first().map(|s| s.label.len()).unwrap_or(0);

        // ── Flatten pixels and labels ─────────────────────────────────────────
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();
        let labels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.label.iter().copied())
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, self.height, self.width, 1]),
            &self.device,
        );
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(labels, [batch_size, num_classes]),
            &self.device,
        );

        FaceBatch { images, targets }
    }
}

// ─── DataLoader construction ──────────────────────────────────────────────────
/// Build a single-threaded loader over a host batch.
/// With `shuffle_seed` the order is reshuffled on every pass;
/// without it, batches follow the row order of `batch`.
pub fn build_loader<B: Backend>(
    batch:        &TensorBatch,
    batch_size:   usize,
    shuffle_seed: Option<u64>,
    device:       B::Device,
) -> Arc<dyn DataLoader<FaceBatch<B>>> {
    let [_, height, width, _] = batch.image_shape();
    let batcher = FaceBatcher::<B>::new(device, height, width);
    let builder = DataLoaderBuilder::new(batcher).batch_size(batch_size.max(1));
    let builder = match shuffle_seed {
        Some(seed) => builder.shuffle(seed),
        None       => builder,
    };
    builder.build(FaceDataset::from(batch))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_values() {
        let device  = Default::default();
        let batcher = FaceBatcher::<TestBackend>::new(device, 2, 2);
        let items   = vec![
            FaceSample { pixels: vec![0.0, 0.25, 0.5, 1.0], label: vec![0.0, 1.0, 0.0] },
            FaceSample { pixels: vec![1.0, 1.0, 0.0, 0.0],  label: vec![1.0, 0.0, 0.0] },
        ];

        let batch = batcher.batch(items);
        assert_eq!(batch.images.dims(), [2, 2, 2, 1]);
        assert_eq!(batch.targets.dims(), [2, 3]);

        let pixels = batch.images.into_data().to_vec::<f32>().unwrap();
        assert_eq!(pixels[..4], [0.0, 0.25, 0.5, 1.0]);
        let labels = batch.targets.into_data().to_vec::<f32>().unwrap();
        assert_eq!(labels, vec![0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_loader_keeps_order_without_shuffle() {
        let host = TensorBatch::new(
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 0.5],
            vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
            2, 2, 2,
        ).unwrap();
        let loader = build_loader::<TestBackend>(&host, 2, None, Default::default());

        let sizes: Vec<usize> = loader.iter().map(|b| b.targets.dims()[0]).collect();
        assert_eq!(sizes, vec![2, 1]);

        let first = loader.iter().next().unwrap();
        let px    = first.images.into_data().to_vec::<f32>().unwrap();
        assert_eq!(px[4..], [1.0, 1.0, 1.0, 1.0]);
    }
}
