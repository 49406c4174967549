// ============================================================
// Layer 4 — Pixel Preprocessor
// ============================================================
// Turns validated RawRecords into a TensorBatch:
//
//   "70 80 82 ..."  ──parse──▶ [70, 80, 82, ...]     (u8, 2304 values)
//                   ──scale──▶ [0.2745, 0.3137, ...] (value / 255.0)
//                   ──shape──▶ [48, 48, 1]           (row-major)
//
//   label 3         ──one-hot─▶ [0, 0, 0, 1, 0, 0, 0]
//
// A row fails with a Parse error when:
//   - a token is not an integer
//   - a token is outside [0, 255]
//   - the number of tokens differs from width × height
//
// Reference: Rust Book §8 (Strings), §13 (Iterators)

use crate::data::dataset::TensorBatch;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::record::RawRecord;

pub struct Preprocessor {
    width:       usize,
    height:      usize,
    num_classes: usize,
}

impl Preprocessor {
    pub fn new(width: usize, height: usize, num_classes: usize) -> Self {
        Self { width, height, num_classes }
    }

    /// Number of pixels every record must carry.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Convert a partition into normalised images and one-hot labels.
    pub fn transform(&self, rows: &[RawRecord]) -> PipelineResult<TensorBatch> {
        let mut images = Vec::with_capacity(rows.len() * self.pixel_count());
        let mut labels = Vec::with_capacity(rows.len() * self.num_classes);

        for row in rows {
            let pixels = self.parse_pixels(row)?;
            images.extend(pixels.into_iter().map(|p| f32::from(p) / 255.0));
            labels.extend(self.one_hot(row)?);
        }

        TensorBatch::new(images, labels, self.height, self.width, self.num_classes)
    }

    /// Like `transform`, also logging the resulting shapes.
    pub fn transform_named(&self, name: &str, rows: &[RawRecord]) -> PipelineResult<TensorBatch> {
        let batch = self.transform(rows)?;
        tracing::info!(
            "{name}_X shape: {:?}, {name}_Y shape: {:?}",
            batch.image_shape(),
            batch.label_shape()
        );
        Ok(batch)
    }

    /// Parse the whitespace-separated pixel string of one record.
    pub fn parse_pixels(&self, row: &RawRecord) -> PipelineResult<Vec<u8>> {
        let pixels = row
            .pixels
            .split_whitespace()
            .enumerate()
            .map(|(i, token)| {
                token.parse::<u8>().map_err(|_| {
                    PipelineError::parse(
                        row.line,
                        format!("pixel {i}: '{token}' is not an integer in [0, 255]"),
                    )
                })
            })
            .collect::<PipelineResult<Vec<u8>>>()?;

        if pixels.len() != self.pixel_count() {
            return Err(PipelineError::parse(
                row.line,
                format!(
                    "expected {} pixels ({}x{}), found {}",
                    self.pixel_count(),
                    self.width,
                    self.height,
                    pixels.len()
                ),
            ));
        }
        Ok(pixels)
    }

    fn one_hot(&self, row: &RawRecord) -> PipelineResult<Vec<f32>> {
        let index = row.label.index();
        if index >= self.num_classes {
            return Err(PipelineError::parse(
                row.line,
                format!("label {index} does not fit {} classes", self.num_classes),
            ));
        }
        let mut encoded = vec![0.0f32; self.num_classes];
        encoded[index] = 1.0;
        Ok(encoded)
    }
}
