// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the raw CSV file all the
// way to device tensor batches.
//
//   fer2013.csv
//       │
//       ▼
//   CsvLoader         → typed RawRecords split by Usage
//       │
//       ▼
//   Preprocessor      → TensorBatch (images in [0,1], one-hot labels)
//       │
//       ▼
//   FaceDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   FaceBatcher       → stacks samples into [N,48,48,1] / [N,7] tensors
//       │
//       ▼
//   DataLoader        → feeds shuffled batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the FER-2013 CSV and splits rows by usage partition
pub mod loader;

/// Parses pixel strings, normalises, one-hot encodes labels
pub mod preprocessor;

/// Host-side TensorBatch and Burn's Dataset implementation
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
