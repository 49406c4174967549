// ============================================================
// Layer 6 — Model Exporter
// ============================================================
// Persists a trained network as two files:
//
//   <dir>/
//     model.json   ← architecture: config + layer list (pretty JSON)
//     model.bin    ← all parameters and batch-norm running statistics
//
// The weights are written with Burn's BinFileRecorder at full
// precision, so a reloaded network predicts exactly what the
// in-memory network predicted.
//
// Loading reverses the process:
//   1. Read model.json and check its layer list matches its config
//   2. Rebuild the module tree from the config
//   3. Load model.bin into it with load_record()
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::architecture::ArchitectureDocument;
use crate::ml::model::{EmotionCnn, EmotionCnnConfig};

pub const ARCHITECTURE_FILE: &str = "model.json";
/// File stem handed to the recorder, which appends ".bin"
const WEIGHTS_STEM: &str = "model";

type WeightsRecorder = BinFileRecorder<FullPrecisionSettings>;

/// Paths and sizes of the files produced by an export.
#[derive(Debug, Clone)]
pub struct ExportedArtifact {
    pub architecture:       PathBuf,
    pub weights:            PathBuf,
    pub architecture_bytes: u64,
    pub weights_bytes:      u64,
}

pub struct ModelExporter {
    dir: PathBuf,
}

impl ModelExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn architecture_path(&self) -> PathBuf {
        self.dir.join(ARCHITECTURE_FILE)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(format!("{WEIGHTS_STEM}.bin"))
    }

    /// Write model.json and model.bin.
    pub fn export<B: Backend>(
        &self,
        model:  &EmotionCnn<B>,
        config: &EmotionCnnConfig,
    ) -> Result<ExportedArtifact> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Architecture ──────────────────────────────────────────────────────
        let doc  = ArchitectureDocument::from_config(config);
        let json = serde_json::to_string_pretty(&doc)?;
        let architecture = self.architecture_path();
        fs::write(&architecture, json)
            .with_context(|| format!("Cannot write architecture to '{}'", architecture.display()))?;

        // ── Weights ───────────────────────────────────────────────────────────
        let stem = self.dir.join(WEIGHTS_STEM);
        WeightsRecorder::new()
            .record(model.clone().into_record(), stem.clone())
            .with_context(|| format!("Failed to save weights to '{}'", stem.display()))?;

        let weights = self.weights_path();
        let artifact = ExportedArtifact {
            architecture_bytes: file_size(&architecture)?,
            weights_bytes:      file_size(&weights)?,
            architecture,
            weights,
        };

        tracing::info!(
            "Saved model to '{}' ({} bytes) and '{}' ({} bytes)",
            artifact.architecture.display(),
            artifact.architecture_bytes,
            artifact.weights.display(),
            artifact.weights_bytes,
        );
        Ok(artifact)
    }

    /// Read and validate model.json.
    pub fn load_architecture(&self) -> Result<ArchitectureDocument> {
        let path = self.architecture_path();
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read architecture from '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        let doc: ArchitectureDocument = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a valid architecture file", path.display()))?;

        if !doc.is_consistent() {
            bail!(
                "'{}' layer list does not match its config (format version {})",
                path.display(),
                doc.format_version
            );
        }
        Ok(doc)
    }

    /// Rebuild the network from model.json and load model.bin into it.
    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<(EmotionCnn<B>, EmotionCnnConfig)> {
        let doc   = self.load_architecture()?;
        let model = doc.config.init::<B>(device);

        let stem   = self.dir.join(WEIGHTS_STEM);
        let record = WeightsRecorder::new()
            .load(stem, device)
            .with_context(|| {
                format!("Cannot load weights '{}'", self.weights_path().display())
            })?;

        tracing::info!("Model loaded from '{}'", self.dir.display());
        Ok((model.load_record(record), doc.config))
    }
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)
        .with_context(|| format!("Cannot stat '{}'", path.display()))?
        .len())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::data::dataset::TensorBatch;
    use crate::ml::evaluator::predict;

    type TestBackend = NdArray;

    fn small_config() -> EmotionCnnConfig {
        EmotionCnnConfig::new()
            .with_height(16)
            .with_width(16)
            .with_base_filters(2)
            .with_dense_units(8)
    }

    #[test]
    fn test_export_then_load_predicts_identically() {
        let device = Default::default();
        let config = small_config();
        let model: EmotionCnn<TestBackend> = config.init(&device);

        let dir      = tempfile::tempdir().unwrap();
        let exporter = ModelExporter::new(dir.path());
        let artifact = exporter.export(&model, &config).unwrap();
        assert!(artifact.architecture_bytes > 0);
        assert!(artifact.weights_bytes > 0);

        let (reloaded, reloaded_cfg) = exporter.load::<TestBackend>(&device).unwrap();
        assert_eq!(reloaded_cfg.layers(), config.layers());

        let images = (0..5 * 256).map(|i| ((i * 31) % 256) as f32 / 255.0).collect();
        let labels = (0..5).flat_map(|r| {
            let mut v = vec![0.0f32; 7];
            v[r] = 1.0;
            v
        }).collect();
        let batch = TensorBatch::new(images, labels, 16, 16, 7).unwrap();

        let before = predict(&model, &batch, 5, &device).unwrap();
        let after  = predict(&reloaded, &batch, 5, &device).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_missing_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelExporter::new(dir.path()).load::<TestBackend>(&Default::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_inconsistent_architecture_is_rejected() {
        let dir    = tempfile::tempdir().unwrap();
        let mut doc = ArchitectureDocument::from_config(&small_config());
        doc.layers.pop();
        fs::write(dir.path().join(ARCHITECTURE_FILE), serde_json::to_string(&doc).unwrap()).unwrap();

        assert!(ModelExporter::new(dir.path()).load_architecture().is_err());
    }
}
