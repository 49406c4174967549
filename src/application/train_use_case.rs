// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load fer2013.csv into partitions  (Layer 4 - data)
//   Step 2: Pixels → tensors, labels → one-hot (Layer 4 - data)
//   Step 3: Open the history CSV               (Layer 6 - infra)
//   Step 4: Run training with early stopping   (Layer 5 - ml)
//   Step 5: Score the PrivateTest partition    (Layer 5 - ml)
//   Step 6: Export model.json + model.bin      (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};

use crate::application::evaluate_use_case::{score_test_set, TestReport};
use crate::data::{loader::CsvLoader, preprocessor::Preprocessor};
use crate::domain::traits::RecordSource;
use crate::infra::{
    exporter::{ExportedArtifact, ModelExporter},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::EmotionCnnConfig;
use crate::ml::trainer::train;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Only the paths and the seed are exposed on the command line;
// everything else keeps the values below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_path:  String,
    pub output_dir:    String,
    pub num_classes:   usize,
    pub height:        usize,
    pub width:         usize,
    pub base_filters:  usize,
    pub dense_units:   usize,
    pub dropout:       f64,
    pub max_epochs:    usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    pub beta_1:        f64,
    pub beta_2:        f64,
    pub epsilon:       f64,
    /// Epochs without val_loss improvement before stopping
    pub patience:      usize,
    /// Smallest val_loss drop that counts as an improvement
    pub min_delta:     f64,
    /// Shuffle + init seed; a random one is drawn when None
    pub seed:          Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_path:  "fer2013.csv".to_string(),
            output_dir:    ".".to_string(),
            num_classes:   7,
            height:        48,
            width:         48,
            base_filters:  32,
            dense_units:   128,
            dropout:       0.2,
            max_epochs:    100,
            batch_size:    64,
            learning_rate: 1e-3,
            beta_1:        0.9,
            beta_2:        0.999,
            epsilon:       1e-7,
            patience:      10,
            min_delta:     0.0,
            seed:          None,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> EmotionCnnConfig {
        EmotionCnnConfig::new()
            .with_num_classes(self.num_classes)
            .with_height(self.height)
            .with_width(self.width)
            .with_base_filters(self.base_filters)
            .with_dense_units(self.dense_units)
            .with_dropout(self.dropout)
    }
}

/// Everything the CLI reports after a training run.
#[derive(Debug)]
pub struct TrainReport {
    pub history:       Vec<EpochMetrics>,
    pub best_epoch:    usize,
    pub best_val_loss: f64,
    pub stopped_early: bool,
    pub seed:          u64,
    pub test:          TestReport,
    pub artifact:      ExportedArtifact,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute<B: AutodiffBackend>(&self, device: &B::Device) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 1: Load and partition the CSV ────────────────────────────────
        tracing::info!("Loading dataset from '{}'", cfg.dataset_path);
        let dataset = CsvLoader::new(&cfg.dataset_path)
            .load_partitions()
            .with_context(|| format!("Failed to load '{}'", cfg.dataset_path))?;

        // ── Step 2: Preprocess each partition ─────────────────────────────────
        let preprocessor = Preprocessor::new(cfg.width, cfg.height, cfg.num_classes);
        let train_batch  = preprocessor.transform_named("training", dataset.training())?;
        let valid_batch  = preprocessor.transform_named("validation", dataset.validation())?;
        let test_batch   = preprocessor.transform_named("test", dataset.test())?;

        // ── Step 3: Per-epoch history file ────────────────────────────────────
        let mut metrics = MetricsLogger::create(&cfg.output_dir)?;

        // ── Step 4: Train (Layer 5) ───────────────────────────────────────────
        let outcome = train::<B>(cfg, &train_batch, &valid_batch, &mut metrics, device)?;
        let model   = outcome.model.valid();

        // ── Step 5: Score the held-out test partition ─────────────────────────
        let test = score_test_set(&model, &test_batch, cfg.batch_size, device)?;

        // ── Step 6: Export ────────────────────────────────────────────────────
        let artifact = ModelExporter::new(&cfg.output_dir).export(&model, &cfg.model_config())?;

        Ok(TrainReport {
            history:       outcome.history,
            best_epoch:    outcome.best_epoch,
            best_val_loss: outcome.best_val_loss,
            stopped_early: outcome.stopped_early,
            seed:          outcome.seed,
            test,
            artifact,
        })
    }
}
