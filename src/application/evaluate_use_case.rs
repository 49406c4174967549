// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Reloads an exported model and scores it on the PrivateTest
// partition:
//
//   Step 1: Load model.json + model.bin          (Layer 6 - infra)
//   Step 2: Load the CSV and preprocess its test
//           partition at the model's input size  (Layer 4 - data)
//   Step 3: evaluate + predict + argmax accuracy (Layer 5 - ml)
//
// score_test_set() is shared with TrainUseCase so both commands
// report the same numbers in the same shape.
//
// Reference: Burn Book §5 (Inference)

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::build_loader, dataset::TensorBatch, loader::CsvLoader, preprocessor::Preprocessor};
use crate::domain::traits::RecordSource;
use crate::infra::exporter::ModelExporter;
use crate::ml::evaluator::{
    accuracy_score, evaluate, predict, predicted_classes, ConfusionMatrix, Evaluation,
};
use crate::ml::model::EmotionCnn;
use crate::ml::trainer::check_input_shape;

/// Test-set scores computed two ways plus the confusion matrix.
#[derive(Debug, Clone)]
pub struct TestReport {
    pub evaluation:      Evaluation,
    /// accuracy_score() over argmax of predict()
    pub argmax_accuracy: f64,
    pub confusion:       ConfusionMatrix,
}

impl TestReport {
    /// Largest gap tolerated between the two accuracy routes.
    pub const AGREEMENT_TOLERANCE: f64 = 1e-6;

    /// evaluate() and the argmax route must report the same accuracy;
    /// the only legitimate source of a gap is an exact tie between
    /// class probabilities, which the two routes may break differently.
    pub fn accuracies_agree(&self) -> bool {
        (self.argmax_accuracy - self.evaluation.accuracy).abs() <= Self::AGREEMENT_TOLERANCE
    }
}

/// Score `model` (already in inference mode) on `test`.
pub fn score_test_set<B: Backend>(
    model:      &EmotionCnn<B>,
    test:       &TensorBatch,
    batch_size: usize,
    device:     &B::Device,
) -> Result<TestReport> {
    let loader     = build_loader::<B>(test, batch_size, None, device.clone());
    let evaluation = evaluate(model, &loader);

    let probabilities = predict(model, test, batch_size, device)?;
    let predicted     = predicted_classes(&probabilities);
    let truth         = test.class_indices();

    let argmax_accuracy = accuracy_score(&truth, &predicted);

    let [_, num_classes] = test.label_shape();
    let confusion = ConfusionMatrix::from_indices(&truth, &predicted, num_classes);
    let report    = TestReport { evaluation, argmax_accuracy, confusion };
    if !report.accuracies_agree() {
        tracing::warn!(
            "evaluate() accuracy {:.6} disagrees with argmax accuracy {:.6}",
            evaluation.accuracy,
            argmax_accuracy
        );
    }
    tracing::info!(
        "Test loss={:.4} accuracy={:.4} over {} samples",
        evaluation.loss,
        evaluation.accuracy,
        evaluation.samples
    );

    Ok(report)
}

pub struct EvaluateUseCase {
    dataset_path: PathBuf,
    model_dir:    PathBuf,
}

impl EvaluateUseCase {
    pub fn new(dataset_path: impl Into<PathBuf>, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            model_dir:    model_dir.into(),
        }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<TestReport> {
        // ── Step 1: Rebuild the exported network ──────────────────────────────
        let (model, config) = ModelExporter::new(&self.model_dir).load::<B>(device)?;

        // ── Step 2: Test partition at the model's input size ──────────────────
        let dataset = CsvLoader::new(&self.dataset_path)
            .load_partitions()
            .with_context(|| format!("Failed to load '{}'", self.dataset_path.display()))?;
        let preprocessor = Preprocessor::new(config.width, config.height, config.num_classes);
        let test_batch   = preprocessor.transform_named("test", dataset.test())?;
        check_input_shape(&config, &test_batch)?;

        // ── Step 3: Score ─────────────────────────────────────────────────────
        score_test_set(&model, &test_batch, TrainConfig::default().batch_size, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::model::EmotionCnnConfig;

    type TestBackend = NdArray;

    fn tiny_test_set(rows: usize) -> TensorBatch {
        let images = (0..rows * 256).map(|i| ((i * 7) % 256) as f32 / 255.0).collect();
        let labels = (0..rows)
            .flat_map(|r| {
                let mut one_hot = vec![0.0f32; 7];
                one_hot[(r * 3) % 7] = 1.0;
                one_hot
            })
            .collect();
        TensorBatch::new(images, labels, 16, 16, 7).unwrap()
    }

    #[test]
    fn test_both_accuracy_routes_agree() {
        let device = Default::default();
        let model: EmotionCnn<TestBackend> = EmotionCnnConfig::new()
            .with_height(16)
            .with_width(16)
            .with_base_filters(2)
            .with_dense_units(8)
            .init(&device);

        let report = score_test_set(&model, &tiny_test_set(11), 4, &device).unwrap();
        assert_eq!(report.evaluation.samples, 11);
        assert_eq!(report.confusion.total(), 11);
        assert!(report.accuracies_agree());
        assert!((report.confusion.accuracy() - report.argmax_accuracy).abs() < 1e-12);
    }

    #[test]
    fn test_gap_between_routes_is_reported() {
        let report = TestReport {
            evaluation:      Evaluation { loss: 1.0, accuracy: 0.5, samples: 4 },
            argmax_accuracy: 0.75,
            confusion:       ConfusionMatrix::from_indices(&[0, 1, 1, 0], &[0, 1, 1, 1], 2),
        };
        assert!(!report.accuracies_agree());
    }
}
