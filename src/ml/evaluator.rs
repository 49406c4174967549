// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Everything that scores a model without updating it:
//
//   evaluate()        loss + accuracy over a DataLoader, batch by batch
//   predict()         softmax probabilities for every row of a TensorBatch
//   accuracy_score()  fraction of matching class indices, computed
//                     on the host from predict() output
//   ConfusionMatrix   per-class precision / recall / F1 report
//
// evaluate() and accuracy_score(predict()) take two independent
// routes to the same accuracy; the application layer checks
// that they agree.
//
// Reference: Burn Book §5 (validation step)

use anyhow::Result;
use burn::{data::dataloader::DataLoader, prelude::*};
use std::{fmt::Write as _, sync::Arc};

use crate::data::{
    batcher::{build_loader, FaceBatch},
    dataset::{argmax, TensorBatch},
};
use crate::ml::model::{correct_predictions, EmotionCnn};

/// Sample-weighted loss and accuracy over one partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss:     f64,
    pub accuracy: f64,
    pub samples:  usize,
}

/// Run the model over every batch and average loss/accuracy per sample.
/// Pass an inference-mode model (`model.valid()`) so dropout is off
/// and batch norm uses its running statistics.
pub fn evaluate<B: Backend>(
    model:  &EmotionCnn<B>,
    loader: &Arc<dyn DataLoader<FaceBatch<B>>>,
) -> Evaluation {
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut samples  = 0usize;

    for batch in loader.iter() {
        let n = batch.targets.dims()[0];
        let (loss, logits) = model.forward_loss(batch.images, batch.targets.clone());

        loss_sum += loss.into_scalar().elem::<f64>() * n as f64;
        correct  += correct_predictions(logits, batch.targets);
        samples  += n;
    }

    Evaluation {
        loss:     if samples > 0 { loss_sum / samples as f64 } else { f64::NAN },
        accuracy: if samples > 0 { correct as f64 / samples as f64 } else { 0.0 },
        samples,
    }
}

/// Softmax probabilities, one row per sample, in input order.
pub fn predict<B: Backend>(
    model:      &EmotionCnn<B>,
    batch:      &TensorBatch,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Vec<Vec<f32>>> {
    let loader           = build_loader::<B>(batch, batch_size, None, device.clone());
    let [_, num_classes] = batch.label_shape();
    let mut rows         = Vec::with_capacity(batch.len());

    for chunk in loader.iter() {
        let probs = model
            .predict(chunk.images)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("cannot read predictions: {e:?}"))?;
        rows.extend(probs.chunks(num_classes.max(1)).map(<[f32]>::to_vec));
    }

    Ok(rows)
}

/// Predicted class per row (argmax over probabilities).
pub fn predicted_classes(probabilities: &[Vec<f32>]) -> Vec<usize> {
    probabilities.iter().map(|row| argmax(row)).collect()
}

/// Fraction of positions where `truth` and `predicted` agree.
pub fn accuracy_score(truth: &[usize], predicted: &[usize]) -> f64 {
    let total = truth.len().min(predicted.len());
    if total == 0 {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    hits as f64 / total as f64
}

// ─── Confusion Matrix ─────────────────────────────────────────────────────────
/// counts[true_class][predicted_class]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn from_indices(truth: &[usize], predicted: &[usize], num_classes: usize) -> Self {
        let mut counts = vec![vec![0usize; num_classes]; num_classes];
        for (&t, &p) in truth.iter().zip(predicted) {
            if t < num_classes && p < num_classes {
                counts[t][p] += 1;
            }
        }
        Self { counts }
    }

    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn get(&self, truth: usize, predicted: usize) -> usize {
        self.counts[truth][predicted]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let diag: usize = (0..self.num_classes()).map(|c| self.get(c, c)).sum();
        ratio(diag, self.total())
    }

    /// Number of true samples of `class`.
    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    pub fn precision(&self, class: usize) -> f64 {
        let predicted: usize = self.counts.iter().map(|row| row[class]).sum();
        ratio(self.get(class, class), predicted)
    }

    pub fn recall(&self, class: usize) -> f64 {
        ratio(self.get(class, class), self.support(class))
    }

    pub fn f1(&self, class: usize) -> f64 {
        let (p, r) = (self.precision(class), self.recall(class));
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    /// Matrix plus per-class precision/recall/F1/support as text.
    pub fn report(&self, class_names: &[&str]) -> String {
        let name = |c: usize| class_names.get(c).copied().unwrap_or("?");
        let mut out = String::new();

        let _ = write!(out, "{:>10}", "true\\pred");
        for c in 0..self.num_classes() {
            let _ = write!(out, " {:>8}", name(c));
        }
        out.push('\n');
        for (t, row) in self.counts.iter().enumerate() {
            let _ = write!(out, "{:>10}", name(t));
            for n in row {
                let _ = write!(out, " {n:>8}");
            }
            out.push('\n');
        }

        out.push('\n');
        let _ = writeln!(out, "{:>10} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support");
        for c in 0..self.num_classes() {
            let _ = writeln!(
                out,
                "{:>10} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                name(c),
                self.precision(c),
                self.recall(c),
                self.f1(c),
                self.support(c)
            );
        }
        let _ = writeln!(out, "{:>10} {:>9} {:>9} {:>9.4} {:>9}", "accuracy", "", "", self.accuracy(), self.total());
        out
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::ml::model::EmotionCnnConfig;

    type TestBackend = NdArray;

    fn tiny_batch(rows: usize) -> TensorBatch {
        let images = (0..rows * 256).map(|i| (i % 17) as f32 / 16.0).collect();
        let labels = (0..rows)
            .flat_map(|r| {
                let mut one_hot = vec![0.0f32; 7];
                one_hot[r % 7] = 1.0;
                one_hot
            })
            .collect();
        TensorBatch::new(images, labels, 16, 16, 7).unwrap()
    }

    fn tiny_model(device: &<TestBackend as Backend>::Device) -> EmotionCnn<TestBackend> {
        EmotionCnnConfig::new()
            .with_height(16)
            .with_width(16)
            .with_base_filters(2)
            .with_dense_units(8)
            .init(device)
    }

    #[test]
    fn test_accuracy_score() {
        assert_eq!(accuracy_score(&[0, 1, 2, 3], &[0, 1, 0, 3]), 0.75);
        assert_eq!(accuracy_score(&[], &[]), 0.0);
    }

    #[test]
    fn test_evaluate_agrees_with_argmax_accuracy() {
        let device = Default::default();
        let model  = tiny_model(&device);
        let batch  = tiny_batch(10);

        let loader     = build_loader::<TestBackend>(&batch, 4, None, device.clone());
        let evaluation = evaluate(&model, &loader);
        assert_eq!(evaluation.samples, 10);
        assert!(evaluation.loss.is_finite());

        let probs     = predict(&model, &batch, 4, &device).unwrap();
        let predicted = predicted_classes(&probs);
        assert_eq!(probs.len(), 10);
        assert!(probs.iter().all(|p| p.len() == 7));

        let independent = accuracy_score(&batch.class_indices(), &predicted);
        assert!((independent - evaluation.accuracy).abs() < 1e-9);
    }

    #[test]
    fn test_confusion_matrix_metrics() {
        let truth     = [0, 0, 1, 1, 1, 2];
        let predicted = [0, 1, 1, 1, 0, 2];
        let cm = ConfusionMatrix::from_indices(&truth, &predicted, 3);

        assert_eq!(cm.total(), 6);
        assert_eq!(cm.get(1, 0), 1);
        assert_eq!(cm.support(1), 3);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-12);
        assert!((cm.precision(1) - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.recall(1) - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.f1(2) - 1.0).abs() < 1e-12);
        assert!((cm.accuracy() - accuracy_score(&truth, &predicted)).abs() < 1e-12);

        let report = cm.report(&["A", "B", "C"]);
        assert!(report.contains("precision"));
        assert!(report.contains("accuracy"));
    }

    #[test]
    fn test_class_never_predicted_has_zero_precision() {
        let cm = ConfusionMatrix::from_indices(&[0, 1], &[0, 0], 2);
        assert_eq!(cm.precision(1), 0.0);
        assert_eq!(cm.f1(1), 0.0);
    }
}
