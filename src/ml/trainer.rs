// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam,
// with early stopping on the validation loss.
//
// Key Burn insight:
//   - Training uses an AutodiffBackend B for gradients
//   - model.valid() returns the model on B::InnerBackend, with
//     dropout off and batch norm on its running statistics
//   - The validation loader must therefore use B::InnerBackend
//
// Per epoch:
//   1. Shuffle + iterate training batches: forward → loss →
//      backward → Adam step
//   2. Evaluate the inference-mode model on the validation set
//   3. Print + log the epoch metrics
//   4. Let EarlyStopping decide; snapshot the model on improvement
//
// When the loop ends, for whatever reason, the returned model is
// rebuilt from the record taken at the best validation epoch.
// A plain model.clone() is not a snapshot: batch-norm running
// statistics live behind a shared lock and keep moving with the
// live model. into_record() copies their values out.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::Rng;
use std::time::Instant;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::build_loader, dataset::TensorBatch};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::early_stopping::{EarlyStopping, Verdict};
use crate::ml::evaluator::evaluate;
use crate::ml::model::{correct_predictions, EmotionCnn, EmotionCnnConfig};

/// Frozen copy of every parameter and running statistic.
pub type ModelSnapshot<B> = <EmotionCnn<B> as Module<B>>::Record;

/// Copy the model's current state out of any shared storage.
pub fn snapshot<B: Backend>(model: &EmotionCnn<B>) -> ModelSnapshot<B> {
    model.clone().into_record()
}

/// Fresh module tree loaded from a snapshot.
pub fn restore<B: Backend>(
    config:   &EmotionCnnConfig,
    snapshot: ModelSnapshot<B>,
    device:   &B::Device,
) -> EmotionCnn<B> {
    config.init::<B>(device).load_record(snapshot)
}

/// What a finished training run hands back.
pub struct TrainingOutcome<B: AutodiffBackend> {
    /// Parameters restored from `best_epoch`
    pub model:         EmotionCnn<B>,
    pub history:       Vec<EpochMetrics>,
    pub best_epoch:    usize,
    pub best_val_loss: f64,
    /// True when patience ran out or the loss diverged
    pub stopped_early: bool,
    pub seed:          u64,
}

/// Fail fast if a batch does not fit the network input.
/// Compared as [height, width, channels, num_classes].
pub fn check_input_shape(config: &EmotionCnnConfig, batch: &TensorBatch) -> PipelineResult<()> {
    let [_, h, w, c] = batch.image_shape();
    let [_, classes] = batch.label_shape();

    let expected = vec![config.height, config.width, 1, config.num_classes];
    let found    = vec![h, w, c, classes];
    if expected != found {
        return Err(PipelineError::InputShape { expected, found });
    }
    Ok(())
}

pub fn train<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    train:   &TensorBatch,
    valid:   &TensorBatch,
    metrics: &mut MetricsLogger,
    device:  &B::Device,
) -> Result<TrainingOutcome<B>> {
    ensure!(cfg.max_epochs > 0, "max_epochs must be at least 1");
    ensure!(!train.is_empty(), "training partition has no samples");
    ensure!(!valid.is_empty(), "validation partition has no samples");

    let model_cfg = cfg.model_config();
    check_input_shape(&model_cfg, train)?;
    check_input_shape(&model_cfg, valid)?;

    let seed = cfg.seed.unwrap_or_else(|| rand::thread_rng().gen());
    B::seed(seed);
    tracing::info!("Seed: {seed}");

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: EmotionCnn<B> = model_cfg.init(device);
    tracing::info!(
        "Model ready: {} parameters\n{}",
        model.num_params(),
        model_cfg.summary()
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new()
        .with_beta_1(cfg.beta_1 as f32)
        .with_beta_2(cfg.beta_2 as f32)
        .with_epsilon(cfg.epsilon as f32)
        .init();

    // ── Loaders: training reshuffles every pass, validation keeps order ───────
    let train_loader = build_loader::<B>(train, cfg.batch_size, Some(seed), device.clone());
    let valid_loader = build_loader::<B::InnerBackend>(valid, cfg.batch_size, None, device.clone());

    let mut stopper       = EarlyStopping::new(cfg.patience).with_min_delta(cfg.min_delta);
    let mut history       = Vec::new();
    let mut stopped_early = false;
    let mut last_epoch    = 0;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.max_epochs {
        last_epoch = epoch;
        let started = Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut samples  = 0usize;
        let mut diverged = false;

        for batch in train_loader.iter() {
            let n = batch.targets.dims()[0];
            let (loss, logits) = model.forward_loss(batch.images, batch.targets.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                diverged = true;
                break;
            }
            loss_sum += loss_val * n as f64;
            correct  += correct_predictions(logits, batch.targets);
            samples  += n;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        if diverged {
            tracing::warn!("Training loss became non-finite during epoch {epoch}; stopping");
            stopped_early = true;
            break;
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let val = evaluate(&model.valid(), &valid_loader);

        let row = EpochMetrics::new(
            epoch,
            loss_sum / samples.max(1) as f64,
            correct as f64 / samples.max(1) as f64,
            val.loss,
            val.accuracy,
        );
        println!(
            "Epoch {:>3}/{} | {:.1}s | loss={:.4} | accuracy={:.4} | val_loss={:.4} | val_accuracy={:.4}",
            epoch,
            cfg.max_epochs,
            started.elapsed().as_secs_f64(),
            row.train_loss,
            row.train_accuracy,
            row.val_loss,
            row.val_accuracy,
        );
        metrics.log(&row)?;

        let finite = row.is_finite();
        history.push(row);

        if !finite {
            tracing::warn!("Loss is non-finite at epoch {epoch}; stopping");
            stopped_early = true;
            break;
        }

        // ── Early stopping ────────────────────────────────────────────────────
        match stopper.observe(epoch, val.loss, || snapshot(&model)) {
            Verdict::Improved => {
                tracing::info!("val_loss improved to {:.4}", val.loss);
            }
            Verdict::Wait { epochs_without_improvement } => {
                tracing::info!(
                    "val_loss did not improve ({epochs_without_improvement}/{}); best {:.4} at epoch {}",
                    cfg.patience,
                    stopper.best_loss().unwrap_or(f64::NAN),
                    stopper.best_epoch().unwrap_or(0),
                );
            }
            Verdict::Stop => {
                tracing::info!(
                    "Early stopping at epoch {epoch}: no improvement for {} epochs",
                    cfg.patience
                );
                stopped_early = true;
                break;
            }
        }
    }

    let Some((best_epoch, best_val_loss, best_record)) = stopper.into_best() else {
        return Err(PipelineError::NonFiniteLoss { epoch: last_epoch }.into());
    };
    tracing::info!(
        "Restoring weights from epoch {best_epoch} (val_loss={best_val_loss:.4})"
    );

    Ok(TrainingOutcome {
        model: restore::<B>(&model_cfg, best_record, device),
        history,
        best_epoch,
        best_val_loss,
        stopped_early,
        seed,
    })
}
