// ============================================================
// Layer 6 — Training History Logger
// ============================================================
// Records per-epoch metrics to a CSV file while training runs.
//
// Metrics recorded per epoch:
//   - epoch:          the epoch number (1, 2, 3, ...)
//   - train_loss:     mean categorical cross-entropy on the training set
//   - train_accuracy: fraction of training faces classified correctly
//   - val_loss:       mean cross-entropy on the validation set
//                     (the value early stopping watches)
//   - val_accuracy:   fraction of validation faces classified correctly
//
// Output file: <output_dir>/training_history.csv
//
// Example CSV output:
//   epoch,train_loss,train_accuracy,val_loss,val_accuracy
//   1,1.812345,0.251,1.7012,0.302
//   2,1.6031,0.362,1.5883,0.381
//   ...
//
// Reading the curve:
//   - val_loss rising while train_loss falls → overfitting;
//     early stopping will restore the epoch with the lowest val_loss
//
// The header comes from EpochMetrics' serde field names and is
// written together with the first row. Every row is flushed so
// the file can be watched while training runs.
//
// Reference: csv crate documentation (serde serialisation)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

pub const HISTORY_FILE: &str = "training_history.csv";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Sample-weighted mean loss over all training batches
    pub train_loss: f64,

    /// Range: [0.0, 1.0]
    pub train_accuracy: f64,

    /// Mean loss on the validation partition
    pub val_loss: f64,

    /// Range: [0.0, 1.0]
    pub val_accuracy: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:          usize,
        train_loss:     f64,
        train_accuracy: f64,
        val_loss:       f64,
        val_accuracy:   f64,
    ) -> Self {
        Self { epoch, train_loss, train_accuracy, val_loss, val_accuracy }
    }

    /// False when either loss is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.train_loss.is_finite() && self.val_loss.is_finite()
    }
}

/// Appends epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
    writer:   csv::Writer<File>,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Starts a fresh, empty CSV for every training run.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

        let csv_path = dir.join(HISTORY_FILE);
        let writer   = csv::Writer::from_path(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path, writer })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&mut self, m: &EpochMetrics) -> Result<()> {
        self.writer
            .serialize(m)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        self.writer.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_detection() {
        assert!(EpochMetrics::new(1, 1.2, 0.3, 1.1, 0.4).is_finite());
        assert!(!EpochMetrics::new(2, f64::NAN, 0.3, 1.1, 0.4).is_finite());
        assert!(!EpochMetrics::new(3, 1.0, 0.3, f64::INFINITY, 0.4).is_finite());
    }

    #[test]
    fn test_rows_are_appended_after_header() {
        let dir        = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 1.5, 0.25, 1.4, 0.3)).unwrap();
        logger.log(&EpochMetrics::new(2, 1.2, 0.40, 1.3, 0.35)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,train_accuracy,val_loss,val_accuracy");
        assert_eq!(lines[1], "1,1.5,0.25,1.4,0.3");
        assert!(lines[2].starts_with("2,"));
    }

    #[test]
    fn test_history_reads_back_into_epoch_metrics() {
        let dir        = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::create(dir.path()).unwrap();
        let rows       = [
            EpochMetrics::new(1, 1.8, 0.2, 1.7, 0.25),
            EpochMetrics::new(2, 1.6, 0.3, 1.65, 0.28),
        ];
        for row in &rows {
            logger.log(row).unwrap();
        }

        let mut reader = csv::Reader::from_path(logger.csv_path()).unwrap();
        let back: Vec<EpochMetrics> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_new_run_truncates_previous_history() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::create(dir.path())
            .unwrap()
            .log(&EpochMetrics::new(1, 1.0, 0.1, 1.0, 0.1))
            .unwrap();

        let logger = MetricsLogger::create(dir.path()).unwrap();
        let text   = fs::read_to_string(logger.csv_path()).unwrap();
        assert!(text.is_empty());
    }
}
