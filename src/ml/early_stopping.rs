// ============================================================
// Layer 5 — Early Stopping
// ============================================================
// Watches the validation loss after every epoch and keeps a
// snapshot of the state from the best epoch so far.
//
//   epoch  val_loss  best   wait   verdict
//   1      1.80      1.80   0      Improved   (snapshot taken)
//   2      1.75      1.75   0      Improved   (snapshot taken)
//   3      1.77      1.75   1      Wait
//   ...
//   12     1.79      1.75   10     Stop       (patience = 10)
//
// When training ends the caller takes the snapshot back with
// `into_best()`, so the restored parameters are those of the
// best validation epoch, never those of the last one.
//
// Improvement means strictly lower by more than `min_delta`.
// NaN never counts as an improvement.
//
// The snapshot type is generic: the trainer stores a model,
// tests store plain values.

/// Outcome of observing one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// New best loss; snapshot replaced
    Improved,
    /// No improvement yet, still within patience
    Wait { epochs_without_improvement: usize },
    /// Patience exhausted, stop training
    Stop,
}

pub struct EarlyStopping<S> {
    patience:  usize,
    min_delta: f64,
    best:      Option<(usize, f64, S)>,
    wait:      usize,
}

impl<S> EarlyStopping<S> {
    pub fn new(patience: usize) -> Self {
        Self { patience, min_delta: 0.0, best: None, wait: 0 }
    }

    pub fn with_min_delta(mut self, min_delta: f64) -> Self {
        self.min_delta = min_delta.abs();
        self
    }

    /// Record the validation loss of `epoch`. `snapshot` is only
    /// called when the epoch is a new best.
    pub fn observe(&mut self, epoch: usize, val_loss: f64, snapshot: impl FnOnce() -> S) -> Verdict {
        let improved = !val_loss.is_nan()
            && match &self.best {
                None               => true,
                Some((_, best, _)) => val_loss < *best - self.min_delta,
            };

        if improved {
            self.best = Some((epoch, val_loss, snapshot()));
            self.wait = 0;
            return Verdict::Improved;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            Verdict::Stop
        } else {
            Verdict::Wait { epochs_without_improvement: self.wait }
        }
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best.as_ref().map(|(epoch, _, _)| *epoch)
    }

    pub fn best_loss(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, loss, _)| *loss)
    }

    /// (epoch, loss, snapshot) of the best epoch, if any epoch improved.
    pub fn into_best(self) -> Option<(usize, f64, S)> {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a loss curve, snapshotting the epoch number, and return
    /// (epochs actually run, restored snapshot).
    fn run(losses: &[f64], patience: usize) -> (usize, Option<usize>) {
        let mut stopper = EarlyStopping::new(patience);
        let mut ran     = 0;
        for (i, &loss) in losses.iter().enumerate() {
            let epoch = i + 1;
            ran = epoch;
            if stopper.observe(epoch, loss, || epoch) == Verdict::Stop {
                break;
            }
        }
        (ran, stopper.into_best().map(|(_, _, s)| s))
    }

    #[test]
    fn test_stops_after_patience_and_restores_best() {
        // Best at epoch 3, then 10 epochs without improvement
        let mut losses = vec![1.0, 0.8, 0.5];
        losses.extend(std::iter::repeat(0.6).take(15));

        let (ran, restored) = run(&losses, 10);
        assert_eq!(ran, 13);
        assert_eq!(restored, Some(3));
    }

    #[test]
    fn test_restored_state_is_not_last_epoch() {
        let losses = [2.0, 1.0, 1.5, 1.4, 1.3, 1.2, 1.1, 1.05, 1.02, 1.01, 1.001, 1.0005];
        let (ran, restored) = run(&losses, 10);
        assert_eq!(ran, 12);
        assert_eq!(restored, Some(2));
    }

    #[test]
    fn test_equal_loss_is_not_an_improvement() {
        let mut stopper = EarlyStopping::new(2);
        assert_eq!(stopper.observe(1, 0.5, || 1), Verdict::Improved);
        assert_eq!(
            stopper.observe(2, 0.5, || 2),
            Verdict::Wait { epochs_without_improvement: 1 }
        );
        assert_eq!(stopper.observe(3, 0.5, || 3), Verdict::Stop);
        assert_eq!(stopper.best_epoch(), Some(1));
    }

    #[test]
    fn test_improvement_resets_wait() {
        let losses = [1.0, 1.1, 1.1, 0.9, 1.0, 1.0];
        let (ran, restored) = run(&losses, 3);
        // Improvement at epoch 4 resets the counter; 5 and 6 only wait
        assert_eq!(ran, 6);
        assert_eq!(restored, Some(4));
    }

    #[test]
    fn test_nan_never_improves() {
        let mut stopper = EarlyStopping::new(5);
        assert!(matches!(stopper.observe(1, f64::NAN, || 1), Verdict::Wait { .. }));
        assert_eq!(stopper.best_epoch(), None);
        assert_eq!(stopper.observe(2, 3.0, || 2), Verdict::Improved);
        assert!(matches!(stopper.observe(3, f64::NAN, || 3), Verdict::Wait { .. }));
        assert_eq!(stopper.best_loss(), Some(3.0));
    }

    #[test]
    fn test_min_delta() {
        let mut stopper = EarlyStopping::new(10).with_min_delta(0.1);
        stopper.observe(1, 1.0, || ());
        assert!(matches!(stopper.observe(2, 0.95, || ()), Verdict::Wait { .. }));
        assert_eq!(stopper.observe(3, 0.85, || ()), Verdict::Improved);
    }

    #[test]
    fn test_snapshot_only_taken_on_improvement() {
        let mut stopper = EarlyStopping::new(10);
        let mut taken   = 0;
        for (epoch, loss) in [(1, 1.0), (2, 2.0), (3, 0.5), (4, 0.7)] {
            stopper.observe(epoch, loss, || {
                taken += 1;
                epoch
            });
        }
        assert_eq!(taken, 2);
    }
}
