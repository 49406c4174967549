// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — the default; trains, scores and exports
//   2. `evaluate` — reloads an export and scores it again
//
// Running with no subcommand is the same as `train`, so
// `face-emotion-cnn --dataset fer2013.csv` works too.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::backend::{wgpu::WgpuDevice, Autodiff, Wgpu};
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::application::evaluate_use_case::TestReport;
use crate::domain::record::Emotion;

type TrainBackend = Autodiff<Wgpu>;
type EvalBackend  = Wgpu;

#[derive(Parser, Debug)]
#[command(
    name = "face-emotion-cnn",
    version = "0.1.0",
    about = "Train a CNN on FER-2013 faces and export it as model.json + model.bin.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments for the implicit `train` command
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Some(Commands::Train(args))    => run_train(args),
            Some(Commands::Evaluate(args)) => run_evaluate(args),
            None                           => run_train(self.train),
        }
    }
}

/// Handles the `train` subcommand.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let device = WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    let report = TrainUseCase::new(args.into()).execute::<TrainBackend>(&device)?;

    println!(
        "\nTrained {} epochs{}; best epoch {} with val_loss {:.4} (seed {})",
        report.history.len(),
        if report.stopped_early { " (stopped early)" } else { "" },
        report.best_epoch,
        report.best_val_loss,
        report.seed,
    );
    print_test_report(&report.test);
    println!(
        "Saved {} and {}",
        report.artifact.architecture.display(),
        report.artifact.weights.display()
    );
    Ok(())
}

/// Handles the `evaluate` subcommand.
fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let device = WgpuDevice::default();
    let report = EvaluateUseCase::new(&args.dataset, &args.model_dir)
        .execute::<EvalBackend>(&device)?;
    print_test_report(&report);
    Ok(())
}

fn print_test_report(report: &TestReport) {
    let names: Vec<&str> = Emotion::ALL.iter().map(|e| e.name()).collect();

    println!("Test loss:       {:.4}", report.evaluation.loss);
    println!("Test accuracy:   {:.4}", report.evaluation.accuracy);
    println!(
        "Argmax accuracy: {:.4} ({})",
        report.argmax_accuracy,
        if report.accuracies_agree() { "agrees" } else { "DISAGREES with test accuracy" }
    );
    println!("\n{}", report.confusion.report(&names));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_train() {
        let cli = Cli::try_parse_from(["face-emotion-cnn", "--dataset", "x.csv", "--seed", "5"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.train.dataset, "x.csv");
        assert_eq!(cli.train.seed, Some(5));
        assert_eq!(cli.train.output_dir, ".");
    }

    #[test]
    fn test_evaluate_subcommand() {
        let cli = Cli::try_parse_from(["face-emotion-cnn", "evaluate", "--model-dir", "out"]).unwrap();
        match cli.command {
            Some(Commands::Evaluate(args)) => {
                assert_eq!(args.model_dir, "out");
                assert_eq!(args.dataset, "fer2013.csv");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_hyperparameters_are_not_flags() {
        assert!(Cli::try_parse_from(["face-emotion-cnn", "train", "--epochs", "3"]).is_err());
    }
}
