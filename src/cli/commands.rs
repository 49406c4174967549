// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and
// their flags. Only paths and the seed are configurable;
// hyperparameters live in TrainConfig::default().
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → u64, PathBuf, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the emotion CNN and export model.json + model.bin (default)
    Train(TrainArgs),

    /// Score an exported model on the PrivateTest partition
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// FER-2013 CSV with emotion, pixels and Usage columns
    #[arg(long, default_value = "fer2013.csv")]
    pub dataset: String,

    /// Where model.json, model.bin and training_history.csv are written
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    /// Seed for weight init and shuffling; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset_path: a.dataset,
            output_dir:   a.output_dir,
            seed:         a.seed,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "fer2013.csv")]
    pub dataset: String,

    /// Directory holding model.json and model.bin
    #[arg(long, default_value = ".")]
    pub model_dir: String,
}
