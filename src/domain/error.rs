// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Every failure that must abort the pipeline before a model is
// exported. Application code wraps these in anyhow::Error with
// extra context; tests match on the concrete variant.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::record::Partition;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The dataset file is missing or unreadable.
    #[error("cannot read dataset '{}': {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV itself is malformed (bad quoting, missing columns, non-integer label).
    #[error("malformed CSV '{}': {source}", path.display())]
    Csv {
        path:   PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A field could not be turned into a typed value.
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Image and label arrays disagree on the number of samples.
    #[error("shape mismatch: {images} images but {labels} labels")]
    ShapeMismatch { images: usize, labels: usize },

    /// A usage partition yielded zero rows.
    #[error("partition '{0}' contains no rows")]
    EmptyPartition(Partition),

    /// A batch does not match the declared network input.
    #[error("input shape mismatch: network expects {expected:?}, got {found:?}")]
    InputShape { expected: Vec<usize>, found: Vec<usize> },

    /// Training produced NaN/inf before any usable epoch was recorded.
    #[error("loss became non-finite at epoch {epoch} before any finite validation loss was seen")]
    NonFiniteLoss { epoch: usize },
}

impl PipelineError {
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse { line, reason: reason.into() }
    }
}
