// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits rather
// than concrete loaders, so a different source (a parquet file,
// an in-memory fixture) only needs a new implementation.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::error::PipelineResult;
use crate::domain::record::PartitionedDataset;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the three usage partitions.
///
/// Implementations:
///   - CsvLoader → reads a FER-2013 style CSV file
pub trait RecordSource {
    /// Load, validate and split every record.
    /// Fails if the source is unreadable, a row is malformed,
    /// or any partition ends up empty.
    fn load_partitions(&self) -> PipelineResult<PartitionedDataset>;
}
