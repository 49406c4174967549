// ============================================================
// Layer 4 — CSV Dataset Loader
// ============================================================
// Reads a FER-2013 style CSV and splits it by usage partition.
//
// Expected layout (header row required, column order free):
//
//   emotion,pixels,Usage
//   0,"70 80 82 72 ... 48*48 values",Training
//   2,"151 150 147 ...",PublicTest
//   ...
//
// Each row is deserialised with serde into CsvRow, then
// validated into a typed RawRecord (label range, exact usage
// tag). The pixel string is checked later by the Preprocessor.
//
// After loading, every partition must contain at least one row;
// training on an empty split would silently produce garbage.
//
// Reference: csv crate documentation (serde deserialisation)
//            Rust Book §9 (Error Handling)

use serde::Deserialize;
use std::{fs::File, io::BufReader, path::PathBuf};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::record::{Emotion, Partition, PartitionedDataset, RawRecord};
use crate::domain::traits::RecordSource;

/// One untyped CSV row, exactly as it appears on disk.
#[derive(Debug, Deserialize)]
struct CsvRow {
    emotion: i64,
    #[serde(rename = "Usage")]
    usage:   String,
    pixels:  String,
}

/// Loads the three partitions from a CSV file.
/// Implements the RecordSource trait from Layer 3.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for CsvLoader {
    fn load_partitions(&self) -> PipelineResult<PartitionedDataset> {
        // Open the file ourselves so a missing file surfaces as Io,
        // not as a generic CSV error
        let file = File::open(&self.path).map_err(|source| PipelineError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(BufReader::new(file));

        let csv_error = |source| PipelineError::Csv { path: self.path.clone(), source };
        let headers   = reader.headers().map_err(csv_error)?.clone();

        let mut records = Vec::new();
        let mut raw     = csv::StringRecord::new();
        while reader.read_record(&mut raw).map_err(csv_error)? {
            // Physical line where the record starts; a quoted field
            // may span several lines
            let line = raw.position().map_or(0, |p| p.line() as usize);
            let row: CsvRow = raw.deserialize(Some(&headers)).map_err(csv_error)?;
            records.push(RawRecord::from_fields(line, row.emotion, &row.usage, row.pixels)?);
        }

        let dataset = PartitionedDataset::from_records(records);
        tracing::info!(
            "Loaded {} rows from '{}'",
            dataset.total(),
            self.path.display()
        );
        log_distribution(&dataset);

        if let Some(empty) = dataset.first_empty() {
            return Err(PipelineError::EmptyPartition(empty));
        }

        Ok(dataset)
    }
}

/// Log row counts and class distribution per partition.
fn log_distribution(dataset: &PartitionedDataset) {
    for partition in Partition::ALL {
        let counts = dataset.class_counts(partition);
        let summary = Emotion::ALL
            .iter()
            .zip(counts.iter())
            .map(|(emotion, n)| format!("{emotion}={n}"))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(
            "{:<11} {:>6} rows [{}]",
            partition.tag(),
            dataset.get(partition).len(),
            summary
        );
    }
}
