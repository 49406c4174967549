// ============================================================
// Layer 3 — Record Domain Types
// ============================================================
// A RawRecord is one validated CSV row:
//   - label:     emotion class id in [0, 6]
//   - partition: Training / PublicTest / PrivateTest
//   - pixels:    the untouched pixel string, parsed later
//                by the Preprocessor
//
// The pixel string stays a String here so that the loader can
// stay cheap; the Preprocessor owns pixel parsing and the
// width×height length check.
//
// Reference: Goodfellow et al. (2013) Challenges in Representation
//            Learning (FER-2013)
//            Rust Book §5 (Structs), §6 (Enums)

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::PipelineError;

// ─── Emotion ─────────────────────────────────────────────────────────────────
/// The seven FER-2013 emotion classes, in label-id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Emotion::Angry    => "Angry",
            Emotion::Disgust  => "Disgust",
            Emotion::Fear     => "Fear",
            Emotion::Happy    => "Happy",
            Emotion::Sad      => "Sad",
            Emotion::Surprise => "Surprise",
            Emotion::Neutral  => "Neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Partition ───────────────────────────────────────────────────────────────
/// The `Usage` column. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    Training,
    PublicTest,
    PrivateTest,
}

impl Partition {
    pub const ALL: [Partition; 3] = [
        Partition::Training,
        Partition::PublicTest,
        Partition::PrivateTest,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Partition::Training    => "Training",
            Partition::PublicTest  => "PublicTest",
            Partition::PrivateTest => "PrivateTest",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Partition::ALL
            .into_iter()
            .find(|p| p.tag() == s)
            .ok_or_else(|| format!("unknown usage tag '{s}'"))
    }
}

// ─── RawRecord ───────────────────────────────────────────────────────────────
/// One typed row of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Source line in the CSV file (header is line 1), kept for error messages
    pub line:      usize,
    pub label:     Emotion,
    pub partition: Partition,
    /// Whitespace-separated integers, row-major
    pub pixels:    String,
}

impl RawRecord {
    /// Validate the untyped CSV fields into a RawRecord.
    pub fn from_fields(
        line:   usize,
        label:  i64,
        usage:  &str,
        pixels: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let label = usize::try_from(label)
            .ok()
            .and_then(Emotion::from_index)
            .ok_or_else(|| {
                PipelineError::parse(
                    line,
                    format!("emotion label {label} is outside [0, {}]", Emotion::COUNT - 1),
                )
            })?;
        let partition = usage
            .parse::<Partition>()
            .map_err(|reason| PipelineError::parse(line, reason))?;

        Ok(Self { line, label, partition, pixels: pixels.into() })
    }
}

// ─── PartitionedDataset ──────────────────────────────────────────────────────
/// The three disjoint usage splits. Built once by a RecordSource
/// and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct PartitionedDataset {
    training:     Vec<RawRecord>,
    public_test:  Vec<RawRecord>,
    private_test: Vec<RawRecord>,
}

impl PartitionedDataset {
    /// Route every record into its partition. Order within a
    /// partition follows the input order.
    pub fn from_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let mut dataset = Self::default();
        for record in records {
            match record.partition {
                Partition::Training    => dataset.training.push(record),
                Partition::PublicTest  => dataset.public_test.push(record),
                Partition::PrivateTest => dataset.private_test.push(record),
            }
        }
        dataset
    }

    pub fn get(&self, partition: Partition) -> &[RawRecord] {
        match partition {
            Partition::Training    => &self.training,
            Partition::PublicTest  => &self.public_test,
            Partition::PrivateTest => &self.private_test,
        }
    }

    /// Training split
    pub fn training(&self) -> &[RawRecord] {
        &self.training
    }

    /// Validation split (monitored for early stopping)
    pub fn validation(&self) -> &[RawRecord] {
        &self.public_test
    }

    /// Held-out test split
    pub fn test(&self) -> &[RawRecord] {
        &self.private_test
    }

    pub fn total(&self) -> usize {
        self.training.len() + self.public_test.len() + self.private_test.len()
    }

    /// First partition with no rows, if any.
    pub fn first_empty(&self) -> Option<Partition> {
        Partition::ALL.into_iter().find(|p| self.get(*p).is_empty())
    }

    /// Number of rows per emotion class within one partition.
    pub fn class_counts(&self, partition: Partition) -> [usize; Emotion::COUNT] {
        let mut counts = [0usize; Emotion::COUNT];
        for record in self.get(partition) {
            counts[record.label.index()] += 1;
        }
        counts
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: usize, label: i64, usage: &str) -> RawRecord {
        RawRecord::from_fields(line, label, usage, "0 0").unwrap()
    }

    #[test]
    fn test_partition_tags_are_exact() {
        assert_eq!("Training".parse::<Partition>(), Ok(Partition::Training));
        assert_eq!("PublicTest".parse::<Partition>(), Ok(Partition::PublicTest));
        assert_eq!("PrivateTest".parse::<Partition>(), Ok(Partition::PrivateTest));
        assert!("training".parse::<Partition>().is_err());
        assert!(" Training".parse::<Partition>().is_err());
    }

    #[test]
    fn test_label_out_of_range_is_parse_error() {
        let err = RawRecord::from_fields(7, 7, "Training", "").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { line: 7, .. }));

        let err = RawRecord::from_fields(3, -1, "Training", "").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_unknown_usage_is_parse_error() {
        let err = RawRecord::from_fields(2, 0, "Validation", "").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_partitions_are_disjoint_and_cover_all_rows() {
        let records = vec![
            record(2, 0, "Training"),
            record(3, 1, "PublicTest"),
            record(4, 2, "Training"),
            record(5, 3, "PrivateTest"),
            record(6, 4, "PublicTest"),
        ];
        let total   = records.len();
        let dataset = PartitionedDataset::from_records(records);

        assert_eq!(dataset.training().len(), 2);
        assert_eq!(dataset.validation().len(), 2);
        assert_eq!(dataset.test().len(), 1);
        assert_eq!(dataset.total(), total);

        for p in Partition::ALL {
            assert!(dataset.get(p).iter().all(|r| r.partition == p));
        }
        assert_eq!(dataset.first_empty(), None);
    }

    #[test]
    fn test_first_empty_reports_missing_split() {
        let dataset = PartitionedDataset::from_records(vec![
            record(2, 0, "Training"),
            record(3, 0, "PrivateTest"),
        ]);
        assert_eq!(dataset.first_empty(), Some(Partition::PublicTest));
    }

    #[test]
    fn test_class_counts() {
        let dataset = PartitionedDataset::from_records(vec![
            record(2, 3, "Training"),
            record(3, 3, "Training"),
            record(4, 6, "Training"),
        ]);
        let counts = dataset.class_counts(Partition::Training);
        assert_eq!(counts[Emotion::Happy.index()], 2);
        assert_eq!(counts[Emotion::Neutral.index()], 1);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }
}
