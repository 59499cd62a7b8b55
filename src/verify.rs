//! Consistency checks over a directory of bin files
//!
//! [`verify_bins`] reads every `bin<label>.fa` file back and checks that each batch sits in the
//! right bin, that batch lengths and overlaps follow the configuration, and optionally that
//! every batch matches the genome it was cut from.
//!
//! All batches of the directory are held in memory while they are checked.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{FormatError, Result};
use crate::writer::parse_bin_file_name;
use crate::{Bin, Composition, Config, GcClassifier, SequenceSource};

/// Location of a batch parsed from a bin header (`name:start-end`, one-based, inclusive)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BatchName {
    pub name: String,
    pub start: usize,
    pub end: usize,
}
impl fmt::Display for BatchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.name, self.start, self.end)
    }
}

/// Parses a bin header of the form `name:start-end`
///
/// The record name may itself contain `:`, the span follows the last one.
pub fn parse_batch_name(header: &str) -> Result<BatchName> {
    let invalid = || FormatError::InvalidBatchName(header.to_string());
    let colon = memchr::memrchr(b':', header.as_bytes()).ok_or_else(invalid)?;
    let span = &header[colon + 1..];
    let dash = memchr::memchr(b'-', span.as_bytes()).ok_or_else(invalid)?;
    let start: usize = span[..dash].parse().map_err(|_| invalid())?;
    let end: usize = span[dash + 1..].parse().map_err(|_| invalid())?;
    if start == 0 || end < start {
        return Err(invalid().into());
    }
    Ok(BatchName {
        name: header[..colon].to_string(),
        start,
        end,
    })
}

/// A problem found in the bins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// The header span does not match the number of bases
    SpanMismatch { batch: BatchName, len: usize },

    /// The batch composition classifies to another bin
    WrongBin {
        batch: BatchName,
        label: u32,
        expected: Bin,
    },

    /// A batch followed by another batch of its record is not `batch_length` long, or a
    /// terminal batch is longer than a merge can make it
    BadLength { batch: BatchName, len: usize },

    /// Two consecutive batches do not start a whole number of strides apart
    BadStride { prev: BatchName, next: BatchName },

    /// The overlap of two adjacent batches differs
    OverlapMismatch { prev: BatchName, next: BatchName },

    /// The bases of a batch differ from the source record
    SourceMismatch { batch: BatchName },

    /// The batches of a gap-free record do not end where the source record ends
    Coverage {
        record: String,
        covered: usize,
        len: usize,
    },

    /// A batch names a record that is not in the source
    UnknownRecord { record: String },
}
impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpanMismatch { batch, len } => {
                write!(f, "{batch}: header span does not match {len} bases")
            }
            Self::WrongBin {
                batch,
                label,
                expected,
            } => write!(f, "{batch}: found in bin{label}, belongs to {expected}"),
            Self::BadLength { batch, len } => write!(f, "{batch}: unexpected length {len}"),
            Self::BadStride { prev, next } => {
                write!(f, "{prev} -> {next}: starts are not a stride apart")
            }
            Self::OverlapMismatch { prev, next } => write!(f, "{prev} -> {next}: overlap differs"),
            Self::SourceMismatch { batch } => write!(f, "{batch}: differs from the source"),
            Self::Coverage {
                record,
                covered,
                len,
            } => write!(f, "{record}: batches cover {covered} of {len} bases"),
            Self::UnknownRecord { record } => write!(f, "{record}: not found in the source"),
        }
    }
}

/// Outcome of [`verify_bins`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of bin files read
    pub files: usize,

    /// Number of batches read
    pub batches: usize,

    /// Number of distinct records among the batches
    pub records: usize,

    pub issues: Vec<Issue>,
}
impl VerifyReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A batch read back from a bin file
#[derive(Debug)]
struct Entry {
    batch: BatchName,
    label: u32,
    seq: Vec<u8>,
}

/// Reads every batch of one bin file
fn read_bin(path: &Path, label: u32, entries: &mut Vec<Entry>) -> Result<()> {
    let mut source = SequenceSource::from_path(path)?;
    while let Some(header) = source.next_record() {
        let batch = parse_batch_name(&header?)?;
        let mut seq = Vec::with_capacity(batch.end - batch.start + 1);
        while let Some(line) = source.next_line() {
            seq.extend_from_slice(line?);
        }
        entries.push(Entry { batch, label, seq });
    }
    Ok(())
}

/// Checks the batches of one record, sorted by start
fn check_record(entries: &[Entry], config: &Config, issues: &mut Vec<Issue>) {
    let overlap = config.batch_overlap;
    for (idx, entry) in entries.iter().enumerate() {
        let len = entry.seq.len();
        let is_last = idx + 1 == entries.len();
        let bad_length = if is_last {
            len >= config.batch_length + config.min_batch_length
        } else {
            len != config.batch_length
        };
        if bad_length {
            issues.push(Issue::BadLength {
                batch: entry.batch.clone(),
                len,
            });
        }
    }

    for pair in entries.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let distance = next.batch.start.checked_sub(prev.batch.start);
        match distance {
            Some(d) if d > 0 && d % config.stride() == 0 => {}
            _ => {
                issues.push(Issue::BadStride {
                    prev: prev.batch.clone(),
                    next: next.batch.clone(),
                });
                continue;
            }
        }
        // batches further apart had a discarded batch between them
        if distance != Some(config.stride()) || prev.seq.len() < overlap || next.seq.len() < overlap
        {
            continue;
        }
        if prev.seq[prev.seq.len() - overlap..] != next.seq[..overlap] {
            issues.push(Issue::OverlapMismatch {
                prev: prev.batch.clone(),
                next: next.batch.clone(),
            });
        }
    }
}

/// Compares the batches of every record with the source genome
fn check_source(
    source: &Path,
    records: &BTreeMap<String, Vec<Entry>>,
    config: &Config,
    issues: &mut Vec<Issue>,
) -> Result<()> {
    let mut reader = SequenceSource::from_path(source)?;
    let mut seen = Vec::new();
    let mut seq = Vec::new();
    while let Some(name) = reader.next_record() {
        let name = name?;
        let Some(entries) = records.get(&name) else {
            // every batch of this record was discarded
            continue;
        };
        seq.clear();
        while let Some(line) = reader.next_line() {
            seq.extend_from_slice(line?);
        }
        for entry in entries {
            let matches = seq
                .get(entry.batch.start - 1..entry.batch.end)
                .is_some_and(|region| region == entry.seq.as_slice());
            if !matches {
                issues.push(Issue::SourceMismatch {
                    batch: entry.batch.clone(),
                });
            }
        }
        let gap_free = entries.first().is_some_and(|e| e.batch.start == 1)
            && entries
                .windows(2)
                .all(|pair| pair[1].batch.start - pair[0].batch.start == config.stride());
        let covered = entries.last().map_or(0, |e| e.batch.end);
        // batches past the last written one were discarded if they hold no G/C/A/T
        let discarded_tail = covered < seq.len()
            && entries.last().is_some_and(|e| {
                seq.get(e.batch.start - 1 + config.stride()..)
                    .is_some_and(|tail| Composition::count(tail).informative() == 0)
            });
        if gap_free && covered != seq.len() && !discarded_tail {
            issues.push(Issue::Coverage {
                record: name.clone(),
                covered,
                len: seq.len(),
            });
        }
        seen.push(name);
    }
    for record in records.keys() {
        if !seen.contains(record) {
            issues.push(Issue::UnknownRecord {
                record: record.clone(),
            });
        }
    }
    Ok(())
}

/// Verifies the bin files inside `dir`
///
/// When `source` is given, every batch is also compared with the genome it was cut from.
pub fn verify_bins<P: AsRef<Path>>(
    dir: P,
    config: &Config,
    source: Option<&Path>,
) -> Result<VerifyReport> {
    config.validate()?;
    let dir = dir.as_ref();
    let classifier = GcClassifier::from_config(config);

    let mut bins = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(label) = entry.file_name().to_str().and_then(parse_bin_file_name) {
            bins.push((label, entry.path()));
        }
    }
    bins.sort();

    let mut report = VerifyReport {
        files: bins.len(),
        ..VerifyReport::default()
    };
    let mut entries = Vec::new();
    for (label, path) in &bins {
        log::debug!("reading {}", path.display());
        read_bin(path, *label, &mut entries)?;
    }
    report.batches = entries.len();

    let mut records: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
    for entry in entries {
        if entry.batch.end - entry.batch.start + 1 != entry.seq.len() {
            report.issues.push(Issue::SpanMismatch {
                batch: entry.batch.clone(),
                len: entry.seq.len(),
            });
        }
        let expected = classifier.classify(Composition::count(&entry.seq));
        if expected != Bin::Label(entry.label) {
            report.issues.push(Issue::WrongBin {
                batch: entry.batch.clone(),
                label: entry.label,
                expected,
            });
        }
        records
            .entry(entry.batch.name.clone())
            .or_default()
            .push(entry);
    }
    report.records = records.len();

    for entries in records.values_mut() {
        entries.sort_by_key(|e| e.batch.start);
        check_record(entries, config, &mut report.issues);
    }
    if let Some(source) = source {
        check_source(source, &records, config, &mut report.issues)?;
    }

    log::info!(
        "verified {} batches of {} records in {} bins: {} issues",
        report.batches,
        report.records,
        report.files,
        report.issues.len()
    );
    Ok(report)
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{split_genome, ConfigBuilder, Error};

    fn config() -> Config {
        ConfigBuilder::default()
            .batch_length(12)
            .batch_overlap(3)
            .min_batch_length(6)
            .row_width(5)
            .build()
            .unwrap()
    }

    fn genome() -> Vec<u8> {
        let mut fasta = Vec::new();
        fasta.extend_from_slice(b">chr1 test\nACGTTGCAACGTAGGCTAGCTAGGATCCA\nTTAGGCCAATGCGATCGAT\n");
        fasta.extend_from_slice(b">chrUn:scaffold\nNNNNNNNNNNNNNNNNNNNNGCGCATAT\n");
        fasta.extend_from_slice(b">chr2\nAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA\n");
        fasta
    }

    #[test]
    fn test_parse_batch_name() -> Result<()> {
        let batch = parse_batch_name("chr1:58001-130000")?;
        assert_eq!(batch.name, "chr1");
        assert_eq!((batch.start, batch.end), (58_001, 130_000));
        assert_eq!(batch.to_string(), "chr1:58001-130000");

        let scaffold = parse_batch_name("chrUn:scaffold:1-12")?;
        assert_eq!(scaffold.name, "chrUn:scaffold");

        for bad in ["chr1", "chr1:10", "chr1:0-5", "chr1:9-3", "chr1:a-b"] {
            assert!(matches!(
                parse_batch_name(bad),
                Err(Error::FormatError(FormatError::InvalidBatchName(_)))
            ));
        }
        Ok(())
    }

    #[test]
    fn test_split_then_verify() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("genome.fa");
        let outdir = dir.path().join("bins");
        fs::write(&input, genome())?;

        let summary = split_genome(&input, &outdir, &config(), false)?;
        let report = verify_bins(&outdir, &config(), Some(&input))?;
        assert!(report.is_ok(), "{:?}", report.issues);
        assert_eq!(report.batches, summary.batches);
        assert_eq!(report.records, 3);
        assert_eq!(report.files, summary.per_bin.len());
        Ok(())
    }

    #[test]
    fn test_record_with_discarded_tail() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("genome.fa");
        let outdir = dir.path().join("bins");
        let mut fasta = b">chr1\nACGTACGTACGT".to_vec();
        fasta.extend_from_slice(&[b'N'; 30]);
        fasta.push(b'\n');
        fs::write(&input, &fasta)?;

        let summary = split_genome(&input, &outdir, &config(), false)?;
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.discarded, 3);
        let report = verify_bins(&outdir, &config(), Some(&input))?;
        assert!(report.is_ok(), "{:?}", report.issues);

        // the same bins no longer cover a source whose tail holds bases
        let longer = dir.path().join("longer.fa");
        let mut fasta = b">chr1\nACGTACGTACGT".to_vec();
        fasta.extend_from_slice(&[b'N'; 20]);
        fasta.extend_from_slice(b"ACGTACGTAC\n");
        fs::write(&longer, &fasta)?;
        let report = verify_bins(&outdir, &config(), Some(&longer))?;
        assert_eq!(
            report.issues,
            vec![Issue::Coverage {
                record: "chr1".to_string(),
                covered: 21,
                len: 42,
            }]
        );
        Ok(())
    }

    #[test]
    fn test_detects_misplaced_batch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("bin35.fa"), b">s:1-4\nGGCC\n")?;
        let report = verify_bins(dir.path(), &Config::default(), None)?;
        assert_eq!(
            report.issues,
            vec![Issue::WrongBin {
                batch: parse_batch_name("s:1-4")?,
                label: 35,
                expected: Bin::Label(53),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_detects_overlap_and_span_errors() -> Result<()> {
        let dir = tempfile::tempdir()?;
        // both batches are 50% GC; the second should start with "CGT" and is one base short
        fs::write(
            dir.path().join("bin49.fa"),
            b">s:1-12\nACGTACGTACGT\n>s:10-21\nGGGNAAATTCC\n",
        )?;
        let report = verify_bins(dir.path(), &config(), None)?;
        let kinds: Vec<&str> = report
            .issues
            .iter()
            .map(|issue| match issue {
                Issue::SpanMismatch { .. } => "span",
                Issue::OverlapMismatch { .. } => "overlap",
                Issue::WrongBin { .. } => "bin",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["span", "overlap"]);
        Ok(())
    }

    #[test]
    fn test_detects_source_mismatch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("genome.fa");
        let outdir = dir.path().join("bins");
        fs::write(&input, genome())?;
        split_genome(&input, &outdir, &config(), false)?;

        let other = dir.path().join("other.fa");
        fs::write(&other, b">chr1\nACGTTGCAACGTAGGCTAGCTAGGATCCA\n>chr3\nACGT\n")?;
        let report = verify_bins(&outdir, &config(), Some(&other))?;
        assert!(report
            .issues
            .iter()
            .any(|issue| matches!(issue, Issue::SourceMismatch { .. })));
        assert!(report.issues.contains(&Issue::UnknownRecord {
            record: "chr2".to_string()
        }));
        Ok(())
    }
}
