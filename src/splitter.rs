//! Single-pass genome splitting
//!
//! The [`Splitter`] drives the whole pipeline over one FASTA source:
//! `SequenceSource -> BatchBuilder -> TrailingMerger -> BinWriter`.
//! Bases are read one line at a time and every batch is owned by exactly one stage at a time.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use crate::{
    BatchBuilder, BinSink, BinWriter, Config, DirSink, Result, SequenceSource, TrailingMerger,
};

/// Totals of a finished split
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Number of records read
    pub records: usize,

    /// Number of bases read over all records
    pub bases: usize,

    /// Number of batches written to a bin
    pub batches: usize,

    /// Number of batches without any G/C/A/T base
    pub discarded: usize,

    /// Number of terminal batches folded into their predecessor
    pub merged: usize,

    /// Batches written, per bin label
    pub per_bin: BTreeMap<u32, usize>,
}

/// Splits FASTA records into overlapping batches and writes them to GC bins
pub struct Splitter<S: BinSink> {
    builder: BatchBuilder,
    merger: TrailingMerger,
    writer: BinWriter<S>,
    records: usize,
    bases: usize,
}
impl<S: BinSink> Splitter<S> {
    /// Creates a splitter writing to `sink`, validating the configuration first
    pub fn new(config: &Config, sink: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: BatchBuilder::new(config),
            merger: TrailingMerger::new(config),
            writer: BinWriter::new(sink, config),
            records: 0,
            bases: 0,
        })
    }

    /// Processes every record of a source
    pub fn process<R: BufRead>(&mut self, source: &mut SequenceSource<R>) -> Result<()> {
        while let Some(name) = source.next_record() {
            let name = name?;
            self.builder.begin(name);
            let mut record_len = 0;

            while let Some(line) = source.next_line() {
                let line = line?;
                record_len += line.len();
                let merger = &mut self.merger;
                let writer = &mut self.writer;
                self.builder.feed(line, |batch| {
                    for ready in merger.offer(batch, false) {
                        writer.write(&ready)?;
                    }
                    Ok(())
                })?;
            }

            let n_full = self.builder.n_batches();
            let terminal = self.builder.finish();
            for ready in self.merger.offer(terminal, true) {
                self.writer.write(&ready)?;
            }

            if record_len == 0 {
                log::warn!("record {} has no bases", self.builder.name());
            } else {
                log::debug!(
                    "record {}: {record_len} bases, {} raw batches",
                    self.builder.name(),
                    n_full + 1
                );
            }
            self.records += 1;
            self.bases += record_len;
        }
        Ok(())
    }

    /// Releases any pending batch and flushes the sink
    pub fn finish(&mut self) -> Result<SplitSummary> {
        if let Some(batch) = self.merger.flush() {
            self.writer.write(&batch)?;
        }
        self.writer.flush()?;
        Ok(self.summary())
    }

    /// Totals so far
    #[must_use]
    pub fn summary(&self) -> SplitSummary {
        let stats = self.writer.stats();
        SplitSummary {
            records: self.records,
            bases: self.bases,
            batches: stats.written(),
            discarded: stats.discarded,
            merged: self.merger.n_merged(),
            per_bin: stats.per_bin.clone(),
        }
    }

    /// Consumes the splitter, returning its sink
    pub fn into_inner(self) -> Result<S> {
        self.writer.into_inner()
    }
}

/// Splits a FASTA file into `bin<label>.fa` files inside `outdir`
///
/// With `clean`, existing bin files in `outdir` are removed first; otherwise new batches are
/// appended to them.
pub fn split_genome<P, Q>(input: P, outdir: Q, config: &Config, clean: bool) -> Result<SplitSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (input, outdir) = (input.as_ref(), outdir.as_ref());
    config.validate()?;
    if clean {
        let removed = DirSink::clean(outdir)?;
        log::info!("removed {removed} bin files from {}", outdir.display());
    }

    log::info!(
        "splitting {} into {} (batch length {}, overlap {}, minimum {})",
        input.display(),
        outdir.display(),
        config.batch_length,
        config.batch_overlap,
        config.min_batch_length
    );
    let mut source = SequenceSource::from_path(input)?;
    let mut splitter = Splitter::new(config, DirSink::new(outdir)?)?;
    splitter.process(&mut source)?;
    let summary = splitter.finish()?;

    log::info!(
        "{} records, {} bases: {} batches written to {} bins ({} merged, {} discarded)",
        summary.records,
        summary.bases,
        summary.batches,
        summary.per_bin.len(),
        summary.merged,
        summary.discarded
    );
    Ok(summary)
}
