//! # gcsplit
//!
//! Splits a genome FASTA file into fixed-size, overlapping batches and sorts every batch into
//! a bin by its GC background, so that downstream aligners can run on genome subsets of
//! near-uniform base composition.
//!
//! The engine is a single pass over the input:
//!
//! 1. [`SequenceSource`] reads records one line at a time.
//! 2. [`BatchBuilder`] cuts each record into batches of `batch_length` bases, repeating the
//!    last `batch_overlap` bases at the head of the next batch.
//! 3. [`TrailingMerger`] folds a terminal batch shorter than `min_batch_length` into its
//!    predecessor.
//! 4. [`BinWriter`] classifies each batch with a [`GcClassifier`] and appends it to its bin.
//!
//! ```
//! # use gcsplit::{ConfigBuilder, MemorySink, Result, SequenceSource, Splitter};
//! # fn main() -> Result<()> {
//! let config = ConfigBuilder::default()
//!     .batch_length(8)
//!     .batch_overlap(2)
//!     .min_batch_length(4)
//!     .build()?;
//! let mut source = SequenceSource::new(&b">chr1\nGGGGCCCCAT\nATATATAT\n"[..]);
//! let mut splitter = Splitter::new(&config, MemorySink::new())?;
//! splitter.process(&mut source)?;
//! let summary = splitter.finish()?;
//! assert_eq!(summary.batches, 3);
//!
//! let bins = splitter.into_inner()?;
//! assert_eq!(bins.get(53), Some(&b">chr1:1-8\nGGGGCCCC\n"[..]));
//! # Ok(())
//! # }
//! ```

mod batch;
mod classify;
mod composition;
mod config;
mod error;
pub mod logging;
mod merger;
mod source;
mod splitter;
mod verify;
mod writer;

pub use batch::{Batch, BatchBuilder, BuilderState};
pub use classify::{Bin, GcClassifier};
pub use composition::Composition;
pub use config::{
    Config, ConfigBuilder, DEFAULT_BATCH_LENGTH, DEFAULT_BATCH_OVERLAP, DEFAULT_BINS,
    DEFAULT_MIN_BATCH_LENGTH,
};
pub use error::{ConfigError, Error, FormatError, Result};
pub use merger::{Released, TrailingMerger};
pub use source::{BoxedReader, SequenceSource, HEADER_MARKER};
pub use splitter::{split_genome, SplitSummary, Splitter};
pub use verify::{parse_batch_name, verify_bins, BatchName, Issue, VerifyReport};
pub use writer::{
    bin_file_name, parse_bin_file_name, write_entry, BinSink, BinWriter, DirSink, MemorySink,
    WriteStats,
};
