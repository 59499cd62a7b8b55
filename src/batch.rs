//! Batches and the per-record batch builder
//!
//! A [`BatchBuilder`] accumulates the bases of one record into batches of at most
//! `batch_length` bases. Whenever a batch fills up it is handed out, and the next batch of the
//! same record is seeded with the last `batch_overlap` bases of the finished one so that
//! features spanning a boundary appear whole in at least one batch.

use crate::{Composition, Config, Result};

/// A contiguous slice of one record's bases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Name of the record the bases belong to
    name: String,

    /// Zero-based offset of the first base within the record
    start: usize,

    /// Bases of the batch
    seq: Vec<u8>,

    /// Counts over every base of `seq`
    composition: Composition,
}
impl Batch {
    /// Creates a batch, counting the composition of `seq`
    #[must_use]
    pub fn new(name: impl Into<String>, start: usize, seq: Vec<u8>) -> Self {
        let composition = Composition::count(&seq);
        Self {
            name: name.into(),
            start,
            seq,
            composition,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based inclusive start offset
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Zero-based exclusive end offset
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.seq.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    #[must_use]
    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    #[must_use]
    pub fn composition(&self) -> Composition {
        self.composition
    }

    /// Number of bases that are neither G/C nor A/T
    #[must_use]
    pub fn ambiguous(&self) -> usize {
        self.seq.len() - self.composition.informative() as usize
    }

    /// Header text of the batch: `name:start-end` with one-based inclusive offsets
    #[must_use]
    pub fn batch_name(&self) -> String {
        format!("{}:{}-{}", self.name, self.start + 1, self.end())
    }

    /// Appends the bases of the following batch that lie past the shared overlap
    ///
    /// Only the appended suffix is counted. `next` must directly follow this batch in the
    /// same record.
    pub fn absorb(&mut self, next: &Batch, overlap: usize) {
        debug_assert_eq!(self.name, next.name);
        debug_assert_eq!(next.start + overlap, self.end());
        let tail = next.seq.get(overlap..).unwrap_or_default();
        self.composition.add(tail);
        self.seq.extend_from_slice(tail);
    }

    /// Consumes the batch, returning its bases
    #[must_use]
    pub fn into_seq(self) -> Vec<u8> {
        self.seq
    }
}

/// State of the builder for the current record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// No record has been started
    Idle,
    /// Bases are being appended to the current batch
    Accumulating,
    /// The current batch reached `batch_length` and must be rolled over
    Full,
}

/// Splits the bases of one record at a time into overlapping batches
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    batch_length: usize,
    batch_overlap: usize,

    /// Name of the current record
    name: String,

    /// Zero-based start of the batch being accumulated
    start: usize,

    /// Bases of the batch being accumulated
    seq: Vec<u8>,

    /// Counts over `seq`
    composition: Composition,

    /// Number of batches completed for the current record
    n_batches: usize,

    state: BuilderState,
}
impl BatchBuilder {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            batch_length: config.batch_length,
            batch_overlap: config.batch_overlap,
            name: String::new(),
            start: 0,
            seq: Vec::with_capacity(config.batch_length),
            composition: Composition::default(),
            n_batches: 0,
            state: BuilderState::Idle,
        }
    }

    /// Starts a new record, discarding any state of the previous one
    pub fn begin(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.start = 0;
        self.seq.clear();
        self.composition = Composition::default();
        self.n_batches = 0;
        self.state = BuilderState::Accumulating;
    }

    #[must_use]
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Name of the current record
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bases accumulated in the current batch
    #[must_use]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Number of batches completed for the current record
    #[must_use]
    pub fn n_batches(&self) -> usize {
        self.n_batches
    }

    /// Appends as many bases as fit in the current batch
    ///
    /// Returns the number of bases consumed. The builder turns [`BuilderState::Full`] when the
    /// batch reaches `batch_length`.
    pub fn extend(&mut self, bases: &[u8]) -> usize {
        debug_assert_eq!(self.state, BuilderState::Accumulating);
        let take = (self.batch_length - self.seq.len()).min(bases.len());
        let append = &bases[..take];
        self.composition.add(append);
        self.seq.extend_from_slice(append);
        if self.seq.len() == self.batch_length {
            self.state = BuilderState::Full;
        }
        take
    }

    /// Completes the full batch and seeds the next one with its overlap
    ///
    /// The seed is counted once, as the initial content of the new batch.
    pub fn roll(&mut self) -> Batch {
        debug_assert_eq!(self.state, BuilderState::Full);
        let carry = self.seq[self.seq.len() - self.batch_overlap..].to_vec();
        let batch = self.take_batch(carry);
        self.n_batches += 1;
        self.state = BuilderState::Accumulating;
        batch
    }

    /// Feeds one line of bases, handing out every batch that fills up
    ///
    /// A single line may complete several batches.
    pub fn feed<F>(&mut self, mut bases: &[u8], mut on_full: F) -> Result<()>
    where
        F: FnMut(Batch) -> Result<()>,
    {
        while !bases.is_empty() {
            let consumed = self.extend(bases);
            bases = &bases[consumed..];
            if self.state == BuilderState::Full {
                on_full(self.roll())?;
            }
        }
        Ok(())
    }

    /// Ends the current record, returning its terminal batch
    ///
    /// The terminal batch may be short. When the record ended exactly at a batch boundary it
    /// holds only the overlap seed, which the merger folds back into its predecessor.
    pub fn finish(&mut self) -> Batch {
        let batch = self.take_batch(Vec::with_capacity(self.batch_length));
        self.state = BuilderState::Idle;
        batch
    }

    /// Swaps out the current batch, starting a new one with `seed`
    fn take_batch(&mut self, seed: Vec<u8>) -> Batch {
        let start = self.start;
        let seq = std::mem::replace(&mut self.seq, seed);
        let composition = std::mem::replace(&mut self.composition, Composition::count(&self.seq));
        self.start = start + seq.len() - self.seq.len();
        Batch {
            name: self.name.clone(),
            start,
            seq,
            composition,
        }
    }
}
