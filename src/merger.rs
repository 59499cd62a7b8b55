//! One-batch lookahead that folds undersized terminal batches into their predecessor
//!
//! The merger keeps at most one finished batch in a pending slot. The fate of that batch is
//! only decided once the next batch of its record, or the end of the record, is known:
//! a terminal batch shorter than `min_batch_length` is appended to the pending batch instead
//! of being released as a fragment.

use crate::{Batch, Config};

/// Batches released by a single [`TrailingMerger`] step, in emission order
#[derive(Debug, Default)]
pub struct Released {
    slots: [Option<Batch>; 2],
    pos: usize,
}
impl Released {
    fn none() -> Self {
        Self::default()
    }

    fn one(batch: Batch) -> Self {
        Self {
            slots: [Some(batch), None],
            pos: 0,
        }
    }

    fn two(first: Batch, second: Batch) -> Self {
        Self {
            slots: [Some(first), Some(second)],
            pos: 0,
        }
    }
}
impl Iterator for Released {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        while self.pos < self.slots.len() {
            let slot = self.slots[self.pos].take();
            self.pos += 1;
            if slot.is_some() {
                return slot;
            }
        }
        None
    }
}

/// Buffers one batch to merge short terminal remainders
#[derive(Debug, Clone)]
pub struct TrailingMerger {
    batch_overlap: usize,
    min_batch_length: usize,

    /// The last batch received that has not been released
    pending: Option<Batch>,

    /// Number of terminal batches folded into their predecessor
    n_merged: usize,
}
impl TrailingMerger {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            batch_overlap: config.batch_overlap,
            min_batch_length: config.min_batch_length,
            pending: None,
            n_merged: 0,
        }
    }

    /// Hands a batch to the merger
    ///
    /// `last` marks the terminal batch of its record. Returns the batches whose fate is
    /// decided by this step.
    pub fn offer(&mut self, incoming: Batch, last: bool) -> Released {
        match self.pending.take() {
            None if last => Released::one(incoming),
            None => {
                self.pending = Some(incoming);
                Released::none()
            }
            Some(mut pending) if pending.name() == incoming.name() => {
                if !last {
                    self.pending = Some(incoming);
                    Released::one(pending)
                } else if incoming.len() < self.min_batch_length {
                    // a terminal batch holding only the overlap seed adds nothing
                    if incoming.len() > self.batch_overlap {
                        log::trace!(
                            "merging {} into {}",
                            incoming.batch_name(),
                            pending.batch_name()
                        );
                        pending.absorb(&incoming, self.batch_overlap);
                        self.n_merged += 1;
                    }
                    Released::one(pending)
                } else {
                    Released::two(pending, incoming)
                }
            }
            // a pending batch of another record is complete on its own
            Some(pending) => {
                if last {
                    Released::two(pending, incoming)
                } else {
                    self.pending = Some(incoming);
                    Released::one(pending)
                }
            }
        }
    }

    /// Releases the pending batch, if any (end of input)
    pub fn flush(&mut self) -> Option<Batch> {
        self.pending.take()
    }

    #[must_use]
    pub fn pending(&self) -> Option<&Batch> {
        self.pending.as_ref()
    }

    /// Number of terminal batches merged so far
    #[must_use]
    pub fn n_merged(&self) -> usize {
        self.n_merged
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{BatchBuilder, ConfigBuilder};

    fn config() -> Config {
        ConfigBuilder::default()
            .batch_length(10)
            .batch_overlap(2)
            .min_batch_length(6)
            .build()
            .unwrap()
    }

    /// Runs one record of `len` bases through a builder and the merger
    fn split_record(merger: &mut TrailingMerger, name: &str, len: usize) -> Vec<Batch> {
        let config = config();
        let seq: Vec<u8> = b"ACGT".iter().copied().cycle().take(len).collect();
        let mut builder = BatchBuilder::new(&config);
        let mut out = Vec::new();
        builder.begin(name);
        builder
            .feed(&seq, |batch| {
                out.extend(merger.offer(batch, false));
                Ok(())
            })
            .unwrap();
        out.extend(merger.offer(builder.finish(), true));
        out
    }

    fn lengths(batches: &[Batch]) -> Vec<usize> {
        batches.iter().map(Batch::len).collect()
    }

    #[test]
    fn test_lone_short_record_is_released() {
        let mut merger = TrailingMerger::new(&config());
        let out = split_record(&mut merger, "s", 3);
        assert_eq!(lengths(&out), vec![3]);
        assert!(merger.pending().is_none());
    }

    #[test]
    fn test_short_remainder_is_merged() {
        let mut merger = TrailingMerger::new(&config());
        // raw batches 0..10, 8..18, 16..21 (5 bases < 6)
        let out = split_record(&mut merger, "s", 21);
        assert_eq!(lengths(&out), vec![10, 13]);
        assert_eq!(out[1].start(), 8);
        assert_eq!(out[1].end(), 21);
        assert_eq!(merger.n_merged(), 1);
    }

    #[test]
    fn test_long_remainder_stands_alone() {
        let mut merger = TrailingMerger::new(&config());
        // raw batches 0..10, 8..15 (7 bases >= 6)
        let out = split_record(&mut merger, "s", 15);
        assert_eq!(lengths(&out), vec![10, 7]);
        assert_eq!(merger.n_merged(), 0);
    }

    #[test]
    fn test_exact_boundary_drops_seed() {
        let mut merger = TrailingMerger::new(&config());
        let out = split_record(&mut merger, "s", 18);
        assert_eq!(lengths(&out), vec![10, 10]);
        assert_eq!(out[1].end(), 18);
        assert_eq!(merger.n_merged(), 0);
    }

    #[test]
    fn test_remainder_at_minimum_stands_alone() {
        let mut merger = TrailingMerger::new(&config());
        // raw batches 0..10, 8..14 (6 bases == minimum)
        let out = split_record(&mut merger, "s", 14);
        assert_eq!(lengths(&out), vec![10, 6]);
        assert_eq!(out[1].start(), 8);
        assert_eq!(merger.n_merged(), 0);

        // one base less is merged
        let out = split_record(&mut merger, "t", 13);
        assert_eq!(lengths(&out), vec![13]);
        assert_eq!(merger.n_merged(), 1);
    }

    #[test]
    fn test_composition_after_merge() {
        let mut merger = TrailingMerger::new(&config());
        let out = split_record(&mut merger, "s", 37);
        for batch in &out {
            assert_eq!(
                batch.composition(),
                crate::Composition::count(batch.seq())
            );
        }
    }

    #[test]
    fn test_records_do_not_mix() {
        let mut merger = TrailingMerger::new(&config());
        let mut out = split_record(&mut merger, "a", 12);
        out.extend(split_record(&mut merger, "b", 4));
        let names: Vec<&str> = out.iter().map(Batch::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(lengths(&out), vec![12, 4]);
    }

    #[test]
    fn test_stale_pending_is_released_first() {
        let mut merger = TrailingMerger::new(&config());
        let a = Batch::new("a", 0, b"ACGTACGTAC".to_vec());
        let b = Batch::new("b", 0, b"GG".to_vec());
        assert_eq!(merger.offer(a.clone(), false).count(), 0);
        let out: Vec<Batch> = merger.offer(b.clone(), true).collect();
        assert_eq!(out, vec![a, b]);
        assert!(merger.flush().is_none());
    }

    #[test]
    fn test_flush() {
        let mut merger = TrailingMerger::new(&config());
        let a = Batch::new("a", 0, b"ACGTACGTAC".to_vec());
        assert_eq!(merger.offer(a.clone(), false).count(), 0);
        assert_eq!(merger.flush(), Some(a));
        assert!(merger.flush().is_none());
    }
}
