//! Batching configuration
//!
//! All thresholds that shape the batches and the bin labels they are sorted into are carried
//! by a [`Config`] value that is passed into the engine, so several engines with different
//! settings can run side by side.

use crate::error::{ConfigError, Result};

/// Maximum number of bases in a regular batch
pub const DEFAULT_BATCH_LENGTH: usize = 60_000;

/// Number of bases repeated between consecutive batches of a record
pub const DEFAULT_BATCH_OVERLAP: usize = 2_000;

/// Terminal batches shorter than this are folded into their predecessor
pub const DEFAULT_MIN_BATCH_LENGTH: usize = 40_000;

/// GC percentages a batch can be assigned to
pub const DEFAULT_BINS: [u32; 10] = [35, 37, 39, 41, 43, 45, 47, 49, 51, 53];

/// Validated batching parameters
///
/// Invariants (checked by [`Config::validate`]):
/// * `batch_length > 0`
/// * `batch_overlap < min_batch_length <= batch_length`
/// * `bins` is non-empty, holds percentages only, and has no duplicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of bases per batch
    pub batch_length: usize,

    /// Bases shared between the tail of one batch and the head of the next
    pub batch_overlap: usize,

    /// Threshold below which a terminal batch is merged instead of written on its own
    pub min_batch_length: usize,

    /// Bin labels in tie-breaking order
    pub bins: Vec<u32>,

    /// Bases per output line (0 writes each batch on a single line)
    pub row_width: usize,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            batch_length: DEFAULT_BATCH_LENGTH,
            batch_overlap: DEFAULT_BATCH_OVERLAP,
            min_batch_length: DEFAULT_MIN_BATCH_LENGTH,
            bins: DEFAULT_BINS.to_vec(),
            row_width: 0,
        }
    }
}
impl Config {
    /// Checks every invariant of the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_length == 0 {
            return Err(ConfigError::ZeroBatchLength.into());
        }
        if self.batch_overlap >= self.batch_length {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.batch_overlap,
                length: self.batch_length,
            }
            .into());
        }
        if self.min_batch_length <= self.batch_overlap || self.min_batch_length > self.batch_length
        {
            return Err(ConfigError::MinBatchLength {
                min: self.min_batch_length,
                overlap: self.batch_overlap,
                length: self.batch_length,
            }
            .into());
        }
        if self.bins.is_empty() {
            return Err(ConfigError::EmptyBinSet.into());
        }
        for (idx, &label) in self.bins.iter().enumerate() {
            if label > 100 {
                return Err(ConfigError::BinOutOfRange(label).into());
            }
            if self.bins[..idx].contains(&label) {
                return Err(ConfigError::DuplicateBin(label).into());
            }
        }
        Ok(())
    }

    /// Distance between the start offsets of two consecutive batches
    #[must_use]
    pub fn stride(&self) -> usize {
        self.batch_length - self.batch_overlap
    }
}

/// Builder for validated [`Config`] values
///
/// Unset fields fall back to the defaults.
///
/// # Examples
///
/// ```
/// # use gcsplit::{ConfigBuilder, Result};
/// # fn main() -> Result<()> {
/// let config = ConfigBuilder::default()
///     .batch_length(1000)
///     .batch_overlap(100)
///     .min_batch_length(500)
///     .row_width(60)
///     .build()?;
/// assert_eq!(config.stride(), 900);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    batch_length: Option<usize>,
    batch_overlap: Option<usize>,
    min_batch_length: Option<usize>,
    bins: Option<Vec<u32>>,
    row_width: Option<usize>,
}
impl ConfigBuilder {
    #[must_use]
    pub fn batch_length(mut self, batch_length: usize) -> Self {
        self.batch_length = Some(batch_length);
        self
    }

    #[must_use]
    pub fn batch_overlap(mut self, batch_overlap: usize) -> Self {
        self.batch_overlap = Some(batch_overlap);
        self
    }

    #[must_use]
    pub fn min_batch_length(mut self, min_batch_length: usize) -> Self {
        self.min_batch_length = Some(min_batch_length);
        self
    }

    #[must_use]
    pub fn bins(mut self, bins: Vec<u32>) -> Self {
        self.bins = Some(bins);
        self
    }

    #[must_use]
    pub fn row_width(mut self, row_width: usize) -> Self {
        self.row_width = Some(row_width);
        self
    }

    pub fn build(self) -> Result<Config> {
        let config = Config {
            batch_length: self.batch_length.unwrap_or(DEFAULT_BATCH_LENGTH),
            batch_overlap: self.batch_overlap.unwrap_or(DEFAULT_BATCH_OVERLAP),
            min_batch_length: self.min_batch_length.unwrap_or(DEFAULT_MIN_BATCH_LENGTH),
            bins: self.bins.unwrap_or_else(|| DEFAULT_BINS.to_vec()),
            row_width: self.row_width.unwrap_or(0),
        };
        config.validate()?;
        Ok(config)
    }
}
