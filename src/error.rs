/// Custom Result type for gcsplit operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the gcsplit library, encompassing all possible error cases
/// that can occur while batching, binning, or verifying a genome.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to the layout of a FASTA source or bin file
    FormatError(#[from] FormatError),
    /// Errors raised while validating a configuration
    ConfigError(#[from] ConfigError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
    /// Record names that are not valid UTF-8
    Utf8Error(#[from] std::str::Utf8Error),
    /// Errors from sniffing the compression format of an input
    NifflerError(#[from] niffler::Error),
    /// Generic errors that can occur in any part of the system
    AnyhowError(#[from] anyhow::Error),
}

/// Errors in the structure of a FASTA input
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// The source contains no non-blank line
    #[error("Sequence source is empty")]
    Empty,

    /// The first non-blank line is not a record header
    ///
    /// # Fields
    /// * `line` - One-based line number of the offending line
    #[error("Expected a '>' header on line {line}")]
    MissingHeader { line: usize },

    /// A bin file header does not follow the `name:start-end` layout
    ///
    /// # Arguments
    /// * `String` - The header that could not be parsed
    #[error("Invalid batch name: {0}")]
    InvalidBatchName(String),
}

/// Violations of the batching invariants, reported before any input is read
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Batch length must be greater than zero")]
    ZeroBatchLength,

    /// # Fields
    /// * `overlap` - The configured overlap
    /// * `length` - The configured batch length
    #[error("Batch overlap ({overlap}) must be smaller than the batch length ({length})")]
    OverlapTooLarge { overlap: usize, length: usize },

    /// # Fields
    /// * `min` - The configured minimum batch length
    /// * `overlap` - The configured overlap
    /// * `length` - The configured batch length
    #[error(
        "Minimum batch length ({min}) must be above the overlap ({overlap}) and at most the batch length ({length})"
    )]
    MinBatchLength {
        min: usize,
        overlap: usize,
        length: usize,
    },

    #[error("At least one GC bin is required")]
    EmptyBinSet,

    /// # Arguments
    /// * `u32` - The label that is not a percentage
    #[error("GC bin {0} is outside of 0..=100")]
    BinOutOfRange(u32),

    /// # Arguments
    /// * `u32` - The label that appears more than once
    #[error("GC bin {0} is listed more than once")]
    DuplicateBin(u32),
}
