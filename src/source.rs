//! Streaming FASTA source
//!
//! [`SequenceSource`] walks a FASTA stream one line at a time and never holds more than the
//! current line in memory. Records are consumed in two steps: [`SequenceSource::next_record`]
//! advances to the next header and yields the record name, then [`SequenceSource::next_line`]
//! yields the base lines of that record until the next header or the end of the stream.
//!
//! ```
//! # use gcsplit::{Result, SequenceSource};
//! # fn main() -> Result<()> {
//! let mut source = SequenceSource::new(&b">chr1 primary\nACGT\nGG\n>chr2\nTT\n"[..]);
//! let mut lengths = Vec::new();
//! while let Some(name) = source.next_record() {
//!     let name = name?;
//!     let mut len = 0;
//!     while let Some(line) = source.next_line() {
//!         len += line?.len();
//!     }
//!     lengths.push((name, len));
//! }
//! assert_eq!(lengths, vec![("chr1".to_string(), 6), ("chr2".to_string(), 2)]);
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;

use crate::error::{FormatError, Result};

/// Marker that opens a record header line
pub const HEADER_MARKER: u8 = b'>';

/// Number of leading bytes niffler needs to sniff a compression format
const SNIFF_LEN: u64 = 5;

/// Buffered reader over a possibly compressed input
pub type BoxedReader = BufReader<Box<dyn Read>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No line has been read yet
    Start,
    /// Inside the bases of the current record
    Bases,
    /// A header was read and its name is waiting in `next_name`
    Header,
    /// The end of the stream was reached
    Finished,
}

/// Lazy, single-pass reader of FASTA records
#[derive(Debug)]
pub struct SequenceSource<R: BufRead> {
    inner: R,

    /// Reusable buffer for the current line
    line: Vec<u8>,

    /// Name of a header read while scanning bases
    next_name: Option<String>,

    state: State,

    /// Number of lines consumed (one-based line number of the current line)
    n_lines: usize,

    /// Number of records started
    n_records: usize,
}
impl SequenceSource<BoxedReader> {
    /// Opens a FASTA file, decompressing it transparently
    ///
    /// `-` reads from stdin. Inputs too short to carry a compression signature are read as
    /// plain text.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new("-") {
            Self::from_reader(Box::new(io::stdin()))
        } else {
            Self::from_reader(Box::new(File::open(path)?))
        }
    }

    /// Wraps a raw stream, decompressing it when it carries a compression signature
    ///
    /// Streams shorter than the signature are read as plain text.
    pub fn from_reader(mut reader: Box<dyn Read>) -> Result<Self> {
        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        reader.by_ref().take(SNIFF_LEN).read_to_end(&mut head)?;
        let sniffed = head.len() as u64 == SNIFF_LEN;
        let stream: Box<dyn Read> = Box::new(Cursor::new(head).chain(reader));
        let reader = if sniffed {
            niffler::get_reader(stream)?.0
        } else {
            stream
        };
        Ok(Self::new(BufReader::new(reader)))
    }
}
impl<R: BufRead> SequenceSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: Vec::new(),
            next_name: None,
            state: State::Start,
            n_lines: 0,
            n_records: 0,
        }
    }

    /// Reads the next line into the buffer with trailing whitespace removed
    ///
    /// Returns `Ok(false)` at the end of the stream.
    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        if self.inner.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(false);
        }
        self.n_lines += 1;
        let len = self.line.trim_ascii_end().len();
        self.line.truncate(len);
        Ok(true)
    }

    /// Extracts the record name from the header in the line buffer
    fn header_name(&self) -> Result<String> {
        let name = self.line[1..]
            .split(u8::is_ascii_whitespace)
            .next()
            .unwrap_or_default();
        Ok(std::str::from_utf8(name)?.to_string())
    }

    /// Scans forward to the first header of the stream
    fn first_record(&mut self) -> Result<String> {
        loop {
            if !self.read_line()? {
                self.state = State::Finished;
                return Err(FormatError::Empty.into());
            }
            if self.line.is_empty() {
                continue;
            }
            if self.line[0] != HEADER_MARKER {
                self.state = State::Finished;
                return Err(FormatError::MissingHeader { line: self.n_lines }.into());
            }
            return self.header_name();
        }
    }

    /// Advances to the next record and returns its name
    ///
    /// Base lines of the current record that were not consumed are skipped. Returns `None`
    /// once the stream is exhausted. An empty stream, or one whose first non-blank line is
    /// not a header, is a [`FormatError`].
    pub fn next_record(&mut self) -> Option<Result<String>> {
        let name = match self.state {
            State::Finished => return None,
            State::Start => self.first_record(),
            State::Header => Ok(self.next_name.take().unwrap_or_default()),
            State::Bases => {
                // drain the rest of the current record
                loop {
                    match self.next_line() {
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Some(Err(e)),
                        None => break,
                    }
                }
                return self.next_record();
            }
        };
        if name.is_ok() {
            self.state = State::Bases;
            self.n_records += 1;
        }
        Some(name)
    }

    /// Returns the next non-empty base line of the current record
    ///
    /// Returns `None` when the record ends, either at the next header or at the end of the
    /// stream.
    pub fn next_line(&mut self) -> Option<Result<&[u8]>> {
        if self.state != State::Bases {
            return None;
        }
        loop {
            match self.read_line() {
                Ok(true) => {}
                Ok(false) => {
                    self.state = State::Finished;
                    return None;
                }
                Err(e) => return Some(Err(e)),
            }
            if self.line.is_empty() {
                continue;
            }
            if self.line[0] == HEADER_MARKER {
                return match self.header_name() {
                    Ok(name) => {
                        self.next_name = Some(name);
                        self.state = State::Header;
                        None
                    }
                    Err(e) => Some(Err(e)),
                };
            }
            return Some(Ok(&self.line));
        }
    }

    /// Number of records started so far
    pub fn n_records(&self) -> usize {
        self.n_records
    }

    /// Number of lines consumed so far
    pub fn n_lines(&self) -> usize {
        self.n_lines
    }

    /// Whether the end of the stream has been reached
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }
}
