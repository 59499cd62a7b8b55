//! Bin output
//!
//! [`BinWriter`] classifies finished batches and appends them, FASTA formatted, to the output
//! of their bin. Storage is abstracted by the [`BinSink`] trait:
//! - [`DirSink`] appends to `bin<label>.fa` files inside a directory
//! - [`MemorySink`] keeps every bin in memory
//!
//! Each written batch contributes a header line `>name:start-end` (one-based, inclusive)
//! followed by its bases, on one line or wrapped every `row_width` bases.

use std::collections::{hash_map::Entry, BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use auto_impl::auto_impl;

use crate::{Batch, Bin, Config, GcClassifier, Result};

/// Prefix of every bin file name
pub const BIN_PREFIX: &str = "bin";

/// Extension of every bin file name
pub const BIN_EXTENSION: &str = "fa";

/// File name of the bin with the given label
#[must_use]
pub fn bin_file_name(label: u32) -> String {
    format!("{BIN_PREFIX}{label}.{BIN_EXTENSION}")
}

/// Recovers the label from a bin file name
#[must_use]
pub fn parse_bin_file_name(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(BIN_PREFIX)?
        .strip_suffix(BIN_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// Destination of formatted bin entries
///
/// Entries for one bin must be stored in the order they are appended.
#[auto_impl(&mut, Box)]
pub trait BinSink {
    /// Appends a formatted entry to the bin with the given label
    fn append(&mut self, label: u32, entry: &[u8]) -> Result<()>;

    /// Flushes every buffered entry to storage
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Appends bins to `bin<label>.fa` files inside a directory
///
/// One buffered append handle is cached per bin. Existing files are extended, never
/// truncated.
#[derive(Debug)]
pub struct DirSink {
    dir: PathBuf,
    handles: HashMap<u32, BufWriter<File>>,
}
impl DirSink {
    /// Creates a sink over `dir`, creating the directory if it does not exist
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            handles: HashMap::new(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing the bin with the given label
    #[must_use]
    pub fn bin_path(&self, label: u32) -> PathBuf {
        self.dir.join(bin_file_name(label))
    }

    /// Removes every bin file from `dir`, returning the number of files removed
    ///
    /// Other files are left untouched. A missing directory holds no bins.
    pub fn clean<P: AsRef<Path>>(dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_bin = entry
                .file_name()
                .to_str()
                .and_then(parse_bin_file_name)
                .is_some();
            if is_bin && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn handle(&mut self, label: u32) -> Result<&mut BufWriter<File>> {
        let handle = match self.handles.entry(label) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self.dir.join(bin_file_name(label));
                log::debug!("opening {}", path.display());
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                entry.insert(BufWriter::new(file))
            }
        };
        Ok(handle)
    }
}
impl BinSink for DirSink {
    fn append(&mut self, label: u32, entry: &[u8]) -> Result<()> {
        self.handle(label)?.write_all(entry)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for handle in self.handles.values_mut() {
            handle.flush()?;
        }
        Ok(())
    }
}

/// Keeps every bin in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    bins: BTreeMap<u32, Vec<u8>>,
}
impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of the bin with the given label
    #[must_use]
    pub fn get(&self, label: u32) -> Option<&[u8]> {
        self.bins.get(&label).map(Vec::as_slice)
    }

    /// Labels of the non-empty bins in ascending order
    pub fn labels(&self) -> impl Iterator<Item = u32> + '_ {
        self.bins.keys().copied()
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<u32, Vec<u8>> {
        self.bins
    }
}
impl BinSink for MemorySink {
    fn append(&mut self, label: u32, entry: &[u8]) -> Result<()> {
        self.bins.entry(label).or_default().extend_from_slice(entry);
        Ok(())
    }
}

/// Counts of what a [`BinWriter`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Batches written, per bin label
    pub per_bin: BTreeMap<u32, usize>,

    /// Batches without any G/C/A/T base
    pub discarded: usize,
}
impl WriteStats {
    /// Total number of batches written
    #[must_use]
    pub fn written(&self) -> usize {
        self.per_bin.values().sum()
    }
}

/// Appends a FASTA entry to `buffer`, wrapping bases every `row_width` (0 for no wrapping)
pub fn write_entry(
    buffer: &mut Vec<u8>,
    ibuf: &mut itoa::Buffer,
    batch: &Batch,
    row_width: usize,
) {
    buffer.push(b'>');
    buffer.extend_from_slice(batch.name().as_bytes());
    buffer.push(b':');
    buffer.extend_from_slice(ibuf.format(batch.start() + 1).as_bytes());
    buffer.push(b'-');
    buffer.extend_from_slice(ibuf.format(batch.end()).as_bytes());
    buffer.push(b'\n');
    if row_width == 0 || batch.is_empty() {
        buffer.extend_from_slice(batch.seq());
        buffer.push(b'\n');
    } else {
        for row in batch.seq().chunks(row_width) {
            buffer.extend_from_slice(row);
            buffer.push(b'\n');
        }
    }
}

/// Classifies batches and appends them to their bin
pub struct BinWriter<S: BinSink> {
    /// Storage for the bins
    sink: S,

    classifier: GcClassifier,

    /// Bases per output line (0 for no wrapping)
    row_width: usize,

    /// Reusable buffer for the formatted entry
    buffer: Vec<u8>,

    /// Reusable buffer for formatting offsets
    ibuf: itoa::Buffer,

    stats: WriteStats,
}
impl<S: BinSink> BinWriter<S> {
    #[must_use]
    pub fn new(sink: S, config: &Config) -> Self {
        Self {
            sink,
            classifier: GcClassifier::from_config(config),
            row_width: config.row_width,
            buffer: Vec::new(),
            ibuf: itoa::Buffer::new(),
            stats: WriteStats::default(),
        }
    }

    /// Classifies a batch and appends it to its bin
    ///
    /// Batches classified as [`Bin::Discard`] touch no output.
    pub fn write(&mut self, batch: &Batch) -> Result<Bin> {
        let bin = self.classifier.classify(batch.composition());
        let Bin::Label(label) = bin else {
            log::trace!("discarding {} (no unambiguous bases)", batch.batch_name());
            self.stats.discarded += 1;
            return Ok(bin);
        };

        self.buffer.clear();
        write_entry(&mut self.buffer, &mut self.ibuf, batch, self.row_width);
        self.sink.append(label, &self.buffer)?;
        *self.stats.per_bin.entry(label).or_default() += 1;
        log::trace!("wrote {} to {bin}", batch.batch_name());
        Ok(bin)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }

    #[must_use]
    pub fn stats(&self) -> &WriteStats {
        &self.stats
    }

    /// Flushes and returns the sink
    pub fn into_inner(mut self) -> Result<S> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::ConfigBuilder;

    fn writer(row_width: usize) -> BinWriter<MemorySink> {
        let config = ConfigBuilder::default()
            .batch_length(20)
            .batch_overlap(4)
            .min_batch_length(10)
            .row_width(row_width)
            .build()
            .unwrap();
        BinWriter::new(MemorySink::new(), &config)
    }

    #[test]
    fn test_unwrapped_entry() -> Result<()> {
        let mut writer = writer(0);
        let batch = Batch::new("chr1", 58_000, b"GGCCAATT".to_vec());
        assert_eq!(writer.write(&batch)?, Bin::Label(49));
        let sink = writer.into_inner()?;
        assert_eq!(sink.get(49), Some(&b">chr1:58001-58008\nGGCCAATT\n"[..]));
        Ok(())
    }

    #[test]
    fn test_wrapped_entry() -> Result<()> {
        let mut writer = writer(3);
        let batch = Batch::new("chr2", 0, b"GGCCAATT".to_vec());
        writer.write(&batch)?;
        let sink = writer.into_inner()?;
        assert_eq!(sink.get(49), Some(&b">chr2:1-8\nGGC\nCAA\nTT\n"[..]));
        Ok(())
    }

    #[test]
    fn test_wrap_exact_multiple() {
        let mut buffer = Vec::new();
        let batch = Batch::new("s", 9, b"ACGTAC".to_vec());
        write_entry(&mut buffer, &mut itoa::Buffer::new(), &batch, 3);
        assert_eq!(buffer, b">s:10-15\nACG\nTAC\n");
    }

    #[test]
    fn test_discard_writes_nothing() -> Result<()> {
        let mut writer = writer(0);
        let batch = Batch::new("gap", 0, b"NNNNNNNNNN".to_vec());
        assert_eq!(writer.write(&batch)?, Bin::Discard);
        assert_eq!(writer.stats().discarded, 1);
        assert_eq!(writer.stats().written(), 0);
        let sink = writer.into_inner()?;
        assert_eq!(sink.labels().count(), 0);
        Ok(())
    }

    #[test]
    fn test_append_order_per_bin() -> Result<()> {
        let mut writer = writer(0);
        writer.write(&Batch::new("a", 0, b"AT".to_vec()))?;
        writer.write(&Batch::new("b", 0, b"GC".to_vec()))?;
        writer.write(&Batch::new("c", 0, b"TA".to_vec()))?;
        assert_eq!(writer.stats().per_bin.get(&35), Some(&2));
        assert_eq!(writer.stats().per_bin.get(&53), Some(&1));
        let sink = writer.into_inner()?;
        assert_eq!(sink.get(35), Some(&b">a:1-2\nAT\n>c:1-2\nTA\n"[..]));
        assert_eq!(sink.labels().collect::<Vec<_>>(), vec![35, 53]);
        Ok(())
    }

    #[test]
    fn test_dir_sink_appends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::default();
        let batch = Batch::new("chr1", 0, b"ACGTTGCA".to_vec());
        for _ in 0..2 {
            let mut writer = BinWriter::new(DirSink::new(dir.path())?, &config);
            writer.write(&batch)?;
            writer.flush()?;
        }
        let contents = fs::read(dir.path().join("bin49.fa"))?;
        assert_eq!(contents, b">chr1:1-8\nACGTTGCA\n>chr1:1-8\nACGTTGCA\n");
        Ok(())
    }

    #[test]
    fn test_dir_sink_clean() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("bin41.fa"), b">x:1-1\nA\n")?;
        fs::write(dir.path().join("notes.txt"), b"keep")?;
        assert_eq!(DirSink::clean(dir.path())?, 1);
        assert!(!dir.path().join("bin41.fa").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(DirSink::clean(dir.path().join("missing"))?, 0);
        Ok(())
    }

    #[test]
    fn test_bin_file_names() {
        assert_eq!(bin_file_name(43), "bin43.fa");
        assert_eq!(parse_bin_file_name("bin43.fa"), Some(43));
        assert_eq!(parse_bin_file_name("bin.fa"), None);
        assert_eq!(parse_bin_file_name("bin43.fasta"), None);
        assert_eq!(parse_bin_file_name("notes.txt"), None);
    }

    #[test]
    fn test_boxed_sink() -> Result<()> {
        let mut memory = MemorySink::new();
        {
            let sink: Box<dyn BinSink + '_> = Box::new(&mut memory);
            let mut writer = BinWriter::new(sink, &Config::default());
            writer.write(&Batch::new("s", 0, b"GGGG".to_vec()))?;
        }
        assert!(memory.get(53).is_some());
        Ok(())
    }
}
