use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use gcsplit::logging::init_logger;
use gcsplit::{
    split_genome, verify_bins, Config, ConfigBuilder, DEFAULT_BATCH_LENGTH,
    DEFAULT_BATCH_OVERLAP, DEFAULT_BINS, DEFAULT_MIN_BATCH_LENGTH,
};

#[derive(Parser)]
#[command(name = "gcsplit")]
#[command(about = "Split a genome into overlapping batches binned by GC background")]
struct Cli {
    /// Enable verbose output with progress information
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a FASTA genome into bin<label>.fa files
    Split {
        /// Input genome (FASTA, optionally gzip/bzip2/xz/zstd compressed, `-` for stdin)
        input: PathBuf,

        /// Output directory for the bin files
        #[arg(short, long, default_value = "bins")]
        outdir: PathBuf,

        /// Bases per output line (negative keeps each batch on one line)
        #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
        columns: i64,

        /// Remove existing bin files before writing
        #[arg(long)]
        clean: bool,

        #[command(flatten)]
        batching: BatchArgs,
    },

    /// Check the bin files of a split for consistency
    Verify {
        /// Directory holding the bin files
        dir: PathBuf,

        /// Genome the bins were produced from
        #[arg(short, long)]
        source: Option<PathBuf>,

        #[command(flatten)]
        batching: BatchArgs,
    },
}

#[derive(Args)]
struct BatchArgs {
    /// Maximum number of bases per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_LENGTH)]
    batch_length: usize,

    /// Bases shared by consecutive batches of a record
    #[arg(long, default_value_t = DEFAULT_BATCH_OVERLAP)]
    batch_overlap: usize,

    /// Terminal batches shorter than this are merged into the previous batch
    #[arg(long, default_value_t = DEFAULT_MIN_BATCH_LENGTH)]
    min_batch_length: usize,

    /// GC bin labels in percent, ties go to the first listed
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_BINS)]
    bins: Vec<u32>,
}
impl BatchArgs {
    fn config(self, row_width: usize) -> Result<Config> {
        let config = ConfigBuilder::default()
            .batch_length(self.batch_length)
            .batch_overlap(self.batch_overlap)
            .min_batch_length(self.min_batch_length)
            .bins(self.bins)
            .row_width(row_width)
            .build()
            .context("invalid batching parameters")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logger(args.verbose);

    match args.command {
        Commands::Split {
            input,
            outdir,
            columns,
            clean,
            batching,
        } => {
            let row_width = usize::try_from(columns).unwrap_or(0);
            let config = batching.config(row_width)?;
            let summary = split_genome(&input, &outdir, &config, clean)
                .with_context(|| format!("failed to split {}", input.display()))?;
            for (label, count) in &summary.per_bin {
                log::info!("bin{label}: {count} batches");
            }
        }
        Commands::Verify {
            dir,
            source,
            batching,
        } => {
            let config = batching.config(0)?;
            let report = verify_bins(&dir, &config, source.as_deref())
                .with_context(|| format!("failed to verify {}", dir.display()))?;
            for issue in &report.issues {
                log::error!("{issue}");
            }
            log::info!(
                "checked {} batches of {} records in {} bin files",
                report.batches,
                report.records,
                report.files
            );
            if !report.is_ok() {
                bail!("found {} issues in {}", report.issues.len(), dir.display());
            }
        }
    }

    Ok(())
}
