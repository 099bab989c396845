use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "readqc", version, about = "FastQC-style QC for FASTQ files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Run(RunArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// FASTQ files, plain or gzip-compressed.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long, short = 'o')]
    pub outdir: PathBuf,

    #[arg(long, short = 't', default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Limits file overriding the built-in warn/error thresholds.
    #[arg(long)]
    pub limits: Option<PathBuf>,

    #[arg(long)]
    pub adapters: Option<PathBuf>,

    #[arg(long)]
    pub contaminants: Option<PathBuf>,

    /// K-mer length for the k-mer and adapter modules (2 to 7).
    #[arg(long, short = 'k')]
    pub kmer_size: Option<usize>,

    /// Report every base position instead of grouping long reads.
    #[arg(long, default_value_t = false)]
    pub nogroup: bool,

    #[arg(long, default_value_t = false)]
    pub no_zip: bool,

    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(long, short = 'v')]
    pub verbose: bool,
}
