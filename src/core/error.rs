use std::path::PathBuf;

/// Problems with the limits file or run options. Fatal at setup time.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown limit option '{metric}' in {source_name}")]
    UnknownMetric { metric: String, source_name: String },

    #[error("unknown instruction for limit {metric}: {instruction} (in {source_name})")]
    UnknownInstruction {
        metric: String,
        instruction: String,
        source_name: String,
    },

    #[error("invalid value '{value}' for limit {metric} (in {source_name})")]
    BadValue {
        metric: String,
        value: String,
        source_name: String,
    },

    #[error("instruction for limit {metric} not found in {source_name}")]
    MissingMetric { metric: String, source_name: String },

    #[error("k-mer size must be between 2 and 7, got {0}")]
    KmerSize(usize),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Problems with the adapter or contaminant reference lists.
#[derive(thiserror::Error, Debug)]
pub enum ReferenceError {
    #[error("bad adapter (non-ACGT characters): {sequence}")]
    BadAdapter { sequence: String },

    #[error("adapter '{name}' is shorter than the k-mer size {kmer_size}")]
    ShortAdapter { name: String, kmer_size: usize },

    #[error("failed to build contaminant matcher: {0}")]
    Matcher(#[from] aho_corasick::BuildError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Reading a module's results before it has been summarized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("attempted to read module '{0}' before summarizing")]
    NotSummarized(&'static str),

    #[error("failed to render the text block of module '{0}'")]
    Render(&'static str),
}

/// Structural problems in a FASTQ stream. `record` is 1-based.
#[derive(thiserror::Error, Debug)]
pub enum FastqError {
    #[error("record {record}: header line does not start with '@'")]
    MissingHeader { record: u64 },

    #[error("record {record}: separator line does not start with '+'")]
    MissingSeparator { record: u64 },

    #[error("record {record}: sequence has {seq_len} bases but quality has {qual_len}")]
    LengthMismatch {
        record: u64,
        seq_len: usize,
        qual_len: usize,
    },

    #[error("record {record}: truncated record at end of input")]
    Truncated { record: u64 },

    #[error("record {record}: {source}")]
    Io {
        record: u64,
        source: std::io::Error,
    },
}
