//! Thresholds and reference lists.
//!
//! All three inputs use the FastQC plain-text formats. Built-in copies are
//! compiled in from `config/`; each can be replaced by a file on disk.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::core::contaminants::{Contaminant, ContaminantMatcher};
use crate::core::error::{ConfigError, ReferenceError};
use crate::core::model::actg_to_2bit;
use crate::core::stats::{DEFAULT_KMER_SIZE, MAX_KMER_SIZE};

const BUILTIN_LIMITS: &str = include_str!("../../config/limits.txt");
const BUILTIN_ADAPTERS: &str = include_str!("../../config/adapter_list.txt");
const BUILTIN_CONTAMINANTS: &str = include_str!("../../config/contaminant_list.txt");

pub const MIN_KMER_SIZE: usize = 2;
pub const OVERREP_MIN_FRACTION: f64 = 0.001;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Metric {
    Duplication,
    Kmer,
    NContent,
    Overrepresented,
    QualityBase,
    QualityBaseLower,
    QualityBaseMedian,
    Sequence,
    GcSequence,
    QualitySequence,
    Tile,
    SequenceLength,
    Adapter,
}

impl Metric {
    pub const ALL: [Metric; 13] = [
        Metric::Duplication,
        Metric::Kmer,
        Metric::NContent,
        Metric::Overrepresented,
        Metric::QualityBase,
        Metric::QualityBaseLower,
        Metric::QualityBaseMedian,
        Metric::Sequence,
        Metric::GcSequence,
        Metric::QualitySequence,
        Metric::Tile,
        Metric::SequenceLength,
        Metric::Adapter,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Duplication => "duplication",
            Metric::Kmer => "kmer",
            Metric::NContent => "n_content",
            Metric::Overrepresented => "overrepresented",
            Metric::QualityBase => "quality_base",
            Metric::QualityBaseLower => "quality_base_lower",
            Metric::QualityBaseMedian => "quality_base_median",
            Metric::Sequence => "sequence",
            Metric::GcSequence => "gc_sequence",
            Metric::QualitySequence => "quality_sequence",
            Metric::Tile => "tile",
            Metric::SequenceLength => "sequence_length",
            Metric::Adapter => "adapter",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL.into_iter().find(|m| m.key() == s).ok_or(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Threshold {
    pub warn: f64,
    pub error: f64,
    pub ignore: f64,
}

impl Threshold {
    pub fn is_ignored(&self) -> bool {
        self.ignore != 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Limits {
    thresholds: [Threshold; 13],
}

impl Limits {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_LIMITS, "built-in limits")
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parses `metric instruction value` lines. `#` comments and lines of at
    /// most one character are skipped. Every metric must appear at least once;
    /// instructions it does not mention stay 0.
    pub fn parse(text: &str, source_name: &str) -> Result<Self, ConfigError> {
        let mut thresholds = [Threshold::default(); 13];
        let mut seen = [false; 13];

        for line in text.lines() {
            if line.len() <= 1 || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };
            let metric: Metric = name.parse().map_err(|_| ConfigError::UnknownMetric {
                metric: name.to_string(),
                source_name: source_name.to_string(),
            })?;
            let instruction = fields.next().unwrap_or_default();
            let raw = fields.next().unwrap_or_default();
            let value: f64 = raw.parse().map_err(|_| ConfigError::BadValue {
                metric: name.to_string(),
                value: raw.to_string(),
                source_name: source_name.to_string(),
            })?;

            let slot = &mut thresholds[metric.index()];
            match instruction {
                "warn" => slot.warn = value,
                "error" => slot.error = value,
                "ignore" => slot.ignore = value,
                other => {
                    return Err(ConfigError::UnknownInstruction {
                        metric: name.to_string(),
                        instruction: other.to_string(),
                        source_name: source_name.to_string(),
                    });
                }
            }
            seen[metric.index()] = true;
        }

        if let Some(missing) = Metric::ALL.into_iter().find(|m| !seen[m.index()]) {
            return Err(ConfigError::MissingMetric {
                metric: missing.key().to_string(),
                source_name: source_name.to_string(),
            });
        }

        Ok(Self { thresholds })
    }

    pub fn get(&self, metric: Metric) -> Threshold {
        self.thresholds[metric.index()]
    }

    pub fn is_ignored(&self, metric: Metric) -> bool {
        self.get(metric).is_ignored()
    }

    pub fn ignored(&self) -> impl Iterator<Item = Metric> + '_ {
        Metric::ALL.into_iter().filter(|&m| self.is_ignored(m))
    }
}

/// An adapter prefix packed into a k-mer key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adapter {
    pub name: String,
    pub kmer: usize,
}

/// Splits a reference line into `(name, sequence)`: the last whitespace
/// token is the sequence, everything before it the name.
fn split_reference_line(line: &str) -> Option<(String, &str)> {
    if line.starts_with('#') {
        return None;
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (seq, name) = tokens.split_last()?;
    if name.is_empty() {
        return None;
    }
    Some((name.join(" "), *seq))
}

pub fn parse_adapters(text: &str, kmer_size: usize) -> Result<Vec<Adapter>, ReferenceError> {
    let mut out = Vec::new();
    for line in text.lines() {
        let Some((name, seq)) = split_reference_line(line) else {
            continue;
        };
        let bytes = seq.as_bytes();
        let prefix = &bytes[..bytes.len().min(kmer_size)];
        let mut kmer = 0usize;
        for &b in prefix {
            let code = match b {
                b'A' | b'C' | b'T' | b'G' => actg_to_2bit(b),
                _ => None,
            };
            let Some(code) = code else {
                return Err(ReferenceError::BadAdapter {
                    sequence: seq.to_string(),
                });
            };
            kmer = (kmer << 2) | code;
        }
        if prefix.len() < kmer_size {
            return Err(ReferenceError::ShortAdapter { name, kmer_size });
        }
        out.push(Adapter { name, kmer });
    }
    Ok(out)
}

pub fn parse_contaminants(text: &str) -> Vec<Contaminant> {
    text.lines()
        .filter_map(split_reference_line)
        .map(|(name, seq)| Contaminant {
            name,
            seq: seq.as_bytes().to_vec(),
        })
        .collect()
}

fn read_reference(path: &Path) -> Result<String, ReferenceError> {
    std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Where the three configuration inputs come from.
#[derive(Clone, Debug, Default)]
pub struct ConfigSources<'a> {
    pub limits: Option<&'a Path>,
    pub adapters: Option<&'a Path>,
    pub contaminants: Option<&'a Path>,
    pub kmer_size: Option<usize>,
    pub nogroup: bool,
}

/// Everything the analysis modules need besides the snapshot.
#[derive(Clone, Debug)]
pub struct QcConfig {
    pub limits: Limits,
    pub adapters: Vec<Adapter>,
    pub contaminants: Arc<ContaminantMatcher>,
    pub kmer_size: usize,
    pub nogroup: bool,
    pub overrep_min_fraction: f64,
}

impl QcConfig {
    pub fn builtin() -> anyhow::Result<Self> {
        Self::load(&ConfigSources::default())
    }

    /// Reference lists are only read for modules that are not ignored.
    pub fn load(sources: &ConfigSources<'_>) -> anyhow::Result<Self> {
        let kmer_size = sources.kmer_size.unwrap_or(DEFAULT_KMER_SIZE);
        if !(MIN_KMER_SIZE..=MAX_KMER_SIZE).contains(&kmer_size) {
            return Err(ConfigError::KmerSize(kmer_size).into());
        }

        let limits = match sources.limits {
            Some(path) => Limits::from_path(path)?,
            None => Limits::builtin()?,
        };

        let adapters = if limits.is_ignored(Metric::Adapter) {
            Vec::new()
        } else {
            match sources.adapters {
                Some(path) => parse_adapters(&read_reference(path)?, kmer_size)?,
                None => parse_adapters(BUILTIN_ADAPTERS, kmer_size)?,
            }
        };

        let contaminants = if limits.is_ignored(Metric::Overrepresented) {
            ContaminantMatcher::empty()
        } else {
            let refs = match sources.contaminants {
                Some(path) => parse_contaminants(&read_reference(path)?),
                None => parse_contaminants(BUILTIN_CONTAMINANTS),
            };
            ContaminantMatcher::new(refs)?
        };

        debug!(
            kmer_size,
            adapters = adapters.len(),
            contaminants = contaminants.len(),
            "configuration loaded"
        );

        Ok(Self {
            limits,
            adapters,
            contaminants: Arc::new(contaminants),
            kmer_size,
            nogroup: sources.nogroup,
            overrep_min_fraction: OVERREP_MIN_FRACTION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_limits_cover_every_metric() {
        let limits = Limits::builtin().unwrap();
        assert_eq!(limits.get(Metric::Duplication).warn, 70.0);
        assert_eq!(limits.get(Metric::QualityBaseMedian).error, 20.0);
        assert_eq!(limits.ignored().count(), 0);
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let err = Limits::parse("bogus warn 1\n", "test").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMetric { ref metric, .. } if metric == "bogus"));
    }

    #[test]
    fn unknown_instruction_is_rejected() {
        let err = Limits::parse("kmer maybe 1\n", "test").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownInstruction { ref instruction, .. } if instruction == "maybe"
        ));
    }

    #[test]
    fn missing_metric_names_the_source() {
        let text: String = BUILTIN_LIMITS
            .lines()
            .filter(|l| !l.starts_with("tile"))
            .map(|l| format!("{l}\n"))
            .collect();
        let err = Limits::parse(&text, "my_limits.txt").unwrap_err();
        match err {
            ConfigError::MissingMetric {
                metric,
                source_name,
            } => {
                assert_eq!(metric, "tile");
                assert_eq!(source_name, "my_limits.txt");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ignored_metrics_are_reported() {
        let text = BUILTIN_LIMITS.replace("kmer\tignore\t0", "kmer\tignore\t1");
        let limits = Limits::parse(&text, "test").unwrap();
        assert_eq!(limits.ignored().collect::<Vec<_>>(), vec![Metric::Kmer]);
    }

    #[test]
    fn adapters_are_truncated_and_packed() {
        let adapters = parse_adapters("# comment\nMy Adapter  ACGTTT\n", 3).unwrap();
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].name, "My Adapter");
        // A=0 C=1 G=3
        assert_eq!(adapters[0].kmer, 0b00_01_11);
    }

    #[test]
    fn non_acgt_adapter_is_rejected() {
        let err = parse_adapters("bad ACNT\n", 4).unwrap_err();
        assert!(matches!(err, ReferenceError::BadAdapter { .. }));
        let err = parse_adapters("lower acgt\n", 4).unwrap_err();
        assert!(matches!(err, ReferenceError::BadAdapter { .. }));
    }

    #[test]
    fn short_adapter_is_rejected() {
        let err = parse_adapters("tiny ACG\n", 7).unwrap_err();
        assert!(matches!(err, ReferenceError::ShortAdapter { kmer_size: 7, .. }));
    }

    #[test]
    fn contaminant_names_keep_inner_words() {
        let refs = parse_contaminants("TruSeq Adapter, Index 1\tGATCGGAAGAGC\n\n");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "TruSeq Adapter, Index 1");
        assert_eq!(refs[0].seq, b"GATCGGAAGAGC");
    }

    #[test]
    fn kmer_size_is_validated() {
        let sources = ConfigSources {
            kmer_size: Some(9),
            ..Default::default()
        };
        assert!(QcConfig::load(&sources).is_err());
        let qc = QcConfig::builtin().unwrap();
        assert_eq!(qc.kmer_size, DEFAULT_KMER_SIZE);
        assert_eq!(qc.adapters.len(), 5);
        assert!(!qc.contaminants.is_empty());
    }

    #[test]
    fn builtin_contaminants_name_nextera_reads() {
        let refs = parse_contaminants(BUILTIN_CONTAMINANTS);
        assert_eq!(refs.len(), 16);
        let matcher = ContaminantMatcher::new(refs).unwrap();
        assert_eq!(
            matcher.best_match(b"GTCTCGTGGGCTCGGAGATGTGTATAAG"),
            "Nextera Read 2 Adapter"
        );
    }
}
