//! Analysis modules.
//!
//! Every module reads the same finalized [`Snapshot`], derives its own
//! statistics, grades them against the configured thresholds and renders a
//! text block plus a [`Fragment`] for the HTML report. [`Module`] owns the
//! lifecycle: results exist only after [`Module::summarize`].

use std::fmt;

use tracing::{debug, info};

use crate::core::config::{Metric, QcConfig};
use crate::core::error::ModuleError;
use crate::core::model::Status;
use crate::core::stats::Snapshot;

mod adapter_content;
mod basic;
mod duplication;
mod fragment;
mod kmer_content;
mod length_dist;
mod overrepresented;
mod per_base_content;
mod per_base_n;
mod per_base_qual;
mod per_seq_gc;
mod per_seq_qual;
mod per_tile_qual;

pub use adapter_content::{AdapterContent, AdapterRow};
pub use basic::BasicStats;
pub use duplication::{DUP_LEVEL_LABELS, DuplicationLevels, DuplicationRow, get_corrected_count};
pub use fragment::{Color, Coord, Fragment, Series, coords};
pub use kmer_content::{KMER_REPORT_LIMIT, KmerContent, KmerRow};
pub use length_dist::{LengthDistRow, LengthDistribution};
pub use overrepresented::{OverrepRow, Overrepresented};
pub use per_base_content::{PerBaseContent, PerBaseContentRow};
pub use per_base_n::{PerBaseN, PerBaseNRow};
pub use per_base_qual::{BaseGroup, PerBaseQualRow, PerBaseQuality, make_base_groups};
pub use per_seq_gc::{GcFit, PerSequenceGc, sum_deviation_from_normal};
pub use per_seq_qual::{PerSeqQualRow, PerSequenceQuality};
pub use per_tile_qual::PerTileQuality;

/// What every analysis module implements. Called in order: `summarize` once,
/// then any number of `grade`, `write_body` and `fragment`.
pub trait Analysis: Send {
    fn name(&self) -> &'static str;

    fn summarize(&mut self, snap: &Snapshot);

    /// Starts from [`Status::Pass`] and only escalates.
    fn grade(&self) -> Status;

    /// Rows between the `>>Name\tgrade` header and `>>END_MODULE`.
    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result;

    fn fragment(&self) -> Fragment;
}

/// Escalates to `Fail` when `value > error`, to `Warn` when `value > warn`.
pub(crate) fn grade_above(status: &mut Status, value: f64, warn: f64, error: f64) {
    if value > error {
        status.escalate(Status::Fail);
    } else if value > warn {
        status.escalate(Status::Warn);
    }
}

/// The closed set of analyses, in report order.
pub enum ModuleKind {
    Basic(BasicStats),
    PerBaseQuality(PerBaseQuality),
    PerTileQuality(PerTileQuality),
    PerSequenceQuality(PerSequenceQuality),
    PerBaseContent(PerBaseContent),
    PerSequenceGc(PerSequenceGc),
    PerBaseN(PerBaseN),
    LengthDistribution(LengthDistribution),
    Duplication(DuplicationLevels),
    Overrepresented(Overrepresented),
    AdapterContent(AdapterContent),
    KmerContent(KmerContent),
}

impl ModuleKind {
    fn analysis(&self) -> &dyn Analysis {
        match self {
            ModuleKind::Basic(m) => m,
            ModuleKind::PerBaseQuality(m) => m,
            ModuleKind::PerTileQuality(m) => m,
            ModuleKind::PerSequenceQuality(m) => m,
            ModuleKind::PerBaseContent(m) => m,
            ModuleKind::PerSequenceGc(m) => m,
            ModuleKind::PerBaseN(m) => m,
            ModuleKind::LengthDistribution(m) => m,
            ModuleKind::Duplication(m) => m,
            ModuleKind::Overrepresented(m) => m,
            ModuleKind::AdapterContent(m) => m,
            ModuleKind::KmerContent(m) => m,
        }
    }

    fn analysis_mut(&mut self) -> &mut dyn Analysis {
        match self {
            ModuleKind::Basic(m) => m,
            ModuleKind::PerBaseQuality(m) => m,
            ModuleKind::PerTileQuality(m) => m,
            ModuleKind::PerSequenceQuality(m) => m,
            ModuleKind::PerBaseContent(m) => m,
            ModuleKind::PerSequenceGc(m) => m,
            ModuleKind::PerBaseN(m) => m,
            ModuleKind::LengthDistribution(m) => m,
            ModuleKind::Duplication(m) => m,
            ModuleKind::Overrepresented(m) => m,
            ModuleKind::AdapterContent(m) => m,
            ModuleKind::KmerContent(m) => m,
        }
    }

    /// The limits key that can switch this module off. Basic statistics
    /// cannot be ignored.
    pub fn metric(&self) -> Option<Metric> {
        match self {
            ModuleKind::Basic(_) => None,
            ModuleKind::PerBaseQuality(_) => Some(Metric::QualityBase),
            ModuleKind::PerTileQuality(_) => Some(Metric::Tile),
            ModuleKind::PerSequenceQuality(_) => Some(Metric::QualitySequence),
            ModuleKind::PerBaseContent(_) => Some(Metric::Sequence),
            ModuleKind::PerSequenceGc(_) => Some(Metric::GcSequence),
            ModuleKind::PerBaseN(_) => Some(Metric::NContent),
            ModuleKind::LengthDistribution(_) => Some(Metric::SequenceLength),
            ModuleKind::Duplication(_) => Some(Metric::Duplication),
            ModuleKind::Overrepresented(_) => Some(Metric::Overrepresented),
            ModuleKind::AdapterContent(_) => Some(Metric::Adapter),
            ModuleKind::KmerContent(_) => Some(Metric::Kmer),
        }
    }
}

#[derive(Clone, Debug)]
struct ModuleReport {
    grade: Status,
    text: String,
    fragment: Fragment,
}

/// One analysis plus its cached results.
pub struct Module {
    kind: ModuleKind,
    report: Option<ModuleReport>,
}

impl Module {
    pub fn new(kind: ModuleKind) -> Self {
        Self { kind, report: None }
    }

    pub fn name(&self) -> &'static str {
        self.kind.analysis().name()
    }

    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    pub fn is_summarized(&self) -> bool {
        self.report.is_some()
    }

    /// Computes, grades and renders. Runs at most once; later calls return
    /// immediately and leave the cached results untouched.
    pub fn summarize(&mut self, snap: &Snapshot) -> Result<(), ModuleError> {
        if self.report.is_some() {
            return Ok(());
        }
        let analysis = self.kind.analysis_mut();
        analysis.summarize(snap);
        let grade = analysis.grade();

        let name = analysis.name();
        let mut text = String::new();
        render_block(analysis, grade, &mut text).map_err(|_| ModuleError::Render(name))?;
        let fragment = analysis.fragment();

        debug!(module = name, grade = grade.as_str_lower(), "module summarized");
        self.report = Some(ModuleReport {
            grade,
            text,
            fragment,
        });
        Ok(())
    }

    fn report(&self) -> Result<&ModuleReport, ModuleError> {
        self.report
            .as_ref()
            .ok_or_else(|| ModuleError::NotSummarized(self.name()))
    }

    pub fn grade(&self) -> Result<Status, ModuleError> {
        Ok(self.report()?.grade)
    }

    /// The full text block, header and terminator included.
    pub fn text(&self) -> Result<&str, ModuleError> {
        Ok(self.report()?.text.as_str())
    }

    pub fn fragment(&self) -> Result<&Fragment, ModuleError> {
        Ok(&self.report()?.fragment)
    }

    /// `GRADE\tModule name\tsource` as written to `summary.txt`.
    pub fn short_summary(&self, source: &str) -> Result<String, ModuleError> {
        let grade = self.grade()?;
        Ok(format!("{}\t{}\t{}", grade.as_str_upper(), self.name(), source))
    }
}

fn render_block(analysis: &dyn Analysis, grade: Status, w: &mut dyn fmt::Write) -> fmt::Result {
    writeln!(w, ">>{}\t{}", analysis.name(), grade.as_str_lower())?;
    analysis.write_body(w)?;
    writeln!(w, ">>END_MODULE")
}

/// Every module whose metric is not ignored, in report order.
pub fn build_modules(qc: &QcConfig, file_name: &str) -> Vec<Module> {
    let limits = &qc.limits;
    let kinds = vec![
        ModuleKind::Basic(BasicStats::new(file_name)),
        ModuleKind::PerBaseQuality(PerBaseQuality::new(
            limits.get(Metric::QualityBaseLower),
            limits.get(Metric::QualityBaseMedian),
            !qc.nogroup,
        )),
        ModuleKind::PerTileQuality(PerTileQuality::new(limits.get(Metric::Tile))),
        ModuleKind::PerSequenceQuality(PerSequenceQuality::new(
            limits.get(Metric::QualitySequence),
        )),
        ModuleKind::PerBaseContent(PerBaseContent::new(limits.get(Metric::Sequence))),
        ModuleKind::PerSequenceGc(PerSequenceGc::new(limits.get(Metric::GcSequence))),
        ModuleKind::PerBaseN(PerBaseN::new(limits.get(Metric::NContent))),
        ModuleKind::LengthDistribution(LengthDistribution::new(
            limits.get(Metric::SequenceLength),
        )),
        ModuleKind::Duplication(DuplicationLevels::new(limits.get(Metric::Duplication))),
        ModuleKind::Overrepresented(Overrepresented::new(
            limits.get(Metric::Overrepresented),
            qc.overrep_min_fraction,
            qc.contaminants.clone(),
        )),
        ModuleKind::AdapterContent(AdapterContent::new(
            limits.get(Metric::Adapter),
            qc.adapters.clone(),
        )),
        ModuleKind::KmerContent(KmerContent::new()),
    ];

    kinds
        .into_iter()
        .filter_map(|kind| match kind.metric() {
            Some(metric) if limits.is_ignored(metric) => {
                info!(module = kind.analysis().name(), %metric, "module skipped");
                None
            }
            _ => Some(Module::new(kind)),
        })
        .collect()
}

/// Summarizes all modules in parallel; they only share the snapshot.
pub fn summarize_all(modules: &mut [Module], snap: &Snapshot) -> Result<(), ModuleError> {
    std::thread::scope(|s| {
        let handles: Vec<_> = modules
            .iter_mut()
            .map(|m| s.spawn(move || m.summarize(snap)))
            .collect();
        for h in handles {
            match h.join() {
                Ok(res) => res?,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Limits;
    use crate::core::model::Read;
    use crate::core::stats::Accumulator;

    fn snapshot(reads: &[(&str, u8)]) -> Snapshot {
        let mut acc = Accumulator::new(7);
        for &(seq, q) in reads {
            let qual = vec![q; seq.len()];
            acc.observe(&Read {
                seq: seq.as_bytes(),
                qual: &qual,
                tile: None,
            });
        }
        acc.finalize()
    }

    #[test]
    fn accessors_fail_before_summarize() {
        let qc = QcConfig::builtin().unwrap();
        for m in build_modules(&qc, "reads.fq") {
            let name = m.name();
            assert_eq!(m.grade(), Err(ModuleError::NotSummarized(name)));
            assert_eq!(m.text().unwrap_err(), ModuleError::NotSummarized(name));
            assert!(m.fragment().is_err());
            assert!(m.short_summary("reads.fq").is_err());
        }
    }

    #[test]
    fn summarize_is_idempotent() {
        let qc = QcConfig::builtin().unwrap();
        let snap = snapshot(&[("ACGTACGTAC", 30), ("ACGTACGTAC", 10)]);
        let mut modules = build_modules(&qc, "reads.fq");
        summarize_all(&mut modules, &snap).unwrap();
        let before: Vec<(Status, String)> = modules
            .iter()
            .map(|m| (m.grade().unwrap(), m.text().unwrap().to_string()))
            .collect();

        let other = snapshot(&[("NNNN", 2)]);
        for m in &mut modules {
            m.summarize(&other).unwrap();
        }
        let after: Vec<(Status, String)> = modules
            .iter()
            .map(|m| (m.grade().unwrap(), m.text().unwrap().to_string()))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn text_blocks_are_framed() {
        let qc = QcConfig::builtin().unwrap();
        let snap = snapshot(&[("ACGTACGTAC", 30)]);
        let mut modules = build_modules(&qc, "reads.fq");
        summarize_all(&mut modules, &snap).unwrap();
        assert_eq!(modules.len(), 12);
        for m in &modules {
            let text = m.text().unwrap();
            let grade = m.grade().unwrap();
            assert!(text.starts_with(&format!(">>{}\t{}\n", m.name(), grade.as_str_lower())));
            assert!(text.ends_with(">>END_MODULE\n"));
            let summary = m.short_summary("reads.fq").unwrap();
            assert_eq!(
                summary,
                format!("{}\t{}\treads.fq", grade.as_str_upper(), m.name())
            );
        }
    }

    #[test]
    fn ignored_metrics_drop_their_modules() {
        let mut qc = QcConfig::builtin().unwrap();
        let text = include_str!("../../../config/limits.txt")
            .replace("kmer\tignore\t0", "kmer\tignore\t1")
            .replace("quality_base\tignore\t0", "quality_base\tignore\t1");
        qc.limits = Limits::parse(&text, "test").unwrap();
        let names: Vec<&str> = build_modules(&qc, "x").iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), 10);
        assert!(!names.contains(&"Kmer Content"));
        assert!(!names.contains(&"Per base sequence quality"));
        assert_eq!(names[0], "Basic Statistics");
    }

    #[test]
    fn empty_stream_grades_pass_everywhere() {
        let qc = QcConfig::builtin().unwrap();
        let snap = Accumulator::new(7).finalize();
        let mut modules = build_modules(&qc, "empty.fq");
        summarize_all(&mut modules, &snap).unwrap();
        for m in &modules {
            assert_eq!(m.grade().unwrap(), Status::Pass, "{}", m.name());
        }
    }
}
