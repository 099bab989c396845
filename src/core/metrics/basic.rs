use std::fmt;

use super::{Analysis, Fragment};
use crate::core::model::{Status, percent};
use crate::core::stats::Snapshot;

const FILE_TYPE: &str = "Conventional base calls";
const ENCODING: &str = "Sanger / Illumina 1.9";

#[derive(Clone, Debug, Default)]
pub struct BasicStats {
    pub file_name: String,
    pub total_sequences: u64,
    pub poor_quality: u64,
    pub min_len: usize,
    pub max_len: usize,
    pub gc_percent: f64,
}

impl BasicStats {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            ..Self::default()
        }
    }

    fn length_label(&self, sep: &str) -> String {
        if self.min_len == self.max_len {
            self.min_len.to_string()
        } else {
            format!("{}{}{}", self.min_len, sep, self.max_len)
        }
    }
}

impl Analysis for BasicStats {
    fn name(&self) -> &'static str {
        "Basic Statistics"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        self.total_sequences = snap.num_reads();
        self.min_len = snap.min_read_length();
        self.max_len = snap.max_read_length();
        self.gc_percent = percent(snap.total_gc() as f64, snap.total_bases() as f64);
    }

    fn grade(&self) -> Status {
        Status::Pass
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "#Measure\tValue")?;
        writeln!(w, "Filename\t{}", self.file_name)?;
        writeln!(w, "File type\t{FILE_TYPE}")?;
        writeln!(w, "Encoding\t{ENCODING}")?;
        writeln!(w, "Total Sequences\t{}", self.total_sequences)?;
        writeln!(w, "Sequences flagged as poor quality\t{}", self.poor_quality)?;
        writeln!(w, "Sequence length\t{}", self.length_label("-"))?;
        writeln!(w, "%GC\t{}", self.gc_percent as u64)
    }

    fn fragment(&self) -> Fragment {
        let row = |k: &str, v: String| vec![k.to_string(), v];
        Fragment::Table {
            header: vec!["Measure".to_string(), "Value".to_string()],
            rows: vec![
                row("Filename", self.file_name.clone()),
                row("File type", FILE_TYPE.to_string()),
                row("Encoding", ENCODING.to_string()),
                row("Total Sequences", self.total_sequences.to_string()),
                row(
                    "Sequences flagged as poor quality",
                    self.poor_quality.to_string(),
                ),
                row("Sequence length", self.length_label(" - ")),
                row("%GC", format!("{:.1}", self.gc_percent)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Read;
    use crate::core::stats::Accumulator;

    #[test]
    fn reports_length_range_and_truncated_gc() {
        let mut acc = Accumulator::new(7);
        for seq in ["GGGA", "GCAAAT"].map(str::as_bytes) {
            acc.observe(&Read {
                seq,
                qual: &[30; 6][..seq.len()],
                tile: None,
            });
        }
        let mut m = BasicStats::new("sample.fq");
        m.summarize(&acc.finalize());
        assert_eq!(m.total_sequences, 2);
        let mut body = String::new();
        m.write_body(&mut body).unwrap();
        assert!(body.contains("Sequence length\t4-6\n"));
        // 5 of 10 bases
        assert!(body.contains("%GC\t50\n"));
        assert!(body.contains("Filename\tsample.fq\n"));
    }
}
