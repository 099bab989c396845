use std::fmt;

use super::{Analysis, Fragment, Series, coords};
use crate::core::config::Threshold;
use crate::core::model::Status;
use crate::core::stats::Snapshot;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LengthDistRow {
    pub length: usize,
    pub count: u64,
}

pub struct LengthDistribution {
    limits: Threshold,
    pub rows: Vec<LengthDistRow>,
    has_empty_read: bool,
}

impl LengthDistribution {
    pub fn new(limits: Threshold) -> Self {
        Self {
            limits,
            rows: Vec::new(),
            has_empty_read: false,
        }
    }
}

impl Analysis for LengthDistribution {
    fn name(&self) -> &'static str {
        "Sequence Length Distribution"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        self.rows = snap
            .length_histogram()
            .map(|(length, count)| LengthDistRow { length, count })
            .collect();
        self.has_empty_read = snap.length_count(0) > 0;
    }

    /// A non-zero threshold only switches its check on; the value itself is
    /// not compared.
    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        if self.limits.warn != 0.0 && self.rows.len() > 1 {
            status.escalate(Status::Warn);
        }
        if self.limits.error != 0.0 && self.has_empty_read {
            status.escalate(Status::Fail);
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "#Length\tCount")?;
        for row in &self.rows {
            writeln!(w, "{}\t{}", row.length, row.count)?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        let series = Series::bar(
            "Sequence length distribution",
            coords(self.rows.iter().map(|r| format!("{} bp", r.length))),
            coords(self.rows.iter().map(|r| r.count)),
            "rgba(55,128,191,1.0)",
        );
        Fragment::plot(vec![series], "Sequence length (bp)", "Number of reads")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Read;
    use crate::core::stats::Accumulator;

    fn limits() -> Threshold {
        Threshold {
            warn: 1.0,
            error: 1.0,
            ignore: 0.0,
        }
    }

    fn summarize(lengths: &[usize]) -> LengthDistribution {
        let mut acc = Accumulator::new(7);
        for &len in lengths {
            let seq = vec![b'A'; len];
            let qual = vec![30; len];
            acc.observe(&Read {
                seq: &seq,
                qual: &qual,
                tile: None,
            });
        }
        let mut m = LengthDistribution::new(limits());
        m.summarize(&acc.finalize());
        m
    }

    #[test]
    fn single_length_passes() {
        let m = summarize(&[50, 50, 50]);
        assert_eq!(m.rows, vec![LengthDistRow { length: 50, count: 3 }]);
        assert_eq!(m.grade(), Status::Pass);
    }

    #[test]
    fn mixed_lengths_warn_and_empty_reads_fail() {
        assert_eq!(summarize(&[50, 51]).grade(), Status::Warn);
        let m = summarize(&[0, 50]);
        assert_eq!(m.rows[0], LengthDistRow { length: 0, count: 1 });
        assert_eq!(m.grade(), Status::Fail);
    }
}
