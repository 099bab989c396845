use std::fmt;

use super::{Analysis, Fragment, Series, coords, grade_above};
use crate::core::config::Threshold;
use crate::core::model::{Status, percent};
use crate::core::stats::Snapshot;

#[derive(Clone, Debug, PartialEq)]
pub struct PerBaseNRow {
    pub base: usize,
    pub n_percent: f64,
}

pub struct PerBaseN {
    limits: Threshold,
    pub rows: Vec<PerBaseNRow>,
}

impl PerBaseN {
    pub fn new(limits: Threshold) -> Self {
        Self {
            limits,
            rows: Vec::new(),
        }
    }
}

impl Analysis for PerBaseN {
    fn name(&self) -> &'static str {
        "Per base N content"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        self.rows = (0..snap.max_read_length())
            .map(|pos| PerBaseNRow {
                base: pos + 1,
                n_percent: percent(snap.n_count(pos) as f64, snap.reads_covering(pos) as f64),
            })
            .collect();
    }

    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        for row in &self.rows {
            grade_above(&mut status, row.n_percent, self.limits.warn, self.limits.error);
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "#Base\tN-Count")?;
        for row in &self.rows {
            writeln!(w, "{}\t{}", row.base, row.n_percent)?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        let series = Series::line(
            "N content",
            coords(self.rows.iter().map(|r| r.base as u64)),
            coords(self.rows.iter().map(|r| r.n_percent)),
            "red",
        );
        Fragment::plot(vec![series], "Position in read (bp)", "Percentage of N calls")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Read;
    use crate::core::stats::Accumulator;

    #[test]
    fn n_percent_uses_reads_covering_position() {
        let mut acc = Accumulator::new(7);
        for seq in ["ANN", "AC", "A", "AA"].map(str::as_bytes) {
            acc.observe(&Read {
                seq,
                qual: &[30; 3][..seq.len()],
                tile: None,
            });
        }
        let limits = Threshold {
            warn: 5.0,
            error: 20.0,
            ignore: 0.0,
        };
        let mut m = PerBaseN::new(limits);
        m.summarize(&acc.finalize());
        assert_eq!(m.rows[0].n_percent, 0.0);
        // three reads reach position 2, only the first reaches position 3
        assert!((m.rows[1].n_percent - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.rows[2].n_percent, 100.0);
        assert_eq!(m.grade(), Status::Fail);
    }
}
