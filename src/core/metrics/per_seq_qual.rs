use std::fmt;

use super::{Analysis, Fragment, Series, coords};
use crate::core::config::Threshold;
use crate::core::model::Status;
use crate::core::stats::Snapshot;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerSeqQualRow {
    pub mean_q: usize,
    pub count: u64,
}

pub struct PerSequenceQuality {
    limits: Threshold,
    pub rows: Vec<PerSeqQualRow>,
    /// Most frequent per-read mean quality; `None` without reads.
    pub mode: Option<usize>,
}

impl PerSequenceQuality {
    pub fn new(limits: Threshold) -> Self {
        Self {
            limits,
            rows: Vec::new(),
            mode: None,
        }
    }
}

impl Analysis for PerSequenceQuality {
    fn name(&self) -> &'static str {
        "Per sequence quality scores"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        self.rows.clear();
        self.mode = None;
        let mut best = 0u64;
        for (q, &count) in snap.mean_quality_histogram().iter().enumerate() {
            if count == 0 {
                continue;
            }
            if count > best {
                best = count;
                self.mode = Some(q);
            }
            self.rows.push(PerSeqQualRow { mean_q: q, count });
        }
    }

    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        if let Some(mode) = self.mode {
            let mode = mode as f64;
            if mode < self.limits.warn {
                status.escalate(Status::Warn);
            }
            if mode < self.limits.error {
                status.escalate(Status::Fail);
            }
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "#Quality\tCount")?;
        for row in &self.rows {
            writeln!(w, "{}\t{}", row.mean_q, row.count)?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        let series = Series::line(
            "Sequence quality distribution",
            coords(self.rows.iter().map(|r| r.mean_q as u64)),
            coords(self.rows.iter().map(|r| r.count)),
            "red",
        );
        Fragment::plot(
            vec![series],
            "Mean sequence quality (Phred score)",
            "Number of reads",
        )
    }
}
