use std::fmt;
use std::sync::Arc;

use super::{Analysis, Fragment, grade_above};
use crate::core::config::Threshold;
use crate::core::contaminants::ContaminantMatcher;
use crate::core::model::{Status, percent};
use crate::core::stats::Snapshot;

#[derive(Clone, Debug, PartialEq)]
pub struct OverrepRow {
    pub sequence: String,
    pub count: u64,
    pub percent: f64,
    pub source: String,
}

pub struct Overrepresented {
    limits: Threshold,
    min_fraction: f64,
    matcher: Arc<ContaminantMatcher>,
    pub rows: Vec<OverrepRow>,
}

impl Overrepresented {
    pub fn new(limits: Threshold, min_fraction: f64, matcher: Arc<ContaminantMatcher>) -> Self {
        Self {
            limits,
            min_fraction,
            matcher,
            rows: Vec::new(),
        }
    }
}

impl Analysis for Overrepresented {
    fn name(&self) -> &'static str {
        "Overrepresented sequences"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        let num_reads = snap.num_reads();
        let cutoff = num_reads as f64 * self.min_fraction;
        let mut hits: Vec<(&[u8], u64)> = snap
            .duplication()
            .counts()
            .iter()
            .filter(|&(_, &count)| count as f64 > cutoff)
            .map(|(seq, &count)| (seq.as_slice(), count))
            .collect();
        hits.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        self.rows = hits
            .into_iter()
            .map(|(seq, count)| OverrepRow {
                sequence: String::from_utf8_lossy(seq).into_owned(),
                count,
                percent: percent(count as f64, num_reads as f64),
                source: self.matcher.best_match(seq).to_string(),
            })
            .collect();
    }

    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        for row in &self.rows {
            grade_above(&mut status, row.percent, self.limits.warn, self.limits.error);
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "#Sequence\tCount\tPercentage\tPossible Source")?;
        for row in &self.rows {
            writeln!(
                w,
                "{}\t{}\t{}\t{}",
                row.sequence, row.count, row.percent, row.source
            )?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        if self.rows.is_empty() {
            return Fragment::empty("No overrepresented sequences");
        }
        Fragment::Table {
            header: ["Sequence", "Count", "Percentage", "Possible Source"]
                .map(String::from)
                .to_vec(),
            rows: self
                .rows
                .iter()
                .map(|r| {
                    vec![
                        r.sequence.clone(),
                        r.count.to_string(),
                        format!("{:.4}", r.percent),
                        r.source.clone(),
                    ]
                })
                .collect(),
        }
    }
}
