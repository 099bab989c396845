use std::fmt;

use super::{Analysis, Fragment, Series, coords, grade_above};
use crate::core::config::{Adapter, Threshold};
use crate::core::model::{Status, percent};
use crate::core::stats::Snapshot;

/// Cumulative percentage of reads containing each adapter's k-mer at or
/// before `position` (1-based).
#[derive(Clone, Debug, PartialEq)]
pub struct AdapterRow {
    pub position: usize,
    pub values: Vec<f64>,
}

pub struct AdapterContent {
    limits: Threshold,
    adapters: Vec<Adapter>,
    pub rows: Vec<AdapterRow>,
}

impl AdapterContent {
    pub fn new(limits: Threshold, adapters: Vec<Adapter>) -> Self {
        Self {
            limits,
            adapters,
            rows: Vec::new(),
        }
    }
}

impl Analysis for AdapterContent {
    fn name(&self) -> &'static str {
        "Adapter Content"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        let mut cumulative = vec![0u64; self.adapters.len()];
        self.rows = (0..snap.kmer_positions())
            .map(|pos| {
                for (sum, adapter) in cumulative.iter_mut().zip(&self.adapters) {
                    *sum += snap.kmer_count(pos, adapter.kmer);
                }
                let total = snap.kmer_total(pos) as f64;
                AdapterRow {
                    position: pos + 1,
                    values: cumulative
                        .iter()
                        .map(|&c| percent(c as f64, total))
                        .collect(),
                }
            })
            .collect();
    }

    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        for &v in self.rows.iter().flat_map(|r| r.values.iter()) {
            grade_above(&mut status, v, self.limits.warn, self.limits.error);
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        write!(w, "#Position")?;
        for adapter in &self.adapters {
            write!(w, "\t{}", adapter.name)?;
        }
        writeln!(w)?;
        for row in &self.rows {
            write!(w, "{}", row.position)?;
            for v in &row.values {
                write!(w, "\t{v}")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        const PALETTE: [&str; 6] = ["red", "blue", "green", "black", "purple", "orange"];
        let x = coords(self.rows.iter().map(|r| r.position as u64));
        let series = self
            .adapters
            .iter()
            .enumerate()
            .map(|(i, adapter)| {
                Series::line(
                    adapter.name.as_str(),
                    x.clone(),
                    coords(self.rows.iter().map(|r| r.values[i])),
                    PALETTE[i % PALETTE.len()],
                )
            })
            .collect();
        Fragment::plot(series, "Position in read (bp)", "% Adapter")
    }
}
