use std::fmt;

use super::{Analysis, Fragment, Series, coords, grade_above};
use crate::core::config::Threshold;
use crate::core::model::{Status, percent};
use crate::core::stats::{Base, Snapshot};

#[derive(Clone, Debug, PartialEq)]
pub struct PerBaseContentRow {
    pub base: usize,
    pub g: f64,
    pub a: f64,
    pub t: f64,
    pub c: f64,
}

impl PerBaseContentRow {
    fn max_pairwise_diff(&self) -> f64 {
        let v = [self.a, self.c, self.t, self.g];
        let mut max = 0.0f64;
        for i in 0..v.len() {
            for j in i + 1..v.len() {
                max = max.max((v[i] - v[j]).abs());
            }
        }
        max
    }
}

pub struct PerBaseContent {
    limits: Threshold,
    pub rows: Vec<PerBaseContentRow>,
    pub max_diff: f64,
}

impl PerBaseContent {
    pub fn new(limits: Threshold) -> Self {
        Self {
            limits,
            rows: Vec::new(),
            max_diff: 0.0,
        }
    }
}

impl Analysis for PerBaseContent {
    fn name(&self) -> &'static str {
        "Per base sequence content"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        self.rows = (0..snap.max_read_length())
            .map(|pos| {
                let a = snap.base_count(pos, Base::A) as f64;
                let c = snap.base_count(pos, Base::C) as f64;
                let t = snap.base_count(pos, Base::T) as f64;
                let g = snap.base_count(pos, Base::G) as f64;
                let total = a + c + t + g + snap.n_count(pos) as f64;
                PerBaseContentRow {
                    base: pos + 1,
                    g: percent(g, total),
                    a: percent(a, total),
                    t: percent(t, total),
                    c: percent(c, total),
                }
            })
            .collect();
        self.max_diff = self
            .rows
            .iter()
            .map(PerBaseContentRow::max_pairwise_diff)
            .fold(0.0, f64::max);
    }

    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        grade_above(&mut status, self.max_diff, self.limits.warn, self.limits.error);
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "#Base\tG\tA\tT\tC")?;
        for row in &self.rows {
            writeln!(w, "{}\t{}\t{}\t{}\t{}", row.base, row.g, row.a, row.t, row.c)?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        let x = coords(self.rows.iter().map(|r| r.base as u64));
        let line = |name: &str, f: fn(&PerBaseContentRow) -> f64, color: &str| {
            Series::line(name, x.clone(), coords(self.rows.iter().map(f)), color)
        };
        Fragment::plot(
            vec![
                line("A", |r| r.a, "green"),
                line("C", |r| r.c, "blue"),
                line("T", |r| r.t, "red"),
                line("G", |r| r.g, "black"),
            ],
            "Position in read (bp)",
            "Percentage of calls",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Read;
    use crate::core::stats::Accumulator;

    #[test]
    fn composition_includes_n_in_denominator() {
        let mut acc = Accumulator::new(7);
        for seq in [b"AN", b"CA", b"GA", b"TA"] {
            acc.observe(&Read {
                seq: &seq[..],
                qual: &[30, 30],
                tile: None,
            });
        }
        let limits = Threshold {
            warn: 10.0,
            error: 20.0,
            ignore: 0.0,
        };
        let mut m = PerBaseContent::new(limits);
        m.summarize(&acc.finalize());
        assert_eq!(m.rows[0].a, 25.0);
        assert_eq!(m.rows[1].a, 75.0);
        assert_eq!(m.rows[1].c, 0.0);
        assert_eq!(m.max_diff, 75.0);
        assert_eq!(m.grade(), Status::Fail);
    }
}
