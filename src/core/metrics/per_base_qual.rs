use std::fmt;

use super::{Analysis, Coord, Fragment, Series, coords};
use crate::core::config::Threshold;
use crate::core::model::{NUM_QUALITY_VALUES, Status, quantiles};
use crate::core::stats::Snapshot;

/// Contiguous positions reported as one row. 0-based, `end` inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BaseGroup {
    pub start: usize,
    pub end: usize,
}

impl BaseGroup {
    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }

    /// 1-based label: `"7"` or `"10-14"`.
    pub fn label(&self) -> String {
        if self.start == self.end {
            (self.start + 1).to_string()
        } else {
            format!("{}-{}", self.start + 1, self.end + 1)
        }
    }
}

/// Splits `0..num_bases` into report rows.
///
/// Ungrouped, every position is its own row. Grouped, rows are one base wide
/// up to position 9, then 5 wide up to 49, 10 up to 99, 50 up to 499, 100 up
/// to 999 and 500 beyond. The last row is cut at the final position.
pub fn make_base_groups(num_bases: usize, grouped: bool) -> Vec<BaseGroup> {
    if !grouped {
        return (0..num_bases)
            .map(|i| BaseGroup { start: i, end: i })
            .collect();
    }

    let mut groups = Vec::new();
    let mut start = 0usize;
    let mut width = 1usize;
    while start < num_bases {
        let end = (start + width - 1).min(num_bases - 1);
        groups.push(BaseGroup { start, end });
        start += width;
        width = match start {
            9 => 5,
            49 => 10,
            99 => 50,
            499 => 100,
            999 => 500,
            _ => width,
        };
    }
    groups
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerBaseQualRow {
    pub group: BaseGroup,
    pub mean: f64,
    pub median: usize,
    pub lower_quartile: usize,
    pub upper_quartile: usize,
    pub p10: usize,
    pub p90: usize,
}

pub struct PerBaseQuality {
    lower: Threshold,
    median: Threshold,
    grouped: bool,
    pub rows: Vec<PerBaseQualRow>,
}

impl PerBaseQuality {
    pub fn new(lower: Threshold, median: Threshold, grouped: bool) -> Self {
        Self {
            lower,
            median,
            grouped,
            rows: Vec::new(),
        }
    }

    fn row_status(&self, row: &PerBaseQualRow) -> Status {
        let (lq, med) = (row.lower_quartile as f64, row.median as f64);
        if lq < self.lower.error || med < self.median.error {
            Status::Fail
        } else if lq < self.lower.warn || med < self.median.warn {
            Status::Warn
        } else {
            Status::Pass
        }
    }
}

fn summarize_group(snap: &Snapshot, group: BaseGroup) -> PerBaseQualRow {
    let mut hist = [0u64; NUM_QUALITY_VALUES];
    let mut bases = 0u64;
    for pos in group.start..=group.end {
        for (slot, &c) in hist.iter_mut().zip(snap.quality_histogram(pos)) {
            *slot += c;
        }
        bases += snap.reads_covering(pos);
    }

    let weighted: u64 = hist.iter().enumerate().map(|(q, &c)| q as u64 * c).sum();
    let mean = if bases == 0 {
        0.0
    } else {
        weighted as f64 / bases as f64
    };
    let [p10, lower_quartile, median, upper_quartile, p90] =
        quantiles(&hist, bases, [0.1, 0.25, 0.5, 0.75, 0.9]);

    PerBaseQualRow {
        group,
        mean,
        median,
        lower_quartile,
        upper_quartile,
        p10,
        p90,
    }
}

impl Analysis for PerBaseQuality {
    fn name(&self) -> &'static str {
        "Per base sequence quality"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        self.rows = make_base_groups(snap.max_read_length(), self.grouped)
            .into_iter()
            .map(|g| summarize_group(snap, g))
            .collect();
    }

    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        for row in &self.rows {
            status.escalate(self.row_status(row));
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            w,
            "#Base\tMean\tMedian\tLower Quartile\tUpper Quartile\t10th Percentile\t90th Percentile"
        )?;
        for row in &self.rows {
            writeln!(
                w,
                "{}\t{}\t{}.0\t{}.0\t{}.0\t{}.0\t{}.0",
                row.group.label(),
                row.mean,
                row.median,
                row.lower_quartile,
                row.upper_quartile,
                row.p10,
                row.p90
            )?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        let labels: Vec<Coord> = coords(self.rows.iter().map(|r| r.group.label()));
        let column = |f: fn(&PerBaseQualRow) -> usize| -> Vec<f64> {
            self.rows.iter().map(|r| f(r) as f64).collect()
        };

        let mut quartiles = Series::new("box", "Quality");
        quartiles.x = labels.clone();
        quartiles.extra.insert("lowerfence", column(|r| r.p10));
        quartiles.extra.insert("q1", column(|r| r.lower_quartile));
        quartiles.extra.insert("median", column(|r| r.median));
        quartiles.extra.insert("q3", column(|r| r.upper_quartile));
        quartiles.extra.insert("upperfence", column(|r| r.p90));

        let mean = Series::line(
            "Mean",
            labels,
            coords(self.rows.iter().map(|r| r.mean)),
            "#1f4e9c",
        );
        Fragment::plot(vec![quartiles, mean], "Position in read (bp)", "Phred quality")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Read;
    use crate::core::stats::Accumulator;

    fn group_starting_at(groups: &[BaseGroup], start: usize) -> BaseGroup {
        *groups.iter().find(|g| g.start == start).unwrap()
    }

    #[test]
    fn ungrouped_short_reads_have_one_group_per_position() {
        for len in 1..=9 {
            let groups = make_base_groups(len, false);
            assert_eq!(groups.len(), len);
            assert!(groups.iter().all(|g| g.width() == 1));
        }
        assert_eq!(make_base_groups(9, true), make_base_groups(9, false));
    }

    #[test]
    fn grouped_widths_follow_step_table() {
        let groups = make_base_groups(1000, true);
        assert_eq!(group_starting_at(&groups, 8).width(), 1);
        assert_eq!(group_starting_at(&groups, 9).width(), 5);
        assert_eq!(group_starting_at(&groups, 44).width(), 5);
        assert_eq!(group_starting_at(&groups, 49).width(), 10);
        assert_eq!(group_starting_at(&groups, 89).width(), 10);
        assert_eq!(group_starting_at(&groups, 99).width(), 50);
        assert_eq!(group_starting_at(&groups, 449).width(), 50);
        assert_eq!(group_starting_at(&groups, 499).width(), 100);
        assert_eq!(group_starting_at(&groups, 899).width(), 100);
        assert_eq!(*groups.last().unwrap(), BaseGroup { start: 999, end: 999 });
        assert_eq!(groups.len(), 9 + 8 + 5 + 8 + 5 + 1);

        // contiguous, no gaps
        for pair in groups.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
        assert_eq!(group_starting_at(&groups, 9).label(), "10-14");
    }

    #[test]
    fn long_reads_use_500_wide_groups() {
        let groups = make_base_groups(2000, true);
        assert_eq!(group_starting_at(&groups, 999).width(), 500);
        assert_eq!(*groups.last().unwrap(), BaseGroup { start: 1999, end: 1999 });
    }

    #[test]
    fn quartiles_and_grade_per_group() {
        let mut acc = Accumulator::new(7);
        for q in [2u8, 2, 30, 30, 30, 30, 30, 30, 30, 30] {
            let qual = [40, q];
            acc.observe(&Read {
                seq: b"AC",
                qual: &qual,
                tile: None,
            });
        }
        let snap = acc.finalize();
        let lower = Threshold {
            warn: 10.0,
            error: 5.0,
            ignore: 0.0,
        };
        let median = Threshold {
            warn: 25.0,
            error: 20.0,
            ignore: 0.0,
        };
        let mut m = PerBaseQuality::new(lower, median, false);
        m.summarize(&snap);
        assert_eq!(m.rows.len(), 2);
        assert_eq!(m.rows[0].median, 40);
        assert_eq!(m.rows[0].mean, 40.0);
        assert_eq!(m.rows[1].p10, 2);
        assert_eq!(m.rows[1].lower_quartile, 30);
        assert_eq!(m.rows[1].median, 30);
        assert!((m.rows[1].mean - 24.4).abs() < 1e-9);
        assert_eq!(m.grade(), Status::Pass);

        let strict = Threshold {
            warn: 35.0,
            error: 31.0,
            ignore: 0.0,
        };
        let mut m = PerBaseQuality::new(lower, strict, false);
        m.summarize(&snap);
        assert_eq!(m.grade(), Status::Fail);
    }
}
