use std::collections::BTreeMap;
use std::fmt;

use super::{Analysis, Fragment, Series, coords};
use crate::core::config::Threshold;
use crate::core::model::{Status, percent};
use crate::core::stats::Snapshot;

pub const DUP_LEVEL_LABELS: [&str; 16] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", ">10", ">50", ">100", ">500", ">1k", ">5k",
    ">10k+",
];

fn dup_slot(level: u64) -> usize {
    match level {
        10000.. => 15,
        5000.. => 14,
        1000.. => 13,
        500.. => 12,
        100.. => 11,
        50.. => 10,
        10.. => 9,
        _ => level.saturating_sub(1) as usize,
    }
}

/// Scales the number of distinct sequences seen exactly `dup_level` times up
/// to what the whole file probably held.
///
/// Only the first `count_at_limit` reads could add new sequences to the
/// duplication map, so a sequence first appearing later was never counted.
/// The correction divides by the probability of having seen such a sequence
/// at least once within that window.
pub fn get_corrected_count(count_at_limit: u64, num_reads: u64, dup_level: u64, num_obs: u64) -> f64 {
    let observed = num_obs as f64;
    if count_at_limit == num_reads {
        return observed;
    }
    // not enough reads left to hide another sequence at this level
    if num_reads.saturating_sub(num_obs) < count_at_limit {
        return observed;
    }

    let mut p_not_seeing = 1.0f64;
    let limit_of_caring = 1.0 - observed / (observed + 0.01);
    for i in 0..count_at_limit {
        let remaining = (num_reads - i) as f64;
        p_not_seeing *= (remaining - dup_level as f64) / remaining;
        if p_not_seeing < limit_of_caring {
            p_not_seeing = 0.0;
            break;
        }
    }
    observed / (1.0 - p_not_seeing)
}

#[derive(Clone, Debug, PartialEq)]
pub struct DuplicationRow {
    pub label: &'static str,
    pub deduplicated: f64,
    pub total: f64,
}

pub struct DuplicationLevels {
    limits: Threshold,
    pub rows: Vec<DuplicationRow>,
    pub total_deduplicated_pct: f64,
    has_data: bool,
}

impl DuplicationLevels {
    pub fn new(limits: Threshold) -> Self {
        Self {
            limits,
            rows: Vec::new(),
            total_deduplicated_pct: 0.0,
            has_data: false,
        }
    }
}

impl Analysis for DuplicationLevels {
    fn name(&self) -> &'static str {
        "Sequence Duplication Levels"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        // duplication level -> number of distinct sequences at that level
        let mut by_level: BTreeMap<u64, u64> = BTreeMap::new();
        for &count in snap.duplication().counts().values() {
            *by_level.entry(count).or_insert(0) += 1;
        }

        let mut dedup = [0.0f64; 16];
        let mut total = [0.0f64; 16];
        let mut seq_dedup = 0.0f64;
        let mut seq_total = 0.0f64;
        for (&level, &num_obs) in &by_level {
            let corrected =
                get_corrected_count(snap.count_at_limit(), snap.num_reads(), level, num_obs);
            let slot = dup_slot(level);
            dedup[slot] += corrected;
            total[slot] += corrected * level as f64;
            seq_dedup += corrected;
            seq_total += corrected * level as f64;
        }

        self.has_data = seq_total > 0.0;
        self.total_deduplicated_pct = percent(seq_dedup, seq_total);
        self.rows = DUP_LEVEL_LABELS
            .iter()
            .enumerate()
            .map(|(i, &label)| DuplicationRow {
                label,
                deduplicated: percent(dedup[i], seq_dedup),
                total: percent(total[i], seq_total),
            })
            .collect();
    }

    /// Low uniqueness is bad: the thresholds are lower bounds.
    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        if !self.has_data {
            return status;
        }
        if self.total_deduplicated_pct <= self.limits.error {
            status.escalate(Status::Fail);
        } else if self.total_deduplicated_pct <= self.limits.warn {
            status.escalate(Status::Warn);
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "#Total Deduplicated Percentage\t{}", self.total_deduplicated_pct)?;
        writeln!(
            w,
            "#Duplication Level\tPercentage of deduplicated\tPercentage of total"
        )?;
        for row in &self.rows {
            writeln!(w, "{}\t{}\t{}", row.label, row.deduplicated, row.total)?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        let x = coords(self.rows.iter().map(|r| r.label.to_string()));
        Fragment::plot(
            vec![
                Series::line(
                    "% Deduplicated sequences",
                    x.clone(),
                    coords(self.rows.iter().map(|r| r.deduplicated)),
                    "blue",
                ),
                Series::line(
                    "% Total sequences",
                    x,
                    coords(self.rows.iter().map(|r| r.total)),
                    "red",
                ),
            ],
            "Sequence duplication level",
            "Percentage",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Read;
    use crate::core::stats::Accumulator;

    fn limits() -> Threshold {
        Threshold {
            warn: 70.0,
            error: 50.0,
            ignore: 0.0,
        }
    }

    #[test]
    fn correction_is_a_no_op_when_nothing_was_missed() {
        assert_eq!(get_corrected_count(1000, 1000, 3, 17), 17.0);
        assert_eq!(get_corrected_count(900, 1000, 2, 150), 150.0);
    }

    #[test]
    fn correction_scales_up_when_reads_were_missed() {
        let corrected = get_corrected_count(50, 1000, 2, 10);
        assert!(corrected > 10.0);
        // p(not seeing) is about 0.903 after 50 reads
        assert!((corrected - 102.51).abs() < 0.01, "corrected {corrected}");
    }

    #[test]
    fn slots_follow_level_buckets() {
        assert_eq!(dup_slot(1), 0);
        assert_eq!(dup_slot(9), 8);
        assert_eq!(dup_slot(10), 9);
        assert_eq!(dup_slot(49), 9);
        assert_eq!(dup_slot(100), 11);
        assert_eq!(dup_slot(999), 12);
        assert_eq!(dup_slot(1000), 13);
        assert_eq!(dup_slot(20000), 15);
    }

    fn summarize(reads: &[&str]) -> DuplicationLevels {
        let mut acc = Accumulator::new(7);
        for seq in reads {
            let qual = vec![30; seq.len()];
            acc.observe(&Read {
                seq: seq.as_bytes(),
                qual: &qual,
                tile: None,
            });
        }
        let mut m = DuplicationLevels::new(limits());
        m.summarize(&acc.finalize());
        m
    }

    #[test]
    fn mixed_duplication_levels() {
        let m = summarize(&["AAAA", "AAAA", "CCCC", "GGGG"]);
        // 3 distinct out of 4
        assert_eq!(m.total_deduplicated_pct, 75.0);
        assert!((m.rows[0].deduplicated - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.rows[0].total, 50.0);
        assert_eq!(m.rows[1].total, 50.0);
        assert_eq!(m.grade(), Status::Pass);
    }
}
