use std::fmt;

use super::{Analysis, Fragment};
use crate::core::model::{Status, decode_kmer};
use crate::core::stats::Snapshot;

/// Rows shown in the text block; all of them are kept for the grade.
pub const KMER_REPORT_LIMIT: usize = 20;
const MIN_OBS_EXP: f64 = 5.0;

#[derive(Clone, Debug, PartialEq)]
pub struct KmerRow {
    pub sequence: String,
    pub count: u64,
    pub p_value: f64,
    pub obs_exp_max: f64,
    /// 1-based start of the k-mer where `obs_exp_max` was reached.
    pub max_pos: usize,
}

/// Positionally enriched k-mers. Any reported k-mer fails the module, so
/// the `kmer` warn/error limits are not consulted; only `ignore` applies.
#[derive(Default)]
pub struct KmerContent {
    pub rows: Vec<KmerRow>,
}

impl KmerContent {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analysis for KmerContent {
    fn name(&self) -> &'static str {
        "Kmer Content"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        self.rows.clear();
        let k = snap.kmer_size();
        let num_pos = snap.kmer_positions();
        if num_pos < k {
            return;
        }
        let num_kmers = 1usize << (2 * k);
        let positions = k - 1..num_pos;

        let totals: Vec<u64> = (0..num_kmers)
            .map(|kmer| positions.clone().map(|pos| snap.kmer_count(pos, kmer)).sum())
            .collect();
        let num_seen = totals.iter().filter(|&&t| t > 0).count();
        if num_seen == 0 {
            return;
        }

        for (kmer, &total) in totals.iter().enumerate() {
            if total == 0 {
                continue;
            }
            let mut best: Option<(f64, usize)> = None;
            for pos in positions.clone() {
                let counted = snap.kmer_total(pos);
                if counted == 0 {
                    continue;
                }
                let expected = counted as f64 / num_seen as f64;
                let ratio = snap.kmer_count(pos, kmer) as f64 / expected;
                if best.is_none_or(|(max, _)| ratio > max) {
                    best = Some((ratio, pos));
                }
            }
            if let Some((ratio, pos)) = best
                && ratio > MIN_OBS_EXP
            {
                self.rows.push(KmerRow {
                    sequence: decode_kmer(kmer, k),
                    count: total,
                    p_value: 0.0,
                    obs_exp_max: ratio,
                    max_pos: pos + 2 - k,
                });
            }
        }

        self.rows.sort_by(|a, b| b.obs_exp_max.total_cmp(&a.obs_exp_max));
    }

    fn grade(&self) -> Status {
        if self.rows.is_empty() {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            w,
            "#Sequence\tCount\tPValue\tObs/Exp Max\tMax Obs/Exp Position"
        )?;
        for row in self.rows.iter().take(KMER_REPORT_LIMIT) {
            writeln!(
                w,
                "{}\t{}\t{:.1}\t{}\t{}",
                row.sequence, row.count, row.p_value, row.obs_exp_max, row.max_pos
            )?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        if self.rows.is_empty() {
            return Fragment::empty("No overrepresented k-mers");
        }
        Fragment::Table {
            header: ["Sequence", "Count", "PValue", "Obs/Exp Max", "Max Obs/Exp Position"]
                .map(String::from)
                .to_vec(),
            rows: self
                .rows
                .iter()
                .take(KMER_REPORT_LIMIT)
                .map(|r| {
                    vec![
                        r.sequence.clone(),
                        r.count.to_string(),
                        format!("{:.1}", r.p_value),
                        format!("{:.2}", r.obs_exp_max),
                        r.max_pos.to_string(),
                    ]
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Read;
    use crate::core::stats::Accumulator;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn positional_enrichment_is_reported() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut acc = Accumulator::new(3);
        for _ in 0..640 {
            let mut seq = b"ACG".to_vec();
            seq.extend((0..37).map(|_| b"ACGT"[rng.gen_range(0..4)]));
            acc.observe(&Read {
                seq: &seq,
                qual: &[30; 40],
                tile: None,
            });
        }
        let mut m = KmerContent::new();
        m.summarize(&acc.finalize());

        assert!(!m.rows.is_empty());
        assert_eq!(m.rows[0].sequence, "ACG");
        assert_eq!(m.rows[0].max_pos, 1);
        assert_eq!(m.rows[0].p_value, 0.0);
        assert!(m.rows.iter().all(|r| r.obs_exp_max > MIN_OBS_EXP));
        assert!(m.rows.windows(2).all(|w| w[0].obs_exp_max >= w[1].obs_exp_max));
        assert_eq!(m.grade(), Status::Fail);

        let mut body = String::new();
        m.write_body(&mut body).unwrap();
        assert!(body.lines().count() <= 1 + KMER_REPORT_LIMIT);
        assert!(body.lines().nth(1).unwrap().starts_with("ACG\t"));
    }

    #[test]
    fn uniform_reads_pass() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut acc = Accumulator::new(3);
        for _ in 0..2000 {
            let seq: Vec<u8> = (0..30).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect();
            acc.observe(&Read {
                seq: &seq,
                qual: &[30; 30],
                tile: None,
            });
        }
        let mut m = KmerContent::new();
        m.summarize(&acc.finalize());
        assert!(m.rows.is_empty());
        assert_eq!(m.grade(), Status::Pass);
    }

    #[test]
    fn all_n_reads_do_not_dilute_enrichment() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut clean = Accumulator::new(3);
        let mut mixed = Accumulator::new(3);
        for _ in 0..640 {
            let mut seq = b"ACG".to_vec();
            seq.extend((0..37).map(|_| b"ACGT"[rng.gen_range(0..4)]));
            let read = Read {
                seq: &seq,
                qual: &[30; 40],
                tile: None,
            };
            clean.observe(&read);
            mixed.observe(&read);
            mixed.observe(&Read {
                seq: &[b'N'; 40],
                qual: &[30; 40],
                tile: None,
            });
        }
        let mut from_clean = KmerContent::new();
        from_clean.summarize(&clean.finalize());
        let mut from_mixed = KmerContent::new();
        from_mixed.summarize(&mixed.finalize());

        assert!(!from_mixed.rows.is_empty());
        assert_eq!(from_mixed.rows, from_clean.rows);
    }

    #[test]
    fn reads_shorter_than_k_have_no_kmers() {
        let mut acc = Accumulator::new(5);
        acc.observe(&Read {
            seq: b"ACG",
            qual: &[30; 3],
            tile: None,
        });
        let mut m = KmerContent::new();
        m.summarize(&acc.finalize());
        assert!(m.rows.is_empty());
    }
}
