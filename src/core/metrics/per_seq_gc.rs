use std::fmt;

use super::{Analysis, Fragment, Series, coords};
use crate::core::config::Threshold;
use crate::core::model::Status;
use crate::core::stats::{NUM_GC_BINS, Snapshot};

/// Result of fitting a normal curve to the per-read GC histogram.
#[derive(Clone, Debug, PartialEq)]
pub struct GcFit {
    /// Percentage of reads that would have to move to match the curve.
    pub deviation: f64,
    pub theoretical: [f64; NUM_GC_BINS],
}

/// Compares a GC histogram with a normal curve of the same total.
///
/// The centre is the mode, averaged with neighbours that stay above 90% of
/// the modal height; if that run reaches either end of the scale the raw
/// mode is used instead. The spread is the sample standard deviation around
/// that centre. Fewer than two reads give a zero deviation.
pub fn sum_deviation_from_normal(counts: &[f64; NUM_GC_BINS]) -> GcFit {
    let mut theoretical = [0.0f64; NUM_GC_BINS];
    let total: f64 = counts.iter().sum();
    if total < 2.0 {
        return GcFit {
            deviation: 0.0,
            theoretical,
        };
    }

    let mut first_mode = 0usize;
    let mut mode_count = 0.0f64;
    for (i, &c) in counts.iter().enumerate() {
        if c > mode_count {
            mode_count = c;
            first_mode = i;
        }
    }
    let floor = mode_count - mode_count / 10.0;

    let mut mode_sum = 0.0f64;
    let mut mode_members = 0usize;
    let mut fell_off_top = true;
    for (i, &c) in counts.iter().enumerate().skip(first_mode) {
        if c > floor {
            mode_sum += i as f64;
            mode_members += 1;
        } else {
            fell_off_top = false;
            break;
        }
    }
    let mut fell_off_bottom = true;
    for i in (0..first_mode).rev() {
        if counts[i] > floor {
            mode_sum += i as f64;
            mode_members += 1;
        } else {
            fell_off_bottom = false;
            break;
        }
    }
    let mode = if fell_off_top || fell_off_bottom {
        first_mode as f64
    } else {
        mode_sum / mode_members as f64
    };

    let variance: f64 = counts
        .iter()
        .enumerate()
        .map(|(i, &c)| (i as f64 - mode).powi(2) * c)
        .sum::<f64>()
        / (total - 1.0);
    let stdev = variance.sqrt();

    if stdev > 0.0 {
        for (i, slot) in theoretical.iter_mut().enumerate() {
            let z = i as f64 - mode;
            *slot = (-(z * z) / (2.0 * stdev * stdev)).exp();
        }
    } else {
        let centre = (mode.round() as usize).min(NUM_GC_BINS - 1);
        theoretical[centre] = 1.0;
    }
    let theoretical_sum: f64 = theoretical.iter().sum();
    for slot in theoretical.iter_mut() {
        *slot = *slot * total / theoretical_sum;
    }

    let diff: f64 = counts
        .iter()
        .zip(&theoretical)
        .map(|(c, t)| (c - t).abs())
        .sum();
    GcFit {
        deviation: 100.0 * diff / total,
        theoretical,
    }
}

pub struct PerSequenceGc {
    limits: Threshold,
    pub counts: [u64; NUM_GC_BINS],
    pub fit: Option<GcFit>,
}

impl PerSequenceGc {
    pub fn new(limits: Threshold) -> Self {
        Self {
            limits,
            counts: [0; NUM_GC_BINS],
            fit: None,
        }
    }

    pub fn deviation(&self) -> f64 {
        self.fit.as_ref().map_or(0.0, |f| f.deviation)
    }
}

impl Analysis for PerSequenceGc {
    fn name(&self) -> &'static str {
        "Per sequence GC content"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        self.counts = *snap.gc_histogram();
        let as_f64 = self.counts.map(|c| c as f64);
        self.fit = Some(sum_deviation_from_normal(&as_f64));
    }

    /// At or above the threshold counts, unlike most modules.
    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        let deviation = self.deviation();
        if deviation >= self.limits.error {
            status.escalate(Status::Fail);
        } else if deviation >= self.limits.warn {
            status.escalate(Status::Warn);
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(w, "#GC Content\tCount")?;
        for (i, count) in self.counts.iter().enumerate() {
            writeln!(w, "{i}\t{count}")?;
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        let x = coords((0..NUM_GC_BINS).map(|i| i as u64));
        let mut series = vec![Series::line(
            "GC count per read",
            x.clone(),
            coords(self.counts),
            "red",
        )];
        if let Some(fit) = &self.fit {
            series.push(Series::line(
                "Theoretical distribution",
                x,
                coords(fit.theoretical),
                "blue",
            ));
        }
        Fragment::plot(series, "Mean GC content (%)", "Number of reads")
    }
}
