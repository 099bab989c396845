use std::fmt;

use super::{Analysis, Fragment, Series, coords};
use crate::core::config::Threshold;
use crate::core::model::Status;
use crate::core::stats::Snapshot;

/// Mean quality of each tile relative to the mean of all tiles, per position.
pub struct PerTileQuality {
    limits: Threshold,
    max_len: usize,
    pub tiles: Vec<u32>,
    /// One row per entry of `tiles`, one value per position that tile reached.
    pub deviations: Vec<Vec<f64>>,
}

impl PerTileQuality {
    pub fn new(limits: Threshold) -> Self {
        Self {
            limits,
            max_len: 0,
            tiles: Vec::new(),
            deviations: Vec::new(),
        }
    }
}

impl Analysis for PerTileQuality {
    fn name(&self) -> &'static str {
        "Per tile sequence quality"
    }

    fn summarize(&mut self, snap: &Snapshot) {
        let tiles = snap.tiles();
        if tiles.is_empty() {
            return;
        }

        let width = tiles.iter().map(|(_, row)| row.len()).max().unwrap_or(0);
        let mut sums = vec![0u64; width];
        let mut counts = vec![0u64; width];
        for (_, row) in tiles.iter() {
            for pos in 0..row.len() {
                sums[pos] += row.sums[pos];
                counts[pos] += row.counts[pos];
            }
        }
        let overall: Vec<f64> = sums
            .iter()
            .zip(&counts)
            .map(|(&s, &c)| if c == 0 { 0.0 } else { s as f64 / c as f64 })
            .collect();

        self.max_len = width;
        self.tiles = tiles.sorted_tiles();
        self.deviations = self
            .tiles
            .iter()
            .filter_map(|&t| tiles.get(t))
            .map(|row| {
                (0..row.len())
                    .map(|pos| row.mean(pos).map_or(0.0, |m| m - overall[pos]))
                    .collect()
            })
            .collect();
    }

    fn grade(&self) -> Status {
        let mut status = Status::Pass;
        for dev in self.deviations.iter().flatten() {
            if *dev <= -self.limits.error {
                status.escalate(Status::Fail);
            } else if *dev <= -self.limits.warn {
                status.escalate(Status::Warn);
            }
        }
        status
    }

    fn write_body(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        if self.tiles.is_empty() {
            return Ok(());
        }
        writeln!(w, "#Tile\tBase\tMean")?;
        for (tile, row) in self.tiles.iter().zip(&self.deviations) {
            for (pos, dev) in row.iter().enumerate() {
                writeln!(w, "{}\t{}\t{}", tile, pos + 1, dev)?;
            }
        }
        Ok(())
    }

    fn fragment(&self) -> Fragment {
        if self.tiles.is_empty() {
            return Fragment::empty("No tile information in read names");
        }
        let mut heatmap = Series::new("heatmap", "Deviation from mean quality");
        heatmap.x = coords((1..=self.max_len).map(|p| p as u64));
        heatmap.y = coords(self.tiles.iter().map(|&t| t as u64));
        heatmap.z = self
            .deviations
            .iter()
            .map(|row| {
                let mut padded = row.clone();
                padded.resize(self.max_len, 0.0);
                padded
            })
            .collect();
        Fragment::plot(vec![heatmap], "Position in read (bp)", "Tile")
    }
}
