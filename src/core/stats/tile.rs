use std::collections::HashMap;

/// Running quality sums of one tile, indexed by base position.
#[derive(Clone, Debug, Default)]
pub struct TileRow {
    pub sums: Vec<u64>,
    pub counts: Vec<u64>,
}

impl TileRow {
    pub fn add(&mut self, pos: usize, quality: u8) {
        if self.sums.len() <= pos {
            self.sums.resize(pos + 1, 0);
            self.counts.resize(pos + 1, 0);
        }
        self.sums[pos] += quality as u64;
        self.counts[pos] += 1;
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    pub fn mean(&self, pos: usize) -> Option<f64> {
        match self.counts.get(pos) {
            Some(&c) if c > 0 => Some(self.sums[pos] as f64 / c as f64),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TileQuality {
    tiles: HashMap<u32, TileRow>,
}

impl TileQuality {
    pub fn row_mut(&mut self, tile: u32) -> &mut TileRow {
        self.tiles.entry(tile).or_default()
    }

    pub fn get(&self, tile: u32) -> Option<&TileRow> {
        self.tiles.get(&tile)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &TileRow)> {
        self.tiles.iter().map(|(&t, r)| (t, r))
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tile ids in ascending order.
    pub fn sorted_tiles(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.tiles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
