use std::collections::HashMap;

/// Counters addressed by `(position, symbol)`.
///
/// Positions below `cutoff` live in one flat vector indexed by
/// `(position << shift) | symbol`, grown on demand but never past the cutoff.
/// Positions at or above the cutoff get one row each in a hash map, so long
/// reads cost memory proportional to the distinct positions they reach.
/// Callers never see the split.
#[derive(Clone, Debug)]
pub struct PositionTable {
    shift: u32,
    cutoff: usize,
    fixed: Vec<u64>,
    overflow: HashMap<usize, Vec<u64>>,
}

impl PositionTable {
    pub fn new(shift: u32, cutoff: usize) -> Self {
        Self {
            shift,
            cutoff,
            fixed: Vec::new(),
            overflow: HashMap::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        1 << self.shift
    }

    #[inline]
    pub fn add(&mut self, pos: usize, symbol: usize, n: u64) {
        debug_assert!(symbol < self.width());
        if pos < self.cutoff {
            let idx = (pos << self.shift) | symbol;
            if idx >= self.fixed.len() {
                self.fixed.resize((pos + 1) << self.shift, 0);
            }
            self.fixed[idx] += n;
        } else {
            let width = self.width();
            self.overflow.entry(pos).or_insert_with(|| vec![0; width])[symbol] += n;
        }
    }

    #[inline]
    pub fn get(&self, pos: usize, symbol: usize) -> u64 {
        self.row(pos).map_or(0, |row| row[symbol])
    }

    /// All symbol counters of one position, `None` if nothing was recorded
    /// there.
    pub fn row(&self, pos: usize) -> Option<&[u64]> {
        if pos < self.cutoff {
            let start = pos << self.shift;
            let end = (pos + 1) << self.shift;
            self.fixed.get(start..end)
        } else {
            self.overflow.get(&pos).map(|v| v.as_slice())
        }
    }

    pub fn overflow_positions(&self) -> usize {
        self.overflow.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_and_overflow_positions_share_one_interface() {
        let mut t = PositionTable::new(2, 4);
        t.add(0, 1, 3);
        t.add(3, 3, 1);
        t.add(4, 2, 5);
        t.add(1000, 0, 7);

        assert_eq!(t.get(0, 1), 3);
        assert_eq!(t.get(3, 3), 1);
        assert_eq!(t.get(4, 2), 5);
        assert_eq!(t.get(1000, 0), 7);
        assert_eq!(t.get(999, 0), 0);
        assert_eq!(t.get(2, 0), 0);
        assert_eq!(t.overflow_positions(), 2);
    }

    #[test]
    fn rows_are_symbol_slices() {
        let mut t = PositionTable::new(1, 2);
        t.add(1, 0, 2);
        t.add(1, 1, 4);
        t.add(5, 1, 1);
        assert_eq!(t.row(1), Some(&[2u64, 4][..]));
        assert_eq!(t.row(5), Some(&[0u64, 1][..]));
        assert_eq!(t.row(3), None);
    }

    #[test]
    fn fixed_storage_stops_at_cutoff() {
        let mut t = PositionTable::new(7, 10);
        t.add(50, 40, 1);
        assert_eq!(t.fixed.len(), 0);
        t.add(9, 40, 1);
        assert_eq!(t.fixed.len(), 10 << 7);
    }
}
