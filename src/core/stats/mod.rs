//! Streaming sufficient statistics.
//!
//! [`Accumulator`] folds reads one at a time into bounded counters;
//! [`Accumulator::finalize`] consumes it and hands back an immutable
//! [`Snapshot`] that every analysis module reads.

use crate::core::model::{MAX_QUALITY, NUM_QUALITY_VALUES, QUALITY_SHIFT, Read, actg_to_2bit};

mod duplication;
mod positional;
mod tile;

pub use duplication::{
    DUP_READ_MAX_SIZE, DUP_READ_TRUNCATE_SIZE, DUP_UNIQUE_CUTOFF, DuplicationMap, canonical_key,
};
pub use positional::PositionTable;
pub use tile::{TileQuality, TileRow};

/// Positions below this use direct-indexed arrays; above it, keyed maps.
pub const NUM_BASES: usize = 1000;
/// K-mers (and therefore adapters) are tracked up to this position.
pub const KMER_MAX_BASES: usize = 500;
pub const DEFAULT_KMER_SIZE: usize = 7;
pub const MAX_KMER_SIZE: usize = 7;
pub const BASE_SHIFT: u32 = 2;
pub const NUM_GC_BINS: usize = 101;

#[derive(Clone, Debug)]
pub struct Accumulator {
    kmer_size: usize,
    num_reads: u64,
    total_bases: u64,
    total_gc: u64,
    min_read_length: usize,
    max_read_length: usize,
    base_counts: PositionTable,
    n_counts: PositionTable,
    quality_counts: PositionTable,
    length_counts: PositionTable,
    mean_quality_counts: [u64; NUM_QUALITY_VALUES],
    gc_counts: [u64; NUM_GC_BINS],
    kmer_counts: PositionTable,
    kmer_totals: Vec<u64>,
    tiles: TileQuality,
    duplication: DuplicationMap,
}

impl Accumulator {
    /// `kmer_size` must be in `1..=MAX_KMER_SIZE`; the config layer checks it.
    pub fn new(kmer_size: usize) -> Self {
        debug_assert!((1..=MAX_KMER_SIZE).contains(&kmer_size));
        Self {
            kmer_size,
            num_reads: 0,
            total_bases: 0,
            total_gc: 0,
            min_read_length: usize::MAX,
            max_read_length: 0,
            base_counts: PositionTable::new(BASE_SHIFT, NUM_BASES),
            n_counts: PositionTable::new(0, NUM_BASES),
            quality_counts: PositionTable::new(QUALITY_SHIFT, NUM_BASES),
            length_counts: PositionTable::new(0, NUM_BASES),
            mean_quality_counts: [0; NUM_QUALITY_VALUES],
            gc_counts: [0; NUM_GC_BINS],
            kmer_counts: PositionTable::new(2 * kmer_size as u32, KMER_MAX_BASES),
            kmer_totals: vec![0; KMER_MAX_BASES],
            tiles: TileQuality::default(),
            duplication: DuplicationMap::new(),
        }
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads
    }

    pub fn observe(&mut self, read: &Read<'_>) {
        let len = read.seq.len();
        self.num_reads += 1;
        self.total_bases += len as u64;
        self.min_read_length = self.min_read_length.min(len);
        self.max_read_length = self.max_read_length.max(len);
        self.length_counts.add(len, 0, 1);
        self.duplication.observe(read.seq, self.num_reads);
        if len == 0 {
            return;
        }

        let k = self.kmer_size;
        let mask = (1usize << (2 * k)) - 1;
        let mut kmer = 0usize;
        let mut valid_run = 0usize;
        let mut gc = 0u64;
        let mut qual_sum = 0u64;
        let qual_len = read.qual.len().min(len);
        let mut tile_row = read.tile.map(|t| self.tiles.row_mut(t));

        for (pos, &b) in read.seq.iter().enumerate() {
            match actg_to_2bit(b) {
                Some(code) => {
                    self.base_counts.add(pos, code, 1);
                    // C or G
                    if code & 1 == 1 {
                        gc += 1;
                    }
                    kmer = ((kmer << 2) | code) & mask;
                    valid_run += 1;
                }
                None => {
                    if b & 0xDF == b'N' {
                        self.n_counts.add(pos, 0, 1);
                    }
                    valid_run = 0;
                }
            }

            if pos < KMER_MAX_BASES && valid_run >= k {
                self.kmer_counts.add(pos, kmer, 1);
                self.kmer_totals[pos] += 1;
            }

            if pos < qual_len {
                let q = read.qual[pos].min(MAX_QUALITY);
                self.quality_counts.add(pos, q as usize, 1);
                qual_sum += q as u64;
                if let Some(row) = tile_row.as_deref_mut() {
                    row.add(pos, q);
                }
            }
        }

        self.total_gc += gc;
        let gc_bin = ((gc * 100 + len as u64 / 2) / len as u64) as usize;
        self.gc_counts[gc_bin.min(NUM_GC_BINS - 1)] += 1;
        if qual_len > 0 {
            let mean_q = (qual_sum / qual_len as u64) as usize;
            self.mean_quality_counts[mean_q.min(NUM_QUALITY_VALUES - 1)] += 1;
        }
    }

    /// Ends the stream. Consuming `self` makes further `observe` calls
    /// impossible.
    pub fn finalize(mut self) -> Snapshot {
        self.duplication.close(self.num_reads);
        let min_read_length = if self.num_reads == 0 {
            0
        } else {
            self.min_read_length
        };

        let mut reads_covering = PositionTable::new(0, NUM_BASES);
        let mut running = 0u64;
        for pos in (0..self.max_read_length).rev() {
            running += self.length_counts.get(pos + 1, 0);
            reads_covering.add(pos, 0, running);
        }

        Snapshot {
            kmer_size: self.kmer_size,
            num_reads: self.num_reads,
            total_bases: self.total_bases,
            total_gc: self.total_gc,
            min_read_length,
            max_read_length: self.max_read_length,
            base_counts: self.base_counts,
            n_counts: self.n_counts,
            quality_counts: self.quality_counts,
            length_counts: self.length_counts,
            reads_covering,
            mean_quality_counts: self.mean_quality_counts,
            gc_counts: self.gc_counts,
            kmer_counts: self.kmer_counts,
            kmer_totals: self.kmer_totals,
            tiles: self.tiles,
            duplication: self.duplication,
        }
    }
}

/// The nucleotides tracked per position, in their 2-bit code order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Base {
    A = 0,
    C = 1,
    T = 2,
    G = 3,
}

/// Read-only summary of a finished stream.
#[derive(Clone, Debug)]
pub struct Snapshot {
    kmer_size: usize,
    num_reads: u64,
    total_bases: u64,
    total_gc: u64,
    min_read_length: usize,
    max_read_length: usize,
    base_counts: PositionTable,
    n_counts: PositionTable,
    quality_counts: PositionTable,
    length_counts: PositionTable,
    reads_covering: PositionTable,
    mean_quality_counts: [u64; NUM_QUALITY_VALUES],
    gc_counts: [u64; NUM_GC_BINS],
    kmer_counts: PositionTable,
    kmer_totals: Vec<u64>,
    tiles: TileQuality,
    duplication: DuplicationMap,
}

impl Snapshot {
    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads
    }

    pub fn total_bases(&self) -> u64 {
        self.total_bases
    }

    pub fn total_gc(&self) -> u64 {
        self.total_gc
    }

    pub fn min_read_length(&self) -> usize {
        self.min_read_length
    }

    pub fn max_read_length(&self) -> usize {
        self.max_read_length
    }

    pub fn base_count(&self, pos: usize, base: Base) -> u64 {
        self.base_counts.get(pos, base as usize)
    }

    pub fn n_count(&self, pos: usize) -> u64 {
        self.n_counts.get(pos, 0)
    }

    /// Quality histogram of one position; all zeros if nothing was seen.
    pub fn quality_histogram(&self, pos: usize) -> &[u64] {
        const EMPTY: [u64; NUM_QUALITY_VALUES] = [0; NUM_QUALITY_VALUES];
        self.quality_counts.row(pos).unwrap_or(&EMPTY)
    }

    /// Number of reads of exactly `len` bases.
    pub fn length_count(&self, len: usize) -> u64 {
        self.length_counts.get(len, 0)
    }

    /// `(length, count)` for every length that occurred, ascending.
    pub fn length_histogram(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        let start = if self.num_reads == 0 { 1 } else { 0 };
        (start..=self.max_read_length).filter_map(move |len| {
            let c = self.length_count(len);
            (c > 0).then_some((len, c))
        })
    }

    /// Number of reads with a base at 0-based position `pos`.
    pub fn reads_covering(&self, pos: usize) -> u64 {
        self.reads_covering.get(pos, 0)
    }

    pub fn mean_quality_histogram(&self) -> &[u64; NUM_QUALITY_VALUES] {
        &self.mean_quality_counts
    }

    pub fn gc_histogram(&self) -> &[u64; NUM_GC_BINS] {
        &self.gc_counts
    }

    /// Occurrences of `kmer` ending at 0-based position `pos`.
    pub fn kmer_count(&self, pos: usize, kmer: usize) -> u64 {
        self.kmer_counts.get(pos, kmer)
    }

    /// K-mers counted at `pos`; windows holding a non-ACGT base are excluded.
    pub fn kmer_total(&self, pos: usize) -> u64 {
        self.kmer_totals.get(pos).copied().unwrap_or(0)
    }

    /// Positions for which k-mer statistics exist.
    pub fn kmer_positions(&self) -> usize {
        self.max_read_length.min(KMER_MAX_BASES)
    }

    pub fn tiles(&self) -> &TileQuality {
        &self.tiles
    }

    pub fn duplication(&self) -> &DuplicationMap {
        &self.duplication
    }

    pub fn count_at_limit(&self) -> u64 {
        self.duplication.count_at_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read<'a>(seq: &'a [u8], qual: &'a [u8]) -> Read<'a> {
        Read {
            seq,
            qual,
            tile: None,
        }
    }

    #[test]
    fn length_histogram_sums_to_reads_and_bases() {
        let mut acc = Accumulator::new(3);
        let lens = [0usize, 5, 5, 12, 1500, 2000];
        for &l in &lens {
            let seq = vec![b'A'; l];
            let qual = vec![30u8; l];
            acc.observe(&read(&seq, &qual));
        }
        let snap = acc.finalize();
        let hist: Vec<(usize, u64)> = snap.length_histogram().collect();
        let reads: u64 = hist.iter().map(|&(_, c)| c).sum();
        let bases: u64 = hist.iter().map(|&(l, c)| l as u64 * c).sum();
        assert_eq!(reads, snap.num_reads());
        assert_eq!(bases, snap.total_bases());
        assert_eq!(snap.min_read_length(), 0);
        assert_eq!(snap.max_read_length(), 2000);
        assert_eq!(snap.reads_covering(0), 5);
        assert_eq!(snap.reads_covering(5), 3);
        assert_eq!(snap.reads_covering(1499), 2);
        assert_eq!(snap.reads_covering(1500), 1);
        assert_eq!(snap.reads_covering(2000), 0);
    }

    #[test]
    fn overflow_positions_are_transparent() {
        let mut acc = Accumulator::new(3);
        let mut seq = vec![b'A'; 1200];
        seq[1100] = b'G';
        seq[10] = b'N';
        let mut qual = vec![20u8; 1200];
        qual[1100] = 35;
        acc.observe(&read(&seq, &qual));
        let snap = acc.finalize();
        assert_eq!(snap.base_count(1100, Base::G), 1);
        assert_eq!(snap.base_count(1101, Base::A), 1);
        assert_eq!(snap.n_count(10), 1);
        assert_eq!(snap.quality_histogram(1100)[35], 1);
        assert_eq!(snap.quality_histogram(5)[20], 1);
        assert_eq!(snap.quality_histogram(5000).iter().sum::<u64>(), 0);
    }

    #[test]
    fn kmers_skip_ambiguous_bases() {
        let mut acc = Accumulator::new(3);
        acc.observe(&read(b"ACGNACG", b"IIIIIII"));
        let snap = acc.finalize();
        let acg = (0 << 4) | (1 << 2) | 3;
        assert_eq!(snap.kmer_count(2, acg), 1);
        assert_eq!(snap.kmer_count(6, acg), 1);
        for pos in 3..6 {
            assert_eq!((0..64).map(|k| snap.kmer_count(pos, k)).sum::<u64>(), 0);
        }
        assert_eq!(snap.kmer_total(1), 0);
        assert_eq!(snap.kmer_total(2), 1);
        assert_eq!(snap.kmer_total(4), 0);
        assert_eq!(snap.kmer_total(6), 1);
    }

    #[test]
    fn all_n_reads_leave_kmer_totals_unchanged() {
        let mut clean = Accumulator::new(3);
        let mut mixed = Accumulator::new(3);
        for _ in 0..50 {
            clean.observe(&read(b"ACGTACGT", b"IIIIIIII"));
            mixed.observe(&read(b"ACGTACGT", b"IIIIIIII"));
            mixed.observe(&read(b"NNNNNNNN", b"IIIIIIII"));
        }
        let (clean, mixed) = (clean.finalize(), mixed.finalize());
        for pos in 0..8 {
            let counted: u64 = (0..64).map(|k| mixed.kmer_count(pos, k)).sum();
            assert_eq!(mixed.kmer_total(pos), counted);
            assert_eq!(mixed.kmer_total(pos), clean.kmer_total(pos));
        }
        assert_eq!(mixed.kmer_total(4), 50);
    }

    #[test]
    fn gc_and_mean_quality_are_binned_per_read() {
        let mut acc = Accumulator::new(2);
        acc.observe(&read(b"GGCCAATT", &[10, 10, 10, 10, 20, 20, 20, 21]));
        acc.observe(&read(b"GGGG", &[40, 40, 40, 40]));
        let snap = acc.finalize();
        assert_eq!(snap.gc_histogram()[50], 1);
        assert_eq!(snap.gc_histogram()[100], 1);
        assert_eq!(snap.mean_quality_histogram()[15], 1);
        assert_eq!(snap.mean_quality_histogram()[40], 1);
        assert_eq!(snap.total_gc(), 8);
    }

    #[test]
    fn short_quality_strings_only_cover_their_positions() {
        let mut acc = Accumulator::new(2);
        acc.observe(&read(b"ACGTACGT", &[30, 30]));
        let snap = acc.finalize();
        assert_eq!(snap.quality_histogram(1)[30], 1);
        assert_eq!(snap.quality_histogram(2).iter().sum::<u64>(), 0);
        assert_eq!(snap.base_count(7, Base::T), 1);
    }

    #[test]
    fn tiles_accumulate_per_position() {
        let mut acc = Accumulator::new(2);
        for (tile, q) in [(1101u32, 30u8), (1101, 20), (1102, 10)] {
            let qual = [q; 4];
            acc.observe(&Read {
                seq: b"ACGT",
                qual: &qual,
                tile: Some(tile),
            });
        }
        let snap = acc.finalize();
        assert_eq!(snap.tiles().sorted_tiles(), vec![1101, 1102]);
        let row = snap.tiles().get(1101).unwrap();
        assert_eq!(row.mean(3), Some(25.0));
        assert_eq!(snap.tiles().get(1102).unwrap().mean(0), Some(10.0));
    }

    #[test]
    fn empty_stream_has_zero_lengths() {
        let snap = Accumulator::new(7).finalize();
        assert_eq!(snap.num_reads(), 0);
        assert_eq!(snap.min_read_length(), 0);
        assert_eq!(snap.length_histogram().count(), 0);
        assert_eq!(snap.count_at_limit(), 0);
    }
}
