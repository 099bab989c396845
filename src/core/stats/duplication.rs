use std::collections::HashMap;

// Distinct sequences tracked before admission closes.
pub const DUP_UNIQUE_CUTOFF: usize = 100_000;
pub const DUP_READ_MAX_SIZE: usize = 75;
pub const DUP_READ_TRUNCATE_SIZE: usize = 50;

/// Sequence -> observation count, capped at a fixed number of distinct keys.
///
/// Once the cap is reached `admitting` flips to false: known sequences keep
/// counting, unseen ones are dropped, and `count_at_limit` remembers how many
/// reads had been observed at that moment. Duplication extrapolation depends
/// on that number.
#[derive(Clone, Debug)]
pub struct DuplicationMap {
    counts: HashMap<Vec<u8>, u64>,
    cap: usize,
    admitting: bool,
    count_at_limit: u64,
}

impl DuplicationMap {
    pub fn new() -> Self {
        Self::with_cap(DUP_UNIQUE_CUTOFF)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            counts: HashMap::new(),
            cap,
            admitting: cap > 0,
            count_at_limit: 0,
        }
    }

    /// `reads_seen` includes the read being observed.
    pub fn observe(&mut self, seq: &[u8], reads_seen: u64) {
        let key = canonical_key(seq);
        if let Some(count) = self.counts.get_mut(key) {
            *count += 1;
        } else if self.admitting {
            self.counts.insert(key.to_vec(), 1);
            if self.counts.len() >= self.cap {
                self.admitting = false;
                self.count_at_limit = reads_seen;
            }
        }
    }

    /// Freezes `count_at_limit` for a stream that never hit the cap.
    pub fn close(&mut self, num_reads: u64) {
        if self.admitting {
            self.admitting = false;
            self.count_at_limit = num_reads;
        }
    }

    pub fn is_admitting(&self) -> bool {
        self.admitting
    }

    pub fn count_at_limit(&self) -> u64 {
        self.count_at_limit
    }

    pub fn counts(&self) -> &HashMap<Vec<u8>, u64> {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl Default for DuplicationMap {
    fn default() -> Self {
        Self::new()
    }
}

pub fn canonical_key(seq: &[u8]) -> &[u8] {
    if seq.len() > DUP_READ_MAX_SIZE {
        &seq[..DUP_READ_TRUNCATE_SIZE]
    } else {
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_reads_are_truncated() {
        let long = vec![b'A'; 100];
        assert_eq!(canonical_key(&long).len(), DUP_READ_TRUNCATE_SIZE);
        let short = vec![b'A'; 75];
        assert_eq!(canonical_key(&short).len(), 75);
    }

    #[test]
    fn admission_closes_at_cap_but_known_keys_keep_counting() {
        let mut map = DuplicationMap::with_cap(2);
        map.observe(b"AAAA", 1);
        map.observe(b"CCCC", 2);
        assert!(!map.is_admitting());
        assert_eq!(map.count_at_limit(), 2);

        map.observe(b"GGGG", 3);
        map.observe(b"AAAA", 4);
        assert_eq!(map.len(), 2);
        assert_eq!(map.counts().get(&b"AAAA"[..]), Some(&2));
        assert_eq!(map.counts().get(&b"GGGG"[..]), None);

        map.close(4);
        assert_eq!(map.count_at_limit(), 2);
    }

    #[test]
    fn uncapped_stream_freezes_at_total() {
        let mut map = DuplicationMap::with_cap(10);
        for i in 0..5u64 {
            map.observe(b"ACGT", i + 1);
        }
        map.close(5);
        assert_eq!(map.count_at_limit(), 5);
        assert_eq!(map.counts().get(&b"ACGT"[..]), Some(&5));
    }
}
