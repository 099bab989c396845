use serde::Serialize;

/// Module grade. The ordering is meaningful: a grade only ever moves towards
/// `Fail`, see [`Status::escalate`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pass,
    Warn,
    Fail,
}

impl Status {
    pub fn as_str_lower(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
        }
    }

    pub fn as_str_upper(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
        }
    }

    pub fn escalate(&mut self, other: Status) {
        if other > *self {
            *self = other;
        }
    }
}

/// One read as seen by the accumulator. `qual` holds Phred values, not ASCII.
#[derive(Clone, Copy, Debug)]
pub struct Read<'a> {
    pub seq: &'a [u8],
    pub qual: &'a [u8],
    pub tile: Option<u32>,
}

pub const PHRED_OFFSET: u8 = 33;

pub const QUALITY_SHIFT: u32 = 7;
pub const NUM_QUALITY_VALUES: usize = 1 << QUALITY_SHIFT;
pub const MAX_QUALITY: u8 = (NUM_QUALITY_VALUES - 1) as u8;

/// 2-bit code of a nucleotide, in A, C, T, G order. `None` for N and anything
/// else.
#[inline]
pub fn actg_to_2bit(b: u8) -> Option<usize> {
    match b & 0xDF {
        b'A' => Some(0),
        b'C' => Some(1),
        b'T' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

pub fn decode_kmer(mut key: usize, k: usize) -> String {
    let mut buf = vec![b'A'; k];
    for i in (0..k).rev() {
        buf[i] = match key & 0x3 {
            0 => b'A',
            1 => b'C',
            2 => b'T',
            _ => b'G',
        };
        key >>= 2;
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Percentage with a defined value for an empty denominator.
pub fn percent(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { 100.0 * num / den }
}

/// Locates each fraction's cut point in one pass over `hist`. A cut point is
/// the first value where the running count reaches the threshold
/// `fraction * total`. With `total == 0` every cut point is 0.
pub fn quantiles<const N: usize>(hist: &[u64], total: u64, fractions: [f64; N]) -> [usize; N] {
    let thresholds = fractions.map(|f| f * total as f64);
    let mut out = [0usize; N];
    let mut counts: u64 = 0;
    for (value, &cur) in hist.iter().enumerate() {
        let before = counts as f64;
        let after = (counts + cur) as f64;
        for (slot, &t) in out.iter_mut().zip(thresholds.iter()) {
            if before < t && after >= t {
                *slot = value;
            }
        }
        counts += cur;
    }
    out
}
