use std::io::BufRead;

use memchr::memchr;

use crate::core::error::FastqError;
use crate::core::model::PHRED_OFFSET;

/// One FASTQ record. `qual` is still ASCII-encoded.
#[derive(Clone, Copy, Debug)]
pub struct ReadView<'a> {
    pub header: &'a [u8],
    pub seq: &'a [u8],
    pub qual: &'a [u8],
}

impl ReadView<'_> {
    /// Decodes the quality string into `out` as Phred values.
    pub fn phred_into(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend(self.qual.iter().map(|&q| q.saturating_sub(PHRED_OFFSET)));
    }

    pub fn tile(&self) -> Option<u32> {
        parse_tile(self.header)
    }
}

/// Illumina tile id from a read header. Headers with 7 or more `:`-separated
/// fields carry it in the fifth field, older ones with 5 or 6 fields in the
/// third.
pub fn parse_tile(header: &[u8]) -> Option<u32> {
    let index = match memchr::memchr_iter(b':', header).count() + 1 {
        n if n >= 7 => 4,
        n if n >= 5 => 2,
        _ => return None,
    };
    let field = header.split(|&b| b == b':').nth(index)?;
    let digits = field.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    std::str::from_utf8(&field[..digits]).ok()?.parse().ok()
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn check_record<'a>(
    record: u64,
    header: &'a [u8],
    seq: &'a [u8],
    plus: &[u8],
    qual: &'a [u8],
) -> Result<ReadView<'a>, FastqError> {
    let header = header
        .strip_prefix(b"@")
        .ok_or(FastqError::MissingHeader { record })?;
    if !plus.starts_with(b"+") {
        return Err(FastqError::MissingSeparator { record });
    }
    if seq.len() != qual.len() {
        return Err(FastqError::LengthMismatch {
            record,
            seq_len: seq.len(),
            qual_len: qual.len(),
        });
    }
    Ok(ReadView { header, seq, qual })
}

/// Zero-copy record iterator over an in-memory (usually memory-mapped) buffer.
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
    record: u64,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            record: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let end = memchr(b'\n', rest).map_or(rest.len(), |i| i + 1);
        self.pos += end;
        Some(trim_line(&rest[..end]))
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<ReadView<'a>, FastqError>;

    fn next(&mut self) -> Option<Self::Item> {
        let header = loop {
            let line = self.next_line()?;
            if !line.is_empty() {
                break line;
            }
        };
        self.record += 1;
        let record = self.record;
        let (Some(seq), Some(plus), Some(qual)) =
            (self.next_line(), self.next_line(), self.next_line())
        else {
            self.pos = self.data.len();
            return Some(Err(FastqError::Truncated { record }));
        };
        Some(check_record(record, header, seq, plus, qual))
    }
}

/// Streaming reader for decompressed input. Records borrow the reader's line
/// buffers, so it hands out one record at a time instead of implementing
/// `Iterator`.
pub struct FastqReader<R> {
    inner: R,
    lines: [Vec<u8>; 4],
    record: u64,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lines: Default::default(),
            record: 0,
        }
    }

    fn fill(&mut self, slot: usize) -> Result<bool, FastqError> {
        let buf = &mut self.lines[slot];
        buf.clear();
        let n = self
            .inner
            .read_until(b'\n', buf)
            .map_err(|source| FastqError::Io {
                record: self.record + 1,
                source,
            })?;
        Ok(n > 0)
    }

    pub fn next_record(&mut self) -> Result<Option<ReadView<'_>>, FastqError> {
        loop {
            if !self.fill(0)? {
                return Ok(None);
            }
            if !trim_line(&self.lines[0]).is_empty() {
                break;
            }
        }
        self.record += 1;
        for slot in 1..4 {
            if !self.fill(slot)? {
                return Err(FastqError::Truncated {
                    record: self.record,
                });
            }
        }
        let [header, seq, plus, qual] = &self.lines;
        check_record(
            self.record,
            trim_line(header),
            trim_line(seq),
            trim_line(plus),
            trim_line(qual),
        )
        .map(Some)
    }
}
