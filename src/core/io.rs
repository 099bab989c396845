use anyhow::{Context, Result, anyhow};
use flate2::read::MultiGzDecoder;
use gzp::deflate::{Bgzf, Mgzip};
use gzp::par::decompress::ParDecompressBuilder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::core::fastq::{FastqReader, ReadView, SliceReader};

const GZIP_READ_BUF: usize = 8 * 1024 * 1024;

pub struct MmapSource {
    mmap: Option<Mmap>,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        if len == 0 {
            return Ok(Self { mmap: None });
        }
        // SAFETY: read-only file mapping.
        let mmap = unsafe { Mmap::map(&file) }.with_context(|| "mmap failed")?;
        Ok(Self { mmap: Some(mmap) })
    }

    pub fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputKind {
    Plain,
    Gzip,
}

pub fn detect_input_kind(path: &Path) -> Result<InputKind> {
    if let Some(ext) = path.extension().and_then(|s| s.to_str())
        && ext.eq_ignore_ascii_case("gz")
    {
        return Ok(InputKind::Gzip);
    }
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut magic = [0u8; 2];
    let n = file
        .read(&mut magic)
        .with_context(|| "failed to read magic bytes")?;
    if n == 2 && magic == [0x1f, 0x8b] {
        Ok(InputKind::Gzip)
    } else {
        Ok(InputKind::Plain)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum GzipVariant {
    Standard,
    Mgzip,
    Bgzf,
}

fn detect_gzip_variant(path: &Path) -> Result<GzipVariant> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut header = [0u8; 20];
    let n = file
        .read(&mut header)
        .with_context(|| "failed to read gzip header")?;
    Ok(gzip_variant(&header[..n]))
}

/// BGZF and MGZIP are recognised by the subfield id in the gzip extra field.
fn gzip_variant(header: &[u8]) -> GzipVariant {
    if header.len() < 14 || header[0] != 0x1f || header[1] != 0x8b || header[3] & 4 == 0 {
        return GzipVariant::Standard;
    }
    match &header[12..14] {
        b"BC" => GzipVariant::Bgzf,
        b"IG" => GzipVariant::Mgzip,
        _ => GzipVariant::Standard,
    }
}

pub fn open_gzip_reader(path: &Path, threads: usize) -> Result<Box<dyn Read + Send>> {
    let variant = detect_gzip_variant(path)?;
    debug!(path = %path.display(), ?variant, threads, "opening gzip input");
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let reader: Box<dyn Read + Send> = match variant {
        GzipVariant::Bgzf if threads > 1 => Box::new(
            ParDecompressBuilder::<Bgzf>::new()
                .num_threads(threads)
                .map_err(|e| anyhow!("invalid decompression thread count: {e}"))?
                .from_reader(reader),
        ),
        GzipVariant::Mgzip if threads > 1 => Box::new(
            ParDecompressBuilder::<Mgzip>::new()
                .num_threads(threads)
                .map_err(|e| anyhow!("invalid decompression thread count: {e}"))?
                .from_reader(reader),
        ),
        _ => Box::new(MultiGzDecoder::new(reader)),
    };
    Ok(reader)
}

/// Streams every record of a FASTQ file through `f` and returns the number of
/// records. Plain files are memory-mapped; gzip files are decompressed on the
/// fly, in parallel for BGZF/MGZIP when `threads > 1`.
pub fn for_each_record<F>(path: &Path, threads: usize, mut f: F) -> Result<u64>
where
    F: FnMut(&ReadView<'_>),
{
    let mut count = 0u64;
    match detect_input_kind(path)? {
        InputKind::Plain => {
            let source = MmapSource::open(path)?;
            for read in SliceReader::new(source.bytes()) {
                let read = read.with_context(|| format!("malformed FASTQ in {}", path.display()))?;
                f(&read);
                count += 1;
            }
        }
        InputKind::Gzip => {
            let decoder = open_gzip_reader(path, threads)?;
            let mut reader = FastqReader::new(BufReader::with_capacity(GZIP_READ_BUF, decoder));
            while let Some(read) = reader
                .next_record()
                .with_context(|| format!("malformed FASTQ in {}", path.display()))?
            {
                f(&read);
                count += 1;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_variant_from_extra_subfield() {
        let mut header = [0u8; 18];
        header[..4].copy_from_slice(&[0x1f, 0x8b, 8, 4]);
        header[12..14].copy_from_slice(b"BC");
        assert_eq!(gzip_variant(&header), GzipVariant::Bgzf);
        header[12..14].copy_from_slice(b"IG");
        assert_eq!(gzip_variant(&header), GzipVariant::Mgzip);
        header[3] = 0;
        assert_eq!(gzip_variant(&header), GzipVariant::Standard);
        assert_eq!(gzip_variant(&[0x1f, 0x8b]), GzipVariant::Standard);
    }

    #[test]
    fn empty_plain_file_has_no_records() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let n = for_each_record(file.path(), 1, |_| panic!("no records expected")).unwrap();
        assert_eq!(n, 0);
    }
}
