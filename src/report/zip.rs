use anyhow::{Context, Result};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Builds an archive holding `<root>/` and one `<root>/<name>` entry per
/// rendered report. Every entry is stamped 1980-01-01, so the same reports
/// always give the same bytes.
pub fn archive(root: &str, reports: &[(&str, &str)]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.add_directory(format!("{}/", root), options)
        .with_context(|| format!("failed to add {}/ to zip", root))?;
    for (name, contents) in reports {
        zip.start_file(format!("{}/{}", root, name), options)
            .with_context(|| format!("failed to add {} to zip", name))?;
        zip.write_all(contents.as_bytes())?;
    }
    Ok(zip.finish().context("failed to finalize zip")?.into_inner())
}

/// Writes the archive in one go, so a failed run never leaves a partial zip.
pub fn write_archive(path: &Path, root: &str, reports: &[(&str, &str)]) -> Result<()> {
    let bytes = archive(root, reports)?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn entries_sit_under_the_report_root() {
        let bytes = archive("s1_fastqc", &[("summary.txt", "PASS\tBasic Statistics\ts1.fq\n")])
            .unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);
        assert!(zip.by_name("s1_fastqc/").unwrap().is_dir());

        let mut summary = String::new();
        let mut entry = zip.by_name("s1_fastqc/summary.txt").unwrap();
        entry.read_to_string(&mut summary).unwrap();
        assert_eq!(summary, "PASS\tBasic Statistics\ts1.fq\n");
        assert_eq!(entry.last_modified(), Some(DateTime::default()));
    }

    #[test]
    fn same_reports_give_same_bytes() {
        let reports = [("fastqc_data.txt", "##readqc\t0.1.0\n"), ("summary.txt", "")];
        assert_eq!(
            archive("a_fastqc", &reports).unwrap(),
            archive("a_fastqc", &reports).unwrap()
        );
    }
}
