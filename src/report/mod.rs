pub mod fastqc_txt;
pub mod html;
pub mod summary_txt;
pub mod zip;

use crate::core::engine::FileReport;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DATA_FILE: &str = "fastqc_data.txt";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const HTML_FILE: &str = "fastqc_report.html";

/// Directory the three report files of `sample_name` are written to.
pub fn report_dir(out_dir: &Path, sample_name: &str) -> PathBuf {
    out_dir.join(format!("{}_fastqc", sample_name))
}

/// Writes the text, summary and HTML reports of one file under
/// `<out_dir>/<sample>_fastqc/`, and the zip archive next to it when asked.
pub fn write_all(out_dir: &Path, report: &FileReport, with_zip: bool) -> Result<PathBuf> {
    let dir = report_dir(out_dir, &report.sample_name);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))?;

    let data = fastqc_txt::render(report)?;
    let summary = summary_txt::render(report)?;
    let page = html::render(report)?;
    let rendered = [
        (DATA_FILE, data.as_str()),
        (SUMMARY_FILE, summary.as_str()),
        (HTML_FILE, page.as_str()),
    ];
    for (name, contents) in rendered {
        let path = dir.join(name);
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    }

    if with_zip {
        let root = format!("{}_fastqc", report.sample_name);
        let zip_path = out_dir.join(format!("{}.zip", root));
        zip::write_archive(&zip_path, &root, &rendered)
            .with_context(|| "failed to create zip output")?;
    }
    info!(sample = %report.sample_name, dir = %dir.display(), "reports written");
    Ok(dir)
}
