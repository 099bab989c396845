use crate::core::engine::FileReport;
use anyhow::Result;

pub fn render(report: &FileReport) -> Result<String> {
    let mut out = String::new();
    for module in &report.modules {
        out.push_str(&module.short_summary(&report.file_name)?);
        out.push('\n');
    }
    Ok(out)
}
