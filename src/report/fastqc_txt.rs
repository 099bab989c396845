use crate::core::engine::FileReport;
use anyhow::Result;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The `fastqc_data.txt` contents: a version line, then every module's text
/// block in report order.
pub fn render(report: &FileReport) -> Result<String> {
    let mut out = format!("##readqc\t{}\n", VERSION);
    for module in &report.modules {
        out.push_str(module.text()?);
    }
    Ok(out)
}
