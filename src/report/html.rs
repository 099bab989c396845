use crate::core::engine::FileReport;
use crate::core::metrics::{Fragment, Module};
use crate::core::model::Status;
use anyhow::Result;
use serde_json::json;
use std::fmt::Write as FmtWrite;
use std::time::{SystemTime, UNIX_EPOCH};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

pub fn render(report: &FileReport) -> Result<String> {
    let mut html = String::with_capacity(64 * 1024);
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\"/>")?;
    writeln!(
        html,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>"
    )?;
    writeln!(
        html,
        "<title>readqc report: {}</title>",
        escape_html(&report.sample_name)
    )?;
    writeln!(html, "<script src=\"{}\"></script>", PLOTLY_CDN)?;
    write_style(&mut html)?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;

    writeln!(html, "<h1>readqc report</h1>")?;
    writeln!(
        html,
        "<div class=\"meta\">Sample: <b>{}</b><br/>File: {}<br/>Reads: {}<br/>Timestamp: {} (unix: {})</div>",
        escape_html(&report.sample_name),
        escape_html(&report.file_name),
        report.num_reads,
        fmt_timestamp(ts),
        ts
    )?;

    writeln!(html, "<h2 id=\"summary\">Summary</h2>")?;
    writeln!(html, "<table class=\"summary\">")?;
    writeln!(html, "<tr><th>Status</th><th>Module</th></tr>")?;
    for (i, module) in report.modules.iter().enumerate() {
        summary_row(&mut html, module.grade()?, module.name(), i)?;
    }
    writeln!(html, "</table>")?;

    for (i, module) in report.modules.iter().enumerate() {
        write_module(&mut html, module, i)?;
    }

    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

fn write_style(out: &mut String) -> Result<()> {
    writeln!(out, "<style>")?;
    writeln!(
        out,
        "body{{font-family:Arial,Helvetica,sans-serif;margin:20px;color:#222;background:#fff;}}"
    )?;
    writeln!(out, "h1{{margin:0 0 8px 0;font-size:24px;}}")?;
    writeln!(out, "h2{{margin:24px 0 8px 0;font-size:20px;}}")?;
    writeln!(out, ".meta{{color:#555;font-size:13px;margin-bottom:16px;}}")?;
    writeln!(
        out,
        ".summary{{border-collapse:collapse;margin:12px 0 20px 0;width:100%;max-width:900px;}}"
    )?;
    writeln!(
        out,
        ".summary th,.summary td{{border:1px solid #ddd;padding:6px 10px;text-align:left;}}"
    )?;
    writeln!(out, ".pass{{color:#0a7a0a;font-weight:bold;}}")?;
    writeln!(out, ".warn{{color:#d98200;font-weight:bold;}}")?;
    writeln!(out, ".fail{{color:#c00000;font-weight:bold;}}")?;
    writeln!(out, ".module{{border-top:1px solid #eee;padding-top:8px;}}")?;
    writeln!(out, ".plot{{margin:8px 0 6px 0;max-width:1000px;height:420px;}}")?;
    writeln!(
        out,
        ".desc{{color:#444;font-size:13px;max-width:1000px;margin:4px 0 10px 0;}}"
    )?;
    writeln!(
        out,
        ".table{{border-collapse:collapse;width:100%;max-width:1000px;font-size:12px;}}"
    )?;
    writeln!(
        out,
        ".table th,.table td{{border:1px solid #ddd;padding:4px 6px;text-align:right;}}"
    )?;
    writeln!(
        out,
        ".table th:first-child,.table td:first-child{{text-align:left;}}"
    )?;
    writeln!(out, "</style>")?;
    Ok(())
}

fn summary_row(out: &mut String, status: Status, name: &str, index: usize) -> Result<()> {
    writeln!(
        out,
        "<tr><td class=\"{}\">{}</td><td><a href=\"#{}\">{}</a></td></tr>",
        status.as_str_lower(),
        status.as_str_upper(),
        module_id(index),
        name
    )?;
    Ok(())
}

fn module_id(index: usize) -> String {
    format!("module-{}", index)
}

fn write_module(out: &mut String, module: &Module, index: usize) -> Result<()> {
    let status = module.grade()?;
    let id = module_id(index);
    writeln!(out, "<section id=\"{}\" class=\"module\">", id)?;
    writeln!(
        out,
        "<h2 class=\"{}\">{} [{}]</h2>",
        status.as_str_lower(),
        module.name(),
        status.as_str_upper()
    )?;
    match module.fragment()? {
        Fragment::Plot {
            series,
            x_title,
            y_title,
        } => {
            let plot_id = format!("{}-plot", id);
            let layout = json!({
                "margin": { "t": 20 },
                "xaxis": { "title": { "text": x_title } },
                "yaxis": { "title": { "text": y_title } },
            });
            writeln!(out, "<div id=\"{}\" class=\"plot\"></div>", plot_id)?;
            writeln!(
                out,
                "<script>Plotly.newPlot(\"{}\", {}, {});</script>",
                plot_id,
                script_json(&serde_json::to_string(series)?),
                script_json(&layout.to_string())
            )?;
        }
        Fragment::Table { header, rows } => {
            writeln!(out, "<table class=\"table\">")?;
            write!(out, "<tr>")?;
            for h in header {
                write!(out, "<th>{}</th>", escape_html(h))?;
            }
            writeln!(out, "</tr>")?;
            for row in rows {
                write!(out, "<tr>")?;
                for cell in row {
                    write!(out, "<td>{}</td>", escape_html(cell))?;
                }
                writeln!(out, "</tr>")?;
            }
            writeln!(out, "</table>")?;
        }
        Fragment::Empty { message } => {
            writeln!(out, "<p class=\"desc\">{}</p>", escape_html(message))?;
        }
    }
    writeln!(out, "<a class=\"back\" href=\"#summary\">Back to Summary</a>")?;
    writeln!(out, "</section>")?;
    Ok(())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// JSON inlined in a `<script>` element must not close it early.
fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn fmt_timestamp(ts: u64) -> String {
    let days = (ts / 86_400) as i64;
    let secs = (ts % 86_400) as u32;
    let hour = secs / 3_600;
    let min = (secs % 3_600) / 60;
    let sec = secs % 60;

    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = mp + if mp < 10 { 3 } else { -9 };
    let year = y + if m <= 2 { 1 } else { 0 };

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year, m, d, hour, min, sec
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_civil_utc() {
        assert_eq!(fmt_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(fmt_timestamp(951_782_400), "2000-02-29 00:00:00 UTC");
    }

    #[test]
    fn inline_json_cannot_close_script() {
        assert_eq!(script_json(r#"{"name":"</script>"}"#), r#"{"name":"<\/script>"}"#);
        assert_eq!(escape_html("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
