//! Rendering of an [`AttributedCostReport`] as text, CSV or JSON.

use std::borrow::Cow;
use std::io::Write;

use crate::attribution::{AttributedCostReport, AttributedRow};
use crate::error::Result;

/// Fixed-width text table, amounts with two decimals.
#[must_use]
pub fn render_table(report: &AttributedCostReport) -> String {
    let cells: Vec<[String; 6]> = report.iter().map(table_cells).collect();

    let mut widths = AttributedCostReport::HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &AttributedCostReport::HEADERS.map(String::from), &widths);
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    out
}

fn table_cells(row: &AttributedRow) -> [String; 6] {
    [
        row.project.clone(),
        row.branch.clone(),
        format!("{:.2}", row.cost),
        format!("{:.2}", row.usage_hours),
        format!("{:.2}", row.rogue_cost),
        format!("{:.2}", row.rogue_usage_hours),
    ]
}

fn push_line(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths.iter().copied())
        .enumerate()
        .map(|(i, (cell, width))| {
            // Key columns left, amounts right.
            if i < 2 {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// Write the report as CSV with a header row.
///
/// # Errors
///
/// Returns [`CostReportError::Io`](crate::CostReportError::Io) on write failure.
pub fn write_csv<W: Write>(report: &AttributedCostReport, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", AttributedCostReport::HEADERS.join(","))?;
    for row in report {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            csv_field(&row.project),
            csv_field(&row.branch),
            row.cost,
            row.usage_hours,
            row.rogue_cost,
            row.rogue_usage_hours
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Write the report as a pretty-printed JSON array of rows.
///
/// # Errors
///
/// Returns a serialization or I/O error.
pub fn write_json<W: Write>(report: &AttributedCostReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> AttributedCostReport {
        serde_json::from_value(serde_json::json!([
            {"Project": "web", "Branch": "main", "Cost": 5.0, "Usage_Hours": 2.0,
             "Rogue_Cost": 0.0, "Rogue_Usage_Hours": 0.0},
            {"Project": "api, v2", "Branch": "feat/\"x\"", "Cost": 88.0, "Usage_Hours": 44.0,
             "Rogue_Cost": 12.0, "Rogue_Usage_Hours": 6.0}
        ]))
        .unwrap()
    }

    #[test]
    fn test_csv_output() {
        let mut out = Vec::new();
        write_csv(&report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Project,Branch,Cost,Usage_Hours,Rogue_Cost,Rogue_Usage_Hours");
        assert_eq!(lines[1], "web,main,5,2,0,0");
        assert_eq!(lines[2], "\"api, v2\",\"feat/\"\"x\"\"\",88,44,12,6");
    }

    #[test]
    fn test_json_output_round_trips() {
        let mut out = Vec::new();
        write_json(&report(), &mut out).unwrap();
        let parsed: AttributedCostReport = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn test_table_output() {
        let table = render_table(&report());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Project"));
        assert!(lines[2].contains("88.00"));
        assert!(lines[2].ends_with("6.00"));
    }
}
