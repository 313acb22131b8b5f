//! Rendering the installed-bundle inventory as a vim help file.

use crate::backend::Vcs;
use crate::error::{Error, Result};
use crate::types::InventoryRecord;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::fs;
use std::path::Path;

/// File name of the generated inventory inside the doc directory.
pub const DOC_FILE: &str = "bundles.txt";

/// Shown when a bundle has no describable version or date.
pub const NOT_AVAILABLE: &str = "n/a";

const HEADERS: [&str; 3] = ["PLUGIN", "VERSION", "RELEASE DATE"];

/// Query the backend for one bundle's version and last commit date.
pub fn record_for(vcs: &dyn Vcs, name: &str, dir: &Path) -> Result<InventoryRecord> {
    Ok(InventoryRecord {
        name: name.to_string(),
        version_label: vcs.describe_version(dir)?,
        date: vcs.last_commit_date(dir)?,
    })
}

/// Render the inventory table.
pub fn render<Tz>(records: &[InventoryRecord], generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let rows: Vec<[String; 3]> = records
        .iter()
        .map(|r| {
            [
                r.name.clone(),
                r.version_label
                    .clone()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                r.date.map_or_else(
                    || NOT_AVAILABLE.to_string(),
                    |d| d.format("%Y-%m-%d").to_string(),
                ),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&format!("*{DOC_FILE}*  Installed bundles\n\n"));
    out.push_str(&format!(
        "Generated {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S %z")
    ));
    out.push_str(&format_row(&HEADERS.map(String::from), &widths));
    out.push_str(&format_row(&widths.map(|w| "-".repeat(w)), &widths));
    for row in &rows {
        out.push_str(&format_row(row, &widths));
    }
    out.push_str("\n vim:tw=78:ts=8:ft=help:norl:\n");
    out
}

fn format_row(cells: &[String; 3], widths: &[usize; 3]) -> String {
    let line = format!(
        "{:<w0$}  {:<w1$}  {}",
        cells[0],
        cells[1],
        cells[2],
        w0 = widths[0],
        w1 = widths[1]
    );
    format!("{}\n", line.trim_end())
}

/// Write the rendered inventory to `<doc_dir>/bundles.txt`, replacing it.
pub fn write_doc(doc_dir: &Path, rendered: &str) -> Result<()> {
    fs::create_dir_all(doc_dir).map_err(|e| Error::io(doc_dir, e))?;
    let path = doc_dir.join(DOC_FILE);
    fs::write(&path, rendered).map_err(|e| Error::io(&path, e))?;
    log::info!("wrote {}", path.display());
    Ok(())
}
