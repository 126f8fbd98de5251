use crate::table::Table;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Write a report table to `submissions_<course>_<timestamp>.csv` in `dir`.
pub fn export_to_csv(table: &Table, course_name: &str, dir: &Path) -> Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("submissions_{}_{}.csv", file_safe(course_name), timestamp);
    let filepath = dir.join(filename);

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let mut wtr = csv::Writer::from_path(&filepath)
        .with_context(|| format!("Failed to create CSV file {}", filepath.display()))?;

    wtr.write_record(table.header())
        .context("Failed to write CSV headers")?;
    for row in table.rows() {
        wtr.write_record(row).context("Failed to write CSV record")?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;

    Ok(filepath)
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
