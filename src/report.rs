use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::error::Result;

/// Current UTC date as `YYYY-MM-DD`; keys both the prompt and the report file.
pub fn today_utc() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

pub fn report_path(output_dir: &Path, today: &str) -> PathBuf {
    output_dir.join(format!("report-{}.md", today))
}

/// Write the report for `today`, replacing any earlier report for the same date.
pub fn save_report<P: AsRef<Path>>(output_dir: P, today: &str, markdown: &str) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let path = report_path(output_dir, today);
    fs::write(&path, markdown)?;
    info!("Wrote report to {}", path.display());

    Ok(path)
}
