use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::chunk::DateRange;

pub const STATIONS_FILE: &str = "estaciones.json";
pub const STATIONS_DIR: &str = "estaciones";
pub const CLIMATE_VALUES_DIR: &str = "valores-climatologicos";

/// `<out>/estaciones.json`
pub fn stations_path(output_dir: &Path) -> PathBuf {
    output_dir.join(STATIONS_FILE)
}

/// `<out>/estaciones/<indicativo>.json`
pub fn station_path(output_dir: &Path, indicativo: &str) -> PathBuf {
    output_dir
        .join(STATIONS_DIR)
        .join(format!("{}.json", sanitize(indicativo)))
}

/// `<out>/valores-climatologicos/<start>_<end>.json`
pub fn chunk_path(output_dir: &Path, range: &DateRange) -> PathBuf {
    output_dir.join(CLIMATE_VALUES_DIR).join(format!(
        "{}_{}.json",
        range.start().format("%Y-%m-%d"),
        range.end().format("%Y-%m-%d")
    ))
}

/// `<out>/valores-climatologicos/YYYY/MM/DD.json`
pub fn day_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir
        .join(CLIMATE_VALUES_DIR)
        .join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!("{:02}.json", date.day()))
}

/// Writes `value` as pretty JSON, creating parent directories.
///
/// The file is first written next to its final name and then renamed, so an
/// interrupted run never leaves a truncated file behind.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);

    {
        let file = File::create(&tmp)
            .with_context(|| format!("failed to open {}", tmp.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, value)
            .with_context(|| format!("failed to serialize {}", path.display()))?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}

// Station ids are alphanumeric; keep anything else out of the path.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
