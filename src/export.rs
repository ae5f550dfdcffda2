use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chunk::{DEFAULT_CHUNK_DAYS, DateRange};
use crate::client::DataSource;
use crate::model::{Station, parse_fecha};
use crate::output::{chunk_path, day_path, station_path, stations_path, write_json};

pub const STATIONS_ENDPOINT: &str = "/valores/climatologicos/inventarioestaciones/todasestaciones";

/// Daily values for every station between two days, both included.
pub fn climate_values_endpoint(range: &DateRange) -> String {
    format!(
        "/valores/climatologicos/diarios/datos/fechaini/{}T00:00:00UTC/fechafin/{}T23:59:59UTC/todasestaciones",
        range.start().format("%Y-%m-%d"),
        range.end().format("%Y-%m-%d")
    )
}

/// What to do when fetching one chunk fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChunkErrorPolicy {
    /// Stop the export and return the error.
    #[default]
    Abort,
    /// Log a warning, record the chunk as failed and continue.
    Skip,
}

/// How climate values are laid out on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// One file per chunk, named by its first and last day.
    #[default]
    Chunk,
    /// One file per day under `YYYY/MM/DD.json`.
    Daily,
}

#[derive(Debug, Clone, Default)]
pub struct StationOptions {
    /// Leave an existing station file alone and skip the request.
    pub skip_existing: bool,
    /// Also write one file per station.
    pub split: bool,
}

#[derive(Debug, Clone)]
pub struct ClimateOptions {
    pub chunk_days: u32,
    pub layout: Layout,
    pub on_error: ChunkErrorPolicy,
    pub skip_existing: bool,
    pub progress: bool,
}

impl Default for ClimateOptions {
    fn default() -> Self {
        Self {
            chunk_days: DEFAULT_CHUNK_DAYS,
            layout: Layout::Chunk,
            on_error: ChunkErrorPolicy::Abort,
            skip_existing: false,
            progress: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationSummary {
    pub path: PathBuf,
    /// Number of stations written; zero when the export was skipped.
    pub stations: usize,
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClimateSummary {
    pub written: Vec<DateRange>,
    /// Chunks whose output already existed.
    pub skipped: Vec<DateRange>,
    /// Chunks that failed under [`ChunkErrorPolicy::Skip`], with the error text.
    pub failed: Vec<(DateRange, String)>,
    pub files: usize,
    pub records: usize,
}

/// Fetches the full station inventory with a single request and writes it to
/// `<out>/estaciones.json`.
pub fn export_stations<S: DataSource + ?Sized>(
    source: &S,
    output_dir: &Path,
    opts: &StationOptions,
) -> Result<StationSummary> {
    let path = stations_path(output_dir);
    if opts.skip_existing && path.exists() {
        info!(path = %path.display(), "station data already exists, skipping");
        return Ok(StationSummary {
            path,
            stations: 0,
            skipped: true,
        });
    }

    info!("fetching station inventory");
    let payload = source
        .fetch(STATIONS_ENDPOINT)
        .context("failed to fetch station inventory")?;
    let Value::Array(items) = &payload else {
        bail!("station inventory is not a JSON array");
    };

    if opts.split {
        let stations: Vec<Station> = serde_json::from_value(payload.clone())
            .context("failed to decode station inventory")?;
        for station in &stations {
            write_json(&station_path(output_dir, &station.indicativo), station)?;
        }
    }

    write_json(&path, &payload)?;
    info!(stations = items.len(), path = %path.display(), "saved stations");

    Ok(StationSummary {
        path,
        stations: items.len(),
        skipped: false,
    })
}

/// Fetches daily climate values for `[start, end]`, one request per chunk of
/// at most `opts.chunk_days` days, writing each chunk before the next request.
///
/// A reversed range is rejected before any request is made.
pub fn export_climate_values<S: DataSource + ?Sized>(
    source: &S,
    start: NaiveDate,
    end: NaiveDate,
    output_dir: &Path,
    opts: &ClimateOptions,
) -> Result<ClimateSummary> {
    let range = DateRange::new(start, end)?;
    let chunks = range.chunks(opts.chunk_days);
    info!(
        %start,
        %end,
        chunks = chunks.len(),
        chunk_days = opts.chunk_days,
        "exporting climate values"
    );

    let pb = progress_bar(chunks.len() as u64, opts.progress);
    let mut summary = ClimateSummary::default();

    for chunk in chunks {
        pb.set_message(format!("{} .. {}", chunk.start(), chunk.end()));

        if opts.skip_existing && chunk_is_complete(output_dir, &chunk, opts.layout) {
            info!(start = %chunk.start(), end = %chunk.end(), "already exported, skipping");
            summary.skipped.push(chunk);
            pb.inc(1);
            continue;
        }

        info!(start = %chunk.start(), end = %chunk.end(), "fetching");
        let payload = match fetch_chunk(source, &chunk) {
            Ok(v) => v,
            Err(e) => match opts.on_error {
                ChunkErrorPolicy::Abort => {
                    pb.abandon();
                    return Err(e.context(format!(
                        "failed to fetch climate values for {} .. {}",
                        chunk.start(),
                        chunk.end()
                    )));
                }
                ChunkErrorPolicy::Skip => {
                    warn!(
                        start = %chunk.start(),
                        end = %chunk.end(),
                        error = %e,
                        "chunk failed, continuing"
                    );
                    summary.failed.push((chunk, format!("{:#}", e)));
                    pb.inc(1);
                    continue;
                }
            },
        };

        summary.records += payload.len();
        summary.files += match opts.layout {
            Layout::Chunk => {
                write_json(&chunk_path(output_dir, &chunk), &payload)?;
                1
            }
            Layout::Daily => write_days(output_dir, &payload, opts.skip_existing)?,
        };
        summary.written.push(chunk);
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        written = summary.written.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        files = summary.files,
        "climate values exported"
    );
    Ok(summary)
}

fn fetch_chunk<S: DataSource + ?Sized>(source: &S, chunk: &DateRange) -> Result<Vec<Value>> {
    match source.fetch(&climate_values_endpoint(chunk))? {
        Value::Array(items) => Ok(items),
        _ => bail!("climate values payload is not a JSON array"),
    }
}

fn chunk_is_complete(output_dir: &Path, chunk: &DateRange, layout: Layout) -> bool {
    match layout {
        Layout::Chunk => chunk_path(output_dir, chunk).exists(),
        Layout::Daily => chunk.iter_days().all(|d| day_path(output_dir, d).exists()),
    }
}

/// Groups records by `fecha` and writes one file per day. Returns the number
/// of files written.
fn write_days(output_dir: &Path, records: &[Value], skip_existing: bool) -> Result<usize> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&Value>> = BTreeMap::new();
    for raw in records {
        let date = raw.get("fecha").and_then(Value::as_str).and_then(parse_fecha);
        match date {
            Some(date) => by_day.entry(date).or_default().push(raw),
            None => warn!(record = %raw, "record without a usable fecha, dropped"),
        }
    }

    let mut files = 0;
    for (date, day_records) in by_day {
        let path = day_path(output_dir, date);
        if skip_existing && path.exists() {
            continue;
        }
        write_json(&path, &day_records)?;
        files += 1;
    }
    Ok(files)
}

fn progress_bar(len: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{wide_bar}] {pos}/{len} chunks {msg} {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}
