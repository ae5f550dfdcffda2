use aemet::{
    ChunkErrorPolicy, Client, ClimateOptions, DEFAULT_CHUNK_DAYS, Layout, StationOptions,
    export_climate_values, export_stations,
};
use anyhow::{Context, Result, bail};
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Export AEMET climate data.
#[derive(Parser, Debug)]
#[command(
    name = "aemet",
    version,
    about = "Export AEMET climate data",
    after_help = "Examples:\n  aemet estaciones -o data\n  aemet valores-climatologicos --start 2025-01-01 --end 2025-01-31 -o data"
)]
struct Cli {
    #[command(flatten)]
    http: HttpArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct HttpArgs {
    /// Attempts per request before giving up on transport errors and 429/5xx.
    #[arg(long, global = true, default_value_t = 5)]
    retries: usize,

    /// Seconds to wait between attempts.
    #[arg(long, global = true, default_value_t = 60)]
    retry_wait: u64,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value_t = 60)]
    timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch station information
    Estaciones {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Also write one file per station under estaciones/
        #[arg(long)]
        split: bool,

        /// Do nothing if the station file already exists
        #[arg(long)]
        skip_existing: bool,
    },
    /// Fetch daily climate values for all stations
    ValoresClimatologicos {
        /// Start date (YYYY-MM-DD); defaults to 30 days before --end
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD); defaults to yesterday
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Maximum number of days requested at once
        #[arg(long, default_value_t = DEFAULT_CHUNK_DAYS, value_parser = clap::value_parser!(u32).range(1..))]
        chunk_days: u32,

        /// File layout: one file per chunk or one per day
        #[arg(long, value_enum, default_value_t = LayoutArg::Chunk)]
        layout: LayoutArg,

        /// What to do when a chunk cannot be fetched
        #[arg(long, value_enum, default_value_t = OnErrorArg::Abort)]
        on_error: OnErrorArg,

        /// Do not refetch chunks whose output already exists
        #[arg(long)]
        skip_existing: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    Chunk,
    Daily,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnErrorArg {
    Abort,
    Skip,
}

impl From<LayoutArg> for Layout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::Chunk => Layout::Chunk,
            LayoutArg::Daily => Layout::Daily,
        }
    }
}

impl From<OnErrorArg> for ChunkErrorPolicy {
    fn from(v: OnErrorArg) -> Self {
        match v {
            OnErrorArg::Abort => ChunkErrorPolicy::Abort,
            OnErrorArg::Skip => ChunkErrorPolicy::Skip,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = match end {
        Some(end) => end,
        None => today
            .checked_sub_days(Days::new(1))
            .context("cannot compute default end date")?,
    };
    let start = match start {
        Some(start) => start,
        None => end
            .checked_sub_days(Days::new(30))
            .context("cannot compute default start date")?,
    };
    if start > end {
        bail!("--start {} is after --end {}", start, end);
    }
    Ok((start, end))
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    // Resolve the token before anything touches the network.
    let client = Client::from_env()?
        .with_retry_max(cli.http.retries)
        .with_retry_wait(Duration::from_secs(cli.http.retry_wait))
        .with_timeout(Duration::from_secs(cli.http.timeout));

    match cli.command {
        Command::Estaciones {
            output,
            split,
            skip_existing,
        } => {
            let opts = StationOptions {
                skip_existing,
                split,
            };
            export_stations(&client, &output, &opts)?;
        }
        Command::ValoresClimatologicos {
            start,
            end,
            output,
            chunk_days,
            layout,
            on_error,
            skip_existing,
            no_progress,
        } => {
            let (start, end) = resolve_range(start, end, Local::now().date_naive())?;
            info!(%start, %end, "date range");

            let opts = ClimateOptions {
                chunk_days,
                layout: layout.into(),
                on_error: on_error.into(),
                skip_existing,
                progress: !no_progress,
            };
            let summary = export_climate_values(&client, start, end, &output, &opts)?;
            info!(
                dir = %output.join("valores-climatologicos").display(),
                "data saved"
            );
            if !summary.failed.is_empty() {
                for (chunk, err) in &summary.failed {
                    error!(start = %chunk.start(), end = %chunk.end(), error = %err, "chunk failed");
                }
                bail!("{} chunk(s) failed", summary.failed.len());
            }
        }
    }

    Ok(())
}
