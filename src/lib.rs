//! Export data from the AEMET OpenData API to local JSON files.
//!
//! Every AEMET endpoint answers with a small envelope pointing at the actual
//! payload; [`Client`] follows that link and returns the decoded JSON. The
//! exporters build on any [`DataSource`]:
//!
//! - [`export_stations`] writes the station inventory with a single request.
//! - [`export_climate_values`] splits a date range into chunks the API
//!   accepts and writes one file per chunk.
//!
//! ## Quick start
//! - Set `AEMET_API_TOKEN`, or put `key: <token>` in a `.aemetrc` file
//!   (current directory or home directory).
//!
//! ```no_run
//! use anyhow::Result;
//! use aemet::{Client, ClimateOptions, export_climate_values};
//! use chrono::NaiveDate;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//!     let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
//!     export_climate_values(&client, start, end, Path::new("data"), &ClimateOptions::default())?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod chunk;
mod client;
mod config;
mod envelope;
mod error;
mod export;
mod model;
mod output;
mod util;

pub use chunk::{Chunks, DEFAULT_CHUNK_DAYS, DateRange};
pub use client::{Client, ClientConfig, DataSource};
pub use error::{ApiError, InvalidRange};
pub use export::{
    ChunkErrorPolicy, ClimateOptions, ClimateSummary, Layout, STATIONS_ENDPOINT, StationOptions,
    StationSummary, climate_values_endpoint, export_climate_values, export_stations,
};
pub use model::{ClimateValue, Station};
pub use output::{chunk_path, day_path, station_path, stations_path};
