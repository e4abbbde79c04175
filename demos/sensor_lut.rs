//! Sensor lookup table demo
//!
//! Loads sensor metadata (or generates a synthetic sensor), builds the
//! per-pixel direction/offset table and reports where a constant range lands.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use lidarviz::prelude::*;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "sensor_lut")]
#[command(about = "Build and inspect the xyz lookup table of a lidar sensor")]
struct Cli {
    /// Sensor metadata JSON; a synthetic sensor is used when omitted
    metadata: Option<PathBuf>,

    #[arg(long, default_value_t = 2048)]
    columns: usize,

    #[arg(long, default_value_t = 128)]
    rows: usize,

    /// Vertical field of view of the synthetic sensor, degrees
    #[arg(long, default_value_t = 45.0)]
    fov: f64,

    /// Range used for the sample points, millimetres
    #[arg(long, default_value_t = 10_000)]
    range_mm: u32,

    /// Write the sensor metadata used to this JSON file
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let sensor = match &cli.metadata {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            SensorInfo::from_json(&text)?
        }
        None => SensorInfo::synthetic(cli.columns, cli.rows, cli.fov),
    };

    let start = Instant::now();
    let lut = XyzLut::new(&sensor)?;
    info!("built {} entry table in {:?}", lut.len(), start.elapsed());

    let w = sensor.format.columns_per_frame;
    let h = sensor.format.pixels_per_column;
    println!("Sensor: {} columns x {} rows", w, h);

    for (name, row) in [("top", 0), ("middle", h / 2), ("bottom", h - 1)] {
        let p = lut.point(row * w, cli.range_mm);
        println!(
            "{:>6} beam, column 0: ({:7.3}, {:7.3}, {:7.3}) m",
            name, p[0], p[1], p[2]
        );
    }

    let cloud = Cloud::structured(w, h, std::sync::Arc::new(lut), sensor.extrinsic)?;
    println!("Structured cloud: {} points, {} column poses", cloud.size(), cloud.cols());

    if let Some(path) = &cli.dump {
        let text = serde_json::to_string_pretty(&sensor)?;
        std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}
